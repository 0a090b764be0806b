//! Genre Compatibility Matrix
//!
//! Static (genreA, genreB) → weight lookup, symmetric by convention. Free-text
//! genres are resolved to a matrix genre with the same longest-match-wins rule
//! as the feature heuristics ("Deep House / Nu Disco" → "deep house").
//! Aliases shared with the heuristics resolve to their canonical genre
//! ("DnB" → "drum and bass"), in free text and in configured entries alike.
//!
//! Unknown genres or unlisted pairs return NEUTRAL_GENRE_COMPATIBILITY so an
//! unseen label never blocks the pipeline.

use crate::features::genre_keywords::{canonical_genre, GENRE_ALIASES};
use crate::features::KeywordTable;
use once_cell::sync::Lazy;
use segue_common::{Error, Result};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;

/// Weight returned for unknown genres and unlisted pairs
pub const NEUTRAL_GENRE_COMPATIBILITY: f64 = 0.5;

/// Weight of a genre with itself
const SAME_GENRE: f64 = 1.0;

/// One matrix entry, as found in configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GenrePairEntry {
    pub a: String,
    pub b: String,
    pub weight: f64,
}

impl GenrePairEntry {
    pub fn new(a: impl Into<String>, b: impl Into<String>, weight: f64) -> Self {
        Self {
            a: a.into(),
            b: b.into(),
            weight,
        }
    }
}

/// Read-only genre pair lookup
#[derive(Debug, Clone)]
pub struct GenreCompatibilityMatrix {
    pairs: HashMap<(String, String), f64>,
    /// Genre or alias keyword → canonical matrix genre
    genres: KeywordTable<String>,
}

const BUILTIN_PAIRS: &[(&str, &str, f64)] = &[
    // House family
    ("house", "deep house", 0.9),
    ("house", "tech house", 0.9),
    ("house", "progressive house", 0.85),
    ("house", "techno", 0.8),
    ("house", "disco", 0.8),
    ("house", "funk", 0.7),
    ("house", "electronic", 0.85),
    ("house", "edm", 0.75),
    ("house", "trance", 0.6),
    ("house", "pop", 0.55),
    ("house", "soul", 0.6),
    ("deep house", "tech house", 0.8),
    ("deep house", "techno", 0.7),
    ("deep house", "disco", 0.7),
    ("deep house", "soul", 0.65),
    ("tech house", "techno", 0.9),
    ("tech house", "minimal", 0.85),
    ("progressive house", "trance", 0.8),
    ("progressive house", "techno", 0.7),
    // Techno / trance
    ("techno", "minimal", 0.85),
    ("techno", "trance", 0.7),
    ("techno", "electronic", 0.85),
    ("techno", "edm", 0.65),
    ("techno", "ambient", 0.4),
    ("trance", "edm", 0.8),
    ("trance", "electronic", 0.75),
    ("minimal", "electronic", 0.7),
    // Bass music
    ("drum and bass", "dubstep", 0.7),
    ("drum and bass", "electronic", 0.65),
    ("drum and bass", "hip hop", 0.45),
    ("dubstep", "edm", 0.7),
    ("dubstep", "hip hop", 0.5),
    ("edm", "electronic", 0.85),
    ("edm", "pop", 0.7),
    // Groove
    ("disco", "funk", 0.85),
    ("disco", "soul", 0.75),
    ("disco", "pop", 0.7),
    ("funk", "soul", 0.85),
    ("funk", "hip hop", 0.7),
    ("funk", "jazz", 0.7),
    ("soul", "r&b", 0.85),
    ("soul", "jazz", 0.75),
    ("soul", "blues", 0.7),
    ("hip hop", "r&b", 0.8),
    ("hip hop", "pop", 0.6),
    ("hip hop", "reggae", 0.55),
    ("r&b", "pop", 0.7),
    ("reggae", "soul", 0.6),
    // Band music
    ("pop", "rock", 0.6),
    ("rock", "hard rock", 0.85),
    ("rock", "metal", 0.7),
    ("rock", "punk", 0.75),
    ("rock", "blues", 0.7),
    ("rock", "folk", 0.55),
    ("rock", "country", 0.5),
    ("hard rock", "metal", 0.85),
    ("hard rock", "punk", 0.7),
    ("metal", "punk", 0.65),
    ("jazz", "blues", 0.8),
    ("jazz", "classical", 0.5),
    ("blues", "country", 0.65),
    ("folk", "country", 0.75),
    ("folk", "acoustic", 0.85),
    ("country", "acoustic", 0.7),
    ("ambient", "classical", 0.6),
    ("ambient", "electronic", 0.6),
    // Known clashes
    ("metal", "classical", 0.2),
    ("metal", "ambient", 0.15),
    ("techno", "country", 0.1),
    ("techno", "folk", 0.15),
    ("drum and bass", "classical", 0.1),
    ("punk", "ambient", 0.1),
];

static BUILTIN_MATRIX: Lazy<Arc<GenreCompatibilityMatrix>> = Lazy::new(|| {
    let entries = BUILTIN_PAIRS
        .iter()
        .map(|(a, b, w)| GenrePairEntry::new(*a, *b, *w));
    Arc::new(GenreCompatibilityMatrix::build(entries))
});

impl GenreCompatibilityMatrix {
    /// Shared built-in matrix
    pub fn builtin() -> Arc<GenreCompatibilityMatrix> {
        Arc::clone(&BUILTIN_MATRIX)
    }

    /// Build a matrix from entries
    ///
    /// # Errors
    /// `Error::Config` for empty genre names or weights outside 0.0-1.0
    pub fn from_entries(entries: impl IntoIterator<Item = GenrePairEntry>) -> Result<Self> {
        let entries: Vec<GenrePairEntry> = entries.into_iter().collect();
        for entry in &entries {
            validate_entry(entry)?;
        }
        Ok(Self::build(entries))
    }

    /// Built-in matrix with `overrides` merged on top
    pub fn builtin_with_overrides(overrides: &[GenrePairEntry]) -> Result<Self> {
        for entry in overrides {
            validate_entry(entry)?;
        }
        let entries = BUILTIN_PAIRS
            .iter()
            .map(|(a, b, w)| GenrePairEntry::new(*a, *b, *w))
            .chain(overrides.iter().cloned());
        Ok(Self::build(entries))
    }

    fn build(entries: impl IntoIterator<Item = GenrePairEntry>) -> Self {
        let mut pairs = HashMap::new();
        let mut genres = BTreeSet::new();

        for entry in entries {
            let a = canonical_genre(&entry.a);
            let b = canonical_genre(&entry.b);
            genres.insert(a.clone());
            genres.insert(b.clone());
            pairs.insert(pair_key(a, b), entry.weight);
        }

        let aliases: Vec<(String, String)> = GENRE_ALIASES
            .iter()
            .filter(|(_, canonical)| genres.contains(*canonical))
            .map(|(alias, canonical)| (alias.to_string(), canonical.to_string()))
            .collect();
        let keywords = genres.into_iter().map(|g| (g.clone(), g)).chain(aliases);

        Self {
            pairs,
            genres: KeywordTable::new(keywords),
        }
    }

    /// Matrix genre that a free-text label resolves to
    pub fn resolve<'a>(&'a self, label: &str) -> Option<&'a str> {
        self.genres.lookup(label).map(|(_, genre)| genre.as_str())
    }

    /// Compatibility of two free-text genres
    ///
    /// 1.0 for the same matrix genre, the configured weight for a listed
    /// pair, otherwise `NEUTRAL_GENRE_COMPATIBILITY`.
    pub fn compatibility(&self, a: &str, b: &str) -> f64 {
        let (a, b) = match (self.resolve(a), self.resolve(b)) {
            (Some(a), Some(b)) => (a, b),
            _ => return NEUTRAL_GENRE_COMPATIBILITY,
        };
        if a == b {
            return SAME_GENRE;
        }
        self.pairs
            .get(&pair_key(a.to_string(), b.to_string()))
            .copied()
            .unwrap_or(NEUTRAL_GENRE_COMPATIBILITY)
    }

    /// Compatibility where either genre may be missing
    pub fn compatibility_opt(&self, a: Option<&str>, b: Option<&str>) -> f64 {
        match (a, b) {
            (Some(a), Some(b)) => self.compatibility(a, b),
            _ => NEUTRAL_GENRE_COMPATIBILITY,
        }
    }

    pub fn genre_count(&self) -> usize {
        self.genres.len()
    }

    pub fn pair_count(&self) -> usize {
        self.pairs.len()
    }
}

fn validate_entry(entry: &GenrePairEntry) -> Result<()> {
    if entry.a.trim().is_empty() || entry.b.trim().is_empty() {
        return Err(Error::Config("Genre matrix entry with empty genre name".to_string()));
    }
    if !entry.weight.is_finite() || !(0.0..=1.0).contains(&entry.weight) {
        return Err(Error::Config(format!(
            "Genre matrix weight for ({}, {}) must be within 0.0-1.0, got {}",
            entry.a, entry.b, entry.weight
        )));
    }
    Ok(())
}

/// Order-independent key
fn pair_key(a: String, b: String) -> (String, String) {
    if a <= b {
        (a, b)
    } else {
        (b, a)
    }
}
