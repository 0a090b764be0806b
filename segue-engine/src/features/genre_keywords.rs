//! Genre keyword → heuristic profile lookup
//!
//! Genre text is free-form ("Deep House / Nu Disco", "melodic techno"). Each
//! keyword in the table maps to a profile of genre-derived sub-scores. Matching
//! is longest-match-wins over whole-word occurrences so "deep house" beats
//! "house", and "house" never matches inside "lighthouse".
//!
//! Alternate spellings ("dnb", "hip-hop") resolve to a canonical genre
//! through `GENRE_ALIASES`, shared with the genre compatibility matrix.
//!
//! Profile values are heuristic and tunable.

use once_cell::sync::Lazy;
use std::sync::Arc;

/// Genre-derived sub-scores, one per heuristic dimension (0.0-1.0)
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GenreProfile {
    pub danceability: f64,
    pub valence: f64,
    pub acousticness: f64,
    pub instrumentalness: f64,
    pub rhythmic_complexity: f64,
    pub spectral_brightness: f64,
    pub tempo_stability: f64,
    pub harmonic_complexity: f64,
    pub dynamic_range: f64,
}

impl GenreProfile {
    /// Profile used when no keyword matches
    pub const NEUTRAL: GenreProfile = GenreProfile::uniform(0.45);

    pub const fn uniform(value: f64) -> Self {
        Self {
            danceability: value,
            valence: value,
            acousticness: value,
            instrumentalness: value,
            rhythmic_complexity: value,
            spectral_brightness: value,
            tempo_stability: value,
            harmonic_complexity: value,
            dynamic_range: value,
        }
    }

    #[allow(clippy::too_many_arguments)]
    const fn new(
        danceability: f64,
        valence: f64,
        acousticness: f64,
        instrumentalness: f64,
        rhythmic_complexity: f64,
        spectral_brightness: f64,
        tempo_stability: f64,
        harmonic_complexity: f64,
        dynamic_range: f64,
    ) -> Self {
        Self {
            danceability,
            valence,
            acousticness,
            instrumentalness,
            rhythmic_complexity,
            spectral_brightness,
            tempo_stability,
            harmonic_complexity,
            dynamic_range,
        }
    }
}

/// Longest-match-wins keyword table
///
/// Entries are kept sorted by keyword length (descending), then
/// alphabetically, so the first whole-word hit is the most specific one and
/// ties resolve deterministically.
#[derive(Debug, Clone)]
pub struct KeywordTable<V> {
    entries: Vec<(String, V)>,
}

impl<V> KeywordTable<V> {
    /// Build a table; keywords are lowercased and trimmed, later duplicates win
    pub fn new<K: AsRef<str>>(entries: impl IntoIterator<Item = (K, V)>) -> Self {
        let mut table: Vec<(String, V)> = Vec::new();
        for (keyword, value) in entries {
            let keyword = keyword.as_ref().trim().to_lowercase();
            if keyword.is_empty() {
                continue;
            }
            match table.iter_mut().find(|(k, _)| *k == keyword) {
                Some(existing) => existing.1 = value,
                None => table.push((keyword, value)),
            }
        }
        table.sort_by(|(a, _), (b, _)| b.len().cmp(&a.len()).then_with(|| a.cmp(b)));
        Self { entries: table }
    }

    /// Most specific keyword occurring as a whole word in `text`
    pub fn lookup(&self, text: &str) -> Option<(&str, &V)> {
        let text = text.trim().to_lowercase();
        if text.is_empty() {
            return None;
        }
        self.entries
            .iter()
            .find(|(keyword, _)| contains_word(&text, keyword))
            .map(|(keyword, value)| (keyword.as_str(), value))
    }

    pub fn keywords(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(k, _)| k.as_str())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// `needle` occurs in `haystack` bounded by non-alphanumeric characters or the ends
fn contains_word(haystack: &str, needle: &str) -> bool {
    haystack.match_indices(needle).any(|(start, _)| {
        let end = start + needle.len();
        let before_ok = haystack[..start]
            .chars()
            .next_back()
            .map_or(true, |c| !c.is_alphanumeric());
        let after_ok = haystack[end..]
            .chars()
            .next()
            .map_or(true, |c| !c.is_alphanumeric());
        before_ok && after_ok
    })
}

/// Alternate labels and their canonical genre
pub const GENRE_ALIASES: &[(&str, &str)] = &[
    ("drum & bass", "drum and bass"),
    ("drum n bass", "drum and bass"),
    ("dnb", "drum and bass"),
    ("jungle", "drum and bass"),
    ("hip-hop", "hip hop"),
    ("rap", "hip hop"),
    ("rnb", "r&b"),
];

/// Lowercased, trimmed genre name with a whole-label alias replaced
pub fn canonical_genre(genre: &str) -> String {
    let genre = genre.trim().to_lowercase();
    GENRE_ALIASES
        .iter()
        .find(|(alias, _)| *alias == genre)
        .map(|(_, canonical)| canonical.to_string())
        .unwrap_or(genre)
}

static BUILTIN_PROFILES: Lazy<Arc<KeywordTable<GenreProfile>>> = Lazy::new(|| {
    use GenreProfile as P;

    // dance, valence, acoustic, instr, rhythm, bright, stability, harmonic, dynamic
    let mut profiles = vec![
        ("house", P::new(0.90, 0.70, 0.05, 0.70, 0.50, 0.60, 0.90, 0.35, 0.30)),
        ("deep house", P::new(0.85, 0.60, 0.10, 0.65, 0.45, 0.45, 0.90, 0.45, 0.35)),
        ("tech house", P::new(0.90, 0.60, 0.03, 0.80, 0.55, 0.60, 0.92, 0.30, 0.30)),
        ("progressive house", P::new(0.80, 0.65, 0.05, 0.75, 0.50, 0.60, 0.90, 0.45, 0.40)),
        ("techno", P::new(0.85, 0.40, 0.02, 0.90, 0.60, 0.55, 0.95, 0.25, 0.25)),
        ("minimal", P::new(0.80, 0.45, 0.03, 0.90, 0.45, 0.40, 0.95, 0.20, 0.30)),
        ("trance", P::new(0.80, 0.70, 0.03, 0.70, 0.50, 0.75, 0.90, 0.50, 0.35)),
        ("drum and bass", P::new(0.75, 0.55, 0.03, 0.70, 0.90, 0.70, 0.85, 0.40, 0.35)),
        ("dubstep", P::new(0.65, 0.40, 0.02, 0.60, 0.80, 0.70, 0.80, 0.35, 0.45)),
        ("disco", P::new(0.90, 0.85, 0.20, 0.40, 0.55, 0.70, 0.85, 0.55, 0.45)),
        ("funk", P::new(0.85, 0.80, 0.30, 0.35, 0.75, 0.60, 0.80, 0.60, 0.55)),
        ("soul", P::new(0.65, 0.65, 0.40, 0.20, 0.55, 0.50, 0.75, 0.65, 0.60)),
        ("hip hop", P::new(0.80, 0.55, 0.10, 0.15, 0.70, 0.50, 0.85, 0.40, 0.40)),
        ("r&b", P::new(0.75, 0.60, 0.15, 0.15, 0.60, 0.50, 0.80, 0.55, 0.45)),
        ("pop", P::new(0.75, 0.75, 0.20, 0.10, 0.45, 0.65, 0.85, 0.40, 0.35)),
        ("rock", P::new(0.50, 0.55, 0.25, 0.20, 0.60, 0.65, 0.70, 0.50, 0.55)),
        ("hard rock", P::new(0.45, 0.45, 0.10, 0.25, 0.65, 0.75, 0.70, 0.45, 0.50)),
        ("metal", P::new(0.35, 0.30, 0.05, 0.30, 0.80, 0.80, 0.65, 0.50, 0.45)),
        ("punk", P::new(0.55, 0.50, 0.10, 0.10, 0.60, 0.75, 0.70, 0.30, 0.40)),
        ("jazz", P::new(0.45, 0.60, 0.70, 0.60, 0.85, 0.50, 0.50, 0.90, 0.80)),
        ("blues", P::new(0.45, 0.40, 0.60, 0.35, 0.55, 0.45, 0.65, 0.60, 0.70)),
        ("classical", P::new(0.15, 0.50, 0.95, 0.95, 0.60, 0.40, 0.40, 0.95, 0.95)),
        ("ambient", P::new(0.15, 0.50, 0.50, 0.90, 0.20, 0.35, 0.60, 0.50, 0.70)),
        ("folk", P::new(0.40, 0.60, 0.90, 0.20, 0.40, 0.45, 0.70, 0.50, 0.70)),
        ("country", P::new(0.55, 0.65, 0.75, 0.15, 0.45, 0.50, 0.75, 0.45, 0.60)),
        ("reggae", P::new(0.80, 0.75, 0.40, 0.30, 0.65, 0.50, 0.85, 0.40, 0.50)),
        ("electronic", P::new(0.75, 0.60, 0.05, 0.70, 0.55, 0.60, 0.85, 0.40, 0.40)),
        ("edm", P::new(0.85, 0.70, 0.02, 0.60, 0.50, 0.75, 0.90, 0.35, 0.30)),
        ("acoustic", P::new(0.40, 0.60, 0.95, 0.30, 0.40, 0.40, 0.70, 0.50, 0.75)),
    ];

    let aliases: Vec<(&str, GenreProfile)> = GENRE_ALIASES
        .iter()
        .filter_map(|(alias, canonical)| {
            profiles
                .iter()
                .find(|(genre, _)| genre == canonical)
                .map(|(_, profile)| (*alias, *profile))
        })
        .collect();
    profiles.extend(aliases);

    Arc::new(KeywordTable::new(profiles))
});

/// Shared built-in genre profile table
pub fn builtin_profiles() -> Arc<KeywordTable<GenreProfile>> {
    Arc::clone(&BUILTIN_PROFILES)
}
