//! Musical key vocabulary and the harmonic (Camelot) wheel
//!
//! Keys arrive from analysis collaborators as free-form labels. Accepted forms:
//! - Note name with optional accidental and mode: `"Am"`, `"A minor"`, `"C#m"`,
//!   `"Bb major"`, `"F#"` (no mode suffix means major)
//! - Camelot codes: `"8A"` (minor), `"8B"` (major)
//! - `""`, `"unknown"`, `"none"`, `"-"` for an unknown key
//!
//! # Harmonic Wheel
//! The Camelot wheel places the 24 keys on 12 positions (circle of fifths),
//! each position holding one minor (A) and one major (B) key. Neighbouring
//! positions and the relative major/minor mix harmonically.

use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Compatibility returned when either key is unknown
pub const NEUTRAL_HARMONIC_COMPATIBILITY: f64 = 0.5;

const PITCH_NAMES: [&str; 12] = [
    "C", "C#", "D", "Eb", "E", "F", "F#", "G", "Ab", "A", "Bb", "B",
];

/// Key mode
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Mode {
    Major,
    Minor,
}

/// A recognized musical key
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "RawMusicalKey")]
pub struct MusicalKey {
    /// Pitch class of the tonic (0 = C, 11 = B)
    pitch_class: u8,
    mode: Mode,
}

/// Unchecked serialized form
#[derive(Deserialize)]
struct RawMusicalKey {
    pitch_class: u8,
    mode: Mode,
}

impl TryFrom<RawMusicalKey> for MusicalKey {
    type Error = Error;

    fn try_from(raw: RawMusicalKey) -> Result<Self> {
        if raw.pitch_class >= 12 {
            return Err(Error::InvalidInput(format!(
                "Pitch class must be within 0-11, got {}",
                raw.pitch_class
            )));
        }
        Ok(MusicalKey::new(raw.pitch_class, raw.mode))
    }
}

impl MusicalKey {
    /// Create key from pitch class (wrapped into 0..12) and mode
    pub fn new(pitch_class: u8, mode: Mode) -> Self {
        Self {
            pitch_class: pitch_class % 12,
            mode,
        }
    }

    /// Parse a key label
    ///
    /// # Returns
    /// * `Ok(Some(key))` for a recognized key
    /// * `Ok(None)` for an explicitly unknown key (empty, "unknown", ...)
    /// * `Err(Error::InvalidInput)` for a label outside the vocabulary
    pub fn parse(label: &str) -> Result<Option<MusicalKey>> {
        let normalized = label.trim().to_lowercase();

        if matches!(normalized.as_str(), "" | "unknown" | "none" | "-" | "n/a") {
            return Ok(None);
        }

        let parsed = if normalized.starts_with(|c: char| c.is_ascii_digit()) {
            parse_camelot(&normalized)
        } else {
            parse_note_name(&normalized)
        };

        parsed
            .map(Some)
            .ok_or_else(|| Error::InvalidInput(format!("Unrecognized key label: '{}'", label)))
    }

    pub fn pitch_class(&self) -> u8 {
        self.pitch_class
    }

    pub fn mode(&self) -> Mode {
        self.mode
    }

    /// Camelot wheel number (1-12)
    pub fn camelot_number(&self) -> u8 {
        let pc = self.pitch_class as u32;
        let offset = match self.mode {
            Mode::Minor => 4,
            Mode::Major => 7,
        };
        ((7 * pc + offset) % 12) as u8 + 1
    }

    /// Camelot code, e.g. "8A" for A minor
    pub fn camelot_code(&self) -> String {
        let letter = match self.mode {
            Mode::Minor => 'A',
            Mode::Major => 'B',
        };
        format!("{}{}", self.camelot_number(), letter)
    }

    /// Position on the 24-slot harmonic wheel
    ///
    /// Minor keys occupy 0-11, major keys 12-23, ordered by Camelot number.
    pub fn wheel_index(&self) -> u8 {
        let base = match self.mode {
            Mode::Minor => 0,
            Mode::Major => 12,
        };
        base + self.camelot_number() - 1
    }
}

impl fmt::Display for MusicalKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = PITCH_NAMES[self.pitch_class as usize];
        match self.mode {
            Mode::Major => write!(f, "{}", name),
            Mode::Minor => write!(f, "{}m", name),
        }
    }
}

fn parse_camelot(label: &str) -> Option<MusicalKey> {
    let split = label.find(|c: char| !c.is_ascii_digit())?;
    let (digits, suffix) = label.split_at(split);
    let number: u32 = digits.parse().ok()?;
    if !(1..=12).contains(&number) {
        return None;
    }

    let (mode, offset) = match suffix.trim() {
        "a" => (Mode::Minor, 5),
        "b" => (Mode::Major, 8),
        _ => return None,
    };

    // 7 is its own inverse mod 12
    let pitch_class = (7 * (number + 12 - offset)) % 12;
    Some(MusicalKey::new(pitch_class as u8, mode))
}

fn parse_note_name(label: &str) -> Option<MusicalKey> {
    let mut chars = label.chars();
    let base: i32 = match chars.next()? {
        'c' => 0,
        'd' => 2,
        'e' => 4,
        'f' => 5,
        'g' => 7,
        'a' => 9,
        'b' => 11,
        _ => return None,
    };

    let rest = chars.as_str();
    let (accidental, rest) = if let Some(r) = rest.strip_prefix('#').or_else(|| rest.strip_prefix('♯')) {
        (1, r)
    } else if let Some(r) = rest.strip_prefix('♭') {
        (-1, r)
    } else if let Some(r) = rest.strip_prefix('b') {
        // "bb", "ebm": a 'b' directly after the note letter is a flat
        (-1, r)
    } else {
        (0, rest)
    };

    let mode = match rest.trim_start_matches([' ', '-', '_']).trim() {
        "" | "maj" | "major" => Mode::Major,
        "m" | "min" | "minor" => Mode::Minor,
        _ => return None,
    };

    let pitch_class = (base + accidental).rem_euclid(12) as u8;
    Some(MusicalKey::new(pitch_class, mode))
}

/// Harmonic compatibility of two keys on the Camelot wheel
///
/// - Same key: 1.0
/// - Relative major/minor (same number): 0.9
/// - Adjacent number, same mode: 0.85
/// - Adjacent number, mode change: 0.6
/// - Two steps, same mode: 0.5
/// - Anything further: 0.3
/// - Either key unknown: 0.5
pub fn harmonic_compatibility(a: Option<MusicalKey>, b: Option<MusicalKey>) -> f64 {
    let (a, b) = match (a, b) {
        (Some(a), Some(b)) => (a, b),
        _ => return NEUTRAL_HARMONIC_COMPATIBILITY,
    };

    let diff = (a.camelot_number() as i32 - b.camelot_number() as i32).abs();
    let steps = diff.min(12 - diff);
    let same_mode = a.mode == b.mode;

    match (steps, same_mode) {
        (0, true) => 1.0,
        (0, false) => 0.9,
        (1, true) => 0.85,
        (1, false) => 0.6,
        (2, true) => 0.5,
        _ => 0.3,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key(label: &str) -> MusicalKey {
        MusicalKey::parse(label).unwrap().unwrap()
    }

    #[test]
    fn test_parse_note_names() {
        assert_eq!(key("Am"), MusicalKey::new(9, Mode::Minor));
        assert_eq!(key("A minor"), MusicalKey::new(9, Mode::Minor));
        assert_eq!(key("C"), MusicalKey::new(0, Mode::Major));
        assert_eq!(key("C#m"), MusicalKey::new(1, Mode::Minor));
        assert_eq!(key("Dbm"), MusicalKey::new(1, Mode::Minor));
        assert_eq!(key("Bb major"), MusicalKey::new(10, Mode::Major));
        assert_eq!(key("B"), MusicalKey::new(11, Mode::Major));
        assert_eq!(key("Bm"), MusicalKey::new(11, Mode::Minor));
        assert_eq!(key("bbm"), MusicalKey::new(10, Mode::Minor));
    }

    #[test]
    fn test_parse_camelot_codes() {
        assert_eq!(key("8A"), MusicalKey::new(9, Mode::Minor));
        assert_eq!(key("8B"), MusicalKey::new(0, Mode::Major));
        assert_eq!(key("1A"), MusicalKey::new(8, Mode::Minor));
        assert_eq!(key("12b"), MusicalKey::new(4, Mode::Major));
    }

    #[test]
    fn test_unknown_and_unrecognized() {
        assert_eq!(MusicalKey::parse("unknown").unwrap(), None);
        assert_eq!(MusicalKey::parse("  ").unwrap(), None);
        assert!(MusicalKey::parse("H minor").is_err());
        assert!(MusicalKey::parse("13A").is_err());
        assert!(MusicalKey::parse("Cx").is_err());
    }

    #[test]
    fn test_camelot_round_trip_for_all_keys() {
        for pc in 0..12 {
            for mode in [Mode::Major, Mode::Minor] {
                let k = MusicalKey::new(pc, mode);
                assert_eq!(key(&k.camelot_code()), k, "camelot code {}", k.camelot_code());
            }
        }
    }

    #[test]
    fn test_wheel_index_halves() {
        assert_eq!(key("8A").wheel_index(), 7);
        assert_eq!(key("8B").wheel_index(), 19);
        assert!(key("1A").wheel_index() < 12);
        assert!(key("1B").wheel_index() >= 12);
    }

    #[test]
    fn test_harmonic_compatibility() {
        assert_eq!(harmonic_compatibility(Some(key("Am")), Some(key("Am"))), 1.0);
        assert_eq!(harmonic_compatibility(Some(key("Am")), Some(key("C"))), 0.9);
        assert_eq!(harmonic_compatibility(Some(key("8A")), Some(key("9A"))), 0.85);
        assert_eq!(harmonic_compatibility(Some(key("12A")), Some(key("1A"))), 0.85);
        assert_eq!(harmonic_compatibility(Some(key("8A")), Some(key("9B"))), 0.6);
        assert_eq!(harmonic_compatibility(Some(key("8A")), Some(key("2A"))), 0.3);
        assert_eq!(harmonic_compatibility(None, Some(key("2A"))), 0.5);
    }

    #[test]
    fn test_deserialize_rejects_out_of_range_pitch_class() {
        let bad = serde_json::from_str::<MusicalKey>(r#"{"pitch_class":200,"mode":"Minor"}"#);
        assert!(bad.is_err());

        let good: MusicalKey = serde_json::from_str(r#"{"pitch_class":9,"mode":"Minor"}"#).unwrap();
        assert_eq!(good, key("Am"));
        assert_eq!(good.to_string(), "Am");
    }

    #[test]
    fn test_display() {
        assert_eq!(key("8A").to_string(), "Am");
        assert_eq!(key("3B").to_string(), "C#");
    }
}
