//! Spelled pitches.
//!
//! Interval quality depends on spelling (C–E♭ is a minor third, C–D♯ an
//! augmented second), so pitches keep their letter name instead of collapsing
//! to a MIDI number.

use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Octave assumed when a pitch name omits one.
pub const DEFAULT_OCTAVE: i8 = 4;

/// Lowest and highest octaves a pitch may sit in.
///
/// Octaves stay non-negative because `-` is read as a flat (`B-2` is B♭2),
/// so a name like `C-1` could not be told apart from C♭1.
pub const MIN_OCTAVE: i8 = 0;
pub const MAX_OCTAVE: i8 = 9;

/// Largest alteration in either direction (double sharp or double flat).
pub const MAX_ALTER: i8 = 2;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PitchError {
    #[error("invalid pitch name {input:?}: {reason}")]
    Parse { input: String, reason: &'static str },

    #[error("octave {0} is outside {MIN_OCTAVE}..={MAX_OCTAVE}")]
    OctaveOutOfRange(i8),

    #[error("alteration {0} is more than a double accidental")]
    AlterOutOfRange(i8),
}

/// Diatonic letter name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Step {
    C,
    D,
    E,
    F,
    G,
    A,
    B,
}

impl Step {
    /// Semitones above C (0-11).
    pub fn to_semitone(&self) -> i32 {
        match self {
            Step::C => 0,
            Step::D => 2,
            Step::E => 4,
            Step::F => 5,
            Step::G => 7,
            Step::A => 9,
            Step::B => 11,
        }
    }

    /// Position within the octave (C = 0 … B = 6).
    pub fn index(&self) -> i32 {
        match self {
            Step::C => 0,
            Step::D => 1,
            Step::E => 2,
            Step::F => 3,
            Step::G => 4,
            Step::A => 5,
            Step::B => 6,
        }
    }

    pub fn parse(c: char) -> Option<Step> {
        match c.to_ascii_uppercase() {
            'C' => Some(Step::C),
            'D' => Some(Step::D),
            'E' => Some(Step::E),
            'F' => Some(Step::F),
            'G' => Some(Step::G),
            'A' => Some(Step::A),
            'B' => Some(Step::B),
            _ => None,
        }
    }

    fn as_char(&self) -> char {
        match self {
            Step::C => 'C',
            Step::D => 'D',
            Step::E => 'E',
            Step::F => 'F',
            Step::G => 'G',
            Step::A => 'A',
            Step::B => 'B',
        }
    }
}

/// A spelled pitch with octave (scientific pitch notation, C4 = middle C).
///
/// Every pitch prints as a name that parses back to the same pitch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Pitch {
    step: Step,
    /// Chromatic alteration in semitones: -1 flat, +1 sharp, ±2 double.
    alter: i8,
    octave: i8,
}

impl Pitch {
    pub fn new(step: Step, alter: i8, octave: i8) -> Result<Self, PitchError> {
        if !(MIN_OCTAVE..=MAX_OCTAVE).contains(&octave) {
            return Err(PitchError::OctaveOutOfRange(octave));
        }
        if alter.abs() > MAX_ALTER {
            return Err(PitchError::AlterOutOfRange(alter));
        }
        Ok(Self { step, alter, octave })
    }

    pub fn step(&self) -> Step {
        self.step
    }

    pub fn alter(&self) -> i8 {
        self.alter
    }

    pub fn octave(&self) -> i8 {
        self.octave
    }

    /// MIDI key number (C4 = 60).
    pub fn midi(&self) -> i32 {
        (self.octave as i32 + 1) * 12 + self.step.to_semitone() + self.alter as i32
    }

    /// Count of diatonic steps above C0.
    pub fn diatonic(&self) -> i32 {
        self.octave as i32 * 7 + self.step.index()
    }

    pub fn pitch_class(&self) -> u8 {
        self.midi().rem_euclid(12) as u8
    }
}

impl Ord for Pitch {
    fn cmp(&self, other: &Self) -> Ordering {
        self.midi()
            .cmp(&other.midi())
            .then_with(|| self.diatonic().cmp(&other.diatonic()))
    }
}

impl PartialOrd for Pitch {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl fmt::Display for Pitch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let accidental = match self.alter {
            a if a > 0 => "#".repeat(a as usize),
            a if a < 0 => "b".repeat(a.unsigned_abs() as usize),
            _ => String::new(),
        };
        write!(f, "{}{}{}", self.step.as_char(), accidental, self.octave)
    }
}

impl FromStr for Pitch {
    type Err = PitchError;

    /// Accepts `C4`, `F#3`, `Bb2`, `B-2` (hyphen as flat), `Cx4` or `C##4`,
    /// `Dbb4`. A missing octave means octave 4.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let fail = |reason| PitchError::Parse {
            input: s.to_string(),
            reason,
        };

        let trimmed = s.trim();
        let mut chars = trimmed.chars();
        let step = chars
            .next()
            .and_then(Step::parse)
            .ok_or_else(|| fail("must start with a letter A-G"))?;

        let rest = chars.as_str();
        let digits_at = rest
            .find(|c: char| c.is_ascii_digit())
            .unwrap_or(rest.len());
        let (accidentals, octave) = rest.split_at(digits_at);

        let mut alter: i8 = 0;
        for c in accidentals.chars() {
            alter += match c {
                '#' | '+' => 1,
                'x' => 2,
                'b' | '-' => -1,
                _ => return Err(fail("unrecognized accidental")),
            };
            if alter.abs() > MAX_ALTER {
                return Err(fail("at most a double accidental is supported"));
            }
        }

        let octave = if octave.is_empty() {
            DEFAULT_OCTAVE
        } else {
            octave.parse::<i8>().map_err(|_| fail("octave is not a number"))?
        };

        Pitch::new(step, alter, octave)
    }
}

impl TryFrom<String> for Pitch {
    type Error = PitchError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<Pitch> for String {
    fn from(pitch: Pitch) -> Self {
        pitch.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn p(s: &str) -> Pitch {
        s.parse().unwrap()
    }

    #[test]
    fn parses_common_spellings() {
        assert_eq!(p("C4"), Pitch::new(Step::C, 0, 4).unwrap());
        assert_eq!(p("F#3"), Pitch::new(Step::F, 1, 3).unwrap());
        assert_eq!(p("Bb2"), Pitch::new(Step::B, -1, 2).unwrap());
        assert_eq!(p("B-2"), Pitch::new(Step::B, -1, 2).unwrap());
        assert_eq!(p("Cx4"), Pitch::new(Step::C, 2, 4).unwrap());
        assert_eq!(p("e"), Pitch::new(Step::E, 0, DEFAULT_OCTAVE).unwrap());
    }

    #[test]
    fn rejects_garbage() {
        assert!("H4".parse::<Pitch>().is_err());
        assert!("C?4".parse::<Pitch>().is_err());
        assert!("C###4".parse::<Pitch>().is_err());
        assert!("".parse::<Pitch>().is_err());
    }

    #[test]
    fn midi_numbers() {
        assert_eq!(p("C4").midi(), 60);
        assert_eq!(p("A4").midi(), 69);
        assert_eq!(p("Cb4").midi(), 59);
        assert_eq!(p("B#3").midi(), 60);
    }

    #[test]
    fn display_normalizes_flats() {
        assert_eq!(p("B-2").to_string(), "Bb2");
        assert_eq!(p("C##5").to_string(), "C##5");
    }

    #[test]
    fn ordering_is_by_height() {
        assert!(p("C4") < p("D4"));
        assert!(p("B3") < p("C4"));
        assert!(p("B#3") < p("C4"), "same key, lower letter sorts first");
    }

    #[test]
    fn out_of_range_pitches_are_rejected() {
        assert_eq!(Pitch::new(Step::C, 0, -1), Err(PitchError::OctaveOutOfRange(-1)));
        assert_eq!(Pitch::new(Step::C, 0, 10), Err(PitchError::OctaveOutOfRange(10)));
        assert_eq!(Pitch::new(Step::C, 3, 4), Err(PitchError::AlterOutOfRange(3)));
        assert!("C10".parse::<Pitch>().is_err());
        // A hyphen is always a flat, never an octave sign.
        assert_eq!(p("C-1"), Pitch::new(Step::C, -1, 1).unwrap());
    }

    #[test]
    fn names_round_trip_across_the_range() {
        let steps = [Step::C, Step::D, Step::E, Step::F, Step::G, Step::A, Step::B];
        for octave in MIN_OCTAVE..=MAX_OCTAVE {
            for step in steps {
                for alter in -MAX_ALTER..=MAX_ALTER {
                    let pitch = Pitch::new(step, alter, octave).unwrap();
                    let json = serde_json::to_string(&pitch).unwrap();
                    let back: Pitch = serde_json::from_str(&json).unwrap();
                    assert_eq!(back, pitch, "{json}");
                    assert_eq!(back.midi(), pitch.midi());
                }
            }
        }
    }

    #[test]
    fn serde_uses_names() {
        let json = serde_json::to_string(&p("G#2")).unwrap();
        assert_eq!(json, "\"G#2\"");
        let back: Pitch = serde_json::from_str("\"E-5\"").unwrap();
        assert_eq!(back, Pitch::new(Step::E, -1, 5).unwrap());
    }
}
