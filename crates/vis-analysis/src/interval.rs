//! Directed harmonic intervals and their text labels.

use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;

use crate::pitch::Pitch;

/// Label used wherever a voice is silent.
pub const REST_LABEL: &str = "Rest";

/// Placeholder for melodic motion into or out of a rest.
pub const NO_MOTION_LABEL: &str = "_";

/// Semitone size of the major/perfect interval for each simple generic step.
const DIATONIC_SEMITONES: [i32; 7] = [0, 2, 4, 5, 7, 9, 11];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Quality {
    Perfect,
    Major,
    Minor,
    /// Augmented by the given number of semitones (1 = A, 2 = AA).
    Augmented(u8),
    /// Diminished by the given number of semitones (1 = d, 2 = dd).
    Diminished(u8),
}

impl Quality {
    pub fn symbol(&self) -> String {
        match self {
            Quality::Perfect => "P".to_string(),
            Quality::Major => "M".to_string(),
            Quality::Minor => "m".to_string(),
            Quality::Augmented(n) => "A".repeat(*n as usize),
            Quality::Diminished(n) => "d".repeat(*n as usize),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Direction {
    Ascending,
    Descending,
    Unison,
}

/// Whether to print intervals reduced to one octave.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IntervalSize {
    Simple,
    #[default]
    Compound,
}

/// When to print a `+`/`-` sign in front of an interval.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DirectionDisplay {
    Always,
    /// Only descending intervals get a sign (`-m3`); voice crossings stay visible.
    #[default]
    DescendingOnly,
    Never,
}

/// How interval labels are written. Labels are the grouping key, so two
/// experiments with different settings count different things.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct LabelSettings {
    pub quality: bool,
    pub size: IntervalSize,
    pub direction: DirectionDisplay,
    /// Interleave the lowest voice's melodic motion in n-gram labels.
    pub horizontal: bool,
}

impl Default for LabelSettings {
    fn default() -> Self {
        Self {
            quality: true,
            size: IntervalSize::Compound,
            direction: DirectionDisplay::DescendingOnly,
            horizontal: false,
        }
    }
}

/// A directed interval between two spelled pitches.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct HarmonicInterval {
    /// Undirected generic size: 1 = unison, 3 = third, 8 = octave, 10 = tenth.
    pub generic: u32,
    /// Undirected size in semitones.
    pub semitones: i32,
    pub quality: Quality,
    pub direction: Direction,
}

impl HarmonicInterval {
    /// Interval from `from` to `to`; ascending when `to` is higher.
    pub fn between(from: Pitch, to: Pitch) -> Self {
        let steps = to.diatonic() - from.diatonic();
        let semis = to.midi() - from.midi();

        let direction = match steps.cmp(&0).then(semis.cmp(&0)) {
            Ordering::Greater => Direction::Ascending,
            Ordering::Less => Direction::Descending,
            Ordering::Equal => Direction::Unison,
        };

        let (steps, semis) = match direction {
            Direction::Descending => (-steps, -semis),
            _ => (steps, semis),
        };

        let simple = (steps % 7) as usize;
        let octaves = steps / 7;
        let expected = DIATONIC_SEMITONES[simple] + 12 * octaves;
        let delta = semis - expected;

        let perfect_type = matches!(simple, 0 | 3 | 4);
        let quality = if perfect_type {
            match delta {
                0 => Quality::Perfect,
                d if d > 0 => Quality::Augmented(d as u8),
                d => Quality::Diminished(d.unsigned_abs() as u8),
            }
        } else {
            match delta {
                0 => Quality::Major,
                -1 => Quality::Minor,
                d if d > 0 => Quality::Augmented(d as u8),
                d => Quality::Diminished((d.unsigned_abs() - 1) as u8),
            }
        };

        Self {
            generic: steps as u32 + 1,
            semitones: semis,
            quality,
            direction,
        }
    }

    /// Generic size as printed under the given size setting.
    ///
    /// Simple size keeps an exact octave as 8 and reduces everything else
    /// into 1-7, so a double octave prints as 1.
    pub fn size_number(&self, size: IntervalSize) -> u32 {
        match size {
            IntervalSize::Compound => self.generic,
            IntervalSize::Simple if self.generic == 8 => 8,
            IntervalSize::Simple => (self.generic - 1) % 7 + 1,
        }
    }

    pub fn label(&self, settings: &LabelSettings) -> String {
        self.label_with_direction(settings, settings.direction)
    }

    /// Label with an explicit direction policy (melodic motion always shows
    /// its direction).
    pub fn label_with_direction(&self, settings: &LabelSettings, direction: DirectionDisplay) -> String {
        let sign = match (direction, self.direction) {
            (DirectionDisplay::Always, Direction::Ascending) => "+",
            (DirectionDisplay::Always | DirectionDisplay::DescendingOnly, Direction::Descending) => "-",
            _ => "",
        };
        let quality = if settings.quality {
            self.quality.symbol()
        } else {
            String::new()
        };
        format!("{}{}{}", sign, quality, self.size_number(settings.size))
    }
}

impl fmt::Display for HarmonicInterval {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.label(&LabelSettings::default()))
    }
}

/// Musical ordering of interval and n-gram labels.
///
/// Tokens compare by generic size, then by quality (d < m < P/M < A), with
/// direction signs ignored. Multi-token labels compare token by token and a
/// prefix sorts first. Tokens that are not intervals (`Rest`, `_`) sort after
/// intervals and lexically among themselves.
pub fn compare_labels(left: &str, right: &str) -> Ordering {
    let mut l = left.split_whitespace();
    let mut r = right.split_whitespace();
    loop {
        match (l.next(), r.next()) {
            (None, None) => return Ordering::Equal,
            (None, Some(_)) => return Ordering::Less,
            (Some(_), None) => return Ordering::Greater,
            (Some(a), Some(b)) => {
                let ord = compare_tokens(a, b);
                if ord != Ordering::Equal {
                    return ord;
                }
            }
        }
    }
}

fn compare_tokens(left: &str, right: &str) -> Ordering {
    match (token_key(left), token_key(right)) {
        (Some(a), Some(b)) => a.cmp(&b),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => left.cmp(right),
    }
}

/// `(generic size, quality rank)` for a token like `-m3`, `+P4`, `10`.
fn token_key(token: &str) -> Option<(u32, u8)> {
    let bare = token.trim_start_matches(['+', '-']);
    let digits_at = bare.find(|c: char| c.is_ascii_digit())?;
    let (quality, number) = bare.split_at(digits_at);
    let number = number.parse::<u32>().ok()?;
    let rank = match quality {
        "" | "P" | "M" => 3,
        "m" => 2,
        q if q.chars().all(|c| c == 'd') => 2 - q.len().min(2) as u8,
        q if q.chars().all(|c| c == 'A') => 3 + q.len().min(2) as u8,
        _ => return None,
    };
    Some((number, rank))
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn iv(from: &str, to: &str) -> HarmonicInterval {
        HarmonicInterval::between(from.parse().unwrap(), to.parse().unwrap())
    }

    fn label(from: &str, to: &str) -> String {
        iv(from, to).label(&LabelSettings::default())
    }

    #[test]
    fn basic_qualities() {
        assert_eq!(label("C4", "E4"), "M3");
        assert_eq!(label("C4", "Eb4"), "m3");
        assert_eq!(label("C4", "G4"), "P5");
        assert_eq!(label("C4", "F#4"), "A4");
        assert_eq!(label("B3", "F4"), "d5");
        assert_eq!(label("C4", "D#4"), "A2");
        assert_eq!(label("C4", "C4"), "P1");
        assert_eq!(label("C4", "C5"), "P8");
        assert_eq!(label("C#4", "Bb4"), "d7");
    }

    #[test]
    fn compound_and_simple() {
        let tenth = iv("C3", "E4");
        assert_eq!(tenth.generic, 10);
        assert_eq!(tenth.label(&LabelSettings::default()), "M10");

        let simple = LabelSettings {
            size: IntervalSize::Simple,
            ..Default::default()
        };
        assert_eq!(tenth.label(&simple), "M3");
        assert_eq!(iv("C4", "C5").label(&simple), "P8");
        assert_eq!(iv("C3", "C5").label(&simple), "P1");
    }

    #[test]
    fn descending_is_signed() {
        assert_eq!(label("E4", "C4"), "-M3");
        let always = LabelSettings {
            direction: DirectionDisplay::Always,
            ..Default::default()
        };
        assert_eq!(iv("C4", "E4").label(&always), "+M3");
        assert_eq!(iv("C4", "C4").label(&always), "P1");
        let never = LabelSettings {
            direction: DirectionDisplay::Never,
            ..Default::default()
        };
        assert_eq!(iv("E4", "C4").label(&never), "M3");
    }

    #[test]
    fn quality_can_be_suppressed() {
        let settings = LabelSettings {
            quality: false,
            ..Default::default()
        };
        assert_eq!(iv("C4", "Eb4").label(&settings), "3");
        assert_eq!(iv("G4", "C4").label(&settings), "-5");
    }

    #[test]
    fn augmented_unison_is_ascending() {
        let i = iv("C4", "C#4");
        assert_eq!(i.direction, Direction::Ascending);
        assert_eq!(i.quality, Quality::Augmented(1));
    }

    #[test]
    fn label_ordering() {
        assert_eq!(compare_labels("m3", "M3"), Ordering::Less);
        assert_eq!(compare_labels("A4", "d5"), Ordering::Less);
        assert_eq!(compare_labels("d4", "A4"), Ordering::Less);
        assert_eq!(compare_labels("-m3", "m3"), Ordering::Equal);
        assert_eq!(compare_labels("3 +4 7", "5 +2 4"), Ordering::Less);
        assert_eq!(compare_labels("M3 1 m2", "M3 1 M2"), Ordering::Less);
        assert_eq!(compare_labels("3 -2 3", "3 -2 3 -2 3"), Ordering::Less);
        assert_eq!(compare_labels("P8", "Rest"), Ordering::Less);
    }
}
