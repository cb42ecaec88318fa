//! Chord-symbol interpretation of a sampled sonority.
//!
//! Chord objects are grouped by their literal pitch collection; the symbol
//! found here rides along for renderers that want `G7` instead of
//! `G2 B3 D4 F4`.

use serde::{Deserialize, Serialize};

use crate::pitch::Pitch;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChordQuality {
    Major,
    Minor,
    Diminished,
    Augmented,
    Suspended4,
    Suspended2,
    Dominant7,
    Major7,
    Minor7,
    Diminished7,
    HalfDiminished7,
    Power,
}

struct Template {
    quality: ChordQuality,
    suffix: &'static str,
    /// Bit i set when the template contains the pitch class `root + i`.
    mask: u16,
    size: u32,
}

impl Template {
    const fn new(quality: ChordQuality, suffix: &'static str, intervals: &[u8]) -> Self {
        let mut mask = 0u16;
        let mut i = 0;
        while i < intervals.len() {
            mask |= 1 << intervals[i];
            i += 1;
        }
        Self {
            quality,
            suffix,
            mask,
            size: intervals.len() as u32,
        }
    }
}

/// Sevenths first so a complete seventh chord beats its triad subset.
static TEMPLATES: &[Template] = &[
    Template::new(ChordQuality::Dominant7, "7", &[0, 4, 7, 10]),
    Template::new(ChordQuality::Major7, "maj7", &[0, 4, 7, 11]),
    Template::new(ChordQuality::Minor7, "m7", &[0, 3, 7, 10]),
    Template::new(ChordQuality::Diminished7, "dim7", &[0, 3, 6, 9]),
    Template::new(ChordQuality::HalfDiminished7, "m7b5", &[0, 3, 6, 10]),
    Template::new(ChordQuality::Major, "", &[0, 4, 7]),
    Template::new(ChordQuality::Minor, "m", &[0, 3, 7]),
    Template::new(ChordQuality::Diminished, "dim", &[0, 3, 6]),
    Template::new(ChordQuality::Augmented, "aug", &[0, 4, 8]),
    Template::new(ChordQuality::Suspended4, "sus4", &[0, 5, 7]),
    Template::new(ChordQuality::Suspended2, "sus2", &[0, 2, 7]),
    Template::new(ChordQuality::Power, "5", &[0, 7]),
];

const SHARP_NAMES: [&str; 12] = ["C", "C#", "D", "D#", "E", "F", "F#", "G", "G#", "A", "A#", "B"];
const FLAT_NAMES: [&str; 12] = ["C", "Db", "D", "Eb", "E", "F", "Gb", "G", "Ab", "A", "Bb", "B"];

/// A recognized chord.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChordSymbol {
    pub root_pitch_class: u8,
    pub quality: ChordQuality,
    /// `C`, `Dm`, `G7`, `F#dim`, ...
    pub symbol: String,
}

/// Name the sonority, or `None` when no template fits well enough.
///
/// Every template tone must be present and extra tones are penalized; the
/// bass note breaks ties between roots. Flats are used for spelling when the
/// sonority itself contains a flat.
pub fn name_chord(pitches: &[Pitch]) -> Option<ChordSymbol> {
    let bass = pitches.iter().min()?.pitch_class();
    let mask = pitches
        .iter()
        .fold(0u16, |m, p| m | 1 << p.pitch_class());
    if mask.count_ones() < 2 {
        return None;
    }
    let use_flats = pitches.iter().any(|p| p.alter() < 0);

    let mut best: Option<(f64, u8, &Template)> = None;
    for root in 0..12u8 {
        let relative = relative_mask(mask, root);
        for template in TEMPLATES {
            if relative & template.mask != template.mask {
                continue;
            }
            let extra = (relative & !template.mask).count_ones();
            let mut score = template.size as f64 - extra as f64 * 0.5;
            if root == bass {
                score += 0.25;
            }
            if best.map_or(true, |(s, _, _)| score > s) {
                best = Some((score, root, template));
            }
        }
    }

    best.map(|(_, root, template)| {
        let names = if use_flats { &FLAT_NAMES } else { &SHARP_NAMES };
        ChordSymbol {
            root_pitch_class: root,
            quality: template.quality,
            symbol: format!("{}{}", names[root as usize], template.suffix),
        }
    })
}

/// Neo-Riemannian move from one triad to the next.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChordTransformation {
    /// Same root, same quality.
    Identity,
    /// Same root, opposite quality.
    Parallel,
    /// Major to the minor a major third up, or back.
    Leittonwechsel,
    /// Major to the minor a minor third down, or back.
    Relative,
}

impl ChordTransformation {
    pub fn as_str(&self) -> &'static str {
        match self {
            ChordTransformation::Identity => "I",
            ChordTransformation::Parallel => "P",
            ChordTransformation::Leittonwechsel => "L",
            ChordTransformation::Relative => "R",
        }
    }
}

impl std::fmt::Display for ChordTransformation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// How to get from `from` to `to`, when both are major or minor triads
/// related by a single move.
pub fn transformation(from: &ChordSymbol, to: &ChordSymbol) -> Option<ChordTransformation> {
    use ChordQuality::{Major, Minor};

    let up = (to.root_pitch_class + 12 - from.root_pitch_class) % 12;
    match (from.quality, to.quality, up) {
        (Major, Major, 0) | (Minor, Minor, 0) => Some(ChordTransformation::Identity),
        (Major, Minor, 0) | (Minor, Major, 0) => Some(ChordTransformation::Parallel),
        (Major, Minor, 4) | (Minor, Major, 8) => Some(ChordTransformation::Leittonwechsel),
        (Major, Minor, 9) | (Minor, Major, 3) => Some(ChordTransformation::Relative),
        _ => None,
    }
}

/// Re-express a pitch-class mask as intervals above `root`.
fn relative_mask(mask: u16, root: u8) -> u16 {
    (0..12u8)
        .filter(|pc| mask & (1 << pc) != 0)
        .fold(0u16, |m, pc| m | 1 << ((pc + 12 - root) % 12))
}
