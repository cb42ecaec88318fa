//! Immutable piece data as handed over by an importer.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use crate::error::{Error, Result};
use crate::interval::REST_LABEL;
use crate::pitch::Pitch;

/// Tick resolution used when a piece does not declare one.
pub const DEFAULT_TICKS_PER_QUARTER: u32 = 480;

/// What a part sounds during one event.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Sounding {
    Rest,
    Note(Pitch),
    /// Several simultaneous pitches within one part.
    Chord(Vec<Pitch>),
}

impl Sounding {
    pub fn is_rest(&self) -> bool {
        match self {
            Sounding::Rest => true,
            Sounding::Note(_) => false,
            Sounding::Chord(pitches) => pitches.is_empty(),
        }
    }

    pub fn pitches(&self) -> &[Pitch] {
        match self {
            Sounding::Rest => &[],
            Sounding::Note(pitch) => std::slice::from_ref(pitch),
            Sounding::Chord(pitches) => pitches,
        }
    }

    /// Highest sounding pitch (skyline), used when a chord meets an interval.
    pub fn top(&self) -> Option<Pitch> {
        self.pitches().iter().copied().max()
    }

    /// Lowest sounding pitch.
    pub fn bottom(&self) -> Option<Pitch> {
        self.pitches().iter().copied().min()
    }

    /// Canonical text: pitch name, chord members low to high, or `Rest`.
    pub fn label(&self) -> String {
        if self.is_rest() {
            return REST_LABEL.to_string();
        }
        let mut pitches = self.pitches().to_vec();
        pitches.sort();
        pitches.dedup();
        pitches
            .iter()
            .map(Pitch::to_string)
            .collect::<Vec<_>>()
            .join(" ")
    }
}

/// One note, rest, or chord in a part.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Event {
    /// Onset in ticks from the start of the piece.
    pub onset: u64,
    /// Duration in ticks.
    pub duration: u64,
    pub sounding: Sounding,
}

impl Event {
    pub fn new(onset: u64, duration: u64, sounding: Sounding) -> Self {
        Self {
            onset,
            duration,
            sounding,
        }
    }

    pub fn end(&self) -> u64 {
        self.onset.saturating_add(self.duration)
    }
}

/// A single instrumental or vocal line.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Part {
    pub name: String,
    pub events: Vec<Event>,
}

impl Part {
    pub fn new(name: impl Into<String>, events: Vec<Event>) -> Self {
        Self {
            name: name.into(),
            events,
        }
    }

    /// End of the last event, or 0 for an empty part.
    pub fn end(&self) -> u64 {
        self.events.last().map(Event::end).unwrap_or(0)
    }

    fn validate(&self, index: usize) -> Result<()> {
        for pair in self.events.windows(2) {
            if pair[1].onset < pair[0].end() {
                return Err(Error::Piece(format!(
                    "part {index} ({}): event at tick {} overlaps the event at tick {}",
                    self.name, pair[1].onset, pair[0].onset
                )));
            }
        }
        Ok(())
    }
}

#[derive(Deserialize)]
struct PieceData {
    title: String,
    #[serde(default)]
    source: String,
    #[serde(default = "default_ticks_per_quarter")]
    ticks_per_quarter: u32,
    parts: Vec<Part>,
}

fn default_ticks_per_quarter() -> u32 {
    DEFAULT_TICKS_PER_QUARTER
}

/// A complete piece: title, source identifier, parts, and duration.
///
/// Built once and never mutated; metadata corrections produce a new piece.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "PieceData")]
pub struct Piece {
    pub title: String,
    /// Disambiguates same-titled works (file path, catalogue number, ...).
    pub source: String,
    pub ticks_per_quarter: u32,
    /// End of the latest event across all parts, in ticks.
    pub duration: u64,
    pub parts: Vec<Part>,
}

impl Piece {
    /// Build a piece, checking each part's events are ordered and do not overlap.
    ///
    /// `source` must be non-empty: analyses are cached by it, so two pieces
    /// sharing a title are told apart only through their sources.
    pub fn new(
        title: impl Into<String>,
        source: impl Into<String>,
        ticks_per_quarter: u32,
        parts: Vec<Part>,
    ) -> Result<Self> {
        if parts.is_empty() {
            return Err(Error::Piece("a piece needs at least one part".into()));
        }
        let source = source.into();
        if source.trim().is_empty() {
            return Err(Error::Piece("a piece needs a source identifier".into()));
        }
        if ticks_per_quarter == 0 {
            return Err(Error::Piece("ticks_per_quarter must be positive".into()));
        }
        for (index, part) in parts.iter().enumerate() {
            part.validate(index)?;
        }

        let duration = parts.iter().map(Part::end).max().unwrap_or(0);
        Ok(Self {
            title: title.into(),
            source,
            ticks_per_quarter,
            duration,
            parts,
        })
    }

    pub fn from_json(json: &str) -> Result<Self> {
        serde_json::from_str(json).map_err(|e| Error::Piece(e.to_string()))
    }

    /// Like [`Piece::from_json`], using `fallback_source` (typically the file
    /// path) when the document names no source.
    pub fn from_json_with_source(json: &str, fallback_source: &str) -> Result<Self> {
        let mut data: PieceData = serde_json::from_str(json).map_err(|e| Error::Piece(e.to_string()))?;
        if data.source.trim().is_empty() {
            data.source = fallback_source.to_string();
        }
        Piece::try_from(data)
    }

    pub fn part_names(&self) -> Vec<&str> {
        self.parts.iter().map(|p| p.name.as_str()).collect()
    }

    /// Apply corrected metadata, returning a new piece.
    pub fn with_corrections(&self, correction: &MetadataCorrection) -> Result<Self> {
        let mut piece = self.clone();
        if let Some(title) = &correction.title {
            piece.title = title.clone();
        }
        for (&index, name) in &correction.part_names {
            let part = piece.parts.get_mut(index).ok_or_else(|| {
                Error::Piece(format!("cannot rename part {index}: piece has {} parts", self.parts.len()))
            })?;
            part.name = name.clone();
        }
        Ok(piece)
    }
}

impl TryFrom<PieceData> for Piece {
    type Error = Error;

    fn try_from(data: PieceData) -> Result<Self> {
        Piece::new(data.title, data.source, data.ticks_per_quarter, data.parts)
    }
}

/// Corrected title and part names from a metadata editor.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MetadataCorrection {
    pub title: Option<String>,
    /// Part index → new name.
    #[serde(default)]
    pub part_names: BTreeMap<usize, String>,
}

/// Ordered selection of parts analyzed together, listed top-down.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PartCombination(Vec<usize>);

impl PartCombination {
    pub fn new(parts: impl Into<Vec<usize>>) -> Self {
        Self(parts.into())
    }

    /// Every pair `(upper, lower)` with `upper < lower`, in score order.
    pub fn all_pairs(part_count: usize) -> Vec<PartCombination> {
        let mut pairs = Vec::new();
        for upper in 0..part_count {
            for lower in upper + 1..part_count {
                pairs.push(PartCombination(vec![upper, lower]));
            }
        }
        pairs
    }

    pub fn parts(&self) -> &[usize] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Lowest listed voice.
    pub fn lowest(&self) -> Option<usize> {
        self.0.last().copied()
    }
}

impl fmt::Display for PartCombination {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let parts: Vec<String> = self.0.iter().map(usize::to_string).collect();
        write!(f, "[{}]", parts.join(","))
    }
}

impl FromStr for PartCombination {
    type Err = String;

    /// Parses `0,1` or `[0, 1]`.
    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        let inner = s.trim().trim_start_matches('[').trim_end_matches(']');
        if inner.trim().is_empty() {
            return Ok(PartCombination(Vec::new()));
        }
        inner
            .split(',')
            .map(|p| {
                p.trim()
                    .parse::<usize>()
                    .map_err(|_| format!("invalid part index: {:?}", p.trim()))
            })
            .collect::<std::result::Result<Vec<_>, _>>()
            .map(PartCombination)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn note(onset: u64, duration: u64, pitch: &str) -> Event {
        Event::new(onset, duration, Sounding::Note(pitch.parse().unwrap()))
    }

    #[test]
    fn duration_is_latest_end() {
        let piece = Piece::new(
            "Kyrie",
            "kyrie.json",
            480,
            vec![
                Part::new("Superius", vec![note(0, 480, "C5"), note(480, 960, "D5")]),
                Part::new("Bassus", vec![note(0, 480, "C3")]),
            ],
        )
        .unwrap();
        assert_eq!(piece.duration, 1440);
    }

    #[test]
    fn source_is_required() {
        let parts = || vec![Part::new("Tenor", vec![note(0, 480, "C4")])];
        assert!(matches!(Piece::new("Ave Maria", "", 480, parts()), Err(Error::Piece(_))));
        assert!(matches!(Piece::new("Ave Maria", "  ", 480, parts()), Err(Error::Piece(_))));

        let json = r#"{"title": "Ave Maria", "parts": [{"name": "Tenor", "events": []}]}"#;
        assert!(Piece::from_json(json).is_err());
        let piece = Piece::from_json_with_source(json, "victoria/ave.json").unwrap();
        assert_eq!(piece.source, "victoria/ave.json");

        let named = r#"{"title": "Ave Maria", "source": "josquin/ave.xml", "parts": [{"name": "Tenor", "events": []}]}"#;
        let piece = Piece::from_json_with_source(named, "ignored.json").unwrap();
        assert_eq!(piece.source, "josquin/ave.xml");
    }

    #[test]
    fn overlapping_events_rejected() {
        let result = Piece::new(
            "Bad",
            "bad.json",
            480,
            vec![Part::new("Tenor", vec![note(0, 480, "C4"), note(240, 480, "D4")])],
        );
        assert!(matches!(result, Err(Error::Piece(_))));
    }

    #[test]
    fn json_roundtrip_computes_duration() {
        let json = r#"{
            "title": "Ave Maria",
            "source": "josquin/ave.xml",
            "parts": [
                {"name": "Soprano", "events": [
                    {"onset": 0, "duration": 480, "sounding": {"note": "G4"}},
                    {"onset": 480, "duration": 480, "sounding": "rest"}
                ]},
                {"name": "Alto", "events": [
                    {"onset": 0, "duration": 960, "sounding": {"chord": ["C4", "E4"]}}
                ]}
            ]
        }"#;
        let piece = Piece::from_json(json).unwrap();
        assert_eq!(piece.ticks_per_quarter, DEFAULT_TICKS_PER_QUARTER);
        assert_eq!(piece.duration, 960);
        assert_eq!(piece.parts[1].events[0].sounding.label(), "C4 E4");
        assert!(piece.parts[0].events[1].sounding.is_rest());
    }

    #[test]
    fn corrections_produce_new_piece() {
        let piece = Piece::new(
            "untitled",
            "a.xml",
            480,
            vec![Part::new("Part 1", vec![note(0, 480, "C4")])],
        )
        .unwrap();
        let mut correction = MetadataCorrection {
            title: Some("Missa Pange Lingua".into()),
            ..Default::default()
        };
        correction.part_names.insert(0, "Cantus".into());

        let fixed = piece.with_corrections(&correction).unwrap();
        assert_eq!(fixed.title, "Missa Pange Lingua");
        assert_eq!(fixed.part_names(), vec!["Cantus"]);
        assert_eq!(piece.title, "untitled");

        correction.part_names.insert(3, "Nobody".into());
        assert!(piece.with_corrections(&correction).is_err());
    }

    #[test]
    fn all_pairs_in_score_order() {
        let pairs = PartCombination::all_pairs(3);
        assert_eq!(
            pairs,
            vec![
                PartCombination::new([0, 1]),
                PartCombination::new([0, 2]),
                PartCombination::new([1, 2]),
            ]
        );
        assert!(PartCombination::all_pairs(1).is_empty());
    }

    #[test]
    fn combination_parsing() {
        assert_eq!("0,2".parse::<PartCombination>(), Ok(PartCombination::new([0, 2])));
        assert_eq!("[1, 3]".parse::<PartCombination>(), Ok(PartCombination::new([1, 3])));
        assert!("a,b".parse::<PartCombination>().is_err());
        assert_eq!(PartCombination::new([0, 1]).to_string(), "[0,1]");
    }
}
