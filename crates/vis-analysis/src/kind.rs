//! Object kinds, display modes, and rendering contracts.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// What an experiment extracts from the sampled material.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ObjectKind {
    Note,
    Interval,
    IntervalNGram,
    Chord,
}

impl ObjectKind {
    pub const ALL: [ObjectKind; 4] = [
        ObjectKind::Note,
        ObjectKind::Interval,
        ObjectKind::IntervalNGram,
        ObjectKind::Chord,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ObjectKind::Note => "note",
            ObjectKind::Interval => "interval",
            ObjectKind::IntervalNGram => "interval_ngram",
            ObjectKind::Chord => "chord",
        }
    }
}

impl fmt::Display for ObjectKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ObjectKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().replace('-', "_").as_str() {
            "note" | "notes" => Ok(ObjectKind::Note),
            "interval" | "intervals" => Ok(ObjectKind::Interval),
            "interval_ngram" | "ngram" | "ngrams" => Ok(ObjectKind::IntervalNGram),
            "chord" | "chords" => Ok(ObjectKind::Chord),
            other => Err(format!("unknown object kind: {other}")),
        }
    }
}

/// How a result is meant to be presented.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DisplayMode {
    List,
    Score,
}

impl DisplayMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            DisplayMode::List => "list",
            DisplayMode::Score => "score",
        }
    }
}

impl fmt::Display for DisplayMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DisplayMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "list" => Ok(DisplayMode::List),
            "score" => Ok(DisplayMode::Score),
            other => Err(format!("unknown display mode: {other}")),
        }
    }
}

/// Which drawing routine a renderer must use for a result.
///
/// `AnnotatedScore` and `SummaryScore` are distinct contracts: the first
/// overlays every label on the original material, the second draws only the
/// top-K n-grams with their counts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RenderContract {
    FrequencyTable,
    AnnotatedScore,
    SummaryScore,
}

/// Number of parts an object kind accepts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Arity {
    Exactly(usize),
    AtLeast(usize),
}

impl Arity {
    pub fn accepts(&self, parts: usize) -> bool {
        match *self {
            Arity::Exactly(n) => parts == n,
            Arity::AtLeast(n) => parts >= n,
        }
    }
}

impl fmt::Display for Arity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Arity::Exactly(n) => write!(f, "exactly {n}"),
            Arity::AtLeast(n) => write!(f, "at least {n}"),
        }
    }
}
