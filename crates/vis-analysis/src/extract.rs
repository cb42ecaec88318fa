//! Musical objects read off an analysis index.
//!
//! One strategy per object kind, dispatched through [`STRATEGIES`]. The same
//! table answers arity questions for the configuration resolver, so the two
//! can never disagree about how many parts a kind needs.

use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::debug;

use crate::chord_templates::{name_chord, transformation, ChordSymbol, ChordTransformation};
use crate::error::ExtractionError;
use crate::index::AnalysisIndex;
use crate::interval::{DirectionDisplay, HarmonicInterval, LabelSettings, NO_MOTION_LABEL, REST_LABEL};
use crate::kind::{Arity, ObjectKind};
use crate::piece::{PartCombination, Sounding};
use crate::pitch::Pitch;
use crate::sampler::SampledPoint;

/// The payload of an extracted object.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MusicalObject {
    Note(Sounding),
    /// `None` when either voice rests.
    Interval(Option<HarmonicInterval>),
    IntervalNGram(Vec<Option<HarmonicInterval>>),
    Chord {
        pitches: Vec<Pitch>,
        symbol: Option<ChordSymbol>,
        /// The move to the next sounding chord. `None` for the last chord,
        /// around rests, or when the two are not related triads.
        transformation: Option<ChordTransformation>,
    },
}

impl MusicalObject {
    pub fn kind(&self) -> ObjectKind {
        match self {
            MusicalObject::Note(_) => ObjectKind::Note,
            MusicalObject::Interval(_) => ObjectKind::Interval,
            MusicalObject::IntervalNGram(_) => ObjectKind::IntervalNGram,
            MusicalObject::Chord { .. } => ObjectKind::Chord,
        }
    }
}

/// Half-open tick range `[start, end)` covered by an object.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct OffsetSpan {
    pub start: u64,
    pub end: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExtractedObject {
    pub object: MusicalObject,
    pub combination: Arc<PartCombination>,
    pub span: OffsetSpan,
    /// Canonical text; objects with equal labels are the same for counting.
    pub label: String,
}

impl ExtractedObject {
    pub fn kind(&self) -> ObjectKind {
        self.object.kind()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExtractParams {
    /// Window length for interval n-grams; ignored by other kinds.
    pub n: usize,
    pub labels: LabelSettings,
}

impl Default for ExtractParams {
    fn default() -> Self {
        Self {
            n: 1,
            labels: LabelSettings::default(),
        }
    }
}

type ExtractFn = fn(&AnalysisIndex, &ExtractParams) -> Result<Vec<ExtractedObject>, ExtractionError>;

struct Strategy {
    kind: ObjectKind,
    arity: Arity,
    extract: ExtractFn,
}

static STRATEGIES: [Strategy; 4] = [
    Strategy {
        kind: ObjectKind::Note,
        arity: Arity::Exactly(1),
        extract: extract_notes,
    },
    Strategy {
        kind: ObjectKind::Interval,
        arity: Arity::Exactly(2),
        extract: extract_intervals,
    },
    Strategy {
        kind: ObjectKind::IntervalNGram,
        arity: Arity::Exactly(2),
        extract: extract_ngrams,
    },
    Strategy {
        kind: ObjectKind::Chord,
        arity: Arity::AtLeast(2),
        extract: extract_chords,
    },
];

fn strategy(kind: ObjectKind) -> &'static Strategy {
    // The table has one row per kind, in declaration order.
    &STRATEGIES[kind as usize]
}

/// Number of parts `kind` needs.
pub fn required_arity(kind: ObjectKind) -> Arity {
    strategy(kind).arity
}

/// Extract every object of `kind` from the index, in ascending offset order.
pub fn extract(
    index: &AnalysisIndex,
    kind: ObjectKind,
    params: &ExtractParams,
) -> Result<Vec<ExtractedObject>, ExtractionError> {
    let strategy = strategy(kind);
    debug_assert_eq!(strategy.kind, kind);

    let actual = index.part_count();
    if !strategy.arity.accepts(actual) {
        return Err(ExtractionError::Arity {
            kind,
            required: strategy.arity,
            actual,
        });
    }

    let objects = (strategy.extract)(index, params)?;
    debug!(
        source = %index.source,
        combination = %index.combination,
        kind = %kind,
        objects = objects.len(),
        "extracted objects"
    );
    Ok(objects)
}

fn point_span(index: &AnalysisIndex, point: &SampledPoint) -> OffsetSpan {
    OffsetSpan {
        start: point.offset,
        end: index.cell_end(point.offset),
    }
}

fn extract_notes(index: &AnalysisIndex, _: &ExtractParams) -> Result<Vec<ExtractedObject>, ExtractionError> {
    let timeline = index.timeline(0).unwrap_or_default();
    Ok(timeline
        .iter()
        .map(|point| ExtractedObject {
            label: point.sounding.label(),
            object: MusicalObject::Note(point.sounding.clone()),
            combination: Arc::clone(&index.combination),
            span: point_span(index, point),
        })
        .collect())
}

/// Vertical intervals, lower (second) part to upper (first) part.
fn vertical_intervals(index: &AnalysisIndex) -> Vec<Option<HarmonicInterval>> {
    let upper = index.timeline(0).unwrap_or_default();
    let lower = index.timeline(1).unwrap_or_default();
    upper
        .iter()
        .zip(lower)
        .map(|(u, l)| match (l.sounding.top(), u.sounding.top()) {
            (Some(low), Some(high)) => Some(HarmonicInterval::between(low, high)),
            _ => None,
        })
        .collect()
}

fn interval_label(interval: &Option<HarmonicInterval>, labels: &LabelSettings) -> String {
    match interval {
        Some(interval) => interval.label(labels),
        None => REST_LABEL.to_string(),
    }
}

fn extract_intervals(
    index: &AnalysisIndex,
    params: &ExtractParams,
) -> Result<Vec<ExtractedObject>, ExtractionError> {
    let upper = index.timeline(0).unwrap_or_default();
    Ok(vertical_intervals(index)
        .into_iter()
        .zip(upper)
        .map(|(interval, point)| ExtractedObject {
            label: interval_label(&interval, &params.labels),
            object: MusicalObject::Interval(interval),
            combination: Arc::clone(&index.combination),
            span: point_span(index, point),
        })
        .collect())
}

/// Melodic motion of the lowest voice between two adjacent points.
fn motion_label(from: &SampledPoint, to: &SampledPoint, labels: &LabelSettings) -> String {
    match (from.sounding.top(), to.sounding.top()) {
        (Some(a), Some(b)) => {
            HarmonicInterval::between(a, b).label_with_direction(labels, DirectionDisplay::Always)
        }
        _ => NO_MOTION_LABEL.to_string(),
    }
}

fn extract_ngrams(index: &AnalysisIndex, params: &ExtractParams) -> Result<Vec<ExtractedObject>, ExtractionError> {
    let n = params.n;
    if n == 0 {
        return Err(ExtractionError::ZeroLengthNGram);
    }

    let upper = index.timeline(0).unwrap_or_default();
    let lower = index.timeline(1).unwrap_or_default();
    let intervals = vertical_intervals(index);
    let labels: Vec<String> = intervals
        .iter()
        .map(|i| interval_label(i, &params.labels))
        .collect();

    let mut objects = Vec::with_capacity(intervals.len().saturating_sub(n - 1));
    for (start, window) in intervals.windows(n).enumerate() {
        let last = start + n - 1;
        let mut tokens = Vec::with_capacity(2 * n - 1);
        for i in start..=last {
            if i > start && params.labels.horizontal {
                tokens.push(motion_label(&lower[i - 1], &lower[i], &params.labels));
            }
            tokens.push(labels[i].clone());
        }

        objects.push(ExtractedObject {
            object: MusicalObject::IntervalNGram(window.to_vec()),
            combination: Arc::clone(&index.combination),
            span: OffsetSpan {
                start: upper[start].offset,
                end: index.cell_end(upper[last].offset),
            },
            label: tokens.join(" "),
        });
    }
    Ok(objects)
}

fn extract_chords(index: &AnalysisIndex, _: &ExtractParams) -> Result<Vec<ExtractedObject>, ExtractionError> {
    let timelines = index.timelines();
    let points = index.point_count();

    let verticals: Vec<Vec<Pitch>> = (0..points)
        .map(|i| {
            let mut pitches: Vec<Pitch> = timelines
                .iter()
                .flat_map(|t| t[i].sounding.pitches().iter().copied())
                .collect();
            pitches.sort();
            pitches.dedup();
            pitches
        })
        .collect();
    let symbols: Vec<Option<ChordSymbol>> = verticals.iter().map(|p| name_chord(p)).collect();

    let mut objects = Vec::with_capacity(points);
    for (i, pitches) in verticals.into_iter().enumerate() {
        let sounding = if pitches.is_empty() {
            Sounding::Rest
        } else {
            Sounding::Chord(pitches.clone())
        };
        let next = symbols.get(i + 1).and_then(Option::as_ref);
        let moves = symbols[i].as_ref().zip(next).and_then(|(from, to)| transformation(from, to));
        let point = &timelines[0][i];
        objects.push(ExtractedObject {
            label: sounding.label(),
            object: MusicalObject::Chord {
                symbol: symbols[i].clone(),
                transformation: moves,
                pitches,
            },
            combination: Arc::clone(&index.combination),
            span: point_span(index, point),
        });
    }
    Ok(objects)
}
