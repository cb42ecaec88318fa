//! Aggregation of extracted objects into a result set.

use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::str::FromStr;
use tracing::debug;

use crate::extract::{ExtractedObject, OffsetSpan};
use crate::interval::compare_labels;
use crate::kind::{ObjectKind, RenderContract};
use crate::resolver::ExperimentConfiguration;

/// Order of a frequency table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SortKey {
    /// Most frequent first; equal counts in order of first appearance.
    #[default]
    Frequency,
    /// Musical order for interval labels, lexical otherwise.
    Label,
}

impl fmt::Display for SortKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SortKey::Frequency => f.write_str("frequency"),
            SortKey::Label => f.write_str("label"),
        }
    }
}

impl FromStr for SortKey {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "frequency" | "freq" | "count" => Ok(SortKey::Frequency),
            "label" | "name" => Ok(SortKey::Label),
            other => Err(format!("unknown sort key: {other}")),
        }
    }
}

/// Direction of a frequency table's order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SortOrder {
    Ascending,
    /// Highest count first, or the last label first when sorting by label.
    #[default]
    Descending,
}

impl fmt::Display for SortOrder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SortOrder::Ascending => f.write_str("ascending"),
            SortOrder::Descending => f.write_str("descending"),
        }
    }
}

impl FromStr for SortOrder {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "ascending" | "asc" => Ok(SortOrder::Ascending),
            "descending" | "desc" => Ok(SortOrder::Descending),
            other => Err(format!("unknown sort order: {other}")),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LabelCount {
    pub label: String,
    pub count: usize,
}

/// One label placed on one part at one offset.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Annotation {
    pub part: usize,
    pub offset: u64,
    pub label: String,
}

/// Where an n-gram was first heard.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NGramContext {
    pub parts: Vec<usize>,
    pub span: OffsetSpan,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SummaryEntry {
    pub label: String,
    pub count: usize,
    pub context: NGramContext,
}

/// Output of one experiment. Built fresh per run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "shape", content = "entries", rename_all = "snake_case")]
pub enum ResultSet {
    Frequencies(Vec<LabelCount>),
    /// Sorted by part, then offset.
    Annotations(Vec<Annotation>),
    Summary(Vec<SummaryEntry>),
}

impl ResultSet {
    pub fn len(&self) -> usize {
        match self {
            ResultSet::Frequencies(entries) => entries.len(),
            ResultSet::Annotations(entries) => entries.len(),
            ResultSet::Summary(entries) => entries.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn contract(&self) -> RenderContract {
        match self {
            ResultSet::Frequencies(_) => RenderContract::FrequencyTable,
            ResultSet::Annotations(_) => RenderContract::AnnotatedScore,
            ResultSet::Summary(_) => RenderContract::SummaryScore,
        }
    }

    /// Annotations keyed by `(part, offset)`; empty for other shapes.
    pub fn annotation_map(&self) -> BTreeMap<(usize, u64), &str> {
        match self {
            ResultSet::Annotations(entries) => entries
                .iter()
                .map(|a| ((a.part, a.offset), a.label.as_str()))
                .collect(),
            _ => BTreeMap::new(),
        }
    }
}

/// Run a validated configuration over extracted objects.
pub fn run_experiment(config: &ExperimentConfiguration, objects: &[ExtractedObject]) -> ResultSet {
    let result = match config.contract() {
        RenderContract::FrequencyTable => {
            frequency_table(config.object_kind, objects, config.threshold, config.sort, config.sort_order)
        }
        RenderContract::AnnotatedScore => annotate(config.object_kind, objects),
        RenderContract::SummaryScore => summarize(objects, config.top_k.unwrap_or(0)),
    };
    debug!(
        kind = %config.object_kind,
        mode = %config.display_mode,
        objects = objects.len(),
        entries = result.len(),
        "experiment finished"
    );
    result
}

struct Tally<'a> {
    count: usize,
    first: &'a ExtractedObject,
}

/// Count labels, remembering the first object seen with each.
fn tally(objects: &[ExtractedObject]) -> Vec<(&str, Tally<'_>)> {
    let mut order: Vec<&str> = Vec::new();
    let mut counts: HashMap<&str, Tally<'_>> = HashMap::new();
    for object in objects {
        counts
            .entry(object.label.as_str())
            .and_modify(|t| t.count += 1)
            .or_insert_with(|| {
                order.push(object.label.as_str());
                Tally { count: 1, first: object }
            });
    }
    order
        .into_iter()
        .filter_map(|label| counts.remove(label).map(|t| (label, t)))
        .collect()
}

fn frequency_table(
    kind: ObjectKind,
    objects: &[ExtractedObject],
    threshold: Option<usize>,
    sort: SortKey,
    order: SortOrder,
) -> ResultSet {
    let mut tallies = tally(objects);
    if let Some(threshold) = threshold {
        tallies.retain(|(_, t)| t.count >= threshold);
    }

    let directed = |ordering: Ordering| match order {
        SortOrder::Ascending => ordering,
        SortOrder::Descending => ordering.reverse(),
    };
    // Equal counts stay in order of first appearance either way.
    match sort {
        SortKey::Frequency => tallies.sort_by(|(_, a), (_, b)| {
            directed(a.count.cmp(&b.count)).then(a.first.span.start.cmp(&b.first.span.start))
        }),
        SortKey::Label => tallies.sort_by(|(a, _), (b, _)| directed(compare_by_kind(kind, a, b))),
    }

    ResultSet::Frequencies(
        tallies
            .into_iter()
            .map(|(label, t)| LabelCount {
                label: label.to_string(),
                count: t.count,
            })
            .collect(),
    )
}

fn compare_by_kind(kind: ObjectKind, a: &str, b: &str) -> Ordering {
    match kind {
        ObjectKind::Interval | ObjectKind::IntervalNGram => compare_labels(a, b).then_with(|| a.cmp(b)),
        ObjectKind::Note | ObjectKind::Chord => a.cmp(b),
    }
}

fn annotate(kind: ObjectKind, objects: &[ExtractedObject]) -> ResultSet {
    let mut entries: Vec<Annotation> = objects
        .iter()
        .filter_map(|object| {
            let part = match kind {
                ObjectKind::Interval => object.combination.lowest(),
                _ => object.combination.parts().first().copied(),
            }?;
            Some(Annotation {
                part,
                offset: object.span.start,
                label: object.label.clone(),
            })
        })
        .collect();
    entries.sort_by_key(|a| (a.part, a.offset));
    ResultSet::Annotations(entries)
}

fn summarize(objects: &[ExtractedObject], top_k: usize) -> ResultSet {
    let mut tallies = tally(objects);
    tallies.sort_by(|(la, a), (lb, b)| b.count.cmp(&a.count).then_with(|| la.cmp(lb)));
    tallies.truncate(top_k);

    ResultSet::Summary(
        tallies
            .into_iter()
            .map(|(label, t)| SummaryEntry {
                label: label.to_string(),
                count: t.count,
                context: NGramContext {
                    parts: t.first.combination.parts().to_vec(),
                    span: t.first.span,
                },
            })
            .collect(),
    )
}
