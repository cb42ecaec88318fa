//! Configuration dependency rules.
//!
//! Which fields an experiment may set depends on its object kind and display
//! mode. The rules live in one static table and every check goes through it,
//! so a front end only has to ask.

use serde::{Deserialize, Serialize};
use std::collections::HashSet;

use crate::error::ConfigError;
use crate::experiment::{SortKey, SortOrder};
use crate::extract::{required_arity, ExtractParams};
use crate::interval::LabelSettings;
use crate::kind::{DisplayMode, ObjectKind, RenderContract};
use crate::piece::{PartCombination, Piece};
use crate::sampler::{OffsetGrid, Repeats, Sampling};

/// Sampling interval used when a request leaves it out, in quarter lengths.
pub const DEFAULT_OFFSET_INTERVAL: f64 = 1.0;

pub mod field {
    pub const OBJECT_KIND: &str = "object_kind";
    pub const DISPLAY_MODE: &str = "display_mode";
    pub const N: &str = "n";
    pub const TOP_K: &str = "top_k";
    pub const PART_COMBINATION: &str = "part_combination";
    pub const OFFSET_INTERVAL: &str = "offset_interval";
    pub const THRESHOLD: &str = "threshold";
    pub const SORT: &str = "sort";
    pub const SORT_ORDER: &str = "sort_order";
    pub const LABELS: &str = "labels";
    pub const REPEATS: &str = "repeats";

    /// Every field name, in presentation order.
    pub const ALL: [&str; 11] = [
        OBJECT_KIND,
        DISPLAY_MODE,
        N,
        TOP_K,
        PART_COMBINATION,
        OFFSET_INTERVAL,
        REPEATS,
        THRESHOLD,
        SORT,
        SORT_ORDER,
        LABELS,
    ];
}

struct Compatibility {
    kind: ObjectKind,
    modes: &'static [DisplayMode],
    n: bool,
    /// Enabled in Score mode only.
    top_k: bool,
}

static COMPATIBILITY: [Compatibility; 4] = [
    Compatibility {
        kind: ObjectKind::Note,
        modes: &[DisplayMode::List, DisplayMode::Score],
        n: false,
        top_k: false,
    },
    Compatibility {
        kind: ObjectKind::Interval,
        modes: &[DisplayMode::List, DisplayMode::Score],
        n: false,
        top_k: false,
    },
    Compatibility {
        kind: ObjectKind::IntervalNGram,
        modes: &[DisplayMode::List, DisplayMode::Score],
        n: true,
        top_k: true,
    },
    Compatibility {
        kind: ObjectKind::Chord,
        modes: &[DisplayMode::List],
        n: false,
        top_k: false,
    },
];

fn rules(kind: ObjectKind) -> &'static Compatibility {
    &COMPATIBILITY[kind as usize]
}

/// Display modes an object kind supports, in presentation order.
pub fn available_display_modes(kind: ObjectKind) -> Vec<DisplayMode> {
    rules(kind).modes.to_vec()
}

/// Whether a configuration field may hold a non-default value. Unknown
/// field names are never enabled.
pub fn is_enabled(kind: ObjectKind, mode: DisplayMode, name: &str) -> bool {
    let rules = rules(kind);
    match name {
        field::N => rules.n,
        field::TOP_K => rules.top_k && mode == DisplayMode::Score,
        field::THRESHOLD | field::SORT | field::SORT_ORDER => mode == DisplayMode::List,
        field::OBJECT_KIND
        | field::DISPLAY_MODE
        | field::PART_COMBINATION
        | field::OFFSET_INTERVAL
        | field::REPEATS
        | field::LABELS => true,
        _ => false,
    }
}

/// Rendering contract for a kind and mode, or `None` if the mode is unavailable.
pub fn contract(kind: ObjectKind, mode: DisplayMode) -> Option<RenderContract> {
    if !rules(kind).modes.contains(&mode) {
        return None;
    }
    Some(contract_of(kind, mode))
}

fn contract_of(kind: ObjectKind, mode: DisplayMode) -> RenderContract {
    match (mode, kind) {
        (DisplayMode::List, _) => RenderContract::FrequencyTable,
        (DisplayMode::Score, ObjectKind::IntervalNGram) => RenderContract::SummaryScore,
        (DisplayMode::Score, _) => RenderContract::AnnotatedScore,
    }
}

/// A possibly incomplete experiment description.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ExperimentRequest {
    pub object_kind: Option<ObjectKind>,
    pub display_mode: Option<DisplayMode>,
    pub n: Option<usize>,
    pub top_k: Option<usize>,
    pub part_combination: Option<PartCombination>,
    pub offset_interval: Option<f64>,
    pub threshold: Option<usize>,
    pub sort: Option<SortKey>,
    pub sort_order: Option<SortOrder>,
    pub labels: Option<LabelSettings>,
    pub repeats: Option<Repeats>,
}

/// A validated experiment. Only built by [`resolve`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExperimentConfiguration {
    pub object_kind: ObjectKind,
    pub display_mode: DisplayMode,
    pub n: Option<usize>,
    pub top_k: Option<usize>,
    pub part_combination: PartCombination,
    /// Quarter lengths.
    pub offset_interval: f64,
    pub threshold: Option<usize>,
    pub sort: SortKey,
    pub sort_order: SortOrder,
    pub labels: LabelSettings,
    pub repeats: Repeats,
}

impl ExperimentConfiguration {
    pub fn contract(&self) -> RenderContract {
        contract_of(self.object_kind, self.display_mode)
    }

    pub fn sampling(&self) -> Sampling {
        Sampling::new(self.offset_interval, self.repeats)
    }

    pub fn extract_params(&self) -> ExtractParams {
        ExtractParams {
            n: self.n.unwrap_or(1),
            labels: self.labels,
        }
    }
}

impl From<&ExperimentConfiguration> for ExperimentRequest {
    fn from(config: &ExperimentConfiguration) -> Self {
        Self {
            object_kind: Some(config.object_kind),
            display_mode: Some(config.display_mode),
            n: config.n,
            top_k: config.top_k,
            part_combination: Some(config.part_combination.clone()),
            offset_interval: Some(config.offset_interval),
            threshold: config.threshold,
            sort: Some(config.sort),
            sort_order: Some(config.sort_order),
            labels: Some(config.labels),
            repeats: Some(config.repeats),
        }
    }
}

/// Validate a request against the compatibility rules.
///
/// A disabled field holding a value is an error naming that field; nothing
/// is cleared on the caller's behalf. When `piece` is given, part indices and
/// the sampling resolution are checked against it too.
pub fn resolve(request: &ExperimentRequest, piece: Option<&Piece>) -> Result<ExperimentConfiguration, ConfigError> {
    let kind = request.object_kind.unwrap_or(ObjectKind::Note);
    let modes = rules(kind).modes;
    let mode = request.display_mode.unwrap_or(modes[0]);

    if !modes.contains(&mode) {
        return Err(ConfigError::DisplayModeUnavailable {
            field: field::DISPLAY_MODE,
            kind,
            mode,
            available: modes
                .iter()
                .map(DisplayMode::as_str)
                .collect::<Vec<_>>()
                .join(", "),
        });
    }

    // A list-only ordering left at its default does not count as set, so a
    // stored default survives a switch to Score mode.
    let sort_is_default = request.sort.map_or(true, |s| s == SortKey::default());
    let order_is_default = request.sort_order.map_or(true, |o| o == SortOrder::default());
    let present = [
        (field::N, request.n.is_some()),
        (field::TOP_K, request.top_k.is_some()),
        (field::THRESHOLD, request.threshold.is_some()),
        (field::SORT, !sort_is_default),
        (field::SORT_ORDER, !order_is_default),
    ];
    for (name, set) in present {
        if set && !is_enabled(kind, mode, name) {
            return Err(ConfigError::FieldNotEnabled { field: name, kind, mode });
        }
    }

    let n = request.n;
    let top_k = request.top_k;
    if is_enabled(kind, mode, field::N) && n.is_none() {
        return Err(ConfigError::MissingField { field: field::N, kind, mode });
    }
    if is_enabled(kind, mode, field::TOP_K) && top_k.is_none() {
        return Err(ConfigError::MissingField {
            field: field::TOP_K,
            kind,
            mode,
        });
    }
    for (name, value) in [
        (field::N, n),
        (field::TOP_K, top_k),
        (field::THRESHOLD, request.threshold),
    ] {
        if value == Some(0) {
            return Err(ConfigError::OutOfRange {
                field: name,
                message: "must be at least 1".into(),
            });
        }
    }

    let offset_interval = request.offset_interval.unwrap_or(DEFAULT_OFFSET_INTERVAL);
    if !offset_interval.is_finite() || offset_interval <= 0.0 {
        return Err(ConfigError::OutOfRange {
            field: field::OFFSET_INTERVAL,
            message: format!("must be a positive number of quarter lengths, got {offset_interval}"),
        });
    }

    let part_combination = request
        .part_combination
        .clone()
        .ok_or(ConfigError::MissingField {
            field: field::PART_COMBINATION,
            kind,
            mode,
        })?;
    check_combination(kind, &part_combination)?;

    if let Some(piece) = piece {
        if let Some(&index) = part_combination.parts().iter().find(|&&i| i >= piece.parts.len()) {
            return Err(ConfigError::OutOfRange {
                field: field::PART_COMBINATION,
                message: format!("part {index} does not exist (piece has {} parts)", piece.parts.len()),
            });
        }
        OffsetGrid::new(offset_interval, piece.ticks_per_quarter).map_err(|e| ConfigError::OutOfRange {
            field: field::OFFSET_INTERVAL,
            message: e.to_string(),
        })?;
    }

    Ok(ExperimentConfiguration {
        object_kind: kind,
        display_mode: mode,
        n,
        top_k,
        part_combination,
        offset_interval,
        threshold: request.threshold,
        sort: request.sort.unwrap_or_default(),
        sort_order: request.sort_order.unwrap_or_default(),
        labels: request.labels.unwrap_or_default(),
        repeats: request.repeats.unwrap_or_default(),
    })
}

fn check_combination(kind: ObjectKind, combination: &PartCombination) -> Result<(), ConfigError> {
    let required = required_arity(kind);
    if !required.accepts(combination.len()) {
        return Err(ConfigError::Arity {
            field: field::PART_COMBINATION,
            kind,
            required,
            actual: combination.len(),
        });
    }
    let mut seen = HashSet::new();
    if let Some(dup) = combination.parts().iter().find(|&&p| !seen.insert(p)) {
        return Err(ConfigError::OutOfRange {
            field: field::PART_COMBINATION,
            message: format!("part {dup} is listed more than once"),
        });
    }
    Ok(())
}
