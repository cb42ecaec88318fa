//! Error taxonomy for the analysis pipeline.
//!
//! Every error is local to the invocation that produced it. Cached indices
//! stay valid after any of these is returned.

use thiserror::Error;

use crate::kind::{Arity, DisplayMode, ObjectKind};

/// An invalid or incompatible experiment configuration field.
///
/// Always names the offending field so a caller can correct it and retry
/// without re-running analysis.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ConfigError {
    #[error("{field}: display mode {mode} is not available for {kind} (available: {available})")]
    DisplayModeUnavailable {
        field: &'static str,
        kind: ObjectKind,
        mode: DisplayMode,
        available: String,
    },

    #[error("{field}: not enabled for {kind} in {mode} mode; reset it before switching")]
    FieldNotEnabled {
        field: &'static str,
        kind: ObjectKind,
        mode: DisplayMode,
    },

    #[error("{field}: required for {kind} in {mode} mode")]
    MissingField {
        field: &'static str,
        kind: ObjectKind,
        mode: DisplayMode,
    },

    #[error("{field}: {message}")]
    OutOfRange { field: &'static str, message: String },

    #[error("{field}: {kind} needs {required} parts, got {actual}")]
    Arity {
        field: &'static str,
        kind: ObjectKind,
        required: Arity,
        actual: usize,
    },
}

impl ConfigError {
    /// Name of the configuration field that caused the error.
    pub fn field(&self) -> &'static str {
        match self {
            ConfigError::DisplayModeUnavailable { field, .. }
            | ConfigError::FieldNotEnabled { field, .. }
            | ConfigError::MissingField { field, .. }
            | ConfigError::OutOfRange { field, .. }
            | ConfigError::Arity { field, .. } => field,
        }
    }
}

/// The sampling grid cannot be built.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum SamplingError {
    #[error("offset interval must be a positive finite number, got {0}")]
    NonPositiveInterval(f64),

    #[error("offset interval {interval} is finer than one tick at {ticks_per_quarter} ticks per quarter")]
    BelowResolution { interval: f64, ticks_per_quarter: u32 },
}

/// Objects cannot be extracted from the requested combination.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ExtractionError {
    #[error("{kind} needs {required} parts, combination has {actual}")]
    Arity {
        kind: ObjectKind,
        required: Arity,
        actual: usize,
    },

    #[error("part {index} does not exist (piece has {available} parts)")]
    UnknownPart { index: usize, available: usize },

    #[error("part combination is empty")]
    EmptyCombination,

    #[error("n-gram length must be at least 1")]
    ZeroLengthNGram,
}

/// Failure of one analyze invocation.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum AnalyzeError {
    #[error(transparent)]
    Sampling(#[from] SamplingError),

    #[error(transparent)]
    Extraction(#[from] ExtractionError),

    #[error("analysis cancelled")]
    Cancelled,

    #[error("analysis task failed: {0}")]
    Task(String),
}

/// Crate-level error.
#[derive(Debug, Error)]
pub enum Error {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Sampling(#[from] SamplingError),

    #[error(transparent)]
    Extraction(#[from] ExtractionError),

    #[error(transparent)]
    Analyze(#[from] AnalyzeError),

    #[error("invalid piece: {0}")]
    Piece(String),
}

pub type Result<T> = std::result::Result<T, Error>;
