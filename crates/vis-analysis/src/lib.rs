//! Vertical-interval analysis over a corpus of pieces.
//!
//! The pipeline is linear and every stage is immutable:
//!
//! ```text
//! Piece ──Analyzer──▶ Arc<AnalysisIndex> ──extract──▶ objects ──run_experiment──▶ ResultSet
//! ```
//!
//! An index samples the parts of one combination on a fixed offset grid and is
//! cached by the [`Analyzer`]. Experiments are validated by the
//! [`resolver`] before they touch an index, so a rejected configuration never
//! costs a re-analysis.

pub mod analyzer;
pub mod chord_templates;
pub mod error;
pub mod experiment;
pub mod extract;
pub mod index;
pub mod interval;
pub mod kind;
pub mod piece;
pub mod pitch;
pub mod resolver;
pub mod sampler;
pub mod session;

pub use analyzer::{AnalysisHandle, AnalysisKey, AnalysisStatus, Analyzer};
pub use chord_templates::{name_chord, transformation, ChordQuality, ChordSymbol, ChordTransformation};
pub use error::{AnalyzeError, ConfigError, Error, ExtractionError, Result, SamplingError};
pub use experiment::{
    run_experiment, Annotation, LabelCount, NGramContext, ResultSet, SortKey, SortOrder,
    SummaryEntry,
};
pub use extract::{extract, required_arity, ExtractParams, ExtractedObject, MusicalObject, OffsetSpan};
pub use index::AnalysisIndex;
pub use interval::{
    compare_labels, DirectionDisplay, HarmonicInterval, IntervalSize, LabelSettings, Quality,
};
pub use kind::{Arity, DisplayMode, ObjectKind, RenderContract};
pub use piece::{Event, MetadataCorrection, Part, PartCombination, Piece, Sounding};
pub use pitch::{Pitch, PitchError, Step};
pub use resolver::{
    available_display_modes, contract, resolve, ExperimentConfiguration, ExperimentRequest,
    DEFAULT_OFFSET_INTERVAL,
};
pub use sampler::{OffsetGrid, Repeats, SampledPoint, Sampling};
pub use session::Experimenter;
