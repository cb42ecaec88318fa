//! Interactive experiment configuration over one piece.

use std::sync::Arc;

use tracing::info;

use crate::analyzer::Analyzer;
use crate::error::{ConfigError, Result};
use crate::experiment::{run_experiment, ResultSet, SortKey, SortOrder};
use crate::extract::extract;
use crate::interval::LabelSettings;
use crate::kind::{DisplayMode, ObjectKind};
use crate::piece::{MetadataCorrection, PartCombination, Piece};
use crate::resolver::{self, ExperimentConfiguration, ExperimentRequest};
use crate::sampler::Repeats;

/// Holds one piece and the fields of the experiment being set up.
///
/// Setters store exactly what they are given. Nothing is cleared when the
/// object kind or display mode changes; [`Experimenter::resolve`] reports
/// any field that is no longer allowed.
#[derive(Debug)]
pub struct Experimenter {
    piece: Arc<Piece>,
    analyzer: Arc<Analyzer>,
    request: ExperimentRequest,
}

impl Experimenter {
    pub fn new(piece: Arc<Piece>, analyzer: Arc<Analyzer>) -> Self {
        Self {
            piece,
            analyzer,
            request: ExperimentRequest::default(),
        }
    }

    /// Start from an existing request, e.g. one filled from config defaults.
    pub fn with_request(mut self, request: ExperimentRequest) -> Self {
        self.request = request;
        self
    }

    pub fn piece(&self) -> &Arc<Piece> {
        &self.piece
    }

    pub fn request(&self) -> &ExperimentRequest {
        &self.request
    }

    pub fn object_kind(&self) -> Option<ObjectKind> {
        self.request.object_kind
    }

    pub fn set_object_kind(&mut self, kind: ObjectKind) {
        self.request.object_kind = Some(kind);
    }

    pub fn display_mode(&self) -> Option<DisplayMode> {
        self.request.display_mode
    }

    pub fn set_display_mode(&mut self, mode: DisplayMode) {
        self.request.display_mode = Some(mode);
    }

    pub fn n(&self) -> Option<usize> {
        self.request.n
    }

    pub fn set_n(&mut self, n: Option<usize>) {
        self.request.n = n;
    }

    pub fn top_k(&self) -> Option<usize> {
        self.request.top_k
    }

    pub fn set_top_k(&mut self, top_k: Option<usize>) {
        self.request.top_k = top_k;
    }

    pub fn part_combination(&self) -> Option<&PartCombination> {
        self.request.part_combination.as_ref()
    }

    pub fn set_part_combination(&mut self, combination: PartCombination) {
        self.request.part_combination = Some(combination);
    }

    pub fn offset_interval(&self) -> Option<f64> {
        self.request.offset_interval
    }

    pub fn set_offset_interval(&mut self, interval: f64) {
        self.request.offset_interval = Some(interval);
    }

    pub fn threshold(&self) -> Option<usize> {
        self.request.threshold
    }

    pub fn set_threshold(&mut self, threshold: Option<usize>) {
        self.request.threshold = threshold;
    }

    pub fn sort(&self) -> Option<SortKey> {
        self.request.sort
    }

    pub fn set_sort(&mut self, sort: Option<SortKey>) {
        self.request.sort = sort;
    }

    pub fn sort_order(&self) -> Option<SortOrder> {
        self.request.sort_order
    }

    pub fn set_sort_order(&mut self, order: Option<SortOrder>) {
        self.request.sort_order = order;
    }

    pub fn repeats(&self) -> Option<Repeats> {
        self.request.repeats
    }

    pub fn set_repeats(&mut self, repeats: Repeats) {
        self.request.repeats = Some(repeats);
    }

    pub fn labels(&self) -> Option<LabelSettings> {
        self.request.labels
    }

    pub fn set_labels(&mut self, labels: LabelSettings) {
        self.request.labels = Some(labels);
    }

    /// Display modes for the current object kind.
    pub fn available_display_modes(&self) -> Vec<DisplayMode> {
        resolver::available_display_modes(self.request.object_kind.unwrap_or(ObjectKind::Note))
    }

    /// Whether `field` may currently hold a value.
    pub fn is_enabled(&self, field: &str) -> bool {
        let kind = self.request.object_kind.unwrap_or(ObjectKind::Note);
        let mode = self
            .request
            .display_mode
            .unwrap_or_else(|| self.available_display_modes()[0]);
        resolver::is_enabled(kind, mode, field)
    }

    pub fn resolve(&self) -> std::result::Result<ExperimentConfiguration, ConfigError> {
        resolver::resolve(&self.request, Some(&self.piece))
    }

    /// Apply corrected metadata. Cached indices for the old piece are dropped.
    pub fn apply_corrections(&mut self, correction: &MetadataCorrection) -> Result<()> {
        let corrected = self.piece.with_corrections(correction)?;
        self.analyzer.evict_piece(&self.piece.source);
        self.piece = Arc::new(corrected);
        Ok(())
    }

    /// Run a configuration against this piece.
    ///
    /// The configuration is re-checked against the piece first, so one built
    /// for a different piece fails with a [`ConfigError`] instead of
    /// sampling parts that do not exist.
    pub fn run(&self, config: &ExperimentConfiguration) -> Result<ResultSet> {
        let config = resolver::resolve(&ExperimentRequest::from(config), Some(&self.piece))?;
        info!(
            title = %self.piece.title,
            kind = %config.object_kind,
            mode = %config.display_mode,
            combination = %config.part_combination,
            "running experiment"
        );

        let index = self
            .analyzer
            .analyze(&self.piece, &config.part_combination, config.sampling())?;
        let objects = extract(&index, config.object_kind, &config.extract_params())?;
        Ok(run_experiment(&config, &objects))
    }

    /// Resolve the current fields and run them.
    pub fn run_current(&self) -> Result<ResultSet> {
        let config = self.resolve()?;
        self.run(&config)
    }
}
