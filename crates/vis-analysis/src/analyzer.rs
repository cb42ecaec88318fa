//! Builds and caches analysis indices.

use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock};

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::error::AnalyzeError;
use crate::index::AnalysisIndex;
use crate::piece::{PartCombination, Piece};
use crate::sampler::{OffsetGrid, Repeats, Sampling};

/// Cache key: one index per piece, combination, grid step, and repeat handling.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct AnalysisKey {
    pub source: String,
    pub combination: PartCombination,
    pub step: u64,
    pub repeats: Repeats,
}

/// Progress of a background analysis.
#[derive(Debug, Clone, PartialEq)]
pub enum AnalysisStatus {
    Processing,
    Ready,
    Failed(AnalyzeError),
    Cancelled,
}

/// Shared analysis cache.
///
/// Indices are immutable and handed out as `Arc`s, so any number of
/// experiments can read one while another combination is being analyzed.
#[derive(Debug, Default)]
pub struct Analyzer {
    cache: RwLock<HashMap<AnalysisKey, Arc<AnalysisIndex>>>,
}

impl Analyzer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Index for `combination` sampled as `sampling` says (a bare `f64` is
    /// an offset interval in quarter lengths), computed on a cache miss.
    pub fn analyze(
        &self,
        piece: &Piece,
        combination: &PartCombination,
        sampling: impl Into<Sampling>,
    ) -> Result<Arc<AnalysisIndex>, AnalyzeError> {
        let (key, grid) = key_for(piece, combination, sampling.into())?;
        if let Some(index) = self.cached(&key) {
            info!(source = %key.source, combination = %combination, step = key.step, repeats = %key.repeats, "analysis cache hit");
            return Ok(index);
        }

        info!(source = %key.source, combination = %combination, step = key.step, repeats = %key.repeats, "analysis cache miss, sampling");
        let index = AnalysisIndex::build_until(piece, combination, grid, key.repeats, || false)?;
        Ok(self.insert(key, index))
    }

    /// Run [`Analyzer::analyze`] on a blocking task.
    pub fn spawn_analysis(
        self: &Arc<Self>,
        piece: Arc<Piece>,
        combination: PartCombination,
        sampling: impl Into<Sampling>,
    ) -> AnalysisHandle {
        self.spawn_analysis_with(piece, combination, sampling, CancellationToken::new())
    }

    /// Like [`Analyzer::spawn_analysis`], cancelled through the given token
    /// (for example a child of a shutdown token).
    ///
    /// A cancelled analysis never reaches the cache, even if sampling had
    /// already finished.
    pub fn spawn_analysis_with(
        self: &Arc<Self>,
        piece: Arc<Piece>,
        combination: PartCombination,
        sampling: impl Into<Sampling>,
        cancel: CancellationToken,
    ) -> AnalysisHandle {
        let (status_tx, status_rx) = watch::channel(AnalysisStatus::Processing);
        let analyzer = Arc::clone(self);
        let token = cancel.clone();
        let sampling = sampling.into();

        let task = tokio::task::spawn_blocking(move || {
            let result = analyzer.analyze_until(&piece, &combination, sampling, &token);
            let status = match &result {
                Ok(_) => AnalysisStatus::Ready,
                Err(AnalyzeError::Cancelled) => AnalysisStatus::Cancelled,
                Err(e) => AnalysisStatus::Failed(e.clone()),
            };
            status_tx.send_replace(status);
            result
        });

        AnalysisHandle {
            status: status_rx,
            cancel,
            task,
        }
    }

    fn analyze_until(
        &self,
        piece: &Piece,
        combination: &PartCombination,
        sampling: Sampling,
        cancel: &CancellationToken,
    ) -> Result<Arc<AnalysisIndex>, AnalyzeError> {
        let (key, grid) = key_for(piece, combination, sampling)?;
        if cancel.is_cancelled() {
            return Err(AnalyzeError::Cancelled);
        }
        if let Some(index) = self.cached(&key) {
            info!(source = %key.source, combination = %combination, step = key.step, "analysis cache hit");
            return Ok(index);
        }

        info!(source = %key.source, combination = %combination, step = key.step, "analysis cache miss, sampling in background");
        let index = AnalysisIndex::build_until(piece, combination, grid, key.repeats, || cancel.is_cancelled())?;

        // Checked under the write lock so cancellation and insertion cannot interleave.
        let mut cache = self.cache.write().unwrap_or_else(PoisonError::into_inner);
        if cancel.is_cancelled() {
            warn!(source = %key.source, combination = %combination, "analysis cancelled, discarding index");
            return Err(AnalyzeError::Cancelled);
        }
        Ok(Arc::clone(cache.entry(key).or_insert_with(|| Arc::new(index))))
    }

    fn cached(&self, key: &AnalysisKey) -> Option<Arc<AnalysisIndex>> {
        let cache = self.cache.read().unwrap_or_else(PoisonError::into_inner);
        cache.get(key).cloned()
    }

    /// Insert unless another caller got there first; either way return the cached index.
    fn insert(&self, key: AnalysisKey, index: AnalysisIndex) -> Arc<AnalysisIndex> {
        let mut cache = self.cache.write().unwrap_or_else(PoisonError::into_inner);
        Arc::clone(cache.entry(key).or_insert_with(|| Arc::new(index)))
    }

    /// Drop every index built from `source`. Returns how many were removed.
    pub fn evict_piece(&self, source: &str) -> usize {
        let mut cache = self.cache.write().unwrap_or_else(PoisonError::into_inner);
        let before = cache.len();
        cache.retain(|key, _| key.source != source);
        let removed = before - cache.len();
        if removed > 0 {
            info!(source, removed, "evicted cached analyses");
        }
        removed
    }

    pub fn len(&self) -> usize {
        self.cache.read().unwrap_or_else(PoisonError::into_inner).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

fn key_for(
    piece: &Piece,
    combination: &PartCombination,
    sampling: Sampling,
) -> Result<(AnalysisKey, OffsetGrid), AnalyzeError> {
    let grid = OffsetGrid::new(sampling.offset_interval, piece.ticks_per_quarter)?;
    let key = AnalysisKey {
        source: piece.source.clone(),
        combination: combination.clone(),
        step: grid.step(),
        repeats: sampling.repeats,
    };
    Ok((key, grid))
}

/// Handle to a background analysis.
#[derive(Debug)]
pub struct AnalysisHandle {
    status: watch::Receiver<AnalysisStatus>,
    cancel: CancellationToken,
    task: JoinHandle<Result<Arc<AnalysisIndex>, AnalyzeError>>,
}

impl AnalysisHandle {
    pub fn status(&self) -> AnalysisStatus {
        self.status.borrow().clone()
    }

    /// Receiver that observes every status change.
    pub fn subscribe(&self) -> watch::Receiver<AnalysisStatus> {
        self.status.clone()
    }

    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    pub async fn wait(self) -> Result<Arc<AnalysisIndex>, AnalyzeError> {
        self.task
            .await
            .map_err(|e| AnalyzeError::Task(e.to_string()))?
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::piece::{Event, Part, Sounding};
    use pretty_assertions::assert_eq;

    fn piece(source: &str) -> Piece {
        piece_with("Canon", source, "G4")
    }

    fn piece_with(title: &str, source: &str, upper: &str) -> Piece {
        let part = |name: &str, pitch: &str| {
            Part::new(
                name,
                (0..8)
                    .map(|i| Event::new(i * 480, 480, Sounding::Note(pitch.parse().unwrap())))
                    .collect(),
            )
        };
        Piece::new(title, source, 480, vec![part("Dux", upper), part("Comes", "C4")]).unwrap()
    }

    #[test]
    fn same_titled_pieces_keep_separate_indices() {
        let analyzer = Analyzer::new();
        let pair = PartCombination::new([0, 1]);
        let josquin = piece_with("Ave Maria", "josquin/ave.xml", "C5");
        let victoria = piece_with("Ave Maria", "victoria/ave.xml", "G4");

        let first = analyzer.analyze(&josquin, &pair, 1.0).unwrap();
        let second = analyzer.analyze(&victoria, &pair, 1.0).unwrap();
        assert!(!Arc::ptr_eq(&first, &second));

        let top = |index: &AnalysisIndex| index.timeline(0).unwrap()[0].sounding.label();
        assert_eq!(top(&first), "C5");
        assert_eq!(top(&second), "G4");
        assert_eq!(analyzer.len(), 2);
    }

    #[test]
    fn second_analysis_is_a_cache_hit() {
        let analyzer = Analyzer::new();
        let piece = piece("canon.json");
        let pair = PartCombination::new([0, 1]);

        let first = analyzer.analyze(&piece, &pair, 1.0).unwrap();
        let second = analyzer.analyze(&piece, &pair, 1.0).unwrap();
        assert!(Arc::ptr_eq(&first, &second));

        let other = analyzer.analyze(&piece, &pair, 0.5).unwrap();
        assert!(!Arc::ptr_eq(&first, &other));
        assert_eq!(analyzer.len(), 2);
    }

    #[test]
    fn repeat_handling_is_part_of_the_key() {
        let analyzer = Analyzer::new();
        let piece = piece("canon.json");
        let pair = PartCombination::new([0, 1]);

        let every = analyzer.analyze(&piece, &pair, 1.0).unwrap();
        let collapsed = analyzer
            .analyze(&piece, &pair, Sampling::new(1.0, Repeats::Collapse))
            .unwrap();
        assert_eq!(every.point_count(), 8);
        assert_eq!(collapsed.point_count(), 1);
        assert_eq!(analyzer.len(), 2);
    }

    #[test]
    fn invalid_interval_leaves_cache_untouched() {
        let analyzer = Analyzer::new();
        let err = analyzer
            .analyze(&piece("canon.json"), &PartCombination::new([0, 1]), 0.0)
            .unwrap_err();
        assert!(matches!(err, AnalyzeError::Sampling(_)));
        assert!(analyzer.is_empty());
    }

    #[test]
    fn eviction_is_per_piece() {
        let analyzer = Analyzer::new();
        let pair = PartCombination::new([0, 1]);
        analyzer.analyze(&piece("a.json"), &pair, 1.0).unwrap();
        analyzer.analyze(&piece("a.json"), &pair, 2.0).unwrap();
        analyzer.analyze(&piece("b.json"), &pair, 1.0).unwrap();

        assert_eq!(analyzer.evict_piece("a.json"), 2);
        assert_eq!(analyzer.len(), 1);
    }

    #[tokio::test]
    async fn background_analysis_reports_ready() {
        let analyzer = Arc::new(Analyzer::new());
        let handle = analyzer.spawn_analysis(
            Arc::new(piece("canon.json")),
            PartCombination::new([0, 1]),
            1.0,
        );
        let mut status = handle.subscribe();
        let index = handle.wait().await.unwrap();
        assert_eq!(index.point_count(), 8);
        assert_eq!(*status.borrow_and_update(), AnalysisStatus::Ready);
        assert_eq!(analyzer.len(), 1);
    }

    #[tokio::test]
    async fn cancelled_analysis_never_reaches_cache() {
        let analyzer = Arc::new(Analyzer::new());
        let token = CancellationToken::new();
        token.cancel();
        let handle = analyzer.spawn_analysis_with(
            Arc::new(piece("canon.json")),
            PartCombination::new([0, 1]),
            1.0,
            token,
        );
        let status = handle.subscribe();
        assert_eq!(handle.wait().await, Err(AnalyzeError::Cancelled));
        assert_eq!(*status.borrow(), AnalysisStatus::Cancelled);
        assert!(analyzer.is_empty());
    }
}
