//! Reusable analysis index for one (piece, combination, interval) triple.

use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::error::{AnalyzeError, ExtractionError};
use crate::piece::{PartCombination, Piece};
use crate::sampler::{collapse_repeats, OffsetGrid, Repeats, SampledPoint};

/// Sampled timelines for every part of a combination.
///
/// Immutable once built. Timelines are positionally synchronized: point `i`
/// of every timeline is the same grid offset. With [`Repeats::Collapse`] some
/// grid offsets are missing, but always from every timeline at once.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisIndex {
    pub source: String,
    pub title: String,
    pub combination: Arc<PartCombination>,
    /// Names of the combined parts, in combination order.
    pub part_names: Vec<String>,
    pub grid: OffsetGrid,
    pub repeats: Repeats,
    pub duration: u64,
    pub ticks_per_quarter: u32,
    timelines: Vec<Vec<SampledPoint>>,
}

impl AnalysisIndex {
    pub fn build(
        piece: &Piece,
        combination: &PartCombination,
        grid: OffsetGrid,
    ) -> Result<Self, AnalyzeError> {
        Self::build_until(piece, combination, grid, Repeats::Keep, || false)
    }

    /// Build, checking `cancelled` before each part. A cancelled build
    /// returns nothing partial.
    pub fn build_until(
        piece: &Piece,
        combination: &PartCombination,
        grid: OffsetGrid,
        repeats: Repeats,
        cancelled: impl Fn() -> bool,
    ) -> Result<Self, AnalyzeError> {
        if combination.is_empty() {
            return Err(ExtractionError::EmptyCombination.into());
        }

        let mut timelines = Vec::with_capacity(combination.len());
        let mut part_names = Vec::with_capacity(combination.len());
        for &index in combination.parts() {
            if cancelled() {
                return Err(AnalyzeError::Cancelled);
            }
            let part = piece.parts.get(index).ok_or(ExtractionError::UnknownPart {
                index,
                available: piece.parts.len(),
            })?;
            timelines.push(grid.sample(part, piece.duration));
            part_names.push(part.name.clone());
        }
        if repeats == Repeats::Collapse {
            collapse_repeats(&mut timelines);
        }

        Ok(Self {
            source: piece.source.clone(),
            title: piece.title.clone(),
            combination: Arc::new(combination.clone()),
            part_names,
            grid,
            repeats,
            duration: piece.duration,
            ticks_per_quarter: piece.ticks_per_quarter,
            timelines,
        })
    }

    /// Timeline at a position in the combination (0 = first listed part).
    pub fn timeline(&self, position: usize) -> Option<&[SampledPoint]> {
        self.timelines.get(position).map(Vec::as_slice)
    }

    pub fn timelines(&self) -> &[Vec<SampledPoint>] {
        &self.timelines
    }

    pub fn part_count(&self) -> usize {
        self.timelines.len()
    }

    /// Number of grid points (identical for every part).
    pub fn point_count(&self) -> usize {
        self.timelines.first().map(Vec::len).unwrap_or(0)
    }

    /// Grid offsets in ascending order.
    pub fn offsets(&self) -> impl Iterator<Item = u64> + '_ {
        self.timelines
            .first()
            .into_iter()
            .flat_map(|t| t.iter().map(|p| p.offset))
    }

    /// End of the cell starting at `offset`: the next sampled offset, or the
    /// end of the piece after the last one.
    pub fn cell_end(&self, offset: u64) -> u64 {
        let points = self.timelines.first().map(Vec::as_slice).unwrap_or(&[]);
        let next = points.partition_point(|p| p.offset <= offset);
        points
            .get(next)
            .map(|p| p.offset)
            .unwrap_or_else(|| self.duration.max(offset))
    }
}
