//! Fixed-grid offset sampling.
//!
//! A part is observed only at multiples of the offset interval. Anything
//! shorter than the interval that does not sit on a grid point disappears,
//! which is how passing tones and other ornaments are filtered out before
//! counting.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use tracing::debug;

use crate::error::SamplingError;
use crate::piece::{Part, Sounding};

/// What a part is doing at one grid point.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SampledPoint {
    /// Grid offset in ticks.
    pub offset: u64,
    pub sounding: Sounding,
    /// Onset of the event heard here; `None` before the part's first event.
    pub event_onset: Option<u64>,
}

/// What to do with a grid point where no part of the combination changed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Repeats {
    /// One point per grid offset; a held note is counted at every offset.
    #[default]
    Keep,
    /// Drop a point whose every part sounds the same as at the point before.
    Collapse,
}

impl Repeats {
    pub fn as_str(&self) -> &'static str {
        match self {
            Repeats::Keep => "keep",
            Repeats::Collapse => "collapse",
        }
    }
}

impl fmt::Display for Repeats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Repeats {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "keep" | "salami" => Ok(Repeats::Keep),
            "collapse" | "skip" => Ok(Repeats::Collapse),
            other => Err(format!("unknown repeat handling: {other}")),
        }
    }
}

/// How one analysis samples its parts.
///
/// A bare interval converts with repeats kept, so `analyze(.., 1.0)` samples
/// every quarter.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Sampling {
    /// Quarter lengths between grid points.
    pub offset_interval: f64,
    pub repeats: Repeats,
}

impl Sampling {
    pub fn new(offset_interval: f64, repeats: Repeats) -> Self {
        Self {
            offset_interval,
            repeats,
        }
    }
}

impl From<f64> for Sampling {
    fn from(offset_interval: f64) -> Self {
        Self::new(offset_interval, Repeats::Keep)
    }
}

/// Drop every point where no timeline changed from the point before.
///
/// Timelines must be positionally synchronized; they stay so afterwards.
pub fn collapse_repeats(timelines: &mut [Vec<SampledPoint>]) {
    let len = timelines.first().map_or(0, Vec::len);
    let keep: Vec<bool> = (0..len)
        .map(|i| i == 0 || timelines.iter().any(|t| t[i].sounding != t[i - 1].sounding))
        .collect();
    for timeline in timelines.iter_mut() {
        let mut position = 0;
        timeline.retain(|_| {
            let kept = keep[position];
            position += 1;
            kept
        });
    }
}

/// The sampling grid `0, step, 2·step, …`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct OffsetGrid {
    step: u64,
}

impl OffsetGrid {
    /// Grid for an interval in quarter lengths (1.0 = one quarter note).
    pub fn new(interval: f64, ticks_per_quarter: u32) -> Result<Self, SamplingError> {
        if !interval.is_finite() || interval <= 0.0 {
            return Err(SamplingError::NonPositiveInterval(interval));
        }
        let step = (interval * ticks_per_quarter as f64).round() as u64;
        if step == 0 {
            return Err(SamplingError::BelowResolution {
                interval,
                ticks_per_quarter,
            });
        }
        Ok(Self { step })
    }

    /// Grid with a step given directly in ticks.
    pub fn from_ticks(step: u64) -> Result<Self, SamplingError> {
        if step == 0 {
            return Err(SamplingError::NonPositiveInterval(0.0));
        }
        Ok(Self { step })
    }

    pub fn step(&self) -> u64 {
        self.step
    }

    /// Grid offsets strictly below `duration`. Always contains offset 0.
    pub fn points(&self, duration: u64) -> impl Iterator<Item = u64> {
        let step = usize::try_from(self.step).unwrap_or(usize::MAX);
        (0..duration.max(1)).step_by(step)
    }

    /// Sample one part against the piece duration.
    ///
    /// Every part of a piece is sampled against the same duration, so point
    /// `i` means the same offset in every part. An event is heard from its
    /// onset until the next event's onset; the last event carries on to the
    /// end of the piece.
    pub fn sample(&self, part: &Part, duration: u64) -> Vec<SampledPoint> {
        let events = &part.events;
        let mut current = 0usize;
        let mut points = Vec::new();

        for offset in self.points(duration) {
            while current + 1 < events.len() && events[current + 1].onset <= offset {
                current += 1;
            }

            let point = match events.get(current) {
                Some(event) if event.onset <= offset => SampledPoint {
                    offset,
                    sounding: event.sounding.clone(),
                    event_onset: Some(event.onset),
                },
                _ => SampledPoint {
                    offset,
                    sounding: Sounding::Rest,
                    event_onset: None,
                },
            };
            points.push(point);
        }

        debug!(
            part = %part.name,
            events = events.len(),
            points = points.len(),
            step = self.step,
            "sampled part"
        );
        points
    }
}
