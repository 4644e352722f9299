//! Trigger region planning
//!
//! Pure index arithmetic: given a reference length and a placement, compute
//! the closed sample intervals that keep the carrier signal.

use babble_common::{Error, Result};
use std::fmt;
use std::str::FromStr;

/// Granularity of `size`: the carrier is split into this many units
pub const DIVIDER: usize = 100;

/// Segment count of a non-continuous trigger
pub const SEGMENT_COUNT: usize = 5;

/// Where a continuous trigger sits inside the carrier
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TriggerPosition {
    Start,
    Mid,
    End,
}

impl TriggerPosition {
    pub fn as_str(&self) -> &'static str {
        match self {
            TriggerPosition::Start => "start",
            TriggerPosition::Mid => "mid",
            TriggerPosition::End => "end",
        }
    }
}

impl fmt::Display for TriggerPosition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TriggerPosition {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "start" => Ok(TriggerPosition::Start),
            "mid" => Ok(TriggerPosition::Mid),
            "end" => Ok(TriggerPosition::End),
            other => Err(other.to_string()),
        }
    }
}

/// Closed interval `[start, end]` of sample indices
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Region {
    pub start: usize,
    pub end: usize,
}

impl Region {
    /// Number of samples covered
    pub fn len(&self) -> usize {
        self.end - self.start + 1
    }

    pub fn contains(&self, index: usize) -> bool {
        (self.start..=self.end).contains(&index)
    }
}

/// Disjoint regions, ordered by start index
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegionSet {
    regions: Vec<Region>,
}

impl RegionSet {
    pub fn regions(&self) -> &[Region] {
        &self.regions
    }

    pub fn len(&self) -> usize {
        self.regions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.regions.is_empty()
    }

    /// Total samples covered by all regions
    pub fn covered(&self) -> usize {
        self.regions.iter().map(Region::len).sum()
    }

    pub fn contains(&self, index: usize) -> bool {
        self.regions.iter().any(|r| r.contains(index))
    }

    /// Zero every sample of `signal` outside the regions.
    pub fn mask(&self, signal: &mut [f32]) {
        let mut next = 0;
        for region in &self.regions {
            let start = region.start.min(signal.len());
            signal[next..start].fill(0.0);
            next = (region.end + 1).min(signal.len()).max(next);
        }
        signal[next..].fill(0.0);
    }
}

/// Validated placement parameters of an ultrasonic trigger
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TriggerPlacement {
    size: usize,
    position: TriggerPosition,
    continuous: bool,
}

impl TriggerPlacement {
    /// Validate `size` (hundredths of the carrier, in `(0, 100]`) and
    /// `position` (`start`, `mid` or `end`).
    pub fn new(size: usize, position: &str, continuous: bool) -> Result<Self> {
        let infeasible = || Error::TriggerInfeasible {
            size,
            position: position.to_string(),
        };

        let position = position.parse::<TriggerPosition>().map_err(|_| infeasible())?;
        if size == 0 || size > DIVIDER {
            return Err(infeasible());
        }

        Ok(Self {
            size,
            position,
            continuous,
        })
    }

    pub fn size(&self) -> usize {
        self.size
    }

    pub fn position(&self) -> TriggerPosition {
        self.position
    }

    pub fn is_continuous(&self) -> bool {
        self.continuous
    }

    /// Samples kept for a reference of `reference_length` samples
    pub fn points(&self, reference_length: usize) -> usize {
        (reference_length / DIVIDER) * self.size
    }

    /// Compute the region set for a reference of `reference_length` samples.
    ///
    /// A reference too short to hold any sample yields an empty set, which
    /// masks the whole carrier to silence.
    pub fn plan(&self, reference_length: usize) -> RegionSet {
        let points = self.points(reference_length);
        let regions = if self.continuous {
            self.continuous_region(reference_length, points)
                .into_iter()
                .collect()
        } else {
            let segment = points / SEGMENT_COUNT;
            if segment == 0 {
                Vec::new()
            } else {
                let step = reference_length / SEGMENT_COUNT;
                (0..SEGMENT_COUNT)
                    .map(|k| Region {
                        start: k * step,
                        end: k * step + segment - 1,
                    })
                    .collect()
            }
        };

        RegionSet { regions }
    }

    /// `None` when the interval would be empty.
    fn continuous_region(&self, length: usize, points: usize) -> Option<Region> {
        if points == 0 {
            return None;
        }

        let (start, end) = match self.position {
            TriggerPosition::Start => (0, points - 1),
            TriggerPosition::Mid => {
                let half = length / 2;
                // Odd counts shift the start right by one and lose a sample at each side
                let start = if points % 2 == 0 {
                    half - points / 2
                } else {
                    half - points / 2 + 1
                };
                (start, (half + points / 2).checked_sub(1)?)
            }
            TriggerPosition::End => (length - points, length - 1),
        };

        (start <= end).then_some(Region { start, end })
    }
}

/// Validate the placement and plan it in one call.
pub fn plan_regions(
    reference_length: usize,
    size: usize,
    position: &str,
    continuous: bool,
) -> Result<RegionSet> {
    Ok(TriggerPlacement::new(size, position, continuous)?.plan(reference_length))
}
