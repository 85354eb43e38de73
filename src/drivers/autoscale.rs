use serde::{Deserialize, Serialize};
use crate::drivers::buffer::SlidingWindowBuffer;
use crate::types::{AUTOSCALE_MIN_PAD, AUTOSCALE_PAD_RATIO, Y_MAX};
/// Y axis bounds, both within `[0, Y_MAX]`.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct DisplayRange {
    pub low: f64,
    pub high: f64,
}
impl DisplayRange {
    pub const FULL: DisplayRange = DisplayRange {
        low: 0.0,
        high: Y_MAX,
    };
    pub fn span(&self) -> f64 {
        self.high - self.low
    }
}
impl Default for DisplayRange {
    fn default() -> Self {
        Self::FULL
    }
}
pub struct AutoscaleCalculator;
impl AutoscaleCalculator {
    pub fn range(window: &SlidingWindowBuffer, autoscale_enabled: bool) -> DisplayRange {
        if !autoscale_enabled {
            return DisplayRange::FULL;
        }
        Self::fit(window.iter())
    }
    /// Same as [`range`](Self::range) over a snapshot copy; absent slots are skipped.
    pub fn range_of_values(values: &[Option<u32>], autoscale_enabled: bool) -> DisplayRange {
        if !autoscale_enabled {
            return DisplayRange::FULL;
        }
        Self::fit(values.iter().flatten().copied())
    }
    fn fit(values: impl Iterator<Item = u32>) -> DisplayRange {
        let Some((min, max)) = values.fold(None, |acc: Option<(u32, u32)>, v| match acc {
            None => Some((v, v)),
            Some((lo, hi)) => Some((lo.min(v), hi.max(v))),
        }) else {
            return DisplayRange::FULL;
        };
        let (min, max) = (f64::from(min), f64::from(max));
        let mut pad = (max - min) * AUTOSCALE_PAD_RATIO;
        if pad == 0.0 {
            // Flat signal: keep a non-zero axis height.
            pad = AUTOSCALE_MIN_PAD;
        }
        DisplayRange {
            low: (min - pad).clamp(0.0, Y_MAX),
            high: (max + pad).clamp(0.0, Y_MAX),
        }
    }
}
