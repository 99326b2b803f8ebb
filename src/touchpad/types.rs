// Touchpad sample types
// One timestamped observation read from the touchpad driver

use serde::{Deserialize, Serialize};

/// A single touchpad observation
///
/// Coordinates are absolute device units. The driver reports `-1` for an axis
/// that was missing from the event batch, so a sample is only a usable
/// position when both axes are non-negative.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Sample {
    /// Absolute x coordinate, `-1` when not reported
    pub x: i32,

    /// Absolute y coordinate, `-1` when not reported
    pub y: i32,

    /// Pressure applied to the surface, `0` when the finger is lifted
    pub pressure: i32,

    /// Timestamp in seconds (microsecond precision)
    pub time: f64,
}

impl Sample {
    pub fn new(x: i32, y: i32, pressure: i32, time: f64) -> Self {
        Sample {
            x,
            y,
            pressure,
            time,
        }
    }

    /// A finger-lift marker: no position, zero pressure
    pub fn lift(time: f64) -> Self {
        Sample {
            x: -1,
            y: -1,
            pressure: 0,
            time,
        }
    }

    /// Both axes were reported
    pub fn is_valid_point(&self) -> bool {
        self.x >= 0 && self.y >= 0
    }

    /// Zero pressure means the finger left the surface
    pub fn is_lift_marker(&self) -> bool {
        self.pressure == 0
    }

    /// Reserved for an explicit end-of-gesture signal.
    /// No source produces one, gestures end on the idle gap.
    pub fn is_stop(&self) -> bool {
        false
    }

    /// Whether the segmenter should keep this sample at all
    pub fn is_relevant(&self) -> bool {
        self.is_valid_point() || self.is_lift_marker()
    }

    /// Combine a `timeval` into fractional seconds
    pub fn combine_seconds_and_microseconds(seconds: i64, microseconds: i64) -> f64 {
        seconds as f64 + 0.000001 * microseconds as f64
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sample_predicates() {
        let point = Sample::new(10, 20, 30, 1.0);
        assert!(point.is_valid_point());
        assert!(!point.is_lift_marker());
        assert!(!point.is_stop());
        assert!(point.is_relevant());

        let lift = Sample::lift(1.5);
        assert!(!lift.is_valid_point());
        assert!(lift.is_lift_marker());
        assert!(lift.is_relevant());

        let missing_axis = Sample::new(-1, 20, 30, 2.0);
        assert!(!missing_axis.is_valid_point());
        assert!(!missing_axis.is_relevant());
    }

    #[test]
    fn test_combine_seconds_and_microseconds() {
        let time = Sample::combine_seconds_and_microseconds(12, 500_000);
        assert!((time - 12.5).abs() < 1e-9);
    }
}
