//! Length verdict

use serde::{Deserialize, Serialize};
use std::fmt;

/// Position of a character count relative to the target band
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LengthStatus {
    Valid,
    TooShort,
    TooLong,
}

impl LengthStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            LengthStatus::Valid => "valid",
            LengthStatus::TooShort => "too_short",
            LengthStatus::TooLong => "too_long",
        }
    }
}

impl fmt::Display for LengthStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Measured length of a document against `target ± tolerance`.
///
/// Always derived from the current document; never stored across passes.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LengthVerdict {
    pub char_count: usize,
    pub target: usize,
    pub min: usize,
    pub max: usize,
    pub status: LengthStatus,
    /// Characters missing below `min` or exceeding `max`
    pub adjustment_needed: usize,
    pub deviation_percent: f64,
}

impl LengthVerdict {
    /// Classify `char_count` against the band
    pub fn measure(char_count: usize, target: usize, tolerance: usize) -> Self {
        let min = target.saturating_sub(tolerance);
        let max = target.saturating_add(tolerance);

        let (status, adjustment_needed) = if char_count < min {
            (LengthStatus::TooShort, min - char_count)
        } else if char_count > max {
            (LengthStatus::TooLong, char_count - max)
        } else {
            (LengthStatus::Valid, 0)
        };

        let deviation_percent = if target == 0 {
            0.0
        } else {
            char_count.abs_diff(target) as f64 / target as f64 * 100.0
        };

        Self {
            char_count,
            target,
            min,
            max,
            status,
            adjustment_needed,
            deviation_percent,
        }
    }

    pub fn is_valid(&self) -> bool {
        self.status == LengthStatus::Valid
    }

    /// Absolute distance from the target
    pub fn distance_to_target(&self) -> usize {
        self.char_count.abs_diff(self.target)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_band_edges_are_valid() {
        assert!(LengthVerdict::measure(9000, 10_000, 1000).is_valid());
        assert!(LengthVerdict::measure(11_000, 10_000, 1000).is_valid());
    }

    #[test]
    fn test_too_short() {
        let verdict = LengthVerdict::measure(8400, 9500, 1000);
        assert_eq!(verdict.status, LengthStatus::TooShort);
        assert_eq!(verdict.adjustment_needed, 100);
        assert_eq!(verdict.min, 8500);
    }

    #[test]
    fn test_too_long() {
        let verdict = LengthVerdict::measure(12_500, 10_000, 1000);
        assert_eq!(verdict.status, LengthStatus::TooLong);
        assert_eq!(verdict.adjustment_needed, 1500);
        assert!((verdict.deviation_percent - 25.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_status_serialization() {
        let json = serde_json::to_string(&LengthStatus::TooShort).unwrap();
        assert_eq!(json, "\"too_short\"");
    }
}
