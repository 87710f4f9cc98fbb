//! Duration-based segment planning.
//!
//! Splits a timeline into contiguous parts of roughly equal length, none
//! (nominally) longer than the configured maximum.

use crate::error::{Result, SplitcastError};
use serde::{Deserialize, Serialize};

/// Default maximum segment length in seconds (30 minutes).
pub const DEFAULT_MAX_SEGMENT_SECONDS: u32 = 30 * 60;

/// Upper bound on the number of parts in one plan.
pub const MAX_SEGMENTS: usize = 10_000;

/// One planned time window of the source audio.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SegmentSpec {
    /// Zero-based position in the plan.
    pub index: usize,
    /// Start time in seconds (inclusive).
    pub start_seconds: f64,
    /// End time in seconds (exclusive).
    pub end_seconds: f64,
}

impl SegmentSpec {
    /// Length of this window in seconds.
    pub fn duration(&self) -> f64 {
        self.end_seconds - self.start_seconds
    }
}

/// Ordered partition of `[0, duration)`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SegmentPlan {
    pub duration_seconds: f64,
    pub segments: Vec<SegmentSpec>,
}

impl SegmentPlan {
    pub fn len(&self) -> usize {
        self.segments.len()
    }

    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, SegmentSpec> {
        self.segments.iter()
    }
}

impl<'a> IntoIterator for &'a SegmentPlan {
    type Item = &'a SegmentSpec;
    type IntoIter = std::slice::Iter<'a, SegmentSpec>;

    fn into_iter(self) -> Self::IntoIter {
        self.segments.iter()
    }
}

/// Plan the segments for a source of `duration_seconds`.
///
/// Uses `n = floor(d / max) + 1` parts of `floor(d / n)` whole seconds each;
/// the last part ends exactly at `d` and absorbs the rounding remainder
/// (less than `n` seconds).
pub fn plan(duration_seconds: f64, max_segment_seconds: u32) -> Result<SegmentPlan> {
    if !duration_seconds.is_finite() || duration_seconds <= 0.0 {
        return Err(SplitcastError::InvalidDuration(duration_seconds));
    }
    if max_segment_seconds == 0 {
        return Err(SplitcastError::InvalidInput(
            "Maximum segment length must be at least one second".to_string(),
        ));
    }

    let max = max_segment_seconds as f64;
    let count = (duration_seconds / max).floor() + 1.0;
    if count > MAX_SEGMENTS as f64 {
        return Err(SplitcastError::InvalidDuration(duration_seconds));
    }
    let count = count as usize;
    // Sub-second durations per part would produce empty windows.
    let step = (duration_seconds / count as f64).floor().max(1.0);

    let mut segments: Vec<SegmentSpec> = Vec::new();
    for index in 0..count {
        let start_seconds = index as f64 * step;
        if start_seconds >= duration_seconds {
            break;
        }
        segments.push(SegmentSpec {
            index,
            start_seconds,
            end_seconds: ((index + 1) as f64 * step).min(duration_seconds),
        });
    }

    if let Some(last) = segments.last_mut() {
        last.end_seconds = duration_seconds;
    }

    Ok(SegmentPlan {
        duration_seconds,
        segments,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn assert_partition(plan: &SegmentPlan, duration: f64) {
        assert!(!plan.is_empty());
        assert_eq!(plan.segments[0].start_seconds, 0.0);
        assert_eq!(plan.segments.last().unwrap().end_seconds, duration);
        for (i, seg) in plan.iter().enumerate() {
            assert_eq!(seg.index, i);
            assert!(seg.end_seconds > seg.start_seconds, "empty segment {seg:?}");
        }
        for pair in plan.segments.windows(2) {
            assert_eq!(pair[0].end_seconds, pair[1].start_seconds);
        }
    }

    #[test]
    fn test_one_hour_gives_three_parts() {
        let plan = plan(3600.0, 1800).unwrap();
        assert_eq!(plan.len(), 3);
        for seg in &plan {
            assert_eq!(seg.duration(), 1200.0);
        }
        assert_partition(&plan, 3600.0);
    }

    #[test]
    fn test_exact_maximum_gives_two_parts() {
        let plan = plan(1800.0, 1800).unwrap();
        assert_eq!(plan.len(), 2);
        assert_eq!(plan.segments[0].duration(), 900.0);
        assert_eq!(plan.segments[1].duration(), 900.0);
    }

    #[test]
    fn test_short_audio_is_one_part() {
        let plan = plan(95.5, 1800).unwrap();
        assert_eq!(plan.len(), 1);
        assert_eq!(plan.segments[0].start_seconds, 0.0);
        assert_eq!(plan.segments[0].end_seconds, 95.5);
    }

    #[test]
    fn test_remainder_goes_to_last_part() {
        // n = 4, s = floor(5432.7 / 4) = 1358
        let plan = plan(5432.7, 1800).unwrap();
        assert_eq!(plan.len(), 4);
        assert_eq!(plan.segments[0].duration(), 1358.0);
        let last = plan.segments[3];
        assert_eq!(last.start_seconds, 3.0 * 1358.0);
        assert!(last.duration() - 1358.0 < plan.len() as f64);
        assert_partition(&plan, 5432.7);
    }

    #[test]
    fn test_partition_holds_for_assorted_durations() {
        for &(duration, max) in &[
            (0.25, 1800),
            (1.0, 1),
            (3.0, 1),
            (3.5, 1),
            (59.9, 10),
            (1799.999, 1800),
            (7200.0, 1800),
            (86_399.0, 600),
        ] {
            let plan = plan(duration, max).unwrap();
            assert_partition(&plan, duration);
        }
    }

    #[test]
    fn test_invalid_durations() {
        assert!(matches!(plan(0.0, 1800), Err(SplitcastError::InvalidDuration(_))));
        assert!(matches!(plan(-12.0, 1800), Err(SplitcastError::InvalidDuration(_))));
        assert!(matches!(plan(f64::NAN, 1800), Err(SplitcastError::InvalidDuration(_))));
        assert!(matches!(plan(10.0, 0), Err(SplitcastError::InvalidInput(_))));
    }

    #[test]
    fn test_huge_durations_are_rejected() {
        assert!(matches!(plan(f64::MAX, 1800), Err(SplitcastError::InvalidDuration(_))));
        assert!(matches!(plan(1e19, 1), Err(SplitcastError::InvalidDuration(_))));

        let largest = (MAX_SEGMENTS as f64 - 1.0) * 1800.0;
        assert_eq!(plan(largest, 1800).unwrap().len(), MAX_SEGMENTS);
        assert!(plan(largest + 1800.0, 1800).is_err());
    }
}
