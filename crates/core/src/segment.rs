use serde::{Deserialize, Serialize};

/// One bounded slice of a longer recording, destined for a single model call.
///
/// Windows produced by [`plan_windows`] are contiguous, non-overlapping,
/// ordered by `index`, and together cover exactly `[0, total_duration_ms)`.
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct SegmentationWindow {
    pub start_ms: u64,
    pub end_ms: u64,
    pub index: usize,
}

impl SegmentationWindow {
    pub fn duration_ms(&self) -> u64 {
        self.end_ms - self.start_ms
    }

    pub fn start_seconds(&self) -> f64 {
        self.start_ms as f64 / 1000.0
    }

    pub fn end_seconds(&self) -> f64 {
        self.end_ms as f64 / 1000.0
    }
}

/// Partition `[0, total_duration_ms)` into windows of at most `max_window_ms`.
///
/// A recording that already fits one window comes back as a single window;
/// otherwise every window is exactly `max_window_ms` long except the final
/// remainder. Pure and deterministic. Panics on `max_window_ms == 0`, which
/// is a caller bug rather than an input condition.
pub fn plan_windows(total_duration_ms: u64, max_window_ms: u64) -> Vec<SegmentationWindow> {
    assert!(max_window_ms > 0, "max_window_ms must be > 0");

    if total_duration_ms == 0 {
        return Vec::new();
    }
    if total_duration_ms <= max_window_ms {
        return vec![SegmentationWindow {
            start_ms: 0,
            end_ms: total_duration_ms,
            index: 0,
        }];
    }

    let count = total_duration_ms.div_ceil(max_window_ms) as usize;
    let mut windows = Vec::with_capacity(count);
    let mut start_ms = 0;
    let mut index = 0;
    while start_ms < total_duration_ms {
        let end_ms = (start_ms + max_window_ms).min(total_duration_ms);
        windows.push(SegmentationWindow {
            start_ms,
            end_ms,
            index,
        });
        start_ms = end_ms;
        index += 1;
    }
    windows
}
