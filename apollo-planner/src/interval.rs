use serde::{Deserialize, Serialize};

/// Half-open span of minutes since midnight a showtime occupies its hall,
/// cleaning buffer included.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Interval {
    pub start: u32,
    pub end: u32,
}

impl Interval {
    pub fn new(start: u32, duration: u32, cleaning_buffer: u32) -> Self {
        Self {
            start,
            end: start.saturating_add(duration).saturating_add(cleaning_buffer),
        }
    }

    /// Touching intervals (one ends exactly when the other starts) do not overlap.
    pub fn overlaps(&self, other: &Interval) -> bool {
        self.start < other.end && other.start < self.end
    }
}
