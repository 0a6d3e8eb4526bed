use chrono::{Duration, NaiveDateTime};
use serde::Serialize;

/// Half-open time interval `[start, end)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Interval {
    pub start: NaiveDateTime,
    pub end: NaiveDateTime,
}

impl Interval {
    pub fn new(start: NaiveDateTime, minutes: i64) -> Self {
        Self {
            start,
            end: start + Duration::minutes(minutes),
        }
    }

    /// Back-to-back intervals (one ends where the other starts) do not overlap.
    pub fn overlaps(&self, other: &Interval) -> bool {
        self.start < other.end && self.end > other.start
    }

    pub fn contains(&self, other: &Interval) -> bool {
        self.start <= other.start && other.end <= self.end
    }
}
