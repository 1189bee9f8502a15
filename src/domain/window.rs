//! Hour-based acceptance windows.

use serde::{Deserialize, Serialize};

/// A `[start_hour, end_hour)` range in 24-hour form.
///
/// When `start_hour < end_hour` the window covers a single day. When
/// `start_hour >= end_hour` it wraps past midnight. An `end_hour` of 0 means
/// "end of day" on the same-day path, so `{ start: 8, end: 0 }` is 08:00-24:00.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeWindow {
    pub start_hour: u8,
    pub end_hour: u8,
}

impl TimeWindow {
    pub fn new(start_hour: u8, end_hour: u8) -> Self {
        Self { start_hour, end_hour }
    }

    /// Check whether `hour` (0-23) falls inside the window
    pub fn contains(&self, hour: u8) -> bool {
        let end = if self.end_hour == 0 { 24 } else { self.end_hour };
        if self.start_hour < end {
            hour >= self.start_hour && hour < end
        } else {
            hour >= self.start_hour || hour < self.end_hour
        }
    }

    /// Check whether the window wraps past midnight
    pub fn wraps(&self) -> bool {
        let end = if self.end_hour == 0 { 24 } else { self.end_hour };
        self.start_hour >= end
    }
}

impl std::fmt::Display for TimeWindow {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:02}:00-{:02}:00", self.start_hour, self.end_hour)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_same_day_window() {
        let w = TimeWindow::new(9, 17);
        assert!(!w.wraps());
        assert!(!w.contains(8));
        assert!(w.contains(9));
        assert!(w.contains(16));
        assert!(!w.contains(17));
    }

    #[test]
    fn test_wrapping_window() {
        let w = TimeWindow::new(22, 6);
        assert!(w.wraps());
        assert!(w.contains(22));
        assert!(w.contains(23));
        assert!(w.contains(0));
        assert!(w.contains(5));
        assert!(!w.contains(6));
        assert!(!w.contains(12));
        assert!(!w.contains(21));
    }

    #[test]
    fn test_end_hour_zero_is_end_of_day() {
        let w = TimeWindow::new(8, 0);
        assert!(!w.wraps());
        assert!(!w.contains(7));
        assert!(w.contains(8));
        assert!(w.contains(23));
        assert!(!w.contains(0));
    }

    #[test]
    fn test_full_day_window() {
        let w = TimeWindow::new(0, 0);
        for hour in 0..24 {
            assert!(w.contains(hour), "hour {} should be inside", hour);
        }
    }

    #[test]
    fn test_equal_nonzero_bounds_wrap_to_full_day() {
        let w = TimeWindow::new(5, 5);
        assert!(w.wraps());
        for hour in 0..24 {
            assert!(w.contains(hour));
        }
    }

    #[test]
    fn test_display() {
        assert_eq!(TimeWindow::new(22, 6).to_string(), "22:00-06:00");
    }

    #[test]
    fn test_deserialize() {
        let w: TimeWindow = serde_json::from_str(r#"{"start_hour": 1, "end_hour": 4}"#).unwrap();
        assert_eq!(w, TimeWindow::new(1, 4));
    }
}
