use chrono::{NaiveDateTime, TimeDelta};
use evn_utils::timestamps::{format_request, steps_inclusive};
use std::mem::replace;

use crate::error::{Result, ScrapeError};

/// A timestamp iterator that yields each step from the start through the
/// end (inclusive), ascending.
#[derive(Clone, Eq, PartialEq, Copy, Debug)]
pub struct HourRange {
    next: Option<NaiveDateTime>,
    start: NaiveDateTime,
    end: NaiveDateTime,
    step_hours: u32,
}

impl HourRange {
    /// One step per hour.
    pub fn hourly(start: NaiveDateTime, end: NaiveDateTime) -> Result<HourRange> {
        HourRange::with_step(start, end, 1)
    }

    /// One step every `step_hours` hours.
    pub fn with_step(start: NaiveDateTime, end: NaiveDateTime, step_hours: u32) -> Result<HourRange> {
        if step_hours == 0 {
            return Err(ScrapeError::InvalidStep);
        }
        if start > end {
            return Err(ScrapeError::InvalidRange {
                start: format_request(&start),
                end: format_request(&end),
            });
        }
        Ok(HourRange {
            next: Some(start),
            start,
            end,
            step_hours,
        })
    }

    pub fn start(&self) -> NaiveDateTime {
        self.start
    }

    pub fn end(&self) -> NaiveDateTime {
        self.end
    }

    pub fn step_hours(&self) -> u32 {
        self.step_hours
    }

    /// Total number of timestamps the full range yields.
    pub fn steps(&self) -> usize {
        steps_inclusive(&self.start, &self.end, self.step_hours)
    }

    /// Whether `timestamp` lies inside `[start, end]`.
    pub fn contains(&self, timestamp: &NaiveDateTime) -> bool {
        *timestamp >= self.start && *timestamp <= self.end
    }
}

impl Iterator for HourRange {
    type Item = NaiveDateTime;
    fn next(&mut self) -> Option<Self::Item> {
        let current = self.next.filter(|t| *t <= self.end)?;
        let following = current.checked_add_signed(TimeDelta::hours(i64::from(self.step_hours)));
        Some(replace(&mut self.next, following).unwrap_or(current))
    }
}

#[cfg(test)]
mod tests {
    use super::HourRange;
    use crate::error::ScrapeError;
    use chrono::{NaiveDate, NaiveDateTime};

    fn at(d: u32, h: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2025, 11, d)
            .unwrap()
            .and_hms_opt(h, 0, 0)
            .unwrap()
    }

    #[test]
    fn test_hour_range_iteration() {
        let range = HourRange::hourly(at(4, 0), at(4, 23)).unwrap();
        assert_eq!(range.steps(), 24);
        let hours: Vec<NaiveDateTime> = range.collect();
        assert_eq!(hours.len(), 24);
        assert_eq!(hours[0], at(4, 0));
        assert_eq!(hours[23], at(4, 23));
        assert!(hours.windows(2).all(|w| w[0] < w[1]));
    }

    #[test]
    fn test_hour_range_crosses_midnight() {
        let hours: Vec<NaiveDateTime> = HourRange::hourly(at(4, 22), at(5, 1)).unwrap().collect();
        assert_eq!(hours, vec![at(4, 22), at(4, 23), at(5, 0), at(5, 1)]);
    }

    #[test]
    fn test_hour_range_single_hour() {
        let hours: Vec<NaiveDateTime> = HourRange::hourly(at(4, 7), at(4, 7)).unwrap().collect();
        assert_eq!(hours, vec![at(4, 7)]);
    }

    #[test]
    fn test_hour_range_step() {
        let range = HourRange::with_step(at(4, 0), at(4, 23), 6).unwrap();
        assert_eq!(range.steps(), 4);
        let hours: Vec<NaiveDateTime> = range.collect();
        assert_eq!(hours, vec![at(4, 0), at(4, 6), at(4, 12), at(4, 18)]);
    }

    #[test]
    fn test_hour_range_rejects_bad_input() {
        assert!(matches!(
            HourRange::hourly(at(5, 0), at(4, 0)),
            Err(ScrapeError::InvalidRange { .. })
        ));
        assert!(matches!(
            HourRange::with_step(at(4, 0), at(5, 0), 0),
            Err(ScrapeError::InvalidStep)
        ));
    }

    #[test]
    fn test_hour_range_stops_at_max_datetime() {
        let last = NaiveDateTime::MAX;
        let start = last - chrono::TimeDelta::hours(1);
        let hours: Vec<NaiveDateTime> = HourRange::hourly(start, last).unwrap().collect();
        assert_eq!(hours, vec![start, last]);
    }
}
