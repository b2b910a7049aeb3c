//! Shared utility functions for EVN reservoir crates.

/// Timestamp utility functions
pub mod timestamps {
    use chrono::{NaiveDate, NaiveDateTime, NaiveTime, TimeDelta};

    /// Format the portal expects in the `td` query parameter: "DD/MM/YYYY HH:MM"
    pub const REQUEST_FORMAT: &str = "%d/%m/%Y %H:%M";

    const DATETIME_FORMATS: [&str; 4] = [
        REQUEST_FORMAT,
        "%Y-%m-%d %H:%M",
        "%Y-%m-%dT%H:%M",
        "%Y-%m-%d %H:%M:%S",
    ];

    const DATE_FORMATS: [&str; 2] = ["%Y-%m-%d", "%d/%m/%Y"];

    /// Format a timestamp as "DD/MM/YYYY HH:MM"
    pub fn format_request(timestamp: &NaiveDateTime) -> String {
        timestamp.format(REQUEST_FORMAT).to_string()
    }

    /// Parse a timestamp in "DD/MM/YYYY HH:MM" format
    pub fn parse_request(s: &str) -> anyhow::Result<NaiveDateTime> {
        Ok(NaiveDateTime::parse_from_str(s.trim(), REQUEST_FORMAT)?)
    }

    /// Parse a user supplied timestamp.
    ///
    /// Accepts "DD/MM/YYYY HH:MM", "YYYY-MM-DD HH:MM" (optionally with a `T`
    /// separator or seconds), or a bare date. A bare date resolves to 00:00,
    /// or to 23:00 when `end_of_day` is set so that the last hour of the day
    /// is still requested.
    pub fn parse_timestamp(s: &str, end_of_day: bool) -> anyhow::Result<NaiveDateTime> {
        let s = s.trim();
        for format in DATETIME_FORMATS {
            if let Ok(timestamp) = NaiveDateTime::parse_from_str(s, format) {
                return Ok(timestamp);
            }
        }
        for format in DATE_FORMATS {
            if let Ok(date) = NaiveDate::parse_from_str(s, format) {
                let hour = if end_of_day { 23 } else { 0 };
                let time = NaiveTime::from_hms_opt(hour, 0, 0)
                    .ok_or_else(|| anyhow::anyhow!("invalid hour {}", hour))?;
                return Ok(date.and_time(time));
            }
        }
        anyhow::bail!(
            "unrecognised timestamp '{}', expected DD/MM/YYYY HH:MM or YYYY-MM-DD [HH:MM]",
            s
        )
    }

    /// Number of steps an inclusive `[start, end]` walk at `step_hours` takes.
    /// Zero when the range is empty.
    pub fn steps_inclusive(start: &NaiveDateTime, end: &NaiveDateTime, step_hours: u32) -> usize {
        if start > end || step_hours == 0 {
            return 0;
        }
        let span = (*end - *start).num_seconds();
        let step = TimeDelta::hours(i64::from(step_hours)).num_seconds();
        (span / step) as usize + 1
    }

}
