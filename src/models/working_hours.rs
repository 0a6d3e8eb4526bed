use chrono::{Datelike, NaiveDate, NaiveTime};
use serde::{Deserialize, Serialize};

use super::Interval;
use crate::errors::{AppError, AppResult};

/// One working window for a barber on a weekday (0 = Sunday .. 6 = Saturday).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct WorkingHours {
    pub barber_id: String,
    pub weekday: u8,
    #[serde(with = "hhmm")]
    pub start: NaiveTime,
    #[serde(with = "hhmm")]
    pub end: NaiveTime,
}

impl WorkingHours {
    pub fn new(barber_id: &str, weekday: u8, start: &str, end: &str) -> AppResult<Self> {
        if weekday > 6 {
            return Err(AppError::Validation(format!("invalid weekday: {weekday}")));
        }
        let start = parse_time(start)?;
        let end = parse_time(end)?;
        if start >= end {
            return Err(AppError::Validation(format!(
                "working window must end after it starts: {}-{}",
                format_time(start),
                format_time(end)
            )));
        }
        Ok(Self {
            barber_id: barber_id.to_string(),
            weekday,
            start,
            end,
        })
    }

    /// The window placed on a concrete calendar date.
    pub fn on(&self, date: NaiveDate) -> Interval {
        let start = date.and_time(self.start);
        Interval {
            start,
            end: date.and_time(self.end),
        }
    }
}

/// Day-of-week index with Sunday as 0.
pub fn weekday_index(date: NaiveDate) -> u8 {
    date.weekday().num_days_from_sunday() as u8
}

pub fn parse_time(s: &str) -> AppResult<NaiveTime> {
    let (hour, minute) = s
        .split_once(':')
        .ok_or_else(|| AppError::Validation(format!("invalid time format: {s}")))?;
    if hour.len() != 2 || minute.len() != 2 {
        return Err(AppError::Validation(format!("invalid time format: {s}")));
    }
    let hour: u32 = hour
        .parse()
        .map_err(|_| AppError::Validation(format!("invalid hour in: {s}")))?;
    let minute: u32 = minute
        .parse()
        .map_err(|_| AppError::Validation(format!("invalid minute in: {s}")))?;
    NaiveTime::from_hms_opt(hour, minute, 0)
        .ok_or_else(|| AppError::Validation(format!("time out of range: {s}")))
}

pub fn parse_date(s: &str) -> AppResult<NaiveDate> {
    NaiveDate::parse_from_str(s, "%Y-%m-%d")
        .map_err(|_| AppError::Validation(format!("invalid date (use YYYY-MM-DD): {s}")))
}

pub fn format_time(t: NaiveTime) -> String {
    t.format("%H:%M").to_string()
}

mod hhmm {
    use chrono::NaiveTime;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(t: &NaiveTime, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_str(&super::format_time(*t))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<NaiveTime, D::Error> {
        let raw = String::deserialize(d)?;
        super::parse_time(&raw).map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_valid_window() {
        let wh = WorkingHours::new("barber-1", 1, "09:00", "18:00").unwrap();
        assert_eq!(format_time(wh.start), "09:00");
        assert_eq!(format_time(wh.end), "18:00");
    }

    #[test]
    fn test_reject_inverted_window() {
        assert!(WorkingHours::new("barber-1", 1, "18:00", "09:00").is_err());
        assert!(WorkingHours::new("barber-1", 1, "09:00", "09:00").is_err());
    }

    #[test]
    fn test_reject_invalid_weekday() {
        assert!(WorkingHours::new("barber-1", 7, "09:00", "18:00").is_err());
    }

    #[test]
    fn test_parse_invalid_time() {
        assert!(parse_time("25:00").is_err());
        assert!(parse_time("9:00").is_err());
        assert!(parse_time("09-00").is_err());
        assert!(parse_time("09:60").is_err());
    }

    #[test]
    fn test_weekday_index_sunday_is_zero() {
        // 2025-06-15 is a Sunday, 2025-06-16 a Monday
        assert_eq!(weekday_index(parse_date("2025-06-15").unwrap()), 0);
        assert_eq!(weekday_index(parse_date("2025-06-16").unwrap()), 1);
        assert_eq!(weekday_index(parse_date("2025-06-21").unwrap()), 6);
    }

    #[test]
    fn test_window_on_date() {
        let wh = WorkingHours::new("barber-1", 1, "09:00", "18:00").unwrap();
        let window = wh.on(parse_date("2025-06-16").unwrap());
        assert_eq!(window.start.format("%Y-%m-%d %H:%M").to_string(), "2025-06-16 09:00");
        assert_eq!(window.end.format("%H:%M").to_string(), "18:00");
    }

    #[test]
    fn test_serde_uses_hhmm() {
        let wh = WorkingHours::new("barber-1", 2, "09:30", "13:00").unwrap();
        let json = serde_json::to_value(&wh).unwrap();
        assert_eq!(json["start"], "09:30");
        assert_eq!(json["barberId"], "barber-1");
        let back: WorkingHours = serde_json::from_value(json).unwrap();
        assert_eq!(back, wh);
    }
}
