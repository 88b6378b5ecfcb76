//! Clock and civil calendar.
//!
//! "Today" and the 17:00 overtime cutoff are evaluated in a fixed civil
//! time zone (UTC+7 by default). Wall-clock time is injected through the
//! [`Clock`] trait so every rule that depends on it stays testable.

use std::fmt::Debug;
use std::sync::Arc;

use chrono::{DateTime, FixedOffset, NaiveDate, NaiveTime, Utc};

use crate::config::CalendarConfig;
use crate::error::{EngineError, EngineResult};

/// Textual date format used at every boundary.
pub const DATE_FORMAT: &str = "%Y-%m-%d";

/// Source of the current instant.
pub trait Clock: Debug + Send + Sync {
    /// Returns the current instant in UTC.
    fn now_utc(&self) -> DateTime<Utc>;
}

/// Reads the operating system clock.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now_utc(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// A clock frozen at one instant.
#[derive(Debug, Clone, Copy)]
pub struct FixedClock(DateTime<Utc>);

impl FixedClock {
    /// Freezes the clock at `now`.
    pub fn new(now: DateTime<Utc>) -> Self {
        Self(now)
    }

    /// Freezes the clock at a civil date and time in the given zone.
    ///
    /// # Example
    ///
    /// ```
    /// use payslip_engine::clock::{Clock, FixedClock};
    /// use chrono::{FixedOffset, NaiveDate, NaiveTime};
    ///
    /// let wib = FixedOffset::east_opt(7 * 3600).unwrap();
    /// let clock = FixedClock::at_civil(
    ///     NaiveDate::from_ymd_opt(2025, 8, 4).unwrap(),
    ///     NaiveTime::from_hms_opt(17, 0, 0).unwrap(),
    ///     wib,
    /// );
    /// assert_eq!(clock.now_utc().to_rfc3339(), "2025-08-04T10:00:00+00:00");
    /// ```
    pub fn at_civil(date: NaiveDate, time: NaiveTime, offset: FixedOffset) -> Self {
        let local = date.and_time(time);
        Self((local - offset).and_utc())
    }
}

impl Clock for FixedClock {
    fn now_utc(&self) -> DateTime<Utc> {
        self.0
    }
}

/// Parses a `YYYY-MM-DD` date, naming `field` in the error.
///
/// Only the zero-padded form is accepted.
///
/// ```
/// use payslip_engine::clock::parse_date;
///
/// assert!(parse_date("date", "2025-07-01").is_ok());
/// assert!(parse_date("date", "2025-7-1").is_err());
/// ```
pub fn parse_date(field: &str, value: &str) -> EngineResult<NaiveDate> {
    let value = value.trim();
    let invalid = || EngineError::invalid_input(format!("invalid {} format (YYYY-MM-DD)", field));

    let padded = value.len() == 10
        && value.bytes().enumerate().all(|(i, b)| match i {
            4 | 7 => b == b'-',
            _ => b.is_ascii_digit(),
        });
    if !padded {
        return Err(invalid());
    }
    NaiveDate::parse_from_str(value, DATE_FORMAT).map_err(|_| invalid())
}

/// The fixed-offset civil calendar the ledger rules are evaluated in.
#[derive(Debug, Clone)]
pub struct CivilCalendar {
    clock: Arc<dyn Clock>,
    offset: FixedOffset,
    overtime_cutoff: NaiveTime,
}

impl CivilCalendar {
    /// Creates a calendar over `clock` in the given zone.
    pub fn new(clock: Arc<dyn Clock>, offset: FixedOffset, overtime_cutoff: NaiveTime) -> Self {
        Self {
            clock,
            offset,
            overtime_cutoff,
        }
    }

    /// Builds the calendar described by the configuration.
    pub fn from_config(config: &CalendarConfig, clock: Arc<dyn Clock>) -> EngineResult<Self> {
        let offset = config
            .utc_offset_hours
            .checked_mul(3600)
            .and_then(FixedOffset::east_opt)
            .ok_or_else(|| EngineError::ConfigParseError {
                path: "calendar.utc_offset_hours".to_string(),
                message: format!("offset out of range: {}", config.utc_offset_hours),
            })?;

        Ok(Self::new(clock, offset, config.overtime_cutoff))
    }

    /// The current instant in civil time.
    pub fn now(&self) -> DateTime<FixedOffset> {
        self.clock.now_utc().with_timezone(&self.offset)
    }

    /// The current civil date.
    pub fn today(&self) -> NaiveDate {
        self.now().date_naive()
    }

    /// Parses `value` as a date, defaulting to today when absent or blank.
    pub fn resolve_date(&self, field: &str, value: Option<&str>) -> EngineResult<NaiveDate> {
        match value.map(str::trim).filter(|v| !v.is_empty()) {
            Some(v) => parse_date(field, v),
            None => Ok(self.today()),
        }
    }

    /// Whether overtime may be logged for `date` right now.
    ///
    /// Same-day overtime opens at the cutoff (17:00 by default); any other
    /// date is unrestricted by time of day.
    pub fn overtime_window_open(&self, date: NaiveDate) -> bool {
        let now = self.now();
        date != now.date_naive() || now.time() >= self.overtime_cutoff
    }

    /// The same-day overtime cutoff.
    pub fn overtime_cutoff(&self) -> NaiveTime {
        self.overtime_cutoff
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;

    fn wib() -> FixedOffset {
        FixedOffset::east_opt(7 * 3600).unwrap()
    }

    fn calendar_at(date: NaiveDate, h: u32, m: u32) -> CivilCalendar {
        let clock = FixedClock::at_civil(date, NaiveTime::from_hms_opt(h, m, 0).unwrap(), wib());
        CivilCalendar::new(
            Arc::new(clock),
            wib(),
            NaiveTime::from_hms_opt(17, 0, 0).unwrap(),
        )
    }

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_today_uses_civil_offset() {
        // 2025-08-04 23:30 UTC is already 2025-08-05 in UTC+7
        let clock = FixedClock::new(
            date(2025, 8, 4)
                .and_hms_opt(23, 30, 0)
                .unwrap()
                .and_utc(),
        );
        let calendar = CivilCalendar::new(
            Arc::new(clock),
            wib(),
            NaiveTime::from_hms_opt(17, 0, 0).unwrap(),
        );
        assert_eq!(calendar.today(), date(2025, 8, 5));
    }

    #[test]
    fn test_resolve_date_defaults_to_today() {
        let calendar = calendar_at(date(2025, 8, 6), 9, 0);
        assert_eq!(calendar.resolve_date("date", None).unwrap(), date(2025, 8, 6));
        assert_eq!(
            calendar.resolve_date("date", Some("  ")).unwrap(),
            date(2025, 8, 6)
        );
    }

    #[test]
    fn test_resolve_date_parses_explicit_value() {
        let calendar = calendar_at(date(2025, 8, 6), 9, 0);
        assert_eq!(
            calendar.resolve_date("date", Some("2025-07-31")).unwrap(),
            date(2025, 7, 31)
        );
    }

    #[test]
    fn test_resolve_date_rejects_malformed_value() {
        let calendar = calendar_at(date(2025, 8, 6), 9, 0);
        let err = calendar.resolve_date("date", Some("06/08/2025")).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidInput);
        assert_eq!(
            err.to_string(),
            "Invalid input: invalid date format (YYYY-MM-DD)"
        );
    }

    #[test]
    fn test_parse_date_requires_zero_padding() {
        for value in ["2025-7-1", "2025-07-1", "2025-7-01", "+2025-07-01", "2025-07-01x"] {
            let err = parse_date("date", value).unwrap_err();
            assert_eq!(err.kind(), ErrorKind::InvalidInput, "value = {}", value);
        }
        assert_eq!(parse_date("date", " 2025-07-01 ").unwrap(), date(2025, 7, 1));
    }

    #[test]
    fn test_parse_date_rejects_impossible_day() {
        let err = parse_date("start_date", "2025-02-30").unwrap_err();
        assert_eq!(
            err.to_string(),
            "Invalid input: invalid start_date format (YYYY-MM-DD)"
        );
    }

    #[test]
    fn test_overtime_window_closed_before_cutoff() {
        let calendar = calendar_at(date(2025, 8, 6), 16, 59);
        assert!(!calendar.overtime_window_open(date(2025, 8, 6)));
    }

    #[test]
    fn test_overtime_window_open_at_cutoff() {
        let calendar = calendar_at(date(2025, 8, 6), 17, 0);
        assert!(calendar.overtime_window_open(date(2025, 8, 6)));
    }

    #[test]
    fn test_overtime_window_open_for_past_dates() {
        let calendar = calendar_at(date(2025, 8, 6), 8, 0);
        assert!(calendar.overtime_window_open(date(2025, 8, 5)));
    }

    #[test]
    fn test_from_config_rejects_out_of_range_offset() {
        let config = CalendarConfig {
            utc_offset_hours: 30,
            ..CalendarConfig::default()
        };
        let err = CivilCalendar::from_config(&config, Arc::new(SystemClock)).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InternalFailure);
    }

    #[test]
    fn test_from_config_rejects_overflowing_offset() {
        for hours in [1_000_000, i32::MIN] {
            let config = CalendarConfig {
                utc_offset_hours: hours,
                ..CalendarConfig::default()
            };
            let err = CivilCalendar::from_config(&config, Arc::new(SystemClock)).unwrap_err();
            assert_eq!(err.kind(), ErrorKind::InternalFailure);
            assert!(err.to_string().contains("offset out of range"));
        }
    }
}
