use chrono::{Datelike, Duration, LocalResult, NaiveDateTime, TimeZone, Timelike};
use chrono_tz::Tz;

use super::error::PrepError;


/// Number of time-of-day bins: one per 15 minutes.
pub const BINS_PER_DAY: u32 = 4 * 24;
pub const SECONDS_PER_DAY: f64 = 24. * 60. * 60.;
pub const DEFAULT_DATE_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Index of a time-of-day bin, in [0, BINS_PER_DAY).
pub type Tau = u32;
/// Day of the week, Monday is 0 and Sunday is 6.
pub type Weekday = u32;

/// Identifies the calendar day a demand file covers.
#[derive(PartialEq, Eq, Hash, Debug, Clone, Copy)]
pub struct DemandGroupKey {
    /// Day of the week, Monday is 1 and Sunday is 7.
    pub weekday: u32,
    pub iso_week: u32,
    /// Calendar year of the pickup date (not the ISO week-numbering year).
    pub year: i32,
}


#[derive(Debug, Clone)]
pub struct TimeDiscretizer {
    date_format: String,
    timezone: Tz,
}

impl TimeDiscretizer {
    pub fn new(date_format: &str, timezone: Tz) -> TimeDiscretizer {
        TimeDiscretizer {
            date_format: String::from(date_format),
            timezone,
        }
    }

    pub fn parse(&self, timestr: &str) -> Result<NaiveDateTime, PrepError> {
        NaiveDateTime::parse_from_str(timestr.trim(), &self.date_format)
            .map_err(|_| PrepError::MalformedTimestamp(String::from(timestr)))
    }

    /// Maps a civil time to its (tau, weekday) bin.
    pub fn discretize(&self, time: &NaiveDateTime) -> (Tau, Weekday) {
        let fraction_of_day = time.num_seconds_from_midnight() as f64 / SECONDS_PER_DAY;
        let tau = (BINS_PER_DAY as f64 * fraction_of_day).floor() as Tau;
        let weekday = time.weekday().num_days_from_monday();
        (tau.min(BINS_PER_DAY - 1), weekday)
    }

    pub fn discretize_str(&self, timestr: &str) -> Result<(Tau, Weekday), PrepError> {
        Ok(self.discretize(&self.parse(timestr)?))
    }

    /// Seconds since the unix epoch of a civil time in the configured timezone.
    pub fn epoch_seconds(&self, time: &NaiveDateTime) -> Result<i64, PrepError> {
        match self.timezone.from_local_datetime(time) {
            LocalResult::Single(tt) => Ok(tt.timestamp()),
            LocalResult::Ambiguous(earliest, _) => Ok(earliest.timestamp()),
            // a time skipped by a forward clock change keeps the offset from before the change
            LocalResult::None => {
                match self.timezone.from_local_datetime(&(*time + Duration::hours(1))) {
                    LocalResult::Single(tt) => Ok(tt.timestamp()),
                    LocalResult::Ambiguous(earliest, _) => Ok(earliest.timestamp()),
                    LocalResult::None => Err(PrepError::MalformedTimestamp(time.to_string())),
                }
            }
        }
    }

    pub fn group_key(&self, time: &NaiveDateTime) -> DemandGroupKey {
        DemandGroupKey {
            weekday: time.weekday().number_from_monday(),
            iso_week: time.iso_week().week(),
            year: time.year(),
        }
    }
}

impl Default for TimeDiscretizer {
    fn default() -> TimeDiscretizer {
        TimeDiscretizer::new(DEFAULT_DATE_FORMAT, Tz::UTC)
    }
}
