use std::fmt;

use chrono::{DateTime, LocalResult, NaiveDateTime, SecondsFormat, TimeZone, Utc};

use crate::errors::DbError;

/// 0001-01-01T00:00:00.000Z
const MIN_ISO_MILLIS: i64 = -62_135_596_800_000;
/// 9999-12-31T23:59:59.999Z
const MAX_ISO_MILLIS: i64 = 253_402_300_799_999;

/// A UTC instant with millisecond precision, stored as milliseconds since the Unix epoch.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct UtcDateTime {
    millis: i64,
}

impl UtcDateTime {
    #[must_use]
    pub const fn from_millis(millis: i64) -> Self {
        Self { millis }
    }

    #[must_use]
    pub fn now() -> Self {
        Self::from_chrono(Utc::now())
    }

    #[must_use]
    pub const fn timestamp_millis(&self) -> i64 {
        self.millis
    }

    #[must_use]
    pub fn from_chrono<Tz: TimeZone>(dt: DateTime<Tz>) -> Self {
        Self { millis: dt.timestamp_millis() }
    }

    /// Interprets a naive wall-clock time in `tz` and normalizes it to UTC.
    ///
    /// # Errors
    /// `UnsupportedValueType` when the wall-clock time does not exist in `tz` (DST gap).
    /// Ambiguous times resolve to the earlier instant.
    pub fn from_naive<Tz: TimeZone>(naive: NaiveDateTime, tz: &Tz) -> Result<Self, DbError> {
        match tz.from_local_datetime(&naive) {
            LocalResult::Single(dt) | LocalResult::Ambiguous(dt, _) => Ok(Self::from_chrono(dt)),
            LocalResult::None => Err(DbError::UnsupportedValueType(format!(
                "local time {naive} does not exist in the given time zone"
            ))),
        }
    }

    /// `None` when the instant is outside the range chrono can represent.
    #[must_use]
    pub fn to_chrono(&self) -> Option<DateTime<Utc>> {
        Utc.timestamp_millis_opt(self.millis).single()
    }

    /// RFC 3339 with millisecond precision and a `Z` suffix, for years 1 through 9999.
    /// Other instants have no four-digit-year form and return `None`.
    #[must_use]
    pub fn to_rfc3339(&self) -> Option<String> {
        if !(MIN_ISO_MILLIS..=MAX_ISO_MILLIS).contains(&self.millis) {
            return None;
        }
        self.to_chrono().map(|dt| dt.to_rfc3339_opts(SecondsFormat::Millis, true))
    }

    /// Parses RFC 3339 text; a value without an offset is read as UTC.
    ///
    /// # Errors
    /// `TypeMismatch` for text that is not a date.
    pub fn parse_rfc3339(s: &str) -> Result<Self, DbError> {
        if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
            return Ok(Self::from_chrono(dt));
        }
        for fmt in ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"] {
            if let Ok(naive) = NaiveDateTime::parse_from_str(s, fmt) {
                return Ok(Self::from_chrono(naive.and_utc()));
            }
        }
        if let Ok(date) = chrono::NaiveDate::parse_from_str(s, "%Y-%m-%d")
            && let Some(naive) = date.and_hms_opt(0, 0, 0)
        {
            return Ok(Self::from_chrono(naive.and_utc()));
        }
        Err(DbError::TypeMismatch(format!("'{s}' is not an ISO-8601 date")))
    }
}

impl fmt::Display for UtcDateTime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.to_rfc3339() {
            Some(text) => f.write_str(&text),
            None => write!(f, "{}ms", self.millis),
        }
    }
}

impl fmt::Debug for UtcDateTime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "UtcDateTime({self})")
    }
}

impl<Tz: TimeZone> From<DateTime<Tz>> for UtcDateTime {
    fn from(dt: DateTime<Tz>) -> Self {
        Self::from_chrono(dt)
    }
}
