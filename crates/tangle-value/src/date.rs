//! Date values.
//!
//! A date is a mutable epoch-milliseconds cell. NaN marks an invalid date,
//! and two invalid dates compare equal (SameValueZero on the millis).

use chrono::{DateTime, TimeZone, Utc};

/// Backing data of a date value.
#[derive(Debug, Clone)]
pub struct DateData {
    millis: f64,
}

impl DateData {
    /// A date at the given epoch offset in milliseconds.
    pub fn new(millis: f64) -> Self {
        Self { millis }
    }

    /// The invalid date.
    pub fn invalid() -> Self {
        Self { millis: f64::NAN }
    }

    /// A date from a timezone-aware timestamp.
    pub fn from_datetime(when: DateTime<Utc>) -> Self {
        Self {
            millis: when.timestamp_millis() as f64,
        }
    }

    /// Epoch milliseconds; NaN when invalid.
    pub fn millis(&self) -> f64 {
        self.millis
    }

    /// Reset the stored instant.
    pub fn set_millis(&mut self, millis: f64) {
        self.millis = millis;
    }

    /// Whether this date holds a representable instant.
    pub fn is_valid(&self) -> bool {
        self.millis.is_finite()
    }

    /// Convert back to a timezone-aware timestamp, `None` when invalid or out
    /// of chrono's range.
    pub fn to_datetime(&self) -> Option<DateTime<Utc>> {
        if !self.is_valid() {
            return None;
        }
        Utc.timestamp_millis_opt(self.millis as i64).single()
    }

    /// ISO-8601 rendering, `None` when invalid.
    pub fn to_iso_string(&self) -> Option<String> {
        self.to_datetime()
            .map(|dt| dt.format("%Y-%m-%dT%H:%M:%S%.3fZ").to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn datetime_round_trip() {
        let when = Utc.with_ymd_and_hms(2024, 3, 1, 12, 30, 45).unwrap();
        let date = DateData::from_datetime(when);
        assert!(date.is_valid());
        assert_eq!(date.to_datetime().unwrap(), when);
        assert_eq!(
            date.to_iso_string().unwrap(),
            "2024-03-01T12:30:45.000Z".to_string()
        );
    }

    #[test]
    fn invalid_date_has_no_rendering() {
        let date = DateData::invalid();
        assert!(!date.is_valid());
        assert!(date.to_datetime().is_none());
        assert!(date.to_iso_string().is_none());
    }
}
