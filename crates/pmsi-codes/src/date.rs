//! Calendar dates as written in PMSI records
//!
//! PMSI files carry dates as `DDMMYYYY`. The triple is kept verbatim so that
//! impossible dates (`31022020`) survive decoding and can be reported by
//! downstream checks; [`PmsiDate::is_valid`] tells them apart.

use crate::error::CodeError;
use chrono::{Datelike, NaiveDate, TimeDelta};
use std::fmt::{self, Display, Formatter};
use std::str::FromStr;

/// Day/month/year triple, possibly not a real calendar date
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct PmsiDate {
    /// Year, written with at least four characters
    pub year: i16,
    /// Month, 1-based
    pub month: i8,
    /// Day of month, 1-based
    pub day: i8,
}

impl PmsiDate {
    /// Create from parts without validation
    #[inline]
    #[must_use]
    pub const fn new(year: i16, month: i8, day: i8) -> Self {
        Self { year, month, day }
    }

    /// Parse an 8-byte `DDMMYYYY` fragment
    ///
    /// Returns `None` unless the fragment is exactly 8 ASCII digits.
    #[must_use]
    pub fn parse_ddmmyyyy(frag: &[u8]) -> Option<Self> {
        if frag.len() != 8 || !frag.iter().all(u8::is_ascii_digit) {
            return None;
        }

        let digit = |i: usize| frag[i] - b'0';
        let day = digit(0) * 10 + digit(1);
        let month = digit(2) * 10 + digit(3);
        let year = u16::from(digit(4)) * 1000
            + u16::from(digit(5)) * 100
            + u16::from(digit(6)) * 10
            + u16::from(digit(7));

        Some(Self {
            year: year as i16,
            month: month as i8,
            day: day as i8,
        })
    }

    /// Check that the triple names a real calendar day
    #[inline]
    #[must_use]
    pub fn is_valid(&self) -> bool {
        self.to_naive().is_some()
    }

    /// Convert to a chrono date when valid
    #[must_use]
    pub fn to_naive(&self) -> Option<NaiveDate> {
        let month = u32::try_from(self.month).ok()?;
        let day = u32::try_from(self.day).ok()?;
        NaiveDate::from_ymd_opt(i32::from(self.year), month, day)
    }

    /// Build from a chrono date
    ///
    /// Returns `None` for years outside the `i16` range.
    #[must_use]
    pub fn from_naive(date: NaiveDate) -> Option<Self> {
        Some(Self {
            year: i16::try_from(date.year()).ok()?,
            month: date.month() as i8,
            day: date.day() as i8,
        })
    }

    /// Shift by a signed number of days
    ///
    /// Returns `None` if this date is not a valid calendar date.
    #[must_use]
    pub fn add_days(&self, days: i32) -> Option<Self> {
        let date = self.to_naive()?;
        let shifted = date.checked_add_signed(TimeDelta::days(i64::from(days)))?;
        Self::from_naive(shifted)
    }

    /// Shift back by a number of days
    #[inline]
    #[must_use]
    pub fn sub_days(&self, days: i32) -> Option<Self> {
        self.add_days(-days)
    }
}

impl Display for PmsiDate {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{:04}-{:02}-{:02}", self.year, self.month, self.day)
    }
}

impl FromStr for PmsiDate {
    type Err = CodeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let malformed = || CodeError::MalformedDate(s.to_string());

        // The year may carry a sign, so split from the right.
        let mut parts = s.rsplitn(3, '-');
        let (Some(day), Some(month), Some(year)) = (parts.next(), parts.next(), parts.next())
        else {
            return Err(malformed());
        };
        let year_digits = year.strip_prefix('-').unwrap_or(year);
        if year_digits.len() < 3
            || !year_digits.bytes().all(|c| c.is_ascii_digit())
            || month.len() != 2
            || day.len() != 2
        {
            return Err(malformed());
        }

        Ok(Self {
            year: year.parse().map_err(|_| malformed())?,
            month: month.parse().map_err(|_| malformed())?,
            day: day.parse().map_err(|_| malformed())?,
        })
    }
}

impl serde::Serialize for PmsiDate {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.collect_str(self)
    }
}

impl<'de> serde::Deserialize<'de> for PmsiDate {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        struct PmsiDateVisitor;

        impl serde::de::Visitor<'_> for PmsiDateVisitor {
            type Value = PmsiDate;

            fn expecting(&self, formatter: &mut Formatter<'_>) -> fmt::Result {
                formatter.write_str("a date as YYYY-MM-DD")
            }

            fn visit_str<E>(self, v: &str) -> Result<Self::Value, E>
            where
                E: serde::de::Error,
            {
                v.parse().map_err(E::custom)
            }
        }

        deserializer.deserialize_str(PmsiDateVisitor)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_ddmmyyyy_valid() {
        let date = PmsiDate::parse_ddmmyyyy(b"14072021").unwrap();
        assert_eq!(date, PmsiDate::new(2021, 7, 14));
        assert!(date.is_valid());
    }

    #[test]
    fn parse_ddmmyyyy_keeps_impossible_dates() {
        let date = PmsiDate::parse_ddmmyyyy(b"31022020").unwrap();
        assert_eq!(date, PmsiDate::new(2020, 2, 31));
        assert!(!date.is_valid());
    }

    #[test]
    fn parse_ddmmyyyy_rejects_non_digits() {
        assert!(PmsiDate::parse_ddmmyyyy(b"1407202A").is_none());
        assert!(PmsiDate::parse_ddmmyyyy(b"140720").is_none());
        assert!(PmsiDate::parse_ddmmyyyy(b"        ").is_none());
    }

    #[test]
    fn day_arithmetic_crosses_months() {
        let date = PmsiDate::new(2020, 2, 27);
        assert_eq!(date.add_days(3), Some(PmsiDate::new(2020, 3, 1)));
        assert_eq!(date.sub_days(27), Some(PmsiDate::new(2020, 1, 31)));
        assert_eq!(PmsiDate::new(2020, 2, 31).add_days(1), None);
    }

    #[test]
    fn ordering_is_chronological() {
        assert!(PmsiDate::new(2020, 12, 31) < PmsiDate::new(2021, 1, 1));
        assert!(PmsiDate::new(2021, 1, 2) > PmsiDate::new(2021, 1, 1));
    }

    #[test]
    fn display_and_parse() {
        let date = PmsiDate::new(2019, 3, 5);
        assert_eq!(date.to_string(), "2019-03-05");
        assert_eq!("2019-03-05".parse::<PmsiDate>().unwrap(), date);
        assert!("2019-3-5".parse::<PmsiDate>().is_err());
        assert!("20190305".parse::<PmsiDate>().is_err());
    }

    #[test]
    fn extreme_years_roundtrip() {
        for date in [
            PmsiDate::new(-41, 1, 1),
            PmsiDate::new(10002, 8, 26),
            PmsiDate::new(12, 3, 4),
            PmsiDate::new(i16::MIN, 12, 31),
        ] {
            let text = date.to_string();
            assert_eq!(text.parse::<PmsiDate>().unwrap(), date, "{text}");
        }
        assert_eq!(PmsiDate::new(-41, 1, 1).to_string(), "-041-01-01");
        assert!("--41-01-01".parse::<PmsiDate>().is_err());
        assert!("+2019-01-01".parse::<PmsiDate>().is_err());
    }

    #[test]
    fn serde_as_string() {
        let date = PmsiDate::new(2020, 2, 31);
        let json = serde_json::to_string(&date).unwrap();
        assert_eq!(json, "\"2020-02-31\"");
        let back: PmsiDate = serde_json::from_str(&json).unwrap();
        assert_eq!(back, date);
    }
}
