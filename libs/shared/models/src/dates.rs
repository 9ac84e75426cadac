//! Calendar-date handling shared by doctors and appointments.
//!
//! Dates arrive either as `YYYY-MM-DD` or as full timestamps (browsers send
//! `toISOString()` output). Both collapse to the calendar date as written;
//! the time of day and the offset are dropped, never converted.

use chrono::{DateTime, NaiveDate, NaiveDateTime};

pub const DATE_FORMAT: &str = "%Y-%m-%d";

pub fn parse_calendar_date(raw: &str) -> Option<NaiveDate> {
    let raw = raw.trim();

    if let Ok(date) = NaiveDate::parse_from_str(raw, DATE_FORMAT) {
        return Some(date);
    }
    if let Ok(timestamp) = DateTime::parse_from_rfc3339(raw) {
        return Some(timestamp.date_naive());
    }
    NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f")
        .ok()
        .map(|timestamp| timestamp.date())
}

pub mod calendar_date {
    use chrono::NaiveDate;
    use serde::{de::Error, Deserialize, Deserializer, Serializer};

    use super::{parse_calendar_date, DATE_FORMAT};

    pub fn serialize<S>(date: &NaiveDate, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&date.format(DATE_FORMAT).to_string())
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<NaiveDate, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw = String::deserialize(deserializer)?;
        parse_calendar_date(&raw).ok_or_else(|| D::Error::custom(format!("invalid date: {}", raw)))
    }

    pub fn deserialize_option<'de, D>(deserializer: D) -> Result<Option<NaiveDate>, D::Error>
    where
        D: Deserializer<'de>,
    {
        match Option::<String>::deserialize(deserializer)? {
            Some(raw) => parse_calendar_date(&raw)
                .map(Some)
                .ok_or_else(|| D::Error::custom(format!("invalid date: {}", raw))),
            None => Ok(None),
        }
    }
}

/// Same as [`calendar_date`] for a list; `null` reads as empty.
pub mod calendar_dates {
    use chrono::NaiveDate;
    use serde::{de::Error, ser::SerializeSeq, Deserialize, Deserializer, Serializer};

    use super::{parse_calendar_date, DATE_FORMAT};

    pub fn serialize<S>(dates: &[NaiveDate], serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let mut seq = serializer.serialize_seq(Some(dates.len()))?;
        for date in dates {
            seq.serialize_element(&date.format(DATE_FORMAT).to_string())?;
        }
        seq.end()
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Vec<NaiveDate>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw = Option::<Vec<String>>::deserialize(deserializer)?.unwrap_or_default();
        raw.iter()
            .map(|value| {
                parse_calendar_date(value)
                    .ok_or_else(|| D::Error::custom(format!("invalid date: {}", value)))
            })
            .collect()
    }
}
