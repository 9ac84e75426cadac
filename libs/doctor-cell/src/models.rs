use std::fmt;
use std::str::FromStr;

use axum::http::StatusCode;
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

use shared_database::supabase::SupabaseError;
use shared_models::appointment::hour_of_label;
use shared_models::dates::{calendar_date, calendar_dates};
use shared_models::error::AppError;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Doctor {
    pub id: Uuid,
    pub user_id: Uuid,
    pub name: String,
    #[serde(default)]
    pub bio: String,
    /// Raw `"start-end"` window as stored; see [`Doctor::working_window`].
    pub working_hours: String,
    #[serde(default, with = "calendar_dates")]
    pub off_dates: Vec<NaiveDate>,
    pub profession_id: Uuid,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Doctor {
    pub fn working_window(&self) -> Result<WorkingHours, DoctorError> {
        self.working_hours.parse()
    }

    pub fn is_off_on(&self, date: NaiveDate) -> bool {
        self.off_dates.contains(&date)
    }
}

/// Hourly working window `[start, end)`, both within `0..=24`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WorkingHours {
    start: u32,
    end: u32,
}

impl WorkingHours {
    pub fn new(start: u32, end: u32) -> Result<Self, DoctorError> {
        if end > 24 {
            return Err(DoctorError::Configuration(format!(
                "working hours end {} is past midnight",
                end
            )));
        }
        if start >= end {
            return Err(DoctorError::Configuration(format!(
                "working hours start {} must be before end {}",
                start, end
            )));
        }
        Ok(Self { start, end })
    }

    pub fn start(&self) -> u32 {
        self.start
    }

    pub fn end(&self) -> u32 {
        self.end
    }

    pub fn hours(&self) -> impl Iterator<Item = u32> {
        self.start..self.end
    }

    pub fn contains(&self, hour: u32) -> bool {
        (self.start..self.end).contains(&hour)
    }
}

impl FromStr for WorkingHours {
    type Err = DoctorError;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        let malformed = || DoctorError::Configuration(format!("malformed working hours '{}'", raw));

        let (start, end) = raw.split_once('-').ok_or_else(malformed)?;
        let start: u32 = start.trim().parse().map_err(|_| malformed())?;
        let end: u32 = end.trim().parse().map_err(|_| malformed())?;

        Self::new(start, end)
    }
}

impl fmt::Display for WorkingHours {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.start, self.end)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Profession {
    pub id: Uuid,
    pub name: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

// ==============================================================================
// CALENDAR
// ==============================================================================

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct CalendarSlot {
    pub hour: String,
    pub is_available: bool,
}

impl CalendarSlot {
    pub fn hour_of_day(&self) -> Option<u32> {
        hour_of_label(&self.hour)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct CalendarDay {
    #[serde(with = "calendar_date")]
    pub date: NaiveDate,
    pub is_available: bool,
    pub hours: Vec<CalendarSlot>,
}

impl CalendarDay {
    pub fn slot(&self, hour: u32) -> Option<&CalendarSlot> {
        self.hours.iter().find(|slot| slot.hour_of_day() == Some(hour))
    }

    pub fn available_slots(&self) -> impl Iterator<Item = &CalendarSlot> {
        self.hours.iter().filter(|slot| slot.is_available)
    }
}

// ==============================================================================
// REQUESTS
// ==============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateDoctorRequest {
    pub user_id: Uuid,
    pub name: String,
    #[serde(default)]
    pub bio: String,
    pub working_hours: String,
    #[serde(default, with = "calendar_dates")]
    pub off_dates: Vec<NaiveDate>,
    pub profession_id: Uuid,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateDoctorRequest {
    pub name: Option<String>,
    pub bio: Option<String>,
    pub working_hours: Option<String>,
    #[serde(default, deserialize_with = "deserialize_optional_dates")]
    pub off_dates: Option<Vec<NaiveDate>>,
    pub profession_id: Option<Uuid>,
}

fn deserialize_optional_dates<'de, D>(deserializer: D) -> Result<Option<Vec<NaiveDate>>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    calendar_dates::deserialize(deserializer).map(Some)
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OffDateRequest {
    #[serde(with = "calendar_date")]
    pub date: NaiveDate,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProfessionRequest {
    pub name: String,
}

// ==============================================================================
// ERRORS
// ==============================================================================

#[derive(Error, Debug)]
pub enum DoctorError {
    #[error("Doctor not found")]
    NotFound,

    #[error("Profession not found")]
    ProfessionNotFound,

    #[error("Invalid doctor configuration: {0}")]
    Configuration(String),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Database error: {0}")]
    Database(String),
}

impl From<SupabaseError> for DoctorError {
    fn from(e: SupabaseError) -> Self {
        DoctorError::Database(e.to_string())
    }
}

impl From<serde_json::Error> for DoctorError {
    fn from(e: serde_json::Error) -> Self {
        DoctorError::Database(format!("unexpected row shape: {}", e))
    }
}

impl From<DoctorError> for AppError {
    fn from(e: DoctorError) -> Self {
        match e {
            DoctorError::NotFound | DoctorError::ProfessionNotFound => AppError::NotFound(e.to_string()),
            DoctorError::Configuration(_) => AppError::Rejected {
                status: StatusCode::BAD_REQUEST,
                reason: "configuration_error",
                message: e.to_string(),
            },
            DoctorError::Validation(msg) => AppError::ValidationError(msg),
            DoctorError::Database(msg) => AppError::Database(msg),
        }
    }
}
