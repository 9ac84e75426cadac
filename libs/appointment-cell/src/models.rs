use axum::http::StatusCode;
use chrono::{NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

use doctor_cell::models::DoctorError;
use shared_database::supabase::SupabaseError;
use shared_models::dates::calendar_date;
use shared_models::error::AppError;

pub use shared_models::appointment::{Appointment, AppointmentStatus};

// ==============================================================================
// REQUESTS
// ==============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BookAppointmentRequest {
    pub doctor_id: Uuid,
    pub patient_id: Uuid,
    #[serde(with = "calendar_date")]
    pub date: NaiveDate,
    pub hour: String,
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
}

/// Partial update. Supplying `doctorId`, `date` or `hour` moves the
/// appointment and re-checks the target slot on the target doctor's calendar;
/// title and description alone do not.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateAppointmentRequest {
    pub doctor_id: Option<Uuid>,
    #[serde(default, deserialize_with = "calendar_date::deserialize_option")]
    pub date: Option<NaiveDate>,
    pub hour: Option<String>,
    pub title: Option<String>,
    pub description: Option<String>,
}

impl UpdateAppointmentRequest {
    pub fn moves_slot(&self) -> bool {
        self.doctor_id.is_some() || self.date.is_some() || self.hour.is_some()
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct UpdateStatusRequest {
    pub status: AppointmentStatus,
}

// ==============================================================================
// STORE PAYLOADS
// ==============================================================================

/// Row to insert. New appointments always start pending.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NewAppointment {
    pub doctor_id: Uuid,
    pub patient_id: Uuid,
    #[serde(with = "calendar_date")]
    pub date: NaiveDate,
    pub hour: String,
    pub title: String,
    pub description: Option<String>,
    pub status: AppointmentStatus,
}

impl NewAppointment {
    pub fn pending(request: &BookAppointmentRequest, hour: String) -> Self {
        Self {
            doctor_id: request.doctor_id,
            patient_id: request.patient_id,
            date: request.date,
            hour,
            title: request.title.trim().to_string(),
            description: request.description.clone(),
            status: AppointmentStatus::Pending,
        }
    }

    pub fn into_appointment(self, id: Uuid) -> Appointment {
        let now = Utc::now();
        Appointment {
            id,
            doctor_id: self.doctor_id,
            patient_id: self.patient_id,
            date: self.date,
            hour: self.hour,
            status: self.status,
            title: self.title,
            description: self.description,
            created_at: now,
            updated_at: now,
        }
    }
}

/// Replacement values for a reschedule or retitle.
#[derive(Debug, Clone, PartialEq)]
pub struct AppointmentChange {
    pub doctor_id: Uuid,
    pub date: NaiveDate,
    pub hour: String,
    pub title: Option<String>,
    pub description: Option<String>,
}

// ==============================================================================
// ERRORS
// ==============================================================================

/// Why a booking or reschedule was refused.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum BookingRejection {
    #[error("Doctor not found")]
    DoctorNotFound,

    #[error("Requested slot is not available")]
    SlotUnavailable,

    #[error("Patient already has an appointment within the cooldown period")]
    CooldownActive,

    #[error("Doctor configuration error: {0}")]
    ConfigurationError(String),

    #[error("Slot was booked by another request")]
    ConcurrentConflict,
}

impl BookingRejection {
    pub fn reason(&self) -> &'static str {
        match self {
            BookingRejection::DoctorNotFound => "doctor_not_found",
            BookingRejection::SlotUnavailable => "slot_unavailable",
            BookingRejection::CooldownActive => "cooldown_active",
            BookingRejection::ConfigurationError(_) => "configuration_error",
            BookingRejection::ConcurrentConflict => "concurrent_conflict",
        }
    }

    pub fn status_code(&self) -> StatusCode {
        match self {
            BookingRejection::DoctorNotFound => StatusCode::NOT_FOUND,
            BookingRejection::SlotUnavailable | BookingRejection::ConcurrentConflict => StatusCode::CONFLICT,
            BookingRejection::CooldownActive | BookingRejection::ConfigurationError(_) => StatusCode::BAD_REQUEST,
        }
    }
}

impl From<DoctorError> for BookingRejection {
    fn from(e: DoctorError) -> Self {
        match e {
            DoctorError::Configuration(msg) => BookingRejection::ConfigurationError(msg),
            DoctorError::NotFound => BookingRejection::DoctorNotFound,
            other => BookingRejection::ConfigurationError(other.to_string()),
        }
    }
}

#[derive(Error, Debug)]
pub enum AppointmentError {
    #[error(transparent)]
    Rejected(#[from] BookingRejection),

    #[error("Appointment not found")]
    NotFound,

    #[error("Cannot change appointment status from {from} to {to}")]
    InvalidStatusTransition {
        from: AppointmentStatus,
        to: AppointmentStatus,
    },

    #[error("Appointment cannot be modified in current status: {0}")]
    NotModifiable(AppointmentStatus),

    #[error("Unauthorized access to appointment")]
    Unauthorized,

    #[error("Validation error: {0}")]
    ValidationError(String),

    #[error("Database error: {0}")]
    DatabaseError(String),
}

impl AppointmentError {
    pub fn rejection(&self) -> Option<&BookingRejection> {
        match self {
            AppointmentError::Rejected(rejection) => Some(rejection),
            _ => None,
        }
    }
}

impl From<SupabaseError> for AppointmentError {
    fn from(e: SupabaseError) -> Self {
        if e.is_conflict() {
            AppointmentError::Rejected(BookingRejection::ConcurrentConflict)
        } else {
            AppointmentError::DatabaseError(e.to_string())
        }
    }
}

impl From<AppointmentError> for AppError {
    fn from(e: AppointmentError) -> Self {
        match e {
            AppointmentError::Rejected(rejection) => AppError::Rejected {
                status: rejection.status_code(),
                reason: rejection.reason(),
                message: rejection.to_string(),
            },
            AppointmentError::NotFound => AppError::NotFound(e.to_string()),
            AppointmentError::InvalidStatusTransition { .. } | AppointmentError::NotModifiable(_) => {
                AppError::BadRequest(e.to_string())
            }
            AppointmentError::Unauthorized => AppError::Forbidden(e.to_string()),
            AppointmentError::ValidationError(msg) => AppError::ValidationError(msg),
            AppointmentError::DatabaseError(msg) => AppError::Database(msg),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_rejection_reason_codes() {
        let cases = [
            (BookingRejection::DoctorNotFound, "doctor_not_found", StatusCode::NOT_FOUND),
            (BookingRejection::SlotUnavailable, "slot_unavailable", StatusCode::CONFLICT),
            (BookingRejection::CooldownActive, "cooldown_active", StatusCode::BAD_REQUEST),
            (
                BookingRejection::ConfigurationError("bad".into()),
                "configuration_error",
                StatusCode::BAD_REQUEST,
            ),
            (BookingRejection::ConcurrentConflict, "concurrent_conflict", StatusCode::CONFLICT),
        ];

        for (rejection, reason, status) in cases {
            assert_eq!(rejection.reason(), reason);
            assert_eq!(rejection.status_code(), status);
        }
    }

    #[test]
    fn test_supabase_conflict_is_concurrent_conflict() {
        let error: AppointmentError = SupabaseError::Conflict("duplicate key".into()).into();
        assert_eq!(error.rejection(), Some(&BookingRejection::ConcurrentConflict));

        let error: AppointmentError = SupabaseError::Api { status: 500, message: "boom".into() }.into();
        assert!(matches!(error, AppointmentError::DatabaseError(_)));
    }

    #[test]
    fn test_booking_request_accepts_iso_timestamp() {
        let request: BookAppointmentRequest = serde_json::from_value(json!({
            "doctorId": Uuid::new_v4(),
            "patientId": Uuid::new_v4(),
            "date": "2024-05-06T00:00:00.000Z",
            "hour": "10:00",
            "title": "Follow-up"
        }))
        .unwrap();

        assert_eq!(request.date, NaiveDate::from_ymd_opt(2024, 5, 6).unwrap());
        assert_eq!(request.description, None);
    }

    #[test]
    fn test_update_request_only_moves_when_slot_given() {
        let retitle: UpdateAppointmentRequest = serde_json::from_value(json!({"title": "New title"})).unwrap();
        assert!(!retitle.moves_slot());

        let moved: UpdateAppointmentRequest = serde_json::from_value(json!({"date": "2024-05-07"})).unwrap();
        assert!(moved.moves_slot());

        let other_doctor = Uuid::new_v4();
        let reassigned: UpdateAppointmentRequest =
            serde_json::from_value(json!({"doctorId": other_doctor})).unwrap();
        assert!(reassigned.moves_slot());
        assert_eq!(reassigned.doctor_id, Some(other_doctor));
    }

    #[test]
    fn test_new_appointment_row_shape() {
        let request = BookAppointmentRequest {
            doctor_id: Uuid::nil(),
            patient_id: Uuid::nil(),
            date: NaiveDate::from_ymd_opt(2024, 5, 6).unwrap(),
            hour: "09:00".into(),
            title: "  Check-up ".into(),
            description: None,
        };

        let row = serde_json::to_value(NewAppointment::pending(&request, "9:00".into())).unwrap();
        assert_eq!(row["date"], "2024-05-06");
        assert_eq!(row["hour"], "9:00");
        assert_eq!(row["title"], "Check-up");
        assert_eq!(row["status"], "pending");
        assert_eq!(row["doctorId"], Uuid::nil().to_string());
    }
}
