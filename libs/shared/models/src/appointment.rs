use std::fmt;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::dates::calendar_date;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum AppointmentStatus {
    #[serde(alias = "PENDING")]
    Pending,
    #[serde(alias = "ACCEPTED")]
    Accepted,
    #[serde(alias = "REJECTED")]
    Rejected,
    #[serde(alias = "CANCELLED", alias = "canceled")]
    Cancelled,
}

impl AppointmentStatus {
    /// Pending and accepted appointments hold their slot.
    pub fn occupies_slot(&self) -> bool {
        matches!(self, AppointmentStatus::Pending | AppointmentStatus::Accepted)
    }
}

impl fmt::Display for AppointmentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AppointmentStatus::Pending => write!(f, "pending"),
            AppointmentStatus::Accepted => write!(f, "accepted"),
            AppointmentStatus::Rejected => write!(f, "rejected"),
            AppointmentStatus::Cancelled => write!(f, "cancelled"),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Appointment {
    pub id: Uuid,
    pub doctor_id: Uuid,
    pub patient_id: Uuid,
    #[serde(with = "calendar_date")]
    pub date: NaiveDate,
    pub hour: String,
    pub status: AppointmentStatus,
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Appointment {
    pub fn slot_hour(&self) -> Option<u32> {
        hour_of_label(&self.hour)
    }

    /// True when this appointment blocks `hour` on `date` for `doctor_id`.
    pub fn blocks(&self, doctor_id: Uuid, date: NaiveDate, hour: u32) -> bool {
        self.doctor_id == doctor_id
            && self.date == date
            && self.status.occupies_slot()
            && self.slot_hour() == Some(hour)
    }
}

/// Hour component of a slot label: `"10:00"`, `"09:30"` and `"10"` all read
/// as their leading hour. Minutes are ignored.
pub fn hour_of_label(label: &str) -> Option<u32> {
    let hour = label.trim().split(':').next()?.trim();
    if hour.is_empty() {
        return None;
    }
    hour.parse().ok()
}

pub fn slot_label(hour: u32) -> String {
    format!("{}:00", hour)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_hour_of_label() {
        assert_eq!(hour_of_label("10:00"), Some(10));
        assert_eq!(hour_of_label("09:45"), Some(9));
        assert_eq!(hour_of_label(" 9 "), Some(9));
        assert_eq!(hour_of_label(":30"), None);
        assert_eq!(hour_of_label("noon"), None);
    }

    #[test]
    fn test_status_occupancy() {
        assert!(AppointmentStatus::Pending.occupies_slot());
        assert!(AppointmentStatus::Accepted.occupies_slot());
        assert!(!AppointmentStatus::Rejected.occupies_slot());
        assert!(!AppointmentStatus::Cancelled.occupies_slot());
    }

    #[test]
    fn test_appointment_wire_format() {
        let appointment: Appointment = serde_json::from_value(json!({
            "id": Uuid::new_v4(),
            "doctorId": Uuid::new_v4(),
            "patientId": Uuid::new_v4(),
            "date": "2024-05-06T00:00:00.000Z",
            "hour": "10:00",
            "status": "ACCEPTED",
            "title": "General examination",
            "createdAt": "2024-05-01T08:00:00Z",
            "updatedAt": "2024-05-01T08:00:00Z"
        }))
        .unwrap();

        assert_eq!(appointment.status, AppointmentStatus::Accepted);
        assert_eq!(appointment.description, None);

        let value = serde_json::to_value(&appointment).unwrap();
        assert_eq!(value["date"], "2024-05-06");
        assert_eq!(value["status"], "accepted");
    }
}
