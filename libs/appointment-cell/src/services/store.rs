use async_trait::async_trait;
use chrono::{NaiveDate, Utc};
use reqwest::Method;
use serde_json::{json, Map, Value};
use tracing::{debug, info};
use uuid::Uuid;

use doctor_cell::models::Doctor;
use shared_config::AppConfig;
use shared_database::supabase::SupabaseClient;
use shared_models::dates::DATE_FORMAT;

use crate::models::{Appointment, AppointmentChange, AppointmentError, AppointmentStatus, NewAppointment};

/// Persistence seen by the booking flow.
///
/// Writes that would leave two live appointments (pending or accepted) on the
/// same doctor, date and hour must fail with
/// [`BookingRejection::ConcurrentConflict`](crate::models::BookingRejection::ConcurrentConflict).
/// Every call carries the caller's token so row-level security applies.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait AppointmentStore: Send + Sync {
    async fn find_doctor(&self, doctor_id: Uuid, auth_token: &str) -> Result<Option<Doctor>, AppointmentError>;

    async fn all_appointments(&self, auth_token: &str) -> Result<Vec<Appointment>, AppointmentError>;

    async fn appointments_for_doctor(
        &self,
        doctor_id: Uuid,
        auth_token: &str,
    ) -> Result<Vec<Appointment>, AppointmentError>;

    async fn appointments_for_patient(
        &self,
        patient_id: Uuid,
        auth_token: &str,
    ) -> Result<Vec<Appointment>, AppointmentError>;

    async fn appointments_for_patient_since(
        &self,
        patient_id: Uuid,
        from_date: NaiveDate,
        auth_token: &str,
    ) -> Result<Vec<Appointment>, AppointmentError>;

    async fn get_appointment(
        &self,
        appointment_id: Uuid,
        auth_token: &str,
    ) -> Result<Option<Appointment>, AppointmentError>;

    async fn insert_appointment(
        &self,
        appointment: NewAppointment,
        auth_token: &str,
    ) -> Result<Appointment, AppointmentError>;

    async fn reschedule_appointment(
        &self,
        appointment_id: Uuid,
        change: AppointmentChange,
        auth_token: &str,
    ) -> Result<Appointment, AppointmentError>;

    async fn update_status(
        &self,
        appointment_id: Uuid,
        status: AppointmentStatus,
        auth_token: &str,
    ) -> Result<Appointment, AppointmentError>;

    async fn delete_appointment(&self, appointment_id: Uuid, auth_token: &str) -> Result<(), AppointmentError>;
}

/// PostgREST-backed store. Slot uniqueness comes from the
/// `appointments_live_slot_idx` partial unique index; PostgREST reports a
/// violation as 409, which surfaces as a concurrent conflict.
pub struct SupabaseAppointmentStore {
    supabase: SupabaseClient,
}

impl SupabaseAppointmentStore {
    pub fn new(config: &AppConfig) -> Self {
        Self {
            supabase: SupabaseClient::new(config),
        }
    }

    async fn fetch(&self, path: &str, auth_token: &str) -> Result<Vec<Appointment>, AppointmentError> {
        let rows: Vec<Appointment> = self
            .supabase
            .request(Method::GET, path, Some(auth_token), None)
            .await?;
        debug!("Fetched {} appointments", rows.len());
        Ok(rows)
    }

    async fn patch(
        &self,
        appointment_id: Uuid,
        mut update_data: Map<String, Value>,
        auth_token: &str,
    ) -> Result<Appointment, AppointmentError> {
        update_data.insert("updatedAt".to_string(), json!(Utc::now().to_rfc3339()));

        let path = format!("/rest/v1/appointments?id=eq.{}", appointment_id);
        let rows: Vec<Appointment> = self
            .supabase
            .write_returning(Method::PATCH, &path, Some(auth_token), Some(Value::Object(update_data)))
            .await?;

        rows.into_iter().next().ok_or(AppointmentError::NotFound)
    }
}

#[async_trait]
impl AppointmentStore for SupabaseAppointmentStore {
    async fn find_doctor(&self, doctor_id: Uuid, auth_token: &str) -> Result<Option<Doctor>, AppointmentError> {
        let path = format!("/rest/v1/doctors?id=eq.{}", doctor_id);
        let rows: Vec<Doctor> = self
            .supabase
            .request(Method::GET, &path, Some(auth_token), None)
            .await?;
        Ok(rows.into_iter().next())
    }

    async fn all_appointments(&self, auth_token: &str) -> Result<Vec<Appointment>, AppointmentError> {
        self.fetch("/rest/v1/appointments?order=date.asc", auth_token).await
    }

    async fn appointments_for_doctor(
        &self,
        doctor_id: Uuid,
        auth_token: &str,
    ) -> Result<Vec<Appointment>, AppointmentError> {
        let path = format!("/rest/v1/appointments?doctorId=eq.{}&order=date.asc", doctor_id);
        self.fetch(&path, auth_token).await
    }

    async fn appointments_for_patient(
        &self,
        patient_id: Uuid,
        auth_token: &str,
    ) -> Result<Vec<Appointment>, AppointmentError> {
        let path = format!("/rest/v1/appointments?patientId=eq.{}&order=date.desc", patient_id);
        self.fetch(&path, auth_token).await
    }

    async fn appointments_for_patient_since(
        &self,
        patient_id: Uuid,
        from_date: NaiveDate,
        auth_token: &str,
    ) -> Result<Vec<Appointment>, AppointmentError> {
        let path = format!(
            "/rest/v1/appointments?patientId=eq.{}&date=gte.{}",
            patient_id,
            from_date.format(DATE_FORMAT)
        );
        self.fetch(&path, auth_token).await
    }

    async fn get_appointment(
        &self,
        appointment_id: Uuid,
        auth_token: &str,
    ) -> Result<Option<Appointment>, AppointmentError> {
        let path = format!("/rest/v1/appointments?id=eq.{}", appointment_id);
        Ok(self.fetch(&path, auth_token).await?.into_iter().next())
    }

    async fn insert_appointment(
        &self,
        appointment: NewAppointment,
        auth_token: &str,
    ) -> Result<Appointment, AppointmentError> {
        let mut row = serde_json::to_value(&appointment)
            .map_err(|e| AppointmentError::DatabaseError(e.to_string()))?;
        let now = Utc::now().to_rfc3339();
        if let Some(fields) = row.as_object_mut() {
            fields.insert("createdAt".to_string(), json!(now));
            fields.insert("updatedAt".to_string(), json!(now));
        }

        let rows: Vec<Appointment> = self
            .supabase
            .write_returning(Method::POST, "/rest/v1/appointments", Some(auth_token), Some(row))
            .await?;

        let created = rows
            .into_iter()
            .next()
            .ok_or_else(|| AppointmentError::DatabaseError("Failed to create appointment".to_string()))?;

        info!("Appointment {} stored", created.id);
        Ok(created)
    }

    async fn reschedule_appointment(
        &self,
        appointment_id: Uuid,
        change: AppointmentChange,
        auth_token: &str,
    ) -> Result<Appointment, AppointmentError> {
        let mut update_data = Map::new();
        update_data.insert("doctorId".to_string(), json!(change.doctor_id));
        update_data.insert("date".to_string(), json!(change.date.format(DATE_FORMAT).to_string()));
        update_data.insert("hour".to_string(), json!(change.hour));
        if let Some(title) = change.title {
            update_data.insert("title".to_string(), json!(title));
        }
        if let Some(description) = change.description {
            update_data.insert("description".to_string(), json!(description));
        }

        self.patch(appointment_id, update_data, auth_token).await
    }

    async fn update_status(
        &self,
        appointment_id: Uuid,
        status: AppointmentStatus,
        auth_token: &str,
    ) -> Result<Appointment, AppointmentError> {
        let mut update_data = Map::new();
        update_data.insert("status".to_string(), json!(status));

        self.patch(appointment_id, update_data, auth_token).await
    }

    async fn delete_appointment(&self, appointment_id: Uuid, auth_token: &str) -> Result<(), AppointmentError> {
        let path = format!("/rest/v1/appointments?id=eq.{}", appointment_id);
        let _: Value = self
            .supabase
            .request(Method::DELETE, &path, Some(auth_token), None)
            .await?;

        info!("Appointment {} deleted", appointment_id);
        Ok(())
    }
}
