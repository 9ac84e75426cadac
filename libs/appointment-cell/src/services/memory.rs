use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{NaiveDate, Utc};
use tokio::sync::{Mutex, RwLock};
use tracing::debug;
use uuid::Uuid;

use doctor_cell::models::Doctor;
use shared_models::appointment::hour_of_label;

use crate::models::{
    Appointment, AppointmentChange, AppointmentError, AppointmentStatus, BookingRejection, NewAppointment,
};
use crate::services::store::AppointmentStore;

/// Process-local store. Every write takes the one appointments mutex and runs
/// the live-slot uniqueness check while holding it, so concurrent bookings of
/// one slot are serialized and all but the first see a conflict.
#[derive(Default)]
pub struct InMemoryAppointmentStore {
    doctors: RwLock<HashMap<Uuid, Doctor>>,
    appointments: Mutex<HashMap<Uuid, Appointment>>,
}

impl InMemoryAppointmentStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_doctors(doctors: impl IntoIterator<Item = Doctor>) -> Self {
        let doctors = doctors.into_iter().map(|doctor| (doctor.id, doctor)).collect();
        Self {
            doctors: RwLock::new(doctors),
            appointments: Mutex::new(HashMap::new()),
        }
    }

    pub async fn put_doctor(&self, doctor: Doctor) {
        self.doctors.write().await.insert(doctor.id, doctor);
    }

    /// Seed an appointment as-is, bypassing the uniqueness check.
    pub async fn put_appointment(&self, appointment: Appointment) {
        self.appointments.lock().await.insert(appointment.id, appointment);
    }

    pub async fn appointment_count(&self) -> usize {
        self.appointments.lock().await.len()
    }
}

fn slot_taken(
    appointments: &HashMap<Uuid, Appointment>,
    doctor_id: Uuid,
    date: NaiveDate,
    hour: &str,
    exclude: Option<Uuid>,
) -> bool {
    let Some(hour) = hour_of_label(hour) else {
        return false;
    };

    appointments
        .values()
        .filter(|appointment| Some(appointment.id) != exclude)
        .any(|appointment| appointment.blocks(doctor_id, date, hour))
}

fn sorted(mut appointments: Vec<Appointment>) -> Vec<Appointment> {
    appointments.sort_by(|a, b| (a.date, a.slot_hour()).cmp(&(b.date, b.slot_hour())));
    appointments
}

#[async_trait]
impl AppointmentStore for InMemoryAppointmentStore {
    async fn find_doctor(&self, doctor_id: Uuid, _auth_token: &str) -> Result<Option<Doctor>, AppointmentError> {
        Ok(self.doctors.read().await.get(&doctor_id).cloned())
    }

    async fn all_appointments(&self, _auth_token: &str) -> Result<Vec<Appointment>, AppointmentError> {
        let appointments = self.appointments.lock().await;
        Ok(sorted(appointments.values().cloned().collect()))
    }

    async fn appointments_for_doctor(
        &self,
        doctor_id: Uuid,
        _auth_token: &str,
    ) -> Result<Vec<Appointment>, AppointmentError> {
        let appointments = self.appointments.lock().await;
        Ok(sorted(
            appointments
                .values()
                .filter(|appointment| appointment.doctor_id == doctor_id)
                .cloned()
                .collect(),
        ))
    }

    async fn appointments_for_patient(
        &self,
        patient_id: Uuid,
        _auth_token: &str,
    ) -> Result<Vec<Appointment>, AppointmentError> {
        let appointments = self.appointments.lock().await;
        let mut rows = sorted(
            appointments
                .values()
                .filter(|appointment| appointment.patient_id == patient_id)
                .cloned()
                .collect(),
        );
        rows.reverse();
        Ok(rows)
    }

    async fn appointments_for_patient_since(
        &self,
        patient_id: Uuid,
        from_date: NaiveDate,
        _auth_token: &str,
    ) -> Result<Vec<Appointment>, AppointmentError> {
        let appointments = self.appointments.lock().await;
        Ok(appointments
            .values()
            .filter(|appointment| appointment.patient_id == patient_id && appointment.date >= from_date)
            .cloned()
            .collect())
    }

    async fn get_appointment(
        &self,
        appointment_id: Uuid,
        _auth_token: &str,
    ) -> Result<Option<Appointment>, AppointmentError> {
        Ok(self.appointments.lock().await.get(&appointment_id).cloned())
    }

    async fn insert_appointment(
        &self,
        appointment: NewAppointment,
        _auth_token: &str,
    ) -> Result<Appointment, AppointmentError> {
        let mut appointments = self.appointments.lock().await;

        if appointment.status.occupies_slot()
            && slot_taken(&appointments, appointment.doctor_id, appointment.date, &appointment.hour, None)
        {
            debug!(
                "Slot {} {} for doctor {} already taken",
                appointment.date, appointment.hour, appointment.doctor_id
            );
            return Err(BookingRejection::ConcurrentConflict.into());
        }

        let created = appointment.into_appointment(Uuid::new_v4());
        appointments.insert(created.id, created.clone());
        Ok(created)
    }

    async fn reschedule_appointment(
        &self,
        appointment_id: Uuid,
        change: AppointmentChange,
        _auth_token: &str,
    ) -> Result<Appointment, AppointmentError> {
        let mut appointments = self.appointments.lock().await;

        let status = appointments
            .get(&appointment_id)
            .map(|current| current.status)
            .ok_or(AppointmentError::NotFound)?;

        if status.occupies_slot()
            && slot_taken(&appointments, change.doctor_id, change.date, &change.hour, Some(appointment_id))
        {
            return Err(BookingRejection::ConcurrentConflict.into());
        }

        let appointment = appointments
            .get_mut(&appointment_id)
            .ok_or(AppointmentError::NotFound)?;
        appointment.doctor_id = change.doctor_id;
        appointment.date = change.date;
        appointment.hour = change.hour;
        if let Some(title) = change.title {
            appointment.title = title;
        }
        if let Some(description) = change.description {
            appointment.description = Some(description);
        }
        appointment.updated_at = Utc::now();

        Ok(appointment.clone())
    }

    async fn update_status(
        &self,
        appointment_id: Uuid,
        status: AppointmentStatus,
        _auth_token: &str,
    ) -> Result<Appointment, AppointmentError> {
        let mut appointments = self.appointments.lock().await;

        let (doctor_id, date, hour) = appointments
            .get(&appointment_id)
            .map(|current| (current.doctor_id, current.date, current.hour.clone()))
            .ok_or(AppointmentError::NotFound)?;

        if status.occupies_slot() && slot_taken(&appointments, doctor_id, date, &hour, Some(appointment_id)) {
            return Err(BookingRejection::ConcurrentConflict.into());
        }

        let appointment = appointments
            .get_mut(&appointment_id)
            .ok_or(AppointmentError::NotFound)?;
        appointment.status = status;
        appointment.updated_at = Utc::now();

        Ok(appointment.clone())
    }

    async fn delete_appointment(&self, appointment_id: Uuid, _auth_token: &str) -> Result<(), AppointmentError> {
        self.appointments
            .lock()
            .await
            .remove(&appointment_id)
            .map(|_| ())
            .ok_or(AppointmentError::NotFound)
    }
}
