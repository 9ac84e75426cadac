use std::sync::Arc;

use chrono::{DateTime, Utc};
use tracing::{debug, info, warn};
use uuid::Uuid;

use shared_config::AppConfig;
use shared_models::appointment::{hour_of_label, slot_label};
use shared_models::auth::User;

use crate::models::{
    Appointment, AppointmentChange, AppointmentError, BookAppointmentRequest, BookingRejection, NewAppointment,
    UpdateAppointmentRequest, UpdateStatusRequest,
};
use crate::services::lifecycle::AppointmentLifecycleService;
use crate::services::store::AppointmentStore;
use crate::services::validator::BookingValidator;

pub struct AppointmentBookingService {
    store: Arc<dyn AppointmentStore>,
    validator: BookingValidator,
    lifecycle_service: AppointmentLifecycleService,
}

impl AppointmentBookingService {
    pub fn new(store: Arc<dyn AppointmentStore>, config: &AppConfig) -> Self {
        Self::with_validator(store, BookingValidator::from_config(config))
    }

    pub fn with_validator(store: Arc<dyn AppointmentStore>, validator: BookingValidator) -> Self {
        Self {
            store,
            validator,
            lifecycle_service: AppointmentLifecycleService::new(),
        }
    }

    pub async fn book_appointment(
        &self,
        request: BookAppointmentRequest,
        user: &User,
        auth_token: &str,
    ) -> Result<Appointment, AppointmentError> {
        self.book_appointment_at(request, user, auth_token, Utc::now()).await
    }

    /// Validate and persist a new booking as of `now`.
    ///
    /// A write-time conflict means another booking landed between our read
    /// and our write. The whole read-validate-write runs once more so the
    /// caller normally gets `SlotUnavailable` instead; a second conflict is
    /// returned as is.
    pub async fn book_appointment_at(
        &self,
        request: BookAppointmentRequest,
        user: &User,
        auth_token: &str,
        now: DateTime<Utc>,
    ) -> Result<Appointment, AppointmentError> {
        info!(
            "Booking appointment for patient {} with doctor {} on {} at {}",
            request.patient_id, request.doctor_id, request.date, request.hour
        );

        if !user.can_act_for_patient(&request.patient_id.to_string()) {
            return Err(AppointmentError::Unauthorized);
        }
        if request.title.trim().is_empty() {
            return Err(AppointmentError::ValidationError("Appointment title is required".to_string()));
        }

        match self.try_book(&request, auth_token, now).await {
            Err(AppointmentError::Rejected(BookingRejection::ConcurrentConflict)) => {
                warn!(
                    "Concurrent booking on doctor {} {} {}, retrying once",
                    request.doctor_id, request.date, request.hour
                );
                self.try_book(&request, auth_token, now).await
            }
            result => result,
        }
    }

    async fn try_book(
        &self,
        request: &BookAppointmentRequest,
        auth_token: &str,
        now: DateTime<Utc>,
    ) -> Result<Appointment, AppointmentError> {
        let doctor = self.store.find_doctor(request.doctor_id, auth_token).await?;

        let (existing, recent) = match doctor {
            Some(_) => {
                let existing = self.store.appointments_for_doctor(request.doctor_id, auth_token).await?;
                let recent = self
                    .store
                    .appointments_for_patient_since(request.patient_id, self.validator.cooldown_start(now), auth_token)
                    .await?;
                (existing, recent)
            }
            None => (Vec::new(), Vec::new()),
        };

        self.validator
            .validate_booking(request, doctor.as_ref(), &existing, &recent, now)?;

        let hour = canonical_hour(&request.hour)?;
        let appointment = self
            .store
            .insert_appointment(NewAppointment::pending(request, hour), auth_token)
            .await?;

        info!("Appointment {} booked", appointment.id);
        Ok(appointment)
    }

    pub async fn get_appointment(
        &self,
        appointment_id: Uuid,
        user: &User,
        auth_token: &str,
    ) -> Result<Appointment, AppointmentError> {
        debug!("Fetching appointment: {}", appointment_id);

        let appointment = self
            .store
            .get_appointment(appointment_id, auth_token)
            .await?
            .ok_or(AppointmentError::NotFound)?;

        if !user.can_act_for_patient(&appointment.patient_id.to_string()) {
            return Err(AppointmentError::Unauthorized);
        }

        Ok(appointment)
    }

    pub async fn update_appointment(
        &self,
        appointment_id: Uuid,
        request: UpdateAppointmentRequest,
        user: &User,
        auth_token: &str,
    ) -> Result<Appointment, AppointmentError> {
        self.update_appointment_at(appointment_id, request, user, auth_token, Utc::now())
            .await
    }

    /// Move and/or retitle an appointment. Moving re-checks the target slot
    /// against the doctor's other appointments; the cooldown does not apply.
    pub async fn update_appointment_at(
        &self,
        appointment_id: Uuid,
        request: UpdateAppointmentRequest,
        user: &User,
        auth_token: &str,
        now: DateTime<Utc>,
    ) -> Result<Appointment, AppointmentError> {
        let current = self.get_appointment(appointment_id, user, auth_token).await?;

        if !self.lifecycle_service.can_modify(current.status) {
            return Err(AppointmentError::NotModifiable(current.status));
        }
        if let Some(title) = &request.title {
            if title.trim().is_empty() {
                return Err(AppointmentError::ValidationError("Appointment title is required".to_string()));
            }
        }

        match self.try_update(&current, &request, auth_token, now).await {
            Err(AppointmentError::Rejected(BookingRejection::ConcurrentConflict)) => {
                warn!("Concurrent reschedule of appointment {}, retrying once", appointment_id);
                self.try_update(&current, &request, auth_token, now).await
            }
            result => result,
        }
    }

    async fn try_update(
        &self,
        current: &Appointment,
        request: &UpdateAppointmentRequest,
        auth_token: &str,
        now: DateTime<Utc>,
    ) -> Result<Appointment, AppointmentError> {
        let doctor_id = request.doctor_id.unwrap_or(current.doctor_id);
        let date = request.date.unwrap_or(current.date);
        let mut hour = request.hour.clone().unwrap_or_else(|| current.hour.clone());

        if request.moves_slot() {
            let doctor = self.store.find_doctor(doctor_id, auth_token).await?;
            let existing = match doctor {
                Some(_) => self.store.appointments_for_doctor(doctor_id, auth_token).await?,
                None => Vec::new(),
            };

            self.validator
                .validate_reschedule(current.id, date, &hour, doctor.as_ref(), &existing, now)?;
            hour = canonical_hour(&hour)?;
        }

        let change = AppointmentChange {
            doctor_id,
            date,
            hour,
            title: request.title.as_ref().map(|title| title.trim().to_string()),
            description: request.description.clone(),
        };

        let updated = self.store.reschedule_appointment(current.id, change, auth_token).await?;

        info!(
            "Appointment {} now with doctor {} on {} at {}",
            updated.id, updated.doctor_id, updated.date, updated.hour
        );
        Ok(updated)
    }

    pub async fn update_status(
        &self,
        appointment_id: Uuid,
        request: UpdateStatusRequest,
        user: &User,
        auth_token: &str,
    ) -> Result<Appointment, AppointmentError> {
        let current = self.get_appointment(appointment_id, user, auth_token).await?;

        if self.lifecycle_service.requires_staff(request.status) && !user.is_staff() {
            return Err(AppointmentError::Unauthorized);
        }
        self.lifecycle_service
            .validate_status_transition(current.status, request.status)?;

        let updated = self
            .store
            .update_status(appointment_id, request.status, auth_token)
            .await?;

        info!("Appointment {} moved from {} to {}", appointment_id, current.status, updated.status);
        Ok(updated)
    }

    pub async fn delete_appointment(
        &self,
        appointment_id: Uuid,
        user: &User,
        auth_token: &str,
    ) -> Result<(), AppointmentError> {
        self.get_appointment(appointment_id, user, auth_token).await?;
        self.store.delete_appointment(appointment_id, auth_token).await?;

        info!("Appointment {} deleted by user {}", appointment_id, user.id);
        Ok(())
    }

    /// Staff see every appointment; anyone else sees their own.
    pub async fn list_appointments(&self, user: &User, auth_token: &str) -> Result<Vec<Appointment>, AppointmentError> {
        if user.is_staff() {
            return self.store.all_appointments(auth_token).await;
        }

        let patient_id = Uuid::parse_str(&user.id).map_err(|_| AppointmentError::Unauthorized)?;
        self.store.appointments_for_patient(patient_id, auth_token).await
    }

    pub async fn get_doctor_appointments(
        &self,
        doctor_id: Uuid,
        user: &User,
        auth_token: &str,
    ) -> Result<Vec<Appointment>, AppointmentError> {
        if !user.is_staff() {
            return Err(AppointmentError::Unauthorized);
        }

        self.store.appointments_for_doctor(doctor_id, auth_token).await
    }

    pub async fn get_patient_appointments(
        &self,
        patient_id: Uuid,
        user: &User,
        auth_token: &str,
    ) -> Result<Vec<Appointment>, AppointmentError> {
        if !user.can_act_for_patient(&patient_id.to_string()) {
            return Err(AppointmentError::Unauthorized);
        }

        self.store.appointments_for_patient(patient_id, auth_token).await
    }
}

/// Store hours as `"H:00"` so equal slots compare equal as text too.
fn canonical_hour(hour: &str) -> Result<String, AppointmentError> {
    hour_of_label(hour)
        .map(slot_label)
        .ok_or(AppointmentError::Rejected(BookingRejection::SlotUnavailable))
}
