//! Booking admission rules.
//!
//! Checks run in a fixed order and stop at the first failure: the doctor must
//! exist, the requested day and hour must be open in the doctor's calendar,
//! and (for new bookings only) the patient must be outside the cooldown
//! period. The validator performs no I/O; callers hand it the snapshots.

use chrono::{DateTime, Days, NaiveDate, Utc};
use tracing::debug;
use uuid::Uuid;

use doctor_cell::models::Doctor;
use doctor_cell::services::calendar::CalendarBuilder;
use shared_config::AppConfig;
use shared_models::appointment::{hour_of_label, Appointment};

use crate::models::{BookAppointmentRequest, BookingRejection};

#[derive(Debug, Clone, Copy)]
pub struct BookingValidator {
    calendar: CalendarBuilder,
    cooldown_days: u32,
}

impl BookingValidator {
    pub fn new(horizon_days: u32, cooldown_days: u32) -> Self {
        Self {
            calendar: CalendarBuilder::new(horizon_days),
            cooldown_days,
        }
    }

    pub fn from_config(config: &AppConfig) -> Self {
        Self::new(config.booking_horizon_days, config.booking_cooldown_days)
    }

    pub fn cooldown_days(&self) -> u32 {
        self.cooldown_days
    }

    /// First date that still counts towards the cooldown.
    pub fn cooldown_start(&self, now: DateTime<Utc>) -> NaiveDate {
        let today = now.date_naive();
        today
            .checked_sub_days(Days::new(u64::from(self.cooldown_days)))
            .unwrap_or(NaiveDate::MIN)
    }

    pub fn validate_booking(
        &self,
        request: &BookAppointmentRequest,
        doctor: Option<&Doctor>,
        existing_appointments: &[Appointment],
        patient_recent_appointments: &[Appointment],
        now: DateTime<Utc>,
    ) -> Result<(), BookingRejection> {
        self.check_slot(doctor, request.date, &request.hour, existing_appointments, now)?;

        let since = self.cooldown_start(now);
        let recent = patient_recent_appointments
            .iter()
            .find(|appointment| appointment.patient_id == request.patient_id && appointment.date >= since);

        if let Some(appointment) = recent {
            debug!(
                "Patient {} is in cooldown: appointment {} on {}",
                request.patient_id, appointment.id, appointment.date
            );
            return Err(BookingRejection::CooldownActive);
        }

        Ok(())
    }

    /// Same slot checks as a new booking, ignoring the appointment being moved.
    /// No cooldown applies.
    pub fn validate_reschedule(
        &self,
        appointment_id: Uuid,
        date: NaiveDate,
        hour: &str,
        doctor: Option<&Doctor>,
        existing_appointments: &[Appointment],
        now: DateTime<Utc>,
    ) -> Result<(), BookingRejection> {
        let others: Vec<Appointment> = existing_appointments
            .iter()
            .filter(|appointment| appointment.id != appointment_id)
            .cloned()
            .collect();

        self.check_slot(doctor, date, hour, &others, now)
    }

    fn check_slot(
        &self,
        doctor: Option<&Doctor>,
        date: NaiveDate,
        hour: &str,
        existing_appointments: &[Appointment],
        now: DateTime<Utc>,
    ) -> Result<(), BookingRejection> {
        let doctor = doctor.ok_or(BookingRejection::DoctorNotFound)?;

        let calendar = self.calendar.build(doctor, existing_appointments, now)?;

        let day = calendar
            .iter()
            .find(|day| day.date == date)
            .ok_or(BookingRejection::SlotUnavailable)?;

        if !day.is_available {
            return Err(BookingRejection::SlotUnavailable);
        }

        let slot = hour_of_label(hour)
            .and_then(|hour| day.slot(hour))
            .ok_or(BookingRejection::SlotUnavailable)?;

        if !slot.is_available {
            return Err(BookingRejection::SlotUnavailable);
        }

        Ok(())
    }
}

impl Default for BookingValidator {
    fn default() -> Self {
        Self::new(
            shared_config::DEFAULT_BOOKING_HORIZON_DAYS,
            shared_config::DEFAULT_BOOKING_COOLDOWN_DAYS,
        )
    }
}
