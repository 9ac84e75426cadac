//! Bookable-calendar derivation.
//!
//! A doctor's calendar is a pure function of the doctor record, the doctor's
//! appointments and a reference instant: one [`CalendarDay`] per date from the
//! reference date (inclusive) over the horizon, ascending. Weekends are kept in
//! the sequence as unavailable days without slots, so every date inside the
//! horizon has exactly one entry.

use std::collections::HashSet;

use chrono::{DateTime, Datelike, Days, NaiveDate, Utc, Weekday};
use tracing::debug;

use shared_config::AppConfig;
use shared_models::appointment::{slot_label, Appointment};

use crate::models::{CalendarDay, CalendarSlot, Doctor, DoctorError, WorkingHours};

#[derive(Debug, Clone, Copy)]
pub struct CalendarBuilder {
    horizon_days: u32,
}

impl CalendarBuilder {
    pub fn new(horizon_days: u32) -> Self {
        Self { horizon_days }
    }

    pub fn from_config(config: &AppConfig) -> Self {
        Self::new(config.booking_horizon_days)
    }

    pub fn horizon_days(&self) -> u32 {
        self.horizon_days
    }

    pub fn build(
        &self,
        doctor: &Doctor,
        appointments: &[Appointment],
        reference: DateTime<Utc>,
    ) -> Result<Vec<CalendarDay>, DoctorError> {
        let window = doctor.working_window()?;
        let off_dates: HashSet<NaiveDate> = doctor.off_dates.iter().copied().collect();

        let booked: HashSet<(NaiveDate, u32)> = appointments
            .iter()
            .filter(|appointment| appointment.doctor_id == doctor.id && appointment.status.occupies_slot())
            .filter_map(|appointment| appointment.slot_hour().map(|hour| (appointment.date, hour)))
            .collect();

        let calendar: Vec<CalendarDay> = self
            .dates_from(reference.date_naive())
            .map(|date| build_day(date, window, &off_dates, &booked))
            .collect();

        debug!(
            "Built {} day calendar for doctor {} ({} booked slots)",
            calendar.len(),
            doctor.id,
            booked.len()
        );

        Ok(calendar)
    }

    fn dates_from(&self, first: NaiveDate) -> impl Iterator<Item = NaiveDate> {
        (0..u64::from(self.horizon_days)).map_while(move |offset| first.checked_add_days(Days::new(offset)))
    }
}

impl Default for CalendarBuilder {
    fn default() -> Self {
        Self::new(shared_config::DEFAULT_BOOKING_HORIZON_DAYS)
    }
}

pub fn build_calendar(
    doctor: &Doctor,
    appointments: &[Appointment],
    horizon_days: u32,
    reference: DateTime<Utc>,
) -> Result<Vec<CalendarDay>, DoctorError> {
    CalendarBuilder::new(horizon_days).build(doctor, appointments, reference)
}

pub fn is_weekend(date: NaiveDate) -> bool {
    matches!(date.weekday(), Weekday::Sat | Weekday::Sun)
}

fn build_day(
    date: NaiveDate,
    window: WorkingHours,
    off_dates: &HashSet<NaiveDate>,
    booked: &HashSet<(NaiveDate, u32)>,
) -> CalendarDay {
    if is_weekend(date) {
        return CalendarDay {
            date,
            is_available: false,
            hours: Vec::new(),
        };
    }

    let hours = window
        .hours()
        .map(|hour| CalendarSlot {
            hour: slot_label(hour),
            is_available: !booked.contains(&(date, hour)),
        })
        .collect();

    CalendarDay {
        date,
        is_available: !off_dates.contains(&date),
        hours,
    }
}
