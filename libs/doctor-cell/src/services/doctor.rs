use chrono::{DateTime, NaiveDate, Utc};
use reqwest::Method;
use serde_json::{json, Map, Value};
use tracing::{debug, info};
use uuid::Uuid;

use shared_config::AppConfig;
use shared_database::supabase::SupabaseClient;
use shared_models::appointment::Appointment;
use shared_models::dates::DATE_FORMAT;

use crate::models::{
    CalendarDay, CreateDoctorRequest, Doctor, DoctorError, UpdateDoctorRequest, WorkingHours,
};
use crate::services::calendar::CalendarBuilder;

pub struct DoctorService {
    supabase: SupabaseClient,
    calendar: CalendarBuilder,
}

impl DoctorService {
    pub fn new(config: &AppConfig) -> Self {
        Self {
            supabase: SupabaseClient::new(config),
            calendar: CalendarBuilder::from_config(config),
        }
    }

    pub async fn list_doctors(
        &self,
        profession_id: Option<Uuid>,
        auth_token: Option<&str>,
    ) -> Result<Vec<Doctor>, DoctorError> {
        let path = match profession_id {
            Some(profession_id) => format!("/rest/v1/doctors?professionId=eq.{}&order=name.asc", profession_id),
            None => "/rest/v1/doctors?order=name.asc".to_string(),
        };

        let rows: Vec<Doctor> = self.supabase.request(Method::GET, &path, auth_token, None).await?;
        debug!("Fetched {} doctors", rows.len());
        Ok(rows)
    }

    pub async fn get_doctor(
        &self,
        doctor_id: Uuid,
        auth_token: Option<&str>,
    ) -> Result<Doctor, DoctorError> {
        debug!("Fetching doctor: {}", doctor_id);

        let path = format!("/rest/v1/doctors?id=eq.{}", doctor_id);
        let rows: Vec<Doctor> = self.supabase.request(Method::GET, &path, auth_token, None).await?;

        rows.into_iter().next().ok_or(DoctorError::NotFound)
    }

    pub async fn create_doctor(
        &self,
        request: CreateDoctorRequest,
        auth_token: &str,
    ) -> Result<Doctor, DoctorError> {
        if request.name.trim().is_empty() {
            return Err(DoctorError::Validation("Doctor name is required".to_string()));
        }
        let window: WorkingHours = request.working_hours.parse()?;

        let now = Utc::now().to_rfc3339();
        let doctor_data = json!({
            "userId": request.user_id,
            "name": request.name.trim(),
            "bio": request.bio,
            "workingHours": window.to_string(),
            "offDates": format_dates(normalize_dates(request.off_dates)),
            "professionId": request.profession_id,
            "createdAt": now,
            "updatedAt": now
        });

        let rows: Vec<Doctor> = self
            .supabase
            .write_returning(Method::POST, "/rest/v1/doctors", Some(auth_token), Some(doctor_data))
            .await?;

        let doctor = rows
            .into_iter()
            .next()
            .ok_or_else(|| DoctorError::Database("Failed to create doctor".to_string()))?;

        info!("Doctor {} created with working hours {}", doctor.id, doctor.working_hours);
        Ok(doctor)
    }

    pub async fn update_doctor(
        &self,
        doctor_id: Uuid,
        request: UpdateDoctorRequest,
        auth_token: &str,
    ) -> Result<Doctor, DoctorError> {
        debug!("Updating doctor: {}", doctor_id);

        self.get_doctor(doctor_id, Some(auth_token)).await?;

        let mut update_data = Map::new();

        if let Some(name) = request.name {
            if name.trim().is_empty() {
                return Err(DoctorError::Validation("Doctor name is required".to_string()));
            }
            update_data.insert("name".to_string(), json!(name.trim()));
        }
        if let Some(bio) = request.bio {
            update_data.insert("bio".to_string(), json!(bio));
        }
        if let Some(working_hours) = request.working_hours {
            let window: WorkingHours = working_hours.parse()?;
            update_data.insert("workingHours".to_string(), json!(window.to_string()));
        }
        if let Some(off_dates) = request.off_dates {
            update_data.insert("offDates".to_string(), json!(format_dates(normalize_dates(off_dates))));
        }
        if let Some(profession_id) = request.profession_id {
            update_data.insert("professionId".to_string(), json!(profession_id));
        }

        self.patch_doctor(doctor_id, update_data, auth_token).await
    }

    pub async fn delete_doctor(&self, doctor_id: Uuid, auth_token: &str) -> Result<(), DoctorError> {
        self.get_doctor(doctor_id, Some(auth_token)).await?;

        let path = format!("/rest/v1/doctors?id=eq.{}", doctor_id);
        let _: Value = self.supabase.request(Method::DELETE, &path, Some(auth_token), None).await?;

        info!("Doctor {} deleted", doctor_id);
        Ok(())
    }

    /// Mark `date` as a day off. Adding an existing off-date is a no-op.
    pub async fn add_off_date(
        &self,
        doctor_id: Uuid,
        date: NaiveDate,
        auth_token: &str,
    ) -> Result<Doctor, DoctorError> {
        let doctor = self.get_doctor(doctor_id, Some(auth_token)).await?;
        if doctor.is_off_on(date) {
            return Ok(doctor);
        }

        let mut off_dates = doctor.off_dates;
        off_dates.push(date);

        let mut update_data = Map::new();
        update_data.insert("offDates".to_string(), json!(format_dates(normalize_dates(off_dates))));

        info!("Doctor {} marked off on {}", doctor_id, date);
        self.patch_doctor(doctor_id, update_data, auth_token).await
    }

    /// Remove `date` from the doctor's off-dates. Removing a missing date is a no-op.
    pub async fn remove_off_date(
        &self,
        doctor_id: Uuid,
        date: NaiveDate,
        auth_token: &str,
    ) -> Result<Doctor, DoctorError> {
        let doctor = self.get_doctor(doctor_id, Some(auth_token)).await?;
        if !doctor.is_off_on(date) {
            return Ok(doctor);
        }

        let off_dates: Vec<NaiveDate> = doctor.off_dates.into_iter().filter(|d| *d != date).collect();

        let mut update_data = Map::new();
        update_data.insert("offDates".to_string(), json!(format_dates(off_dates)));

        info!("Doctor {} available again on {}", doctor_id, date);
        self.patch_doctor(doctor_id, update_data, auth_token).await
    }

    /// Derive the bookable calendar from the doctor record and the live
    /// appointments inside the horizon.
    pub async fn get_calendar(
        &self,
        doctor_id: Uuid,
        reference: DateTime<Utc>,
        auth_token: Option<&str>,
    ) -> Result<Vec<CalendarDay>, DoctorError> {
        let doctor = self.get_doctor(doctor_id, auth_token).await?;

        let path = format!(
            "/rest/v1/appointments?doctorId=eq.{}&date=gte.{}&status=in.(pending,accepted)",
            doctor_id,
            reference.date_naive().format(DATE_FORMAT)
        );
        let appointments: Vec<Appointment> = self.supabase.request(Method::GET, &path, auth_token, None).await?;

        self.calendar.build(&doctor, &appointments, reference)
    }

    async fn patch_doctor(
        &self,
        doctor_id: Uuid,
        mut update_data: Map<String, Value>,
        auth_token: &str,
    ) -> Result<Doctor, DoctorError> {
        update_data.insert("updatedAt".to_string(), json!(Utc::now().to_rfc3339()));

        let path = format!("/rest/v1/doctors?id=eq.{}", doctor_id);
        let rows: Vec<Doctor> = self
            .supabase
            .write_returning(Method::PATCH, &path, Some(auth_token), Some(Value::Object(update_data)))
            .await?;

        rows.into_iter().next().ok_or(DoctorError::NotFound)
    }
}

fn normalize_dates(mut dates: Vec<NaiveDate>) -> Vec<NaiveDate> {
    dates.sort();
    dates.dedup();
    dates
}

fn format_dates(dates: Vec<NaiveDate>) -> Vec<String> {
    dates
        .into_iter()
        .map(|date| date.format(DATE_FORMAT).to_string())
        .collect()
}
