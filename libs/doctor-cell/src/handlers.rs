use std::sync::Arc;

use axum::{
    extract::{Extension, Path, Query, State},
    http::StatusCode,
    Json,
};
use axum_extra::TypedHeader;
use chrono::{NaiveDate, Utc};
use headers::{authorization::Bearer, Authorization};
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::info;
use uuid::Uuid;

use shared_config::AppConfig;
use shared_models::auth::User;
use shared_models::dates::parse_calendar_date;
use shared_models::error::AppError;

use crate::models::{CreateDoctorRequest, OffDateRequest, ProfessionRequest, UpdateDoctorRequest};
use crate::services::{doctor::DoctorService, profession::ProfessionService};

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DoctorListQuery {
    pub profession_id: Option<Uuid>,
}

// ==============================================================================
// PUBLIC DOCTOR HANDLERS
// ==============================================================================

#[axum::debug_handler]
pub async fn list_doctors(
    State(state): State<Arc<AppConfig>>,
    Query(query): Query<DoctorListQuery>,
) -> Result<Json<Value>, AppError> {
    let doctor_service = DoctorService::new(&state);

    let doctors = doctor_service.list_doctors(query.profession_id, None).await?;

    Ok(Json(json!(doctors)))
}

#[axum::debug_handler]
pub async fn get_doctor(
    State(state): State<Arc<AppConfig>>,
    Path(doctor_id): Path<Uuid>,
) -> Result<Json<Value>, AppError> {
    let doctor_service = DoctorService::new(&state);

    let doctor = doctor_service.get_doctor(doctor_id, None).await?;

    Ok(Json(json!(doctor)))
}

/// Bookable days and hours for the next horizon, starting today.
#[axum::debug_handler]
pub async fn get_doctor_calendar(
    State(state): State<Arc<AppConfig>>,
    Path(doctor_id): Path<Uuid>,
) -> Result<Json<Value>, AppError> {
    let doctor_service = DoctorService::new(&state);

    let calendar = doctor_service.get_calendar(doctor_id, Utc::now(), None).await?;

    Ok(Json(json!(calendar)))
}

// ==============================================================================
// PROTECTED DOCTOR HANDLERS
// ==============================================================================

#[axum::debug_handler]
pub async fn create_doctor(
    State(state): State<Arc<AppConfig>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
    Json(request): Json<CreateDoctorRequest>,
) -> Result<(StatusCode, Json<Value>), AppError> {
    let doctor_service = DoctorService::new(&state);

    let doctor = doctor_service.create_doctor(request, auth.token()).await?;
    info!("Doctor {} created by user {}", doctor.id, user.id);

    Ok((StatusCode::CREATED, Json(json!(doctor))))
}

#[axum::debug_handler]
pub async fn update_doctor(
    State(state): State<Arc<AppConfig>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Path(doctor_id): Path<Uuid>,
    Json(request): Json<UpdateDoctorRequest>,
) -> Result<Json<Value>, AppError> {
    let doctor_service = DoctorService::new(&state);

    let doctor = doctor_service.update_doctor(doctor_id, request, auth.token()).await?;

    Ok(Json(json!(doctor)))
}

#[axum::debug_handler]
pub async fn delete_doctor(
    State(state): State<Arc<AppConfig>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
    Path(doctor_id): Path<Uuid>,
) -> Result<StatusCode, AppError> {
    let doctor_service = DoctorService::new(&state);

    doctor_service.delete_doctor(doctor_id, auth.token()).await?;
    info!("Doctor {} deleted by user {}", doctor_id, user.id);

    Ok(StatusCode::NO_CONTENT)
}

#[axum::debug_handler]
pub async fn add_off_date(
    State(state): State<Arc<AppConfig>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Path(doctor_id): Path<Uuid>,
    Json(request): Json<OffDateRequest>,
) -> Result<Json<Value>, AppError> {
    let doctor_service = DoctorService::new(&state);

    let doctor = doctor_service.add_off_date(doctor_id, request.date, auth.token()).await?;

    Ok(Json(json!(doctor)))
}

#[axum::debug_handler]
pub async fn remove_off_date(
    State(state): State<Arc<AppConfig>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Path((doctor_id, date)): Path<(Uuid, String)>,
) -> Result<Json<Value>, AppError> {
    let date: NaiveDate = parse_calendar_date(&date)
        .ok_or_else(|| AppError::ValidationError(format!("Invalid date: {}", date)))?;

    let doctor_service = DoctorService::new(&state);

    let doctor = doctor_service.remove_off_date(doctor_id, date, auth.token()).await?;

    Ok(Json(json!(doctor)))
}

// ==============================================================================
// PROFESSION HANDLERS
// ==============================================================================

#[axum::debug_handler]
pub async fn list_professions(
    State(state): State<Arc<AppConfig>>,
) -> Result<Json<Value>, AppError> {
    let profession_service = ProfessionService::new(&state);

    let professions = profession_service.list_professions(None).await?;

    Ok(Json(json!(professions)))
}

#[axum::debug_handler]
pub async fn get_profession(
    State(state): State<Arc<AppConfig>>,
    Path(profession_id): Path<Uuid>,
) -> Result<Json<Value>, AppError> {
    let profession_service = ProfessionService::new(&state);

    let profession = profession_service.get_profession(profession_id, None).await?;

    Ok(Json(json!(profession)))
}

#[axum::debug_handler]
pub async fn create_profession(
    State(state): State<Arc<AppConfig>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Json(request): Json<ProfessionRequest>,
) -> Result<(StatusCode, Json<Value>), AppError> {
    let profession_service = ProfessionService::new(&state);

    let profession = profession_service.create_profession(request, auth.token()).await?;

    Ok((StatusCode::CREATED, Json(json!(profession))))
}

#[axum::debug_handler]
pub async fn update_profession(
    State(state): State<Arc<AppConfig>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Path(profession_id): Path<Uuid>,
    Json(request): Json<ProfessionRequest>,
) -> Result<Json<Value>, AppError> {
    let profession_service = ProfessionService::new(&state);

    let profession = profession_service.update_profession(profession_id, request, auth.token()).await?;

    Ok(Json(json!(profession)))
}

#[axum::debug_handler]
pub async fn delete_profession(
    State(state): State<Arc<AppConfig>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Path(profession_id): Path<Uuid>,
) -> Result<StatusCode, AppError> {
    let profession_service = ProfessionService::new(&state);

    profession_service.delete_profession(profession_id, auth.token()).await?;

    Ok(StatusCode::NO_CONTENT)
}
