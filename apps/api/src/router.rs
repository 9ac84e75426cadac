use std::sync::Arc;

use axum::{
    Router,
    routing::get,
};

use appointment_cell::router::supabase_appointment_routes;
use doctor_cell::router::{doctor_routes, profession_routes};
use shared_config::AppConfig;

pub fn create_router(state: Arc<AppConfig>) -> Router {
    Router::new()
        .route("/", get(|| async { "Clinic booking API is running!" }))
        .nest("/doctors", doctor_routes(state.clone()))
        .nest("/professions", profession_routes(state.clone()))
        .nest("/appointments", supabase_appointment_routes(state))
}
