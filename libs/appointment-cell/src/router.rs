use std::sync::Arc;

use axum::{
    middleware,
    routing::{get, patch},
    Router,
};

use shared_config::AppConfig;
use shared_utils::extractor::auth_middleware;

use crate::handlers::{self, AppointmentState};
use crate::services::booking::AppointmentBookingService;
use crate::services::store::{AppointmentStore, SupabaseAppointmentStore};

pub fn appointment_routes(config: Arc<AppConfig>, store: Arc<dyn AppointmentStore>) -> Router {
    let state = AppointmentState {
        booking: Arc::new(AppointmentBookingService::new(store, &config)),
    };

    // All appointment operations require authentication
    let protected_routes = Router::new()
        .route("/", get(handlers::list_appointments).post(handlers::book_appointment))
        .route(
            "/{appointment_id}",
            get(handlers::get_appointment)
                .put(handlers::update_appointment)
                .delete(handlers::delete_appointment),
        )
        .route("/{appointment_id}/status", patch(handlers::update_appointment_status))
        .route("/doctors/{doctor_id}", get(handlers::get_doctor_appointments))
        .route("/patients/{patient_id}", get(handlers::get_patient_appointments))
        .layer(middleware::from_fn_with_state(config, auth_middleware));

    Router::new().merge(protected_routes).with_state(state)
}

/// Routes backed by the Supabase store.
pub fn supabase_appointment_routes(config: Arc<AppConfig>) -> Router {
    let store = Arc::new(SupabaseAppointmentStore::new(&config));
    appointment_routes(config, store)
}
