use std::sync::Arc;

use axum::{
    middleware,
    routing::{delete, get, post, put},
    Router,
};

use shared_config::AppConfig;
use shared_utils::extractor::auth_middleware;

use crate::handlers;

pub fn doctor_routes(state: Arc<AppConfig>) -> Router {
    // Public routes (booking UIs read these anonymously)
    let public_routes = Router::new()
        .route("/", get(handlers::list_doctors))
        .route("/{doctor_id}", get(handlers::get_doctor))
        .route("/{doctor_id}/calendar", get(handlers::get_doctor_calendar));

    // Staff routes; row-level security on the forwarded token decides who may write
    let protected_routes = Router::new()
        .route("/", post(handlers::create_doctor))
        .route("/{doctor_id}", put(handlers::update_doctor).delete(handlers::delete_doctor))
        .route("/{doctor_id}/off-dates", post(handlers::add_off_date))
        .route("/{doctor_id}/off-dates/{date}", delete(handlers::remove_off_date))
        .layer(middleware::from_fn_with_state(state.clone(), auth_middleware));

    Router::new()
        .merge(public_routes)
        .merge(protected_routes)
        .with_state(state)
}

pub fn profession_routes(state: Arc<AppConfig>) -> Router {
    let public_routes = Router::new()
        .route("/", get(handlers::list_professions))
        .route("/{profession_id}", get(handlers::get_profession));

    let protected_routes = Router::new()
        .route("/", post(handlers::create_profession))
        .route("/{profession_id}", put(handlers::update_profession).delete(handlers::delete_profession))
        .layer(middleware::from_fn_with_state(state.clone(), auth_middleware));

    Router::new()
        .merge(public_routes)
        .merge(protected_routes)
        .with_state(state)
}
