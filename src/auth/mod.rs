pub mod device;
pub mod device_service;
pub mod device_tokens;
pub mod google;
pub mod handlers;
pub mod jwt;
pub mod types;
pub mod utils;

use axum::{
    routing::{get, post},
    Router,
};

use crate::state::AppState;
use handlers::{
    change_password_handler, list_devices_handler, login_handler, register_handler,
    request_device_verification_handler, verify_device_handler, verify_email_handler,
};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/api/auth/register", post(register_handler))
        .route("/api/auth/login", post(login_handler))
        .route("/api/auth/change-password", post(change_password_handler))
        .route("/api/auth/devices", get(list_devices_handler))
        .route("/api/auth/verify-device", get(verify_device_handler))
        .route("/api/auth/verify-email", get(verify_email_handler))
        .route(
            "/api/auth/request-device-verification",
            post(request_device_verification_handler),
        )
        .route("/api/auth/google/start", get(google::google_login_start))
        .route(
            "/api/auth/google/callback",
            get(google::google_login_callback),
        )
}
