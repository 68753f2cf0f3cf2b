pub mod applications;
pub mod auth;
pub mod jobs;
pub mod legal;
pub mod notifications;
pub mod types;

use axum::http::StatusCode;
use axum::{
    routing::{delete, get, post, put},
    Router,
};

use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        // jobs
        .route("/api/jobs", get(jobs::list_jobs))
        .route("/api/jobs", post(jobs::create_job))
        .route("/api/jobs/mine", get(jobs::list_my_jobs))
        .route("/api/jobs/{job_id}", get(jobs::get_job))
        .route("/api/jobs/{job_id}", put(jobs::update_job))
        .route("/api/jobs/{job_id}", delete(jobs::delete_job))
        // applications
        .route("/api/jobs/{job_id}/apply", post(applications::apply))
        .route(
            "/api/jobs/{job_id}/applications",
            get(applications::list_for_job),
        )
        .route("/api/applications/mine", get(applications::list_mine))
        .route(
            "/api/applications/{application_id}/status",
            put(applications::update_status),
        )
        // notifications
        .route("/api/notifications", get(notifications::list))
        .route(
            "/api/notifications/mark-all-read",
            post(notifications::mark_all_read),
        )
        .route(
            "/api/notifications/{id}/mark-read",
            post(notifications::mark_read),
        )
        .route(
            "/api/notifications/{id}/mark-unread",
            post(notifications::mark_unread),
        )
        .route("/api/notifications/{id}", delete(notifications::delete_one))
        .route("/api/notifications", delete(notifications::delete_all))
        // legal / support
        .route("/api/legal/privacy-policy", get(legal::privacy_policy))
        .route("/api/legal/about-us", get(legal::about_us))
        .route("/api/legal/contact-us", post(legal::contact_us))
        .route(
            "/api/legal/contact-messages",
            get(legal::list_contact_messages),
        )
        .route(
            "/api/legal/contact-messages/{id}/mark-read",
            post(legal::mark_contact_message_read),
        )
}

pub(crate) fn internal<E: std::fmt::Display>(e: E) -> (StatusCode, String) {
    (StatusCode::INTERNAL_SERVER_ERROR, e.to_string())
}
