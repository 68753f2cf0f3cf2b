use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use serde_json::{json, Value};
use uuid::Uuid;

use crate::api::auth::AuthenticatedUser;
use crate::api::internal;
use crate::api::types::DeletedResponse;
use crate::db::DBLayer;
use crate::model::notification::{Notification, NotificationKind};
use crate::state::AppState;

/// Persist a notification for `user_id`. Called explicitly from the
/// handler that caused the event; a failed write is logged and dropped,
/// it never fails the triggering request.
pub async fn notify(
    db: &DBLayer,
    user_id: &str,
    kind: NotificationKind,
    message: String,
    subject_id: Option<String>,
) {
    let n = Notification {
        id: Uuid::new_v4().to_string(),
        user_id: user_id.to_string(),
        kind,
        message,
        subject_id,
        is_read: false,
        created_ts: chrono::Utc::now().timestamp(),
    };
    if let Err(e) = db.push_notification(&n).await {
        tracing::warn!(error = %e, user = %user_id, "notification write failed");
    }
}

pub async fn list(
    State(state): State<AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
) -> Result<Json<Vec<Notification>>, (StatusCode, String)> {
    let list = state
        .db
        .list_notifications_for_user(&claims.sub)
        .await
        .map_err(internal)?;
    Ok(Json(list))
}

pub async fn mark_read(
    State(state): State<AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Path(id): Path<String>,
) -> Result<Json<Value>, (StatusCode, String)> {
    set_read(&state, &claims.sub, &id, true).await
}

pub async fn mark_unread(
    State(state): State<AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Path(id): Path<String>,
) -> Result<Json<Value>, (StatusCode, String)> {
    set_read(&state, &claims.sub, &id, false).await
}

async fn set_read(
    state: &AppState,
    user_id: &str,
    id: &str,
    is_read: bool,
) -> Result<Json<Value>, (StatusCode, String)> {
    let found = state
        .db
        .set_notification_read(user_id, id, is_read)
        .await
        .map_err(internal)?;
    if !found {
        return Err((StatusCode::NOT_FOUND, "Notification not found".into()));
    }
    Ok(Json(json!({ "success": true })))
}

pub async fn mark_all_read(
    State(state): State<AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
) -> Result<Json<Value>, (StatusCode, String)> {
    let updated = state
        .db
        .mark_all_notifications_read(&claims.sub)
        .await
        .map_err(internal)?;
    Ok(Json(json!({ "updated": updated })))
}

pub async fn delete_one(
    State(state): State<AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Path(id): Path<String>,
) -> Result<Json<Value>, (StatusCode, String)> {
    let found = state
        .db
        .delete_notification(&claims.sub, &id)
        .await
        .map_err(internal)?;
    if !found {
        return Err((StatusCode::NOT_FOUND, "Notification not found".into()));
    }
    Ok(Json(json!({ "success": true })))
}

pub async fn delete_all(
    State(state): State<AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
) -> Result<Json<DeletedResponse>, (StatusCode, String)> {
    let deleted = state
        .db
        .delete_all_notifications(&claims.sub)
        .await
        .map_err(internal)?;
    Ok(Json(DeletedResponse { deleted }))
}
