use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use serde_json::{json, Value};
use uuid::Uuid;

use crate::api::auth::AuthenticatedUser;
use crate::api::internal;
use crate::api::notifications::notify;
use crate::api::types::ContactRequest;
use crate::model::legal::{ContactMessage, LegalDocument};
use crate::model::notification::NotificationKind;
use crate::model::user::UserRole;
use crate::state::AppState;

pub const PRIVACY_POLICY: &str = "privacy_policy";
pub const ABOUT_US: &str = "about_us";

pub async fn privacy_policy(
    State(state): State<AppState>,
) -> Result<Json<LegalDocument>, (StatusCode, String)> {
    load_page(&state, PRIVACY_POLICY).await
}

pub async fn about_us(
    State(state): State<AppState>,
) -> Result<Json<LegalDocument>, (StatusCode, String)> {
    load_page(&state, ABOUT_US).await
}

async fn load_page(
    state: &AppState,
    kind: &str,
) -> Result<Json<LegalDocument>, (StatusCode, String)> {
    state
        .db
        .load_legal_document(kind)
        .await
        .map_err(internal)?
        .map(Json)
        .ok_or((StatusCode::NOT_FOUND, "Page not found".into()))
}

pub async fn list_contact_messages(
    State(state): State<AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
) -> Result<Json<Vec<ContactMessage>>, (StatusCode, String)> {
    require_admin(&state, &claims.sub).await?;
    let messages = state.db.list_contact_messages().await.map_err(internal)?;
    Ok(Json(messages))
}

pub async fn mark_contact_message_read(
    State(state): State<AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Path(id): Path<String>,
) -> Result<Json<Value>, (StatusCode, String)> {
    require_admin(&state, &claims.sub).await?;
    if !state
        .db
        .set_contact_message_read(&id)
        .await
        .map_err(internal)?
    {
        return Err((StatusCode::NOT_FOUND, "Message not found".into()));
    }
    Ok(Json(json!({ "success": "Message marked as read." })))
}

async fn require_admin(state: &AppState, user_id: &str) -> Result<(), (StatusCode, String)> {
    let user = state
        .db
        .load_user(user_id)
        .await
        .map_err(internal)?
        .ok_or((StatusCode::UNAUTHORIZED, "Unknown user".to_string()))?;
    if user.role != UserRole::Admin {
        return Err((StatusCode::FORBIDDEN, "Admin only".into()));
    }
    Ok(())
}

pub async fn contact_us(
    State(state): State<AppState>,
    Json(req): Json<ContactRequest>,
) -> Result<Json<Value>, (StatusCode, String)> {
    if req.full_name.trim().is_empty() || !req.email.contains('@') {
        return Err((StatusCode::BAD_REQUEST, "Invalid contact details".into()));
    }
    if req.message.trim().is_empty() {
        return Err((StatusCode::BAD_REQUEST, "Message is required".into()));
    }

    let msg = ContactMessage {
        id: Uuid::new_v4().to_string(),
        full_name: req.full_name,
        email: req.email,
        subject: req.subject,
        message: req.message,
        phone: req.phone,
        is_read: false,
        created_ts: chrono::Utc::now().timestamp(),
    };
    state.db.save_contact_message(&msg).await.map_err(internal)?;

    // surface the message to every admin account
    let admins = state
        .db
        .list_users_with_role(UserRole::Admin)
        .await
        .map_err(internal)?;
    for admin in admins {
        notify(
            &state.db,
            &admin.id,
            NotificationKind::Contact,
            format!("New contact message from {}.", msg.full_name),
            Some(msg.id.clone()),
        )
        .await;
    }

    Ok(Json(
        json!({ "success": "Your message has been sent successfully" }),
    ))
}
