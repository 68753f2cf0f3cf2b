use std::net::SocketAddr;

use axum::{
    extract::{ConnectInfo, Query, State},
    http::{HeaderMap, StatusCode},
    response::Redirect,
};
use serde::Deserialize;
use serde_json::json;
use uuid::Uuid;

use crate::auth::handlers::run_device_trust;
use crate::auth::jwt::create_jwt;
use crate::auth::utils::normalize_email;
use crate::db::DBLayer;
use crate::model::user::{User, UserRole};
use crate::state::AppState;

#[derive(Deserialize)]
pub struct CallbackQuery {
    pub code: Option<String>,
}

#[derive(Deserialize)]
struct TokenResponse {
    id_token: Option<String>,
}

#[derive(Deserialize)]
struct TokenInfo {
    email: Option<String>,
    given_name: Option<String>,
    family_name: Option<String>,
    name: Option<String>,
}

/// GET /api/auth/google/start: redirect to the Google consent screen.
pub async fn google_login_start(
    State(state): State<AppState>,
) -> Result<Redirect, (StatusCode, String)> {
    let Some(google) = &state.config.google else {
        return Err((StatusCode::BAD_REQUEST, "Google login disabled".into()));
    };

    let auth_url = format!(
        "https://accounts.google.com/o/oauth2/v2/auth\
         ?response_type=code\
         &client_id={}\
         &scope=openid%20email%20profile\
         &access_type=online\
         &redirect_uri={}",
        google.client_id, google.redirect_uri
    );
    Ok(Redirect::temporary(&auth_url))
}

/// GET /api/auth/google/callback?code=...: exchange the code, upsert the
/// user by email, run the device-trust flow and bounce back to the
/// frontend with a session token. All upstream failures land on the
/// frontend error URL rather than a bare API error page.
pub async fn google_login_callback(
    State(state): State<AppState>,
    ConnectInfo(peer): ConnectInfo<SocketAddr>,
    headers: HeaderMap,
    Query(q): Query<CallbackQuery>,
) -> Redirect {
    let error_url = state.config.frontend_error_url.clone();

    let Some(google) = state.config.google.clone() else {
        return Redirect::temporary(&error_url);
    };
    let Some(code) = q.code else {
        return Redirect::temporary(&error_url);
    };

    let client = reqwest::Client::new();

    let token_res: TokenResponse = match client
        .post("https://oauth2.googleapis.com/token")
        .form(&[
            ("code", code.as_str()),
            ("client_id", google.client_id.as_str()),
            ("client_secret", google.client_secret.as_str()),
            ("redirect_uri", google.redirect_uri.as_str()),
            ("grant_type", "authorization_code"),
        ])
        .send()
        .await
        .and_then(|r| r.error_for_status())
    {
        Ok(res) => match res.json().await {
            Ok(body) => body,
            Err(e) => {
                tracing::warn!(error = %e, "google token response unreadable");
                return Redirect::temporary(&error_url);
            }
        },
        Err(e) => {
            tracing::warn!(error = %e, "google code exchange failed");
            return Redirect::temporary(&error_url);
        }
    };

    let Some(id_token) = token_res.id_token else {
        return Redirect::temporary(&error_url);
    };

    let info: TokenInfo = match client
        .get("https://oauth2.googleapis.com/tokeninfo")
        .query(&[("id_token", id_token.as_str())])
        .send()
        .await
        .and_then(|r| r.error_for_status())
    {
        Ok(res) => match res.json().await {
            Ok(body) => body,
            Err(e) => {
                tracing::warn!(error = %e, "google tokeninfo unreadable");
                return Redirect::temporary(&error_url);
            }
        },
        Err(e) => {
            tracing::warn!(error = %e, "google tokeninfo lookup failed");
            return Redirect::temporary(&error_url);
        }
    };

    let Some(email) = info.email.as_deref().map(normalize_email) else {
        return Redirect::temporary(&error_url);
    };

    let full_name = info.name.clone().or_else(|| {
        match (info.given_name.as_deref(), info.family_name.as_deref()) {
            (Some(g), Some(f)) => Some(format!("{g} {f}")),
            (Some(g), None) => Some(g.to_string()),
            _ => None,
        }
    });

    let user = match upsert_google_user(&state.db, &email, full_name).await {
        Ok(user) => user,
        Err(e) => {
            tracing::error!(error = %e, "google user upsert failed");
            return Redirect::temporary(&error_url);
        }
    };

    run_device_trust(&state, &user, &headers, Some(peer)).await;

    let Ok(jwt) = create_jwt(&user.id, &state.config.jwt_secret) else {
        return Redirect::temporary(&error_url);
    };

    let success_url = format!("{}?token={jwt}", state.config.frontend_success_url);
    Redirect::temporary(&success_url)
}

async fn upsert_google_user(
    db: &DBLayer,
    email: &str,
    full_name: Option<String>,
) -> anyhow::Result<User> {
    if let Some(mut user) = db.find_user_by_email(email).await? {
        // backfill the name on first federated login, never overwrite
        if user.full_name.is_none() && full_name.is_some() {
            user.full_name = full_name;
            db.save_user(&user).await?;
        }
        return Ok(user);
    }

    let user = User {
        id: Uuid::new_v4().to_string(),
        email: email.to_string(),
        full_name,
        created_ts: chrono::Utc::now().timestamp(),
        password_hash: None,
        role: UserRole::JobSeeker,
        company_name: None,
        // Google already confirmed ownership of the address
        is_email_verified: true,
        meta: Some(json!({ "auth_methods": ["google"] })),
    };
    if db.insert_user(&user).await? {
        return Ok(user);
    }
    // lost a race with a concurrent first login for the same address
    db.find_user_by_email(email)
        .await?
        .ok_or_else(|| anyhow::anyhow!("account for {email} disappeared mid-insert"))
}
