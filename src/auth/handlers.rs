use std::net::SocketAddr;

use axum::{
    extract::{ConnectInfo, Query, State},
    http::{HeaderMap, StatusCode},
    Json,
};
use serde_json::{json, Value};
use uuid::Uuid;

use crate::api::auth::AuthenticatedUser;
use crate::api::internal;
use crate::auth::device::DeviceObservation;
use crate::auth::device_service::record_login;
use crate::auth::device_tokens::{DEVICE_TOKEN_MAX_AGE_SECS, EMAIL_TOKEN_MAX_AGE_SECS};
use crate::auth::jwt::create_jwt;
use crate::auth::types::*;
use crate::auth::utils::{hash_password, normalize_email, verify_password};
use crate::email;
use crate::model::login_device::LoginDevice;
use crate::model::user::{User, UserRole};
use crate::state::AppState;

pub async fn register_handler(
    State(state): State<AppState>,
    ConnectInfo(peer): ConnectInfo<SocketAddr>,
    headers: HeaderMap,
    Json(req): Json<RegisterRequest>,
) -> Result<Json<AuthResponse>, (StatusCode, String)> {
    let email = normalize_email(&req.email);
    if !email.contains('@') {
        return Err((StatusCode::BAD_REQUEST, "Invalid email address".into()));
    }
    if req.password.len() < 8 {
        return Err((
            StatusCode::BAD_REQUEST,
            "Password must be at least 8 characters".into(),
        ));
    }
    let role = match req.role.unwrap_or_default() {
        UserRole::Admin => {
            return Err((StatusCode::BAD_REQUEST, "Invalid role".into()));
        }
        role => role,
    };

    let hash = hash_password(&req.password).map_err(internal)?;

    let user = User {
        id: Uuid::new_v4().to_string(),
        email: email.clone(),
        full_name: req.full_name,
        created_ts: chrono::Utc::now().timestamp(),
        password_hash: Some(hash),
        role,
        company_name: req.company_name.filter(|_| role == UserRole::Employer),
        is_email_verified: false,
        meta: Some(json!({ "auth_methods": ["email"] })),
    };

    // the insert claims the email index atomically, so a racing duplicate
    // registration loses here rather than orphaning a row
    if !state.db.insert_user(&user).await.map_err(internal)? {
        return Err((StatusCode::BAD_REQUEST, "Email already registered".into()));
    }

    send_account_confirmation(&state, &user);

    let new_device = run_device_trust(&state, &user, &headers, Some(peer)).await;
    let jwt = create_jwt(&user.id, &state.config.jwt_secret).map_err(internal)?;

    Ok(Json(AuthResponse {
        jwt,
        user_id: user.id,
        email,
        role,
        new_device,
    }))
}

pub async fn login_handler(
    State(state): State<AppState>,
    ConnectInfo(peer): ConnectInfo<SocketAddr>,
    headers: HeaderMap,
    Json(req): Json<LoginRequest>,
) -> Result<Json<AuthResponse>, (StatusCode, String)> {
    let email = normalize_email(&req.email);

    let user = state
        .db
        .find_user_by_email(&email)
        .await
        .map_err(internal)?
        .ok_or((StatusCode::UNAUTHORIZED, "Invalid credentials".to_string()))?;

    let hash = user
        .password_hash
        .clone()
        .ok_or((StatusCode::UNAUTHORIZED, "Invalid credentials".to_string()))?;

    let valid = verify_password(&hash, &req.password).map_err(internal)?;
    if !valid {
        return Err((StatusCode::UNAUTHORIZED, "Invalid credentials".into()));
    }

    // Credentials accepted; the device-trust flow runs on every success and
    // only reports new-vs-known, it never blocks the session.
    let new_device = run_device_trust(&state, &user, &headers, Some(peer)).await;
    let jwt = create_jwt(&user.id, &state.config.jwt_secret).map_err(internal)?;

    Ok(Json(AuthResponse {
        jwt,
        user_id: user.id.clone(),
        email,
        role: user.role,
        new_device,
    }))
}

pub async fn change_password_handler(
    State(state): State<AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Json(req): Json<ChangePasswordRequest>,
) -> Result<Json<Value>, (StatusCode, String)> {
    let mut user = state
        .db
        .load_user(&claims.sub)
        .await
        .map_err(internal)?
        .ok_or((StatusCode::UNAUTHORIZED, "Unknown user".to_string()))?;

    let hash = user
        .password_hash
        .clone()
        .ok_or((StatusCode::BAD_REQUEST, "Account has no password".to_string()))?;
    if !verify_password(&hash, &req.current_password).map_err(internal)? {
        return Err((StatusCode::UNAUTHORIZED, "Invalid credentials".into()));
    }
    if req.new_password.len() < 8 {
        return Err((
            StatusCode::BAD_REQUEST,
            "Password must be at least 8 characters".into(),
        ));
    }

    user.password_hash = Some(hash_password(&req.new_password).map_err(internal)?);
    state.db.save_user(&user).await.map_err(internal)?;

    Ok(Json(json!({ "success": "Password updated successfully." })))
}

/// GET /api/auth/verify-email?token=...
///
/// Confirms the address a registration email was sent to. Confirmation is
/// advisory and never gates login; failures share one 400 response.
pub async fn verify_email_handler(
    State(state): State<AppState>,
    Query(q): Query<VerifyEmailQuery>,
) -> Result<Json<Value>, (StatusCode, String)> {
    let rejected = (StatusCode::BAD_REQUEST, "verification failed".to_string());

    let Some(address) = state.signer.redeem(&q.token, EMAIL_TOKEN_MAX_AGE_SECS) else {
        return Err(rejected);
    };
    let user = state
        .db
        .find_user_by_email(&address)
        .await
        .map_err(internal)?;
    let Some(mut user) = user else {
        return Err(rejected);
    };

    if !user.is_email_verified {
        user.is_email_verified = true;
        state.db.save_user(&user).await.map_err(internal)?;
        tracing::info!(user = %user.id, "email address confirmed");
    }

    Ok(Json(json!({ "success": "Email address confirmed." })))
}

/// GET /api/auth/verify-device?token=...
///
/// Every failure mode answers the same 400 so the response cannot be used
/// to probe fingerprints or token structure.
pub async fn verify_device_handler(
    State(state): State<AppState>,
    Query(q): Query<VerifyDeviceQuery>,
) -> Result<Json<VerifyDeviceResponse>, (StatusCode, String)> {
    let rejected = (StatusCode::BAD_REQUEST, "verification failed".to_string());

    let Some(fingerprint) = state.signer.redeem(&q.token, DEVICE_TOKEN_MAX_AGE_SECS) else {
        return Err(rejected);
    };

    let device = state
        .db
        .find_login_device_by_fingerprint(&fingerprint)
        .await
        .map_err(internal)?;
    let Some(mut device) = device else {
        return Err(rejected);
    };

    device.is_verified = true;
    device.verified_ts = Some(chrono::Utc::now().timestamp());
    state
        .db
        .save_login_device(&device)
        .await
        .map_err(internal)?;

    tracing::info!(user = %device.user_id, device = %device.id, "device verified");

    // verification completes a login for the owning user
    let jwt = create_jwt(&device.user_id, &state.config.jwt_secret).map_err(internal)?;

    Ok(Json(VerifyDeviceResponse {
        jwt,
        user_id: device.user_id.clone(),
        device_id: device.id,
    }))
}

/// POST /api/auth/request-device-verification
///
/// Re-sends the verification link for the device the caller is currently
/// on. Unlike the login-time alert this is synchronous, so a transport
/// failure surfaces to the caller as a generic delivery error, no retry.
pub async fn request_device_verification_handler(
    State(state): State<AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    ConnectInfo(peer): ConnectInfo<SocketAddr>,
    headers: HeaderMap,
) -> Result<Json<Value>, (StatusCode, String)> {
    let user = state
        .db
        .load_user(&claims.sub)
        .await
        .map_err(internal)?
        .ok_or((StatusCode::UNAUTHORIZED, "Unknown user".to_string()))?;

    let obs = DeviceObservation::from_request(&headers, Some(peer));
    let device = state
        .db
        .load_login_device(&user.id, &obs.fingerprint())
        .await
        .map_err(internal)?
        .ok_or((StatusCode::BAD_REQUEST, "Unknown device".to_string()))?;

    if device.is_verified {
        return Ok(Json(json!({ "success": "Device already verified." })));
    }

    let mailer = state.mailer.clone();
    let signer = state.signer.clone();
    let frontend_url = state.config.frontend_url.clone();
    let sent = tokio::task::spawn_blocking(move || {
        email::send_device_verification(mailer.as_ref(), &signer, &frontend_url, &user, &device)
    })
    .await
    .map_err(internal)?;

    if let Err(e) = sent {
        tracing::warn!(error = %e, "device verification email failed");
        return Err((StatusCode::BAD_GATEWAY, "delivery failed".into()));
    }

    Ok(Json(json!({ "success": "Verification email sent." })))
}

pub async fn list_devices_handler(
    State(state): State<AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
) -> Result<Json<Vec<LoginDevice>>, (StatusCode, String)> {
    let devices = state
        .db
        .list_devices_for_user(&claims.sub)
        .await
        .map_err(internal)?;
    Ok(Json(devices))
}

/// Tail of every successful credential check: fingerprint the request,
/// upsert the registry row, and on a new device fire the security alert
/// off the request path. Returns whether the device was new.
///
/// Registry or mail failures degrade to "known device" and a warning;
/// an already-authenticated login is never rolled back by its side
/// effects.
pub(crate) async fn run_device_trust(
    state: &AppState,
    user: &User,
    headers: &HeaderMap,
    peer: Option<SocketAddr>,
) -> bool {
    let obs = DeviceObservation::from_request(headers, peer);
    let (device, created) = match record_login(&state.db, &user.id, &obs).await {
        Ok(v) => v,
        Err(e) => {
            tracing::warn!(error = %e, user = %user.id, "device registry write failed");
            return false;
        }
    };

    // crawlers get a registry row like anyone else but never trigger mail
    if created && !obs.is_bot {
        tracing::info!(
            user = %user.id,
            device = %device.device_name,
            ip = device.ip_address.as_deref().unwrap_or("unknown"),
            "login from new device"
        );
        let mailer = state.mailer.clone();
        let user = user.clone();
        tokio::task::spawn_blocking(move || {
            if let Err(e) = email::send_new_device_alert(mailer.as_ref(), &user, &device) {
                tracing::warn!(error = %e, user = %user.id, "new-device alert failed");
            }
        });
    }

    created
}

/// Fires the address-confirmation email off the request path. Registration
/// already succeeded; a failed send only gets a warning.
fn send_account_confirmation(state: &AppState, user: &User) {
    let mailer = state.mailer.clone();
    let signer = state.signer.clone();
    let frontend_url = state.config.frontend_url.clone();
    let user = user.clone();
    tokio::task::spawn_blocking(move || {
        if let Err(e) =
            email::send_account_verification(mailer.as_ref(), &signer, &frontend_url, &user)
        {
            tracing::warn!(error = %e, user = %user.id, "account confirmation email failed");
        }
    });
}

#[cfg(test)]
mod tests {
    use std::net::SocketAddr;
    use std::sync::Arc;

    use axum::extract::ConnectInfo;

    use super::*;
    use crate::auth::device_tokens::DeviceTokenSigner;
    use crate::config::Config;
    use crate::db::DBLayer;
    use crate::email::ConsoleMailer;

    fn test_state() -> (tempfile::TempDir, AppState) {
        let dir = tempfile::tempdir().unwrap();
        let db = DBLayer::new(dir.path().to_str().unwrap()).unwrap();
        let config = Config {
            bind_addr: "127.0.0.1:0".into(),
            db_path: String::new(),
            jwt_secret: "test-jwt-secret".into(),
            device_token_secret: "test-device-secret".into(),
            frontend_url: "http://localhost:5173".into(),
            frontend_success_url: "http://localhost:5173/auth/success".into(),
            frontend_error_url: "http://localhost:5173/auth/error".into(),
            google: None,
        };
        let state = AppState {
            db: Arc::new(db),
            mailer: Arc::new(ConsoleMailer),
            signer: Arc::new(DeviceTokenSigner::new(&config.device_token_secret)),
            config: Arc::new(config),
        };
        (dir, state)
    }

    fn peer() -> ConnectInfo<SocketAddr> {
        ConnectInfo("203.0.113.9:44300".parse().unwrap())
    }

    fn registration(email: &str) -> Json<RegisterRequest> {
        Json(RegisterRequest {
            email: email.into(),
            password: "long-enough-password".into(),
            full_name: Some("Test User".into()),
            role: None,
            company_name: None,
        })
    }

    #[tokio::test]
    async fn duplicate_email_registration_rejected() {
        let (_dir, state) = test_state();

        let first = register_handler(
            State(state.clone()),
            peer(),
            HeaderMap::new(),
            registration("dup@example.com"),
        )
        .await;
        assert!(first.is_ok());

        // same address, different casing: still taken
        let second = register_handler(
            State(state.clone()),
            peer(),
            HeaderMap::new(),
            registration("Dup@Example.COM"),
        )
        .await;
        let (status, msg) = second.err().unwrap();
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(msg, "Email already registered");
    }

    #[tokio::test]
    async fn emailed_token_confirms_address() {
        let (_dir, state) = test_state();

        register_handler(
            State(state.clone()),
            peer(),
            HeaderMap::new(),
            registration("new@example.com"),
        )
        .await
        .unwrap();

        let before = state
            .db
            .find_user_by_email("new@example.com")
            .await
            .unwrap()
            .unwrap();
        assert!(!before.is_email_verified);

        let token = state.signer.issue("new@example.com");
        verify_email_handler(State(state.clone()), Query(VerifyEmailQuery { token }))
            .await
            .unwrap();

        let after = state
            .db
            .find_user_by_email("new@example.com")
            .await
            .unwrap()
            .unwrap();
        assert!(after.is_email_verified);
    }

    #[tokio::test]
    async fn garbage_email_token_rejected() {
        let (_dir, state) = test_state();
        let res = verify_email_handler(
            State(state),
            Query(VerifyEmailQuery {
                token: "a:b:c".into(),
            }),
        )
        .await;
        assert_eq!(res.err().unwrap().0, StatusCode::BAD_REQUEST);
    }
}
