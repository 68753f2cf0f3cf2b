use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use uuid::Uuid;

use crate::api::auth::AuthenticatedUser;
use crate::api::internal;
use crate::api::notifications::notify;
use crate::api::types::{ApplyRequest, StatusUpdateRequest};
use crate::model::application::Application;
use crate::model::notification::NotificationKind;
use crate::state::AppState;

pub async fn apply(
    State(state): State<AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Path(job_id): Path<String>,
    Json(req): Json<ApplyRequest>,
) -> Result<Json<Application>, (StatusCode, String)> {
    let seeker = state
        .db
        .load_user(&claims.sub)
        .await
        .map_err(internal)?
        .ok_or((StatusCode::UNAUTHORIZED, "Unknown user".to_string()))?;
    if !seeker.role.can_apply() {
        return Err((
            StatusCode::FORBIDDEN,
            "Only job-seeker accounts can apply".into(),
        ));
    }

    let job = state
        .db
        .load_job(&job_id)
        .await
        .map_err(internal)?
        .ok_or((StatusCode::NOT_FOUND, "Job not found".to_string()))?;
    if !job.is_open {
        return Err((StatusCode::BAD_REQUEST, "Job is closed".into()));
    }

    if state
        .db
        .find_application(&job.id, &seeker.id)
        .await
        .map_err(internal)?
        .is_some()
    {
        return Err((StatusCode::BAD_REQUEST, "Already applied to this job".into()));
    }

    let now = chrono::Utc::now().timestamp();
    let app = Application {
        id: Uuid::new_v4().to_string(),
        job_id: job.id.clone(),
        seeker_id: seeker.id.clone(),
        cover_letter: req.cover_letter,
        status: Default::default(),
        created_ts: now,
        updated_ts: now,
    };
    state.db.save_application(&app).await.map_err(internal)?;

    notify(
        &state.db,
        &job.employer_id,
        NotificationKind::ApplicationCreated,
        format!("New application submitted for '{}'.", job.title),
        Some(app.id.clone()),
    )
    .await;

    Ok(Json(app))
}

pub async fn list_for_job(
    State(state): State<AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Path(job_id): Path<String>,
) -> Result<Json<Vec<Application>>, (StatusCode, String)> {
    let job = state
        .db
        .load_job(&job_id)
        .await
        .map_err(internal)?
        .ok_or((StatusCode::NOT_FOUND, "Job not found".to_string()))?;
    if job.employer_id != claims.sub {
        return Err((StatusCode::FORBIDDEN, "Not your job posting".into()));
    }

    let apps = state
        .db
        .list_applications_for_job(&job.id)
        .await
        .map_err(internal)?;
    Ok(Json(apps))
}

pub async fn list_mine(
    State(state): State<AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
) -> Result<Json<Vec<Application>>, (StatusCode, String)> {
    let apps = state
        .db
        .list_applications_for_seeker(&claims.sub)
        .await
        .map_err(internal)?;
    Ok(Json(apps))
}

pub async fn update_status(
    State(state): State<AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Path(application_id): Path<String>,
    Json(req): Json<StatusUpdateRequest>,
) -> Result<Json<Application>, (StatusCode, String)> {
    let app = state
        .db
        .load_application(&application_id)
        .await
        .map_err(internal)?
        .ok_or((StatusCode::NOT_FOUND, "Application not found".to_string()))?;

    let job = state
        .db
        .load_job(&app.job_id)
        .await
        .map_err(internal)?
        .ok_or((StatusCode::NOT_FOUND, "Job not found".to_string()))?;
    if job.employer_id != claims.sub {
        return Err((StatusCode::FORBIDDEN, "Not your job posting".into()));
    }

    let now = chrono::Utc::now().timestamp();
    let updated = state
        .db
        .set_application_status(&app.id, req.status, now)
        .await
        .map_err(internal)?
        .ok_or((StatusCode::NOT_FOUND, "Application not found".to_string()))?;

    notify(
        &state.db,
        &updated.seeker_id,
        NotificationKind::ApplicationStatus,
        format!(
            "Your application for '{}' is now {}.",
            job.title,
            updated.status.label()
        ),
        Some(updated.id.clone()),
    )
    .await;

    Ok(Json(updated))
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::auth::device_tokens::DeviceTokenSigner;
    use crate::auth::jwt::Claims;
    use crate::config::Config;
    use crate::db::DBLayer;
    use crate::email::ConsoleMailer;
    use crate::model::job::Job;
    use crate::model::user::{User, UserRole};

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

    fn claims(user_id: &str) -> AuthenticatedUser {
        AuthenticatedUser(Claims {
            sub: user_id.into(),
            exp: usize::MAX,
        })
    }

    async fn seed_job_and_seeker(state: &AppState) -> String {
        for (id, email, role) in [
            ("emp1", "emp@example.com", UserRole::Employer),
            ("seek1", "seek@example.com", UserRole::JobSeeker),
        ] {
            state
                .db
                .insert_user(&User {
                    id: id.into(),
                    email: email.into(),
                    full_name: None,
                    created_ts: 0,
                    password_hash: None,
                    role,
                    company_name: None,
                    is_email_verified: true,
                    meta: None,
                })
                .await
                .unwrap();
        }
        let job = Job {
            id: "j1".into(),
            employer_id: "emp1".into(),
            title: "Backend Engineer".into(),
            description: "Build things".into(),
            category: None,
            location: None,
            salary_min: None,
            salary_max: None,
            is_open: true,
            created_ts: 0,
            updated_ts: 0,
        };
        state.db.save_job(&job).await.unwrap();
        job.id
    }

    #[tokio::test]
    async fn second_application_to_same_job_rejected() {
        let (_dir, state) = test_state();
        let job_id = seed_job_and_seeker(&state).await;

        let first = apply(
            State(state.clone()),
            claims("seek1"),
            Path(job_id.clone()),
            Json(ApplyRequest {
                cover_letter: Some("hello".into()),
            }),
        )
        .await;
        assert!(first.is_ok());

        let second = apply(
            State(state.clone()),
            claims("seek1"),
            Path(job_id),
            Json(ApplyRequest { cover_letter: None }),
        )
        .await;
        let (status, msg) = second.err().unwrap();
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(msg, "Already applied to this job");
        assert_eq!(
            state.db.list_applications_for_job("j1").await.unwrap().len(),
            1
        );
    }

    #[tokio::test]
    async fn employer_accounts_cannot_apply() {
        let (_dir, state) = test_state();
        let job_id = seed_job_and_seeker(&state).await;

        let res = apply(
            State(state),
            claims("emp1"),
            Path(job_id),
            Json(ApplyRequest { cover_letter: None }),
        )
        .await;
        assert_eq!(res.err().unwrap().0, StatusCode::FORBIDDEN);
    }
}
