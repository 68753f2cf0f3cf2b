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
use crate::api::types::{CreateJobRequest, UpdateJobRequest};
use crate::model::job::Job;
use crate::model::notification::NotificationKind;
use crate::model::user::User;
use crate::state::AppState;

pub async fn list_jobs(
    State(state): State<AppState>,
) -> Result<Json<Vec<Job>>, (StatusCode, String)> {
    let jobs = state.db.list_jobs().await.map_err(internal)?;
    Ok(Json(jobs.into_iter().filter(|j| j.is_open).collect()))
}

pub async fn get_job(
    State(state): State<AppState>,
    Path(job_id): Path<String>,
) -> Result<Json<Job>, (StatusCode, String)> {
    state
        .db
        .load_job(&job_id)
        .await
        .map_err(internal)?
        .map(Json)
        .ok_or((StatusCode::NOT_FOUND, "Job not found".into()))
}

pub async fn list_my_jobs(
    State(state): State<AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
) -> Result<Json<Vec<Job>>, (StatusCode, String)> {
    let jobs = state
        .db
        .list_jobs_for_employer(&claims.sub)
        .await
        .map_err(internal)?;
    Ok(Json(jobs))
}

pub async fn create_job(
    State(state): State<AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Json(req): Json<CreateJobRequest>,
) -> Result<Json<Job>, (StatusCode, String)> {
    let employer = require_employer(&state, &claims.sub).await?;

    if req.title.trim().is_empty() {
        return Err((StatusCode::BAD_REQUEST, "Title is required".into()));
    }

    let now = chrono::Utc::now().timestamp();
    let job = Job {
        id: Uuid::new_v4().to_string(),
        employer_id: employer.id.clone(),
        title: req.title.trim().to_string(),
        description: req.description,
        category: req.category,
        location: req.location,
        salary_min: req.salary_min,
        salary_max: req.salary_max,
        is_open: true,
        created_ts: now,
        updated_ts: now,
    };
    state.db.save_job(&job).await.map_err(internal)?;

    // explicit, post-write: no hidden persistence hooks
    notify(
        &state.db,
        &employer.id,
        NotificationKind::Job,
        format!("Job '{}' was created.", job.title),
        Some(job.id.clone()),
    )
    .await;

    Ok(Json(job))
}

pub async fn update_job(
    State(state): State<AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Path(job_id): Path<String>,
    Json(req): Json<UpdateJobRequest>,
) -> Result<Json<Job>, (StatusCode, String)> {
    let mut job = owned_job(&state, &claims.sub, &job_id).await?;

    if let Some(title) = req.title {
        job.title = title;
    }
    if let Some(description) = req.description {
        job.description = description;
    }
    if req.category.is_some() {
        job.category = req.category;
    }
    if req.location.is_some() {
        job.location = req.location;
    }
    if req.salary_min.is_some() {
        job.salary_min = req.salary_min;
    }
    if req.salary_max.is_some() {
        job.salary_max = req.salary_max;
    }
    if let Some(is_open) = req.is_open {
        job.is_open = is_open;
    }
    job.updated_ts = chrono::Utc::now().timestamp();

    state.db.save_job(&job).await.map_err(internal)?;
    Ok(Json(job))
}

pub async fn delete_job(
    State(state): State<AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Path(job_id): Path<String>,
) -> Result<Json<Value>, (StatusCode, String)> {
    let job = owned_job(&state, &claims.sub, &job_id).await?;
    state.db.delete_job(&job.id).await.map_err(internal)?;
    Ok(Json(json!({ "success": "Job deleted." })))
}

async fn require_employer(
    state: &AppState,
    user_id: &str,
) -> Result<User, (StatusCode, String)> {
    let user = state
        .db
        .load_user(user_id)
        .await
        .map_err(internal)?
        .ok_or((StatusCode::UNAUTHORIZED, "Unknown user".to_string()))?;
    if !user.role.can_post_jobs() {
        return Err((
            StatusCode::FORBIDDEN,
            "Only employer accounts can manage jobs".into(),
        ));
    }
    Ok(user)
}

async fn owned_job(
    state: &AppState,
    user_id: &str,
    job_id: &str,
) -> Result<Job, (StatusCode, String)> {
    let user = require_employer(state, user_id).await?;
    let job = state
        .db
        .load_job(job_id)
        .await
        .map_err(internal)?
        .ok_or((StatusCode::NOT_FOUND, "Job not found".to_string()))?;
    if job.employer_id != user.id {
        return Err((StatusCode::FORBIDDEN, "Not your job posting".into()));
    }
    Ok(job)
}
