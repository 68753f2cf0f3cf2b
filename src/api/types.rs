use serde::{Deserialize, Serialize};

use crate::model::application::ApplicationStatus;
use crate::model::legal::ContactSubject;

#[derive(Deserialize)]
pub struct CreateJobRequest {
    pub title: String,
    pub description: String,
    pub category: Option<String>,
    pub location: Option<String>,
    pub salary_min: Option<u64>,
    pub salary_max: Option<u64>,
}

#[derive(Deserialize)]
pub struct UpdateJobRequest {
    pub title: Option<String>,
    pub description: Option<String>,
    pub category: Option<String>,
    pub location: Option<String>,
    pub salary_min: Option<u64>,
    pub salary_max: Option<u64>,
    pub is_open: Option<bool>,
}

#[derive(Deserialize)]
pub struct ApplyRequest {
    pub cover_letter: Option<String>,
}

#[derive(Deserialize)]
pub struct StatusUpdateRequest {
    pub status: ApplicationStatus,
}

#[derive(Deserialize)]
pub struct ContactRequest {
    pub full_name: String,
    pub email: String,
    pub subject: ContactSubject,
    pub message: String,
    pub phone: Option<String>,
}

#[derive(Serialize)]
pub struct DeletedResponse {
    pub deleted: usize,
}
