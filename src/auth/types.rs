use serde::{Deserialize, Serialize};

use crate::model::user::UserRole;

#[derive(Deserialize)]
pub struct RegisterRequest {
    pub email: String,
    pub password: String,
    pub full_name: Option<String>,
    pub role: Option<UserRole>,
    pub company_name: Option<String>,
}

#[derive(Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Serialize)]
pub struct AuthResponse {
    pub jwt: String,
    pub user_id: String,
    pub email: String,
    pub role: UserRole,
    /// True when this login registered a previously unseen device.
    pub new_device: bool,
}

#[derive(Deserialize)]
pub struct ChangePasswordRequest {
    pub current_password: String,
    pub new_password: String,
}

#[derive(Deserialize)]
pub struct VerifyDeviceQuery {
    pub token: String,
}

#[derive(Deserialize)]
pub struct VerifyEmailQuery {
    pub token: String,
}

#[derive(Serialize)]
pub struct VerifyDeviceResponse {
    pub jwt: String,
    pub user_id: String,
    pub device_id: String,
}
