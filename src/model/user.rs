use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum UserRole {
    JobSeeker,
    Employer,
    Admin,
}

impl Default for UserRole {
    fn default() -> Self {
        UserRole::JobSeeker
    }
}

impl UserRole {
    pub fn can_post_jobs(&self) -> bool {
        matches!(self, UserRole::Employer | UserRole::Admin)
    }

    pub fn can_apply(&self) -> bool {
        matches!(self, UserRole::JobSeeker)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    pub id: String,
    pub email: String,
    pub full_name: Option<String>,
    pub created_ts: i64,
    /// None for accounts created through a federated identity only.
    pub password_hash: Option<String>,
    #[serde(default)]
    pub role: UserRole,
    /// Company name, shown on postings. Employer accounts only.
    #[serde(default)]
    pub company_name: Option<String>,
    /// Set once the registration email link is redeemed. Advisory, like
    /// device verification: an unconfirmed account can still log in.
    /// Federated accounts start confirmed.
    #[serde(default)]
    pub is_email_verified: bool,
    #[serde(default)]
    pub meta: Option<serde_json::Value>,
}
