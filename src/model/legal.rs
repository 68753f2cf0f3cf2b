use serde::{Deserialize, Serialize};

/// Admin-maintained page content, stored as a singleton per kind.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LegalDocument {
    pub title: String,
    pub content: String,
    pub contact_email: Option<String>,
    pub contact_address: Option<String>,
    pub updated_ts: i64,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ContactSubject {
    General,
    Job,
    Employer,
    Technical,
    Other,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContactMessage {
    pub id: String, // UUID
    pub full_name: String,
    pub email: String,
    pub subject: ContactSubject,
    pub message: String,
    pub phone: Option<String>,
    #[serde(default)]
    pub is_read: bool,
    pub created_ts: i64,
}
