use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Job {
    pub id: String,          // UUID
    pub employer_id: String, // FK → User.id (role Employer)
    pub title: String,
    pub description: String,
    pub category: Option<String>,
    pub location: Option<String>,
    pub salary_min: Option<u64>,
    pub salary_max: Option<u64>,
    #[serde(default = "default_open")]
    pub is_open: bool,
    pub created_ts: i64,
    pub updated_ts: i64,
}

fn default_open() -> bool {
    true
}
