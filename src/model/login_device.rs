use serde::{Deserialize, Serialize};

/// One registry row per (user, fingerprint) pair. Created unverified on the
/// first login from an unseen fingerprint; metadata refreshed in place on
/// every later login from the same fingerprint.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoginDevice {
    pub id: String,       // UUID
    pub user_id: String,  // FK → User.id
    pub fingerprint: String,
    pub device_name: String,
    pub os: String,
    pub browser: String,
    pub user_agent: String,
    pub ip_address: Option<String>,
    #[serde(default)]
    pub is_verified: bool,
    #[serde(default)]
    pub verified_ts: Option<i64>,
    pub created_ts: i64,
    pub last_login_ts: i64,
}
