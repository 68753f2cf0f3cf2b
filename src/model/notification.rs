use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum NotificationKind {
    Job,
    ApplicationCreated,
    ApplicationStatus,
    Contact,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Notification {
    pub id: String,      // UUID
    pub user_id: String, // recipient
    pub kind: NotificationKind,
    pub message: String,
    /// Id of the job/application/contact the message refers to.
    pub subject_id: Option<String>,
    #[serde(default)]
    pub is_read: bool,
    pub created_ts: i64,
}
