use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Category of a notification. Drives presentation only.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NotificationKind {
    Assignment,
    Test,
    Submission,
    Grade,
    CourseMaterial,
    TestCompletion,
    #[serde(other)]
    Other,
}

impl NotificationKind {
    pub const ALL: [NotificationKind; 7] = [
        NotificationKind::Assignment,
        NotificationKind::Test,
        NotificationKind::Submission,
        NotificationKind::Grade,
        NotificationKind::CourseMaterial,
        NotificationKind::TestCompletion,
        NotificationKind::Other,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            NotificationKind::Assignment => "assignment",
            NotificationKind::Test => "test",
            NotificationKind::Submission => "submission",
            NotificationKind::Grade => "grade",
            NotificationKind::CourseMaterial => "course_material",
            NotificationKind::TestCompletion => "test_completion",
            NotificationKind::Other => "other",
        }
    }
}

impl std::fmt::Display for NotificationKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for NotificationKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        NotificationKind::ALL
            .into_iter()
            .find(|k| k.as_str() == s)
            .ok_or_else(|| format!("unknown notification type '{}'", s))
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct Notification {
    pub id: Uuid,
    pub user_id: Uuid,
    pub r#type: NotificationKind, // 'type' is a reserved keyword
    pub title: String,
    pub message: String,
    pub is_read: bool,
    pub created_at: DateTime<Utc>,
}

/// Payload for creating a notification. The store assigns id, read state and timestamp.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct NewNotification {
    pub user_id: Uuid,
    pub r#type: NotificationKind,
    pub title: String,
    pub message: String,
}

/// Body of both PATCH routes. Only `true` is accepted by the store.
#[derive(Debug, Serialize, Deserialize, Clone, Copy)]
pub struct ReadStatePatch {
    pub is_read: bool,
}

#[derive(Debug, Serialize, Deserialize, Clone, Copy)]
pub struct UnreadCount {
    pub count: u64,
}

#[derive(Debug, Serialize, Deserialize, Clone, Copy)]
pub struct UpdatedCount {
    pub updated: u64,
}
