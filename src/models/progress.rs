use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Stored progress entry for a reel and/or course
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Progress {
    pub id: i64,
    pub user_id: i64,
    pub reel_id: Option<i64>,
    pub course_id: Option<i64>,
    pub completed: bool,
    pub completed_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

/// Upsert request for a progress entry, keyed by (user, reel, course)
#[derive(Debug, Clone, PartialEq)]
pub struct ProgressUpdate {
    pub user_id: i64,
    pub reel_id: Option<i64>,
    pub course_id: Option<i64>,
    pub completed: bool,
}

impl ProgressUpdate {
    pub fn same_key(&self, progress: &Progress) -> bool {
        progress.user_id == self.user_id
            && progress.reel_id == self.reel_id
            && progress.course_id == self.course_id
    }
}

/// One observed interaction, as read by the feed
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WatchRecord {
    pub user_id: i64,
    /// Watched reel; `None` for course-level records
    pub content_id: Option<i64>,
    pub course_id: Option<i64>,
    pub completed: bool,
    pub completed_at: Option<DateTime<Utc>>,
}

impl WatchRecord {
    /// Record for a watched reel
    pub fn watched(user_id: i64, content_id: i64) -> Self {
        Self {
            user_id,
            content_id: Some(content_id),
            course_id: None,
            completed: true,
            completed_at: None,
        }
    }

    /// Record for a course, with no reel of its own
    pub fn course(user_id: i64, course_id: i64) -> Self {
        Self {
            user_id,
            content_id: None,
            course_id: Some(course_id),
            completed: true,
            completed_at: None,
        }
    }
}

impl From<&Progress> for WatchRecord {
    fn from(progress: &Progress) -> Self {
        Self {
            user_id: progress.user_id,
            content_id: progress.reel_id,
            course_id: progress.course_id,
            completed: progress.completed,
            completed_at: progress.completed_at,
        }
    }
}
