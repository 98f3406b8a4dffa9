use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq)]
pub struct Comment {
    pub id: i64,
    pub content: String,
    pub user_id: i64,
    pub reel_id: i64,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct NewComment {
    pub content: String,
    pub user_id: i64,
    pub reel_id: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CommentResponse {
    pub id: i64,
    pub content: String,
    pub user_id: i64,
    pub reel_id: i64,
    pub created_at: DateTime<Utc>,
    pub user_name: String,
}

impl CommentResponse {
    pub fn new(comment: Comment, user_name: String) -> Self {
        Self {
            id: comment.id,
            content: comment.content,
            user_id: comment.user_id,
            reel_id: comment.reel_id,
            created_at: comment.created_at,
            user_name,
        }
    }
}
