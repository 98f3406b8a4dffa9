use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{Reel, ReelResponse};

/// User-curated list of reels
#[derive(Debug, Clone, PartialEq)]
pub struct Playlist {
    pub id: i64,
    pub title: String,
    pub description: Option<String>,
    pub user_id: i64,
    pub created_at: DateTime<Utc>,
    /// Reels in the order they were added
    pub reels: Vec<Reel>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct NewPlaylist {
    pub title: String,
    pub description: Option<String>,
    pub user_id: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PlaylistResponse {
    pub id: i64,
    pub title: String,
    pub description: Option<String>,
    pub user_id: i64,
    pub created_at: DateTime<Utc>,
    pub reels: Vec<ReelResponse>,
}

impl From<Playlist> for PlaylistResponse {
    fn from(playlist: Playlist) -> Self {
        Self {
            id: playlist.id,
            title: playlist.title,
            description: playlist.description,
            user_id: playlist.user_id,
            created_at: playlist.created_at,
            reels: playlist.reels.into_iter().map(ReelResponse::from).collect(),
        }
    }
}
