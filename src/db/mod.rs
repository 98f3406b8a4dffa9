//! Persistence collaborators.
//!
//! Each trait covers one resource. Handlers depend on the combined [`Store`];
//! the feed only needs [`HistoryReader`] and [`ContentRepository`].

use async_trait::async_trait;

use crate::{
    error::AppResult,
    models::{
        AiMetadata, Comment, Course, NewComment, NewCourse, NewPlaylist, NewReel, NewUser, Page,
        Playlist, Progress, ProgressUpdate, Reel, ReelFilter, User, WatchRecord,
    },
};

pub mod memory;
pub mod postgres;
pub mod redis;

pub use self::memory::MemoryStore;
pub use self::postgres::{create_pool, PgStore};
pub use self::redis::{
    create_redis_client, AiSubject, Cache, CacheKey, CacheWriterHandle, AI_CACHE_TTL_SECS,
};

#[async_trait]
pub trait UserStore: Send + Sync {
    /// Fails with `Conflict` when the email is already registered
    async fn create_user(&self, user: NewUser) -> AppResult<User>;

    async fn find_user(&self, id: i64) -> AppResult<Option<User>>;

    async fn find_user_by_email(&self, email: &str) -> AppResult<Option<User>>;
}

/// Source of reels, both as feed candidates and as display records
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ContentRepository: Send + Sync {
    async fn create_reel(&self, reel: NewReel) -> AppResult<Reel>;

    async fn get_reel(&self, id: i64) -> AppResult<Option<Reel>>;

    /// Reels with the given ids; unknown ids are skipped
    async fn get_reels(&self, ids: &[i64]) -> AppResult<Vec<Reel>>;

    /// Every reel passing the filter, in ascending id order
    async fn feed_candidates(&self, filter: &ReelFilter) -> AppResult<Vec<Reel>>;

    /// Newest first
    async fn list_reels(&self, creator_id: Option<i64>, page: Page) -> AppResult<Vec<Reel>>;

    /// Bumps the view counter and returns the updated reel
    async fn record_view(&self, id: i64) -> AppResult<Option<Reel>>;

    async fn update_ai_metadata(&self, id: i64, metadata: AiMetadata) -> AppResult<()>;

    /// Returns whether a reel was deleted
    async fn delete_reel(&self, id: i64) -> AppResult<bool>;
}

/// Read side of watch progress
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait HistoryReader: Send + Sync {
    /// Every progress record of the user, reel- and course-level alike
    async fn watch_history(&self, user_id: i64) -> AppResult<Vec<WatchRecord>>;
}

#[async_trait]
pub trait ProgressStore: Send + Sync {
    /// Inserts or updates the entry keyed by (user, reel, course)
    async fn upsert_progress(&self, update: ProgressUpdate) -> AppResult<Progress>;

    /// Newest first
    async fn list_progress(&self, user_id: i64) -> AppResult<Vec<Progress>>;

    async fn count_completed_reels(&self, user_id: i64, reel_ids: &[i64]) -> AppResult<usize>;
}

#[async_trait]
pub trait CourseStore: Send + Sync {
    async fn create_course(&self, course: NewCourse) -> AppResult<Course>;

    async fn get_course(&self, id: i64) -> AppResult<Option<Course>>;

    /// Newest first
    async fn list_courses(&self, page: Page) -> AppResult<Vec<Course>>;
}

#[async_trait]
pub trait PlaylistStore: Send + Sync {
    async fn create_playlist(&self, playlist: NewPlaylist) -> AppResult<Playlist>;

    /// Only returns the playlist when it belongs to `user_id`
    async fn get_playlist(&self, id: i64, user_id: i64) -> AppResult<Option<Playlist>>;

    async fn list_playlists(&self, user_id: i64) -> AppResult<Vec<Playlist>>;

    /// Adding a reel that is already present is a no-op
    async fn add_reel_to_playlist(&self, playlist_id: i64, reel_id: i64) -> AppResult<()>;
}

#[async_trait]
pub trait CommentStore: Send + Sync {
    async fn create_comment(&self, comment: NewComment) -> AppResult<Comment>;

    /// Newest first
    async fn list_comments(&self, reel_id: i64) -> AppResult<Vec<Comment>>;
}

/// Everything the HTTP layer persists
pub trait Store:
    UserStore
    + ContentRepository
    + HistoryReader
    + ProgressStore
    + CourseStore
    + PlaylistStore
    + CommentStore
{
}

impl<T> Store for T where
    T: UserStore
        + ContentRepository
        + HistoryReader
        + ProgressStore
        + CourseStore
        + PlaylistStore
        + CommentStore
{
}
