use async_trait::async_trait;
use chrono::Utc;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use tokio::sync::RwLock;

use crate::{
    error::{AppError, AppResult},
    models::{
        AiMetadata, Comment, Course, NewComment, NewCourse, NewPlaylist, NewReel, NewUser, Page,
        Playlist, Progress, ProgressUpdate, Reel, ReelFilter, User, WatchRecord,
    },
};

use super::{
    CommentStore, ContentRepository, CourseStore, HistoryReader, PlaylistStore, ProgressStore,
    UserStore,
};

struct CourseRecord {
    id: i64,
    title: String,
    description: Option<String>,
    difficulty: crate::models::Difficulty,
    creator_id: i64,
    created_at: chrono::DateTime<Utc>,
    reel_ids: Vec<i64>,
}

struct PlaylistRecord {
    id: i64,
    title: String,
    description: Option<String>,
    user_id: i64,
    created_at: chrono::DateTime<Utc>,
    reel_ids: Vec<i64>,
}

/// Tables held by the in-memory store
#[derive(Default)]
struct Tables {
    next_id: i64,
    users: Vec<User>,
    reels: HashMap<i64, Reel>,
    courses: Vec<CourseRecord>,
    playlists: Vec<PlaylistRecord>,
    progress: Vec<Progress>,
    comments: Vec<Comment>,
}

impl Tables {
    fn allocate_id(&mut self) -> i64 {
        self.next_id += 1;
        self.next_id
    }

    fn resolve_reels(&self, ids: &[i64]) -> Vec<Reel> {
        ids.iter().filter_map(|id| self.reels.get(id)).cloned().collect()
    }

    fn course(&self, record: &CourseRecord) -> Course {
        Course {
            id: record.id,
            title: record.title.clone(),
            description: record.description.clone(),
            difficulty: record.difficulty.clone(),
            creator_id: record.creator_id,
            created_at: record.created_at,
            reels: self.resolve_reels(&record.reel_ids),
        }
    }

    fn playlist(&self, record: &PlaylistRecord) -> Playlist {
        Playlist {
            id: record.id,
            title: record.title.clone(),
            description: record.description.clone(),
            user_id: record.user_id,
            created_at: record.created_at,
            reels: self.resolve_reels(&record.reel_ids),
        }
    }
}

/// Process-local store used when no database is configured, and in tests
///
/// Ids come from a single counter shared by all tables, so they are unique
/// and increase with insertion order.
#[derive(Clone, Default)]
pub struct MemoryStore {
    inner: Arc<RwLock<Tables>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

/// Newest first; the id breaks ties between rows created in the same instant
fn newest_first<T>(items: &mut [T], key: impl Fn(&T) -> (chrono::DateTime<Utc>, i64)) {
    items.sort_by(|a, b| key(b).cmp(&key(a)));
}

#[async_trait]
impl UserStore for MemoryStore {
    async fn create_user(&self, user: NewUser) -> AppResult<User> {
        let mut tables = self.inner.write().await;
        if tables.users.iter().any(|u| u.email == user.email) {
            return Err(AppError::Conflict("Email already registered".to_string()));
        }

        let user = User {
            id: tables.allocate_id(),
            email: user.email,
            password_hash: user.password_hash,
            full_name: user.full_name,
            role: user.role,
            created_at: Utc::now(),
        };
        tables.users.push(user.clone());
        Ok(user)
    }

    async fn find_user(&self, id: i64) -> AppResult<Option<User>> {
        let tables = self.inner.read().await;
        Ok(tables.users.iter().find(|u| u.id == id).cloned())
    }

    async fn find_user_by_email(&self, email: &str) -> AppResult<Option<User>> {
        let tables = self.inner.read().await;
        Ok(tables.users.iter().find(|u| u.email == email).cloned())
    }
}

#[async_trait]
impl ContentRepository for MemoryStore {
    async fn create_reel(&self, reel: NewReel) -> AppResult<Reel> {
        let mut tables = self.inner.write().await;
        let reel = Reel {
            id: tables.allocate_id(),
            title: reel.title,
            description: reel.description,
            video_url: reel.video_url,
            media_public_id: reel.media_public_id,
            tags: reel.tags,
            difficulty: reel.difficulty,
            duration_seconds: reel.duration_seconds,
            creator_id: reel.creator_id,
            created_at: Utc::now(),
            views_count: 0,
            ai_summary: None,
            ai_key_points: None,
            ai_quiz: None,
            transcript: None,
        };
        tables.reels.insert(reel.id, reel.clone());
        Ok(reel)
    }

    async fn get_reel(&self, id: i64) -> AppResult<Option<Reel>> {
        let tables = self.inner.read().await;
        Ok(tables.reels.get(&id).cloned())
    }

    async fn get_reels(&self, ids: &[i64]) -> AppResult<Vec<Reel>> {
        let tables = self.inner.read().await;
        Ok(tables.resolve_reels(ids))
    }

    async fn feed_candidates(&self, filter: &ReelFilter) -> AppResult<Vec<Reel>> {
        let tables = self.inner.read().await;
        let mut reels: Vec<Reel> = tables
            .reels
            .values()
            .filter(|reel| filter.matches(reel))
            .cloned()
            .collect();
        reels.sort_by_key(|reel| reel.id);
        Ok(reels)
    }

    async fn list_reels(&self, creator_id: Option<i64>, page: Page) -> AppResult<Vec<Reel>> {
        let tables = self.inner.read().await;
        let mut reels: Vec<Reel> = tables
            .reels
            .values()
            .filter(|reel| creator_id.map_or(true, |id| reel.creator_id == id))
            .cloned()
            .collect();
        newest_first(&mut reels, |reel| (reel.created_at, reel.id));
        Ok(page.apply(reels))
    }

    async fn record_view(&self, id: i64) -> AppResult<Option<Reel>> {
        let mut tables = self.inner.write().await;
        Ok(tables.reels.get_mut(&id).map(|reel| {
            reel.views_count += 1;
            reel.clone()
        }))
    }

    async fn update_ai_metadata(&self, id: i64, metadata: AiMetadata) -> AppResult<()> {
        let mut tables = self.inner.write().await;
        let reel = tables
            .reels
            .get_mut(&id)
            .ok_or_else(|| AppError::NotFound("Reel not found".to_string()))?;
        reel.ai_summary = metadata.summary;
        reel.ai_key_points = metadata.key_points;
        reel.ai_quiz = metadata.quiz;
        Ok(())
    }

    async fn delete_reel(&self, id: i64) -> AppResult<bool> {
        let mut tables = self.inner.write().await;
        if tables.reels.remove(&id).is_none() {
            return Ok(false);
        }

        tables.comments.retain(|c| c.reel_id != id);
        tables.progress.retain(|p| p.reel_id != Some(id));
        for course in tables.courses.iter_mut() {
            course.reel_ids.retain(|r| *r != id);
        }
        for playlist in tables.playlists.iter_mut() {
            playlist.reel_ids.retain(|r| *r != id);
        }
        Ok(true)
    }
}

#[async_trait]
impl HistoryReader for MemoryStore {
    async fn watch_history(&self, user_id: i64) -> AppResult<Vec<WatchRecord>> {
        let tables = self.inner.read().await;
        Ok(tables
            .progress
            .iter()
            .filter(|p| p.user_id == user_id)
            .map(WatchRecord::from)
            .collect())
    }
}

#[async_trait]
impl ProgressStore for MemoryStore {
    async fn upsert_progress(&self, update: ProgressUpdate) -> AppResult<Progress> {
        let mut tables = self.inner.write().await;
        let now = Utc::now();

        if let Some(existing) = tables.progress.iter_mut().find(|p| update.same_key(p)) {
            existing.completed = update.completed;
            if update.completed {
                existing.completed_at = Some(now);
            }
            return Ok(existing.clone());
        }

        let progress = Progress {
            id: tables.allocate_id(),
            user_id: update.user_id,
            reel_id: update.reel_id,
            course_id: update.course_id,
            completed: update.completed,
            completed_at: update.completed.then_some(now),
            created_at: now,
        };
        tables.progress.push(progress.clone());
        Ok(progress)
    }

    async fn list_progress(&self, user_id: i64) -> AppResult<Vec<Progress>> {
        let tables = self.inner.read().await;
        let mut entries: Vec<Progress> = tables
            .progress
            .iter()
            .filter(|p| p.user_id == user_id)
            .cloned()
            .collect();
        newest_first(&mut entries, |p| (p.created_at, p.id));
        Ok(entries)
    }

    async fn count_completed_reels(&self, user_id: i64, reel_ids: &[i64]) -> AppResult<usize> {
        let tables = self.inner.read().await;
        let completed: HashSet<i64> = tables
            .progress
            .iter()
            .filter(|p| p.user_id == user_id && p.completed)
            .filter_map(|p| p.reel_id)
            .filter(|id| reel_ids.contains(id))
            .collect();
        Ok(completed.len())
    }
}

#[async_trait]
impl CourseStore for MemoryStore {
    async fn create_course(&self, course: NewCourse) -> AppResult<Course> {
        let mut tables = self.inner.write().await;
        let record = CourseRecord {
            id: tables.allocate_id(),
            title: course.title,
            description: course.description,
            difficulty: course.difficulty,
            creator_id: course.creator_id,
            created_at: Utc::now(),
            reel_ids: course.reel_ids,
        };
        let created = tables.course(&record);
        tables.courses.push(record);
        Ok(created)
    }

    async fn get_course(&self, id: i64) -> AppResult<Option<Course>> {
        let tables = self.inner.read().await;
        Ok(tables
            .courses
            .iter()
            .find(|c| c.id == id)
            .map(|record| tables.course(record)))
    }

    async fn list_courses(&self, page: Page) -> AppResult<Vec<Course>> {
        let tables = self.inner.read().await;
        let mut courses: Vec<Course> = tables.courses.iter().map(|c| tables.course(c)).collect();
        newest_first(&mut courses, |c| (c.created_at, c.id));
        Ok(page.apply(courses))
    }
}

#[async_trait]
impl PlaylistStore for MemoryStore {
    async fn create_playlist(&self, playlist: NewPlaylist) -> AppResult<Playlist> {
        let mut tables = self.inner.write().await;
        let record = PlaylistRecord {
            id: tables.allocate_id(),
            title: playlist.title,
            description: playlist.description,
            user_id: playlist.user_id,
            created_at: Utc::now(),
            reel_ids: Vec::new(),
        };
        let created = tables.playlist(&record);
        tables.playlists.push(record);
        Ok(created)
    }

    async fn get_playlist(&self, id: i64, user_id: i64) -> AppResult<Option<Playlist>> {
        let tables = self.inner.read().await;
        Ok(tables
            .playlists
            .iter()
            .find(|p| p.id == id && p.user_id == user_id)
            .map(|record| tables.playlist(record)))
    }

    async fn list_playlists(&self, user_id: i64) -> AppResult<Vec<Playlist>> {
        let tables = self.inner.read().await;
        Ok(tables
            .playlists
            .iter()
            .filter(|p| p.user_id == user_id)
            .map(|record| tables.playlist(record))
            .collect())
    }

    async fn add_reel_to_playlist(&self, playlist_id: i64, reel_id: i64) -> AppResult<()> {
        let mut tables = self.inner.write().await;
        let playlist = tables
            .playlists
            .iter_mut()
            .find(|p| p.id == playlist_id)
            .ok_or_else(|| AppError::NotFound("Playlist not found".to_string()))?;
        if !playlist.reel_ids.contains(&reel_id) {
            playlist.reel_ids.push(reel_id);
        }
        Ok(())
    }
}

#[async_trait]
impl CommentStore for MemoryStore {
    async fn create_comment(&self, comment: NewComment) -> AppResult<Comment> {
        let mut tables = self.inner.write().await;
        let comment = Comment {
            id: tables.allocate_id(),
            content: comment.content,
            user_id: comment.user_id,
            reel_id: comment.reel_id,
            created_at: Utc::now(),
        };
        tables.comments.push(comment.clone());
        Ok(comment)
    }

    async fn list_comments(&self, reel_id: i64) -> AppResult<Vec<Comment>> {
        let tables = self.inner.read().await;
        let mut comments: Vec<Comment> = tables
            .comments
            .iter()
            .filter(|c| c.reel_id == reel_id)
            .cloned()
            .collect();
        newest_first(&mut comments, |c| (c.created_at, c.id));
        Ok(comments)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{CourseProgress, Difficulty, Role};

    fn new_reel(creator_id: i64, tags: &str, difficulty: Difficulty) -> NewReel {
        NewReel {
            title: format!("{} reel", tags),
            description: None,
            video_url: "https://videos.example/v.mp4".to_string(),
            media_public_id: None,
            tags: tags.to_string(),
            difficulty,
            duration_seconds: 60,
            creator_id,
        }
    }

    fn reel_progress(user_id: i64, reel_id: i64, completed: bool) -> ProgressUpdate {
        ProgressUpdate {
            user_id,
            reel_id: Some(reel_id),
            course_id: None,
            completed,
        }
    }

    #[tokio::test]
    async fn test_duplicate_email_conflicts() {
        let store = MemoryStore::new();
        let user = NewUser {
            email: "grace@example.com".to_string(),
            password_hash: "hash".to_string(),
            full_name: None,
            role: Role::Creator,
        };

        store.create_user(user.clone()).await.unwrap();
        let err = store.create_user(user).await.unwrap_err();
        assert!(matches!(err, AppError::Conflict(_)));
    }

    #[tokio::test]
    async fn test_feed_candidates_filter_and_order() {
        let store = MemoryStore::new();
        let a = store
            .create_reel(new_reel(1, "python,web", Difficulty::Beginner))
            .await
            .unwrap();
        store
            .create_reel(new_reel(1, "rust", Difficulty::Advanced))
            .await
            .unwrap();
        let c = store
            .create_reel(new_reel(1, "webassembly", Difficulty::Beginner))
            .await
            .unwrap();

        let filter = ReelFilter {
            tag_contains: Some("web".to_string()),
            difficulty: Some(Difficulty::Beginner),
        };
        let ids: Vec<i64> = store
            .feed_candidates(&filter)
            .await
            .unwrap()
            .into_iter()
            .map(|r| r.id)
            .collect();
        assert_eq!(ids, vec![a.id, c.id]);
    }

    #[tokio::test]
    async fn test_progress_upsert_is_idempotent() {
        let store = MemoryStore::new();

        let first = store.upsert_progress(reel_progress(1, 10, false)).await.unwrap();
        assert!(first.completed_at.is_none());

        let second = store.upsert_progress(reel_progress(1, 10, true)).await.unwrap();
        assert_eq!(first.id, second.id);
        assert!(second.completed);
        assert!(second.completed_at.is_some());

        assert_eq!(store.list_progress(1).await.unwrap().len(), 1);
        assert_eq!(store.watch_history(1).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_count_completed_reels() {
        let store = MemoryStore::new();
        store.upsert_progress(reel_progress(1, 10, true)).await.unwrap();
        store.upsert_progress(reel_progress(1, 11, false)).await.unwrap();
        store.upsert_progress(reel_progress(2, 12, true)).await.unwrap();

        let count = store.count_completed_reels(1, &[10, 11, 12]).await.unwrap();
        assert_eq!(count, 1);
    }

    #[tokio::test]
    async fn test_reel_completed_alone_and_in_course_counts_once() {
        let store = MemoryStore::new();
        store.upsert_progress(reel_progress(1, 5, true)).await.unwrap();
        store
            .upsert_progress(ProgressUpdate {
                course_id: Some(3),
                ..reel_progress(1, 5, true)
            })
            .await
            .unwrap();

        let completed = store.count_completed_reels(1, &[5]).await.unwrap();
        assert_eq!(completed, 1);

        let progress = CourseProgress::new(3, 1, completed);
        assert_eq!(progress.completion_percentage, 100.0);
    }

    #[tokio::test]
    async fn test_playlist_add_is_idempotent_and_owner_scoped() {
        let store = MemoryStore::new();
        let reel = store
            .create_reel(new_reel(1, "sql", Difficulty::Beginner))
            .await
            .unwrap();
        let playlist = store
            .create_playlist(NewPlaylist {
                title: "Databases".to_string(),
                description: None,
                user_id: 5,
            })
            .await
            .unwrap();

        store.add_reel_to_playlist(playlist.id, reel.id).await.unwrap();
        store.add_reel_to_playlist(playlist.id, reel.id).await.unwrap();

        let fetched = store.get_playlist(playlist.id, 5).await.unwrap().unwrap();
        assert_eq!(fetched.reels.len(), 1);
        assert!(store.get_playlist(playlist.id, 6).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_delete_reel_cascades() {
        let store = MemoryStore::new();
        let reel = store
            .create_reel(new_reel(1, "go", Difficulty::Intermediate))
            .await
            .unwrap();
        let course = store
            .create_course(NewCourse {
                title: "Go basics".to_string(),
                description: None,
                difficulty: Difficulty::Intermediate,
                creator_id: 1,
                reel_ids: vec![reel.id],
            })
            .await
            .unwrap();
        store
            .create_comment(NewComment {
                content: "Nice".to_string(),
                user_id: 2,
                reel_id: reel.id,
            })
            .await
            .unwrap();
        store.upsert_progress(reel_progress(2, reel.id, true)).await.unwrap();

        assert!(store.delete_reel(reel.id).await.unwrap());
        assert!(!store.delete_reel(reel.id).await.unwrap());

        assert!(store.list_comments(reel.id).await.unwrap().is_empty());
        assert!(store.watch_history(2).await.unwrap().is_empty());
        let course = store.get_course(course.id).await.unwrap().unwrap();
        assert!(course.reels.is_empty());
    }

    #[tokio::test]
    async fn test_record_view_increments() {
        let store = MemoryStore::new();
        let reel = store
            .create_reel(new_reel(1, "css", Difficulty::Beginner))
            .await
            .unwrap();

        store.record_view(reel.id).await.unwrap();
        let viewed = store.record_view(reel.id).await.unwrap().unwrap();
        assert_eq!(viewed.views_count, 2);
        assert!(store.record_view(999).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_course_keeps_reel_order() {
        let store = MemoryStore::new();
        let first = store
            .create_reel(new_reel(1, "a", Difficulty::Beginner))
            .await
            .unwrap();
        let second = store
            .create_reel(new_reel(1, "b", Difficulty::Beginner))
            .await
            .unwrap();

        let course = store
            .create_course(NewCourse {
                title: "Ordered".to_string(),
                description: None,
                difficulty: Difficulty::Beginner,
                creator_id: 1,
                reel_ids: vec![second.id, first.id],
            })
            .await
            .unwrap();

        let ids: Vec<i64> = course.reels.iter().map(|r| r.id).collect();
        assert_eq!(ids, vec![second.id, first.id]);
    }
}
