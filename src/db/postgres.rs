use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{postgres::PgPoolOptions, types::Json, FromRow, PgPool};

use crate::{
    error::{AppError, AppResult},
    models::{
        AiMetadata, Comment, Course, Difficulty, NewComment, NewCourse, NewPlaylist, NewReel,
        NewUser, Page, Playlist, Progress, ProgressUpdate, Quiz, Reel, ReelFilter, Role, User,
        WatchRecord,
    },
};

use super::{
    CommentStore, ContentRepository, CourseStore, HistoryReader, PlaylistStore, ProgressStore,
    UserStore,
};

/// Creates a PostgreSQL connection pool
pub async fn create_pool(database_url: &str) -> anyhow::Result<PgPool> {
    let pool = PgPoolOptions::new()
        .max_connections(5)
        .connect(database_url)
        .await?;

    Ok(pool)
}

const REEL_COLUMNS: &str = "r.id, r.title, r.description, r.video_url, r.media_public_id, \
     r.tags, r.difficulty_level, r.duration_seconds, r.creator_id, r.created_at, \
     r.views_count, r.ai_summary, r.ai_key_points, r.ai_quiz, r.transcript";

/// Conflict target of the progress upsert; matches `progress_key_idx`
const PROGRESS_KEY: &str = "user_id, COALESCE(reel_id, 0), COALESCE(course_id, 0)";

const PROGRESS_COLUMNS: &str =
    "id, user_id, reel_id, course_id, completed, completed_at, created_at";

#[derive(FromRow)]
struct UserRow {
    id: i64,
    email: String,
    password_hash: String,
    full_name: Option<String>,
    role: String,
    created_at: DateTime<Utc>,
}

impl From<UserRow> for User {
    fn from(row: UserRow) -> Self {
        User {
            id: row.id,
            email: row.email,
            password_hash: row.password_hash,
            full_name: row.full_name,
            role: Role::parse(&row.role).unwrap_or_default(),
            created_at: row.created_at,
        }
    }
}

#[derive(FromRow)]
struct ReelRow {
    id: i64,
    title: String,
    description: Option<String>,
    video_url: String,
    media_public_id: Option<String>,
    tags: String,
    difficulty_level: String,
    duration_seconds: i32,
    creator_id: i64,
    created_at: DateTime<Utc>,
    views_count: i64,
    ai_summary: Option<String>,
    ai_key_points: Option<Json<Vec<String>>>,
    ai_quiz: Option<Json<Quiz>>,
    transcript: Option<String>,
}

impl From<ReelRow> for Reel {
    fn from(row: ReelRow) -> Self {
        Reel {
            id: row.id,
            title: row.title,
            description: row.description,
            video_url: row.video_url,
            media_public_id: row.media_public_id,
            tags: row.tags,
            difficulty: Difficulty::from(row.difficulty_level),
            duration_seconds: row.duration_seconds,
            creator_id: row.creator_id,
            created_at: row.created_at,
            views_count: row.views_count,
            ai_summary: row.ai_summary,
            ai_key_points: row.ai_key_points.map(|Json(points)| points),
            ai_quiz: row.ai_quiz.map(|Json(quiz)| quiz),
            transcript: row.transcript,
        }
    }
}

#[derive(FromRow)]
struct CourseRow {
    id: i64,
    title: String,
    description: Option<String>,
    difficulty_level: String,
    creator_id: i64,
    created_at: DateTime<Utc>,
}

impl CourseRow {
    fn into_course(self, reels: Vec<Reel>) -> Course {
        Course {
            id: self.id,
            title: self.title,
            description: self.description,
            difficulty: Difficulty::from(self.difficulty_level),
            creator_id: self.creator_id,
            created_at: self.created_at,
            reels,
        }
    }
}

#[derive(FromRow)]
struct PlaylistRow {
    id: i64,
    title: String,
    description: Option<String>,
    user_id: i64,
    created_at: DateTime<Utc>,
}

impl PlaylistRow {
    fn into_playlist(self, reels: Vec<Reel>) -> Playlist {
        Playlist {
            id: self.id,
            title: self.title,
            description: self.description,
            user_id: self.user_id,
            created_at: self.created_at,
            reels,
        }
    }
}

#[derive(FromRow)]
struct ProgressRow {
    id: i64,
    user_id: i64,
    reel_id: Option<i64>,
    course_id: Option<i64>,
    completed: bool,
    completed_at: Option<DateTime<Utc>>,
    created_at: DateTime<Utc>,
}

impl From<ProgressRow> for Progress {
    fn from(row: ProgressRow) -> Self {
        Progress {
            id: row.id,
            user_id: row.user_id,
            reel_id: row.reel_id,
            course_id: row.course_id,
            completed: row.completed,
            completed_at: row.completed_at,
            created_at: row.created_at,
        }
    }
}

#[derive(FromRow)]
struct CommentRow {
    id: i64,
    content: String,
    user_id: i64,
    reel_id: i64,
    created_at: DateTime<Utc>,
}

impl From<CommentRow> for Comment {
    fn from(row: CommentRow) -> Self {
        Comment {
            id: row.id,
            content: row.content,
            user_id: row.user_id,
            reel_id: row.reel_id,
            created_at: row.created_at,
        }
    }
}

/// Postgres-backed store
#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Applies the embedded schema migrations
    pub async fn migrate(&self) -> anyhow::Result<()> {
        sqlx::migrate!("./migrations").run(&self.pool).await?;
        Ok(())
    }

    async fn course_reels(&self, course_id: i64) -> AppResult<Vec<Reel>> {
        let sql = format!(
            "SELECT {REEL_COLUMNS} FROM reels r \
             JOIN course_reels cr ON cr.reel_id = r.id \
             WHERE cr.course_id = $1 ORDER BY cr.position"
        );
        let rows = sqlx::query_as::<_, ReelRow>(&sql)
            .bind(course_id)
            .fetch_all(&self.pool)
            .await?;
        Ok(rows.into_iter().map(Reel::from).collect())
    }

    async fn playlist_reels(&self, playlist_id: i64) -> AppResult<Vec<Reel>> {
        let sql = format!(
            "SELECT {REEL_COLUMNS} FROM reels r \
             JOIN playlist_reels pr ON pr.reel_id = r.id \
             WHERE pr.playlist_id = $1 ORDER BY pr.id"
        );
        let rows = sqlx::query_as::<_, ReelRow>(&sql)
            .bind(playlist_id)
            .fetch_all(&self.pool)
            .await?;
        Ok(rows.into_iter().map(Reel::from).collect())
    }
}

fn page_bounds(page: Page) -> (i64, i64) {
    (page.limit as i64, page.offset as i64)
}

#[async_trait]
impl UserStore for PgStore {
    async fn create_user(&self, user: NewUser) -> AppResult<User> {
        let result = sqlx::query_as::<_, UserRow>(
            "INSERT INTO users (email, password_hash, full_name, role) \
             VALUES ($1, $2, $3, $4) \
             RETURNING id, email, password_hash, full_name, role, created_at",
        )
        .bind(&user.email)
        .bind(&user.password_hash)
        .bind(&user.full_name)
        .bind(user.role.as_str())
        .fetch_one(&self.pool)
        .await;

        match result {
            Ok(row) => Ok(row.into()),
            Err(sqlx::Error::Database(err)) if err.is_unique_violation() => {
                Err(AppError::Conflict("Email already registered".to_string()))
            }
            Err(err) => Err(err.into()),
        }
    }

    async fn find_user(&self, id: i64) -> AppResult<Option<User>> {
        let row = sqlx::query_as::<_, UserRow>(
            "SELECT id, email, password_hash, full_name, role, created_at \
             FROM users WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.map(User::from))
    }

    async fn find_user_by_email(&self, email: &str) -> AppResult<Option<User>> {
        let row = sqlx::query_as::<_, UserRow>(
            "SELECT id, email, password_hash, full_name, role, created_at \
             FROM users WHERE email = $1",
        )
        .bind(email)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.map(User::from))
    }
}

#[async_trait]
impl ContentRepository for PgStore {
    async fn create_reel(&self, reel: NewReel) -> AppResult<Reel> {
        let sql = format!(
            "INSERT INTO reels AS r \
             (title, description, video_url, media_public_id, tags, difficulty_level, \
              duration_seconds, creator_id) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8) \
             RETURNING {REEL_COLUMNS}"
        );
        let row = sqlx::query_as::<_, ReelRow>(&sql)
            .bind(&reel.title)
            .bind(&reel.description)
            .bind(&reel.video_url)
            .bind(&reel.media_public_id)
            .bind(&reel.tags)
            .bind(reel.difficulty.as_str())
            .bind(reel.duration_seconds)
            .bind(reel.creator_id)
            .fetch_one(&self.pool)
            .await?;
        Ok(row.into())
    }

    async fn get_reel(&self, id: i64) -> AppResult<Option<Reel>> {
        let sql = format!("SELECT {REEL_COLUMNS} FROM reels r WHERE r.id = $1");
        let row = sqlx::query_as::<_, ReelRow>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.map(Reel::from))
    }

    async fn get_reels(&self, ids: &[i64]) -> AppResult<Vec<Reel>> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }

        let sql = format!("SELECT {REEL_COLUMNS} FROM reels r WHERE r.id = ANY($1) ORDER BY r.id");
        let rows = sqlx::query_as::<_, ReelRow>(&sql)
            .bind(ids)
            .fetch_all(&self.pool)
            .await?;
        Ok(rows.into_iter().map(Reel::from).collect())
    }

    async fn feed_candidates(&self, filter: &ReelFilter) -> AppResult<Vec<Reel>> {
        // strpos keeps the tag filter a literal substring match
        let sql = format!(
            "SELECT {REEL_COLUMNS} FROM reels r \
             WHERE ($1::TEXT IS NULL OR strpos(r.tags, $1) > 0) \
               AND ($2::TEXT IS NULL OR r.difficulty_level = $2) \
             ORDER BY r.id"
        );
        let rows = sqlx::query_as::<_, ReelRow>(&sql)
            .bind(filter.tag_contains.as_deref())
            .bind(filter.difficulty.as_ref().map(Difficulty::as_str))
            .fetch_all(&self.pool)
            .await?;
        Ok(rows.into_iter().map(Reel::from).collect())
    }

    async fn list_reels(&self, creator_id: Option<i64>, page: Page) -> AppResult<Vec<Reel>> {
        let (limit, offset) = page_bounds(page);
        let sql = format!(
            "SELECT {REEL_COLUMNS} FROM reels r \
             WHERE ($1::BIGINT IS NULL OR r.creator_id = $1) \
             ORDER BY r.created_at DESC, r.id DESC \
             LIMIT $2 OFFSET $3"
        );
        let rows = sqlx::query_as::<_, ReelRow>(&sql)
            .bind(creator_id)
            .bind(limit)
            .bind(offset)
            .fetch_all(&self.pool)
            .await?;
        Ok(rows.into_iter().map(Reel::from).collect())
    }

    async fn record_view(&self, id: i64) -> AppResult<Option<Reel>> {
        let sql = format!(
            "UPDATE reels AS r SET views_count = r.views_count + 1 \
             WHERE r.id = $1 RETURNING {REEL_COLUMNS}"
        );
        let row = sqlx::query_as::<_, ReelRow>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.map(Reel::from))
    }

    async fn update_ai_metadata(&self, id: i64, metadata: AiMetadata) -> AppResult<()> {
        let result = sqlx::query(
            "UPDATE reels SET ai_summary = $2, ai_key_points = $3, ai_quiz = $4 WHERE id = $1",
        )
        .bind(id)
        .bind(metadata.summary)
        .bind(metadata.key_points.map(Json))
        .bind(metadata.quiz.map(Json))
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound("Reel not found".to_string()));
        }
        Ok(())
    }

    async fn delete_reel(&self, id: i64) -> AppResult<bool> {
        // Comments, progress and memberships go with it through ON DELETE CASCADE
        let result = sqlx::query("DELETE FROM reels WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}

#[async_trait]
impl HistoryReader for PgStore {
    async fn watch_history(&self, user_id: i64) -> AppResult<Vec<WatchRecord>> {
        let sql = format!("SELECT {PROGRESS_COLUMNS} FROM progress WHERE user_id = $1 ORDER BY id");
        let rows = sqlx::query_as::<_, ProgressRow>(&sql)
            .bind(user_id)
            .fetch_all(&self.pool)
            .await?;
        Ok(rows
            .into_iter()
            .map(Progress::from)
            .map(|p| WatchRecord::from(&p))
            .collect())
    }
}

#[async_trait]
impl ProgressStore for PgStore {
    async fn upsert_progress(&self, update: ProgressUpdate) -> AppResult<Progress> {
        let sql = format!(
            "INSERT INTO progress (user_id, reel_id, course_id, completed, completed_at) \
             VALUES ($1, $2, $3, $4, CASE WHEN $4 THEN now() END) \
             ON CONFLICT ({PROGRESS_KEY}) DO UPDATE SET \
                 completed = EXCLUDED.completed, \
                 completed_at = CASE WHEN EXCLUDED.completed THEN now() \
                                     ELSE progress.completed_at END \
             RETURNING {PROGRESS_COLUMNS}"
        );
        let row = sqlx::query_as::<_, ProgressRow>(&sql)
            .bind(update.user_id)
            .bind(update.reel_id)
            .bind(update.course_id)
            .bind(update.completed)
            .fetch_one(&self.pool)
            .await?;
        Ok(row.into())
    }

    async fn list_progress(&self, user_id: i64) -> AppResult<Vec<Progress>> {
        let sql = format!(
            "SELECT {PROGRESS_COLUMNS} FROM progress WHERE user_id = $1 \
             ORDER BY created_at DESC, id DESC"
        );
        let rows = sqlx::query_as::<_, ProgressRow>(&sql)
            .bind(user_id)
            .fetch_all(&self.pool)
            .await?;
        Ok(rows.into_iter().map(Progress::from).collect())
    }

    async fn count_completed_reels(&self, user_id: i64, reel_ids: &[i64]) -> AppResult<usize> {
        let count: i64 = sqlx::query_scalar(
            "SELECT COUNT(DISTINCT reel_id) FROM progress \
             WHERE user_id = $1 AND completed AND reel_id = ANY($2)",
        )
        .bind(user_id)
        .bind(reel_ids)
        .fetch_one(&self.pool)
        .await?;
        Ok(count.max(0) as usize)
    }
}

#[async_trait]
impl CourseStore for PgStore {
    async fn create_course(&self, course: NewCourse) -> AppResult<Course> {
        let mut tx = self.pool.begin().await?;

        let row = sqlx::query_as::<_, CourseRow>(
            "INSERT INTO courses (title, description, difficulty_level, creator_id) \
             VALUES ($1, $2, $3, $4) \
             RETURNING id, title, description, difficulty_level, creator_id, created_at",
        )
        .bind(&course.title)
        .bind(&course.description)
        .bind(course.difficulty.as_str())
        .bind(course.creator_id)
        .fetch_one(&mut *tx)
        .await?;

        for (position, reel_id) in course.reel_ids.iter().enumerate() {
            sqlx::query(
                "INSERT INTO course_reels (course_id, reel_id, position) VALUES ($1, $2, $3) \
                 ON CONFLICT DO NOTHING",
            )
            .bind(row.id)
            .bind(reel_id)
            .bind(position as i32)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;

        let reels = self.course_reels(row.id).await?;
        Ok(row.into_course(reels))
    }

    async fn get_course(&self, id: i64) -> AppResult<Option<Course>> {
        let row = sqlx::query_as::<_, CourseRow>(
            "SELECT id, title, description, difficulty_level, creator_id, created_at \
             FROM courses WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        match row {
            Some(row) => {
                let reels = self.course_reels(row.id).await?;
                Ok(Some(row.into_course(reels)))
            }
            None => Ok(None),
        }
    }

    async fn list_courses(&self, page: Page) -> AppResult<Vec<Course>> {
        let (limit, offset) = page_bounds(page);
        let rows = sqlx::query_as::<_, CourseRow>(
            "SELECT id, title, description, difficulty_level, creator_id, created_at \
             FROM courses ORDER BY created_at DESC, id DESC LIMIT $1 OFFSET $2",
        )
        .bind(limit)
        .bind(offset)
        .fetch_all(&self.pool)
        .await?;

        let mut courses = Vec::with_capacity(rows.len());
        for row in rows {
            let reels = self.course_reels(row.id).await?;
            courses.push(row.into_course(reels));
        }
        Ok(courses)
    }
}

#[async_trait]
impl PlaylistStore for PgStore {
    async fn create_playlist(&self, playlist: NewPlaylist) -> AppResult<Playlist> {
        let row = sqlx::query_as::<_, PlaylistRow>(
            "INSERT INTO playlists (title, description, user_id) VALUES ($1, $2, $3) \
             RETURNING id, title, description, user_id, created_at",
        )
        .bind(&playlist.title)
        .bind(&playlist.description)
        .bind(playlist.user_id)
        .fetch_one(&self.pool)
        .await?;
        Ok(row.into_playlist(Vec::new()))
    }

    async fn get_playlist(&self, id: i64, user_id: i64) -> AppResult<Option<Playlist>> {
        let row = sqlx::query_as::<_, PlaylistRow>(
            "SELECT id, title, description, user_id, created_at \
             FROM playlists WHERE id = $1 AND user_id = $2",
        )
        .bind(id)
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await?;

        match row {
            Some(row) => {
                let reels = self.playlist_reels(row.id).await?;
                Ok(Some(row.into_playlist(reels)))
            }
            None => Ok(None),
        }
    }

    async fn list_playlists(&self, user_id: i64) -> AppResult<Vec<Playlist>> {
        let rows = sqlx::query_as::<_, PlaylistRow>(
            "SELECT id, title, description, user_id, created_at \
             FROM playlists WHERE user_id = $1 ORDER BY id",
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;

        let mut playlists = Vec::with_capacity(rows.len());
        for row in rows {
            let reels = self.playlist_reels(row.id).await?;
            playlists.push(row.into_playlist(reels));
        }
        Ok(playlists)
    }

    async fn add_reel_to_playlist(&self, playlist_id: i64, reel_id: i64) -> AppResult<()> {
        let exists: Option<i64> = sqlx::query_scalar("SELECT id FROM playlists WHERE id = $1")
            .bind(playlist_id)
            .fetch_optional(&self.pool)
            .await?;
        if exists.is_none() {
            return Err(AppError::NotFound("Playlist not found".to_string()));
        }

        sqlx::query(
            "INSERT INTO playlist_reels (playlist_id, reel_id) VALUES ($1, $2) \
             ON CONFLICT DO NOTHING",
        )
        .bind(playlist_id)
        .bind(reel_id)
        .execute(&self.pool)
        .await?;
        Ok(())
    }
}

#[async_trait]
impl CommentStore for PgStore {
    async fn create_comment(&self, comment: NewComment) -> AppResult<Comment> {
        let row = sqlx::query_as::<_, CommentRow>(
            "INSERT INTO comments (content, user_id, reel_id) VALUES ($1, $2, $3) \
             RETURNING id, content, user_id, reel_id, created_at",
        )
        .bind(&comment.content)
        .bind(comment.user_id)
        .bind(comment.reel_id)
        .fetch_one(&self.pool)
        .await?;
        Ok(row.into())
    }

    async fn list_comments(&self, reel_id: i64) -> AppResult<Vec<Comment>> {
        let rows = sqlx::query_as::<_, CommentRow>(
            "SELECT id, content, user_id, reel_id, created_at FROM comments \
             WHERE reel_id = $1 ORDER BY created_at DESC, id DESC",
        )
        .bind(reel_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows.into_iter().map(Comment::from).collect())
    }
}
