use axum::{
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use serde::Deserialize;
use serde_json::{json, Value};
use std::collections::HashMap;

use crate::{
    api::AppState,
    db::Store,
    error::{AppError, AppResult},
    models::{Difficulty, Page, Reel, ReelResponse},
    services::feed,
};

pub mod ai;
pub mod auth;
pub mod comments;
pub mod courses;
pub mod playlists;
pub mod progress;
pub mod reels;

/// Name shown for content whose author no longer exists
pub const UNKNOWN_USER: &str = "Unknown";

/// Routes mounted under `/api`
pub fn api_routes() -> Router<AppState> {
    Router::new()
        .route("/auth/register", post(auth::register))
        .route("/auth/login", post(auth::login))
        .route("/auth/me", get(auth::me))
        .route("/reels", post(reels::create_reel))
        .route("/reels/upload", post(reels::upload_reel))
        .route("/reels/feed", get(reels::feed))
        .route("/reels/list", get(reels::list_reels))
        .route("/reels/:id", get(reels::get_reel).delete(reels::delete_reel))
        .route("/courses", post(courses::create_course).get(courses::list_courses))
        .route("/courses/:id", get(courses::get_course))
        .route(
            "/playlists",
            post(playlists::create_playlist).get(playlists::list_playlists),
        )
        .route("/playlists/:id", get(playlists::get_playlist))
        .route("/playlists/:id/reels", post(playlists::add_reel))
        .route("/progress", post(progress::mark_progress).get(progress::list_progress))
        .route("/progress/course/:id", get(progress::course_progress))
        .route("/comments", post(comments::create_comment))
        .route("/comments/reel/:id", get(comments::list_comments))
        .route("/ai/summary", post(ai::summary))
        .route("/ai/quiz", post(ai::quiz))
}

pub async fn root() -> Json<Value> {
    Json(json!({
        "message": "Welcome to EduBit API",
        "version": env!("CARGO_PKG_VERSION"),
    }))
}

pub async fn health_check() -> (StatusCode, Json<Value>) {
    (StatusCode::OK, Json(json!({ "status": "healthy" })))
}

/// `limit`/`offset` query parameters shared by list endpoints
#[derive(Debug, Deserialize)]
pub struct PageQuery {
    #[serde(default = "default_limit")]
    pub limit: i64,
    #[serde(default)]
    pub offset: i64,
}

fn default_limit() -> i64 {
    20
}

impl PageQuery {
    pub fn page(&self) -> AppResult<Page> {
        feed::validate_page(self.limit, self.offset)
    }
}

/// Difficulty of new content; only the three known levels are accepted
pub fn parse_difficulty(label: &str) -> AppResult<Difficulty> {
    Difficulty::known(label).ok_or_else(|| {
        AppError::InvalidInput(format!(
            "difficulty_level must be beginner, intermediate or advanced, got '{}'",
            label
        ))
    })
}

/// Display name of a user, or [`UNKNOWN_USER`]
pub async fn display_name(store: &dyn Store, user_id: i64) -> AppResult<String> {
    Ok(store
        .find_user(user_id)
        .await?
        .map(|user| user.display_name())
        .unwrap_or_else(|| UNKNOWN_USER.to_string()))
}

/// Attaches creator names, looking each creator up once
pub async fn with_creator_names(
    store: &dyn Store,
    reels: Vec<Reel>,
) -> AppResult<Vec<ReelResponse>> {
    let mut names: HashMap<i64, String> = HashMap::new();
    let mut responses = Vec::with_capacity(reels.len());

    for reel in reels {
        let name = match names.get(&reel.creator_id) {
            Some(name) => name.clone(),
            None => {
                let name = display_name(store, reel.creator_id).await?;
                names.insert(reel.creator_id, name.clone());
                name
            }
        };
        responses.push(ReelResponse::new(reel, Some(name)));
    }

    Ok(responses)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        db::{ContentRepository, MemoryStore, UserStore},
        models::{NewReel, NewUser, Role},
    };

    #[test]
    fn test_parse_difficulty_rejects_unknown_labels() {
        assert_eq!(parse_difficulty("advanced").unwrap(), Difficulty::Advanced);
        assert!(matches!(
            parse_difficulty("expert"),
            Err(AppError::InvalidInput(_))
        ));
    }

    #[test]
    fn test_page_query_defaults() {
        let query: PageQuery = serde_json::from_str("{}").unwrap();
        assert_eq!(query.page().unwrap(), Page::new(0, 20));
    }

    #[tokio::test]
    async fn test_creator_names_fall_back_to_unknown() {
        let store = MemoryStore::new();
        let creator = store
            .create_user(NewUser {
                email: "lin@example.com".to_string(),
                password_hash: "hash".to_string(),
                full_name: Some("Lin".to_string()),
                role: Role::Creator,
            })
            .await
            .unwrap();

        let mut reels = Vec::new();
        for creator_id in [creator.id, 999] {
            reels.push(
                store
                    .create_reel(NewReel {
                        title: "t".to_string(),
                        description: None,
                        video_url: "https://videos.example/t.mp4".to_string(),
                        media_public_id: None,
                        tags: String::new(),
                        difficulty: Difficulty::Beginner,
                        duration_seconds: 60,
                        creator_id,
                    })
                    .await
                    .unwrap(),
            );
        }

        let responses = with_creator_names(&store, reels).await.unwrap();
        assert_eq!(responses[0].creator_name.as_deref(), Some("Lin"));
        assert_eq!(responses[1].creator_name.as_deref(), Some(UNKNOWN_USER));
    }
}
