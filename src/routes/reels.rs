use axum::{
    extract::{Multipart, Path, Query, State},
    http::StatusCode,
    Json,
};
use serde::Deserialize;

use crate::{
    api::AppState,
    db::AiSubject,
    error::{AppError, AppResult},
    middleware::{AuthUser, RequestId},
    models::{AiMetadata, Difficulty, LessonContext, NewReel, Reel, ReelFilter, ReelResponse},
    services::{ai::REEL_QUIZ_QUESTIONS, feed, media::VideoUpload},
};

use super::{default_limit, display_name, parse_difficulty, with_creator_names};

#[derive(Debug, Deserialize)]
pub struct CreateReelRequest {
    pub title: String,
    pub description: Option<String>,
    pub video_url: String,
    pub tags: Option<String>,
    #[serde(default = "default_difficulty")]
    pub difficulty_level: String,
    #[serde(default = "default_duration")]
    pub duration_seconds: i32,
}

fn default_difficulty() -> String {
    Difficulty::Beginner.to_string()
}

fn default_duration() -> i32 {
    60
}

#[derive(Debug, Deserialize)]
pub struct FeedQuery {
    #[serde(default = "default_limit")]
    pub limit: i64,
    #[serde(default)]
    pub offset: i64,
    pub tags: Option<String>,
    pub difficulty: Option<String>,
}

impl FeedQuery {
    /// Empty parameters count as absent. The tag filter is matched as sent.
    fn filter(&self) -> ReelFilter {
        ReelFilter {
            tag_contains: self.tags.clone().filter(|tags| !tags.is_empty()),
            difficulty: self
                .difficulty
                .as_deref()
                .map(str::trim)
                .filter(|level| !level.is_empty())
                .map(Difficulty::parse),
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct ListQuery {
    #[serde(default = "default_limit")]
    pub limit: i64,
    #[serde(default)]
    pub offset: i64,
    pub creator_id: Option<i64>,
}

fn required_text(value: &str, field: &str) -> AppResult<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(AppError::InvalidInput(format!("{} must not be empty", field)));
    }
    Ok(trimmed.to_string())
}

pub async fn create_reel(
    State(state): State<AppState>,
    auth: AuthUser,
    Json(request): Json<CreateReelRequest>,
) -> AppResult<(StatusCode, Json<ReelResponse>)> {
    auth.require_creator("upload reels")?;
    let user = auth.0;

    if request.duration_seconds < 0 {
        return Err(AppError::InvalidInput(
            "duration_seconds must not be negative".to_string(),
        ));
    }

    let reel = state
        .store
        .create_reel(NewReel {
            title: required_text(&request.title, "title")?,
            description: request.description,
            video_url: required_text(&request.video_url, "video_url")?,
            media_public_id: None,
            tags: request.tags.unwrap_or_default(),
            difficulty: parse_difficulty(&request.difficulty_level)?,
            duration_seconds: request.duration_seconds,
            creator_id: user.id,
        })
        .await?;

    tracing::info!(reel_id = reel.id, creator_id = user.id, "Reel created");
    Ok((
        StatusCode::CREATED,
        Json(ReelResponse::new(reel, Some(user.display_name()))),
    ))
}

/// Form fields of an upload, before validation
#[derive(Default)]
struct UploadForm {
    file: Option<VideoUpload>,
    title: Option<String>,
    description: Option<String>,
    tags: Option<String>,
    difficulty_level: Option<String>,
}

impl UploadForm {
    async fn read(mut multipart: Multipart) -> AppResult<Self> {
        let bad_form = |e: axum::extract::multipart::MultipartError| {
            AppError::InvalidInput(format!("Malformed upload: {}", e))
        };

        let mut form = UploadForm::default();
        while let Some(field) = multipart.next_field().await.map_err(bad_form)? {
            let name = field.name().unwrap_or_default().to_string();
            match name.as_str() {
                "file" => {
                    let file_name = field.file_name().unwrap_or("upload").to_string();
                    let content_type = field.content_type().map(str::to_string);
                    let bytes = field.bytes().await.map_err(bad_form)?;
                    form.file = Some(VideoUpload {
                        file_name,
                        content_type,
                        bytes: bytes.to_vec(),
                    });
                }
                "title" => form.title = Some(field.text().await.map_err(bad_form)?),
                "description" => form.description = Some(field.text().await.map_err(bad_form)?),
                "tags" => form.tags = Some(field.text().await.map_err(bad_form)?),
                "difficulty_level" => {
                    form.difficulty_level = Some(field.text().await.map_err(bad_form)?)
                }
                other => tracing::debug!(field = other, "Ignoring unknown upload field"),
            }
        }
        Ok(form)
    }
}

/// Generates a summary and quiz for a fresh reel and stores them on it
async fn attach_ai_metadata(state: &AppState, reel: &mut Reel) {
    let lesson = LessonContext::for_reel(reel);
    let subject = AiSubject::Reel(reel.id);
    let summary = state.ai.generate_summary(subject, &lesson).await;
    let quiz = state
        .ai
        .generate_quiz(subject, &lesson, REEL_QUIZ_QUESTIONS)
        .await;

    let metadata = AiMetadata {
        summary: Some(summary.summary),
        key_points: Some(summary.key_points),
        quiz: Some(quiz),
    };
    match state.store.update_ai_metadata(reel.id, metadata.clone()).await {
        Ok(()) => {
            reel.ai_summary = metadata.summary;
            reel.ai_key_points = metadata.key_points;
            reel.ai_quiz = metadata.quiz;
        }
        Err(e) => tracing::warn!(error = %e, reel_id = reel.id, "Could not store AI metadata"),
    }
}

pub async fn upload_reel(
    State(state): State<AppState>,
    request_id: RequestId,
    auth: AuthUser,
    multipart: Multipart,
) -> AppResult<(StatusCode, Json<ReelResponse>)> {
    auth.require_creator("upload reels")?;
    let user = auth.0;

    let form = UploadForm::read(multipart).await?;
    let title = required_text(form.title.as_deref().unwrap_or_default(), "title")?;
    let difficulty = parse_difficulty(form.difficulty_level.as_deref().unwrap_or("beginner"))?;
    let file = form
        .file
        .ok_or_else(|| AppError::InvalidInput("A video file is required".to_string()))?;

    let uploaded = state.media.upload_video(file).await?;

    let mut reel = state
        .store
        .create_reel(NewReel {
            title,
            description: form.description,
            video_url: uploaded.secure_url.clone(),
            media_public_id: Some(uploaded.public_id.clone()),
            tags: form.tags.unwrap_or_default(),
            difficulty,
            duration_seconds: uploaded.duration_seconds(),
            creator_id: user.id,
        })
        .await?;
    tracing::info!(
        reel_id = reel.id,
        creator_id = user.id,
        request_id = %request_id,
        "Reel uploaded"
    );

    attach_ai_metadata(&state, &mut reel).await;

    Ok((
        StatusCode::CREATED,
        Json(ReelResponse::new(reel, Some(user.display_name()))),
    ))
}

pub async fn feed(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    Query(query): Query<FeedQuery>,
) -> AppResult<Json<Vec<ReelResponse>>> {
    let page = feed::validate_page(query.limit, query.offset)?;
    let store = state.store.as_ref();

    let reels = feed::personalized_feed(store, store, user.id, &query.filter(), page).await?;
    Ok(Json(with_creator_names(store, reels).await?))
}

pub async fn list_reels(
    State(state): State<AppState>,
    AuthUser(_user): AuthUser,
    Query(query): Query<ListQuery>,
) -> AppResult<Json<Vec<ReelResponse>>> {
    let page = feed::validate_page(query.limit, query.offset)?;
    let reels = state.store.list_reels(query.creator_id, page).await?;
    Ok(Json(with_creator_names(state.store.as_ref(), reels).await?))
}

/// Counts as a view
pub async fn get_reel(
    State(state): State<AppState>,
    AuthUser(_user): AuthUser,
    Path(id): Path<i64>,
) -> AppResult<Json<ReelResponse>> {
    let reel = state
        .store
        .record_view(id)
        .await?
        .ok_or_else(|| AppError::NotFound("Reel not found".to_string()))?;

    let creator_name = display_name(state.store.as_ref(), reel.creator_id).await?;
    Ok(Json(ReelResponse::new(reel, Some(creator_name))))
}

pub async fn delete_reel(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    Path(id): Path<i64>,
) -> AppResult<StatusCode> {
    let reel = state
        .store
        .get_reel(id)
        .await?
        .ok_or_else(|| AppError::NotFound("Reel not found".to_string()))?;

    if reel.creator_id != user.id {
        return Err(AppError::Forbidden("Not authorized".to_string()));
    }

    if let Some(public_id) = reel.media_public_id.as_deref() {
        if !state.media.delete_video(public_id).await {
            tracing::warn!(reel_id = id, public_id, "Hosted video was not deleted");
        }
    }

    state.store.delete_reel(id).await?;
    tracing::info!(reel_id = id, "Reel deleted");
    Ok(StatusCode::NO_CONTENT)
}
