use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use serde::Deserialize;

use crate::{
    api::AppState,
    error::{AppError, AppResult},
    middleware::AuthUser,
    models::{CourseProgress, Progress, ProgressUpdate},
};

#[derive(Debug, Deserialize)]
pub struct MarkProgressRequest {
    pub reel_id: Option<i64>,
    pub course_id: Option<i64>,
    #[serde(default = "default_completed")]
    pub completed: bool,
}

fn default_completed() -> bool {
    true
}

pub async fn mark_progress(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    Json(request): Json<MarkProgressRequest>,
) -> AppResult<(StatusCode, Json<Progress>)> {
    if request.reel_id.is_none() && request.course_id.is_none() {
        return Err(AppError::InvalidInput(
            "Either reel_id or course_id is required".to_string(),
        ));
    }

    if let Some(reel_id) = request.reel_id {
        state
            .store
            .get_reel(reel_id)
            .await?
            .ok_or_else(|| AppError::NotFound("Reel not found".to_string()))?;
    }
    if let Some(course_id) = request.course_id {
        state
            .store
            .get_course(course_id)
            .await?
            .ok_or_else(|| AppError::NotFound("Course not found".to_string()))?;
    }

    let progress = state
        .store
        .upsert_progress(ProgressUpdate {
            user_id: user.id,
            reel_id: request.reel_id,
            course_id: request.course_id,
            completed: request.completed,
        })
        .await?;

    tracing::debug!(
        user_id = user.id,
        reel_id = ?progress.reel_id,
        course_id = ?progress.course_id,
        completed = progress.completed,
        "Progress recorded"
    );
    Ok((StatusCode::CREATED, Json(progress)))
}

pub async fn list_progress(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
) -> AppResult<Json<Vec<Progress>>> {
    Ok(Json(state.store.list_progress(user.id).await?))
}

/// Share of a course's reels the caller has completed
pub async fn course_progress(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    Path(course_id): Path<i64>,
) -> AppResult<Json<CourseProgress>> {
    let course = state
        .store
        .get_course(course_id)
        .await?
        .ok_or_else(|| AppError::NotFound("Course not found".to_string()))?;

    let reel_ids: Vec<i64> = course.reels.iter().map(|reel| reel.id).collect();
    let completed = state
        .store
        .count_completed_reels(user.id, &reel_ids)
        .await?;

    Ok(Json(CourseProgress::new(
        course.id,
        reel_ids.len(),
        completed,
    )))
}
