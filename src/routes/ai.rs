use axum::{extract::State, Json};
use serde::Deserialize;

use crate::{
    api::AppState,
    db::AiSubject,
    error::{AppError, AppResult},
    middleware::AuthUser,
    models::{LessonContext, Quiz, Summary},
    services::ai::{COURSE_QUIZ_QUESTIONS, REEL_QUIZ_QUESTIONS},
};

/// Names the reel or course to generate material for; a reel wins when both are given
#[derive(Debug, Deserialize)]
pub struct AiRequest {
    pub reel_id: Option<i64>,
    pub course_id: Option<i64>,
}

/// Subject and material for a request, with its quiz size
async fn resolve_lesson(
    state: &AppState,
    request: &AiRequest,
) -> AppResult<(AiSubject, LessonContext, usize)> {
    if let Some(reel_id) = request.reel_id {
        let reel = state
            .store
            .get_reel(reel_id)
            .await?
            .ok_or_else(|| AppError::NotFound("Reel not found".to_string()))?;
        return Ok((
            AiSubject::Reel(reel.id),
            LessonContext::for_reel(&reel),
            REEL_QUIZ_QUESTIONS,
        ));
    }

    if let Some(course_id) = request.course_id {
        let course = state
            .store
            .get_course(course_id)
            .await?
            .ok_or_else(|| AppError::NotFound("Micro-course not found".to_string()))?;
        return Ok((
            AiSubject::Course(course.id),
            LessonContext::for_course(&course),
            COURSE_QUIZ_QUESTIONS,
        ));
    }

    Err(AppError::InvalidInput(
        "Either reel_id or course_id is required".to_string(),
    ))
}

pub async fn summary(
    State(state): State<AppState>,
    AuthUser(_user): AuthUser,
    Json(request): Json<AiRequest>,
) -> AppResult<Json<Summary>> {
    let (subject, lesson, _) = resolve_lesson(&state, &request).await?;
    Ok(Json(state.ai.generate_summary(subject, &lesson).await))
}

pub async fn quiz(
    State(state): State<AppState>,
    AuthUser(_user): AuthUser,
    Json(request): Json<AiRequest>,
) -> AppResult<Json<Quiz>> {
    let (subject, lesson, questions) = resolve_lesson(&state, &request).await?;
    Ok(Json(
        state.ai.generate_quiz(subject, &lesson, questions).await,
    ))
}
