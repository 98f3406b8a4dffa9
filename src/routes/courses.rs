use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use serde::Deserialize;
use std::collections::HashSet;

use crate::{
    api::AppState,
    error::{AppError, AppResult},
    middleware::AuthUser,
    models::{CourseResponse, NewCourse},
};

use super::{parse_difficulty, PageQuery};

#[derive(Debug, Deserialize)]
pub struct CreateCourseRequest {
    pub title: String,
    pub description: Option<String>,
    #[serde(default = "default_difficulty")]
    pub difficulty_level: String,
    /// Member reels, in course order
    pub reel_ids: Vec<i64>,
}

fn default_difficulty() -> String {
    "beginner".to_string()
}

pub async fn create_course(
    State(state): State<AppState>,
    auth: AuthUser,
    Json(request): Json<CreateCourseRequest>,
) -> AppResult<(StatusCode, Json<CourseResponse>)> {
    auth.require_creator("create micro-courses")?;
    let user = auth.0;

    let title = request.title.trim();
    if title.is_empty() {
        return Err(AppError::InvalidInput("title must not be empty".to_string()));
    }
    let difficulty = parse_difficulty(&request.difficulty_level)?;

    let distinct: HashSet<i64> = request.reel_ids.iter().copied().collect();
    if distinct.len() != request.reel_ids.len() {
        return Err(AppError::InvalidInput(
            "reel_ids must not repeat a reel".to_string(),
        ));
    }

    let reels = state.store.get_reels(&request.reel_ids).await?;
    if reels.len() != request.reel_ids.len() {
        return Err(AppError::NotFound("One or more reels not found".to_string()));
    }
    if reels.iter().any(|reel| reel.creator_id != user.id) {
        return Err(AppError::Forbidden(
            "Can only add your own reels to a course".to_string(),
        ));
    }

    let course = state
        .store
        .create_course(NewCourse {
            title: title.to_string(),
            description: request.description,
            difficulty,
            creator_id: user.id,
            reel_ids: request.reel_ids,
        })
        .await?;

    tracing::info!(
        course_id = course.id,
        creator_id = user.id,
        reels = course.reels.len(),
        "Micro-course created"
    );
    Ok((StatusCode::CREATED, Json(CourseResponse::from(course))))
}

pub async fn list_courses(
    State(state): State<AppState>,
    AuthUser(_user): AuthUser,
    Query(query): Query<PageQuery>,
) -> AppResult<Json<Vec<CourseResponse>>> {
    let courses = state.store.list_courses(query.page()?).await?;
    Ok(Json(courses.into_iter().map(CourseResponse::from).collect()))
}

pub async fn get_course(
    State(state): State<AppState>,
    AuthUser(_user): AuthUser,
    Path(id): Path<i64>,
) -> AppResult<Json<CourseResponse>> {
    let course = state
        .store
        .get_course(id)
        .await?
        .ok_or_else(|| AppError::NotFound("Micro-course not found".to_string()))?;
    Ok(Json(CourseResponse::from(course)))
}
