use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use serde::Deserialize;
use std::collections::HashMap;

use crate::{
    api::AppState,
    error::{AppError, AppResult},
    middleware::AuthUser,
    models::{CommentResponse, NewComment},
};

use super::display_name;

#[derive(Debug, Deserialize)]
pub struct CreateCommentRequest {
    pub reel_id: i64,
    pub content: String,
}

pub async fn create_comment(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    Json(request): Json<CreateCommentRequest>,
) -> AppResult<(StatusCode, Json<CommentResponse>)> {
    let content = request.content.trim();
    if content.is_empty() {
        return Err(AppError::InvalidInput(
            "Comment must not be empty".to_string(),
        ));
    }

    state
        .store
        .get_reel(request.reel_id)
        .await?
        .ok_or_else(|| AppError::NotFound("Reel not found".to_string()))?;

    let comment = state
        .store
        .create_comment(NewComment {
            content: content.to_string(),
            user_id: user.id,
            reel_id: request.reel_id,
        })
        .await?;

    Ok((
        StatusCode::CREATED,
        Json(CommentResponse::new(comment, user.display_name())),
    ))
}

/// Newest first, each with the author's display name
pub async fn list_comments(
    State(state): State<AppState>,
    AuthUser(_user): AuthUser,
    Path(reel_id): Path<i64>,
) -> AppResult<Json<Vec<CommentResponse>>> {
    let comments = state.store.list_comments(reel_id).await?;

    let mut names: HashMap<i64, String> = HashMap::new();
    let mut responses = Vec::with_capacity(comments.len());
    for comment in comments {
        let name = match names.get(&comment.user_id) {
            Some(name) => name.clone(),
            None => {
                let name = display_name(state.store.as_ref(), comment.user_id).await?;
                names.insert(comment.user_id, name.clone());
                name
            }
        };
        responses.push(CommentResponse::new(comment, name));
    }

    Ok(Json(responses))
}
