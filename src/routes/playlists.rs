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
    models::{NewPlaylist, PlaylistResponse},
};

#[derive(Debug, Deserialize)]
pub struct CreatePlaylistRequest {
    pub title: String,
    pub description: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct AddReelRequest {
    pub reel_id: i64,
}

fn not_found() -> AppError {
    AppError::NotFound("Playlist not found or access denied".to_string())
}

pub async fn create_playlist(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    Json(request): Json<CreatePlaylistRequest>,
) -> AppResult<(StatusCode, Json<PlaylistResponse>)> {
    let title = request.title.trim();
    if title.is_empty() {
        return Err(AppError::InvalidInput("title must not be empty".to_string()));
    }

    let playlist = state
        .store
        .create_playlist(NewPlaylist {
            title: title.to_string(),
            description: request.description,
            user_id: user.id,
        })
        .await?;

    tracing::debug!(playlist_id = playlist.id, user_id = user.id, "Playlist created");
    Ok((StatusCode::CREATED, Json(PlaylistResponse::from(playlist))))
}

pub async fn list_playlists(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
) -> AppResult<Json<Vec<PlaylistResponse>>> {
    let playlists = state.store.list_playlists(user.id).await?;
    Ok(Json(playlists.into_iter().map(PlaylistResponse::from).collect()))
}

/// Only the owner can see a playlist
pub async fn get_playlist(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    Path(id): Path<i64>,
) -> AppResult<Json<PlaylistResponse>> {
    let playlist = state
        .store
        .get_playlist(id, user.id)
        .await?
        .ok_or_else(not_found)?;
    Ok(Json(PlaylistResponse::from(playlist)))
}

/// Adds a reel to one of the caller's playlists; repeats are ignored
pub async fn add_reel(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    Path(id): Path<i64>,
    Json(request): Json<AddReelRequest>,
) -> AppResult<Json<PlaylistResponse>> {
    state
        .store
        .get_playlist(id, user.id)
        .await?
        .ok_or_else(not_found)?;

    state
        .store
        .get_reel(request.reel_id)
        .await?
        .ok_or_else(|| AppError::NotFound("Reel not found".to_string()))?;

    state.store.add_reel_to_playlist(id, request.reel_id).await?;

    let playlist = state
        .store
        .get_playlist(id, user.id)
        .await?
        .ok_or_else(not_found)?;
    Ok(Json(PlaylistResponse::from(playlist)))
}
