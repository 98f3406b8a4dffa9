use axum::{extract::State, Json};
use serde::{Deserialize, Serialize};

use crate::{
    api::AppState,
    error::{AppError, AppResult},
    middleware::AuthUser,
    models::{NewUser, Role, User, UserResponse},
};

#[derive(Debug, Deserialize)]
pub struct RegisterRequest {
    pub email: String,
    pub password: String,
    pub full_name: Option<String>,
    #[serde(default)]
    pub role: Role,
}

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct TokenResponse {
    pub access_token: String,
    pub token_type: String,
    pub user: UserResponse,
}

/// Loose shape check: one `@` with a non-empty local part and a dotted domain
fn is_valid_email(email: &str) -> bool {
    match email.split_once('@') {
        Some((local, domain)) => {
            !local.is_empty()
                && !domain.contains('@')
                && domain.contains('.')
                && !domain.starts_with('.')
                && !domain.ends_with('.')
                && !email.chars().any(char::is_whitespace)
        }
        None => false,
    }
}

fn token_response(state: &AppState, user: &User) -> AppResult<Json<TokenResponse>> {
    Ok(Json(TokenResponse {
        access_token: state.tokens.issue(user.id)?,
        token_type: "bearer".to_string(),
        user: UserResponse::from(user),
    }))
}

pub async fn register(
    State(state): State<AppState>,
    Json(request): Json<RegisterRequest>,
) -> AppResult<Json<TokenResponse>> {
    let email = request.email.trim().to_lowercase();
    if !is_valid_email(&email) {
        return Err(AppError::InvalidInput("A valid email is required".to_string()));
    }
    if request.password.is_empty() {
        return Err(AppError::InvalidInput("Password must not be empty".to_string()));
    }

    let password_hash = state.passwords.hash(&request.password)?;
    let user = state
        .store
        .create_user(NewUser {
            email,
            password_hash,
            full_name: request.full_name,
            role: request.role,
        })
        .await?;

    tracing::info!(user_id = user.id, role = user.role.as_str(), "User registered");
    token_response(&state, &user)
}

pub async fn login(
    State(state): State<AppState>,
    Json(request): Json<LoginRequest>,
) -> AppResult<Json<TokenResponse>> {
    let invalid = || AppError::Unauthorized("Invalid email or password".to_string());

    let email = request.email.trim().to_lowercase();
    let user = state
        .store
        .find_user_by_email(&email)
        .await?
        .ok_or_else(invalid)?;

    if !state.passwords.verify(&request.password, &user.password_hash) {
        return Err(invalid());
    }

    token_response(&state, &user)
}

pub async fn me(AuthUser(user): AuthUser) -> Json<UserResponse> {
    Json(UserResponse::from(&user))
}
