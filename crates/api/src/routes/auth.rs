use axum::{
    extract::State,
    http::{HeaderMap, HeaderValue, header},
};
use bson::oid::ObjectId;
use coursegate_db::models::{User, UserRole};
use coursegate_services::{auth::TokenPair, dao::base::DaoError};
use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::{
    error::ApiError, extractors::auth::AuthUser, extractors::json::ValidatedJson,
    response::ApiResponse, state::AppState,
};

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct RegisterRequest {
    #[validate(email(message = "email must be a valid address"))]
    pub email: String,
    #[validate(length(min = 1, max = 100, message = "displayName must be 1-100 characters"))]
    pub display_name: String,
    #[validate(length(min = 8, message = "password must be at least 8 characters"))]
    pub password: String,
}

#[derive(Debug, Deserialize, Validate)]
pub struct LoginRequest {
    #[validate(length(min = 1, message = "email is required"))]
    pub email: String,
    #[validate(length(min = 1, message = "password is required"))]
    pub password: String,
}

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct RefreshRequest {
    #[validate(length(min = 1, message = "refreshToken is required"))]
    pub refresh_token: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthResponse {
    pub access_token: String,
    pub refresh_token: String,
    pub expires_in: u64,
    pub user: UserResponse,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UserResponse {
    pub id: String,
    pub email: String,
    pub display_name: String,
    pub role: UserRole,
}

impl UserResponse {
    fn from_user(user_id: ObjectId, user: User) -> Self {
        Self {
            id: user_id.to_hex(),
            email: user.email,
            display_name: user.display_name,
            role: user.role,
        }
    }
}

type AuthReply = (HeaderMap, ApiResponse<AuthResponse>);

pub async fn register(
    State(state): State<AppState>,
    ValidatedJson(body): ValidatedJson<RegisterRequest>,
) -> Result<AuthReply, ApiError> {
    let password_hash = state.auth.hash_password(&body.password)?;

    let user = state
        .users
        .create(body.email, body.display_name, password_hash, UserRole::Student)
        .await
        .map_err(|e| match e {
            DaoError::DuplicateKey(_) => {
                ApiError::Conflict("Email is already registered".to_string())
            }
            other => other.into(),
        })?;

    let (headers, response) = issue_tokens(&state, user)?;
    Ok((headers, ApiResponse::created(response, "Registered")))
}

pub async fn login(
    State(state): State<AppState>,
    ValidatedJson(body): ValidatedJson<LoginRequest>,
) -> Result<AuthReply, ApiError> {
    let user = state
        .users
        .find_by_email(&body.email)
        .await
        .map_err(|_| ApiError::Unauthorized("Invalid credentials".to_string()))?;

    let password_hash = user
        .password_hash
        .as_ref()
        .ok_or_else(|| ApiError::Unauthorized("No password set".to_string()))?;

    if !state.auth.verify_password(&body.password, password_hash)? {
        return Err(ApiError::Unauthorized("Invalid credentials".to_string()));
    }

    let (headers, response) = issue_tokens(&state, user)?;
    Ok((headers, ApiResponse::ok(response, "Logged in")))
}

pub async fn refresh(
    State(state): State<AppState>,
    ValidatedJson(body): ValidatedJson<RefreshRequest>,
) -> Result<AuthReply, ApiError> {
    let claims = state.auth.verify_refresh_token(&body.refresh_token)?;

    let user_id = ObjectId::parse_str(&claims.sub)
        .map_err(|_| ApiError::Unauthorized("Invalid user ID".to_string()))?;

    let user = state.users.base.find_by_id(user_id).await?;

    let (headers, response) = issue_tokens(&state, user)?;
    Ok((headers, ApiResponse::ok(response, "Token refreshed")))
}

pub async fn me(
    State(state): State<AppState>,
    auth: AuthUser,
) -> Result<ApiResponse<UserResponse>, ApiError> {
    let user = state.users.base.find_by_id(auth.user_id).await?;
    Ok(ApiResponse::ok(
        UserResponse::from_user(auth.user_id, user),
        "Current user",
    ))
}

fn issue_tokens(state: &AppState, user: User) -> Result<(HeaderMap, AuthResponse), ApiError> {
    let user_id = user
        .id
        .ok_or_else(|| ApiError::Internal("User without id".to_string()))?;

    let TokenPair {
        access_token,
        refresh_token,
        expires_in,
    } = state.auth.generate_tokens(user_id, &user.email, user.role)?;

    let mut headers = HeaderMap::new();
    let cookie = format!(
        "access_token={}; HttpOnly; Path=/; SameSite=Lax; Max-Age={}",
        access_token, expires_in
    );
    let cookie =
        HeaderValue::from_str(&cookie).map_err(|e| ApiError::Internal(e.to_string()))?;
    headers.insert(header::SET_COOKIE, cookie);

    let response = AuthResponse {
        access_token,
        refresh_token,
        expires_in,
        user: UserResponse::from_user(user_id, user),
    };

    Ok((headers, response))
}
