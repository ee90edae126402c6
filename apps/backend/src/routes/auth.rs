//! Account endpoints and authentication middleware

use axum::{
    body::Body,
    extract::{Request, State},
    http::{header::AUTHORIZATION, StatusCode},
    middleware::Next,
    response::Response,
    Extension, Json,
};
use chrono::Utc;
use uuid::Uuid;

use crate::error::{ApiError, Result};
use crate::models::*;
use crate::services::auth::{
    access_token_ttl, generate_token, hash_password, hash_token, normalize_email,
    refresh_token_ttl, verify_password, MIN_PASSWORD_CHARS,
};
use crate::AppState;

/// Authenticated user info stored in request extensions
#[derive(Clone, Debug)]
pub struct AuthenticatedUser {
    pub user_id: Uuid,
    pub session_id: Uuid,
    pub email: String,
}

/// Pull the token out of a `Bearer <token>` header value
pub fn bearer_token(header: &str) -> Option<&str> {
    header
        .strip_prefix("Bearer ")
        .map(str::trim)
        .filter(|t| !t.is_empty())
}

/// Auth middleware - resolves the bearer access token to a user
pub async fn auth_middleware(
    State(state): State<AppState>,
    mut request: Request<Body>,
    next: Next,
) -> Result<Response> {
    let auth_header = request
        .headers()
        .get(AUTHORIZATION)
        .and_then(|h| h.to_str().ok())
        .ok_or_else(|| ApiError::Unauthorized("Missing Authorization header".to_string()))?;

    let token = bearer_token(auth_header)
        .ok_or_else(|| ApiError::Unauthorized("Invalid Authorization format".to_string()))?;

    let session = state
        .db
        .get_session_by_access_token(&hash_token(token))
        .await?
        .ok_or_else(|| ApiError::Unauthorized("Invalid or expired token".to_string()))?;

    request.extensions_mut().insert(AuthenticatedUser {
        user_id: session.user_id,
        session_id: session.session_id,
        email: session.email,
    });

    Ok(next.run(request).await)
}

/// Mint a token pair and store its hashes as a new session
async fn issue_tokens(state: &AppState, user_id: Uuid) -> Result<TokenPair> {
    let access_token = generate_token();
    let refresh_token = generate_token();
    let now = Utc::now();

    state
        .db
        .create_session(
            user_id,
            &hash_token(&access_token),
            &hash_token(&refresh_token),
            now + access_token_ttl(),
            now + refresh_token_ttl(),
        )
        .await?;

    Ok(TokenPair {
        access_token,
        refresh_token,
        token_type: "Bearer".to_string(),
        expires_in: access_token_ttl().num_seconds(),
    })
}

/// POST /api/auth/register
pub async fn register(
    State(state): State<AppState>,
    Json(req): Json<RegisterRequest>,
) -> Result<(StatusCode, Json<AuthResponse>)> {
    let email = normalize_email(&req.email);
    let name = req.name.trim();

    if email.is_empty() || req.password.is_empty() || name.is_empty() {
        return Err(ApiError::BadRequest(
            "Email, password, and name are required".to_string(),
        ));
    }
    if req.password.chars().count() < MIN_PASSWORD_CHARS {
        return Err(ApiError::BadRequest(format!(
            "Password must be at least {MIN_PASSWORD_CHARS} characters"
        )));
    }

    let password_hash = hash_password(&req.password)?;
    let user = state
        .db
        .create_user(&email, name, &password_hash)
        .await?
        .ok_or_else(|| ApiError::Conflict("Email already registered".to_string()))?;

    tracing::info!("Registered user {}", user.id);
    let tokens = issue_tokens(&state, user.id).await?;

    Ok((
        StatusCode::CREATED,
        Json(AuthResponse {
            user: user.to_api(),
            tokens,
        }),
    ))
}

/// POST /api/auth/login
pub async fn login(
    State(state): State<AppState>,
    Json(req): Json<LoginRequest>,
) -> Result<Json<AuthResponse>> {
    let email = normalize_email(&req.email);
    if email.is_empty() || req.password.is_empty() {
        return Err(ApiError::BadRequest(
            "Email and password are required".to_string(),
        ));
    }

    let user = state
        .db
        .get_user_by_email(&email)
        .await?
        .filter(|u| verify_password(&req.password, &u.password_hash))
        .ok_or_else(|| ApiError::Unauthorized("Invalid email or password".to_string()))?;

    let purged = state.db.delete_expired_sessions(user.id).await?;
    if purged > 0 {
        tracing::debug!("Removed {} expired sessions for user {}", purged, user.id);
    }

    let user = state.db.record_login(user.id).await?;
    let tokens = issue_tokens(&state, user.id).await?;

    Ok(Json(AuthResponse {
        user: user.to_api(),
        tokens,
    }))
}

/// POST /api/auth/refresh
pub async fn refresh(
    State(state): State<AppState>,
    Json(req): Json<RefreshRequest>,
) -> Result<Json<TokenPair>> {
    let access_token = generate_token();
    let refresh_token = generate_token();
    let now = Utc::now();

    state
        .db
        .rotate_session(
            &hash_token(req.refresh_token.trim()),
            &hash_token(&access_token),
            &hash_token(&refresh_token),
            now + access_token_ttl(),
            now + refresh_token_ttl(),
        )
        .await?
        .ok_or_else(|| ApiError::Unauthorized("Invalid or expired refresh token".to_string()))?;

    Ok(Json(TokenPair {
        access_token,
        refresh_token,
        token_type: "Bearer".to_string(),
        expires_in: access_token_ttl().num_seconds(),
    }))
}

/// GET /api/auth/me
pub async fn me(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthenticatedUser>,
) -> Result<Json<UserResponse>> {
    let user = state
        .db
        .get_user(auth.user_id)
        .await?
        .ok_or_else(|| ApiError::NotFound("User not found".to_string()))?;

    Ok(Json(user.to_api()))
}

/// POST /api/auth/logout
pub async fn logout(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthenticatedUser>,
) -> Result<StatusCode> {
    state.db.delete_session(auth.session_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bearer_token() {
        assert_eq!(bearer_token("Bearer abc123"), Some("abc123"));
        assert_eq!(bearer_token("Bearer "), None);
        assert_eq!(bearer_token("Basic abc123"), None);
        assert_eq!(bearer_token("abc123"), None);
    }
}
