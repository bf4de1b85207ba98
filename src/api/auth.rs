//! Credential flows and the request authentication gate.
//!
//! Registration and login issue stateless tokens (see `api::token`). The
//! `auth_middleware` gate runs in front of every protected route: it never
//! touches the database, only the signing key. Handlers receive the verified
//! identity through the `AuthUser` extractor.

use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};
use axum::{
    async_trait,
    body::Body,
    extract::{FromRequestParts, State},
    http::{header::AUTHORIZATION, request::Parts, Request, StatusCode},
    middleware::Next,
    response::Response,
    Json,
};
use std::sync::Arc;

use super::error::ApiError;
use super::token::{Claims, TokenError};
use crate::db::{AuthResponse, LoginRequest, RegisterRequest, User, UserResponse};
use crate::AppState;

/// Hash a password using Argon2
pub fn hash_password(password: &str) -> Result<String, argon2::password_hash::Error> {
    let salt = SaltString::generate(&mut OsRng);
    let argon2 = Argon2::default();
    let hash = argon2.hash_password(password.as_bytes(), &salt)?;
    Ok(hash.to_string())
}

/// Verify a password against a hash
pub fn verify_password(password: &str, hash: &str) -> bool {
    let parsed_hash = match PasswordHash::new(hash) {
        Ok(h) => h,
        Err(_) => return false,
    };
    Argon2::default()
        .verify_password(password.as_bytes(), &parsed_hash)
        .is_ok()
}

/// Verified identity for the current request, inserted by `auth_middleware`.
#[derive(Debug, Clone)]
pub struct AuthUser(pub Claims);

#[async_trait]
impl<S> FromRequestParts<S> for AuthUser
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<Claims>()
            .cloned()
            .map(AuthUser)
            .ok_or_else(|| ApiError::unauthenticated("Missing bearer token"))
    }
}

fn bearer_token(request: &Request<Body>) -> Result<&str, TokenError> {
    let header = request
        .headers()
        .get(AUTHORIZATION)
        .and_then(|h| h.to_str().ok())
        .ok_or(TokenError::Missing)?;

    header.strip_prefix("Bearer ").ok_or(TokenError::Missing)
}

/// Authentication gate for protected routes.
///
/// Missing token terminates with 401 before the handler runs; a token that
/// fails verification terminates with 403. On success the verified claims are
/// attached to the request for extraction by handlers.
pub async fn auth_middleware(
    State(state): State<Arc<AppState>>,
    mut request: Request<Body>,
    next: Next,
) -> Result<Response, ApiError> {
    let token = bearer_token(&request)
        .map_err(|_| ApiError::unauthenticated("Missing bearer token"))?;

    let claims = state.tokens.verify(token).map_err(|err| match err {
        TokenError::Expired => ApiError::forbidden("Token expired"),
        _ => ApiError::forbidden("Invalid token"),
    })?;

    request.extensions_mut().insert(claims);
    Ok(next.run(request).await)
}

/// Register a new account and log it in.
///
/// POST /auth/register
pub async fn register(
    State(state): State<Arc<AppState>>,
    Json(req): Json<RegisterRequest>,
) -> Result<(StatusCode, Json<AuthResponse>), ApiError> {
    let username = req.username.trim();
    if username.is_empty() {
        return Err(ApiError::validation("Username is required"));
    }
    if req.password.is_empty() {
        return Err(ApiError::validation("Password is required"));
    }

    let password_hash = hash_password(&req.password)
        .map_err(|_| ApiError::internal("Failed to hash password"))?;

    let user = User {
        id: uuid::Uuid::new_v4().to_string(),
        username: username.to_string(),
        password_hash,
        role: "author".to_string(),
        created_at: chrono::Utc::now().to_rfc3339(),
    };

    // Uniqueness is enforced by the users.username constraint; a violation
    // maps to 409 in the From<sqlx::Error> conversion.
    sqlx::query(
        "INSERT INTO users (id, username, password_hash, role, created_at) VALUES (?, ?, ?, ?, ?)",
    )
    .bind(&user.id)
    .bind(&user.username)
    .bind(&user.password_hash)
    .bind(&user.role)
    .bind(&user.created_at)
    .execute(&state.db)
    .await?;

    tracing::info!(username = %user.username, "Registered new user");

    let token = state
        .tokens
        .issue(&user)
        .map_err(|_| ApiError::internal("Failed to issue token"))?;

    Ok((
        StatusCode::CREATED,
        Json(AuthResponse {
            token,
            user: UserResponse::from(user),
        }),
    ))
}

/// Log in with username and password.
///
/// POST /auth/login
pub async fn login(
    State(state): State<Arc<AppState>>,
    Json(req): Json<LoginRequest>,
) -> Result<Json<AuthResponse>, ApiError> {
    let user: Option<User> = sqlx::query_as("SELECT * FROM users WHERE username = ?")
        .bind(&req.username)
        .fetch_optional(&state.db)
        .await?;

    // Same failure for unknown username and wrong password.
    let user = user.ok_or_else(ApiError::invalid_credentials)?;

    if !verify_password(&req.password, &user.password_hash) {
        return Err(ApiError::invalid_credentials());
    }

    let token = state
        .tokens
        .issue(&user)
        .map_err(|_| ApiError::internal("Failed to issue token"))?;

    Ok(Json(AuthResponse {
        token,
        user: UserResponse::from(user),
    }))
}

/// Identity behind the presented token.
///
/// GET /auth/me
pub async fn me(AuthUser(claims): AuthUser) -> Json<Claims> {
    Json(claims)
}
