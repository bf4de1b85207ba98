//! Post CRUD handlers.
//!
//! Reads are public. Mutations are ownership-scoped: the predicate
//! `id = ? AND author_id = ?` is part of the mutation statement itself, so
//! there is no window between an ownership check and the write, and a post
//! owned by someone else produces the same 404 as a post that does not
//! exist.

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use serde::Deserialize;
use std::sync::Arc;
use uuid::Uuid;

use super::auth::AuthUser;
use super::error::ApiError;
use super::validation::{coerce_page_param, require_field};
use crate::db::{CreatePostRequest, Post, PostPage, UpdatePostRequest};
use crate::AppState;

const DEFAULT_PAGE: i64 = 1;
const DEFAULT_LIMIT: i64 = 10;

/// Raw pagination input; both values are coerced, never rejected.
#[derive(Debug, Default, Deserialize)]
pub struct ListPostsParams {
    pub page: Option<String>,
    pub limit: Option<String>,
}

/// Create a post owned by the authenticated caller.
///
/// POST /posts
pub async fn create_post(
    State(state): State<Arc<AppState>>,
    AuthUser(claims): AuthUser,
    Json(req): Json<CreatePostRequest>,
) -> Result<(StatusCode, Json<Post>), ApiError> {
    let title = require_field(&req.title, "title")?;
    let content = require_field(&req.content, "content")?;

    let now = chrono::Utc::now().to_rfc3339();
    let post = Post {
        id: Uuid::new_v4().to_string(),
        title: title.to_string(),
        content: content.to_string(),
        // Author comes only from the verified token, never from the body.
        author_id: claims.sub,
        created_at: now.clone(),
        updated_at: now,
    };

    sqlx::query(
        "INSERT INTO posts (id, title, content, author_id, created_at, updated_at) \
         VALUES (?, ?, ?, ?, ?, ?)",
    )
    .bind(&post.id)
    .bind(&post.title)
    .bind(&post.content)
    .bind(&post.author_id)
    .bind(&post.created_at)
    .bind(&post.updated_at)
    .execute(&state.db)
    .await?;

    tracing::info!(post_id = %post.id, author_id = %post.author_id, "Post created");

    Ok((StatusCode::CREATED, Json(post)))
}

/// List posts newest-first with a pagination envelope.
///
/// GET /posts?page&limit
pub async fn list_posts(
    State(state): State<Arc<AppState>>,
    Query(params): Query<ListPostsParams>,
) -> Result<Json<PostPage>, ApiError> {
    let page = coerce_page_param(params.page.as_deref(), DEFAULT_PAGE);
    let limit = coerce_page_param(params.limit.as_deref(), DEFAULT_LIMIT);
    let offset = (page - 1) * limit;

    let (total_posts,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM posts")
        .fetch_one(&state.db)
        .await?;

    let posts = sqlx::query_as::<_, Post>(
        "SELECT * FROM posts ORDER BY created_at DESC, id LIMIT ? OFFSET ?",
    )
    .bind(limit)
    .bind(offset)
    .fetch_all(&state.db)
    .await?;

    Ok(Json(PostPage {
        posts,
        current_page: page,
        total_pages: (total_posts + limit - 1) / limit,
        total_posts,
    }))
}

/// Fetch one post by id.
///
/// GET /posts/:id
pub async fn get_post(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<Post>, ApiError> {
    let post = sqlx::query_as::<_, Post>("SELECT * FROM posts WHERE id = ?")
        .bind(&id)
        .fetch_optional(&state.db)
        .await?
        .ok_or_else(|| ApiError::not_found("Post not found"))?;

    Ok(Json(post))
}

/// Update a post the caller owns.
///
/// PUT /posts/:id
pub async fn update_post(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    AuthUser(claims): AuthUser,
    Json(req): Json<UpdatePostRequest>,
) -> Result<Json<Post>, ApiError> {
    let title = require_field(&req.title, "title")?;
    let content = require_field(&req.content, "content")?;

    let updated_at = chrono::Utc::now().to_rfc3339();
    let result = sqlx::query(
        "UPDATE posts SET title = ?, content = ?, updated_at = ? \
         WHERE id = ? AND author_id = ?",
    )
    .bind(title)
    .bind(content)
    .bind(&updated_at)
    .bind(&id)
    .bind(&claims.sub)
    .execute(&state.db)
    .await?;

    if result.rows_affected() == 0 {
        return Err(ApiError::not_found_or_unauthorized());
    }

    let post = sqlx::query_as::<_, Post>("SELECT * FROM posts WHERE id = ?")
        .bind(&id)
        .fetch_one(&state.db)
        .await?;

    Ok(Json(post))
}

/// Delete a post the caller owns, together with its comments.
///
/// DELETE /posts/:id
///
/// Comments are removed inside the same transaction and under the same
/// ownership predicate as the post, so a non-owner's attempt has no side
/// effects at all.
pub async fn delete_post(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    AuthUser(claims): AuthUser,
) -> Result<Json<serde_json::Value>, ApiError> {
    let mut tx = state.db.begin().await?;

    sqlx::query(
        "DELETE FROM comments WHERE post_id IN \
         (SELECT id FROM posts WHERE id = ? AND author_id = ?)",
    )
    .bind(&id)
    .bind(&claims.sub)
    .execute(&mut *tx)
    .await?;

    let result = sqlx::query("DELETE FROM posts WHERE id = ? AND author_id = ?")
        .bind(&id)
        .bind(&claims.sub)
        .execute(&mut *tx)
        .await?;

    if result.rows_affected() == 0 {
        // Dropping the transaction rolls back; no comments were touched.
        return Err(ApiError::not_found_or_unauthorized());
    }

    tx.commit().await?;

    tracing::info!(post_id = %id, author_id = %claims.sub, "Post deleted");

    Ok(Json(serde_json::json!({ "message": "Post deleted" })))
}
