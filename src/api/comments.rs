//! Public comment endpoints.
//!
//! Commenting is unauthenticated: anyone may comment under a free-text
//! display name. The only gate is that the target post must exist.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use std::sync::Arc;
use uuid::Uuid;

use super::error::ApiError;
use super::validation::require_field;
use crate::db::{Comment, CreateCommentRequest};
use crate::AppState;

async fn post_exists(state: &AppState, post_id: &str) -> Result<(), ApiError> {
    let found: Option<(String,)> = sqlx::query_as("SELECT id FROM posts WHERE id = ?")
        .bind(post_id)
        .fetch_optional(&state.db)
        .await?;

    match found {
        Some(_) => Ok(()),
        None => Err(ApiError::not_found("Post not found")),
    }
}

/// Add a comment to an existing post.
///
/// POST /posts/:id/comments
pub async fn add_comment(
    State(state): State<Arc<AppState>>,
    Path(post_id): Path<String>,
    Json(req): Json<CreateCommentRequest>,
) -> Result<(StatusCode, Json<Comment>), ApiError> {
    let author_name = require_field(&req.author_name, "author_name")?;
    let content = require_field(&req.content, "content")?;

    post_exists(&state, &post_id).await?;

    let comment = Comment {
        id: Uuid::new_v4().to_string(),
        post_id,
        author_name: author_name.to_string(),
        content: content.to_string(),
        created_at: chrono::Utc::now().to_rfc3339(),
    };

    sqlx::query(
        "INSERT INTO comments (id, post_id, author_name, content, created_at) \
         VALUES (?, ?, ?, ?, ?)",
    )
    .bind(&comment.id)
    .bind(&comment.post_id)
    .bind(&comment.author_name)
    .bind(&comment.content)
    .bind(&comment.created_at)
    .execute(&state.db)
    .await?;

    Ok((StatusCode::CREATED, Json(comment)))
}

/// List a post's comments, newest first.
///
/// GET /posts/:id/comments
pub async fn list_comments(
    State(state): State<Arc<AppState>>,
    Path(post_id): Path<String>,
) -> Result<Json<Vec<Comment>>, ApiError> {
    post_exists(&state, &post_id).await?;

    let comments = sqlx::query_as::<_, Comment>(
        "SELECT * FROM comments WHERE post_id = ? ORDER BY created_at DESC, id",
    )
    .bind(&post_id)
    .fetch_all(&state.db)
    .await?;

    Ok(Json(comments))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::auth::register;
    use crate::api::posts::create_post;
    use crate::api::test_util::test_state;
    use crate::db::{CreatePostRequest, RegisterRequest};

    async fn seeded_post(state: &Arc<AppState>) -> String {
        let (_, Json(auth)) = register(
            State(state.clone()),
            Json(RegisterRequest {
                username: "alice".to_string(),
                password: "pw1".to_string(),
            }),
        )
        .await
        .unwrap();
        let claims = state.tokens.verify(&auth.token).unwrap();

        let (_, Json(post)) = create_post(
            State(state.clone()),
            crate::api::auth::AuthUser(claims),
            Json(CreatePostRequest {
                title: "T".to_string(),
                content: "C".to_string(),
            }),
        )
        .await
        .unwrap();
        post.id
    }

    #[tokio::test]
    async fn comment_on_missing_post_is_404() {
        let state = test_state().await;

        let err = add_comment(
            State(state.clone()),
            Path("nope".to_string()),
            Json(CreateCommentRequest {
                author_name: "visitor".to_string(),
                content: "hi".to_string(),
            }),
        )
        .await
        .unwrap_err();
        assert_eq!(err.status(), StatusCode::NOT_FOUND);

        let err = list_comments(State(state), Path("nope".to_string()))
            .await
            .unwrap_err();
        assert_eq!(err.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn comment_requires_name_and_content() {
        let state = test_state().await;
        let post_id = seeded_post(&state).await;

        let err = add_comment(
            State(state.clone()),
            Path(post_id.clone()),
            Json(CreateCommentRequest {
                author_name: String::new(),
                content: "hi".to_string(),
            }),
        )
        .await
        .unwrap_err();
        assert_eq!(err.status(), StatusCode::BAD_REQUEST);

        let err = add_comment(
            State(state),
            Path(post_id),
            Json(CreateCommentRequest {
                author_name: "visitor".to_string(),
                content: "  ".to_string(),
            }),
        )
        .await
        .unwrap_err();
        assert_eq!(err.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn comments_listed_newest_first() {
        let state = test_state().await;
        let post_id = seeded_post(&state).await;

        // Insert directly so the ordering key is deterministic
        for (i, ts) in ["2026-01-01T00:00:00Z", "2026-01-02T00:00:00Z"]
            .iter()
            .enumerate()
        {
            sqlx::query(
                "INSERT INTO comments (id, post_id, author_name, content, created_at) \
                 VALUES (?, ?, 'visitor', 'hi', ?)",
            )
            .bind(format!("c{i}"))
            .bind(&post_id)
            .bind(ts)
            .execute(&state.db)
            .await
            .unwrap();
        }

        let Json(comments) = list_comments(State(state), Path(post_id)).await.unwrap();
        assert_eq!(comments.len(), 2);
        assert_eq!(comments[0].id, "c1");
        assert_eq!(comments[1].id, "c0");
    }

    #[tokio::test]
    async fn add_comment_round_trip() {
        let state = test_state().await;
        let post_id = seeded_post(&state).await;

        let (status, Json(comment)) = add_comment(
            State(state.clone()),
            Path(post_id.clone()),
            Json(CreateCommentRequest {
                author_name: " visitor ".to_string(),
                content: "nice post".to_string(),
            }),
        )
        .await
        .unwrap();

        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(comment.post_id, post_id);
        assert_eq!(comment.author_name, "visitor");

        let Json(comments) = list_comments(State(state), Path(post_id)).await.unwrap();
        assert_eq!(comments.len(), 1);
        assert_eq!(comments[0].id, comment.id);
    }
}
