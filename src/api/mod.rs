pub mod auth;
mod comments;
pub mod error;
mod posts;
pub mod token;
mod validation;

use axum::{
    extract::State,
    middleware,
    routing::{delete, get, post, put},
    Json, Router,
};
use std::sync::Arc;
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::AppState;
use error::ApiError;

pub fn create_router(state: Arc<AppState>) -> Router {
    // Public routes: auth entry points, post reads, comments
    let public_routes = Router::new()
        .route("/auth/register", post(auth::register))
        .route("/auth/login", post(auth::login))
        .route("/posts", get(posts::list_posts))
        .route("/posts/:id", get(posts::get_post))
        .route("/posts/:id/comments", post(comments::add_comment))
        .route("/posts/:id/comments", get(comments::list_comments))
        .route("/health", get(health_check));

    // Protected routes: everything that mutates posts, plus identity echo
    let protected_routes = Router::new()
        .route("/posts", post(posts::create_post))
        .route("/posts/:id", put(posts::update_post))
        .route("/posts/:id", delete(posts::delete_post))
        .route("/auth/me", get(auth::me))
        .layer(middleware::from_fn_with_state(
            state.clone(),
            auth::auth_middleware,
        ));

    Router::new()
        .merge(public_routes)
        .merge(protected_routes)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

/// Liveness probe that exercises the storage pool.
async fn health_check(
    State(state): State<Arc<AppState>>,
) -> Result<Json<serde_json::Value>, ApiError> {
    sqlx::query("SELECT 1").execute(&state.db).await?;
    Ok(Json(serde_json::json!({ "status": "ok" })))
}

#[cfg(test)]
pub(crate) mod test_util {
    use crate::{config::Config, db, AppState};
    use std::sync::Arc;

    /// Fresh state over an in-memory database with a fixed signing key.
    pub(crate) async fn test_state() -> Arc<AppState> {
        let mut config = Config::default();
        config.auth.jwt_secret = Some("test-secret".to_string());

        let pool = db::init_in_memory().await.unwrap();
        Arc::new(AppState::new(config, pool))
    }
}
