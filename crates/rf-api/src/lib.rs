//! # rf-api
//!
//! The web routing and orchestration layer for Rusty-Forum.

pub mod auth;
pub mod error;
pub mod handlers;
pub mod middleware;

use std::sync::Arc;

use axum::routing::{get, post, put};
use axum::Router;
use rf_core::service::ForumService;

/// State shared across all request handlers.
#[derive(Clone)]
pub struct AppState {
    pub service: Arc<ForumService>,
}

impl AppState {
    pub fn new(service: ForumService) -> Self {
        Self {
            service: Arc::new(service),
        }
    }
}

/// Builds the full JSON API, with tracing and CORS layers applied.
///
/// # Developer Note
/// Returned as a plain `Router` so the binary can `nest` it under a prefix
/// (e.g., `/api/v1`) if needed.
pub fn router(state: AppState) -> Router {
    Router::new()
        // Accounts
        .route("/register", post(handlers::register))
        .route("/login", post(handlers::login))
        .route("/user/password", put(handlers::change_password))
        .route("/user/bio", put(handlers::update_bio))
        .route("/user/saved", get(handlers::saved_threads))
        .route("/users/{username}", get(handlers::user_info))
        .route("/users/{username}/metrics", get(handlers::user_metrics))
        .route("/users/{username}/scores", get(handlers::user_scores))
        .route("/users/{username}/activity", get(handlers::user_activity))
        .route("/users/{username}/promote", put(handlers::promote))
        .route("/users/{username}/demote", put(handlers::demote))
        .route("/leaderboard", get(handlers::leaderboard))
        // Threads and comments
        .route("/threads", get(handlers::list_threads).post(handlers::create_thread))
        .route(
            "/threads/{id}",
            get(handlers::thread_view)
                .put(handlers::update_node)
                .delete(handlers::delete_node),
        )
        .route("/threads/{id}/comment", post(handlers::reply))
        .route("/threads/{id}/authorization", get(handlers::authorization))
        .route("/threads/{id}/aggregates", get(handlers::aggregates))
        // Interactions
        .route("/threads/{id}/like", post(handlers::like).delete(handlers::unlike))
        .route("/threads/{id}/dislike", post(handlers::dislike).delete(handlers::undislike))
        .route("/threads/{id}/interaction", get(handlers::interaction_state))
        .route(
            "/threads/{id}/save",
            get(handlers::is_saved).post(handlers::save).delete(handlers::unsave),
        )
        // Classifiers
        .route("/categories", get(handlers::categories))
        .route("/tags", get(handlers::tags))
        .layer(middleware::cors_policy())
        .layer(middleware::trace_layer())
        .with_state(state)
}
