//! API route definitions

use super::handlers::{self, SharedState};
use super::{notification_handlers, project_handlers, step_handlers, token_handlers};
use axum::{
    routing::{delete, get, post, put},
    Router,
};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

/// Create the API router
pub fn create_router(state: SharedState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        // Health check
        .route("/health", get(handlers::health))
        // ====================================================================
        // Projects
        // ====================================================================
        .route(
            "/api/projects",
            get(project_handlers::list_projects).post(project_handlers::create_project),
        )
        .route(
            "/api/projects/{project_id}",
            get(project_handlers::get_project)
                .patch(project_handlers::update_project)
                .delete(project_handlers::delete_project),
        )
        // ====================================================================
        // Steps
        // ====================================================================
        .route(
            "/api/projects/{project_id}/steps",
            get(step_handlers::list_steps),
        )
        .route(
            "/api/projects/{project_id}/steps/{step_id}",
            get(step_handlers::get_step).patch(step_handlers::update_step),
        )
        // ====================================================================
        // Notifications
        // ====================================================================
        .route(
            "/api/notifications",
            get(notification_handlers::list_notifications),
        )
        .route(
            "/api/notifications/{notification_id}/read",
            post(notification_handlers::mark_read),
        )
        // ====================================================================
        // Push tokens
        // ====================================================================
        .route("/api/push-tokens", put(token_handlers::register_token))
        .route(
            "/api/push-tokens/{token}",
            delete(token_handlers::delete_token),
        )
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}
