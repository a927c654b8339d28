//! Test helper factories and mock state builders
//!
//! Provides convenience functions for creating test objects with sensible defaults,
//! and helpers for driving the API router in-process.
#![allow(dead_code)]

use crate::api::handlers::ServerState;
use crate::store::{MemoryStore, Project, PushToken, Step};
use axum::body::Body;
use axum::http::{Method, Request};
use axum::response::Response;
use axum::Router;
use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use std::sync::Arc;
use uuid::Uuid;

// ============================================================================
// Model factories
// ============================================================================

/// Create an active project owned by `user_id`
pub fn test_project(user_id: &str, total_steps: u32) -> Project {
    Project::new(
        user_id,
        format!("Project {}", &Uuid::new_v4().to_string()[..8]),
        Some("Test project".to_string()),
        total_steps,
    )
}

/// Create a pending step at position `order`
pub fn test_step(project_id: Uuid, order: u32, description: &str, automatable: bool) -> Step {
    Step::new(
        project_id,
        order,
        format!("Step {}", order + 1),
        description,
        automatable,
    )
}

/// Create a push token last refreshed at `updated_at`
pub fn test_push_token(token: &str, user_id: &str, updated_at: DateTime<Utc>) -> PushToken {
    PushToken {
        token: token.to_string(),
        user_id: user_id.to_string(),
        platform: Some("ios".to_string()),
        updated_at,
    }
}

// ============================================================================
// API helpers
// ============================================================================

/// Router over an empty in-memory store. Writes do not fire triggers.
pub fn test_server() -> (Router, Arc<MemoryStore>) {
    let store = Arc::new(MemoryStore::new());
    let state = Arc::new(ServerState {
        store: store.clone(),
    });
    (crate::api::create_router(state), store)
}

/// Build a request, optionally authenticated as `user_id` and with a JSON body
pub fn request(
    method: Method,
    uri: &str,
    user_id: Option<&str>,
    body: Option<serde_json::Value>,
) -> Request<Body> {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(uid) = user_id {
        builder = builder.header(crate::api::extractor::USER_ID_HEADER, uid);
    }
    match body {
        Some(json) => builder
            .header("content-type", "application/json")
            .body(Body::from(json.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    }
}

/// Decode a JSON response body
pub async fn read_json<T: DeserializeOwned>(resp: Response) -> T {
    let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&bytes).unwrap()
}
