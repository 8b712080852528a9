//! Demo task endpoints, guarded the same way as projects.

use axum::{
    extract::{Path, Request},
    http::StatusCode,
    middleware,
    routing::{get, put},
    Extension, Json, Router,
};
use serde_json::{json, Value};
use tracing::instrument;

use crate::{
    authz::{self, ResourceSpec},
    state::AppState,
};

fn task_resource(req: &Request) -> String {
    let is_collection = req.uri().path().trim_end_matches('/').ends_with("/tasks");
    match *req.method() {
        axum::http::Method::POST => "task_create",
        axum::http::Method::PUT => "task_update",
        axum::http::Method::DELETE => "task_delete",
        axum::http::Method::GET if is_collection => "task_list",
        _ => "task_list",
    }
    .to_string()
}

pub fn router(state: AppState) -> Router<AppState> {
    Router::new()
        .route("/tasks", get(list).post(create))
        .route("/tasks/:id", put(update).delete(destroy))
        .route_layer(middleware::from_fn_with_state(
            state,
            authz::middleware::authorize,
        ))
        .route_layer(Extension(ResourceSpec::Resolver(task_resource)))
}

#[instrument]
async fn list() -> Json<Value> {
    Json(json!({
        "tasks": [
            { "id": 1, "title": "Design database", "status": "done" },
            { "id": 2, "title": "Implement API", "status": "in_progress" }
        ]
    }))
}

#[instrument]
async fn create() -> (StatusCode, Json<Value>) {
    (
        StatusCode::CREATED,
        Json(json!({ "message": "Task created successfully", "task_id": 3 })),
    )
}

#[instrument]
async fn update(Path(id): Path<u64>) -> Json<Value> {
    Json(json!({ "message": "Task updated successfully", "task_id": id }))
}

#[instrument]
async fn destroy(Path(_id): Path<u64>) -> StatusCode {
    StatusCode::NO_CONTENT
}
