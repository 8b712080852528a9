//! Demo project endpoints. The payloads are canned; the module exists to
//! exercise the authorization pipeline with a request-derived resource name.

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

/// Split the project resource by sub-action: create/update/delete follow the
/// method; a bare-collection GET is the list.
fn project_resource(req: &Request) -> String {
    let is_collection = req.uri().path().trim_end_matches('/').ends_with("/projects");
    match *req.method() {
        axum::http::Method::POST => "project_create",
        axum::http::Method::PUT => "project_update",
        axum::http::Method::DELETE => "project_delete",
        axum::http::Method::GET if is_collection => "project_list",
        _ => "project_list",
    }
    .to_string()
}

pub fn router(state: AppState) -> Router<AppState> {
    // Layer order matters: the last-added layer runs first, so the resource
    // extension must be attached outside the authorization middleware.
    Router::new()
        .route("/projects", get(list).post(create))
        .route("/projects/:id", put(update).delete(destroy))
        .route_layer(middleware::from_fn_with_state(
            state,
            authz::middleware::authorize,
        ))
        .route_layer(Extension(ResourceSpec::Resolver(project_resource)))
}

#[instrument]
async fn list() -> Json<Value> {
    Json(json!({
        "projects": [
            { "id": 1, "name": "Project Alpha", "status": "active" },
            { "id": 2, "name": "Project Beta", "status": "completed" }
        ]
    }))
}

#[instrument]
async fn create() -> (StatusCode, Json<Value>) {
    (
        StatusCode::CREATED,
        Json(json!({ "message": "Project created successfully", "project_id": 3 })),
    )
}

#[instrument]
async fn update(Path(id): Path<u64>) -> Json<Value> {
    Json(json!({ "message": "Project updated successfully", "project_id": id }))
}

#[instrument]
async fn destroy(Path(_id): Path<u64>) -> StatusCode {
    StatusCode::NO_CONTENT
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;

    fn request(method: &str, uri: &str) -> Request {
        axum::http::Request::builder()
            .method(method)
            .uri(uri)
            .body(Body::empty())
            .unwrap()
    }

    #[test]
    fn resource_name_follows_the_sub_action() {
        assert_eq!(project_resource(&request("GET", "/api/projects")), "project_list");
        assert_eq!(project_resource(&request("POST", "/api/projects")), "project_create");
        assert_eq!(project_resource(&request("PUT", "/api/projects/2")), "project_update");
        assert_eq!(project_resource(&request("DELETE", "/api/projects/2")), "project_delete");
    }
}
