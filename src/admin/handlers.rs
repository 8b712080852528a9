use axum::{
    extract::{Path, State},
    http::StatusCode,
    middleware,
    routing::{delete, get, post},
    Extension, Json, Router,
};
use tracing::instrument;
use uuid::Uuid;

use crate::{
    admin::{
        dto::{CreatePermissionRequest, CreateResourceRequest, CreateRoleRequest, UserRoleRequest},
        repo,
    },
    auth::repo::UserRepo,
    authz::{self, repo::{Permission, Resource, Role}, ResourceName},
    error::ApiError,
    state::AppState,
};

/// Administrative CRUD over the permission tables. Every route is guarded
/// by the permission table itself, under the management resource names.
///
/// Layer order matters: the last-added layer runs first, so each group's
/// name extension sits outside the authorization middleware.
pub fn router(state: AppState) -> Router<AppState> {
    let guard = middleware::from_fn_with_state(state, authz::middleware::authorize);

    let roles = Router::new()
        .route("/admin/roles", get(list_roles).post(create_role))
        .route("/admin/roles/:id", delete(remove_role))
        .route("/admin/user-roles", post(grant_role).delete(revoke_role))
        .route_layer(guard.clone())
        .route_layer(Extension(ResourceName("role_management")));

    let resources = Router::new()
        .route("/admin/resources", get(list_resources).post(create_resource))
        .route("/admin/resources/:id", delete(remove_resource))
        .route_layer(guard.clone())
        .route_layer(Extension(ResourceName("resource_management")));

    let permissions = Router::new()
        .route(
            "/admin/permissions",
            get(list_permissions).post(create_permission),
        )
        .route("/admin/permissions/:id", delete(remove_permission))
        .route_layer(guard)
        .route_layer(Extension(ResourceName("permission_management")));

    Router::new().merge(roles).merge(resources).merge(permissions)
}

#[instrument(skip(state))]
async fn list_roles(State(state): State<AppState>) -> Result<Json<Vec<Role>>, ApiError> {
    Ok(Json(repo::list_roles(&state.db).await?))
}

#[instrument(skip(state, payload))]
async fn create_role(
    State(state): State<AppState>,
    Json(payload): Json<CreateRoleRequest>,
) -> Result<(StatusCode, Json<Role>), ApiError> {
    let role = repo::create_role(&state.db, &payload.name, payload.description.as_deref())
        .await?
        .ok_or_else(|| ApiError::Conflict("Role name already exists".into()))?;
    Ok((StatusCode::CREATED, Json(role)))
}

#[instrument(skip(state))]
async fn remove_role(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, ApiError> {
    if repo::delete_role(&state.db, id).await? == 0 {
        return Err(ApiError::NotFound("Role not found".into()));
    }
    Ok(StatusCode::NO_CONTENT)
}

#[instrument(skip(state))]
async fn list_resources(State(state): State<AppState>) -> Result<Json<Vec<Resource>>, ApiError> {
    Ok(Json(repo::list_resources(&state.db).await?))
}

#[instrument(skip(state, payload))]
async fn create_resource(
    State(state): State<AppState>,
    Json(payload): Json<CreateResourceRequest>,
) -> Result<(StatusCode, Json<Resource>), ApiError> {
    let resource = repo::create_resource(
        &state.db,
        &payload.name,
        payload.method,
        payload.description.as_deref(),
    )
    .await?
    .ok_or_else(|| ApiError::Conflict("Resource already exists for this method".into()))?;
    Ok((StatusCode::CREATED, Json(resource)))
}

#[instrument(skip(state))]
async fn remove_resource(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, ApiError> {
    if repo::delete_resource(&state.db, id).await? == 0 {
        return Err(ApiError::NotFound("Resource not found".into()));
    }
    Ok(StatusCode::NO_CONTENT)
}

#[instrument(skip(state))]
async fn list_permissions(
    State(state): State<AppState>,
) -> Result<Json<Vec<repo::PermissionView>>, ApiError> {
    Ok(Json(repo::list_permissions(&state.db).await?))
}

#[instrument(skip(state, payload))]
async fn create_permission(
    State(state): State<AppState>,
    Json(payload): Json<CreatePermissionRequest>,
) -> Result<(StatusCode, Json<Permission>), ApiError> {
    if repo::find_role(&state.db, payload.role_id).await?.is_none() {
        return Err(ApiError::NotFound("Role not found".into()));
    }
    if repo::find_resource_by_id(&state.db, payload.resource_id)
        .await?
        .is_none()
    {
        return Err(ApiError::NotFound("Resource not found".into()));
    }

    let permission = repo::create_permission(
        &state.db,
        payload.role_id,
        payload.resource_id,
        payload.can_access,
    )
    .await?
    .ok_or_else(|| ApiError::Conflict("Permission already exists for this role and resource".into()))?;
    Ok((StatusCode::CREATED, Json(permission)))
}

#[instrument(skip(state))]
async fn remove_permission(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, ApiError> {
    if repo::delete_permission(&state.db, id).await? == 0 {
        return Err(ApiError::NotFound("Permission not found".into()));
    }
    Ok(StatusCode::NO_CONTENT)
}

#[instrument(skip(state, payload))]
async fn grant_role(
    State(state): State<AppState>,
    Json(payload): Json<UserRoleRequest>,
) -> Result<StatusCode, ApiError> {
    if state.users.find_by_id(payload.user_id).await?.is_none() {
        return Err(ApiError::NotFound("User not found".into()));
    }
    if repo::find_role(&state.db, payload.role_id).await?.is_none() {
        return Err(ApiError::NotFound("Role not found".into()));
    }
    repo::grant_role(&state.db, payload.user_id, payload.role_id).await?;
    Ok(StatusCode::CREATED)
}

#[instrument(skip(state, payload))]
async fn revoke_role(
    State(state): State<AppState>,
    Json(payload): Json<UserRoleRequest>,
) -> Result<StatusCode, ApiError> {
    if repo::revoke_role(&state.db, payload.user_id, payload.role_id).await? == 0 {
        return Err(ApiError::NotFound("Role grant not found".into()));
    }
    Ok(StatusCode::NO_CONTENT)
}
