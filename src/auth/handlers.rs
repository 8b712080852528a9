use axum::{
    extract::State,
    http::{header, HeaderMap, StatusCode},
    routing::{delete, get, post},
    Json, Router,
};
use tracing::instrument;

use crate::{
    auth::{
        dto::{
            LoginRequest, LoginResponse, MessageResponse, Profile, RegisterRequest,
            UpdateProfileRequest,
        },
        extractors::RequireUser,
        repo::UserRepo,
        services,
    },
    error::ApiError,
    state::AppState,
};

/// Endpoints exempt from authentication: registration and login.
pub fn public_routes() -> Router<AppState> {
    Router::new()
        .route("/auth/register", post(register))
        .route("/auth/login", post(login))
}

/// Endpoints that require an authenticated user but no permission row.
pub fn session_routes() -> Router<AppState> {
    Router::new()
        .route("/auth/logout", post(logout))
        .route("/auth/profile", get(get_profile).put(update_profile))
        .route("/auth/account", delete(delete_account))
}

#[instrument(skip(state, payload))]
async fn register(
    State(state): State<AppState>,
    Json(payload): Json<RegisterRequest>,
) -> Result<(StatusCode, Json<MessageResponse>), ApiError> {
    services::register(&state, payload).await?;
    Ok((
        StatusCode::CREATED,
        Json(MessageResponse {
            message: "User registered successfully",
        }),
    ))
}

#[instrument(skip(state, payload))]
async fn login(
    State(state): State<AppState>,
    Json(payload): Json<LoginRequest>,
) -> Result<Json<LoginResponse>, ApiError> {
    let (user, token) = services::login(&state, &payload.email, &payload.password).await?;
    Ok(Json(LoginResponse {
        token: token.token,
        user: user.into(),
    }))
}

#[instrument(skip_all)]
async fn logout(
    State(state): State<AppState>,
    RequireUser(user): RequireUser,
    headers: HeaderMap,
) -> Json<MessageResponse> {
    let auth_header = headers
        .get(header::AUTHORIZATION)
        .and_then(|h| h.to_str().ok());
    services::logout(&state, auth_header, &user).await;
    Json(MessageResponse {
        message: "Logout successful",
    })
}

#[instrument(skip_all)]
async fn get_profile(RequireUser(user): RequireUser) -> Json<Profile> {
    Json(user.into())
}

#[instrument(skip_all)]
async fn update_profile(
    State(state): State<AppState>,
    RequireUser(user): RequireUser,
    Json(payload): Json<UpdateProfileRequest>,
) -> Result<Json<Profile>, ApiError> {
    let updated = state
        .users
        .update_profile(user.id, payload.first_name, payload.last_name)
        .await?
        .ok_or(ApiError::AuthenticationFailed)?;
    Ok(Json(updated.into()))
}

#[instrument(skip_all)]
async fn delete_account(
    State(state): State<AppState>,
    RequireUser(user): RequireUser,
) -> Result<Json<MessageResponse>, ApiError> {
    services::deactivate_account(&state, &user).await?;
    Ok(Json(MessageResponse {
        message: "Account deleted successfully",
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::repo::User;
    use time::OffsetDateTime;
    use uuid::Uuid;

    #[test]
    fn profile_never_serializes_the_password_hash() {
        let user = User {
            id: Uuid::new_v4(),
            email: "alice@example.com".into(),
            password_hash: "$argon2id$secret".into(),
            first_name: Some("Alice".into()),
            last_name: None,
            is_active: true,
            is_superuser: false,
            created_at: OffsetDateTime::now_utc(),
            updated_at: OffsetDateTime::now_utc(),
            last_login: None,
        };
        let json = serde_json::to_string(&Profile::from(user)).unwrap();
        assert!(json.contains("alice@example.com"));
        assert!(!json.contains("argon2id"));
    }
}
