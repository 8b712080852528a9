use axum::{
    async_trait,
    extract::{FromRef, FromRequestParts},
    http::{header, request::Parts},
};

use crate::auth::repo::User;
use crate::auth::token::SessionTokens;
use crate::error::ApiError;

/// The identity attached to a request: a resolved user, or anonymous.
#[derive(Debug, Clone)]
pub enum Principal {
    Anonymous,
    User(User),
}

impl Principal {
    pub fn user(&self) -> Option<&User> {
        match self {
            Principal::User(user) => Some(user),
            Principal::Anonymous => None,
        }
    }

    pub fn is_anonymous(&self) -> bool {
        matches!(self, Principal::Anonymous)
    }

    pub fn is_superuser(&self) -> bool {
        matches!(self, Principal::User(user) if user.is_superuser)
    }
}

/// Strip the `Bearer ` scheme prefix when present; the bare value is also
/// accepted.
pub(crate) fn bearer_value(header: &str) -> &str {
    header
        .strip_prefix("Bearer ")
        .or_else(|| header.strip_prefix("bearer "))
        .unwrap_or(header)
        .trim()
}

/// Establishes identity without deciding access: a missing or unresolvable
/// token yields `Principal::Anonymous` rather than a rejection. Authorization
/// happens later, against the resolved principal.
#[async_trait]
impl<S> FromRequestParts<S> for Principal
where
    S: Send + Sync,
    SessionTokens: FromRef<S>,
{
    // Only infrastructure failures reject; bad credentials never do.
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let Some(raw) = parts
            .headers
            .get(header::AUTHORIZATION)
            .and_then(|h| h.to_str().ok())
        else {
            return Ok(Principal::Anonymous);
        };

        let store = SessionTokens::from_ref(state);
        match store.resolve(bearer_value(raw)).await? {
            Some((user, _token)) => Ok(Principal::User(user)),
            None => Ok(Principal::Anonymous),
        }
    }
}

/// Rejects anonymous requests with 401. For authenticated-only endpoints
/// that are not guarded by the permission table (profile, logout).
pub struct RequireUser(pub User);

#[async_trait]
impl<S> FromRequestParts<S> for RequireUser
where
    S: Send + Sync,
    SessionTokens: FromRef<S>,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        match Principal::from_request_parts(parts, state).await? {
            Principal::User(user) => Ok(RequireUser(user)),
            Principal::Anonymous => Err(ApiError::AuthenticationFailed),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::AppState;
    use axum::http::Request;

    fn parts_with_auth(value: Option<&str>) -> Parts {
        let mut builder = Request::builder().uri("/api/projects");
        if let Some(v) = value {
            builder = builder.header(header::AUTHORIZATION, v);
        }
        let (parts, ()) = builder.body(()).unwrap().into_parts();
        parts
    }

    #[test]
    fn bearer_prefix_is_optional_but_stripped() {
        assert_eq!(bearer_value("Bearer abc123"), "abc123");
        assert_eq!(bearer_value("bearer abc123"), "abc123");
        assert_eq!(bearer_value("abc123"), "abc123");
    }

    #[tokio::test]
    async fn missing_header_yields_anonymous() {
        let state = AppState::fake();
        let mut parts = parts_with_auth(None);
        let principal = Principal::from_request_parts(&mut parts, &state)
            .await
            .unwrap();
        assert!(principal.is_anonymous());
    }

    #[tokio::test]
    async fn unresolvable_token_yields_anonymous_not_rejection() {
        let state = AppState::fake();
        let mut parts = parts_with_auth(Some("Bearer this-was-never-issued"));
        let principal = Principal::from_request_parts(&mut parts, &state)
            .await
            .unwrap();
        assert!(principal.is_anonymous());
    }

    #[tokio::test]
    async fn login_then_authenticate_yields_the_same_identity() {
        use crate::auth::dto::RegisterRequest;
        use crate::auth::services;

        let state = AppState::fake();
        let registered = services::register(
            &state,
            RegisterRequest {
                email: "alice@example.com".into(),
                password: "hunter22".into(),
                password_repeat: "hunter22".into(),
                first_name: None,
                last_name: None,
            },
        )
        .await
        .unwrap();
        let (_, token) = services::login(&state, "alice@example.com", "hunter22")
            .await
            .unwrap();

        let header = format!("Bearer {}", token.token);
        let mut parts = parts_with_auth(Some(&header));
        let principal = Principal::from_request_parts(&mut parts, &state)
            .await
            .unwrap();
        assert_eq!(principal.user().unwrap().id, registered.id);
    }

    #[tokio::test]
    async fn require_user_rejects_anonymous() {
        let state = AppState::fake();
        let mut parts = parts_with_auth(None);
        let err = RequireUser::from_request_parts(&mut parts, &state)
            .await
            .err()
            .unwrap();
        assert!(matches!(err, ApiError::AuthenticationFailed));
    }
}
