use axum::extract::FromRef;
use lazy_static::lazy_static;
use regex::Regex;
use time::OffsetDateTime;
use tracing::{debug, info, warn};

use crate::auth::dto::RegisterRequest;
use crate::auth::extractors::bearer_value;
use crate::auth::password::{hash_password, verify_password};
use crate::auth::repo::{NewUser, SessionToken, User, UserRepo};
use crate::auth::token::SessionTokens;
use crate::error::ApiError;
use crate::state::AppState;

pub(crate) fn is_valid_email(email: &str) -> bool {
    lazy_static! {
        static ref EMAIL_RE: Regex = Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").unwrap();
    }
    EMAIL_RE.is_match(email)
}

pub async fn register(state: &AppState, mut payload: RegisterRequest) -> Result<User, ApiError> {
    payload.email = payload.email.trim().to_lowercase();

    if !is_valid_email(&payload.email) {
        return Err(ApiError::Validation("Invalid email".into()));
    }
    if payload.password.len() < 6 {
        return Err(ApiError::Validation("Password too short".into()));
    }
    if payload.password != payload.password_repeat {
        return Err(ApiError::Validation("Passwords do not match".into()));
    }
    if state.users.find_by_email(&payload.email).await?.is_some() {
        return Err(ApiError::Conflict("Email already registered".into()));
    }

    let hash = hash_password(&payload.password)?;
    let user = state
        .users
        .create(NewUser {
            email: payload.email,
            password_hash: hash,
            first_name: payload.first_name,
            last_name: payload.last_name,
        })
        .await?;

    info!(user_id = %user.id, email = %user.email, "user registered");
    Ok(user)
}

/// Verify credentials and issue a session token.
///
/// Unknown email, inactive user, and wrong password all return the same
/// `InvalidCredentials`; nothing is written in any of those cases.
pub async fn login(
    state: &AppState,
    email: &str,
    password: &str,
) -> Result<(User, SessionToken), ApiError> {
    let email = email.trim().to_lowercase();

    let Some(mut user) = state.users.find_by_email(&email).await? else {
        debug!(email = %email, "login with unknown email");
        return Err(ApiError::InvalidCredentials);
    };
    if !user.is_active {
        debug!(user_id = %user.id, "login for inactive user");
        return Err(ApiError::InvalidCredentials);
    }
    if !verify_password(password, &user.password_hash)? {
        debug!(user_id = %user.id, "login with wrong password");
        return Err(ApiError::InvalidCredentials);
    }

    let token = SessionTokens::from_ref(state).issue(user.id).await?;
    let now = OffsetDateTime::now_utc();
    state.users.record_login(user.id, now).await?;
    user.last_login = Some(now);

    info!(user_id = %user.id, email = %user.email, "user logged in");
    Ok((user, token))
}

/// Revoke the presented token. Degrades to a no-op on an unknown or foreign
/// token and on store failure: a client logging out must never see an error.
pub async fn logout(state: &AppState, auth_header: Option<&str>, user: &User) {
    let Some(raw) = auth_header else {
        return;
    };
    let store = SessionTokens::from_ref(state);
    if let Err(e) = store.revoke(bearer_value(raw), user.id).await {
        warn!(error = %e, user_id = %user.id, "logout revoke failed");
    }
}

/// Soft-delete the account: flip `is_active` off, then revoke every token
/// the user holds. Explicit two-step; there is no database cascade for the
/// flag-based path.
pub async fn deactivate_account(state: &AppState, user: &User) -> Result<(), ApiError> {
    state.users.deactivate(user.id).await?;
    SessionTokens::from_ref(state).revoke_all(user.id).await?;
    info!(user_id = %user.id, "account deactivated, all tokens revoked");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::memory::{MemoryTokenRepo, MemoryUserRepo};
    use crate::authz::memory::MemoryAccessRepo;
    use std::sync::Arc;

    fn fake_state() -> (AppState, Arc<MemoryUserRepo>) {
        let users = Arc::new(MemoryUserRepo::new());
        let state = AppState::fake_with(
            users.clone(),
            Arc::new(MemoryTokenRepo::new()),
            Arc::new(MemoryAccessRepo::new()),
        );
        (state, users)
    }

    fn register_payload(email: &str) -> RegisterRequest {
        RegisterRequest {
            email: email.into(),
            password: "hunter22".into(),
            password_repeat: "hunter22".into(),
            first_name: Some("Alice".into()),
            last_name: None,
        }
    }

    #[test]
    fn email_validation() {
        assert!(is_valid_email("user@example.com"));
        assert!(!is_valid_email("not-an-email"));
        assert!(!is_valid_email("two@at@signs"));
    }

    #[tokio::test]
    async fn register_rejects_mismatched_passwords() {
        let (state, _) = fake_state();
        let mut payload = register_payload("alice@example.com");
        payload.password_repeat = "different".into();
        let err = register(&state, payload).await.err().unwrap();
        assert!(matches!(err, ApiError::Validation(_)));
    }

    #[tokio::test]
    async fn register_rejects_duplicate_email() {
        let (state, _) = fake_state();
        register(&state, register_payload("alice@example.com"))
            .await
            .unwrap();
        let err = register(&state, register_payload("alice@example.com"))
            .await
            .err()
            .unwrap();
        assert!(matches!(err, ApiError::Conflict(_)));
    }

    #[tokio::test]
    async fn login_then_resolve_yields_same_identity() {
        let (state, _) = fake_state();
        let registered = register(&state, register_payload("alice@example.com"))
            .await
            .unwrap();

        let (user, token) = login(&state, "alice@example.com", "hunter22").await.unwrap();
        assert_eq!(user.id, registered.id);
        assert!(user.last_login.is_some());

        let store = SessionTokens::from_ref(&state);
        let (resolved, _) = store.resolve(&token.token).await.unwrap().unwrap();
        assert_eq!(resolved.id, registered.id);
    }

    #[tokio::test]
    async fn login_normalizes_email_case() {
        let (state, _) = fake_state();
        register(&state, register_payload("alice@example.com"))
            .await
            .unwrap();
        assert!(login(&state, " Alice@Example.COM ", "hunter22").await.is_ok());
    }

    #[tokio::test]
    async fn wrong_password_issues_nothing_and_leaves_last_login_untouched() {
        let (state, users) = fake_state();
        register(&state, register_payload("alice@example.com"))
            .await
            .unwrap();

        let err = login(&state, "alice@example.com", "wrong-password")
            .await
            .err()
            .unwrap();
        assert!(matches!(err, ApiError::InvalidCredentials));

        let user = users
            .find_by_email("alice@example.com")
            .await
            .unwrap()
            .unwrap();
        assert!(user.last_login.is_none());
    }

    #[tokio::test]
    async fn unknown_email_and_inactive_user_look_identical() {
        let (state, users) = fake_state();
        let user = register(&state, register_payload("alice@example.com"))
            .await
            .unwrap();
        users.deactivate(user.id).await.unwrap();

        let inactive = login(&state, "alice@example.com", "hunter22")
            .await
            .err()
            .unwrap();
        let unknown = login(&state, "nobody@example.com", "hunter22")
            .await
            .err()
            .unwrap();
        assert_eq!(inactive.to_string(), unknown.to_string());
    }

    #[tokio::test]
    async fn logout_of_never_issued_token_is_a_noop() {
        let (state, _) = fake_state();
        let user = register(&state, register_payload("alice@example.com"))
            .await
            .unwrap();
        // Must not panic or error regardless of the header shape.
        logout(&state, Some("Bearer 0000"), &user).await;
        logout(&state, None, &user).await;
    }

    #[tokio::test]
    async fn superuser_login_authorizes_anything() {
        use crate::auth::Principal;
        use crate::authz::{Method, PermissionEvaluator, ResourceKey};

        let (state, users) = fake_state();
        let registered = register(&state, register_payload("root@example.com"))
            .await
            .unwrap();
        users.set_superuser(registered.id, true);

        let (user, _token) = login(&state, "root@example.com", "hunter22").await.unwrap();
        let evaluator = PermissionEvaluator::from_ref(&state);
        let key = ResourceKey::new("unregistered_resource", Method::Delete);
        let decision = evaluator
            .authorize(&Principal::User(user), &key)
            .await
            .unwrap();
        assert!(decision.is_allow());
    }

    #[tokio::test]
    async fn deactivation_cascades_to_every_token() {
        let (state, _) = fake_state();
        register(&state, register_payload("alice@example.com"))
            .await
            .unwrap();
        let (user, first) = login(&state, "alice@example.com", "hunter22").await.unwrap();
        let (_, second) = login(&state, "alice@example.com", "hunter22").await.unwrap();

        deactivate_account(&state, &user).await.unwrap();

        let store = SessionTokens::from_ref(&state);
        assert!(store.resolve(&first.token).await.unwrap().is_none());
        assert!(store.resolve(&second.token).await.unwrap().is_none());
    }
}
