use axum::{
    extract::{FromRef, Request, State},
    middleware::Next,
    response::Response,
};
use tracing::debug;

use crate::auth::Principal;
use crate::authz::evaluator::{Decision, PermissionEvaluator};
use crate::authz::resource::resolve_key;
use crate::error::ApiError;
use crate::state::AppState;

/// Enforces the permission table for the wrapped routes.
///
/// The principal was established by the `Principal` extractor; this layer
/// resolves the resource key and applies the evaluator's decision. Routes
/// exempt from authorization (register, login, health) are simply not
/// wrapped with this layer.
pub async fn authorize(
    State(state): State<AppState>,
    principal: Principal,
    req: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let Some(key) = resolve_key(&req) else {
        debug!(path = %req.uri().path(), method = %req.method(), "request has no resource identity");
        return Err(rejection(&principal));
    };

    let evaluator = PermissionEvaluator::from_ref(&state);
    match evaluator.authorize(&principal, &key).await? {
        Decision::Allow => Ok(next.run(req).await),
        Decision::Deny => {
            debug!(resource = %key, "authorization denied");
            Err(rejection(&principal))
        }
    }
}

/// Anonymous callers get 401 (they failed to authenticate); identified
/// callers get 403 (they authenticated but lack permission).
fn rejection(principal: &Principal) -> ApiError {
    if principal.is_anonymous() {
        ApiError::AuthenticationFailed
    } else {
        ApiError::Forbidden
    }
}
