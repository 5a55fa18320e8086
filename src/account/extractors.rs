use axum::{async_trait, extract::FromRequestParts, http::request::Parts};

use crate::account::session;
use crate::error::ApiError;
use crate::state::AppState;
use crate::store::{Session, UserAccount};

/// Caller identity resolved from the request's bearer token: the live
/// session plus the account it is bound to. Every service call that needs an
/// authenticated caller takes this value explicitly.
pub struct SessionContext {
    pub session: Session,
    pub account: UserAccount,
}

/// Like `SessionContext`, but absent instead of rejected when the request
/// carries no usable session. Logout reports that case as its own error.
pub struct MaybeSession(pub Option<SessionContext>);

fn bearer_token(parts: &Parts) -> Option<&str> {
    parts
        .headers
        .get(axum::http::header::AUTHORIZATION)
        .and_then(|h| h.to_str().ok())
        .and_then(|h| h.strip_prefix("Bearer ").or_else(|| h.strip_prefix("bearer ")))
}

async fn resolve_context(
    state: &AppState,
    parts: &Parts,
) -> Result<Option<SessionContext>, ApiError> {
    let Some(token) = bearer_token(parts) else {
        return Ok(None);
    };
    let Some(session) = session::resolve(state, token).await? else {
        return Ok(None);
    };
    let Some(account) = state.users.find_by_id(session.user_id).await? else {
        return Ok(None);
    };
    if !account.is_active {
        return Ok(None);
    }
    Ok(Some(SessionContext { session, account }))
}

#[async_trait]
impl FromRequestParts<AppState> for SessionContext {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        resolve_context(state, parts)
            .await?
            .ok_or(ApiError::Unauthenticated)
    }
}

#[async_trait]
impl FromRequestParts<AppState> for MaybeSession {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        Ok(MaybeSession(resolve_context(state, parts).await?))
    }
}
