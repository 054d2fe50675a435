//! Authentication gate
//!
//! Every request under the gated router passes through [`authenticate`]:
//! 1. Paths on the public allow-list are admitted without identity.
//! 2. The `token` cookie must match the token held in the client's session.
//!    A missing cookie or a mismatch redirects to the login page.
//! 3. The matching token must verify. A bad or expired token is answered
//!    with 401 rather than a redirect.
//!
//! Admitted requests carry an [`AuthUser`] for handlers to extract.

use crate::api::handlers::AppState;
use crate::auth::token::{TokenCodec, TokenError};
use crate::core::error::{Result, StockroomError};
use crate::session::{read_cookie, Session};
use axum::{
    async_trait,
    extract::{FromRequestParts, Request, State},
    http::request::Parts,
    middleware::Next,
    response::{IntoResponse, Redirect, Response},
};
use std::collections::HashSet;

/// Name of the cookie carrying the raw token
pub const TOKEN_COOKIE: &str = "token";

/// Session key holding the last token issued to the client
pub const SESSION_TOKEN_KEY: &str = "token";

/// Where unauthenticated clients are sent
pub const LOGIN_PATH: &str = "/api/login";

/// Identity of the account behind an admitted request
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AuthUser {
    pub id: i64,
    pub username: String,
}

/// Why a request was turned away
#[derive(Debug)]
pub enum Rejection {
    /// No token cookie, or cookie and session disagree
    RedirectToLogin,
    /// Cookie and session agree but the token does not verify
    Unauthorized(TokenError),
}

/// Result of evaluating the gate for one request
#[derive(Debug)]
pub enum GateOutcome {
    Public,
    Authenticated { user: AuthUser, token: String },
    Rejected(Rejection),
}

/// True when the cookie token is present and equal to the session's copy
pub fn tokens_agree(cookie_token: Option<&str>, session_token: Option<&str>) -> bool {
    matches!((cookie_token, session_token), (Some(cookie), Some(stored)) if cookie == stored)
}

/// Decide the fate of a request from its path and the two token copies
pub fn evaluate(
    path: &str,
    public_paths: &HashSet<String>,
    cookie_token: Option<&str>,
    session_token: Option<&str>,
    codec: &TokenCodec,
) -> GateOutcome {
    if public_paths.contains(path) {
        return GateOutcome::Public;
    }

    let token = match cookie_token {
        Some(token) if tokens_agree(cookie_token, session_token) => token,
        _ => return GateOutcome::Rejected(Rejection::RedirectToLogin),
    };

    match codec.verify(token) {
        Ok(claims) => GateOutcome::Authenticated {
            user: AuthUser {
                id: claims.id,
                username: claims.username,
            },
            token: token.to_string(),
        },
        Err(e) => GateOutcome::Rejected(Rejection::Unauthorized(e)),
    }
}

/// Authentication middleware
pub async fn authenticate(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Response {
    let session = match request.extensions().get::<Session>().cloned() {
        Some(session) => session,
        None => {
            return StockroomError::InitializationError(
                "Session layer must wrap the authentication gate".to_string(),
            )
            .into_response()
        }
    };

    let cookie_token = read_cookie(request.headers(), TOKEN_COOKIE);
    let session_token = session.get(SESSION_TOKEN_KEY);

    let outcome = evaluate(
        request.uri().path(),
        &state.public_paths,
        cookie_token.as_deref(),
        session_token.as_deref(),
        &state.token_codec,
    );

    match outcome {
        GateOutcome::Public => next.run(request).await,
        GateOutcome::Rejected(Rejection::RedirectToLogin) => {
            tracing::debug!(path = %request.uri().path(), "No agreeing token, redirecting to login");
            Redirect::to(LOGIN_PATH).into_response()
        }
        GateOutcome::Rejected(Rejection::Unauthorized(e)) => {
            tracing::warn!(path = %request.uri().path(), error = %e, "Token verification failed");
            StockroomError::Token(e).into_response()
        }
        GateOutcome::Authenticated { user, token } => {
            session.set(SESSION_TOKEN_KEY, token);
            if let Err(e) = session.save().await {
                return e.into_response();
            }

            tracing::debug!(account_id = user.id, username = %user.username, "Request authenticated");
            request.extensions_mut().insert(user);
            next.run(request).await
        }
    }
}

#[async_trait]
impl<S> FromRequestParts<S> for AuthUser
where
    S: Send + Sync,
{
    type Rejection = StockroomError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self> {
        parts.extensions.get::<AuthUser>().cloned().ok_or_else(|| {
            StockroomError::InitializationError("Route is not behind the authentication gate".to_string())
        })
    }
}
