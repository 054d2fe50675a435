//! Server-side sessions bound to an opaque cookie
//!
//! The session layer resolves the client's session cookie to a [`Session`]
//! handle before the handler runs. Handlers read and write values on the
//! handle and persist them with [`Session::save`]; a save error is returned to
//! the caller rather than dropped. Saving a cleared session deletes the record.

pub mod cookie;
pub mod store;

pub use cookie::{read_cookie, SetCookie};
pub use store::{MemorySessionStore, SessionData, SessionStore, SqliteSessionStore};

use crate::core::error::{Result, StockroomError};
use axum::{
    async_trait,
    extract::{FromRequestParts, Request, State},
    http::{header, request::Parts},
    middleware::Next,
    response::{IntoResponse, Response},
};
use std::sync::{Arc, Mutex, MutexGuard};
use uuid::Uuid;

#[derive(Debug)]
struct SessionState {
    id: String,
    values: SessionData,
    is_new: bool,
    persisted: bool,
}

/// Per-request handle on the client's session
#[derive(Clone)]
pub struct Session {
    state: Arc<Mutex<SessionState>>,
    store: Arc<dyn SessionStore>,
}

impl Session {
    fn new(id: String, values: SessionData, is_new: bool, store: Arc<dyn SessionStore>) -> Self {
        Self {
            state: Arc::new(Mutex::new(SessionState {
                id,
                values,
                is_new,
                persisted: !is_new,
            })),
            store,
        }
    }

    /// Start an empty session under a freshly generated id
    pub fn fresh(store: Arc<dyn SessionStore>) -> Self {
        Self::new(Uuid::new_v4().to_string(), SessionData::new(), true, store)
    }

    /// Resolve `id` against the store, starting a fresh session when it is
    /// absent or unknown
    pub async fn load(id: Option<&str>, store: Arc<dyn SessionStore>) -> Result<Self> {
        if let Some(id) = id {
            if let Some(values) = store.load(id).await? {
                return Ok(Self::new(id.to_string(), values, false, store));
            }
        }
        Ok(Self::fresh(store))
    }

    fn lock(&self) -> MutexGuard<'_, SessionState> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub fn id(&self) -> String {
        self.lock().id.clone()
    }

    pub fn get(&self, key: &str) -> Option<String> {
        self.lock().values.get(key).cloned()
    }

    pub fn set(&self, key: impl Into<String>, value: impl Into<String>) {
        self.lock().values.insert(key.into(), value.into());
    }

    pub fn clear(&self) {
        self.lock().values.clear();
    }

    /// Persist the current values
    pub async fn save(&self) -> Result<()> {
        let (id, values) = {
            let state = self.lock();
            (state.id.clone(), state.values.clone())
        };

        let outcome = if values.is_empty() {
            self.store.remove(&id).await
        } else {
            self.store.store(&id, &values).await
        };

        match outcome {
            Ok(()) => {
                self.lock().persisted = !values.is_empty();
                Ok(())
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to save session");
                Err(StockroomError::SessionSaveError(e.to_string()))
            }
        }
    }

    /// True once a session created during this request has been stored,
    /// meaning the client has to be told its id
    fn needs_cookie(&self) -> bool {
        let state = self.lock();
        state.is_new && state.persisted
    }
}

/// Session layer settings
#[derive(Clone)]
pub struct SessionConfig {
    pub store: Arc<dyn SessionStore>,
    pub cookie_name: String,
    pub secure: bool,
}

/// Middleware that attaches a [`Session`] to every request and issues the
/// session cookie when a new session was saved
pub async fn session_middleware(
    State(config): State<SessionConfig>,
    mut request: Request,
    next: Next,
) -> Response {
    let cookie_id = read_cookie(request.headers(), &config.cookie_name);

    let session = match Session::load(cookie_id.as_deref(), config.store.clone()).await {
        Ok(session) => session,
        Err(e) => return e.into_response(),
    };
    request.extensions_mut().insert(session.clone());

    let mut response = next.run(request).await;

    if session.needs_cookie() {
        let cookie = SetCookie::new(config.cookie_name.as_str(), session.id()).secure(config.secure);
        if let Some(value) = cookie.to_header_value() {
            response.headers_mut().append(header::SET_COOKIE, value);
        }
    }

    response
}

#[async_trait]
impl<S> FromRequestParts<S> for Session
where
    S: Send + Sync,
{
    type Rejection = StockroomError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self> {
        parts.extensions.get::<Session>().cloned().ok_or_else(|| {
            StockroomError::InitializationError("Session layer is not installed".to_string())
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{body::Body, http::StatusCode, middleware, routing::get, Router};
    use tower::util::ServiceExt;

    /// Store whose writes always fail
    struct FailingStore;

    #[async_trait]
    impl SessionStore for FailingStore {
        async fn load(&self, _id: &str) -> Result<Option<SessionData>> {
            Ok(None)
        }

        async fn store(&self, _id: &str, _data: &SessionData) -> Result<()> {
            Err(StockroomError::IoError(std::io::Error::new(
                std::io::ErrorKind::Other,
                "disk full",
            )))
        }

        async fn remove(&self, _id: &str) -> Result<()> {
            Ok(())
        }
    }

    fn app(store: Arc<dyn SessionStore>) -> Router {
        async fn write(session: Session) -> Result<StatusCode> {
            session.set("token", "abc");
            session.save().await?;
            Ok(StatusCode::OK)
        }

        async fn read(session: Session) -> String {
            session.get("token").unwrap_or_default()
        }

        let config = SessionConfig {
            store,
            cookie_name: "session".to_string(),
            secure: false,
        };

        Router::new()
            .route("/write", get(write))
            .route("/read", get(read))
            .layer(middleware::from_fn_with_state(config, session_middleware))
    }

    fn session_cookie(response: &Response) -> Option<String> {
        response
            .headers()
            .get_all(header::SET_COOKIE)
            .iter()
            .filter_map(|v| v.to_str().ok())
            .find(|v| v.starts_with("session="))
            .map(|v| v.split(';').next().unwrap_or_default().to_string())
    }

    #[tokio::test]
    async fn test_saved_session_issues_cookie_and_round_trips() {
        let store = Arc::new(MemorySessionStore::new());
        let app = app(store.clone());

        let response = app
            .clone()
            .oneshot(Request::builder().uri("/write").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let cookie = session_cookie(&response).expect("session cookie issued");
        assert_eq!(store.len().await, 1);

        let response = app
            .oneshot(
                Request::builder()
                    .uri("/read")
                    .header(header::COOKIE, cookie)
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert!(session_cookie(&response).is_none());
        let body = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        assert_eq!(&body[..], b"abc");
    }

    #[tokio::test]
    async fn test_unsaved_session_sets_no_cookie() {
        let response = app(Arc::new(MemorySessionStore::new()))
            .oneshot(Request::builder().uri("/read").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert!(session_cookie(&response).is_none());
    }

    #[tokio::test]
    async fn test_unknown_session_id_is_replaced() {
        let store: Arc<dyn SessionStore> = Arc::new(MemorySessionStore::new());
        let session = Session::load(Some("forged-id"), store).await.unwrap();
        assert_ne!(session.id(), "forged-id");
    }

    #[tokio::test]
    async fn test_save_failure_is_surfaced() {
        let response = app(Arc::new(FailingStore))
            .oneshot(Request::builder().uri("/write").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert!(session_cookie(&response).is_none());
    }

    #[tokio::test]
    async fn test_clear_then_save_removes_record() {
        let store = Arc::new(MemorySessionStore::new());
        let session = Session::fresh(store.clone());
        session.set("token", "abc");
        session.save().await.unwrap();
        assert_eq!(store.len().await, 1);

        session.clear();
        session.save().await.unwrap();
        assert_eq!(store.len().await, 0);
        assert!(session.get("token").is_none());
    }
}
