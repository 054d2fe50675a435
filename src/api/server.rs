//! HTTP Server implementation
//!
//! This module provides the HTTP server using Axum framework with:
//! - Application state assembly from configuration
//! - Session, security header, trace and CORS layers
//! - Request timeouts
//! - Graceful shutdown handling

use crate::api::handlers::AppState;
use crate::api::middleware::{
    security_headers_middleware, trace_id_middleware, SecurityHeadersConfig,
};
use crate::api::routes::build_api_routes;
use crate::auth::credentials::CredentialVerifier;
use crate::auth::models::CookiePolicy;
use crate::auth::token::TokenCodec;
use crate::core::config::{Config, ServerConfig};
use crate::core::services::ItemService;
use crate::db::manager::DatabaseManager;
use crate::db::repository::{AccountRepository, ItemRepository};
use crate::session::{
    session_middleware, MemorySessionStore, SessionConfig, SessionStore, SqliteSessionStore,
};
use axum::{middleware, Router};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::signal;
use tower::ServiceBuilder;
use tower_http::{
    cors::{Any, CorsLayer},
    timeout::TimeoutLayer,
    trace::TraceLayer,
};
use tracing::info;

/// HTTP API Server
pub struct ApiServer {
    router: Router,
    config: ServerConfig,
}

impl ApiServer {
    /// Create a new API server, picking the session backend from configuration
    pub fn new(config: &Config, db: Arc<DatabaseManager>) -> anyhow::Result<Self> {
        let ttl = chrono::Duration::seconds(config.security.cookie_max_age);
        let session_store: Arc<dyn SessionStore> = match config.session.backend.as_str() {
            "memory" => Arc::new(MemorySessionStore::with_ttl(ttl)),
            "sqlite" => Arc::new(SqliteSessionStore::with_ttl(db.clone(), ttl)),
            other => anyhow::bail!("Unknown session backend: {}", other),
        };
        info!(backend = %config.session.backend, "Session store ready");

        Ok(Self {
            router: build_router(config, db, session_store),
            config: config.server.clone(),
        })
    }

    /// Start the HTTP server and listen for requests
    ///
    /// This method will block until the server is shut down gracefully.
    pub async fn serve(self) -> anyhow::Result<()> {
        let addr = format!("{}:{}", self.config.host, self.config.port);
        let socket_addr: SocketAddr = addr.parse()?;

        info!(
            host = %self.config.host,
            port = self.config.port,
            mode = %self.config.mode,
            request_timeout = self.config.request_timeout,
            "Starting HTTP server"
        );

        let listener = tokio::net::TcpListener::bind(socket_addr).await?;
        info!(addr = %socket_addr, "HTTP server listening");

        axum::serve(listener, self.router)
            .with_graceful_shutdown(shutdown_signal())
            .await?;

        info!("HTTP server shut down gracefully");
        Ok(())
    }

    pub fn router(&self) -> &Router {
        &self.router
    }
}

/// Assemble the shared handler state
pub fn build_state(
    config: &Config,
    db: Arc<DatabaseManager>,
    session_store: Arc<dyn SessionStore>,
) -> AppState {
    let account_repo = Arc::new(AccountRepository::new(db.clone()));
    let item_repo = Arc::new(ItemRepository::new(db));

    let token_codec = TokenCodec::new(
        &config.security.jwt_secret,
        chrono::Duration::hours(config.security.token_ttl_hours),
    );

    AppState {
        credentials: Arc::new(CredentialVerifier::new(
            account_repo.clone(),
            config.security.bcrypt_cost,
        )),
        account_repo,
        item_service: Arc::new(ItemService::new(item_repo)),
        token_codec: Arc::new(token_codec),
        session_store,
        public_paths: Arc::new(config.security.public_path_set()),
        cookie_policy: CookiePolicy {
            secure: config.server.is_production(),
            max_age: config.security.cookie_max_age,
        },
    }
}

/// Build the Axum router with all routes and middleware
pub fn build_router(
    config: &Config,
    db: Arc<DatabaseManager>,
    session_store: Arc<dyn SessionStore>,
) -> Router {
    let state = build_state(config, db, session_store.clone());

    let session_config = SessionConfig {
        store: session_store,
        cookie_name: config.session.cookie_name.clone(),
        secure: config.server.is_production(),
    };

    let security_headers_config =
        SecurityHeadersConfig::new(config.security.enable_hsts, config.security.hsts_max_age);

    build_api_routes(state)
        .layer(middleware::from_fn_with_state(session_config, session_middleware))
        .layer(
            ServiceBuilder::new()
                .layer(middleware::from_fn(trace_id_middleware))
                .layer(TraceLayer::new_for_http())
                .layer(build_cors_layer(&config.security.allowed_origins))
                .layer(TimeoutLayer::new(Duration::from_secs(
                    config.server.request_timeout,
                )))
                .layer(middleware::from_fn_with_state(
                    security_headers_config,
                    security_headers_middleware,
                )),
        )
}

/// Build CORS layer from allowed origins configuration
fn build_cors_layer(allowed_origins: &[String]) -> CorsLayer {
    let cors = CorsLayer::new().allow_methods(Any).allow_headers(Any);

    if allowed_origins.iter().any(|origin| origin == "*") {
        cors.allow_origin(Any)
    } else {
        let origins: Vec<_> = allowed_origins
            .iter()
            .filter_map(|origin| origin.parse().ok())
            .collect();
        cors.allow_origin(origins)
    }
}

/// Wait for shutdown signal (Ctrl+C or SIGTERM)
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => info!("Received Ctrl+C signal"),
        _ = terminate => info!("Received SIGTERM signal"),
    }

    info!("Initiating graceful shutdown...");
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{body::Body, extract::Request, http::StatusCode};
    use tower::util::ServiceExt;

    fn test_config() -> Config {
        let mut config = Config::defaults().unwrap();
        config.security.bcrypt_cost = crate::core::config::MIN_BCRYPT_COST;
        config.session.backend = "memory".to_string();
        config
    }

    #[test]
    fn test_cors_layer_accepts_origin_list() {
        let _ = build_cors_layer(&["*".to_string()]);
        let _ = build_cors_layer(&["http://localhost:3000".to_string()]);
    }

    #[test]
    fn test_cookie_policy_follows_mode() {
        let db = Arc::new(DatabaseManager::new_in_memory().unwrap());
        let mut config = test_config();

        let state = build_state(&config, db.clone(), Arc::new(MemorySessionStore::new()));
        assert!(!state.cookie_policy.secure);
        assert_eq!(state.cookie_policy.max_age, 3600);

        config.server.mode = "production".to_string();
        let state = build_state(&config, db, Arc::new(MemorySessionStore::new()));
        assert!(state.cookie_policy.secure);
    }

    #[tokio::test]
    async fn test_health_and_headers() {
        let db = Arc::new(DatabaseManager::new_in_memory().unwrap());
        let server = ApiServer::new(&test_config(), db).unwrap();

        let response = server
            .router()
            .clone()
            .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert!(response.headers().contains_key("x-trace-id"));
        assert_eq!(response.headers()["x-frame-options"], "DENY");
        assert!(response.headers().get("set-cookie").is_none());
    }
}
