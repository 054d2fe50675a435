//! API routes

use crate::api::handlers::{
    create_item, create_page, delete_item, edit_item, edit_page, get_item, health_check,
    list_items, AppState,
};
use crate::api::middleware::no_cache_middleware;
use crate::auth::handlers::{home, login, login_page, logout, register, register_page};
use crate::auth::middleware::authenticate;
use axum::{
    middleware,
    routing::{get, post},
    Router,
};

/// Build the application routes.
///
/// Everything under `/api` runs behind the authentication gate; the gate
/// itself admits the configured public paths. Form submissions for
/// registration and login, logout and the health check stay outside it.
pub fn build_api_routes(state: AppState) -> Router {
    let open_routes = Router::new()
        .route("/register", post(register))
        .route("/login", post(login))
        .route("/logout", get(logout))
        .route("/health", get(health_check));

    let gated_routes = Router::new()
        .route("/api/register", get(register_page))
        .route("/api/login", get(login_page))
        .route("/api/home", get(home))
        .route("/api/index", get(list_items))
        .route("/api/items/:id", get(get_item))
        .route("/api/create", get(create_page).post(create_item))
        .route("/api/edit/:id", get(edit_page).post(edit_item))
        .route("/api/delete/:id", get(delete_item))
        .route_layer(middleware::from_fn_with_state(state.clone(), authenticate))
        .route_layer(middleware::from_fn(no_cache_middleware));

    Router::new()
        .merge(open_routes)
        .merge(gated_routes)
        .with_state(state)
}
