//! Register, login and logout handlers

use crate::api::handlers::AppState;
use crate::auth::middleware::{
    tokens_agree, AuthUser, LOGIN_PATH, SESSION_TOKEN_KEY, TOKEN_COOKIE,
};
use crate::auth::models::{CookiePolicy, CredentialsForm, Greeting};
use crate::core::error::Result;
use crate::session::{read_cookie, Session, SetCookie};
use axum::{
    extract::State,
    http::{header, HeaderMap},
    response::{AppendHeaders, Html, IntoResponse, Redirect, Response},
    Form, Json,
};

/// Landing page after a successful login
pub const HOME_PATH: &str = "/api/home";

fn token_cookie(token: &str, policy: CookiePolicy) -> SetCookie {
    SetCookie::new(TOKEN_COOKIE, token)
        .max_age(policy.max_age)
        .secure(policy.secure)
}

fn redirect_with_cookie(to: &str, cookie: SetCookie) -> Response {
    (
        AppendHeaders([(header::SET_COOKIE, cookie.to_string())]),
        Redirect::to(to),
    )
        .into_response()
}

/// Handler for POST /register
///
/// Sets the token cookie but leaves the session untouched, so the new
/// account still has to log in before the gate admits it.
pub async fn register(
    State(state): State<AppState>,
    Form(form): Form<CredentialsForm>,
) -> Result<Response> {
    tracing::info!(username = %form.username, "Registration attempt");

    let account = state.credentials.register(&form.username, &form.password).await?;
    let token = state.token_codec.issue(&account)?;

    Ok(redirect_with_cookie(LOGIN_PATH, token_cookie(&token, state.cookie_policy)))
}

/// Handler for POST /login
pub async fn login(
    State(state): State<AppState>,
    session: Session,
    Form(form): Form<CredentialsForm>,
) -> Result<Response> {
    tracing::info!(username = %form.username, "Login attempt");

    let account = state.credentials.login(&form.username, &form.password).await?;
    let token = state.token_codec.issue(&account)?;

    session.set(SESSION_TOKEN_KEY, token.clone());
    session.save().await?;

    tracing::info!(account_id = account.id, username = %account.username, "Login successful");
    Ok(redirect_with_cookie(HOME_PATH, token_cookie(&token, state.cookie_policy)))
}

/// Handler for GET /logout
pub async fn logout(session: Session) -> Result<Response> {
    session.clear();
    session.save().await?;

    tracing::info!("Logged out");
    Ok(redirect_with_cookie(LOGIN_PATH, SetCookie::expired(TOKEN_COOKIE)))
}

/// Handler for GET /api/login
///
/// Clients whose cookie already agrees with their session skip the form.
pub async fn login_page(headers: HeaderMap, session: Session) -> Response {
    let cookie_token = read_cookie(&headers, TOKEN_COOKIE);
    let session_token = session.get(SESSION_TOKEN_KEY);

    if tokens_agree(cookie_token.as_deref(), session_token.as_deref()) {
        return Redirect::to(HOME_PATH).into_response();
    }

    Html(credentials_page("Log in", "/login")).into_response()
}

/// Handler for GET /api/register
pub async fn register_page() -> Html<String> {
    Html(credentials_page("Register", "/register"))
}

/// Handler for GET /api/home
pub async fn home(user: AuthUser) -> Json<Greeting> {
    Json(Greeting {
        id: user.id,
        message: format!("Welcome, {}", user.username),
        username: user.username,
    })
}

fn credentials_page(title: &str, action: &str) -> String {
    format!(
        "<!DOCTYPE html>\n<html>\n<head><title>{title}</title></head>\n<body>\n\
         <h1>{title}</h1>\n\
         <form method=\"post\" action=\"{action}\">\n\
         <label>Username <input name=\"username\" required></label>\n\
         <label>Password <input name=\"password\" type=\"password\" minlength=\"8\" required></label>\n\
         <button type=\"submit\">{title}</button>\n\
         </form>\n</body>\n</html>\n"
    )
}
