//! Session authentication, cookies and the global rate limit.

use axum::extract::{Request, State};
use axum::http::{HeaderValue, header};
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use axum_extra::extract::CookieJar;
use axum_extra::extract::cookie::{Cookie, SameSite};
use chrono::{DateTime, Utc};
use lodgely_core::token::validate_token_plaintext;
use lodgely_core::{TokenScope, Validator};
use tracing::debug;

use super::AppState;
use super::error::ApiError;
use super::extract::CurrentUser;

pub const SESSION_COOKIE: &str = "session";
pub const OAUTH_STATE_COOKIE: &str = "oauth_state";

/// Cookie carrying a session token until `expiry`.
pub fn session_cookie(token: String, expiry: DateTime<Utc>, secure: bool) -> Cookie<'static> {
    let seconds = (expiry - Utc::now()).num_seconds().max(0);
    Cookie::build((SESSION_COOKIE, token))
        .path("/")
        .http_only(true)
        .secure(secure)
        .same_site(SameSite::Lax)
        .max_age(time::Duration::seconds(seconds))
        .build()
}

/// An expired, empty session cookie.
pub fn removal_cookie(name: &'static str) -> Cookie<'static> {
    let mut cookie = Cookie::build((name, "")).path("/").http_only(true).build();
    cookie.make_removal();
    cookie
}

/// Resolve the `session` cookie to a user and store it as [`CurrentUser`].
///
/// A missing cookie is an anonymous request. A malformed, unknown or
/// expired token is rejected with 401 and the cookie is cleared.
pub async fn authenticate(
    State(state): State<AppState>,
    jar: CookieJar,
    mut req: Request,
    next: Next,
) -> Response {
    let token = jar.get(SESSION_COOKIE).map(|c| c.value().to_string());
    let current = match token.as_deref() {
        None => CurrentUser::Anonymous,
        Some(token) => {
            let mut v = Validator::new();
            validate_token_plaintext(&mut v, token);
            if !v.is_valid() {
                return reject(jar);
            }
            let token = token.to_string();
            let lookup = state
                .with_db(move |db| db.get_user_for_token(TokenScope::Authentication, &token))
                .await;
            match lookup {
                Ok(user) => CurrentUser::User(Box::new(user)),
                Err(ApiError::NotFound) => {
                    debug!("unknown or expired session token");
                    return reject(jar);
                }
                Err(err) => return with_vary(err.into_response()),
            }
        }
    };

    req.extensions_mut().insert(current);
    with_vary(next.run(req).await)
}

fn reject(jar: CookieJar) -> Response {
    let jar = jar.add(removal_cookie(SESSION_COOKIE));
    with_vary((jar, ApiError::InvalidToken).into_response())
}

fn with_vary(mut response: Response) -> Response {
    response
        .headers_mut()
        .append(header::VARY, HeaderValue::from_static("Authorization"));
    response
}

/// Reject with 429 once the configured global rate is exceeded.
pub async fn rate_limit(State(state): State<AppState>, req: Request, next: Next) -> Response {
    if let Some(limiter) = &state.limiter {
        if limiter.check().is_err() {
            return ApiError::RateLimited.into_response();
        }
    }
    next.run(req).await
}
