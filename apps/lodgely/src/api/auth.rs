//! `/v1/auth`: registration, email verification, login, logout and OAuth.

use axum::Json;
use axum::extract::rejection::QueryRejection;
use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::response::Redirect;
use axum_extra::extract::CookieJar;
use axum_extra::extract::cookie::{Cookie, SameSite};
use chrono::Duration;
use lodgely_core::models::validate_user;
use lodgely_core::token::{codes_match, one_time_code};
use lodgely_core::{CoreError, Database, TokenScope, User, Validator};
use serde::Deserialize;
use serde_json::{Value, json};
use tracing::{error, info};
use uuid::Uuid;

use super::error::ApiError;
use super::extract::{ApiJson, ApiPath, CurrentUser, RequireActivatedUser};
use super::middleware::{OAUTH_STATE_COOKIE, SESSION_COOKIE, removal_cookie, session_cookie};
use super::{AppState, password_matches};
use crate::mailer::verification_email;
use crate::oauth::{OAuthProfile, ProviderKind};

/// Lifetime of a password or verification login.
pub const SESSION_TTL_DAYS: i64 = 30;
/// Lifetime of an OAuth login.
pub const OAUTH_SESSION_TTL_HOURS: i64 = 24;
const OAUTH_STATE_TTL_MINUTES: i64 = 10;

/// Issue a session token and the cookie carrying it.
async fn start_session(
    state: &AppState,
    jar: CookieJar,
    user_id: i64,
    ttl: Duration,
) -> Result<(CookieJar, String), ApiError> {
    let token = state
        .with_db(move |db| db.new_token(user_id, ttl, TokenScope::Authentication))
        .await?;
    let cookie = session_cookie(
        token.plaintext.clone(),
        token.expiry,
        state.config.secure_cookies,
    );
    Ok((jar.add(cookie), token.plaintext))
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct RegisterInput {
    pub email: String,
    pub name: String,
    pub password: String,
}

/// `POST /v1/auth/register`
pub async fn register(
    State(state): State<AppState>,
    ApiJson(input): ApiJson<RegisterInput>,
) -> Result<(StatusCode, Json<Value>), ApiError> {
    let mut user = User::new(input.name.trim(), input.email.trim());

    let mut v = Validator::new();
    validate_user(&mut v, &user, Some(&input.password));
    v.into_result()?;

    let code = one_time_code();
    user.password = Some(state.hash_password(input.password).await?);
    user.verification_code = Some(code.clone());
    let user = state
        .with_db(move |db| db.insert_user(&mut user).map(|()| user))
        .await?;
    info!(user_id = user.id, "user registered");

    // The account exists either way; a lost email is not a failed signup.
    if let Err(err) = state
        .mailer
        .send(&verification_email(&user.email, &user.name, &code))
        .await
    {
        error!(user_id = user.id, error = %err, "failed to send verification email");
    }

    Ok((StatusCode::CREATED, Json(json!({ "userId": user.id }))))
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct CodeInput {
    pub code: String,
}

/// `POST /v1/auth/verify/{id}`
pub async fn verify(
    State(state): State<AppState>,
    jar: CookieJar,
    ApiPath(id): ApiPath<i64>,
    ApiJson(input): ApiJson<CodeInput>,
) -> Result<(CookieJar, Json<Value>), ApiError> {
    let mut user = state.with_db(move |db| db.get_user_by_id(id)).await?;
    if user.activated {
        return Err(ApiError::invalid("code", "user already activated"));
    }
    if !codes_match(user.verification_code.as_deref(), input.code.trim()) {
        return Err(ApiError::invalid("code", "invalid verification code"));
    }

    user.activated = true;
    user.verification_code = None;
    let user_id = user.id;
    state.with_db(move |db| db.update_user(&user)).await?;
    info!(user_id, "user activated");

    let (jar, token) = start_session(&state, jar, user_id, Duration::days(SESSION_TTL_DAYS)).await?;
    Ok((jar, Json(json!({ "token": token }))))
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct LoginInput {
    pub email: String,
    pub password: String,
}

/// `POST /v1/auth/login`
pub async fn login(
    State(state): State<AppState>,
    jar: CookieJar,
    ApiJson(input): ApiJson<LoginInput>,
) -> Result<(CookieJar, Json<Value>), ApiError> {
    let email = input.email.trim().to_string();
    let user = match state.with_db(move |db| db.get_user_by_email(&email)).await {
        Ok(user) => user,
        Err(ApiError::NotFound) => return Err(ApiError::InvalidToken),
        Err(err) => return Err(err),
    };
    if !password_matches(&user, input.password).await? {
        return Err(ApiError::InvalidToken);
    }
    if !user.activated {
        return Err(ApiError::InactiveAccount);
    }

    let (jar, token) = start_session(&state, jar, user.id, Duration::days(SESSION_TTL_DAYS)).await?;
    Ok((jar, Json(json!({ "token": token }))))
}

/// `DELETE /v1/auth/logout`
pub async fn logout(
    State(state): State<AppState>,
    jar: CookieJar,
    RequireActivatedUser(user): RequireActivatedUser,
) -> Result<(CookieJar, Json<Value>), ApiError> {
    state
        .with_db(move |db| db.delete_all_tokens_for_user(TokenScope::Authentication, user.id))
        .await?;
    let jar = jar.add(removal_cookie(SESSION_COOKIE));
    Ok((jar, Json(json!({ "message": "you have been logged out" }))))
}

// =============================================================================
// OAUTH
// =============================================================================

fn provider_kind(name: &str) -> Result<ProviderKind, ApiError> {
    match name {
        "github" => Ok(ProviderKind::GitHub),
        "google" => Ok(ProviderKind::Google),
        _ => Err(ApiError::NotFound),
    }
}

/// `GET /v1/auth/{provider}/login`
pub async fn oauth_login(
    State(state): State<AppState>,
    current: CurrentUser,
    jar: CookieJar,
    ApiPath(provider): ApiPath<String>,
) -> Result<(CookieJar, Redirect), ApiError> {
    let kind = provider_kind(&provider)?;
    let provider = state.oauth_provider(kind).ok_or(ApiError::NotFound)?;
    if !current.is_anonymous() {
        return Err(ApiError::AlreadySignedIn);
    }

    let oauth_state = Uuid::new_v4().simple().to_string();
    let cookie = Cookie::build((OAUTH_STATE_COOKIE, oauth_state.clone()))
        .path("/")
        .http_only(true)
        .secure(state.config.secure_cookies)
        .same_site(SameSite::Lax)
        .max_age(time::Duration::minutes(OAUTH_STATE_TTL_MINUTES))
        .build();

    Ok((
        jar.add(cookie),
        Redirect::temporary(&provider.authorize_url(&oauth_state)),
    ))
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct CallbackParams {
    pub code: String,
    pub state: String,
}

/// `GET /v1/auth/{provider}/callback`
pub async fn oauth_callback(
    State(state): State<AppState>,
    current: CurrentUser,
    jar: CookieJar,
    ApiPath(provider): ApiPath<String>,
    params: Result<Query<CallbackParams>, QueryRejection>,
) -> Result<(CookieJar, Redirect), ApiError> {
    let kind = provider_kind(&provider)?;
    let provider = state.oauth_provider(kind).ok_or(ApiError::NotFound)?;
    if !current.is_anonymous() {
        return Err(ApiError::AlreadySignedIn);
    }
    let Query(params) = params?;

    let expected = jar.get(OAUTH_STATE_COOKIE).map(|c| c.value().to_string());
    let jar = jar.add(removal_cookie(OAUTH_STATE_COOKIE));
    if !codes_match(expected.as_deref(), &params.state) {
        return Err(ApiError::InvalidToken);
    }
    if params.code.is_empty() {
        return Err(ApiError::BadRequest("missing authorization code".to_string()));
    }

    let access_token = provider.exchange_code(&params.code).await?;
    let profile = provider.fetch_profile(&access_token).await?;
    let user = state
        .with_db(move |db| claim_oauth_account(db, profile))
        .await?;
    info!(user_id = user.id, provider = %kind, "oauth sign in");

    let (jar, _) = start_session(
        &state,
        jar,
        user.id,
        Duration::hours(OAUTH_SESSION_TTL_HOURS),
    )
    .await?;
    Ok((jar, Redirect::temporary(&state.config.client_origin)))
}

/// The account for `profile.email`, created (activated, passwordless) when absent.
fn claim_oauth_account(db: &Database, profile: OAuthProfile) -> lodgely_core::Result<User> {
    match db.get_user_by_email(&profile.email) {
        Ok(mut user) => {
            // The provider vouched for the address, not for whoever
            // registered it unverified: drop their password, codes and sessions.
            if !user.activated {
                user.activated = true;
                user.password = None;
                user.verification_code = None;
                user.reset_code = None;
                user.email_change_code = None;
                db.update_user(&user)?;
                db.delete_all_tokens_for_user(TokenScope::Authentication, user.id)?;
                info!(user_id = user.id, "unverified account claimed through oauth");
            }
            Ok(user)
        }
        Err(CoreError::NotFound) => {
            let mut user = User::new(profile.name, profile.email);
            user.image = Some(profile.avatar_url).filter(|url| !url.is_empty());
            user.activated = true;
            db.insert_user(&mut user)?;
            Ok(user)
        }
        Err(err) => Err(err),
    }
}
