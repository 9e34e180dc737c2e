//! # HTTP API
//!
//! axum router for the `/v1` REST surface.
//!
//! | Prefix | Module |
//! |--------|--------|
//! | `/v1/auth` | [`auth`] |
//! | `/v1/user` | [`users`] |
//! | `/v1/listings` | [`listings`] |
//! | `/v1/bookings` | [`bookings`] |
//! | `/v1/upload` | [`uploads`] |
//! | `/healthcheck` | [`health`] |
//!
//! Layers, outermost first: trace, CORS, rate limit, session authentication.

pub mod auth;
pub mod bookings;
pub mod error;
pub mod extract;
pub mod health;
pub mod listings;
pub mod middleware;
pub mod uploads;
pub mod users;

use std::num::NonZeroU32;
use std::sync::Arc;
use std::time::Duration;

use axum::extract::DefaultBodyLimit;
use axum::http::{HeaderValue, Method, header};
use axum::routing::{delete, get, patch, post};
use axum::{Router, middleware as axum_middleware};
use governor::{DefaultDirectRateLimiter, Quota, RateLimiter};
use lodgely_core::{Database, Password, User};
use tower_http::cors::CorsLayer;
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;
use tracing::warn;

use crate::config::Config;
use crate::mailer::Mailer;
use crate::oauth::{OAuthProvider, ProviderKind};

pub use error::ApiError;

/// Shared state handed to every handler.
#[derive(Clone)]
pub struct AppState {
    pub db: Database,
    pub config: Arc<Config>,
    pub mailer: Arc<dyn Mailer>,
    pub github: Option<Arc<OAuthProvider>>,
    pub google: Option<Arc<OAuthProvider>>,
    pub limiter: Option<Arc<DefaultDirectRateLimiter>>,
}

impl AppState {
    pub fn new(db: Database, config: Config, mailer: Arc<dyn Mailer>) -> Self {
        let github = OAuthProvider::from_config(ProviderKind::GitHub, &config).map(Arc::new);
        let google = OAuthProvider::from_config(ProviderKind::Google, &config).map(Arc::new);
        let limiter = NonZeroU32::new(config.rate_limit_per_second)
            .map(|rate| Arc::new(RateLimiter::direct(Quota::per_second(rate))));
        Self {
            db,
            config: Arc::new(config),
            mailer,
            github,
            google,
            limiter,
        }
    }

    pub fn oauth_provider(&self, kind: ProviderKind) -> Option<&OAuthProvider> {
        match kind {
            ProviderKind::GitHub => self.github.as_deref(),
            ProviderKind::Google => self.google.as_deref(),
        }
    }

    /// Run a storage call on the blocking pool.
    ///
    /// rusqlite is synchronous and the connection sits behind a mutex, so
    /// handlers never touch [`Database`] from an async worker directly.
    pub async fn with_db<T, F>(&self, f: F) -> Result<T, ApiError>
    where
        F: FnOnce(&Database) -> lodgely_core::Result<T> + Send + 'static,
        T: Send + 'static,
    {
        let db = self.db.clone();
        let value = tokio::task::spawn_blocking(move || f(&db)).await??;
        Ok(value)
    }

    /// Persist `user` and hand it back.
    pub async fn save_user(&self, user: User) -> Result<User, ApiError> {
        self.with_db(move |db| db.update_user(&user).map(|()| user)).await
    }

    /// bcrypt on the blocking pool.
    pub async fn hash_password(&self, plaintext: String) -> Result<Password, ApiError> {
        let cost = self.config.bcrypt_cost;
        let password =
            tokio::task::spawn_blocking(move || Password::hash(&plaintext, cost)).await??;
        Ok(password)
    }
}

/// Check a password on the blocking pool.
pub async fn password_matches(user: &User, plaintext: String) -> Result<bool, ApiError> {
    let user = user.clone();
    let matches =
        tokio::task::spawn_blocking(move || user.password_matches(&plaintext)).await??;
    Ok(matches)
}

fn cors_layer(config: &Config) -> CorsLayer {
    let layer = CorsLayer::new()
        .allow_methods([Method::PATCH, Method::DELETE, Method::GET, Method::POST])
        .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION])
        .allow_credentials(true)
        .max_age(Duration::from_secs(60 * 60));
    match HeaderValue::from_str(&config.client_origin) {
        Ok(origin) => layer.allow_origin(origin),
        Err(_) => {
            warn!(origin = %config.client_origin, "invalid client origin, CORS disabled");
            layer
        }
    }
}

/// Build the full application router.
pub fn router(state: AppState) -> Router {
    let upload_limit = DefaultBodyLimit::max(state.config.max_upload_bytes);

    let auth_routes = Router::new()
        .route("/v1/auth/register", post(auth::register))
        .route("/v1/auth/verify/{id}", post(auth::verify))
        .route("/v1/auth/login", post(auth::login))
        .route("/v1/auth/logout", delete(auth::logout))
        .route("/v1/auth/{provider}/login", get(auth::oauth_login))
        .route("/v1/auth/{provider}/callback", get(auth::oauth_callback));

    let user_routes = Router::new()
        .route(
            "/v1/user",
            get(users::show)
                .delete(users::delete_account)
                .patch(users::update_profile),
        )
        .route("/v1/user/reset-password", post(users::reset_password))
        .route("/v1/user/new-password/{email}", post(users::new_password))
        .route("/v1/user/password", patch(users::change_password))
        .route("/v1/user/change-email", post(users::change_email))
        .route("/v1/user/change-email/verify", post(users::verify_change_email));

    let listing_routes = Router::new()
        .route("/v1/listings", get(listings::search).post(listings::create))
        .route("/v1/listings/user-listings", get(listings::for_owner))
        .route(
            "/v1/listings/{id}",
            get(listings::show).patch(listings::update),
        )
        .route("/v1/listings/delete/{id}", delete(listings::remove))
        .route("/v1/listings/{id}/images", post(listings::add_image))
        .route(
            "/v1/listings/images/{id}",
            delete(listings::remove_image)
                .post(listings::upload_images)
                .layer(upload_limit.clone()),
        );

    let booking_routes = Router::new()
        .route("/v1/bookings", post(bookings::create))
        .route("/v1/bookings/user-bookings", get(bookings::for_guest))
        .route("/v1/bookings/property-bookings/{id}", get(bookings::for_listing))
        .route("/v1/bookings/{id}", get(bookings::show).delete(bookings::cancel));

    let upload_routes = Router::new().route(
        "/v1/upload/image",
        post(uploads::upload_image).layer(upload_limit),
    );

    Router::new()
        .route("/healthcheck", get(health::healthcheck))
        .merge(auth_routes)
        .merge(user_routes)
        .merge(listing_routes)
        .merge(booking_routes)
        .merge(upload_routes)
        .nest_service("/uploads", ServeDir::new(&state.config.upload_dir))
        .fallback(health::not_found)
        .method_not_allowed_fallback(health::method_not_allowed)
        .layer(axum_middleware::from_fn_with_state(
            state.clone(),
            middleware::authenticate,
        ))
        .layer(axum_middleware::from_fn_with_state(
            state.clone(),
            middleware::rate_limit,
        ))
        .layer(cors_layer(&state.config))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]

    use super::*;
    use crate::mailer::LogMailer;

    fn state() -> AppState {
        let db = Database::open_in_memory().unwrap();
        AppState::new(db, Config::default(), Arc::new(LogMailer))
    }

    #[tokio::test]
    async fn storage_errors_map_to_api_errors() {
        let state = state();
        let missing = state.with_db(|db| db.get_user_by_id(42)).await;
        assert!(matches!(missing, Err(ApiError::NotFound)));
    }

    #[tokio::test]
    async fn save_user_persists_and_returns_the_user() {
        let state = state();
        let mut user = User::new("Ada", "ada@example.com");
        let mut user = state
            .with_db(move |db| db.insert_user(&mut user).map(|()| user))
            .await
            .unwrap();

        user.name = "Ada Lovelace".to_string();
        let saved = state.save_user(user).await.unwrap();
        let id = saved.id;
        let stored = state.with_db(move |db| db.get_user_by_id(id)).await.unwrap();
        assert_eq!(stored.name, "Ada Lovelace");
        assert_eq!(saved.name, stored.name);
    }
}
