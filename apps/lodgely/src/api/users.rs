//! `/v1/user`: profile, password reset and change, email change, account deletion.

use axum::Json;
use axum::extract::State;
use lodgely_core::models::{validate_email, validate_image_url, validate_profile_name};
use lodgely_core::password::validate_password_plaintext;
use lodgely_core::token::{codes_match, one_time_code};
use lodgely_core::{TokenScope, Validator};
use serde::Deserialize;
use serde_json::{Value, json};
use tracing::info;

use super::error::ApiError;
use super::extract::{ApiJson, ApiPath, RequireActivatedUser};
use super::{AppState, password_matches};
use crate::mailer::{email_change_email, password_reset_email};

fn success() -> Json<Value> {
    Json(json!({ "message": "success" }))
}

/// `GET /v1/user`
pub async fn show(RequireActivatedUser(user): RequireActivatedUser) -> Json<Value> {
    Json(json!({ "user": user }))
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct EmailInput {
    pub email: String,
}

/// `POST /v1/user/reset-password`
pub async fn reset_password(
    State(state): State<AppState>,
    ApiJson(input): ApiJson<EmailInput>,
) -> Result<Json<Value>, ApiError> {
    let email = input.email.trim().to_string();
    let mut user = state.with_db(move |db| db.get_user_by_email(&email)).await?;

    let code = one_time_code();
    user.reset_code = Some(code.clone());
    let user = state.save_user(user).await?;

    state
        .mailer
        .send(&password_reset_email(&user.email, &user.name, &code))
        .await?;

    Ok(Json(json!({ "email": user.email })))
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct NewPasswordInput {
    pub reset_token: String,
    pub new_password: String,
}

/// `POST /v1/user/new-password/{email}`
pub async fn new_password(
    State(state): State<AppState>,
    ApiPath(email): ApiPath<String>,
    ApiJson(input): ApiJson<NewPasswordInput>,
) -> Result<Json<Value>, ApiError> {
    let email = email.trim().to_string();
    let mut user = state.with_db(move |db| db.get_user_by_email(&email)).await?;
    if !codes_match(user.reset_code.as_deref(), input.reset_token.trim()) {
        return Err(ApiError::InvalidToken);
    }

    let mut v = Validator::new();
    validate_password_plaintext(&mut v, "newPassword", &input.new_password);
    v.into_result()?;

    user.password = Some(state.hash_password(input.new_password).await?);
    user.reset_code = None;
    let user_id = user.id;
    let revoked = state
        .with_db(move |db| {
            db.update_user(&user)?;
            db.delete_all_tokens_for_user(TokenScope::Authentication, user_id)
        })
        .await?;
    info!(user_id, revoked, "password reset");

    Ok(success())
}

/// `DELETE /v1/user`
pub async fn delete_account(
    State(state): State<AppState>,
    RequireActivatedUser(user): RequireActivatedUser,
) -> Result<Json<Value>, ApiError> {
    let user_id = user.id;
    state.with_db(move |db| db.delete_user(user_id)).await?;
    info!(user_id, "account deleted");
    Ok(success())
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct ProfileInput {
    pub name: String,
    pub image: String,
}

/// `PATCH /v1/user`
pub async fn update_profile(
    State(state): State<AppState>,
    RequireActivatedUser(mut user): RequireActivatedUser,
    ApiJson(input): ApiJson<ProfileInput>,
) -> Result<Json<Value>, ApiError> {
    let name = input.name.trim().to_string();
    let image = input.image.trim().to_string();

    let mut v = Validator::new();
    validate_profile_name(&mut v, &name);
    if !image.is_empty() {
        validate_image_url(&mut v, "image", &image);
    }
    v.into_result()?;

    user.name = name;
    user.image = Some(image).filter(|i| !i.is_empty());
    let user = state.save_user(user).await?;

    Ok(Json(json!({ "user": user })))
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ChangePasswordInput {
    pub old_password: String,
    pub new_password: String,
}

/// `PATCH /v1/user/password`
pub async fn change_password(
    State(state): State<AppState>,
    RequireActivatedUser(mut user): RequireActivatedUser,
    ApiJson(input): ApiJson<ChangePasswordInput>,
) -> Result<Json<Value>, ApiError> {
    if !password_matches(&user, input.old_password).await? {
        return Err(ApiError::InvalidToken);
    }

    let mut v = Validator::new();
    validate_password_plaintext(&mut v, "newPassword", &input.new_password);
    v.into_result()?;

    user.password = Some(state.hash_password(input.new_password).await?);
    let user = state.save_user(user).await?;
    info!(user_id = user.id, "password changed");

    Ok(success())
}

/// `POST /v1/user/change-email`
pub async fn change_email(
    State(state): State<AppState>,
    RequireActivatedUser(mut user): RequireActivatedUser,
) -> Result<Json<Value>, ApiError> {
    let code = one_time_code();
    user.email_change_code = Some(code.clone());
    let user = state.save_user(user).await?;

    state
        .mailer
        .send(&email_change_email(&user.email, &user.name, &code))
        .await?;

    Ok(Json(json!({ "message": "ok" })))
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct VerifyChangeEmailInput {
    pub reset_token: String,
    pub new_email: String,
}

/// `POST /v1/user/change-email/verify`
pub async fn verify_change_email(
    State(state): State<AppState>,
    RequireActivatedUser(mut user): RequireActivatedUser,
    ApiJson(input): ApiJson<VerifyChangeEmailInput>,
) -> Result<Json<Value>, ApiError> {
    if !codes_match(user.email_change_code.as_deref(), input.reset_token.trim()) {
        return Err(ApiError::InvalidToken);
    }

    let new_email = input.new_email.trim().to_string();
    let mut v = Validator::new();
    validate_email(&mut v, "newEmail", &new_email);
    v.into_result()?;

    user.email = new_email;
    user.email_change_code = None;
    let user = state.save_user(user).await.map_err(|err| match err {
        ApiError::Validation(_) => {
            ApiError::invalid("newEmail", "user with this email address already exists")
        }
        other => other,
    })?;
    info!(user_id = user.id, "email changed");

    Ok(success())
}
