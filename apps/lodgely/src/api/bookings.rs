//! `/v1/bookings`: reserve, inspect and cancel stays.

use axum::Json;
use axum::extract::State;
use axum::http::StatusCode;
use chrono::{NaiveDate, Utc};
use lodgely_core::models::validate_booking;
use lodgely_core::{NewBooking, Validator};
use serde::Deserialize;
use serde_json::{Value, json};
use tracing::info;

use super::AppState;
use super::error::ApiError;
use super::extract::{ApiJson, ApiPath, RequireActivatedUser};

const DATE_FORMAT: &str = "%Y-%m-%d";

fn parse_date(raw: &str, field: &str) -> Result<NaiveDate, ApiError> {
    NaiveDate::parse_from_str(raw.trim(), DATE_FORMAT)
        .map_err(|_| ApiError::BadRequest(format!("{field} must be a date in YYYY-MM-DD format")))
}

/// Client-sent `userId`, `pricing` and `total` are ignored; the guest is the
/// session user and the price comes from the listing.
#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct CreateBookingInput {
    pub property_id: i64,
    pub start_date: String,
    pub end_date: String,
}

/// `POST /v1/bookings`
pub async fn create(
    State(state): State<AppState>,
    RequireActivatedUser(user): RequireActivatedUser,
    ApiJson(input): ApiJson<CreateBookingInput>,
) -> Result<(StatusCode, Json<Value>), ApiError> {
    let check_in = parse_date(&input.start_date, "startDate")?;
    let check_out = parse_date(&input.end_date, "endDate")?;

    if input.property_id < 1 {
        return Err(ApiError::NotFound);
    }
    let property_id = input.property_id;
    let listing = state
        .with_db(move |db| db.get_listing(property_id))
        .await?;
    if listing.owner_id == user.id {
        return Err(ApiError::invalid("propertyId", "cannot book your own listing"));
    }

    let new_booking = NewBooking::for_listing(&listing, user.id, check_in, check_out);
    let mut v = Validator::new();
    validate_booking(&mut v, &new_booking, Utc::now().date_naive());
    v.into_result()?;

    let nights = new_booking.nights();
    let booking = state
        .with_db(move |db| {
            let id = db.insert_booking(&new_booking)?;
            db.get_booking(id)
        })
        .await?;
    info!(
        booking_id = booking.id,
        listing_id = listing.id,
        guest_id = user.id,
        nights,
        "booking created"
    );

    Ok((StatusCode::CREATED, Json(json!({ "booking": booking }))))
}

/// `GET /v1/bookings/{id}`: visible to the guest and the listing owner.
pub async fn show(
    State(state): State<AppState>,
    RequireActivatedUser(user): RequireActivatedUser,
    ApiPath(id): ApiPath<i64>,
) -> Result<Json<Value>, ApiError> {
    let booking = state.with_db(move |db| db.get_booking(id)).await?;
    if booking.guest_id != user.id && booking.listing.owner_id != user.id {
        return Err(ApiError::NotFound);
    }
    Ok(Json(json!({ "booking": booking })))
}

/// `DELETE /v1/bookings/{id}`
pub async fn cancel(
    State(state): State<AppState>,
    RequireActivatedUser(user): RequireActivatedUser,
    ApiPath(id): ApiPath<i64>,
) -> Result<Json<Value>, ApiError> {
    let guest_id = user.id;
    state
        .with_db(move |db| db.delete_booking(id, guest_id))
        .await?;
    info!(booking_id = id, guest_id = user.id, "booking cancelled");
    Ok(Json(json!({ "message": "success" })))
}

/// `GET /v1/bookings/user-bookings`
pub async fn for_guest(
    State(state): State<AppState>,
    RequireActivatedUser(user): RequireActivatedUser,
) -> Result<Json<Value>, ApiError> {
    let guest_id = user.id;
    let bookings = state
        .with_db(move |db| db.bookings_for_guest(guest_id))
        .await?;
    Ok(Json(json!({ "bookings": bookings })))
}

/// `GET /v1/bookings/property-bookings/{id}`: owner only.
pub async fn for_listing(
    State(state): State<AppState>,
    RequireActivatedUser(user): RequireActivatedUser,
    ApiPath(id): ApiPath<i64>,
) -> Result<Json<Value>, ApiError> {
    let listing = state.with_db(move |db| db.get_listing(id)).await?;
    if listing.owner_id != user.id {
        return Err(ApiError::NotFound);
    }
    let bookings = state
        .with_db(move |db| db.bookings_for_listing(listing.id))
        .await?;
    Ok(Json(json!({ "bookings": bookings })))
}
