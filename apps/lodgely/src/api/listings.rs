//! `/v1/listings`: search, CRUD and image galleries.

use axum::Json;
use axum::extract::rejection::QueryRejection;
use axum::extract::{Multipart, Query, State};
use axum::http::StatusCode;
use lodgely_core::models::{LISTING_SORT_SAFELIST, validate_image_url, validate_listing};
use lodgely_core::{Filters, Listing, Location, User, Validator};
use serde::Deserialize;
use serde_json::{Value, json};
use tracing::info;

use super::AppState;
use super::error::ApiError;
use super::extract::{ApiJson, ApiPath, RequireActivatedUser};
use super::uploads::store_image;

pub const DEFAULT_PAGE_SIZE: u64 = 20;

fn success() -> Json<Value> {
    Json(json!({ "message": "success" }))
}

/// A listing the caller owns, else 404.
async fn owned_listing(state: &AppState, id: i64, owner: &User) -> Result<Listing, ApiError> {
    if id < 1 {
        return Err(ApiError::NotFound);
    }
    let listing = state.with_db(move |db| db.get_listing(id)).await?;
    if listing.owner_id != owner.id {
        return Err(ApiError::NotFound);
    }
    Ok(listing)
}

// =============================================================================
// SEARCH
// =============================================================================

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct SearchParams {
    pub search: Option<String>,
    pub page: Option<String>,
    pub page_size: Option<String>,
    pub sort: Option<String>,
}

fn read_int(v: &mut Validator, raw: Option<&str>, field: &str, default: u64) -> u64 {
    match raw.map(str::trim).filter(|s| !s.is_empty()) {
        None => default,
        Some(s) => s.parse().unwrap_or_else(|_| {
            v.add_error(field, "must be an integer value");
            default
        }),
    }
}

impl SearchParams {
    fn filters(&self, v: &mut Validator) -> Filters {
        Filters {
            page: read_int(v, self.page.as_deref(), "page", 1),
            page_size: read_int(v, self.page_size.as_deref(), "page_size", DEFAULT_PAGE_SIZE),
            sort: self
                .sort
                .clone()
                .filter(|s| !s.is_empty())
                .unwrap_or_else(|| "id".to_string()),
            sort_safelist: LISTING_SORT_SAFELIST.to_vec(),
        }
    }
}

/// `GET /v1/listings?search&page&page_size&sort`
pub async fn search(
    State(state): State<AppState>,
    params: Result<Query<SearchParams>, QueryRejection>,
) -> Result<Json<Value>, ApiError> {
    let Query(params) = params?;
    let mut v = Validator::new();
    let filters = params.filters(&mut v);
    filters.validate(&mut v);
    v.into_result()?;

    let search = params.search.unwrap_or_default();
    let (listings, metadata) = state
        .with_db(move |db| db.search_listings(&search, &filters))
        .await?;
    Ok(Json(json!({ "listings": listings, "metadata": metadata })))
}

/// `GET /v1/listings/user-listings`
pub async fn for_owner(
    State(state): State<AppState>,
    RequireActivatedUser(user): RequireActivatedUser,
) -> Result<Json<Value>, ApiError> {
    let owner_id = user.id;
    let listings = state
        .with_db(move |db| db.listings_for_owner(owner_id))
        .await?;
    Ok(Json(json!({ "listings": listings })))
}

/// `GET /v1/listings/{id}`
pub async fn show(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<i64>,
) -> Result<Json<Value>, ApiError> {
    if id < 1 {
        return Err(ApiError::NotFound);
    }
    let (listing, images) = state
        .with_db(move |db| {
            let listing = db.get_listing(id)?;
            let images = db.images_for_listing(listing.id)?;
            Ok((listing, images))
        })
        .await?;
    Ok(Json(json!({ "listing": listing, "listingImages": images })))
}

// =============================================================================
// CREATE / UPDATE / DELETE
// =============================================================================

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct CreateListingInput {
    pub title: String,
    pub description: String,
    pub category: String,
    #[serde(alias = "room_count")]
    pub bedrooms: i64,
    #[serde(alias = "bathroom_count")]
    pub bathrooms: i64,
    #[serde(alias = "guest_count")]
    pub guests: i64,
    pub location: Location,
    pub price: i64,
    pub images: Vec<String>,
}

/// `POST /v1/listings`
pub async fn create(
    State(state): State<AppState>,
    RequireActivatedUser(user): RequireActivatedUser,
    ApiJson(input): ApiJson<CreateListingInput>,
) -> Result<(StatusCode, Json<Value>), ApiError> {
    let mut listing = Listing {
        title: input.title.trim().to_string(),
        description: input.description.trim().to_string(),
        category: input.category.trim().to_string(),
        bedrooms: input.bedrooms,
        bathrooms: input.bathrooms,
        guests: input.guests,
        location: input.location,
        price: input.price,
        owner_id: user.id,
        owner_name: user.name.clone(),
        owner_photo: user.image.clone(),
        ..Listing::default()
    };

    let mut v = Validator::new();
    validate_listing(&mut v, &listing);
    for url in &input.images {
        validate_image_url(&mut v, "images", url);
    }
    v.into_result()?;

    let images = input.images;
    let listing_id = state
        .with_db(move |db| {
            db.insert_listing(&mut listing)?;
            for url in &images {
                db.insert_image(listing.id, url)?;
            }
            Ok(listing.id)
        })
        .await?;
    info!(listing_id, owner_id = user.id, "listing created");

    Ok((StatusCode::CREATED, Json(json!({ "listingId": listing_id }))))
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct UpdateListingInput {
    pub title: Option<String>,
    pub description: Option<String>,
    pub category: Option<String>,
    #[serde(alias = "room_count")]
    pub bedrooms: Option<i64>,
    #[serde(alias = "bathroom_count")]
    pub bathrooms: Option<i64>,
    #[serde(alias = "guest_count")]
    pub guests: Option<i64>,
    pub location: Option<Location>,
    pub price: Option<i64>,
}

impl UpdateListingInput {
    fn apply(self, listing: &mut Listing) {
        if let Some(title) = self.title {
            listing.title = title.trim().to_string();
        }
        if let Some(description) = self.description {
            listing.description = description.trim().to_string();
        }
        if let Some(category) = self.category {
            listing.category = category.trim().to_string();
        }
        if let Some(bedrooms) = self.bedrooms {
            listing.bedrooms = bedrooms;
        }
        if let Some(bathrooms) = self.bathrooms {
            listing.bathrooms = bathrooms;
        }
        if let Some(guests) = self.guests {
            listing.guests = guests;
        }
        if let Some(location) = self.location {
            listing.location = location;
        }
        if let Some(price) = self.price {
            listing.price = price;
        }
    }
}

/// `PATCH /v1/listings/{id}`
pub async fn update(
    State(state): State<AppState>,
    RequireActivatedUser(user): RequireActivatedUser,
    ApiPath(id): ApiPath<i64>,
    ApiJson(input): ApiJson<UpdateListingInput>,
) -> Result<Json<Value>, ApiError> {
    let mut listing = owned_listing(&state, id, &user).await?;
    input.apply(&mut listing);

    let mut v = Validator::new();
    validate_listing(&mut v, &listing);
    v.into_result()?;

    let listing = state
        .with_db(move |db| {
            db.update_listing(&listing)?;
            listing.images = db.images_for_listing(listing.id)?;
            Ok(listing)
        })
        .await?;
    Ok(Json(json!({ "listing": listing })))
}

/// `DELETE /v1/listings/delete/{id}`
pub async fn remove(
    State(state): State<AppState>,
    RequireActivatedUser(user): RequireActivatedUser,
    ApiPath(id): ApiPath<i64>,
) -> Result<Json<Value>, ApiError> {
    let owner_id = user.id;
    state
        .with_db(move |db| db.delete_listing(id, owner_id))
        .await?;
    info!(listing_id = id, owner_id = user.id, "listing deleted");
    Ok(success())
}

// =============================================================================
// IMAGES
// =============================================================================

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct ImageInput {
    pub url: String,
}

/// `POST /v1/listings/{id}/images`
pub async fn add_image(
    State(state): State<AppState>,
    RequireActivatedUser(user): RequireActivatedUser,
    ApiPath(id): ApiPath<i64>,
    ApiJson(input): ApiJson<ImageInput>,
) -> Result<(StatusCode, Json<Value>), ApiError> {
    let listing = owned_listing(&state, id, &user).await?;
    let url = input.url.trim().to_string();

    let mut v = Validator::new();
    validate_image_url(&mut v, "url", &url);
    v.into_result()?;

    let image = state
        .with_db(move |db| db.insert_image(listing.id, &url))
        .await?;
    Ok((StatusCode::CREATED, Json(json!({ "image": image }))))
}

/// `DELETE /v1/listings/images/{id}`
pub async fn remove_image(
    State(state): State<AppState>,
    RequireActivatedUser(user): RequireActivatedUser,
    ApiPath(id): ApiPath<i64>,
) -> Result<Json<Value>, ApiError> {
    let owner_id = user.id;
    state
        .with_db(move |db| db.delete_image_for_owner(id, owner_id))
        .await?;
    Ok(success())
}

/// `POST /v1/listings/images/{id}` (multipart, every file field is attached)
pub async fn upload_images(
    State(state): State<AppState>,
    RequireActivatedUser(user): RequireActivatedUser,
    ApiPath(id): ApiPath<i64>,
    mut multipart: Multipart,
) -> Result<(StatusCode, Json<Value>), ApiError> {
    let listing_id = owned_listing(&state, id, &user).await?.id;

    let mut images = Vec::new();
    while let Some(field) = multipart.next_field().await? {
        if field.file_name().is_none() {
            continue;
        }
        let url = store_image(&state, field, "images").await?;
        images.push(
            state
                .with_db(move |db| db.insert_image(listing_id, &url))
                .await?,
        );
    }
    if images.is_empty() {
        return Err(ApiError::invalid("images", "must contain at least one image"));
    }

    info!(listing_id, count = images.len(), "gallery images uploaded");
    Ok((StatusCode::CREATED, Json(json!({ "images": images }))))
}
