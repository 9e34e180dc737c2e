//! # Listing
//!
//! A rentable property, its location and the sort columns search accepts.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::Image;
use crate::validator::Validator;

/// Sort values accepted by listing search.
pub const LISTING_SORT_SAFELIST: &[&str] = &[
    "id",
    "title",
    "price",
    "created_at",
    "guests",
    "bedrooms",
    "-id",
    "-title",
    "-price",
    "-created_at",
    "-guests",
    "-bedrooms",
];

/// Where a property is, as picked in the client's country/region selector.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Location {
    pub flag: String,
    pub label: String,
    pub lat: f64,
    pub lng: f64,
    pub region: String,
    pub value: String,
}

/// A rentable property.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Listing {
    pub id: i64,
    pub created_at: DateTime<Utc>,
    pub title: String,
    pub description: String,
    pub category: String,
    pub bedrooms: i64,
    pub bathrooms: i64,
    pub guests: i64,
    pub location: Location,
    /// Nightly price in whole currency units.
    pub price: i64,
    #[serde(rename = "ownerId")]
    pub owner_id: i64,
    #[serde(rename = "ownerName")]
    pub owner_name: String,
    #[serde(rename = "ownerPhoto", skip_serializing_if = "Option::is_none")]
    pub owner_photo: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub images: Vec<Image>,
}

impl Default for Listing {
    fn default() -> Self {
        Self {
            id: 0,
            created_at: Utc::now(),
            title: String::new(),
            description: String::new(),
            category: String::new(),
            bedrooms: 0,
            bathrooms: 0,
            guests: 0,
            location: Location::default(),
            price: 0,
            owner_id: 0,
            owner_name: String::new(),
            owner_photo: None,
            images: Vec::new(),
        }
    }
}

fn check_text(v: &mut Validator, value: &str, field: &str, max: usize, required: bool) {
    if required {
        v.check(!value.is_empty(), field, "must be provided");
    }
    v.check(
        value.len() <= max,
        field,
        &format!("must not be more than {max} characters long"),
    );
}

pub fn validate_listing(v: &mut Validator, listing: &Listing) {
    check_text(v, &listing.title, "title", 500, true);
    check_text(v, &listing.description, "description", 5000, true);
    check_text(v, &listing.category, "category", 255, true);

    v.check(listing.bedrooms > 0, "bedrooms", "must be greater than zero");
    v.check(listing.bathrooms > 0, "bathrooms", "must be greater than zero");
    v.check(listing.guests > 0, "guests", "must be greater than zero");

    let location = &listing.location;
    check_text(v, &location.flag, "location.flag", 255, true);
    check_text(v, &location.label, "location.label", 255, false);
    check_text(v, &location.region, "location.region", 255, false);
    v.check(location.lat != 0.0, "location.lat", "must be provided");
    v.check(location.lng != 0.0, "location.lng", "must be provided");

    v.check(listing.price > 0, "price", "must be greater than zero");
    v.check(listing.owner_id > 0, "owner_id", "must be greater than zero");
}
