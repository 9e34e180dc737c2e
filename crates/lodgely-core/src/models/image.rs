//! # Image

use serde::Serialize;

use crate::validator::Validator;

pub const MAX_IMAGE_URL_BYTES: usize = 2048;

/// One picture in a listing's gallery.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Image {
    pub id: i64,
    #[serde(rename = "listingId")]
    pub listing_id: i64,
    pub url: String,
}

/// Gallery URLs are absolute http(s) links or paths served by this API.
pub fn validate_image_url(v: &mut Validator, field: &str, url: &str) {
    v.check(!url.is_empty(), field, "must be provided");
    v.check(
        url.len() <= MAX_IMAGE_URL_BYTES,
        field,
        "must not be more than 2048 bytes long",
    );
    v.check(
        url.starts_with("https://") || url.starts_with("http://") || url.starts_with('/'),
        field,
        "must be an http(s) URL or an absolute path",
    );
}
