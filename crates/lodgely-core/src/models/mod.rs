//! # Models
//!
//! Domain records and the validation rules attached to them.

mod booking;
mod image;
mod listing;
mod user;

pub use booking::{Booking, MAX_STAY_NIGHTS, NewBooking, validate_booking};
pub use image::{Image, MAX_IMAGE_URL_BYTES, validate_image_url};
pub use listing::{LISTING_SORT_SAFELIST, Listing, Location, validate_listing};
pub use user::{User, validate_email, validate_profile_name, validate_user};
