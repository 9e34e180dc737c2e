//! # Lodgely Core
//!
//! Domain model and storage for the Lodgely short-term rental marketplace.
//!
//! This crate is THE LOGIC:
//! - Users, session tokens and one-time codes
//! - Listings with image galleries
//! - Bookings with overlap protection
//! - Validation rules and listing search pagination
//! - SQLite storage (one parameterized statement per operation)
//!
//! It is synchronous and knows nothing about HTTP. The `lodgely` binary
//! wraps it in an axum server.

pub mod error;
pub mod filters;
pub mod models;
pub mod password;
pub mod storage;
pub mod token;
pub mod validator;

pub use error::{CoreError, Result};
pub use filters::{Filters, Metadata};
pub use models::{Booking, Image, Listing, Location, NewBooking, User};
pub use password::Password;
pub use storage::Database;
pub use token::{Token, TokenScope};
pub use validator::{ValidationErrors, Validator};
