//! # Booking
//!
//! Stays. Prices are copied from the listing when the booking is made.

use chrono::{DateTime, NaiveDate, Utc};
use serde::Serialize;

use super::Listing;
use crate::validator::Validator;

/// Longest stay a single booking may cover.
pub const MAX_STAY_NIGHTS: i64 = 365;

/// A stored reservation with the listing it is for.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Booking {
    pub id: i64,
    pub created_at: DateTime<Utc>,
    pub listing_id: i64,
    pub guest_id: i64,
    pub check_in: NaiveDate,
    pub check_out: NaiveDate,
    /// Nightly price at the time of booking.
    pub price: i64,
    pub total: i64,
    pub listing: Listing,
}

/// A reservation request, priced from the listing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewBooking {
    pub listing_id: i64,
    pub guest_id: i64,
    pub check_in: NaiveDate,
    pub check_out: NaiveDate,
    pub price: i64,
    pub total: i64,
}

impl NewBooking {
    /// Price a stay at `listing` for `guest_id`.
    #[must_use]
    pub fn for_listing(
        listing: &Listing,
        guest_id: i64,
        check_in: NaiveDate,
        check_out: NaiveDate,
    ) -> Self {
        let nights = (check_out - check_in).num_days().max(0);
        Self {
            listing_id: listing.id,
            guest_id,
            check_in,
            check_out,
            price: listing.price,
            total: listing.price.saturating_mul(nights),
        }
    }

    /// Number of nights between check-in and check-out.
    #[must_use]
    pub fn nights(&self) -> i64 {
        (self.check_out - self.check_in).num_days()
    }
}

pub fn validate_booking(v: &mut Validator, booking: &NewBooking, today: NaiveDate) {
    v.check(
        booking.listing_id > 0,
        "propertyId",
        "must be greater than zero",
    );
    v.check(
        booking.check_in >= today,
        "startDate",
        "must not be in the past",
    );
    v.check(
        booking.check_out > booking.check_in,
        "endDate",
        "must be after the start date",
    );
    v.check(
        booking.nights() <= MAX_STAY_NIGHTS,
        "endDate",
        "must be within 365 nights of the start date",
    );
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
    }

    fn listing(price: i64) -> Listing {
        Listing {
            id: 3,
            price,
            ..Listing::default()
        }
    }

    #[test]
    fn total_is_price_times_nights() {
        let booking =
            NewBooking::for_listing(&listing(150), 8, date("2030-06-01"), date("2030-06-05"));
        assert_eq!(booking.nights(), 4);
        assert_eq!(booking.price, 150);
        assert_eq!(booking.total, 600);
        assert_eq!(booking.listing_id, 3);
        assert_eq!(booking.guest_id, 8);
    }

    #[test]
    fn reversed_dates_are_rejected() {
        let booking =
            NewBooking::for_listing(&listing(100), 8, date("2030-06-05"), date("2030-06-01"));
        assert_eq!(booking.total, 0);
        let mut v = Validator::new();
        validate_booking(&mut v, &booking, date("2030-01-01"));
        assert_eq!(v.errors().get("endDate"), Some("must be after the start date"));
    }

    #[test]
    fn same_day_checkout_is_rejected() {
        let booking =
            NewBooking::for_listing(&listing(100), 8, date("2030-06-05"), date("2030-06-05"));
        let mut v = Validator::new();
        validate_booking(&mut v, &booking, date("2030-01-01"));
        assert!(!v.is_valid());
    }

    #[test]
    fn past_start_is_rejected() {
        let booking =
            NewBooking::for_listing(&listing(100), 8, date("2020-06-01"), date("2020-06-03"));
        let mut v = Validator::new();
        validate_booking(&mut v, &booking, date("2021-01-01"));
        assert_eq!(v.errors().get("startDate"), Some("must not be in the past"));
    }

    #[test]
    fn overly_long_stay_is_rejected() {
        let booking =
            NewBooking::for_listing(&listing(100), 8, date("2030-01-01"), date("2031-06-01"));
        let mut v = Validator::new();
        validate_booking(&mut v, &booking, date("2029-01-01"));
        assert_eq!(
            v.errors().get("endDate"),
            Some("must be within 365 nights of the start date")
        );
    }

    #[test]
    fn valid_request_passes() {
        let booking =
            NewBooking::for_listing(&listing(100), 8, date("2030-06-01"), date("2030-06-03"));
        let mut v = Validator::new();
        validate_booking(&mut v, &booking, date("2030-06-01"));
        assert!(v.is_valid());
    }
}
