//! # Listing Storage
//!
//! CRUD plus paged, sorted substring search.

use chrono::Utc;
use rusqlite::{Connection, Row, params};

use super::Database;
use crate::error::not_found;
use crate::filters::{Filters, Metadata};
use crate::models::{Listing, Location};
use crate::{CoreError, Result};

/// Listing columns joined with the owner's display name and photo.
pub(super) const LISTING_COLUMNS: &str = "l.id, l.created_at, l.title, l.description, l.category, \
     l.bedrooms, l.bathrooms, l.guests, l.location_flag, l.location_label, l.location_lat, \
     l.location_lng, l.location_region, l.location_value, l.price, l.owner_id, u.name, u.image";

/// Number of columns in [`LISTING_COLUMNS`].
pub(super) const LISTING_COLUMN_COUNT: usize = 18;

/// Read a listing starting at column `at`.
pub(super) fn listing_from_row(row: &Row<'_>, at: usize) -> rusqlite::Result<Listing> {
    let owner_photo: Option<String> = row.get(at + 17)?;
    Ok(Listing {
        id: row.get(at)?,
        created_at: row.get(at + 1)?,
        title: row.get(at + 2)?,
        description: row.get(at + 3)?,
        category: row.get(at + 4)?,
        bedrooms: row.get(at + 5)?,
        bathrooms: row.get(at + 6)?,
        guests: row.get(at + 7)?,
        location: Location {
            flag: row.get(at + 8)?,
            label: row.get(at + 9)?,
            lat: row.get(at + 10)?,
            lng: row.get(at + 11)?,
            region: row.get(at + 12)?,
            value: row.get(at + 13)?,
        },
        price: row.get(at + 14)?,
        owner_id: row.get(at + 15)?,
        owner_name: row.get(at + 16)?,
        owner_photo: owner_photo.filter(|p| !p.is_empty()),
        images: Vec::new(),
    })
}

/// Escape LIKE wildcards so user search text matches literally.
fn like_escape(search: &str) -> String {
    let mut escaped = String::with_capacity(search.len());
    for c in search.chars() {
        if matches!(c, '%' | '_' | '\\') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}

impl Database {
    /// Insert `listing`, filling in id and created_at.
    pub fn insert_listing(&self, listing: &mut Listing) -> Result<()> {
        let conn = self.conn();
        listing.created_at = Utc::now();
        let loc = &listing.location;
        conn.execute(
            "INSERT INTO listings (created_at, title, description, category, bedrooms, bathrooms,
                                   guests, location_flag, location_label, location_lat, location_lng,
                                   location_region, location_value, price, owner_id)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15)",
            params![
                listing.created_at,
                listing.title,
                listing.description,
                listing.category,
                listing.bedrooms,
                listing.bathrooms,
                listing.guests,
                loc.flag,
                loc.label,
                loc.lat,
                loc.lng,
                loc.region,
                loc.value,
                listing.price,
                listing.owner_id,
            ],
        )?;
        listing.id = conn.last_insert_rowid();
        Ok(())
    }

    /// Fetch one listing with owner details. Images are not loaded.
    pub fn get_listing(&self, id: i64) -> Result<Listing> {
        let sql = format!(
            "SELECT {LISTING_COLUMNS} FROM listings l
             INNER JOIN users u ON u.id = l.owner_id
             WHERE l.id = ?1"
        );
        self.conn()
            .query_row(&sql, params![id], |row| listing_from_row(row, 0))
            .map_err(not_found)
    }

    /// Every listing owned by `owner_id`, oldest first, with images.
    pub fn listings_for_owner(&self, owner_id: i64) -> Result<Vec<Listing>> {
        let conn = self.conn();
        let sql = format!(
            "SELECT {LISTING_COLUMNS} FROM listings l
             INNER JOIN users u ON u.id = l.owner_id
             WHERE l.owner_id = ?1
             ORDER BY l.id"
        );
        let mut stmt = conn.prepare(&sql)?;
        let mut listings = stmt
            .query_map(params![owner_id], |row| listing_from_row(row, 0))?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        load_images(&conn, &mut listings)?;
        Ok(listings)
    }

    /// Overwrite the editable fields of a listing owned by `listing.owner_id`.
    pub fn update_listing(&self, listing: &Listing) -> Result<()> {
        let loc = &listing.location;
        let changed = self.conn().execute(
            "UPDATE listings
             SET title = ?1, description = ?2, category = ?3, bedrooms = ?4, bathrooms = ?5,
                 guests = ?6, location_flag = ?7, location_label = ?8, location_lat = ?9,
                 location_lng = ?10, location_region = ?11, location_value = ?12, price = ?13
             WHERE id = ?14 AND owner_id = ?15",
            params![
                listing.title,
                listing.description,
                listing.category,
                listing.bedrooms,
                listing.bathrooms,
                listing.guests,
                loc.flag,
                loc.label,
                loc.lat,
                loc.lng,
                loc.region,
                loc.value,
                listing.price,
                listing.id,
                listing.owner_id,
            ],
        )?;
        if changed == 0 {
            return Err(CoreError::NotFound);
        }
        Ok(())
    }

    /// Delete a listing if `owner_id` owns it. Images and bookings cascade.
    pub fn delete_listing(&self, id: i64, owner_id: i64) -> Result<()> {
        let changed = self.conn().execute(
            "DELETE FROM listings WHERE id = ?1 AND owner_id = ?2",
            params![id, owner_id],
        )?;
        if changed == 0 {
            return Err(CoreError::NotFound);
        }
        Ok(())
    }

    /// One page of listings matching `search`, with images and paging metadata.
    ///
    /// `search` matches title, category, region and label, case-insensitively.
    /// An empty `search` matches everything.
    pub fn search_listings(
        &self,
        search: &str,
        filters: &Filters,
    ) -> Result<(Vec<Listing>, Metadata)> {
        let conn = self.conn();
        // sort_column() only returns safelisted names.
        let sql = format!(
            "SELECT count(*) OVER(), {LISTING_COLUMNS}
             FROM listings l
             INNER JOIN users u ON u.id = l.owner_id
             WHERE (?1 = ''
                    OR l.title LIKE '%' || ?1 || '%' ESCAPE '\\'
                    OR l.category LIKE '%' || ?1 || '%' ESCAPE '\\'
                    OR l.location_region LIKE '%' || ?1 || '%' ESCAPE '\\'
                    OR l.location_label LIKE '%' || ?1 || '%' ESCAPE '\\')
             ORDER BY l.{column} {direction}, l.id ASC
             LIMIT ?2 OFFSET ?3",
            column = filters.sort_column(),
            direction = filters.sort_direction(),
        );

        let mut total: u64 = 0;
        let mut listings = Vec::new();
        {
            let mut stmt = conn.prepare(&sql)?;
            let mut rows = stmt.query(params![
                like_escape(search.trim()),
                filters.limit() as i64,
                filters.offset() as i64,
            ])?;
            while let Some(row) = rows.next()? {
                total = row.get::<_, i64>(0)? as u64;
                listings.push(listing_from_row(row, 1)?);
            }
        }
        load_images(&conn, &mut listings)?;

        let metadata = Metadata::calculate(total, filters.page, filters.page_size);
        Ok((listings, metadata))
    }
}

fn load_images(conn: &Connection, listings: &mut [Listing]) -> Result<()> {
    for listing in listings.iter_mut() {
        listing.images = super::images::images_for_listing(conn, listing.id)?;
    }
    Ok(())
}
