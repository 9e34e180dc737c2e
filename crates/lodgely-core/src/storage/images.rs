//! # Image Storage

use rusqlite::{Connection, params};

use super::Database;
use crate::models::Image;
use crate::{CoreError, Result};

pub(super) fn images_for_listing(conn: &Connection, listing_id: i64) -> Result<Vec<Image>> {
    let mut stmt =
        conn.prepare("SELECT id, listing_id, url FROM images WHERE listing_id = ?1 ORDER BY id")?;
    let images = stmt
        .query_map(params![listing_id], |row| {
            Ok(Image {
                id: row.get(0)?,
                listing_id: row.get(1)?,
                url: row.get(2)?,
            })
        })?
        .collect::<rusqlite::Result<Vec<_>>>()?;
    Ok(images)
}

impl Database {
    /// Add `url` to a listing's gallery.
    pub fn insert_image(&self, listing_id: i64, url: &str) -> Result<Image> {
        let conn = self.conn();
        conn.execute(
            "INSERT INTO images (listing_id, url) VALUES (?1, ?2)",
            params![listing_id, url],
        )?;
        Ok(Image {
            id: conn.last_insert_rowid(),
            listing_id,
            url: url.to_string(),
        })
    }

    /// Gallery of a listing, in upload order.
    pub fn images_for_listing(&self, listing_id: i64) -> Result<Vec<Image>> {
        images_for_listing(&self.conn(), listing_id)
    }

    /// Remove an image, but only from a listing owned by `owner_id`.
    pub fn delete_image_for_owner(&self, image_id: i64, owner_id: i64) -> Result<()> {
        let changed = self.conn().execute(
            "DELETE FROM images
             WHERE id = ?1
               AND listing_id IN (SELECT id FROM listings WHERE owner_id = ?2)",
            params![image_id, owner_id],
        )?;
        if changed == 0 {
            return Err(CoreError::NotFound);
        }
        Ok(())
    }
}
