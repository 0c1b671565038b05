//! Restaurant listing queries.

use rusqlite::{params, OptionalExtension};
use tracing::{debug, info};

use super::{timestamp_column, timestamp_now, Storage};
use crate::error::{Error, Result};
use crate::model::{NewRestaurant, Restaurant};

const RESTAURANT_COLUMNS: &str = "restaurant_id, name, description, latitude, longitude, \
     image_path, creator_user_id, created_at, updated_at";

impl Storage {
    /// Insert a restaurant created by `creator_user_id`.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    pub fn insert_restaurant(
        &self,
        restaurant: &NewRestaurant,
        creator_user_id: i64,
    ) -> Result<Restaurant> {
        let now = timestamp_now();
        self.conn.execute(
            r"
            INSERT INTO restaurants
                (name, description, latitude, longitude, image_path, creator_user_id, created_at, updated_at)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?7)
            ",
            params![
                restaurant.name,
                restaurant.description,
                restaurant.latitude,
                restaurant.longitude,
                restaurant.image_path,
                creator_user_id,
                now,
            ],
        )?;

        let restaurant_id = self.conn.last_insert_rowid();
        debug!("Inserted restaurant {} ({})", restaurant_id, restaurant.name);
        self.get_restaurant(restaurant_id)?.ok_or_else(|| {
            Error::internal(format!("restaurant {restaurant_id} vanished after insert"))
        })
    }

    /// Get a restaurant by id.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    pub fn get_restaurant(&self, restaurant_id: i64) -> Result<Option<Restaurant>> {
        let restaurant = self
            .conn
            .query_row(
                &format!("SELECT {RESTAURANT_COLUMNS} FROM restaurants WHERE restaurant_id = ?1"),
                [restaurant_id],
                Self::row_to_restaurant,
            )
            .optional()?;
        Ok(restaurant)
    }

    /// List restaurants in id order, optionally filtered by exact name.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    pub fn list_restaurants(&self, name: Option<&str>) -> Result<Vec<Restaurant>> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {RESTAURANT_COLUMNS} FROM restaurants
             WHERE ?1 IS NULL OR name = ?1
             ORDER BY restaurant_id ASC"
        ))?;

        let restaurants = stmt
            .query_map([name], Self::row_to_restaurant)?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(restaurants)
    }

    /// Delete a restaurant owned by `caller`, cascading to its reviews and
    /// their votes.
    ///
    /// Returns the deleted row so the caller can release its image.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` if the restaurant does not exist or belongs to
    /// someone else; the two cases are indistinguishable to the caller.
    pub fn delete_restaurant_owned(&self, restaurant_id: i64, caller: i64) -> Result<Restaurant> {
        let restaurant = self
            .get_restaurant(restaurant_id)?
            .filter(|r| r.creator_user_id == caller)
            .ok_or_else(|| Error::not_found("restaurant owned by caller"))?;

        self.conn.execute(
            "DELETE FROM restaurants WHERE restaurant_id = ?1 AND creator_user_id = ?2",
            params![restaurant_id, caller],
        )?;

        info!("Deleted restaurant {} by user {}", restaurant_id, caller);
        Ok(restaurant)
    }

    fn row_to_restaurant(row: &rusqlite::Row<'_>) -> rusqlite::Result<Restaurant> {
        Ok(Restaurant {
            restaurant_id: row.get(0)?,
            name: row.get(1)?,
            description: row.get(2)?,
            latitude: row.get(3)?,
            longitude: row.get(4)?,
            image_path: row.get(5)?,
            creator_user_id: row.get(6)?,
            created_at: timestamp_column(row, 7)?,
            updated_at: timestamp_column(row, 8)?,
        })
    }
}
