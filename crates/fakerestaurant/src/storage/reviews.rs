//! Review queries and the paginated listings.

use rusqlite::{params, OptionalExtension};
use tracing::{debug, info};

use super::{timestamp_column, timestamp_now, Storage};
use crate::error::{Error, Result};
use crate::model::{NewReview, Page, PageRequest, RestaurantReview, Review, ReviewSort, UserReview};

/// Per-review vote tallies, joined into the restaurant listing.
const VOTE_TALLY: &str = r"
    SELECT review_id,
           SUM(vote_type = 'upvote') AS upvotes,
           SUM(vote_type = 'downvote') AS downvotes
    FROM votes GROUP BY review_id
";

impl Storage {
    /// Insert a review by `author_user_id`.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` if the restaurant does not exist, or an error if
    /// the database operation fails.
    pub fn insert_review(&self, review: &NewReview, author_user_id: i64) -> Result<Review> {
        if self.get_restaurant(review.restaurant_id)?.is_none() {
            return Err(Error::not_found("restaurant"));
        }

        let now = timestamp_now();
        self.conn.execute(
            r"
            INSERT INTO reviews (content, rating, author_user_id, restaurant_id, created_at, updated_at)
            VALUES (?1, ?2, ?3, ?4, ?5, ?5)
            ",
            params![
                review.content,
                review.rating,
                author_user_id,
                review.restaurant_id,
                now
            ],
        )?;

        let review_id = self.conn.last_insert_rowid();
        debug!(
            "Inserted review {} on restaurant {}",
            review_id, review.restaurant_id
        );
        self.get_review(review_id)?
            .ok_or_else(|| Error::internal(format!("review {review_id} vanished after insert")))
    }

    /// Get a review by id.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    pub fn get_review(&self, review_id: i64) -> Result<Option<Review>> {
        let review = self
            .conn
            .query_row(
                r"
                SELECT review_id, content, rating, author_user_id, restaurant_id, created_at, updated_at
                FROM reviews WHERE review_id = ?1
                ",
                [review_id],
                |row| {
                    Ok(Review {
                        review_id: row.get(0)?,
                        content: row.get(1)?,
                        rating: row.get(2)?,
                        author_user_id: row.get(3)?,
                        restaurant_id: row.get(4)?,
                        created_at: timestamp_column(row, 5)?,
                        updated_at: timestamp_column(row, 6)?,
                    })
                },
            )
            .optional()?;
        Ok(review)
    }

    /// List one page of a restaurant's reviews with author names and vote
    /// counts.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    pub fn list_reviews_for_restaurant(
        &self,
        restaurant_id: i64,
        request: PageRequest,
        sort: ReviewSort,
    ) -> Result<Page<RestaurantReview>> {
        let total: i64 = self.conn.query_row(
            "SELECT COUNT(*) FROM reviews WHERE restaurant_id = ?1",
            [restaurant_id],
            |row| row.get(0),
        )?;

        let order = match sort {
            ReviewSort::Votes => {
                "COALESCE(t.upvotes, 0) - COALESCE(t.downvotes, 0) DESC, r.created_at DESC, r.review_id DESC"
            },
            ReviewSort::Date => "r.created_at DESC, r.review_id DESC",
        };

        let mut stmt = self.conn.prepare(&format!(
            r"
            SELECT r.review_id, r.restaurant_id, r.author_user_id, u.username, r.content, r.rating,
                   COALESCE(t.upvotes, 0) AS upvotes, COALESCE(t.downvotes, 0) AS downvotes,
                   r.created_at, r.updated_at
            FROM reviews r
            JOIN users u ON u.user_id = r.author_user_id
            LEFT JOIN ({VOTE_TALLY}) t ON t.review_id = r.review_id
            WHERE r.restaurant_id = ?1
            ORDER BY {order}
            LIMIT ?2 OFFSET ?3
            "
        ))?;

        let reviews = stmt
            .query_map(
                params![restaurant_id, request.limit(), request.offset()],
                |row| {
                    Ok(RestaurantReview {
                        id: row.get(0)?,
                        restaurant_id: row.get(1)?,
                        user_id: row.get(2)?,
                        username: row.get(3)?,
                        content: row.get(4)?,
                        rating: row.get(5)?,
                        upvotes: row.get(6)?,
                        downvotes: row.get(7)?,
                        created_at: timestamp_column(row, 8)?,
                        updated_at: timestamp_column(row, 9)?,
                    })
                },
            )?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        Ok(Page::new(reviews, total, request))
    }

    /// List one page of a user's reviews, newest first, with restaurant names.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    pub fn list_reviews_by_user(
        &self,
        author_user_id: i64,
        request: PageRequest,
    ) -> Result<Page<UserReview>> {
        let total: i64 = self.conn.query_row(
            "SELECT COUNT(*) FROM reviews WHERE author_user_id = ?1",
            [author_user_id],
            |row| row.get(0),
        )?;

        let mut stmt = self.conn.prepare(
            r"
            SELECT r.review_id, r.content, r.rating, r.restaurant_id, s.name,
                   r.author_user_id, u.username, r.created_at, r.updated_at
            FROM reviews r
            JOIN restaurants s ON s.restaurant_id = r.restaurant_id
            JOIN users u ON u.user_id = r.author_user_id
            WHERE r.author_user_id = ?1
            ORDER BY r.created_at DESC, r.review_id DESC
            LIMIT ?2 OFFSET ?3
            ",
        )?;

        let reviews = stmt
            .query_map(
                params![author_user_id, request.limit(), request.offset()],
                |row| {
                    Ok(UserReview {
                        id: row.get(0)?,
                        content: row.get(1)?,
                        rating: row.get(2)?,
                        restaurant_id: row.get(3)?,
                        restaurant_name: row.get(4)?,
                        author_id: row.get(5)?,
                        author_name: row.get(6)?,
                        created_at: timestamp_column(row, 7)?,
                        updated_at: timestamp_column(row, 8)?,
                    })
                },
            )?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        Ok(Page::new(reviews, total, request))
    }

    /// Delete a review written by `caller`, cascading to its votes.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` if the review does not exist or was written by
    /// someone else.
    pub fn delete_review_owned(&self, review_id: i64, caller: i64) -> Result<()> {
        let affected = self.conn.execute(
            "DELETE FROM reviews WHERE review_id = ?1 AND author_user_id = ?2",
            params![review_id, caller],
        )?;

        if affected == 0 {
            return Err(Error::not_found("review written by caller"));
        }
        info!("Deleted review {} by user {}", review_id, caller);
        Ok(())
    }
}
