//! The vote ledger.
//!
//! Every submission is a lookup followed by exactly one insert, update or
//! delete. Both steps run inside one `IMMEDIATE` transaction so the write
//! lock is held before the lookup, and the `(review_id, voter_user_id)`
//! unique constraint rejects any duplicate that slips past another writer.

use rusqlite::types::Type;
use rusqlite::{params, OptionalExtension, TransactionBehavior};
use tracing::debug;

use super::{timestamp_column, timestamp_now, Storage};
use crate::error::{is_unique_violation, Error, Result};
use crate::model::{Vote, VoteCounts, VoteReceipt, VoteTransition, VoteType};

const VOTE_COLUMNS: &str =
    "vote_id, vote_type, review_id, voter_user_id, created_at, updated_at";

impl Storage {
    /// Submit a vote: create it, toggle it off, or switch its type.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` if the review does not exist, `Conflict` if a
    /// concurrent writer inserted the same pair first, or an error if the
    /// database operation fails.
    pub fn submit_vote(
        &mut self,
        review_id: i64,
        voter_user_id: i64,
        vote_type: VoteType,
    ) -> Result<VoteReceipt> {
        let tx = self
            .conn
            .transaction_with_behavior(TransactionBehavior::Immediate)?;

        let review_exists: bool = tx.query_row(
            "SELECT EXISTS (SELECT 1 FROM reviews WHERE review_id = ?1)",
            [review_id],
            |row| row.get(0),
        )?;
        if !review_exists {
            return Err(Error::not_found("review"));
        }

        let existing = tx
            .query_row(
                "SELECT vote_id, vote_type FROM votes WHERE review_id = ?1 AND voter_user_id = ?2",
                params![review_id, voter_user_id],
                |row| Ok((row.get::<_, i64>(0)?, row.get::<_, String>(1)?)),
            )
            .optional()?
            .map(|(vote_id, stored)| stored.parse().map(|kind| (vote_id, kind)))
            .transpose()?;

        let transition = VoteTransition::decide(existing, vote_type);
        let now = timestamp_now();

        let vote_id = match transition {
            VoteTransition::Insert(kind) => {
                tx.execute(
                    r"
                    INSERT INTO votes (vote_type, voter_user_id, review_id, created_at, updated_at)
                    VALUES (?1, ?2, ?3, ?4, ?4)
                    ",
                    params![kind.as_str(), voter_user_id, review_id, now],
                )
                .map_err(|e| {
                    if is_unique_violation(&e) {
                        Error::conflict("a vote for this review by this user already exists")
                    } else {
                        Error::from(e)
                    }
                })?;
                Some(tx.last_insert_rowid())
            }
            VoteTransition::Delete { vote_id } => {
                tx.execute("DELETE FROM votes WHERE vote_id = ?1", [vote_id])?;
                None
            }
            VoteTransition::Switch { vote_id, to } => {
                tx.execute(
                    "UPDATE votes SET vote_type = ?1, updated_at = ?2 WHERE vote_id = ?3",
                    params![to.as_str(), now, vote_id],
                )?;
                Some(vote_id)
            }
        };

        let vote = vote_id
            .map(|id| {
                tx.query_row(
                    &format!("SELECT {VOTE_COLUMNS} FROM votes WHERE vote_id = ?1"),
                    [id],
                    Self::row_to_vote,
                )
            })
            .transpose()?;

        tx.commit()?;

        let outcome = transition.outcome();
        debug!(
            "Vote by user {} on review {}: {:?}",
            voter_user_id, review_id, outcome
        );
        Ok(VoteReceipt { outcome, vote })
    }

    /// Count upvotes and downvotes on a review.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` if the review does not exist, or an error if the
    /// database operation fails.
    pub fn vote_counts(&self, review_id: i64) -> Result<VoteCounts> {
        self.require_review(review_id)?;

        let mut counts = VoteCounts::default();
        let mut stmt = self
            .conn
            .prepare("SELECT vote_type, COUNT(*) FROM votes WHERE review_id = ?1 GROUP BY vote_type")?;
        let rows = stmt.query_map([review_id], |row| {
            Ok((row.get::<_, String>(0)?, row.get::<_, i64>(1)?))
        })?;

        for row in rows {
            let (kind, count) = row?;
            match kind.parse::<VoteType>()? {
                VoteType::Upvote => counts.upvotes = count,
                VoteType::Downvote => counts.downvotes = count,
            }
        }
        Ok(counts)
    }

    /// The vote a user currently holds on a review, if any.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` if the review does not exist, or an error if the
    /// database operation fails.
    pub fn user_vote_for_review(&self, review_id: i64, voter_user_id: i64) -> Result<Option<Vote>> {
        self.require_review(review_id)?;

        let vote = self
            .conn
            .query_row(
                &format!(
                    "SELECT {VOTE_COLUMNS} FROM votes WHERE review_id = ?1 AND voter_user_id = ?2"
                ),
                params![review_id, voter_user_id],
                Self::row_to_vote,
            )
            .optional()?;
        Ok(vote)
    }

    /// Remove the vote a user holds on a review.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` if the user holds no vote there, or an error if the
    /// database operation fails.
    pub fn withdraw_vote(&self, review_id: i64, voter_user_id: i64) -> Result<()> {
        let affected = self.conn.execute(
            "DELETE FROM votes WHERE review_id = ?1 AND voter_user_id = ?2",
            params![review_id, voter_user_id],
        )?;
        if affected == 0 {
            return Err(Error::not_found("vote"));
        }
        debug!("User {} withdrew vote on review {}", voter_user_id, review_id);
        Ok(())
    }

    /// All votes on a review, oldest first.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` if the review does not exist, or an error if the
    /// database operation fails.
    pub fn votes_for_review(&self, review_id: i64) -> Result<Vec<Vote>> {
        self.require_review(review_id)?;

        let mut stmt = self.conn.prepare(&format!(
            "SELECT {VOTE_COLUMNS} FROM votes WHERE review_id = ?1 ORDER BY created_at ASC, vote_id ASC"
        ))?;
        let votes = stmt
            .query_map([review_id], Self::row_to_vote)?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(votes)
    }

    /// All votes cast by a user, newest first.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    pub fn votes_by_user(&self, voter_user_id: i64) -> Result<Vec<Vote>> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {VOTE_COLUMNS} FROM votes WHERE voter_user_id = ?1 ORDER BY created_at DESC, vote_id DESC"
        ))?;
        let votes = stmt
            .query_map([voter_user_id], Self::row_to_vote)?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(votes)
    }

    fn require_review(&self, review_id: i64) -> Result<()> {
        let exists: bool = self.conn.query_row(
            "SELECT EXISTS (SELECT 1 FROM reviews WHERE review_id = ?1)",
            [review_id],
            |row| row.get(0),
        )?;
        if exists {
            Ok(())
        } else {
            Err(Error::not_found("review"))
        }
    }

    fn row_to_vote(row: &rusqlite::Row<'_>) -> rusqlite::Result<Vote> {
        let raw_type: String = row.get(1)?;
        let vote_type = raw_type.parse().map_err(|_| {
            rusqlite::Error::InvalidColumnType(1, "vote_type".to_string(), Type::Text)
        })?;

        Ok(Vote {
            vote_id: row.get(0)?,
            vote_type,
            review_id: row.get(2)?,
            voter_user_id: row.get(3)?,
            created_at: timestamp_column(row, 4)?,
            updated_at: timestamp_column(row, 5)?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::super::test_support::*;
    use super::*;
    use crate::model::VoteOutcome;

    struct Fixture {
        storage: Storage,
        alice: i64,
        bob: i64,
        restaurant: i64,
        review: i64,
    }

    fn fixture() -> Fixture {
        let storage = storage();
        let alice = user(&storage, "alice");
        let bob = user(&storage, "bob");
        let restaurant = restaurant(&storage, alice, "Trattoria Single-Threaded");
        let review = review(&storage, bob, restaurant, "Waited for the lock");
        Fixture {
            storage,
            alice,
            bob,
            restaurant,
            review,
        }
    }

    fn vote_rows(storage: &Storage, review_id: i64, voter: i64) -> i64 {
        storage
            .conn
            .query_row(
                "SELECT COUNT(*) FROM votes WHERE review_id = ?1 AND voter_user_id = ?2",
                [review_id, voter],
                |row| row.get(0),
            )
            .unwrap()
    }

    #[test]
    fn test_submit_creates_vote() {
        let mut f = fixture();
        let receipt = f
            .storage
            .submit_vote(f.review, f.alice, VoteType::Upvote)
            .unwrap();

        assert_eq!(receipt.outcome, VoteOutcome::Created);
        let vote = receipt.vote.unwrap();
        assert_eq!(vote.vote_type, VoteType::Upvote);
        assert_eq!(vote.review_id, f.review);
        assert_eq!(vote.voter_user_id, f.alice);
    }

    #[test]
    fn test_same_type_twice_toggles_off() {
        let mut f = fixture();
        let first = f
            .storage
            .submit_vote(f.review, f.alice, VoteType::Downvote)
            .unwrap();
        let second = f
            .storage
            .submit_vote(f.review, f.alice, VoteType::Downvote)
            .unwrap();

        assert_eq!(first.outcome, VoteOutcome::Created);
        assert_eq!(second.outcome, VoteOutcome::Removed);
        assert!(second.vote.is_none());
        assert_eq!(vote_rows(&f.storage, f.review, f.alice), 0);
    }

    #[test]
    fn test_switch_keeps_identity() {
        let mut f = fixture();
        let created = f
            .storage
            .submit_vote(f.review, f.alice, VoteType::Upvote)
            .unwrap()
            .vote
            .unwrap();
        let receipt = f
            .storage
            .submit_vote(f.review, f.alice, VoteType::Downvote)
            .unwrap();

        assert_eq!(receipt.outcome, VoteOutcome::Updated);
        let switched = receipt.vote.unwrap();
        assert_eq!(switched.vote_id, created.vote_id);
        assert_eq!(switched.created_at, created.created_at);
        assert_eq!(switched.vote_type, VoteType::Downvote);
        assert_eq!(vote_rows(&f.storage, f.review, f.alice), 1);
    }

    #[test]
    fn test_ledger_scenario() {
        let mut f = fixture();
        let steps = [
            (VoteType::Upvote, VoteOutcome::Created, (1, 0)),
            (VoteType::Upvote, VoteOutcome::Removed, (0, 0)),
            (VoteType::Downvote, VoteOutcome::Created, (0, 1)),
            (VoteType::Upvote, VoteOutcome::Updated, (1, 0)),
        ];

        for (submitted, expected, (up, down)) in steps {
            let receipt = f.storage.submit_vote(f.review, f.alice, submitted).unwrap();
            assert_eq!(receipt.outcome, expected, "after {submitted}");

            let counts = f.storage.vote_counts(f.review).unwrap();
            assert_eq!((counts.upvotes, counts.downvotes), (up, down));
        }
    }

    #[test]
    fn test_at_most_one_vote_per_pair() {
        let mut f = fixture();
        let sequence = [
            VoteType::Upvote,
            VoteType::Downvote,
            VoteType::Downvote,
            VoteType::Upvote,
            VoteType::Downvote,
            VoteType::Upvote,
            VoteType::Upvote,
        ];

        for vote_type in sequence {
            f.storage.submit_vote(f.review, f.alice, vote_type).unwrap();
            assert!(vote_rows(&f.storage, f.review, f.alice) <= 1);
        }
    }

    #[test]
    fn test_counts_match_distinct_voters() {
        let mut f = fixture();
        let carol = user(&f.storage, "carol");

        f.storage.submit_vote(f.review, f.alice, VoteType::Upvote).unwrap();
        f.storage.submit_vote(f.review, f.bob, VoteType::Downvote).unwrap();
        f.storage.submit_vote(f.review, carol, VoteType::Upvote).unwrap();
        f.storage.submit_vote(f.review, carol, VoteType::Upvote).unwrap();

        let counts = f.storage.vote_counts(f.review).unwrap();
        assert_eq!(counts.upvotes, 1);
        assert_eq!(counts.downvotes, 1);
        assert_eq!(counts.total(), 2);
        assert_eq!(f.storage.votes_for_review(f.review).unwrap().len(), 2);
    }

    #[test]
    fn test_switch_swings_score_by_two() {
        let mut f = fixture();
        f.storage.submit_vote(f.review, f.alice, VoteType::Upvote).unwrap();
        let before = f.storage.vote_counts(f.review).unwrap().score();

        f.storage.submit_vote(f.review, f.alice, VoteType::Downvote).unwrap();
        let after = f.storage.vote_counts(f.review).unwrap().score();

        assert_eq!(before - after, 2);
    }

    #[test]
    fn test_vote_on_missing_review() {
        let mut f = fixture();
        let err = f
            .storage
            .submit_vote(9999, f.alice, VoteType::Upvote)
            .unwrap_err();
        assert!(err.is_not_found());
        assert!(f.storage.vote_counts(9999).unwrap_err().is_not_found());
    }

    #[test]
    fn test_unique_pair_enforced_by_schema() {
        let mut f = fixture();
        f.storage.submit_vote(f.review, f.alice, VoteType::Upvote).unwrap();

        let err = f
            .storage
            .conn
            .execute(
                "INSERT INTO votes (vote_type, voter_user_id, review_id, created_at, updated_at)
                 VALUES ('downvote', ?1, ?2, 'x', 'x')",
                [f.alice, f.review],
            )
            .unwrap_err();
        assert!(is_unique_violation(&err));
    }

    #[test]
    fn test_deleting_review_cascades_votes() {
        let mut f = fixture();
        f.storage.submit_vote(f.review, f.alice, VoteType::Upvote).unwrap();
        f.storage.submit_vote(f.review, f.bob, VoteType::Upvote).unwrap();

        f.storage.delete_review_owned(f.review, f.bob).unwrap();

        assert_eq!(f.storage.stats().unwrap().votes, 0);
        assert!(f.storage.votes_by_user(f.alice).unwrap().is_empty());
    }

    #[test]
    fn test_deleting_restaurant_cascades_reviews_and_votes() {
        let mut f = fixture();
        f.storage.submit_vote(f.review, f.alice, VoteType::Downvote).unwrap();

        f.storage
            .delete_restaurant_owned(f.restaurant, f.alice)
            .unwrap();

        let stats = f.storage.stats().unwrap();
        assert_eq!(stats.reviews, 0);
        assert_eq!(stats.votes, 0);
        assert!(f.storage.get_review(f.review).unwrap().is_none());
    }

    #[test]
    fn test_user_vote_for_review() {
        let mut f = fixture();
        assert!(f
            .storage
            .user_vote_for_review(f.review, f.alice)
            .unwrap()
            .is_none());

        f.storage.submit_vote(f.review, f.alice, VoteType::Upvote).unwrap();
        let vote = f
            .storage
            .user_vote_for_review(f.review, f.alice)
            .unwrap()
            .unwrap();
        assert_eq!(vote.vote_type, VoteType::Upvote);
        assert!(f
            .storage
            .user_vote_for_review(f.review, f.bob)
            .unwrap()
            .is_none());
    }

    #[test]
    fn test_withdraw_vote() {
        let mut f = fixture();
        f.storage.submit_vote(f.review, f.alice, VoteType::Upvote).unwrap();

        f.storage.withdraw_vote(f.review, f.alice).unwrap();
        assert_eq!(vote_rows(&f.storage, f.review, f.alice), 0);

        let err = f.storage.withdraw_vote(f.review, f.alice).unwrap_err();
        assert!(err.is_not_found());
    }

    #[test]
    fn test_votes_by_user_newest_first() {
        let mut f = fixture();
        let other = review(&f.storage, f.bob, f.restaurant, "Second visit");

        f.storage.submit_vote(f.review, f.alice, VoteType::Upvote).unwrap();
        f.storage.submit_vote(other, f.alice, VoteType::Downvote).unwrap();

        let votes = f.storage.votes_by_user(f.alice).unwrap();
        let reviews: Vec<i64> = votes.iter().map(|v| v.review_id).collect();
        assert_eq!(reviews, vec![other, f.review]);
    }

    #[test]
    fn test_insert_race_maps_to_conflict() {
        let mut f = fixture();
        // Another writer's row appears between the lookup and the insert
        f.storage
            .conn
            .execute_batch(
                r"
                CREATE TEMP TRIGGER concurrent_vote BEFORE INSERT ON main.votes
                BEGIN
                    INSERT INTO votes (vote_type, voter_user_id, review_id, created_at, updated_at)
                    VALUES (NEW.vote_type, NEW.voter_user_id, NEW.review_id, NEW.created_at, NEW.updated_at);
                END;
                ",
            )
            .unwrap();

        let err = f
            .storage
            .submit_vote(f.review, f.alice, VoteType::Upvote)
            .unwrap_err();
        assert!(err.is_conflict(), "{err}");
        assert_eq!(vote_rows(&f.storage, f.review, f.alice), 0);
    }

    #[test]
    fn test_concurrent_connections_keep_one_vote() {
        const THREADS: usize = 8;
        const ROUNDS: usize = 50;

        let db_path = std::env::temp_dir().join(format!(
            "fakerestaurant_votes_race_{}.db",
            std::process::id()
        ));
        let _ = std::fs::remove_file(&db_path);

        let (alice, review_id) = {
            let storage = Storage::open(&db_path).unwrap();
            let alice = user(&storage, "alice");
            let place = restaurant(&storage, alice, "Ristorante Race Condition");
            (alice, review(&storage, alice, place, "Two waiters, one table"))
        };

        let outcomes: Vec<VoteOutcome> = std::thread::scope(|scope| {
            let handles: Vec<_> = (0..THREADS)
                .map(|_| {
                    scope.spawn(|| {
                        let mut storage = Storage::open(&db_path).unwrap();
                        let mut seen = Vec::with_capacity(ROUNDS);
                        for _ in 0..ROUNDS {
                            let receipt = storage
                                .submit_vote(review_id, alice, VoteType::Upvote)
                                .unwrap();
                            assert!(vote_rows(&storage, review_id, alice) <= 1);
                            seen.push(receipt.outcome);
                        }
                        seen
                    })
                })
                .collect();
            handles
                .into_iter()
                .flat_map(|h| h.join().unwrap())
                .collect()
        });

        let created = outcomes.iter().filter(|o| **o == VoteOutcome::Created).count();
        let removed = outcomes.iter().filter(|o| **o == VoteOutcome::Removed).count();
        assert_eq!(created + removed, THREADS * ROUNDS);

        let storage = Storage::open(&db_path).unwrap();
        let remaining = vote_rows(&storage, review_id, alice);
        assert_eq!(remaining, i64::try_from(created - removed).unwrap());
        assert_eq!(remaining, 0);

        drop(storage);
        let _ = std::fs::remove_file(&db_path);
        let _ = std::fs::remove_file(db_path.with_extension("db-wal"));
        let _ = std::fs::remove_file(db_path.with_extension("db-shm"));
    }
}
