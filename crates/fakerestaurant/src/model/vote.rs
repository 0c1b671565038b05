//! Vote types and the ledger transition rule.
//!
//! A user holds at most one vote per review. Submitting a vote either
//! creates it, removes it (same type again), or switches its type in place.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::Error;

/// Direction of a vote.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VoteType {
    /// Positive vote.
    Upvote,
    /// Negative vote.
    Downvote,
}

impl VoteType {
    /// The literal stored in the database and accepted on the wire.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Upvote => "upvote",
            Self::Downvote => "downvote",
        }
    }
}

impl fmt::Display for VoteType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for VoteType {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "upvote" => Ok(Self::Upvote),
            "downvote" => Ok(Self::Downvote),
            other => Err(Error::invalid_argument(format!(
                "voteType must be \"upvote\" or \"downvote\", got \"{other}\""
            ))),
        }
    }
}

/// A single user's vote on a single review.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Vote {
    /// Row identifier, stable across type switches.
    pub vote_id: i64,
    /// Current direction.
    pub vote_type: VoteType,
    /// Review being voted on.
    pub review_id: i64,
    /// User who cast the vote.
    pub voter_user_id: i64,
    /// When the vote was first cast.
    pub created_at: DateTime<Utc>,
    /// When the vote was last switched.
    pub updated_at: DateTime<Utc>,
}

/// What a vote submission did.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VoteOutcome {
    /// No prior vote; a new one was inserted.
    Created,
    /// Prior vote of the other type; its type was switched in place.
    Updated,
    /// Prior vote of the same type; it was deleted.
    Removed,
}

/// The write a submission requires, decided from the prior vote.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VoteTransition {
    /// Insert a vote of the given type.
    Insert(VoteType),
    /// Delete the existing vote.
    Delete {
        /// Id of the vote to delete.
        vote_id: i64,
    },
    /// Switch the existing vote to the given type.
    Switch {
        /// Id of the vote to update.
        vote_id: i64,
        /// New type.
        to: VoteType,
    },
}

impl VoteTransition {
    /// Decide the transition for `submitted` given the caller's current vote.
    #[must_use]
    pub fn decide(existing: Option<(i64, VoteType)>, submitted: VoteType) -> Self {
        match existing {
            None => Self::Insert(submitted),
            Some((vote_id, current)) if current == submitted => Self::Delete { vote_id },
            Some((vote_id, _)) => Self::Switch {
                vote_id,
                to: submitted,
            },
        }
    }

    /// The outcome reported to the caller once this transition is applied.
    #[must_use]
    pub const fn outcome(&self) -> VoteOutcome {
        match self {
            Self::Insert(_) => VoteOutcome::Created,
            Self::Delete { .. } => VoteOutcome::Removed,
            Self::Switch { .. } => VoteOutcome::Updated,
        }
    }
}

/// Result of a vote submission.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct VoteReceipt {
    /// What happened.
    pub outcome: VoteOutcome,
    /// The resulting vote; absent when it was removed.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub vote: Option<Vote>,
}

/// Aggregate vote counts of one review, computed at read time.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VoteCounts {
    /// Number of upvotes.
    pub upvotes: i64,
    /// Number of downvotes.
    pub downvotes: i64,
}

impl VoteCounts {
    /// Upvotes minus downvotes.
    #[must_use]
    pub const fn score(&self) -> i64 {
        self.upvotes - self.downvotes
    }

    /// Number of users currently holding a vote.
    #[must_use]
    pub const fn total(&self) -> i64 {
        self.upvotes + self.downvotes
    }
}
