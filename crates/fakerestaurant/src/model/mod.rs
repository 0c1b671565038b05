//! Domain types for fakerestaurant.
//!
//! Plain data carried between the storage layer and the HTTP handlers.
//! Wire names are camelCase to match the web frontend.

mod page;
mod restaurant;
mod review;
mod user;
mod vote;

pub use page::{Page, PageRequest, DEFAULT_PAGE_SIZE, MAX_PAGE_SIZE};
pub use restaurant::{NewRestaurant, Restaurant};
pub use review::{
    NewReview, RestaurantReview, Review, ReviewSort, UserReview, MAX_RATING, MIN_RATING,
};
pub use user::{NewUser, User, UserCredentials, MIN_PASSWORD_LEN};
pub use vote::{Vote, VoteCounts, VoteOutcome, VoteReceipt, VoteTransition, VoteType};
