//! Demo data for local development.
//!
//! Six users (password `password123`), eight restaurants, two reviews per
//! restaurant and a spread of votes so that the `votes` sort has something
//! to order.

use serde::Serialize;
use tracing::info;

use crate::auth::hash_password;
use crate::error::{Error, Result};
use crate::model::{NewRestaurant, NewReview, NewUser, VoteType};
use crate::storage::Storage;

/// Password shared by every demo account.
pub const DEMO_PASSWORD: &str = "password123";

const USERS: &[&str] = &[
    "mario_rossi",
    "giulia_bianchi",
    "luca_verdi",
    "reviewer1",
    "reviewer2",
    "reviewer3",
];

/// `(name, description, latitude, longitude, creator index)`
const RESTAURANTS: &[(&str, &str, f64, f64, usize)] = &[
    ("Trattoria Single-Threaded", "Sequential execution guaranteed: one dish at a time.", 41.9028, 12.4964, 0),
    ("Pizzeria Callback Hell", "Every pizza calls another one in an endless chain of dependencies.", 45.4642, 9.19, 0),
    ("Ristorante 404 Not Found", "The place exists, the food does not.", 40.8518, 14.2681, 1),
    ("Osteria NullPointerException", "Cosy, but the service crashes without warning. Bring a debugger.", 43.7696, 11.2558, 1),
    ("Sushi Bar Async/Await", "The sushi arrives when it feels like it.", 45.0703, 7.6869, 1),
    ("Tavola Calda Segmentation Fault", "Home cooking that touches forbidden memory.", 44.4056, 8.9463, 2),
    ("Ristorante Race Condition", "Two waiters serve the same table at once. First one wins.", 43.3188, 11.3307, 2),
    ("Pizzeria Stack Overflow", "Pizza on pizza on pizza, with no base case.", 40.6263, 14.3757, 2),
];

/// `(restaurant index, author index, rating, content)`
const REVIEWS: &[(usize, usize, i64, &str)] = &[
    (0, 3, 3, "Ordered the starter and it arrived three hours later. At least it was warm."),
    (0, 4, 4, "The waiter said he was processing my request. He still is."),
    (1, 5, 2, "Every time you finish a dish another one you never ordered shows up."),
    (1, 3, 1, "Asked for a Margherita, got a Promise. It resolved into a Carbonara."),
    (2, 4, 5, "Beautiful interior, no food. Five stars for the concept."),
    (2, 5, 4, "They handed me an empty menu and said 'page not found'."),
    (3, 3, 3, "The first course was great, then the waiter crashed and never restarted."),
    (3, 4, 2, "Tried to order dessert and they threw an exception at me."),
    (4, 5, 4, "Waited two hours for the sushi. The promise was kept in the end."),
    (4, 3, 1, "Awaited for forty minutes and got rejected."),
    (5, 4, 2, "The menu changed every time I tried to read it. Core dumped."),
    (5, 5, 1, "The manager told me I was in a forbidden memory region."),
    (6, 3, 5, "Two waiters brought me the same dish at once. Double portion for free."),
    (6, 4, 3, "Ordered pasta, received a thread lock. The bread was crunchy though."),
    (7, 5, 5, "Every bite spawns another pizza. Three hours and still eating."),
    (7, 3, 4, "Gastric overflow after the seventh level of recursion."),
];

/// `(review index, voter index, vote)`
const VOTES: &[(usize, usize, VoteType)] = &[
    (0, 0, VoteType::Upvote),
    (0, 1, VoteType::Upvote),
    (0, 2, VoteType::Upvote),
    (1, 5, VoteType::Downvote),
    (3, 0, VoteType::Upvote),
    (3, 4, VoteType::Upvote),
    (4, 0, VoteType::Upvote),
    (4, 3, VoteType::Upvote),
    (4, 5, VoteType::Upvote),
    (5, 2, VoteType::Downvote),
    (9, 1, VoteType::Downvote),
    (9, 4, VoteType::Downvote),
    (12, 0, VoteType::Upvote),
    (12, 5, VoteType::Upvote),
    (13, 1, VoteType::Downvote),
    (14, 2, VoteType::Upvote),
];

/// What a seeding run inserted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct SeedSummary {
    /// Users created.
    pub users: usize,
    /// Restaurants created.
    pub restaurants: usize,
    /// Reviews created.
    pub reviews: usize,
    /// Votes cast.
    pub votes: usize,
}

/// Fill the database with demo data.
///
/// Refuses to touch a database that already has users unless `force` is
/// set, in which case everything is deleted first.
///
/// # Errors
///
/// Returns `Conflict` if the database is not empty and `force` is false, or
/// an error if hashing or any insert fails.
pub fn seed(storage: &mut Storage, bcrypt_cost: u32, force: bool) -> Result<SeedSummary> {
    if !storage.is_empty()? {
        if !force {
            return Err(Error::conflict(
                "database already contains data; rerun with --force to replace it",
            ));
        }
        storage.clear()?;
        info!("Cleared existing data before seeding");
    }

    let hash = hash_password(DEMO_PASSWORD, bcrypt_cost)?;

    let mut users = Vec::with_capacity(USERS.len());
    for name in USERS {
        let user = NewUser {
            username: (*name).to_string(),
            email: format!("{name}@example.com"),
            password: DEMO_PASSWORD.to_string(),
        };
        users.push(storage.create_user(&user, &hash)?.user_id);
    }

    let mut restaurants = Vec::with_capacity(RESTAURANTS.len());
    for &(name, description, latitude, longitude, creator) in RESTAURANTS {
        let restaurant = NewRestaurant {
            name: name.to_string(),
            description: description.to_string(),
            latitude,
            longitude,
            image_path: None,
        };
        restaurants.push(
            storage
                .insert_restaurant(&restaurant, users[creator])?
                .restaurant_id,
        );
    }

    let mut reviews = Vec::with_capacity(REVIEWS.len());
    for &(restaurant, author, rating, content) in REVIEWS {
        let review = NewReview {
            restaurant_id: restaurants[restaurant],
            content: content.to_string(),
            rating,
        };
        reviews.push(storage.insert_review(&review, users[author])?.review_id);
    }

    for &(review, voter, vote_type) in VOTES {
        storage.submit_vote(reviews[review], users[voter], vote_type)?;
    }

    let summary = SeedSummary {
        users: users.len(),
        restaurants: restaurants.len(),
        reviews: reviews.len(),
        votes: VOTES.len(),
    };
    info!(
        "Seeded {} users, {} restaurants, {} reviews, {} votes",
        summary.users, summary.restaurants, summary.reviews, summary.votes
    );
    Ok(summary)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::verify_password;
    use crate::model::{PageRequest, ReviewSort};

    #[test]
    fn test_seed_fills_empty_database() {
        let mut storage = Storage::open_in_memory().unwrap();
        let summary = seed(&mut storage, 4, false).unwrap();

        let stats = storage.stats().unwrap();
        assert_eq!(stats.users, 6);
        assert_eq!(stats.restaurants, 8);
        assert_eq!(stats.reviews, 16);
        assert_eq!(stats.votes, i64::try_from(summary.votes).unwrap());
    }

    #[test]
    fn test_seeded_password_verifies() {
        let mut storage = Storage::open_in_memory().unwrap();
        seed(&mut storage, 4, false).unwrap();

        let creds = storage.find_credentials("reviewer1").unwrap().unwrap();
        assert!(verify_password(DEMO_PASSWORD, &creds.password_hash));
    }

    #[test]
    fn test_seed_refuses_non_empty_database() {
        let mut storage = Storage::open_in_memory().unwrap();
        seed(&mut storage, 4, false).unwrap();

        let err = seed(&mut storage, 4, false).unwrap_err();
        assert!(err.is_conflict());
    }

    #[test]
    fn test_seed_force_replaces_data() {
        let mut storage = Storage::open_in_memory().unwrap();
        seed(&mut storage, 4, false).unwrap();
        seed(&mut storage, 4, true).unwrap();

        assert_eq!(storage.stats().unwrap().users, 6);
    }

    #[test]
    fn test_seeded_votes_order_reviews() {
        let mut storage = Storage::open_in_memory().unwrap();
        seed(&mut storage, 4, false).unwrap();

        let first = storage.list_restaurants(Some("Trattoria Single-Threaded")).unwrap();
        let page = storage
            .list_reviews_for_restaurant(
                first[0].restaurant_id,
                PageRequest::default(),
                ReviewSort::Votes,
            )
            .unwrap();
        assert_eq!(page.reviews[0].upvotes, 3);
        assert_eq!(page.reviews[1].downvotes, 1);
    }
}
