//! Vote ledger endpoints.

use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tracing::info;

use super::extract::{AuthUser, Id, JsonBody};
use super::AppState;
use crate::error::{Error, Result};
use crate::model::{Vote, VoteOutcome, VoteReceipt, VoteType};

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(super) struct SubmitVote {
    review_id: Option<i64>,
    vote_type: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub(super) struct CountsResponse {
    review_id: i64,
    upvotes: i64,
    downvotes: i64,
    score: i64,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub(super) struct CallerVote {
    review_id: i64,
    vote: Option<Vote>,
}

/// Parse the `voteType` field of a submission.
pub(super) fn parse_vote_type(raw: Option<&str>) -> Result<VoteType> {
    raw.ok_or_else(|| Error::invalid_argument("voteType is required"))?
        .parse()
}

/// Apply a submission and shape the response: 201 when a vote was
/// created, 200 otherwise.
pub(super) async fn apply(
    state: &AppState,
    voter: i64,
    review_id: i64,
    vote_type: VoteType,
) -> Result<(StatusCode, Json<VoteReceipt>)> {
    let receipt = state
        .storage
        .lock()
        .await
        .submit_vote(review_id, voter, vote_type)?;

    let status = match receipt.outcome {
        VoteOutcome::Created => StatusCode::CREATED,
        VoteOutcome::Updated | VoteOutcome::Removed => StatusCode::OK,
    };
    Ok((status, Json(receipt)))
}

/// `POST /api/votes`
pub(super) async fn submit(
    AuthUser(user_id): AuthUser,
    State(state): State<AppState>,
    JsonBody(body): JsonBody<SubmitVote>,
) -> Result<(StatusCode, Json<VoteReceipt>)> {
    let review_id = body
        .review_id
        .ok_or_else(|| Error::invalid_argument("reviewId is required"))?;
    let vote_type = parse_vote_type(body.vote_type.as_deref())?;
    apply(&state, user_id, review_id, vote_type).await
}

/// `GET /api/votes/review/{id}/counts` and `GET /api/reviews/{id}/votes`
pub(super) async fn counts(
    State(state): State<AppState>,
    Id(review_id): Id,
) -> Result<Json<CountsResponse>> {
    let counts = state.storage.lock().await.vote_counts(review_id)?;
    Ok(Json(CountsResponse {
        review_id,
        upvotes: counts.upvotes,
        downvotes: counts.downvotes,
        score: counts.score(),
    }))
}

/// `GET /api/votes/review/{id}/user`
pub(super) async fn caller_vote(
    AuthUser(user_id): AuthUser,
    State(state): State<AppState>,
    Id(review_id): Id,
) -> Result<Json<CallerVote>> {
    let vote = state
        .storage
        .lock()
        .await
        .user_vote_for_review(review_id, user_id)?;
    Ok(Json(CallerVote { review_id, vote }))
}

/// `GET /api/votes/review/{id}`
pub(super) async fn for_review(
    State(state): State<AppState>,
    Id(review_id): Id,
) -> Result<Json<Vec<Vote>>> {
    let votes = state.storage.lock().await.votes_for_review(review_id)?;
    Ok(Json(votes))
}

/// `DELETE /api/votes/review/{id}`
pub(super) async fn withdraw(
    AuthUser(user_id): AuthUser,
    State(state): State<AppState>,
    Id(review_id): Id,
) -> Result<Json<Value>> {
    state
        .storage
        .lock()
        .await
        .withdraw_vote(review_id, user_id)?;
    info!("User {} withdrew their vote on review {}", user_id, review_id);
    Ok(Json(json!({ "message": "vote removed" })))
}

/// `GET /api/votes/user`
pub(super) async fn mine(
    AuthUser(user_id): AuthUser,
    State(state): State<AppState>,
) -> Result<Json<Vec<Vote>>> {
    let votes = state.storage.lock().await.votes_by_user(user_id)?;
    Ok(Json(votes))
}

#[cfg(test)]
mod tests {
    use axum::http::StatusCode;
    use serde_json::{json, Value};

    use super::super::test_support::*;

    async fn vote(app: &axum::Router, token: &str, review: i64, kind: &str) -> (StatusCode, Value) {
        let body = json!({ "reviewId": review, "voteType": kind });
        send(app, post_json("/api/votes", Some(token), &body)).await
    }

    async fn counts(app: &axum::Router, review: i64) -> (i64, i64, i64) {
        let (status, body) = send(app, get(&format!("/api/votes/review/{review}/counts"), None)).await;
        assert_eq!(status, StatusCode::OK);
        (
            body["upvotes"].as_i64().unwrap(),
            body["downvotes"].as_i64().unwrap(),
            body["score"].as_i64().unwrap(),
        )
    }

    #[tokio::test]
    async fn test_vote_scenario_over_http() {
        let (app, state) = app("votes_scenario");
        let (alice_id, alice) = sign_up(&app, "alice").await;
        let (_, review) = seeded_review(&state, alice_id).await;

        let (status, body) = vote(&app, &alice, review, "upvote").await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(body["outcome"], "created");
        assert_eq!(body["vote"]["voteType"], "upvote");
        let vote_id = body["vote"]["voteId"].clone();
        assert_eq!(counts(&app, review).await, (1, 0, 1));

        let (status, body) = vote(&app, &alice, review, "upvote").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, json!({ "outcome": "removed" }));
        assert_eq!(counts(&app, review).await, (0, 0, 0));

        let (status, body) = vote(&app, &alice, review, "downvote").await;
        assert_eq!(status, StatusCode::CREATED);
        assert_ne!(body["vote"]["voteId"], vote_id);
        assert_eq!(counts(&app, review).await, (0, 1, -1));

        let (status, body) = vote(&app, &alice, review, "upvote").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["outcome"], "updated");
        assert_eq!(counts(&app, review).await, (1, 0, 1));
    }

    #[tokio::test]
    async fn test_vote_errors() {
        let (app, state) = app("votes_errors");
        let (alice_id, alice) = sign_up(&app, "alice").await;
        let (_, review) = seeded_review(&state, alice_id).await;

        let (status, _) = vote(&app, &alice, 9999, "upvote").await;
        assert_eq!(status, StatusCode::NOT_FOUND);

        let (status, body) = vote(&app, &alice, review, "sideways").await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(body["message"].as_str().unwrap().contains("voteType"));

        let (status, _) = send(
            &app,
            post_json("/api/votes", Some(&alice), &json!({ "reviewId": review })),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let body = json!({ "reviewId": review, "voteType": "upvote" });
        let (status, _) = send(&app, post_json("/api/votes", None, &body)).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn test_caller_vote_is_null_without_vote() {
        let (app, state) = app("votes_caller");
        let (alice_id, alice) = sign_up(&app, "alice").await;
        let (_, review) = seeded_review(&state, alice_id).await;
        let uri = format!("/api/votes/review/{review}/user");

        let (status, body) = send(&app, get(&uri, Some(&alice))).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, json!({ "reviewId": review, "vote": null }));

        vote(&app, &alice, review, "downvote").await;
        let (_, body) = send(&app, get(&uri, Some(&alice))).await;
        assert_eq!(body["vote"]["voteType"], "downvote");
    }

    #[tokio::test]
    async fn test_withdraw_and_listings() {
        let (app, state) = app("votes_withdraw");
        let (alice_id, alice) = sign_up(&app, "alice").await;
        let (_, bob) = sign_up(&app, "bob").await;
        let (_, review) = seeded_review(&state, alice_id).await;

        vote(&app, &alice, review, "upvote").await;
        vote(&app, &bob, review, "downvote").await;

        let (_, listed) = send(&app, get(&format!("/api/votes/review/{review}"), None)).await;
        assert_eq!(listed.as_array().unwrap().len(), 2);

        let (_, mine) = send(&app, get("/api/votes/user", Some(&bob))).await;
        assert_eq!(mine.as_array().unwrap().len(), 1);
        assert_eq!(mine[0]["voteType"], "downvote");

        let uri = format!("/api/votes/review/{review}");
        let (status, _) = send(&app, delete(&uri, Some(&bob))).await;
        assert_eq!(status, StatusCode::OK);
        let (status, _) = send(&app, delete(&uri, Some(&bob))).await;
        assert_eq!(status, StatusCode::NOT_FOUND);

        assert_eq!(counts(&app, review).await, (1, 0, 1));
    }
}
