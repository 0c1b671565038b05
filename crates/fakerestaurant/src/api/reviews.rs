//! Review endpoints.

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use serde::Deserialize;
use serde_json::json;
use tracing::info;

use super::extract::{AuthUser, Id, JsonBody, QueryParams};
use super::votes::{apply, parse_vote_type};
use super::AppState;
use crate::error::Result;
use crate::model::{
    NewReview, Page, PageRequest, RestaurantReview, ReviewSort, UserReview, VoteReceipt,
};

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(super) struct CreateReview {
    restaurant_id: Option<i64>,
    content: Option<String>,
    rating: Option<i64>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(super) struct ListQuery {
    page: Option<String>,
    limit: Option<String>,
    sort_by: Option<String>,
}

impl ListQuery {
    fn page_request(&self) -> PageRequest {
        PageRequest::from_query(self.page.as_deref(), self.limit.as_deref())
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(super) struct VoteBody {
    vote_type: Option<String>,
}

/// `POST /api/reviews`
pub(super) async fn create(
    AuthUser(user_id): AuthUser,
    State(state): State<AppState>,
    JsonBody(body): JsonBody<CreateReview>,
) -> Result<impl IntoResponse> {
    let review = NewReview::validate(body.restaurant_id, body.content, body.rating)?;
    let review = state.storage.lock().await.insert_review(&review, user_id)?;
    info!(
        "User {} reviewed restaurant {} ({} stars)",
        user_id, review.restaurant_id, review.rating
    );
    Ok((StatusCode::CREATED, Json(review)))
}

/// `GET /api/reviews/restaurant/{id}?page=&limit=&sortBy=`
pub(super) async fn for_restaurant(
    State(state): State<AppState>,
    Id(restaurant_id): Id,
    QueryParams(query): QueryParams<ListQuery>,
) -> Result<Json<Page<RestaurantReview>>> {
    let sort = match query.sort_by.as_deref() {
        None | Some("") => ReviewSort::default(),
        Some(raw) => raw.parse()?,
    };
    let page = state.storage.lock().await.list_reviews_for_restaurant(
        restaurant_id,
        query.page_request(),
        sort,
    )?;
    Ok(Json(page))
}

/// `GET /api/reviews/user/{id}?page=&limit=`
pub(super) async fn by_user(
    State(state): State<AppState>,
    Id(user_id): Id,
    QueryParams(query): QueryParams<ListQuery>,
) -> Result<Json<Page<UserReview>>> {
    let page = state
        .storage
        .lock()
        .await
        .list_reviews_by_user(user_id, query.page_request())?;
    Ok(Json(page))
}

/// `DELETE /api/reviews/{id}`
pub(super) async fn remove(
    AuthUser(user_id): AuthUser,
    State(state): State<AppState>,
    Id(review_id): Id,
) -> Result<impl IntoResponse> {
    state
        .storage
        .lock()
        .await
        .delete_review_owned(review_id, user_id)?;
    Ok(Json(json!({ "message": "review deleted" })))
}

/// `POST /api/reviews/{id}/vote`
pub(super) async fn vote(
    AuthUser(user_id): AuthUser,
    State(state): State<AppState>,
    Id(review_id): Id,
    JsonBody(body): JsonBody<VoteBody>,
) -> Result<(StatusCode, Json<VoteReceipt>)> {
    let vote_type = parse_vote_type(body.vote_type.as_deref())?;
    apply(&state, user_id, review_id, vote_type).await
}
