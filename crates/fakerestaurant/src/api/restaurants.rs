//! Restaurant listings and image uploads.

use axum::extract::multipart::MultipartRejection;
use axum::extract::{Multipart, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use serde::Deserialize;
use serde_json::json;
use tracing::{debug, info};

use super::extract::{AuthUser, Id, QueryParams};
use super::AppState;
use crate::error::{Error, Result};
use crate::model::{NewRestaurant, Restaurant};

#[derive(Debug, Deserialize)]
pub(super) struct ListQuery {
    name: Option<String>,
}

/// Fields collected from a restaurant submission form.
#[derive(Debug, Default)]
struct RestaurantForm {
    name: Option<String>,
    description: Option<String>,
    latitude: Option<String>,
    longitude: Option<String>,
    image: Option<(Option<String>, Vec<u8>)>,
}

impl RestaurantForm {
    async fn read(mut multipart: Multipart) -> Result<Self> {
        let mut form = Self::default();

        while let Some(field) = multipart.next_field().await.map_err(malformed)? {
            let Some(name) = field.name().map(str::to_string) else {
                continue;
            };
            match name.as_str() {
                "image" => {
                    let content_type = field.content_type().map(str::to_string);
                    let bytes = field.bytes().await.map_err(malformed)?;
                    form.image = Some((content_type, bytes.to_vec()));
                }
                "name" => form.name = Some(field.text().await.map_err(malformed)?),
                "description" => form.description = Some(field.text().await.map_err(malformed)?),
                "latitude" => form.latitude = Some(field.text().await.map_err(malformed)?),
                "longitude" => form.longitude = Some(field.text().await.map_err(malformed)?),
                _ => {}
            }
        }
        Ok(form)
    }
}

fn malformed(err: impl std::fmt::Display) -> Error {
    Error::invalid_argument(format!("malformed multipart body: {err}"))
}

/// `GET /api/restaurants?name=`
pub(super) async fn list(
    State(state): State<AppState>,
    QueryParams(query): QueryParams<ListQuery>,
) -> Result<Json<Vec<Restaurant>>> {
    let name = query.name.as_deref().filter(|n| !n.is_empty());
    let restaurants = state.storage.lock().await.list_restaurants(name)?;
    Ok(Json(restaurants))
}

/// `GET /api/restaurants/{id}`
pub(super) async fn show(
    State(state): State<AppState>,
    Id(restaurant_id): Id,
) -> Result<Json<Restaurant>> {
    let restaurant = state
        .storage
        .lock()
        .await
        .get_restaurant(restaurant_id)?
        .ok_or_else(|| Error::not_found("restaurant"))?;
    Ok(Json(restaurant))
}

/// `POST /api/restaurants` (multipart)
pub(super) async fn create(
    AuthUser(user_id): AuthUser,
    State(state): State<AppState>,
    multipart: std::result::Result<Multipart, MultipartRejection>,
) -> Result<impl IntoResponse> {
    let multipart = multipart.map_err(|e| Error::invalid_argument(e.body_text()))?;
    let form = RestaurantForm::read(multipart).await?;

    let restaurant = NewRestaurant::validate(
        form.name.as_deref(),
        form.description.as_deref(),
        form.latitude.as_deref(),
        form.longitude.as_deref(),
    )?;
    let (content_type, bytes) = form
        .image
        .ok_or_else(|| Error::invalid_argument("image is required"))?;

    let image_path = state.images.save(content_type.as_deref(), &bytes).await?;
    let restaurant = restaurant.with_image(image_path.clone());

    let inserted = state
        .storage
        .lock()
        .await
        .insert_restaurant(&restaurant, user_id);
    let restaurant = match inserted {
        Ok(restaurant) => restaurant,
        Err(e) => {
            state.images.remove(&image_path).await;
            return Err(e);
        }
    };

    info!(
        "User {} created restaurant {} ({})",
        user_id, restaurant.restaurant_id, restaurant.name
    );
    Ok((StatusCode::CREATED, Json(restaurant)))
}

/// `DELETE /api/restaurants/{id}`
pub(super) async fn remove(
    AuthUser(user_id): AuthUser,
    State(state): State<AppState>,
    Id(restaurant_id): Id,
) -> Result<impl IntoResponse> {
    let deleted = state
        .storage
        .lock()
        .await
        .delete_restaurant_owned(restaurant_id, user_id)?;

    match deleted.image_path.as_deref() {
        Some(path) => state.images.remove(path).await,
        None => debug!("Restaurant {} had no image to remove", restaurant_id),
    }

    Ok(Json(json!({ "message": "restaurant deleted" })))
}
