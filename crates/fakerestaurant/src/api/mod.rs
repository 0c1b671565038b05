//! HTTP API.
//!
//! An axum [`Router`] over shared [`AppState`]. Handlers live in one
//! submodule per resource; every failure leaves through
//! [`Error`](crate::Error)'s `IntoResponse` as `{"message": ...}`.

mod auth;
mod extract;
mod restaurants;
mod reviews;
mod votes;

use std::sync::Arc;

use axum::extract::DefaultBodyLimit;
use axum::http::header::{AUTHORIZATION, CONTENT_TYPE};
use axum::http::{HeaderValue, Method, StatusCode, Uri};
use axum::response::IntoResponse;
use axum::routing::{delete, get, post};
use axum::{Json, Router};
use chrono::Utc;
use serde_json::json;
use tokio::sync::Mutex;
use tower_http::cors::{AllowOrigin, CorsLayer};
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;
use tracing::debug;

use crate::auth::{credential_provider, CredentialProvider, TokenIssuer};
use crate::config::Config;
use crate::error::{Error, Result};
use crate::storage::Storage;
use crate::uploads::{ImageStore, PUBLIC_PREFIX};

pub use extract::AuthUser;

/// State shared by every handler.
#[derive(Debug, Clone)]
pub struct AppState {
    /// The database; one statement sequence at a time.
    pub storage: Arc<Mutex<Storage>>,
    /// Signs and verifies session tokens.
    pub tokens: Arc<TokenIssuer>,
    /// Finds the caller's token in a request.
    pub credentials: Arc<dyn CredentialProvider>,
    /// Uploaded restaurant images.
    pub images: Arc<ImageStore>,
    /// bcrypt cost for new password hashes.
    pub bcrypt_cost: u32,
    /// Token lifetime, echoed in login cookies.
    pub token_ttl_seconds: i64,
}

impl AppState {
    /// Assemble the state from opened resources and the configuration.
    #[must_use]
    pub fn new(storage: Storage, images: ImageStore, config: &Config) -> Self {
        Self {
            storage: Arc::new(Mutex::new(storage)),
            tokens: Arc::new(TokenIssuer::new(&config.auth)),
            credentials: Arc::from(credential_provider(&config.auth)),
            images: Arc::new(images),
            bcrypt_cost: config.auth.bcrypt_cost,
            token_ttl_seconds: i64::try_from(config.token_ttl().as_secs()).unwrap_or(i64::MAX),
        }
    }
}

/// Build the application router.
///
/// # Errors
///
/// Returns an error if a configured CORS origin is not a valid header value.
pub fn router(state: AppState, config: &Config) -> Result<Router> {
    let origins = config
        .server
        .allowed_origins
        .iter()
        .map(|origin| {
            HeaderValue::from_str(origin).map_err(|_| Error::ConfigValidation {
                message: format!("invalid CORS origin: {origin}"),
            })
        })
        .collect::<Result<Vec<_>>>()?;

    let cors = CorsLayer::new()
        .allow_origin(AllowOrigin::list(origins))
        .allow_methods([Method::GET, Method::POST, Method::DELETE, Method::OPTIONS])
        .allow_headers([CONTENT_TYPE, AUTHORIZATION])
        .allow_credentials(true);

    let api = Router::new()
        .route("/health", get(health))
        .route("/auth/register", post(auth::register))
        .route("/auth/login", post(auth::login))
        .route("/auth/me", get(auth::me))
        .route(
            "/restaurants",
            get(restaurants::list).post(restaurants::create),
        )
        .route(
            "/restaurants/{id}",
            get(restaurants::show).delete(restaurants::remove),
        )
        .route("/reviews", post(reviews::create))
        .route("/reviews/{id}", delete(reviews::remove))
        .route("/reviews/restaurant/{id}", get(reviews::for_restaurant))
        .route("/reviews/user/{id}", get(reviews::by_user))
        .route("/reviews/{id}/vote", post(reviews::vote))
        .route("/reviews/{id}/votes", get(votes::counts))
        .route("/votes", post(votes::submit))
        .route("/votes/user", get(votes::mine))
        .route(
            "/votes/review/{id}",
            get(votes::for_review).delete(votes::withdraw),
        )
        .route("/votes/review/{id}/counts", get(votes::counts))
        .route("/votes/review/{id}/user", get(votes::caller_vote))
        .method_not_allowed_fallback(method_not_allowed);

    let uploads = ServeDir::new(state.images.dir());

    Ok(Router::new()
        .nest("/api", api)
        .nest_service(PUBLIC_PREFIX, uploads)
        .fallback(not_found)
        .layer(DefaultBodyLimit::max(config.server.max_body_bytes))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state))
}

async fn health() -> impl IntoResponse {
    Json(json!({
        "status": "ok",
        "timestamp": Utc::now().to_rfc3339(),
        "endpoints": {
            "auth": "/api/auth",
            "restaurants": "/api/restaurants",
            "reviews": "/api/reviews",
            "votes": "/api/votes",
            "uploads": PUBLIC_PREFIX,
        },
    }))
}

async fn method_not_allowed(method: Method, uri: Uri) -> impl IntoResponse {
    debug!("{} not allowed on {}", method, uri.path());
    (
        StatusCode::METHOD_NOT_ALLOWED,
        Json(json!({ "message": format!("method {method} not allowed"), "path": uri.path() })),
    )
}

async fn not_found(uri: Uri) -> impl IntoResponse {
    debug!("No route for {}", uri.path());
    (
        StatusCode::NOT_FOUND,
        Json(json!({ "message": "route not found", "path": uri.path() })),
    )
}


#[cfg(test)]
mod tests {
    use axum::http::StatusCode;

    use super::test_support::*;

    #[tokio::test]
    async fn test_health() {
        let (app, _) = app("health");
        let (status, body) = send(&app, get("/api/health", None)).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "ok");
        assert!(body["endpoints"]["votes"].is_string());
    }

    #[tokio::test]
    async fn test_unknown_route_is_json_404() {
        let (app, _) = app("fallback");
        let (status, body) = send(&app, get("/api/nowhere", None)).await;

        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["path"], "/api/nowhere");
        assert!(body["message"].is_string());
    }

    #[tokio::test]
    async fn test_wrong_method_is_json_405() {
        use axum::body::Body;
        use axum::http::Request;

        let (app, _) = app("method_not_allowed");
        let request = Request::put("/api/votes").body(Body::empty()).unwrap();
        let (status, body) = send(&app, request).await;

        assert_eq!(status, StatusCode::METHOD_NOT_ALLOWED);
        assert_eq!(body["message"], "method PUT not allowed");
        assert_eq!(body["path"], "/api/votes");
    }

    #[tokio::test]
    async fn test_malformed_query_is_json_400() {
        let (app, _) = app("bad_query");
        let (status, body) = send(&app, get("/api/restaurants?name=a&name=b", None)).await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(body["message"].as_str().unwrap().contains("name"));
    }

    #[tokio::test]
    async fn test_cors_allows_configured_origin() {
        use axum::body::Body;
        use axum::http::{header, Request};
        use tower::ServiceExt;

        let (app, _) = app("cors");
        let request = Request::get("/api/health")
            .header(header::ORIGIN, "http://localhost:4200")
            .body(Body::empty())
            .unwrap();
        let response = app.oneshot(request).await.unwrap();

        assert_eq!(
            response.headers()[header::ACCESS_CONTROL_ALLOW_ORIGIN],
            "http://localhost:4200"
        );
    }
}
