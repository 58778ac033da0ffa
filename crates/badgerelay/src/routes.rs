use std::sync::Arc;

use axum::Router;
use axum::body::Bytes;
use axum::extract::rejection::PathRejection;
use axum::extract::{Path, State};
use axum::http::{HeaderValue, Method, StatusCode, header};
use axum::response::{IntoResponse, Response};
use axum::routing::post;
use tower_http::cors::{AllowOrigin, CorsLayer};

use crate::relay::{RelayService, RequestError};

impl IntoResponse for RequestError {
    fn into_response(self) -> Response {
        let status = if self.is_client_error() {
            StatusCode::BAD_REQUEST
        } else {
            StatusCode::INTERNAL_SERVER_ERROR
        };
        (status, self.to_string()).into_response()
    }
}

/// Build the relay router: `POST /{window_id}`.
pub fn build_router(relay: Arc<RelayService>, cors: CorsLayer) -> Router {
    Router::new()
        .route("/", post(missing_window_id))
        .route("/{window_id}", post(set_window_notifications))
        .layer(cors)
        .with_state(relay)
}

/// CORS policy for browser callers. An empty list allows any origin.
pub fn cors_layer(origins: Vec<HeaderValue>) -> CorsLayer {
    let allow_origin = if origins.is_empty() {
        AllowOrigin::any()
    } else {
        AllowOrigin::list(origins)
    };
    CorsLayer::new()
        .allow_methods([Method::POST])
        .allow_headers([header::CONTENT_TYPE])
        .allow_origin(allow_origin)
}

/// `POST /{window_id}`: relay the notification as a bus signal.
///
/// A segment that does not decode to UTF-8 carries no usable window ID.
async fn set_window_notifications(
    State(relay): State<Arc<RelayService>>,
    window_id: Result<Path<String>, PathRejection>,
    body: Bytes,
) -> Result<StatusCode, RequestError> {
    let Ok(Path(window_id)) = window_id else {
        return Err(RequestError::MissingWindowId);
    };
    relay.handle(&window_id, &body).await?;
    Ok(StatusCode::OK)
}

/// `POST /`: the window ID segment is empty.
async fn missing_window_id() -> RequestError {
    RequestError::MissingWindowId
}
