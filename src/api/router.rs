//! Gateway router.
//!
//! Returns a composable `Router` with every route under `/api/`.
//!
//! Layers (outermost → innermost): CORS → `cache-control: no-store` → handler.
//! Each route answers non-matching methods with a JSON 405.

use axum::http::{header, HeaderValue};
use axum::routing::{get, post};
use axum::Router;
use tower_http::cors::CorsLayer;
use tower_http::set_header::SetResponseHeaderLayer;

use crate::api::endpoints;
use crate::api::types::ApiContext;

/// Build the gateway router.
///
/// `/api/gemini` and `/api/generate` are the same passthrough endpoint.
pub fn gateway_router(ctx: ApiContext) -> Router {
    let api = Router::new()
        .route(
            "/health",
            get(endpoints::health::check).fallback(endpoints::method_not_allowed),
        )
        .route(
            "/gemini",
            post(endpoints::generate::generate).fallback(endpoints::method_not_allowed),
        )
        .route(
            "/generate",
            post(endpoints::generate::generate).fallback(endpoints::method_not_allowed),
        )
        .route(
            "/summary",
            post(endpoints::summary::summarize).fallback(endpoints::method_not_allowed),
        )
        .with_state(ctx);

    Router::new()
        .nest("/api", api)
        .layer(SetResponseHeaderLayer::overriding(
            header::CACHE_CONTROL,
            HeaderValue::from_static("no-store"),
        ))
        // Browser client is served from another origin.
        .layer(CorsLayer::permissive())
}
