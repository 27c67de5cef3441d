//! HTTP adapters - REST API implementations.
//!
//! `build_router` assembles the billing routes with the auth middleware and
//! the tower-http layers shared by every endpoint.

pub mod billing;
pub mod middleware;

use axum::http::HeaderValue;
use axum::middleware::from_fn_with_state;
use axum::Router;
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tower_http::request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer};
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;

use crate::config::ServerConfig;

pub use billing::{BillingApiError, BillingAppState};
pub use middleware::{auth_middleware, AuthState, RequireAuth};

/// Builds the full application router.
///
/// Authenticated routes sit behind `auth_middleware`; provider callbacks and
/// the health check do not.
pub fn build_router(state: BillingAppState, auth: AuthState, server: &ServerConfig) -> Router {
    let authenticated = billing::account_routes().layer(from_fn_with_state(auth, auth_middleware));

    Router::new()
        .merge(authenticated)
        .merge(billing::public_routes())
        .with_state(state)
        .layer(cors_layer(&server.cors_origins_list()))
        .layer(TimeoutLayer::new(server.request_timeout()))
        .layer(PropagateRequestIdLayer::x_request_id())
        .layer(TraceLayer::new_for_http())
        .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid))
}

fn cors_layer(origins: &[String]) -> CorsLayer {
    let layer = CorsLayer::new().allow_methods(Any).allow_headers(Any);

    if origins.is_empty() || origins.iter().any(|o| o == "*") {
        return layer.allow_origin(Any);
    }

    let allowed: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|origin| match HeaderValue::from_str(origin) {
            Ok(value) => Some(value),
            Err(_) => {
                tracing::warn!(origin = %origin, "Ignoring unparseable CORS origin");
                None
            }
        })
        .collect();
    layer.allow_origin(AllowOrigin::list(allowed))
}
