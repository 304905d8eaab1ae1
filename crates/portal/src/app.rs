//! Router assembly.

use axum::{
    Router,
    http::{
        HeaderValue, Method, Request,
        header::{AUTHORIZATION, CONTENT_TYPE},
    },
    middleware::from_fn,
};
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::middleware::{
    ClientIpKeyExtractor, request_id_middleware, security_headers_middleware,
};
use crate::routes;
use crate::state::AppState;

/// CORS for the public site origin. Without a configured origin no
/// cross-origin requests are allowed.
fn cors_layer(site_url: Option<&str>) -> CorsLayer {
    let Some(origin) = site_url.and_then(|url| HeaderValue::from_str(url.trim_end_matches('/')).ok())
    else {
        return CorsLayer::new();
    };

    CorsLayer::new()
        .allow_origin(origin)
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE])
        .allow_headers([AUTHORIZATION, CONTENT_TYPE])
}

/// Build the portal router with its full middleware stack.
pub fn app(state: AppState) -> Router {
    let cors = cors_layer(state.config().site_url.as_deref());
    let client_ip = ClientIpKeyExtractor::new(state.config().client_ip_header.clone());

    Router::new()
        .merge(routes::routes(&client_ip))
        .with_state(state)
        .layer(cors)
        .layer(from_fn(security_headers_middleware))
        .layer(from_fn(request_id_middleware))
        .layer(
            TraceLayer::new_for_http().make_span_with(|request: &Request<_>| {
                tracing::info_span!(
                    "http_request",
                    method = %request.method(),
                    path = %request.uri().path(),
                    request_id = tracing::field::Empty,
                    user_id = tracing::field::Empty,
                )
            }),
        )
        // Sentry layers (outermost for full request coverage)
        .layer(sentry_tower::NewSentryLayer::new_from_top())
        .layer(sentry_tower::SentryHttpLayer::new().enable_transaction())
}

