//! Router assembly: one POST endpoint per operation, CORS preflight, method
//! fallback, panic catching, and HTTP tracing.

use std::any::Any;
use std::sync::Arc;

use axum::{
    extract::DefaultBodyLimit,
    http::{header::ACCESS_CONTROL_ALLOW_ORIGIN, HeaderValue},
    response::{IntoResponse, Response},
    routing::{get, post, MethodRouter},
    Router,
};
use tower_http::{
    catch_panic::CatchPanicLayer,
    set_header::SetResponseHeaderLayer,
    trace::{DefaultMakeSpan, DefaultOnRequest, DefaultOnResponse, TraceLayer},
};
use tracing::Level;

use crate::error::ApiError;
use crate::state::AppState;

pub mod http;

/// Build the application router with:
/// - `POST /api/<operation>` for each operation, `OPTIONS` preflight, 405 otherwise
/// - `GET /api/health`
/// - JSON 404 for anything else
pub fn build_router(state: Arc<AppState>) -> Router {
    let body_limit = state.config.body_limit_bytes;

    let router = Router::new()
        .route("/api/check-answer", endpoint(post(http::http_check_answer)))
        .route("/api/correct-spelling", endpoint(post(http::http_correct_spelling)))
        .route("/api/generate-exercises", endpoint(post(http::http_generate_exercises)))
        .route("/api/generate-practice", endpoint(post(http::http_generate_practice)))
        .route("/api/generate-single-level", endpoint(post(http::http_generate_single_level)))
        .route("/api/solve-visually", endpoint(post(http::http_solve_visually)))
        .route("/api/health", get(http::http_health))
        .fallback(http::http_not_found)
        .with_state(state);

    with_layers(router, body_limit)
}

fn endpoint(route: MethodRouter<Arc<AppState>>) -> MethodRouter<Arc<AppState>> {
    route
        .options(http::http_preflight)
        .fallback(http::http_method_not_allowed)
}

/// Body limit, panic catching, HTTP tracing, and `Access-Control-Allow-Origin: *` on every response.
fn with_layers(router: Router, body_limit: usize) -> Router {
    router
        .layer(DefaultBodyLimit::max(body_limit))
        .layer(CatchPanicLayer::custom(handle_panic))
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
                .on_request(DefaultOnRequest::new().level(Level::INFO))
                .on_response(DefaultOnResponse::new().level(Level::INFO)),
        )
        .layer(SetResponseHeaderLayer::if_not_present(
            ACCESS_CONTROL_ALLOW_ORIGIN,
            HeaderValue::from_static("*"),
        ))
}

fn handle_panic(err: Box<dyn Any + Send + 'static>) -> Response {
    let detail = if let Some(s) = err.downcast_ref::<String>() {
        s.clone()
    } else if let Some(s) = err.downcast_ref::<&str>() {
        s.to_string()
    } else {
        "unknown panic payload".to_string()
    };
    ApiError::internal(format!("handler panicked: {}", detail)).into_response()
}
