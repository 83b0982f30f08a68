//! HTTP endpoint handlers. These are thin wrappers that forward to the pipeline
//! in `logic` and wrap the outcome in the response envelope.

use std::sync::Arc;

use axum::{
  body::Bytes,
  extract::{rejection::BytesRejection, State},
  http::{
    header::{ACCESS_CONTROL_ALLOW_HEADERS, ACCESS_CONTROL_ALLOW_METHODS, ACCESS_CONTROL_ALLOW_ORIGIN},
    StatusCode,
  },
  response::{IntoResponse, Response},
  Json,
};
use serde::Serialize;
use tracing::instrument;

use crate::error::ApiError;
use crate::logic;
use crate::protocol::{Envelope, HealthOut};
use crate::state::AppState;

type Body = Result<Bytes, BytesRejection>;

fn respond<T: Serialize>(result: Result<T, ApiError>) -> Response {
  match result {
    Ok(data) => (StatusCode::OK, Json(Envelope::Data(data))).into_response(),
    Err(e) => e.into_response(),
  }
}

#[instrument(level = "info", skip_all)]
pub async fn http_check_answer(body: Body) -> Response {
  match body {
    Ok(bytes) => respond(logic::check_answer(&bytes)),
    Err(e) => ApiError::from(e).into_response(),
  }
}

#[instrument(level = "info", skip_all)]
pub async fn http_correct_spelling(State(state): State<Arc<AppState>>, body: Body) -> Response {
  match body {
    Ok(bytes) => respond(logic::correct_spelling(&state, &bytes).await),
    Err(e) => ApiError::from(e).into_response(),
  }
}

#[instrument(level = "info", skip_all)]
pub async fn http_generate_exercises(State(state): State<Arc<AppState>>, body: Body) -> Response {
  match body {
    Ok(bytes) => respond(logic::generate_exercises(&state, &bytes).await),
    Err(e) => ApiError::from(e).into_response(),
  }
}

#[instrument(level = "info", skip_all)]
pub async fn http_generate_practice(State(state): State<Arc<AppState>>, body: Body) -> Response {
  match body {
    Ok(bytes) => respond(logic::generate_practice(&state, &bytes).await),
    Err(e) => ApiError::from(e).into_response(),
  }
}

#[instrument(level = "info", skip_all)]
pub async fn http_generate_single_level(State(state): State<Arc<AppState>>, body: Body) -> Response {
  match body {
    Ok(bytes) => respond(logic::generate_single_level(&state, &bytes).await),
    Err(e) => ApiError::from(e).into_response(),
  }
}

#[instrument(level = "info", skip_all)]
pub async fn http_solve_visually(State(state): State<Arc<AppState>>, body: Body) -> Response {
  match body {
    Ok(bytes) => respond(logic::solve_visually(&state, &bytes).await),
    Err(e) => ApiError::from(e).into_response(),
  }
}

/// CORS preflight: 200, no body.
pub async fn http_preflight() -> impl IntoResponse {
  (
    StatusCode::OK,
    [
      (ACCESS_CONTROL_ALLOW_ORIGIN, "*"),
      (ACCESS_CONTROL_ALLOW_METHODS, "POST, OPTIONS"),
      (ACCESS_CONTROL_ALLOW_HEADERS, "Content-Type"),
    ],
  )
}

pub async fn http_method_not_allowed() -> Response {
  ApiError::MethodNotAllowed.into_response()
}

pub async fn http_not_found() -> Response {
  ApiError::NotFound.into_response()
}

#[instrument(level = "info", skip_all)]
pub async fn http_health(State(state): State<Arc<AppState>>) -> impl IntoResponse {
  Json(HealthOut { ok: true, model_configured: state.gateway.is_some() })
}
