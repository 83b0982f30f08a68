//! Error taxonomy for the request pipeline and its mapping to HTTP responses.
//!
//! Every failure leaves the server as a `{ "error": { message, details? } }`
//! envelope. Internal detail is logged, never sent.

use std::time::Duration;

use axum::{
  extract::rejection::BytesRejection,
  http::{header::ALLOW, StatusCode},
  response::{IntoResponse, Response},
  Json,
};
use serde::Serialize;
use serde_json::json;
use thiserror::Error;
use tracing::{debug, error, warn};

use crate::protocol::{Envelope, ErrorBody};
use crate::task::Operation;

/// A single offending input field.
#[derive(Clone, Debug, Serialize, PartialEq, Eq)]
pub struct FieldError {
  pub field: String,
  pub message: String,
}

impl FieldError {
  pub fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
    Self { field: field.into(), message: message.into() }
  }
}

/// Failure classes of a model call.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum GatewayError {
  #[error("network failure: {0}")]
  Network(String),

  #[error("model call timed out after {0:?}")]
  Timeout(Duration),

  #[error("model refused the task: {0}")]
  Refusal(String),

  #[error("model output could not be used: {0}")]
  MalformedOutput(String),
}

impl GatewayError {
  /// Stable, provider-agnostic tag sent to clients in `details.kind`.
  pub fn kind(&self) -> &'static str {
    match self {
      GatewayError::Network(_) => "network",
      GatewayError::Timeout(_) => "timeout",
      GatewayError::Refusal(_) => "refusal",
      GatewayError::MalformedOutput(_) => "malformed_output",
    }
  }

  /// Worth another attempt under a retry policy.
  pub fn is_transient(&self) -> bool {
    matches!(self, GatewayError::Network(_) | GatewayError::Timeout(_))
  }
}

#[derive(Debug, Error)]
pub enum ApiError {
  #[error("invalid request ({} field error(s))", .0.len())]
  Validation(Vec<FieldError>),

  #[error("method not allowed")]
  MethodNotAllowed,

  #[error("route not found")]
  NotFound,

  #[error("{operation} failed: {source}")]
  Gateway {
    operation: Operation,
    #[source]
    source: GatewayError,
  },

  #[error("{0} is unavailable: no model configured")]
  Unavailable(Operation),

  #[error("request body rejected: {0}")]
  Body(#[from] BytesRejection),

  #[error("internal error: {0}")]
  Internal(String),
}

pub const INTERNAL_ERROR_MESSAGE: &str = "Error interno del servidor. Inténtalo más tarde.";

impl ApiError {
  pub fn validation(field: impl Into<String>, message: impl Into<String>) -> Self {
    ApiError::Validation(vec![FieldError::new(field, message)])
  }

  pub fn internal(msg: impl Into<String>) -> Self {
    ApiError::Internal(msg.into())
  }

  pub fn status(&self) -> StatusCode {
    match self {
      ApiError::Validation(_) => StatusCode::BAD_REQUEST,
      ApiError::MethodNotAllowed => StatusCode::METHOD_NOT_ALLOWED,
      ApiError::NotFound => StatusCode::NOT_FOUND,
      ApiError::Gateway { .. } => StatusCode::INTERNAL_SERVER_ERROR,
      ApiError::Unavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
      ApiError::Body(rejection) => rejection.status(),
      ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
    }
  }

  pub fn body(&self) -> ErrorBody {
    match self {
      ApiError::Validation(fields) => ErrorBody {
        message: "Datos de entrada inválidos.".into(),
        details: serde_json::to_value(fields).ok(),
      },
      ApiError::MethodNotAllowed => ErrorBody::message("Método no permitido. Usa POST."),
      ApiError::NotFound => ErrorBody::message("Ruta no encontrada."),
      ApiError::Gateway { operation, source } => ErrorBody {
        message: operation.failure_message().into(),
        details: Some(json!({ "kind": source.kind() })),
      },
      ApiError::Unavailable(_) => ErrorBody::message("El servicio de IA no está configurado en este servidor."),
      ApiError::Body(_) => ErrorBody::message("No se pudo leer el cuerpo de la solicitud."),
      ApiError::Internal(_) => ErrorBody::message(INTERNAL_ERROR_MESSAGE),
    }
  }
}

impl IntoResponse for ApiError {
  fn into_response(self) -> Response {
    let status = self.status();
    match &self {
      ApiError::Internal(detail) => {
        error!(target: "pipeline", %detail, "Unexpected failure; returning generic 500")
      }
      ApiError::Gateway { operation, source } => {
        warn!(target: "pipeline", %operation, kind = source.kind(), error = %source, "Model gateway failure")
      }
      other => debug!(target: "pipeline", %status, error = %other, "Request rejected"),
    }

    let body = Json(Envelope::<()>::Error(self.body()));
    if matches!(self, ApiError::MethodNotAllowed) {
      (status, [(ALLOW, "POST, OPTIONS")], body).into_response()
    } else {
      (status, body).into_response()
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn gateway_kinds_are_stable() {
    assert_eq!(GatewayError::Network("x".into()).kind(), "network");
    assert_eq!(GatewayError::Timeout(Duration::from_secs(1)).kind(), "timeout");
    assert_eq!(GatewayError::Refusal("x".into()).kind(), "refusal");
    assert_eq!(GatewayError::MalformedOutput("x".into()).kind(), "malformed_output");
  }

  #[test]
  fn only_network_and_timeout_are_transient() {
    assert!(GatewayError::Network("reset".into()).is_transient());
    assert!(GatewayError::Timeout(Duration::from_millis(5)).is_transient());
    assert!(!GatewayError::Refusal("no".into()).is_transient());
    assert!(!GatewayError::MalformedOutput("bad".into()).is_transient());
  }

  #[test]
  fn internal_error_body_hides_detail() {
    let err = ApiError::internal("db pool exploded at 0xdeadbeef");
    assert_eq!(err.status(), StatusCode::INTERNAL_SERVER_ERROR);
    let body = err.body();
    assert_eq!(body.message, INTERNAL_ERROR_MESSAGE);
    assert!(body.details.is_none());
  }

  #[test]
  fn gateway_error_body_names_only_the_kind() {
    let err = ApiError::Gateway {
      operation: Operation::GenerateExercises,
      source: GatewayError::Network("HTTP 500: upstream secret text".into()),
    };
    let body = serde_json::to_value(err.body()).unwrap();
    assert_eq!(body["details"], json!({ "kind": "network" }));
    assert!(!body.to_string().contains("upstream secret"));
  }

  #[test]
  fn validation_body_lists_fields() {
    let err = ApiError::Validation(vec![FieldError::new("userAnswer", "es obligatorio")]);
    assert_eq!(err.status(), StatusCode::BAD_REQUEST);
    let body = serde_json::to_value(err.body()).unwrap();
    assert_eq!(body["details"][0]["field"], "userAnswer");
  }
}
