//! Math practice backend
//!
//! Stateless JSON endpoints for a children's math-practice app: answer
//! checking, spelling correction, exercise/practice generation and photo
//! solving. Generation goes through a single model gateway with a bounded
//! timeout; every response is a `{data}` or `{error}` envelope.

pub mod config;
pub mod domain;
pub mod error;
pub mod gateway;
pub mod logic;
pub mod normalizer;
pub mod openai;
pub mod protocol;
pub mod routes;
pub mod seeds;
pub mod state;
pub mod task;
pub mod telemetry;
pub mod util;
pub mod validate;
