//! Public wire structs for the HTTP endpoints (serde ready).
//! Keep this small and stable so the frontend and backend can evolve independently.

use serde::{Deserialize, Serialize};

use crate::domain::{ContentSource, Exercise, Level};

/// Every endpoint answers with exactly one of `{"data": ...}` or `{"error": ...}`.
#[derive(Debug, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Envelope<T> {
    Data(T),
    Error(ErrorBody),
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct ErrorBody {
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
}

impl ErrorBody {
    pub fn message(message: impl Into<String>) -> Self {
        Self { message: message.into(), details: None }
    }
}

//
// Success payloads
//

#[derive(Clone, Debug, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct AnswerFeedback {
    pub is_correct: bool,
    pub message: String,
}

#[derive(Clone, Debug, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct SpellingOut {
    pub original: String,
    pub corrected: String,
    pub changed: bool,
    pub source: ContentSource,
}

/// generate-exercises and generate-single-level.
#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ExerciseSetOut {
    pub level: Level,
    pub topic: String,
    pub exercises: Vec<Exercise>,
    pub source: ContentSource,
}

#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PracticeSessionOut {
    pub title: String,
    pub topic: String,
    pub level: Level,
    pub introduction: String,
    pub exercises: Vec<Exercise>,
    pub tips: Vec<String>,
    pub source: ContentSource,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthOut {
    pub ok: bool,
    pub model_configured: bool,
}
