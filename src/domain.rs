//! Domain models: difficulty levels, validated requests, and the structured
//! payloads the model is asked to produce.

use serde::{Deserialize, Serialize};

use crate::gateway::StructuredOutput;

/// Difficulty tag accepted by the generation endpoints.
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum Level {
  Beginner,
  Intermediate,
  Advanced,
}

impl Level {
  pub const ALL: [Level; 3] = [Level::Beginner, Level::Intermediate, Level::Advanced];

  pub fn as_str(&self) -> &'static str {
    match self {
      Level::Beginner => "beginner",
      Level::Intermediate => "intermediate",
      Level::Advanced => "advanced",
    }
  }

  /// Case-insensitive; Spanish tags the client historically sent are accepted too.
  pub fn parse(raw: &str) -> Option<Level> {
    match raw.trim().to_lowercase().as_str() {
      "beginner" | "principiante" | "basico" | "básico" => Some(Level::Beginner),
      "intermediate" | "intermedio" => Some(Level::Intermediate),
      "advanced" | "avanzado" => Some(Level::Advanced),
      _ => None,
    }
  }
}

/// Where did the content come from?
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ContentSource {
  Model,
  Local,
}

// --- Validated requests ---

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PracticeRequest {
  pub problem: String,
  pub correct_answer: String,
  pub user_answer: String,
  pub attempt_number: u32,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SpellingRequest {
  pub text: String,
  pub use_ai: bool,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ExerciseGenerationRequest {
  pub level: Level,
  pub topic: String,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SingleLevelRequest {
  pub topic: String,
  pub level: Level,
  pub custom_instructions: Option<String>,
}

/// Body of generate-practice.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PracticeCard {
  pub title: String,
  pub topic: String,
  pub level: Level,
  pub description: Option<String>,
  pub exercise_count: u8,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct VisualSolveRequest {
  pub image: ImageData,
}

/// A decoded-and-checked `data:` URI, kept in its base64 form for the model.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ImageData {
  pub mime_type: String,
  pub base64: String,
}

impl ImageData {
  pub fn data_uri(&self) -> String {
    format!("data:{};base64,{}", self.mime_type, self.base64)
  }
}

// --- Model outputs ---

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Exercise {
  /// Assigned server-side; anything the model sends is overwritten.
  #[serde(default)]
  pub id: String,
  pub problem: String,
  pub answer: String,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub hint: Option<String>,
}

fn check_exercises(exercises: &[Exercise]) -> Result<(), String> {
  if exercises.is_empty() {
    return Err("no exercises returned".into());
  }
  for (i, ex) in exercises.iter().enumerate() {
    if ex.problem.trim().is_empty() || ex.answer.trim().is_empty() {
      return Err(format!("exercise {} has an empty problem or answer", i));
    }
  }
  Ok(())
}

/// `{ "exercises": [...] }` as returned for generate-exercises and generate-single-level.
#[derive(Clone, Debug, Deserialize)]
pub struct GeneratedExercises {
  pub exercises: Vec<Exercise>,
}

impl StructuredOutput for GeneratedExercises {
  fn check(&self) -> Result<(), String> {
    check_exercises(&self.exercises)
  }
}

#[derive(Clone, Debug, Deserialize)]
pub struct GeneratedPractice {
  #[serde(default)]
  pub introduction: String,
  pub exercises: Vec<Exercise>,
  #[serde(default)]
  pub tips: Vec<String>,
}

impl StructuredOutput for GeneratedPractice {
  fn check(&self) -> Result<(), String> {
    check_exercises(&self.exercises)
  }
}

#[derive(Clone, Debug, Deserialize)]
pub struct GeneratedSpelling {
  pub corrected: String,
}

impl StructuredOutput for GeneratedSpelling {
  fn check(&self) -> Result<(), String> {
    if self.corrected.trim().is_empty() {
      return Err("empty correction".into());
    }
    Ok(())
  }
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct VisualSolution {
  pub problem: String,
  pub steps: Vec<String>,
  pub answer: String,
}

impl StructuredOutput for VisualSolution {
  fn check(&self) -> Result<(), String> {
    if self.answer.trim().is_empty() {
      return Err("solution has no answer".into());
    }
    if self.steps.is_empty() {
      return Err("solution has no steps".into());
    }
    Ok(())
  }
}
