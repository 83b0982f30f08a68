//! The per-operation pipeline: validate → build task → gateway → normalize.
//!
//! Handlers in `routes::http` are thin wrappers around these functions.
//! Nothing here keeps state between calls.

use tracing::{debug, info, instrument};

use crate::domain::{
  ContentSource, GeneratedExercises, GeneratedPractice, GeneratedSpelling, VisualSolution,
};
use crate::error::ApiError;
use crate::normalizer::{ensure_exercise_count, exercise_set, gateway_failure, grade, practice_session};
use crate::protocol::{AnswerFeedback, ExerciseSetOut, PracticeSessionOut, SpellingOut};
use crate::seeds::{local_exercises, local_practice};
use crate::state::AppState;
use crate::task::{self, Operation};
use crate::util::collapse_whitespace;
use crate::validate;

const LOCAL_EXERCISE_COUNT: usize = 5;
const LOCAL_SINGLE_LEVEL_COUNT: usize = 3;

#[instrument(level = "info", skip_all, fields(body_len = body.len()))]
pub fn check_answer(body: &[u8]) -> Result<AnswerFeedback, ApiError> {
  let req = validate::practice_request(body)?;
  let feedback = grade(&req);
  info!(target: "pipeline", attempt = req.attempt_number, is_correct = feedback.is_correct, "check-answer evaluated");
  Ok(feedback)
}

#[instrument(level = "info", skip_all, fields(body_len = body.len()))]
pub async fn correct_spelling(state: &AppState, body: &[u8]) -> Result<SpellingOut, ApiError> {
  let req = validate::spelling_request(body)?;

  let (corrected, source) = match (&state.gateway, req.use_ai) {
    (Some(gateway), true) => {
      let task = task::spelling_task(&state.prompts, &req);
      let out: GeneratedSpelling = gateway
        .run(&task)
        .await
        .map_err(|e| gateway_failure(Operation::CorrectSpelling, e))?;
      (out.corrected.trim().to_string(), ContentSource::Model)
    }
    (None, true) => {
      debug!(target: "pipeline", "useAI requested without a model; using local correction");
      (spelling_local(&req.text), ContentSource::Local)
    }
    (_, false) => (spelling_local(&req.text), ContentSource::Local),
  };

  Ok(SpellingOut { changed: corrected != req.text, original: req.text, corrected, source })
}

#[instrument(level = "info", skip_all, fields(body_len = body.len()))]
pub async fn generate_exercises(state: &AppState, body: &[u8]) -> Result<ExerciseSetOut, ApiError> {
  let req = validate::exercise_generation_request(body)?;

  let out = match &state.gateway {
    Some(gateway) => {
      let task = task::exercises_task(&state.prompts, &req);
      let generated: GeneratedExercises = gateway
        .run(&task)
        .await
        .map_err(|e| gateway_failure(Operation::GenerateExercises, e))?;
      exercise_set(req.level, &req.topic, generated.exercises, ContentSource::Model)
    }
    None => {
      let exercises = local_exercises(&req.topic, req.level, LOCAL_EXERCISE_COUNT, &mut rand::thread_rng());
      exercise_set(req.level, &req.topic, exercises, ContentSource::Local)
    }
  };
  info!(target: "pipeline", level = req.level.as_str(), count = out.exercises.len(), source = ?out.source, "generate-exercises served");
  Ok(out)
}

#[instrument(level = "info", skip_all, fields(body_len = body.len()))]
pub async fn generate_single_level(state: &AppState, body: &[u8]) -> Result<ExerciseSetOut, ApiError> {
  let req = validate::single_level_request(body)?;

  let out = match &state.gateway {
    Some(gateway) => {
      let task = task::single_level_task(&state.prompts, &req);
      let generated: GeneratedExercises = gateway
        .run(&task)
        .await
        .map_err(|e| gateway_failure(Operation::GenerateSingleLevel, e))?;
      exercise_set(req.level, &req.topic, generated.exercises, ContentSource::Model)
    }
    None => {
      let exercises = local_exercises(&req.topic, req.level, LOCAL_SINGLE_LEVEL_COUNT, &mut rand::thread_rng());
      exercise_set(req.level, &req.topic, exercises, ContentSource::Local)
    }
  };
  info!(target: "pipeline", level = req.level.as_str(), count = out.exercises.len(), source = ?out.source, "generate-single-level served");
  Ok(out)
}

#[instrument(level = "info", skip_all, fields(body_len = body.len()))]
pub async fn generate_practice(state: &AppState, body: &[u8]) -> Result<PracticeSessionOut, ApiError> {
  let card = validate::practice_card(body)?;

  let out = match &state.gateway {
    Some(gateway) => {
      let task = task::practice_task(&state.prompts, &card);
      let generated: GeneratedPractice = gateway
        .run(&task)
        .await
        .and_then(|g| ensure_exercise_count(&card, g))
        .map_err(|e| gateway_failure(Operation::GeneratePractice, e))?;
      practice_session(&card, generated, ContentSource::Model)
    }
    None => {
      let generated = local_practice(&card, &mut rand::thread_rng());
      practice_session(&card, generated, ContentSource::Local)
    }
  };
  info!(target: "pipeline", count = out.exercises.len(), source = ?out.source, "generate-practice served");
  Ok(out)
}

#[instrument(level = "info", skip_all, fields(body_len = body.len()))]
pub async fn solve_visually(state: &AppState, body: &[u8]) -> Result<VisualSolution, ApiError> {
  let req = validate::visual_solve_request(body)?;
  let gateway = state.gateway.as_ref().ok_or(ApiError::Unavailable(Operation::SolveVisually))?;

  let task = task::visual_task(&state.prompts, &req);
  let solution: VisualSolution = gateway
    .run(&task)
    .await
    .map_err(|e| gateway_failure(Operation::SolveVisually, e))?;
  info!(target: "pipeline", mime = %req.image.mime_type, steps = solution.steps.len(), "solve-visually served");
  Ok(solution)
}

// -------- Local fallbacks --------

/// Tidy-up without a model: collapse whitespace, capitalize the first
/// letter, make sure the text ends with punctuation.
pub fn spelling_local(text: &str) -> String {
  let s = collapse_whitespace(text);
  let mut chars = s.chars();
  let mut out: String = match chars.next() {
    Some(first) => first.to_uppercase().chain(chars).collect(),
    None => return String::new(),
  };
  let ends_with_punct = out.chars().last().map_or(false, |c| matches!(c, '.' | '!' | '?' | '…' | ':' | ';'));
  let ends_with_digit = out.chars().last().map_or(false, |c| c.is_ascii_digit());
  if !ends_with_punct && !ends_with_digit {
    out.push('.');
  }
  out
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn local_spelling_tidies_text() {
    assert_eq!(spelling_local("  dos   mas   tres es cinco "), "Dos mas tres es cinco.");
    assert_eq!(spelling_local("¿cuánto es?"), "¿cuánto es?");
    assert_eq!(spelling_local("ñu"), "Ñu.");
    assert_eq!(spelling_local("resultado 12"), "Resultado 12");
  }
}
