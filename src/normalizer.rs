//! Response normalization: local answer grading and wrapping of model results.

use tracing::debug;
use uuid::Uuid;

use crate::domain::{ContentSource, Exercise, GeneratedPractice, Level, PracticeCard, PracticeRequest};
use crate::error::{ApiError, GatewayError};
use crate::protocol::{AnswerFeedback, ExerciseSetOut, PracticeSessionOut};
use crate::task::Operation;

pub const SUCCESS_MESSAGE: &str = "¡Excelente! Tu respuesta es correcta.";
pub const FIRST_ATTEMPT_HINT: &str = "Revisa tu respuesta con calma e inténtalo de nuevo.";
pub const SECOND_ATTEMPT_HINT: &str =
  "Recuerda el orden de las operaciones: primero paréntesis, luego multiplicaciones y divisiones, y al final sumas y restas.";
pub const DEFAULT_HINT: &str = "Verifica cada paso de tu procedimiento, uno por uno.";

/// Trim surrounding whitespace and case-fold.
pub fn normalize_answer(s: &str) -> String {
  s.trim().to_lowercase()
}

pub fn answers_match(correct: &str, given: &str) -> bool {
  normalize_answer(correct) == normalize_answer(given)
}

/// Three buckets: exactly 1, exactly 2, everything else.
pub fn hint_for_attempt(attempt_number: u32) -> &'static str {
  match attempt_number {
    1 => FIRST_ATTEMPT_HINT,
    2 => SECOND_ATTEMPT_HINT,
    _ => DEFAULT_HINT,
  }
}

pub fn grade(req: &PracticeRequest) -> AnswerFeedback {
  let is_correct = answers_match(&req.correct_answer, &req.user_answer);
  debug!(target: "pipeline", attempt = req.attempt_number, is_correct, "Answer graded");
  if is_correct {
    AnswerFeedback { is_correct, message: SUCCESS_MESSAGE.into() }
  } else {
    AnswerFeedback { is_correct, message: hint_for_attempt(req.attempt_number).into() }
  }
}

/// Map a gateway failure to the operation's error envelope.
pub fn gateway_failure(operation: Operation, source: GatewayError) -> ApiError {
  ApiError::Gateway { operation, source }
}

/// Ids are always assigned here, whatever the model sent.
fn with_ids(mut exercises: Vec<Exercise>) -> Vec<Exercise> {
  for ex in exercises.iter_mut() {
    ex.id = Uuid::new_v4().to_string();
    ex.problem = ex.problem.trim().to_string();
    ex.answer = ex.answer.trim().to_string();
    ex.hint = ex.hint.take().map(|h| h.trim().to_string()).filter(|h| !h.is_empty());
  }
  exercises
}

pub fn exercise_set(level: Level, topic: &str, exercises: Vec<Exercise>, source: ContentSource) -> ExerciseSetOut {
  ExerciseSetOut { level, topic: topic.to_string(), exercises: with_ids(exercises), source }
}

/// A model reply must carry at least as many exercises as the card asked for.
pub fn ensure_exercise_count(card: &PracticeCard, generated: GeneratedPractice) -> Result<GeneratedPractice, GatewayError> {
  let wanted = card.exercise_count as usize;
  if generated.exercises.len() < wanted {
    return Err(GatewayError::MalformedOutput(format!(
      "expected {} exercises, got {}",
      wanted,
      generated.exercises.len()
    )));
  }
  Ok(generated)
}

pub fn practice_session(card: &PracticeCard, generated: GeneratedPractice, source: ContentSource) -> PracticeSessionOut {
  let mut exercises = generated.exercises;
  exercises.truncate(card.exercise_count as usize);
  PracticeSessionOut {
    title: card.title.clone(),
    topic: card.topic.clone(),
    level: card.level,
    introduction: generated.introduction.trim().to_string(),
    exercises: with_ids(exercises),
    tips: generated.tips.into_iter().map(|t| t.trim().to_string()).filter(|t| !t.is_empty()).collect(),
    source,
  }
}
