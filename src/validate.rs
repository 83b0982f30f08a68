//! Input validation: raw request bytes → typed requests.
//!
//! Each endpoint has an explicit schema. Every problem found is reported as a
//! `FieldError`, unknown fields included, so clients get the full list in one
//! 400 response.

use base64::Engine;
use serde_json::{Map, Value};

use crate::domain::{
  ExerciseGenerationRequest, ImageData, Level, PracticeCard, PracticeRequest, SingleLevelRequest, SpellingRequest,
  VisualSolveRequest,
};
use crate::error::{ApiError, FieldError};

const MAX_TEXT_CHARS: usize = 2_000;
const DEFAULT_EXERCISE_COUNT: u8 = 5;
const MAX_EXERCISE_COUNT: u64 = 20;

/// Parse the body as a JSON object.
pub fn parse_object(body: &[u8]) -> Result<Map<String, Value>, ApiError> {
  match serde_json::from_slice::<Value>(body) {
    Ok(Value::Object(map)) => Ok(map),
    Ok(_) => Err(ApiError::validation("body", "se esperaba un objeto JSON")),
    Err(e) => Err(ApiError::validation("body", format!("JSON mal formado: {}", e))),
  }
}

/// Collects field errors while pulling typed values out of an object.
struct Fields<'a> {
  obj: &'a Map<String, Value>,
  errors: Vec<FieldError>,
}

impl<'a> Fields<'a> {
  fn new(obj: &'a Map<String, Value>, allowed: &[&str]) -> Self {
    let mut errors = Vec::new();
    let mut unknown: Vec<&String> = obj.keys().filter(|k| !allowed.contains(&k.as_str())).collect();
    unknown.sort();
    for key in unknown {
      errors.push(FieldError::new(key.as_str(), "campo no reconocido"));
    }
    Self { obj, errors }
  }

  fn fail(&mut self, field: &str, message: impl Into<String>) {
    self.errors.push(FieldError::new(field, message));
  }

  fn text(&mut self, field: &str, required: bool) -> Option<String> {
    let obj = self.obj;
    match obj.get(field) {
      None | Some(Value::Null) => {
        if required {
          self.fail(field, "es obligatorio");
        }
        None
      }
      Some(Value::String(s)) => {
        let trimmed = s.trim();
        if trimmed.is_empty() {
          if required {
            self.fail(field, "no puede estar vacío");
          }
          None
        } else if trimmed.chars().count() > MAX_TEXT_CHARS {
          self.fail(field, format!("no puede superar {} caracteres", MAX_TEXT_CHARS));
          None
        } else {
          Some(trimmed.to_string())
        }
      }
      Some(_) => {
        self.fail(field, "debe ser texto");
        None
      }
    }
  }

  fn required_text(&mut self, field: &str) -> Option<String> {
    self.text(field, true)
  }

  fn optional_text(&mut self, field: &str) -> Option<String> {
    self.text(field, false)
  }

  /// Raw string, untrimmed; for answers that are compared after normalization.
  fn required_raw(&mut self, field: &str) -> Option<String> {
    let obj = self.obj;
    match obj.get(field) {
      None | Some(Value::Null) => {
        self.fail(field, "es obligatorio");
        None
      }
      Some(Value::String(s)) if s.trim().is_empty() => {
        self.fail(field, "no puede estar vacío");
        None
      }
      Some(Value::String(s)) if s.chars().count() > MAX_TEXT_CHARS => {
        self.fail(field, format!("no puede superar {} caracteres", MAX_TEXT_CHARS));
        None
      }
      Some(Value::String(s)) => Some(s.clone()),
      Some(_) => {
        self.fail(field, "debe ser texto");
        None
      }
    }
  }

  fn required_bool(&mut self, field: &str) -> Option<bool> {
    let obj = self.obj;
    match obj.get(field) {
      Some(Value::Bool(b)) => Some(*b),
      None | Some(Value::Null) => {
        self.fail(field, "es obligatorio");
        None
      }
      Some(_) => {
        self.fail(field, "debe ser verdadero o falso");
        None
      }
    }
  }

  /// Integer in `min..=max`. Floats and numeric strings are rejected.
  fn int_in_range(&mut self, field: &str, min: u64, max: u64, required: bool) -> Option<u64> {
    let obj = self.obj;
    match obj.get(field) {
      None | Some(Value::Null) => {
        if required {
          self.fail(field, "es obligatorio");
        }
        None
      }
      Some(Value::Number(n)) => match n.as_u64() {
        Some(v) if (min..=max).contains(&v) => Some(v),
        _ => {
          self.fail(field, format!("debe ser un entero entre {} y {}", min, max));
          None
        }
      },
      Some(_) => {
        self.fail(field, "debe ser un número entero");
        None
      }
    }
  }

  fn level(&mut self, field: &str) -> Option<Level> {
    let raw = self.required_text(field)?;
    let level = Level::parse(&raw);
    if level.is_none() {
      let allowed: Vec<&str> = Level::ALL.iter().map(|l| l.as_str()).collect();
      self.fail(field, format!("debe ser uno de: {}", allowed.join(", ")));
    }
    level
  }

  /// Not subject to the text length cap; the body limit bounds photos.
  fn data_uri(&mut self, field: &str) -> Option<ImageData> {
    let obj = self.obj;
    let raw = match obj.get(field) {
      Some(Value::String(s)) if !s.trim().is_empty() => s.trim(),
      Some(Value::String(_)) => {
        self.fail(field, "no puede estar vacío");
        return None;
      }
      None | Some(Value::Null) => {
        self.fail(field, "es obligatorio");
        return None;
      }
      Some(_) => {
        self.fail(field, "debe ser texto");
        return None;
      }
    };
    match parse_image_data_uri(raw) {
      Ok(img) => Some(img),
      Err(msg) => {
        self.fail(field, msg);
        None
      }
    }
  }

  fn is_clean(&self) -> bool {
    self.errors.is_empty()
  }

  fn into_error(self) -> ApiError {
    ApiError::Validation(self.errors)
  }
}

pub fn practice_request(body: &[u8]) -> Result<PracticeRequest, ApiError> {
  let obj = parse_object(body)?;
  let mut f = Fields::new(&obj, &["problem", "correctAnswer", "userAnswer", "attemptNumber"]);
  let problem = f.required_text("problem");
  let correct_answer = f.required_raw("correctAnswer");
  let user_answer = f.required_raw("userAnswer");
  let attempt_number = f.int_in_range("attemptNumber", 1, u32::MAX as u64, true);

  match (problem, correct_answer, user_answer, attempt_number) {
    (Some(problem), Some(correct_answer), Some(user_answer), Some(attempt)) if f.is_clean() => Ok(PracticeRequest {
      problem,
      correct_answer,
      user_answer,
      attempt_number: attempt as u32,
    }),
    _ => Err(f.into_error()),
  }
}

pub fn spelling_request(body: &[u8]) -> Result<SpellingRequest, ApiError> {
  let obj = parse_object(body)?;
  let mut f = Fields::new(&obj, &["text", "useAI"]);
  let text = f.required_text("text");
  let use_ai = f.required_bool("useAI");

  match (text, use_ai) {
    (Some(text), Some(use_ai)) if f.is_clean() => Ok(SpellingRequest { text, use_ai }),
    _ => Err(f.into_error()),
  }
}

pub fn exercise_generation_request(body: &[u8]) -> Result<ExerciseGenerationRequest, ApiError> {
  let obj = parse_object(body)?;
  let mut f = Fields::new(&obj, &["level", "topic"]);
  let level = f.level("level");
  let topic = f.required_text("topic");

  match (level, topic) {
    (Some(level), Some(topic)) if f.is_clean() => Ok(ExerciseGenerationRequest { level, topic }),
    _ => Err(f.into_error()),
  }
}

pub fn single_level_request(body: &[u8]) -> Result<SingleLevelRequest, ApiError> {
  let obj = parse_object(body)?;
  let mut f = Fields::new(&obj, &["topic", "level", "customInstructions"]);
  let topic = f.required_text("topic");
  let level = f.level("level");
  let custom_instructions = f.optional_text("customInstructions");

  match (topic, level) {
    (Some(topic), Some(level)) if f.is_clean() => Ok(SingleLevelRequest { topic, level, custom_instructions }),
    _ => Err(f.into_error()),
  }
}

pub fn practice_card(body: &[u8]) -> Result<PracticeCard, ApiError> {
  let obj = parse_object(body)?;
  let mut f = Fields::new(&obj, &["title", "topic", "level", "description", "exerciseCount"]);
  let title = f.required_text("title");
  let topic = f.required_text("topic");
  let level = f.level("level");
  let description = f.optional_text("description");
  let exercise_count = f.int_in_range("exerciseCount", 1, MAX_EXERCISE_COUNT, false);

  match (title, topic, level) {
    (Some(title), Some(topic), Some(level)) if f.is_clean() => Ok(PracticeCard {
      title,
      topic,
      level,
      description,
      exercise_count: exercise_count.map(|n| n as u8).unwrap_or(DEFAULT_EXERCISE_COUNT),
    }),
    _ => Err(f.into_error()),
  }
}

pub fn visual_solve_request(body: &[u8]) -> Result<VisualSolveRequest, ApiError> {
  let obj = parse_object(body)?;
  let mut f = Fields::new(&obj, &["photoDataUri"]);
  let image = f.data_uri("photoDataUri");

  match image {
    Some(image) if f.is_clean() => Ok(VisualSolveRequest { image }),
    _ => Err(f.into_error()),
  }
}

/// `data:image/<subtype>[;param...];base64,<payload>` with a payload that decodes.
pub fn parse_image_data_uri(raw: &str) -> Result<ImageData, String> {
  let rest = raw
    .strip_prefix("data:")
    .ok_or_else(|| "debe ser un data URI (data:image/...;base64,...)".to_string())?;
  let (header, payload) = rest.split_once(',').ok_or_else(|| "falta la coma del data URI".to_string())?;
  let header = header
    .strip_suffix(";base64")
    .ok_or_else(|| "el data URI debe estar codificado en base64".to_string())?;
  let mime_type = header.split(';').next().unwrap_or_default().trim().to_lowercase();
  match mime_type.strip_prefix("image/") {
    Some(subtype) if !subtype.is_empty() => {}
    _ => return Err(format!("tipo de contenido no soportado: '{}'", mime_type)),
  }
  if payload.is_empty() {
    return Err("la imagen está vacía".into());
  }
  base64::engine::general_purpose::STANDARD
    .decode(payload)
    .map_err(|_| "la imagen no es base64 válido".to_string())?;
  Ok(ImageData { mime_type, base64: payload.to_string() })
}

#[cfg(test)]
mod tests {
  use super::*;
  use pretty_assertions::assert_eq;

  fn fields_of(err: ApiError) -> Vec<String> {
    match err {
      ApiError::Validation(errors) => errors.into_iter().map(|e| e.field).collect(),
      other => panic!("expected validation error, got {:?}", other),
    }
  }

  #[test]
  fn practice_request_happy_path_keeps_raw_answers() {
    let body = br#"{"problem": "1/3+6/3", "correctAnswer": "7/3", "userAnswer": " 7/3 ", "attemptNumber": 1}"#;
    let req = practice_request(body).unwrap();
    assert_eq!(
      req,
      PracticeRequest {
        problem: "1/3+6/3".into(),
        correct_answer: "7/3".into(),
        user_answer: " 7/3 ".into(),
        attempt_number: 1,
      }
    );
  }

  #[test]
  fn missing_user_answer_is_reported() {
    let body = br#"{"problem": "2+2", "correctAnswer": "4", "attemptNumber": 1}"#;
    assert_eq!(fields_of(practice_request(body).unwrap_err()), vec!["userAnswer"]);
  }

  #[test]
  fn malformed_json_is_reported_on_body() {
    let err = practice_request(br#"{"problem": "2+2", "#).unwrap_err();
    assert_eq!(fields_of(err), vec!["body"]);
  }

  #[test]
  fn non_object_body_is_rejected() {
    assert_eq!(fields_of(practice_request(b"[1, 2]").unwrap_err()), vec!["body"]);
  }

  #[test]
  fn attempt_number_must_be_positive_integer() {
    for bad in ["0", "-1", "1.5", "\"1\"", "true"] {
      let body = format!(r#"{{"problem": "p", "correctAnswer": "a", "userAnswer": "b", "attemptNumber": {}}}"#, bad);
      assert_eq!(fields_of(practice_request(body.as_bytes()).unwrap_err()), vec!["attemptNumber"], "input {}", bad);
    }
  }

  #[test]
  fn all_problems_reported_together() {
    let body = br#"{"problem": "  ", "correctAnswer": 4, "extra": 1}"#;
    let fields = fields_of(practice_request(body).unwrap_err());
    assert_eq!(fields, vec!["extra", "problem", "correctAnswer", "userAnswer", "attemptNumber"]);
  }

  #[test]
  fn spelling_requires_boolean_flag() {
    let err = spelling_request(br#"{"text": "dies mas dos", "useAI": "yes"}"#).unwrap_err();
    assert_eq!(fields_of(err), vec!["useAI"]);
    let ok = spelling_request(br#"{"text": " dies mas dos ", "useAI": false}"#).unwrap();
    assert_eq!(ok, SpellingRequest { text: "dies mas dos".into(), use_ai: false });
  }

  #[test]
  fn exercise_generation_rejects_unknown_level() {
    let err = exercise_generation_request(br#"{"level": "expert", "topic": "sumas"}"#).unwrap_err();
    assert_eq!(fields_of(err), vec!["level"]);
    let ok = exercise_generation_request(br#"{"level": "Intermedio", "topic": "sumas"}"#).unwrap();
    assert_eq!(ok.level, Level::Intermediate);
  }

  #[test]
  fn single_level_requires_topic_and_level() {
    let err = single_level_request(br#"{"customInstructions": "con dibujos"}"#).unwrap_err();
    assert_eq!(fields_of(err), vec!["topic", "level"]);
    let ok = single_level_request(br#"{"topic": "restas", "level": "beginner", "customInstructions": "  "}"#).unwrap();
    assert_eq!(ok.custom_instructions, None);
  }

  #[test]
  fn practice_card_defaults_and_bounds_count() {
    let ok = practice_card(r#"{"title": "Tablas", "topic": "multiplicación", "level": "advanced"}"#.as_bytes()).unwrap();
    assert_eq!(ok.exercise_count, 5);
    let err = practice_card(br#"{"title": "Tablas", "topic": "x", "level": "advanced", "exerciseCount": 50}"#).unwrap_err();
    assert_eq!(fields_of(err), vec!["exerciseCount"]);
  }

  #[test]
  fn practice_card_rejects_arbitrary_shapes() {
    let err = practice_card(br#"{"front": "2+2", "back": "4"}"#).unwrap_err();
    assert_eq!(fields_of(err), vec!["back", "front", "title", "topic", "level"]);
  }

  #[test]
  fn data_uri_validation() {
    let img = parse_image_data_uri("data:image/PNG;base64,aGVsbG8=").unwrap();
    assert_eq!(img.mime_type, "image/png");
    assert_eq!(img.base64, "aGVsbG8=");

    assert!(parse_image_data_uri("http://example.com/a.png").is_err());
    assert!(parse_image_data_uri("data:text/plain;base64,aGVsbG8=").is_err());
    assert!(parse_image_data_uri("data:image/png,aGVsbG8=").is_err());
    assert!(parse_image_data_uri("data:image/png;base64,").is_err());
    assert!(parse_image_data_uri("data:image/png;base64,@@not-base64@@").is_err());
  }

  #[test]
  fn large_photos_are_not_capped_like_text() {
    let payload = base64::engine::general_purpose::STANDARD.encode(vec![7u8; 30_000]);
    let body = serde_json::json!({ "photoDataUri": format!("data:image/jpeg;base64,{}", payload) }).to_string();
    let req = visual_solve_request(body.as_bytes()).unwrap();
    assert_eq!(req.image.mime_type, "image/jpeg");
  }

  #[test]
  fn visual_request_reports_bad_uri_on_field() {
    let err = visual_solve_request(br#"{"photoDataUri": "not a uri"}"#).unwrap_err();
    assert_eq!(fields_of(err), vec!["photoDataUri"]);
  }
}
