//! Local content used when no model is configured: a small arithmetic
//! exercise generator scaled by level. Keeps the app usable offline.

use rand::Rng;

use crate::domain::{Exercise, GeneratedPractice, Level, PracticeCard};

/// Operation family guessed from a free-text topic.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Family {
  Addition,
  Subtraction,
  Multiplication,
  Division,
  Fractions,
  Mixed,
}

impl Family {
  pub fn from_topic(topic: &str) -> Family {
    let t = topic.to_lowercase();
    if t.contains("fracci") || t.contains("fraction") {
      Family::Fractions
    } else if t.contains("multipl") || t.contains("tabla") {
      Family::Multiplication
    } else if t.contains("divi") {
      Family::Division
    } else if t.contains("resta") || t.contains("sustrac") || t.contains("subtract") {
      Family::Subtraction
    } else if t.contains("suma") || t.contains("adici") || t.contains("addition") {
      Family::Addition
    } else {
      Family::Mixed
    }
  }
}

/// Largest operand for sums/differences at each level.
fn max_operand(level: Level) -> u32 {
  match level {
    Level::Beginner => 10,
    Level::Intermediate => 50,
    Level::Advanced => 200,
  }
}

/// Largest factor/divisor at each level.
fn max_factor(level: Level) -> u32 {
  match level {
    Level::Beginner => 5,
    Level::Intermediate => 10,
    Level::Advanced => 15,
  }
}

fn exercise(problem: String, answer: String, hint: &str) -> Exercise {
  Exercise { id: String::new(), problem, answer, hint: Some(hint.to_string()) }
}

fn one(family: Family, level: Level, rng: &mut impl Rng) -> Exercise {
  match family {
    Family::Addition => {
      let (a, b) = (rng.gen_range(1..=max_operand(level)), rng.gen_range(1..=max_operand(level)));
      exercise(format!("{} + {}", a, b), (a + b).to_string(), "Empieza por el número más grande y cuenta hacia adelante.")
    }
    Family::Subtraction => {
      let (x, y) = (rng.gen_range(1..=max_operand(level)), rng.gen_range(1..=max_operand(level)));
      let (a, b) = if x >= y { (x, y) } else { (y, x) };
      exercise(format!("{} - {}", a, b), (a - b).to_string(), "Piensa cuánto le falta al número pequeño para llegar al grande.")
    }
    Family::Multiplication => {
      let (a, b) = (rng.gen_range(2..=max_factor(level)), rng.gen_range(2..=max_factor(level)));
      exercise(format!("{} × {}", a, b), (a * b).to_string(), "Multiplicar es sumar el mismo número varias veces.")
    }
    Family::Division => {
      let (divisor, quotient) = (rng.gen_range(2..=max_factor(level)), rng.gen_range(1..=max_factor(level)));
      exercise(
        format!("{} ÷ {}", divisor * quotient, divisor),
        quotient.to_string(),
        "¿Qué número multiplicado por el divisor da el dividendo?",
      )
    }
    Family::Fractions => {
      let denominator = rng.gen_range(2..=max_factor(level).min(12));
      let (a, b) = (rng.gen_range(1..=denominator), rng.gen_range(1..=denominator * 2));
      exercise(
        format!("{}/{} + {}/{}", a, denominator, b, denominator),
        format!("{}/{}", a + b, denominator),
        "Con el mismo denominador, solo suma los numeradores.",
      )
    }
    Family::Mixed => {
      let pick = match rng.gen_range(0..4) {
        0 => Family::Addition,
        1 => Family::Subtraction,
        2 => Family::Multiplication,
        _ => Family::Division,
      };
      one(pick, level, rng)
    }
  }
}

pub fn local_exercises(topic: &str, level: Level, count: usize, rng: &mut impl Rng) -> Vec<Exercise> {
  let family = Family::from_topic(topic);
  (0..count).map(|_| one(family, level, rng)).collect()
}

pub fn local_practice(card: &PracticeCard, rng: &mut impl Rng) -> GeneratedPractice {
  GeneratedPractice {
    introduction: format!("¡Hola! Vamos a practicar {}. Resuelve cada ejercicio con calma.", card.topic),
    exercises: local_exercises(&card.topic, card.level, card.exercise_count as usize, rng),
    tips: vec![
      "Lee el problema dos veces antes de empezar.".into(),
      "Comprueba tu resultado haciendo la operación inversa.".into(),
    ],
  }
}
