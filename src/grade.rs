use std::fmt;

use serde::Serialize;

/// Ordinal letter-grade bands, lowest first so the derived `Ord` follows
/// the scale.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum LetterGrade {
    Unsatisfactory,
    Satisfactory,
    Good,
    Excellent,
}

impl LetterGrade {
    pub fn label(self) -> &'static str {
        match self {
            LetterGrade::Excellent => "отлично",
            LetterGrade::Good => "хорошо",
            LetterGrade::Satisfactory => "удовлетворительно",
            LetterGrade::Unsatisfactory => "неудовлетворительно",
        }
    }
}

impl fmt::Display for LetterGrade {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Maps a 0–100 score to a letter grade.
///
/// | Range     | Grade          |
/// |-----------|----------------|
/// | >= 87     | Excellent      |
/// | >= 74     | Good           |
/// | >= 61     | Satisfactory   |
/// | < 61      | Unsatisfactory |
///
/// Out-of-range input is clamped: anything above 100 lands in the top band,
/// anything below 0 (and NaN) in the bottom one.
pub fn classify(score: f64) -> LetterGrade {
    if score.is_nan() {
        return LetterGrade::Unsatisfactory;
    }
    match score.clamp(0.0, 100.0) {
        s if s >= 87.0 => LetterGrade::Excellent,
        s if s >= 74.0 => LetterGrade::Good,
        s if s >= 61.0 => LetterGrade::Satisfactory,
        _ => LetterGrade::Unsatisfactory,
    }
}

/// Rescales a raw score against its maximum onto 0–100.
pub fn normalize(score: f64, max_score: f64) -> f64 {
    if max_score <= 0.0 {
        return 0.0;
    }
    score / max_score * 100.0
}

/// Rounds a value for display, half away from zero.
pub fn display_round(value: f64) -> i64 {
    value.round() as i64
}
