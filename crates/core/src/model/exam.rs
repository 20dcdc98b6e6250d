use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

use crate::model::ids::ExamId;

//
// ─── ERRORS ────────────────────────────────────────────────────────────────────
//

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum ExamError {
    #[error("exam name cannot be empty")]
    EmptyName,

    #[error("invalid exam type {raw:?}: use lowercase letters, digits and underscores")]
    InvalidType { raw: String },

    #[error("session size must be > 0")]
    InvalidSessionSize,

    #[error("target pool size must be > 0")]
    InvalidTargetPoolSize,

    #[error("time per question must be > 0 seconds")]
    InvalidTimePerQuestion,

    #[error("passing score must be between 1 and 100")]
    InvalidPassingScore,
}

//
// ─── EXAM TYPE ─────────────────────────────────────────────────────────────────
//

const MAX_EXAM_TYPE_LEN: usize = 50;

/// Category slug used to select an exam, e.g. `solutions_architect`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ExamType(String);

impl ExamType {
    /// Parses an exam type slug.
    ///
    /// # Errors
    ///
    /// Returns `ExamError::InvalidType` if the slug is empty, too long, or contains anything
    /// other than ASCII lowercase letters, digits and underscores.
    pub fn parse(raw: impl Into<String>) -> Result<Self, ExamError> {
        let raw = raw.into();
        let valid = !raw.is_empty()
            && raw.len() <= MAX_EXAM_TYPE_LEN
            && raw
                .chars()
                .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '_');
        if valid {
            Ok(Self(raw))
        } else {
            Err(ExamError::InvalidType { raw })
        }
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Human-readable form, `cloud_practitioner` becomes `cloud practitioner`.
    #[must_use]
    pub fn display_name(&self) -> String {
        self.0.replace('_', " ")
    }
}

impl fmt::Display for ExamType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl TryFrom<String> for ExamType {
    type Error = ExamError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(value)
    }
}

impl From<ExamType> for String {
    fn from(value: ExamType) -> Self {
        value.0
    }
}

//
// ─── SETTINGS ──────────────────────────────────────────────────────────────────
//

/// Per-exam knobs for pool growth, timing and grading.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExamSettings {
    session_size: u32,
    target_pool_size: u32,
    seconds_per_question: u32,
    passing_score: u8,
}

impl Default for ExamSettings {
    /// 50 sampled questions from a pool of at least 100, 90 seconds each, pass at 70%.
    fn default() -> Self {
        Self {
            session_size: 50,
            target_pool_size: 100,
            seconds_per_question: 90,
            passing_score: 70,
        }
    }
}

impl ExamSettings {
    /// # Errors
    ///
    /// Returns `ExamError` if any size or duration is zero or the passing score is not a
    /// percentage in `1..=100`.
    pub fn new(
        session_size: u32,
        target_pool_size: u32,
        seconds_per_question: u32,
        passing_score: u8,
    ) -> Result<Self, ExamError> {
        if session_size == 0 {
            return Err(ExamError::InvalidSessionSize);
        }
        if target_pool_size == 0 {
            return Err(ExamError::InvalidTargetPoolSize);
        }
        if seconds_per_question == 0 {
            return Err(ExamError::InvalidTimePerQuestion);
        }
        if passing_score == 0 || passing_score > 100 {
            return Err(ExamError::InvalidPassingScore);
        }
        Ok(Self {
            session_size,
            target_pool_size,
            seconds_per_question,
            passing_score,
        })
    }

    #[must_use]
    pub fn session_size(&self) -> u32 {
        self.session_size
    }

    #[must_use]
    pub fn target_pool_size(&self) -> u32 {
        self.target_pool_size
    }

    #[must_use]
    pub fn seconds_per_question(&self) -> u32 {
        self.seconds_per_question
    }

    #[must_use]
    pub fn passing_score(&self) -> u8 {
        self.passing_score
    }
}

//
// ─── EXAM ──────────────────────────────────────────────────────────────────────
//

/// A certification practice exam. Its question pool is stored separately and only ever counted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Exam {
    id: ExamId,
    name: String,
    exam_type: ExamType,
    description: String,
    settings: ExamSettings,
    is_active: bool,
    created_at: DateTime<Utc>,
}

impl Exam {
    /// # Errors
    ///
    /// Returns `ExamError::EmptyName` if the trimmed name is empty.
    pub fn new(
        id: ExamId,
        name: impl Into<String>,
        exam_type: ExamType,
        description: impl Into<String>,
        settings: ExamSettings,
        created_at: DateTime<Utc>,
    ) -> Result<Self, ExamError> {
        let name = name.into().trim().to_owned();
        if name.is_empty() {
            return Err(ExamError::EmptyName);
        }
        Ok(Self {
            id,
            name,
            exam_type,
            description: description.into(),
            settings,
            is_active: true,
            created_at,
        })
    }

    #[must_use]
    pub fn with_active(mut self, is_active: bool) -> Self {
        self.is_active = is_active;
        self
    }

    #[must_use]
    pub fn id(&self) -> ExamId {
        self.id
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[must_use]
    pub fn exam_type(&self) -> &ExamType {
        &self.exam_type
    }

    #[must_use]
    pub fn description(&self) -> &str {
        &self.description
    }

    #[must_use]
    pub fn settings(&self) -> &ExamSettings {
        &self.settings
    }

    #[must_use]
    pub fn is_active(&self) -> bool {
        self.is_active
    }

    #[must_use]
    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }
}

//
// ─── TESTS ─────────────────────────────────────────────────────────────────────
//

#[cfg(test)]
mod tests {
    use super::*;
    use crate::time::fixed_now;

    #[test]
    fn exam_type_accepts_slugs() {
        let t = ExamType::parse("cloud_practitioner").unwrap();
        assert_eq!(t.as_str(), "cloud_practitioner");
        assert_eq!(t.display_name(), "cloud practitioner");
    }

    #[test]
    fn exam_type_rejects_spaces_and_uppercase() {
        assert!(matches!(
            ExamType::parse("Cloud Practitioner"),
            Err(ExamError::InvalidType { .. })
        ));
        assert!(ExamType::parse("").is_err());
    }

    #[test]
    fn exam_type_deserializes_through_validation() {
        let ok: ExamType = serde_json::from_str("\"developer\"").unwrap();
        assert_eq!(ok.as_str(), "developer");
        assert!(serde_json::from_str::<ExamType>("\"Dev Ops\"").is_err());
    }

    #[test]
    fn default_settings_match_practice_exam_shape() {
        let s = ExamSettings::default();
        assert_eq!(s.session_size(), 50);
        assert_eq!(s.target_pool_size(), 100);
        assert_eq!(s.seconds_per_question(), 90);
        assert_eq!(s.passing_score(), 70);
    }

    #[test]
    fn settings_reject_out_of_range_values() {
        assert_eq!(
            ExamSettings::new(0, 100, 90, 70),
            Err(ExamError::InvalidSessionSize)
        );
        assert_eq!(
            ExamSettings::new(50, 100, 0, 70),
            Err(ExamError::InvalidTimePerQuestion)
        );
        assert_eq!(
            ExamSettings::new(50, 100, 90, 101),
            Err(ExamError::InvalidPassingScore)
        );
    }

    #[test]
    fn exam_requires_name() {
        let err = Exam::new(
            ExamId::new(1),
            "   ",
            ExamType::parse("developer").unwrap(),
            "",
            ExamSettings::default(),
            fixed_now(),
        )
        .unwrap_err();
        assert_eq!(err, ExamError::EmptyName);
    }
}
