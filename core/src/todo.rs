//! The todo entity and its validation rules.
//!
//! # Design
//! `Todo` keeps its fields private so every mutation goes through
//! `apply` / `toggle`, which revalidate input and bump `updated_at`.
//! Request payloads arrive as loosely typed JSON; `NewTodo::from_value` and
//! `TodoPatch::from_value` are the single place where that input is turned
//! into typed values, so type mismatches surface as `ValidationError`s.

use chrono::{DateTime, SubsecRound, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

use crate::error::{TodoError, ValidationError};

/// Longest accepted description, in characters, after trimming.
pub const MAX_DESCRIPTION_LEN: usize = 500;

/// A single todo record as persisted and returned by the service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Todo {
    id: String,
    description: String,
    completed: bool,
    #[serde(with = "timestamp")]
    created_at: DateTime<Utc>,
    #[serde(with = "timestamp")]
    updated_at: DateTime<Utc>,
}

impl Todo {
    /// Build a fresh, incomplete todo with a random id.
    pub fn new(description: &str) -> Result<Self, ValidationError> {
        let description = validate_description(description)?;
        let now = now_millis();
        Ok(Self {
            id: Uuid::new_v4().to_string(),
            description,
            completed: false,
            created_at: now,
            updated_at: now,
        })
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn completed(&self) -> bool {
        self.completed
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn updated_at(&self) -> DateTime<Utc> {
        self.updated_at
    }

    /// Apply the fields present in `patch`, then bump `updated_at`.
    ///
    /// Nothing is changed if the description fails validation.
    pub fn apply(&mut self, patch: &TodoPatch) -> Result<(), ValidationError> {
        let description = patch
            .description
            .as_deref()
            .map(validate_description)
            .transpose()?;
        if let Some(description) = description {
            self.description = description;
        }
        if let Some(completed) = patch.completed {
            self.completed = completed;
        }
        self.touch();
        Ok(())
    }

    /// Flip the completion state and bump `updated_at`.
    pub fn toggle(&mut self) {
        self.completed = !self.completed;
        self.touch();
    }

    /// Refresh `updated_at`. The new value is always strictly later than the
    /// previous one, even when the clock has not advanced a millisecond.
    fn touch(&mut self) {
        let now = now_millis();
        self.updated_at = if now > self.updated_at {
            now
        } else {
            self.updated_at + chrono::Duration::milliseconds(1)
        };
    }
}

/// Payload for creating a todo.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewTodo {
    pub description: String,
}

impl NewTodo {
    /// Extract and validate `description` from a JSON request body.
    pub fn from_value(value: &Value) -> Result<Self, ValidationError> {
        let description = match value.get("description") {
            Some(field) => validate_description_value(field)?,
            None => return Err(ValidationError::new("description", "is required")),
        };
        Ok(Self { description })
    }
}

/// The set of fields an update may change. Omitted fields stay as they are.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TodoPatch {
    pub description: Option<String>,
    pub completed: Option<bool>,
}

impl TodoPatch {
    pub fn description(description: impl Into<String>) -> Self {
        Self {
            description: Some(description.into()),
            completed: None,
        }
    }

    pub fn completed(completed: bool) -> Self {
        Self {
            description: None,
            completed: Some(completed),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.description.is_none() && self.completed.is_none()
    }

    /// Build a patch from a JSON request body.
    ///
    /// A body that is not an object, is empty, or names no recognized field
    /// is an `InvalidArgument`. A recognized field with the wrong type is a
    /// `ValidationError`. Unrecognized keys are ignored.
    pub fn from_value(value: &Value) -> Result<Self, TodoError> {
        let map = value.as_object().ok_or_else(|| {
            TodoError::InvalidArgument("updates must be a JSON object".to_string())
        })?;
        if map.is_empty() {
            return Err(TodoError::InvalidArgument(
                "updates must not be empty".to_string(),
            ));
        }

        let description = match map.get("description") {
            None => None,
            Some(field) => Some(validate_description_value(field)?),
        };
        let completed = match map.get("completed") {
            None => None,
            Some(Value::Bool(completed)) => Some(*completed),
            Some(_) => {
                return Err(ValidationError::new("completed", "must be a boolean").into());
            }
        };

        let patch = Self {
            description,
            completed,
        };
        if patch.is_empty() {
            return Err(TodoError::InvalidArgument(
                "updates must include description or completed".to_string(),
            ));
        }
        Ok(patch)
    }
}

/// Trim `description` and check it is non-empty and at most
/// `MAX_DESCRIPTION_LEN` characters. Returns the trimmed text.
pub fn validate_description(description: &str) -> Result<String, ValidationError> {
    let trimmed = description.trim();
    if trimmed.is_empty() {
        return Err(ValidationError::new("description", "must not be empty"));
    }
    let len = trimmed.chars().count();
    if len > MAX_DESCRIPTION_LEN {
        return Err(ValidationError::new(
            "description",
            format!("must be at most {MAX_DESCRIPTION_LEN} characters, got {len}"),
        ));
    }
    Ok(trimmed.to_string())
}

/// Like `validate_description`, for a value that may not be a string.
pub fn validate_description_value(value: &Value) -> Result<String, ValidationError> {
    match value {
        Value::String(description) => validate_description(description),
        Value::Null => Err(ValidationError::new("description", "is required")),
        _ => Err(ValidationError::new("description", "must be a string")),
    }
}

fn now_millis() -> DateTime<Utc> {
    Utc::now().trunc_subsecs(3)
}

/// RFC 3339 timestamps with millisecond precision, e.g.
/// `2024-01-01T12:00:00.000Z`.
mod timestamp {
    use chrono::{DateTime, SecondsFormat, Utc};
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(
        value: &DateTime<Utc>,
        serializer: S,
    ) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&value.to_rfc3339_opts(SecondsFormat::Millis, true))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<DateTime<Utc>, D::Error> {
        let raw = String::deserialize(deserializer)?;
        DateTime::parse_from_rfc3339(&raw)
            .map(|parsed| parsed.with_timezone(&Utc))
            .map_err(serde::de::Error::custom)
    }
}
