//! Complaint-origin value objects carried by every task.

use super::{ComplaintId, InvalidInputError};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Longest department name, in characters, that storage accepts.
pub const MAX_DEPARTMENT_CHARS: usize = 100;

/// Longest category, in characters, that storage accepts.
pub const MAX_CATEGORY_CHARS: usize = 100;

/// Trims `value` and rejects it when blank.
fn required(value: String, field: &'static str) -> Result<String, InvalidInputError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(InvalidInputError::MissingField(field));
    }
    Ok(trimmed.to_owned())
}

/// Like [`required`], but also rejects values longer than `max` characters.
fn bounded(value: String, field: &'static str, max: usize) -> Result<String, InvalidInputError> {
    let trimmed = required(value, field)?;
    let actual = trimmed.chars().count();
    if actual > max {
        return Err(InvalidInputError::FieldTooLong { field, max, actual });
    }
    Ok(trimmed)
}

/// Municipal department responsible for a task, e.g. `roads`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Department(String);

impl Department {
    /// Creates a validated department name.
    ///
    /// # Errors
    ///
    /// Returns [`InvalidInputError::MissingField`] when the name is blank and
    /// [`InvalidInputError::FieldTooLong`] beyond [`MAX_DEPARTMENT_CHARS`].
    pub fn new(value: impl Into<String>) -> Result<Self, InvalidInputError> {
        bounded(value.into(), "department", MAX_DEPARTMENT_CHARS).map(Self)
    }

    /// Returns the department name.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Department {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Problem category assigned by the perception collaborator, e.g. `pothole`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Category(String);

impl Category {
    /// Creates a validated category.
    ///
    /// # Errors
    ///
    /// Returns [`InvalidInputError::MissingField`] when the category is blank
    /// and [`InvalidInputError::FieldTooLong`] beyond [`MAX_CATEGORY_CHARS`].
    pub fn new(value: impl Into<String>) -> Result<Self, InvalidInputError> {
        bounded(value.into(), "category", MAX_CATEGORY_CHARS).map(Self)
    }

    /// Returns the category.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// Free-form location of the reported problem.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Location(String);

impl Location {
    /// Creates a validated location.
    ///
    /// # Errors
    ///
    /// Returns [`InvalidInputError::MissingField`] when the location is blank.
    pub fn new(value: impl Into<String>) -> Result<Self, InvalidInputError> {
        required(value.into(), "location").map(Self)
    }

    /// Returns the location.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// Task priority derived from complaint urgency.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Priority {
    /// Cosmetic or low-impact issue.
    Low,
    /// Default priority.
    #[default]
    Medium,
    /// Issue affecting safety or many residents.
    High,
    /// Hazard requiring immediate response.
    Critical,
}

impl Priority {
    /// Returns the canonical storage representation.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Low => "low",
            Self::Medium => "medium",
            Self::High => "high",
            Self::Critical => "critical",
        }
    }
}

impl TryFrom<&str> for Priority {
    type Error = InvalidInputError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        let normalized = value.trim().to_ascii_lowercase();
        match normalized.as_str() {
            "low" => Ok(Self::Low),
            "medium" | "normal" => Ok(Self::Medium),
            "high" => Ok(Self::High),
            "critical" | "urgent" => Ok(Self::Critical),
            _ => Err(InvalidInputError::UnknownUrgency(value.to_owned())),
        }
    }
}

impl fmt::Display for Priority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Snapshot of the classified complaint a task was created from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ComplaintOrigin {
    /// Source complaint reference.
    pub complaint_id: ComplaintId,
    /// Responsible department.
    pub department: Department,
    /// Problem category.
    pub category: Category,
    /// Reported location.
    pub location: Location,
    /// Citizen's description, when the perception collaborator forwarded it.
    pub description: Option<String>,
    /// Priority derived from urgency.
    pub priority: Priority,
}
