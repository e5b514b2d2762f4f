//! Task domain model.
//!
//! # Responsibility
//! - Define the canonical task record and its closed category set.
//! - Validate creation input before it reaches persistence.
//!
//! # Invariants
//! - `id` is stable and never reused for another task.
//! - `name` and `category` never change after creation.
//! - `done` is the only mutable field and starts as `false`.

use serde::{Deserialize, Serialize};
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::str::FromStr;
use uuid::Uuid;

/// Stable identifier assigned by the store at creation.
pub type TaskId = Uuid;

/// Closed set of groupings that scope list and delete operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Category {
    /// Day-to-day personal list.
    Today,
    /// Work list.
    Work,
}

impl Category {
    /// All categories, in display order.
    pub const ALL: [Category; 2] = [Category::Today, Category::Work];

    /// Numeric code used by HTML forms (`taskType`).
    pub fn code(self) -> i64 {
        match self {
            Self::Today => 0,
            Self::Work => 1,
        }
    }

    /// Resolves a form code back to a category.
    ///
    /// Returns `None` for codes outside the closed set.
    pub fn from_code(code: i64) -> Option<Self> {
        match code {
            0 => Some(Self::Today),
            1 => Some(Self::Work),
            _ => None,
        }
    }

    /// Stable storage label.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Today => "today",
            Self::Work => "work",
        }
    }
}

impl Display for Category {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Category {
    type Err = TaskValidationError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "today" => Ok(Self::Today),
            "work" => Ok(Self::Work),
            other => Err(TaskValidationError::UnknownCategory(other.to_string())),
        }
    }
}

/// Validation failures for task creation input.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TaskValidationError {
    /// Name is empty or whitespace only.
    EmptyName,
    /// Category is outside the recognised set.
    UnknownCategory(String),
    /// Nil UUID cannot identify a task.
    NilId,
}

impl Display for TaskValidationError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::EmptyName => write!(f, "task name must not be empty"),
            Self::UnknownCategory(value) => write!(f, "unknown task category `{value}`"),
            Self::NilId => write!(f, "task id must not be nil"),
        }
    }
}

impl Error for TaskValidationError {}

/// Canonical task record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Task {
    pub id: TaskId,
    pub name: String,
    pub category: Category,
    pub done: bool,
}

impl Task {
    /// Creates a new, not-yet-done task with a generated id.
    ///
    /// # Errors
    /// - `EmptyName` when `name` is blank.
    pub fn new(name: impl Into<String>, category: Category) -> Result<Self, TaskValidationError> {
        Self::with_id(Uuid::new_v4(), name, category)
    }

    /// Creates a task with a caller-provided id.
    ///
    /// Used when rebuilding records read back from storage.
    pub fn with_id(
        id: TaskId,
        name: impl Into<String>,
        category: Category,
    ) -> Result<Self, TaskValidationError> {
        let task = Self {
            id,
            name: name.into(),
            category,
            done: false,
        };
        task.validate()?;
        Ok(task)
    }

    /// Checks record-level invariants.
    pub fn validate(&self) -> Result<(), TaskValidationError> {
        if self.id.is_nil() {
            return Err(TaskValidationError::NilId);
        }
        if self.name.trim().is_empty() {
            return Err(TaskValidationError::EmptyName);
        }
        Ok(())
    }
}
