//! Ownership models
//!
//! Per-request correlation ids used by the ownership guard, the policy flags
//! that tune it, and the records it looks up.

use serde::{Deserialize, Serialize};

/// Facts pulled from a request that tie it to a specific resource
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OwnershipContext {
    #[serde(default)]
    pub student_id: Option<String>,
    #[serde(default)]
    pub class_id: Option<String>,
    #[serde(default)]
    pub subject_id: Option<String>,
    #[serde(default)]
    pub teacher_id: Option<String>,
}

impl OwnershipContext {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_student(mut self, student_id: impl Into<String>) -> Self {
        self.student_id = Some(student_id.into());
        self
    }

    pub fn with_class(mut self, class_id: impl Into<String>) -> Self {
        self.class_id = Some(class_id.into());
        self
    }

    pub fn with_subject(mut self, subject_id: impl Into<String>) -> Self {
        self.subject_id = Some(subject_id.into());
        self
    }
}

/// Policy flags for the ownership guard
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OwnershipPolicy {
    /// Teachers need an active assignment to the addressed class
    pub require_teacher_match: bool,
    /// Students may only address their own records
    pub require_student_self: bool,
    /// Admins skip every ownership check
    pub allow_admin_bypass: bool,
}

impl Default for OwnershipPolicy {
    fn default() -> Self {
        Self {
            require_teacher_match: true,
            require_student_self: true,
            allow_admin_bypass: true,
        }
    }
}

/// Lifecycle state of a teaching assignment
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum AssignmentStatus {
    Active,
    Inactive,
}

impl AssignmentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            AssignmentStatus::Active => "ACTIVE",
            AssignmentStatus::Inactive => "INACTIVE",
        }
    }
}

impl std::str::FromStr for AssignmentStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_uppercase().as_str() {
            "ACTIVE" => Ok(AssignmentStatus::Active),
            "INACTIVE" => Ok(AssignmentStatus::Inactive),
            _ => Err(format!("Invalid assignment status: {}", s)),
        }
    }
}

/// A teacher's assignment to teach a class (optionally a single subject)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TeachingAssignment {
    pub id: String,
    pub teacher_id: String,
    pub class_id: String,
    pub subject_id: Option<String>,
    pub status: AssignmentStatus,
}

/// Guardianship link between a parent and a student
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ParentStudentLink {
    pub id: String,
    pub parent_id: String,
    pub student_id: String,
}
