//! Error taxonomy for timetable operations.
//!
//! Every failure is a local, recoverable value. Only [`TimetableError::TeacherBusy`]
//! may be overridden by a caller (after a human confirms the double-booking);
//! everything else signals a request that must be rejected.

use std::fmt;

use thiserror::Error;

use crate::availability::Conflict;
use crate::models::Day;

/// Kind of entity referenced by a [`TimetableError::NotFound`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntityKind {
    Class,
    Teacher,
    Subject,
    Period,
    JointPeriod,
    GroupSet,
    Group,
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Class => "class",
            Self::Teacher => "teacher",
            Self::Subject => "subject",
            Self::Period => "period",
            Self::JointPeriod => "joint period",
            Self::GroupSet => "group set",
            Self::Group => "group",
        };
        f.write_str(name)
    }
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum TimetableError {
    #[error("Slot {day} P{} of class {class_id} is closed", .period_index + 1)]
    ClosedSlot {
        class_id: String,
        day: Day,
        period_index: usize,
    },

    #[error("Unknown {kind}: {id}")]
    NotFound { kind: EntityKind, id: String },

    #[error("{conflict} in class {class_id} at {day} P{}", .period_index + 1)]
    CompositionConflict {
        class_id: String,
        day: Day,
        period_index: usize,
        conflict: Conflict,
    },

    #[error("{teacher_name} is busy in class {busy_class_id} at {day} P{}", .period_index + 1)]
    TeacherBusy {
        teacher_id: String,
        teacher_name: String,
        busy_class_id: String,
        day: Day,
        period_index: usize,
    },

    #[error("Joint period {joint_period_id} already occupies {day} P{} of class {class_id}", .period_index + 1)]
    JointPeriodPresent {
        joint_period_id: String,
        class_id: String,
        day: Day,
        period_index: usize,
    },

    #[error("Period {0} is already placed")]
    DuplicatePeriod(String),

    #[error("Period {period_id} belongs to class {found}, not {expected}")]
    ClassMismatch {
        period_id: String,
        expected: String,
        found: String,
    },
}

impl TimetableError {
    pub(crate) fn not_found(kind: EntityKind, id: impl Into<String>) -> Self {
        Self::NotFound {
            kind,
            id: id.into(),
        }
    }

    /// Whether a caller may retry with an explicit override.
    pub fn is_overridable(&self) -> bool {
        matches!(self, Self::TeacherBusy { .. })
    }
}

pub type Result<T> = std::result::Result<T, TimetableError>;
