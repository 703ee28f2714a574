//! Period (placed lesson) model.
//!
//! A period is one concrete teaching assignment occupying one slot of
//! one class grid. Two placements of the same subject/teacher pairing are
//! two periods with distinct ids.

use serde::{Deserialize, Serialize};

/// One teaching assignment instance.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Period {
    /// Unique instance identifier.
    pub id: String,
    /// Owning class. Always equals the id of the grid holding this period.
    pub class_id: String,
    pub subject_id: String,
    pub teacher_id: String,
    /// Set on every mirrored occupant of a joint period.
    pub joint_period_id: Option<String>,
}

impl Period {
    /// Creates a period with a freshly generated id.
    pub fn new(
        class_id: impl Into<String>,
        subject_id: impl Into<String>,
        teacher_id: impl Into<String>,
    ) -> Self {
        Self::with_id(new_period_id(), class_id, subject_id, teacher_id)
    }

    /// Creates a period with an explicit id.
    pub fn with_id(
        id: impl Into<String>,
        class_id: impl Into<String>,
        subject_id: impl Into<String>,
        teacher_id: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            class_id: class_id.into(),
            subject_id: subject_id.into(),
            teacher_id: teacher_id.into(),
            joint_period_id: None,
        }
    }

    /// Marks this period as an occupant of a joint period.
    pub fn in_joint_period(mut self, joint_period_id: impl Into<String>) -> Self {
        self.joint_period_id = Some(joint_period_id.into());
        self
    }

    /// Whether this period is a joint-period occupant.
    #[inline]
    pub fn is_joint(&self) -> bool {
        self.joint_period_id.is_some()
    }

    /// Same assignment under a new id.
    pub fn reissue(&self) -> Self {
        Self {
            id: new_period_id(),
            ..self.clone()
        }
    }
}

/// Generates a random period id (`p-` followed by 16 hex digits).
pub fn new_period_id() -> String {
    format!("p-{:016x}", rand::random::<u64>())
}
