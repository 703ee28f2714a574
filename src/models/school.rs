//! School entities: classes, their weekly requirements, group sets,
//! joint periods, and the teacher/subject registries.
//!
//! # Requirements
//! A class needs each [`ClassSubject`] `periods_per_week` times. A
//! [`JointPeriod`] is one teacher's lesson given to several classes in
//! the same slot; it counts toward every assigned class at once.
//!
//! # Groups
//! A [`GroupSet`] splits a class into parallel groups (e.g. Biology vs
//! Computer electives). Grouped subjects of the same set share a slot;
//! nothing else may join them.

use serde::{Deserialize, Serialize};

use super::WeekCalendar;

/// A teacher.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Teacher {
    pub id: String,
    pub name: String,
}

impl Teacher {
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
        }
    }
}

/// A subject.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Subject {
    pub id: String,
    pub name: String,
}

impl Subject {
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
        }
    }
}

/// A subject requirement of a class.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClassSubject {
    pub subject_id: String,
    pub teacher_id: String,
    /// Period instances needed per week.
    pub periods_per_week: u32,
    /// Group set this subject is taught in, if split.
    pub group_set_id: Option<String>,
    /// Group within `group_set_id`.
    pub group_id: Option<String>,
}

impl ClassSubject {
    /// Creates an ungrouped requirement.
    pub fn new(
        subject_id: impl Into<String>,
        teacher_id: impl Into<String>,
        periods_per_week: u32,
    ) -> Self {
        Self {
            subject_id: subject_id.into(),
            teacher_id: teacher_id.into(),
            periods_per_week,
            group_set_id: None,
            group_id: None,
        }
    }

    /// Restricts the requirement to one group of a group set.
    pub fn in_group(mut self, group_set_id: impl Into<String>, group_id: impl Into<String>) -> Self {
        self.group_set_id = Some(group_set_id.into());
        self.group_id = Some(group_id.into());
        self
    }

    /// `(group_set_id, group_id)` when both are set.
    pub fn group(&self) -> Option<(&str, &str)> {
        match (&self.group_set_id, &self.group_id) {
            (Some(set), Some(group)) => Some((set.as_str(), group.as_str())),
            _ => None,
        }
    }

    /// Drops any group reference.
    pub fn ungroup(&mut self) {
        self.group_set_id = None;
        self.group_id = None;
    }
}

/// A named group within a [`GroupSet`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Group {
    pub id: String,
    pub name: String,
}

/// A partition of a class into parallel groups.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GroupSet {
    pub id: String,
    pub name: String,
    pub groups: Vec<Group>,
}

impl GroupSet {
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            groups: Vec::new(),
        }
    }

    /// Adds a group.
    pub fn with_group(mut self, id: impl Into<String>, name: impl Into<String>) -> Self {
        self.groups.push(Group {
            id: id.into(),
            name: name.into(),
        });
        self
    }

    pub fn has_group(&self, group_id: &str) -> bool {
        self.groups.iter().any(|g| g.id == group_id)
    }
}

/// A class (form) with its requirements.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SchoolClass {
    pub id: String,
    pub name: String,
    pub subjects: Vec<ClassSubject>,
    pub group_sets: Vec<GroupSet>,
    /// Class-specific week; `None` uses the timetable default.
    pub calendar: Option<WeekCalendar>,
}

impl SchoolClass {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: String::new(),
            subjects: Vec::new(),
            group_sets: Vec::new(),
            calendar: None,
        }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Adds a subject requirement.
    pub fn with_subject(mut self, subject: ClassSubject) -> Self {
        self.subjects.push(subject);
        self
    }

    pub fn with_group_set(mut self, group_set: GroupSet) -> Self {
        self.group_sets.push(group_set);
        self
    }

    /// Overrides the timetable calendar for this class.
    pub fn with_calendar(mut self, calendar: WeekCalendar) -> Self {
        self.calendar = Some(calendar);
        self
    }

    /// Finds the requirement owning a `(subject, teacher)` pairing.
    ///
    /// Falls back to a subject-only match when no requirement names the
    /// teacher (e.g. after a teacher swap on the requirement).
    pub fn subject_for(&self, subject_id: &str, teacher_id: &str) -> Option<&ClassSubject> {
        self.subjects
            .iter()
            .find(|s| s.subject_id == subject_id && s.teacher_id == teacher_id)
            .or_else(|| self.subjects.iter().find(|s| s.subject_id == subject_id))
    }

    pub fn group_set(&self, group_set_id: &str) -> Option<&GroupSet> {
        self.group_sets.iter().find(|g| g.id == group_set_id)
    }
}

/// One class/subject target of a joint period.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JointAssignment {
    pub class_id: String,
    pub subject_id: String,
}

/// One teacher teaching several classes in the same slot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JointPeriod {
    pub id: String,
    pub name: String,
    pub teacher_id: String,
    pub periods_per_week: u32,
    pub assignments: Vec<JointAssignment>,
}

impl JointPeriod {
    pub fn new(id: impl Into<String>, teacher_id: impl Into<String>, periods_per_week: u32) -> Self {
        Self {
            id: id.into(),
            name: String::new(),
            teacher_id: teacher_id.into(),
            periods_per_week,
            assignments: Vec::new(),
        }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Adds a class/subject target.
    pub fn with_assignment(
        mut self,
        class_id: impl Into<String>,
        subject_id: impl Into<String>,
    ) -> Self {
        self.assignments.push(JointAssignment {
            class_id: class_id.into(),
            subject_id: subject_id.into(),
        });
        self
    }

    /// The assignment targeting `class_id`.
    pub fn assignment_for(&self, class_id: &str) -> Option<&JointAssignment> {
        self.assignments.iter().find(|a| a.class_id == class_id)
    }

    pub fn includes_class(&self, class_id: &str) -> bool {
        self.assignment_for(class_id).is_some()
    }
}
