//! Integrity validation for timetables.
//!
//! Checks a timetable restored from storage (or assembled by hand)
//! before it is edited. Detects:
//! - Duplicate IDs (classes, teachers, subjects, joint periods, periods)
//! - References to unknown teachers, subjects, classes, group sets or groups
//! - Periods sitting in another class's grid
//! - Slots breaking group exclusivity
//! - Joint periods missing a mirror in one of their classes
//! - Periods left in closed slots
//! - Requirements placed more often than required

use std::collections::HashSet;

use crate::availability::composition_conflict;
use crate::models::{SlotRef, Timetable};
use crate::resolver::placed_count;

/// Validation result.
pub type ValidationResult = Result<(), Vec<ValidationError>>;

/// A validation error.
#[derive(Debug, Clone, PartialEq)]
pub struct ValidationError {
    /// Error category.
    pub kind: ValidationErrorKind,
    /// Human-readable description.
    pub message: String,
}

/// Categories of validation errors.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValidationErrorKind {
    /// Two entities share the same ID.
    DuplicateId,
    /// A reference points at nothing.
    InvalidReference,
    /// A grid holds a period of another class.
    ClassMismatch,
    /// A slot mixes groups or group sets illegally.
    CompositionConflict,
    /// A joint period is missing from one of its classes at that slot.
    SplitJointPeriod,
    /// A period sits in a closed slot.
    ClosedSlotOccupied,
    /// More periods placed than the requirement asks for.
    OverScheduled,
}

impl ValidationError {
    fn new(kind: ValidationErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }
}

fn check_unique<'a>(
    errors: &mut Vec<ValidationError>,
    what: &str,
    ids: impl IntoIterator<Item = &'a str>,
) {
    let mut seen = HashSet::new();
    for id in ids {
        if !seen.insert(id) {
            errors.push(ValidationError::new(
                ValidationErrorKind::DuplicateId,
                format!("Duplicate {what} ID: {id}"),
            ));
        }
    }
}

/// Validates the structural integrity of a timetable.
///
/// Checks:
/// 1. No duplicate class, teacher, subject, joint period or period IDs
/// 2. Class subjects and joint periods reference known teachers, subjects,
///    classes, group sets and groups
/// 3. Every period in a grid belongs to that grid's class
/// 4. Every slot satisfies group exclusivity
/// 5. Every joint occupant has its mirrors in the same slot
/// 6. No period sits in a closed slot
/// 7. No requirement is over-scheduled
///
/// # Returns
/// `Ok(())` if all checks pass, `Err(errors)` with all detected issues.
pub fn validate_timetable(tt: &Timetable) -> ValidationResult {
    let mut errors = Vec::new();

    check_unique(&mut errors, "class", tt.classes.iter().map(|c| c.id.as_str()));
    check_unique(&mut errors, "teacher", tt.teachers.iter().map(|t| t.id.as_str()));
    check_unique(&mut errors, "subject", tt.subjects.iter().map(|s| s.id.as_str()));
    check_unique(
        &mut errors,
        "joint period",
        tt.joint_periods.iter().map(|j| j.id.as_str()),
    );
    check_unique(
        &mut errors,
        "period",
        tt.grids()
            .flat_map(|(_, g)| g.periods().map(|(_, p)| p.id.as_str())),
    );

    // Requirement references
    for class in &tt.classes {
        for cs in &class.subjects {
            if tt.teacher(&cs.teacher_id).is_none() {
                errors.push(ValidationError::new(
                    ValidationErrorKind::InvalidReference,
                    format!(
                        "Class '{}' subject '{}' references unknown teacher '{}'",
                        class.id, cs.subject_id, cs.teacher_id
                    ),
                ));
            }
            if tt.subject(&cs.subject_id).is_none() {
                errors.push(ValidationError::new(
                    ValidationErrorKind::InvalidReference,
                    format!(
                        "Class '{}' references unknown subject '{}'",
                        class.id, cs.subject_id
                    ),
                ));
            }
            if let Some((set_id, group_id)) = cs.group() {
                match class.group_set(set_id) {
                    Some(set) if set.has_group(group_id) => {}
                    Some(_) => errors.push(ValidationError::new(
                        ValidationErrorKind::InvalidReference,
                        format!(
                            "Class '{}' subject '{}' references unknown group '{group_id}' of '{set_id}'",
                            class.id, cs.subject_id
                        ),
                    )),
                    None => errors.push(ValidationError::new(
                        ValidationErrorKind::InvalidReference,
                        format!(
                            "Class '{}' subject '{}' references unknown group set '{set_id}'",
                            class.id, cs.subject_id
                        ),
                    )),
                }
            }
        }
    }

    for jp in &tt.joint_periods {
        if tt.teacher(&jp.teacher_id).is_none() {
            errors.push(ValidationError::new(
                ValidationErrorKind::InvalidReference,
                format!(
                    "Joint period '{}' references unknown teacher '{}'",
                    jp.id, jp.teacher_id
                ),
            ));
        }
        for a in &jp.assignments {
            if tt.class(&a.class_id).is_err() {
                errors.push(ValidationError::new(
                    ValidationErrorKind::InvalidReference,
                    format!(
                        "Joint period '{}' references unknown class '{}'",
                        jp.id, a.class_id
                    ),
                ));
            }
            if tt.subject(&a.subject_id).is_none() {
                errors.push(ValidationError::new(
                    ValidationErrorKind::InvalidReference,
                    format!(
                        "Joint period '{}' references unknown subject '{}'",
                        jp.id, a.subject_id
                    ),
                ));
            }
        }
    }

    // Grid contents
    let mut missing_mirrors: HashSet<(&str, &str, SlotRef)> = HashSet::new();
    for (class_id, grid) in tt.grids() {
        let calendar = tt.calendar_for(class_id);

        for (at, period) in grid.periods() {
            if period.class_id != class_id {
                errors.push(ValidationError::new(
                    ValidationErrorKind::ClassMismatch,
                    format!(
                        "Period '{}' of class '{}' sits in the grid of '{class_id}'",
                        period.id, period.class_id
                    ),
                ));
            }
            if !calendar.is_open(at.day, at.period_index) {
                errors.push(ValidationError::new(
                    ValidationErrorKind::ClosedSlotOccupied,
                    format!(
                        "Period '{}' of class '{class_id}' sits in closed slot {} P{}",
                        period.id,
                        at.day,
                        at.period_index + 1
                    ),
                ));
            }

            let Some(jp_id) = period.joint_period_id.as_deref() else {
                continue;
            };
            let Some(jp) = tt.joint_period(jp_id) else {
                errors.push(ValidationError::new(
                    ValidationErrorKind::InvalidReference,
                    format!("Period '{}' references unknown joint period '{jp_id}'", period.id),
                ));
                continue;
            };
            if !jp.includes_class(class_id) {
                errors.push(ValidationError::new(
                    ValidationErrorKind::InvalidReference,
                    format!("Joint period '{jp_id}' has no assignment for class '{class_id}'"),
                ));
            }
            for a in jp.assignments.iter().filter(|a| a.class_id != class_id) {
                let mirrored = tt.grid(&a.class_id).ok().and_then(|g| g.slot(at)).is_some_and(
                    |s| {
                        s.periods
                            .iter()
                            .any(|p| p.joint_period_id.as_deref() == Some(jp_id))
                    },
                );
                if !mirrored && missing_mirrors.insert((jp_id, a.class_id.as_str(), at)) {
                    errors.push(ValidationError::new(
                        ValidationErrorKind::SplitJointPeriod,
                        format!(
                            "Joint period '{jp_id}' at {} P{} is missing in class '{}'",
                            at.day,
                            at.period_index + 1,
                            a.class_id
                        ),
                    ));
                }
            }
        }

        for (day, slots) in grid.days() {
            for (idx, slot) in slots.iter().enumerate() {
                if let Some(conflict) = composition_conflict(tt, &slot.periods, &[]) {
                    errors.push(ValidationError::new(
                        ValidationErrorKind::CompositionConflict,
                        format!("{conflict} in class '{class_id}' at {day} P{}", idx + 1),
                    ));
                }
            }
        }
    }

    // Over-scheduling
    for class in &tt.classes {
        let Ok(requirements) = tt.requirements(&class.id) else {
            continue;
        };
        for req in requirements {
            let key = req.key();
            let Ok(placed) = placed_count(tt, &class.id, &key) else {
                continue;
            };
            if placed > req.periods_per_week() {
                errors.push(ValidationError::new(
                    ValidationErrorKind::OverScheduled,
                    format!(
                        "Class '{}' has {placed} periods of '{key}', needs {}",
                        class.id,
                        req.periods_per_week()
                    ),
                ));
            }
        }
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}
