//! Requirement resolver: what still needs a slot.
//!
//! Derives, per class, the periods that are required but not yet placed.
//! Remaining counts are never stored; they are recomputed from the grid
//! on every call so they cannot drift from what is actually placed.
//!
//! # Algorithm
//!
//! For each requirement of the class:
//! 1. Count grid periods matching it across every open slot.
//! 2. `remaining = periods_per_week - placed` (floored at zero).
//! 3. Emit `remaining` virtual periods with fresh ids.
//!
//! # Complexity
//! O(r * d * p * s) where r=requirements, d=days, p=periods/day, s=periods/slot.

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::Result;
use crate::models::{Period, Requirement, RequirementKey, Timetable};

/// Outstanding periods of one requirement.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UnscheduledGroup {
    pub key: RequirementKey,
    pub subject_id: String,
    pub teacher_id: String,
    pub periods_per_week: u32,
    /// Periods already in the grid for this requirement.
    pub placed: u32,
    /// Virtual periods, one per missing placement. Not persisted.
    pub periods: Vec<Period>,
}

/// The "to be scheduled" pool of a class.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UnscheduledPool {
    pub class_id: String,
    /// Requirements with at least one missing placement, in requirement order.
    pub groups: Vec<UnscheduledGroup>,
}

impl UnscheduledPool {
    /// Total outstanding periods.
    pub fn total(&self) -> usize {
        self.groups.iter().map(|g| g.periods.len()).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }

    pub fn group(&self, key: &RequirementKey) -> Option<&UnscheduledGroup> {
        self.groups.iter().find(|g| &g.key == key)
    }

    /// Outstanding periods for `key` (0 when satisfied or unknown).
    pub fn count_for(&self, key: &RequirementKey) -> usize {
        self.group(key).map_or(0, |g| g.periods.len())
    }

    /// All virtual periods, flattened.
    pub fn periods(&self) -> impl Iterator<Item = &Period> {
        self.groups.iter().flat_map(|g| &g.periods)
    }
}

/// Counts periods in the class grid satisfying `requirement`.
fn count_placed(tt: &Timetable, class_id: &str, requirement: &Requirement<'_>) -> Result<u32> {
    let grid = tt.grid(class_id)?;
    let calendar = tt.calendar_for(class_id);
    let placed = grid
        .open_slots(calendar)
        .flat_map(|(_, slot)| &slot.periods)
        .filter(|p| requirement.matches(p))
        .count();
    Ok(placed as u32)
}

/// Placed periods of the requirement keyed `key` in a class.
///
/// Returns 0 when the class has no such requirement.
pub fn placed_count(tt: &Timetable, class_id: &str, key: &RequirementKey) -> Result<u32> {
    match tt
        .requirements(class_id)?
        .into_iter()
        .find(|r| &r.key() == key)
    {
        Some(req) => count_placed(tt, class_id, &req),
        None => Ok(0),
    }
}

/// Computes the unscheduled pool of a class.
///
/// Pure: reads the timetable, never writes it.
pub fn compute_unscheduled(tt: &Timetable, class_id: &str) -> Result<UnscheduledPool> {
    let mut groups = Vec::new();

    for req in tt.requirements(class_id)? {
        let placed = count_placed(tt, class_id, &req)?;
        let target = req.periods_per_week();
        if placed > target {
            debug!(class_id, key = %req.key(), placed, target, "Requirement over-scheduled");
        }
        let remaining = target.saturating_sub(placed);
        if remaining == 0 {
            continue;
        }

        let periods = (0..remaining)
            .map(|_| {
                let period = Period::new(class_id, req.subject_id(), req.teacher_id());
                match req.joint_period_id() {
                    Some(jp) => period.in_joint_period(jp),
                    None => period,
                }
            })
            .collect();

        groups.push(UnscheduledGroup {
            key: req.key(),
            subject_id: req.subject_id().to_string(),
            teacher_id: req.teacher_id().to_string(),
            periods_per_week: target,
            placed,
            periods,
        });
    }

    Ok(UnscheduledPool {
        class_id: class_id.to_string(),
        groups,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{ClassSubject, Day, JointPeriod, SchoolClass, SlotRef, WeekCalendar};

    fn math_key() -> RequirementKey {
        RequirementKey::Subject("math".into())
    }

    fn timetable() -> Timetable {
        Timetable::new(WeekCalendar::default())
            .with_class(
                SchoolClass::new("7A")
                    .with_subject(ClassSubject::new("math", "T1", 5))
                    .with_subject(ClassSubject::new("art", "T2", 1))
                    .with_subject(ClassSubject::new("music", "T3", 2)),
            )
            .with_class(SchoolClass::new("7B"))
            .with_joint_period(
                JointPeriod::new("J1", "T3", 2)
                    .with_assignment("7A", "music")
                    .with_assignment("7B", "music"),
            )
    }

    fn place(tt: Timetable, class_id: &str, at: SlotRef, period: Period) -> Timetable {
        let grid = tt.grid(class_id).unwrap().clone().with_period(at, period);
        tt.with_grid(grid)
    }

    #[test]
    fn test_empty_grid_needs_everything() {
        let tt = timetable();
        let pool = compute_unscheduled(&tt, "7A").unwrap();
        // math 5 + art 1 + joint music 2 (plain music is covered by J1)
        assert_eq!(pool.total(), 8);
        assert_eq!(pool.count_for(&math_key()), 5);
        assert_eq!(pool.count_for(&RequirementKey::Subject("music".into())), 0);
        assert_eq!(pool.count_for(&RequirementKey::Joint("J1".into())), 2);
    }

    #[test]
    fn test_virtual_periods_carry_requirement() {
        let tt = timetable();
        let pool = compute_unscheduled(&tt, "7A").unwrap();
        let joint = pool.group(&RequirementKey::Joint("J1".into())).unwrap();
        assert!(joint.periods.iter().all(|p| {
            p.joint_period_id.as_deref() == Some("J1") && p.teacher_id == "T3" && p.class_id == "7A"
        }));
        let ids: std::collections::HashSet<&str> = pool.periods().map(|p| p.id.as_str()).collect();
        assert_eq!(ids.len(), pool.total());
    }

    #[test]
    fn test_placed_periods_reduce_pool() {
        let mut tt = timetable();
        for (i, day) in [Day::Monday, Day::Tuesday, Day::Wednesday].into_iter().enumerate() {
            tt = place(
                tt,
                "7A",
                SlotRef::new(day, 0),
                Period::with_id(format!("m{i}"), "7A", "math", "T1"),
            );
        }
        let pool = compute_unscheduled(&tt, "7A").unwrap();
        assert_eq!(pool.count_for(&math_key()), 2);
        assert_eq!(pool.group(&math_key()).unwrap().placed, 3);
        assert_eq!(placed_count(&tt, "7A", &math_key()).unwrap(), 3);
    }

    #[test]
    fn test_joint_occupant_not_counted_as_plain() {
        let tt = place(
            timetable(),
            "7A",
            SlotRef::new(Day::Monday, 3),
            Period::with_id("j", "7A", "music", "T3").in_joint_period("J1"),
        );
        let pool = compute_unscheduled(&tt, "7A").unwrap();
        assert_eq!(pool.count_for(&RequirementKey::Joint("J1".into())), 1);

        // The other class still needs both instances
        let pool_b = compute_unscheduled(&tt, "7B").unwrap();
        assert_eq!(pool_b.count_for(&RequirementKey::Joint("J1".into())), 2);
    }

    #[test]
    fn test_satisfied_requirement_leaves_pool() {
        let tt = place(
            timetable(),
            "7A",
            SlotRef::new(Day::Friday, 7),
            Period::with_id("a", "7A", "art", "T2"),
        );
        let pool = compute_unscheduled(&tt, "7A").unwrap();
        assert!(pool.group(&RequirementKey::Subject("art".into())).is_none());
    }

    #[test]
    fn test_over_scheduled_floors_at_zero() {
        let mut tt = timetable();
        for i in 0..3 {
            tt = place(
                tt,
                "7A",
                SlotRef::new(Day::Thursday, i),
                Period::with_id(format!("a{i}"), "7A", "art", "T2"),
            );
        }
        let pool = compute_unscheduled(&tt, "7A").unwrap();
        assert_eq!(pool.count_for(&RequirementKey::Subject("art".into())), 0);
        assert_eq!(pool.total(), 7);
    }

    #[test]
    fn test_periods_in_closed_slots_do_not_count() {
        let mut tt = timetable();
        tt = place(
            tt,
            "7A",
            SlotRef::new(Day::Friday, 6),
            Period::with_id("m", "7A", "math", "T1"),
        );
        tt.calendar = WeekCalendar::default().with_day(Day::Friday, 5);
        let pool = compute_unscheduled(&tt, "7A").unwrap();
        assert_eq!(pool.count_for(&math_key()), 5);
    }

    #[test]
    fn test_unknown_class() {
        let tt = timetable();
        assert!(compute_unscheduled(&tt, "9Z").is_err());
        assert!(placed_count(&tt, "9Z", &math_key()).is_err());
        assert_eq!(
            placed_count(&tt, "7A", &RequirementKey::Subject("latin".into())).unwrap(),
            0
        );
    }

    #[test]
    fn test_pool_serializes() {
        let tt = timetable();
        let pool = compute_unscheduled(&tt, "7B").unwrap();
        let json = serde_json::to_string(&pool).unwrap();
        let back: UnscheduledPool = serde_json::from_str(&json).unwrap();
        assert_eq!(back, pool);
    }
}
