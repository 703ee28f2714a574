//! Timetable aggregate.
//!
//! Owns every class, its grid, the teacher/subject registries, joint
//! periods and the adjustment log. Reads used by the resolver, checker
//! and aggregator live here; checked writes live in [`crate::placement`].
//!
//! # Lifecycle
//! Periods are created by placement and destroyed by removal or when the
//! requirement that owns them is deleted. Deleting a group never leaves
//! a dangling reference: subjects pointing at it revert to ungrouped.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};
use tracing::info;

use super::{
    AdjustmentLog, ClassSubject, Grid, JointAssignment, JointPeriod, Period, SchoolClass,
    SlotRef, Subject, Teacher, WeekCalendar,
};
use crate::error::{EntityKind, Result, TimetableError};

/// Stable key grouping a requirement and its periods.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum RequirementKey {
    /// A plain class subject, keyed by subject id.
    Subject(String),
    /// A joint period, keyed by joint period id.
    Joint(String),
}

impl fmt::Display for RequirementKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Subject(id) => f.write_str(id),
            Self::Joint(id) => write!(f, "jp-{id}"),
        }
    }
}

/// One weekly requirement of a class.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Requirement<'a> {
    Subject(&'a ClassSubject),
    Joint {
        joint_period: &'a JointPeriod,
        assignment: &'a JointAssignment,
    },
}

impl Requirement<'_> {
    pub fn key(&self) -> RequirementKey {
        match self {
            Self::Subject(cs) => RequirementKey::Subject(cs.subject_id.clone()),
            Self::Joint { joint_period, .. } => RequirementKey::Joint(joint_period.id.clone()),
        }
    }

    pub fn subject_id(&self) -> &str {
        match self {
            Self::Subject(cs) => &cs.subject_id,
            Self::Joint { assignment, .. } => &assignment.subject_id,
        }
    }

    pub fn teacher_id(&self) -> &str {
        match self {
            Self::Subject(cs) => &cs.teacher_id,
            Self::Joint { joint_period, .. } => &joint_period.teacher_id,
        }
    }

    pub fn periods_per_week(&self) -> u32 {
        match self {
            Self::Subject(cs) => cs.periods_per_week,
            Self::Joint { joint_period, .. } => joint_period.periods_per_week,
        }
    }

    pub fn joint_period_id(&self) -> Option<&str> {
        match self {
            Self::Subject(_) => None,
            Self::Joint { joint_period, .. } => Some(&joint_period.id),
        }
    }

    /// Whether `period` counts toward this requirement.
    pub fn matches(&self, period: &Period) -> bool {
        match self {
            Self::Subject(cs) => period.joint_period_id.is_none() && period.subject_id == cs.subject_id,
            Self::Joint { joint_period, .. } => {
                period.joint_period_id.as_deref() == Some(joint_period.id.as_str())
            }
        }
    }
}

/// The whole school timetable.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Timetable {
    /// Calendar for classes without their own.
    pub calendar: WeekCalendar,
    pub teachers: Vec<Teacher>,
    pub subjects: Vec<Subject>,
    pub classes: Vec<SchoolClass>,
    pub joint_periods: Vec<JointPeriod>,
    pub adjustments: AdjustmentLog,
    grids: BTreeMap<String, Grid>,
}

impl Timetable {
    /// Creates an empty timetable on `calendar`.
    pub fn new(calendar: WeekCalendar) -> Self {
        Self {
            calendar,
            ..Default::default()
        }
    }

    pub fn with_teacher(mut self, teacher: Teacher) -> Self {
        self.teachers.push(teacher);
        self
    }

    pub fn with_subject(mut self, subject: Subject) -> Self {
        self.subjects.push(subject);
        self
    }

    /// Adds a class and its empty grid.
    pub fn with_class(mut self, class: SchoolClass) -> Self {
        self.add_class(class);
        self
    }

    pub fn with_joint_period(mut self, joint_period: JointPeriod) -> Self {
        self.joint_periods.push(joint_period);
        self
    }

    pub fn with_adjustments(mut self, adjustments: AdjustmentLog) -> Self {
        self.adjustments = adjustments;
        self
    }

    /// Installs a pre-built grid (restored data or fixtures).
    pub fn with_grid(mut self, grid: Grid) -> Self {
        self.grids.insert(grid.class_id.clone(), grid);
        self
    }

    /// Adds a class, or replaces the data of an existing one.
    ///
    /// A new class gets an empty grid shaped by its calendar; an existing
    /// class keeps its grid.
    pub fn add_class(&mut self, class: SchoolClass) {
        if !self.grids.contains_key(&class.id) {
            let calendar = class.calendar.as_ref().unwrap_or(&self.calendar);
            let grid = Grid::new(class.id.clone(), calendar);
            self.grids.insert(class.id.clone(), grid);
        }
        match self.classes.iter_mut().find(|c| c.id == class.id) {
            Some(existing) => *existing = class,
            None => self.classes.push(class),
        }
    }

    pub fn class(&self, class_id: &str) -> Result<&SchoolClass> {
        self.classes
            .iter()
            .find(|c| c.id == class_id)
            .ok_or_else(|| TimetableError::not_found(EntityKind::Class, class_id))
    }

    fn class_mut(&mut self, class_id: &str) -> Result<&mut SchoolClass> {
        self.classes
            .iter_mut()
            .find(|c| c.id == class_id)
            .ok_or_else(|| TimetableError::not_found(EntityKind::Class, class_id))
    }

    pub fn teacher(&self, teacher_id: &str) -> Option<&Teacher> {
        self.teachers.iter().find(|t| t.id == teacher_id)
    }

    /// Display name of a teacher, falling back to the id.
    pub fn teacher_name<'a>(&'a self, teacher_id: &'a str) -> &'a str {
        self.teacher(teacher_id)
            .map(|t| t.name.as_str())
            .filter(|n| !n.is_empty())
            .unwrap_or(teacher_id)
    }

    pub fn subject(&self, subject_id: &str) -> Option<&Subject> {
        self.subjects.iter().find(|s| s.id == subject_id)
    }

    pub fn joint_period(&self, joint_period_id: &str) -> Option<&JointPeriod> {
        self.joint_periods.iter().find(|j| j.id == joint_period_id)
    }

    /// Joint periods with an assignment for `class_id`.
    pub fn joint_periods_for<'a>(
        &'a self,
        class_id: &'a str,
    ) -> impl Iterator<Item = &'a JointPeriod> + 'a {
        self.joint_periods
            .iter()
            .filter(move |j| j.includes_class(class_id))
    }

    /// Grid of a class.
    pub fn grid(&self, class_id: &str) -> Result<&Grid> {
        self.grids
            .get(class_id)
            .ok_or_else(|| TimetableError::not_found(EntityKind::Class, class_id))
    }

    pub(crate) fn grid_mut(&mut self, class_id: &str) -> Result<&mut Grid> {
        self.grids
            .get_mut(class_id)
            .ok_or_else(|| TimetableError::not_found(EntityKind::Class, class_id))
    }

    /// All grids keyed by class id.
    pub fn grids(&self) -> impl Iterator<Item = (&str, &Grid)> {
        self.grids.iter().map(|(id, g)| (id.as_str(), g))
    }

    /// Effective calendar of a class (its override or the default).
    pub fn calendar_for(&self, class_id: &str) -> &WeekCalendar {
        self.classes
            .iter()
            .find(|c| c.id == class_id)
            .and_then(|c| c.calendar.as_ref())
            .unwrap_or(&self.calendar)
    }

    /// Requirements of a class: plain subjects first, then joint periods.
    ///
    /// A subject that is also a joint assignment for this class is
    /// covered by the joint requirement and left out of the plain list.
    pub fn requirements(&self, class_id: &str) -> Result<Vec<Requirement<'_>>> {
        let class = self.class(class_id)?;
        let mut out: Vec<Requirement<'_>> = class
            .subjects
            .iter()
            .filter(|cs| {
                !self.joint_periods_for(class_id).any(|j| {
                    j.assignment_for(class_id)
                        .is_some_and(|a| a.subject_id == cs.subject_id)
                })
            })
            .map(Requirement::Subject)
            .collect();

        for joint_period in &self.joint_periods {
            if let Some(assignment) = joint_period.assignment_for(class_id) {
                out.push(Requirement::Joint {
                    joint_period,
                    assignment,
                });
            }
        }
        Ok(out)
    }

    /// `(group_set_id, group_id)` of the requirement owning `period`.
    ///
    /// Joint occupants and periods without a grouped requirement return `None`.
    pub fn group_of(&self, period: &Period) -> Option<(&str, &str)> {
        if period.is_joint() {
            return None;
        }
        self.classes
            .iter()
            .find(|c| c.id == period.class_id)?
            .subject_for(&period.subject_id, &period.teacher_id)?
            .group()
    }

    /// Locates a period anywhere in the timetable.
    pub fn find_period(&self, period_id: &str) -> Option<(&str, SlotRef, &Period)> {
        self.grids.iter().find_map(|(class_id, grid)| {
            grid.periods()
                .find(|(_, p)| p.id == period_id)
                .map(|(at, p)| (class_id.as_str(), at, p))
        })
    }

    /// Deletes the `(subject, teacher)` requirement of a class and every
    /// plain period placed for it.
    ///
    /// A subject split across teachers keeps its other requirements and
    /// their periods. Returns the number of periods removed from the grid.
    pub fn remove_class_subject(
        &mut self,
        class_id: &str,
        subject_id: &str,
        teacher_id: &str,
    ) -> Result<usize> {
        let class = self.class_mut(class_id)?;
        let before = class.subjects.len();
        class
            .subjects
            .retain(|s| !(s.subject_id == subject_id && s.teacher_id == teacher_id));
        if class.subjects.len() == before {
            return Err(TimetableError::not_found(EntityKind::Subject, subject_id));
        }

        let removed = self.grid_mut(class_id)?.retain(|p| {
            p.is_joint() || p.subject_id != subject_id || p.teacher_id != teacher_id
        });
        info!(class_id, subject_id, teacher_id, removed, "Class subject deleted");
        Ok(removed)
    }

    /// Deletes a joint period and its occupants from every grid.
    pub fn remove_joint_period(&mut self, joint_period_id: &str) -> Result<usize> {
        let before = self.joint_periods.len();
        self.joint_periods.retain(|j| j.id != joint_period_id);
        if self.joint_periods.len() == before {
            return Err(TimetableError::not_found(
                EntityKind::JointPeriod,
                joint_period_id,
            ));
        }

        let removed: usize = self
            .grids
            .values_mut()
            .map(|g| g.retain(|p| p.joint_period_id.as_deref() != Some(joint_period_id)))
            .sum();
        info!(joint_period_id, removed, "Joint period deleted");
        Ok(removed)
    }

    /// Deletes one group; subjects taught in it become ungrouped.
    ///
    /// Returns the number of subjects reverted.
    pub fn remove_group(
        &mut self,
        class_id: &str,
        group_set_id: &str,
        group_id: &str,
    ) -> Result<usize> {
        let class = self.class_mut(class_id)?;
        let set = class
            .group_sets
            .iter_mut()
            .find(|g| g.id == group_set_id)
            .ok_or_else(|| TimetableError::not_found(EntityKind::GroupSet, group_set_id))?;
        if !set.has_group(group_id) {
            return Err(TimetableError::not_found(EntityKind::Group, group_id));
        }
        set.groups.retain(|g| g.id != group_id);

        let reverted = ungroup_where(class, |set, group| {
            set == group_set_id && group == group_id
        });
        info!(class_id, group_set_id, group_id, reverted, "Group deleted");
        Ok(reverted)
    }

    /// Deletes a group set; all of its subjects become ungrouped.
    pub fn remove_group_set(&mut self, class_id: &str, group_set_id: &str) -> Result<usize> {
        let class = self.class_mut(class_id)?;
        let before = class.group_sets.len();
        class.group_sets.retain(|g| g.id != group_set_id);
        if class.group_sets.len() == before {
            return Err(TimetableError::not_found(EntityKind::GroupSet, group_set_id));
        }

        let reverted = ungroup_where(class, |set, _| set == group_set_id);
        info!(class_id, group_set_id, reverted, "Group set deleted");
        Ok(reverted)
    }
}

fn ungroup_where(class: &mut SchoolClass, matches: impl Fn(&str, &str) -> bool) -> usize {
    let mut reverted = 0;
    for subject in &mut class.subjects {
        if subject.group().is_some_and(|(set, group)| matches(set, group)) {
            subject.ungroup();
            reverted += 1;
        }
    }
    reverted
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Day, GroupSet};

    fn at(day: Day, idx: usize) -> SlotRef {
        SlotRef::new(day, idx)
    }

    fn school() -> Timetable {
        let tt = Timetable::new(WeekCalendar::default())
            .with_teacher(Teacher::new("T1", "Mr. Khan"))
            .with_teacher(Teacher::new("T2", ""))
            .with_class(
                SchoolClass::new("7A")
                    .with_subject(ClassSubject::new("math", "T1", 5))
                    .with_subject(ClassSubject::new("bio", "T2", 2).in_group("S1", "bio"))
                    .with_subject(ClassSubject::new("comp", "T3", 2).in_group("S1", "comp"))
                    .with_subject(ClassSubject::new("arabic", "T4", 3))
                    .with_group_set(
                        GroupSet::new("S1", "Electives")
                            .with_group("bio", "Biology")
                            .with_group("comp", "Computer"),
                    ),
            )
            .with_class(SchoolClass::new("7B"))
            .with_joint_period(
                JointPeriod::new("J1", "T4", 3)
                    .with_assignment("7A", "arabic")
                    .with_assignment("7B", "arabic"),
            );

        let grid = tt
            .grid("7A")
            .unwrap()
            .clone()
            .with_period(at(Day::Monday, 0), Period::with_id("m1", "7A", "math", "T1"))
            .with_period(at(Day::Monday, 1), Period::with_id("b1", "7A", "bio", "T2"))
            .with_period(
                at(Day::Monday, 2),
                Period::with_id("j1a", "7A", "arabic", "T4").in_joint_period("J1"),
            );
        let grid_b = tt.grid("7B").unwrap().clone().with_period(
            at(Day::Monday, 2),
            Period::with_id("j1b", "7B", "arabic", "T4").in_joint_period("J1"),
        );
        tt.with_grid(grid).with_grid(grid_b)
    }

    #[test]
    fn test_requirements_skip_joint_covered_subject() {
        let tt = school();
        let reqs = tt.requirements("7A").unwrap();
        let keys: Vec<String> = reqs.iter().map(|r| r.key().to_string()).collect();
        assert_eq!(keys, vec!["math", "bio", "comp", "jp-J1"]);

        let joint = reqs.last().unwrap();
        assert_eq!(joint.teacher_id(), "T4");
        assert_eq!(joint.subject_id(), "arabic");
        assert_eq!(joint.periods_per_week(), 3);
        assert_eq!(joint.joint_period_id(), Some("J1"));
    }

    #[test]
    fn test_requirements_unknown_class() {
        let tt = school();
        assert!(matches!(
            tt.requirements("9Z"),
            Err(TimetableError::NotFound {
                kind: EntityKind::Class,
                ..
            })
        ));
    }

    #[test]
    fn test_requirement_matching() {
        let tt = school();
        let reqs = tt.requirements("7A").unwrap();
        let plain = Period::with_id("x", "7A", "arabic", "T4");
        let joint = plain.clone().in_joint_period("J1");
        let math = reqs.iter().find(|r| r.subject_id() == "math").unwrap();
        let jp = reqs.iter().find(|r| r.joint_period_id().is_some()).unwrap();

        assert!(jp.matches(&joint));
        assert!(!jp.matches(&plain));
        assert!(!math.matches(&joint));
    }

    #[test]
    fn test_group_of() {
        let tt = school();
        let bio = Period::with_id("x", "7A", "bio", "T2");
        let math = Period::with_id("y", "7A", "math", "T1");
        let joint = Period::with_id("z", "7A", "bio", "T2").in_joint_period("J1");
        assert_eq!(tt.group_of(&bio), Some(("S1", "bio")));
        assert_eq!(tt.group_of(&math), None);
        assert_eq!(tt.group_of(&joint), None);
    }

    #[test]
    fn test_teacher_name_fallback() {
        let tt = school();
        assert_eq!(tt.teacher_name("T1"), "Mr. Khan");
        assert_eq!(tt.teacher_name("T2"), "T2"); // empty name
        assert_eq!(tt.teacher_name("T9"), "T9");
    }

    #[test]
    fn test_find_period() {
        let tt = school();
        let (class_id, slot, period) = tt.find_period("j1b").unwrap();
        assert_eq!(class_id, "7B");
        assert_eq!(slot, at(Day::Monday, 2));
        assert_eq!(period.teacher_id, "T4");
        assert!(tt.find_period("nope").is_none());
    }

    #[test]
    fn test_class_calendar_override() {
        let short = WeekCalendar::weekdays(6);
        let tt = Timetable::new(WeekCalendar::default())
            .with_class(SchoolClass::new("KG").with_calendar(short.clone()))
            .with_class(SchoolClass::new("7A"));
        assert_eq!(tt.calendar_for("KG"), &short);
        assert_eq!(tt.calendar_for("7A").max_periods, 8);
        assert_eq!(tt.grid("KG").unwrap().day(Day::Monday).unwrap().len(), 6);
    }

    #[test]
    fn test_add_class_keeps_existing_grid() {
        let mut tt = school();
        tt.add_class(SchoolClass::new("7A").with_name("Renamed"));
        assert_eq!(tt.class("7A").unwrap().name, "Renamed");
        assert_eq!(tt.grid("7A").unwrap().period_count(), 3);
        assert_eq!(tt.classes.len(), 2);
    }

    #[test]
    fn test_remove_class_subject_cascades() {
        let mut tt = school();
        assert_eq!(tt.remove_class_subject("7A", "math", "T1").unwrap(), 1);
        assert!(tt.grid("7A").unwrap().locate("m1").is_none());
        assert!(tt.class("7A").unwrap().subject_for("math", "T1").is_none());

        // Joint occupants with the same subject stay
        assert_eq!(tt.remove_class_subject("7A", "arabic", "T4").unwrap(), 0);
        assert!(tt.grid("7A").unwrap().locate("j1a").is_some());

        assert!(tt.remove_class_subject("7A", "math", "T1").is_err());
    }

    #[test]
    fn test_remove_split_subject_keeps_other_teacher() {
        let tt = Timetable::new(WeekCalendar::default()).with_class(
            SchoolClass::new("9A")
                .with_subject(ClassSubject::new("pe", "T1", 2))
                .with_subject(ClassSubject::new("pe", "T2", 1)),
        );
        let grid = tt
            .grid("9A")
            .unwrap()
            .clone()
            .with_period(at(Day::Monday, 0), Period::with_id("pe1", "9A", "pe", "T1"))
            .with_period(at(Day::Tuesday, 0), Period::with_id("pe2", "9A", "pe", "T2"));
        let mut tt = tt.with_grid(grid);

        assert!(tt.remove_class_subject("9A", "pe", "T3").is_err());
        assert_eq!(tt.remove_class_subject("9A", "pe", "T1").unwrap(), 1);

        let class = tt.class("9A").unwrap();
        assert_eq!(class.subjects.len(), 1);
        assert_eq!(class.subjects[0].teacher_id, "T2");
        assert!(tt.find_period("pe1").is_none());
        assert!(tt.find_period("pe2").is_some());
    }

    #[test]
    fn test_remove_joint_period_cascades_across_grids() {
        let mut tt = school();
        assert_eq!(tt.remove_joint_period("J1").unwrap(), 2);
        assert!(tt.find_period("j1a").is_none());
        assert!(tt.find_period("j1b").is_none());
        assert!(tt.joint_period("J1").is_none());
        assert!(tt.remove_joint_period("J1").is_err());
    }

    #[test]
    fn test_remove_group_reverts_subjects() {
        let mut tt = school();
        assert_eq!(tt.remove_group("7A", "S1", "bio").unwrap(), 1);

        let class = tt.class("7A").unwrap();
        assert!(class.subject_for("bio", "T2").unwrap().group().is_none());
        assert_eq!(
            class.subject_for("comp", "T3").unwrap().group(),
            Some(("S1", "comp"))
        );
        assert!(!class.group_set("S1").unwrap().has_group("bio"));

        assert!(matches!(
            tt.remove_group("7A", "S1", "bio"),
            Err(TimetableError::NotFound {
                kind: EntityKind::Group,
                ..
            })
        ));
    }

    #[test]
    fn test_remove_group_set_reverts_all_members() {
        let mut tt = school();
        assert_eq!(tt.remove_group_set("7A", "S1").unwrap(), 2);
        let class = tt.class("7A").unwrap();
        assert!(class.subjects.iter().all(|s| s.group().is_none()));
        assert!(class.group_sets.is_empty());
    }
}
