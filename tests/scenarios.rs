//! End-to-end editing scenarios against the public API.

use std::sync::Arc;

use u_timetable::availability::{check_slot, compute_availability, Conflict, SlotStatus};
use u_timetable::models::{
    ClassSubject, Day, GroupSet, JointPeriod, Period, RequirementKey, SchoolClass, SlotRef,
    Subject, Teacher, Timetable, WeekCalendar,
};
use u_timetable::placement::{move_periods, place, remove, PlacementOptions};
use u_timetable::resolver::{compute_unscheduled, placed_count};
use u_timetable::validation::validate_timetable;
use u_timetable::workload::TeacherWorkload;
use u_timetable::TimetableError;

fn at(day: Day, idx: usize) -> SlotRef {
    SlotRef::new(day, idx)
}

fn opts() -> PlacementOptions {
    PlacementOptions::default()
}

fn school() -> Timetable {
    Timetable::new(WeekCalendar::default())
        .with_teacher(Teacher::new("T-math", "Ms. Huda"))
        .with_teacher(Teacher::new("T-bio", "Mr. Faris"))
        .with_teacher(Teacher::new("T-comp", "Ms. Lina"))
        .with_teacher(Teacher::new("T-ar", "Mr. Omar"))
        .with_subject(Subject::new("math", "Mathematics"))
        .with_subject(Subject::new("bio", "Biology"))
        .with_subject(Subject::new("comp", "Computing"))
        .with_subject(Subject::new("arabic-a", "Arabic A"))
        .with_subject(Subject::new("arabic-b", "Arabic B"))
        .with_class(
            SchoolClass::new("A")
                .with_name("Grade 7 A")
                .with_subject(ClassSubject::new("math", "T-math", 5))
                .with_subject(ClassSubject::new("bio", "T-bio", 2).in_group("S1", "bio"))
                .with_subject(ClassSubject::new("comp", "T-comp", 2).in_group("S1", "comp"))
                .with_group_set(
                    GroupSet::new("S1", "Science electives")
                        .with_group("bio", "Biology")
                        .with_group("comp", "Computing"),
                ),
        )
        .with_class(
            SchoolClass::new("B")
                .with_name("Grade 7 B")
                .with_subject(ClassSubject::new("math", "T-math", 5)),
        )
        .with_joint_period(
            JointPeriod::new("J", "T-ar", 2)
                .with_name("Combined Arabic")
                .with_assignment("A", "arabic-a")
                .with_assignment("B", "arabic-b"),
        )
}

fn next_virtual(tt: &Timetable, class_id: &str, key: &RequirementKey) -> Period {
    compute_unscheduled(tt, class_id)
        .unwrap()
        .group(key)
        .unwrap()
        .periods[0]
        .clone()
}

fn math() -> RequirementKey {
    RequirementKey::Subject("math".into())
}

#[test]
fn test_math_pool_shrinks_as_periods_are_placed() {
    let mut tt = school();
    for day in [Day::Monday, Day::Tuesday, Day::Wednesday] {
        let p = next_virtual(&tt, "A", &math());
        place(&mut tt, "A", &[p], at(day, 0), opts()).unwrap();
    }
    assert_eq!(compute_unscheduled(&tt, "A").unwrap().count_for(&math()), 2);

    let p = next_virtual(&tt, "A", &math());
    place(&mut tt, "A", &[p], at(Day::Thursday, 0), opts()).unwrap();
    assert_eq!(compute_unscheduled(&tt, "A").unwrap().count_for(&math()), 1);
}

#[test]
fn test_dragging_busy_teacher_into_other_class() {
    let mut tt = school();
    let p = next_virtual(&tt, "A", &math());
    place(&mut tt, "A", &[p], at(Day::Monday, 1), opts()).unwrap();

    let candidate = next_virtual(&tt, "B", &math());
    let status = check_slot(&tt, "B", at(Day::Monday, 1), &[candidate.clone()]).unwrap();
    assert_eq!(status.reason().as_deref(), Some("Ms. Huda is busy"));

    let err = place(&mut tt, "B", &[candidate], at(Day::Monday, 1), opts()).unwrap_err();
    assert!(matches!(
        err,
        TimetableError::TeacherBusy { ref teacher_id, ref busy_class_id, .. }
            if teacher_id == "T-math" && busy_class_id == "A"
    ));
}

#[test]
fn test_group_composition_in_availability_matrix() {
    let mut tt = school();
    let bio = next_virtual(&tt, "A", &RequirementKey::Subject("bio".into()));
    place(&mut tt, "A", &[bio], at(Day::Monday, 0), opts()).unwrap();

    let comp = next_virtual(&tt, "A", &RequirementKey::Subject("comp".into()));
    let another_bio = next_virtual(&tt, "A", &RequirementKey::Subject("bio".into()));
    let plain = next_virtual(&tt, "A", &math());

    let slot = at(Day::Monday, 0);
    let matrix = |p: &Period| compute_availability(&tt, "A", &[p.clone()]).unwrap();
    assert_eq!(matrix(&comp).status(slot), Some(&SlotStatus::Available));
    assert_eq!(
        matrix(&another_bio).status(slot).and_then(SlotStatus::reason).as_deref(),
        Some("Duplicate group")
    );
    assert_eq!(
        matrix(&plain).status(slot).and_then(SlotStatus::reason).as_deref(),
        Some("Cannot mix Standard & Grouped")
    );
}

#[test]
fn test_joint_period_mirrors_and_moves_together() {
    let mut tt = school();
    let joint = RequirementKey::Joint("J".into());
    let p = next_virtual(&tt, "A", &joint);
    let out = place(&mut tt, "A", &[p.clone()], at(Day::Monday, 2), opts()).unwrap();
    assert_eq!(out.placed.len(), 2);

    for (class, subject) in [("A", "arabic-a"), ("B", "arabic-b")] {
        let slot = tt.grid(class).unwrap().slot(at(Day::Monday, 2)).unwrap();
        assert_eq!(slot.len(), 1);
        assert_eq!(slot.periods[0].subject_id, subject);
        assert_eq!(slot.periods[0].joint_period_id.as_deref(), Some("J"));
    }
    assert_eq!(placed_count(&tt, "B", &joint).unwrap(), 1);

    // The teacher is not busy against their own mirror when moving
    let status = check_slot(&tt, "A", at(Day::Friday, 7), &[p.clone()]).unwrap();
    assert!(status.is_available());

    move_periods(&mut tt, "A", &[p], Some(at(Day::Monday, 2)), at(Day::Friday, 7), opts()).unwrap();
    assert!(tt.grid("B").unwrap().slot(at(Day::Monday, 2)).unwrap().is_empty());
    assert_eq!(tt.grid("B").unwrap().slot(at(Day::Friday, 7)).unwrap().len(), 1);

    let wl = TeacherWorkload::calculate(&tt, "T-ar");
    assert_eq!(wl.weekly_periods, 1);
    assert_eq!(wl.joint_periods_count, 1);
    assert!(validate_timetable(&tt).is_ok());
}

#[test]
fn test_requirement_conservation() {
    let mut tt = school();
    let key = math();
    let check = |tt: &Timetable| {
        let placed = placed_count(tt, "A", &key).unwrap();
        let pool = compute_unscheduled(tt, "A").unwrap();
        assert_eq!(placed + pool.count_for(&key) as u32, 5);
    };

    check(&tt);
    let p = next_virtual(&tt, "A", &key);
    place(&mut tt, "A", &[p.clone()], at(Day::Tuesday, 3), opts()).unwrap();
    check(&tt);
    remove(&mut tt, "A", &[p], at(Day::Tuesday, 3)).unwrap();
    check(&tt);
}

#[test]
fn test_remove_absent_period_keeps_day_identity() {
    let mut tt = school();
    let before = Arc::clone(tt.grid("A").unwrap().day(Day::Monday).unwrap());
    let ghost = Period::new("A", "math", "T-math");
    let out = remove(&mut tt, "A", &[ghost], at(Day::Monday, 0)).unwrap();
    assert!(out.is_noop());
    assert!(Arc::ptr_eq(&before, tt.grid("A").unwrap().day(Day::Monday).unwrap()));
}

#[test]
fn test_rejected_move_leaves_timetable_untouched() {
    let mut tt = school();
    let bio = next_virtual(&tt, "A", &RequirementKey::Subject("bio".into()));
    place(&mut tt, "A", &[bio], at(Day::Wednesday, 4), opts()).unwrap();
    let m = next_virtual(&tt, "A", &math());
    place(&mut tt, "A", &[m.clone()], at(Day::Wednesday, 5), opts()).unwrap();
    let snapshot = tt.clone();

    let err = move_periods(
        &mut tt,
        "A",
        &[m],
        Some(at(Day::Wednesday, 5)),
        at(Day::Wednesday, 4),
        opts().confirm_teacher_conflict(),
    )
    .unwrap_err();
    assert!(matches!(
        err,
        TimetableError::CompositionConflict {
            conflict: Conflict::MixedStandardAndGrouped,
            ..
        }
    ));
    assert_eq!(tt, snapshot);
}

#[test]
fn test_timetable_persists_as_json() {
    let mut tt = school();
    let p = next_virtual(&tt, "A", &RequirementKey::Joint("J".into()));
    place(&mut tt, "A", &[p], at(Day::Thursday, 1), opts()).unwrap();

    let json = serde_json::to_string(&tt).unwrap();
    let restored: Timetable = serde_json::from_str(&json).unwrap();
    assert_eq!(restored, tt);
    assert!(validate_timetable(&restored).is_ok());
}
