//! Slot availability checks.
//!
//! Decides whether a set of periods, moved as one unit, may occupy a
//! slot of a class grid, and renders that decision for every slot of the
//! class as an [`AvailabilityGrid`].
//!
//! # Rules
//!
//! Applied in order; the first one that fires is reported.
//!
//! | # | Rule | Conflict |
//! |---|------|----------|
//! | 1 | Index at or past the day's open period count | `Closed` |
//! | 1 | Joint period would occupy the slot twice | `JointPeriodPresent` |
//! | 2 | A candidate's teacher already teaches another class in that slot | `TeacherBusy` |
//! | 3 | Slot would mix grouped and ungrouped periods | `MixedStandardAndGrouped` |
//! | 3 | Slot would hold more than one group set | `MixedGroupSets` |
//! | 3 | Slot would hold the same group twice | `DuplicateGroup` |
//!
//! Joint candidates are checked as a unit with their mirrors, and every
//! rule is applied in every class the unit touches. Rule 2 ignores the
//! periods of the moving unit, and reads committed state only. Joint
//! occupants count as ungrouped for rule 3.
//!
//! All functions here are pure; enforcement happens in [`crate::placement`].

use std::collections::{BTreeMap, HashSet};
use std::fmt;

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::error::{EntityKind, Result, TimetableError};
use crate::models::{Day, Period, SlotRef, Timetable, WeekCalendar};

/// Why a slot cannot take the candidate periods.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Conflict {
    /// Slot is past the day's open period count.
    Closed,
    /// Teacher already teaches `class_id` in this slot.
    TeacherBusy {
        teacher_id: String,
        teacher_name: String,
        class_id: String,
    },
    /// Grouped and ungrouped periods in one slot.
    MixedStandardAndGrouped,
    /// Periods from different group sets in one slot.
    MixedGroupSets,
    /// The same group twice in one slot.
    DuplicateGroup {
        group_set_id: String,
        group_id: String,
    },
    /// The joint period already occupies this slot.
    JointPeriodPresent { joint_period_id: String },
}

impl Conflict {
    /// Whether this is a slot composition (rule 3) conflict.
    pub fn is_composition(&self) -> bool {
        matches!(
            self,
            Self::MixedStandardAndGrouped | Self::MixedGroupSets | Self::DuplicateGroup { .. }
        )
    }
}

impl fmt::Display for Conflict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Closed => f.write_str("Closed"),
            Self::TeacherBusy { teacher_name, .. } => write!(f, "{teacher_name} is busy"),
            Self::MixedStandardAndGrouped => f.write_str("Cannot mix Standard & Grouped"),
            Self::MixedGroupSets => f.write_str("Mixed Group Sets"),
            Self::DuplicateGroup { .. } => f.write_str("Duplicate group"),
            Self::JointPeriodPresent { .. } => f.write_str("Joint period already here"),
        }
    }
}

/// Decision for one slot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum SlotStatus {
    Available,
    Conflict(Conflict),
}

impl SlotStatus {
    #[inline]
    pub fn is_available(&self) -> bool {
        matches!(self, Self::Available)
    }

    pub fn conflict(&self) -> Option<&Conflict> {
        match self {
            Self::Available => None,
            Self::Conflict(c) => Some(c),
        }
    }

    /// Human-readable reason, if conflicting.
    pub fn reason(&self) -> Option<String> {
        self.conflict().map(Conflict::to_string)
    }
}

impl From<Option<Conflict>> for SlotStatus {
    fn from(conflict: Option<Conflict>) -> Self {
        conflict.map_or(Self::Available, Self::Conflict)
    }
}

/// Availability of every slot of one class for a candidate unit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AvailabilityGrid {
    pub class_id: String,
    /// Configured day → status per period index (`max_periods` entries).
    pub cells: BTreeMap<Day, Vec<SlotStatus>>,
}

impl AvailabilityGrid {
    pub fn status(&self, at: SlotRef) -> Option<&SlotStatus> {
        self.cells.get(&at.day)?.get(at.period_index)
    }

    /// Slots that accept the unit, in week order.
    pub fn available_slots(&self) -> impl Iterator<Item = SlotRef> + '_ {
        self.cells.iter().flat_map(|(day, row)| {
            row.iter()
                .enumerate()
                .filter(|(_, s)| s.is_available())
                .map(move |(idx, _)| SlotRef::new(*day, idx))
        })
    }

    /// Number of conflicting cells matching `pred`.
    pub fn count_conflicts(&self, pred: impl Fn(&Conflict) -> bool) -> usize {
        self.cells
            .values()
            .flatten()
            .filter_map(SlotStatus::conflict)
            .filter(|c| pred(*c))
            .count()
    }
}

/// Rule 1.
pub fn closed_conflict(calendar: &WeekCalendar, at: SlotRef) -> Option<Conflict> {
    (!calendar.is_open(at.day, at.period_index)).then_some(Conflict::Closed)
}

/// Rule 2: first candidate whose teacher is already in another class's slot.
pub fn teacher_conflict(
    tt: &Timetable,
    class_id: &str,
    at: SlotRef,
    candidates: &[Period],
    ignore: &HashSet<&str>,
) -> Option<Conflict> {
    for candidate in candidates {
        for (other_id, grid) in tt.grids() {
            if other_id == class_id {
                continue;
            }
            let Some(slot) = grid.slot(at) else {
                continue;
            };
            let busy = slot
                .periods
                .iter()
                .any(|p| p.teacher_id == candidate.teacher_id && !ignore.contains(p.id.as_str()));
            if busy {
                return Some(Conflict::TeacherBusy {
                    teacher_id: candidate.teacher_id.clone(),
                    teacher_name: tt.teacher_name(&candidate.teacher_id).to_string(),
                    class_id: other_id.to_string(),
                });
            }
        }
    }
    None
}

/// Rule 3 over `existing ∪ candidates`.
pub fn composition_conflict<'a>(
    tt: &Timetable,
    existing: impl IntoIterator<Item = &'a Period>,
    candidates: &'a [Period],
) -> Option<Conflict> {
    let mut grouped: Vec<(&str, &str)> = Vec::new();
    let mut has_standard = false;

    for period in existing.into_iter().chain(candidates) {
        match tt.group_of(period) {
            Some(group) => grouped.push(group),
            None => has_standard = true,
        }
    }

    if grouped.is_empty() {
        return None;
    }
    if has_standard {
        return Some(Conflict::MixedStandardAndGrouped);
    }

    let first_set = grouped[0].0;
    if grouped.iter().any(|(set, _)| *set != first_set) {
        return Some(Conflict::MixedGroupSets);
    }

    let mut seen = HashSet::new();
    for (set, group) in &grouped {
        if !seen.insert((*set, *group)) {
            return Some(Conflict::DuplicateGroup {
                group_set_id: set.to_string(),
                group_id: group.to_string(),
            });
        }
    }
    None
}

/// A joint period occupies a slot of a class at most once.
pub fn joint_conflict<'a>(
    existing: impl IntoIterator<Item = &'a Period>,
    candidates: &'a [Period],
) -> Option<Conflict> {
    let mut seen = HashSet::new();
    existing
        .into_iter()
        .chain(candidates)
        .filter_map(|p| p.joint_period_id.as_deref())
        .find(|jp| !seen.insert(*jp))
        .map(|jp| Conflict::JointPeriodPresent {
            joint_period_id: jp.to_string(),
        })
}

/// Builds the mirrors a new joint occupant needs in the other assigned classes.
pub(crate) fn joint_mirrors(tt: &Timetable, class_id: &str, period: &Period) -> Result<Vec<Period>> {
    let Some(jp_id) = period.joint_period_id.as_deref() else {
        return Ok(Vec::new());
    };
    let jp = tt
        .joint_period(jp_id)
        .ok_or_else(|| TimetableError::not_found(EntityKind::JointPeriod, jp_id))?;
    if !jp.includes_class(class_id) {
        debug!(class_id, joint_period_id = jp_id, "Class is not assigned to joint period");
        return Err(TimetableError::not_found(EntityKind::JointPeriod, jp_id));
    }

    jp.assignments
        .iter()
        .filter(|a| a.class_id != class_id)
        .map(|a| {
            tt.grid(&a.class_id)?;
            Ok(
                Period::new(a.class_id.clone(), a.subject_id.clone(), jp.teacher_id.clone())
                    .in_joint_period(jp.id.clone()),
            )
        })
        .collect()
}

/// Mirrors at `at` of the joint occupants of `unit`: exactly one per
/// other assigned class for each occupant.
pub(crate) fn placed_mirrors(
    tt: &Timetable,
    class_id: &str,
    at: SlotRef,
    unit: &[Period],
) -> Vec<Period> {
    let mut taken: HashSet<&str> = HashSet::new();
    let mut mirrors = Vec::new();

    for jp_id in unit.iter().filter_map(|p| p.joint_period_id.as_deref()) {
        let Some(jp) = tt.joint_period(jp_id) else {
            warn!(joint_period_id = jp_id, class_id, "Joint period unknown");
            continue;
        };
        for a in jp.assignments.iter().filter(|a| a.class_id != class_id) {
            let mirror = tt
                .grid(&a.class_id)
                .ok()
                .and_then(|g| g.slot(at))
                .and_then(|slot| {
                    slot.periods.iter().find(|p| {
                        p.joint_period_id.as_deref() == Some(jp_id)
                            && !taken.contains(p.id.as_str())
                    })
                });
            match mirror {
                Some(m) => {
                    taken.insert(m.id.as_str());
                    mirrors.push(m.clone());
                }
                None => warn!(
                    joint_period_id = jp_id,
                    class_id = a.class_id.as_str(),
                    day = %at.day,
                    period_index = at.period_index,
                    "Joint period mirror missing"
                ),
            }
        }
    }
    mirrors
}

/// The full unit for `candidates` of `class_id`: the candidates plus
/// their joint mirrors. Candidates already in the grid bring the mirrors
/// placed beside them; new joint candidates get fresh ones.
pub(crate) fn expand_unit(
    tt: &Timetable,
    class_id: &str,
    candidates: &[Period],
) -> Result<Vec<Period>> {
    let grid = tt.grid(class_id)?;
    let mut unit = candidates.to_vec();
    let mut placed: BTreeMap<SlotRef, Vec<Period>> = BTreeMap::new();

    for candidate in candidates.iter().filter(|p| p.is_joint()) {
        match grid.locate(&candidate.id) {
            Some(at) => placed.entry(at).or_default().push(candidate.clone()),
            None => unit.extend(joint_mirrors(tt, class_id, candidate)?),
        }
    }
    for (at, occupants) in &placed {
        unit.extend(placed_mirrors(tt, class_id, *at, occupants));
    }
    Ok(unit)
}

/// Groups a unit's periods by the class grid they belong to. `class_id`
/// is always present, so an empty unit is still checked against it.
pub(crate) fn by_class<'a>(class_id: &'a str, unit: &'a [Period]) -> BTreeMap<&'a str, Vec<Period>> {
    let mut out: BTreeMap<&str, Vec<Period>> = BTreeMap::new();
    out.entry(class_id).or_default();
    for p in unit {
        out.entry(p.class_id.as_str()).or_default().push(p.clone());
    }
    out
}

/// First conflict of each kind found for a unit at one slot, with the
/// class it was found in.
#[derive(Debug, Default)]
pub(crate) struct UnitConflicts {
    /// Rule 1 or a repeated joint period; never overridable.
    pub hard: Option<(String, Conflict)>,
    pub teacher: Option<(String, Conflict)>,
    pub composition: Option<(String, Conflict)>,
}

impl UnitConflicts {
    pub fn first(self) -> Option<Conflict> {
        self.hard
            .or(self.teacher)
            .or(self.composition)
            .map(|(_, conflict)| conflict)
    }
}

/// Runs every rule on `at` for each class of the unit, ignoring the ids
/// in `ignore`.
pub(crate) fn unit_conflicts(
    tt: &Timetable,
    at: SlotRef,
    unit: &BTreeMap<&str, Vec<Period>>,
    ignore: &HashSet<&str>,
) -> Result<UnitConflicts> {
    let mut existing = BTreeMap::new();
    for class_id in unit.keys() {
        let periods: Vec<&Period> = tt
            .grid(class_id)?
            .slot(at)
            .into_iter()
            .flat_map(|s| &s.periods)
            .filter(|p| !ignore.contains(p.id.as_str()))
            .collect();
        existing.insert(*class_id, periods);
    }

    let closed = unit
        .keys()
        .find_map(|c| closed_conflict(tt.calendar_for(c), at).map(|x| (c.to_string(), x)));
    let repeated = || {
        unit.iter().find_map(|(c, periods)| {
            joint_conflict(existing[c].iter().copied(), periods).map(|x| (c.to_string(), x))
        })
    };

    Ok(UnitConflicts {
        hard: closed.or_else(repeated),
        teacher: unit.iter().find_map(|(c, periods)| {
            teacher_conflict(tt, c, at, periods, ignore).map(|x| (c.to_string(), x))
        }),
        composition: unit.iter().find_map(|(c, periods)| {
            composition_conflict(tt, existing[c].iter().copied(), periods)
                .map(|x| (c.to_string(), x))
        }),
    })
}

/// Ids of every period in `unit`.
pub(crate) fn unit_ids(unit: &[Period]) -> HashSet<&str> {
    unit.iter().map(|p| p.id.as_str()).collect()
}

/// Decides whether `candidates` may occupy `at` in `class_id`.
///
/// Joint candidates are checked together with their mirrors, in every
/// assigned class.
pub fn check_slot(
    tt: &Timetable,
    class_id: &str,
    at: SlotRef,
    candidates: &[Period],
) -> Result<SlotStatus> {
    let unit = expand_unit(tt, class_id, candidates)?;
    let ignore = unit_ids(&unit);
    let status: SlotStatus = unit_conflicts(tt, at, &by_class(class_id, &unit), &ignore)?
        .first()
        .into();
    debug!(class_id, day = %at.day, period_index = at.period_index, ?status, "Slot checked");
    Ok(status)
}

/// Availability matrix of `class_id` for a candidate unit.
///
/// Covers every configured day and every slot position of the class grid,
/// closed ones included. A cell is available only if every class the
/// unit touches accepts it.
pub fn compute_availability(
    tt: &Timetable,
    class_id: &str,
    candidates: &[Period],
) -> Result<AvailabilityGrid> {
    let grid = tt.grid(class_id)?;
    let unit = expand_unit(tt, class_id, candidates)?;
    let ignore = unit_ids(&unit);
    let grouped = by_class(class_id, &unit);

    let mut cells = BTreeMap::new();
    for (day, slots) in grid.days() {
        let row = (0..slots.len())
            .map(|idx| {
                let found = unit_conflicts(tt, SlotRef::new(day, idx), &grouped, &ignore)?;
                Ok(SlotStatus::from(found.first()))
            })
            .collect::<Result<Vec<SlotStatus>>>()?;
        cells.insert(day, row);
    }

    Ok(AvailabilityGrid {
        class_id: class_id.to_string(),
        cells,
    })
}
