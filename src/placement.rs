//! Placement engine: checked place / remove / move of period units.
//!
//! # Transactions
//!
//! Every operation runs in three phases:
//! 1. **Expand** the unit: joint-period occupants pull in their mirrors
//!    (one per assigned class, same slot).
//! 2. **Check** every target slot of every touched class against the
//!    availability rules, and **stage** new day arrays in a scratch map.
//! 3. **Commit** the staged arrays by swapping them into the grids.
//!
//! Nothing is written before phase 3 and phase 3 cannot fail, so a
//! rejected request leaves the timetable untouched and a joint period is
//! never left split across two times.
//!
//! # Overrides
//!
//! A teacher double-booking may be pushed through with
//! [`PlacementOptions::confirm_teacher_conflict`]. Closed slots and
//! composition conflicts are never overridable, and neither is a second
//! occupant of a joint period already in the target slot; composition enforcement
//! can be relaxed to advisory only through [`EngineConfig`].

use std::collections::btree_map::Entry;
use std::collections::{BTreeMap, HashSet};

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::availability::{self, Conflict};
use crate::config::EngineConfig;
use crate::error::{EntityKind, Result, TimetableError};
use crate::models::{Day, Period, Slot, SlotRef, Timetable};

/// Per-call placement policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PlacementOptions {
    /// Block composition conflicts (rule 3) at commit.
    pub enforce_composition: bool,
    /// Whether teacher-conflict overrides are honoured at all.
    pub allow_teacher_override: bool,
    /// Caller confirmed a teacher double-booking.
    pub override_teacher_conflict: bool,
}

impl Default for PlacementOptions {
    fn default() -> Self {
        Self::from_config(&EngineConfig::default())
    }
}

impl PlacementOptions {
    /// Options derived from engine configuration, without an override.
    pub fn from_config(config: &EngineConfig) -> Self {
        Self {
            enforce_composition: config.enforce_composition,
            allow_teacher_override: config.allow_teacher_override,
            override_teacher_conflict: false,
        }
    }

    /// Proceeds through a teacher double-booking (if allowed).
    pub fn confirm_teacher_conflict(mut self) -> Self {
        self.override_teacher_conflict = true;
        self
    }

    fn overrides_teacher(&self) -> bool {
        self.allow_teacher_override && self.override_teacher_conflict
    }
}

/// What a committed operation changed.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PlacementOutcome {
    /// Periods now at the target (mirrors included).
    pub placed: Vec<Period>,
    /// Periods taken out of the source (mirrors included).
    pub removed: Vec<Period>,
    /// `(class_id, day)` arrays that were rebuilt.
    pub touched: Vec<(String, Day)>,
    /// Teacher conflict pushed through by an override.
    pub overridden: Option<Conflict>,
}

impl PlacementOutcome {
    /// Whether the operation changed nothing.
    pub fn is_noop(&self) -> bool {
        self.touched.is_empty()
    }
}

/// Scratch copies of the day arrays an operation touches.
#[derive(Default)]
struct Staging {
    days: BTreeMap<(String, Day), Vec<Slot>>,
}

impl Staging {
    fn slot_mut(&mut self, tt: &Timetable, class_id: &str, at: SlotRef) -> Result<&mut Slot> {
        let slots = match self.days.entry((class_id.to_string(), at.day)) {
            Entry::Occupied(e) => e.into_mut(),
            Entry::Vacant(e) => {
                let day = tt
                    .grid(class_id)?
                    .day(at.day)
                    .ok_or_else(|| closed_error(class_id, at))?;
                e.insert(day.to_vec())
            }
        };
        slots
            .get_mut(at.period_index)
            .ok_or_else(|| closed_error(class_id, at))
    }

    fn commit(self, tt: &mut Timetable) -> Vec<(String, Day)> {
        let mut touched = Vec::with_capacity(self.days.len());
        for ((class_id, day), slots) in self.days {
            if let Ok(grid) = tt.grid_mut(&class_id) {
                grid.replace_day(day, slots);
                touched.push((class_id, day));
            }
        }
        touched
    }
}

fn closed_error(class_id: &str, at: SlotRef) -> TimetableError {
    TimetableError::ClosedSlot {
        class_id: class_id.to_string(),
        day: at.day,
        period_index: at.period_index,
    }
}

/// Runs every rule on `target` for every class of the unit.
///
/// Returns the overridden teacher conflict, if any.
fn check_targets(
    tt: &Timetable,
    target: SlotRef,
    unit: &BTreeMap<&str, Vec<Period>>,
    ignore: &HashSet<&str>,
    options: PlacementOptions,
) -> Result<Option<Conflict>> {
    let found = availability::unit_conflicts(tt, target, unit, ignore)?;

    if let Some((class_id, conflict)) = found.hard {
        return Err(match conflict {
            Conflict::JointPeriodPresent { joint_period_id } => {
                TimetableError::JointPeriodPresent {
                    joint_period_id,
                    class_id,
                    day: target.day,
                    period_index: target.period_index,
                }
            }
            _ => closed_error(&class_id, target),
        });
    }

    let mut overridden = None;
    if let Some((class_id, conflict)) = found.teacher {
        if let Conflict::TeacherBusy {
            teacher_id,
            teacher_name,
            class_id: busy_class_id,
        } = &conflict
        {
            if !options.overrides_teacher() {
                return Err(TimetableError::TeacherBusy {
                    teacher_id: teacher_id.clone(),
                    teacher_name: teacher_name.clone(),
                    busy_class_id: busy_class_id.clone(),
                    day: target.day,
                    period_index: target.period_index,
                });
            }
            warn!(
                class_id = class_id.as_str(),
                teacher_id = teacher_id.as_str(),
                busy_class_id = busy_class_id.as_str(),
                day = %target.day,
                period_index = target.period_index,
                "Teacher conflict overridden"
            );
        }
        overridden = Some(conflict);
    }

    if let Some((class_id, conflict)) = found.composition {
        if options.enforce_composition {
            return Err(TimetableError::CompositionConflict {
                class_id,
                day: target.day,
                period_index: target.period_index,
                conflict,
            });
        }
        debug!(
            class_id = class_id.as_str(),
            day = %target.day,
            period_index = target.period_index,
            %conflict,
            "Composition conflict accepted (advisory mode)"
        );
    }

    Ok(overridden)
}

/// Places `periods` into `target` of `class_id`.
///
/// Joint occupants get one mirrored period per other assigned class, at
/// the same slot. Periods keep the ids they were given (e.g. virtual ids
/// from the unscheduled pool); an id already placed anywhere is rejected.
pub fn place(
    tt: &mut Timetable,
    class_id: &str,
    periods: &[Period],
    target: SlotRef,
    options: PlacementOptions,
) -> Result<PlacementOutcome> {
    tt.grid(class_id)?;

    let mut seen = HashSet::new();
    let mut unit = Vec::new();
    for period in periods {
        if period.class_id != class_id {
            return Err(TimetableError::ClassMismatch {
                period_id: period.id.clone(),
                expected: class_id.to_string(),
                found: period.class_id.clone(),
            });
        }
        if !seen.insert(period.id.as_str()) || tt.find_period(&period.id).is_some() {
            return Err(TimetableError::DuplicatePeriod(period.id.clone()));
        }
        unit.push(period.clone());
        unit.extend(availability::joint_mirrors(tt, class_id, period)?);
    }
    if unit.is_empty() {
        return Ok(PlacementOutcome::default());
    }

    let grouped = availability::by_class(class_id, &unit);
    let ignore = availability::unit_ids(&unit);
    let overridden = check_targets(tt, target, &grouped, &ignore, options)?;

    let mut staging = Staging::default();
    for p in &unit {
        staging
            .slot_mut(tt, &p.class_id, target)?
            .periods
            .push(p.clone());
    }
    let touched = staging.commit(tt);

    info!(
        class_id,
        day = %target.day,
        period_index = target.period_index,
        placed = unit.len(),
        "Periods placed"
    );
    Ok(PlacementOutcome {
        placed: unit,
        removed: Vec::new(),
        touched,
        overridden,
    })
}

/// Removes `periods` (matched by id) from `source` of `class_id`.
///
/// Joint occupants take their mirrors in other classes with them. Ids not
/// present are ignored; if nothing matches, no day array is rebuilt.
pub fn remove(
    tt: &mut Timetable,
    class_id: &str,
    periods: &[Period],
    source: SlotRef,
) -> Result<PlacementOutcome> {
    let grid = tt.grid(class_id)?;
    let ids: HashSet<&str> = periods.iter().map(|p| p.id.as_str()).collect();
    let Some(slot) = grid.slot(source) else {
        return Ok(PlacementOutcome::default());
    };

    let mut unit: Vec<Period> = slot
        .periods
        .iter()
        .filter(|p| ids.contains(p.id.as_str()))
        .cloned()
        .collect();
    if unit.is_empty() {
        return Ok(PlacementOutcome::default());
    }
    let mirrors = availability::placed_mirrors(tt, class_id, source, &unit);
    unit.extend(mirrors);

    let mut staging = Staging::default();
    let unit_ids = availability::unit_ids(&unit);
    for class in availability::by_class(class_id, &unit).keys() {
        staging
            .slot_mut(tt, class, source)?
            .periods
            .retain(|p| !unit_ids.contains(p.id.as_str()));
    }
    let touched = staging.commit(tt);

    info!(
        class_id,
        day = %source.day,
        period_index = source.period_index,
        removed = unit.len(),
        "Periods removed"
    );
    Ok(PlacementOutcome {
        placed: Vec::new(),
        removed: unit,
        touched,
        overridden: None,
    })
}

/// Moves `periods` from `source` to `target` as one transaction.
///
/// With `source = None` the periods come from outside the grid (the
/// unscheduled pool) and this is a [`place`]. Moved periods keep their
/// ids; joint occupants move with all of their mirrors.
pub fn move_periods(
    tt: &mut Timetable,
    class_id: &str,
    periods: &[Period],
    source: Option<SlotRef>,
    target: SlotRef,
    options: PlacementOptions,
) -> Result<PlacementOutcome> {
    let Some(source) = source else {
        return place(tt, class_id, periods, target, options);
    };

    let grid = tt.grid(class_id)?;
    let slot = grid
        .slot(source)
        .ok_or_else(|| closed_error(class_id, source))?;

    let mut unit = Vec::with_capacity(periods.len());
    for period in periods {
        let placed = slot
            .find(&period.id)
            .ok_or_else(|| TimetableError::not_found(EntityKind::Period, period.id.clone()))?;
        unit.push(placed.clone());
    }
    if unit.is_empty() || source == target {
        return Ok(PlacementOutcome::default());
    }
    let mirrors = availability::placed_mirrors(tt, class_id, source, &unit);
    unit.extend(mirrors);

    let grouped = availability::by_class(class_id, &unit);
    let ignore = availability::unit_ids(&unit);
    let overridden = check_targets(tt, target, &grouped, &ignore, options)?;

    let mut staging = Staging::default();
    for (class, moving) in &grouped {
        staging
            .slot_mut(tt, class, source)?
            .periods
            .retain(|p| !ignore.contains(p.id.as_str()));
        staging
            .slot_mut(tt, class, target)?
            .periods
            .extend(moving.iter().cloned());
    }
    let touched = staging.commit(tt);

    info!(
        class_id,
        from_day = %source.day,
        from_index = source.period_index,
        to_day = %target.day,
        to_index = target.period_index,
        moved = unit.len(),
        "Periods moved"
    );
    Ok(PlacementOutcome {
        placed: unit.clone(),
        removed: unit,
        touched,
        overridden,
    })
}
