//! Weekly class grid model.
//!
//! A grid is one class's week: for every configured day an array of
//! slots, each slot holding the periods placed there.
//!
//! # Structural Sharing
//! Each day's slot array sits behind an [`Arc`]. Writers never mutate a
//! day in place; they build a new array for the touched day and swap it
//! in, so untouched days keep pointer identity across updates
//! (`Arc::ptr_eq`) and clones of a grid are cheap.

use std::collections::BTreeMap;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use super::{Day, Period, WeekCalendar};

/// Coordinates of one slot within a class grid.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct SlotRef {
    pub day: Day,
    /// Zero-based period index.
    pub period_index: usize,
}

impl SlotRef {
    pub fn new(day: Day, period_index: usize) -> Self {
        Self { day, period_index }
    }
}

/// Periods placed in one `(day, period_index)` cell.
///
/// Insertion order carries no meaning.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Slot {
    pub periods: Vec<Period>,
}

impl Slot {
    pub fn new() -> Self {
        Self::default()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.periods.is_empty()
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.periods.len()
    }

    /// Finds a period by id.
    pub fn find(&self, period_id: &str) -> Option<&Period> {
        self.periods.iter().find(|p| p.id == period_id)
    }

    pub fn contains(&self, period_id: &str) -> bool {
        self.find(period_id).is_some()
    }

    /// Whether any period here is taught by `teacher_id`.
    pub fn has_teacher(&self, teacher_id: &str) -> bool {
        self.periods.iter().any(|p| p.teacher_id == teacher_id)
    }
}

/// Shared, immutable slot array of one day.
pub type DaySlots = Arc<Vec<Slot>>;

/// One class's weekly grid.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Grid {
    /// Owning class id; every contained period carries it.
    pub class_id: String,
    days: BTreeMap<Day, DaySlots>,
}

impl Grid {
    /// Creates an empty grid with `max_periods` slots per configured day.
    pub fn new(class_id: impl Into<String>, calendar: &WeekCalendar) -> Self {
        let days = calendar
            .configured_days()
            .map(|day| (day, Arc::new(vec![Slot::new(); calendar.max_periods])))
            .collect();
        Self {
            class_id: class_id.into(),
            days,
        }
    }

    /// Adds a period to a slot, rebuilding only that day's array.
    ///
    /// Intended for assembling fixtures and restored data; checked
    /// placement goes through [`crate::placement`]. Out-of-range
    /// coordinates are ignored.
    pub fn with_period(mut self, at: SlotRef, period: Period) -> Self {
        if let Some(slots) = self.days.get(&at.day) {
            if at.period_index < slots.len() {
                let mut next = slots.to_vec();
                next[at.period_index].periods.push(period);
                self.replace_day(at.day, next);
            }
        }
        self
    }

    /// Slot array of a day.
    pub fn day(&self, day: Day) -> Option<&DaySlots> {
        self.days.get(&day)
    }

    /// Days present in the grid, in week order.
    pub fn days(&self) -> impl Iterator<Item = (Day, &DaySlots)> {
        self.days.iter().map(|(d, s)| (*d, s))
    }

    /// Slot at the given coordinates.
    pub fn slot(&self, at: SlotRef) -> Option<&Slot> {
        self.days.get(&at.day)?.get(at.period_index)
    }

    /// Open slots under `calendar`: active days, indices below the active count.
    pub fn open_slots<'a>(
        &'a self,
        calendar: &'a WeekCalendar,
    ) -> impl Iterator<Item = (SlotRef, &'a Slot)> + 'a {
        calendar.active_days().flat_map(move |day| {
            let open = calendar.active_period_count(day);
            self.days
                .get(&day)
                .into_iter()
                .flat_map(move |slots| slots.iter().take(open).enumerate())
                .map(move |(idx, slot)| (SlotRef::new(day, idx), slot))
        })
    }

    /// Every placed period with its coordinates, open or not.
    pub fn periods(&self) -> impl Iterator<Item = (SlotRef, &Period)> {
        self.days.iter().flat_map(|(day, slots)| {
            slots.iter().enumerate().flat_map(move |(idx, slot)| {
                slot.periods
                    .iter()
                    .map(move |p| (SlotRef::new(*day, idx), p))
            })
        })
    }

    /// Coordinates of the slot holding `period_id`.
    pub fn locate(&self, period_id: &str) -> Option<SlotRef> {
        self.periods()
            .find(|(_, p)| p.id == period_id)
            .map(|(at, _)| at)
    }

    /// Number of placed periods.
    pub fn period_count(&self) -> usize {
        self.periods().count()
    }

    /// Swaps in a new slot array for `day`.
    pub(crate) fn replace_day(&mut self, day: Day, slots: Vec<Slot>) {
        self.days.insert(day, Arc::new(slots));
    }

    /// Keeps only periods matching `keep`, rebuilding just the days that
    /// lose something. Returns the number of periods dropped.
    pub(crate) fn retain(&mut self, mut keep: impl FnMut(&Period) -> bool) -> usize {
        let mut rebuilt = Vec::new();
        let mut dropped = 0;
        for (day, slots) in &self.days {
            if slots.iter().flat_map(|s| &s.periods).all(&mut keep) {
                continue;
            }
            let next: Vec<Slot> = slots
                .iter()
                .map(|slot| Slot {
                    periods: slot.periods.iter().filter(|p| keep(*p)).cloned().collect(),
                })
                .collect();
            dropped += slots.iter().map(Slot::len).sum::<usize>()
                - next.iter().map(Slot::len).sum::<usize>();
            rebuilt.push((*day, next));
        }
        for (day, next) in rebuilt {
            self.replace_day(day, next);
        }
        dropped
    }
}
