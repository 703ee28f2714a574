//! Teacher workload metrics.
//!
//! Derived from the grids and the adjustment log on demand.
//!
//! # Metrics
//!
//! | Metric | Definition |
//! |--------|-----------|
//! | Daily count | Distinct open `(day, index)` cells the teacher occupies |
//! | Weekly periods | Sum of daily counts |
//! | Joint periods | Cells where at least one occurrence is a joint period |
//! | Substitutions taken | Adjustments the teacher covered |
//! | Leaves taken | Adjustments the teacher was covered for |
//! | Total workload | `weekly + substitutions - leaves` |
//!
//! A joint period taught to three classes in one slot is one teaching
//! period, not three; cells are deduplicated across classes.

use std::collections::{BTreeMap, BTreeSet};
use std::ops::RangeInclusive;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::models::{Adjustment, Day, Timetable};

/// Workload of one teacher.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TeacherWorkload {
    pub teacher_id: String,
    /// Teaching periods per active day (days without teaching are absent).
    pub daily_counts: BTreeMap<Day, u32>,
    /// Sum of `daily_counts`.
    pub weekly_periods: u32,
    /// Cells taught as a joint period.
    pub joint_periods_count: u32,
    /// Adjustments where this teacher was the substitute.
    pub substitutions_taken: u32,
    /// Adjustments where this teacher was the original teacher.
    pub leaves_taken: u32,
    /// `weekly + substitutions - leaves`; may be negative.
    pub total_workload: i64,
}

impl TeacherWorkload {
    /// Computes the workload counting every recorded adjustment.
    pub fn calculate(tt: &Timetable, teacher_id: &str) -> Self {
        Self::aggregate(tt, teacher_id, tt.adjustments.iter().map(|(_, a)| a))
    }

    /// Like [`calculate`](Self::calculate), with adjustments restricted to
    /// the dates in `range` (inclusive).
    pub fn calculate_between(
        tt: &Timetable,
        teacher_id: &str,
        range: RangeInclusive<NaiveDate>,
    ) -> Self {
        Self::aggregate(tt, teacher_id, tt.adjustments.between(range).map(|(_, a)| a))
    }

    fn aggregate<'a>(
        tt: &Timetable,
        teacher_id: &str,
        adjustments: impl Iterator<Item = &'a Adjustment>,
    ) -> Self {
        // Cell -> whether any occurrence is joint
        let mut cells: BTreeMap<(Day, usize), bool> = BTreeMap::new();
        for (class_id, grid) in tt.grids() {
            let calendar = tt.calendar_for(class_id);
            for (at, slot) in grid.open_slots(calendar) {
                for period in slot.periods.iter().filter(|p| p.teacher_id == teacher_id) {
                    let joint = cells.entry((at.day, at.period_index)).or_insert(false);
                    *joint |= period.is_joint();
                }
            }
        }

        let mut daily_counts: BTreeMap<Day, u32> = BTreeMap::new();
        for (day, _) in cells.keys() {
            *daily_counts.entry(*day).or_insert(0) += 1;
        }
        let weekly_periods = cells.len() as u32;
        let joint_periods_count = cells.values().filter(|j| **j).count() as u32;

        let mut substitutions_taken = 0;
        let mut leaves_taken = 0;
        for adj in adjustments {
            if adj.substitute_teacher_id == teacher_id {
                substitutions_taken += 1;
            }
            if adj.original_teacher_id == teacher_id {
                leaves_taken += 1;
            }
        }

        let total_workload =
            i64::from(weekly_periods) + i64::from(substitutions_taken) - i64::from(leaves_taken);
        debug!(
            teacher_id,
            weekly_periods, joint_periods_count, substitutions_taken, leaves_taken, "Workload computed"
        );

        Self {
            teacher_id: teacher_id.to_string(),
            daily_counts,
            weekly_periods,
            joint_periods_count,
            substitutions_taken,
            leaves_taken,
            total_workload,
        }
    }

    /// Periods taught on `day`.
    pub fn on(&self, day: Day) -> u32 {
        self.daily_counts.get(&day).copied().unwrap_or(0)
    }

    /// Total for display, floored at zero.
    pub fn display_total(&self) -> u32 {
        u32::try_from(self.total_workload.max(0)).unwrap_or(u32::MAX)
    }
}

/// Workload of every registered teacher, in registry order.
pub fn all_workloads(tt: &Timetable) -> Vec<TeacherWorkload> {
    tt.teachers
        .iter()
        .map(|t| TeacherWorkload::calculate(tt, &t.id))
        .collect()
}

/// Teachers appearing in grids or adjustments, registered or not.
pub fn active_teacher_ids(tt: &Timetable) -> BTreeSet<&str> {
    let mut ids: BTreeSet<&str> = tt
        .grids()
        .flat_map(|(_, g)| g.periods().map(|(_, p)| p.teacher_id.as_str()))
        .collect();
    for (_, adj) in tt.adjustments.iter() {
        ids.insert(&adj.original_teacher_id);
        ids.insert(&adj.substitute_teacher_id);
    }
    ids
}
