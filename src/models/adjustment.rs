//! Substitution (adjustment) records.
//!
//! An adjustment is a one-off cover: on a given date, a substitute
//! teaches a period the original teacher was scheduled for. Adjustments
//! live outside the recurring grid and only feed workload reporting.

use std::collections::BTreeMap;
use std::ops::RangeInclusive;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use super::Day;

/// A single substitution.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Adjustment {
    pub class_id: String,
    pub subject_id: String,
    /// Teacher on leave.
    pub original_teacher_id: String,
    /// Teacher covering.
    pub substitute_teacher_id: String,
    pub day: Day,
    pub period_index: usize,
}

impl Adjustment {
    pub fn new(
        class_id: impl Into<String>,
        subject_id: impl Into<String>,
        original_teacher_id: impl Into<String>,
        substitute_teacher_id: impl Into<String>,
        day: Day,
        period_index: usize,
    ) -> Self {
        Self {
            class_id: class_id.into(),
            subject_id: subject_id.into(),
            original_teacher_id: original_teacher_id.into(),
            substitute_teacher_id: substitute_teacher_id.into(),
            day,
            period_index,
        }
    }
}

/// Adjustments keyed by calendar date.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AdjustmentLog {
    entries: BTreeMap<NaiveDate, Vec<Adjustment>>,
}

impl AdjustmentLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records an adjustment on `date`.
    pub fn record(&mut self, date: NaiveDate, adjustment: Adjustment) {
        self.entries.entry(date).or_default().push(adjustment);
    }

    /// Builder form of [`record`](Self::record).
    pub fn with(mut self, date: NaiveDate, adjustment: Adjustment) -> Self {
        self.record(date, adjustment);
        self
    }

    /// Adjustments recorded on `date`.
    pub fn on(&self, date: NaiveDate) -> &[Adjustment] {
        self.entries.get(&date).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Every adjustment, oldest date first.
    pub fn iter(&self) -> impl Iterator<Item = (NaiveDate, &Adjustment)> {
        self.entries
            .iter()
            .flat_map(|(date, list)| list.iter().map(move |a| (*date, a)))
    }

    /// Adjustments dated within `range` (inclusive).
    pub fn between(
        &self,
        range: RangeInclusive<NaiveDate>,
    ) -> impl Iterator<Item = (NaiveDate, &Adjustment)> {
        self.entries
            .range(range)
            .flat_map(|(date, list)| list.iter().map(move |a| (*date, a)))
    }

    /// Drops every adjustment recorded on `date`.
    pub fn clear_date(&mut self, date: NaiveDate) -> Vec<Adjustment> {
        self.entries.remove(&date).unwrap_or_default()
    }

    pub fn len(&self) -> usize {
        self.entries.values().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
