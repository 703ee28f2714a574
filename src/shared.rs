//! Thread-safe timetable handle.
//!
//! Readers take snapshots; writers run each checked operation under the
//! write lock, so a snapshot never sees half of a joint-period move.
//! Snapshots are cheap: day arrays are `Arc`-shared with the live
//! timetable until a write replaces them.

use std::sync::Arc;

use parking_lot::RwLock;

use crate::error::Result;
use crate::models::{Period, SlotRef, Timetable};
use crate::placement::{self, PlacementOptions, PlacementOutcome};
use crate::resolver::{self, UnscheduledPool};
use crate::workload::TeacherWorkload;

/// Shared, lock-protected timetable.
#[derive(Clone, Default)]
pub struct SharedTimetable {
    inner: Arc<RwLock<Timetable>>,
}

impl SharedTimetable {
    pub fn new(tt: Timetable) -> Self {
        Self {
            inner: Arc::new(RwLock::new(tt)),
        }
    }

    /// Consistent copy of the current state.
    pub fn snapshot(&self) -> Timetable {
        self.inner.read().clone()
    }

    /// Runs `f` against the current state under the read lock.
    pub fn read<R>(&self, f: impl FnOnce(&Timetable) -> R) -> R {
        let guard = self.inner.read();
        f(&*guard)
    }

    /// Runs `f` under the write lock.
    pub fn write<R>(&self, f: impl FnOnce(&mut Timetable) -> R) -> R {
        let mut guard = self.inner.write();
        f(&mut *guard)
    }

    pub fn place(
        &self,
        class_id: &str,
        periods: &[Period],
        target: SlotRef,
        options: PlacementOptions,
    ) -> Result<PlacementOutcome> {
        placement::place(&mut self.inner.write(), class_id, periods, target, options)
    }

    pub fn remove(
        &self,
        class_id: &str,
        periods: &[Period],
        source: SlotRef,
    ) -> Result<PlacementOutcome> {
        placement::remove(&mut self.inner.write(), class_id, periods, source)
    }

    pub fn move_periods(
        &self,
        class_id: &str,
        periods: &[Period],
        source: Option<SlotRef>,
        target: SlotRef,
        options: PlacementOptions,
    ) -> Result<PlacementOutcome> {
        placement::move_periods(
            &mut self.inner.write(),
            class_id,
            periods,
            source,
            target,
            options,
        )
    }

    /// Unscheduled pool of a class at the current state.
    pub fn unscheduled(&self, class_id: &str) -> Result<UnscheduledPool> {
        resolver::compute_unscheduled(&self.inner.read(), class_id)
    }

    pub fn workload(&self, teacher_id: &str) -> TeacherWorkload {
        TeacherWorkload::calculate(&self.inner.read(), teacher_id)
    }
}
