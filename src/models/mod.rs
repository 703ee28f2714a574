//! Timetable domain models.
//!
//! Provides the data types for a school's weekly timetable: who teaches
//! what to which class, how many times a week, and where each lesson
//! currently sits.
//!
//! # Domain Mappings
//!
//! | u-timetable | School term | Notes |
//! |-------------|-------------|-------|
//! | SchoolClass | Class/Form | Owns requirements and group sets |
//! | ClassSubject | Subject load | `periods_per_week` instances needed |
//! | Period | Lesson | One placed instance |
//! | Slot | Cell | `(day, period_index)` of one class |
//! | Grid | Class timetable | One per class |
//! | JointPeriod | Combined lesson | Same teacher, same slot, many classes |
//! | Adjustment | Substitution | Dated cover outside the grid |

mod adjustment;
mod calendar;
mod grid;
mod period;
mod school;
mod timetable;

pub use adjustment::{Adjustment, AdjustmentLog};
pub use calendar::{Day, DayConfig, WeekCalendar, DEFAULT_PERIODS_PER_DAY};
pub use grid::{DaySlots, Grid, Slot, SlotRef};
pub use period::{new_period_id, Period};
pub use school::{
    ClassSubject, Group, GroupSet, JointAssignment, JointPeriod, SchoolClass, Subject, Teacher,
};
pub use timetable::{Requirement, RequirementKey, Timetable};
