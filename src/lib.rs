//! Weekly school timetable engine.
//!
//! Keeps every class's week as a grid of slots and answers the questions
//! an interactive timetable editor asks: what is still unscheduled, where
//! can these periods go, may they go there, and how loaded is each
//! teacher. Every write is checked and atomic.
//!
//! # Modules
//!
//! - **`models`**: Domain types: `Timetable`, `SchoolClass`, `ClassSubject`,
//!   `GroupSet`, `JointPeriod`, `Grid`, `Slot`, `Period`, `WeekCalendar`,
//!   `AdjustmentLog`
//! - **`resolver`**: Unscheduled pool per class, derived from the grid
//! - **`availability`**: Slot rules (closed, teacher busy, group composition)
//!   and the per-class availability matrix
//! - **`placement`**: Transactional place / remove / move, joint mirroring,
//!   teacher-conflict override
//! - **`workload`**: Per-teacher daily/weekly counts and adjustments
//! - **`validation`**: Integrity checks for restored timetables
//! - **`shared`**: Lock-protected handle with cheap snapshots
//! - **`config`**: TOML engine configuration
//!
//! # Example
//!
//! ```
//! use u_timetable::models::{ClassSubject, Day, Period, SchoolClass, SlotRef, Timetable, WeekCalendar};
//! use u_timetable::placement::{place, PlacementOptions};
//! use u_timetable::resolver::compute_unscheduled;
//!
//! let mut tt = Timetable::new(WeekCalendar::default())
//!     .with_class(SchoolClass::new("7A").with_subject(ClassSubject::new("math", "T1", 5)));
//!
//! let pool = compute_unscheduled(&tt, "7A").unwrap();
//! let next: Vec<Period> = pool.periods().take(1).cloned().collect();
//! place(&mut tt, "7A", &next, SlotRef::new(Day::Monday, 0), PlacementOptions::default()).unwrap();
//!
//! assert_eq!(compute_unscheduled(&tt, "7A").unwrap().total(), 4);
//! ```

pub mod availability;
pub mod config;
pub mod error;
pub mod models;
pub mod placement;
pub mod resolver;
pub mod shared;
pub mod validation;
pub mod workload;

pub use error::{Result, TimetableError};
