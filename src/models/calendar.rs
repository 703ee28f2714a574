//! Week calendar and day models.
//!
//! Defines which weekdays a school runs and how many teaching periods
//! are open on each of them.
//!
//! # Slot Model
//! Every configured day owns `max_periods` slot positions in a class grid.
//! A position is open iff:
//! - its day is configured and active, AND
//! - its index is below that day's `period_count`.
//!
//! Positions past the active count stay in the grid array but are closed
//! for placement (e.g. a short Friday).

use std::fmt;

use serde::{Deserialize, Serialize};

/// Default number of slot positions per day.
pub const DEFAULT_PERIODS_PER_DAY: usize = 8;

/// A weekday.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Day {
    Monday,
    Tuesday,
    Wednesday,
    Thursday,
    Friday,
    Saturday,
    Sunday,
}

impl Day {
    /// All weekdays, Monday first.
    pub const ALL: [Day; 7] = [
        Day::Monday,
        Day::Tuesday,
        Day::Wednesday,
        Day::Thursday,
        Day::Friday,
        Day::Saturday,
        Day::Sunday,
    ];

    /// Short display name ("Mon", "Tue", ...).
    pub fn short_name(self) -> &'static str {
        match self {
            Day::Monday => "Mon",
            Day::Tuesday => "Tue",
            Day::Wednesday => "Wed",
            Day::Thursday => "Thu",
            Day::Friday => "Fri",
            Day::Saturday => "Sat",
            Day::Sunday => "Sun",
        }
    }
}

impl fmt::Display for Day {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.short_name())
    }
}

impl From<chrono::Weekday> for Day {
    fn from(weekday: chrono::Weekday) -> Self {
        match weekday {
            chrono::Weekday::Mon => Day::Monday,
            chrono::Weekday::Tue => Day::Tuesday,
            chrono::Weekday::Wed => Day::Wednesday,
            chrono::Weekday::Thu => Day::Thursday,
            chrono::Weekday::Fri => Day::Friday,
            chrono::Weekday::Sat => Day::Saturday,
            chrono::Weekday::Sun => Day::Sunday,
        }
    }
}

/// Per-day configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DayConfig {
    pub day: Day,
    /// Inactive days are excluded from scheduling and reporting.
    pub active: bool,
    /// Number of open periods (indices `0..period_count`).
    pub period_count: usize,
}

impl DayConfig {
    /// An active day with `period_count` open periods.
    pub fn active(day: Day, period_count: usize) -> Self {
        Self {
            day,
            active: true,
            period_count,
        }
    }

    /// A configured but inactive day.
    pub fn inactive(day: Day) -> Self {
        Self {
            day,
            active: false,
            period_count: 0,
        }
    }
}

/// School week calendar.
///
/// `max_periods` fixes the slot array length of every configured day;
/// `period_count` of each day caps how many of them are open.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WeekCalendar {
    /// Slot positions per configured day.
    pub max_periods: usize,
    /// Configured days, in week order.
    pub days: Vec<DayConfig>,
}

impl Default for WeekCalendar {
    /// Monday to Friday, eight periods each.
    fn default() -> Self {
        Self::weekdays(DEFAULT_PERIODS_PER_DAY)
    }
}

impl WeekCalendar {
    /// Creates an empty calendar with no configured days.
    pub fn new(max_periods: usize) -> Self {
        Self {
            max_periods,
            days: Vec::new(),
        }
    }

    /// Monday to Friday, each active with `periods` open periods.
    pub fn weekdays(periods: usize) -> Self {
        Day::ALL[..5]
            .iter()
            .fold(Self::new(periods), |cal, &day| cal.with_day(day, periods))
    }

    /// Adds (or replaces) an active day.
    ///
    /// `period_count` is clamped to `max_periods`.
    pub fn with_day(mut self, day: Day, period_count: usize) -> Self {
        let config = DayConfig::active(day, period_count.min(self.max_periods));
        self.upsert(config);
        self
    }

    /// Adds (or replaces) an inactive day.
    pub fn with_inactive_day(mut self, day: Day) -> Self {
        self.upsert(DayConfig::inactive(day));
        self
    }

    fn upsert(&mut self, config: DayConfig) {
        match self.days.iter_mut().find(|d| d.day == config.day) {
            Some(existing) => *existing = config,
            None => {
                self.days.push(config);
                self.days.sort_by_key(|d| d.day);
            }
        }
    }

    /// Configuration for a day, if configured.
    pub fn day(&self, day: Day) -> Option<&DayConfig> {
        self.days.iter().find(|d| d.day == day)
    }

    /// Number of open periods on `day` (0 for unconfigured or inactive days).
    pub fn active_period_count(&self, day: Day) -> usize {
        match self.day(day) {
            Some(cfg) if cfg.active => cfg.period_count.min(self.max_periods),
            _ => 0,
        }
    }

    /// Whether `(day, period_index)` accepts placements.
    #[inline]
    pub fn is_open(&self, day: Day, period_index: usize) -> bool {
        period_index < self.active_period_count(day)
    }

    /// Active days in week order.
    pub fn active_days(&self) -> impl Iterator<Item = Day> + '_ {
        self.days.iter().filter(|d| d.active).map(|d| d.day)
    }

    /// All configured days (active or not) in week order.
    pub fn configured_days(&self) -> impl Iterator<Item = Day> + '_ {
        self.days.iter().map(|d| d.day)
    }

    /// Total open periods per week.
    pub fn weekly_capacity(&self) -> usize {
        self.active_days().map(|d| self.active_period_count(d)).sum()
    }
}
