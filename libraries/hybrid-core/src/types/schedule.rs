/// Weekly playback schedule types
use chrono::Weekday;
use serde::{Deserialize, Serialize};

/// Minutes in a day
pub const MINUTES_PER_DAY: u32 = 24 * 60;

/// Parse an `"HH:MM"` string into minutes since midnight
///
/// Parsing is permissive: each field that is not a number counts as 0, so
/// `"11:xx"` is 660 and `"garbage"` is 0. Hours and minutes are not range
/// checked beyond saturating arithmetic.
pub fn parse_clock_minutes(value: &str) -> u32 {
    let mut parts = value.trim().splitn(2, ':');
    let hours = parts.next().map_or(0, parse_field);
    let minutes = parts.next().map_or(0, parse_field);
    hours.saturating_mul(60).saturating_add(minutes)
}

fn parse_field(field: &str) -> u32 {
    field.trim().parse().unwrap_or(0)
}

/// Which window of the schedule applies to a given day
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DayKind {
    /// Monday to Friday
    Weekday,
    /// Saturday and Sunday
    Weekend,
}

impl From<Weekday> for DayKind {
    fn from(day: Weekday) -> Self {
        match day {
            Weekday::Sat | Weekday::Sun => Self::Weekend,
            _ => Self::Weekday,
        }
    }
}

/// A daily on-window, local wall-clock times as `"HH:MM"`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScheduleWindow {
    /// First minute of the window, inclusive
    pub start: String,
    /// End of the window, exclusive
    pub end: String,
}

impl ScheduleWindow {
    /// Window from `start` to `end`, both `"HH:MM"`
    ///
    /// ```rust
    /// use hybrid_core::ScheduleWindow;
    ///
    /// let window = ScheduleWindow::new("07:30", "22:00");
    /// assert_eq!(window.start_minutes(), 450);
    /// assert_eq!(window.end_minutes(), 1320);
    /// ```
    pub fn new(start: impl Into<String>, end: impl Into<String>) -> Self {
        Self {
            start: start.into(),
            end: end.into(),
        }
    }

    /// Start in minutes since midnight
    pub fn start_minutes(&self) -> u32 {
        parse_clock_minutes(&self.start)
    }

    /// End in minutes since midnight
    pub fn end_minutes(&self) -> u32 {
        parse_clock_minutes(&self.end)
    }

    /// Whether the window is `start < end`
    ///
    /// Inverted or empty windows never match; they do not wrap past midnight.
    pub fn is_well_formed(&self) -> bool {
        self.start_minutes() < self.end_minutes()
    }

    /// `start <= minutes < end`
    pub fn contains(&self, minutes: u32) -> bool {
        self.start_minutes() <= minutes && minutes < self.end_minutes()
    }
}

/// Weekly schedule: one window for weekdays, one for weekends
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScheduleConfig {
    /// Monday to Friday
    pub weekdays: ScheduleWindow,
    /// Saturday and Sunday
    pub weekends: ScheduleWindow,
}

impl Default for ScheduleConfig {
    fn default() -> Self {
        Self {
            weekdays: ScheduleWindow::new("11:30", "22:00"),
            weekends: ScheduleWindow::new("07:30", "22:00"),
        }
    }
}

impl ScheduleConfig {
    /// The window that applies on `day`
    pub fn window_for(&self, day: impl Into<DayKind>) -> &ScheduleWindow {
        match day.into() {
            DayKind::Weekday => &self.weekdays,
            DayKind::Weekend => &self.weekends,
        }
    }

    /// Whether playback should be running on `day` at `minutes` past midnight
    pub fn is_active(&self, day: impl Into<DayKind>, minutes: u32) -> bool {
        self.window_for(day).contains(minutes)
    }
}
