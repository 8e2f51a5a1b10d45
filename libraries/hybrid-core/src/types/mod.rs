//! Domain types
mod ids;
mod schedule;
mod track;

pub use ids::TrackId;
pub use schedule::{parse_clock_minutes, DayKind, ScheduleConfig, ScheduleWindow, MINUTES_PER_DAY};
pub use track::{ScanReport, Track, TrackType, UpdateTrack};
