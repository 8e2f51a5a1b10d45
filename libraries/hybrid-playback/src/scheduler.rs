//! Time-window playback scheduler
//!
//! Decides from the weekly [`ScheduleConfig`] and the current wall-clock
//! time in a named time zone whether playback should be running, and drives
//! the adapter (through the store) to match.
//!
//! Checks run on a periodic tick, immediately when the scheduler is switched
//! on, and immediately when the playlist goes from empty to non-empty.

use crate::adapter::PlaybackAdapter;
use crate::config::PlayerConfig;
use crate::store::PlayerStore;
use chrono::{DateTime, Datelike, Timelike, Utc, Weekday};
use chrono_tz::Tz;
use hybrid_core::ScheduleConfig;
use std::sync::{Arc, Mutex, PoisonError, Weak};
use tokio::task::JoinHandle;
use tokio::time::{self, Instant};
use tracing::{debug, info, warn};

/// Source of the current time
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

/// The system clock
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Wall-clock reading in the schedule's time zone
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LocalTime {
    pub weekday: Weekday,
    /// Minutes since local midnight
    pub minutes: u32,
}

/// Convert `now` to local weekday and minutes in zone `time_zone`
///
/// An unknown zone name reads as Sunday 00:00.
pub fn local_time(now: DateTime<Utc>, time_zone: &str) -> LocalTime {
    match time_zone.parse::<Tz>() {
        Ok(tz) => {
            let local = now.with_timezone(&tz);
            LocalTime {
                weekday: local.weekday(),
                minutes: local.hour() * 60 + local.minute(),
            }
        }
        Err(_) => {
            warn!(time_zone, "Unknown time zone, treating the time as Sunday 00:00");
            LocalTime {
                weekday: Weekday::Sun,
                minutes: 0,
            }
        }
    }
}

/// `start <= now < end` for the window that applies on `now.weekday`
pub fn should_be_playing(config: &ScheduleConfig, now: LocalTime) -> bool {
    config.is_active(now.weekday, now.minutes)
}

/// What a schedule check did
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScheduleAction {
    /// The scheduler is switched off
    Disabled,
    /// Inside the window; playback starts once the track is loaded
    Started { index: usize },
    /// Outside the window; playback was paused
    Stopped,
    /// Nothing to do
    Idle { should_play: bool },
}

impl std::fmt::Display for ScheduleAction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Disabled => write!(f, "scheduler disabled"),
            Self::Started { index } => write!(f, "starting playback at track {index}"),
            Self::Stopped => write!(f, "stopped playback (outside schedule)"),
            Self::Idle { should_play: true } => write!(f, "inside schedule, nothing to do"),
            Self::Idle { should_play: false } => write!(f, "outside schedule, nothing to do"),
        }
    }
}

#[derive(Default)]
struct SchedulerTasks {
    tick: Option<JoinHandle<()>>,
    pending_start: Option<JoinHandle<()>>,
    watcher: Option<JoinHandle<()>>,
}

impl SchedulerTasks {
    fn cancel_pending_start(&mut self) {
        if let Some(handle) = self.pending_start.take() {
            handle.abort();
        }
    }

    fn cancel_tick(&mut self) {
        if let Some(handle) = self.tick.take() {
            handle.abort();
        }
    }

    fn start_in_progress(&self) -> bool {
        self.pending_start
            .as_ref()
            .is_some_and(|handle| !handle.is_finished())
    }
}

struct SchedulerInner {
    store: PlayerStore,
    adapter: PlaybackAdapter,
    config: PlayerConfig,
    clock: Arc<dyn Clock>,
    tasks: Mutex<SchedulerTasks>,
}

impl SchedulerInner {
    fn tasks(&self) -> std::sync::MutexGuard<'_, SchedulerTasks> {
        self.tasks.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Drop for SchedulerInner {
    fn drop(&mut self) {
        let tasks = self.tasks.get_mut().unwrap_or_else(PoisonError::into_inner);
        tasks.cancel_tick();
        tasks.cancel_pending_start();
        if let Some(handle) = tasks.watcher.take() {
            handle.abort();
        }
    }
}

/// Starts and stops playback according to the weekly schedule
#[derive(Clone)]
pub struct PlaybackScheduler {
    inner: Arc<SchedulerInner>,
}

impl PlaybackScheduler {
    pub fn new(adapter: PlaybackAdapter, config: PlayerConfig) -> Self {
        Self::with_clock(adapter, config, Arc::new(SystemClock))
    }

    /// Create a scheduler reading time from `clock`
    pub fn with_clock(adapter: PlaybackAdapter, config: PlayerConfig, clock: Arc<dyn Clock>) -> Self {
        Self {
            inner: Arc::new(SchedulerInner {
                store: adapter.store().clone(),
                adapter,
                config,
                clock,
                tasks: Mutex::new(SchedulerTasks::default()),
            }),
        }
    }

    fn downgrade(&self) -> Weak<SchedulerInner> {
        Arc::downgrade(&self.inner)
    }

    fn from_weak(weak: &Weak<SchedulerInner>) -> Option<Self> {
        weak.upgrade().map(|inner| Self { inner })
    }

    /// Current local time in the configured zone
    pub fn local_now(&self) -> LocalTime {
        local_time(self.inner.clock.now(), &self.inner.config.time_zone)
    }

    /// Whether the schedule says playback should be running right now
    pub fn should_be_playing_now(&self) -> bool {
        let schedule = self.inner.store.read(|s| s.schedule_config.clone());
        should_be_playing(&schedule, self.local_now())
    }

    /// Run one schedule check and report what it did
    pub async fn check_now(&self) -> ScheduleAction {
        let state = self.inner.store.snapshot();
        if !state.scheduler_enabled {
            return ScheduleAction::Disabled;
        }

        let now = self.local_now();
        let should_play = should_be_playing(&state.schedule_config, now);
        debug!(weekday = %now.weekday, minutes = now.minutes, should_play, "Schedule check");

        if should_play {
            if state.is_playing || state.playlist.is_empty() {
                return ScheduleAction::Idle { should_play };
            }
            return self.begin_start().await;
        }

        let was_pending = {
            let mut tasks = self.inner.tasks();
            let pending = tasks.start_in_progress();
            tasks.cancel_pending_start();
            pending
        };
        if was_pending {
            info!("Cancelled pending scheduled start (outside schedule)");
        }

        if state.is_playing {
            info!("Stopping playback (outside schedule)");
            if let Err(e) = self.inner.adapter.pause().await {
                warn!(error = %e, "Scheduled pause failed");
            }
            return ScheduleAction::Stopped;
        }

        ScheduleAction::Idle { should_play }
    }

    /// Select the resume track, make sure it is loaded and queue the
    /// delayed play
    ///
    /// A new load is only requested when the selected track is neither
    /// loaded nor already being loaded, so a slow load is waited for on
    /// later ticks instead of being restarted.
    async fn begin_start(&self) -> ScheduleAction {
        if self.inner.tasks().start_in_progress() {
            return ScheduleAction::Idle { should_play: true };
        }
        let loaded = self.inner.adapter.loaded_track_id().await;

        let mut tasks = self.inner.tasks();
        if tasks.start_in_progress() {
            return ScheduleAction::Idle { should_play: true };
        }

        let store = &self.inner.store;
        let (index, resume_at) = match store.read(|s| (s.current_index, s.current_time)) {
            (Some(index), time) if store.play_track_at_index(index).is_some() => (index, time),
            _ => {
                store.play_track_at_index(0);
                store.set_current_time(0.0);
                (0, 0.0)
            }
        };

        info!(index, resume_at, "Starting playback (inside schedule)");
        let (pending, last_request, selected) = store.read(|s| {
            (
                s.load_pending(),
                s.load_request,
                s.current_track.as_ref().map(|t| t.id.clone()),
            )
        });
        let request = if pending {
            debug!(request = last_request, "Waiting for the load in flight");
            Some(last_request)
        } else if selected.is_some() && selected == loaded {
            debug!(index, "Track already loaded");
            None
        } else {
            Some(store.request_load())
        };

        let weak = self.downgrade();
        let wait = self.inner.config.load_wait_timeout();
        let settle = self.inner.config.settle_delay();
        let mut rx = store.subscribe();

        tasks.pending_start = Some(tokio::spawn(async move {
            if let Some(request) = request {
                let settled = time::timeout(wait, rx.wait_for(|s| s.load_settled >= request))
                    .await
                    .map(|r| r.is_ok());
                match settled {
                    Ok(true) => {}
                    Ok(false) => return,
                    Err(_) => {
                        warn!(request, "Scheduled load did not settle in time, retrying on the next check");
                        return;
                    }
                }
            }

            time::sleep(settle).await;

            let Some(scheduler) = Self::from_weak(&weak) else {
                return;
            };
            let adapter = &scheduler.inner.adapter;
            if let Err(e) = adapter.play().await {
                warn!(error = %e, "Scheduled play failed");
                return;
            }
            if resume_at > 0.0 {
                if let Err(e) = adapter.seek(resume_at).await {
                    warn!(error = %e, "Could not restore position");
                }
            }
        }));

        ScheduleAction::Started { index }
    }

    /// Start the periodic tick, checking immediately first
    ///
    /// Restarting replaces the running tick.
    pub fn start(&self) {
        let weak = self.downgrade();
        let period = self.inner.config.scheduler_tick();

        let handle = tokio::spawn(async move {
            let mut interval = time::interval_at(Instant::now() + period, period);
            let mut first = true;
            loop {
                if !first {
                    interval.tick().await;
                }
                first = false;

                let Some(scheduler) = Self::from_weak(&weak) else {
                    return;
                };
                let action = scheduler.check_now().await;
                debug!(%action, "Scheduled check");
            }
        });

        let mut tasks = self.inner.tasks();
        tasks.cancel_tick();
        tasks.tick = Some(handle);
        info!(period_secs = period.as_secs(), "Scheduler started");
    }

    /// Stop the periodic tick and any pending start
    pub fn stop(&self) {
        let mut tasks = self.inner.tasks();
        tasks.cancel_tick();
        tasks.cancel_pending_start();
        info!("Scheduler stopped");
    }

    /// Whether the periodic tick is running
    pub fn is_running(&self) -> bool {
        self.inner
            .tasks()
            .tick
            .as_ref()
            .is_some_and(|handle| !handle.is_finished())
    }

    /// Follow the store: start/stop on `scheduler_enabled` toggles and check
    /// right away when the playlist becomes non-empty
    ///
    /// Starts the tick immediately if the scheduler is already enabled.
    pub fn launch(&self) {
        let weak = self.downgrade();
        let mut rx = self.inner.store.subscribe();
        let (mut enabled, mut playlist_len) = {
            let s = rx.borrow_and_update();
            (s.scheduler_enabled, s.playlist.len())
        };

        if enabled {
            self.start();
        }

        let handle = tokio::spawn(async move {
            while rx.changed().await.is_ok() {
                let (now_enabled, now_len) = {
                    let s = rx.borrow_and_update();
                    (s.scheduler_enabled, s.playlist.len())
                };

                let Some(scheduler) = Self::from_weak(&weak) else {
                    return;
                };

                if now_enabled != enabled {
                    if now_enabled {
                        scheduler.start();
                    } else {
                        scheduler.stop();
                    }
                } else if now_enabled && playlist_len == 0 && now_len > 0 {
                    let action = scheduler.check_now().await;
                    debug!(%action, "Check after playlist became available");
                }

                enabled = now_enabled;
                playlist_len = now_len;
            }
        });

        let mut tasks = self.inner.tasks();
        if let Some(previous) = tasks.watcher.replace(handle) {
            previous.abort();
        }
    }

    /// Stop everything the scheduler runs
    pub fn shutdown(&self) {
        let mut tasks = self.inner.tasks();
        tasks.cancel_tick();
        tasks.cancel_pending_start();
        if let Some(handle) = tasks.watcher.take() {
            handle.abort();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use hybrid_core::ScheduleWindow;
    use proptest::prelude::*;

    #[test]
    fn test_local_time_in_zone() {
        // 2024-05-15 is a Wednesday; Guatemala is UTC-6 all year
        let now = Utc.with_ymd_and_hms(2024, 5, 15, 21, 0, 0).unwrap();
        let local = local_time(now, "America/Guatemala");
        assert_eq!(local.weekday, Weekday::Wed);
        assert_eq!(local.minutes, 15 * 60);

        let early = Utc.with_ymd_and_hms(2024, 5, 15, 3, 30, 0).unwrap();
        let local = local_time(early, "America/Guatemala");
        assert_eq!(local.weekday, Weekday::Tue);
        assert_eq!(local.minutes, 21 * 60 + 30);
    }

    #[test]
    fn test_unknown_zone_defaults() {
        let now = Utc.with_ymd_and_hms(2024, 5, 15, 21, 0, 0).unwrap();
        assert_eq!(
            local_time(now, "Mars/Olympus_Mons"),
            LocalTime {
                weekday: Weekday::Sun,
                minutes: 0
            }
        );
    }

    #[test]
    fn test_schedule_decisions() {
        let config = ScheduleConfig::default();
        assert!(should_be_playing(
            &config,
            LocalTime {
                weekday: Weekday::Wed,
                minutes: 15 * 60
            }
        ));
        assert!(!should_be_playing(
            &config,
            LocalTime {
                weekday: Weekday::Sat,
                minutes: 6 * 60
            }
        ));
    }

    #[test]
    fn test_malformed_window_defaults_to_zero() {
        let config = ScheduleConfig {
            weekdays: ScheduleWindow::new("oops", "01:00"),
            weekends: ScheduleWindow::new("07:30", "22:00"),
        };
        assert!(should_be_playing(
            &config,
            LocalTime {
                weekday: Weekday::Mon,
                minutes: 0
            }
        ));
    }

    fn weekday() -> impl Strategy<Value = Weekday> {
        prop::sample::select(vec![
            Weekday::Mon,
            Weekday::Tue,
            Weekday::Wed,
            Weekday::Thu,
            Weekday::Fri,
            Weekday::Sat,
            Weekday::Sun,
        ])
    }

    proptest! {
        #[test]
        fn decision_uses_the_right_window(
            day in weekday(),
            minutes in 0u32..hybrid_core::types::MINUTES_PER_DAY,
            start in 0u32..1440,
            len in 1u32..600,
        ) {
            let end = (start + len).min(1440);
            let fmt = |m: u32| format!("{:02}:{:02}", m / 60, m % 60);
            let window = ScheduleWindow::new(fmt(start), fmt(end));
            let closed = ScheduleWindow::new("00:00", "00:00");

            let weekend = matches!(day, Weekday::Sat | Weekday::Sun);
            let config = if weekend {
                ScheduleConfig { weekdays: closed, weekends: window }
            } else {
                ScheduleConfig { weekdays: window, weekends: closed }
            };

            let now = LocalTime { weekday: day, minutes };
            prop_assert_eq!(should_be_playing(&config, now), start <= minutes && minutes < end);
        }
    }
}
