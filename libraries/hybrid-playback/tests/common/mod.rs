//! Test doubles for the playback host
//!
//! `FakeHost` hands out scripted backends and records every call in a shared
//! log so tests can assert on ordering.

#![allow(dead_code)]

use async_trait::async_trait;
use chrono::{DateTime, TimeZone, Utc};
use hybrid_core::{Track, TrackType};
use hybrid_playback::{
    BackendEvent, BackendEvents, BackendHost, BackendKind, BackendReady, Clock, CorsMode,
    Interaction, MediaSource, PlaybackBackend, PlaybackError, PlaybackState, PlayerStore, Result,
};
use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::broadcast;

#[derive(Default)]
struct Shared {
    log: Mutex<Vec<String>>,
    /// Locators whose load fails
    failing: Mutex<HashSet<String>>,
    /// Locators whose load fails only with `CorsMode::Anonymous`
    failing_anonymous: Mutex<HashSet<String>>,
    /// Locators whose load takes this long
    slow: Mutex<Option<(String, Duration)>>,
    reject_autoplay: AtomicBool,
    api_loads: AtomicUsize,
    poll_reads: AtomicUsize,
    last_events: Mutex<Option<BackendEvents>>,
    last_volume: Mutex<Option<f64>>,
}

#[derive(Clone)]
pub struct FakeHost {
    shared: Arc<Shared>,
    interactions: broadcast::Sender<Interaction>,
}

impl FakeHost {
    pub fn new() -> Self {
        let (interactions, _) = broadcast::channel(16);
        Self {
            shared: Arc::new(Shared::default()),
            interactions,
        }
    }

    pub fn log(&self) -> Vec<String> {
        self.shared.log.lock().unwrap().clone()
    }

    pub fn count(&self, entry: &str) -> usize {
        self.log().iter().filter(|e| *e == entry).count()
    }

    /// Index of the first log entry equal to `entry`
    pub fn position(&self, entry: &str) -> Option<usize> {
        self.log().iter().position(|e| e == entry)
    }

    pub fn fail(&self, locator: &str) {
        self.shared.failing.lock().unwrap().insert(locator.to_string());
    }

    pub fn fail_anonymous(&self, locator: &str) {
        self.shared
            .failing_anonymous
            .lock()
            .unwrap()
            .insert(locator.to_string());
    }

    pub fn slow(&self, locator: &str, delay: Duration) {
        *self.shared.slow.lock().unwrap() = Some((locator.to_string(), delay));
    }

    pub fn reject_autoplay(&self, reject: bool) {
        self.shared.reject_autoplay.store(reject, Ordering::SeqCst);
    }

    pub fn api_loads(&self) -> usize {
        self.shared.api_loads.load(Ordering::SeqCst)
    }

    pub fn poll_reads(&self) -> usize {
        self.shared.poll_reads.load(Ordering::SeqCst)
    }

    pub fn last_volume(&self) -> Option<f64> {
        *self.shared.last_volume.lock().unwrap()
    }

    /// Emit an event as the most recently created backend
    pub fn emit(&self, event: BackendEvent) {
        if let Some(events) = self.shared.last_events.lock().unwrap().as_ref() {
            let _ = events.send(event);
        }
    }

    pub fn interact(&self) {
        let _ = self.interactions.send(Interaction::Click);
    }

    fn record(&self, entry: String) {
        self.shared.log.lock().unwrap().push(entry);
    }

    fn backend(&self, kind: BackendKind, events: BackendEvents) -> Box<dyn PlaybackBackend> {
        let tag = match kind {
            BackendKind::NativeAudio => "native",
            BackendKind::EmbeddedVideo => "embedded",
        };
        self.record(format!("{tag}:create"));
        *self.shared.last_events.lock().unwrap() = Some(events.clone());
        Box::new(FakeBackend {
            host: self.clone(),
            kind,
            tag,
            events,
            locator: String::new(),
            position: 0.0,
        })
    }
}

#[async_trait]
impl BackendHost for FakeHost {
    fn native_audio(&self, events: BackendEvents) -> Result<Box<dyn PlaybackBackend>> {
        Ok(self.backend(BackendKind::NativeAudio, events))
    }

    async fn embedded_video(&self, events: BackendEvents) -> Result<Box<dyn PlaybackBackend>> {
        if self.shared.api_loads.load(Ordering::SeqCst) == 0 {
            self.shared.api_loads.fetch_add(1, Ordering::SeqCst);
            self.record("embedded:api".to_string());
        }
        Ok(self.backend(BackendKind::EmbeddedVideo, events))
    }

    fn interactions(&self) -> broadcast::Receiver<Interaction> {
        self.interactions.subscribe()
    }
}

pub const FAKE_DURATION: f64 = 180.0;

struct FakeBackend {
    host: FakeHost,
    kind: BackendKind,
    tag: &'static str,
    events: BackendEvents,
    locator: String,
    position: f64,
}

#[async_trait]
impl PlaybackBackend for FakeBackend {
    fn kind(&self) -> BackendKind {
        self.kind
    }

    async fn load(&mut self, source: &MediaSource) -> Result<BackendReady> {
        let locator = source.locator().to_string();
        self.host.record(format!("{}:load:{locator}", self.tag));
        self.locator.clone_from(&locator);

        let delay = self
            .host
            .shared
            .slow
            .lock()
            .unwrap()
            .as_ref()
            .filter(|(slow, _)| *slow == locator)
            .map(|(_, d)| *d);
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }

        let anonymous = matches!(
            source,
            MediaSource::Native {
                cors: CorsMode::Anonymous,
                ..
            }
        );
        if self.host.shared.failing.lock().unwrap().contains(&locator)
            || (anonymous
                && self
                    .host
                    .shared
                    .failing_anonymous
                    .lock()
                    .unwrap()
                    .contains(&locator))
        {
            return Err(PlaybackError::load(format!("cannot open {locator}")));
        }

        let _ = self.events.send(BackendEvent::LoadedMetadata {
            duration: FAKE_DURATION,
        });
        Ok(BackendReady {
            duration: FAKE_DURATION,
        })
    }

    async fn play(&mut self) -> Result<()> {
        if self.host.shared.reject_autoplay.load(Ordering::SeqCst) {
            self.host.record(format!("{}:rejected", self.tag));
            return Err(PlaybackError::AutoplayRejected);
        }
        self.host.record(format!("{}:play:{}", self.tag, self.locator));
        let _ = self.events.send(BackendEvent::Playing);
        Ok(())
    }

    async fn pause(&mut self) -> Result<()> {
        self.host.record(format!("{}:pause", self.tag));
        let _ = self.events.send(BackendEvent::Paused);
        Ok(())
    }

    async fn seek(&mut self, position: f64) -> Result<()> {
        self.host.record(format!("{}:seek:{position}", self.tag));
        self.position = position;
        Ok(())
    }

    async fn set_volume(&mut self, volume: f64) -> Result<()> {
        *self.host.shared.last_volume.lock().unwrap() = Some(volume);
        Ok(())
    }

    fn current_time(&self) -> f64 {
        if self.kind == BackendKind::EmbeddedVideo {
            self.host.shared.poll_reads.fetch_add(1, Ordering::SeqCst);
        }
        self.position
    }

    fn duration(&self) -> f64 {
        FAKE_DURATION
    }

    async fn release(&mut self) {
        self.host.record(format!("{}:release:{}", self.tag, self.locator));
    }
}

/// Clock the test can move
pub struct FixedClock(Mutex<DateTime<Utc>>);

impl FixedClock {
    /// UTC time; Guatemala is six hours behind
    pub fn at(year: i32, month: u32, day: u32, hour: u32, minute: u32) -> Arc<Self> {
        Arc::new(Self(Mutex::new(
            Utc.with_ymd_and_hms(year, month, day, hour, minute, 0).unwrap(),
        )))
    }

    pub fn set(&self, year: i32, month: u32, day: u32, hour: u32, minute: u32) {
        *self.0.lock().unwrap() = Utc.with_ymd_and_hms(year, month, day, hour, minute, 0).unwrap();
    }
}

impl Clock for FixedClock {
    fn now(&self) -> DateTime<Utc> {
        *self.0.lock().unwrap()
    }
}

pub fn mp3(id: &str) -> Track {
    Track::new(format!("Song {id}"), "Artist", TrackType::Mp3, format!("https://cdn.test/{id}.mp3"))
        .with_id(id)
}

pub fn mp3_url(id: &str) -> String {
    format!("https://cdn.test/{id}.mp3")
}

pub fn youtube(id: &str, video_id: &str) -> Track {
    Track::new(
        format!("Video {id}"),
        "Channel",
        TrackType::Youtube,
        format!("https://www.youtube.com/watch?v={video_id}"),
    )
    .with_id(id)
}

/// Wait (bounded) until the store satisfies `predicate`
pub async fn wait_for_state(store: &PlayerStore, predicate: impl FnMut(&PlaybackState) -> bool) {
    let mut rx = store.subscribe();
    let reached = tokio::time::timeout(Duration::from_secs(30), rx.wait_for(predicate))
        .await
        .map(|r| r.is_ok())
        .unwrap_or(false);
    assert!(reached, "store never reached the expected state: {:?}", store.snapshot());
}

/// Let spawned tasks run
pub async fn settle() {
    tokio::time::sleep(Duration::from_millis(1)).await;
}
