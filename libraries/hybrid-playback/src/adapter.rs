//! Multi-source playback adapter
//!
//! [`PlaybackAdapter`] puts one uniform control surface (`load_track`,
//! `play`, `pause`, `stop`, `seek`, `set_volume`, ...) in front of whichever
//! backend the current track needs. At most one backend is active; loading a
//! track tears the previous one down first.
//!
//! Background work owned by the adapter:
//! - an event pump per load, applying [`BackendEvent`]s to the store
//! - a position poll for the embedded video backend while it plays
//! - a one-shot autoplay retry waiting for the next user interaction
//! - the store follower, reacting to load requests and volume changes
//!
//! Every task holds a weak reference to the adapter and is aborted on
//! teardown, so nothing from a superseded backend reaches the store.

use crate::backend::{BackendHost, BackendKind, PlaybackBackend};
use crate::config::PlayerConfig;
use crate::error::{PlaybackError, Result};
use crate::events::BackendEvent;
use crate::source::{self, CorsMode, MediaSource};
use crate::store::PlayerStore;
use crate::volume::{clamp_volume, to_backend_scale};
use hybrid_core::{Track, TrackId, TrackType};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};
use tokio::sync::{broadcast, mpsc, Mutex};
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, error, info, warn};

type SharedBackend = Arc<Mutex<Box<dyn PlaybackBackend>>>;

/// The backend currently installed
struct ActiveBackend {
    kind: BackendKind,
    track_id: TrackId,
    backend: SharedBackend,
    pump: JoinHandle<()>,
}

#[derive(Default)]
struct AdapterState {
    active: Option<ActiveBackend>,
    poll: Option<JoinHandle<()>>,
    autoplay_retry: Option<JoinHandle<()>>,
    follower: Option<JoinHandle<()>>,
    /// Last volume pushed to a backend, in store scale
    applied_volume: Option<f64>,
}

impl AdapterState {
    fn cancel_poll(&mut self) {
        if let Some(handle) = self.poll.take() {
            handle.abort();
        }
    }

    fn cancel_autoplay_retry(&mut self) {
        if let Some(handle) = self.autoplay_retry.take() {
            handle.abort();
        }
    }

    /// Detach the active backend and stop its tasks
    ///
    /// The caller releases the returned backend outside the lock.
    fn take_active(&mut self) -> Option<SharedBackend> {
        self.cancel_poll();
        self.cancel_autoplay_retry();
        self.applied_volume = None;
        self.active.take().map(|active| {
            active.pump.abort();
            active.backend
        })
    }
}

struct AdapterInner {
    store: PlayerStore,
    host: Arc<dyn BackendHost>,
    config: PlayerConfig,
    /// Bumped by every load and by cleanup; tasks compare against it
    generation: AtomicU64,
    state: Mutex<AdapterState>,
}

impl Drop for AdapterInner {
    fn drop(&mut self) {
        let state = self.state.get_mut();
        state.cancel_poll();
        state.cancel_autoplay_retry();
        if let Some(handle) = state.follower.take() {
            handle.abort();
        }
        if let Some(active) = state.active.take() {
            active.pump.abort();
        }
    }
}

/// Uniform control surface over the playback backends
///
/// Cheap to clone; clones share the same backend and tasks.
#[derive(Clone)]
pub struct PlaybackAdapter {
    inner: Arc<AdapterInner>,
}

impl PlaybackAdapter {
    /// Create an adapter bound to `store`
    ///
    /// Call [`PlaybackAdapter::spawn_store_follower`] to let store load
    /// requests drive it.
    pub fn new(store: PlayerStore, host: Arc<dyn BackendHost>, config: PlayerConfig) -> Self {
        Self {
            inner: Arc::new(AdapterInner {
                store,
                host,
                config,
                generation: AtomicU64::new(0),
                state: Mutex::new(AdapterState::default()),
            }),
        }
    }

    fn from_inner(inner: Arc<AdapterInner>) -> Self {
        Self { inner }
    }

    fn downgrade(&self) -> Weak<AdapterInner> {
        Arc::downgrade(&self.inner)
    }

    pub fn store(&self) -> &PlayerStore {
        &self.inner.store
    }

    pub fn config(&self) -> &PlayerConfig {
        &self.inner.config
    }

    /// Family of the installed backend, if any
    pub async fn active_kind(&self) -> Option<BackendKind> {
        self.inner.state.lock().await.active.as_ref().map(|a| a.kind)
    }

    /// Id of the track the installed backend holds
    pub async fn loaded_track_id(&self) -> Option<TrackId> {
        self.inner
            .state
            .lock()
            .await
            .active
            .as_ref()
            .map(|a| a.track_id.clone())
    }

    fn is_current(&self, generation: u64) -> bool {
        self.inner.generation.load(Ordering::SeqCst) == generation
    }

    async fn active_backend(&self) -> Option<SharedBackend> {
        self.inner
            .state
            .lock()
            .await
            .active
            .as_ref()
            .map(|a| Arc::clone(&a.backend))
    }

    // ===== Loading =====

    /// Load `track` into the backend its type needs
    ///
    /// The previous backend is released before the new one is created. A
    /// newer `load_track` call supersedes this one: its result is discarded,
    /// its backend released, and `PlaybackError::Superseded` returned.
    ///
    /// # Errors
    ///
    /// - `SourceResolution` when the track's `src` cannot be resolved
    /// - `BackendLoad` when the backend cannot open the source
    pub async fn load_track(&self, track: &Track) -> Result<()> {
        let store = &self.inner.store;
        store.set_loading(true);

        let generation = self.inner.generation.fetch_add(1, Ordering::SeqCst) + 1;
        let previous = self.inner.state.lock().await.take_active();
        if let Some(previous) = previous {
            previous.lock().await.release().await;
            debug!("Released previous backend");
        }

        info!(track_id = %track.id, title = %track.title, track_type = %track.track_type, "Loading track");

        match self.load_into_new_backend(track, generation).await {
            Ok(()) => Ok(()),
            Err(PlaybackError::Superseded) => {
                debug!(track_id = %track.id, "Load superseded");
                Err(PlaybackError::Superseded)
            }
            Err(e) => {
                if self.is_current(generation) {
                    store.set_loading(false);
                }
                error!(track_id = %track.id, error = %e, "Failed to load track");
                Err(e)
            }
        }
    }

    async fn load_into_new_backend(&self, track: &Track, generation: u64) -> Result<()> {
        let source = source::resolve(track, &self.inner.config)?;
        let kind = source.kind();

        let (events_tx, events_rx) = mpsc::unbounded_channel();
        let mut backend = match kind {
            BackendKind::NativeAudio => self.inner.host.native_audio(events_tx)?,
            BackendKind::EmbeddedVideo => self.inner.host.embedded_video(events_tx).await?,
        };

        let volume = self.inner.store.read(|s| s.volume);
        if let Err(e) = backend.set_volume(to_backend_scale(kind, volume)).await {
            warn!(error = %e, "Could not set initial volume");
        }

        let loaded = match backend.load(&source).await {
            Err(e) if needs_drive_fallback(track, &source) => {
                warn!(error = %e, "Google Drive load failed, retrying without cross-origin mode");
                backend.load(&source.clone().with_cors(CorsMode::Disabled)).await
            }
            other => other,
        };

        let ready = match loaded {
            Ok(ready) => ready,
            Err(e) => {
                backend.release().await;
                return Err(match e {
                    PlaybackError::BackendLoad(_) | PlaybackError::Superseded => e,
                    other => PlaybackError::load(other.to_string()),
                });
            }
        };

        let backend: SharedBackend = Arc::new(Mutex::new(backend));
        {
            let mut state = self.inner.state.lock().await;
            if !self.is_current(generation) {
                drop(state);
                backend.lock().await.release().await;
                return Err(PlaybackError::Superseded);
            }

            let pump = spawn_event_pump(self.downgrade(), generation, kind, events_rx);
            state.active = Some(ActiveBackend {
                kind,
                track_id: track.id.clone(),
                backend,
                pump,
            });
            state.applied_volume = Some(volume);
        }

        let store = &self.inner.store;
        store.set_duration(ready.duration);
        store.set_current_time(0.0);
        store.set_loading(false);

        debug!(kind = %kind, duration = ready.duration, locator = source.locator(), "Track ready");
        Ok(())
    }

    // ===== Transport =====

    /// Start or resume playback
    ///
    /// If the host rejects playback under its autoplay policy, a one-shot
    /// retry is armed for the next user interaction and `Ok` is returned.
    /// Without a backend this is a no-op.
    pub async fn play(&self) -> Result<()> {
        let Some(backend) = self.active_backend().await else {
            return Ok(());
        };

        let result = backend.lock().await.play().await;
        match result {
            Ok(()) => Ok(()),
            Err(PlaybackError::AutoplayRejected) => {
                info!("Playback needs a user gesture, waiting for interaction");
                self.arm_autoplay_retry().await;
                Ok(())
            }
            Err(e) => Err(e),
        }
    }

    /// Pause playback; cancels the position poll and any pending autoplay retry
    pub async fn pause(&self) -> Result<()> {
        let backend = {
            let mut state = self.inner.state.lock().await;
            state.cancel_poll();
            state.cancel_autoplay_retry();
            state.active.as_ref().map(|a| Arc::clone(&a.backend))
        };

        match backend {
            Some(backend) => backend.lock().await.pause().await,
            None => Ok(()),
        }
    }

    /// Pause and rewind to the start
    pub async fn stop(&self) -> Result<()> {
        self.pause().await?;
        self.seek(0.0).await
    }

    /// Jump to `position` seconds
    ///
    /// The store's `current_time` is updated right away rather than waiting
    /// for the backend to report it.
    pub async fn seek(&self, position: f64) -> Result<()> {
        let position = if position.is_finite() {
            position.max(0.0)
        } else {
            0.0
        };

        if let Some(backend) = self.active_backend().await {
            backend.lock().await.seek(position).await?;
        }
        self.inner.store.set_current_time(position);
        Ok(())
    }

    /// Set the volume (clamped to 0-1) and push it to the backend
    pub async fn set_volume(&self, volume: f64) -> Result<()> {
        let volume = self.inner.store.set_volume(clamp_volume(volume));
        self.push_volume(volume).await
    }

    async fn push_volume(&self, volume: f64) -> Result<()> {
        let target = {
            let mut state = self.inner.state.lock().await;
            let Some(active) = state.active.as_ref() else {
                return Ok(());
            };
            let target = (active.kind, Arc::clone(&active.backend));
            state.applied_volume = Some(volume);
            target
        };

        let (kind, backend) = target;
        let mut guard = backend.lock().await;
        let result = guard.set_volume(to_backend_scale(kind, volume)).await;
        result
    }

    /// Position reported by the backend, 0 without one
    pub async fn current_time(&self) -> f64 {
        match self.active_backend().await {
            Some(backend) => backend.lock().await.current_time(),
            None => 0.0,
        }
    }

    /// Duration reported by the backend, 0 without one
    pub async fn duration(&self) -> f64 {
        match self.active_backend().await {
            Some(backend) => backend.lock().await.duration(),
            None => 0.0,
        }
    }

    /// Stop polling, cancel pending retries, release the backend
    ///
    /// Idempotent. In-flight loads are superseded. The store follower keeps
    /// running; see [`PlaybackAdapter::shutdown`].
    pub async fn cleanup(&self) {
        self.inner.generation.fetch_add(1, Ordering::SeqCst);
        let previous = self.inner.state.lock().await.take_active();
        if let Some(backend) = previous {
            backend.lock().await.release().await;
            info!("Playback backend released");
        }
        self.inner.store.set_loading(false);
    }

    /// [`cleanup`](Self::cleanup) and stop the store follower
    pub async fn shutdown(&self) {
        if let Some(handle) = self.inner.state.lock().await.follower.take() {
            handle.abort();
        }
        self.cleanup().await;
    }

    // ===== Track end =====

    /// Advance after the current track ended
    ///
    /// Loads and plays the next track (loop-aware). Tracks that fail to load
    /// are skipped, trying at most one full pass over the playlist. With no
    /// next track playback is marked stopped and the position reset.
    pub async fn handle_track_end(&self) {
        let store = &self.inner.store;
        let max_attempts = store.read(|s| s.playlist.len()).max(1);

        for attempt in 1..=max_attempts {
            let Some(next) = store.next_track() else {
                break;
            };

            match self.load_track(&next).await {
                Ok(()) => {
                    if let Err(e) = self.play().await {
                        warn!(track_id = %next.id, error = %e, "Could not start next track");
                    }
                    return;
                }
                Err(PlaybackError::Superseded) => return,
                Err(e) => {
                    warn!(track_id = %next.id, attempt, error = %e, "Skipping track that failed to load");
                }
            }
        }

        info!("Reached end of playlist");
        store.set_playing(false);
        store.set_current_time(0.0);
    }

    // ===== Background tasks =====

    /// Wait for user interactions and retry `play` on each until the host
    /// accepts it
    ///
    /// Runs as one task so a repeated rejection keeps waiting instead of
    /// arming a new retry.
    async fn arm_autoplay_retry(&self) {
        let mut interactions = self.inner.host.interactions();
        let weak = self.downgrade();

        let mut state = self.inner.state.lock().await;
        state.cancel_autoplay_retry();
        state.autoplay_retry = Some(tokio::spawn(async move {
            loop {
                match interactions.recv().await {
                    Ok(_) | Err(broadcast::error::RecvError::Lagged(_)) => {}
                    Err(broadcast::error::RecvError::Closed) => return,
                }

                let Some(backend) = retry_target(&weak).await else {
                    return;
                };

                debug!("User interaction received, retrying playback");
                let mut guard = backend.lock().await;
                let result = guard.play().await;
                drop(guard);
                match result {
                    Ok(()) => return,
                    Err(PlaybackError::AutoplayRejected) => {
                        debug!("Playback still needs a user gesture");
                    }
                    Err(e) => {
                        warn!(error = %e, "Retrying playback after interaction failed");
                        return;
                    }
                }
            }
        }));
    }

    async fn start_position_poll(&self, generation: u64) {
        let weak = self.downgrade();
        let period = self.inner.config.position_poll_interval();

        let mut state = self.inner.state.lock().await;
        state.cancel_poll();
        state.poll = Some(tokio::spawn(async move {
            let mut interval = tokio::time::interval(period);
            interval.set_missed_tick_behavior(MissedTickBehavior::Skip);

            loop {
                interval.tick().await;
                let Some(inner) = weak.upgrade() else {
                    return;
                };
                let adapter = PlaybackAdapter::from_inner(inner);
                if !adapter.is_current(generation) {
                    return;
                }
                if !adapter.inner.store.read(|s| s.is_playing) {
                    continue;
                }
                let position = adapter.current_time().await;
                adapter.inner.store.set_current_time(position);
            }
        }));
    }

    async fn stop_position_poll(&self) {
        self.inner.state.lock().await.cancel_poll();
    }

    async fn apply_event(&self, generation: u64, kind: BackendKind, event: BackendEvent) {
        if !self.is_current(generation) {
            return;
        }

        let store = &self.inner.store;
        match event {
            BackendEvent::LoadedMetadata { duration } => store.set_duration(duration),
            BackendEvent::Playing => {
                store.set_playing(true);
                if kind == BackendKind::EmbeddedVideo {
                    self.start_position_poll(generation).await;
                }
            }
            BackendEvent::Paused => {
                store.set_playing(false);
                self.stop_position_poll().await;
            }
            BackendEvent::TimeUpdate { position } => store.set_current_time(position),
            BackendEvent::Ended => {
                self.stop_position_poll().await;
                // The next load aborts this pump, so advance on a separate task
                let adapter = self.clone();
                tokio::spawn(async move { adapter.handle_track_end().await });
            }
            BackendEvent::Error { message } => {
                error!(%message, "Backend error");
                store.set_loading(false);
            }
        }
    }

    /// Start the task that lets the store drive the adapter
    ///
    /// On every new `load_request` it loads the store's current track and
    /// marks the request settled. Volume changes made directly on the store
    /// are pushed to the active backend. Calling this again replaces the
    /// previous follower.
    pub async fn spawn_store_follower(&self) {
        let weak = self.downgrade();
        let mut rx = self.inner.store.subscribe();

        let handle = tokio::spawn(async move {
            let mut seen_request = rx.borrow().load_settled;
            loop {
                let (request, volume, track) = {
                    let state = rx.borrow_and_update();
                    (state.load_request, state.volume, state.current_track.clone())
                };

                let Some(inner) = weak.upgrade() else {
                    return;
                };
                let adapter = PlaybackAdapter::from_inner(inner);

                if request > seen_request {
                    seen_request = request;
                    match track {
                        Some(track) => match adapter.load_track(&track).await {
                            Ok(()) | Err(PlaybackError::Superseded) => {}
                            Err(e) => warn!(request, error = %e, "Requested load failed"),
                        },
                        None => debug!(request, "Load requested without a current track"),
                    }
                    adapter.inner.store.mark_load_settled(request);
                }

                adapter.sync_volume(volume).await;
                drop(adapter);

                if rx.changed().await.is_err() {
                    return;
                }
            }
        });

        let mut state = self.inner.state.lock().await;
        if let Some(previous) = state.follower.replace(handle) {
            previous.abort();
        }
    }

    async fn sync_volume(&self, volume: f64) {
        let applied = self.inner.state.lock().await.applied_volume;
        if applied.is_some_and(|v| v != volume) {
            if let Err(e) = self.push_volume(volume).await {
                warn!(error = %e, "Could not apply volume");
            }
        }
    }
}

fn needs_drive_fallback(track: &Track, source: &MediaSource) -> bool {
    track.track_type == TrackType::Drive
        && matches!(
            source,
            MediaSource::Native {
                cors: CorsMode::Anonymous,
                ..
            }
        )
}

/// Backend to retry playback on, if the adapter is still alive
async fn retry_target(weak: &Weak<AdapterInner>) -> Option<SharedBackend> {
    let inner = weak.upgrade()?;
    PlaybackAdapter::from_inner(inner).active_backend().await
}

fn spawn_event_pump(
    weak: Weak<AdapterInner>,
    generation: u64,
    kind: BackendKind,
    mut events: mpsc::UnboundedReceiver<BackendEvent>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        while let Some(event) = events.recv().await {
            let Some(inner) = weak.upgrade() else {
                return;
            };
            debug!(event = event.name(), generation, "Backend event");
            PlaybackAdapter::from_inner(inner)
                .apply_event(generation, kind, event)
                .await;
        }
    })
}
