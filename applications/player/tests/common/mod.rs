/// Common test utilities and fixtures
use async_trait::async_trait;
use hybrid_core::{MemoryCatalog, Track, TrackCatalog, TrackType};
use hybrid_playback::{
    BackendEvents, BackendHost, Interaction, PlaybackAdapter, PlaybackBackend, PlaybackError,
    PlaybackScheduler, PlayerConfig, PlayerStore,
};
use hybrid_player::Console;
use std::sync::{Arc, Mutex};
use tokio::sync::broadcast;

/// Host without any working backend
pub struct NoBackendHost {
    interactions: broadcast::Sender<Interaction>,
}

impl NoBackendHost {
    pub fn new() -> Self {
        let (interactions, _) = broadcast::channel(8);
        Self { interactions }
    }
}

#[async_trait]
impl BackendHost for NoBackendHost {
    fn native_audio(&self, _events: BackendEvents) -> hybrid_playback::Result<Box<dyn PlaybackBackend>> {
        Err(PlaybackError::load("no audio device"))
    }

    async fn embedded_video(
        &self,
        _events: BackendEvents,
    ) -> hybrid_playback::Result<Box<dyn PlaybackBackend>> {
        Err(PlaybackError::load("no video surface"))
    }

    fn interactions(&self) -> broadcast::Receiver<Interaction> {
        self.interactions.subscribe()
    }
}

pub fn mp3(id: &str) -> Track {
    Track::new(
        format!("Track {id}"),
        "Artist",
        TrackType::Mp3,
        format!("https://cdn.example.com/{id}.mp3"),
    )
    .with_id(id)
}

pub struct TestPlayer {
    pub console: Console,
    pub store: PlayerStore,
    pub catalog: Arc<MemoryCatalog>,
    pub interactions: Arc<Mutex<Vec<Interaction>>>,
}

/// Console over a store holding `tracks`, with no playable backend
pub fn player(tracks: Vec<Track>) -> TestPlayer {
    let catalog = Arc::new(MemoryCatalog::with_tracks(tracks.clone()));
    let store = PlayerStore::new();
    store.set_playlist(tracks);

    let config = PlayerConfig::default();
    let adapter = PlaybackAdapter::new(store.clone(), Arc::new(NoBackendHost::new()), config.clone());
    let scheduler = PlaybackScheduler::new(adapter.clone(), config);

    let interactions = Arc::new(Mutex::new(Vec::new()));
    let seen = Arc::clone(&interactions);
    let console = Console::new(
        adapter,
        scheduler,
        Arc::clone(&catalog) as Arc<dyn TrackCatalog>,
        move |interaction| seen.lock().unwrap().push(interaction),
    );

    TestPlayer {
        console,
        store,
        catalog,
        interactions,
    }
}
