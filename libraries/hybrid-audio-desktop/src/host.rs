//! Desktop backend host

use crate::backend::CpalAudioBackend;
use crate::error::Result;
use async_trait::async_trait;
use hybrid_playback::{BackendEvents, BackendHost, Interaction, PlaybackBackend, PlaybackError};
use reqwest::Client;
use std::time::Duration;
use tokio::sync::broadcast;
use tracing::warn;

/// Provides backends to the playback adapter on the desktop
///
/// Native sources play through the default audio device. There is no
/// surface for an embedded video player, so asking for one fails with
/// `BackendLoad` and the adapter skips the track.
pub struct DesktopBackendHost {
    http: Client,
    interactions: broadcast::Sender<Interaction>,
}

impl DesktopBackendHost {
    pub fn new() -> Result<Self> {
        let http = Client::builder()
            .connect_timeout(Duration::from_secs(10))
            .user_agent(format!("HybridPlayer/{}", env!("CARGO_PKG_VERSION")))
            .build()?;
        let (interactions, _) = broadcast::channel(16);
        Ok(Self { http, interactions })
    }

    /// Publish a user interaction (unblocks a pending autoplay retry)
    pub fn report_interaction(&self, interaction: Interaction) {
        // No receiver just means nothing is waiting
        let _ = self.interactions.send(interaction);
    }
}

#[async_trait]
impl BackendHost for DesktopBackendHost {
    fn native_audio(&self, events: BackendEvents) -> hybrid_playback::Result<Box<dyn PlaybackBackend>> {
        Ok(Box::new(CpalAudioBackend::new(self.http.clone(), events)))
    }

    async fn embedded_video(
        &self,
        _events: BackendEvents,
    ) -> hybrid_playback::Result<Box<dyn PlaybackBackend>> {
        warn!("Embedded video playback is not available on the desktop host");
        Err(PlaybackError::load(
            "embedded video playback is not available on the desktop host",
        ))
    }

    fn interactions(&self) -> broadcast::Receiver<Interaction> {
        self.interactions.subscribe()
    }
}
