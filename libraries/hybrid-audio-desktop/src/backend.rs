//! Native audio backend for the desktop
//!
//! Fetches the resolved source, decodes it with Symphonia, converts it to
//! the device format and plays it through [`AudioOutput`]. Progress is
//! reported as backend events by a small tokio task.

use crate::decode;
use crate::fetch;
use crate::output::AudioOutput;
use async_trait::async_trait;
use hybrid_playback::{
    BackendEvent, BackendEvents, BackendKind, BackendReady, MediaSource, PlaybackBackend,
    PlaybackError, Result,
};
use reqwest::Client;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info};

/// How often `TimeUpdate` events are sent while playing
const PROGRESS_INTERVAL: Duration = Duration::from_millis(250);

/// Desktop implementation of [`PlaybackBackend`] for native sources
pub struct CpalAudioBackend {
    http: Client,
    events: BackendEvents,
    output: Option<Arc<AudioOutput>>,
    progress: Option<JoinHandle<()>>,
    /// Gain applied to the next output as well
    volume: f32,
    duration: f64,
}

impl CpalAudioBackend {
    pub fn new(http: Client, events: BackendEvents) -> Self {
        Self {
            http,
            events,
            output: None,
            progress: None,
            volume: 1.0,
            duration: 0.0,
        }
    }

    fn output(&self) -> Result<&Arc<AudioOutput>> {
        self.output
            .as_ref()
            .ok_or_else(|| PlaybackError::backend("no track loaded"))
    }

    fn teardown(&mut self) {
        if let Some(handle) = self.progress.take() {
            handle.abort();
        }
        // Dropping the last handle stops the output thread
        self.output = None;
        self.duration = 0.0;
    }

    fn emit(&self, event: BackendEvent) {
        let _ = self.events.send(event);
    }
}

impl Drop for CpalAudioBackend {
    fn drop(&mut self) {
        self.teardown();
    }
}

/// Report position while playing, stream errors, and the end of the buffer
fn spawn_progress(output: Arc<AudioOutput>, events: BackendEvents) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(PROGRESS_INTERVAL);
        interval.set_missed_tick_behavior(MissedTickBehavior::Skip);

        loop {
            interval.tick().await;

            let event = if let Some(message) = output.take_failure() {
                BackendEvent::Error { message }
            } else if output.take_ended() {
                let _ = events.send(BackendEvent::TimeUpdate {
                    position: output.duration_secs(),
                });
                BackendEvent::Ended
            } else if output.is_playing() {
                BackendEvent::TimeUpdate {
                    position: output.position_secs(),
                }
            } else {
                continue;
            };

            if events.send(event).is_err() {
                return;
            }
        }
    })
}

#[async_trait]
impl PlaybackBackend for CpalAudioBackend {
    fn kind(&self) -> BackendKind {
        BackendKind::NativeAudio
    }

    async fn load(&mut self, source: &MediaSource) -> Result<BackendReady> {
        self.teardown();

        let MediaSource::Native { url, cors } = source else {
            return Err(PlaybackError::load(
                "the desktop audio backend only plays native sources",
            ));
        };
        // There is no cross-origin policy outside a browser
        debug!(url = %url, cors = ?cors, "Loading native source");

        let fetched = fetch::fetch(&self.http, url).await?;

        let (output, audio) = tokio::task::spawn_blocking(move || {
            let decoded = decode::decode(fetched.bytes, fetched.extension.as_deref())?;
            let output = AudioOutput::open()?;
            let audio = decoded.into_format(output.channels(), output.sample_rate());
            Ok::<_, crate::AudioError>((output, audio))
        })
        .await
        .map_err(|e| PlaybackError::load(format!("decoder task failed: {}", e)))??;

        let duration = audio.duration();
        output.load(audio.samples);
        output.set_volume(self.volume);

        let output = Arc::new(output);
        self.progress = Some(spawn_progress(Arc::clone(&output), self.events.clone()));
        self.output = Some(output);
        self.duration = duration;

        info!(url = %url, duration, "Native source ready");
        self.emit(BackendEvent::LoadedMetadata { duration });
        Ok(BackendReady { duration })
    }

    async fn play(&mut self) -> Result<()> {
        self.output()?.play()?;
        self.emit(BackendEvent::Playing);
        Ok(())
    }

    async fn pause(&mut self) -> Result<()> {
        if let Some(output) = &self.output {
            output.pause()?;
            self.emit(BackendEvent::Paused);
        }
        Ok(())
    }

    async fn seek(&mut self, position: f64) -> Result<()> {
        self.output()?.seek(position);
        Ok(())
    }

    async fn set_volume(&mut self, volume: f64) -> Result<()> {
        self.volume = volume.clamp(0.0, 1.0) as f32;
        if let Some(output) = &self.output {
            output.set_volume(self.volume);
        }
        Ok(())
    }

    fn current_time(&self) -> f64 {
        self.output.as_ref().map_or(0.0, |o| o.position_secs())
    }

    fn duration(&self) -> f64 {
        self.duration
    }

    async fn release(&mut self) {
        self.teardown();
        debug!("Native backend released");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::sync::mpsc;

    fn backend() -> (CpalAudioBackend, mpsc::UnboundedReceiver<BackendEvent>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (CpalAudioBackend::new(Client::new(), tx), rx)
    }

    #[tokio::test]
    async fn embedded_sources_are_rejected() {
        let (mut backend, _rx) = backend();
        let source = MediaSource::Embedded {
            video_id: "dQw4w9WgXcQ".into(),
        };
        assert!(matches!(
            backend.load(&source).await,
            Err(PlaybackError::BackendLoad(_))
        ));
    }

    #[tokio::test]
    async fn controls_before_load() {
        let (mut backend, mut rx) = backend();

        assert!(backend.play().await.is_err());
        assert!(backend.pause().await.is_ok());
        assert!(backend.set_volume(0.4).await.is_ok());
        assert_eq!(backend.current_time(), 0.0);
        assert_eq!(backend.duration(), 0.0);
        backend.release().await;

        assert!(rx.try_recv().is_err());
    }
}
