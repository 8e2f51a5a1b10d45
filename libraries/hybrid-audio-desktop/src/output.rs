/// CPAL-based audio output on a dedicated thread
///
/// The cpal `Stream` is not `Send` on every platform, so it lives on its own
/// thread for the whole lifetime of an [`AudioOutput`]. The handle talks to
/// that thread over a crossbeam channel; sample data, position and volume
/// are shared with the audio callback through [`OutputState`].
use crate::error::{AudioError, Result};
use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use cpal::{Device, FromSample, SampleFormat, SizedSample, Stream, StreamConfig};
use crossbeam_channel::{bounded, Receiver, Sender};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::thread::{self, JoinHandle};
use tracing::{debug, error, info, warn};

/// Commands sent to the output thread
enum OutputCommand {
    /// Start the stream
    Play,
    /// Pause the stream
    Pause,
    /// Drop the stream and exit
    Shutdown,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// State shared between the handle and the audio callback
pub(crate) struct OutputState {
    /// Interleaved samples in the device format
    buffer: Mutex<Arc<Vec<f32>>>,
    /// Read position, in samples (not frames)
    position: AtomicUsize,
    playing: AtomicBool,
    /// Set by the callback when the buffer ran out while playing
    ended: AtomicBool,
    volume: Mutex<f32>,
    /// Last error reported by the stream, not yet picked up
    failure: Mutex<Option<String>>,
}

impl OutputState {
    pub(crate) fn new() -> Self {
        Self {
            buffer: Mutex::new(Arc::new(Vec::new())),
            position: AtomicUsize::new(0),
            playing: AtomicBool::new(false),
            ended: AtomicBool::new(false),
            volume: Mutex::new(1.0),
            failure: Mutex::new(None),
        }
    }

    pub(crate) fn load(&self, samples: Vec<f32>) {
        *lock(&self.buffer) = Arc::new(samples);
        self.position.store(0, Ordering::Relaxed);
        self.ended.store(false, Ordering::Relaxed);
    }

    pub(crate) fn set_playing(&self, playing: bool) {
        self.playing.store(playing, Ordering::Release);
    }

    pub(crate) fn set_volume(&self, volume: f32) {
        *lock(&self.volume) = volume.clamp(0.0, 1.0);
    }

    /// Move to sample index `position`, clamped to the buffer
    pub(crate) fn seek(&self, position: usize) {
        let len = lock(&self.buffer).len();
        self.position.store(position.min(len), Ordering::Relaxed);
        self.ended.store(false, Ordering::Relaxed);
    }

    pub(crate) fn position(&self) -> usize {
        self.position.load(Ordering::Relaxed)
    }

    pub(crate) fn len(&self) -> usize {
        lock(&self.buffer).len()
    }

    pub(crate) fn is_playing(&self) -> bool {
        self.playing.load(Ordering::Acquire)
    }

    /// Whether playback reached the end since the last call
    pub(crate) fn take_ended(&self) -> bool {
        self.ended.swap(false, Ordering::AcqRel)
    }

    pub(crate) fn report_failure(&self, message: String) {
        *lock(&self.failure) = Some(message);
    }

    pub(crate) fn take_failure(&self) -> Option<String> {
        lock(&self.failure).take()
    }
}

/// Audio callback body (runs on the real-time audio thread)
pub(crate) fn fill_output<T>(output: &mut [T], state: &OutputState)
where
    T: SizedSample + FromSample<f32>,
{
    if !state.is_playing() {
        output.fill(T::from_sample(0.0f32));
        return;
    }

    let volume = *lock(&state.volume);
    let buffer = Arc::clone(&*lock(&state.buffer));
    let len = buffer.len();
    let mut pos = state.position.load(Ordering::Relaxed);

    for slot in output.iter_mut() {
        let sample = if pos < len {
            let s = buffer[pos];
            pos += 1;
            s * volume
        } else {
            0.0
        };
        *slot = T::from_sample(sample);
    }

    state.position.store(pos, Ordering::Relaxed);
    if pos >= len {
        state.playing.store(false, Ordering::Release);
        state.ended.store(true, Ordering::Release);
    }
}

/// Handle to the default output device
pub struct AudioOutput {
    commands: Sender<OutputCommand>,
    state: Arc<OutputState>,
    sample_rate: u32,
    channels: u16,
    _thread: JoinHandle<()>,
}

impl AudioOutput {
    /// Open the default output device
    ///
    /// Blocks until the output thread has built its stream.
    ///
    /// # Errors
    /// Returns an error if no device is available or the stream cannot be built
    pub fn open() -> Result<Self> {
        let state = Arc::new(OutputState::new());
        let (command_tx, command_rx) = bounded::<OutputCommand>(32);
        let (ready_tx, ready_rx) = bounded::<Result<(u32, u16)>>(1);

        let thread_state = Arc::clone(&state);
        let thread = thread::Builder::new()
            .name("hybrid-audio-output".to_string())
            .spawn(move || run_output_thread(&thread_state, &command_rx, &ready_tx))
            .map_err(|e| AudioError::OutputThread(e.to_string()))?;

        let (sample_rate, channels) = ready_rx
            .recv()
            .map_err(|_| AudioError::OutputThread("output thread exited during startup".into()))??;

        info!(sample_rate, channels, "Audio output opened");
        Ok(Self {
            commands: command_tx,
            state,
            sample_rate,
            channels,
            _thread: thread,
        })
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    pub fn channels(&self) -> u16 {
        self.channels
    }

    fn send(&self, command: OutputCommand) -> Result<()> {
        self.commands
            .send(command)
            .map_err(|_| AudioError::OutputThread("output thread is not running".into()))
    }

    /// Replace the buffer; samples must already be in the device format
    pub fn load(&self, samples: Vec<f32>) {
        self.state.load(samples);
    }

    pub fn play(&self) -> Result<()> {
        self.state.set_playing(true);
        self.send(OutputCommand::Play)
    }

    pub fn pause(&self) -> Result<()> {
        self.state.set_playing(false);
        self.send(OutputCommand::Pause)
    }

    /// Jump to `seconds`
    pub fn seek(&self, seconds: f64) {
        let frame = (seconds.max(0.0) * f64::from(self.sample_rate)) as usize;
        self.state.seek(frame * usize::from(self.channels));
    }

    /// Linear gain, 0.0-1.0
    pub fn set_volume(&self, volume: f32) {
        self.state.set_volume(volume);
    }

    fn samples_to_secs(&self, samples: usize) -> f64 {
        let per_second = f64::from(self.sample_rate) * f64::from(self.channels);
        if per_second > 0.0 {
            samples as f64 / per_second
        } else {
            0.0
        }
    }

    /// Current position in seconds
    pub fn position_secs(&self) -> f64 {
        self.samples_to_secs(self.state.position())
    }

    /// Length of the loaded buffer in seconds
    pub fn duration_secs(&self) -> f64 {
        self.samples_to_secs(self.state.len())
    }

    pub fn is_playing(&self) -> bool {
        self.state.is_playing()
    }

    /// Whether the buffer ran out since the last call
    pub fn take_ended(&self) -> bool {
        self.state.take_ended()
    }

    /// Stream error reported since the last call
    pub fn take_failure(&self) -> Option<String> {
        self.state.take_failure()
    }
}

impl Drop for AudioOutput {
    fn drop(&mut self) {
        self.state.set_playing(false);
        let _ = self.commands.send(OutputCommand::Shutdown);
    }
}

/// Output thread main loop; owns the cpal stream
fn run_output_thread(
    state: &Arc<OutputState>,
    commands: &Receiver<OutputCommand>,
    ready: &Sender<Result<(u32, u16)>>,
) {
    let stream = match open_stream(state) {
        Ok((stream, sample_rate, channels)) => {
            let _ = ready.send(Ok((sample_rate, channels)));
            stream
        }
        Err(e) => {
            let _ = ready.send(Err(e));
            return;
        }
    };

    while let Ok(command) = commands.recv() {
        match command {
            OutputCommand::Play => {
                if let Err(e) = stream.play() {
                    error!(error = %AudioError::from(e), "Could not start output stream");
                }
            }
            OutputCommand::Pause => {
                if let Err(e) = stream.pause() {
                    warn!(error = %AudioError::from(e), "Could not pause output stream");
                }
            }
            OutputCommand::Shutdown => break,
        }
    }

    drop(stream);
    debug!("Audio output thread stopped");
}

fn open_stream(state: &Arc<OutputState>) -> Result<(Stream, u32, u16)> {
    let host = cpal::default_host();
    let device = host
        .default_output_device()
        .ok_or(AudioError::DeviceNotFound)?;

    let supported = device.default_output_config()?;
    let sample_rate = supported.sample_rate().0;
    let channels = supported.channels();
    let config: StreamConfig = supported.config();

    let stream = match supported.sample_format() {
        SampleFormat::F32 => build_stream::<f32>(&device, &config, state)?,
        SampleFormat::I16 => build_stream::<i16>(&device, &config, state)?,
        SampleFormat::U16 => build_stream::<u16>(&device, &config, state)?,
        other => {
            return Err(AudioError::UnsupportedFormat(format!(
                "device sample format {:?}",
                other
            )))
        }
    };

    // Some hosts start streams on creation
    if let Err(e) = stream.pause() {
        debug!(error = %e, "Could not pause new output stream");
    }

    Ok((stream, sample_rate, channels))
}

fn build_stream<T>(device: &Device, config: &StreamConfig, state: &Arc<OutputState>) -> Result<Stream>
where
    T: SizedSample + FromSample<f32>,
{
    let callback_state = Arc::clone(state);
    let error_state = Arc::clone(state);
    let stream = device.build_output_stream(
        config,
        move |data: &mut [T], _: &cpal::OutputCallbackInfo| fill_output(data, &callback_state),
        move |err| {
            error!(error = %err, "Audio stream error");
            error_state.report_failure(err.to_string());
        },
        None,
    )?;
    Ok(stream)
}
