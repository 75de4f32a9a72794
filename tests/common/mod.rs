//! Test infrastructure for SoundBox integration tests.
//!
//! Provides recording fakes for the session's collaborators, a harness that
//! wires them into a [`Session`], and helpers for writing audio files.

#![allow(dead_code)]

use anyhow::{bail, Result};
use std::{
    collections::HashMap,
    path::{Path, PathBuf},
    sync::{Arc, Mutex},
    time::Duration,
};

// Re-export key types from the main crate
pub use soundbox::buffer::PlaybackBuffer;
pub use soundbox::codec::{FrameEncoder, MuLawEncoder};
pub use soundbox::command::{CommandResponse, SoundBoxCommand};
pub use soundbox::config::{Config, SoundBoxConfig};
pub use soundbox::constants::{CHUNK_SAMPLES, MAX_FRAME_BYTES, SAMPLE_RATE};
pub use soundbox::emitter::{EmitterId, EmitterState};
pub use soundbox::event::{Event, EventBus, Subscriber};
pub use soundbox::session::Session;
pub use soundbox::sources::{DecodeSource, SourceLoader};
pub use soundbox::speaker::{SpeakerEvent, SpeakerIdentity, SpeakerProvider};
pub use soundbox::voice::{BroadcastSink, VoiceChannel};

/// One broadcast captured by [`RecordingSink`].
#[derive(Clone, Debug, PartialEq)]
pub struct SentFrame {
    pub speaker: SpeakerIdentity,
    pub channel: VoiceChannel,
    pub payload: Vec<u8>,
}

/// Broadcast sink that keeps every frame it is given.
#[derive(Clone, Default)]
pub struct RecordingSink {
    frames: Arc<Mutex<Vec<SentFrame>>>,
}

impl RecordingSink {
    pub fn frames(&self) -> Vec<SentFrame> {
        self.frames.lock().unwrap().clone()
    }

    pub fn count(&self) -> usize {
        self.frames.lock().unwrap().len()
    }

    pub fn clear(&self) {
        self.frames.lock().unwrap().clear();
    }
}

impl BroadcastSink for RecordingSink {
    fn broadcast(&self, speaker: SpeakerIdentity, channel: VoiceChannel, frame: &[u8]) {
        self.frames.lock().unwrap().push(SentFrame {
            speaker,
            channel,
            payload: frame.to_vec(),
        });
    }
}

/// Encoder that writes the first sample of each chunk as its payload, so
/// tests can tell which source a frame came from.
#[derive(Clone, Default)]
pub struct RecordingEncoder {
    chunks: Arc<Mutex<Vec<Vec<f32>>>>,
}

impl RecordingEncoder {
    pub fn chunks(&self) -> Vec<Vec<f32>> {
        self.chunks.lock().unwrap().clone()
    }

    pub fn count(&self) -> usize {
        self.chunks.lock().unwrap().len()
    }
}

impl FrameEncoder for RecordingEncoder {
    fn encode(
        &mut self,
        pcm: &[f32; CHUNK_SAMPLES],
        out: &mut [u8; MAX_FRAME_BYTES],
    ) -> Result<usize> {
        self.chunks.lock().unwrap().push(pcm.to_vec());
        out[..4].copy_from_slice(&pcm[0].to_le_bytes());
        Ok(4)
    }
}

/// Loader serving in-memory sources for registered paths.
#[derive(Clone, Default)]
pub struct FakeLoader {
    sources: Arc<Mutex<HashMap<PathBuf, (Vec<f32>, Duration)>>>,
}

impl FakeLoader {
    pub fn insert(&self, path: &Path, samples: Vec<f32>) {
        self.insert_slow(path, samples, Duration::ZERO);
    }

    /// Register a source whose load blocks for `delay`.
    pub fn insert_slow(&self, path: &Path, samples: Vec<f32>, delay: Duration) {
        self.sources
            .lock()
            .unwrap()
            .insert(path.to_path_buf(), (samples, delay));
    }
}

impl SourceLoader for FakeLoader {
    fn load(&self, path: &Path) -> Result<Box<dyn DecodeSource>> {
        let entry = self.sources.lock().unwrap().get(path).cloned();

        match entry {
            Some((samples, delay)) => {
                std::thread::sleep(delay);
                Ok(Box::new(PlaybackBuffer::from_samples(samples)))
            }
            None => bail!("unsupported format"),
        }
    }
}

/// Speaker provider that records which speakers exist.
#[derive(Clone, Default)]
pub struct FakeSpeakers {
    inner: Arc<Mutex<FakeSpeakersInner>>,
}

#[derive(Default)]
struct FakeSpeakersInner {
    next_id: u32,
    live: Vec<(SpeakerIdentity, String)>,
    destroyed: Vec<SpeakerIdentity>,
}

impl FakeSpeakers {
    pub fn live(&self) -> Vec<(SpeakerIdentity, String)> {
        self.inner.lock().unwrap().live.clone()
    }

    pub fn destroyed(&self) -> Vec<SpeakerIdentity> {
        self.inner.lock().unwrap().destroyed.clone()
    }
}

impl SpeakerProvider for FakeSpeakers {
    fn create_speaker(&mut self, name: &str) -> SpeakerIdentity {
        let mut inner = self.inner.lock().unwrap();
        inner.next_id += 1;
        let speaker = SpeakerIdentity(100 + inner.next_id);
        inner.live.push((speaker, name.to_string()));
        speaker
    }

    fn destroy_speaker(&mut self, speaker: SpeakerIdentity) {
        let mut inner = self.inner.lock().unwrap();
        inner.live.retain(|(live, _)| *live != speaker);
        inner.destroyed.push(speaker);
    }
}

/// Session wired to recording fakes, with handles to inspect them.
pub struct TestHarness {
    pub session: Session,
    pub sink: RecordingSink,
    pub encoder: RecordingEncoder,
    pub loader: FakeLoader,
    pub speakers: FakeSpeakers,
    pub dir: tempfile::TempDir,
}

impl TestHarness {
    pub fn new() -> Self {
        Self::with_config(SoundBoxConfig::default())
    }

    pub fn with_config(config: SoundBoxConfig) -> Self {
        let sink = RecordingSink::default();
        let encoder = RecordingEncoder::default();
        let loader = FakeLoader::default();
        let speakers = FakeSpeakers::default();

        let session = Session::new(
            &config,
            Box::new(encoder.clone()),
            Box::new(sink.clone()),
            Box::new(speakers.clone()),
            Arc::new(loader.clone()),
        );

        Self {
            session,
            sink,
            encoder,
            loader,
            speakers,
            dir: tempfile::tempdir().unwrap(),
        }
    }

    /// Create a file the fake loader decodes to `samples`.
    pub fn audio_file(&self, name: &str, samples: Vec<f32>) -> String {
        let path = self.dir.path().join(name);
        std::fs::write(&path, b"audio").unwrap();
        self.loader.insert(&path, samples);
        path.to_string_lossy().into_owned()
    }

    /// Create a file that exists but the loader can't decode.
    pub fn broken_file(&self, name: &str) -> String {
        let path = self.dir.path().join(name);
        std::fs::write(&path, b"garbage").unwrap();
        path.to_string_lossy().into_owned()
    }

    /// Run a console line against the session.
    pub fn run(&mut self, line: &str) -> CommandResponse {
        match SoundBoxCommand::parse_line(line) {
            Some(Ok(command)) => self.session.execute(command),
            Some(Err(response)) => response,
            None => panic!("Not a SoundBox command: {line}"),
        }
    }

    /// Run `frames` simulation frames of `delta` each.
    pub fn tick(&mut self, frames: usize, delta: Duration) {
        for _ in 0..frames {
            self.session.tick(delta);
        }
    }
}

/// Parse the id out of a "Created a SoundBox with the id: N" message.
pub fn created_id(response: &CommandResponse) -> EmitterId {
    assert!(response.success, "expected success, got {response:?}");
    response
        .message
        .rsplit(' ')
        .next()
        .and_then(|id| id.parse().ok())
        .unwrap_or_else(|| panic!("No id in {:?}", response.message))
}

/// Constant-valued samples.
pub fn constant(value: f32, len: usize) -> Vec<f32> {
    vec![value; len]
}

/// Write a 16-bit sine WAV file holding `frames` frames.
pub fn write_sine_wav(path: &Path, sample_rate: u32, channels: u16, frames: u32) {
    let spec = hound::WavSpec {
        channels,
        sample_rate,
        bits_per_sample: 16,
        sample_format: hound::SampleFormat::Int,
    };
    let mut writer = hound::WavWriter::create(path, spec).unwrap();

    for n in 0..frames {
        let t = n as f32 / sample_rate as f32;
        let sample = (t * 440.0 * 2.0 * std::f32::consts::PI).sin() * 0.5;
        for _ in 0..channels {
            writer
                .write_sample((sample * i16::MAX as f32) as i16)
                .unwrap();
        }
    }

    writer.finalize().unwrap();
}

/// Receive the next event, waiting at most one second.
pub async fn next_event(subscriber: &mut Subscriber) -> Option<Event> {
    tokio::time::timeout(Duration::from_secs(1), subscriber.recv())
        .await
        .ok()
        .flatten()
}

pub const FRAME_1_64: Duration = Duration::from_micros(15_625);
pub const FRAME_1_16: Duration = Duration::from_micros(62_500);
