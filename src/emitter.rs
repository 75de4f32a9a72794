//! A SoundBox: one addressable virtual sound source.

use crate::{
    constants::{CHUNK_SAMPLES, MAX_FRAME_BYTES},
    scheduler::SampleBudget,
    sources::{self, DecodeSource},
    speaker::SpeakerIdentity,
    voice::VoiceChannel,
};
use anyhow::Result;
use std::collections::VecDeque;
use symphonia::core::io::MediaSource;

pub type EmitterId = u32;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum EmitterState {
    /// Not playing; a source may still be loaded
    Idle,

    /// Frames are produced every simulation frame
    Playing,
}

pub struct Emitter {
    id: EmitterId,
    pub speaker: SpeakerIdentity,
    pub channel: VoiceChannel,
    pub looping: bool,
    pub destroy_on_finish: bool,
    pub destroy_speaker_on_finish: bool,
    pub(crate) is_playing: bool,
    pub(crate) active: Option<Box<dyn DecodeSource>>,
    pub(crate) pending: VecDeque<Box<dyn DecodeSource>>,
    pub(crate) budget: SampleBudget,
    pub(crate) samples: [f32; CHUNK_SAMPLES],
    pub(crate) encoded: [u8; MAX_FRAME_BYTES],
}

impl Emitter {
    pub(crate) fn new(id: EmitterId, channel: VoiceChannel, destroy_on_finish: bool) -> Self {
        Self {
            id,
            speaker: SpeakerIdentity::HOST,
            channel,
            looping: false,
            destroy_on_finish,
            destroy_speaker_on_finish: false,
            is_playing: false,
            active: None,
            pending: VecDeque::new(),
            budget: SampleBudget::default(),
            samples: [0.0; CHUNK_SAMPLES],
            encoded: [0; MAX_FRAME_BYTES],
        }
    }

    pub fn id(&self) -> EmitterId {
        self.id
    }

    pub fn state(&self) -> EmitterState {
        if self.is_playing {
            EmitterState::Playing
        } else {
            EmitterState::Idle
        }
    }

    pub fn is_playing(&self) -> bool {
        self.is_playing
    }

    pub fn is_looping(&self) -> bool {
        self.looping
    }

    /// Cursor of the active source, if one is loaded
    pub fn position(&self) -> Option<u64> {
        self.active.as_ref().map(|source| source.position())
    }

    pub fn length(&self) -> Option<u64> {
        self.active.as_ref().map(|source| source.length())
    }

    pub fn has_source(&self) -> bool {
        self.active.is_some()
    }

    pub fn queue_len(&self) -> usize {
        self.pending.len()
    }

    /// Replace the active source and start playing it.
    pub fn play(&mut self, source: Box<dyn DecodeSource>) {
        debug!(
            "SoundBox {} playing new source ({} samples)",
            self.id,
            source.length()
        );
        self.active = Some(source);
        self.resume();
    }

    /// Decode `stream` and play it. A stream that fails to decode leaves the
    /// emitter exactly as it was.
    pub fn play_stream(&mut self, stream: Box<dyn MediaSource>) -> Result<()> {
        match sources::symphonia::open(stream) {
            Ok(track) => {
                self.play(Box::new(track));
                Ok(())
            }
            Err(e) => {
                error!("The stream provided to SoundBox {} could not be played: {e:?}", self.id);
                Err(e)
            }
        }
    }

    /// Resume a paused emitter without touching its source.
    pub fn resume(&mut self) {
        self.is_playing = true;
    }

    /// Append a source to play once the active one finishes.
    pub fn enqueue(&mut self, source: Box<dyn DecodeSource>) {
        self.pending.push_back(source);
        debug!("SoundBox {} queue length: {}", self.id, self.pending.len());
    }

    /// Decode `stream` and enqueue it. A stream that fails to decode leaves
    /// the queue untouched.
    pub fn enqueue_stream(&mut self, stream: Box<dyn MediaSource>) -> Result<()> {
        match sources::symphonia::open(stream) {
            Ok(track) => {
                self.enqueue(Box::new(track));
                Ok(())
            }
            Err(e) => {
                error!("The stream provided to SoundBox {} could not be queued: {e:?}", self.id);
                Err(e)
            }
        }
    }

    /// Pause playback. Position and leftover sample budget are kept.
    pub fn stop(&mut self) {
        self.is_playing = false;
    }

    /// Rewind the active source and resume.
    pub fn restart(&mut self) {
        if let Some(source) = &mut self.active {
            source.seek_to_start();
        }
        self.resume();
    }

    pub fn toggle_loop(&mut self) -> bool {
        self.looping = !self.looping;
        self.looping
    }

    /// Drop every source this emitter holds.
    pub(crate) fn dispose(&mut self) {
        self.is_playing = false;
        self.active = None;
        self.pending.clear();
    }
}
