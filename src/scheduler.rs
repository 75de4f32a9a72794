//! Per-frame playback step for emitters.
//!
//! The session calls [`run_frame`] once per simulation frame for every
//! registered emitter. Samples fall due at the session rate of wall-clock
//! time; whole chunks of [`CHUNK_SAMPLES`] are decoded, encoded and broadcast,
//! and the fractional remainder is carried to the next frame so playback speed
//! does not drift with the frame rate.

use crate::{
    codec::FrameEncoder,
    constants::{CHUNK_SAMPLES, MAX_FRAME_BYTES, SAMPLES_PER_SECOND},
    emitter::Emitter,
    voice::BroadcastSink,
};
use std::time::Duration;

const NANOS_PER_SECOND: u128 = 1_000_000_000;

/// One whole chunk, in sample-nanoseconds
const CHUNK_UNITS: u128 = CHUNK_SAMPLES as u128 * NANOS_PER_SECOND;

/// Samples owed to the encoder, carried across frames.
///
/// Counted in sample-nanoseconds (samples due times 10^9) so that summing
/// frame deltas is exact and the chunk count only depends on total elapsed
/// time.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct SampleBudget {
    pending: u128,
}

impl SampleBudget {
    pub fn accrue(&mut self, delta: Duration) {
        self.pending += SAMPLES_PER_SECOND as u128 * delta.as_nanos();
    }

    pub fn has_chunk(&self) -> bool {
        self.pending >= CHUNK_UNITS
    }

    pub fn consume_chunk(&mut self) {
        self.pending -= CHUNK_UNITS;
    }

    pub fn clear(&mut self) {
        self.pending = 0;
    }

    /// Samples owed, including the fraction of a sample
    pub fn pending(&self) -> f64 {
        self.pending as f64 / NANOS_PER_SECOND as f64
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FrameOutcome {
    /// Nothing to do this frame, or playback just ended without destruction
    Idle,

    /// Playing; `frames` chunks were broadcast this frame
    Played { frames: usize },

    /// Playback ended and the emitter asked to be destroyed
    Finished,
}

enum Settle {
    Ready,
    Stopped,
    Finished,
}

/// Advance `emitter` by one simulation frame of length `delta`.
pub fn run_frame(
    emitter: &mut Emitter,
    delta: Duration,
    encoder: &mut dyn FrameEncoder,
    sink: &dyn BroadcastSink,
) -> FrameOutcome {
    if !emitter.is_playing {
        return FrameOutcome::Idle;
    }

    match settle(emitter) {
        Settle::Ready => {}
        Settle::Stopped => return FrameOutcome::Idle,
        Settle::Finished => return FrameOutcome::Finished,
    }

    emitter.budget.accrue(delta);

    let mut frames = 0;
    while emitter.budget.has_chunk() {
        // A source can run out between chunks; loop or advance without a gap
        match settle(emitter) {
            Settle::Ready => {}
            Settle::Stopped => return FrameOutcome::Idle,
            Settle::Finished => return FrameOutcome::Finished,
        }

        let Some(source) = emitter.active.as_mut() else {
            break;
        };

        // The encoder only takes whole chunks, so the tail of a source is
        // padded with silence
        let read = source.read_samples(&mut emitter.samples);
        emitter.samples[read..].fill(0.0);

        match encoder.encode(&emitter.samples, &mut emitter.encoded) {
            Ok(len) => {
                let len = len.min(MAX_FRAME_BYTES);
                sink.broadcast(emitter.speaker, emitter.channel, &emitter.encoded[..len]);
                frames += 1;
            }
            Err(e) => {
                warn!("SoundBox {} skipped a chunk: {e:?}", emitter.id());
            }
        }

        emitter.budget.consume_chunk();
    }

    trace!("SoundBox {} broadcast {frames} frames", emitter.id());

    FrameOutcome::Played { frames }
}

/// Resolve an exhausted active source: rewind when looping, otherwise move
/// to the next queued source, otherwise end playback.
fn settle(emitter: &mut Emitter) -> Settle {
    loop {
        let exhausted = emitter
            .active
            .as_ref()
            .map_or(true, |source| source.is_exhausted());

        if !exhausted {
            return Settle::Ready;
        }

        // An empty source can't loop, it would never produce a sample
        if emitter.looping {
            if let Some(source) = emitter.active.as_mut().filter(|s| s.length() > 0) {
                source.seek_to_start();
                debug!("SoundBox {} looping", emitter.id());
                return Settle::Ready;
            }
        }

        if let Some(next) = emitter.pending.pop_front() {
            emitter.active = Some(next);
            debug!(
                "SoundBox {} advanced to next source, {} left in queue",
                emitter.id(),
                emitter.pending.len()
            );
            continue;
        }

        emitter.budget.clear();

        if emitter.destroy_on_finish {
            return Settle::Finished;
        }

        info!("SoundBox {} finished playing", emitter.id());
        emitter.is_playing = false;
        return Settle::Stopped;
    }
}
