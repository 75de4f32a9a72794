//! In-memory decoded track with a playback cursor.
//!
//! Decoders push samples into it; emitters pull fixed-size chunks out.

use crate::sources::DecodeSource;

#[derive(Clone, Debug, Default)]
pub struct PlaybackBuffer {
    position: usize,
    buffer: Vec<f32>,
}

impl PlaybackBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_samples(samples: Vec<f32>) -> Self {
        Self {
            position: 0,
            buffer: samples,
        }
    }

    pub fn push_samples<I: IntoIterator<Item = f32>>(&mut self, samples: I) {
        self.buffer.extend(samples);
    }

    /// Samples left before the cursor reaches the end
    pub fn remaining(&self) -> usize {
        self.buffer.len().saturating_sub(self.position)
    }

    /// Get playback position in seconds
    pub fn position_secs(&self, sample_rate: u32) -> f64 {
        self.position as f64 / sample_rate as f64
    }

    pub fn duration_secs(&self, sample_rate: u32) -> f64 {
        self.buffer.len() as f64 / sample_rate as f64
    }
}

impl DecodeSource for PlaybackBuffer {
    fn read_samples(&mut self, buf: &mut [f32]) -> usize {
        let to_read = buf.len().min(self.remaining());

        if to_read > 0 {
            buf[..to_read].copy_from_slice(&self.buffer[self.position..self.position + to_read]);
            self.position += to_read;
        }

        to_read
    }

    fn position(&self) -> u64 {
        self.position as u64
    }

    fn length(&self) -> u64 {
        self.buffer.len() as u64
    }

    fn seek_to_start(&mut self) {
        self.position = 0;
    }
}
