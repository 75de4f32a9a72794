use crate::{constants::SAMPLE_RATE, sources::DecodeSource};
use std::time::Duration;

const AMPLITUDE: f32 = 0.5; // 50% amplitude

/// A finite sine tone, generated on the fly.
#[derive(Clone, Debug)]
pub struct Tone {
    frequency: f64,
    position: u64,
    length: u64,
}

impl Tone {
    pub fn new(frequency: f64, duration: Duration) -> Self {
        let length = (duration.as_secs_f64() * SAMPLE_RATE as f64).round() as u64;
        Self::with_length(frequency, length)
    }

    pub fn with_length(frequency: f64, length: u64) -> Self {
        Self {
            frequency,
            position: 0,
            length,
        }
    }
}

impl DecodeSource for Tone {
    fn read_samples(&mut self, buf: &mut [f32]) -> usize {
        let to_read = (buf.len() as u64).min(self.length - self.position) as usize;

        for (i, sample) in buf[..to_read].iter_mut().enumerate() {
            *sample = sine_wave(self.frequency, self.position + i as u64);
        }
        self.position += to_read as u64;

        to_read
    }

    fn position(&self) -> u64 {
        self.position
    }

    fn length(&self) -> u64 {
        self.length
    }

    fn seek_to_start(&mut self) {
        self.position = 0;
    }
}

fn sine_wave(frequency: f64, n: u64) -> f32 {
    // Phase wraps around 1.0 to keep precision on long tones
    let phase = (n as f64 * frequency / SAMPLE_RATE as f64) % 1.0;
    ((phase * std::f64::consts::PI * 2.0).sin() as f32) * AMPLITUDE
}
