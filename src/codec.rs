//! Voice frame encoders.
//!
//! Every encoder consumes exactly [`CHUNK_SAMPLES`] mono samples and writes at
//! most [`MAX_FRAME_BYTES`] bytes. One encoder is created per session at
//! startup and shared by all emitters, which call it one after another.

use crate::constants::{CHUNK_SAMPLES, MAX_FRAME_BYTES};
use anyhow::Result;
use serde::{Deserialize, Serialize};

pub trait FrameEncoder: Send {
    /// Encode one chunk into `out`, returning the frame length in bytes.
    fn encode(&mut self, pcm: &[f32; CHUNK_SAMPLES], out: &mut [u8; MAX_FRAME_BYTES])
        -> Result<usize>;
}

#[derive(Clone, Copy, Debug, Default, Deserialize, Serialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum EncoderKind {
    /// G.711 µ-law, one byte per sample
    #[default]
    MuLaw,

    /// Opus in VoIP mode, requires the `opus` feature
    Opus,
}

pub fn create(kind: EncoderKind) -> Result<Box<dyn FrameEncoder>> {
    match kind {
        EncoderKind::MuLaw => Ok(Box::new(MuLawEncoder)),
        #[cfg(feature = "opus")]
        EncoderKind::Opus => Ok(Box::new(opus_encoder::OpusFrameEncoder::new()?)),
        #[cfg(not(feature = "opus"))]
        EncoderKind::Opus => Err(anyhow::anyhow!(
            "Opus encoding requires building with the `opus` feature"
        )),
    }
}

const MULAW_BIAS: i32 = 0x84;
const MULAW_CLIP: i32 = 32635;

#[derive(Clone, Copy, Debug, Default)]
pub struct MuLawEncoder;

impl FrameEncoder for MuLawEncoder {
    fn encode(
        &mut self,
        pcm: &[f32; CHUNK_SAMPLES],
        out: &mut [u8; MAX_FRAME_BYTES],
    ) -> Result<usize> {
        for (byte, sample) in out.iter_mut().zip(pcm.iter()) {
            *byte = linear_to_mulaw(to_i16(*sample));
        }

        Ok(CHUNK_SAMPLES)
    }
}

fn to_i16(sample: f32) -> i16 {
    (sample.clamp(-1.0, 1.0) * i16::MAX as f32) as i16
}

pub fn linear_to_mulaw(sample: i16) -> u8 {
    let mut magnitude = sample as i32;
    let sign = if magnitude < 0 {
        magnitude = -magnitude;
        0x80
    } else {
        0
    };

    magnitude = magnitude.min(MULAW_CLIP) + MULAW_BIAS;

    let mut exponent = 7;
    let mut mask = 0x4000;
    while exponent > 0 && magnitude & mask == 0 {
        exponent -= 1;
        mask >>= 1;
    }

    let mantissa = (magnitude >> (exponent + 3)) & 0x0F;

    !(sign | (exponent << 4) | mantissa) as u8
}

pub fn mulaw_to_linear(byte: u8) -> i16 {
    let byte = !byte;
    let exponent = (byte >> 4) & 0x07;
    let mantissa = (byte & 0x0F) as i32;

    let magnitude = (((mantissa << 3) + MULAW_BIAS) << exponent) - MULAW_BIAS;

    if byte & 0x80 != 0 {
        -magnitude as i16
    } else {
        magnitude as i16
    }
}

#[cfg(feature = "opus")]
mod opus_encoder {
    use super::FrameEncoder;
    use crate::constants::{CHUNK_SAMPLES, MAX_FRAME_BYTES, SAMPLE_RATE};
    use anyhow::{Context, Result};

    pub struct OpusFrameEncoder {
        encoder: opus::Encoder,
    }

    impl OpusFrameEncoder {
        pub fn new() -> Result<Self> {
            let encoder = opus::Encoder::new(SAMPLE_RATE, opus::Channels::Mono, opus::Application::Voip)
                .context("Could not create Opus encoder")?;

            Ok(Self { encoder })
        }
    }

    impl FrameEncoder for OpusFrameEncoder {
        fn encode(
            &mut self,
            pcm: &[f32; CHUNK_SAMPLES],
            out: &mut [u8; MAX_FRAME_BYTES],
        ) -> Result<usize> {
            let len = self.encoder.encode_float(pcm, out)?;
            Ok(len)
        }
    }
}
