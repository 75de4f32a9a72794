//! Decodes compressed audio into a [`PlaybackBuffer`] at the session format.
//!
//! The whole stream is decoded up front, downmixed to mono and resampled to
//! [`SAMPLE_RATE`] so emitters can seek and pull exact chunk sizes without
//! touching the decoder again.

use crate::{buffer::PlaybackBuffer, constants::SAMPLE_RATE};
use anyhow::{Context, Result};
use rubato::{FftFixedIn, Resampler};
use std::{fs::File, path::Path};
use symphonia::core::audio::SampleBuffer;
use symphonia::core::codecs::DecoderOptions;
use symphonia::core::errors::Error;
use symphonia::core::formats::FormatOptions;
use symphonia::core::io::{MediaSource, MediaSourceStream};
use symphonia::core::meta::MetadataOptions;
use symphonia::core::probe::Hint;

const RESAMPLE_CHUNK: usize = 1024;

pub fn open_file(path: &Path) -> Result<PlaybackBuffer> {
    let file = File::open(path).with_context(|| format!("Could not open {}", path.display()))?;

    let mut hint = Hint::new();
    if let Some(extension) = path.extension().and_then(|ext| ext.to_str()) {
        hint.with_extension(extension);
    }

    decode(Box::new(file), hint).with_context(|| format!("Could not decode {}", path.display()))
}

/// Decode any media stream symphonia can probe.
pub fn open(stream: Box<dyn MediaSource>) -> Result<PlaybackBuffer> {
    decode(stream, Hint::new())
}

fn decode(stream: Box<dyn MediaSource>, hint: Hint) -> Result<PlaybackBuffer> {
    let mss = MediaSourceStream::new(stream, Default::default());

    let format_opts: FormatOptions = Default::default();
    let metadata_opts: MetadataOptions = Default::default();
    let decoder_opts: DecoderOptions = Default::default();

    let probed = symphonia::default::get_probe()
        .format(&hint, mss, &format_opts, &metadata_opts)
        .context("Not a valid audio stream")?;

    let mut format = probed.format;

    let track = format
        .default_track()
        .context("Could not find any tracks in stream")?;

    let mut decoder = symphonia::default::get_codecs().make(&track.codec_params, &decoder_opts)?;

    let track_id = track.id;
    let mut source_rate = track.codec_params.sample_rate.unwrap_or(SAMPLE_RATE);

    let mut mono: Vec<f32> = Vec::new();
    let mut sample_buf: Option<SampleBuffer<f32>> = None;
    let mut sample_buf_frames = 0;

    loop {
        let packet = match format.next_packet() {
            Ok(packet) => packet,
            // Symphonia reports the regular end of stream as UnexpectedEof
            Err(Error::IoError(e)) if e.kind() == std::io::ErrorKind::UnexpectedEof => break,
            Err(e) => return Err(e.into()),
        };

        if packet.track_id() != track_id {
            continue;
        }

        let audio_buf = match decoder.decode(&packet) {
            Ok(audio_buf) => audio_buf,
            Err(Error::DecodeError(e)) => {
                warn!("Skipping corrupt packet: {e}");
                continue;
            }
            Err(e) => return Err(e.into()),
        };

        let spec = *audio_buf.spec();
        source_rate = spec.rate;

        // Reallocate only when a packet no longer fits
        let frames = audio_buf.capacity() as u64;
        if sample_buf.is_none() || frames > sample_buf_frames {
            sample_buf = Some(SampleBuffer::<f32>::new(frames, spec));
            sample_buf_frames = frames;
        }

        if let Some(buf) = &mut sample_buf {
            buf.copy_interleaved_ref(audio_buf);
            downmix_into(buf.samples(), spec.channels.count(), &mut mono);
        }
    }

    let samples = resample(mono, source_rate)?;

    debug!(
        "Decoded {:.2} seconds of audio ({source_rate} Hz source)",
        samples.len() as f64 / SAMPLE_RATE as f64
    );

    Ok(PlaybackBuffer::from_samples(samples))
}

/// Average interleaved frames down to a single channel.
fn downmix_into(interleaved: &[f32], channels: usize, out: &mut Vec<f32>) {
    if channels <= 1 {
        out.extend_from_slice(interleaved);
        return;
    }

    out.extend(
        interleaved
            .chunks(channels)
            .map(|frame| frame.iter().sum::<f32>() / channels as f32),
    );
}

/// Resample mono audio from `from_rate` to the session rate.
fn resample(samples: Vec<f32>, from_rate: u32) -> Result<Vec<f32>> {
    if from_rate == SAMPLE_RATE || samples.is_empty() {
        return Ok(samples);
    }

    let mut resampler = FftFixedIn::<f32>::new(
        from_rate as usize,
        SAMPLE_RATE as usize,
        RESAMPLE_CHUNK,
        2, // sub-chunks
        1, // mono
    )
    .with_context(|| format!("Could not resample from {from_rate} Hz"))?;

    let expected = (samples.len() as u64 * SAMPLE_RATE as u64 / from_rate as u64) as usize;
    let delay = resampler.output_delay();
    let chunk_size = resampler.input_frames_max();

    let mut input = samples.chunks(chunk_size);
    let mut output = Vec::with_capacity(expected + delay + chunk_size);

    // Keep feeding silence after the input runs out until the delayed tail is flushed
    while output.len() < expected + delay {
        let mut frames = input.next().map(<[f32]>::to_vec).unwrap_or_default();
        frames.resize(chunk_size, 0.0);

        let waves_in = vec![frames];
        let resampled = resampler.process(&waves_in, None)?;
        output.extend_from_slice(&resampled[0]);
    }

    output.drain(..delay);
    output.truncate(expected);

    Ok(output)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_downmix_stereo_averages_frames() {
        let mut out = Vec::new();
        downmix_into(&[1.0, 0.0, 0.5, 0.5], 2, &mut out);
        assert_eq!(out, vec![0.5, 0.5]);
    }

    #[test]
    fn test_downmix_mono_is_copied() {
        let mut out = vec![0.25];
        downmix_into(&[0.1, 0.2], 1, &mut out);
        assert_eq!(out, vec![0.25, 0.1, 0.2]);
    }

    #[test]
    fn test_resample_at_session_rate_is_identity() {
        let samples = vec![0.1; 100];
        let out = resample(samples.clone(), SAMPLE_RATE).unwrap();
        assert_eq!(out, samples);
    }

    #[test]
    fn test_resample_scales_length() {
        let samples = vec![0.0; 24000]; // 1 second at 24 kHz
        let out = resample(samples, 24000).unwrap();
        assert_eq!(out.len(), SAMPLE_RATE as usize);
    }

    #[test]
    fn test_garbage_is_rejected() {
        let garbage = std::io::Cursor::new(vec![0x42u8; 4096]);
        assert!(open(Box::new(garbage)).is_err());
    }
}
