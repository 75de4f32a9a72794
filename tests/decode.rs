//! Integration tests for decoding audio files into sources.

mod common;

use common::*;
use soundbox::emitter::Emitter;
use soundbox::registry::SoundBoxRegistry;
use soundbox::sources::{symphonia as decoder, SymphoniaLoader};
use std::io::Cursor;
use tokio_test::assert_ok;

#[test]
fn test_wav_at_session_rate() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("tone.wav");
    write_sine_wav(&path, 48000, 1, 9600);

    let mut source = SymphoniaLoader.load(&path).unwrap();

    assert_eq!(source.length(), 9600);
    assert_eq!(source.position(), 0);

    let mut chunk = [0.0f32; CHUNK_SAMPLES];
    assert_eq!(source.read_samples(&mut chunk), CHUNK_SAMPLES);
    assert!(chunk.iter().any(|&s| s.abs() > 0.1));
    assert!(chunk.iter().all(|&s| s.abs() <= 0.51));
}

#[test]
fn test_wav_is_resampled() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("tone.wav");
    write_sine_wav(&path, 24000, 1, 24000);

    let source = decoder::open_file(&path).unwrap();

    assert_eq!(source.length(), SAMPLE_RATE as u64);
}

#[test]
fn test_stereo_wav_is_downmixed() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("tone.wav");
    write_sine_wav(&path, 48000, 2, 4800);

    let source = decoder::open_file(&path).unwrap();

    assert_eq!(source.length(), 4800);
}

#[test]
fn test_missing_file() {
    let result = SymphoniaLoader.load(std::path::Path::new("/no/such/file.wav"));
    assert!(result.is_err());
}

#[test]
fn test_garbage_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("garbage.ogg");
    std::fs::write(&path, vec![0x42u8; 4096]).unwrap();

    assert!(SymphoniaLoader.load(&path).is_err());
}

fn wav_bytes(frames: u32) -> Vec<u8> {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("tone.wav");
    write_sine_wav(&path, 48000, 1, frames);
    std::fs::read(path).unwrap()
}

fn idle_emitter(registry: &mut SoundBoxRegistry) -> &mut Emitter {
    registry.create(false).unwrap()
}

#[test]
fn test_play_stream() {
    let mut registry = SoundBoxRegistry::default();
    let emitter = idle_emitter(&mut registry);

    assert_ok!(emitter.play_stream(Box::new(Cursor::new(wav_bytes(960)))));

    assert_eq!(emitter.state(), EmitterState::Playing);
    assert_eq!(emitter.length(), Some(960));
}

/// A stream that fails to decode leaves the SoundBox untouched.
#[test]
fn test_play_stream_invalid() {
    let mut registry = SoundBoxRegistry::default();
    let emitter = idle_emitter(&mut registry);

    let result = emitter.play_stream(Box::new(Cursor::new(vec![0u8; 64])));

    assert!(result.is_err());
    assert_eq!(emitter.state(), EmitterState::Idle);
    assert!(!emitter.has_source());
}

#[test]
fn test_enqueue_stream() {
    let mut registry = SoundBoxRegistry::default();
    let emitter = idle_emitter(&mut registry);

    assert_ok!(emitter.enqueue_stream(Box::new(Cursor::new(wav_bytes(480)))));
    assert!(emitter
        .enqueue_stream(Box::new(Cursor::new(vec![0u8; 64])))
        .is_err());

    assert_eq!(emitter.queue_len(), 1);
    assert_eq!(emitter.state(), EmitterState::Idle);
}
