//! SoundBox: virtual sound emitters that stream decoded audio as voice
//! frames to every participant of a session.
//!
//! This module exposes internal types for integration testing.
//! The main binary is in main.rs.

#[macro_use]
extern crate log;

pub mod buffer;
pub mod codec;
pub mod command;
pub mod config;
pub mod constants;
pub mod emitter;
pub mod event;
pub mod net;
pub mod registry;
pub mod scheduler;
pub mod session;
pub mod sources;
pub mod speaker;
pub mod stdin;
pub mod voice;
