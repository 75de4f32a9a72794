//! Voice frames and the sink that fans them out to participants.

use crate::{
    event::{Event, EventBus},
    speaker::SpeakerIdentity,
};
use bytes::Bytes;
use serde::{Deserialize, Serialize};

/// Logical voice channel a frame is tagged with. The discriminants are the
/// values written on the wire.
#[derive(Clone, Copy, Debug, Default, Deserialize, Serialize, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum VoiceChannel {
    None = 0,
    Proximity = 1,
    Radio = 2,
    ScpChat = 3,
    Spectator = 4,
    RoundSummary = 5,
    Intercom = 6,
    #[default]
    Mimicry = 7,
    Lobby = 8,
}

impl VoiceChannel {
    pub fn as_u8(self) -> u8 {
        self as u8
    }
}

impl TryFrom<u8> for VoiceChannel {
    type Error = anyhow::Error;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        Ok(match value {
            0 => VoiceChannel::None,
            1 => VoiceChannel::Proximity,
            2 => VoiceChannel::Radio,
            3 => VoiceChannel::ScpChat,
            4 => VoiceChannel::Spectator,
            5 => VoiceChannel::RoundSummary,
            6 => VoiceChannel::Intercom,
            7 => VoiceChannel::Mimicry,
            8 => VoiceChannel::Lobby,
            _ => anyhow::bail!("Unknown voice channel {value}"),
        })
    }
}

/// One encoded frame attributed to a speaker.
#[derive(Clone, Debug, PartialEq)]
pub struct VoiceFrame {
    pub speaker: SpeakerIdentity,
    pub channel: VoiceChannel,
    pub payload: Bytes,
}

/// Delivers encoded frames to every connected participant. Fire-and-forget.
pub trait BroadcastSink: Send {
    fn broadcast(&self, speaker: SpeakerIdentity, channel: VoiceChannel, frame: &[u8]);
}

/// Publishes frames on the event bus, where each participant connection
/// holds its own subscription.
#[derive(Clone)]
pub struct BusSink {
    bus: EventBus,
}

impl BusSink {
    pub fn new(bus: &EventBus) -> Self {
        Self { bus: bus.clone() }
    }
}

impl BroadcastSink for BusSink {
    fn broadcast(&self, speaker: SpeakerIdentity, channel: VoiceChannel, frame: &[u8]) {
        self.bus.send(Event::Voice(VoiceFrame {
            speaker,
            channel,
            payload: Bytes::copy_from_slice(frame),
        }));
    }
}
