//! Speaker identities and the roster of synthetic speakers.

use crate::event::{Event, EventBus};
use std::{collections::HashMap, fmt};

/// Participant identity that outgoing frames are attributed to.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SpeakerIdentity(pub u32);

impl SpeakerIdentity {
    /// The server's own participant slot.
    pub const HOST: SpeakerIdentity = SpeakerIdentity(0);

    pub fn is_host(self) -> bool {
        self == Self::HOST
    }
}

impl fmt::Display for SpeakerIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

#[derive(Clone, Debug, PartialEq)]
pub enum SpeakerEvent {
    /// A synthetic speaker joined the session
    Joined { speaker: SpeakerIdentity, name: String },

    /// A synthetic speaker left the session
    Left { speaker: SpeakerIdentity },
}

/// Creates and tears down server-controlled participants.
pub trait SpeakerProvider: Send {
    fn create_speaker(&mut self, name: &str) -> SpeakerIdentity;
    fn destroy_speaker(&mut self, speaker: SpeakerIdentity);
}

/// Synthetic speakers currently present in the session. Identities start at
/// 1 since 0 belongs to the host, and are never handed out twice.
pub struct SpeakerRoster {
    bus: EventBus,
    next_id: u32,
    speakers: HashMap<SpeakerIdentity, String>,
}

impl SpeakerRoster {
    pub fn new(bus: &EventBus) -> Self {
        Self {
            bus: bus.clone(),
            next_id: 1,
            speakers: HashMap::new(),
        }
    }

    pub fn name(&self, speaker: SpeakerIdentity) -> Option<&str> {
        self.speakers.get(&speaker).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.speakers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.speakers.is_empty()
    }
}

impl SpeakerProvider for SpeakerRoster {
    fn create_speaker(&mut self, name: &str) -> SpeakerIdentity {
        let speaker = SpeakerIdentity(self.next_id);
        self.next_id += 1;
        self.speakers.insert(speaker, name.to_string());

        info!("Synthetic speaker {name} joined as {speaker}");
        self.bus.send(Event::Speaker(SpeakerEvent::Joined {
            speaker,
            name: name.to_string(),
        }));

        speaker
    }

    fn destroy_speaker(&mut self, speaker: SpeakerIdentity) {
        if speaker.is_host() {
            warn!("Refusing to remove the host speaker");
            return;
        }

        if let Some(name) = self.speakers.remove(&speaker) {
            info!("Synthetic speaker {name} ({speaker}) left");
            self.bus
                .send(Event::Speaker(SpeakerEvent::Left { speaker }));
        }
    }
}
