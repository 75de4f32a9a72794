//! Table of live emitters, keyed by id.

use crate::{
    emitter::{Emitter, EmitterId},
    speaker::SpeakerProvider,
    voice::VoiceChannel,
};
use anyhow::{Context, Result};
use std::collections::HashMap;

/// Owns every emitter in the session. Ids come from a counter that only
/// moves forward, so an id never refers to two different emitters.
#[derive(Default)]
pub struct SoundBoxRegistry {
    emitters: HashMap<EmitterId, Emitter>,
    pub(crate) next_id: EmitterId,
    default_channel: VoiceChannel,
}

impl SoundBoxRegistry {
    pub fn new(default_channel: VoiceChannel) -> Self {
        Self {
            emitters: HashMap::new(),
            next_id: 0,
            default_channel,
        }
    }

    /// Create an emitter attached to the host speaker. Registering it is what
    /// makes the session run frames for it.
    ///
    /// Fails once every id has been handed out, since ids are never reused.
    pub fn create(&mut self, destroy_on_finish: bool) -> Result<&mut Emitter> {
        let id = self.next_id;
        self.next_id = self.next_id_after(id)?;

        info!("Created SoundBox {id}");

        let emitter = Emitter::new(id, self.default_channel, destroy_on_finish);
        Ok(self.emitters.entry(id).or_insert(emitter))
    }

    fn next_id_after(&self, id: EmitterId) -> Result<EmitterId> {
        id.checked_add(1).context("SoundBox ids exhausted")
    }

    /// Create an emitter that speaks through a fresh synthetic speaker, which
    /// is torn down together with the emitter.
    pub fn create_with_synthetic_speaker(
        &mut self,
        name: &str,
        speakers: &mut dyn SpeakerProvider,
    ) -> Result<&mut Emitter> {
        // Check first so a failed create doesn't leave an orphaned speaker
        self.next_id_after(self.next_id)?;

        let speaker = speakers.create_speaker(name);

        let emitter = self.create(true)?;
        emitter.speaker = speaker;
        emitter.destroy_speaker_on_finish = true;
        Ok(emitter)
    }

    pub fn get(&self, id: EmitterId) -> Option<&Emitter> {
        self.emitters.get(&id)
    }

    pub fn get_mut(&mut self, id: EmitterId) -> Option<&mut Emitter> {
        self.emitters.get_mut(&id)
    }

    pub fn contains(&self, id: EmitterId) -> bool {
        self.emitters.contains_key(&id)
    }

    /// Take an emitter out of the table. Removing a missing id is a no-op.
    pub fn remove(&mut self, id: EmitterId) -> Option<Emitter> {
        self.emitters.remove(&id)
    }

    /// Ids of all live emitters in creation order
    pub fn ids(&self) -> Vec<EmitterId> {
        let mut ids: Vec<_> = self.emitters.keys().copied().collect();
        ids.sort_unstable();
        ids
    }

    pub(crate) fn iter_mut(&mut self) -> impl Iterator<Item = &mut Emitter> {
        self.emitters.values_mut()
    }

    pub fn len(&self) -> usize {
        self.emitters.len()
    }

    pub fn is_empty(&self) -> bool {
        self.emitters.is_empty()
    }
}
