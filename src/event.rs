use crate::{speaker::SpeakerEvent, voice::VoiceFrame};
use tokio::sync::broadcast::error::{RecvError, TryRecvError};
use tokio::sync::broadcast::{self, Receiver, Sender};

/// Enough room for a few frames of every emitter before a slow participant lags.
const BUS_CAPACITY: usize = 1024;

#[derive(Clone)]
pub struct EventBus {
    tx: Sender<Event>,
}

impl EventBus {
    pub fn new() -> Self {
        let (tx, _rx) = broadcast::channel::<Event>(BUS_CAPACITY);
        Self { tx }
    }

    /// Publishes an event to every subscriber. Having no subscribers is the
    /// normal state of a session without connected participants.
    pub fn send(&self, event: Event) {
        if let Err(e) = self.tx.send(event) {
            trace!("No subscribers for event: {:?}", e.0);
        }
    }

    pub fn subscribe(&self) -> Subscriber {
        Subscriber::new(self.tx.subscribe())
    }

    pub fn subscriber_count(&self) -> usize {
        self.tx.receiver_count()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}

pub struct Subscriber {
    rx: Receiver<Event>,
}

impl Subscriber {
    pub fn new(rx: Receiver<Event>) -> Self {
        Self { rx }
    }

    pub fn try_recv(&mut self) -> Result<Event, TryRecvError> {
        self.rx.try_recv()
    }

    /// Waits for the next event. Returns `None` once every sender is gone.
    pub async fn recv(&mut self) -> Option<Event> {
        loop {
            match self.rx.recv().await {
                Ok(event) => break Some(event),
                Err(RecvError::Closed) => break None,
                Err(RecvError::Lagged(skipped)) => {
                    warn!("EventBus::Subscriber lagging behind senders, skipping {skipped} events");
                }
            }
        }
    }
}

#[derive(Clone, Debug)]
pub enum Event {
    Voice(VoiceFrame),
    Speaker(SpeakerEvent),
}
