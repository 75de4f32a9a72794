//! The session owns every SoundBox and drives them from the frame loop.
//!
//! All emitter state lives inside one [`Session`] that a single task owns.
//! That task alternates between simulation frames and console commands, so
//! emitters are never touched concurrently and need no locking. Files are
//! decoded on the blocking pool and handed back to the task when ready, so a
//! long decode never holds up frames.

use crate::{
    codec::{self, FrameEncoder},
    command::{
        CommandResponse, SoundBoxCommand, MSG_FILE_NOT_FOUND, MSG_NOT_FOUND,
    },
    config::SoundBoxConfig,
    emitter::{Emitter, EmitterId},
    event::EventBus,
    registry::SoundBoxRegistry,
    scheduler::{run_frame, FrameOutcome},
    sources::{DecodeSource, SourceLoader, SymphoniaLoader},
    speaker::{SpeakerProvider, SpeakerRoster},
    voice::{BroadcastSink, BusSink},
};
use anyhow::{anyhow, Context, Result};
use std::{
    path::{Path, PathBuf},
    sync::Arc,
    time::{Duration, Instant},
};
use tokio::{
    sync::{mpsc, oneshot},
    task::JoinHandle,
    time::MissedTickBehavior,
};

const REQUEST_QUEUE_SIZE: usize = 32;

pub struct Session {
    pub registry: SoundBoxRegistry,
    encoder: Box<dyn FrameEncoder>,
    sink: Box<dyn BroadcastSink>,
    speakers: Box<dyn SpeakerProvider>,
    loader: Arc<dyn SourceLoader>,
    speaker_name: String,
}

impl Session {
    pub fn new(
        config: &SoundBoxConfig,
        encoder: Box<dyn FrameEncoder>,
        sink: Box<dyn BroadcastSink>,
        speakers: Box<dyn SpeakerProvider>,
        loader: Arc<dyn SourceLoader>,
    ) -> Self {
        Self {
            registry: SoundBoxRegistry::new(config.channel),
            encoder,
            sink,
            speakers,
            loader,
            speaker_name: config.speaker_name.clone(),
        }
    }

    /// Session wired to the event bus, the configured encoder and symphonia.
    pub fn from_config(config: &SoundBoxConfig, bus: &EventBus) -> Result<Self> {
        let encoder = codec::create(config.encoder).context("Could not create frame encoder")?;

        Ok(Self::new(
            config,
            encoder,
            Box::new(BusSink::new(bus)),
            Box::new(SpeakerRoster::new(bus)),
            Arc::new(SymphoniaLoader),
        ))
    }

    /// Create a SoundBox with its own synthetic speaker.
    pub fn create_with_synthetic_speaker(&mut self, name: &str) -> Result<&mut Emitter> {
        self.registry
            .create_with_synthetic_speaker(name, self.speakers.as_mut())
    }

    /// Run one simulation frame for every SoundBox.
    pub fn tick(&mut self, delta: Duration) {
        let mut finished = Vec::new();

        for emitter in self.registry.iter_mut() {
            let outcome = run_frame(emitter, delta, self.encoder.as_mut(), self.sink.as_ref());

            if outcome == FrameOutcome::Finished {
                finished.push(emitter.id());
            }
        }

        for id in finished {
            info!("SoundBox {id} finished playing");
            self.destroy(id);
        }
    }

    /// Destroy a SoundBox: drop its sources, stop scheduling it and remove
    /// its synthetic speaker if it owns one. Returns `false` if it was
    /// already gone.
    pub fn destroy(&mut self, id: EmitterId) -> bool {
        let Some(mut emitter) = self.registry.remove(id) else {
            return false;
        };

        emitter.dispose();

        if emitter.destroy_speaker_on_finish && !emitter.speaker.is_host() {
            self.speakers.destroy_speaker(emitter.speaker);
        }

        info!("Destroyed SoundBox {id}");
        true
    }

    /// Run a command to completion, loading any file on the calling thread.
    pub fn execute(&mut self, command: SoundBoxCommand) -> CommandResponse {
        match self.begin(command) {
            Step::Done(response) => response,
            Step::Load(load) => {
                let result = self.loader.load(&load.path);
                self.finish(load, result)
            }
        }
    }

    /// First half of a command: everything that doesn't need the file
    /// decoded.
    fn begin(&mut self, command: SoundBoxCommand) -> Step {
        debug!("Executing {command:?}");

        let response = match command {
            SoundBoxCommand::Play { id: Some(id), .. } if self.registry.contains(id) => {
                self.with_emitter(id, |emitter| {
                    emitter.resume();
                    "Resumed the SoundBox."
                })
            }
            SoundBoxCommand::Play { path, .. } => return Self::load(path, LoadTarget::NewSoundBox),
            SoundBoxCommand::Stop { id } => self.with_emitter(id, |emitter| {
                emitter.stop();
                "Stopped the SoundBox."
            }),
            SoundBoxCommand::Restart { id } => self.with_emitter(id, |emitter| {
                emitter.restart();
                "Restarted the SoundBox."
            }),
            SoundBoxCommand::Loop { id } => self.with_emitter(id, |emitter| {
                emitter.toggle_loop();
                "Toggled loops in the SoundBox."
            }),
            SoundBoxCommand::Queue { id, path } => {
                if !self.registry.contains(id) {
                    return Step::Done(CommandResponse::fail(MSG_NOT_FOUND));
                }
                return Self::load(path, LoadTarget::Queue(id));
            }
            SoundBoxCommand::Destroy { id } => {
                if self.destroy(id) {
                    CommandResponse::ok("Destroyed the SoundBox.")
                } else {
                    CommandResponse::fail(MSG_NOT_FOUND)
                }
            }
        };

        Step::Done(response)
    }

    fn load(path: String, target: LoadTarget) -> Step {
        let path = PathBuf::from(path);

        if !path.is_file() {
            return Step::Done(CommandResponse::fail(MSG_FILE_NOT_FOUND));
        }

        Step::Load(PendingLoad { path, target })
    }

    /// Second half of a command, once its file has been decoded.
    fn finish(
        &mut self,
        load: PendingLoad,
        result: Result<Box<dyn DecodeSource>>,
    ) -> CommandResponse {
        let PendingLoad { path, target } = load;

        match target {
            LoadTarget::NewSoundBox => self.play_source(&path, result),
            LoadTarget::Queue(id) => self.queue_source(id, &path, result),
        }
    }

    fn with_emitter<F>(&mut self, id: EmitterId, f: F) -> CommandResponse
    where
        F: FnOnce(&mut Emitter) -> &'static str,
    {
        match self.registry.get_mut(id) {
            Some(emitter) => CommandResponse::ok(f(emitter)),
            None => CommandResponse::fail(MSG_NOT_FOUND),
        }
    }

    fn play_source(
        &mut self,
        path: &Path,
        result: Result<Box<dyn DecodeSource>>,
    ) -> CommandResponse {
        let source = match result {
            Ok(source) => source,
            Err(e) => {
                error!("There was an error while trying to play {}: {e:?}", path.display());
                return CommandResponse::fail(format!("Couldn't play the file: {e}"));
            }
        };

        let emitter = match self
            .registry
            .create_with_synthetic_speaker(&self.speaker_name, self.speakers.as_mut())
        {
            Ok(emitter) => emitter,
            Err(e) => {
                error!("Could not create a SoundBox for {}: {e:?}", path.display());
                return CommandResponse::fail(format!("Couldn't play the file: {e}"));
            }
        };
        emitter.play(source);

        CommandResponse::ok(format!("Created a SoundBox with the id: {}", emitter.id()))
    }

    fn queue_source(
        &mut self,
        id: EmitterId,
        path: &Path,
        result: Result<Box<dyn DecodeSource>>,
    ) -> CommandResponse {
        match result {
            // The SoundBox may have been destroyed while the file was decoding
            Ok(source) => self.with_emitter(id, |emitter| {
                emitter.enqueue(source);
                "Queued the file in the SoundBox."
            }),
            Err(e) => {
                error!("There was an error while trying to enqueue {}: {e:?}", path.display());
                CommandResponse::fail(format!("Couldn't queue the file: {e}"))
            }
        }
    }
}

enum Step {
    Done(CommandResponse),
    Load(PendingLoad),
}

/// A command waiting for its file to be decoded.
struct PendingLoad {
    path: PathBuf,
    target: LoadTarget,
}

enum LoadTarget {
    NewSoundBox,
    Queue(EmitterId),
}

/// A decoded file on its way back to the session task.
struct LoadedFile {
    load: PendingLoad,
    result: Result<Box<dyn DecodeSource>>,
    reply: oneshot::Sender<CommandResponse>,
}

pub enum SessionRequest {
    Command {
        command: SoundBoxCommand,
        reply: oneshot::Sender<CommandResponse>,
    },
}

/// Sends commands to a running session.
#[derive(Clone)]
pub struct SessionHandle {
    tx: mpsc::Sender<SessionRequest>,
}

impl SessionHandle {
    pub async fn execute(&self, command: SoundBoxCommand) -> Result<CommandResponse> {
        let (reply, rx) = oneshot::channel();

        self.tx
            .send(SessionRequest::Command { command, reply })
            .await
            .map_err(|_| anyhow!("Session is no longer running"))?;

        rx.await.context("Session dropped the command")
    }
}

/// Start the frame loop for `session` at `tick_rate` frames per second.
pub fn spawn(session: Session, tick_rate: u32) -> (SessionHandle, JoinHandle<()>) {
    let (tx, rx) = mpsc::channel(REQUEST_QUEUE_SIZE);
    let task = tokio::spawn(run(session, tick_rate, rx));

    (SessionHandle { tx }, task)
}

async fn run(mut session: Session, tick_rate: u32, mut requests: mpsc::Receiver<SessionRequest>) {
    let period = Duration::from_secs_f64(1.0 / tick_rate.max(1) as f64);
    let mut interval = tokio::time::interval(period);
    interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

    // Files decode on the blocking pool and come back here
    let (loaded_tx, mut loaded_rx) = mpsc::unbounded_channel::<LoadedFile>();

    let mut last_frame = Instant::now();
    let mut accepting_requests = true;

    info!("Frame loop running at {tick_rate} frames per second");

    loop {
        tokio::select! {
            _ = interval.tick() => {
                // Real elapsed time, so late frames still play the right amount of audio
                let now = Instant::now();
                session.tick(now - last_frame);
                last_frame = now;
            }
            Some(LoadedFile { load, result, reply }) = loaded_rx.recv() => {
                send_reply(reply, session.finish(load, result));
            }
            request = requests.recv(), if accepting_requests => match request {
                Some(SessionRequest::Command { command, reply }) => match session.begin(command) {
                    Step::Done(response) => send_reply(reply, response),
                    Step::Load(load) => spawn_load(&session.loader, load, reply, &loaded_tx),
                },
                None => {
                    debug!("All session handles dropped, frames keep running");
                    accepting_requests = false;
                }
            },
        }
    }
}

fn spawn_load(
    loader: &Arc<dyn SourceLoader>,
    load: PendingLoad,
    reply: oneshot::Sender<CommandResponse>,
    loaded_tx: &mpsc::UnboundedSender<LoadedFile>,
) {
    let loader = loader.clone();
    let loaded_tx = loaded_tx.clone();

    tokio::spawn(async move {
        let path = load.path.clone();
        let result = match tokio::task::spawn_blocking(move || loader.load(&path)).await {
            Ok(result) => result,
            Err(e) => Err(anyhow!("Decoding task failed: {e}")),
        };

        if loaded_tx.send(LoadedFile { load, result, reply }).is_err() {
            debug!("Session stopped before the file finished loading");
        }
    });
}

fn send_reply(reply: oneshot::Sender<CommandResponse>, response: CommandResponse) {
    if reply.send(response).is_err() {
        debug!("Command issuer went away before the response");
    }
}
