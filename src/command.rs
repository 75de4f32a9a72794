//! Console command surface for SoundBoxes.
//!
//! Input looks like `soundbox <subcommand> [args...]`; `sb` is accepted as a
//! short parent name and every subcommand has a one-letter alias.

use crate::emitter::EmitterId;
use itertools::Itertools;
use std::fmt;

pub const PARENT_COMMANDS: [&str; 2] = ["soundbox", "sb"];

pub const MSG_SUBCOMMANDS: &str = "Subcommands: play, stop, loop, restart, queue, destroy.";
pub const MSG_MISSING_ID: &str = "Please specify the SoundBox Id";
pub const MSG_BAD_ID: &str = "Couldn't parse the id";
pub const MSG_NOT_FOUND: &str = "SoundBox not found.";
pub const MSG_MISSING_PATH: &str = "Specify the audio file path.";
pub const MSG_FILE_NOT_FOUND: &str = "File not found!";

/// Outcome of a command, shown to whoever issued it.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CommandResponse {
    pub success: bool,
    pub message: String,
}

impl CommandResponse {
    pub fn ok(message: impl Into<String>) -> Self {
        Self {
            success: true,
            message: message.into(),
        }
    }

    pub fn fail(message: impl Into<String>) -> Self {
        Self {
            success: false,
            message: message.into(),
        }
    }
}

impl fmt::Display for CommandResponse {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SoundBoxCommand {
    /// Resume SoundBox `id` if it exists, otherwise play `path` in a new one
    Play { id: Option<EmitterId>, path: String },

    /// Pause a SoundBox
    Stop { id: EmitterId },

    /// Rewind and resume a SoundBox
    Restart { id: EmitterId },

    /// Toggle looping of a SoundBox
    Loop { id: EmitterId },

    /// Queue a file to play after the current one
    Queue { id: EmitterId, path: String },

    /// Destroy a SoundBox
    Destroy { id: EmitterId },
}

impl SoundBoxCommand {
    /// Parse a full console line. Returns `None` if the line is not a
    /// SoundBox command at all.
    pub fn parse_line(line: &str) -> Option<Result<Self, CommandResponse>> {
        let mut words = line.split_whitespace();
        let parent = words.next()?;

        if !PARENT_COMMANDS.contains(&parent.to_lowercase().as_str()) {
            return None;
        }

        let args: Vec<&str> = words.collect();
        Some(Self::parse(&args))
    }

    /// Parse the arguments that follow the parent command.
    pub fn parse(args: &[&str]) -> Result<Self, CommandResponse> {
        let Some((subcommand, args)) = args.split_first() else {
            return Err(CommandResponse::fail(MSG_SUBCOMMANDS));
        };

        match subcommand.to_lowercase().as_str() {
            "play" | "p" => {
                if args.is_empty() {
                    return Err(CommandResponse::fail(MSG_MISSING_PATH));
                }

                Ok(SoundBoxCommand::Play {
                    id: args[0].parse().ok(),
                    path: args.iter().join(" "),
                })
            }
            "stop" | "s" => Ok(SoundBoxCommand::Stop { id: parse_id(args)? }),
            "restart" | "r" => Ok(SoundBoxCommand::Restart { id: parse_id(args)? }),
            "loop" | "l" => Ok(SoundBoxCommand::Loop { id: parse_id(args)? }),
            "queue" | "q" => {
                let id = parse_id(args)?;
                let path = args[1..].iter().join(" ");

                if path.is_empty() {
                    return Err(CommandResponse::fail(MSG_MISSING_PATH));
                }

                Ok(SoundBoxCommand::Queue { id, path })
            }
            "destroy" | "d" => Ok(SoundBoxCommand::Destroy { id: parse_id(args)? }),
            _ => Err(CommandResponse::fail(MSG_SUBCOMMANDS)),
        }
    }
}

fn parse_id(args: &[&str]) -> Result<EmitterId, CommandResponse> {
    let arg = args
        .first()
        .ok_or_else(|| CommandResponse::fail(MSG_MISSING_ID))?;

    arg.parse().map_err(|_| CommandResponse::fail(MSG_BAD_ID))
}
