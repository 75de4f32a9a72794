//! Admin console: reads `soundbox ...` commands from stdin.

use crate::{
    command::{CommandResponse, SoundBoxCommand},
    session::SessionHandle,
};
use tokio::io::{AsyncBufReadExt, BufReader};

pub fn init(session: SessionHandle) {
    tokio::spawn(async move {
        let mut lines = BufReader::new(tokio::io::stdin()).lines();

        loop {
            let line = match lines.next_line().await {
                Ok(Some(line)) => line,
                Ok(None) => {
                    info!("stdin closed, console disabled");
                    break;
                }
                Err(e) => {
                    error!("Error while reading stdin: {e:?}");
                    break;
                }
            };

            if line.trim().is_empty() {
                continue;
            }

            if let Some(response) = handle_line(&session, &line).await {
                report(&response);
            }
        }
    });
}

/// Run one console line against the session. Lines that aren't SoundBox
/// commands produce no response.
pub async fn handle_line(session: &SessionHandle, line: &str) -> Option<CommandResponse> {
    let command = match SoundBoxCommand::parse_line(line) {
        Some(Ok(command)) => command,
        Some(Err(response)) => return Some(response),
        None => {
            warn!("Unknown command: {}", line.trim());
            return None;
        }
    };

    match session.execute(command).await {
        Ok(response) => Some(response),
        Err(e) => {
            error!("Error while executing command: {e:?}");
            Some(CommandResponse::fail(e.to_string()))
        }
    }
}

fn report(response: &CommandResponse) {
    if response.success {
        println!("{response}");
    } else {
        eprintln!("{response}");
    }
}
