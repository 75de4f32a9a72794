#[macro_use]
extern crate log;

use anyhow::Result;
use soundbox::{config, event::EventBus, net, session, stdin};

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    pretty_env_logger::init();

    let config = config::load().await?;
    let bus = EventBus::new();

    net::init(&bus, &config.server).await?;

    let session = session::Session::from_config(&config.soundbox, &bus)?;
    let (handle, frame_loop) = session::spawn(session, config.soundbox.tick_rate);

    stdin::init(handle);

    tokio::select! {
        result = tokio::signal::ctrl_c() => result?,
        result = frame_loop => {
            if let Err(e) = result {
                error!("Frame loop stopped unexpectedly: {e:?}");
            }
        }
    }

    info!("Shutting down");

    Ok(())
}
