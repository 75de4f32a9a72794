use crate::{codec::EncoderKind, voice::VoiceChannel};
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;
use tokio::fs::read_to_string;

pub const CONFIG_FILE: &str = "Config.toml";

#[derive(Clone, Debug, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct ServerConfig {
    /// Address participants connect to for voice frames
    pub listen_addr: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            listen_addr: "127.0.0.1:7878".to_string(),
        }
    }
}

#[derive(Clone, Debug, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct SoundBoxConfig {
    /// Simulation frames per second
    pub tick_rate: u32,

    /// Channel new SoundBoxes broadcast on
    pub channel: VoiceChannel,

    /// Name given to synthetic speakers created by the `play` command
    pub speaker_name: String,

    pub encoder: EncoderKind,
}

impl Default for SoundBoxConfig {
    fn default() -> Self {
        Self {
            tick_rate: 60,
            channel: VoiceChannel::default(),
            speaker_name: "speaker".to_string(),
            encoder: EncoderKind::default(),
        }
    }
}

#[derive(Clone, Debug, Default, Deserialize, Serialize, PartialEq)]
pub struct Config {
    #[serde(flatten)]
    pub server: ServerConfig,

    #[serde(flatten)]
    pub soundbox: SoundBoxConfig,
}

pub fn parse(config: &str) -> Result<Config> {
    let config: Config = toml::from_str(config)?;

    if config.soundbox.tick_rate == 0 {
        anyhow::bail!("tick_rate must be at least 1");
    }

    Ok(config)
}

/// Read the config file at `path`, falling back to defaults when it does not
/// exist.
pub async fn load_from(path: &Path) -> Result<Config> {
    match read_to_string(path).await {
        Ok(config) => parse(&config).with_context(|| format!("Invalid {}", path.display())),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            info!("No {} found, using default config", path.display());
            Ok(Config::default())
        }
        Err(e) => Err(e).with_context(|| format!("Could not read {}", path.display())),
    }
}

pub async fn load() -> Result<Config> {
    load_from(Path::new(CONFIG_FILE)).await
}
