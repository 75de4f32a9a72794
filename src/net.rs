//! Participant server: every connected client receives all voice frames and
//! speaker roster changes published on the event bus.
//!
//! Wire format, all integers little endian:
//!
//! ```text
//! header:         "SBOX" | sample_rate u32 | channels u8
//! voice:          0x01 | speaker u32 | channel u8 | len u16 | payload
//! speaker joined: 0x02 | speaker u32 | name_len u16 | name (utf-8)
//! speaker left:   0x03 | speaker u32
//! ```

use crate::{
    config::ServerConfig,
    constants::{CHANNELS, SAMPLE_RATE},
    event::{Event, EventBus},
    speaker::{SpeakerEvent, SpeakerIdentity},
    voice::{VoiceChannel, VoiceFrame},
};
use anyhow::{anyhow, bail, Context, Result};
use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};
use bytes::Bytes;
use std::io::Read;
use std::net::SocketAddr;
use tokio::net::TcpListener;

pub const MAGIC: &[u8; 4] = b"SBOX";
pub const HEADER_LEN: usize = 9;

const TAG_VOICE: u8 = 0x01;
const TAG_SPEAKER_JOINED: u8 = 0x02;
const TAG_SPEAKER_LEFT: u8 = 0x03;

/// Bind the participant listener and start accepting connections.
pub async fn init(bus: &EventBus, config: &ServerConfig) -> Result<SocketAddr> {
    let listener = TcpListener::bind(&config.listen_addr)
        .await
        .with_context(|| format!("Could not listen on {}", config.listen_addr))?;
    let local_addr = listener.local_addr()?;

    info!("Listening for participants on {local_addr}");

    let bus = bus.clone();
    tokio::spawn(async move {
        loop {
            match accept(&listener, &bus).await {
                Ok(addr) => info!("Participant connected from {addr}"),
                Err(e) => error!("Failed to accept participant: {e}"),
            }
        }
    });

    Ok(local_addr)
}

async fn accept(listener: &TcpListener, bus: &EventBus) -> Result<SocketAddr> {
    use tokio::io::AsyncWriteExt;

    let (mut stream, addr) = listener.accept().await?;

    // Subscribe before spawning so no frame published meanwhile is missed
    let mut subscriber = bus.subscribe();

    tokio::spawn(async move {
        if let Err(e) = stream.write_all(&header()).await {
            warn!("Failed to write header to {addr}: {e}");
            return;
        }

        while let Some(event) = subscriber.recv().await {
            let record = match encode_event(&event) {
                Ok(record) => record,
                Err(e) => {
                    warn!("Dropping event for {addr}: {e}");
                    continue;
                }
            };

            if let Err(e) = stream.write_all(&record).await {
                info!("Participant {addr} disconnected: {e}");
                break;
            }
        }
    });

    Ok(addr)
}

pub fn header() -> Vec<u8> {
    let mut header = Vec::with_capacity(HEADER_LEN);
    header.extend_from_slice(MAGIC);
    header.extend_from_slice(&SAMPLE_RATE.to_le_bytes());
    header.push(CHANNELS as u8);
    header
}

pub fn encode_event(event: &Event) -> Result<Vec<u8>> {
    let mut record = Vec::new();

    match event {
        Event::Voice(frame) => {
            let len = u16::try_from(frame.payload.len()).context("Voice frame too large")?;

            record.write_u8(TAG_VOICE)?;
            record.write_u32::<LittleEndian>(frame.speaker.0)?;
            record.write_u8(frame.channel.as_u8())?;
            record.write_u16::<LittleEndian>(len)?;
            record.extend_from_slice(&frame.payload);
        }
        Event::Speaker(SpeakerEvent::Joined { speaker, name }) => {
            let len = u16::try_from(name.len()).context("Speaker name too long")?;

            record.write_u8(TAG_SPEAKER_JOINED)?;
            record.write_u32::<LittleEndian>(speaker.0)?;
            record.write_u16::<LittleEndian>(len)?;
            record.extend_from_slice(name.as_bytes());
        }
        Event::Speaker(SpeakerEvent::Left { speaker }) => {
            record.write_u8(TAG_SPEAKER_LEFT)?;
            record.write_u32::<LittleEndian>(speaker.0)?;
        }
    }

    Ok(record)
}

/// Parse the connection header, returning sample rate and channel count.
pub fn decode_header<R: Read>(reader: &mut R) -> Result<(u32, u8)> {
    let mut magic = [0u8; 4];
    reader.read_exact(&mut magic)?;

    if &magic != MAGIC {
        bail!("Not a SoundBox stream");
    }

    Ok((
        reader.read_u32::<LittleEndian>()?,
        reader.read_u8()?,
    ))
}

/// Parse one record as written by [`encode_event`].
pub fn decode_event<R: Read>(reader: &mut R) -> Result<Event> {
    let tag = reader.read_u8()?;
    let speaker = SpeakerIdentity(reader.read_u32::<LittleEndian>()?);

    match tag {
        TAG_VOICE => {
            let channel = VoiceChannel::try_from(reader.read_u8()?)?;
            let len = reader.read_u16::<LittleEndian>()? as usize;
            let mut payload = vec![0u8; len];
            reader.read_exact(&mut payload)?;

            Ok(Event::Voice(VoiceFrame {
                speaker,
                channel,
                payload: Bytes::from(payload),
            }))
        }
        TAG_SPEAKER_JOINED => {
            let len = reader.read_u16::<LittleEndian>()? as usize;
            let mut name = vec![0u8; len];
            reader.read_exact(&mut name)?;

            Ok(Event::Speaker(SpeakerEvent::Joined {
                speaker,
                name: String::from_utf8(name).context("Speaker name is not utf-8")?,
            }))
        }
        TAG_SPEAKER_LEFT => Ok(Event::Speaker(SpeakerEvent::Left { speaker })),
        tag => Err(anyhow!("Unknown record tag {tag:#04x}")),
    }
}
