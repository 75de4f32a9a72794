// Voice session audio parameters
pub const SAMPLE_RATE: u32 = 48000; // 48 kHz session rate
pub const CHANNELS: u16 = 1; // Voice slots are mono

/// Samples per encoded frame. The voice codec rejects anything smaller.
pub const CHUNK_SAMPLES: usize = 480;

/// Upper bound for a single encoded voice frame.
pub const MAX_FRAME_BYTES: usize = 512;

/// Samples due per second of wall-clock time.
pub const SAMPLES_PER_SECOND: u64 = SAMPLE_RATE as u64 * CHANNELS as u64;
