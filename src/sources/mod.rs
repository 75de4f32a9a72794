//! Decoded audio sources consumed by emitters.
//!
//! Every source yields mono `f32` samples at the session rate
//! ([`SAMPLE_RATE`](crate::constants::SAMPLE_RATE)) through a cursor that can
//! be rewound. Dropping a source closes it.

pub mod sine;
pub mod symphonia;

use anyhow::Result;
use std::path::Path;

/// A seekable stream of decoded samples.
pub trait DecodeSource: Send {
    /// Copy up to `buf.len()` samples into `buf`, advancing the cursor.
    ///
    /// Returns the number of samples written, which is less than `buf.len()`
    /// only when the source runs out.
    fn read_samples(&mut self, buf: &mut [f32]) -> usize;

    /// Cursor position in samples.
    fn position(&self) -> u64;

    /// Total length in samples.
    fn length(&self) -> u64;

    /// Rewind the cursor to the first sample.
    fn seek_to_start(&mut self);

    fn is_exhausted(&self) -> bool {
        self.position() >= self.length()
    }
}

/// Opens audio files for the session. Loads run on the blocking pool.
pub trait SourceLoader: Send + Sync {
    fn load(&self, path: &Path) -> Result<Box<dyn DecodeSource>>;
}

/// Loads files by decoding them fully with symphonia.
#[derive(Clone, Copy, Debug, Default)]
pub struct SymphoniaLoader;

impl SourceLoader for SymphoniaLoader {
    fn load(&self, path: &Path) -> Result<Box<dyn DecodeSource>> {
        let track = self::symphonia::open_file(path)?;
        Ok(Box::new(track))
    }
}
