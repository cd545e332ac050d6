//! Length-prefixed framing around the raw codec.
//!
//! ```text
//! [0..4)    u32 little-endian value count N
//! [4..end)  Chimp payload for N values: end marker, a zero bit, byte padding
//! ```
//!
//! Framed streams always use a window of [`WINDOW_SIZE`] values. Values are
//! read from and written to byte buffers as little-endian 64-bit words.

use tracing::{debug, warn};

use crate::bitbuffer::BufferFull;
use crate::compressor::Compressor;
use crate::decompressor::Decompressor;
use crate::error::FrameError;
use crate::window::WindowSize;

/// Window size of every framed stream.
pub const WINDOW_SIZE: usize = 128;

/// Size of the value-count header.
pub const HEADER_LEN: usize = 4;

/// Longest encoding of one value after the first: 5-bit bucket flag plus 64
/// bits.
const MAX_VALUE_BITS: usize = 69;

/// Worst-case framed size, in bytes, of `count` values.
///
/// A destination of this size never fails with
/// [`FrameError::BufferTooSmall`]. The bit count saturates for counts no
/// buffer could hold.
pub fn compressed_bound(count: usize) -> usize {
    // First value raw, every later value and the end marker at most
    // MAX_VALUE_BITS, then the terminating zero bit.
    let bits = MAX_VALUE_BITS.saturating_mul(count).saturating_add(65);
    HEADER_LEN.saturating_add(bits.div_ceil(8))
}

/// Compresses `source`, a sequence of little-endian 64-bit values, into
/// `dest`. Returns the number of bytes written.
///
/// # Errors
/// - [`FrameError::UnalignedBuffer`] if `source.len()` is not a multiple of 8.
/// - [`FrameError::BufferTooSmall`] if `dest` cannot hold the header and payload.
pub fn compress(source: &[u8], dest: &mut [u8]) -> Result<usize, FrameError> {
    if source.len() % 8 != 0 {
        return Err(FrameError::UnalignedBuffer { len: source.len() });
    }
    let count = source.len() / 8;
    let values = source.chunks_exact(8).map(|chunk| {
        let mut word = [0u8; 8];
        word.copy_from_slice(chunk);
        u64::from_le_bytes(word)
    });
    compress_words(values, count, dest)
}

/// Decompresses a framed stream into `dest` as little-endian 64-bit values.
/// Returns the number of bytes written (`N * 8`).
///
/// # Errors
/// - [`FrameError::MissingHeader`] if `source` is shorter than the header.
/// - [`FrameError::BufferOverflow`] if `dest` cannot hold `N * 8` bytes.
/// - [`FrameError::Truncated`] if the end marker appears before `N` values,
///   which happens when the data contained the marker's bit pattern.
/// - [`FrameError::Decode`] if the payload is malformed.
pub fn decompress(source: &[u8], dest: &mut [u8]) -> Result<usize, FrameError> {
    let (count, payload) = split_header(source)?;
    let required = count.checked_mul(8).unwrap_or(usize::MAX);
    if required > dest.len() {
        return Err(FrameError::BufferOverflow {
            required,
            available: dest.len(),
        });
    }

    let mut decompressor = Decompressor::new(payload, WindowSize::DEFAULT, count);
    let mut decoded = 0;
    for (slot, value) in dest[..required].chunks_exact_mut(8).zip(&mut decompressor) {
        slot.copy_from_slice(&value?.to_bits().to_le_bytes());
        decoded += 1;
    }
    check_count(count, decoded)?;

    debug!(
        values = count,
        compressed = source.len(),
        decompressed = required,
        "decompressed chimp frame"
    );
    Ok(required)
}

/// Compresses `values` into a newly allocated framed buffer.
pub fn encode_values(values: &[f64]) -> Result<Vec<u8>, FrameError> {
    let mut out = vec![0u8; compressed_bound(values.len())];
    let len = compress_words(values.iter().map(|v| v.to_bits()), values.len(), &mut out)?;
    out.truncate(len);
    Ok(out)
}

/// Decompresses a framed buffer into a vector of doubles.
pub fn decode_values(source: &[u8]) -> Result<Vec<f64>, FrameError> {
    let (count, payload) = split_header(source)?;
    let values = Decompressor::new(payload, WindowSize::DEFAULT, count).values()?;
    check_count(count, values.len())?;
    Ok(values)
}

fn compress_words<I>(values: I, count: usize, dest: &mut [u8]) -> Result<usize, FrameError>
where
    I: Iterator<Item = u64>,
{
    let header = u32::try_from(count).map_err(|_| FrameError::TooManyValues { count })?;
    if dest.len() < HEADER_LEN {
        return Err(FrameError::BufferTooSmall {
            required: HEADER_LEN,
            available: dest.len(),
        });
    }

    // Sized to the worst case: the limit is never reached.
    let bound = compressed_bound(count);
    let available = dest.len();
    let too_small = |_: BufferFull| FrameError::BufferTooSmall {
        required: bound,
        available,
    };
    let mut compressor = Compressor::with_limit(WindowSize::DEFAULT, bound - HEADER_LEN);
    for value in values {
        compressor.add_value(value).map_err(too_small)?;
    }
    compressor.close().map_err(too_small)?;

    let payload = compressor.output();
    let required = HEADER_LEN + payload.len();
    if required > available {
        return Err(FrameError::BufferTooSmall {
            required,
            available,
        });
    }
    dest[..HEADER_LEN].copy_from_slice(&header.to_le_bytes());
    dest[HEADER_LEN..required].copy_from_slice(payload);

    debug!(values = count, compressed = required, "compressed chimp frame");
    Ok(required)
}

fn split_header(source: &[u8]) -> Result<(usize, &[u8]), FrameError> {
    if source.len() < HEADER_LEN {
        return Err(FrameError::MissingHeader { len: source.len() });
    }
    let (header, payload) = source.split_at(HEADER_LEN);
    let mut word = [0u8; HEADER_LEN];
    word.copy_from_slice(header);
    Ok((u32::from_le_bytes(word) as usize, payload))
}

fn check_count(expected: usize, decoded: usize) -> Result<(), FrameError> {
    if decoded < expected {
        warn!(expected, decoded, "chimp stream ended before its declared count");
        return Err(FrameError::Truncated { expected, decoded });
    }
    Ok(())
}
