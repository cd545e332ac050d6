use tracing::debug;

use crate::bitbuffer::{BitWriter, BufferFull};
use crate::window::{WindowSize, LEADING_REPRESENTATION, LEADING_ROUND, SENTINEL};

/// `storedLeadingZeros` value meaning "no bucket to reuse".
const LEADING_ZEROS_UNSET: u32 = 65;

/// Counters of the encoding chosen for each value after the first.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CompressorStats {
    /// Exact repeats of a value in the window (flag `0`).
    pub repeats: u64,
    /// Indexed deltas against a distant value with a long run of equal low
    /// bits (flag `1`).
    pub indexed: u64,
    /// Deltas reusing the previous leading-zero bucket (flag `2`).
    pub same_bucket: u64,
    /// Deltas announcing a new leading-zero bucket (flag `3`).
    pub new_bucket: u64,
}

/// The Chimp128 compressor.
///
/// Values are XORed against a reference from a window of the last `W` values:
/// normally the previous value, or an older one whose low bits match, found
/// through a direct-mapped index table keyed by those low bits. Each value
/// after the first is written in one of four forms:
///
/// | flag | form                                                              |
/// |------|-------------------------------------------------------------------|
/// | `00` | window index of an identical value                                |
/// | `01` | window index, leading-zero bucket, significant bits, the bits     |
/// | `10` | XOR without its leading zeros, bucket reused from the last `11`   |
/// | `11` | leading-zero bucket, XOR without its leading zeros                |
///
/// # Example
/// ```
/// use chimp::{Compressor, WindowSize};
///
/// let mut compressor = Compressor::new(WindowSize::default());
/// for v in [20.5, 20.5, 20.75, 21.0] {
///     compressor.add_f64(v).unwrap();
/// }
/// compressor.close().unwrap();
///
/// let block = compressor.into_compressed();
/// assert_eq!(block.count, 4);
/// ```
pub struct Compressor {
    out: BitWriter,
    window: WindowSize,
    /// Circular buffer of the last `W` values.
    stored_values: Vec<u64>,
    /// Most recent global position of a value, keyed by its masked low bits.
    indices: Vec<u64>,
    /// Global position of the newest value.
    index: u64,
    /// Slot of the newest value in `stored_values`.
    current: usize,
    stored_leading_zeros: u32,
    first: bool,
    closed: bool,
    count: u64,
    stats: CompressorStats,
}

impl Compressor {
    /// Creates a compressor whose output grows as needed.
    pub fn new(window: WindowSize) -> Self {
        Self::with_writer(window, BitWriter::with_capacity(128))
    }

    /// Creates a compressor whose output will not grow beyond `max_bytes`
    /// bytes. Once the limit is reached, writes return `Err(BufferFull)`.
    pub fn with_limit(window: WindowSize, max_bytes: usize) -> Self {
        Self::with_writer(window, BitWriter::with_limit(max_bytes))
    }

    fn with_writer(window: WindowSize, out: BitWriter) -> Self {
        Self {
            out,
            window,
            stored_values: vec![0; window.get()],
            indices: vec![0; window.index_table_len()],
            index: 0,
            current: 0,
            stored_leading_zeros: LEADING_ZEROS_UNSET,
            first: true,
            closed: false,
            count: 0,
            stats: CompressorStats::default(),
        }
    }

    /// Appends a raw 64-bit value. Values must be added in stream order.
    ///
    /// Returns `Err(BufferFull)` if the output limit would be exceeded. The
    /// stream is not decodable after an error.
    pub fn add_value(&mut self, value: u64) -> Result<(), BufferFull> {
        assert!(!self.closed, "cannot add values after close()");
        self.push(value)?;
        self.count += 1;
        Ok(())
    }

    /// Appends the bit pattern of a double.
    #[inline]
    pub fn add_f64(&mut self, value: f64) -> Result<(), BufferFull> {
        self.add_value(value.to_bits())
    }

    /// Terminates the stream: appends the end marker, a zero bit, and pads
    /// to a byte boundary. Calling it again has no effect.
    pub fn close(&mut self) -> Result<(), BufferFull> {
        if self.closed {
            return Ok(());
        }
        self.push(SENTINEL)?;
        self.out.write_bit(false)?;
        self.out.flush()?;
        self.closed = true;

        debug!(
            values = self.count,
            bits = self.out.len_bits(),
            repeats = self.stats.repeats,
            indexed = self.stats.indexed,
            same_bucket = self.stats.same_bucket,
            new_bucket = self.stats.new_bucket,
            "closed chimp stream"
        );
        Ok(())
    }

    /// Compressed bytes written so far. Complete once the stream is closed.
    pub fn output(&self) -> &[u8] {
        self.out.as_bytes()
    }

    /// Number of bits emitted so far, including the end marker and padding
    /// once closed.
    pub fn size_in_bits(&self) -> u64 {
        self.out.len_bits()
    }

    /// Number of values added.
    pub fn count(&self) -> u64 {
        self.count
    }

    /// Counts of each encoding chosen so far.
    pub fn stats(&self) -> CompressorStats {
        self.stats
    }

    /// Window size the stream is written with.
    pub fn window(&self) -> WindowSize {
        self.window
    }

    /// Consumes the compressor and returns its output.
    pub fn into_compressed(self) -> CompressedBlock {
        CompressedBlock {
            total_bits: self.out.len_bits(),
            bytes: self.out.into_bytes(),
            count: self.count,
        }
    }

    // ── internal helpers ───────────────────────────────────────────────

    fn push(&mut self, value: u64) -> Result<(), BufferFull> {
        if self.first {
            self.write_first(value)
        } else {
            self.compress_value(value)
        }
    }

    fn write_first(&mut self, value: u64) -> Result<(), BufferFull> {
        self.out.write_bits64(value, 64)?;
        self.first = false;
        self.stored_values[self.current] = value;
        let key = self.key(value);
        self.indices[key] = self.index;
        Ok(())
    }

    #[inline]
    fn key(&self, value: u64) -> usize {
        (value & self.window.index_mask()) as usize
    }

    fn compress_value(&mut self, value: u64) -> Result<(), BufferFull> {
        let window_len = self.window.get() as u64;
        let threshold = self.window.threshold();
        let key = self.key(value);

        // A table hit is only a candidate: different values can share the
        // masked key, so it is trusted only with enough matching low bits.
        let curr_index = self.indices[key];
        let mut indexed = None;
        if self.index - curr_index < window_len {
            let slot = (curr_index % window_len) as usize;
            let xor = value ^ self.stored_values[slot];
            let trailing_zeros = xor.trailing_zeros();
            if trailing_zeros > threshold {
                indexed = Some((slot, xor, trailing_zeros));
            }
        }

        match indexed {
            Some((slot, 0, _)) => self.write_repeat(slot)?,
            Some((slot, xor, trailing_zeros)) => self.write_indexed(slot, xor, trailing_zeros)?,
            None => {
                let slot = (self.index % window_len) as usize;
                let xor = self.stored_values[slot] ^ value;
                if xor == 0 {
                    self.write_repeat(slot)?;
                } else {
                    self.write_delta(xor)?;
                }
            }
        }

        self.current = (self.current + 1) % self.window.get();
        self.stored_values[self.current] = value;
        self.index += 1;
        self.indices[key] = self.index;
        Ok(())
    }

    fn write_repeat(&mut self, slot: usize) -> Result<(), BufferFull> {
        self.out.write_bits(slot as u32, self.window.flag_zero_size())?;
        self.stored_leading_zeros = LEADING_ZEROS_UNSET;
        self.stats.repeats += 1;
        Ok(())
    }

    fn write_indexed(
        &mut self,
        slot: usize,
        xor: u64,
        trailing_zeros: u32,
    ) -> Result<(), BufferFull> {
        let leading_zeros = LEADING_ROUND[xor.leading_zeros() as usize];
        let significant_bits = 64 - leading_zeros - trailing_zeros;
        let header = 512 * (self.window.get() as u32 + slot as u32)
            + 64 * LEADING_REPRESENTATION[leading_zeros as usize]
            + significant_bits;
        self.out.write_bits(header, self.window.flag_one_size())?;
        self.out.write_bits64(xor >> trailing_zeros, significant_bits)?;
        self.stored_leading_zeros = LEADING_ZEROS_UNSET;
        self.stats.indexed += 1;
        Ok(())
    }

    fn write_delta(&mut self, xor: u64) -> Result<(), BufferFull> {
        let leading_zeros = LEADING_ROUND[xor.leading_zeros() as usize];
        let significant_bits = 64 - leading_zeros;
        if leading_zeros == self.stored_leading_zeros {
            self.out.write_bits(0b10, 2)?;
            self.stats.same_bucket += 1;
        } else {
            let bucket = LEADING_REPRESENTATION[leading_zeros as usize];
            self.out.write_bits(24 + bucket, 5)?;
            self.stored_leading_zeros = leading_zeros;
            self.stats.new_bucket += 1;
        }
        self.out.write_bits64(xor, significant_bits)?;
        Ok(())
    }
}

/// A closed Chimp stream together with its metadata.
#[derive(Debug, Clone)]
pub struct CompressedBlock {
    /// The compressed byte data.
    pub bytes: Vec<u8>,
    /// Total number of bits in `bytes`, padding included.
    pub total_bits: u64,
    /// Number of values in this block.
    pub count: u64,
}
