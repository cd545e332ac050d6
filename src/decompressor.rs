use crate::bitbuffer::BitReader;
use crate::error::DecodeError;
use crate::window::{WindowSize, BUCKET_LEADING_ZEROS, SENTINEL};

/// The Chimp128 decompressor.
///
/// Rebuilds the values of a stream written by [`Compressor`](crate::Compressor)
/// with the same [`WindowSize`]. Decoding stops at the end marker or after
/// `item_budget` values, whichever comes first. The budget guards against
/// reading past a stream whose marker was lost; it is not part of the format.
///
/// # Example
/// ```
/// use chimp::{Compressor, Decompressor, WindowSize};
///
/// let mut compressor = Compressor::new(WindowSize::default());
/// compressor.add_f64(12.0).unwrap();
/// compressor.add_f64(12.5).unwrap();
/// compressor.close().unwrap();
///
/// let mut decompressor = Decompressor::new(compressor.output(), WindowSize::default(), 2);
/// assert_eq!(decompressor.values().unwrap(), vec![12.0, 12.5]);
/// ```
pub struct Decompressor<'a> {
    reader: BitReader<'a>,
    window: WindowSize,
    stored_values: Vec<u64>,
    current: usize,
    stored_val: u64,
    stored_leading_zeros: Option<u32>,
    first: bool,
    end_of_stream: bool,
    item_budget: usize,
    decoded: usize,
}

impl<'a> Decompressor<'a> {
    pub fn new(bytes: &'a [u8], window: WindowSize, item_budget: usize) -> Self {
        Self {
            reader: BitReader::new(bytes),
            window,
            stored_values: vec![0; window.get()],
            current: 0,
            stored_val: 0,
            stored_leading_zeros: None,
            first: true,
            end_of_stream: false,
            item_budget,
            decoded: 0,
        }
    }

    /// Returns `true` once the end marker has been read.
    pub fn is_end_of_stream(&self) -> bool {
        self.end_of_stream
    }

    /// Number of values returned so far.
    pub fn decoded(&self) -> usize {
        self.decoded
    }

    /// Decodes the next raw 64-bit value, or `None` at the end of the stream
    /// or once the item budget is spent.
    pub fn next_bits(&mut self) -> Result<Option<u64>, DecodeError> {
        if self.end_of_stream || self.decoded >= self.item_budget {
            return Ok(None);
        }
        if self.first {
            self.first = false;
            self.read_first()?;
        } else {
            self.next_value()?;
        }
        if self.end_of_stream {
            return Ok(None);
        }
        self.decoded += 1;
        Ok(Some(self.stored_val))
    }

    /// Decodes the next value as a double, or `None` at the end of the stream.
    #[inline]
    pub fn read_value(&mut self) -> Result<Option<f64>, DecodeError> {
        Ok(self.next_bits()?.map(f64::from_bits))
    }

    /// Decodes every remaining value.
    pub fn values(&mut self) -> Result<Vec<f64>, DecodeError> {
        let remaining = self.item_budget.saturating_sub(self.decoded);
        let mut values = Vec::with_capacity(remaining.min(1 << 20));
        while let Some(value) = self.read_value()? {
            values.push(value);
        }
        Ok(values)
    }

    // ── internal helpers ───────────────────────────────────────────────

    fn read_first(&mut self) -> Result<(), DecodeError> {
        self.stored_val = self.read_long(64)?;
        self.stored_values[self.current] = self.stored_val;
        if self.stored_val == SENTINEL {
            self.end_of_stream = true;
        }
        Ok(())
    }

    fn next_value(&mut self) -> Result<(), DecodeError> {
        let flag = self.read_int(2)?;
        match flag {
            3 => {
                let leading_zeros = BUCKET_LEADING_ZEROS[self.read_int(3)? as usize];
                self.stored_leading_zeros = Some(leading_zeros);
                let xor = self.read_long(64 - leading_zeros)?;
                self.accept(self.stored_val ^ xor);
            }
            2 => {
                let leading_zeros = self
                    .stored_leading_zeros
                    .ok_or(DecodeError::MissingLeadingZeros)?;
                let xor = self.read_long(64 - leading_zeros)?;
                self.accept(self.stored_val ^ xor);
            }
            1 => {
                let log2 = self.window.log2();
                let mut fill = self.window.initial_fill();
                let header = self.read_int(fill)?;

                fill -= log2;
                let index = ((header >> fill) & ((1 << log2) - 1)) as usize;
                fill -= 3;
                let leading_zeros = BUCKET_LEADING_ZEROS[((header >> fill) & 7) as usize];
                fill -= 6;
                let mut significant_bits = (header >> fill) & 63;
                if significant_bits == 0 {
                    significant_bits = 64;
                }
                if significant_bits + leading_zeros > 64 {
                    return Err(DecodeError::InvalidSignificantBits {
                        significant: significant_bits,
                        leading: leading_zeros,
                    });
                }
                self.check_slot(index)?;
                self.stored_leading_zeros = Some(leading_zeros);

                let trailing_zeros = 64 - significant_bits - leading_zeros;
                let xor = self.read_long(significant_bits)? << trailing_zeros;
                self.accept(self.stored_values[index] ^ xor);
            }
            _ => {
                // Exact repeat of a value in the window.
                let index = self.read_int(self.window.log2())? as usize;
                self.check_slot(index)?;
                self.stored_val = self.stored_values[index];
                self.advance();
            }
        }
        Ok(())
    }

    /// Rejects a reference to a slot the window has not reached yet. Every
    /// decoded value occupies one slot until the window wraps.
    fn check_slot(&self, index: usize) -> Result<(), DecodeError> {
        let filled = self.decoded.min(self.window.get());
        if index >= filled {
            return Err(DecodeError::UnfilledSlot { index, filled });
        }
        Ok(())
    }

    /// Stores a decoded XOR result unless it is the end marker.
    #[inline]
    fn accept(&mut self, value: u64) {
        if value == SENTINEL {
            self.end_of_stream = true;
        } else {
            self.stored_val = value;
            self.advance();
        }
    }

    #[inline]
    fn advance(&mut self) {
        self.current = (self.current + 1) % self.window.get();
        self.stored_values[self.current] = self.stored_val;
    }

    #[inline]
    fn read_int(&mut self, len: u32) -> Result<u32, DecodeError> {
        self.reader.read_bits(len).ok_or(DecodeError::UnexpectedEnd)
    }

    #[inline]
    fn read_long(&mut self, len: u32) -> Result<u64, DecodeError> {
        self.reader.read_bits64(len).ok_or(DecodeError::UnexpectedEnd)
    }
}

impl Iterator for Decompressor<'_> {
    type Item = Result<f64, DecodeError>;

    fn next(&mut self) -> Option<Self::Item> {
        match self.read_value() {
            Ok(value) => value.map(Ok),
            Err(e) => {
                // Stop after the first error.
                self.end_of_stream = true;
                Some(Err(e))
            }
        }
    }
}
