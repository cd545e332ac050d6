/// Error returned when a write would exceed the writer's byte limit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("write would exceed bit buffer byte limit")]
pub struct BufferFull;

/// Returns a mask with the lowest `n` bits set. Handles `n == 64` without overflow.
#[inline]
pub(crate) fn bitmask(n: u32) -> u64 {
    if n >= 64 {
        u64::MAX
    } else {
        (1u64 << n) - 1
    }
}

/// MSB-first bit writer backed by an owned byte vector.
///
/// Bits are collected in an 8-bit accumulator whose free slots are filled from
/// the high end. A full accumulator is appended to the byte vector. A field
/// wider than the free space is split into the part that completes the
/// accumulator, whole bytes appended directly, and a remainder that seeds the
/// next accumulator.
///
/// An optional byte limit caps the vector. When the limit is reached, writes
/// return `Err(BufferFull)` instead of growing.
#[derive(Debug, Clone)]
pub struct BitWriter {
    bytes: Vec<u8>,
    /// Pending bits, stored high.
    current: u32,
    /// Free slots left in `current` (1..=8).
    free: u32,
    written_bits: u64,
    /// Maximum number of bytes the writer may hold (`None` = unlimited).
    max_bytes: Option<usize>,
}

impl BitWriter {
    /// Creates an empty writer with no size limit.
    pub fn new() -> Self {
        Self::with_capacity(0)
    }

    /// Creates a writer with `capacity` bytes pre-allocated and no size limit.
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            bytes: Vec::with_capacity(capacity),
            current: 0,
            free: 8,
            written_bits: 0,
            max_bytes: None,
        }
    }

    /// Creates a writer that holds at most `max_bytes` bytes.
    ///
    /// The full capacity is allocated up front; the writer never reallocates.
    pub fn with_limit(max_bytes: usize) -> Self {
        Self {
            bytes: Vec::with_capacity(max_bytes),
            current: 0,
            free: 8,
            written_bits: 0,
            max_bytes: Some(max_bytes),
        }
    }

    /// Returns the byte limit, if any.
    pub fn limit(&self) -> Option<usize> {
        self.max_bytes
    }

    /// Total number of bits written, including alignment padding.
    #[inline]
    pub fn len_bits(&self) -> u64 {
        self.written_bits
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.written_bits == 0
    }

    /// Completed bytes. Bits still in the accumulator are not included until
    /// the stream is aligned.
    #[inline]
    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// Consumes the writer and returns the completed bytes.
    #[inline]
    pub fn into_bytes(self) -> Vec<u8> {
        self.bytes
    }

    #[inline]
    fn push_byte(&mut self, byte: u8) -> Result<(), BufferFull> {
        if let Some(max) = self.max_bytes {
            if self.bytes.len() >= max {
                return Err(BufferFull);
            }
        }
        self.bytes.push(byte);
        Ok(())
    }

    /// Writes the lowest `len` bits of `bits` into the accumulator.
    /// `len` must not exceed the free slots.
    fn write_in_current(&mut self, bits: u64, len: u32) -> Result<usize, BufferFull> {
        debug_assert!(len <= self.free);
        if len == 0 {
            return Ok(0);
        }
        let free = self.free - len;
        let current = self.current | (((bits & bitmask(len)) as u32) << free);
        if free == 0 {
            self.push_byte(current as u8)?;
            self.current = 0;
            self.free = 8;
        } else {
            self.current = current;
            self.free = free;
        }
        self.written_bits += u64::from(len);
        Ok(len as usize)
    }

    /// Writes a single bit.
    #[inline]
    pub fn write_bit(&mut self, bit: bool) -> Result<usize, BufferFull> {
        self.write_in_current(u64::from(bit), 1)
    }

    /// Writes the lowest `len` bits of `value`, most significant first.
    /// `len` must be <= 32.
    #[inline]
    pub fn write_bits(&mut self, value: u32, len: u32) -> Result<usize, BufferFull> {
        debug_assert!(len <= 32);
        self.write_bits64(u64::from(value), len)
    }

    /// Writes the lowest `len` bits of `value`, most significant first.
    /// `len` must be <= 64.
    ///
    /// On error the writer may hold part of the field. Callers that need the
    /// stream to stay decodable must stop writing after the first error.
    pub fn write_bits64(&mut self, value: u64, len: u32) -> Result<usize, BufferFull> {
        debug_assert!(len <= 64);
        if len <= self.free {
            return self.write_in_current(value, len);
        }

        let mut rest = len - self.free;
        self.write_in_current(value >> rest, self.free)?;
        while rest >= 8 {
            rest -= 8;
            self.push_byte((value >> rest) as u8)?;
            self.written_bits += 8;
        }
        self.write_in_current(value, rest)?;
        Ok(len as usize)
    }

    /// Pads with zero bits up to the next byte boundary and returns the
    /// number of padding bits.
    pub fn align(&mut self) -> Result<usize, BufferFull> {
        if self.free == 8 {
            Ok(0)
        } else {
            self.write_in_current(0, self.free)
        }
    }

    /// Aligns the stream so every written bit is visible in [`as_bytes`](Self::as_bytes).
    pub fn flush(&mut self) -> Result<usize, BufferFull> {
        self.align()
    }

    /// Bytes that can still be appended before hitting the limit, or `None`
    /// if no limit is set.
    pub fn remaining_capacity(&self) -> Option<usize> {
        self.max_bytes.map(|max| max.saturating_sub(self.bytes.len()))
    }
}

impl Default for BitWriter {
    fn default() -> Self {
        Self::new()
    }
}

/// MSB-first bit reader over a borrowed byte slice.
///
/// Keeps a lookahead accumulator whose lowest `fill` bits are valid, refilled
/// two bytes at a time whenever fewer than 16 bits are buffered. The slice
/// length is the bit budget: a read that needs bits beyond it returns `None`.
#[derive(Debug)]
pub struct BitReader<'a> {
    bytes: &'a [u8],
    /// Next byte of `bytes` to load.
    pos: usize,
    current: u32,
    fill: u32,
    read_bits: u64,
}

impl<'a> BitReader<'a> {
    pub fn new(bytes: &'a [u8]) -> Self {
        Self {
            bytes,
            pos: 0,
            current: 0,
            fill: 0,
            read_bits: 0,
        }
    }

    /// Number of bits consumed so far.
    #[inline]
    pub fn bits_read(&self) -> u64 {
        self.read_bits
    }

    /// Number of bits left in the budget.
    #[inline]
    pub fn remaining(&self) -> u64 {
        (self.bytes.len() - self.pos) as u64 * 8 + u64::from(self.fill)
    }

    #[inline]
    pub fn is_exhausted(&self) -> bool {
        self.remaining() == 0
    }

    #[inline]
    fn next_byte(&mut self) -> Option<u8> {
        let byte = *self.bytes.get(self.pos)?;
        self.pos += 1;
        Some(byte)
    }

    /// Tops the accumulator up with as many of the next two bytes as exist.
    fn refill(&mut self) {
        debug_assert!(self.fill < 16);
        for _ in 0..2 {
            match self.next_byte() {
                Some(byte) => {
                    self.current = (self.current << 8) | u32::from(byte);
                    self.fill += 8;
                }
                None => break,
            }
        }
    }

    /// Takes `len` bits from the accumulator. `len` must not exceed `fill`
    /// unless the accumulator is empty, in which case one byte is loaded.
    fn read_from_current(&mut self, len: u32) -> Option<u64> {
        if len == 0 {
            return Some(0);
        }
        if self.fill == 0 {
            self.current = u32::from(self.next_byte()?);
            self.fill = 8;
        }
        debug_assert!(len <= self.fill);
        self.fill -= len;
        self.read_bits += u64::from(len);
        Some(u64::from(self.current >> self.fill) & bitmask(len))
    }

    /// Reads a single bit. Returns `None` if exhausted.
    #[inline]
    pub fn read_bit(&mut self) -> Option<bool> {
        self.read_bits64(1).map(|bit| bit == 1)
    }

    /// Reads `len` bits (<= 32). Returns `None` if not enough bits remain.
    #[inline]
    pub fn read_bits(&mut self, len: u32) -> Option<u32> {
        debug_assert!(len <= 32);
        self.read_bits64(len).map(|bits| bits as u32)
    }

    /// Reads `len` bits (<= 64). Returns `None` if not enough bits remain.
    pub fn read_bits64(&mut self, len: u32) -> Option<u64> {
        debug_assert!(len <= 64);
        if u64::from(len) > self.remaining() {
            return None;
        }
        if self.fill < 16 {
            self.refill();
        }
        if len <= self.fill {
            return self.read_from_current(len);
        }

        let mut rest = len - self.fill;
        let mut value = self.read_from_current(self.fill)?;
        for _ in 0..rest / 8 {
            value = (value << 8) | u64::from(self.next_byte()?);
            self.read_bits += 8;
        }
        rest &= 7;
        Some((value << rest) | self.read_from_current(rest)?)
    }

    /// Discards bits up to the next byte boundary and returns how many were
    /// skipped.
    pub fn align(&mut self) -> u32 {
        let skipped = self.fill & 7;
        self.fill -= skipped;
        self.read_bits += u64::from(skipped);
        skipped
    }
}
