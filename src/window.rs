use crate::error::WindowError;

/// Bit pattern appended by [`Compressor::close`](crate::Compressor::close) to
/// mark the end of a stream (a quiet NaN).
///
/// A data value with exactly this pattern cannot be represented: the
/// decompressor treats its first occurrence as the end of the stream.
pub const SENTINEL: u64 = 0x7FF8_0000_0000_0000;

/// Leading-zero count of an XOR, rounded down to one of the eight buckets.
pub(crate) const LEADING_ROUND: [u32; 64] = [
    0, 0, 0, 0, 0, 0, 0, 0, //
    8, 8, 8, 8, 12, 12, 12, 12, //
    16, 16, 18, 18, 20, 20, 22, 22, //
    24, 24, 24, 24, 24, 24, 24, 24, //
    24, 24, 24, 24, 24, 24, 24, 24, //
    24, 24, 24, 24, 24, 24, 24, 24, //
    24, 24, 24, 24, 24, 24, 24, 24, //
    24, 24, 24, 24, 24, 24, 24, 24,
];

/// 3-bit code of a rounded leading-zero count (indexed by the rounded count).
pub(crate) const LEADING_REPRESENTATION: [u32; 64] = [
    0, 0, 0, 0, 0, 0, 0, 0, //
    1, 1, 1, 1, 2, 2, 2, 2, //
    3, 3, 4, 4, 5, 5, 6, 6, //
    7, 7, 7, 7, 7, 7, 7, 7, //
    7, 7, 7, 7, 7, 7, 7, 7, //
    7, 7, 7, 7, 7, 7, 7, 7, //
    7, 7, 7, 7, 7, 7, 7, 7, //
    7, 7, 7, 7, 7, 7, 7, 7,
];

/// Inverse of [`LEADING_REPRESENTATION`]: bucket code to leading-zero count.
pub(crate) const BUCKET_LEADING_ZEROS: [u32; 8] = [0, 8, 12, 16, 18, 20, 22, 24];

/// Number of previous values a compressor can reference, and the source of
/// every field width in the bitstream.
///
/// The compressor and decompressor of one stream must use the same window
/// size; it is not recorded in the stream.
///
/// # Example
/// ```
/// use chimp::WindowSize;
///
/// let w = WindowSize::new(128).unwrap();
/// assert_eq!(w.log2(), 7);
/// assert_eq!(w.flag_zero_size(), 9);
/// assert_eq!(w.flag_one_size(), 18);
/// assert!(WindowSize::new(100).is_err());
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct WindowSize {
    log2: u32,
}

impl WindowSize {
    /// The window used by the framing layer.
    pub const DEFAULT: WindowSize = WindowSize { log2: 7 };

    /// Largest accepted window. Keeps the indexed field within 32 bits and
    /// the index table at 2^21 entries.
    pub const MAX: usize = 1 << 14;

    /// Validates `size` as a window capacity.
    pub fn new(size: usize) -> Result<Self, WindowError> {
        if !size.is_power_of_two() {
            return Err(WindowError::NotPowerOfTwo(size));
        }
        if size > Self::MAX {
            return Err(WindowError::OutOfRange {
                size,
                max: Self::MAX,
            });
        }
        Ok(Self {
            log2: size.trailing_zeros(),
        })
    }

    /// Number of slots in the window.
    #[inline]
    pub fn get(self) -> usize {
        1 << self.log2
    }

    /// Bits needed to address a window slot.
    #[inline]
    pub fn log2(self) -> u32 {
        self.log2
    }

    /// Minimum trailing-zero count (exclusive) for a back-reference to be
    /// encoded with the indexed form.
    #[inline]
    pub fn threshold(self) -> u32 {
        6 + self.log2
    }

    /// Width of an exact-repeat field: 2 flag bits plus a window index.
    #[inline]
    pub fn flag_zero_size(self) -> u32 {
        self.log2 + 2
    }

    /// Width of an indexed header: 2 flag bits, window index, 3-bit bucket
    /// and 6-bit significant-bit count.
    #[inline]
    pub fn flag_one_size(self) -> u32 {
        self.log2 + 11
    }

    /// Width of the indexed header once the 2 flag bits have been consumed.
    #[inline]
    pub fn initial_fill(self) -> u32 {
        self.log2 + 9
    }

    /// Mask selecting the low bits of a value used as an index-table key.
    #[inline]
    pub fn index_mask(self) -> u64 {
        (1u64 << (self.threshold() + 1)) - 1
    }

    /// Number of entries in the index table, one per possible key.
    #[inline]
    pub fn index_table_len(self) -> usize {
        1 << (self.threshold() + 1)
    }
}

impl Default for WindowSize {
    fn default() -> Self {
        Self::DEFAULT
    }
}

impl TryFrom<usize> for WindowSize {
    type Error = WindowError;

    fn try_from(size: usize) -> Result<Self, Self::Error> {
        Self::new(size)
    }
}
