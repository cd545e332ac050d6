//! Error types for every layer of the codec.
//!
//! The bit layer reports [`BufferFull`](crate::BufferFull) only when a writer
//! was given a byte limit. Capacity problems are decided at the framing layer,
//! which is the first layer that knows both the required and the available
//! size.

/// Legacy code: unsupported value width. Reserved, never returned.
pub const ERR_UNSUPPORTED_TYPE_WIDTH: i32 = -1;
/// Legacy code: source length is not a multiple of the value width.
pub const ERR_UNALIGNED_BUFFER: i32 = -2;
/// Legacy code: compression destination cannot hold header and payload.
pub const ERR_BUFFER_TOO_SMALL: i32 = -3;
/// Legacy code: decompression destination cannot hold the decoded values.
pub const ERR_BUFFER_OVERFLOW: i32 = -4;
/// Malformed compressed input.
pub const ERR_CORRUPT_INPUT: i32 = -5;

/// Invalid window size.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum WindowError {
    #[error("window size {0} is not a power of two")]
    NotPowerOfTwo(usize),
    #[error("window size {size} exceeds the maximum of {max}")]
    OutOfRange { size: usize, max: usize },
}

/// Error raised while decoding a bitstream.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DecodeError {
    /// The compressed stream ended unexpectedly.
    #[error("unexpected end of compressed stream")]
    UnexpectedEnd,
    /// A same-bucket delta appeared before any bucket was established.
    #[error("same-bucket delta without a preceding leading-zero bucket")]
    MissingLeadingZeros,
    /// An indexed delta declared more meaningful bits than a value holds.
    #[error("indexed delta has {significant} significant bits after {leading} leading zeros")]
    InvalidSignificantBits { significant: u32, leading: u32 },
    /// A back-reference names a window slot no value has been stored in.
    #[error("reference to window slot {index} but only {filled} slots are filled")]
    UnfilledSlot { index: usize, filled: usize },
}

/// Error raised by the framing functions.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum FrameError {
    /// The destination cannot hold the count header and compressed payload.
    #[error("destination too small: {required} bytes required, {available} available")]
    BufferTooSmall { required: usize, available: usize },
    /// The destination cannot hold the decompressed values.
    #[error("destination overflow: {required} bytes required, {available} available")]
    BufferOverflow { required: usize, available: usize },
    /// The source length is not a whole number of 8-byte values.
    #[error("source length {len} is not a multiple of 8")]
    UnalignedBuffer { len: usize },
    /// The value count does not fit the 32-bit header.
    #[error("{count} values exceed the 32-bit count header")]
    TooManyValues { count: usize },
    /// The compressed input is too short to contain the count header.
    #[error("compressed input of {len} bytes has no count header")]
    MissingHeader { len: usize },
    /// The stream ended before the number of values its header declares.
    #[error("stream declares {expected} values but ended after {decoded}")]
    Truncated { expected: usize, decoded: usize },
    #[error(transparent)]
    Decode(#[from] DecodeError),
}

impl FrameError {
    /// Returns the integer code of the C-style interface this format
    /// originates from.
    pub fn code(&self) -> i32 {
        match self {
            FrameError::BufferTooSmall { .. } | FrameError::TooManyValues { .. } => {
                ERR_BUFFER_TOO_SMALL
            }
            FrameError::BufferOverflow { .. } => ERR_BUFFER_OVERFLOW,
            FrameError::UnalignedBuffer { .. } => ERR_UNALIGNED_BUFFER,
            FrameError::MissingHeader { .. }
            | FrameError::Truncated { .. }
            | FrameError::Decode(_) => ERR_CORRUPT_INPUT,
        }
    }
}
