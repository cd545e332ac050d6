//! # Chimp
//!
//! A Rust implementation of the Chimp128 streaming compression scheme for
//! 64-bit floating-point time series, as described in *"Chimp: Efficient
//! Lossless Floating Point Compression for Time Series Databases"*
//! (VLDB 2022).
//!
//! ## Algorithm overview
//!
//! Like Gorilla, Chimp XORs each value with an earlier one and stores only the
//! bits that differ. It improves on it in two ways:
//!
//! - **Reference window.** The compressor remembers the last 128 values and
//!   finds an earlier value sharing the same low bits through a small index
//!   table. Repeats of any value in the window cost 9 bits, and XORs against a
//!   well-matched older value drop their trailing zeros.
//!
//! - **Leading-zero buckets.** Leading zeros of an XOR are rounded down to one
//!   of eight buckets and sent as a 3-bit code, which lets consecutive deltas
//!   reuse the same bucket for a 2-bit flag.
//!
//! The stream ends with a reserved quiet-NaN pattern ([`SENTINEL`]); a data
//! value with exactly that bit pattern ends the stream early when decoded.
//!
//! ## Example
//!
//! ```rust
//! use chimp::{Compressor, Decompressor, WindowSize};
//!
//! // Compress
//! let mut compressor = Compressor::new(WindowSize::default());
//! for v in [12.0, 12.5, 13.0, 12.5] {
//!     compressor.add_f64(v).unwrap();
//! }
//! compressor.close().unwrap();
//!
//! let block = compressor.into_compressed();
//! println!("Compressed {} values into {} bytes", block.count, block.bytes.len());
//!
//! // Decompress
//! let mut decompressor = Decompressor::new(&block.bytes, WindowSize::default(), 4);
//! assert_eq!(decompressor.values().unwrap(), vec![12.0, 12.5, 13.0, 12.5]);
//! ```
//!
//! ## Framed buffers
//!
//! The [`frame`] functions prefix the payload with a 4-byte value count and
//! report capacity problems as errors:
//!
//! ```rust
//! use chimp::frame;
//!
//! let values = [20.0f64, 20.5, 21.0];
//! let source: Vec<u8> = values.iter().flat_map(|v| v.to_le_bytes()).collect();
//!
//! let mut compressed = vec![0u8; frame::compressed_bound(values.len())];
//! let len = frame::compress(&source, &mut compressed).unwrap();
//!
//! let mut restored = vec![0u8; source.len()];
//! frame::decompress(&compressed[..len], &mut restored).unwrap();
//! assert_eq!(restored, source);
//! ```

pub mod bitbuffer;
pub mod compressor;
pub mod decompressor;
pub mod error;
pub mod frame;
pub mod source;
pub mod window;

// Re-export primary types at the crate root.
pub use bitbuffer::{BitReader, BitWriter, BufferFull};
pub use compressor::{CompressedBlock, Compressor, CompressorStats};
pub use decompressor::Decompressor;
pub use error::{DecodeError, FrameError, WindowError};
pub use frame::{compress, decode_values, decompress, encode_values};
pub use source::{CsvSource, SourceError};
pub use window::{WindowSize, SENTINEL};
