//! Durability layer for blocktrack
//!
//! This crate persists the tracking table and brings it back:
//! - Codec: flat binary image (magic, format version, activation stamp,
//!   slot stamps, CRC32C trailer), streamed in bounded chunks
//! - Checkpoint manager: temp-file write, fsync, atomic rename-over;
//!   load with full validation and discard-and-reinit fallback
//!
//! A corrupt image is never fatal: the engine's soundness model already
//! tolerates starting from an empty map (the caller falls back to a full
//! capture), so corruption degrades instead of crashing the host.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod checkpoint;
pub mod codec;

pub use checkpoint::{CheckpointError, CheckpointManager, CheckpointPhase};
pub use codec::{decode_table, encode_table, encoded_len, CodecError};
