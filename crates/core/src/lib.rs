//! Core types for blocktrack
//!
//! This crate defines the fundamental types shared by every layer of the
//! changed-block tracking engine:
//! - [`Lsn`]: monotonic log position stamps supplied by the host
//! - [`BlockId`] / [`ContainerId`]: identity of a trackable block
//! - [`TrackerConfig`]: byte budget and data directory for the map
//! - Host-facing traits: [`LsnSource`] and [`ObjectEnumerator`]

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod block;
pub mod config;
pub mod error;
pub mod lsn;
pub mod traits;

pub use block::{BlockId, ContainerId};
pub use config::{TrackerConfig, MAP_CHECKSUM_LEN, MAP_HEADER_LEN, SLOT_LEN};
pub use error::ConfigError;
pub use lsn::Lsn;
pub use traits::{LsnSource, ObjectEntry, ObjectEnumerator};
