//! Map image codec.
//!
//! The persisted image is a flat little-endian encoding:
//!
//! | offset  | field          | type         |
//! |---------|----------------|--------------|
//! | 0       | magic          | 4 bytes      |
//! | 4       | format version | u32          |
//! | 8       | activation LSN | u64          |
//! | 16      | slots[0..N)    | N x u64      |
//! | 16 + 8N | checksum       | u32 (CRC32C) |
//!
//! The checksum covers every byte before it. Encoding streams the slot
//! region in bounded chunks so arbitrarily large maps never need a
//! single full-size buffer or syscall; chunk boundaries are not part of
//! the format.

use blocktrack_core::{Lsn, MAP_CHECKSUM_LEN, MAP_HEADER_LEN, SLOT_LEN};
use blocktrack_table::{TrackingTable, MAP_FORMAT_VERSION, MAP_MAGIC};
use byteorder::{ByteOrder, LittleEndian, ReadBytesExt, WriteBytesExt};
use std::io::{self, Read, Write};
use thiserror::Error;

/// Slots per I/O chunk. 8000 stamps is 64 KB per write, a comfortable
/// size for one syscall.
pub const CHUNK_SLOTS: usize = 8000;

/// Decode failures.
///
/// The corruption variants signal an unusable image the caller should
/// discard; `Io` passes through real I/O failures, which are a different
/// class (retryable or fatal, never "discard the file").
#[derive(Debug, Error)]
pub enum CodecError {
    /// The image does not start with the map magic.
    #[error("bad map magic {found:?}, expected {expected:?}")]
    BadMagic {
        /// Bytes found at offset 0.
        found: [u8; 4],
        /// The magic this engine writes.
        expected: [u8; 4],
    },

    /// The image was written by an incompatible format version. Formats
    /// are never migrated; the image is simply unusable.
    #[error("map format version {found} is incompatible with expected version {expected}")]
    VersionMismatch {
        /// Version found in the image.
        found: u32,
        /// Version this engine expects.
        expected: u32,
    },

    /// The stored checksum does not match the image contents.
    #[error("map checksum mismatch: stored {stored:#010x}, computed {computed:#010x}")]
    ChecksumMismatch {
        /// Checksum stored in the trailer.
        stored: u32,
        /// Checksum recomputed over the image.
        computed: u32,
    },

    /// An underlying I/O failure, not a corruption signal.
    #[error(transparent)]
    Io(#[from] io::Error),
}

impl CodecError {
    /// True for validation failures that mean "discard the image", false
    /// for I/O failures.
    pub fn is_corruption(&self) -> bool {
        !matches!(self, CodecError::Io(_))
    }
}

/// Exact encoded image length for a table of `slot_count` slots.
pub fn encoded_len(slot_count: u64) -> u64 {
    MAP_HEADER_LEN + slot_count * SLOT_LEN + MAP_CHECKSUM_LEN
}

/// Encode `table` to `writer`.
///
/// Slots are read atomically one at a time, so encoding a live table is
/// safe; it captures some monotonically consistent view of each slot
/// (marks landing mid-encode may or may not be included, which the
/// checkpoint protocol tolerates).
pub fn encode_table<W: Write>(table: &TrackingTable, writer: &mut W) -> io::Result<()> {
    let mut header = [0u8; MAP_HEADER_LEN as usize];
    header[0..4].copy_from_slice(&MAP_MAGIC);
    LittleEndian::write_u32(&mut header[4..8], MAP_FORMAT_VERSION);
    LittleEndian::write_u64(&mut header[8..16], table.init_lsn().as_u64());

    let mut crc = crc32c::crc32c(&header);
    writer.write_all(&header)?;

    let mut chunk = Vec::with_capacity(CHUNK_SLOTS * SLOT_LEN as usize);
    let mut index = 0;
    while index < table.slot_count() {
        let take = CHUNK_SLOTS.min(table.slot_count() - index);
        chunk.clear();
        for offset in 0..take {
            chunk.write_u64::<LittleEndian>(table.read_slot(index + offset).as_u64())?;
        }
        crc = crc32c::crc32c_append(crc, &chunk);
        writer.write_all(&chunk)?;
        index += take;
    }

    writer.write_u32::<LittleEndian>(crc)?;
    Ok(())
}

/// Decode a table of `expected_slots` slots from `reader`.
///
/// Validates magic, format version, and checksum; any mismatch is a
/// corruption signal. The caller is responsible for checking the file
/// size against [`encoded_len`] beforehand (a wrong-size image cannot be
/// decoded meaningfully).
pub fn decode_table<R: Read>(
    reader: &mut R,
    expected_slots: usize,
) -> Result<TrackingTable, CodecError> {
    let mut header = [0u8; MAP_HEADER_LEN as usize];
    reader.read_exact(&mut header)?;

    let mut magic = [0u8; 4];
    magic.copy_from_slice(&header[0..4]);
    if magic != MAP_MAGIC {
        return Err(CodecError::BadMagic {
            found: magic,
            expected: MAP_MAGIC,
        });
    }

    let version = LittleEndian::read_u32(&header[4..8]);
    if version != MAP_FORMAT_VERSION {
        return Err(CodecError::VersionMismatch {
            found: version,
            expected: MAP_FORMAT_VERSION,
        });
    }

    let init_lsn = Lsn::new(LittleEndian::read_u64(&header[8..16]));
    let mut crc = crc32c::crc32c(&header);

    let table = TrackingTable::new(expected_slots);
    let mut chunk = vec![0u8; CHUNK_SLOTS * SLOT_LEN as usize];
    let mut index = 0;
    while index < expected_slots {
        let take = CHUNK_SLOTS.min(expected_slots - index);
        let bytes = &mut chunk[..take * SLOT_LEN as usize];
        reader.read_exact(bytes)?;
        crc = crc32c::crc32c_append(crc, bytes);
        for offset in 0..take {
            let start = offset * SLOT_LEN as usize;
            let stamp = LittleEndian::read_u64(&bytes[start..start + SLOT_LEN as usize]);
            table.store_slot(index + offset, Lsn::new(stamp));
        }
        index += take;
    }

    let stored = reader.read_u32::<LittleEndian>()?;
    if stored != crc {
        return Err(CodecError::ChecksumMismatch {
            stored,
            computed: crc,
        });
    }

    table.restore_init_lsn(init_lsn);
    Ok(table)
}
