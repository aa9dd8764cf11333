//! pixport-export: Pure archive serializers (sans-IO)
//!
//! Packs in-memory files into a single store-only ZIP blob. No
//! compression, no filesystem access: callers hand over names and
//! bytes plus the timestamp to stamp on every entry.

pub mod crc32;
pub mod dos_time;
pub mod zip;

pub use crc32::crc32;
pub use dos_time::DosDateTime;
pub use zip::{Archive, ArchiveError, MIME_TYPE, build_archive};
