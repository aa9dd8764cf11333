//! Store-only ZIP serializer.
//!
//! Produces one contiguous buffer laid out as:
//!
//! ```text
//! [local header + name + payload] * N
//! [central directory record + name] * N
//! end of central directory record
//! ```
//!
//! Every integer is little-endian.  Entries use method 0 (store), so
//! compressed and uncompressed sizes are both the payload length.  Bit
//! 11 of the general-purpose flag marks names as UTF-8.  There is no
//! ZIP64 support: payloads, offsets, and the central directory must fit
//! in `u32`, names in `u16`, and the entry count in `u16`.
//!
//! Names are written as given.  Duplicates are allowed and are not
//! renamed.
//!
//! This is a pure function with no I/O -- it returns bytes.

use crate::crc32::crc32;
use crate::dos_time::DosDateTime;

/// MIME type of the produced blob.
pub const MIME_TYPE: &str = "application/zip";

const LOCAL_FILE_HEADER_SIGNATURE: u32 = 0x0403_4B50;
const CENTRAL_DIRECTORY_SIGNATURE: u32 = 0x0201_4B50;
const END_OF_CENTRAL_DIRECTORY_SIGNATURE: u32 = 0x0605_4B50;

/// "Version needed to extract" 2.0: the minimum for stored entries.
const VERSION: u16 = 20;
/// General-purpose bit 11: file name is UTF-8.
const FLAG_UTF8: u16 = 0x0800;
const METHOD_STORE: u16 = 0;

const LOCAL_HEADER_LEN: usize = 30;
const CENTRAL_RECORD_LEN: usize = 46;
const END_RECORD_LEN: usize = 22;

/// Errors from archive size accounting.
///
/// None of these can be triggered by ordinary image batches; they guard
/// the 32-bit fields of the classic (non-ZIP64) layout.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ArchiveError {
    /// An entry payload does not fit the 32-bit size fields.
    #[error("entry {name:?} is {len} bytes, beyond the 4 GiB store limit")]
    EntryTooLarge {
        /// Offending entry name.
        name: String,
        /// Payload length in bytes.
        len: usize,
    },

    /// An entry name does not fit the 16-bit name length field.
    #[error("entry name {name:?} is {len} bytes, beyond the 65535 byte limit")]
    NameTooLong {
        /// Offending entry name.
        name: String,
        /// Name length in UTF-8 bytes.
        len: usize,
    },

    /// A header offset or the central directory passed the 4 GiB mark.
    #[error("archive grew past the 4 GiB offset limit at {at}")]
    ArchiveTooLarge {
        /// Which record could not be addressed.
        at: String,
    },

    /// More entries than the 16-bit entry count fields can describe.
    #[error("{count} entries exceed the 65535 entry limit")]
    TooManyEntries {
        /// Number of entries requested.
        count: usize,
    },
}

/// A finished ZIP blob.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Archive {
    bytes: Vec<u8>,
}

impl Archive {
    /// The archive bytes.
    #[must_use]
    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// Consume the archive and return its bytes.
    #[must_use]
    pub fn into_bytes(self) -> Vec<u8> {
        self.bytes
    }

    /// Total size of the archive in bytes.
    #[must_use]
    pub const fn size(&self) -> usize {
        self.bytes.len()
    }

    /// Always [`MIME_TYPE`].
    #[must_use]
    pub const fn mime_type(&self) -> &'static str {
        MIME_TYPE
    }
}

/// Per-entry metadata shared by the local header and the central record.
struct EntryRecord<'a> {
    name: &'a [u8],
    name_len: u16,
    crc32: u32,
    size: u32,
    local_header_offset: u32,
}

/// Build a store-only ZIP from `(name, bytes)` pairs, in order.
///
/// Every entry is stamped with `modified`.  An empty input produces a
/// valid empty archive consisting of just the end record.
///
/// # Errors
///
/// Returns an [`ArchiveError`] when a size, offset, name length, or
/// entry count overflows its fixed-width field.
///
/// # Examples
///
/// ```
/// use pixport_export::{DosDateTime, build_archive};
///
/// let archive = build_archive([("a.txt", &b"abc"[..])], DosDateTime::MIN).unwrap();
/// assert_eq!(&archive.as_bytes()[..4], &[0x50, 0x4B, 0x03, 0x04]);
/// ```
pub fn build_archive<'a, I>(entries: I, modified: DosDateTime) -> Result<Archive, ArchiveError>
where
    I: IntoIterator<Item = (&'a str, &'a [u8])>,
{
    let mut out = Vec::new();
    let mut records = Vec::new();

    // --- Local headers and payloads ---
    for (name, bytes) in entries {
        let name_bytes = name.as_bytes();
        let name_len =
            u16::try_from(name_bytes.len()).map_err(|_| ArchiveError::NameTooLong {
                name: name.to_owned(),
                len: name_bytes.len(),
            })?;
        let size = u32::try_from(bytes.len()).map_err(|_| ArchiveError::EntryTooLarge {
            name: name.to_owned(),
            len: bytes.len(),
        })?;
        let local_header_offset =
            u32::try_from(out.len()).map_err(|_| ArchiveError::ArchiveTooLarge {
                at: format!("local header of {name:?}"),
            })?;

        let record = EntryRecord {
            name: name_bytes,
            name_len,
            crc32: crc32(bytes),
            size,
            local_header_offset,
        };

        out.reserve(LOCAL_HEADER_LEN + name_bytes.len() + bytes.len());
        write_local_header(&mut out, &record, modified);
        out.extend_from_slice(bytes);
        records.push(record);
    }

    let entry_count = u16::try_from(records.len()).map_err(|_| ArchiveError::TooManyEntries {
        count: records.len(),
    })?;

    // --- Central directory ---
    let central_directory_start = out.len();
    let central_directory_offset =
        u32::try_from(central_directory_start).map_err(|_| ArchiveError::ArchiveTooLarge {
            at: "central directory".to_owned(),
        })?;
    let central_len: usize = records
        .iter()
        .map(|r| CENTRAL_RECORD_LEN + r.name.len())
        .sum();
    out.reserve(central_len + END_RECORD_LEN);
    for record in &records {
        write_central_record(&mut out, record, modified);
    }
    let central_directory_size = u32::try_from(out.len() - central_directory_start).map_err(
        |_| ArchiveError::ArchiveTooLarge {
            at: "end of central directory".to_owned(),
        },
    )?;

    // --- End of central directory ---
    write_end_record(
        &mut out,
        entry_count,
        central_directory_size,
        central_directory_offset,
    );

    Ok(Archive { bytes: out })
}

fn put_u16(out: &mut Vec<u8>, value: u16) {
    out.extend_from_slice(&value.to_le_bytes());
}

fn put_u32(out: &mut Vec<u8>, value: u32) {
    out.extend_from_slice(&value.to_le_bytes());
}

fn write_local_header(out: &mut Vec<u8>, record: &EntryRecord<'_>, modified: DosDateTime) {
    put_u32(out, LOCAL_FILE_HEADER_SIGNATURE);
    put_u16(out, VERSION);
    put_u16(out, FLAG_UTF8);
    put_u16(out, METHOD_STORE);
    put_u16(out, modified.time);
    put_u16(out, modified.date);
    put_u32(out, record.crc32);
    put_u32(out, record.size); // compressed
    put_u32(out, record.size); // uncompressed
    put_u16(out, record.name_len);
    put_u16(out, 0); // extra field length
    out.extend_from_slice(record.name);
}

fn write_central_record(out: &mut Vec<u8>, record: &EntryRecord<'_>, modified: DosDateTime) {
    put_u32(out, CENTRAL_DIRECTORY_SIGNATURE);
    put_u16(out, VERSION); // made by
    put_u16(out, VERSION); // needed to extract
    put_u16(out, FLAG_UTF8);
    put_u16(out, METHOD_STORE);
    put_u16(out, modified.time);
    put_u16(out, modified.date);
    put_u32(out, record.crc32);
    put_u32(out, record.size);
    put_u32(out, record.size);
    put_u16(out, record.name_len);
    put_u16(out, 0); // extra field length
    put_u16(out, 0); // comment length
    put_u16(out, 0); // disk number start
    put_u16(out, 0); // internal attributes
    put_u32(out, 0); // external attributes
    put_u32(out, record.local_header_offset);
    out.extend_from_slice(record.name);
}

fn write_end_record(out: &mut Vec<u8>, entry_count: u16, size: u32, offset: u32) {
    put_u32(out, END_OF_CENTRAL_DIRECTORY_SIGNATURE);
    put_u16(out, 0); // this disk
    put_u16(out, 0); // disk with central directory
    put_u16(out, entry_count); // entries on this disk
    put_u16(out, entry_count); // total entries
    put_u32(out, size);
    put_u32(out, offset);
    put_u16(out, 0); // comment length
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    const STAMP: DosDateTime = DosDateTime {
        time: 0x6B2F,
        date: 0x586F,
    };

    fn u16_at(bytes: &[u8], at: usize) -> u16 {
        u16::from_le_bytes([bytes[at], bytes[at + 1]])
    }

    fn u32_at(bytes: &[u8], at: usize) -> u32 {
        u32::from_le_bytes([bytes[at], bytes[at + 1], bytes[at + 2], bytes[at + 3]])
    }

    // --- Empty archive ---

    #[test]
    fn empty_archive_is_only_end_record() {
        let archive = build_archive(std::iter::empty(), STAMP).unwrap();
        let bytes = archive.as_bytes();
        assert_eq!(bytes.len(), END_RECORD_LEN);
        assert_eq!(u32_at(bytes, 0), END_OF_CENTRAL_DIRECTORY_SIGNATURE);
        assert_eq!(u16_at(bytes, 8), 0, "entries on disk");
        assert_eq!(u16_at(bytes, 10), 0, "total entries");
        assert_eq!(u32_at(bytes, 12), 0, "central directory size");
        assert_eq!(u32_at(bytes, 16), 0, "central directory offset");
        assert_eq!(u16_at(bytes, 20), 0, "comment length");
    }

    // --- Local header layout ---

    #[test]
    fn local_header_fields_in_order() {
        let archive = build_archive([("abc.txt", &b"abc"[..])], STAMP).unwrap();
        let b = archive.as_bytes();

        assert_eq!(u32_at(b, 0), LOCAL_FILE_HEADER_SIGNATURE);
        assert_eq!(u16_at(b, 4), 20, "version needed");
        assert_eq!(u16_at(b, 6), 0x0800, "utf-8 flag");
        assert_eq!(u16_at(b, 8), 0, "store method");
        assert_eq!(u16_at(b, 10), STAMP.time);
        assert_eq!(u16_at(b, 12), STAMP.date);
        assert_eq!(u32_at(b, 14), 0x3524_41C2, "crc of abc");
        assert_eq!(u32_at(b, 18), 3, "compressed size");
        assert_eq!(u32_at(b, 22), 3, "uncompressed size");
        assert_eq!(u16_at(b, 26), 7, "name length");
        assert_eq!(u16_at(b, 28), 0, "extra length");
        assert_eq!(&b[30..37], b"abc.txt");
        assert_eq!(&b[37..40], b"abc");
    }

    // --- Central directory layout ---

    #[test]
    fn central_record_mirrors_local_header() {
        let archive = build_archive([("abc.txt", &b"abc"[..])], STAMP).unwrap();
        let b = archive.as_bytes();
        let cd = LOCAL_HEADER_LEN + 7 + 3;

        assert_eq!(u32_at(b, cd), CENTRAL_DIRECTORY_SIGNATURE);
        assert_eq!(u16_at(b, cd + 4), 20, "version made by");
        assert_eq!(u16_at(b, cd + 6), 20, "version needed");
        assert_eq!(u16_at(b, cd + 8), 0x0800);
        assert_eq!(u16_at(b, cd + 10), 0);
        assert_eq!(u16_at(b, cd + 12), STAMP.time);
        assert_eq!(u16_at(b, cd + 14), STAMP.date);
        assert_eq!(u32_at(b, cd + 16), 0x3524_41C2);
        assert_eq!(u32_at(b, cd + 20), 3);
        assert_eq!(u32_at(b, cd + 24), 3);
        assert_eq!(u16_at(b, cd + 28), 7);
        assert_eq!(u16_at(b, cd + 30), 0, "extra length");
        assert_eq!(u16_at(b, cd + 32), 0, "comment length");
        assert_eq!(u16_at(b, cd + 34), 0, "disk start");
        assert_eq!(u16_at(b, cd + 36), 0, "internal attributes");
        assert_eq!(u32_at(b, cd + 38), 0, "external attributes");
        assert_eq!(u32_at(b, cd + 42), 0, "local header offset");
        assert_eq!(&b[cd + 46..cd + 53], b"abc.txt");

        let end = cd + CENTRAL_RECORD_LEN + 7;
        assert_eq!(b.len(), end + END_RECORD_LEN);
        assert_eq!(u32_at(b, end), END_OF_CENTRAL_DIRECTORY_SIGNATURE);
        assert_eq!(u16_at(b, end + 8), 1);
        assert_eq!(u16_at(b, end + 10), 1);
        assert_eq!(u32_at(b, end + 12), 53, "central directory size");
        assert_eq!(u32_at(b, end + 16), 40, "central directory offset");
    }

    #[test]
    fn second_entry_offset_follows_first_payload() {
        let archive =
            build_archive([("a", &b"12345"[..]), ("bb", &b""[..])], STAMP).unwrap();
        let b = archive.as_bytes();

        let second_local = LOCAL_HEADER_LEN + 1 + 5;
        assert_eq!(u32_at(b, second_local), LOCAL_FILE_HEADER_SIGNATURE);

        let cd = second_local + LOCAL_HEADER_LEN + 2;
        let second_central = cd + CENTRAL_RECORD_LEN + 1;
        assert_eq!(u32_at(b, cd + 42), 0);
        assert_eq!(u32_at(b, second_central), CENTRAL_DIRECTORY_SIGNATURE);
        assert_eq!(
            u32_at(b, second_central + 42),
            u32::try_from(second_local).unwrap()
        );
        assert_eq!(u32_at(b, second_central + 16), 0, "crc of empty payload");
    }

    #[test]
    fn utf8_names_are_written_verbatim() {
        let name = "café 画像.png";
        let archive = build_archive([(name, &b"x"[..])], STAMP).unwrap();
        let b = archive.as_bytes();
        let len = usize::from(u16_at(b, 26));
        assert_eq!(len, name.len());
        assert_eq!(&b[30..30 + len], name.as_bytes());
    }

    #[test]
    fn duplicate_names_are_kept() {
        let archive =
            build_archive([("same.png", &b"1"[..]), ("same.png", &b"2"[..])], STAMP).unwrap();
        let b = archive.as_bytes();
        let end = b.len() - END_RECORD_LEN;
        assert_eq!(u16_at(b, end + 10), 2);
    }

    // --- Errors ---

    #[test]
    fn overlong_name_is_rejected() {
        let name = "n".repeat(usize::from(u16::MAX) + 1);
        let err = build_archive([(name.as_str(), &b""[..])], STAMP).unwrap_err();
        assert!(matches!(err, ArchiveError::NameTooLong { len, .. } if len == 65_536));
    }

    #[test]
    fn archive_reports_size_and_mime() {
        let archive = build_archive([("a", &b"abc"[..])], STAMP).unwrap();
        assert_eq!(archive.size(), archive.as_bytes().len());
        assert_eq!(archive.mime_type(), "application/zip");
        assert_eq!(archive.clone().into_bytes().len(), archive.size());
    }
}
