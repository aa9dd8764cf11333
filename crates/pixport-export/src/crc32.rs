//! CRC-32 checksum as stored in ZIP entry headers.
//!
//! Standard reflected CRC-32 (polynomial `0xEDB88320`), initial value
//! `0xFFFFFFFF`, final value XORed with `0xFFFFFFFF`.  The lookup table
//! is computed at compile time.

/// Reversed representation of the CRC-32 generator polynomial.
const POLYNOMIAL: u32 = 0xEDB8_8320;

/// Byte-at-a-time lookup table derived from [`POLYNOMIAL`].
const TABLE: [u32; 256] = build_table();

const fn build_table() -> [u32; 256] {
    let mut table = [0u32; 256];
    let mut i = 0;
    while i < 256 {
        #[allow(clippy::cast_possible_truncation)]
        let mut crc = i as u32;
        let mut bit = 0;
        while bit < 8 {
            crc = if crc & 1 == 1 {
                (crc >> 1) ^ POLYNOMIAL
            } else {
                crc >> 1
            };
            bit += 1;
        }
        table[i] = crc;
        i += 1;
    }
    table
}

/// CRC-32 of `bytes`.
#[must_use]
pub fn crc32(bytes: &[u8]) -> u32 {
    let state = bytes.iter().fold(0xFFFF_FFFF_u32, |state, &byte| {
        TABLE[((state ^ u32::from(byte)) & 0xFF) as usize] ^ (state >> 8)
    });
    state ^ 0xFFFF_FFFF
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_input_is_zero() {
        assert_eq!(crc32(&[]), 0);
    }

    #[test]
    fn abc_matches_reference_value() {
        assert_eq!(crc32(&[0x61, 0x62, 0x63]), 0x3524_41C2);
    }

    #[test]
    fn check_string_matches_catalogue_value() {
        // "123456789" is the standard CRC catalogue check input.
        assert_eq!(crc32(b"123456789"), 0xCBF4_3926);
    }

    #[test]
    fn pangram_matches_reference_value() {
        assert_eq!(crc32(b"The quick brown fox jumps over the lazy dog"), 0x414F_A339);
    }

    #[test]
    fn table_edges() {
        assert_eq!(TABLE[0], 0);
        assert_eq!(TABLE[1], 0x7707_3096);
        assert_eq!(TABLE[255], 0x2D02_EF8D);
    }
}
