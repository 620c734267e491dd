//! UTF-16LE string helpers for the fixed and length-prefixed string fields
//! scattered across the connection PDUs.

use autordp_core::{ReadCursor, WriteCursor};

/// Encodes a string as UTF-16LE bytes, without terminator.
pub fn to_utf16_bytes(value: &str) -> Vec<u8> {
    value
        .encode_utf16()
        .flat_map(|code_unit| code_unit.to_le_bytes())
        .collect()
}

/// Decodes UTF-16LE bytes into a string, replacing unpaired surrogates.
pub fn from_utf16_bytes(mut value: &[u8]) -> String {
    if value.len() % 2 != 0 {
        value = &value[..value.len() - 1];
    }

    let code_units: Vec<u16> = value
        .chunks_exact(2)
        .map(|chunk| u16::from_le_bytes([chunk[0], chunk[1]]))
        .collect();

    String::from_utf16_lossy(&code_units)
}

/// Number of bytes `value` occupies as UTF-16LE, without terminator.
pub fn utf16_len(value: &str) -> usize {
    value.encode_utf16().count() * 2
}

/// Writes `value` into a fixed `total_size`-byte UTF-16LE field, always
/// null-terminated, truncating as necessary.
pub fn write_fixed_utf16_string(dst: &mut WriteCursor<'_>, value: &str, total_size: usize) {
    debug_assert!(total_size % 2 == 0);

    let mut bytes = to_utf16_bytes(value);
    bytes.resize(total_size - 2, 0);
    dst.write_slice(&bytes);
    dst.write_u16(0);
}

/// Reads a fixed `total_size`-byte UTF-16LE field, trimming trailing nulls.
pub fn read_fixed_utf16_string(src: &mut ReadCursor<'_>, total_size: usize) -> String {
    let bytes = src.read_slice(total_size);
    from_utf16_bytes(bytes).trim_end_matches('\u{0}').to_owned()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fixed_field_round_trip() {
        let mut buf = [0u8; 32];
        write_fixed_utf16_string(&mut WriteCursor::new(&mut buf), "workstation", 32);

        let value = read_fixed_utf16_string(&mut ReadCursor::new(&buf), 32);
        assert_eq!(value, "workstation");
    }

    #[test]
    fn overlong_value_is_truncated() {
        let mut buf = [0u8; 8];
        write_fixed_utf16_string(&mut WriteCursor::new(&mut buf), "abcdefgh", 8);

        let value = read_fixed_utf16_string(&mut ReadCursor::new(&buf), 8);
        assert_eq!(value, "abc");
    }
}
