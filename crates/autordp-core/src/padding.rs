use crate::{ReadCursor, WriteCursor};

/// Writes `n` padding bytes (zeroes).
#[inline]
#[track_caller]
pub fn write_padding(dst: &mut WriteCursor<'_>, n: usize) {
    for _ in 0..n {
        dst.write_u8(0);
    }
}

/// Skips `n` padding bytes.
#[inline]
#[track_caller]
pub fn read_padding(src: &mut ReadCursor<'_>, n: usize) {
    src.advance(n);
}
