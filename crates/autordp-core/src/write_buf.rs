/// Growable byte buffer keeping track of the filled region.
///
/// Unlike `Vec<u8>`, the unfilled region can be borrowed as an initialized
/// `&mut [u8]` for in-place encoding without prior zero-filling at each call
/// site.
#[derive(Debug, Default)]
pub struct WriteBuf {
    inner: Vec<u8>,
    filled: usize,
}

impl WriteBuf {
    /// Creates a new, empty `WriteBuf`.
    pub fn new() -> Self {
        Self::default()
    }

    /// Clears the filled region, keeping the allocation.
    pub fn clear(&mut self) {
        self.filled = 0;
    }

    /// Number of filled bytes.
    pub fn filled_len(&self) -> usize {
        self.filled
    }

    /// The filled region.
    pub fn filled(&self) -> &[u8] {
        &self.inner[..self.filled]
    }

    /// Returns a mutable slice of at least `size` unfilled bytes, growing the
    /// underlying storage as required.
    pub fn unfilled_to(&mut self, size: usize) -> &mut [u8] {
        let required = self.filled + size;
        if self.inner.len() < required {
            self.inner.resize(required, 0);
        }
        &mut self.inner[self.filled..self.filled + size]
    }

    /// Marks `len` additional bytes as filled.
    pub fn advance(&mut self, len: usize) {
        debug_assert!(self.filled + len <= self.inner.len());
        self.filled += len;
    }

    /// Appends a byte slice to the filled region.
    pub fn write_slice(&mut self, slice: &[u8]) {
        self.unfilled_to(slice.len()).copy_from_slice(slice);
        self.advance(slice.len());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn grows_and_tracks_filled_region() {
        let mut buf = WriteBuf::new();
        assert_eq!(buf.filled_len(), 0);

        buf.unfilled_to(4).copy_from_slice(&[1, 2, 3, 4]);
        buf.advance(4);
        buf.write_slice(&[5, 6]);
        assert_eq!(buf.filled(), &[1, 2, 3, 4, 5, 6]);

        buf.clear();
        assert_eq!(buf.filled_len(), 0);
        buf.write_slice(&[9]);
        assert_eq!(buf.filled(), &[9]);
    }
}
