use autordp_core::{ensure_fixed_part_size, Decode, DecodeResult, Encode, EncodeResult, ReadCursor, WriteCursor};

/// A rectangle with inclusive bounds, as used by `TS_BITMAP_DATA` and friends.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct InclusiveRectangle {
    pub left: u16,
    pub top: u16,
    pub right: u16,
    pub bottom: u16,
}

impl InclusiveRectangle {
    pub const ENCODED_SIZE: usize = 8;

    const NAME: &'static str = "InclusiveRectangle";

    const FIXED_PART_SIZE: usize = Self::ENCODED_SIZE;

    pub fn width(&self) -> u16 {
        self.right - self.left + 1
    }

    pub fn height(&self) -> u16 {
        self.bottom - self.top + 1
    }

    pub fn union(&self, other: &Self) -> Self {
        Self {
            left: self.left.min(other.left),
            top: self.top.min(other.top),
            right: self.right.max(other.right),
            bottom: self.bottom.max(other.bottom),
        }
    }

    /// Intersection of two rectangles, `None` when they do not overlap.
    pub fn intersect(&self, other: &Self) -> Option<Self> {
        let result = Self {
            left: self.left.max(other.left),
            top: self.top.max(other.top),
            right: self.right.min(other.right),
            bottom: self.bottom.min(other.bottom),
        };

        (result.left <= result.right && result.top <= result.bottom).then_some(result)
    }
}

impl Encode for InclusiveRectangle {
    fn encode(&self, dst: &mut WriteCursor<'_>) -> EncodeResult<()> {
        ensure_fixed_part_size!(in: dst);

        dst.write_u16(self.left);
        dst.write_u16(self.top);
        dst.write_u16(self.right);
        dst.write_u16(self.bottom);

        Ok(())
    }

    fn name(&self) -> &'static str {
        Self::NAME
    }

    fn size(&self) -> usize {
        Self::FIXED_PART_SIZE
    }
}

impl<'de> Decode<'de> for InclusiveRectangle {
    fn decode(src: &mut ReadCursor<'de>) -> DecodeResult<Self> {
        ensure_fixed_part_size!(in: src);

        let left = src.read_u16();
        let top = src.read_u16();
        let right = src.read_u16();
        let bottom = src.read_u16();

        Ok(Self {
            left,
            top,
            right,
            bottom,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn union_and_intersect() {
        let a = InclusiveRectangle {
            left: 0,
            top: 0,
            right: 9,
            bottom: 9,
        };
        let b = InclusiveRectangle {
            left: 5,
            top: 5,
            right: 14,
            bottom: 14,
        };

        assert_eq!(
            a.union(&b),
            InclusiveRectangle {
                left: 0,
                top: 0,
                right: 14,
                bottom: 14,
            }
        );
        assert_eq!(
            a.intersect(&b),
            Some(InclusiveRectangle {
                left: 5,
                top: 5,
                right: 9,
                bottom: 9,
            })
        );

        let c = InclusiveRectangle {
            left: 20,
            top: 20,
            right: 21,
            bottom: 21,
        };
        assert_eq!(a.intersect(&c), None);
    }
}
