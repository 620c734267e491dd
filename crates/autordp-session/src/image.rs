//! The client-side view of the remote desktop: a packed RGB24 buffer.

use autordp_pdu::geometry::InclusiveRectangle;

/// A `width × height × 3` RGB framebuffer, rows top-down.
///
/// The buffer keeps the size declared at connection for its whole life;
/// incoming rectangles are clamped to it.
pub struct FrameBuffer {
    width: u16,
    height: u16,
    data: Vec<u8>,
}

impl FrameBuffer {
    const BYTES_PER_PIXEL: usize = 3;

    pub fn new(width: u16, height: u16) -> Self {
        let len = usize::from(width) * usize::from(height) * Self::BYTES_PER_PIXEL;

        Self {
            width,
            height,
            data: vec![0; len],
        }
    }

    pub fn width(&self) -> u16 {
        self.width
    }

    pub fn height(&self) -> u16 {
        self.height
    }

    pub fn data(&self) -> &[u8] {
        &self.data
    }

    /// Paints a decoded bitmap into the buffer.
    ///
    /// `src` holds `src_width × src_height` RGB24 pixels in bottom-up row
    /// order, as produced by the wire decoders. The destination area is
    /// `rect`, clamped against the buffer bounds; source pixels outside the
    /// clamp are dropped. Returns the region actually painted.
    pub fn apply_bottom_up_rgb24(
        &mut self,
        src: &[u8],
        src_width: usize,
        rect: &InclusiveRectangle,
    ) -> Option<InclusiveRectangle> {
        if src_width == 0 {
            return None;
        }

        let src_height = src.len() / (src_width * Self::BYTES_PER_PIXEL);

        let dst_left = usize::from(rect.left);
        let dst_top = usize::from(rect.top);

        if dst_left >= usize::from(self.width) || dst_top >= usize::from(self.height) || src_height == 0 {
            return None;
        }

        let dst_right = usize::from(rect.right).min(usize::from(self.width) - 1);
        let dst_bottom = usize::from(rect.bottom)
            .min(usize::from(self.height) - 1)
            .min(dst_top + src_height - 1);

        if dst_right < dst_left || dst_bottom < dst_top {
            return None;
        }

        let copy_width = (dst_right - dst_left + 1).min(src_width);

        let dst_stride = usize::from(self.width) * Self::BYTES_PER_PIXEL;
        let src_stride = src_width * Self::BYTES_PER_PIXEL;

        for dst_y in dst_top..=dst_bottom {
            // Source rows are stored bottom-up relative to the rectangle.
            let src_row = dst_top + src_height - 1 - dst_y;

            let src_start = src_row * src_stride;
            let dst_start = dst_y * dst_stride + dst_left * Self::BYTES_PER_PIXEL;
            let byte_count = copy_width * Self::BYTES_PER_PIXEL;

            self.data[dst_start..dst_start + byte_count].copy_from_slice(&src[src_start..src_start + byte_count]);
        }

        Some(InclusiveRectangle {
            left: rect.left,
            top: rect.top,
            right: dst_right as u16,
            bottom: dst_bottom as u16,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rgb(pixels: &[[u8; 3]]) -> Vec<u8> {
        pixels.iter().flatten().copied().collect()
    }

    #[test]
    fn paints_rect_with_bottom_up_source() {
        let mut buffer = FrameBuffer::new(4, 4);

        // 2×2 source: bottom row [R, G], top row [B, W].
        let src = rgb(&[[255, 0, 0], [0, 255, 0], [0, 0, 255], [255, 255, 255]]);

        let rect = InclusiveRectangle {
            left: 1,
            top: 1,
            right: 2,
            bottom: 2,
        };

        let applied = buffer.apply_bottom_up_rgb24(&src, 2, &rect).unwrap();
        assert_eq!(applied, rect);

        let px = |x: usize, y: usize| {
            let start = (y * 4 + x) * 3;
            [buffer.data()[start], buffer.data()[start + 1], buffer.data()[start + 2]]
        };

        assert_eq!(px(1, 1), [0, 0, 255]);
        assert_eq!(px(2, 1), [255, 255, 255]);
        assert_eq!(px(1, 2), [255, 0, 0]);
        assert_eq!(px(2, 2), [0, 255, 0]);
        assert_eq!(px(0, 0), [0, 0, 0]);
        assert_eq!(px(3, 3), [0, 0, 0]);
    }

    #[test]
    fn clamps_rect_to_buffer_bounds() {
        let mut buffer = FrameBuffer::new(4, 4);

        // 4×1 source row.
        let src = rgb(&[[1, 1, 1], [2, 2, 2], [3, 3, 3], [4, 4, 4]]);

        let rect = InclusiveRectangle {
            left: 2,
            top: 3,
            right: 5,
            bottom: 3,
        };

        let applied = buffer.apply_bottom_up_rgb24(&src, 4, &rect).unwrap();
        assert_eq!(
            applied,
            InclusiveRectangle {
                left: 2,
                top: 3,
                right: 3,
                bottom: 3,
            }
        );

        assert_eq!(&buffer.data()[(3 * 4 + 2) * 3..(3 * 4 + 4) * 3], rgb(&[[1, 1, 1], [2, 2, 2]]));
    }

    #[test]
    fn out_of_bounds_rect_is_dropped() {
        let mut buffer = FrameBuffer::new(4, 4);
        let src = rgb(&[[9, 9, 9]]);

        let rect = InclusiveRectangle {
            left: 10,
            top: 0,
            right: 10,
            bottom: 0,
        };

        assert!(buffer.apply_bottom_up_rgb24(&src, 1, &rect).is_none());
    }

    #[test]
    fn later_rectangles_overwrite_earlier_ones() {
        let mut buffer = FrameBuffer::new(2, 1);

        let rect = InclusiveRectangle {
            left: 0,
            top: 0,
            right: 1,
            bottom: 0,
        };

        buffer.apply_bottom_up_rgb24(&rgb(&[[1, 1, 1], [1, 1, 1]]), 2, &rect).unwrap();
        buffer.apply_bottom_up_rgb24(&rgb(&[[2, 2, 2], [2, 2, 2]]), 2, &rect).unwrap();

        assert_eq!(buffer.data(), rgb(&[[2, 2, 2], [2, 2, 2]]));
    }
}
