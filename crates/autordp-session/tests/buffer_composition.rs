//! Composition properties of the frame buffer: applying rectangles in
//! reception order equals naive over-painting, and disjoint rectangles
//! commute.

use proptest::prelude::*;

use autordp_pdu::geometry::InclusiveRectangle;
use autordp_session::image::FrameBuffer;

const WIDTH: u16 = 16;
const HEIGHT: u16 = 16;

#[derive(Debug, Clone)]
struct Patch {
    rect: InclusiveRectangle,
    color: [u8; 3],
}

fn patch_strategy() -> impl Strategy<Value = Patch> {
    (0u16..WIDTH, 0u16..HEIGHT, 1u16..=6, 1u16..=6, any::<[u8; 3]>()).prop_map(|(left, top, w, h, color)| Patch {
        rect: InclusiveRectangle {
            left,
            top,
            right: left + w - 1,
            bottom: top + h - 1,
        },
        color,
    })
}

fn bottom_up_fill(patch: &Patch) -> Vec<u8> {
    let width = usize::from(patch.rect.width());
    let height = usize::from(patch.rect.height());
    patch.color.repeat(width * height)
}

fn apply_all(patches: &[Patch]) -> Vec<u8> {
    let mut buffer = FrameBuffer::new(WIDTH, HEIGHT);
    for patch in patches {
        buffer.apply_bottom_up_rgb24(&bottom_up_fill(patch), usize::from(patch.rect.width()), &patch.rect);
    }
    buffer.data().to_vec()
}

/// The reference model: paint pixel by pixel, clipping manually.
fn paint_reference(patches: &[Patch]) -> Vec<u8> {
    let mut data = vec![0u8; usize::from(WIDTH) * usize::from(HEIGHT) * 3];

    for patch in patches {
        for y in patch.rect.top..=patch.rect.bottom.min(HEIGHT - 1) {
            for x in patch.rect.left..=patch.rect.right.min(WIDTH - 1) {
                let start = (usize::from(y) * usize::from(WIDTH) + usize::from(x)) * 3;
                data[start..start + 3].copy_from_slice(&patch.color);
            }
        }
    }

    data
}

fn disjoint(a: &InclusiveRectangle, b: &InclusiveRectangle) -> bool {
    a.intersect(b).is_none()
}

proptest! {
    #[test]
    fn ordered_application_equals_over_painting(patches in proptest::collection::vec(patch_strategy(), 1..12)) {
        prop_assert_eq!(apply_all(&patches), paint_reference(&patches));
    }

    #[test]
    fn disjoint_rectangles_commute(patches in proptest::collection::vec(patch_strategy(), 2..8)) {
        // Keep only patches that do not overlap any earlier patch.
        let mut kept: Vec<Patch> = Vec::new();
        for patch in patches {
            if kept.iter().all(|existing| disjoint(&existing.rect, &patch.rect)) {
                kept.push(patch);
            }
        }
        prop_assume!(kept.len() >= 2);

        let forward = apply_all(&kept);

        let mut reversed = kept.clone();
        reversed.reverse();
        let backward = apply_all(&reversed);

        prop_assert_eq!(forward, backward);
    }
}
