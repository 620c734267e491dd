//! Fast-path output dispatch.
//!
//! One fast-path PDU carries any number of update PDUs; updates are applied
//! in array order, so later rectangles overwrite earlier ones. Fragmented
//! updates are reassembled across PDUs before being dispatched.

use autordp_core::{decode_cursor, ReadCursor};
use autordp_pdu::fast_path::{FastPathHeader, FastPathUpdate, FastPathUpdatePdu, Fragmentation, UpdateCode};

use crate::apply::UpdateApplier;
use crate::image::FrameBuffer;
use crate::pointer::PointerState;
use crate::{SessionErrorExt as _, SessionResult, UpdateKind};

/// Processor for inbound fast-path PDUs.
#[derive(Default)]
pub struct Processor {
    complete_data: CompleteData,
}

impl Processor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Processes one whole fast-path PDU, applying every contained update.
    pub fn process(
        &mut self,
        applier: &mut UpdateApplier,
        image: &mut FrameBuffer,
        pointer: &mut PointerState,
        input: &[u8],
    ) -> SessionResult<Vec<UpdateKind>> {
        let mut src = ReadCursor::new(input);

        let header: FastPathHeader = decode_cursor(&mut src).map_err(crate::SessionError::decode)?;
        trace!(fast_path_header = ?header, "Received fast-path PDU");

        let mut updates = Vec::new();

        while !src.is_empty() {
            let update_pdu: FastPathUpdatePdu<'_> = decode_cursor(&mut src).map_err(crate::SessionError::decode)?;
            trace!(update_code = ?update_pdu.update_code, fragmentation = ?update_pdu.fragmentation, "Update PDU");

            let update_code = update_pdu.update_code;

            let Some(data) = self.complete_data.process_data(update_pdu.data, update_pdu.fragmentation) else {
                continue;
            };

            let update =
                FastPathUpdate::decode_with_code(&data, update_code).map_err(crate::SessionError::decode)?;

            updates.push(self.apply(applier, image, pointer, update_code, &update)?);
        }

        Ok(updates)
    }

    fn apply(
        &mut self,
        applier: &mut UpdateApplier,
        image: &mut FrameBuffer,
        pointer: &mut PointerState,
        update_code: UpdateCode,
        update: &FastPathUpdate<'_>,
    ) -> SessionResult<UpdateKind> {
        match update {
            FastPathUpdate::Orders(data) => {
                debug!(length = data.len(), "Ignoring a drawing orders update");
                Ok(UpdateKind::None)
            }
            FastPathUpdate::Bitmap(bitmap_update) => {
                let painted = applier.apply_bitmap_update(image, bitmap_update)?;
                Ok(painted.map(UpdateKind::Region).unwrap_or(UpdateKind::None))
            }
            FastPathUpdate::Palette(palette_update) => {
                applier.apply_palette(palette_update);
                Ok(UpdateKind::None)
            }
            FastPathUpdate::Synchronize => Ok(UpdateKind::None),
            FastPathUpdate::Pointer(pointer_update) => applier.apply_pointer_update(pointer, pointer_update),
            FastPathUpdate::Unsupported(_) => {
                warn!(?update_code, "Received an unsupported fast-path update");
                Ok(UpdateKind::None)
            }
        }
    }
}

/// Reassembly of fragmented fast-path updates.
#[derive(Debug, Default, PartialEq)]
struct CompleteData {
    fragmented_data: Option<Vec<u8>>,
}

impl CompleteData {
    fn process_data(&mut self, data: &[u8], fragmentation: Fragmentation) -> Option<Vec<u8>> {
        match fragmentation {
            Fragmentation::Single => {
                self.check_data_is_empty();

                Some(data.to_vec())
            }
            Fragmentation::First => {
                self.check_data_is_empty();

                self.fragmented_data = Some(data.to_vec());

                None
            }
            Fragmentation::Next => {
                self.append_data(data);

                None
            }
            Fragmentation::Last => {
                self.append_data(data);

                self.fragmented_data.take()
            }
        }
    }

    fn check_data_is_empty(&mut self) {
        if self.fragmented_data.is_some() {
            warn!("Skipping a pending fragmented fast-path update");
            self.fragmented_data = None;
        }
    }

    fn append_data(&mut self, data: &[u8]) {
        if let Some(fragmented_data) = self.fragmented_data.as_mut() {
            fragmented_data.extend_from_slice(data);
        } else {
            warn!("Next-fragment update without a prior first fragment");
        }
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use autordp_core::{encode_cursor, encode_vec, Encode, WriteCursor};
    use autordp_pdu::bitmap::{BitmapData, BitmapUpdateData, Compression};
    use autordp_pdu::geometry::InclusiveRectangle;

    use super::*;

    pub(crate) fn build_fast_path_frame(updates: &[(UpdateCode, Vec<u8>)]) -> Vec<u8> {
        let pdus: Vec<FastPathUpdatePdu<'_>> = updates
            .iter()
            .map(|(code, data)| FastPathUpdatePdu {
                fragmentation: Fragmentation::Single,
                update_code: *code,
                data,
            })
            .collect();

        let data_length = pdus.iter().map(Encode::size).sum::<usize>();
        let header = FastPathHeader::new(data_length);

        let mut frame = vec![0u8; header.size() + data_length];
        let mut cursor = WriteCursor::new(&mut frame);
        encode_cursor(&header, &mut cursor).unwrap();
        for pdu in &pdus {
            encode_cursor(pdu, &mut cursor).unwrap();
        }

        frame
    }

    fn bitmap_update_bytes(rect: InclusiveRectangle, width: u16, height: u16, rgb_byte: u8) -> Vec<u8> {
        let payload = vec![rgb_byte; usize::from(width) * usize::from(height) * 3];
        let update = BitmapUpdateData {
            rectangles: vec![BitmapData {
                rectangle: rect,
                width,
                height,
                bits_per_pixel: 24,
                compression_flags: Compression::empty(),
                compressed_data_header: None,
                bitmap_data: &payload,
            }],
        };
        encode_vec(&update).unwrap()
    }

    #[test]
    fn single_frame_with_bitmap_and_pointer_updates() {
        let mut processor = Processor::new();
        let mut applier = UpdateApplier::default();
        let mut image = FrameBuffer::new(8, 8);
        let mut pointer = PointerState::new(25);

        let rect_a = InclusiveRectangle {
            left: 0,
            top: 0,
            right: 3,
            bottom: 3,
        };
        let rect_b = InclusiveRectangle {
            left: 2,
            top: 2,
            right: 5,
            bottom: 5,
        };

        let frame = build_fast_path_frame(&[
            (UpdateCode::Bitmap, bitmap_update_bytes(rect_a, 4, 4, 0x11)),
            (UpdateCode::PositionPointer, vec![0x0A, 0x00, 0x14, 0x00]),
            (UpdateCode::Bitmap, bitmap_update_bytes(rect_b, 4, 4, 0x22)),
        ]);

        let updates = processor
            .process(&mut applier, &mut image, &mut pointer, &frame)
            .unwrap();

        assert_eq!(updates.len(), 3);
        assert!(matches!(updates[0], UpdateKind::Region(_)));
        assert_eq!(updates[1], UpdateKind::PointerPosition { x: 10, y: 20 });
        assert!(matches!(updates[2], UpdateKind::Region(_)));

        assert_eq!(pointer.position(), (10, 20));

        // Rect B was applied after rect A in the overlap.
        let px = |x: usize, y: usize| image.data()[(y * 8 + x) * 3];
        assert_eq!(px(0, 0), 0x11);
        assert_eq!(px(2, 2), 0x22);
        assert_eq!(px(5, 5), 0x22);
    }

    #[test]
    fn fragmented_update_is_reassembled() {
        let mut processor = Processor::new();
        let mut applier = UpdateApplier::default();
        let mut image = FrameBuffer::new(4, 1);
        let mut pointer = PointerState::new(25);

        let rect = InclusiveRectangle {
            left: 0,
            top: 0,
            right: 3,
            bottom: 0,
        };
        let update_bytes = bitmap_update_bytes(rect, 4, 1, 0x77);
        let (first, last) = update_bytes.split_at(update_bytes.len() / 2);

        let make_frame = |fragmentation, data: &[u8]| {
            let pdu = FastPathUpdatePdu {
                fragmentation,
                update_code: UpdateCode::Bitmap,
                data,
            };
            let header = FastPathHeader::new(pdu.size());
            let mut frame = vec![0u8; header.size() + pdu.size()];
            let mut cursor = WriteCursor::new(&mut frame);
            encode_cursor(&header, &mut cursor).unwrap();
            encode_cursor(&pdu, &mut cursor).unwrap();
            frame
        };

        let updates = processor
            .process(&mut applier, &mut image, &mut pointer, &make_frame(Fragmentation::First, first))
            .unwrap();
        assert!(updates.is_empty());

        let updates = processor
            .process(&mut applier, &mut image, &mut pointer, &make_frame(Fragmentation::Last, last))
            .unwrap();
        assert_eq!(updates.len(), 1);
        assert!(matches!(updates[0], UpdateKind::Region(_)));
        assert_eq!(image.data()[0], 0x77);
    }

    #[test]
    fn cached_pointer_without_prior_new_fails() {
        let mut processor = Processor::new();
        let mut applier = UpdateApplier::default();
        let mut image = FrameBuffer::new(4, 4);
        let mut pointer = PointerState::new(25);

        let frame = build_fast_path_frame(&[(UpdateCode::CachedPointer, vec![0x07, 0x00])]);

        let error = processor
            .process(&mut applier, &mut image, &mut pointer, &frame)
            .unwrap_err();
        assert!(error.to_string().contains("never filled"));
    }
}
