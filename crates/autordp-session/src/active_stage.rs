//! The active stage: everything after the Font Map PDU.

use autordp_connector::ConnectionResult;
use autordp_pdu::geometry::InclusiveRectangle;
use autordp_pdu::mcs::DisconnectReason;
use autordp_pdu::Action;

use crate::apply::UpdateApplier;
use crate::image::FrameBuffer;
use crate::pointer::PointerState;
use crate::x224::X224Outcome;
use crate::{fast_path, x224, SessionResult, UpdateKind};

/// Why the session ended without an error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GracefulDisconnectReason {
    DisconnectProviderUltimatum(DisconnectReason),
}

impl core::fmt::Display for GracefulDisconnectReason {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::DisconnectProviderUltimatum(reason) => write!(f, "{reason}"),
        }
    }
}

/// What processing one inbound frame produced.
#[derive(Debug)]
pub enum ActiveStageOutput {
    /// The frame buffer changed inside this region.
    GraphicsUpdate(InclusiveRectangle),
    PointerHidden,
    PointerDefault,
    PointerPosition { x: u16, y: u16 },
    /// The active pointer image changed (new or cached).
    PointerBitmap,
    Terminate(GracefulDisconnectReason),
}

/// Owns the per-session processors and dispatches one inbound frame at a time.
pub struct ActiveStage {
    fast_path_processor: fast_path::Processor,
    x224_processor: x224::Processor,
    applier: UpdateApplier,
}

impl ActiveStage {
    pub fn new(connection_result: &ConnectionResult) -> Self {
        Self {
            fast_path_processor: fast_path::Processor::new(),
            x224_processor: x224::Processor::new(connection_result.io_channel_id),
            applier: UpdateApplier::default(),
        }
    }

    /// Processes a frame received from the server, applying its updates to
    /// `image` and `pointer` in reception order.
    ///
    /// A single returned `GraphicsUpdate` covers every bitmap rectangle of
    /// the frame, so callers can account one buffer version per frame.
    pub fn process(
        &mut self,
        image: &mut FrameBuffer,
        pointer: &mut PointerState,
        action: Action,
        frame: &[u8],
    ) -> SessionResult<Vec<ActiveStageOutput>> {
        let updates = match action {
            Action::FastPath => self
                .fast_path_processor
                .process(&mut self.applier, image, pointer, frame)?,
            Action::X224 => match self.x224_processor.process(&mut self.applier, image, pointer, frame)? {
                X224Outcome::Updates(updates) => updates,
                X224Outcome::Disconnect(reason) => {
                    return Ok(vec![ActiveStageOutput::Terminate(
                        GracefulDisconnectReason::DisconnectProviderUltimatum(reason),
                    )])
                }
                X224Outcome::Nothing => Vec::new(),
            },
        };

        let mut outputs = Vec::new();
        let mut painted: Option<InclusiveRectangle> = None;

        for update in updates {
            match update {
                UpdateKind::None => {}
                UpdateKind::Region(region) => {
                    painted = Some(match painted {
                        Some(current) => current.union(&region),
                        None => region,
                    });
                }
                UpdateKind::PointerHidden => outputs.push(ActiveStageOutput::PointerHidden),
                UpdateKind::PointerDefault => outputs.push(ActiveStageOutput::PointerDefault),
                UpdateKind::PointerPosition { x, y } => outputs.push(ActiveStageOutput::PointerPosition { x, y }),
                UpdateKind::PointerBitmap => outputs.push(ActiveStageOutput::PointerBitmap),
            }
        }

        if let Some(region) = painted {
            outputs.push(ActiveStageOutput::GraphicsUpdate(region));
        }

        Ok(outputs)
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use autordp_connector::DesktopSize;
    use autordp_core::encode_vec;
    use autordp_pdu::bitmap::{BitmapData, BitmapUpdateData, Compression};
    use autordp_pdu::fast_path::UpdateCode;

    use super::*;

    fn connection_result() -> ConnectionResult {
        ConnectionResult {
            io_channel_id: 1003,
            user_channel_id: 1007,
            static_channels: HashMap::new(),
            desktop_size: DesktopSize { width: 8, height: 8 },
            share_id: 66538,
            fastpath_input: true,
            pointer_cache_size: 25,
        }
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
    fn interleaved_bitmap_and_pointer_yield_one_graphics_update() {
        let connection_result = connection_result();
        let mut stage = ActiveStage::new(&connection_result);
        let mut image = FrameBuffer::new(8, 8);
        let mut pointer = PointerState::new(25);

        let rect_a = InclusiveRectangle {
            left: 0,
            top: 0,
            right: 3,
            bottom: 3,
        };
        let rect_b = InclusiveRectangle {
            left: 4,
            top: 4,
            right: 7,
            bottom: 7,
        };

        let frame = crate::fast_path::tests::build_fast_path_frame(&[
            (UpdateCode::Bitmap, bitmap_update_bytes(rect_a, 4, 4, 0x11)),
            (UpdateCode::PositionPointer, vec![0x0A, 0x00, 0x14, 0x00]),
            (UpdateCode::Bitmap, bitmap_update_bytes(rect_b, 4, 4, 0x22)),
        ]);

        let outputs = stage
            .process(&mut image, &mut pointer, Action::FastPath, &frame)
            .unwrap();

        // One pointer position output, then exactly one graphics update for
        // the whole frame.
        assert_eq!(outputs.len(), 2);
        assert!(matches!(outputs[0], ActiveStageOutput::PointerPosition { x: 10, y: 20 }));
        let ActiveStageOutput::GraphicsUpdate(region) = &outputs[1] else {
            panic!("expected a graphics update");
        };
        assert_eq!(
            *region,
            InclusiveRectangle {
                left: 0,
                top: 0,
                right: 7,
                bottom: 7,
            }
        );
    }
}
