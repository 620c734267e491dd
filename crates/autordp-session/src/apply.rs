//! Application of decoded updates to the frame buffer and pointer state.

use std::sync::Arc;

use autordp_graphics::color_conversion::{self, Palette};
use autordp_graphics::pointer::DecodedPointer;
use autordp_graphics::rle::{self, RlePixelFormat};
use autordp_pdu::bitmap::{BitmapData, BitmapUpdateData, Compression};
use autordp_pdu::geometry::InclusiveRectangle;
use autordp_pdu::palette::PaletteUpdateData;
use autordp_pdu::pointer::PointerUpdateData;

use crate::image::FrameBuffer;
use crate::pointer::PointerState;
use crate::{SessionResult, UpdateKind};

/// Applies bitmap, palette and pointer updates, holding the session palette
/// and the decode scratch buffers.
pub struct UpdateApplier {
    palette: Palette,
    native_scratch: Vec<u8>,
    rgb_scratch: Vec<u8>,
}

impl Default for UpdateApplier {
    fn default() -> Self {
        Self {
            palette: color_conversion::default_palette(),
            native_scratch: Vec::new(),
            rgb_scratch: Vec::new(),
        }
    }
}

impl UpdateApplier {
    /// Applies every rectangle of a bitmap update in array order and returns
    /// the union of the painted regions.
    pub fn apply_bitmap_update(
        &mut self,
        image: &mut FrameBuffer,
        update: &BitmapUpdateData<'_>,
    ) -> SessionResult<Option<InclusiveRectangle>> {
        let mut painted: Option<InclusiveRectangle> = None;

        for bitmap_data in &update.rectangles {
            trace!(?bitmap_data, "Bitmap rectangle");

            if let Some(region) = self.apply_bitmap_data(image, bitmap_data)? {
                painted = Some(match painted {
                    Some(current) => current.union(&region),
                    None => region,
                });
            }
        }

        Ok(painted)
    }

    fn apply_bitmap_data(
        &mut self,
        image: &mut FrameBuffer,
        bitmap_data: &BitmapData<'_>,
    ) -> SessionResult<Option<InclusiveRectangle>> {
        let width = usize::from(bitmap_data.width);
        let height = usize::from(bitmap_data.height);

        if bitmap_data.compression_flags.contains(Compression::BITMAP_COMPRESSION) {
            if bitmap_data.bits_per_pixel == 32 {
                // 32 bpp rectangles are compressed with the RDP 6.0 bitmap
                // stream, a separate codec this client does not negotiate.
                warn!("Skipping a 32 bpp compressed bitmap rectangle");
                return Ok(None);
            }

            let format = rle::decompress(
                bitmap_data.bitmap_data,
                &mut self.native_scratch,
                width,
                height,
                usize::from(bitmap_data.bits_per_pixel),
            )
            .map_err(|e| custom_err!("bitmap decompression", e))?;

            color_conversion::buffer_to_rgb24(format, &self.native_scratch, &mut self.rgb_scratch, &self.palette);
        } else {
            self.convert_raw(bitmap_data, width, height)?;
        }

        Ok(image.apply_bottom_up_rgb24(&self.rgb_scratch, width, &bitmap_data.rectangle))
    }

    /// Uncompressed bitmap data: bottom-up, left-to-right, whole bytes per
    /// pixel, rows padded to a multiple of four bytes via the width field.
    fn convert_raw(&mut self, bitmap_data: &BitmapData<'_>, width: usize, height: usize) -> SessionResult<()> {
        let format = match bitmap_data.bits_per_pixel {
            8 => RlePixelFormat::Rgb8,
            15 => RlePixelFormat::Rgb15,
            16 => RlePixelFormat::Rgb16,
            24 => RlePixelFormat::Rgb24,
            32 => {
                // Handled separately: four bytes per pixel on the wire.
                let expected = width * height * 4;
                if bitmap_data.bitmap_data.len() < expected {
                    return Err(reason_err!(
                        "raw bitmap",
                        "truncated 32 bpp bitmap: {} of {expected} bytes",
                        bitmap_data.bitmap_data.len()
                    ));
                }

                self.rgb_scratch.clear();
                self.rgb_scratch.reserve(width * height * 3);
                for pixel in bitmap_data.bitmap_data[..expected].chunks_exact(4) {
                    self.rgb_scratch.extend_from_slice(&color_conversion::bgrx32_to_rgb([
                        pixel[0], pixel[1], pixel[2], pixel[3],
                    ]));
                }
                return Ok(());
            }
            bpp => {
                return Err(reason_err!("raw bitmap", "unsupported raw bitmap depth: {bpp} bpp"));
            }
        };

        let expected = width * height * format.bytes_per_pixel();
        if bitmap_data.bitmap_data.len() < expected {
            return Err(reason_err!(
                "raw bitmap",
                "truncated raw bitmap: {} of {expected} bytes",
                bitmap_data.bitmap_data.len()
            ));
        }

        color_conversion::buffer_to_rgb24(
            format,
            &bitmap_data.bitmap_data[..expected],
            &mut self.rgb_scratch,
            &self.palette,
        );

        Ok(())
    }

    pub fn apply_palette(&mut self, update: &PaletteUpdateData) {
        for (slot, entry) in self.palette.iter_mut().zip(update.entries.iter()) {
            *slot = [entry.red, entry.green, entry.blue];
        }
    }

    pub fn apply_pointer_update(
        &mut self,
        pointer: &mut PointerState,
        update: &PointerUpdateData<'_>,
    ) -> SessionResult<UpdateKind> {
        match update {
            PointerUpdateData::SetHidden => {
                pointer.set_hidden();
                Ok(UpdateKind::PointerHidden)
            }
            PointerUpdateData::SetDefault => {
                pointer.set_default();
                Ok(UpdateKind::PointerDefault)
            }
            PointerUpdateData::SetPosition(position) => {
                pointer.set_position(position.x, position.y);
                Ok(UpdateKind::PointerPosition {
                    x: position.x,
                    y: position.y,
                })
            }
            PointerUpdateData::Color(attribute) => {
                let decoded = DecodedPointer::decode_color_pointer_attribute(attribute)
                    .map_err(|e| custom_err!("color pointer decode", e))?;
                pointer.install(attribute.cache_index, Arc::new(decoded))?;
                Ok(UpdateKind::PointerBitmap)
            }
            PointerUpdateData::New(attribute) => {
                let decoded = DecodedPointer::decode_pointer_attribute(attribute)
                    .map_err(|e| custom_err!("new pointer decode", e))?;
                pointer.install(attribute.color_pointer.cache_index, Arc::new(decoded))?;
                Ok(UpdateKind::PointerBitmap)
            }
            PointerUpdateData::Large(attribute) => {
                let decoded = DecodedPointer::decode_large_pointer_attribute(attribute)
                    .map_err(|e| custom_err!("large pointer decode", e))?;
                pointer.install(attribute.cache_index, Arc::new(decoded))?;
                Ok(UpdateKind::PointerBitmap)
            }
            PointerUpdateData::Cached(attribute) => {
                pointer.activate_cached(attribute.cache_index)?;
                Ok(UpdateKind::PointerBitmap)
            }
        }
    }
}
