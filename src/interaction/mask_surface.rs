// SPDX-License-Identifier: MPL-2.0
//! Freehand mask painting surface.
//!
//! The surface matches the displayed image box, not the image's natural
//! size. Mask buffers coming back from the session are scaled onto it, and
//! the raster operations scale committed masks to the base image again.

use crate::domain::media::EncodedImage;
use crate::domain::session::{BrushSize, MaskMode};
use crate::media::codec::{decode_to_surface, encode_surface, new_surface};
use crate::media::RasterError;
use tiny_skia::{
    BlendMode, Color, FilterQuality, LineCap, LineJoin, Paint, PathBuilder, Pixmap, PixmapPaint,
    Stroke, Transform,
};

/// Paint/erase layer tracking one stroke at a time.
pub struct MaskSurface {
    pixmap: Pixmap,
    mode: MaskMode,
    brush: BrushSize,
    last_point: Option<(f32, f32)>,
    /// The mask buffer the surface currently reflects.
    shown: Option<EncodedImage>,
}

impl std::fmt::Debug for MaskSurface {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MaskSurface")
            .field("width", &self.pixmap.width())
            .field("height", &self.pixmap.height())
            .field("mode", &self.mode)
            .field("brush", &self.brush)
            .field("stroking", &self.last_point.is_some())
            .finish_non_exhaustive()
    }
}

impl MaskSurface {
    /// Creates an empty surface of the displayed image size.
    ///
    /// # Errors
    ///
    /// Returns [`RasterError::SurfaceUnavailable`] for zero dimensions.
    pub fn new(width: u32, height: u32) -> Result<Self, RasterError> {
        Ok(Self {
            pixmap: new_surface(width, height)?,
            mode: MaskMode::Off,
            brush: BrushSize::default(),
            last_point: None,
            shown: None,
        })
    }

    #[must_use]
    pub fn dimensions(&self) -> (u32, u32) {
        (self.pixmap.width(), self.pixmap.height())
    }

    #[must_use]
    pub fn is_stroking(&self) -> bool {
        self.last_point.is_some()
    }

    /// Sets the active tool. Switching to [`MaskMode::Off`] abandons any
    /// stroke in progress.
    pub fn set_tool(&mut self, mode: MaskMode, brush: BrushSize) {
        self.mode = mode;
        self.brush = brush;
        if mode == MaskMode::Off {
            self.last_point = None;
        }
    }

    /// Follows a change of the displayed image size and redraws the current
    /// mask at the new size.
    ///
    /// # Errors
    ///
    /// Returns [`RasterError`] if the new surface or the redraw fails.
    pub fn resize(&mut self, width: u32, height: u32) -> Result<(), RasterError> {
        if (width, height) == self.dimensions() {
            return Ok(());
        }
        self.pixmap = new_surface(width, height)?;
        self.last_point = None;
        if let Some(mask) = self.shown.clone() {
            self.draw_scaled(&mask)?;
        }
        Ok(())
    }

    /// Mirrors the session's mask buffer.
    ///
    /// `None` clears the surface. A buffer other than the one already shown
    /// is redrawn scaled to the surface.
    ///
    /// # Errors
    ///
    /// Returns [`RasterError`] if the buffer cannot be decoded.
    pub fn sync_mask(&mut self, mask: Option<&EncodedImage>) -> Result<(), RasterError> {
        match mask {
            None => {
                self.pixmap.fill(Color::TRANSPARENT);
                self.shown = None;
            }
            Some(mask) => {
                if self.shown.as_ref().is_some_and(|shown| shown.same_buffer(mask)) {
                    return Ok(());
                }
                self.pixmap.fill(Color::TRANSPARENT);
                self.draw_scaled(mask)?;
                self.shown = Some(mask.clone());
            }
        }
        Ok(())
    }

    fn draw_scaled(&mut self, mask: &EncodedImage) -> Result<(), RasterError> {
        let source = decode_to_surface(mask)?;
        let scale_x = self.pixmap.width() as f32 / source.width() as f32;
        let scale_y = self.pixmap.height() as f32 / source.height() as f32;
        self.pixmap.draw_pixmap(
            0,
            0,
            source.as_ref(),
            &PixmapPaint {
                quality: FilterQuality::Bilinear,
                ..PixmapPaint::default()
            },
            Transform::from_scale(scale_x, scale_y),
            None,
        );
        Ok(())
    }

    /// Begins a stroke. Returns `false` when no tool is active.
    pub fn pointer_down(&mut self, x: f32, y: f32) -> bool {
        if self.mode == MaskMode::Off {
            return false;
        }
        self.last_point = Some((x, y));
        true
    }

    /// Extends the current stroke with a round-capped segment.
    pub fn pointer_move(&mut self, x: f32, y: f32) {
        let Some((last_x, last_y)) = self.last_point else {
            return;
        };

        let mut builder = PathBuilder::new();
        builder.move_to(last_x, last_y);
        builder.line_to(x, y);
        if let Some(path) = builder.finish() {
            let mut paint = Paint::default();
            paint.set_color(Color::WHITE);
            paint.anti_alias = true;
            paint.blend_mode = match self.mode {
                MaskMode::Erase => BlendMode::DestinationOut,
                MaskMode::Draw | MaskMode::Off => BlendMode::SourceOver,
            };
            let stroke = Stroke {
                width: self.brush.as_stroke_width(),
                line_cap: LineCap::Round,
                line_join: LineJoin::Round,
                ..Stroke::default()
            };
            self.pixmap
                .stroke_path(&path, &paint, &stroke, Transform::identity(), None);
        }
        self.last_point = Some((x, y));
    }

    /// Ends the stroke and encodes the surface.
    ///
    /// Returns the buffer to commit as the new mask image, or `None` when
    /// no stroke was in progress.
    ///
    /// # Errors
    ///
    /// Returns [`RasterError::Encode`] if encoding fails. The stroke is
    /// still ended.
    pub fn pointer_up(&mut self) -> Result<Option<EncodedImage>, RasterError> {
        if self.last_point.take().is_none() {
            return Ok(None);
        }
        let encoded = encode_surface(&self.pixmap)?;
        self.shown = Some(encoded.clone());
        Ok(Some(encoded))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::media::codec::test_images::pixels;

    fn painted(mode: MaskMode) -> MaskSurface {
        let mut surface = MaskSurface::new(64, 32).expect("surface");
        surface.set_tool(mode, BrushSize::new(10));
        surface
    }

    fn stroke(surface: &mut MaskSurface, from: (f32, f32), to: (f32, f32)) -> EncodedImage {
        assert!(surface.pointer_down(from.0, from.1));
        surface.pointer_move(to.0, to.1);
        surface
            .pointer_up()
            .expect("encode")
            .expect("stroke was running")
    }

    #[test]
    fn draw_paints_opaque_white_along_the_stroke() {
        let mut surface = painted(MaskMode::Draw);
        let mask = stroke(&mut surface, (10.0, 16.0), (50.0, 16.0));
        assert_eq!(mask.dimensions(), (64, 32));

        let px = pixels(&mask);
        assert_eq!(px.get_pixel(30, 16).0, [255, 255, 255, 255]);
        assert_eq!(px.get_pixel(30, 2).0[3], 0);
    }

    #[test]
    fn erase_punches_holes() {
        let mut surface = painted(MaskMode::Draw);
        stroke(&mut surface, (5.0, 16.0), (60.0, 16.0));
        surface.set_tool(MaskMode::Erase, BrushSize::new(20));
        let mask = stroke(&mut surface, (32.0, 0.0), (32.0, 31.0));

        let px = pixels(&mask);
        assert_eq!(px.get_pixel(32, 16).0[3], 0);
        assert_eq!(px.get_pixel(10, 16).0[3], 255);
    }

    #[test]
    fn inactive_tool_ignores_pointer() {
        let mut surface = painted(MaskMode::Off);
        assert!(!surface.pointer_down(1.0, 1.0));
        surface.pointer_move(20.0, 20.0);
        assert_eq!(surface.pointer_up().expect("no encode"), None);
    }

    #[test]
    fn turning_tool_off_abandons_stroke() {
        let mut surface = painted(MaskMode::Draw);
        surface.pointer_down(1.0, 1.0);
        surface.set_tool(MaskMode::Off, BrushSize::default());
        assert!(!surface.is_stroking());
        assert_eq!(surface.pointer_up().expect("no encode"), None);
    }

    #[test]
    fn clearing_the_mask_clears_the_surface() {
        let mut surface = painted(MaskMode::Draw);
        stroke(&mut surface, (10.0, 16.0), (50.0, 16.0));
        surface.sync_mask(None).expect("sync");

        surface.pointer_down(0.0, 0.0);
        let mask = surface.pointer_up().expect("encode").expect("stroke");
        assert!(pixels(&mask).pixels().all(|p| p.0[3] == 0));
    }

    #[test]
    fn external_mask_is_redrawn_scaled() {
        let mut source = MaskSurface::new(16, 8).expect("surface");
        source.set_tool(MaskMode::Draw, BrushSize::new(100));
        let full = stroke(&mut source, (0.0, 4.0), (16.0, 4.0));

        let mut surface = painted(MaskMode::Draw);
        surface.sync_mask(Some(&full)).expect("sync");
        surface.pointer_down(0.0, 0.0);
        let mask = surface.pointer_up().expect("encode").expect("stroke");
        assert_eq!(pixels(&mask).get_pixel(32, 16).0[3], 255);
    }

    #[test]
    fn resize_keeps_the_drawn_mask() {
        let mut surface = painted(MaskMode::Draw);
        stroke(&mut surface, (0.0, 16.0), (64.0, 16.0));
        surface.resize(128, 64).expect("resize");
        assert_eq!(surface.dimensions(), (128, 64));

        surface.pointer_down(0.0, 0.0);
        let mask = surface.pointer_up().expect("encode").expect("stroke");
        assert_eq!(pixels(&mask).get_pixel(64, 32).0[3], 255);
        assert_eq!(pixels(&mask).get_pixel(64, 2).0[3], 0);
    }

    #[test]
    fn zero_sized_surface_is_rejected() {
        assert!(MaskSurface::new(0, 5).is_err());
    }
}
