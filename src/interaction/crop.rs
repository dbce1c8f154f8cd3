// SPDX-License-Identifier: MPL-2.0
//! Crop rectangle manipulation: eight resize handles plus move-anywhere.
//!
//! Deltas are always measured from the state captured at pointer-down, not
//! accumulated across moves, so the rectangle follows the cursor exactly
//! and clamping never drifts.

use crate::domain::session::CropRect;

/// Pointer distance, in container pixels, within which a handle is grabbed.
pub const HANDLE_HIT_RADIUS: f32 = 22.0;

/// Position of a resize handle on the crop rectangle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CropHandle {
    TopLeft,
    Top,
    TopRight,
    Right,
    BottomRight,
    Bottom,
    BottomLeft,
    Left,
}

impl CropHandle {
    pub const ALL: [Self; 8] = [
        Self::TopLeft,
        Self::Top,
        Self::TopRight,
        Self::Right,
        Self::BottomRight,
        Self::Bottom,
        Self::BottomLeft,
        Self::Left,
    ];

    fn moves_left(self) -> bool {
        matches!(self, Self::TopLeft | Self::Left | Self::BottomLeft)
    }

    fn moves_right(self) -> bool {
        matches!(self, Self::TopRight | Self::Right | Self::BottomRight)
    }

    fn moves_top(self) -> bool {
        matches!(self, Self::TopLeft | Self::Top | Self::TopRight)
    }

    fn moves_bottom(self) -> bool {
        matches!(self, Self::BottomLeft | Self::Bottom | Self::BottomRight)
    }

    /// Handle centre in percent coordinates.
    fn anchor(self, rect: &CropRect) -> (f32, f32) {
        let x = if self.moves_left() {
            rect.x()
        } else if self.moves_right() {
            rect.x() + rect.width()
        } else {
            rect.x() + rect.width() / 2.0
        };
        let y = if self.moves_top() {
            rect.y()
        } else if self.moves_bottom() {
            rect.y() + rect.height()
        } else {
            rect.y() + rect.height() / 2.0
        };
        (x, y)
    }

    /// Applies a percentage delta to the edges this handle controls.
    fn resize(self, start: &CropRect, dx: f32, dy: f32) -> CropRect {
        let (mut x, mut y, mut width, mut height) =
            (start.x(), start.y(), start.width(), start.height());
        if self.moves_right() {
            width += dx;
        }
        if self.moves_left() {
            width -= dx;
            x += dx;
        }
        if self.moves_bottom() {
            height += dy;
        }
        if self.moves_top() {
            height -= dy;
            y += dy;
        }
        CropRect::clamped(x, y, width, height)
    }
}

/// Active crop gesture.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub enum CropDrag {
    /// No active drag.
    #[default]
    Idle,
    /// Dragging the whole rectangle.
    Moving {
        start_rect: CropRect,
        /// Cursor at pointer-down, in container pixels.
        start_cursor: (f32, f32),
    },
    /// Dragging a resize handle.
    Resizing {
        handle: CropHandle,
        start_rect: CropRect,
        start_cursor: (f32, f32),
    },
}

/// Crop overlay laid over an image shown at some container size.
#[derive(Debug, Clone, PartialEq)]
pub struct CropSurface {
    rect: CropRect,
    drag: CropDrag,
    container: (f32, f32),
}

impl CropSurface {
    /// Creates an overlay for `rect` over a container of the given pixel
    /// size.
    #[must_use]
    pub fn new(rect: CropRect, container_width: f32, container_height: f32) -> Self {
        Self {
            rect,
            drag: CropDrag::Idle,
            container: (container_width.max(1.0), container_height.max(1.0)),
        }
    }

    #[must_use]
    pub fn rect(&self) -> CropRect {
        self.rect
    }

    #[must_use]
    pub fn drag(&self) -> CropDrag {
        self.drag
    }

    #[must_use]
    pub fn is_dragging(&self) -> bool {
        self.drag != CropDrag::Idle
    }

    /// Replaces the rectangle from outside, e.g. after an undo.
    ///
    /// Ignored while a gesture is running.
    pub fn sync(&mut self, rect: CropRect) {
        if !self.is_dragging() {
            self.rect = rect;
        }
    }

    /// Follows a change of the displayed image size.
    pub fn set_container(&mut self, width: f32, height: f32) {
        self.container = (width.max(1.0), height.max(1.0));
    }

    /// Finds the handle under a pointer position, if any.
    #[must_use]
    pub fn handle_at(&self, x: f32, y: f32) -> Option<CropHandle> {
        let (cw, ch) = self.container;
        CropHandle::ALL
            .into_iter()
            .map(|handle| {
                let (hx, hy) = handle.anchor(&self.rect);
                let distance = (hx * cw / 100.0 - x).hypot(hy * ch / 100.0 - y);
                (handle, distance)
            })
            .filter(|(_, distance)| *distance <= HANDLE_HIT_RADIUS)
            .min_by(|a, b| a.1.total_cmp(&b.1))
            .map(|(handle, _)| handle)
    }

    fn contains(&self, x: f32, y: f32) -> bool {
        let (cw, ch) = self.container;
        let (px, py) = (x / cw * 100.0, y / ch * 100.0);
        px >= self.rect.x()
            && px <= self.rect.x() + self.rect.width()
            && py >= self.rect.y()
            && py <= self.rect.y() + self.rect.height()
    }

    /// Starts a gesture at a pointer position in container pixels.
    ///
    /// Handles win over the interior. Returns `false` when the pointer hit
    /// neither.
    pub fn pointer_down(&mut self, x: f32, y: f32) -> bool {
        if let Some(handle) = self.handle_at(x, y) {
            self.begin_resize(handle, x, y);
            true
        } else if self.contains(x, y) {
            self.begin_move(x, y);
            true
        } else {
            false
        }
    }

    pub fn begin_move(&mut self, x: f32, y: f32) {
        self.drag = CropDrag::Moving {
            start_rect: self.rect,
            start_cursor: (x, y),
        };
    }

    pub fn begin_resize(&mut self, handle: CropHandle, x: f32, y: f32) {
        self.drag = CropDrag::Resizing {
            handle,
            start_rect: self.rect,
            start_cursor: (x, y),
        };
    }

    /// Updates the rectangle for a pointer move. Returns the new rectangle
    /// while a gesture is active.
    pub fn pointer_move(&mut self, x: f32, y: f32) -> Option<CropRect> {
        let (cw, ch) = self.container;
        let delta = |start: (f32, f32)| ((x - start.0) / cw * 100.0, (y - start.1) / ch * 100.0);

        self.rect = match self.drag {
            CropDrag::Idle => return None,
            CropDrag::Moving {
                start_rect,
                start_cursor,
            } => {
                let (dx, dy) = delta(start_cursor);
                start_rect.translated(dx, dy)
            }
            CropDrag::Resizing {
                handle,
                start_rect,
                start_cursor,
            } => {
                let (dx, dy) = delta(start_cursor);
                handle.resize(&start_rect, dx, dy)
            }
        };
        Some(self.rect)
    }

    /// Ends the gesture. Returns the rectangle to commit if one was running.
    pub fn pointer_up(&mut self) -> Option<CropRect> {
        let was_dragging = self.is_dragging();
        self.drag = CropDrag::Idle;
        was_dragging.then_some(self.rect)
    }
}
