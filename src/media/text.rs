// SPDX-License-Identifier: MPL-2.0
//! Text rasterization with a soft drop shadow.
//!
//! Text is laid out by `usvg` from a one-element SVG document and rendered
//! by `resvg` straight onto the target surface. The shadow is an
//! `feDropShadow` with no offset, which matches a canvas shadow blur of
//! twice its standard deviation.

use super::codec::new_surface;
use super::RasterError;
use crate::domain::session::TextColor;
use resvg::usvg;
use std::fmt::Write as _;
use std::sync::{Arc, OnceLock};
use tiny_skia::{Pixmap, PixmapPaint, Transform};

/// Installed families tried, in order, for the generic `sans-serif`.
const SANS_SERIF_CANDIDATES: [&str; 6] = [
    "Arial",
    "Helvetica",
    "Liberation Sans",
    "DejaVu Sans",
    "Noto Sans",
    "Roboto",
];

/// Where the anchor point sits relative to the text box.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum TextAnchor {
    /// The anchor is the centre of the text.
    Center,
    /// The anchor is the bottom-right corner of the text.
    BottomRight,
}

#[derive(Debug, Clone)]
pub(crate) struct TextLayer<'a> {
    pub text: &'a str,
    pub font_family: &'a str,
    pub font_size: f32,
    pub color: TextColor,
    pub opacity: f32,
    pub anchor: TextAnchor,
    pub x: f32,
    pub y: f32,
    pub shadow_blur: f32,
    pub shadow_opacity: f32,
}

/// Draws `layer` onto `surface`.
///
/// # Errors
///
/// Returns [`RasterError::InvalidParameter`] when the text cannot be laid
/// out or no installed font produced a single visible glyph.
pub(crate) fn draw_text(surface: &mut Pixmap, layer: &TextLayer<'_>) -> Result<(), RasterError> {
    let svg = layer_svg(surface.width(), surface.height(), layer);
    let options = usvg::Options {
        fontdb: font_database(),
        ..usvg::Options::default()
    };
    let tree = usvg::Tree::from_str(&svg, &options)
        .map_err(|err| RasterError::InvalidParameter(format!("text layout failed: {err}")))?;

    let mut rendered = new_surface(surface.width(), surface.height())?;
    resvg::render(&tree, Transform::identity(), &mut rendered.as_mut());
    if rendered.pixels().iter().all(|pixel| pixel.alpha() == 0) {
        tracing::warn!(font = layer.font_family, "no glyphs rendered");
        return Err(RasterError::InvalidParameter(format!(
            "no installed font can render the text in '{}'",
            layer.font_family
        )));
    }

    surface.draw_pixmap(
        0,
        0,
        rendered.as_ref(),
        &PixmapPaint::default(),
        Transform::identity(),
        None,
    );
    Ok(())
}

fn font_database() -> Arc<usvg::fontdb::Database> {
    static FONTS: OnceLock<Arc<usvg::fontdb::Database>> = OnceLock::new();
    FONTS
        .get_or_init(|| {
            let mut db = usvg::fontdb::Database::new();
            db.load_system_fonts();
            match sans_serif_fallback(&db) {
                Some(family) => {
                    tracing::debug!(faces = db.len(), %family, "loaded system fonts");
                    db.set_sans_serif_family(family);
                }
                None => tracing::warn!("no system fonts found, text cannot be drawn"),
            }
            Arc::new(db)
        })
        .clone()
}

/// Picks an installed family for the generic `sans-serif`.
fn sans_serif_fallback(db: &usvg::fontdb::Database) -> Option<String> {
    let installed: Vec<&str> = db
        .faces()
        .flat_map(|face| face.families.iter().map(|(name, _)| name.as_str()))
        .collect();
    SANS_SERIF_CANDIDATES
        .iter()
        .copied()
        .find(|candidate| installed.contains(candidate))
        .or_else(|| installed.iter().copied().find(|name| name.contains("Sans")))
        .or_else(|| installed.first().copied())
        .map(str::to_string)
}

fn layer_svg(width: u32, height: u32, layer: &TextLayer<'_>) -> String {
    let (text_anchor, baseline) = match layer.anchor {
        TextAnchor::Center => ("middle", "central"),
        TextAnchor::BottomRight => ("end", "text-after-edge"),
    };

    let mut svg = String::with_capacity(512 + layer.text.len());
    let _ = write!(
        svg,
        r##"<svg xmlns="http://www.w3.org/2000/svg" width="{width}" height="{height}" viewBox="0 0 {width} {height}">"##
    );
    let _ = write!(
        svg,
        r##"<defs><filter id="shadow" x="-50%" y="-50%" width="200%" height="200%"><feDropShadow dx="0" dy="0" stdDeviation="{}" flood-color="#000000" flood-opacity="{}"/></filter></defs>"##,
        layer.shadow_blur / 2.0,
        layer.shadow_opacity,
    );
    let _ = write!(
        svg,
        r##"<text x="{}" y="{}" font-family="'{}', sans-serif" font-size="{}" font-weight="bold" fill="{}" fill-opacity="{}" text-anchor="{text_anchor}" dominant-baseline="{baseline}" filter="url(#shadow)">{}</text></svg>"##,
        layer.x,
        layer.y,
        escape_xml(layer.font_family),
        layer.font_size,
        layer.color.to_hex(),
        layer.opacity,
        escape_xml(layer.text),
    );
    svg
}

fn escape_xml(raw: &str) -> String {
    let mut escaped = String::with_capacity(raw.len());
    for c in raw.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&apos;"),
            _ => escaped.push(c),
        }
    }
    escaped
}
