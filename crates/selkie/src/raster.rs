#![forbid(unsafe_code)]

//! Pure-Rust rasterization via `usvg`/`resvg`/`tiny-skia`.

use crate::export::{Background, RasterError, Rasterizer, Rgb};

/// Rasterizes SVG markup into an exact-size PNG.
///
/// The content is scaled (anisotropically if the requested pixel box does not match
/// the SVG's aspect ratio, which the export pipeline never asks for) so the full
/// vector extent lands inside the pixmap.
#[derive(Debug, Clone)]
pub struct ResvgRasterizer {
    font_family: String,
}

impl Default for ResvgRasterizer {
    fn default() -> Self {
        Self {
            // Mermaid-style output assumes a sans-serif stack; system selection may
            // vary, but this is best-effort.
            font_family: "Arial".to_string(),
        }
    }
}

impl ResvgRasterizer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_font_family(mut self, font_family: impl Into<String>) -> Self {
        self.font_family = font_family.into();
        self
    }
}

impl Rasterizer for ResvgRasterizer {
    fn rasterize(
        &self,
        svg: &str,
        width_px: u32,
        height_px: u32,
        background: Background,
    ) -> Result<Vec<u8>, RasterError> {
        let mut opt = usvg::Options::default();
        opt.fontdb_mut().load_system_fonts();
        opt.font_family = self.font_family.clone();

        let tree = usvg::Tree::from_str(svg, &opt).map_err(|_| RasterError::SvgParse)?;

        let mut pixmap = tiny_skia::Pixmap::new(width_px.max(1), height_px.max(1))
            .ok_or(RasterError::PixmapAlloc)?;

        match background {
            // A fresh pixmap is zeroed, i.e. fully transparent.
            Background::Transparent => {}
            Background::Opaque(Rgb(r, g, b)) => {
                pixmap.fill(tiny_skia::Color::from_rgba8(r, g, b, 255));
            }
        }

        let size = tree.size();
        let sx = pixmap.width() as f32 / size.width().max(1.0);
        let sy = pixmap.height() as f32 / size.height().max(1.0);
        resvg::render(
            &tree,
            tiny_skia::Transform::from_scale(sx, sy),
            &mut pixmap.as_mut(),
        );

        pixmap.encode_png().map_err(|_| RasterError::PngEncode)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const RECT_SVG: &str = r#"<svg xmlns="http://www.w3.org/2000/svg" viewBox="0 0 10 10"><rect x="2" y="2" width="6" height="6" fill="black"/></svg>"#;

    #[test]
    fn produces_png_signature_at_requested_size() {
        let bytes = ResvgRasterizer::new()
            .rasterize(RECT_SVG, 30, 30, Background::Transparent)
            .unwrap();
        assert!(bytes.starts_with(b"\x89PNG\r\n\x1a\n"));

        let decoder = png::Decoder::new(std::io::Cursor::new(bytes));
        let reader = decoder.read_info().unwrap();
        assert_eq!(reader.info().width, 30);
        assert_eq!(reader.info().height, 30);
    }

    #[test]
    fn malformed_svg_reports_parse_error() {
        let err = ResvgRasterizer::new()
            .rasterize("<svg", 10, 10, Background::Transparent)
            .unwrap_err();
        assert!(matches!(err, RasterError::SvgParse));
    }
}
