//! Export pipeline against the real resvg rasterizer: dimension and transparency
//! laws on actual PNG pixels.

#![cfg(feature = "raster")]

use selkie::{
    DiagramEngine, EngineFailure, ExportConfig, RenderPhase, Session, VectorOutput,
};
use std::time::{Duration, Instant};

/// Always renders a fixed 400x300 drawing with a centered rect, leaving the border
/// as background.
struct RectEngine;

impl DiagramEngine for RectEngine {
    fn render(&self, _source: &str) -> Result<VectorOutput, EngineFailure> {
        Ok(VectorOutput {
            svg: r#"<svg xmlns="http://www.w3.org/2000/svg" viewBox="0 0 400 300"><rect x="100" y="75" width="200" height="150" fill="black"/></svg>"#
                .to_string(),
            width: 400.0,
            height: 300.0,
        })
    }
}

fn rendered_session() -> Session<RectEngine> {
    let mut s = Session::new(RectEngine).with_debounce(Duration::ZERO);
    let now = Instant::now();
    s.submit_at("flowchart LR\nA-->B", now);
    s.pump_sync(now);
    assert_eq!(s.current_state().phase, RenderPhase::Succeeded);
    s
}

fn decode_rgba(bytes: &[u8]) -> (u32, u32, Vec<u8>) {
    let decoder = png::Decoder::new(std::io::Cursor::new(bytes));
    let mut reader = decoder.read_info().unwrap();
    let mut buf = vec![0u8; reader.output_buffer_size()];
    let info = reader.next_frame(&mut buf).unwrap();
    assert_eq!(info.color_type, png::ColorType::Rgba);
    buf.truncate(info.buffer_size());
    (info.width, info.height, buf)
}

#[test]
fn transparent_export_scales_dimensions_and_zeroes_background_alpha() {
    let mut s = rendered_session();
    let artifact = s
        .export_image_sync(&ExportConfig {
            scale: 3.0,
            transparent_background: true,
        })
        .unwrap();

    assert_eq!(artifact.mime_type, "image/png");
    assert_eq!((artifact.width, artifact.height), (1200, 900));

    let (w, h, rgba) = decode_rgba(&artifact.bytes);
    assert_eq!((w, h), (1200, 900));

    // All four corners lie outside the rect: background, alpha 0.
    for (x, y) in [(0, 0), (w - 1, 0), (0, h - 1), (w - 1, h - 1)] {
        let i = ((y * w + x) * 4) as usize;
        assert_eq!(rgba[i + 3], 0, "corner ({x},{y}) not transparent");
    }

    // The rect center is opaque black.
    let i = (((h / 2) * w + w / 2) * 4) as usize;
    assert_eq!(&rgba[i..i + 4], &[0, 0, 0, 255]);
}

#[test]
fn opaque_export_fills_background_with_white_at_full_alpha() {
    let mut s = rendered_session();
    let artifact = s
        .export_image_sync(&ExportConfig {
            scale: 1.0,
            transparent_background: false,
        })
        .unwrap();

    assert_eq!((artifact.width, artifact.height), (400, 300));

    let (w, h, rgba) = decode_rgba(&artifact.bytes);
    for (x, y) in [(0, 0), (w - 1, h - 1)] {
        let i = ((y * w + x) * 4) as usize;
        assert_eq!(&rgba[i..i + 4], &[255, 255, 255, 255]);
    }
}

#[test]
fn fractional_scale_rounds_pixel_dimensions() {
    let mut s = rendered_session();
    let artifact = s
        .export_image_sync(&ExportConfig {
            scale: 0.5,
            transparent_background: true,
        })
        .unwrap();
    assert_eq!((artifact.width, artifact.height), (200, 150));
}
