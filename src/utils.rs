//! Utility functions

use crate::constants::APP_NAME;
use std::path::PathBuf;

// White pin with a dark hole; tinted per marker when painted
pub const PIN_SVG: &str = r##"<svg xmlns="http://www.w3.org/2000/svg" viewBox="0 0 25 41"><path d="M12.5 0.8C6 0.8 0.8 6 0.8 12.5c0 8.8 11.7 27.7 11.7 27.7s11.7-18.9 11.7-27.7C24.2 6 19 0.8 12.5 0.8z" fill="#fff" stroke="#09090b" stroke-width="1.2"/><circle cx="12.5" cy="12.5" r="4.6" fill="#18181b"/></svg>"##;

// No stroke, square viewBox; used for the window and taskbar icon
pub const ICON_SVG: &str = r##"<svg xmlns="http://www.w3.org/2000/svg" viewBox="0 0 64 64"><rect width="64" height="64" rx="14" fill="#09090b"/><path d="M32 8C22.6 8 15 15.6 15 25c0 12.8 17 31 17 31s17-18.2 17-31C49 15.6 41.4 8 32 8z" fill="#2dd4bf"/><circle cx="32" cy="25" r="6.5" fill="#09090b"/></svg>"##;

/// Rasterize an SVG at the given width, preserving aspect ratio.
/// Returns straight-alpha RGBA pixels with the pixel size.
pub fn rasterize_svg(svg: &str, width: u32) -> Option<(Vec<u8>, u32, u32)> {
    let tree = resvg::usvg::Tree::from_str(svg, &resvg::usvg::Options::default()).ok()?;
    let svg_size = tree.size();
    let scale = width as f32 / svg_size.width();
    let height = (svg_size.height() * scale).ceil() as u32;
    let mut pixmap = resvg::tiny_skia::Pixmap::new(width, height)?;
    resvg::render(
        &tree,
        resvg::usvg::Transform::from_scale(scale, scale),
        &mut pixmap.as_mut(),
    );
    Some((premul_to_straight(&pixmap), width, height))
}

fn premul_to_straight(pixmap: &resvg::tiny_skia::Pixmap) -> Vec<u8> {
    pixmap
        .pixels()
        .iter()
        .flat_map(|p| {
            let a = p.alpha();
            if a == 0 {
                [0, 0, 0, 0]
            } else {
                let r = (p.red() as u16 * 255 / a as u16) as u8;
                let g = (p.green() as u16 * 255 / a as u16) as u8;
                let b = (p.blue() as u16 * 255 / a as u16) as u8;
                [r, g, b, a]
            }
        })
        .collect()
}

/// App data directory (settings, logs)
pub fn get_data_dir() -> PathBuf {
    dirs::data_local_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(APP_NAME)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rasterize_pin_keeps_aspect() {
        let (pixels, w, h) = rasterize_svg(PIN_SVG, 50).unwrap();
        assert_eq!(w, 50);
        assert_eq!(h, 82);
        assert_eq!(pixels.len(), (w * h * 4) as usize);
    }

    #[test]
    fn test_rasterize_icon_is_square() {
        let (_, w, h) = rasterize_svg(ICON_SVG, 64).unwrap();
        assert_eq!((w, h), (64, 64));
    }

    #[test]
    fn test_svg_constants_are_complete_documents() {
        for svg in [PIN_SVG, ICON_SVG] {
            assert!(svg.starts_with("<svg"));
            assert!(svg.ends_with("</svg>"));
            assert!(svg.contains("fill=\"#"));
        }
    }

    #[test]
    fn test_rasterize_rejects_garbage() {
        assert!(rasterize_svg("<not svg", 10).is_none());
    }
}
