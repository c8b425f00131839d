#![forbid(unsafe_code)]

use crate::render::{Viewport, ZoomTransform, export_svg};
use base64::Engine as _;
use sprig_core::{Session, SprigConfig};

#[derive(Debug, thiserror::Error)]
pub enum RasterError {
    #[error(transparent)]
    Render(#[from] crate::render::Error),
    #[error("failed to parse SVG")]
    SvgParse,
    #[error("failed to allocate pixmap for raster rendering")]
    PixmapAlloc,
    #[error("failed to encode PNG")]
    PngEncode,
    #[error("invalid raster scale: {0}")]
    InvalidScale(f32),
}

pub type Result<T> = std::result::Result<T, RasterError>;

#[derive(Debug, Clone)]
pub struct RasterOptions {
    /// Device pixels per SVG unit.
    pub scale: f32,
    /// Fill painted under the drawing; `None` keeps the pixmap transparent.
    pub background: Option<String>,
}

impl Default for RasterOptions {
    fn default() -> Self {
        Self {
            scale: 2.0,
            background: Some("#111827".to_string()),
        }
    }
}

impl RasterOptions {
    /// `export.scale` / `export.background` from `config`.
    pub fn from_config(config: &SprigConfig) -> Self {
        let d = Self::default();
        Self {
            scale: config.f64_or("export.scale", f64::from(d.scale)) as f32,
            background: Some(config.str_or("export.background", "#111827")),
        }
    }
}

/// Rasterizes the session's current view to PNG bytes.
///
/// `transform` is the current pan/zoom; `None` uses the initial view.
pub fn export_png(
    session: &Session,
    viewport: Viewport,
    config: &SprigConfig,
    transform: Option<ZoomTransform>,
    options: &RasterOptions,
) -> Result<Vec<u8>> {
    let svg = export_svg(session, viewport, config, transform)?;
    svg_to_png(&svg, options)
}

pub fn svg_to_png(svg: &str, options: &RasterOptions) -> Result<Vec<u8>> {
    let pixmap = svg_to_pixmap(svg, options.scale, options.background.as_deref())?;
    pixmap.encode_png().map_err(|_| RasterError::PngEncode)
}

/// `data:image/png;base64,...` URL for `png`.
pub fn png_data_url(png: &[u8]) -> String {
    let mut out = String::from("data:image/png;base64,");
    base64::engine::general_purpose::STANDARD.encode_string(png, &mut out);
    out
}

fn svg_to_pixmap(svg: &str, scale: f32, background: Option<&str>) -> Result<tiny_skia::Pixmap> {
    if !(scale.is_finite() && scale > 0.0) {
        return Err(RasterError::InvalidScale(scale));
    }

    let mut opt = usvg::Options::default();
    // Labels need some font; pin a common family so output is stable-ish across machines.
    opt.fontdb_mut().load_system_fonts();
    opt.font_family = "Arial".to_string();

    let tree = usvg::Tree::from_str(svg, &opt).map_err(|_| RasterError::SvgParse)?;

    // Our SVGs always carry width/height/viewBox, so the tree size is the viewport.
    let size = tree.size();
    let width_px = (size.width() * scale).ceil().max(1.0) as u32;
    let height_px = (size.height() * scale).ceil().max(1.0) as u32;

    let mut pixmap = tiny_skia::Pixmap::new(width_px, height_px).ok_or(RasterError::PixmapAlloc)?;
    if let Some(color) = background.and_then(parse_tiny_skia_color) {
        pixmap.fill(color);
    }

    resvg::render(
        &tree,
        tiny_skia::Transform::from_scale(scale, scale),
        &mut pixmap.as_mut(),
    );
    Ok(pixmap)
}

fn parse_tiny_skia_color(text: &str) -> Option<tiny_skia::Color> {
    let s = text.trim().to_ascii_lowercase();
    match s.as_str() {
        "transparent" => return Some(tiny_skia::Color::from_rgba8(0, 0, 0, 0)),
        "white" => return Some(tiny_skia::Color::from_rgba8(255, 255, 255, 255)),
        "black" => return Some(tiny_skia::Color::from_rgba8(0, 0, 0, 255)),
        _ => {}
    }

    let hex = s.strip_prefix('#')?;
    fn hex2(b: &[u8]) -> Option<u8> {
        let hi = (*b.first()? as char).to_digit(16)? as u8;
        let lo = (*b.get(1)? as char).to_digit(16)? as u8;
        Some((hi << 4) | lo)
    }
    fn hex1(c: u8) -> Option<u8> {
        let v = (c as char).to_digit(16)? as u8;
        Some((v << 4) | v)
    }

    let bytes = hex.as_bytes();
    let (r, g, b, a) = match bytes.len() {
        3 => (hex1(bytes[0])?, hex1(bytes[1])?, hex1(bytes[2])?, 255),
        6 => (
            hex2(&bytes[0..2])?,
            hex2(&bytes[2..4])?,
            hex2(&bytes[4..6])?,
            255,
        ),
        8 => (
            hex2(&bytes[0..2])?,
            hex2(&bytes[2..4])?,
            hex2(&bytes[4..6])?,
            hex2(&bytes[6..8])?,
        ),
        _ => return None,
    };
    Some(tiny_skia::Color::from_rgba8(r, g, b, a))
}

#[cfg(test)]
mod tests {
    use super::*;
    use sprig_core::SequentialIdGenerator;

    const PNG_SIGNATURE: &[u8] = b"\x89PNG\r\n\x1a\n";

    #[test]
    fn svg_to_png_produces_png_signature() {
        let svg = r#"<svg xmlns="http://www.w3.org/2000/svg" width="10" height="10" viewBox="0 0 10 10"><rect width="10" height="10" fill="black"/></svg>"#;
        let bytes = svg_to_png(svg, &RasterOptions::default()).unwrap();
        assert!(bytes.starts_with(PNG_SIGNATURE));
    }

    #[test]
    fn background_and_scale_are_applied() {
        let svg = r#"<svg xmlns="http://www.w3.org/2000/svg" width="4" height="3" viewBox="0 0 4 3"></svg>"#;
        let pixmap = svg_to_pixmap(svg, 2.0, Some("#111827")).unwrap();
        assert_eq!((pixmap.width(), pixmap.height()), (8, 6));
        let px = pixmap.pixel(0, 0).unwrap();
        assert_eq!((px.red(), px.green(), px.blue(), px.alpha()), (0x11, 0x18, 0x27, 255));
    }

    #[test]
    fn rejects_non_positive_scale() {
        let svg = r#"<svg xmlns="http://www.w3.org/2000/svg" width="4" height="3"></svg>"#;
        let options = RasterOptions {
            scale: 0.0,
            ..RasterOptions::default()
        };
        assert!(matches!(
            svg_to_png(svg, &options),
            Err(RasterError::InvalidScale(_))
        ));
    }

    #[test]
    fn parses_hex_colours() {
        let c = parse_tiny_skia_color("#fff").unwrap();
        assert_eq!(c.to_color_u8().red(), 255);
        assert!(parse_tiny_skia_color("#12345").is_none());
        assert!(parse_tiny_skia_color("rebeccapurple").is_none());
    }

    #[test]
    fn data_url_has_png_prefix() {
        let url = png_data_url(PNG_SIGNATURE);
        assert_eq!(url, "data:image/png;base64,iVBORw0KGgo=");
    }

    #[test]
    fn export_png_renders_session_at_double_scale() {
        let mut session = Session::with_id_generator(SequentialIdGenerator::default());
        session.start("Topic").unwrap();
        session.add_node("root", "Child").unwrap();
        let bytes = export_png(
            &session,
            Viewport::new(300.0, 200.0),
            &SprigConfig::default(),
            Some(ZoomTransform::new(10.0, 20.0, 3.0)),
            &RasterOptions::default(),
        )
        .unwrap();
        assert!(bytes.starts_with(PNG_SIGNATURE));
        // IHDR width/height, big-endian, right after the signature and chunk header.
        assert_eq!(&bytes[16..20], &600u32.to_be_bytes());
        assert_eq!(&bytes[20..24], &400u32.to_be_bytes());
    }
}
