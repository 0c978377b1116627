/// Badge image synthesis
///
/// Renders a volunteer code into a QR matrix and composites it with the
/// organization banner and label text into a single PNG. The output is a
/// pure function of (payload, label, style): no disk or network access,
/// fonts are embedded at compile time.

use image::{Luma, Rgba, RgbaImage};
use imageproc::drawing::{draw_text_mut, text_size};
use ab_glyph::{FontRef, PxScale};
use qrcode::QrCode;
use serde::{Deserialize, Serialize};
use std::io::Cursor;
use thiserror::Error;

/// Embedded typefaces (see assets/fonts/LICENSE-DejaVu)
const SANS: &[u8] = include_bytes!("../../assets/fonts/DejaVuSans.ttf");
const SANS_BOLD: &[u8] = include_bytes!("../../assets/fonts/DejaVuSans-Bold.ttf");
const MONO: &[u8] = include_bytes!("../../assets/fonts/DejaVuSansMono.ttf");
const MONO_BOLD: &[u8] = include_bytes!("../../assets/fonts/DejaVuSansMono-Bold.ttf");

/// Vertical breathing room between text lines, in pixels
const INNER_PADDING: u32 = 6;

/// Errors from badge synthesis
#[derive(Debug, Error)]
pub enum EncodingError {
    #[error("payload is empty")]
    EmptyPayload,
    /// The payload does not fit a QR symbol at the default error
    /// correction level (or contains characters the encoder rejects).
    #[error("payload cannot be encoded: {0:?}")]
    Unencodable(qrcode::types::QrError),
    #[error("failed to serialize badge PNG: {0}")]
    Png(#[from] image::ImageError),
}

/// Typeface selection for badge text
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum FontFamily {
    #[default]
    Sans,
    Mono,
}

impl FontFamily {
    /// (bold face, regular face) for this family
    fn faces(self) -> (&'static [u8], &'static [u8]) {
        match self {
            FontFamily::Sans => (SANS_BOLD, SANS),
            FontFamily::Mono => (MONO_BOLD, MONO),
        }
    }
}

/// Visual configuration for badge rendering
///
/// Every field has a documented default; colors are `#RRGGBB` strings.
/// An unparseable color falls back to the field's default with a warning
/// rather than failing the synthesis.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct StyleOptions {
    /// Color of the dark QR modules (default `#000000`)
    pub dark_color: String,
    /// Color of the light QR modules and quiet zone (default `#FFFFFF`)
    pub light_color: String,
    /// Background gradient start, top-left (default `#000080`)
    pub gradient_start: String,
    /// Background gradient end, bottom-right; set equal to
    /// `gradient_start` for a flat background (default `#FFA500`)
    pub gradient_end: String,
    /// Banner and label text color (default `#FFFFFF`)
    pub text_color: String,
    /// Organization banner drawn above the QR block
    /// (default `GBI PASAR KEMIS`)
    pub banner_text: String,
    /// Pixels per QR module (default 10)
    pub scale: u32,
    /// Quiet-zone width in modules around the matrix (default 1)
    pub margin: u32,
    /// Font size in pixels for the banner and name lines; the code line
    /// is drawn 2px smaller (default 16)
    pub font_size: u32,
    /// Typeface family for all badge text (default sans)
    pub font_family: FontFamily,
    /// Corner radius of the QR block in pixels, 0 = square (default 16)
    pub corner_radius: u32,
    /// Padding between the composition and the canvas edge (default 24)
    pub outer_padding: u32,
}

impl Default for StyleOptions {
    fn default() -> Self {
        Self {
            dark_color: "#000000".to_string(),
            light_color: "#FFFFFF".to_string(),
            gradient_start: "#000080".to_string(),
            gradient_end: "#FFA500".to_string(),
            text_color: "#FFFFFF".to_string(),
            banner_text: "GBI PASAR KEMIS".to_string(),
            scale: 10,
            margin: 1,
            font_size: 16,
            font_family: FontFamily::Sans,
            corner_radius: 16,
            outer_padding: 24,
        }
    }
}

/// Render a badge for `payload` (the volunteer code) labelled with the
/// volunteer's display name, returning PNG bytes.
///
/// Layout, top to bottom: banner text, QR block (rounded corners),
/// upper-cased name, `Code : <payload>`.
pub fn synthesize(
    payload: &str,
    label: &str,
    style: &StyleOptions,
) -> Result<Vec<u8>, EncodingError> {
    if payload.is_empty() {
        return Err(EncodingError::EmptyPayload);
    }

    // Encode at the library's default error correction level (M)
    let code = QrCode::new(payload.as_bytes()).map_err(EncodingError::Unencodable)?;
    let scale = style.scale.max(1);
    let modules = code
        .render::<Luma<u8>>()
        .quiet_zone(false)
        .module_dimensions(scale, scale)
        .build();

    let dark = parse_color(&style.dark_color, [0x00, 0x00, 0x00]);
    let light = parse_color(&style.light_color, [0xFF, 0xFF, 0xFF]);
    let grad_a = parse_color(&style.gradient_start, [0x00, 0x00, 0x80]);
    let grad_b = parse_color(&style.gradient_end, [0xFF, 0xA5, 0x00]);
    let text_color = parse_color(&style.text_color, [0xFF, 0xFF, 0xFF]);

    let (bold_bytes, regular_bytes) = style.font_family.faces();
    let bold = FontRef::try_from_slice(bold_bytes).expect("embedded font is valid");
    let regular = FontRef::try_from_slice(regular_bytes).expect("embedded font is valid");

    // Quiet zone is composited here rather than rendered by the encoder,
    // so the rounded-corner clip applies to the whole block
    let margin_px = style.margin * scale;
    let block_w = modules.width() + margin_px * 2;
    let block_h = modules.height() + margin_px * 2;

    let font_size = style.font_size.max(6);
    let line_height = font_size + INNER_PADDING;
    let outer = style.outer_padding;

    let canvas_w = block_w + outer * 2;
    let canvas_h = block_h + line_height * 3 + outer * 2;

    let mut canvas = RgbaImage::new(canvas_w, canvas_h);

    // Linear gradient, top-left to bottom-right
    let span = (canvas_w + canvas_h).saturating_sub(2).max(1) as f32;
    for (x, y, pixel) in canvas.enumerate_pixels_mut() {
        let t = (x + y) as f32 / span;
        *pixel = lerp_color(grad_a, grad_b, t);
    }

    // Banner line, centered above the block
    let banner_scale = PxScale::from(font_size as f32);
    draw_centered(
        &mut canvas,
        text_color,
        outer + line_height - font_size,
        banner_scale,
        &bold,
        &style.banner_text,
    );

    // QR block, clipped to a rounded rectangle
    let block_x = outer;
    let block_y = outer + line_height * 3 / 2;
    let radius = style.corner_radius.min(block_w / 2).min(block_h / 2);
    for by in 0..block_h {
        for bx in 0..block_w {
            if !in_rounded_rect(bx, by, block_w, block_h, radius) {
                continue;
            }
            let in_modules = bx >= margin_px
                && by >= margin_px
                && bx - margin_px < modules.width()
                && by - margin_px < modules.height();
            let is_dark =
                in_modules && modules.get_pixel(bx - margin_px, by - margin_px).0[0] < 128;
            let color = if is_dark { dark } else { light };
            canvas.put_pixel(block_x + bx, block_y + by, color);
        }
    }

    // Name line (upper-cased) and code line below the block
    let name = label.to_uppercase();
    draw_centered(
        &mut canvas,
        text_color,
        block_y + block_h + line_height - font_size,
        banner_scale,
        &bold,
        &name,
    );
    let code_scale = PxScale::from((font_size - 2) as f32);
    draw_centered(
        &mut canvas,
        text_color,
        block_y + block_h + line_height * 2 - font_size,
        code_scale,
        &regular,
        &format!("Code : {}", payload),
    );

    let mut png = Cursor::new(Vec::new());
    image::DynamicImage::ImageRgba8(canvas).write_to(&mut png, image::ImageFormat::Png)?;

    Ok(png.into_inner())
}

/// Draw one line of text horizontally centered at the given top edge
fn draw_centered(
    canvas: &mut RgbaImage,
    color: Rgba<u8>,
    top: u32,
    scale: PxScale,
    font: &FontRef,
    text: &str,
) {
    let (text_w, _) = text_size(scale, font, text);
    let x = (canvas.width() as i32 - text_w as i32) / 2;
    draw_text_mut(canvas, color, x.max(0), top as i32, scale, font, text);
}

/// Membership test for a rounded rectangle of size w x h with the given
/// corner radius, in block-local coordinates
fn in_rounded_rect(x: u32, y: u32, w: u32, h: u32, radius: u32) -> bool {
    if radius == 0 {
        return true;
    }
    let r = radius as i64;
    let (x, y) = (x as i64, y as i64);
    let (w, h) = (w as i64, h as i64);

    // Centers of the four corner arcs
    let cx = if x < r {
        r
    } else if x >= w - r {
        w - r - 1
    } else {
        return true;
    };
    let cy = if y < r {
        r
    } else if y >= h - r {
        h - r - 1
    } else {
        return true;
    };

    let (dx, dy) = (x - cx, y - cy);
    dx * dx + dy * dy <= r * r
}

/// Parse a `#RRGGBB` color, falling back to `default` on bad input
fn parse_color(hex: &str, default: [u8; 3]) -> Rgba<u8> {
    let parsed = hex.strip_prefix('#').and_then(|s| {
        if s.len() != 6 {
            return None;
        }
        let r = u8::from_str_radix(&s[0..2], 16).ok()?;
        let g = u8::from_str_radix(&s[2..4], 16).ok()?;
        let b = u8::from_str_radix(&s[4..6], 16).ok()?;
        Some([r, g, b])
    });

    let [r, g, b] = match parsed {
        Some(rgb) => rgb,
        None => {
            eprintln!("⚠️  Unrecognized color '{}', using default", hex);
            default
        }
    };
    Rgba([r, g, b, 0xFF])
}

/// Linear interpolation between two colors
fn lerp_color(a: Rgba<u8>, b: Rgba<u8>, t: f32) -> Rgba<u8> {
    let t = t.clamp(0.0, 1.0);
    let mix = |ca: u8, cb: u8| (ca as f32 + (cb as f32 - ca as f32) * t).round() as u8;
    Rgba([
        mix(a.0[0], b.0[0]),
        mix(a.0[1], b.0[1]),
        mix(a.0[2], b.0[2]),
        0xFF,
    ])
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::badge::decode;

    #[test]
    fn test_empty_payload_is_rejected() {
        let err = synthesize("", "BUDI", &StyleOptions::default());
        assert!(matches!(err, Err(EncodingError::EmptyPayload)));
    }

    #[test]
    fn test_oversized_payload_is_rejected() {
        // Far beyond any QR version's capacity
        let payload = "X".repeat(8000);
        let err = synthesize(&payload, "BUDI", &StyleOptions::default());
        assert!(matches!(err, Err(EncodingError::Unencodable(_))));
    }

    #[test]
    fn test_output_is_png() {
        let png = synthesize("W9NRXBA", "Budi Santoso", &StyleOptions::default()).unwrap();
        assert_eq!(&png[0..8], &[0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A]);
    }

    #[test]
    fn test_deterministic_for_identical_inputs() {
        let style = StyleOptions::default();
        let a = synthesize("W9NRXBA", "Budi Santoso", &style).unwrap();
        let b = synthesize("W9NRXBA", "Budi Santoso", &style).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_round_trip_default_style() {
        let png = synthesize("W9NRXBA", "Budi Santoso", &StyleOptions::default()).unwrap();
        let decoded = decode::decode(&png).unwrap();
        assert_eq!(decoded.as_deref(), Some("W9NRXBA"));
    }

    #[test]
    fn test_round_trip_survives_style_variations() {
        let styles = [
            StyleOptions {
                // Inverted modules on a dark card
                dark_color: "#FFFFFF".to_string(),
                light_color: "#0A2A4A".to_string(),
                gradient_start: "#075AAD".to_string(),
                gradient_end: "#075AAD".to_string(),
                font_size: 12,
                ..StyleOptions::default()
            },
            StyleOptions {
                font_family: FontFamily::Mono,
                corner_radius: 0,
                margin: 4,
                scale: 6,
                ..StyleOptions::default()
            },
        ];

        for style in &styles {
            let png = synthesize("3FKDH0Z", "Siti Rahayu", style).unwrap();
            let decoded = decode::decode(&png).unwrap();
            assert_eq!(decoded.as_deref(), Some("3FKDH0Z"), "style: {:?}", style);
        }
    }

    #[test]
    fn test_bad_color_falls_back_instead_of_failing() {
        let style = StyleOptions {
            dark_color: "not-a-color".to_string(),
            ..StyleOptions::default()
        };
        let png = synthesize("W9NRXBA", "Budi", &style).unwrap();
        assert_eq!(decode::decode(&png).unwrap().as_deref(), Some("W9NRXBA"));
    }

    #[test]
    fn test_style_options_json_round_trip() {
        let style = StyleOptions {
            scale: 8,
            font_family: FontFamily::Mono,
            ..StyleOptions::default()
        };
        let json = serde_json::to_string(&style).unwrap();
        let restored: StyleOptions = serde_json::from_str(&json).unwrap();
        assert_eq!(style, restored);
    }
}
