/// Badge image decoding
///
/// Extracts a volunteer code from an arbitrary badge image. The chain is
/// deterministic, fastest first:
/// - Tier 1: fast scanner over the full image (normal, then inverted)
/// - Tier 2: center crop to ~70% of the area, fast scanner again
/// - Tier 3: secondary engine over the full image
///
/// Absence of a QR code is `Ok(None)`, never an error; only bytes that
/// cannot be rasterized at all fail.

use image::GrayImage;
use thiserror::Error;

/// Fraction of the image area retained by the automatic crop retry
const CROP_AREA: f32 = 0.7;

/// Errors from badge decoding
#[derive(Debug, Error)]
pub enum DecodeError {
    #[error("image could not be read: {0}")]
    UnreadableImage(#[from] image::ImageError),
}

/// Decode a badge image (PNG/JPEG/... bytes) into its payload string.
///
/// Returns `Ok(None)` when the image is valid but contains no readable
/// QR code anywhere in the chain.
pub fn decode(image_bytes: &[u8]) -> Result<Option<String>, DecodeError> {
    let img = image::load_from_memory(image_bytes)?;
    let gray = img.to_luma8();

    // Tier 1: full image through the fast scanner
    if let Some(payload) = scan_gray(&gray) {
        return Ok(Some(payload));
    }

    // Tier 2: badges photographed at a distance leave the QR as a small
    // region of a larger frame; retry on the center crop. The cropped
    // buffer is a plain owned value and is released on every path out.
    let (w, h) = gray.dimensions();
    let side = CROP_AREA.sqrt();
    let cw = ((w as f32 * side) as u32).max(1);
    let ch = ((h as f32 * side) as u32).max(1);
    let cropped = image::imageops::crop_imm(&gray, (w - cw) / 2, (h - ch) / 2, cw, ch).to_image();
    if let Some(payload) = scan_gray(&cropped) {
        return Ok(Some(payload));
    }

    // Tier 3: hand the original to the secondary engine as a last resort
    Ok(scan_secondary(&gray))
}

/// Frame-rate decode path for the live loop: tier 1 only.
///
/// `gray` is row-major 8-bit luminance, `w * h` bytes. Per-frame misses
/// are the normal case and are reported as `None`, not errors.
pub fn decode_frame(gray: &[u8], w: u32, h: u32) -> Option<String> {
    if gray.len() != (w as usize) * (h as usize) {
        return None;
    }
    scan_luma(gray, w, h).or_else(|| {
        let inverted: Vec<u8> = gray.iter().map(|&l| 255 - l).collect();
        scan_luma(&inverted, w, h)
    })
}

/// Fast scanner over a grayscale buffer, normal then inverted.
///
/// Badges may render light modules on a dark card; the fast scanner only
/// reads dark-on-light, so the inverted pass covers the other polarity.
fn scan_gray(gray: &GrayImage) -> Option<String> {
    let (w, h) = gray.dimensions();
    decode_frame(gray.as_raw(), w, h)
}

/// One pass of the fast scanner (rqrr)
fn scan_luma(data: &[u8], w: u32, h: u32) -> Option<String> {
    let w = w as usize;
    let mut prepared =
        rqrr::PreparedImage::prepare_from_greyscale(w, h as usize, |x, y| data[y * w + x]);

    for grid in prepared.detect_grids() {
        match grid.decode() {
            Ok((_meta, content)) => return Some(content),
            // A misdetected grid on a frame is routine, keep trying
            Err(_) => continue,
        }
    }
    None
}

/// Secondary engine over a grayscale buffer, normal then inverted
fn scan_secondary(gray: &GrayImage) -> Option<String> {
    let (w, h) = gray.dimensions();
    secondary_pass(gray.as_raw(), w, h).or_else(|| {
        let inverted: Vec<u8> = gray.as_raw().iter().map(|&l| 255 - l).collect();
        secondary_pass(&inverted, w, h)
    })
}

/// One pass of the secondary engine (quircs), tolerant of lower-quality
/// input
fn secondary_pass(data: &[u8], w: u32, h: u32) -> Option<String> {
    let mut quirc = quircs::Quirc::default();

    for code in quirc.identify(w as usize, h as usize, data) {
        let Ok(code) = code else { continue };
        let Ok(data) = code.decode() else { continue };
        if let Ok(payload) = String::from_utf8(data.payload) {
            return Some(payload);
        }
    }
    None
}
