// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Sheet raster — load, resize to the working width, grayscale, fixed
// threshold binarization, morphology and bounding-box crops. Operates on
// in-memory images using the `image` and `imageproc` crates.

use image::imageops::FilterType;
use image::{DynamicImage, GrayImage, ImageBuffer, ImageFormat, Luma};
use imageproc::distance_transform::Norm;
use imageproc::morphology;
use markwerk_core::Rect;
use markwerk_core::error::{MarkwerkError, Result};
use tracing::{debug, info, instrument};

/// A photographed or scanned answer sheet.
///
/// Transformations consume `self` and return a new `SheetImage`; queries that
/// derive a different buffer (`to_gray`, `binarize`) borrow and allocate.
///
/// ```ignore
/// let binary = SheetImage::open("sheet.webp")?
///     .resize_to_width(2684)
///     .binarize(200);
/// ```
#[derive(Debug, Clone)]
pub struct SheetImage {
    image: DynamicImage,
}

impl SheetImage {
    // -- Construction ---------------------------------------------------------

    /// Load a sheet from a file path.
    #[instrument(skip_all, fields(path = %path.as_ref().display()))]
    pub fn open(path: impl AsRef<std::path::Path>) -> Result<Self> {
        let image = image::open(path.as_ref()).map_err(|err| {
            MarkwerkError::InputUnavailable(format!(
                "failed to open {}: {}",
                path.as_ref().display(),
                err
            ))
        })?;
        info!(
            width = image.width(),
            height = image.height(),
            "Sheet image loaded"
        );
        Ok(Self { image })
    }

    /// Decode a sheet from raw encoded bytes (JPEG, PNG, WebP, etc.).
    #[instrument(skip(data), fields(data_len = data.len()))]
    pub fn from_bytes(data: &[u8]) -> Result<Self> {
        let image = image::load_from_memory(data).map_err(|err| {
            MarkwerkError::InputUnavailable(format!("failed to decode sheet image: {}", err))
        })?;
        debug!(
            width = image.width(),
            height = image.height(),
            "Sheet image decoded from bytes"
        );
        Ok(Self { image })
    }

    /// Wrap an already-decoded `DynamicImage`.
    pub fn from_dynamic(image: DynamicImage) -> Self {
        Self { image }
    }

    // -- Accessors ------------------------------------------------------------

    pub fn width(&self) -> u32 {
        self.image.width()
    }

    pub fn height(&self) -> u32 {
        self.image.height()
    }

    pub fn as_dynamic(&self) -> &DynamicImage {
        &self.image
    }

    pub fn into_dynamic(self) -> DynamicImage {
        self.image
    }

    // -- Transformations ------------------------------------------------------

    /// Scale to exactly `width` pixels wide, height following the aspect ratio
    /// (`rows * width / cols`, integer division). Returns `self` untouched when
    /// the sheet is already that wide.
    #[instrument(skip(self), fields(width))]
    pub fn resize_to_width(self, width: u32) -> Self {
        let (cols, rows) = (self.image.width(), self.image.height());
        if cols == width || cols == 0 || width == 0 {
            return self;
        }
        let height = ((u64::from(rows) * u64::from(width)) / u64::from(cols)).max(1) as u32;
        info!(from_w = cols, from_h = rows, width, height, "Resizing sheet");
        Self {
            image: self.image.resize_exact(width, height, FilterType::Triangle),
        }
    }

    // -- Derived buffers ------------------------------------------------------

    /// Luma conversion.
    pub fn to_gray(&self) -> GrayImage {
        self.image.to_luma8()
    }

    /// Grayscale then fixed global threshold: values above `threshold` become
    /// white (255), the rest black (0).
    #[instrument(skip(self), fields(threshold))]
    pub fn binarize(&self, threshold: u8) -> GrayImage {
        let binary = threshold_binary(&self.to_gray(), threshold);
        debug!("Binarization complete");
        binary
    }

    // -- Output ---------------------------------------------------------------

    /// Encode the sheet as PNG bytes.
    pub fn to_png_bytes(&self) -> Result<Vec<u8>> {
        let mut buffer = Vec::new();
        let mut cursor = std::io::Cursor::new(&mut buffer);
        self.image
            .write_to(&mut cursor, ImageFormat::Png)
            .map_err(|err| MarkwerkError::ImageError(format!("PNG encoding failed: {}", err)))?;
        Ok(buffer)
    }
}

/// Fixed-threshold binarization of a grayscale buffer.
pub fn threshold_binary(gray: &GrayImage, threshold: u8) -> GrayImage {
    ImageBuffer::from_fn(gray.width(), gray.height(), |x, y| {
        let value = gray.get_pixel(x, y).0[0];
        Luma([if value > threshold { 255u8 } else { 0u8 }])
    })
}

// -- Morphology ---------------------------------------------------------------
//
// Bright pixels are the foreground: dilation grows white, erosion grows black.

/// Morphological closing with a `width` x `width` square element: dilate,
/// then erode. Dark specks and gaps narrower than the element disappear.
///
/// An even `width` behaves like the next smaller odd one; 0 and 1 return a
/// copy.
pub fn close(gray: &GrayImage, width: u32) -> GrayImage {
    let radius = u8::try_from(width / 2).unwrap_or(u8::MAX);
    if radius == 0 {
        return gray.clone();
    }
    debug!(width, "Closing");
    morphology::close(gray, Norm::LInf, radius)
}

/// Grow bright areas by one pixel in every direction (3x3 square).
pub fn dilate(gray: &GrayImage) -> GrayImage {
    morphology::dilate(gray, Norm::LInf, 1)
}

/// Shrink bright areas by one pixel in every direction (3x3 square).
pub fn erode(gray: &GrayImage) -> GrayImage {
    morphology::erode(gray, Norm::LInf, 1)
}

/// Photographic negative: every value `v` becomes `255 - v`.
pub fn invert(gray: &GrayImage) -> GrayImage {
    let mut inverted = gray.clone();
    image::imageops::invert(&mut inverted);
    inverted
}

/// Copy the part of `gray` covered by `rect`, clamped to the buffer bounds.
pub fn crop(gray: &GrayImage, rect: Rect) -> GrayImage {
    let (img_w, img_h) = gray.dimensions();
    let safe_x = (rect.x.max(0) as u32).min(img_w.saturating_sub(1));
    let safe_y = (rect.y.max(0) as u32).min(img_h.saturating_sub(1));
    let safe_w = rect.width.min(img_w.saturating_sub(safe_x));
    let safe_h = rect.height.min(img_h.saturating_sub(safe_y));

    debug!(safe_x, safe_y, safe_w, safe_h, "Cropping region");
    image::imageops::crop_imm(gray, safe_x, safe_y, safe_w, safe_h).to_image()
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::RgbImage;

    #[test]
    fn resize_to_width_keeps_aspect_ratio() {
        let sheet = SheetImage::from_dynamic(DynamicImage::ImageLuma8(GrayImage::new(400, 300)));
        let resized = sheet.resize_to_width(200);
        assert_eq!(resized.width(), 200);
        assert_eq!(resized.height(), 150);
    }

    #[test]
    fn resize_to_current_width_is_noop() {
        let gray = GrayImage::from_fn(20, 10, |x, y| Luma([(x * 7 + y * 3) as u8]));
        let sheet = SheetImage::from_dynamic(DynamicImage::ImageLuma8(gray.clone()));
        let resized = sheet.resize_to_width(20);
        assert_eq!(resized.to_gray(), gray);
    }

    #[test]
    fn binarize_splits_at_threshold() {
        let mut rgb = RgbImage::from_pixel(4, 1, image::Rgb([255, 255, 255]));
        rgb.put_pixel(0, 0, image::Rgb([0, 0, 0]));
        rgb.put_pixel(1, 0, image::Rgb([200, 200, 200]));
        rgb.put_pixel(2, 0, image::Rgb([201, 201, 201]));
        let sheet = SheetImage::from_dynamic(DynamicImage::ImageRgb8(rgb));

        let binary = sheet.binarize(200);
        let values: Vec<u8> = binary.pixels().map(|p| p.0[0]).collect();
        assert_eq!(values, vec![0, 0, 255, 255]);
    }

    #[test]
    fn crop_clamps_to_bounds() {
        let gray = GrayImage::from_pixel(50, 40, Luma([9u8]));
        let cropped = crop(&gray, Rect::new(40, 30, 100, 100));
        assert_eq!(cropped.dimensions(), (10, 10));

        let inside = crop(&gray, Rect::new(5, 5, 10, 20));
        assert_eq!(inside.dimensions(), (10, 20));
    }

    #[test]
    fn closing_removes_specks_but_keeps_blocks() {
        let mut gray = GrayImage::from_pixel(30, 30, Luma([255u8]));
        gray.put_pixel(5, 5, Luma([0]));
        for y in 15..22 {
            for x in 15..22 {
                gray.put_pixel(x, y, Luma([0]));
            }
        }

        let closed = close(&gray, 3);
        assert_eq!(closed.get_pixel(5, 5).0[0], 255);
        assert_eq!(closed.get_pixel(18, 18).0[0], 0);
        assert_eq!(closed.get_pixel(15, 15).0[0], 0);
        assert_eq!(close(&gray, 1), gray);
    }

    #[test]
    fn dilate_and_erode_move_by_one_pixel() {
        let mut dot = GrayImage::new(9, 9);
        dot.put_pixel(4, 4, Luma([255]));
        let grown = dilate(&dot);
        let white = grown.pixels().filter(|p| p.0[0] == 255).count();
        assert_eq!(white, 9);
        assert_eq!(grown.get_pixel(3, 5).0[0], 255);
        assert_eq!(grown.get_pixel(2, 4).0[0], 0);

        let shrunk = erode(&grown);
        assert_eq!(shrunk, dot);
    }

    #[test]
    fn invert_swaps_black_and_white() {
        let gray = GrayImage::from_fn(3, 1, |x, _| Luma([[0u8, 77, 255][x as usize]]));
        let values: Vec<u8> = invert(&gray).pixels().map(|p| p.0[0]).collect();
        assert_eq!(values, vec![255, 178, 0]);
    }

    #[test]
    fn png_round_trip_through_bytes() {
        let gray = GrayImage::from_fn(16, 8, |x, _| Luma([(x * 16) as u8]));
        let sheet = SheetImage::from_dynamic(DynamicImage::ImageLuma8(gray.clone()));
        let bytes = sheet.to_png_bytes().unwrap();
        let decoded = SheetImage::from_bytes(&bytes).unwrap();
        assert_eq!(decoded.to_gray(), gray);
    }

    #[test]
    fn garbage_bytes_are_input_unavailable() {
        let err = SheetImage::from_bytes(b"definitely not an image").unwrap_err();
        assert!(matches!(err, MarkwerkError::InputUnavailable(_)));
    }

    #[test]
    fn missing_file_is_input_unavailable() {
        let dir = tempfile::tempdir().unwrap();
        let err = SheetImage::open(dir.path().join("absent.png")).unwrap_err();
        assert!(matches!(err, MarkwerkError::InputUnavailable(_)));
    }

    #[test]
    fn open_reads_saved_sheet() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("sheet.png");
        GrayImage::from_pixel(12, 6, Luma([77u8])).save(&path).unwrap();

        let sheet = SheetImage::open(&path).unwrap();
        assert_eq!((sheet.width(), sheet.height()), (12, 6));
    }
}
