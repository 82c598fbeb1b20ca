// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Image processor: decoding, canvas-preserving rotation, contrast scaling,
// and encoding. Operates on in-memory images using the `image` and
// `imageproc` crates.

use image::{DynamicImage, ImageFormat, Rgb, RgbImage};
use imageproc::geometric_transformations::{self, Interpolation};
use sheetgrade_core::error::SheetgradeError;
use tracing::{debug, info, instrument};

/// Image processing pipeline operating on a single in-memory image.
///
/// All operations are non-destructive: each method consumes `self` and returns a
/// new `ImageProcessor` wrapping the transformed image, enabling method chaining.
///
/// ```ignore
/// let png = ImageProcessor::from_bytes(&upload)?
///     .rotate_about_center(-2.5)
///     .scale_contrast(0.8, 5.0)
///     .to_png_bytes()?;
/// ```
pub struct ImageProcessor {
    /// The current working image.
    image: DynamicImage,
}

impl ImageProcessor {
    // -- Construction ---------------------------------------------------------

    /// Load an image from a file path.
    #[instrument(skip_all, fields(path = %path.as_ref().display()))]
    pub fn open(path: impl AsRef<std::path::Path>) -> Result<Self, SheetgradeError> {
        let img = image::open(path.as_ref()).map_err(|err| {
            SheetgradeError::Input(format!("{}: {}", path.as_ref().display(), err))
        })?;
        info!(width = img.width(), height = img.height(), "Image loaded");
        Ok(Self { image: img })
    }

    /// Create a processor from raw encoded bytes (JPEG, PNG, etc.).
    #[instrument(skip(data), fields(data_len = data.len()))]
    pub fn from_bytes(data: &[u8]) -> Result<Self, SheetgradeError> {
        let img = image::load_from_memory(data)
            .map_err(|err| SheetgradeError::Input(err.to_string()))?;
        debug!(
            width = img.width(),
            height = img.height(),
            "Image decoded from bytes"
        );
        Ok(Self { image: img })
    }

    /// Wrap an already-decoded `DynamicImage`.
    pub fn from_dynamic(image: DynamicImage) -> Self {
        Self { image }
    }

    // -- Accessors ------------------------------------------------------------

    /// Current image width in pixels.
    pub fn width(&self) -> u32 {
        self.image.width()
    }

    /// Current image height in pixels.
    pub fn height(&self) -> u32 {
        self.image.height()
    }

    /// Borrow the underlying `DynamicImage`.
    pub fn as_dynamic(&self) -> &DynamicImage {
        &self.image
    }

    /// Consume the processor and return the underlying `DynamicImage`.
    pub fn into_dynamic(self) -> DynamicImage {
        self.image
    }

    // -- Transformations (consume self, return new Self) -----------------------

    /// Rotate the image counter-clockwise by `degrees` about its center.
    ///
    /// The canvas keeps its original size; uncovered pixels are filled with
    /// white so they read as blank paper to later thresholding passes.
    #[instrument(skip(self), fields(degrees))]
    pub fn rotate_about_center(self, degrees: f32) -> Self {
        if degrees.abs() < 0.01 {
            debug!("Rotation below 0.01 degrees; skipped");
            return self;
        }
        info!(degrees, "Rotating image about center");

        let rgb = self.image.to_rgb8();
        // imageproc rotates clockwise for positive angles.
        let radians = -degrees.to_radians();
        let rotated: RgbImage = geometric_transformations::rotate_about_center(
            &rgb,
            radians,
            Interpolation::Bilinear,
            Rgb([255u8, 255, 255]),
        );

        Self {
            image: DynamicImage::ImageRgb8(rotated),
        }
    }

    /// Linear contrast rescale `|gain * v + offset|`, saturated to `0..=255`,
    /// applied to every color channel.
    #[instrument(skip(self), fields(gain, offset))]
    pub fn scale_contrast(self, gain: f32, offset: f32) -> Self {
        debug!(gain, offset, "Scaling contrast");

        let mut rgb = self.image.to_rgb8();
        for pixel in rgb.pixels_mut() {
            for channel in pixel.0.iter_mut() {
                let val = (gain * *channel as f32 + offset).abs().round();
                *channel = val.clamp(0.0, 255.0) as u8;
            }
        }

        Self {
            image: DynamicImage::ImageRgb8(rgb),
        }
    }

    // -- Output ---------------------------------------------------------------

    /// Encode the current image as PNG bytes.
    pub fn to_png_bytes(&self) -> Result<Vec<u8>, SheetgradeError> {
        encode_to_format(&self.image, ImageFormat::Png)
    }

    /// Write the image to a file. The format is inferred from the file extension.
    pub fn save(&self, path: impl AsRef<std::path::Path>) -> Result<(), SheetgradeError> {
        self.image.save(path.as_ref()).map_err(|err| {
            SheetgradeError::Encoding(format!(
                "failed to save image to {}: {}",
                path.as_ref().display(),
                err
            ))
        })
    }
}

/// Encode a `DynamicImage` into the specified format, returning the raw bytes.
fn encode_to_format(
    image: &DynamicImage,
    format: ImageFormat,
) -> Result<Vec<u8>, SheetgradeError> {
    let mut buffer = Vec::new();
    let mut cursor = std::io::Cursor::new(&mut buffer);
    image
        .write_to(&mut cursor, format)
        .map_err(|err| SheetgradeError::Encoding(err.to_string()))?;
    Ok(buffer)
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{GrayImage, Luma};

    #[test]
    fn garbage_bytes_are_an_input_error() {
        let result = ImageProcessor::from_bytes(b"definitely not an image");
        assert!(matches!(result, Err(SheetgradeError::Input(_))));
    }

    #[test]
    fn png_round_trip_preserves_dimensions() {
        let img = DynamicImage::ImageLuma8(GrayImage::from_pixel(31, 17, Luma([90u8])));
        let png = ImageProcessor::from_dynamic(img).to_png_bytes().unwrap();
        let decoded = ImageProcessor::from_bytes(&png).unwrap();
        assert_eq!((decoded.width(), decoded.height()), (31, 17));
    }

    #[test]
    fn rotation_keeps_canvas_size() {
        let img = DynamicImage::ImageRgb8(RgbImage::from_pixel(120, 80, Rgb([10, 10, 10])));
        let rotated = ImageProcessor::from_dynamic(img).rotate_about_center(12.0);
        assert_eq!((rotated.width(), rotated.height()), (120, 80));
        // Corners are uncovered by the rotated content and read as white.
        let rgb = rotated.as_dynamic().to_rgb8();
        assert_eq!(rgb.get_pixel(0, 0), &Rgb([255, 255, 255]));
    }

    #[test]
    fn contrast_scale_saturates() {
        let img = DynamicImage::ImageRgb8(RgbImage::from_pixel(2, 2, Rgb([0, 100, 255])));
        let out = ImageProcessor::from_dynamic(img)
            .scale_contrast(0.8, 5.0)
            .into_dynamic()
            .to_rgb8();
        assert_eq!(out.get_pixel(0, 0), &Rgb([5, 85, 209]));
    }
}
