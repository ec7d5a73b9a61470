//! # Image Preprocessing Module
//!
//! Normalizes a captured label photo before text recognition: every pixel is
//! converted to luminance and pushed through a contrast curve that darkens the
//! dark half and brightens the light half. Unevenly lit packaging print comes
//! out noticeably crisper for the OCR engine.
//!
//! The module also owns the [`Frame`] type (the raw pixel buffer handed over
//! by the camera collaborator) and the conversions around it: loading a frame
//! from an image file and encoding it as PNG for the recognizer.

use image::codecs::png::PngEncoder;
use image::{DynamicImage, ExtendedColorType, ImageEncoder};
use std::path::Path;
use tracing::debug;

/// Errors that can occur while validating or converting a captured frame.
#[derive(Debug, Clone, PartialEq)]
pub enum PreprocessingError {
    /// Width or height is zero
    InvalidDimensions { width: u32, height: u32 },
    /// Pixel buffer length does not match `width * height * channels`
    BufferSizeMismatch { expected: usize, actual: usize },
    /// Failed to load or decode an image file
    ImageLoad { message: String },
    /// Encoding the frame for the OCR engine failed
    EncodingFailed { message: String },
}

impl std::fmt::Display for PreprocessingError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PreprocessingError::InvalidDimensions { width, height } => {
                write!(f, "Invalid frame dimensions: {}x{}", width, height)
            }
            PreprocessingError::BufferSizeMismatch { expected, actual } => {
                write!(
                    f,
                    "Frame buffer has {} bytes, expected {} for its dimensions",
                    actual, expected
                )
            }
            PreprocessingError::ImageLoad { message } => {
                write!(f, "Failed to load image: {}", message)
            }
            PreprocessingError::EncodingFailed { message } => {
                write!(f, "Failed to encode frame: {}", message)
            }
        }
    }
}

impl std::error::Error for PreprocessingError {}

/// Channel layout of a frame's pixel buffer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PixelLayout {
    Rgb,
    Rgba,
}

impl PixelLayout {
    /// Bytes per pixel
    pub fn channels(self) -> usize {
        match self {
            PixelLayout::Rgb => 3,
            PixelLayout::Rgba => 4,
        }
    }

    fn color_type(self) -> ExtendedColorType {
        match self {
            PixelLayout::Rgb => ExtendedColorType::Rgb8,
            PixelLayout::Rgba => ExtendedColorType::Rgba8,
        }
    }
}

/// A single captured still frame: interleaved 8-bit pixels, row-major.
///
/// Construction validates that the buffer length matches the dimensions, so
/// every `Frame` in circulation is well formed.
#[derive(Debug, Clone, PartialEq)]
pub struct Frame {
    width: u32,
    height: u32,
    layout: PixelLayout,
    pixels: Vec<u8>,
}

impl Frame {
    /// Wrap a raw pixel buffer.
    ///
    /// # Errors
    ///
    /// `InvalidDimensions` for a zero-sized frame, `BufferSizeMismatch` when
    /// `pixels.len() != width * height * layout.channels()`.
    pub fn new(
        width: u32,
        height: u32,
        layout: PixelLayout,
        pixels: Vec<u8>,
    ) -> Result<Self, PreprocessingError> {
        if width == 0 || height == 0 {
            return Err(PreprocessingError::InvalidDimensions { width, height });
        }

        let expected = width as usize * height as usize * layout.channels();
        if pixels.len() != expected {
            return Err(PreprocessingError::BufferSizeMismatch {
                expected,
                actual: pixels.len(),
            });
        }

        Ok(Self {
            width,
            height,
            layout,
            pixels,
        })
    }

    /// Convert a decoded image into an RGBA frame
    pub fn from_image(image: &DynamicImage) -> Result<Self, PreprocessingError> {
        let rgba = image.to_rgba8();
        let (width, height) = rgba.dimensions();
        Self::new(width, height, PixelLayout::Rgba, rgba.into_raw())
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn dimensions(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    pub fn layout(&self) -> PixelLayout {
        self.layout
    }

    pub fn pixels(&self) -> &[u8] {
        &self.pixels
    }

    /// Encode the frame as PNG, the still-image format handed to the OCR engine
    pub fn encode_png(&self) -> Result<Vec<u8>, PreprocessingError> {
        let mut encoded = Vec::new();
        PngEncoder::new(&mut encoded)
            .write_image(
                &self.pixels,
                self.width,
                self.height,
                self.layout.color_type(),
            )
            .map_err(|e| PreprocessingError::EncodingFailed {
                message: e.to_string(),
            })?;
        Ok(encoded)
    }
}

/// Load an image file from disk as a frame.
///
/// The file must exist, be a regular non-empty file no larger than
/// `max_file_size` bytes, and decode as an image.
pub fn load_frame_from_file(
    path: impl AsRef<Path>,
    max_file_size: u64,
) -> Result<Frame, PreprocessingError> {
    let path = path.as_ref();
    let load_err = |message: String| PreprocessingError::ImageLoad { message };

    let metadata = std::fs::metadata(path)
        .map_err(|e| load_err(format!("cannot read {}: {}", path.display(), e)))?;
    if !metadata.is_file() {
        return Err(load_err(format!("{} is not a file", path.display())));
    }
    if metadata.len() == 0 {
        return Err(load_err(format!("{} is empty", path.display())));
    }
    if metadata.len() > max_file_size {
        return Err(load_err(format!(
            "{} is too large ({} bytes, maximum allowed: {} bytes)",
            path.display(),
            metadata.len(),
            max_file_size
        )));
    }

    let image = image::open(path).map_err(|e| load_err(e.to_string()))?;
    Frame::from_image(&image)
}

/// ITU-R BT.601 luma of an RGB triple
pub fn luminance(r: u8, g: u8, b: u8) -> f32 {
    0.299 * f32::from(r) + 0.587 * f32::from(g) + 0.114 * f32::from(b)
}

/// Contrast curve: values below mid-gray are scaled by 0.8, the rest by 1.2,
/// clamped to the byte range.
pub fn apply_contrast_curve(gray: f32) -> u8 {
    let adjusted = if gray < 128.0 { gray * 0.8 } else { gray * 1.2 };
    adjusted.round().clamp(0.0, 255.0) as u8
}

/// Grayscale + contrast-boost the frame in place.
///
/// Dimensions are unchanged; on return every pixel has R = G = B. The alpha
/// channel of RGBA frames is left as captured.
pub fn preprocess_frame(frame: &mut Frame) {
    let start_time = std::time::Instant::now();
    let channels = frame.layout.channels();

    for pixel in frame.pixels.chunks_exact_mut(channels) {
        let gray = apply_contrast_curve(luminance(pixel[0], pixel[1], pixel[2]));
        pixel[0] = gray;
        pixel[1] = gray;
        pixel[2] = gray;
    }

    debug!(
        target: "ocr_preprocessing",
        width = frame.width,
        height = frame.height,
        duration_ms = start_time.elapsed().as_millis() as u64,
        "Frame converted to contrast-boosted grayscale"
    );
}
