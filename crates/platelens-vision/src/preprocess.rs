//! Image preprocessing matching the checkpoint's exported image processor
//!
//! The transform mirrors what the model saw at training time: resize to the
//! processor's target size with bilinear filtering, rescale u8 pixels, then
//! normalize each channel. Parameters come from the checkpoint's
//! `preprocessor_config.json` when present, otherwise the standard ViT
//! defaults (224x224, mean/std 0.5) apply.

use candle_core::{Device, Tensor};
use image::imageops::FilterType;
use image::DynamicImage;
use platelens_core::{Error, Result};
use serde::Deserialize;
use std::path::Path;

/// Raw `preprocessor_config.json` shape
#[derive(Debug, Clone, Deserialize)]
struct ProcessorSpec {
    #[serde(default = "default_true")]
    do_resize: bool,

    #[serde(default = "default_true")]
    do_rescale: bool,

    #[serde(default = "default_true")]
    do_normalize: bool,

    #[serde(default = "default_mean_std")]
    image_mean: Vec<f32>,

    #[serde(default = "default_mean_std")]
    image_std: Vec<f32>,

    #[serde(default = "default_rescale_factor")]
    rescale_factor: f32,

    #[serde(default)]
    size: Option<SizeSpec>,
}

/// Target size, covering both the legacy integer form and the explicit
/// height/width object newer exports use
#[derive(Debug, Clone, Copy, Deserialize)]
#[serde(untagged)]
enum SizeSpec {
    Square(u32),
    Explicit { height: u32, width: u32 },
}

fn default_true() -> bool {
    true
}

fn default_mean_std() -> Vec<f32> {
    vec![0.5, 0.5, 0.5]
}

fn default_rescale_factor() -> f32 {
    1.0 / 255.0
}

const DEFAULT_SIZE: u32 = 224;

/// Converts decoded images into model input tensors
#[derive(Debug, Clone)]
pub struct ImageProcessor {
    width: u32,
    height: u32,
    do_resize: bool,
    do_rescale: bool,
    do_normalize: bool,
    rescale_factor: f32,
    mean: [f32; 3],
    std: [f32; 3],
}

impl Default for ImageProcessor {
    fn default() -> Self {
        Self::new(DEFAULT_SIZE, DEFAULT_SIZE)
    }
}

impl ImageProcessor {
    /// Processor with the standard ViT normalization at an explicit size
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            do_resize: true,
            do_rescale: true,
            do_normalize: true,
            rescale_factor: default_rescale_factor(),
            mean: [0.5, 0.5, 0.5],
            std: [0.5, 0.5, 0.5],
        }
    }

    /// Load processor settings from a `preprocessor_config.json`
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path).map_err(|e| {
            Error::model(format!(
                "Failed to read processor config {}: {}",
                path.display(),
                e
            ))
        })?;

        let spec: ProcessorSpec = serde_json::from_str(&contents).map_err(|e| {
            Error::model(format!(
                "Failed to parse processor config {}: {}",
                path.display(),
                e
            ))
        })?;

        Self::from_spec(spec)
    }

    fn from_spec(spec: ProcessorSpec) -> Result<Self> {
        let (width, height) = match spec.size {
            Some(SizeSpec::Square(edge)) => (edge, edge),
            Some(SizeSpec::Explicit { height, width }) => (width, height),
            None => (DEFAULT_SIZE, DEFAULT_SIZE),
        };

        Ok(Self {
            width,
            height,
            do_resize: spec.do_resize,
            do_rescale: spec.do_rescale,
            do_normalize: spec.do_normalize,
            rescale_factor: spec.rescale_factor,
            mean: channel_triple(&spec.image_mean, "image_mean")?,
            std: channel_triple(&spec.image_std, "image_std")?,
        })
    }

    /// Target width in pixels
    pub fn width(&self) -> u32 {
        self.width
    }

    /// Target height in pixels
    pub fn height(&self) -> u32 {
        self.height
    }

    /// Convert a decoded image into a `(3, H, W)` f32 tensor
    pub fn preprocess(&self, image: &DynamicImage, device: &Device) -> Result<Tensor> {
        let rgb = image.to_rgb8();

        // Triangle is the bilinear filter, matching resample=2 in the
        // exported processor config.
        let rgb = if self.do_resize && (rgb.width() != self.width || rgb.height() != self.height) {
            image::imageops::resize(&rgb, self.width, self.height, FilterType::Triangle)
        } else {
            rgb
        };

        let width = rgb.width() as usize;
        let height = rgb.height() as usize;
        let plane = width * height;
        let mut pixels = vec![0f32; 3 * plane];

        for (x, y, pixel) in rgb.enumerate_pixels() {
            let offset = y as usize * width + x as usize;
            for (channel, &value) in pixel.0.iter().enumerate() {
                let mut value = value as f32;
                if self.do_rescale {
                    value *= self.rescale_factor;
                }
                if self.do_normalize {
                    value = (value - self.mean[channel]) / self.std[channel];
                }
                pixels[channel * plane + offset] = value;
            }
        }

        Tensor::from_vec(pixels, (3, height, width), device)
            .map_err(|e| Error::image(format!("Failed to build input tensor: {}", e)))
    }
}

fn channel_triple(values: &[f32], field: &str) -> Result<[f32; 3]> {
    match values {
        [r, g, b] => Ok([*r, *g, *b]),
        other => Err(Error::model(format!(
            "{} must have 3 channels, got {}",
            field,
            other.len()
        ))),
    }
}
