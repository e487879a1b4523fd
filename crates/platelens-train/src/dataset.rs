//! Labeled image dataset for multi-label training
//!
//! The dataset directory holds the image files plus a `labels.csv` where
//! each row is `filename,idx;idx;...` with semicolon-separated class
//! indices. A row with no indices marks an image with no positive labels.

use anyhow::{Context, Result};
use candle_core::{Device, Tensor};
use image::imageops::FilterType;
use std::path::{Path, PathBuf};

const LABELS_FILE: &str = "labels.csv";

/// Training image size, matching the backbone's input resolution
pub const IMG_SIZE: u32 = 224;

struct Sample {
    path: PathBuf,
    classes: Vec<usize>,
}

/// A directory of labeled food images
pub struct Dataset {
    samples: Vec<Sample>,
    num_classes: usize,
}

impl Dataset {
    /// Load the label index from `root/labels.csv`
    ///
    /// Image files are opened lazily when batches are built.
    pub fn load(root: &Path, num_classes: usize) -> Result<Self> {
        let labels_path = root.join(LABELS_FILE);
        let contents = std::fs::read_to_string(&labels_path)
            .with_context(|| format!("Failed to read {}", labels_path.display()))?;

        let mut samples = Vec::new();
        for (line_no, line) in contents.lines().enumerate() {
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }
            if line_no == 0 && line.eq_ignore_ascii_case("filename,labels") {
                continue;
            }

            let (name, classes) = line
                .split_once(',')
                .with_context(|| format!("Malformed line {} in labels.csv", line_no + 1))?;

            let mut parsed = Vec::new();
            for index in classes.split(';').filter(|s| !s.is_empty()) {
                let index: usize = index.trim().parse().with_context(|| {
                    format!("Bad class index '{}' on line {}", index, line_no + 1)
                })?;
                if index >= num_classes {
                    anyhow::bail!(
                        "Class index {} out of range on line {} (have {} classes)",
                        index,
                        line_no + 1,
                        num_classes
                    );
                }
                parsed.push(index);
            }

            samples.push(Sample {
                path: root.join(name.trim()),
                classes: parsed,
            });
        }

        Ok(Self {
            samples,
            num_classes,
        })
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// Build an input/target batch from sample indices
    ///
    /// Inputs come out as `(B, 3, 224, 224)` floats in `[0, 1]`, targets as
    /// `(B, num_classes)` multi-hot floats.
    pub fn batch(&self, indices: &[usize], device: &Device) -> Result<(Tensor, Tensor)> {
        let mut images = Vec::with_capacity(indices.len());
        let mut targets = Vec::with_capacity(indices.len() * self.num_classes);

        for &index in indices {
            let sample = &self.samples[index];
            images.push(load_image_tensor(&sample.path, IMG_SIZE, device)?);
            targets.extend_from_slice(&self.multi_hot(sample));
        }

        let images = Tensor::stack(&images, 0)?;
        let targets = Tensor::from_vec(targets, (indices.len(), self.num_classes), device)?;
        Ok((images, targets))
    }

    fn multi_hot(&self, sample: &Sample) -> Vec<f32> {
        let mut row = vec![0f32; self.num_classes];
        for &class in &sample.classes {
            row[class] = 1.0;
        }
        row
    }
}

/// Decode, resize, and rescale an image into a `(3, H, W)` float tensor
fn load_image_tensor(path: &Path, size: u32, device: &Device) -> Result<Tensor> {
    let image =
        image::open(path).with_context(|| format!("Failed to open {}", path.display()))?;
    let rgb = image.to_rgb8();
    let rgb = image::imageops::resize(&rgb, size, size, FilterType::Triangle);

    let plane = (size * size) as usize;
    let mut pixels = vec![0f32; 3 * plane];
    for (x, y, pixel) in rgb.enumerate_pixels() {
        let offset = y as usize * size as usize + x as usize;
        for (channel, &value) in pixel.0.iter().enumerate() {
            pixels[channel * plane + offset] = value as f32 / 255.0;
        }
    }

    let tensor = Tensor::from_vec(pixels, (3, size as usize, size as usize), device)?;
    Ok(tensor)
}
