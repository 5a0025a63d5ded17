//! Image derivative generation.
//!
//! Produces normalized, resized, JPEG-encoded derivatives of uploaded source
//! images. Decoding and encoding are CPU-bound and run on the blocking pool;
//! each derivative is written to a temp file in its destination directory and
//! renamed into place, so a partially written file is never observable at the
//! final path.

use std::path::{Path, PathBuf};

use bytes::Bytes;
use image::codecs::jpeg::JpegEncoder;
use image::imageops::FilterType;
use image::{DynamicImage, Rgb, RgbImage};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum DerivativeError {
    #[error("image decode/encode failed: {0}")]
    Image(#[from] image::ImageError),
    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[error("derivative worker failed: {0}")]
    Worker(String),
}

/// One target to render: bounding box, JPEG quality, and a label that keeps
/// multiple derivatives of the same source distinct.
#[derive(Debug, Clone)]
pub struct DerivativeSpec {
    pub label: String,
    pub max_width: u32,
    pub max_height: u32,
    pub quality: u8,
}

/// A fully written derivative.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DerivativeDescriptor {
    pub label: String,
    pub stored_path: String,
    pub width: u32,
    pub height: u32,
    pub size_bytes: u64,
}

/// Renders derivative images beneath a storage root.
pub struct DerivativePipeline {
    root: PathBuf,
    background: [u8; 3],
}

impl DerivativePipeline {
    pub fn new(root: PathBuf, background: [u8; 3]) -> Result<Self, std::io::Error> {
        std::fs::create_dir_all(&root)?;
        Ok(Self { root, background })
    }

    /// Generate one derivative per spec from the source bytes.
    ///
    /// `source_id` is the source's content identity (checksum); together with
    /// each spec it determines the derivative path, so regenerating after a
    /// source change lands on a fresh path and supersedes the old file.
    pub async fn generate(
        &self,
        source: Bytes,
        source_id: &str,
        specs: &[DerivativeSpec],
    ) -> Result<Vec<DerivativeDescriptor>, DerivativeError> {
        let root = self.root.clone();
        let background = self.background;
        let source_id = source_id.to_string();
        let specs = specs.to_vec();

        tokio::task::spawn_blocking(move || {
            let decoded = image::load_from_memory(&source)?;
            let flattened = flatten_alpha(decoded, background);

            let mut descriptors = Vec::with_capacity(specs.len());
            for spec in &specs {
                descriptors.push(render_derivative(&root, &flattened, &source_id, spec)?);
            }
            Ok(descriptors)
        })
        .await
        .map_err(|err| DerivativeError::Worker(err.to_string()))?
    }
}

/// Flatten any alpha or palette channel onto an opaque background.
///
/// JPEG is alpha-less, so transparency must be composited away before
/// encoding rather than dropped.
fn flatten_alpha(image: DynamicImage, background: [u8; 3]) -> RgbImage {
    if let DynamicImage::ImageRgb8(rgb) = image {
        return rgb;
    }

    let rgba = image.to_rgba8();
    let (width, height) = rgba.dimensions();
    let mut flat = RgbImage::from_pixel(width, height, Rgb(background));

    for (x, y, pixel) in rgba.enumerate_pixels() {
        let alpha = pixel[3] as u16;
        if alpha == 0 {
            continue;
        }
        let blend = |src: u8, dst: u8| -> u8 {
            ((src as u16 * alpha + dst as u16 * (255 - alpha)) / 255) as u8
        };
        let under = flat.get_pixel(x, y);
        flat.put_pixel(
            x,
            y,
            Rgb([
                blend(pixel[0], under[0]),
                blend(pixel[1], under[1]),
                blend(pixel[2], under[2]),
            ]),
        );
    }

    flat
}

/// Scale to fit within the spec bounds, preserving aspect ratio. Sources
/// already inside the bounds are left at their native size.
fn fit_within(image: &RgbImage, max_width: u32, max_height: u32) -> RgbImage {
    let (width, height) = image.dimensions();
    let width_ratio = max_width as f32 / width as f32;
    let height_ratio = max_height as f32 / height as f32;
    let ratio = width_ratio.min(height_ratio);

    if ratio >= 1.0 {
        return image.clone();
    }

    let new_width = ((width as f32 * ratio) as u32).max(1);
    let new_height = ((height as f32 * ratio) as u32).max(1);
    DynamicImage::ImageRgb8(image.clone())
        .resize(new_width, new_height, FilterType::Lanczos3)
        .to_rgb8()
}

fn render_derivative(
    root: &Path,
    source: &RgbImage,
    source_id: &str,
    spec: &DerivativeSpec,
) -> Result<DerivativeDescriptor, DerivativeError> {
    let resized = fit_within(source, spec.max_width, spec.max_height);
    let (width, height) = resized.dimensions();

    let stored_path = derivative_path(source_id, spec);
    let absolute = root.join(&stored_path);
    let parent = absolute
        .parent()
        .ok_or_else(|| DerivativeError::Worker("derivative path has no parent".to_string()))?;
    std::fs::create_dir_all(parent)?;

    // Encode into a sibling temp file, then rename into place.
    let mut temp = tempfile::NamedTempFile::new_in(parent)?;
    let mut encoder = JpegEncoder::new_with_quality(&mut temp, spec.quality);
    encoder.encode(resized.as_raw(), width, height, image::ColorType::Rgb8)?;
    temp.persist(&absolute)
        .map_err(|err| DerivativeError::Io(err.error))?;

    let size_bytes = std::fs::metadata(&absolute)?.len();

    Ok(DerivativeDescriptor {
        label: spec.label.clone(),
        stored_path,
        width,
        height,
        size_bytes,
    })
}

fn derivative_path(source_id: &str, spec: &DerivativeSpec) -> String {
    let shard = source_id.get(..2).unwrap_or("00");
    format!(
        "{shard}/{source_id}-{}-{}x{}-q{}.jpg",
        spec.label, spec.max_width, spec.max_height, spec.quality
    )
}
