//! Preview Encoding

use crate::error::{ErrorKind, Result};
use exn::ResultExt;
use image::imageops::FilterType;
use image::{DynamicImage, ImageFormat};
use jpeg_encoder::{ColorType, Encoder};

const RIFF_MAGIC: &[u8; 4] = b"RIFF";
const WEBP_MAGIC: &[u8; 4] = b"WEBP";

pub const DEFAULT_MAX_DIMENSION: u32 = 512;
pub const DEFAULT_QUALITY: u8 = 70;

/// Turns page (or cover) images into progressive JPEGs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Thumbnailer {
    /// The longer side of a thumbnail is scaled down to fit this.
    pub max_dimension: u32,
    /// JPEG quality, 1 to 100.
    pub quality: u8,
}
impl Default for Thumbnailer {
    fn default() -> Self {
        Self {
            max_dimension: DEFAULT_MAX_DIMENSION,
            quality: DEFAULT_QUALITY,
        }
    }
}
impl Thumbnailer {
    /// Decode `bytes` and produce a JPEG whose longer side is at most
    /// [`max_dimension`](Self::max_dimension). Small images are never
    /// upscaled.
    pub fn thumbnail(&self, bytes: &[u8]) -> Result<Vec<u8>> {
        let image = decode(bytes)?;
        let image = if image.width().max(image.height()) > self.max_dimension {
            // `resize` preserves the aspect ratio and fits within the bounds.
            image.resize(self.max_dimension, self.max_dimension, FilterType::Lanczos3)
        } else {
            image
        };
        self.encode(&image)
    }

    /// Decode `bytes` and re-encode them as JPEG at their original size.
    pub fn reencode(&self, bytes: &[u8]) -> Result<Vec<u8>> {
        self.encode(&decode(bytes)?)
    }

    fn encode(&self, image: &DynamicImage) -> Result<Vec<u8>> {
        let rgb = image.to_rgb8();
        let width = u16::try_from(rgb.width()).or_raise(|| ErrorKind::Encode)?;
        let height = u16::try_from(rgb.height()).or_raise(|| ErrorKind::Encode)?;
        let mut output = Vec::new();
        let mut encoder = Encoder::new(&mut output, self.quality);
        encoder.set_progressive(true);
        encoder.encode(rgb.as_raw(), width, height, ColorType::Rgb).or_raise(|| ErrorKind::Encode)?;
        Ok(output)
    }
}

fn is_webp(bytes: &[u8]) -> bool {
    bytes.len() >= 12 && bytes[0..4] == *RIFF_MAGIC && bytes[8..12] == *WEBP_MAGIC
}

fn decode(bytes: &[u8]) -> Result<DynamicImage> {
    let decoded = if is_webp(bytes) {
        image::load_from_memory_with_format(bytes, ImageFormat::WebP)
    } else {
        image::load_from_memory(bytes)
    };
    decoded.or_raise(|| {
        let format = image::guess_format(bytes).map(|f| format!("{f:?}")).unwrap_or_else(|_| "unknown".to_string());
        ErrorKind::Decode(format)
    })
}
