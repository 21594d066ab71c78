//! Pixel transform boundary and the default engine built on the `image` crate.

use std::io::Cursor;

use image::codecs::jpeg::{JpegDecoder, JpegEncoder};
use image::{DynamicImage, ImageDecoder, ImageEncoder};
use thiserror::Error;
use tracing::debug;

use crate::orientation::{Dimensions, Rotation, Transform};

#[derive(Debug, Error)]
pub enum EngineError {
    #[error("cannot decode JPEG: {0}")]
    Decode(#[source] image::ImageError),
    #[error("cannot encode JPEG: {0}")]
    Encode(#[source] image::ImageError),
}

/// Output of a transform: a complete JPEG stream and its new size.
#[derive(Debug, Clone)]
pub struct Transformed {
    pub jpeg: Vec<u8>,
    pub dimensions: Dimensions,
}

/// Rotates/flips compressed JPEG data.
///
/// Implementations must either return a complete stream or an error; partial
/// output is never surfaced.
pub trait TransformEngine: Send + Sync {
    fn transform(
        &self,
        jpeg: &[u8],
        transform: Transform,
        quality: u8,
    ) -> Result<Transformed, EngineError>;
}

/// Decodes with `image`, applies the transform, re-encodes at `quality`.
///
/// An embedded ICC profile is written back into the new stream.
#[derive(Debug, Clone, Copy, Default)]
pub struct ImageEngine;

impl ImageEngine {
    pub fn apply(img: DynamicImage, transform: Transform) -> DynamicImage {
        let mut img = img;
        if transform.flip_horizontal {
            img = img.fliph();
        }
        if transform.flip_vertical {
            img = img.flipv();
        }
        match transform.rotation {
            Rotation::None => img,
            Rotation::Cw90 => img.rotate90(),
            Rotation::Cw180 => img.rotate180(),
            Rotation::Cw270 => img.rotate270(),
        }
    }
}

impl TransformEngine for ImageEngine {
    fn transform(
        &self,
        jpeg: &[u8],
        transform: Transform,
        quality: u8,
    ) -> Result<Transformed, EngineError> {
        let mut decoder = JpegDecoder::new(Cursor::new(jpeg)).map_err(EngineError::Decode)?;
        let icc = decoder.icc_profile().map_err(EngineError::Decode)?;
        let img = DynamicImage::from_decoder(decoder).map_err(EngineError::Decode)?;
        debug!(
            width = img.width(),
            height = img.height(),
            color = ?img.color(),
            icc_len = icc.as_ref().map_or(0, Vec::len),
            "decoded"
        );

        let img = Self::apply(img, transform);
        // JPEG has no alpha; grayscale stays grayscale, everything else is RGB.
        let img = match img {
            DynamicImage::ImageLuma8(_) | DynamicImage::ImageRgb8(_) => img,
            DynamicImage::ImageLuma16(_) | DynamicImage::ImageLumaA8(_) => {
                DynamicImage::ImageLuma8(img.to_luma8())
            }
            other => DynamicImage::ImageRgb8(other.to_rgb8()),
        };
        let dimensions = Dimensions::new(img.width(), img.height());

        let mut out = Vec::new();
        let mut encoder = JpegEncoder::new_with_quality(&mut out, quality.clamp(1, 100));
        if let Some(icc) = icc {
            encoder
                .set_icc_profile(icc)
                .map_err(|e| EngineError::Encode(image::ImageError::Unsupported(e)))?;
        }
        img.write_with_encoder(encoder)
            .map_err(EngineError::Encode)?;
        Ok(Transformed {
            jpeg: out,
            dimensions,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::orientation::Orientation;
    use image::{Rgb, RgbImage};

    fn marker_image() -> DynamicImage {
        // 3x2 with a red pixel at the top-left corner.
        let mut img = RgbImage::from_pixel(3, 2, Rgb([0, 0, 0]));
        img.put_pixel(0, 0, Rgb([255, 0, 0]));
        DynamicImage::ImageRgb8(img)
    }

    fn red_at(img: &DynamicImage) -> (u32, u32) {
        let rgb = img.to_rgb8();
        let (x, y, _) = rgb
            .enumerate_pixels()
            .find(|(_, _, p)| p.0 == [255, 0, 0])
            .unwrap();
        (x, y)
    }

    #[test]
    fn transforms_move_the_corner_as_expected() {
        // Where the stored top-left pixel lands after correction.
        let expected = [
            (Orientation::Normal, (0, 0)),
            (Orientation::MirrorHorizontal, (2, 0)),
            (Orientation::Rotate180, (2, 1)),
            (Orientation::MirrorVertical, (0, 1)),
            (Orientation::Transpose, (0, 0)),
            (Orientation::Rotate90, (1, 0)),
            (Orientation::Transverse, (1, 2)),
            (Orientation::Rotate270, (0, 2)),
        ];
        for (o, pos) in expected {
            let out = ImageEngine::apply(marker_image(), o.transform());
            assert_eq!(red_at(&out), pos, "{}", o.label());
            let dims = Dimensions::new(out.width(), out.height());
            assert_eq!(dims, Dimensions::new(3, 2).after(o.transform()));
        }
    }

    #[test]
    fn corrupt_input_fails_cleanly() {
        let err = ImageEngine
            .transform(b"\xFF\xD8\xFF\xDBnope", Orientation::Rotate90.transform(), 90)
            .unwrap_err();
        assert!(matches!(err, EngineError::Decode(_)));
    }
}
