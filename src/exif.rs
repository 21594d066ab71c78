//! Reading the orientation out of a JPEG's EXIF block and writing it back.
//!
//! Parsing and typed field lookup go through `kamadak-exif`; rewriting
//! patches the original TIFF payload in place so every byte not describing
//! orientation or pixel dimensions survives untouched.

use ::exif::{In, Tag};
use thiserror::Error;
use tracing::debug;

use crate::jpeg::{self, SegmentError};
use crate::orientation::{Dimensions, Orientation};
use crate::tiff::{self, PatchError, TiffCursor};

/// Why the orientation could not be read.
#[derive(Debug, Error)]
pub enum ReadError {
    #[error("not a JPEG file: {0}")]
    Container(#[from] SegmentError),
    #[error("no EXIF segment found")]
    MissingExif,
    #[error("invalid EXIF data: {0}")]
    Exif(#[from] ::exif::Error),
    #[error("no orientation tag in primary IFD")]
    NoOrientation,
    #[error("unknown orientation value {0}")]
    UnknownOrientation(String),
}

/// Why the EXIF block could not be rewritten.
#[derive(Debug, Error)]
pub enum WriteError {
    #[error("malformed TIFF header")]
    Header,
    #[error("{tag:#06x} not found where the reader saw it")]
    Missing { tag: u16 },
    #[error("cannot patch {tag:#06x}: {reason:?}")]
    Patch { tag: u16, reason: PatchError },
}

/// Parsed EXIF block of one image.
pub struct ExifDocument {
    fields: ::exif::Exif,
}

impl std::fmt::Debug for ExifDocument {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ExifDocument")
            .field("len", &self.fields.buf().len())
            .field("little_endian", &self.fields.little_endian())
            .finish()
    }
}

impl ExifDocument {
    /// Parse a raw TIFF payload (the APP1 contents after `Exif\0\0`).
    pub fn parse(tiff: &[u8]) -> Result<Self, ReadError> {
        let fields = ::exif::Reader::new().read_raw(tiff.to_vec())?;
        Ok(Self { fields })
    }

    /// Raw TIFF payload as it appeared in the file.
    pub fn raw(&self) -> &[u8] {
        self.fields.buf()
    }

    /// Typed lookup for any field of the document.
    pub fn field(&self, tag: Tag, ifd: In) -> Option<&::exif::Field> {
        self.fields.get_field(tag, ifd)
    }

    pub fn orientation(&self) -> Result<Orientation, ReadError> {
        let field = self
            .field(Tag::Orientation, In::PRIMARY)
            .ok_or(ReadError::NoOrientation)?;
        match field.value.get_uint(0) {
            Some(raw) => {
                Orientation::from_exif(raw).ok_or(ReadError::UnknownOrientation(raw.to_string()))
            }
            None => Err(ReadError::UnknownOrientation(format!("{:?}", field.value))),
        }
    }

    /// Payload equal to the original except for the orientation tag and,
    /// when present, the Exif IFD pixel dimensions.
    pub fn rewrite(
        &self,
        orientation: Orientation,
        dimensions: Dimensions,
    ) -> Result<Vec<u8>, WriteError> {
        let mut out = self.raw().to_vec();
        let cursor = TiffCursor::new(self.raw()).ok_or(WriteError::Header)?;
        let endian = cursor.endian();

        let entry = cursor
            .find(cursor.ifd0(), tiff::TAG_ORIENTATION)
            .ok_or(WriteError::Missing {
                tag: tiff::TAG_ORIENTATION,
            })?;
        tiff::patch_uint(&mut out, endian, &entry, u32::from(orientation.value())).map_err(
            |reason| WriteError::Patch {
                tag: tiff::TAG_ORIENTATION,
                reason,
            },
        )?;

        if let Some(exif_ifd) = cursor.exif_ifd() {
            for (tag, value) in [
                (tiff::TAG_PIXEL_X_DIMENSION, dimensions.width),
                (tiff::TAG_PIXEL_Y_DIMENSION, dimensions.height),
            ] {
                let Some(entry) = cursor.find(exif_ifd, tag) else {
                    continue;
                };
                tiff::patch_uint(&mut out, endian, &entry, value)
                    .map_err(|reason| WriteError::Patch { tag, reason })?;
                debug!(tag = format_args!("{tag:#06x}"), value, "updated pixel dimension");
            }
        }
        Ok(out)
    }

    /// Payload with nothing but the orientation, in the original byte order.
    pub fn stripped(&self, orientation: Orientation) -> Vec<u8> {
        let endian = if self.fields.little_endian() {
            tiff::Endian::Little
        } else {
            tiff::Endian::Big
        };
        tiff::minimal_with_orientation(endian, orientation.value())
    }
}

/// Locate the EXIF block of `jpeg` and read its orientation.
pub fn read(jpeg: &[u8]) -> Result<(Orientation, ExifDocument), ReadError> {
    let (_, payload) = jpeg::find_exif(jpeg)?.ok_or(ReadError::MissingExif)?;
    let doc = ExifDocument::parse(payload)?;
    let orientation = doc.orientation()?;
    debug!(orientation = orientation.value(), label = orientation.label(), "read orientation");
    Ok((orientation, doc))
}
