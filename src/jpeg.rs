//! JPEG marker segments: locating the EXIF APP1 block and splicing a new one.

use std::ops::Range;

use thiserror::Error;

const SOI: u8 = 0xD8;
const EOI: u8 = 0xD9;
const SOS: u8 = 0xDA;
const TEM: u8 = 0x01;
pub const APP0: u8 = 0xE0;
pub const APP1: u8 = 0xE1;

/// Identifier that opens an EXIF APP1 payload.
pub const EXIF_HEADER: &[u8; 6] = b"Exif\0\0";

// Marker (2) + length (2); the length field counts itself.
const SEGMENT_OVERHEAD: usize = 4;
const MAX_SEGMENT_LEN: usize = u16::MAX as usize;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum SegmentError {
    #[error("missing JPEG start-of-image marker")]
    NotJpeg,
    #[error("truncated segment at byte {0}")]
    Truncated(usize),
    #[error("expected marker at byte {offset}, found 0x{byte:02X}")]
    BadMarker { offset: usize, byte: u8 },
    #[error("no start-of-scan marker before end of image")]
    NoScan,
    #[error("EXIF payload of {0} bytes does not fit in one segment")]
    TooLarge(usize),
}

/// A header segment; `range` covers the marker through the end of the payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Segment {
    pub marker: u8,
    pub range: Range<usize>,
}

impl Segment {
    pub fn payload<'a>(&self, data: &'a [u8]) -> &'a [u8] {
        &data[self.range.start + SEGMENT_OVERHEAD..self.range.end]
    }

    fn is_exif(&self, data: &[u8]) -> bool {
        self.marker == APP1 && self.payload(data).starts_with(EXIF_HEADER)
    }
}

/// Header segments from SOI up to and including SOS.
pub fn segments(data: &[u8]) -> Result<Vec<Segment>, SegmentError> {
    if !data.starts_with(&[0xFF, SOI]) {
        return Err(SegmentError::NotJpeg);
    }
    let mut out = Vec::new();
    let mut pos = 2;
    loop {
        let start = pos;
        match data.get(pos) {
            Some(0xFF) => {}
            Some(&byte) => return Err(SegmentError::BadMarker { offset: pos, byte }),
            None => return Err(SegmentError::Truncated(pos)),
        }
        // Fill bytes may precede the marker code.
        while data.get(pos) == Some(&0xFF) {
            pos += 1;
        }
        let marker = *data.get(pos).ok_or(SegmentError::Truncated(pos))?;
        pos += 1;
        match marker {
            TEM | 0xD0..=0xD7 => continue,
            EOI => return Err(SegmentError::NoScan),
            SOI | 0x00 => {
                return Err(SegmentError::BadMarker {
                    offset: pos - 1,
                    byte: marker,
                });
            }
            _ => {}
        }
        let len = data
            .get(pos..pos + 2)
            .map(|b| usize::from(u16::from_be_bytes([b[0], b[1]])))
            .ok_or(SegmentError::Truncated(pos))?;
        if len < 2 || pos + len > data.len() {
            return Err(SegmentError::Truncated(start));
        }
        pos += len;
        // Normalise ranges that began with fill bytes to a two-byte marker.
        let range = (pos - len - 2)..pos;
        out.push(Segment { marker, range });
        if marker == SOS {
            return Ok(out);
        }
    }
}

/// The APP1 EXIF segment and its TIFF payload, if the stream has one.
pub fn find_exif(data: &[u8]) -> Result<Option<(Segment, &[u8])>, SegmentError> {
    let found = segments(data)?.into_iter().find(|s| s.is_exif(data));
    Ok(found.map(|segment| {
        let tiff = &segment.payload(data)[EXIF_HEADER.len()..];
        (segment, tiff)
    }))
}

/// Encode `tiff` as a complete APP1 EXIF segment.
pub fn exif_segment(tiff: &[u8]) -> Result<Vec<u8>, SegmentError> {
    let len = 2 + EXIF_HEADER.len() + tiff.len();
    if len > MAX_SEGMENT_LEN {
        return Err(SegmentError::TooLarge(tiff.len()));
    }
    let mut out = Vec::with_capacity(len + 2);
    out.extend_from_slice(&[0xFF, APP1]);
    out.extend_from_slice(&(len as u16).to_be_bytes());
    out.extend_from_slice(EXIF_HEADER);
    out.extend_from_slice(tiff);
    Ok(out)
}

/// Put `tiff` into `jpeg` as its EXIF segment.
///
/// An existing EXIF segment is replaced where it stands. Otherwise the new
/// segment goes after a leading APP0 (JFIF) segment, or directly after SOI.
pub fn splice_exif(jpeg: &[u8], tiff: &[u8]) -> Result<Vec<u8>, SegmentError> {
    let segs = segments(jpeg)?;
    let app1 = exif_segment(tiff)?;

    let (cut, insert_at) = match segs.iter().find(|s| s.is_exif(jpeg)) {
        Some(existing) => (existing.range.clone(), existing.range.start),
        None => {
            let at = match segs.first() {
                Some(first) if first.marker == APP0 => first.range.end,
                _ => 2,
            };
            (at..at, at)
        }
    };

    let mut out = Vec::with_capacity(jpeg.len() - cut.len() + app1.len());
    out.extend_from_slice(&jpeg[..insert_at]);
    out.extend_from_slice(&app1);
    out.extend_from_slice(&jpeg[cut.end..]);
    Ok(out)
}
