//! Shared fixtures: synthetic photos with hand-assembled EXIF blocks.
#![allow(dead_code)]

use std::io::Cursor;

use image::codecs::jpeg::{JpegDecoder, JpegEncoder};
use image::{DynamicImage, ImageDecoder, ImageEncoder, Rgb, RgbImage, imageops};
use jpeg_autorotate::Dimensions;

pub const RED: [u8; 3] = [255, 0, 0];
pub const GREEN: [u8; 3] = [0, 255, 0];
pub const BLUE: [u8; 3] = [0, 0, 255];
pub const WHITE: [u8; 3] = [255, 255, 255];

pub const UPRIGHT_W: u32 = 64;
pub const UPRIGHT_H: u32 = 32;

/// 64x32 image: red top-left, green top-right, blue bottom-left, white
/// bottom-right quadrant.
pub fn upright() -> RgbImage {
    RgbImage::from_fn(UPRIGHT_W, UPRIGHT_H, |x, y| {
        let right = x >= UPRIGHT_W / 2;
        let bottom = y >= UPRIGHT_H / 2;
        Rgb(match (right, bottom) {
            (false, false) => RED,
            (true, false) => GREEN,
            (false, true) => BLUE,
            (true, true) => WHITE,
        })
    })
}

/// Pixels a camera would store for `orientation` when the scene is `upright`.
pub fn stored_for(orientation: u16, upright: &RgbImage) -> RgbImage {
    match orientation {
        2 => imageops::flip_horizontal(upright),
        3 => imageops::rotate180(upright),
        4 => imageops::flip_vertical(upright),
        // transpose and transverse are their own inverse
        5 => imageops::rotate270(&imageops::flip_horizontal(upright)),
        6 => imageops::rotate270(upright),
        7 => imageops::rotate90(&imageops::flip_horizontal(upright)),
        8 => imageops::rotate90(upright),
        _ => upright.clone(),
    }
}

pub fn encode_jpeg(img: &RgbImage, quality: u8) -> Vec<u8> {
    let mut out = Vec::new();
    let encoder = JpegEncoder::new_with_quality(&mut out, quality);
    DynamicImage::ImageRgb8(img.clone())
        .write_with_encoder(encoder)
        .expect("encode fixture");
    out
}

/// Same as [`encode_jpeg`] with an embedded ICC profile.
pub fn encode_jpeg_with_icc(img: &RgbImage, quality: u8, icc: Vec<u8>) -> Vec<u8> {
    let mut out = Vec::new();
    let mut encoder = JpegEncoder::new_with_quality(&mut out, quality);
    encoder.set_icc_profile(icc).expect("JPEG takes ICC profiles");
    DynamicImage::ImageRgb8(img.clone())
        .write_with_encoder(encoder)
        .expect("encode fixture");
    out
}

/// ICC profile embedded in `jpeg`, if any.
pub fn icc_profile(jpeg: &[u8]) -> Option<Vec<u8>> {
    let mut decoder = JpegDecoder::new(Cursor::new(jpeg)).expect("decodable JPEG");
    decoder.icc_profile().expect("readable ICC segments")
}

/// Frame size from the SOF header, without decoding pixels.
pub fn frame_dimensions(jpeg: &[u8]) -> Dimensions {
    let mut decoder = jpeg_decoder::Decoder::new(jpeg);
    decoder.read_info().expect("frame header");
    let info = decoder.info().expect("frame info");
    Dimensions::new(u32::from(info.width), u32::from(info.height))
}

/// Check the four quadrant centres of an upright-sized image.
pub fn assert_upright(img: &RgbImage) {
    assert_eq!(img.dimensions(), (UPRIGHT_W, UPRIGHT_H));
    let (qw, qh) = (UPRIGHT_W / 4, UPRIGHT_H / 4);
    for (x, y, want) in [
        (qw, qh, RED),
        (3 * qw, qh, GREEN),
        (qw, 3 * qh, BLUE),
        (3 * qw, 3 * qh, WHITE),
    ] {
        let got = img.get_pixel(x, y).0;
        let close = got
            .iter()
            .zip(want.iter())
            .all(|(g, w)| (i16::from(*g) - i16::from(*w)).abs() <= 60);
        assert!(close, "pixel at ({x}, {y}) is {got:?}, expected about {want:?}");
    }
}

/// What to put in the synthetic EXIF block.
#[derive(Debug, Clone)]
pub struct ExifSpec {
    pub little_endian: bool,
    pub orientation: Option<u16>,
    pub pixel_dimensions: Option<(u32, u32)>,
    pub gps: bool,
    pub thumbnail: Option<Vec<u8>>,
}

impl ExifSpec {
    pub fn with_orientation(orientation: u16) -> Self {
        Self {
            little_endian: true,
            orientation: Some(orientation),
            pixel_dimensions: None,
            gps: true,
            thumbnail: None,
        }
    }
}

enum Val {
    Short(u16),
    Long(u32),
    Data(Vec<u8>),
}

const ASCII: u16 = 2;
const BYTE: u16 = 1;
const SHORT: u16 = 3;
const LONG: u16 = 4;

struct TiffBuilder {
    le: bool,
    buf: Vec<u8>,
}

struct IfdSlots {
    values: Vec<usize>,
    next: usize,
}

impl TiffBuilder {
    fn u16(&mut self, v: u16) {
        let b = if self.le { v.to_le_bytes() } else { v.to_be_bytes() };
        self.buf.extend_from_slice(&b);
    }

    fn u32(&mut self, v: u32) {
        let b = if self.le { v.to_le_bytes() } else { v.to_be_bytes() };
        self.buf.extend_from_slice(&b);
    }

    fn set_u32(&mut self, at: usize, v: u32) {
        let b = if self.le { v.to_le_bytes() } else { v.to_be_bytes() };
        self.buf[at..at + 4].copy_from_slice(&b);
    }

    fn pos(&self) -> u32 {
        self.buf.len() as u32
    }

    fn ifd(&mut self, entries: Vec<(u16, u16, u32, Val)>) -> IfdSlots {
        self.u16(entries.len() as u16);
        let mut values = Vec::new();
        let mut deferred = Vec::new();
        for (tag, ty, count, val) in entries {
            self.u16(tag);
            self.u16(ty);
            self.u32(count);
            values.push(self.buf.len());
            match val {
                Val::Short(v) => {
                    self.u16(v);
                    self.u16(0);
                }
                Val::Long(v) => self.u32(v),
                Val::Data(mut bytes) if bytes.len() <= 4 => {
                    bytes.resize(4, 0);
                    self.buf.extend_from_slice(&bytes);
                }
                Val::Data(bytes) => {
                    deferred.push((self.buf.len(), bytes));
                    self.u32(0);
                }
            }
        }
        let next = self.buf.len();
        self.u32(0);
        for (slot, bytes) in deferred {
            let at = self.pos();
            self.set_u32(slot, at);
            self.buf.extend_from_slice(&bytes);
            if self.buf.len() % 2 == 1 {
                self.buf.push(0);
            }
        }
        IfdSlots { values, next }
    }
}

/// Assemble a TIFF payload with IFD0, Exif, optional GPS and optional IFD1.
pub fn build_tiff(spec: &ExifSpec) -> Vec<u8> {
    let mut t = TiffBuilder {
        le: spec.little_endian,
        buf: Vec::new(),
    };
    t.buf.extend_from_slice(if spec.little_endian { b"II" } else { b"MM" });
    t.u16(42);
    t.u32(8);

    let mut ifd0 = vec![(0x010F, ASCII, 7, Val::Data(b"Camera\0".to_vec()))];
    if let Some(o) = spec.orientation {
        ifd0.push((0x0112, SHORT, 1, Val::Short(o)));
    }
    let exif_index = ifd0.len();
    ifd0.push((0x8769, LONG, 1, Val::Long(0)));
    let gps_index = ifd0.len();
    if spec.gps {
        ifd0.push((0x8825, LONG, 1, Val::Long(0)));
    }
    let ifd0 = t.ifd(ifd0);

    let exif_at = t.pos();
    t.set_u32(ifd0.values[exif_index], exif_at);
    let mut exif = vec![(
        0x9003,
        ASCII,
        20,
        Val::Data(b"2020:01:02 03:04:05\0".to_vec()),
    )];
    if let Some((w, h)) = spec.pixel_dimensions {
        exif.push((0xA002, LONG, 1, Val::Long(w)));
        exif.push((0xA003, SHORT, 1, Val::Short(h as u16)));
    }
    t.ifd(exif);

    if spec.gps {
        let gps_at = t.pos();
        t.set_u32(ifd0.values[gps_index], gps_at);
        t.ifd(vec![(0x0000, BYTE, 4, Val::Data(vec![2, 3, 0, 0]))]);
    }

    if let Some(thumb) = &spec.thumbnail {
        let ifd1_at = t.pos();
        t.set_u32(ifd0.next, ifd1_at);
        let ifd1 = t.ifd(vec![
            (0x0201, LONG, 1, Val::Long(0)),
            (0x0202, LONG, 1, Val::Long(thumb.len() as u32)),
        ]);
        let thumb_at = t.pos();
        t.set_u32(ifd1.values[0], thumb_at);
        t.buf.extend_from_slice(thumb);
    }
    t.buf
}

/// Insert an APP1 EXIF segment right after SOI, as cameras do.
pub fn with_exif(jpeg: &[u8], tiff: &[u8]) -> Vec<u8> {
    assert_eq!(&jpeg[..2], &[0xFF, 0xD8]);
    let len = (2 + 6 + tiff.len()) as u16;
    let mut out = vec![0xFF, 0xD8, 0xFF, 0xE1];
    out.extend_from_slice(&len.to_be_bytes());
    out.extend_from_slice(b"Exif\0\0");
    out.extend_from_slice(tiff);
    out.extend_from_slice(&jpeg[2..]);
    out
}

pub fn thumbnail() -> Vec<u8> {
    encode_jpeg(&RgbImage::from_pixel(8, 8, Rgb([10, 20, 30])), 50)
}

/// A photo stored with `orientation`, carrying GPS, a thumbnail and pixel
/// dimensions matching the stored pixels.
pub fn photo(orientation: u16) -> Vec<u8> {
    let stored = stored_for(orientation, &upright());
    let spec = ExifSpec {
        pixel_dimensions: Some(stored.dimensions()),
        thumbnail: Some(thumbnail()),
        ..ExifSpec::with_orientation(orientation)
    };
    with_exif(&encode_jpeg(&stored, 100), &build_tiff(&spec))
}
