//! Bounds-checked access to the TIFF structure carried inside an EXIF segment.
//!
//! Offsets are relative to the start of the TIFF header, as in the format
//! itself.

pub const TIFF_MAGIC: u16 = 0x002A;
pub const TIFF_HEADER_LEN: usize = 8;
pub const IFD_ENTRY_LEN: usize = 12;

pub const TAG_ORIENTATION: u16 = 0x0112;
pub const TAG_EXIF_IFD: u16 = 0x8769;
pub const TAG_PIXEL_X_DIMENSION: u16 = 0xA002;
pub const TAG_PIXEL_Y_DIMENSION: u16 = 0xA003;

pub const TYPE_SHORT: u16 = 3;
pub const TYPE_LONG: u16 = 4;

// A real IFD never comes close; guards against garbage counts.
const MAX_IFD_ENTRIES: u16 = 4096;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Endian {
    Little,
    Big,
}

impl Endian {
    pub fn read_u16(self, data: &[u8], offset: usize) -> Option<u16> {
        let bytes: [u8; 2] = data.get(offset..offset.checked_add(2)?)?.try_into().ok()?;
        Some(match self {
            Endian::Little => u16::from_le_bytes(bytes),
            Endian::Big => u16::from_be_bytes(bytes),
        })
    }

    pub fn read_u32(self, data: &[u8], offset: usize) -> Option<u32> {
        let bytes: [u8; 4] = data.get(offset..offset.checked_add(4)?)?.try_into().ok()?;
        Some(match self {
            Endian::Little => u32::from_le_bytes(bytes),
            Endian::Big => u32::from_be_bytes(bytes),
        })
    }

    pub fn write_u16(self, data: &mut [u8], offset: usize, value: u16) -> Option<()> {
        data.get_mut(offset..offset.checked_add(2)?)?
            .copy_from_slice(&self.u16_bytes(value));
        Some(())
    }

    pub fn write_u32(self, data: &mut [u8], offset: usize, value: u32) -> Option<()> {
        data.get_mut(offset..offset.checked_add(4)?)?
            .copy_from_slice(&self.u32_bytes(value));
        Some(())
    }

    fn u16_bytes(self, value: u16) -> [u8; 2] {
        match self {
            Endian::Little => value.to_le_bytes(),
            Endian::Big => value.to_be_bytes(),
        }
    }

    fn u32_bytes(self, value: u32) -> [u8; 4] {
        match self {
            Endian::Little => value.to_le_bytes(),
            Endian::Big => value.to_be_bytes(),
        }
    }

    fn marker(self) -> [u8; 2] {
        match self {
            Endian::Little => *b"II",
            Endian::Big => *b"MM",
        }
    }
}

/// Check the TIFF header and return (byte order, IFD0 offset).
pub fn read_header(data: &[u8]) -> Option<(Endian, u32)> {
    let endian = match data.get(..2)? {
        b"II" => Endian::Little,
        b"MM" => Endian::Big,
        _ => return None,
    };
    if endian.read_u16(data, 2)? != TIFF_MAGIC {
        return None;
    }
    Some((endian, endian.read_u32(data, 4)?))
}

/// One 12-byte IFD entry. `position` is where the entry starts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IfdEntry {
    pub position: usize,
    pub tag: u16,
    pub field_type: u16,
    pub count: u32,
}

impl IfdEntry {
    /// Offset of the inline value slot (bytes 8..12 of the entry).
    pub fn value_slot(&self) -> usize {
        self.position + 8
    }
}

/// Cursor over a TIFF payload.
#[derive(Debug, Clone, Copy)]
pub struct TiffCursor<'a> {
    data: &'a [u8],
    endian: Endian,
    ifd0: usize,
}

impl<'a> TiffCursor<'a> {
    pub fn new(data: &'a [u8]) -> Option<Self> {
        let (endian, ifd0) = read_header(data)?;
        Some(Self {
            data,
            endian,
            ifd0: ifd0 as usize,
        })
    }

    pub fn endian(&self) -> Endian {
        self.endian
    }

    pub fn ifd0(&self) -> usize {
        self.ifd0
    }

    /// Entries of the IFD at `offset`. `None` if the directory runs past the
    /// end of the payload.
    pub fn entries(&self, offset: usize) -> Option<Vec<IfdEntry>> {
        let count = self.endian.read_u16(self.data, offset)?;
        if count > MAX_IFD_ENTRIES {
            return None;
        }
        let first = offset.checked_add(2)?;
        let end = first.checked_add(usize::from(count) * IFD_ENTRY_LEN)?;
        if end > self.data.len() {
            return None;
        }
        (0..usize::from(count))
            .map(|i| {
                let position = first + i * IFD_ENTRY_LEN;
                Some(IfdEntry {
                    position,
                    tag: self.endian.read_u16(self.data, position)?,
                    field_type: self.endian.read_u16(self.data, position + 2)?,
                    count: self.endian.read_u32(self.data, position + 4)?,
                })
            })
            .collect()
    }

    pub fn find(&self, ifd: usize, tag: u16) -> Option<IfdEntry> {
        self.entries(ifd)?.into_iter().find(|e| e.tag == tag)
    }

    /// Offset of the Exif sub-IFD referenced from IFD0.
    pub fn exif_ifd(&self) -> Option<usize> {
        let pointer = self.find(self.ifd0, TAG_EXIF_IFD)?;
        let offset = self.endian.read_u32(self.data, pointer.value_slot())?;
        Some(offset as usize)
    }

}

/// Why an in-place patch was refused.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PatchError {
    OutOfBounds,
    UnsupportedType(u16),
    Overflow { value: u32 },
}

/// Overwrite the first value of a single-valued SHORT or LONG entry in place.
pub fn patch_uint(
    data: &mut [u8],
    endian: Endian,
    entry: &IfdEntry,
    value: u32,
) -> Result<(), PatchError> {
    let slot = entry.value_slot();
    match entry.field_type {
        TYPE_SHORT => {
            let short = u16::try_from(value).map_err(|_| PatchError::Overflow { value })?;
            endian
                .write_u16(data, slot, short)
                .ok_or(PatchError::OutOfBounds)
        }
        TYPE_LONG => endian
            .write_u32(data, slot, value)
            .ok_or(PatchError::OutOfBounds),
        other => Err(PatchError::UnsupportedType(other)),
    }
}

/// A TIFF payload whose IFD0 holds a single SHORT orientation entry.
pub fn minimal_with_orientation(endian: Endian, orientation: u16) -> Vec<u8> {
    let mut out = Vec::with_capacity(TIFF_HEADER_LEN + 2 + IFD_ENTRY_LEN + 4);
    out.extend_from_slice(&endian.marker());
    out.extend_from_slice(&endian.u16_bytes(TIFF_MAGIC));
    out.extend_from_slice(&endian.u32_bytes(TIFF_HEADER_LEN as u32));
    // IFD0: one entry, SHORT x1, value padded to four bytes, no next IFD.
    out.extend_from_slice(&endian.u16_bytes(1));
    out.extend_from_slice(&endian.u16_bytes(TAG_ORIENTATION));
    out.extend_from_slice(&endian.u16_bytes(TYPE_SHORT));
    out.extend_from_slice(&endian.u32_bytes(1));
    out.extend_from_slice(&endian.u16_bytes(orientation));
    out.extend_from_slice(&[0; 2]);
    out.extend_from_slice(&[0; 4]);
    out
}
