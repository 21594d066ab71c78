//! EXIF orientation values and the pixel transform that undoes each of them.

use std::fmt;

/// Clockwise rotation applied after any flip.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Rotation {
    None,
    Cw90,
    Cw180,
    Cw270,
}

impl Rotation {
    pub fn degrees(self) -> u16 {
        match self {
            Rotation::None => 0,
            Rotation::Cw90 => 90,
            Rotation::Cw180 => 180,
            Rotation::Cw270 => 270,
        }
    }
}

/// Physical pixel operation: flips first, then the clockwise rotation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Transform {
    pub rotation: Rotation,
    pub flip_horizontal: bool,
    pub flip_vertical: bool,
}

impl Transform {
    const fn new(rotation: Rotation, flip_horizontal: bool, flip_vertical: bool) -> Self {
        Self {
            rotation,
            flip_horizontal,
            flip_vertical,
        }
    }

    /// `true` when width and height trade places.
    pub fn swaps_dimensions(&self) -> bool {
        matches!(self.rotation, Rotation::Cw90 | Rotation::Cw270)
    }
}

const IDENTITY: Transform = Transform::new(Rotation::None, false, false);

// Indexed by `Orientation as usize - 1`.
const TRANSFORMS: [Transform; 8] = [
    IDENTITY,
    Transform::new(Rotation::None, true, false),
    Transform::new(Rotation::Cw180, false, false),
    Transform::new(Rotation::None, false, true),
    Transform::new(Rotation::Cw270, true, false),
    Transform::new(Rotation::Cw90, false, false),
    Transform::new(Rotation::Cw90, true, false),
    Transform::new(Rotation::Cw270, false, false),
];

/// Value of the EXIF orientation tag (0x0112).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum Orientation {
    Normal = 1,
    MirrorHorizontal = 2,
    Rotate180 = 3,
    MirrorVertical = 4,
    Transpose = 5,
    Rotate90 = 6,
    Transverse = 7,
    Rotate270 = 8,
}

impl Orientation {
    pub const ALL: [Self; 8] = [
        Self::Normal,
        Self::MirrorHorizontal,
        Self::Rotate180,
        Self::MirrorVertical,
        Self::Transpose,
        Self::Rotate90,
        Self::Transverse,
        Self::Rotate270,
    ];

    /// `None` for anything outside 1-8.
    pub fn from_exif(value: u32) -> Option<Self> {
        match value {
            1..=8 => Some(Self::ALL[value as usize - 1]),
            _ => None,
        }
    }

    pub fn value(self) -> u16 {
        self as u16
    }

    /// Transform that brings pixels stored with this orientation upright.
    pub fn transform(self) -> Transform {
        TRANSFORMS[self as usize - 1]
    }

    /// Orientation to record once [`Orientation::transform`] has been applied.
    pub fn corrected(self) -> Self {
        Self::Normal
    }

    pub fn label(self) -> &'static str {
        match self {
            Self::Normal => "Normal (1)",
            Self::MirrorHorizontal => "Mirrored horizontal (2)",
            Self::Rotate180 => "Rotated 180° (3)",
            Self::MirrorVertical => "Mirrored vertical (4)",
            Self::Transpose => "Mirrored horizontal + Rotated 270° (5)",
            Self::Rotate90 => "Rotated 90° CW (6)",
            Self::Transverse => "Mirrored horizontal + Rotated 90° (7)",
            Self::Rotate270 => "Rotated 270° CW (8)",
        }
    }
}

impl fmt::Display for Orientation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.value())
    }
}

/// Width and height in pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Dimensions {
    pub width: u32,
    pub height: u32,
}

impl Dimensions {
    pub fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    /// Dimensions after `transform`.
    pub fn after(self, transform: Transform) -> Self {
        if transform.swaps_dimensions() {
            Self::new(self.height, self.width)
        } else {
            self
        }
    }
}
