use std::fmt;

use thiserror::Error;

/// Stable classification of every way a rotate call can fail.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// The input could not be obtained as bytes.
    ReadFile,
    /// The bytes are not a parseable JPEG/EXIF container.
    ReadExif,
    /// EXIF is present but carries no orientation tag.
    NoOrientation,
    /// The orientation tag holds something other than 1-8.
    UnknownOrientation,
    /// The image is already upright; nothing was done.
    CorrectOrientation,
    /// The pixel transform or the EXIF rewrite failed.
    RotateFile,
}

impl ErrorKind {
    pub const ALL: &'static [Self] = &[
        Self::ReadFile,
        Self::ReadExif,
        Self::NoOrientation,
        Self::UnknownOrientation,
        Self::CorrectOrientation,
        Self::RotateFile,
    ];

    /// Machine-readable code.
    pub fn code(&self) -> &'static str {
        match self {
            Self::ReadFile => "read_file",
            Self::ReadExif => "read_exif",
            Self::NoOrientation => "no_orientation",
            Self::UnknownOrientation => "unknown_orientation",
            Self::CorrectOrientation => "correct_orientation",
            Self::RotateFile => "rotate_file",
        }
    }

    /// Kinds for which the untouched input is handed back to the caller.
    pub fn carries_original(&self) -> bool {
        matches!(
            self,
            Self::NoOrientation | Self::UnknownOrientation | Self::CorrectOrientation
        )
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

/// Error returned by [`crate::rotate`].
///
/// For [`ErrorKind::NoOrientation`], [`ErrorKind::UnknownOrientation`] and
/// [`ErrorKind::CorrectOrientation`] the original input is still available
/// through [`RotateError::original`], so callers can pass the image through
/// untouched.
#[derive(Debug, Error)]
#[error("{message}")]
pub struct RotateError {
    kind: ErrorKind,
    message: String,
    original: Option<Vec<u8>>,
}

impl RotateError {
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            original: None,
        }
    }

    /// Attach the original bytes. Ignored for kinds that never carry them.
    pub(crate) fn with_original(mut self, bytes: Vec<u8>) -> Self {
        if self.kind.carries_original() {
            self.original = Some(bytes);
        }
        self
    }

    pub fn kind(&self) -> ErrorKind {
        self.kind
    }

    pub fn code(&self) -> &'static str {
        self.kind.code()
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn original(&self) -> Option<&[u8]> {
        self.original.as_deref()
    }

    pub fn into_original(self) -> Option<Vec<u8>> {
        self.original
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn codes_are_unique() {
        let mut codes: Vec<_> = ErrorKind::ALL.iter().map(ErrorKind::code).collect();
        codes.sort_unstable();
        codes.dedup();
        assert_eq!(codes.len(), ErrorKind::ALL.len());
    }

    #[test]
    fn original_only_kept_for_pass_through_kinds() {
        let err = RotateError::new(ErrorKind::ReadExif, "bad").with_original(vec![1, 2]);
        assert!(err.original().is_none());
        let err = RotateError::new(ErrorKind::NoOrientation, "none").with_original(vec![1, 2]);
        assert_eq!(err.original(), Some(&[1u8, 2][..]));
        assert_eq!(err.to_string(), "none");
        assert_eq!(err.code(), "no_orientation");
    }
}
