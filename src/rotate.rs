//! Public entry point tying EXIF parsing, the pixel engine and the writer
//! together.

use std::fs;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use config_model::RotateOptions;
use tracing::{debug, info, instrument, warn};

use crate::engine::{ImageEngine, TransformEngine};
use crate::error::{ErrorKind, RotateError};
use crate::exif::{self, ReadError};
use crate::jpeg;
use crate::orientation::{Dimensions, Orientation};

/// Where the JPEG comes from.
#[derive(Debug, Clone)]
pub enum Input {
    Path(PathBuf),
    Bytes(Vec<u8>),
}

impl From<PathBuf> for Input {
    fn from(path: PathBuf) -> Self {
        Input::Path(path)
    }
}

impl From<&std::path::Path> for Input {
    fn from(path: &std::path::Path) -> Self {
        Input::Path(path.to_path_buf())
    }
}

impl From<Vec<u8>> for Input {
    fn from(bytes: Vec<u8>) -> Self {
        Input::Bytes(bytes)
    }
}

impl Input {
    fn into_bytes(self) -> Result<Vec<u8>, RotateError> {
        match self {
            Input::Bytes(bytes) => Ok(bytes),
            Input::Path(path) => fs::read(&path).map_err(|err| {
                RotateError::new(
                    ErrorKind::ReadFile,
                    format!("Could not read file {}: {err}", path.display()),
                )
            }),
        }
    }
}

/// Successful rotation.
#[derive(Debug, Clone)]
pub struct Rotated {
    /// Complete JPEG with orientation 1.
    pub buffer: Vec<u8>,
    /// Orientation found in the input.
    pub orientation: Orientation,
    /// Size of the output image.
    pub dimensions: Dimensions,
}

/// Rotate `input` with the default [`ImageEngine`].
pub fn rotate(input: impl Into<Input>, options: &RotateOptions) -> Result<Rotated, RotateError> {
    rotate_with_engine(input, options, &ImageEngine)
}

#[instrument(skip_all)]
pub fn rotate_with_engine(
    input: impl Into<Input>,
    options: &RotateOptions,
    engine: &dyn TransformEngine,
) -> Result<Rotated, RotateError> {
    let bytes = input.into().into_bytes()?;

    let (orientation, doc) = match exif::read(&bytes) {
        Ok(found) => found,
        Err(err) => return Err(read_failure(err).with_original(bytes)),
    };
    if orientation == Orientation::Normal {
        return Err(RotateError::new(
            ErrorKind::CorrectOrientation,
            "Orientation already correct",
        )
        .with_original(bytes));
    }

    let transform = orientation.transform();
    debug!(
        orientation = orientation.value(),
        rotation = transform.rotation.degrees(),
        flip_horizontal = transform.flip_horizontal,
        flip_vertical = transform.flip_vertical,
        "resolved transform"
    );

    let transformed = engine
        .transform(&bytes, transform, options.effective_quality())
        .map_err(|err| rotate_failure(format!("Could not rotate image: {err}")))?;

    let corrected = orientation.corrected();
    let tiff = if options.keep_exif {
        doc.rewrite(corrected, transformed.dimensions)
            .map_err(|err| rotate_failure(format!("Could not update EXIF: {err}")))?
    } else {
        doc.stripped(corrected)
    };
    let buffer = jpeg::splice_exif(&transformed.jpeg, &tiff)
        .map_err(|err| rotate_failure(format!("Could not write EXIF: {err}")))?;

    info!(
        orientation = orientation.value(),
        width = transformed.dimensions.width,
        height = transformed.dimensions.height,
        "rotated"
    );
    Ok(Rotated {
        buffer,
        orientation,
        dimensions: transformed.dimensions,
    })
}

/// Run [`rotate`] on the blocking pool, giving up after `timeout`.
pub async fn rotate_with_timeout(
    input: impl Into<Input>,
    options: RotateOptions,
    timeout: Duration,
) -> Result<Rotated, RotateError> {
    rotate_with_engine_timeout(input, options, Arc::new(ImageEngine), timeout).await
}

/// [`rotate_with_engine`] on the blocking pool, giving up after `timeout`.
///
/// The worker is not interrupted on timeout; its result is discarded.
pub async fn rotate_with_engine_timeout(
    input: impl Into<Input>,
    options: RotateOptions,
    engine: Arc<dyn TransformEngine>,
    timeout: Duration,
) -> Result<Rotated, RotateError> {
    let input = input.into();
    let work =
        tokio::task::spawn_blocking(move || rotate_with_engine(input, &options, engine.as_ref()));
    match tokio::time::timeout(timeout, work).await {
        Ok(Ok(result)) => result,
        Ok(Err(join)) => Err(rotate_failure(format!("Rotation worker failed: {join}"))),
        Err(_) => {
            warn!(?timeout, "rotation timed out");
            Err(rotate_failure(format!(
                "Rotation timed out after {}",
                humantime::format_duration(timeout)
            )))
        }
    }
}

fn rotate_failure(message: String) -> RotateError {
    RotateError::new(ErrorKind::RotateFile, message)
}

fn read_failure(err: ReadError) -> RotateError {
    let kind = match &err {
        ReadError::Container(_) | ReadError::MissingExif | ReadError::Exif(_) => {
            ErrorKind::ReadExif
        }
        ReadError::NoOrientation => ErrorKind::NoOrientation,
        ReadError::UnknownOrientation(_) => ErrorKind::UnknownOrientation,
    };
    let message = match kind {
        ErrorKind::ReadExif => format!("Could not read EXIF data: {err}"),
        ErrorKind::NoOrientation => "No orientation tag found in EXIF".to_string(),
        _ => format!("Unknown orientation: {err}"),
    };
    RotateError::new(kind, message)
}
