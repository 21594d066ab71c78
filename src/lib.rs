//! Rotate JPEG pixels to match their EXIF orientation, then reset the tag to 1.
//!
//! ```no_run
//! use jpeg_autorotate::{RotateOptions, rotate};
//!
//! match rotate(std::path::Path::new("photo.jpg"), &RotateOptions::default()) {
//!     Ok(done) => println!("Processed (Orientation was {})", done.orientation),
//!     Err(err) => eprintln!("{}: {err}", err.code()),
//! }
//! ```

pub mod engine;
pub mod error;
pub mod exif;
pub mod jpeg;
pub mod orientation;
pub mod rotate;
pub mod scan;
pub mod tiff;

pub use config_model::{AutorotateConfig, RotateOptions};
pub use engine::{ImageEngine, TransformEngine, Transformed};
pub use error::{ErrorKind, RotateError};
pub use orientation::{Dimensions, Orientation, Rotation, Transform};
pub use rotate::{
    Input, Rotated, rotate, rotate_with_engine, rotate_with_engine_timeout, rotate_with_timeout,
};
