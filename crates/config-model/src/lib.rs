use std::fs;
use std::path::Path;
use std::time::Duration;

use anyhow::{Context, Result, ensure};
use serde::Deserialize;
use serde_yaml::Value;
use tracing::{debug, warn};

pub use batch::AutorotateConfig;
pub use rotate::RotateOptions;

mod rotate {
    use super::*;

    /// Options recognized by a single rotate call.
    #[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
    #[serde(rename_all = "kebab-case", default)]
    pub struct RotateOptions {
        /// JPEG quality used when the pixels are re-encoded (1-100).
        pub quality: u8,
        /// Keep every EXIF tag besides the ones that describe orientation.
        pub keep_exif: bool,
    }

    impl Default for RotateOptions {
        fn default() -> Self {
            Self {
                quality: Self::DEFAULT_QUALITY,
                keep_exif: true,
            }
        }
    }

    impl RotateOptions {
        pub const DEFAULT_QUALITY: u8 = 100;
        const KNOWN_KEYS: &'static [&'static str] = &["quality", "keep-exif"];

        /// Quality clamped to the range the encoder accepts.
        pub fn effective_quality(&self) -> u8 {
            self.quality.clamp(1, 100)
        }

        pub fn validate(&self) -> Result<()> {
            ensure!(
                (1..=100).contains(&self.quality),
                "quality must be between 1 and 100 (got {})",
                self.quality
            );
            Ok(())
        }

        /// Build options out of any YAML value without ever failing.
        ///
        /// Non-mapping values yield the defaults. Inside a mapping, unknown
        /// keys are ignored and fields with the wrong type or an out-of-range
        /// value keep their default.
        pub fn lenient(value: &Value) -> Self {
            let mut opts = Self::default();
            let Value::Mapping(map) = value else {
                if !value.is_null() {
                    warn!(?value, "options are not a mapping; using defaults");
                }
                return opts;
            };

            match map.get("quality") {
                None => {}
                Some(raw) => match raw.as_u64().filter(|q| (1..=100).contains(q)) {
                    Some(q) => opts.quality = q as u8,
                    None => warn!(value = ?raw, "ignoring invalid quality"),
                },
            }
            match map.get("keep-exif") {
                None => {}
                Some(raw) => match raw.as_bool() {
                    Some(keep) => opts.keep_exif = keep,
                    None => warn!(value = ?raw, "ignoring invalid keep-exif"),
                },
            }
            for key in map.keys() {
                let known = key
                    .as_str()
                    .is_some_and(|k| Self::KNOWN_KEYS.contains(&k));
                if !known {
                    debug!(?key, "ignoring unrecognized option");
                }
            }
            opts
        }

        /// Lenient parse of a YAML document; unparseable text yields defaults.
        pub fn lenient_from_str(yaml: &str) -> Self {
            match serde_yaml::from_str::<Value>(yaml) {
                Ok(value) => Self::lenient(&value),
                Err(err) => {
                    warn!(error = %err, "options are not valid YAML; using defaults");
                    Self::default()
                }
            }
        }
    }
}

mod batch {
    use super::*;

    /// Configuration file understood by the command line tool.
    #[derive(Debug, Clone, Deserialize)]
    #[serde(rename_all = "kebab-case", default)]
    pub struct AutorotateConfig {
        #[serde(flatten)]
        pub rotate: RotateOptions,
        /// Number of files processed concurrently.
        pub jobs: usize,
        /// Upper bound for a single file, including decode and encode.
        #[serde(with = "humantime_serde")]
        pub timeout: Duration,
        /// Descend into sub-directories when a directory is given.
        pub recursive: bool,
    }

    impl Default for AutorotateConfig {
        fn default() -> Self {
            Self {
                rotate: RotateOptions::default(),
                jobs: Self::DEFAULT_JOBS,
                timeout: Self::DEFAULT_TIMEOUT,
                recursive: false,
            }
        }
    }

    impl AutorotateConfig {
        const DEFAULT_JOBS: usize = 4;
        const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

        pub fn validate(&self) -> Result<()> {
            self.rotate.validate()?;
            ensure!(self.jobs > 0, "jobs must be greater than zero");
            ensure!(!self.timeout.is_zero(), "timeout must be non-zero");
            Ok(())
        }
    }
}

/// Strict parse of a configuration document.
pub fn from_yaml_str(yaml: &str) -> Result<AutorotateConfig> {
    let cfg: AutorotateConfig = serde_yaml::from_str(yaml).context("parsing configuration")?;
    Ok(cfg)
}

pub fn from_yaml_file(path: &Path) -> Result<AutorotateConfig> {
    let text =
        fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))?;
    from_yaml_str(&text)
}
