//! Turning command line arguments into the list of files to process.

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use thiserror::Error;
use tracing::debug;
use walkdir::{DirEntry, WalkDir};

#[derive(Debug, Error)]
pub enum ScanError {
    #[error("no files match {0}")]
    NoMatch(String),
    #[error("invalid pattern {pattern}: {source}")]
    BadPattern {
        pattern: String,
        #[source]
        source: glob::PatternError,
    },
    #[error("cannot read {path}: {message}")]
    Unreadable { path: String, message: String },
}

/// Options controlling argument expansion.
#[derive(Debug, Clone, Default)]
pub struct ScanOptions {
    /// Whether to recurse into subdirectories of directory arguments.
    pub recursive: bool,
}

const JPEG_EXTENSIONS: &[&str] = &["jpg", "jpeg", "jpe", "jfif"];

/// Return `true` if `path` has a JPEG file extension.
#[must_use]
pub fn is_supported_image(path: &Path) -> bool {
    path.extension()
        .and_then(|s| s.to_str())
        .is_some_and(|ext| {
            let ext = ext.to_ascii_lowercase();
            JPEG_EXTENSIONS.contains(&ext.as_str())
        })
}

/// Expand `{a,b}` alternations the way a POSIX shell would.
pub fn expand_braces(pattern: &str) -> Vec<String> {
    let Some(open) = pattern.find('{') else {
        return vec![pattern.to_string()];
    };
    let mut depth = 0usize;
    let mut close = None;
    let mut commas = Vec::new();
    for (i, c) in pattern[open..].char_indices() {
        let i = open + i;
        match c {
            '{' => depth += 1,
            '}' => {
                depth -= 1;
                if depth == 0 {
                    close = Some(i);
                    break;
                }
            }
            ',' if depth == 1 => commas.push(i),
            _ => {}
        }
    }
    let Some(close) = close else {
        return vec![pattern.to_string()];
    };
    if commas.is_empty() {
        // `{x}` is literal; keep expanding after it.
        let head = &pattern[..=close];
        return expand_braces(&pattern[close + 1..])
            .into_iter()
            .map(|tail| format!("{head}{tail}"))
            .collect();
    }

    let prefix = &pattern[..open];
    let suffix = &pattern[close + 1..];
    let mut bounds = vec![open];
    bounds.extend(commas);
    bounds.push(close);
    bounds
        .windows(2)
        .flat_map(|w| expand_braces(&format!("{prefix}{}{suffix}", &pattern[w[0] + 1..w[1]])))
        .collect()
}

fn has_glob_meta(pattern: &str) -> bool {
    pattern.contains(['*', '?', '['])
}

/// Expand every argument into files.
///
/// Existing files are kept whatever their extension, directories are walked
/// for JPEG files, glob patterns are matched, and anything else is passed
/// through so the caller can report it as unreadable. Each item is either a
/// file or the reason an argument produced nothing.
pub fn expand_args(args: &[String], opts: &ScanOptions) -> Vec<Result<PathBuf, ScanError>> {
    let mut seen = HashSet::new();
    let mut out: Vec<Result<PathBuf, ScanError>> = Vec::new();
    let mut push = |out: &mut Vec<Result<PathBuf, ScanError>>, path: PathBuf| {
        if seen.insert(path.clone()) {
            out.push(Ok(path));
        }
    };

    for arg in args {
        for pattern in expand_braces(arg) {
            let literal = Path::new(&pattern);
            if literal.is_dir() {
                for file in walk_dir(literal, opts) {
                    push(&mut out, file);
                }
            } else if literal.exists() || !has_glob_meta(&pattern) {
                push(&mut out, literal.to_path_buf());
            } else {
                let paths = match glob::glob(&pattern) {
                    Ok(paths) => paths,
                    Err(source) => {
                        out.push(Err(ScanError::BadPattern { pattern, source }));
                        continue;
                    }
                };
                let mut matched = false;
                for entry in paths {
                    match entry {
                        Ok(path) if path.is_dir() => {
                            for file in walk_dir(&path, opts) {
                                matched = true;
                                push(&mut out, file);
                            }
                        }
                        Ok(path) => {
                            matched = true;
                            push(&mut out, path);
                        }
                        Err(err) => out.push(Err(ScanError::Unreadable {
                            path: err.path().display().to_string(),
                            message: err.error().to_string(),
                        })),
                    }
                }
                if !matched {
                    out.push(Err(ScanError::NoMatch(pattern)));
                }
            }
        }
    }
    debug!(files = out.iter().filter(|r| r.is_ok()).count(), "expanded arguments");
    out
}

fn walk_dir(root: &Path, opts: &ScanOptions) -> Vec<PathBuf> {
    let mut wd = WalkDir::new(root).sort_by_file_name();
    if !opts.recursive {
        wd = wd.max_depth(1);
    }
    wd.into_iter()
        // Skip hidden dot-directories *below* the root only.
        .filter_entry(|e| !should_skip_dir(e))
        .flatten()
        .filter(|e| e.file_type().is_file())
        .map(DirEntry::into_path)
        .filter(|p| is_supported_image(p))
        .collect()
}

fn should_skip_dir(entry: &DirEntry) -> bool {
    // Never skip the root; tempfile roots can be dot-dirs.
    if entry.depth() == 0 {
        return false;
    }
    if !entry.file_type().is_dir() {
        return false;
    }
    entry
        .file_name()
        .to_str()
        .is_some_and(|n| n.starts_with('.'))
}
