//! Resolution of caller-supplied directories against the data root.
//!
//! Clients name their input and output directories as plain strings. Every
//! such string is interpreted relative to a fixed root: leading `/` and
//! drive prefixes are dropped, `.` is ignored and `..` may not climb above
//! the root. The result is always a path inside the root.

use std::path::{Component, Path, PathBuf};

use crate::types::JobId;

#[derive(Debug, thiserror::Error)]
pub enum PathError {
    #[error("directory must not be empty")]
    Empty,

    #[error("directory escapes the data root: {0}")]
    EscapesRoot(String),
}

/// Resolve `requested` to a path inside `root`.
///
/// Purely lexical; the filesystem is not consulted, so symlinks inside the
/// root are followed as usual when the path is later used.
pub fn resolve_within(root: &Path, requested: &str) -> Result<PathBuf, PathError> {
    let requested = requested.trim();
    if requested.is_empty() {
        return Err(PathError::Empty);
    }

    let mut relative = PathBuf::new();
    for component in Path::new(requested).components() {
        match component {
            Component::Prefix(_) | Component::RootDir | Component::CurDir => {}
            Component::ParentDir => {
                if !relative.pop() {
                    return Err(PathError::EscapesRoot(requested.to_string()));
                }
            }
            Component::Normal(part) => relative.push(part),
        }
    }

    Ok(root.join(relative))
}

/// Job-scoped output directory: `<output_base>/<job_id>`.
pub fn job_output_dir(output_base: &Path, job_id: JobId) -> PathBuf {
    output_base.join(job_id.to_string())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
