//! Path validation for user-supplied files.

use std::path::{Component, Path, PathBuf};

use falcon_core::image;
use falcon_core::{Error, Result};

const EDIT_EXTENSIONS: [&str; 4] = ["png", "jpg", "jpeg", "webp"];

/// Resolve an output path, rejecting anything outside `cwd`.
pub fn validate_output_path(path: &Path, cwd: &Path) -> Result<PathBuf> {
    let resolved = normalize(&cwd.join(path));
    if resolved == normalize(cwd) || !resolved.starts_with(normalize(cwd)) {
        return Err(Error::Validation(format!(
            "Output path must be within current directory: {}",
            path.display()
        )));
    }
    Ok(resolved)
}

/// Resolve an edit source, requiring an existing PNG, JPG or WebP file.
pub fn validate_edit_path(path: &Path, cwd: &Path) -> Result<PathBuf> {
    let resolved = normalize(&cwd.join(path));
    if !resolved.is_file() {
        return Err(Error::Validation(format!(
            "Edit image not found: {}",
            path.display()
        )));
    }
    let supported = image::extension(&resolved)
        .is_some_and(|ext| EDIT_EXTENSIONS.contains(&ext.as_str()));
    if !supported {
        return Err(Error::Validation(format!(
            "Edit image must be PNG, JPG, or WebP: {}",
            path.display()
        )));
    }
    Ok(resolved)
}

/// Lexically resolve `.` and `..` without touching the filesystem.
fn normalize(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                out.pop();
            }
            other => out.push(other.as_os_str()),
        }
    }
    out
}
