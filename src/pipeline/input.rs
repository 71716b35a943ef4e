//! Input checks: make sure the path names a readable PDF before any parser
//! or pdfium sees it, and derive the default output name.
//!
//! Checking the `%PDF` magic bytes up front turns "this is a JPEG" into a
//! clear error instead of a parser failure deep inside lopdf or pdfium.

use crate::error::DeblankError;
use std::io::Read;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Prefix of the default output file name.
pub const OUTPUT_PREFIX: &str = "cleaned_";

/// Validate that `path` exists, is readable and starts with `%PDF`.
pub fn resolve_input(path: impl AsRef<Path>) -> Result<PathBuf, DeblankError> {
    let path = path.as_ref().to_path_buf();

    if !path.is_file() {
        return Err(DeblankError::FileNotFound { path });
    }

    let mut file = match std::fs::File::open(&path) {
        Ok(f) => f,
        Err(e) if e.kind() == std::io::ErrorKind::PermissionDenied => {
            return Err(DeblankError::PermissionDenied { path });
        }
        Err(_) => return Err(DeblankError::FileNotFound { path }),
    };

    let mut head = Vec::with_capacity(4);
    file.by_ref()
        .take(4)
        .read_to_end(&mut head)
        .map_err(|e| match e.kind() {
            std::io::ErrorKind::PermissionDenied => DeblankError::PermissionDenied {
                path: path.clone(),
            },
            _ => DeblankError::document_read(format!("failed to read '{}': {}", path.display(), e)),
        })?;
    check_magic(&head).map_err(|magic| DeblankError::NotAPdf {
        path: path.clone(),
        magic,
    })?;

    debug!("Resolved local PDF: {}", path.display());
    Ok(path)
}

/// `Ok` when `bytes` starts with `%PDF`; otherwise the first four bytes,
/// zero-padded.
pub fn check_magic(bytes: &[u8]) -> Result<(), [u8; 4]> {
    if bytes.starts_with(b"%PDF") {
        return Ok(());
    }
    let mut magic = [0u8; 4];
    let n = bytes.len().min(4);
    magic[..n].copy_from_slice(&bytes[..n]);
    Err(magic)
}

/// `cleaned_<file name>` in the input's directory.
pub fn default_output_path(input: impl AsRef<Path>) -> PathBuf {
    let input = input.as_ref();
    let name = input
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "output.pdf".to_string());
    input.with_file_name(format!("{}{}", OUTPUT_PREFIX, name))
}
