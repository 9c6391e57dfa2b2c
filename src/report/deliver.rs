use std::fs::{self, File};
use std::io::{self, Write};
use std::path::{Component, Path, PathBuf};
use tracing::{info, warn};

use crate::error::{ReportError, Result};

/// Path of a generated report inside `output_dir`.
/// Only bare file names are accepted.
pub fn report_path(output_dir: &Path, file_name: &str) -> Result<PathBuf> {
    let mut components = Path::new(file_name).components();
    match (components.next(), components.next()) {
        (Some(Component::Normal(_)), None) => Ok(output_dir.join(file_name)),
        _ => Err(ReportError::InvalidFileName(file_name.to_string())),
    }
}

/// Copy a generated report to `writer`, then delete it.
///
/// The file is removed whether or not the copy succeeded. A failed removal
/// is only logged.
pub fn deliver<W: Write>(output_dir: &Path, file_name: &str, writer: &mut W) -> Result<u64> {
    let path = report_path(output_dir, file_name)?;
    if !path.is_file() {
        return Err(ReportError::FileNotFound(path));
    }

    let copied = copy_to(&path, writer);

    match fs::remove_file(&path) {
        Ok(()) => info!(file = %file_name, "report file removed"),
        Err(e) => warn!(file = %file_name, error = %e, "failed to remove report file"),
    }

    let bytes = copied?;
    info!(file = %file_name, bytes, "report delivered");
    Ok(bytes)
}

fn copy_to<W: Write>(path: &Path, writer: &mut W) -> Result<u64> {
    // the file may be gone since the existence check
    let mut file = File::open(path).map_err(|e| match e.kind() {
        io::ErrorKind::NotFound => ReportError::FileNotFound(path.to_path_buf()),
        _ => ReportError::Io(e),
    })?;
    let bytes = io::copy(&mut file, writer)?;
    writer.flush()?;
    Ok(bytes)
}
