//! Filesystem helpers shared by the loose store and reference I/O.

use std::fs;
use std::io::Write;
use std::path::Path;

use crate::error::{Error, Result};

/// Reads the entire contents of a file as bytes.
///
/// A missing file is reported as `std::io::ErrorKind::NotFound` wrapped in
/// `Error::Io`; callers that know what the file represents map it to their
/// own not-found variant.
pub fn read_file<P: AsRef<Path>>(path: P) -> Result<Vec<u8>> {
    fs::read(path.as_ref()).map_err(Error::Io)
}

/// Writes data to a file atomically.
///
/// The data is written to a temporary sibling file and renamed into place,
/// so the target either holds the complete contents or is untouched. Parent
/// directories are created as needed. The temporary file is removed if the
/// write or the rename fails.
pub fn write_file_atomic<P: AsRef<Path>>(path: P, data: &[u8]) -> Result<()> {
    let path = path.as_ref();

    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() && !parent.exists() {
            fs::create_dir_all(parent)?;
        }
    }

    let mut temp_path = path.to_path_buf();
    let file_name = path
        .file_name()
        .map(|s| s.to_string_lossy().to_string())
        .unwrap_or_else(|| "out".to_string());
    temp_path.set_file_name(format!(".{}.tmp", file_name));

    let write_result = (|| -> Result<()> {
        let mut file = fs::File::create(&temp_path)?;
        file.write_all(data)?;
        file.sync_all()?;
        Ok(())
    })();

    if let Err(e) = write_result {
        let _ = fs::remove_file(&temp_path);
        return Err(e);
    }

    if let Err(e) = fs::rename(&temp_path, path) {
        let _ = fs::remove_file(&temp_path);
        return Err(Error::Io(e));
    }
    Ok(())
}
