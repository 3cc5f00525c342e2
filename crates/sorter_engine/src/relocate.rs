use std::fs::{self, File, OpenOptions};
use std::io;
use std::path::{Path, PathBuf};

use thiserror::Error;

use crate::persist::{ensure_dir, PersistError};

#[derive(Debug, Error)]
pub enum MoveError {
    #[error("source missing: {0}")]
    SourceMissing(PathBuf),
    #[error("destination already exists: {0}")]
    DestinationExists(PathBuf),
    #[error("cannot prepare folder: {0}")]
    Folder(#[from] PersistError),
    #[error("move failed: {0}")]
    Io(#[from] io::Error),
}

/// Move `source` into `{root}/{category}/`, creating the folder if absent.
///
/// Never overwrites: an existing same-named item in the folder is an error.
pub fn move_into(source: &Path, root: &Path, category: &str) -> Result<PathBuf, MoveError> {
    if !source.is_file() {
        return Err(MoveError::SourceMissing(source.to_path_buf()));
    }
    let file_name = source
        .file_name()
        .ok_or_else(|| MoveError::SourceMissing(source.to_path_buf()))?;

    let folder = root.join(category);
    ensure_dir(&folder)?;

    let target = folder.join(file_name);
    match fs::hard_link(source, &target) {
        Ok(()) => {}
        Err(err) if err.kind() == io::ErrorKind::AlreadyExists => {
            return Err(MoveError::DestinationExists(target));
        }
        // Cross-device or no link support: copy into a fresh file instead.
        Err(_) => copy_new(source, &target)?,
    }

    if let Err(err) = fs::remove_file(source) {
        let _ = fs::remove_file(&target);
        return Err(MoveError::Io(err));
    }
    Ok(target)
}

/// Copy `source` to `target`, failing if `target` already exists.
fn copy_new(source: &Path, target: &Path) -> Result<(), MoveError> {
    let mut input = File::open(source)?;
    let mut output = match OpenOptions::new().write(true).create_new(true).open(target) {
        Ok(file) => file,
        Err(err) if err.kind() == io::ErrorKind::AlreadyExists => {
            return Err(MoveError::DestinationExists(target.to_path_buf()));
        }
        Err(err) => return Err(MoveError::Io(err)),
    };
    if let Err(err) = io::copy(&mut input, &mut output).and_then(|_| output.sync_all()) {
        drop(output);
        let _ = fs::remove_file(target);
        return Err(MoveError::Io(err));
    }
    Ok(())
}
