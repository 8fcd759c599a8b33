use crate::error::{MergeError, MergeResult};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

pub const DEFAULT_OUTPUT_DIR: &str = "Output.jsonl";
pub const MERGED_FILE_NAME: &str = "merged_log.jsonl";

/// Prepares an empty output directory.
///
/// An existing entry at `dir_path` is an error unless `overwrite` is set, in
/// which case it is removed (directory tree or plain file) and recreated.
pub fn create_dir(dir_path: &Path, overwrite: bool) -> MergeResult<()> {
    if let Ok(metadata) = fs::symlink_metadata(dir_path) {
        if !overwrite {
            return Err(MergeError::AlreadyExists {
                path: dir_path.to_path_buf(),
            });
        }
        info!(path = %dir_path.display(), "removing existing output location");
        if metadata.is_dir() {
            fs::remove_dir_all(dir_path).map_err(|e| MergeError::io(dir_path, "remove", e))?;
        } else {
            fs::remove_file(dir_path).map_err(|e| MergeError::io(dir_path, "remove", e))?;
        }
    }
    fs::create_dir_all(dir_path).map_err(|e| MergeError::io(dir_path, "create directory", e))?;
    debug!(path = %dir_path.display(), "output directory ready");
    Ok(())
}

pub fn merged_output_path(dir_path: &Path) -> PathBuf {
    dir_path.join(MERGED_FILE_NAME)
}

/// `create_dir` followed by `merged_output_path`.
pub fn prepare_output(dir_path: &Path, overwrite: bool) -> MergeResult<PathBuf> {
    create_dir(dir_path, overwrite)?;
    Ok(merged_output_path(dir_path))
}
