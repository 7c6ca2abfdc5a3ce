use crate::error::ResultPersistError;
use std::ffi::OsString;
use std::fs;
use std::path::{Path, PathBuf};

/// Persist a verbatim copy of the input image into the result folder as
/// `result_<basename>`. The folder is created if absent; an existing
/// artifact with the same name is overwritten, so repeat calls are
/// deterministic. No content transformation is applied.
pub fn persist(image_path: &Path, result_folder: &Path) -> Result<PathBuf, ResultPersistError> {
    fs::create_dir_all(result_folder).map_err(|source| ResultPersistError::CreateDir {
        folder: result_folder.to_path_buf(),
        source,
    })?;

    let basename = image_path
        .file_name()
        .ok_or_else(|| ResultPersistError::BadImagePath {
            path: image_path.to_path_buf(),
        })?;

    let mut result_name = OsString::from("result_");
    result_name.push(basename);
    let result_path = result_folder.join(result_name);

    fs::copy(image_path, &result_path).map_err(|source| ResultPersistError::Copy {
        from: image_path.to_path_buf(),
        to: result_path.clone(),
        source,
    })?;

    tracing::debug!(artifact = %result_path.display(), "result artifact written");

    Ok(result_path)
}
