use std::path::{Path, PathBuf};

use featuregen_core::FeaturegenError;

/// Write `content` to `output_dir/file_name`, creating `output_dir` as needed.
///
/// An existing file is replaced. The content goes to a sibling temporary file
/// first and is renamed into place, so readers never see a partial file.
///
/// # Errors
///
/// Returns [`FeaturegenError::Filesystem`] if the directory cannot be created
/// or the file cannot be written.
///
/// # Examples
///
/// ```no_run
/// use std::path::Path;
/// use featuregen_generate::writer::write_feature;
///
/// let path = write_feature(
///     Path::new("temp-repo/src/test/resources/karate"),
///     "UserController.feature",
///     "Feature: users",
/// )
/// .unwrap();
/// println!("Generated test: {}", path.display());
/// ```
pub fn write_feature(
    output_dir: &Path,
    file_name: &str,
    content: &str,
) -> Result<PathBuf, FeaturegenError> {
    std::fs::create_dir_all(output_dir).map_err(|e| FeaturegenError::fs(output_dir, e))?;

    let target = output_dir.join(file_name);
    let staging = output_dir.join(format!(".{file_name}.tmp"));

    std::fs::write(&staging, content.as_bytes()).map_err(|e| FeaturegenError::fs(&staging, e))?;
    if let Err(e) = std::fs::rename(&staging, &target) {
        let _ = std::fs::remove_file(&staging);
        return Err(FeaturegenError::fs(&target, e));
    }

    Ok(target)
}
