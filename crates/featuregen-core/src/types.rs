use std::path::{Path, PathBuf};

use crate::error::FeaturegenError;

/// A controller source file and its content.
///
/// # Examples
///
/// ```
/// use std::path::PathBuf;
/// use featuregen_core::ControllerArtifact;
///
/// let artifact = ControllerArtifact {
///     path: PathBuf::from("src/main/java/UserController.java"),
///     content: "@RestController class UserController {}".into(),
/// };
/// assert_eq!(artifact.file_name(), "UserController.java");
/// ```
#[derive(Debug, Clone)]
pub struct ControllerArtifact {
    /// Path of the source file.
    pub path: PathBuf,
    /// Full UTF-8 content of the file.
    pub content: String,
}

impl ControllerArtifact {
    /// Read the artifact at `path`.
    ///
    /// # Errors
    ///
    /// Returns [`FeaturegenError::Filesystem`] if the file cannot be read as UTF-8.
    pub fn read(path: &Path) -> Result<Self, FeaturegenError> {
        let content = std::fs::read_to_string(path).map_err(|e| FeaturegenError::fs(path, e))?;
        Ok(Self {
            path: path.to_path_buf(),
            content,
        })
    }

    /// Final path component, lossily converted to UTF-8.
    pub fn file_name(&self) -> String {
        self.path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default()
    }
}

/// Derive the feature file name for a controller source file.
///
/// Replaces the final extension of the file name with `extension`; the
/// directory part of `source` is ignored.
///
/// # Errors
///
/// Returns [`FeaturegenError::Filesystem`] if `source` has no file name.
///
/// # Examples
///
/// ```
/// use std::path::Path;
/// use featuregen_core::feature_file_name;
///
/// let name = feature_file_name(Path::new("src/UserController.java"), "feature").unwrap();
/// assert_eq!(name, "UserController.feature");
/// ```
pub fn feature_file_name(source: &Path, extension: &str) -> Result<String, FeaturegenError> {
    let stem = source.file_stem().ok_or_else(|| {
        FeaturegenError::fs(
            source,
            std::io::Error::new(std::io::ErrorKind::InvalidInput, "path has no file name"),
        )
    })?;
    let extension = extension.trim_start_matches('.');
    Ok(format!("{}.{extension}", stem.to_string_lossy()))
}
