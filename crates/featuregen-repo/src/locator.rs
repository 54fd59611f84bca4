use std::ffi::OsStr;
use std::path::{Path, PathBuf};

use featuregen_core::FeaturegenError;

/// Find every file under `root` whose name ends with `suffix`.
///
/// Walks the whole tree, hidden files and ignored paths included, skipping only
/// the `.git` directory. The result is collected eagerly in traversal order,
/// which is platform dependent; callers must not rely on it. An empty result is
/// not an error.
///
/// # Errors
///
/// Returns [`FeaturegenError::Filesystem`] if `root` is not a directory or an
/// entry beneath it cannot be read.
///
/// # Examples
///
/// ```no_run
/// use std::path::Path;
/// use featuregen_repo::find_artifacts;
///
/// let controllers = find_artifacts(Path::new("temp-repo"), "Controller.java").unwrap();
/// for c in &controllers {
///     println!("{}", c.display());
/// }
/// ```
pub fn find_artifacts(root: &Path, suffix: &str) -> Result<Vec<PathBuf>, FeaturegenError> {
    if !root.is_dir() {
        return Err(FeaturegenError::fs(
            root,
            std::io::Error::new(std::io::ErrorKind::NotFound, "not a directory"),
        ));
    }

    let walker = ignore::WalkBuilder::new(root)
        .standard_filters(false)
        .filter_entry(|entry| entry.file_name() != OsStr::new(".git"))
        .build();

    let mut artifacts = Vec::new();
    for entry in walker {
        let entry = entry.map_err(|e| walk_error(root, e))?;

        let Some(file_type) = entry.file_type() else {
            continue;
        };
        if !file_type.is_file() {
            continue;
        }

        let matches = entry
            .file_name()
            .to_str()
            .is_some_and(|name| name.ends_with(suffix));
        if matches {
            artifacts.push(entry.into_path());
        }
    }

    Ok(artifacts)
}

fn walk_error(root: &Path, err: ignore::Error) -> FeaturegenError {
    let path = match &err {
        ignore::Error::WithPath { path, .. } => path.clone(),
        _ => root.to_path_buf(),
    };
    let io = err
        .into_io_error()
        .unwrap_or_else(|| std::io::Error::other("directory walk failed"));
    FeaturegenError::fs(path, io)
}
