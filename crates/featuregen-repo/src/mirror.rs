use std::path::{Path, PathBuf};

use featuregen_core::FeaturegenError;
use git2::Repository;

/// A local checkout owned by the current run.
///
/// # Examples
///
/// ```
/// use featuregen_repo::WorkingCopy;
///
/// let wc = WorkingCopy::new("temp-repo");
/// assert_eq!(wc.root().to_str(), Some("temp-repo"));
/// ```
#[derive(Debug, Clone)]
pub struct WorkingCopy {
    root: PathBuf,
}

impl WorkingCopy {
    /// Wrap an existing checkout at `root`.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Root directory of the checkout.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Open the underlying repository.
    ///
    /// # Errors
    ///
    /// Returns [`FeaturegenError::Vcs`] if `root` is not a git repository.
    pub fn open(&self) -> Result<Repository, FeaturegenError> {
        Repository::open(&self.root).map_err(|e| {
            FeaturegenError::Vcs(format!(
                "failed to open repository at {}: {e}",
                self.root.display()
            ))
        })
    }

    /// Short name of the checked-out branch, if HEAD points at one.
    pub fn current_branch(&self) -> Result<Option<String>, FeaturegenError> {
        let repo = self.open()?;
        let head = match repo.head() {
            Ok(h) => h,
            Err(e) if e.code() == git2::ErrorCode::UnbornBranch => return Ok(None),
            Err(e) => return Err(FeaturegenError::Vcs(format!("failed to read HEAD: {e}"))),
        };
        Ok(head.shorthand().map(str::to_string))
    }
}

/// Clone `remote_url` into a clean `local_path`.
///
/// Anything already at `local_path` is removed first, so the result only
/// contains the freshly cloned default branch.
///
/// # Errors
///
/// Returns [`FeaturegenError::Filesystem`] if the old checkout cannot be removed
/// (nothing is cloned in that case), or [`FeaturegenError::RemoteAccess`] if
/// the clone fails.
///
/// # Examples
///
/// ```no_run
/// use std::path::Path;
/// use featuregen_repo::acquire;
///
/// let wc = acquire("https://github.com/octocat/Hello-World.git", Path::new("temp-repo")).unwrap();
/// println!("cloned into {}", wc.root().display());
/// ```
pub fn acquire(remote_url: &str, local_path: &Path) -> Result<WorkingCopy, FeaturegenError> {
    remove_existing(local_path)?;

    if let Some(parent) = local_path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent).map_err(|e| FeaturegenError::fs(parent, e))?;
    }

    git2::build::RepoBuilder::new()
        .clone(remote_url, local_path)
        .map_err(|e| FeaturegenError::RemoteAccess(format!("failed to clone {remote_url}: {e}")))?;

    Ok(WorkingCopy::new(local_path))
}

/// Delete `path` and everything beneath it. A missing path is not an error.
fn remove_existing(path: &Path) -> Result<(), FeaturegenError> {
    let metadata = match std::fs::symlink_metadata(path) {
        Ok(m) => m,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(()),
        Err(e) => return Err(FeaturegenError::fs(path, e)),
    };

    // remove_dir_all deletes children before their parents
    let result = if metadata.is_dir() {
        std::fs::remove_dir_all(path)
    } else {
        std::fs::remove_file(path)
    };
    result.map_err(|e| FeaturegenError::fs(path, e))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    /// Create a non-bare repository with one commit on its default branch.
    fn make_origin(dir: &Path) -> PathBuf {
        let origin = dir.join("origin");
        fs::create_dir_all(origin.join("src")).unwrap();
        fs::write(origin.join("README.md"), "# shop").unwrap();
        fs::write(origin.join("src/UserController.java"), "class UserController {}").unwrap();

        let repo = Repository::init(&origin).unwrap();
        let mut index = repo.index().unwrap();
        index
            .add_all(["*"].iter(), git2::IndexAddOption::DEFAULT, None)
            .unwrap();
        index.write().unwrap();
        let tree_id = index.write_tree().unwrap();
        let tree = repo.find_tree(tree_id).unwrap();
        let sig = git2::Signature::now("test", "test@example.com").unwrap();
        repo.commit(Some("HEAD"), &sig, &sig, "initial", &tree, &[])
            .unwrap();
        origin
    }

    #[test]
    fn acquire_clones_into_missing_path() {
        let dir = tempfile::tempdir().unwrap();
        let origin = make_origin(dir.path());
        let local = dir.path().join("nested/work");

        let wc = acquire(origin.to_str().unwrap(), &local).unwrap();

        assert_eq!(wc.root(), local.as_path());
        assert!(local.join("README.md").exists());
        assert!(local.join("src/UserController.java").exists());
        assert!(wc.open().is_ok());
    }

    #[test]
    fn acquire_replaces_existing_content() {
        let dir = tempfile::tempdir().unwrap();
        let origin = make_origin(dir.path());
        let local = dir.path().join("work");
        fs::create_dir_all(local.join("stale/deep")).unwrap();
        fs::write(local.join("stale/deep/Leftover.txt"), "old").unwrap();
        fs::write(local.join("unrelated.txt"), "old").unwrap();

        acquire(origin.to_str().unwrap(), &local).unwrap();

        assert!(!local.join("stale").exists());
        assert!(!local.join("unrelated.txt").exists());
        assert!(local.join("README.md").exists());
    }

    #[test]
    fn acquire_replaces_a_plain_file() {
        let dir = tempfile::tempdir().unwrap();
        let origin = make_origin(dir.path());
        let local = dir.path().join("work");
        fs::write(&local, "not a directory").unwrap();

        acquire(origin.to_str().unwrap(), &local).unwrap();
        assert!(local.join("README.md").exists());
    }

    #[test]
    fn unremovable_path_fails_before_cloning() {
        let dir = tempfile::tempdir().unwrap();
        let origin = make_origin(dir.path());
        let blocker = dir.path().join("blocker");
        fs::write(&blocker, "a file, not a directory").unwrap();
        let local = blocker.join("work");

        let err = acquire(origin.to_str().unwrap(), &local).unwrap_err();

        assert!(matches!(err, FeaturegenError::Filesystem { .. }), "got {err}");
        assert_eq!(fs::read_to_string(&blocker).unwrap(), "a file, not a directory");
        assert!(!local.exists());
    }

    #[test]
    fn acquire_invalid_remote_is_remote_access_error() {
        let dir = tempfile::tempdir().unwrap();
        let local = dir.path().join("work");
        let missing = dir.path().join("does-not-exist");

        let err = acquire(missing.to_str().unwrap(), &local).unwrap_err();
        assert!(matches!(err, FeaturegenError::RemoteAccess(_)), "got {err}");
    }

    #[test]
    fn current_branch_reports_default_branch() {
        let dir = tempfile::tempdir().unwrap();
        let origin = make_origin(dir.path());
        let origin_branch = WorkingCopy::new(&origin).current_branch().unwrap();

        let wc = acquire(origin.to_str().unwrap(), &dir.path().join("work")).unwrap();
        assert_eq!(wc.current_branch().unwrap(), origin_branch);
    }
}
