use std::path::{Path, PathBuf};

use miette::Diagnostic;

/// Errors that can occur anywhere in the generation pipeline.
///
/// Each variant names the stage that failed. Library crates return this type
/// directly; the binary renders it through `miette` at the boundary.
///
/// # Examples
///
/// ```
/// use featuregen_core::FeaturegenError;
///
/// let err = FeaturegenError::Auth("OPENAI_API_KEY not set".into());
/// assert!(err.to_string().contains("OPENAI_API_KEY"));
/// ```
#[derive(Debug, thiserror::Error, Diagnostic)]
pub enum FeaturegenError {
    /// Local disk operation failed.
    #[error("filesystem error at {}: {source}", path.display())]
    #[diagnostic(code(featuregen::filesystem))]
    Filesystem {
        /// Path the operation was acting on.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// The remote repository could not be cloned.
    #[error("remote access error: {0}")]
    #[diagnostic(
        code(featuregen::remote_access),
        help("check the repository URL and your network connection")
    )]
    RemoteAccess(String),

    /// A credential is missing or was rejected.
    #[error("authentication error: {0}")]
    #[diagnostic(
        code(featuregen::auth),
        help("export OPENAI_API_KEY and GITHUB_TOKEN, or run `featuregen doctor`")
    )]
    Auth(String),

    /// The completion service returned something other than a usable completion.
    #[error("protocol error: {0}")]
    #[diagnostic(code(featuregen::protocol))]
    Protocol(String),

    /// Branch, commit, or push failure in the working copy.
    #[error("git error: {0}")]
    #[diagnostic(code(featuregen::vcs))]
    Vcs(String),

    /// Invalid configuration.
    #[error("configuration error: {0}")]
    #[diagnostic(code(featuregen::config))]
    Config(String),

    /// TOML deserialization failure.
    #[error("TOML parse error: {0}")]
    #[diagnostic(code(featuregen::config))]
    Toml(#[from] toml::de::Error),

    /// A failure raised while processing one controller artifact.
    #[error("while processing {}: {source}", path.display())]
    #[diagnostic(code(featuregen::artifact))]
    Artifact {
        /// The controller source file being processed.
        path: PathBuf,
        /// What went wrong.
        #[source]
        source: Box<FeaturegenError>,
    },
}

impl FeaturegenError {
    /// Build a [`FeaturegenError::Filesystem`] for `path`.
    pub fn fs(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Filesystem {
            path: path.into(),
            source,
        }
    }

    /// Attach the artifact being processed to this error.
    pub fn for_artifact(self, path: &Path) -> Self {
        Self::Artifact {
            path: path.to_path_buf(),
            source: Box::new(self),
        }
    }

    /// The innermost error, with any artifact context removed.
    ///
    /// # Examples
    ///
    /// ```
    /// use std::path::Path;
    /// use featuregen_core::FeaturegenError;
    ///
    /// let err = FeaturegenError::Protocol("empty choices".into())
    ///     .for_artifact(Path::new("UserController.java"));
    /// assert!(matches!(err.root(), FeaturegenError::Protocol(_)));
    /// ```
    pub fn root(&self) -> &FeaturegenError {
        match self {
            Self::Artifact { source, .. } => source.root(),
            other => other,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn filesystem_error_shows_path() {
        let io_err = std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied");
        let err = FeaturegenError::fs("/tmp/temp-repo", io_err);
        let msg = err.to_string();
        assert!(msg.contains("/tmp/temp-repo"));
        assert!(msg.contains("denied"));
    }

    #[test]
    fn config_error_displays_message() {
        let err = FeaturegenError::Config("bad value".into());
        assert_eq!(err.to_string(), "configuration error: bad value");
    }

    #[test]
    fn artifact_context_names_the_file() {
        let err = FeaturegenError::Protocol("no choices".into())
            .for_artifact(Path::new("src/UserController.java"));
        let msg = err.to_string();
        assert!(msg.contains("src/UserController.java"));
        assert!(msg.contains("no choices"));
    }

    #[test]
    fn root_unwraps_nested_context() {
        let err = FeaturegenError::Auth("rejected".into())
            .for_artifact(Path::new("A.java"))
            .for_artifact(Path::new("B.java"));
        assert!(matches!(err.root(), FeaturegenError::Auth(_)));
    }

    #[test]
    fn diagnostic_codes_are_set() {
        let err = FeaturegenError::Vcs("nothing to commit".into());
        let code = err.code().map(|c| c.to_string());
        assert_eq!(code.as_deref(), Some("featuregen::vcs"));
    }
}
