use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::FeaturegenError;

/// Upper bound accepted for `llm.max_retries`.
pub const MAX_RETRIES_LIMIT: u32 = 10;

/// Top-level configuration loaded from `.featuregen.toml`.
///
/// Supports layered resolution: CLI flags > env vars > local config > defaults.
/// Every field has a default, so an empty file is a valid configuration.
///
/// # Examples
///
/// ```
/// use featuregen_core::FeaturegenConfig;
///
/// let config = FeaturegenConfig::default();
/// assert_eq!(config.publish.branch, "karate-tests-poc");
/// assert_eq!(config.locator.suffix, "Controller.java");
/// ```
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FeaturegenConfig {
    /// Remote repository and local working copy.
    #[serde(default)]
    pub repository: RepositoryConfig,
    /// Controller discovery settings.
    #[serde(default)]
    pub locator: LocatorConfig,
    /// Completion service settings.
    #[serde(default)]
    pub llm: LlmConfig,
    /// Where generated feature files are written.
    #[serde(default)]
    pub output: OutputConfig,
    /// Branch, commit, and push settings.
    #[serde(default)]
    pub publish: PublishConfig,
}

impl FeaturegenConfig {
    /// Load configuration from a TOML file at `path`.
    ///
    /// # Errors
    ///
    /// Returns [`FeaturegenError::Filesystem`] if the file cannot be read, or
    /// [`FeaturegenError::Toml`] if the content is not valid TOML.
    ///
    /// # Examples
    ///
    /// ```no_run
    /// use featuregen_core::FeaturegenConfig;
    /// use std::path::Path;
    ///
    /// let config = FeaturegenConfig::from_file(Path::new(".featuregen.toml")).unwrap();
    /// ```
    pub fn from_file(path: &Path) -> Result<Self, FeaturegenError> {
        let content = std::fs::read_to_string(path).map_err(|e| FeaturegenError::fs(path, e))?;
        Self::from_toml(&content)
    }

    /// Parse configuration from a TOML string.
    ///
    /// # Errors
    ///
    /// Returns [`FeaturegenError::Toml`] if parsing fails.
    ///
    /// # Examples
    ///
    /// ```
    /// use featuregen_core::FeaturegenConfig;
    ///
    /// let toml = r#"
    /// [publish]
    /// branch = "generated-tests"
    /// "#;
    /// let config = FeaturegenConfig::from_toml(toml).unwrap();
    /// assert_eq!(config.publish.branch, "generated-tests");
    /// ```
    pub fn from_toml(content: &str) -> Result<Self, FeaturegenError> {
        let config: Self = toml::from_str(content)?;
        Ok(config)
    }

    /// Check values that would otherwise fail late in the pipeline.
    ///
    /// # Errors
    ///
    /// Returns [`FeaturegenError::Config`] naming the first invalid field.
    pub fn validate(&self) -> Result<(), FeaturegenError> {
        if self.repository.remote_url.trim().is_empty() {
            return Err(FeaturegenError::Config(
                "repository.remote_url must not be empty".into(),
            ));
        }
        if self.locator.suffix.is_empty() {
            return Err(FeaturegenError::Config(
                "locator.suffix must not be empty".into(),
            ));
        }
        if self.output.extension.trim_start_matches('.').is_empty() {
            return Err(FeaturegenError::Config(
                "output.extension must not be empty".into(),
            ));
        }
        if self.output.dir.is_absolute() {
            return Err(FeaturegenError::Config(format!(
                "output.dir must be relative to the working copy, got {}",
                self.output.dir.display()
            )));
        }
        if self.publish.branch.trim().is_empty() {
            return Err(FeaturegenError::Config(
                "publish.branch must not be empty".into(),
            ));
        }
        if !(0.0..=2.0).contains(&self.llm.temperature) {
            return Err(FeaturegenError::Config(format!(
                "llm.temperature must be between 0.0 and 2.0, got {}",
                self.llm.temperature
            )));
        }
        if self.llm.max_retries > MAX_RETRIES_LIMIT {
            return Err(FeaturegenError::Config(format!(
                "llm.max_retries must be at most {MAX_RETRIES_LIMIT}, got {}",
                self.llm.max_retries
            )));
        }
        Ok(())
    }

    /// Output directory inside the working copy.
    pub fn output_dir(&self) -> PathBuf {
        self.repository.workdir.join(&self.output.dir)
    }
}

/// Remote repository and local working copy.
///
/// # Examples
///
/// ```
/// use featuregen_core::RepositoryConfig;
///
/// let config = RepositoryConfig::default();
/// assert_eq!(config.workdir.to_str(), Some("temp-repo"));
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RepositoryConfig {
    /// URL (or local path) of the repository to clone.
    #[serde(default = "default_remote_url")]
    pub remote_url: String,
    /// Local working copy. Deleted and recreated on every run.
    #[serde(default = "default_workdir")]
    pub workdir: PathBuf,
}

fn default_remote_url() -> String {
    "https://github.com/saivijaykumar/BankManagement.git".into()
}

fn default_workdir() -> PathBuf {
    PathBuf::from("temp-repo")
}

impl Default for RepositoryConfig {
    fn default() -> Self {
        Self {
            remote_url: default_remote_url(),
            workdir: default_workdir(),
        }
    }
}

/// Controller discovery settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LocatorConfig {
    /// File-name suffix identifying a controller source file.
    #[serde(default = "default_suffix")]
    pub suffix: String,
}

fn default_suffix() -> String {
    "Controller.java".into()
}

impl Default for LocatorConfig {
    fn default() -> Self {
        Self {
            suffix: default_suffix(),
        }
    }
}

/// Completion service configuration.
///
/// # Examples
///
/// ```
/// use featuregen_core::LlmConfig;
///
/// let config = LlmConfig::default();
/// assert_eq!(config.model, "gpt-4");
/// assert_eq!(config.temperature, 0.3);
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmConfig {
    /// Provider name, used for diagnostics only.
    #[serde(default = "default_provider")]
    pub provider: String,
    /// Model identifier.
    #[serde(default = "default_model")]
    pub model: String,
    /// Sampling temperature.
    #[serde(default = "default_temperature")]
    pub temperature: f64,
    /// Base URL of an OpenAI-compatible API.
    #[serde(default = "default_base_url")]
    pub base_url: String,
    /// API key; overrides `OPENAI_API_KEY` when set.
    pub api_key: Option<String>,
    /// Request timeout in seconds.
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    /// Extra attempts after a transport failure, at most [`MAX_RETRIES_LIMIT`].
    /// HTTP errors are never retried.
    #[serde(default)]
    pub max_retries: u32,
}

fn default_provider() -> String {
    "openai".into()
}

fn default_model() -> String {
    "gpt-4".into()
}

fn default_temperature() -> f64 {
    0.3
}

fn default_base_url() -> String {
    "https://api.openai.com".into()
}

fn default_timeout_secs() -> u64 {
    120
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            provider: default_provider(),
            model: default_model(),
            temperature: default_temperature(),
            base_url: default_base_url(),
            api_key: None,
            timeout_secs: default_timeout_secs(),
            max_retries: 0,
        }
    }
}

/// Where generated feature files are written.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutputConfig {
    /// Directory relative to the working copy root.
    #[serde(default = "default_output_dir")]
    pub dir: PathBuf,
    /// Extension of generated files, without the dot.
    #[serde(default = "default_extension")]
    pub extension: String,
}

fn default_output_dir() -> PathBuf {
    PathBuf::from("src/test/resources/karate")
}

fn default_extension() -> String {
    "feature".into()
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            dir: default_output_dir(),
            extension: default_extension(),
        }
    }
}

/// Branch, commit, and push settings.
///
/// # Examples
///
/// ```
/// use featuregen_core::PublishConfig;
///
/// let config = PublishConfig::default();
/// assert_eq!(config.remote, "origin");
/// assert_eq!(config.commit_message, "Add generated Karate tests");
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PublishConfig {
    /// Name of the branch to create and push.
    #[serde(default = "default_branch")]
    pub branch: String,
    /// Message of the single generated commit.
    #[serde(default = "default_commit_message")]
    pub commit_message: String,
    /// Remote to push to.
    #[serde(default = "default_remote")]
    pub remote: String,
    /// Username paired with the token for HTTPS push.
    #[serde(default = "default_username")]
    pub username: String,
    /// Commit author name (falls back to git config).
    pub author_name: Option<String>,
    /// Commit author email (falls back to git config).
    pub author_email: Option<String>,
}

fn default_branch() -> String {
    "karate-tests-poc".into()
}

fn default_commit_message() -> String {
    "Add generated Karate tests".into()
}

fn default_remote() -> String {
    "origin".into()
}

fn default_username() -> String {
    "x-access-token".into()
}

impl Default for PublishConfig {
    fn default() -> Self {
        Self {
            branch: default_branch(),
            commit_message: default_commit_message(),
            remote: default_remote(),
            username: default_username(),
            author_name: None,
            author_email: None,
        }
    }
}
