use std::fmt;
use std::path::{Path, PathBuf};

use featuregen_core::{
    feature_file_name, ControllerArtifact, FeaturegenConfig, FeaturegenError, Secrets,
};
use featuregen_repo::{
    acquire, find_artifacts, publish, validate_branch_name, PublishOutcome, WorkingCopy,
};
use indicatif::ProgressBar;
use serde::Serialize;

use crate::llm::LlmClient;
use crate::prompt;
use crate::writer::write_feature;

/// Switches for a single run.
///
/// # Examples
///
/// ```
/// use featuregen_generate::pipeline::RunOptions;
///
/// let opts = RunOptions::default();
/// assert!(opts.publish);
/// assert!(!opts.verbose);
/// ```
#[derive(Debug, Clone, Copy)]
pub struct RunOptions {
    /// Create, commit, and push the branch after writing feature files.
    pub publish: bool,
    /// Log extra per-artifact detail.
    pub verbose: bool,
}

impl Default for RunOptions {
    fn default() -> Self {
        Self {
            publish: true,
            verbose: false,
        }
    }
}

/// Result of a completed run.
///
/// # Examples
///
/// ```
/// use std::path::PathBuf;
/// use featuregen_generate::pipeline::RunReport;
///
/// let report = RunReport {
///     workdir: PathBuf::from("temp-repo"),
///     artifacts_found: 0,
///     written: vec![],
///     published: None,
/// };
/// assert!(report.to_string().contains("Controllers: 0"));
/// ```
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RunReport {
    /// Working copy the run operated on.
    pub workdir: PathBuf,
    /// Number of controller files found.
    pub artifacts_found: usize,
    /// Feature files written, relative to the working copy.
    pub written: Vec<PathBuf>,
    /// Branch pushed, when publishing was enabled.
    pub published: Option<PublishOutcome>,
}

impl fmt::Display for RunReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Generation Results")?;
        writeln!(f, "==================")?;
        writeln!(
            f,
            "Working copy: {} | Controllers: {} | Feature files: {}\n",
            self.workdir.display(),
            self.artifacts_found,
            self.written.len(),
        )?;
        for path in &self.written {
            writeln!(f, "  {}", path.display())?;
        }
        match &self.published {
            Some(p) => writeln!(f, "\nPushed {} to {} ({})", p.branch, p.remote, p.commit)?,
            None => writeln!(f, "\nNot published.")?,
        }
        Ok(())
    }
}

/// Generate the test script text for one controller's source.
///
/// Sends the fixed two-message conversation and returns the first choice's
/// content untouched.
///
/// # Errors
///
/// Returns whatever [`LlmClient::chat`] returns.
pub async fn generate_test(
    llm: &LlmClient,
    controller_source: &str,
) -> Result<String, FeaturegenError> {
    let messages = prompt::build_messages(controller_source);
    llm.chat(&messages).await
}

/// Orchestrator: mirror, locate, then generate and write each feature file,
/// then publish.
///
/// Artifacts are processed one at a time. The first failure aborts the run;
/// feature files already written stay on disk but nothing is published.
pub struct Pipeline {
    config: FeaturegenConfig,
    llm: LlmClient,
    vcs_token: Option<String>,
    options: RunOptions,
    progress: ProgressBar,
}

impl Pipeline {
    /// Validate configuration and credentials, and build the pipeline.
    ///
    /// Credentials are checked here, before anything is cloned or sent.
    ///
    /// # Errors
    ///
    /// - [`FeaturegenError::Config`] if the configuration is invalid, including
    ///   a branch name git would refuse.
    /// - [`FeaturegenError::Auth`] if the API key is missing, or the token is
    ///   missing while publishing is enabled.
    pub fn new(
        config: FeaturegenConfig,
        secrets: &Secrets,
        options: RunOptions,
    ) -> Result<Self, FeaturegenError> {
        config.validate()?;
        validate_branch_name(&config.publish.branch)?;
        let api_key = secrets.llm_api_key()?;
        let vcs_token = if options.publish {
            Some(secrets.vcs_token()?.to_string())
        } else {
            None
        };
        let llm = LlmClient::new(&config.llm, api_key)?;

        Ok(Self {
            config,
            llm,
            vcs_token,
            options,
            progress: ProgressBar::hidden(),
        })
    }

    /// Report progress on `progress` instead of a hidden bar.
    pub fn with_progress(mut self, progress: ProgressBar) -> Self {
        self.progress = progress;
        self
    }

    /// Run every stage in order.
    ///
    /// # Errors
    ///
    /// Returns the first error from any stage. Failures while processing a
    /// controller are wrapped in [`FeaturegenError::Artifact`].
    pub async fn run(&self) -> Result<RunReport, FeaturegenError> {
        let remote_url = &self.config.repository.remote_url;
        self.progress.set_message(format!("Cloning {remote_url}"));
        let working_copy = acquire(remote_url, &self.config.repository.workdir)?;

        let artifacts = find_artifacts(working_copy.root(), &self.config.locator.suffix)?;
        if self.options.verbose {
            self.log(format!(
                "Found {} file(s) ending in {}",
                artifacts.len(),
                self.config.locator.suffix
            ));
        }

        let output_dir = working_copy.root().join(&self.config.output.dir);
        let mut written = Vec::with_capacity(artifacts.len());
        for (i, path) in artifacts.iter().enumerate() {
            self.progress.set_message(format!(
                "[{}/{}] {}",
                i + 1,
                artifacts.len(),
                relative_to(working_copy.root(), path).display()
            ));
            let target = self
                .process(path, &output_dir)
                .await
                .map_err(|e| e.for_artifact(path))?;
            self.log(format!("Generated test: {}", target.display()));
            written.push(relative_to(working_copy.root(), &target));
        }

        let published = if self.options.publish {
            Some(self.publish(&working_copy)?)
        } else {
            None
        };

        Ok(RunReport {
            workdir: working_copy.root().to_path_buf(),
            artifacts_found: artifacts.len(),
            written,
            published,
        })
    }

    async fn process(&self, path: &Path, output_dir: &Path) -> Result<PathBuf, FeaturegenError> {
        let artifact = ControllerArtifact::read(path)?;
        if self.options.verbose {
            self.log(format!(
                "Sending {} ({} bytes) to {}",
                artifact.file_name(),
                artifact.content.len(),
                self.llm.model()
            ));
        }
        let feature = generate_test(&self.llm, &artifact.content).await?;
        let file_name = feature_file_name(path, &self.config.output.extension)?;
        write_feature(output_dir, &file_name, &feature)
    }

    fn publish(&self, working_copy: &WorkingCopy) -> Result<PublishOutcome, FeaturegenError> {
        let branch = &self.config.publish.branch;
        self.progress
            .set_message(format!("Publishing {branch} to {}", self.config.publish.remote));
        let outcome = publish(
            working_copy,
            &self.config.publish,
            self.vcs_token.as_deref(),
        )?;
        self.log(format!("Pushed branch: {}", outcome.branch));
        Ok(outcome)
    }

    fn log(&self, line: String) {
        self.progress.suspend(|| eprintln!("{line}"));
    }
}

fn relative_to(root: &Path, path: &Path) -> PathBuf {
    path.strip_prefix(root).unwrap_or(path).to_path_buf()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn secrets() -> Secrets {
        Secrets::new(Some("sk-test".into()), Some("ghp_test".into()))
    }

    #[test]
    fn missing_api_key_fails_fast() {
        let secrets = Secrets::new(None, Some("ghp_test".into()));
        let result = Pipeline::new(FeaturegenConfig::default(), &secrets, RunOptions::default());
        assert!(matches!(result, Err(FeaturegenError::Auth(_))));
    }

    #[test]
    fn missing_token_fails_fast_when_publishing() {
        let secrets = Secrets::new(Some("sk-test".into()), None);
        let result = Pipeline::new(FeaturegenConfig::default(), &secrets, RunOptions::default());
        let err = result.err().unwrap();
        assert!(matches!(err, FeaturegenError::Auth(_)));
        assert!(err.to_string().contains("GITHUB_TOKEN"));
    }

    #[test]
    fn token_not_needed_without_publishing() {
        let secrets = Secrets::new(Some("sk-test".into()), None);
        let options = RunOptions {
            publish: false,
            ..RunOptions::default()
        };
        assert!(Pipeline::new(FeaturegenConfig::default(), &secrets, options).is_ok());
    }

    #[test]
    fn invalid_config_is_rejected() {
        let mut config = FeaturegenConfig::default();
        config.locator.suffix.clear();
        let result = Pipeline::new(config, &secrets(), RunOptions::default());
        assert!(matches!(result, Err(FeaturegenError::Config(_))));
    }

    #[test]
    fn invalid_branch_name_is_rejected_before_any_work() {
        let mut config = FeaturegenConfig::default();
        config.publish.branch = "a..b".into();
        let result = Pipeline::new(config, &secrets(), RunOptions::default());
        let err = result.err().unwrap();
        assert!(matches!(err, FeaturegenError::Config(_)));
        assert!(err.to_string().contains("a..b"));
    }

    #[test]
    fn report_display_lists_files_and_branch() {
        let report = RunReport {
            workdir: PathBuf::from("temp-repo"),
            artifacts_found: 2,
            written: vec![
                PathBuf::from("src/test/resources/karate/UserController.feature"),
                PathBuf::from("src/test/resources/karate/OrderController.feature"),
            ],
            published: Some(PublishOutcome {
                branch: "karate-tests-poc".into(),
                commit: "abc123".into(),
                remote: "origin".into(),
            }),
        };
        let text = report.to_string();
        assert!(text.contains("Controllers: 2"));
        assert!(text.contains("UserController.feature"));
        assert!(text.contains("Pushed karate-tests-poc to origin"));
    }

    #[test]
    fn report_serializes_camel_case() {
        let report = RunReport {
            workdir: PathBuf::from("temp-repo"),
            artifacts_found: 1,
            written: vec![PathBuf::from("a.feature")],
            published: None,
        };
        let json = serde_json::to_value(&report).unwrap();
        assert_eq!(json["artifactsFound"], 1);
        assert!(json["published"].is_null());
    }

    #[test]
    fn relative_to_strips_root() {
        let rel = relative_to(Path::new("temp-repo"), Path::new("temp-repo/src/A.java"));
        assert_eq!(rel, PathBuf::from("src/A.java"));
        let outside = relative_to(Path::new("temp-repo"), Path::new("/elsewhere/B.java"));
        assert_eq!(outside, PathBuf::from("/elsewhere/B.java"));
    }
}
