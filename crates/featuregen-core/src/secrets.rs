use std::fmt;

use crate::config::LlmConfig;
use crate::error::FeaturegenError;

/// Environment variable holding the completion service API key.
pub const LLM_API_KEY_VAR: &str = "OPENAI_API_KEY";

/// Environment variables holding the source-control token, in lookup order.
pub const VCS_TOKEN_VARS: [&str; 2] = ["GITHUB_TOKEN", "GH_TOKEN"];

/// Credentials resolved once at process start.
///
/// Components receive the credential they need from here instead of reading
/// the environment themselves. `Debug` output never contains the values.
///
/// # Examples
///
/// ```
/// use featuregen_core::Secrets;
///
/// let secrets = Secrets::new(Some("sk-test".into()), None);
/// assert_eq!(secrets.llm_api_key().unwrap(), "sk-test");
/// assert!(secrets.vcs_token().is_err());
/// assert!(!format!("{secrets:?}").contains("sk-test"));
/// ```
#[derive(Clone, Default)]
pub struct Secrets {
    llm_api_key: Option<String>,
    vcs_token: Option<String>,
}

impl Secrets {
    /// Build from explicit values. Empty strings count as absent.
    pub fn new(llm_api_key: Option<String>, vcs_token: Option<String>) -> Self {
        Self {
            llm_api_key: llm_api_key.filter(|v| !v.trim().is_empty()),
            vcs_token: vcs_token.filter(|v| !v.trim().is_empty()),
        }
    }

    /// Read credentials from the process environment.
    ///
    /// `llm.api_key` from the config file takes precedence over
    /// `OPENAI_API_KEY`. The token is read from `GITHUB_TOKEN`, then `GH_TOKEN`.
    pub fn from_env(llm: &LlmConfig) -> Self {
        Self::from_lookup(llm, |name| std::env::var(name).ok())
    }

    /// Resolve credentials through an arbitrary variable lookup.
    pub fn from_lookup(llm: &LlmConfig, lookup: impl Fn(&str) -> Option<String>) -> Self {
        let llm_api_key = llm
            .api_key
            .clone()
            .filter(|v| !v.trim().is_empty())
            .or_else(|| lookup(LLM_API_KEY_VAR));
        let vcs_token = VCS_TOKEN_VARS
            .iter()
            .find_map(|name| lookup(name).filter(|v| !v.trim().is_empty()));
        Self::new(llm_api_key, vcs_token)
    }

    /// The completion service API key.
    ///
    /// # Errors
    ///
    /// Returns [`FeaturegenError::Auth`] if no key was configured.
    pub fn llm_api_key(&self) -> Result<&str, FeaturegenError> {
        self.llm_api_key.as_deref().ok_or_else(|| {
            FeaturegenError::Auth(format!(
                "{LLM_API_KEY_VAR} not set. Export it or set api_key in [llm]"
            ))
        })
    }

    /// The source-control personal access token.
    ///
    /// # Errors
    ///
    /// Returns [`FeaturegenError::Auth`] if no token was configured.
    pub fn vcs_token(&self) -> Result<&str, FeaturegenError> {
        self.vcs_token.as_deref().ok_or_else(|| {
            FeaturegenError::Auth(format!(
                "{} environment variable not set",
                VCS_TOKEN_VARS[0]
            ))
        })
    }

    /// Whether an API key is available.
    pub fn has_llm_api_key(&self) -> bool {
        self.llm_api_key.is_some()
    }

    /// Whether a source-control token is available.
    pub fn has_vcs_token(&self) -> bool {
        self.vcs_token.is_some()
    }
}

impl fmt::Debug for Secrets {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let redact = |v: &Option<String>| if v.is_some() { "<redacted>" } else { "<unset>" };
        f.debug_struct("Secrets")
            .field("llm_api_key", &redact(&self.llm_api_key))
            .field("vcs_token", &redact(&self.vcs_token))
            .finish()
    }
}
