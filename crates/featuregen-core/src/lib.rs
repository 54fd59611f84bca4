//! Core types, configuration, and error handling for featuregen.
//!
//! This crate provides the shared foundation used by the other featuregen crates:
//! - [`FeaturegenError`]: unified error type using `thiserror`
//! - [`FeaturegenConfig`]: configuration loaded from `.featuregen.toml`
//! - [`Secrets`]: credentials resolved once from the process environment
//! - Shared types: [`ControllerArtifact`], [`feature_file_name`]

mod config;
mod error;
mod secrets;
mod types;

pub use config::{
    FeaturegenConfig, LlmConfig, LocatorConfig, OutputConfig, PublishConfig, RepositoryConfig,
    MAX_RETRIES_LIMIT,
};
pub use error::FeaturegenError;
pub use secrets::{Secrets, LLM_API_KEY_VAR, VCS_TOKEN_VARS};
pub use types::{feature_file_name, ControllerArtifact};

/// A convenience `Result` type for featuregen operations.
pub type Result<T> = std::result::Result<T, FeaturegenError>;
