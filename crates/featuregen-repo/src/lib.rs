//! Working-copy management via git2.
//!
//! Clones the target repository into a fresh working copy, finds controller
//! source files in it, and publishes generated files on a new branch.

pub mod locator;
pub mod mirror;
pub mod publish;

pub use locator::find_artifacts;
pub use mirror::{acquire, WorkingCopy};
pub use publish::{publish, validate_branch_name, PublishOutcome};
