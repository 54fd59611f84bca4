//! Branch, commit, and push of generated files.

use std::cell::{Cell, RefCell};

use featuregen_core::{FeaturegenError, PublishConfig};
use git2::{
    BranchType, Cred, ErrorClass, ErrorCode, IndexAddOption, PushOptions, RemoteCallbacks,
    Repository, Signature,
};
use serde::Serialize;

use crate::mirror::WorkingCopy;

/// Result of a successful publish.
///
/// # Examples
///
/// ```
/// use featuregen_repo::PublishOutcome;
///
/// let outcome = PublishOutcome {
///     branch: "karate-tests-poc".into(),
///     commit: "3f2a9c1".into(),
///     remote: "origin".into(),
/// };
/// assert_eq!(outcome.branch, "karate-tests-poc");
/// ```
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PublishOutcome {
    /// Branch created and pushed.
    pub branch: String,
    /// Id of the generated commit.
    pub commit: String,
    /// Remote the branch was pushed to.
    pub remote: String,
}

/// Create `config.branch`, commit every change in the working copy, and push it.
///
/// The token is checked before the repository is touched. The new branch starts
/// at the current HEAD and receives exactly one commit containing all new,
/// modified, and deleted files.
///
/// # Errors
///
/// - [`FeaturegenError::Auth`] if `token` is missing or the remote rejects it.
/// - [`FeaturegenError::Vcs`] if the branch already exists, there is nothing
///   to commit, or any other git operation fails (including a rejected push).
pub fn publish(
    working_copy: &WorkingCopy,
    config: &PublishConfig,
    token: Option<&str>,
) -> Result<PublishOutcome, FeaturegenError> {
    let token = token
        .filter(|t| !t.trim().is_empty())
        .ok_or_else(|| FeaturegenError::Auth("GITHUB_TOKEN environment variable not set".into()))?;

    let repo = working_copy.open()?;
    let branch = config.branch.as_str();

    if repo.find_branch(branch, BranchType::Local).is_ok() {
        return Err(FeaturegenError::Vcs(format!("branch '{branch}' already exists")));
    }

    let parent = head_commit(&repo)?;
    let tree_id = stage_all(&repo)?;

    let unchanged = match &parent {
        Some(p) => p.tree_id() == tree_id,
        None => repo
            .index()
            .map(|i| i.is_empty())
            .map_err(|e| FeaturegenError::Vcs(format!("failed to read index: {e}")))?,
    };
    if unchanged {
        return Err(FeaturegenError::Vcs(format!(
            "nothing to commit on branch '{branch}'"
        )));
    }

    let refname = format!("refs/heads/{branch}");
    if let Some(p) = &parent {
        repo.branch(branch, p, false)
            .map_err(|e| FeaturegenError::Vcs(format!("failed to create branch '{branch}': {e}")))?;
    }
    repo.set_head(&refname)
        .map_err(|e| FeaturegenError::Vcs(format!("failed to check out '{branch}': {e}")))?;

    let tree = repo
        .find_tree(tree_id)
        .map_err(|e| FeaturegenError::Vcs(format!("failed to find tree: {e}")))?;
    let sig = signature(&repo, config)?;
    let parents: Vec<&git2::Commit<'_>> = parent.iter().collect();
    let commit_id = repo
        .commit(
            Some("HEAD"),
            &sig,
            &sig,
            &config.commit_message,
            &tree,
            &parents,
        )
        .map_err(|e| FeaturegenError::Vcs(format!("failed to commit: {e}")))?;

    push(&repo, &config.remote, &refname, &config.username, token)?;

    Ok(PublishOutcome {
        branch: branch.to_string(),
        commit: commit_id.to_string(),
        remote: config.remote.clone(),
    })
}

/// Check that `branch` can be created as `refs/heads/<branch>`.
///
/// # Errors
///
/// Returns [`FeaturegenError::Config`] for names git rejects, such as `a..b`,
/// `feature/`, or names containing spaces.
///
/// # Examples
///
/// ```
/// use featuregen_repo::publish::validate_branch_name;
///
/// assert!(validate_branch_name("karate-tests-poc").is_ok());
/// assert!(validate_branch_name("a..b").is_err());
/// ```
pub fn validate_branch_name(branch: &str) -> Result<(), FeaturegenError> {
    let valid = !branch.starts_with('-')
        && !branch.contains('\0')
        && branch != "HEAD"
        && git2::Reference::is_valid_name(&format!("refs/heads/{branch}"));
    if valid {
        Ok(())
    } else {
        Err(FeaturegenError::Config(format!(
            "publish.branch '{branch}' is not a valid git branch name"
        )))
    }
}

fn head_commit(repo: &Repository) -> Result<Option<git2::Commit<'_>>, FeaturegenError> {
    let head = match repo.head() {
        Ok(h) => h,
        Err(e) if e.code() == ErrorCode::UnbornBranch => return Ok(None),
        Err(e) => return Err(FeaturegenError::Vcs(format!("failed to read HEAD: {e}"))),
    };
    head.peel_to_commit()
        .map(Some)
        .map_err(|e| FeaturegenError::Vcs(format!("HEAD is not a commit: {e}")))
}

/// Stage additions, modifications, and deletions; return the resulting tree.
fn stage_all(repo: &Repository) -> Result<git2::Oid, FeaturegenError> {
    let vcs = |e: git2::Error| FeaturegenError::Vcs(format!("failed to stage changes: {e}"));
    let mut index = repo.index().map_err(vcs)?;
    index
        .add_all(["*"].iter(), IndexAddOption::DEFAULT, None)
        .map_err(vcs)?;
    index.update_all(["*"].iter(), None).map_err(vcs)?;
    index.write().map_err(vcs)?;
    index.write_tree().map_err(vcs)
}

fn signature(
    repo: &Repository,
    config: &PublishConfig,
) -> Result<Signature<'static>, FeaturegenError> {
    let configured = repo.signature().ok();
    let name = config
        .author_name
        .clone()
        .or_else(|| configured.as_ref().and_then(|s| s.name().map(str::to_string)))
        .unwrap_or_else(|| "featuregen".into());
    let email = config
        .author_email
        .clone()
        .or_else(|| configured.as_ref().and_then(|s| s.email().map(str::to_string)))
        .unwrap_or_else(|| "featuregen@localhost".into());
    Signature::now(&name, &email)
        .map_err(|e| FeaturegenError::Vcs(format!("invalid commit author: {e}")))
}

fn push(
    repo: &Repository,
    remote_name: &str,
    refname: &str,
    username: &str,
    token: &str,
) -> Result<(), FeaturegenError> {
    let mut remote = repo
        .find_remote(remote_name)
        .map_err(|e| FeaturegenError::Vcs(format!("remote '{remote_name}' not found: {e}")))?;

    let attempts = Cell::new(0u32);
    let rejected: RefCell<Option<String>> = RefCell::new(None);

    let result = {
        let mut callbacks = RemoteCallbacks::new();
        callbacks.credentials(|_url, _username_from_url, _allowed| {
            // libgit2 keeps asking while the server rejects the credential
            attempts.set(attempts.get() + 1);
            if attempts.get() > 1 {
                return Err(git2::Error::new(
                    ErrorCode::Auth,
                    ErrorClass::Callback,
                    "token rejected by remote",
                ));
            }
            Cred::userpass_plaintext(username, token)
        });
        callbacks.push_update_reference(|name, status| {
            if let Some(msg) = status {
                *rejected.borrow_mut() = Some(format!("{name}: {msg}"));
            }
            Ok(())
        });

        let mut options = PushOptions::new();
        options.remote_callbacks(callbacks);
        let refspec = format!("{refname}:{refname}");
        remote.push(&[refspec.as_str()], Some(&mut options))
    };

    result.map_err(|e| classify_push_error(remote_name, &e))?;

    if let Some(reason) = rejected.into_inner() {
        return Err(FeaturegenError::Vcs(format!(
            "push to '{remote_name}' rejected: {reason}"
        )));
    }
    Ok(())
}

fn classify_push_error(remote_name: &str, err: &git2::Error) -> FeaturegenError {
    let message = err.message();
    let auth_status = err.class() == ErrorClass::Http
        && (message.contains("401") || message.contains("403"));
    if err.code() == ErrorCode::Auth || auth_status {
        FeaturegenError::Auth(format!("push to '{remote_name}' was not authorized: {message}"))
    } else {
        FeaturegenError::Vcs(format!("failed to push to '{remote_name}': {message}"))
    }
}
