// SPDX-License-Identifier: AGPL-3.0-or-later
//! Project configuration validation
//!
//! Turns a loosely-typed [`RawProjectConfig`] into an immutable
//! [`ProjectConfig`], or rejects it. Nothing downstream ever sees a
//! config that did not pass through [`validate`].

use serde::{Deserialize, Serialize};
use tracing::debug;

use super::bucket::{RemovalPolicy, BUCKET_NAME_SUFFIX};
use super::trust::DEFAULT_MANAGED_POLICY;
use crate::error::{PerchError, Result};

/// Longest bucket name the storage service accepts
const MAX_BUCKET_NAME_LEN: usize = 63;

/// Characters that would alter the meaning of a trust subject pattern
const SUBJECT_RESERVED: &[char] = &['/', ':', '*', '?'];

/// Project configuration as read from disk, before validation
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RawProjectConfig {
    /// Project identifier, used as the bucket name prefix
    #[serde(default, alias = "projectId", skip_serializing_if = "Option::is_none")]
    pub project_id: Option<String>,

    /// Keep object versions (default: true)
    #[serde(default, alias = "enableVersioning", skip_serializing_if = "Option::is_none")]
    pub enable_versioning: Option<bool>,

    /// Encrypt objects with provider-managed keys (default: true)
    #[serde(default, alias = "enableEncryption", skip_serializing_if = "Option::is_none")]
    pub enable_encryption: Option<bool>,

    /// Accepted for compatibility; public access is always blocked
    #[serde(default, alias = "blockPublicAccess", skip_serializing_if = "Option::is_none")]
    pub block_public_access: Option<bool>,

    /// GitHub organisation or user owning the repository
    #[serde(default, alias = "githubRepoOwner", skip_serializing_if = "Option::is_none")]
    pub github_repo_owner: Option<String>,

    /// GitHub repository name
    #[serde(default, alias = "githubRepoName", skip_serializing_if = "Option::is_none")]
    pub github_repo_name: Option<String>,

    /// `owner/name` shorthand, used when owner or name is not given separately
    #[serde(default, alias = "githubRepo", skip_serializing_if = "Option::is_none")]
    pub github_repo: Option<String>,

    /// What the deployment engine does with the bucket on teardown
    #[serde(default, alias = "removalPolicy", skip_serializing_if = "Option::is_none")]
    pub removal_policy: Option<RemovalPolicy>,

    /// Managed policies attached to the CI role (names or full ARNs)
    #[serde(default, alias = "managedPolicies", skip_serializing_if = "Option::is_none")]
    pub managed_policies: Option<Vec<String>>,
}

/// Validated, normalized project configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProjectConfig {
    project_id: String,
    enable_versioning: bool,
    enable_encryption: bool,
    block_public_access: bool,
    github_repo_owner: String,
    github_repo_name: String,
    removal_policy: RemovalPolicy,
    managed_policies: Vec<String>,
}

impl ProjectConfig {
    /// Project id exactly as configured
    pub fn project_id(&self) -> &str {
        &self.project_id
    }

    pub fn enable_versioning(&self) -> bool {
        self.enable_versioning
    }

    pub fn enable_encryption(&self) -> bool {
        self.enable_encryption
    }

    /// The flag as supplied. Builders do not consult it.
    pub fn block_public_access(&self) -> bool {
        self.block_public_access
    }

    pub fn github_repo_owner(&self) -> &str {
        &self.github_repo_owner
    }

    pub fn github_repo_name(&self) -> &str {
        &self.github_repo_name
    }

    pub fn removal_policy(&self) -> RemovalPolicy {
        self.removal_policy
    }

    pub fn managed_policies(&self) -> &[String] {
        &self.managed_policies
    }
}

/// Validate a raw configuration and apply defaults
///
/// # Errors
///
/// * `MissingField` when `project_id`, the repository owner or the
///   repository name is empty or absent, or when the policy list is empty
/// * `InvalidNaming` when the project id cannot prefix a bucket name, or a
///   repository component would change the trust subject's meaning
pub fn validate(raw: &RawProjectConfig) -> Result<ProjectConfig> {
    let project_id = required(&raw.project_id, "project_id")?;
    check_project_id(&project_id)?;

    let (shorthand_owner, shorthand_name) = match raw.github_repo.as_deref() {
        Some(repo) if !repo.trim().is_empty() => {
            let (owner, name) = split_repo(repo)?;
            (Some(owner), Some(name))
        }
        _ => (None, None),
    };

    let github_repo_owner = required(
        &present(&raw.github_repo_owner).or(shorthand_owner),
        "github_repo_owner",
    )?;
    let github_repo_name = required(
        &present(&raw.github_repo_name).or(shorthand_name),
        "github_repo_name",
    )?;
    check_subject_component("github_repo_owner", &github_repo_owner)?;
    check_subject_component("github_repo_name", &github_repo_name)?;

    let managed_policies = match &raw.managed_policies {
        None => vec![DEFAULT_MANAGED_POLICY.to_string()],
        Some(list) if list.is_empty() => return Err(PerchError::missing("managed_policies")),
        Some(list) => {
            if let Some(blank) = list
                .iter()
                .find(|p| p.trim().is_empty() || p.chars().any(char::is_whitespace))
            {
                return Err(PerchError::naming(
                    "managed_policies",
                    blank.clone(),
                    "policy identifiers cannot be blank or contain whitespace",
                ));
            }
            list.clone()
        }
    };

    let config = ProjectConfig {
        project_id,
        enable_versioning: raw.enable_versioning.unwrap_or(true),
        enable_encryption: raw.enable_encryption.unwrap_or(true),
        block_public_access: raw.block_public_access.unwrap_or(true),
        github_repo_owner,
        github_repo_name,
        removal_policy: raw.removal_policy.unwrap_or_default(),
        managed_policies,
    };

    debug!(
        project = %config.project_id,
        versioning = config.enable_versioning,
        encryption = config.enable_encryption,
        "Project configuration validated"
    );

    Ok(config)
}

/// A blank value counts as absent
fn present(value: &Option<String>) -> Option<String> {
    value.clone().filter(|v| !v.trim().is_empty())
}

fn required(value: &Option<String>, field: &str) -> Result<String> {
    match value {
        Some(v) if !v.trim().is_empty() => Ok(v.clone()),
        _ => Err(PerchError::missing(field)),
    }
}

fn check_project_id(project_id: &str) -> Result<()> {
    let normalized = project_id.to_lowercase();

    if let Some(bad) = normalized
        .chars()
        .find(|c| !(c.is_ascii_lowercase() || c.is_ascii_digit() || *c == '-'))
    {
        return Err(PerchError::naming(
            "project_id",
            project_id,
            format!("illegal character '{}' in bucket name", bad),
        ));
    }

    if normalized.starts_with('-') {
        return Err(PerchError::naming(
            "project_id",
            project_id,
            "bucket names must start with a letter or digit",
        ));
    }

    let name_len = normalized.len() + BUCKET_NAME_SUFFIX.len();
    if name_len > MAX_BUCKET_NAME_LEN {
        return Err(PerchError::naming(
            "project_id",
            project_id,
            format!(
                "derived bucket name is {} characters, limit is {}",
                name_len, MAX_BUCKET_NAME_LEN
            ),
        ));
    }

    Ok(())
}

fn check_subject_component(field: &str, value: &str) -> Result<()> {
    if value.chars().any(|c| c.is_whitespace() || SUBJECT_RESERVED.contains(&c)) {
        return Err(PerchError::naming(
            field,
            value,
            "must not contain whitespace, '/', ':', '*' or '?'",
        ));
    }
    Ok(())
}

fn split_repo(repo: &str) -> Result<(String, String)> {
    match repo.split_once('/') {
        Some((owner, name)) if !owner.is_empty() && !name.is_empty() && !name.contains('/') => {
            Ok((owner.to_string(), name.to_string()))
        }
        _ => Err(PerchError::naming(
            "github_repo",
            repo,
            "expected the form 'owner/name'",
        )),
    }
}
