// SPDX-License-Identifier: AGPL-3.0-or-later
//! Storage bucket specification

use std::fmt;

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use super::validate::ProjectConfig;

/// Suffix appended to the project id to form the bucket name
pub const BUCKET_NAME_SUFFIX: &str = "-my-bucket";

/// Server-side encryption applied to stored objects
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EncryptionMode {
    None,
    /// Keys owned and rotated by the storage provider
    ProviderManaged,
}

impl fmt::Display for EncryptionMode {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EncryptionMode::None => write!(formatter, "NONE"),
            EncryptionMode::ProviderManaged => write!(formatter, "PROVIDER_MANAGED"),
        }
    }
}

/// What the deployment engine does with the bucket when the stack is torn down
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RemovalPolicy {
    /// Orphan the bucket and its contents
    #[default]
    Retain,
    /// Delete the bucket with the stack
    Destroy,
}

/// Derived storage bucket
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BucketSpec {
    pub name: String,
    pub versioned: bool,
    pub encryption_mode: EncryptionMode,
    /// Always true
    pub public_access_blocked: bool,
    pub removal_policy: RemovalPolicy,
}

impl BucketSpec {
    /// ARN of the bucket in the given partition
    pub fn arn(&self, partition: &str) -> String {
        format!("arn:{}:s3:::{}", partition, self.name)
    }
}

/// Bucket name for a project id
pub fn bucket_name(project_id: &str) -> String {
    format!("{}{}", project_id, BUCKET_NAME_SUFFIX).to_lowercase()
}

/// Builds the [`BucketSpec`] for a validated project
pub struct BucketSpecBuilder;

impl BucketSpecBuilder {
    /// Derive the bucket specification. Never fails on a validated config.
    pub fn build(config: &ProjectConfig) -> BucketSpec {
        if !config.block_public_access() {
            warn!(
                project = %config.project_id(),
                "block_public_access = false is ignored; public access stays blocked"
            );
        }

        let spec = BucketSpec {
            name: bucket_name(config.project_id()),
            versioned: config.enable_versioning(),
            encryption_mode: if config.enable_encryption() {
                EncryptionMode::ProviderManaged
            } else {
                EncryptionMode::None
            },
            public_access_blocked: true,
            removal_policy: config.removal_policy(),
        };

        debug!(
            bucket = %spec.name,
            versioned = spec.versioned,
            encryption = %spec.encryption_mode,
            "Bucket specification built"
        );

        spec
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stack::validate::{validate, RawProjectConfig};

    fn config(raw: RawProjectConfig) -> ProjectConfig {
        validate(&raw).unwrap()
    }

    fn base(project: &str) -> RawProjectConfig {
        RawProjectConfig {
            project_id: Some(project.to_string()),
            github_repo_owner: Some("acme-org".to_string()),
            github_repo_name: Some("infra".to_string()),
            ..Default::default()
        }
    }

    #[test]
    fn test_name_is_lowercased() {
        let spec = BucketSpecBuilder::build(&config(base("Acme")));
        assert_eq!(spec.name, "acme-my-bucket");
        assert_eq!(spec.arn("aws"), "arn:aws:s3:::acme-my-bucket");
    }

    #[test]
    fn test_name_is_deterministic() {
        let first = BucketSpecBuilder::build(&config(base("MiXeD-42")));
        let second = BucketSpecBuilder::build(&config(base("MiXeD-42")));
        assert_eq!(first, second);
        assert_eq!(first.name, "mixed-42-my-bucket");
    }

    #[test]
    fn test_public_access_override() {
        let mut raw = base("demo");
        raw.block_public_access = Some(false);
        let spec = BucketSpecBuilder::build(&config(raw));
        assert!(spec.public_access_blocked);
    }

    #[test]
    fn test_versioning_disabled() {
        let mut raw = base("demo");
        raw.enable_versioning = Some(false);
        let spec = BucketSpecBuilder::build(&config(raw));
        assert!(!spec.versioned);
        assert_eq!(spec.encryption_mode, EncryptionMode::ProviderManaged);
        assert_eq!(spec.removal_policy, RemovalPolicy::Retain);
    }

    #[test]
    fn test_encryption_disabled() {
        let mut raw = base("demo");
        raw.enable_encryption = Some(false);
        let spec = BucketSpecBuilder::build(&config(raw));
        assert_eq!(spec.encryption_mode, EncryptionMode::None);
    }

    #[test]
    fn test_encryption_mode_serialization() {
        assert_eq!(
            serde_json::to_string(&EncryptionMode::ProviderManaged).unwrap(),
            r#""PROVIDER_MANAGED""#
        );
        let policy: RemovalPolicy = serde_json::from_str(r#""destroy""#).unwrap();
        assert_eq!(policy, RemovalPolicy::Destroy);
    }
}
