// SPDX-License-Identifier: AGPL-3.0-or-later
//! Configuration management for Kea-Perch

use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::error::{PerchError, Result};
use crate::stack::{validate, Context, RawProjectConfig, DEFAULT_REGION};

/// Sample configuration written by `perch init`
pub const SAMPLE_CONFIG: &str = r#"# SPDX-License-Identifier: AGPL-3.0-or-later
# Kea-Perch Configuration

[project]
project_id = "my-project"
enable_versioning = true
enable_encryption = true
# Accepted for compatibility; public access is always blocked
block_public_access = true
github_repo = "your-org/your-repo"
# github_repo_owner = "your-org"
# github_repo_name = "your-repo"
removal_policy = "retain"
# Narrow this before production use
managed_policies = ["AmazonS3FullAccess"]

[context]
# account_id = "123456789012"
region = "us-east-1"
"#;

/// Main configuration structure for Perch
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Project (bucket + repository) settings
    #[serde(default)]
    pub project: RawProjectConfig,

    /// Target account and region
    #[serde(default)]
    pub context: ContextConfig,
}

/// Account/region section of the configuration file
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContextConfig {
    /// 12-digit account id; may instead be given on the command line
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub account_id: Option<String>,

    /// Region name
    #[serde(default = "default_region")]
    pub region: String,
}

impl Default for ContextConfig {
    fn default() -> Self {
        Self {
            account_id: None,
            region: default_region(),
        }
    }
}

impl Config {
    /// Load configuration from a TOML file
    ///
    /// # Arguments
    ///
    /// * `path` - Path to the configuration file
    ///
    /// # Returns
    ///
    /// The parsed configuration or an error
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();

        if !path.exists() {
            return Err(PerchError::ConfigNotFound {
                path: path.display().to_string(),
            });
        }

        let contents = std::fs::read_to_string(path)?;
        Self::from_toml(&contents)
    }

    /// Parse and validate configuration from TOML text
    pub fn from_toml(contents: &str) -> Result<Self> {
        let config: Config = toml::from_str(contents)?;
        config.validate()?;
        Ok(config)
    }

    /// Validate the project section
    ///
    /// The context is checked by [`Config::context`], once overrides are known.
    pub fn validate(&self) -> Result<()> {
        validate(&self.project)?;
        Ok(())
    }

    /// Build the deployment context, letting overrides win over the file
    pub fn context(&self, account_id: Option<&str>, region: Option<&str>) -> Result<Context> {
        let account_id = account_id
            .or(self.context.account_id.as_deref())
            .ok_or_else(|| PerchError::MissingField {
                field: "account_id".to_string(),
            })?;
        let region = region.unwrap_or(&self.context.region);
        Context::new(account_id, region)
    }
}

fn default_region() -> String {
    DEFAULT_REGION.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    const MINIMAL: &str = r#"
        [project]
        project_id = "Acme"
        github_repo_owner = "acme-org"
        github_repo_name = "infra"

        [context]
        account_id = "123456789012"
    "#;

    #[test]
    fn test_default_config_is_invalid() {
        let config = Config::default();
        assert_eq!(config.context.region, "us-east-1");
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_parse_minimal_config() {
        let config = Config::from_toml(MINIMAL).unwrap();
        assert_eq!(config.project.project_id.as_deref(), Some("Acme"));
        let ctx = config.context(None, None).unwrap();
        assert_eq!(ctx.account_id, "123456789012");
        assert_eq!(ctx.region, "us-east-1");
    }

    #[test]
    fn test_overrides_win() {
        let config = Config::from_toml(MINIMAL).unwrap();
        let ctx = config
            .context(Some("210987654321"), Some("eu-central-1"))
            .unwrap();
        assert_eq!(ctx.account_id, "210987654321");
        assert_eq!(ctx.region, "eu-central-1");
    }

    #[test]
    fn test_missing_account_id() {
        let config = Config::from_toml(
            r#"
            [project]
            project_id = "demo"
            github_repo = "acme-org/infra"
        "#,
        )
        .unwrap();
        let err = config.context(None, None).unwrap_err();
        assert!(matches!(err, PerchError::MissingField { ref field } if field == "account_id"));
    }

    #[test]
    fn test_bad_file_account_overridable() {
        let config = Config::from_toml(
            r#"
            [project]
            project_id = "demo"
            github_repo = "acme-org/infra"

            [context]
            account_id = "bad"
        "#,
        )
        .unwrap();

        let err = config.context(None, None).unwrap_err();
        assert!(matches!(err, PerchError::InvalidNaming { ref field, .. } if field == "account_id"));

        let ctx = config.context(Some("123456789012"), None).unwrap();
        assert_eq!(ctx.account_id, "123456789012");
    }

    #[test]
    fn test_invalid_project_rejected_on_load() {
        let err = Config::from_toml(
            r#"
            [project]
            project_id = "demo"
            github_repo_owner = "acme-org"
        "#,
        )
        .unwrap_err();
        assert!(matches!(err, PerchError::MissingField { .. }));
    }

    #[test]
    fn test_camel_case_keys() {
        let config = Config::from_toml(
            r#"
            [project]
            projectId = "demo"
            enableVersioning = false
            githubRepoOwner = "acme-org"
            githubRepoName = "infra"
        "#,
        )
        .unwrap();
        assert_eq!(config.project.enable_versioning, Some(false));
    }

    #[test]
    fn test_sample_config_parses() {
        let config = Config::from_toml(SAMPLE_CONFIG).unwrap();
        assert_eq!(config.project.github_repo.as_deref(), Some("your-org/your-repo"));
        assert!(config.context.account_id.is_none());
    }

    #[test]
    fn test_from_file_not_found() {
        let err = Config::from_file("/nonexistent/perch.toml").unwrap_err();
        assert!(matches!(err, PerchError::ConfigNotFound { .. }));
    }

    #[test]
    fn test_from_file() {
        let temp_dir = tempdir().unwrap();
        let path = temp_dir.path().join("perch.toml");
        fs::write(&path, MINIMAL).unwrap();
        let config = Config::from_file(&path).unwrap();
        assert_eq!(config.project.github_repo_name.as_deref(), Some("infra"));
    }
}
