// SPDX-License-Identifier: AGPL-3.0-or-later
//! GitHub OIDC trust condition and CI role specification
//!
//! The identity provider for `token.actions.githubusercontent.com` is never
//! created here. It is resolved through a [`ProviderResolver`] and the role
//! only refers to it by ARN.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};
use tracing::debug;

use super::context::Context;
use super::validate::ProjectConfig;
use crate::error::Result;

/// Issuer host of GitHub Actions OIDC tokens
pub const GITHUB_OIDC_HOST: &str = "token.actions.githubusercontent.com";

/// Audience GitHub puts in tokens requested for AWS
pub const STS_AUDIENCE: &str = "sts.amazonaws.com";

/// Managed policy attached when none are configured
pub const DEFAULT_MANAGED_POLICY: &str = "AmazonS3FullAccess";

const ASSUME_ROLE_ACTION: &str = "sts:AssumeRoleWithWebIdentity";
const POLICY_VERSION: &str = "2012-10-17";

/// ARN of the GitHub OIDC provider registered in the context's account
pub fn provider_arn(ctx: &Context) -> String {
    format!(
        "arn:{}:iam::{}:oidc-provider/{}",
        ctx.partition(),
        ctx.account_id,
        GITHUB_OIDC_HOST
    )
}

/// Expand a managed policy name to its ARN. Full ARNs pass through.
pub fn managed_policy_arn(partition: &str, policy: &str) -> String {
    if policy.starts_with("arn:") {
        policy.to_string()
    } else {
        format!("arn:{}:iam::aws:policy/{}", partition, policy)
    }
}

/// Subject claim pattern matching every ref of one repository
pub fn subject_pattern(owner: &str, name: &str) -> String {
    format!("repo:{}/{}:*", owner, name)
}

/// Reference to an existing, externally managed OIDC provider
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProviderRef {
    pub arn: String,
    pub host: String,
}

/// Looks up the OIDC provider a role should trust
pub trait ProviderResolver {
    /// Resolve the provider for the given account
    fn resolve(&self, ctx: &Context) -> Result<ProviderRef>;
}

/// Refers to the provider at its conventional ARN without contacting the cloud
#[derive(Debug, Clone, Copy, Default)]
pub struct GithubProviderLookup;

impl ProviderResolver for GithubProviderLookup {
    fn resolve(&self, ctx: &Context) -> Result<ProviderRef> {
        Ok(ProviderRef {
            arn: provider_arn(ctx),
            host: GITHUB_OIDC_HOST.to_string(),
        })
    }
}

/// Predicate evaluated against a presented GitHub token
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TrustCondition {
    /// Provider ARN with the account id interpolated
    pub provider_arn: String,
    /// Expected `sub` claim, wildcard included
    pub subject_pattern: String,
    /// Expected `aud` claim
    pub audience: String,
}

/// Federated CI role
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RoleSpec {
    pub description: String,
    pub trust_condition: TrustCondition,
    pub attached_policies: BTreeSet<String>,
}

impl RoleSpec {
    /// IAM trust policy document for this role
    pub fn trust_policy_document(&self) -> Value {
        let condition = &self.trust_condition;

        let mut string_equals = Map::new();
        string_equals.insert(
            format!("{}:aud", GITHUB_OIDC_HOST),
            Value::from(condition.audience.as_str()),
        );
        let mut string_like = Map::new();
        string_like.insert(
            format!("{}:sub", GITHUB_OIDC_HOST),
            Value::from(condition.subject_pattern.as_str()),
        );

        json!({
            "Version": POLICY_VERSION,
            "Statement": [{
                "Effect": "Allow",
                "Principal": { "Federated": condition.provider_arn },
                "Action": ASSUME_ROLE_ACTION,
                "Condition": {
                    "StringEquals": string_equals,
                    "StringLike": string_like,
                },
            }],
        })
    }
}

/// Builds the trust condition and [`RoleSpec`] for a validated project
pub struct TrustPolicyBuilder;

impl TrustPolicyBuilder {
    /// Derive the role specification for `config` in `ctx`
    pub fn build(config: &ProjectConfig, ctx: &Context) -> RoleSpec {
        let trust_condition = TrustCondition {
            provider_arn: provider_arn(ctx),
            subject_pattern: subject_pattern(config.github_repo_owner(), config.github_repo_name()),
            audience: STS_AUDIENCE.to_string(),
        };

        let attached_policies: BTreeSet<String> = config
            .managed_policies()
            .iter()
            .map(|p| managed_policy_arn(ctx.partition(), p))
            .collect();

        debug!(
            subject = %trust_condition.subject_pattern,
            provider = %trust_condition.provider_arn,
            policies = attached_policies.len(),
            "Role specification built"
        );

        RoleSpec {
            description: format!(
                "GitHub Actions role for {}/{}",
                config.github_repo_owner(),
                config.github_repo_name()
            ),
            trust_condition,
            attached_policies,
        }
    }
}
