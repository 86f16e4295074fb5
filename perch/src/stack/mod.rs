// SPDX-License-Identifier: AGPL-3.0-or-later
//! Resource graph construction
//!
//! The pipeline is a pure function of its input:
//! validate → bucket spec → role spec → assemble → export.
//! Nothing here performs network or disk I/O.

mod bucket;
mod context;
mod graph;
mod outputs;
mod trust;
mod validate;

pub use bucket::{bucket_name, BucketSpec, BucketSpecBuilder, EncryptionMode, RemovalPolicy};
pub use context::{Context, DEFAULT_REGION};
pub use graph::{
    GraphNode, ResourceGraph, ResourceGraphAssembler, ResourceNode, BUCKET_LOGICAL_ID,
    PROVIDER_LOGICAL_ID, ROLE_LOGICAL_ID,
};
pub use outputs::{
    OutputExporter, OutputValue, Outputs, BUCKET_NAME_OUTPUT, OIDC_ROLE_ARN_OUTPUT,
};
pub use trust::{
    managed_policy_arn, provider_arn, subject_pattern, GithubProviderLookup, ProviderRef,
    ProviderResolver, RoleSpec, TrustCondition, TrustPolicyBuilder, GITHUB_OIDC_HOST,
};
pub use validate::{validate, ProjectConfig, RawProjectConfig};

use tracing::{info, instrument};

use crate::error::Result;

/// Build the complete resource graph for a project
///
/// Validation runs first; no builder sees an unvalidated config, and any
/// failure returns before a graph exists.
///
/// # Arguments
///
/// * `raw` - Project configuration as loaded
/// * `ctx` - Target account and region
/// * `resolver` - Lookup for the existing OIDC provider
#[instrument(skip_all, fields(account = %ctx.account_id, region = %ctx.region))]
pub fn synthesize(
    raw: &RawProjectConfig,
    ctx: &Context,
    resolver: &dyn ProviderResolver,
) -> Result<ResourceGraph> {
    let config = validate(raw)?;

    let bucket = BucketSpecBuilder::build(&config);
    let role = TrustPolicyBuilder::build(&config, ctx);
    let provider = resolver.resolve(ctx)?;

    let graph = ResourceGraphAssembler::assemble(bucket, role, provider)?;

    info!(
        project = %config.project_id(),
        bucket = %bucket_name(config.project_id()),
        "Synthesized resource graph"
    );

    Ok(graph)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::PerchError;

    fn ctx() -> Context {
        Context::new("123456789012", DEFAULT_REGION).unwrap()
    }

    fn raw(project: &str) -> RawProjectConfig {
        RawProjectConfig {
            project_id: Some(project.to_string()),
            github_repo_owner: Some("acme-org".to_string()),
            github_repo_name: Some("infra".to_string()),
            ..Default::default()
        }
    }

    /// Resolver that must never be reached
    struct PanickingResolver;

    impl ProviderResolver for PanickingResolver {
        fn resolve(&self, _ctx: &Context) -> Result<ProviderRef> {
            panic!("resolver called for an invalid config");
        }
    }

    /// Resolver that returns a provider from another account
    struct ForeignResolver;

    impl ProviderResolver for ForeignResolver {
        fn resolve(&self, _ctx: &Context) -> Result<ProviderRef> {
            Ok(ProviderRef {
                arn: "arn:aws:iam::000000000000:oidc-provider/token.actions.githubusercontent.com"
                    .to_string(),
                host: GITHUB_OIDC_HOST.to_string(),
            })
        }
    }

    #[test]
    fn test_acme_scenario() {
        let graph = synthesize(&raw("Acme"), &ctx(), &GithubProviderLookup).unwrap();
        assert_eq!(
            graph.outputs().get(BUCKET_NAME_OUTPUT),
            Some(&OutputValue::Literal("acme-my-bucket".to_string()))
        );
        assert_eq!(
            graph.role().unwrap().trust_condition.subject_pattern,
            "repo:acme-org/infra:*"
        );
    }

    #[test]
    fn test_demo_versioning_disabled_scenario() {
        let mut input = raw("demo");
        input.enable_versioning = Some(false);
        let graph = synthesize(&input, &ctx(), &GithubProviderLookup).unwrap();
        let bucket = graph.bucket().unwrap();
        assert!(!bucket.versioned);
        assert!(bucket.public_access_blocked);
        assert_eq!(bucket.encryption_mode, EncryptionMode::ProviderManaged);
        assert_eq!(bucket.removal_policy, RemovalPolicy::Retain);
    }

    #[test]
    fn test_missing_repo_name_fails_fast() {
        let mut input = raw("demo");
        input.github_repo_name = None;
        let err = synthesize(&input, &ctx(), &PanickingResolver).unwrap_err();
        assert!(matches!(err, PerchError::MissingField { ref field } if field == "github_repo_name"));
    }

    #[test]
    fn test_idempotent_synthesis() {
        let first = synthesize(&raw("Repeat"), &ctx(), &GithubProviderLookup).unwrap();
        let second = synthesize(&raw("Repeat"), &ctx(), &GithubProviderLookup).unwrap();
        assert_eq!(first, second);
        assert_eq!(first.to_json().unwrap(), second.to_json().unwrap());
    }

    #[test]
    fn test_foreign_provider_is_assembly_error() {
        let err = synthesize(&raw("demo"), &ctx(), &ForeignResolver).unwrap_err();
        assert!(matches!(err, PerchError::AssemblyError { .. }));
    }

    #[test]
    fn test_bucket_name_length_boundary() {
        let fits = "A".repeat(53);
        let graph = synthesize(&raw(&fits), &ctx(), &GithubProviderLookup).unwrap();
        let name = &graph.bucket().unwrap().name;
        assert_eq!(name.len(), 63);
        assert_eq!(name, &format!("{}-my-bucket", "a".repeat(53)));

        let too_long = "a".repeat(54);
        let err = synthesize(&raw(&too_long), &ctx(), &PanickingResolver).unwrap_err();
        assert!(matches!(err, PerchError::InvalidNaming { ref field, .. } if field == "project_id"));
    }

    #[test]
    fn test_public_access_flag_ignored() {
        let mut input = raw("demo");
        input.block_public_access = Some(false);
        let graph = synthesize(&input, &ctx(), &GithubProviderLookup).unwrap();
        assert!(graph.bucket().unwrap().public_access_blocked);
    }
}
