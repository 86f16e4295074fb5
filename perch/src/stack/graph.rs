// SPDX-License-Identifier: AGPL-3.0-or-later
//! Resource graph assembly
//!
//! Every resource is a [`ResourceNode`] variant so ordering works the same
//! way for all of them. The graph is built once by
//! [`ResourceGraphAssembler::assemble`] and only read afterwards.

use std::collections::HashSet;

use serde::Serialize;
use sha2::{Digest, Sha256};
use tracing::info;

use super::bucket::BucketSpec;
use super::outputs::{OutputExporter, Outputs};
use super::trust::{ProviderRef, RoleSpec};
use crate::error::{PerchError, Result};

/// Logical id of the referenced OIDC provider
pub const PROVIDER_LOGICAL_ID: &str = "GithubOidcProvider";
/// Logical id of the storage bucket
pub const BUCKET_LOGICAL_ID: &str = "SecureBucket";
/// Logical id of the CI role
pub const ROLE_LOGICAL_ID: &str = "GithubOidcRole";

/// A resource handed to the deployment engine
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum ResourceNode {
    /// Existing provider, looked up rather than created
    OidcProvider(ProviderRef),
    Bucket(BucketSpec),
    Role(RoleSpec),
}

impl ResourceNode {
    /// Short resource type name, matching the serialized `type` tag
    pub fn kind(&self) -> &'static str {
        match self {
            ResourceNode::OidcProvider(_) => "oidc-provider",
            ResourceNode::Bucket(_) => "bucket",
            ResourceNode::Role(_) => "role",
        }
    }

    /// Whether the engine creates (and may destroy) this resource
    pub fn is_managed(&self) -> bool {
        !matches!(self, ResourceNode::OidcProvider(_))
    }
}

/// A node plus the logical ids it must wait for
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GraphNode {
    pub logical_id: String,
    pub resource: ResourceNode,
    pub depends_on: Vec<String>,
}

impl GraphNode {
    fn new(logical_id: &str, resource: ResourceNode, depends_on: &[&str]) -> Self {
        Self {
            logical_id: logical_id.to_string(),
            resource,
            depends_on: depends_on.iter().map(|d| d.to_string()).collect(),
        }
    }
}

/// Dependency-ordered set of resources plus exported identifiers
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ResourceGraph {
    nodes: Vec<GraphNode>,
    materialization_waves: Vec<Vec<String>>,
    outputs: Outputs,
}

impl ResourceGraph {
    pub fn nodes(&self) -> &[GraphNode] {
        &self.nodes
    }

    pub fn node(&self, logical_id: &str) -> Option<&GraphNode> {
        self.nodes.iter().find(|n| n.logical_id == logical_id)
    }

    pub fn bucket(&self) -> Option<&BucketSpec> {
        self.nodes.iter().find_map(|n| match &n.resource {
            ResourceNode::Bucket(bucket) => Some(bucket),
            _ => None,
        })
    }

    pub fn role(&self) -> Option<&RoleSpec> {
        self.nodes.iter().find_map(|n| match &n.resource {
            ResourceNode::Role(role) => Some(role),
            _ => None,
        })
    }

    /// Declared dependencies of a node (empty for unknown ids)
    pub fn dependencies_of(&self, logical_id: &str) -> &[String] {
        self.node(logical_id)
            .map(|n| n.depends_on.as_slice())
            .unwrap_or(&[])
    }

    /// Groups of nodes that may be materialized concurrently, in order
    pub fn materialization_waves(&self) -> &[Vec<String>] {
        &self.materialization_waves
    }

    /// A single valid materialization order
    pub fn materialization_order(&self) -> Vec<&str> {
        self.materialization_waves
            .iter()
            .flatten()
            .map(String::as_str)
            .collect()
    }

    pub fn outputs(&self) -> &Outputs {
        &self.outputs
    }

    /// Pretty JSON for the deployment engine
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// SHA-256 of the graph's canonical JSON
    pub fn fingerprint(&self) -> Result<String> {
        let canonical = serde_json::to_vec(self)?;
        let mut hasher = Sha256::new();
        hasher.update(&canonical);
        Ok(format!("{:x}", hasher.finalize()))
    }
}

/// Composes bucket, role and provider into a [`ResourceGraph`]
pub struct ResourceGraphAssembler;

impl ResourceGraphAssembler {
    /// Assemble the graph, or fail without producing one
    ///
    /// The role waits for the provider; the bucket has no dependencies.
    pub fn assemble(
        bucket: BucketSpec,
        role: RoleSpec,
        provider: ProviderRef,
    ) -> Result<ResourceGraph> {
        check_bucket(&bucket)?;
        check_role(&role, &provider)?;

        let nodes = vec![
            GraphNode::new(PROVIDER_LOGICAL_ID, ResourceNode::OidcProvider(provider), &[]),
            GraphNode::new(BUCKET_LOGICAL_ID, ResourceNode::Bucket(bucket), &[]),
            GraphNode::new(ROLE_LOGICAL_ID, ResourceNode::Role(role), &[PROVIDER_LOGICAL_ID]),
        ];
        let materialization_waves = topological_waves(&nodes)?;

        let mut graph = ResourceGraph {
            nodes,
            materialization_waves,
            outputs: Outputs::default(),
        };
        graph.outputs = OutputExporter::export(&graph)?;

        info!(
            nodes = graph.nodes.len(),
            waves = graph.materialization_waves.len(),
            "Resource graph assembled"
        );

        Ok(graph)
    }
}

fn check_bucket(bucket: &BucketSpec) -> Result<()> {
    if bucket.name.is_empty() {
        return Err(PerchError::assembly("bucket spec has an empty name"));
    }
    if bucket.name != bucket.name.to_lowercase() {
        return Err(PerchError::assembly(format!(
            "bucket name '{}' is not lower-case",
            bucket.name
        )));
    }
    if !bucket.public_access_blocked {
        return Err(PerchError::assembly(format!(
            "bucket '{}' does not block public access",
            bucket.name
        )));
    }
    Ok(())
}

fn check_role(role: &RoleSpec, provider: &ProviderRef) -> Result<()> {
    let condition = &role.trust_condition;
    if provider.arn.is_empty() {
        return Err(PerchError::assembly("provider reference has an empty ARN"));
    }
    if condition.subject_pattern.is_empty() {
        return Err(PerchError::assembly("role trust condition has an empty subject"));
    }
    if condition.provider_arn != provider.arn {
        return Err(PerchError::assembly(format!(
            "role trusts '{}' but the resolved provider is '{}'",
            condition.provider_arn, provider.arn
        )));
    }
    if role.attached_policies.is_empty() {
        return Err(PerchError::assembly("role has no attached policies"));
    }
    Ok(())
}

/// Kahn's algorithm in levels; ties keep insertion order
fn topological_waves(nodes: &[GraphNode]) -> Result<Vec<Vec<String>>> {
    let mut known = HashSet::new();
    for node in nodes {
        if !known.insert(node.logical_id.as_str()) {
            return Err(PerchError::assembly(format!(
                "duplicate logical id '{}'",
                node.logical_id
            )));
        }
    }
    for node in nodes {
        if let Some(missing) = node.depends_on.iter().find(|d| !known.contains(d.as_str())) {
            return Err(PerchError::assembly(format!(
                "'{}' depends on unknown node '{}'",
                node.logical_id, missing
            )));
        }
    }

    let mut placed: HashSet<&str> = HashSet::new();
    let mut waves = Vec::new();

    while placed.len() < nodes.len() {
        let wave: Vec<&str> = nodes
            .iter()
            .filter(|n| !placed.contains(n.logical_id.as_str()))
            .filter(|n| n.depends_on.iter().all(|d| placed.contains(d.as_str())))
            .map(|n| n.logical_id.as_str())
            .collect();

        if wave.is_empty() {
            return Err(PerchError::assembly("dependency cycle between resources"));
        }

        placed.extend(wave.iter().copied());
        waves.push(wave.into_iter().map(str::to_string).collect());
    }

    Ok(waves)
}
