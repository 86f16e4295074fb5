// SPDX-License-Identifier: AGPL-3.0-or-later
//! Exported identifiers
//!
//! Values are literal when known at synthesis time and symbolic references
//! otherwise. The deployment engine reports physical attributes back after
//! materialization, and [`Outputs::resolve`] substitutes them.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use super::graph::{ResourceGraph, BUCKET_LOGICAL_ID, ROLE_LOGICAL_ID};
use crate::error::{PerchError, Result};

/// Output carrying the bucket's name
pub const BUCKET_NAME_OUTPUT: &str = "BucketName";
/// Output carrying the CI role's ARN
pub const OIDC_ROLE_ARN_OUTPUT: &str = "OidcRoleArn";

const ARN_ATTRIBUTE: &str = "Arn";

/// A single exported value
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum OutputValue {
    /// Physical value
    Literal(String),
    /// Attribute of a graph node, known only after deployment
    Reference {
        logical_id: String,
        attribute: String,
    },
}

impl OutputValue {
    pub fn reference(logical_id: &str, attribute: &str) -> Self {
        Self::Reference {
            logical_id: logical_id.to_string(),
            attribute: attribute.to_string(),
        }
    }

    pub fn is_literal(&self) -> bool {
        matches!(self, Self::Literal(_))
    }

    pub fn as_literal(&self) -> Option<&str> {
        match self {
            Self::Literal(value) => Some(value),
            Self::Reference { .. } => None,
        }
    }
}

impl fmt::Display for OutputValue {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Literal(value) => write!(formatter, "{}", value),
            Self::Reference {
                logical_id,
                attribute,
            } => write!(formatter, "${{{}.{}}}", logical_id, attribute),
        }
    }
}

/// Ordered mapping of output name to value
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Outputs(BTreeMap<String, OutputValue>);

impl Outputs {
    pub fn get(&self, name: &str) -> Option<&OutputValue> {
        self.0.get(name)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &OutputValue)> {
        self.0.iter()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Whether every value is physical
    pub fn is_resolved(&self) -> bool {
        self.0.values().all(OutputValue::is_literal)
    }

    /// Replace references with physical values
    ///
    /// `attributes` is keyed by `LogicalId.Attribute`, e.g. `GithubOidcRole.Arn`.
    /// References with no entry stay symbolic.
    pub fn resolve(&self, attributes: &BTreeMap<String, String>) -> Outputs {
        let resolved = self
            .0
            .iter()
            .map(|(name, value)| {
                let value = match value {
                    OutputValue::Reference {
                        logical_id,
                        attribute,
                    } => attributes
                        .get(&format!("{}.{}", logical_id, attribute))
                        .map(|physical| OutputValue::Literal(physical.clone()))
                        .unwrap_or_else(|| value.clone()),
                    OutputValue::Literal(_) => value.clone(),
                };
                (name.clone(), value)
            })
            .collect();
        Outputs(resolved)
    }
}

/// Extracts the exported identifiers from an assembled graph
pub struct OutputExporter;

impl OutputExporter {
    /// Build `BucketName` and `OidcRoleArn`
    pub fn export(graph: &ResourceGraph) -> Result<Outputs> {
        let bucket = graph
            .bucket()
            .ok_or_else(|| PerchError::assembly(format!("graph has no {} node", BUCKET_LOGICAL_ID)))?;
        if graph.role().is_none() {
            return Err(PerchError::assembly(format!(
                "graph has no {} node",
                ROLE_LOGICAL_ID
            )));
        }

        let mut outputs = BTreeMap::new();
        outputs.insert(
            BUCKET_NAME_OUTPUT.to_string(),
            OutputValue::Literal(bucket.name.clone()),
        );
        outputs.insert(
            OIDC_ROLE_ARN_OUTPUT.to_string(),
            OutputValue::reference(ROLE_LOGICAL_ID, ARN_ATTRIBUTE),
        );
        Ok(Outputs(outputs))
    }
}
