// SPDX-License-Identifier: AGPL-3.0-or-later
//! Kea-Perch: Cloud resource graph builder for the Kea ecosystem
//!
//! The Perch is where a project lands before it is deployed. From a small
//! typed configuration it derives a restricted storage bucket and a GitHub
//! OIDC role scoped to a single repository, and hands the dependency-ordered
//! graph to an external deployment engine.
//!
//! # Features
//!
//! * **Deterministic naming:** bucket names derive from the project id alone
//! * **Enforced isolation:** public access is blocked whatever the input says
//! * **Federated CI access:** trust is scoped to `repo:{owner}/{name}:*`

pub mod config;
pub mod error;
pub mod stack;

pub use config::Config;
pub use error::{PerchError, Result};
pub use stack::{synthesize, Context, GithubProviderLookup, ResourceGraph};
