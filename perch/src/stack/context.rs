// SPDX-License-Identifier: AGPL-3.0-or-later
//! Explicit deployment context (account + region)
//!
//! Builders never read account or region from ambient state; the caller
//! threads a [`Context`] through every stage that needs one.

use serde::{Deserialize, Serialize};

use crate::error::{PerchError, Result};

/// Region used when none is configured
pub const DEFAULT_REGION: &str = "us-east-1";

/// Target account and region for a synthesis run
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Context {
    /// 12-digit AWS account id
    pub account_id: String,
    /// Region name (e.g. `eu-west-1`)
    pub region: String,
}

impl Context {
    /// Build a context, checking the account id and region shape
    pub fn new(account_id: impl Into<String>, region: impl Into<String>) -> Result<Self> {
        let account_id: String = account_id.into();
        let account_id = account_id.trim().to_string();
        let region: String = region.into();
        let region = region.trim().to_string();

        if account_id.is_empty() {
            return Err(PerchError::missing("account_id"));
        }
        if account_id.len() != 12 || !account_id.bytes().all(|b| b.is_ascii_digit()) {
            return Err(PerchError::naming(
                "account_id",
                account_id,
                "must be exactly 12 digits",
            ));
        }

        if region.is_empty() {
            return Err(PerchError::missing("region"));
        }
        if !region
            .bytes()
            .all(|b| b.is_ascii_lowercase() || b.is_ascii_digit() || b == b'-')
        {
            return Err(PerchError::naming(
                "region",
                region,
                "only lower-case letters, digits and hyphens are allowed",
            ));
        }

        Ok(Self { account_id, region })
    }

    /// ARN partition for the configured region
    pub fn partition(&self) -> &'static str {
        if self.region.starts_with("cn-") {
            "aws-cn"
        } else if self.region.starts_with("us-gov-") {
            "aws-us-gov"
        } else {
            "aws"
        }
    }
}
