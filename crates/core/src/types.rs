//! Identifier and quantity types shared across the engine

use serde::{Deserialize, Serialize};
use std::fmt;

/// Quantity of native currency, asset tokens, or voting weight.
pub type Amount = u128;

/// Seconds since the epoch, supplied by the caller on every time-sensitive
/// operation. The engine assumes the values it is handed are monotonically
/// non-decreasing across calls.
pub type Timestamp = u64;

/// Identity of an externally-owned account.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct AccountId(String);

impl AccountId {
    /// Create an account identifier from a caller-supplied string.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for AccountId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Handle of an organization registered with the engine.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct OrgId(String);

impl OrgId {
    /// Generate a fresh organization handle.
    pub fn generate() -> Self {
        Self(format!("org-{}", uuid::Uuid::new_v4()))
    }

    /// The account under which this organization holds funds in the
    /// native ledger and asset registries.
    pub fn treasury_account(&self) -> AccountId {
        AccountId::new(format!("{}/treasury", self.0))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for OrgId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Handle of a proposal bound to an organization.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ProposalId(String);

impl ProposalId {
    /// Generate a fresh proposal handle.
    pub fn generate() -> Self {
        Self(format!("proposal-{}", uuid::Uuid::new_v4()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ProposalId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Handle of a voting-weight or asset token.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct TokenId(String);

impl TokenId {
    /// Generate a fresh token handle.
    pub fn generate() -> Self {
        Self(format!("token-{}", uuid::Uuid::new_v4()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for TokenId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}
