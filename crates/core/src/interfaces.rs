//! Trait seams between the governance engine and its collaborators
//!
//! The governance engine consumes voting weight and moves asset tokens
//! strictly through these traits, so the token implementation can be
//! swapped or faked in tests.

use async_trait::async_trait;
use thiserror::Error;

use crate::types::{AccountId, Amount, Timestamp, TokenId};

/// Error type for asset and voting-power operations.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AssetError {
    /// The referenced token does not exist.
    #[error("unknown token: {0}")]
    UnknownToken(TokenId),

    /// The holder's token balance does not cover the requested amount.
    #[error("insufficient token balance for {account}: need {needed}, have {available}")]
    InsufficientBalance {
        account: AccountId,
        needed: Amount,
        available: Amount,
    },

    /// The spender's allowance does not cover the requested amount.
    #[error("insufficient allowance for {spender}: need {needed}, have {available}")]
    InsufficientAllowance {
        spender: AccountId,
        needed: Amount,
        available: Amount,
    },

    /// The caller is not the token's owner.
    #[error("caller {caller} is not the owner of token {token}")]
    NotOwner { token: TokenId, caller: AccountId },
}

/// Result type for asset and voting-power operations.
pub type AssetResult<T> = Result<T, AssetError>;

/// Read-only oracle for vote-weight queries, honoring delegation.
///
/// `at` queries return the weight as of the given instant; weight moved by
/// transfers or delegation after that instant must not be reflected.
#[async_trait]
pub trait VotingPowerSource: Send + Sync {
    /// Voting weight of `account` as of `at`.
    async fn voting_power_at(
        &self,
        token: &TokenId,
        account: &AccountId,
        at: Timestamp,
    ) -> AssetResult<Amount>;

    /// Voting weight of `account` right now.
    async fn current_voting_power(
        &self,
        token: &TokenId,
        account: &AccountId,
    ) -> AssetResult<Amount>;

    /// Total voting weight in existence as of `at`.
    async fn total_voting_power_at(&self, token: &TokenId, at: Timestamp) -> AssetResult<Amount>;
}

/// Asset-token movement consumed by treasury deposits and withdrawals.
#[async_trait]
pub trait AssetTransfers: Send + Sync {
    /// Move `amount` of `token` from `from` to `to`.
    async fn transfer(
        &self,
        token: &TokenId,
        from: &AccountId,
        to: &AccountId,
        amount: Amount,
        now: Timestamp,
    ) -> AssetResult<()>;

    /// Move `amount` of `token` from `from` to `to` on behalf of `spender`,
    /// consuming a pre-authorized allowance.
    async fn transfer_from(
        &self,
        token: &TokenId,
        spender: &AccountId,
        from: &AccountId,
        to: &AccountId,
        amount: Amount,
        now: Timestamp,
    ) -> AssetResult<()>;
}
