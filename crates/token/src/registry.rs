//! Process-wide registry of governance tokens

use async_trait::async_trait;
use std::collections::HashMap;
use tokio::sync::RwLock;
use tracing::info;

use agora_core::{
    AccountId, Amount, AssetError, AssetResult, AssetTransfers, Timestamp, TokenId,
    VotingPowerSource,
};

use crate::token::{GovernanceToken, TokenParams};

/// A full copy of registry state, used by batch execution to guarantee
/// all-or-nothing dispatch across token-touching actions.
#[derive(Clone, Debug)]
pub struct TokenRegistrySnapshot {
    tokens: HashMap<TokenId, GovernanceToken>,
}

/// Append-only registry of all tokens known to the engine.
pub struct TokenRegistry {
    tokens: RwLock<HashMap<TokenId, GovernanceToken>>,
}

impl TokenRegistry {
    pub fn new() -> Self {
        Self {
            tokens: RwLock::new(HashMap::new()),
        }
    }

    /// Create a token owned by `owner`, seeding `initial` balances.
    pub async fn create_token(
        &self,
        params: TokenParams,
        owner: AccountId,
        initial: &[(AccountId, Amount)],
        now: Timestamp,
    ) -> TokenId {
        let id = TokenId::generate();
        let token = GovernanceToken::new(id.clone(), params, owner, initial, now);
        info!(token = %id, name = token.name(), "created governance token");
        self.tokens.write().await.insert(id.clone(), token);
        id
    }

    pub async fn contains(&self, token: &TokenId) -> bool {
        self.tokens.read().await.contains_key(token)
    }

    pub async fn owner_of(&self, token: &TokenId) -> AssetResult<AccountId> {
        let tokens = self.tokens.read().await;
        let token = tokens
            .get(token)
            .ok_or_else(|| AssetError::UnknownToken(token.clone()))?;
        Ok(token.owner().clone())
    }

    pub async fn balance_of(&self, token: &TokenId, account: &AccountId) -> AssetResult<Amount> {
        let tokens = self.tokens.read().await;
        let token = tokens
            .get(token)
            .ok_or_else(|| AssetError::UnknownToken(token.clone()))?;
        Ok(token.balance_of(account))
    }

    pub async fn total_supply(&self, token: &TokenId) -> AssetResult<Amount> {
        let tokens = self.tokens.read().await;
        let token = tokens
            .get(token)
            .ok_or_else(|| AssetError::UnknownToken(token.clone()))?;
        Ok(token.total_supply())
    }

    /// Mint new supply; `caller` must be the token owner.
    pub async fn mint(
        &self,
        token: &TokenId,
        caller: &AccountId,
        to: &AccountId,
        amount: Amount,
        now: Timestamp,
    ) -> AssetResult<()> {
        let mut tokens = self.tokens.write().await;
        let entry = tokens
            .get_mut(token)
            .ok_or_else(|| AssetError::UnknownToken(token.clone()))?;
        entry.mint(caller, to, amount, now)
    }

    /// Record an allowance for `spender` over `owner`'s balance.
    pub async fn approve(
        &self,
        token: &TokenId,
        owner: &AccountId,
        spender: &AccountId,
        amount: Amount,
    ) -> AssetResult<()> {
        let mut tokens = self.tokens.write().await;
        let entry = tokens
            .get_mut(token)
            .ok_or_else(|| AssetError::UnknownToken(token.clone()))?;
        entry.approve(owner, spender, amount);
        Ok(())
    }

    /// Delegate `account`'s voting weight to `delegatee`.
    pub async fn delegate(
        &self,
        token: &TokenId,
        account: &AccountId,
        delegatee: &AccountId,
        now: Timestamp,
    ) -> AssetResult<()> {
        let mut tokens = self.tokens.write().await;
        let entry = tokens
            .get_mut(token)
            .ok_or_else(|| AssetError::UnknownToken(token.clone()))?;
        entry.delegate(account, delegatee, now);
        Ok(())
    }

    /// Restore `account`'s voting weight to itself.
    pub async fn revoke_delegation(
        &self,
        token: &TokenId,
        account: &AccountId,
        now: Timestamp,
    ) -> AssetResult<()> {
        let mut tokens = self.tokens.write().await;
        let entry = tokens
            .get_mut(token)
            .ok_or_else(|| AssetError::UnknownToken(token.clone()))?;
        entry.revoke_delegation(account, now);
        Ok(())
    }

    /// Copy the full registry state.
    pub async fn snapshot(&self) -> TokenRegistrySnapshot {
        TokenRegistrySnapshot {
            tokens: self.tokens.read().await.clone(),
        }
    }

    /// Restore a previously taken snapshot, discarding every change made
    /// since it was taken.
    pub async fn restore(&self, snapshot: TokenRegistrySnapshot) {
        *self.tokens.write().await = snapshot.tokens;
    }
}

impl Default for TokenRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl VotingPowerSource for TokenRegistry {
    async fn voting_power_at(
        &self,
        token: &TokenId,
        account: &AccountId,
        at: Timestamp,
    ) -> AssetResult<Amount> {
        let tokens = self.tokens.read().await;
        let token = tokens
            .get(token)
            .ok_or_else(|| AssetError::UnknownToken(token.clone()))?;
        Ok(token.voting_power_at(account, at))
    }

    async fn current_voting_power(
        &self,
        token: &TokenId,
        account: &AccountId,
    ) -> AssetResult<Amount> {
        let tokens = self.tokens.read().await;
        let token = tokens
            .get(token)
            .ok_or_else(|| AssetError::UnknownToken(token.clone()))?;
        Ok(token.voting_power(account))
    }

    async fn total_voting_power_at(&self, token: &TokenId, at: Timestamp) -> AssetResult<Amount> {
        let tokens = self.tokens.read().await;
        let token = tokens
            .get(token)
            .ok_or_else(|| AssetError::UnknownToken(token.clone()))?;
        Ok(token.total_supply_at(at))
    }
}

#[async_trait]
impl AssetTransfers for TokenRegistry {
    async fn transfer(
        &self,
        token: &TokenId,
        from: &AccountId,
        to: &AccountId,
        amount: Amount,
        now: Timestamp,
    ) -> AssetResult<()> {
        let mut tokens = self.tokens.write().await;
        let entry = tokens
            .get_mut(token)
            .ok_or_else(|| AssetError::UnknownToken(token.clone()))?;
        entry.transfer(from, to, amount, now)
    }

    async fn transfer_from(
        &self,
        token: &TokenId,
        spender: &AccountId,
        from: &AccountId,
        to: &AccountId,
        amount: Amount,
        now: Timestamp,
    ) -> AssetResult<()> {
        let mut tokens = self.tokens.write().await;
        let entry = tokens
            .get_mut(token)
            .ok_or_else(|| AssetError::UnknownToken(token.clone()))?;
        entry.transfer_from(spender, from, to, amount, now)
    }
}
