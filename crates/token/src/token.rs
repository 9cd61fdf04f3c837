//! Single-token state: balances, allowances, delegation, checkpoints

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use agora_core::{AccountId, Amount, AssetError, AssetResult, Timestamp, TokenId};

/// Display parameters for a new governance token.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct TokenParams {
    /// Human-readable token name
    pub name: String,
    /// Short ticker symbol
    pub symbol: String,
}

/// One recorded value of a time-indexed series.
#[derive(Clone, Debug, Serialize, Deserialize)]
struct Checkpoint {
    at: Timestamp,
    value: Amount,
}

/// Push a new value onto a checkpoint series. A second write at the same
/// instant overwrites the previous one, so a series never holds two entries
/// for one timestamp.
fn push_checkpoint(series: &mut Vec<Checkpoint>, at: Timestamp, value: Amount) {
    match series.last_mut() {
        Some(last) if last.at == at => last.value = value,
        _ => series.push(Checkpoint { at, value }),
    }
}

/// Value of a checkpoint series as of `at`: the most recent entry written
/// at or before that instant, zero if none.
fn checkpoint_at(series: &[Checkpoint], at: Timestamp) -> Amount {
    match series.partition_point(|cp| cp.at <= at) {
        0 => 0,
        idx => series[idx - 1].value,
    }
}

/// A voting-weight token with delegation and historical power lookups.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct GovernanceToken {
    /// Handle of this token
    id: TokenId,
    /// Display parameters
    params: TokenParams,
    /// The only account allowed to mint new supply
    owner: AccountId,
    /// Current balances
    balances: HashMap<AccountId, Amount>,
    /// Allowances: owner -> spender -> remaining amount
    allowances: HashMap<AccountId, HashMap<AccountId, Amount>>,
    /// Explicit delegations; an absent entry means self-delegated
    delegates: HashMap<AccountId, AccountId>,
    /// Voting-power checkpoints per delegate
    power: HashMap<AccountId, Vec<Checkpoint>>,
    /// Total-supply checkpoints
    supply: Vec<Checkpoint>,
}

impl GovernanceToken {
    /// Create a token, seeding `initial` balances. Every seeded holder
    /// starts self-delegated, so initial balances are immediately counted
    /// as voting power.
    pub fn new(
        id: TokenId,
        params: TokenParams,
        owner: AccountId,
        initial: &[(AccountId, Amount)],
        now: Timestamp,
    ) -> Self {
        let mut token = Self {
            id,
            params,
            owner,
            balances: HashMap::new(),
            allowances: HashMap::new(),
            delegates: HashMap::new(),
            power: HashMap::new(),
            supply: Vec::new(),
        };
        for (account, amount) in initial {
            let balance = token.balances.entry(account.clone()).or_insert(0);
            *balance += amount;
            token.move_power(None, Some(account.clone()), *amount, now);
        }
        let total = token.balances.values().sum();
        push_checkpoint(&mut token.supply, now, total);
        token
    }

    pub fn id(&self) -> &TokenId {
        &self.id
    }

    pub fn name(&self) -> &str {
        &self.params.name
    }

    pub fn symbol(&self) -> &str {
        &self.params.symbol
    }

    pub fn owner(&self) -> &AccountId {
        &self.owner
    }

    pub fn balance_of(&self, account: &AccountId) -> Amount {
        self.balances.get(account).copied().unwrap_or(0)
    }

    pub fn allowance(&self, owner: &AccountId, spender: &AccountId) -> Amount {
        self.allowances
            .get(owner)
            .and_then(|spenders| spenders.get(spender))
            .copied()
            .unwrap_or(0)
    }

    /// The delegate currently carrying `account`'s weight.
    pub fn delegate_of<'a>(&'a self, account: &'a AccountId) -> &'a AccountId {
        self.delegates.get(account).unwrap_or(account)
    }

    /// Current voting weight of `account`.
    pub fn voting_power(&self, account: &AccountId) -> Amount {
        self.power
            .get(account)
            .map(|series| series.last().map(|cp| cp.value).unwrap_or(0))
            .unwrap_or(0)
    }

    /// Voting weight of `account` as of `at`.
    pub fn voting_power_at(&self, account: &AccountId, at: Timestamp) -> Amount {
        self.power
            .get(account)
            .map(|series| checkpoint_at(series, at))
            .unwrap_or(0)
    }

    pub fn total_supply(&self) -> Amount {
        self.supply.last().map(|cp| cp.value).unwrap_or(0)
    }

    pub fn total_supply_at(&self, at: Timestamp) -> Amount {
        checkpoint_at(&self.supply, at)
    }

    /// Mint new supply to `to`. Only the token owner may mint.
    pub fn mint(
        &mut self,
        caller: &AccountId,
        to: &AccountId,
        amount: Amount,
        now: Timestamp,
    ) -> AssetResult<()> {
        if caller != &self.owner {
            return Err(AssetError::NotOwner {
                token: self.id.clone(),
                caller: caller.clone(),
            });
        }
        *self.balances.entry(to.clone()).or_insert(0) += amount;
        let delegate = self.delegate_of(to).clone();
        self.move_power(None, Some(delegate), amount, now);
        let total = self.total_supply() + amount;
        push_checkpoint(&mut self.supply, now, total);
        tracing::debug!(token = %self.id, %to, amount, "minted supply");
        Ok(())
    }

    /// Move `amount` from `from` to `to`, shifting delegated weight along.
    pub fn transfer(
        &mut self,
        from: &AccountId,
        to: &AccountId,
        amount: Amount,
        now: Timestamp,
    ) -> AssetResult<()> {
        let available = self.balance_of(from);
        if available < amount {
            return Err(AssetError::InsufficientBalance {
                account: from.clone(),
                needed: amount,
                available,
            });
        }
        *self.balances.entry(from.clone()).or_insert(0) -= amount;
        *self.balances.entry(to.clone()).or_insert(0) += amount;
        let from_delegate = self.delegate_of(from).clone();
        let to_delegate = self.delegate_of(to).clone();
        self.move_power(Some(from_delegate), Some(to_delegate), amount, now);
        Ok(())
    }

    /// Record an allowance of `amount` for `spender` over `owner`'s balance.
    pub fn approve(&mut self, owner: &AccountId, spender: &AccountId, amount: Amount) {
        self.allowances
            .entry(owner.clone())
            .or_default()
            .insert(spender.clone(), amount);
    }

    /// Transfer on behalf of `spender`, consuming allowance.
    pub fn transfer_from(
        &mut self,
        spender: &AccountId,
        from: &AccountId,
        to: &AccountId,
        amount: Amount,
        now: Timestamp,
    ) -> AssetResult<()> {
        let allowed = self.allowance(from, spender);
        if allowed < amount {
            return Err(AssetError::InsufficientAllowance {
                spender: spender.clone(),
                needed: amount,
                available: allowed,
            });
        }
        self.transfer(from, to, amount, now)?;
        self.allowances
            .entry(from.clone())
            .or_default()
            .insert(spender.clone(), allowed - amount);
        Ok(())
    }

    /// Delegate `account`'s full balance weight to `delegatee`. Delegating
    /// to oneself restores self-owned weight.
    pub fn delegate(&mut self, account: &AccountId, delegatee: &AccountId, now: Timestamp) {
        let previous = self.delegate_of(account).clone();
        if &previous == delegatee {
            return;
        }
        let weight = self.balance_of(account);
        if account == delegatee {
            self.delegates.remove(account);
        } else {
            self.delegates.insert(account.clone(), delegatee.clone());
        }
        self.move_power(Some(previous), Some(delegatee.clone()), weight, now);
        tracing::debug!(token = %self.id, %account, %delegatee, "delegation updated");
    }

    /// Restore `account`'s weight to itself.
    pub fn revoke_delegation(&mut self, account: &AccountId, now: Timestamp) {
        self.delegate(account, &account.clone(), now);
    }

    /// Shift checkpointed voting power between delegates.
    fn move_power(
        &mut self,
        from: Option<AccountId>,
        to: Option<AccountId>,
        amount: Amount,
        now: Timestamp,
    ) {
        if amount == 0 || from == to {
            return;
        }
        if let Some(from) = from {
            let series = self.power.entry(from).or_default();
            let current = series.last().map(|cp| cp.value).unwrap_or(0);
            push_checkpoint(series, now, current.saturating_sub(amount));
        }
        if let Some(to) = to {
            let series = self.power.entry(to).or_default();
            let current = series.last().map(|cp| cp.value).unwrap_or(0);
            push_checkpoint(series, now, current + amount);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn account(name: &str) -> AccountId {
        AccountId::new(name)
    }

    fn test_token(initial: &[(AccountId, Amount)], now: Timestamp) -> GovernanceToken {
        GovernanceToken::new(
            TokenId::generate(),
            TokenParams {
                name: "Test Governance".into(),
                symbol: "TGOV".into(),
            },
            account("owner"),
            initial,
            now,
        )
    }

    #[test]
    fn seeded_holders_are_self_delegated() {
        let token = test_token(&[(account("a"), 500), (account("b"), 200)], 10);

        assert_eq!(token.balance_of(&account("a")), 500);
        assert_eq!(token.voting_power(&account("a")), 500);
        assert_eq!(token.voting_power(&account("b")), 200);
        assert_eq!(token.total_supply(), 700);
    }

    #[test]
    fn transfer_moves_balance_and_power() {
        let mut token = test_token(&[(account("a"), 500)], 10);

        token.transfer(&account("a"), &account("b"), 100, 20).unwrap();

        assert_eq!(token.balance_of(&account("a")), 400);
        assert_eq!(token.balance_of(&account("b")), 100);
        assert_eq!(token.voting_power(&account("a")), 400);
        assert_eq!(token.voting_power(&account("b")), 100);
        // Historical weight is untouched by the later transfer.
        assert_eq!(token.voting_power_at(&account("a"), 15), 500);
        assert_eq!(token.voting_power_at(&account("b"), 15), 0);
    }

    #[test]
    fn transfer_rejects_overdraft() {
        let mut token = test_token(&[(account("a"), 50)], 10);

        let err = token
            .transfer(&account("a"), &account("b"), 51, 20)
            .unwrap_err();
        assert!(matches!(err, AssetError::InsufficientBalance { .. }));
        assert_eq!(token.balance_of(&account("a")), 50);
    }

    #[test]
    fn delegation_shifts_and_reverts_power() {
        let mut token = test_token(&[(account("a"), 500), (account("b"), 200)], 10);

        token.delegate(&account("b"), &account("a"), 20);
        assert_eq!(token.voting_power(&account("a")), 700);
        assert_eq!(token.voting_power(&account("b")), 0);

        token.revoke_delegation(&account("b"), 30);
        assert_eq!(token.voting_power(&account("a")), 500);
        assert_eq!(token.voting_power(&account("b")), 200);

        // Snapshots reflect the state at each instant.
        assert_eq!(token.voting_power_at(&account("a"), 25), 700);
        assert_eq!(token.voting_power_at(&account("a"), 35), 500);
        assert_eq!(token.voting_power_at(&account("b"), 35), 200);
    }

    #[test]
    fn transfer_from_requires_allowance() {
        let mut token = test_token(&[(account("a"), 100)], 10);

        let err = token
            .transfer_from(&account("dao"), &account("a"), &account("dao"), 5, 20)
            .unwrap_err();
        assert!(matches!(err, AssetError::InsufficientAllowance { .. }));

        token.approve(&account("a"), &account("dao"), 5);
        token
            .transfer_from(&account("dao"), &account("a"), &account("dao"), 5, 20)
            .unwrap();
        assert_eq!(token.balance_of(&account("dao")), 5);
        assert_eq!(token.allowance(&account("a"), &account("dao")), 0);
    }

    #[test]
    fn mint_is_owner_gated() {
        let mut token = test_token(&[], 10);

        let err = token
            .mint(&account("mallory"), &account("mallory"), 1_000, 20)
            .unwrap_err();
        assert!(matches!(err, AssetError::NotOwner { .. }));

        token.mint(&account("owner"), &account("a"), 1_000, 20).unwrap();
        assert_eq!(token.total_supply(), 1_000);
        assert_eq!(token.total_supply_at(15), 0);
        assert_eq!(token.voting_power(&account("a")), 1_000);
    }

    #[test]
    fn same_instant_checkpoints_collapse() {
        let mut token = test_token(&[(account("a"), 100)], 10);

        token.transfer(&account("a"), &account("b"), 10, 20).unwrap();
        token.transfer(&account("a"), &account("b"), 10, 20).unwrap();

        assert_eq!(token.voting_power_at(&account("b"), 20), 20);
        assert_eq!(token.voting_power_at(&account("b"), 19), 0);
    }
}
