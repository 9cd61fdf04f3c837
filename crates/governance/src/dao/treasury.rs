//! Per-depositor treasury accounting for an organization
//!
//! Native currency is tracked as a flat balance per depositor plus an
//! append-only deposit history. Asset tokens are tracked per
//! (depositor, token) as an append-only deposit history alongside the
//! aggregate still-available balance; withdrawals draw from the aggregate
//! and the history is kept as an audit trail.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use agora_core::{AccountId, Amount, Timestamp, TokenId};

use crate::{GovernanceError, GovernanceResult};

/// One native-currency deposit.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct NativeDeposit {
    pub amount: Amount,
    pub at: Timestamp,
}

/// One asset-token deposit.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssetDeposit {
    pub amount: Amount,
    pub at: Timestamp,
}

/// Asset holdings of one depositor in one token.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
struct AssetAccount {
    deposits: Vec<AssetDeposit>,
    available: Amount,
}

/// Treasury records of an organization.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct Treasury {
    /// Native balances per depositor
    native: HashMap<AccountId, Amount>,
    /// Native deposit history per depositor
    native_history: HashMap<AccountId, Vec<NativeDeposit>>,
    /// Asset accounts per depositor and token
    assets: HashMap<AccountId, HashMap<TokenId, AssetAccount>>,
}

impl Treasury {
    pub(crate) fn record_native_deposit(
        &mut self,
        from: &AccountId,
        amount: Amount,
        at: Timestamp,
    ) {
        *self.native.entry(from.clone()).or_insert(0) += amount;
        self.native_history
            .entry(from.clone())
            .or_default()
            .push(NativeDeposit { amount, at });
    }

    pub(crate) fn debit_native(&mut self, from: &AccountId, amount: Amount) -> GovernanceResult<()> {
        let available = self.native_balance(from);
        if available < amount {
            return Err(GovernanceError::InsufficientBalance {
                needed: amount,
                available,
            });
        }
        *self.native.entry(from.clone()).or_insert(0) -= amount;
        Ok(())
    }

    pub(crate) fn record_asset_deposit(
        &mut self,
        from: &AccountId,
        token: &TokenId,
        amount: Amount,
        at: Timestamp,
    ) {
        let account = self
            .assets
            .entry(from.clone())
            .or_default()
            .entry(token.clone())
            .or_default();
        account.deposits.push(AssetDeposit { amount, at });
        account.available += amount;
    }

    pub(crate) fn debit_asset(
        &mut self,
        from: &AccountId,
        token: &TokenId,
        amount: Amount,
    ) -> GovernanceResult<()> {
        let available = self.asset_balance(from, token);
        if available < amount {
            return Err(GovernanceError::InsufficientBalance {
                needed: amount,
                available,
            });
        }
        if let Some(account) = self
            .assets
            .get_mut(from)
            .and_then(|tokens| tokens.get_mut(token))
        {
            account.available -= amount;
        }
        Ok(())
    }

    /// Native balance currently recorded for `who`.
    pub fn native_balance(&self, who: &AccountId) -> Amount {
        self.native.get(who).copied().unwrap_or(0)
    }

    /// Native deposit history of `who`, oldest first.
    pub fn native_deposits(&self, who: &AccountId) -> &[NativeDeposit] {
        self.native_history
            .get(who)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// Still-available balance of `who` in `token`.
    pub fn asset_balance(&self, who: &AccountId, token: &TokenId) -> Amount {
        self.assets
            .get(who)
            .and_then(|tokens| tokens.get(token))
            .map(|account| account.available)
            .unwrap_or(0)
    }

    /// Asset deposit history of `who` in `token`, oldest first.
    pub fn asset_deposits(&self, who: &AccountId, token: &TokenId) -> &[AssetDeposit] {
        self.assets
            .get(who)
            .and_then(|tokens| tokens.get(token))
            .map(|account| account.deposits.as_slice())
            .unwrap_or(&[])
    }

    /// Total still-available holdings in `token` across all depositors.
    pub fn total_asset_holdings(&self, token: &TokenId) -> Amount {
        self.assets
            .values()
            .filter_map(|tokens| tokens.get(token))
            .map(|account| account.available)
            .sum()
    }

    /// Total native funds recorded across all depositors.
    pub fn total_native(&self) -> Amount {
        self.native.values().sum()
    }
}
