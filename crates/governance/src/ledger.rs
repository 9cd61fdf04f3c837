//! Native-currency ledger
//!
//! Flat per-account balances for the engine's native currency. Deposits
//! into and withdrawals out of organization treasuries, as well as
//! value-bearing actions, all settle through this ledger.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use agora_core::{AccountId, Amount};

use crate::{GovernanceError, GovernanceResult};

/// Per-account native-currency balances.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct Ledger {
    balances: HashMap<AccountId, Amount>,
}

impl Ledger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn balance(&self, account: &AccountId) -> Amount {
        self.balances.get(account).copied().unwrap_or(0)
    }

    /// Credit `account` with freshly-introduced funds.
    pub fn credit(&mut self, account: &AccountId, amount: Amount) {
        *self.balances.entry(account.clone()).or_insert(0) += amount;
    }

    /// Move `amount` from `from` to `to`.
    pub fn transfer(
        &mut self,
        from: &AccountId,
        to: &AccountId,
        amount: Amount,
    ) -> GovernanceResult<()> {
        let available = self.balance(from);
        if available < amount {
            return Err(GovernanceError::InsufficientBalance {
                needed: amount,
                available,
            });
        }
        *self.balances.entry(from.clone()).or_insert(0) -= amount;
        *self.balances.entry(to.clone()).or_insert(0) += amount;
        Ok(())
    }

    /// Sum of all balances, used by conservation checks.
    pub fn total(&self) -> Amount {
        self.balances.values().sum()
    }
}
