//! Action batches and their payload encodings
//!
//! An action addresses a target with an optional native-currency value and
//! an opaque payload. Decoding the payload is the target's business: an
//! organization decodes an [`OrgCall`], a token decodes a [`TokenCall`],
//! and a plain account accepts only an empty payload (a pure transfer).

use serde::{Deserialize, Serialize};

use agora_core::{AccountId, Amount, OrgId, TokenId};

use crate::dao::{Member, OrgSettings, ProposalPolicy};
use crate::{GovernanceError, GovernanceResult};

/// The addressee of one action.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum ActionTarget {
    /// An organization; the payload must decode to an [`OrgCall`]
    Organization(OrgId),
    /// A token; the payload must decode to a [`TokenCall`]
    Token(TokenId),
    /// A plain account; the payload must be empty
    Account(AccountId),
}

/// One entry of a proposal's action batch.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Action {
    /// Who receives the call
    pub target: ActionTarget,
    /// Native currency forwarded with the call, drawn from the executing
    /// organization's holdings
    pub value: Amount,
    /// Opaque call data, decoded by the target
    pub payload: Vec<u8>,
}

impl Action {
    /// An action invoking an organization call, with no value attached.
    pub fn org_call(org: OrgId, call: &OrgCall) -> Self {
        Self {
            target: ActionTarget::Organization(org),
            value: 0,
            payload: call.encode(),
        }
    }

    /// An action invoking a token call, with no value attached.
    pub fn token_call(token: TokenId, call: &TokenCall) -> Self {
        Self {
            target: ActionTarget::Token(token),
            value: 0,
            payload: call.encode(),
        }
    }

    /// A pure native-currency payment to an account.
    pub fn payment(to: AccountId, value: Amount) -> Self {
        Self {
            target: ActionTarget::Account(to),
            value,
            payload: Vec::new(),
        }
    }
}

/// Result of one successfully dispatched action.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActionReceipt {
    /// Position of the action in its batch
    pub index: usize,
    /// Raw result bytes returned by the target
    pub output: Vec<u8>,
}

/// Privileged calls an organization accepts from its own governance path.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum OrgCall {
    /// Replace the organization's settings
    UpdateSettings(OrgSettings),
    /// Add members; fails on duplicates
    AddMembers(Vec<Member>),
    /// Remove members; unknown accounts are skipped
    RemoveMembers(Vec<AccountId>),
    /// Replace the proposal-creation policy
    UpdateProposalPolicy(ProposalPolicy),
    /// Pay out native funds recorded for `from` to `to`
    WithdrawNative {
        from: AccountId,
        to: AccountId,
        amount: Amount,
    },
    /// Pay out asset funds recorded for `from` to `to`
    WithdrawAsset {
        token: TokenId,
        from: AccountId,
        to: AccountId,
        amount: Amount,
    },
}

impl OrgCall {
    /// Serialize into payload bytes.
    pub fn encode(&self) -> Vec<u8> {
        serde_json::to_vec(self).unwrap_or_default()
    }

    pub(crate) fn decode(payload: &[u8]) -> GovernanceResult<Self> {
        serde_json::from_slice(payload).map_err(|e| {
            GovernanceError::InvalidAction(format!("malformed organization call: {}", e))
        })
    }
}

/// Calls a token accepts from an organization's governance path.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum TokenCall {
    /// Mint new supply to `to`; only the token's owning organization may
    Mint { to: AccountId, amount: Amount },
    /// Transfer from the executing organization's own token balance
    Transfer { to: AccountId, amount: Amount },
}

impl TokenCall {
    /// Serialize into payload bytes.
    pub fn encode(&self) -> Vec<u8> {
        serde_json::to_vec(self).unwrap_or_default()
    }

    pub(crate) fn decode(payload: &[u8]) -> GovernanceResult<Self> {
        serde_json::from_slice(payload)
            .map_err(|e| GovernanceError::InvalidAction(format!("malformed token call: {}", e)))
    }
}
