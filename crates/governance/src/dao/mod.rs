//! Organizations: settings, membership, policy, and treasury
//!
//! An `Organization` owns its treasury records and its governance
//! configuration. Every privileged mutator takes a [`GovernanceAuthority`],
//! a capability value that only the proposal-execution path can mint, and
//! checks it against the organization's stored executor reference. A direct
//! external call can therefore never reach privileged state.

pub mod treasury;

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use tracing::info;

use agora_core::{AccountId, Amount, OrgId, Timestamp, TokenId};

use crate::{GovernanceError, GovernanceResult};
use treasury::Treasury;

/// Display settings of an organization, mutable only by approved proposal.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrgSettings {
    /// Organization name
    pub name: String,
    /// Opaque application data carried alongside the name
    pub data: Vec<u8>,
}

impl fmt::Debug for OrgSettings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "OrgSettings {{ name: {}, data: 0x{} }}",
            self.name,
            hex::encode(&self.data)
        )
    }
}

/// Tally thresholds governing proposal approval.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct GovernanceSettings {
    /// Minimum share of the total possible weight that must participate,
    /// as a percentage (0-100)
    pub minimum_participation_percent: u8,
    /// Share of the yes+no weight that must be yes, as a percentage (0-100)
    pub support_threshold_percent: u8,
    /// Whether a mathematically decided outcome may approve a proposal
    /// before its voting window closes
    pub early_execution: bool,
}

impl Default for GovernanceSettings {
    fn default() -> Self {
        Self {
            minimum_participation_percent: 25,
            support_threshold_percent: 60,
            early_execution: true,
        }
    }
}

/// Who may create proposals against an organization.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProposalPolicy {
    /// When true, proposal creation requires a minimum token holding;
    /// when false, it requires membership
    pub token_gated: bool,
    /// Minimum current voting weight required when `token_gated`
    pub minimum_holding: Amount,
}

/// A member entry: account plus its recorded deposit.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Member {
    pub account: AccountId,
    pub deposit: Amount,
}

/// Where an organization's voting weight comes from.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum VotingBackend {
    /// One vote per member
    Membership,
    /// Weight read from a governance token's checkpoints
    Token(TokenId),
}

/// Reference to the one principal allowed to call privileged mutators.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExecutorId(String);

impl ExecutorId {
    fn generate() -> Self {
        Self(format!("executor-{}", uuid::Uuid::new_v4()))
    }
}

/// Capability to call privileged organization mutators.
///
/// Values of this type are minted exclusively by the proposal-execution
/// path; there is no public constructor. Holding one proves the call
/// originates from an approved proposal of the organization whose
/// executor reference it matches.
pub struct GovernanceAuthority {
    executor: ExecutorId,
}

impl GovernanceAuthority {
    pub(crate) fn for_executor(executor: &ExecutorId) -> Self {
        Self {
            executor: executor.clone(),
        }
    }
}

/// A governed organization holding treasury, membership, and settings.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Organization {
    /// Handle of this organization
    id: OrgId,
    /// Display settings
    settings: OrgSettings,
    /// Source of voting weight
    backend: VotingBackend,
    /// Member accounts and their recorded deposits
    members: HashMap<AccountId, Amount>,
    /// Tally thresholds
    governance_settings: GovernanceSettings,
    /// Proposal-creation gate
    proposal_policy: ProposalPolicy,
    /// Per-depositor fund records
    treasury: Treasury,
    /// The one principal allowed to mutate privileged state
    authorized_executor: ExecutorId,
    /// When this organization was created
    created_at: Timestamp,
}

impl Organization {
    pub(crate) fn new(
        id: OrgId,
        settings: OrgSettings,
        backend: VotingBackend,
        initial_members: Vec<Member>,
        governance_settings: GovernanceSettings,
        proposal_policy: ProposalPolicy,
        now: Timestamp,
    ) -> Self {
        let members = initial_members
            .into_iter()
            .map(|member| (member.account, member.deposit))
            .collect();
        Self {
            id,
            settings,
            backend,
            members,
            governance_settings,
            proposal_policy,
            treasury: Treasury::default(),
            authorized_executor: ExecutorId::generate(),
            created_at: now,
        }
    }

    pub fn id(&self) -> &OrgId {
        &self.id
    }

    pub fn settings(&self) -> &OrgSettings {
        &self.settings
    }

    pub fn governance_settings(&self) -> &GovernanceSettings {
        &self.governance_settings
    }

    pub fn proposal_policy(&self) -> &ProposalPolicy {
        &self.proposal_policy
    }

    pub fn voting_backend(&self) -> &VotingBackend {
        &self.backend
    }

    pub fn is_member(&self, account: &AccountId) -> bool {
        self.members.contains_key(account)
    }

    pub fn member_count(&self) -> usize {
        self.members.len()
    }

    pub fn treasury(&self) -> &Treasury {
        &self.treasury
    }

    pub fn created_at(&self) -> Timestamp {
        self.created_at
    }

    pub(crate) fn authorized_executor(&self) -> &ExecutorId {
        &self.authorized_executor
    }

    fn authorize(&self, auth: &GovernanceAuthority) -> GovernanceResult<()> {
        if auth.executor != self.authorized_executor {
            return Err(GovernanceError::Unauthorized(format!(
                "authority does not govern organization {}",
                self.id
            )));
        }
        Ok(())
    }

    /// Replace the organization's settings. Privileged.
    pub fn update_settings(
        &mut self,
        auth: &GovernanceAuthority,
        settings: OrgSettings,
    ) -> GovernanceResult<()> {
        self.authorize(auth)?;
        info!(org = %self.id, name = %settings.name, "settings updated");
        self.settings = settings;
        Ok(())
    }

    /// Add members. Privileged. Adding an account that is already a member
    /// fails the whole call.
    pub fn add_members(
        &mut self,
        auth: &GovernanceAuthority,
        members: Vec<Member>,
    ) -> GovernanceResult<()> {
        self.authorize(auth)?;
        for member in &members {
            if self.members.contains_key(&member.account) {
                return Err(GovernanceError::InvalidAction(format!(
                    "account {} is already a member",
                    member.account
                )));
            }
        }
        for member in members {
            info!(org = %self.id, account = %member.account, "member added");
            self.members.insert(member.account, member.deposit);
        }
        Ok(())
    }

    /// Remove members. Privileged. Accounts that are not members are
    /// skipped silently.
    pub fn remove_members(
        &mut self,
        auth: &GovernanceAuthority,
        accounts: Vec<AccountId>,
    ) -> GovernanceResult<()> {
        self.authorize(auth)?;
        for account in accounts {
            if self.members.remove(&account).is_some() {
                info!(org = %self.id, %account, "member removed");
            }
        }
        Ok(())
    }

    /// Replace the proposal-creation policy. Privileged.
    pub fn update_proposal_policy(
        &mut self,
        auth: &GovernanceAuthority,
        policy: ProposalPolicy,
    ) -> GovernanceResult<()> {
        self.authorize(auth)?;
        info!(org = %self.id, ?policy, "proposal policy updated");
        self.proposal_policy = policy;
        Ok(())
    }

    /// Debit `amount` from `from`'s recorded native balance. Privileged.
    /// The matching ledger movement is the executor's responsibility.
    pub fn withdraw_native(
        &mut self,
        auth: &GovernanceAuthority,
        from: &AccountId,
        amount: Amount,
    ) -> GovernanceResult<()> {
        self.authorize(auth)?;
        self.treasury.debit_native(from, amount)
    }

    /// Debit `amount` from `from`'s recorded balance in `token`.
    /// Privileged. The matching token movement is the executor's
    /// responsibility.
    pub fn withdraw_asset(
        &mut self,
        auth: &GovernanceAuthority,
        from: &AccountId,
        token: &TokenId,
        amount: Amount,
    ) -> GovernanceResult<()> {
        self.authorize(auth)?;
        self.treasury.debit_asset(from, token, amount)
    }

    pub(crate) fn record_native_deposit(
        &mut self,
        from: &AccountId,
        amount: Amount,
        at: Timestamp,
    ) {
        self.treasury.record_native_deposit(from, amount, at);
    }

    pub(crate) fn record_asset_deposit(
        &mut self,
        from: &AccountId,
        token: &TokenId,
        amount: Amount,
        at: Timestamp,
    ) {
        self.treasury.record_asset_deposit(from, token, amount, at);
    }
}
