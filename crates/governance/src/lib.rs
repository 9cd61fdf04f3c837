//! Governance engine for Agora
//!
//! Organizations hold shared funds, admit members, and change their own
//! rules only through proposals that are voted on and then executed as an
//! atomic batch of actions. Privileged organization state (settings,
//! membership, policy, treasury withdrawals) is reachable exclusively from
//! the execution path of an approved proposal; direct calls fail.

use thiserror::Error;

use agora_core::{AssetError, OrgId, ProposalId};

pub mod actions;
pub mod dao;
mod executor;
pub mod factory;
pub mod ledger;
pub mod proposal;
pub mod registry;

pub use actions::{Action, ActionReceipt, ActionTarget, OrgCall, TokenCall};
pub use dao::{
    GovernanceAuthority, GovernanceSettings, Member, OrgSettings, Organization, ProposalPolicy,
    VotingBackend,
};
pub use dao::treasury::{AssetDeposit, NativeDeposit, Treasury};
pub use factory::OrganizationFactory;
pub use ledger::Ledger;
pub use proposal::{Proposal, ProposalStatus, VoteChoice, VotingMode};
pub use registry::{OrganizationRegistry, ProposalRegistry};

/// Error types for governance operations
#[derive(Error, Debug)]
pub enum GovernanceError {
    /// Caller lacks membership, holding, or executor rights
    #[error("unauthorized: {0}")]
    Unauthorized(String),

    /// The account has already voted on this proposal
    #[error("account has already voted on this proposal")]
    AlreadyVoted,

    /// The proposal's voting window is not open
    #[error("voting window is closed")]
    VotingClosed,

    /// The proposal has not reached approval
    #[error("proposal is not approved")]
    NotApproved,

    /// The proposal has already been executed
    #[error("proposal has already been executed")]
    AlreadyExecuted,

    /// A treasury or ledger movement exceeds the recorded balance
    #[error("insufficient balance: need {needed}, have {available}")]
    InsufficientBalance {
        needed: agora_core::Amount,
        available: agora_core::Amount,
    },

    /// An action in a batch failed; the whole batch was rolled back
    #[error("action {index} failed: {reason}")]
    BatchExecutionFailed { index: usize, reason: String },

    /// Organization not found
    #[error("organization not found: {0}")]
    OrganizationNotFound(OrgId),

    /// Proposal not found
    #[error("proposal not found: {0}")]
    ProposalNotFound(ProposalId),

    /// Invalid organization parameters
    #[error("invalid organization: {0}")]
    InvalidOrganization(String),

    /// Invalid proposal parameters
    #[error("invalid proposal: {0}")]
    InvalidProposal(String),

    /// An action payload was malformed or not applicable to its target
    #[error("invalid action: {0}")]
    InvalidAction(String),

    /// Error from the token layer
    #[error(transparent)]
    Asset(#[from] AssetError),
}

/// Result type for governance operations
pub type GovernanceResult<T> = Result<T, GovernanceError>;
