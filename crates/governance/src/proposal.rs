//! Proposal state machine and tally
//!
//! A proposal is pending before its start time, open for voting until its
//! end time, and terminal afterwards: approved (and eventually executed) or
//! rejected by inaction. `approved` only ever transitions false to true.

use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use tracing::{debug, info};

use agora_core::{AccountId, Amount, OrgId, ProposalId, Timestamp};

use crate::actions::Action;
use crate::dao::GovernanceSettings;
use crate::{GovernanceError, GovernanceResult};

/// How votes on a proposal are weighted.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum VotingMode {
    /// One vote per organization member
    MemberCount,
    /// Weight from the voting-power oracle, frozen at the proposal's
    /// start time
    TokenWeighted,
}

/// A voter's choice.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum VoteChoice {
    Yes,
    No,
    Abstain,
}

/// Lifecycle state of a proposal.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum ProposalStatus {
    /// Voting has not opened yet
    Pending,
    /// Open for voting
    Open,
    /// Approved, awaiting execution
    Approved,
    /// The voting window closed without approval
    Rejected,
    /// The action batch has been applied
    Executed,
}

/// A time-boxed change request bound to one organization and one
/// action batch.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Proposal {
    /// Handle of this proposal
    id: ProposalId,
    /// The organization this proposal governs
    org: OrgId,
    /// Short title
    title: String,
    /// Detailed description
    description: String,
    /// Account that created the proposal
    proposer: AccountId,
    /// How votes are weighted
    voting_mode: VotingMode,
    /// When voting opens
    start_time: Timestamp,
    /// When voting closes
    end_time: Timestamp,
    /// Caller-supplied correlation id for the action batch
    action_batch_id: u64,
    /// The actions executed on approval, immutable once created
    actions: Vec<Action>,
    /// Weight cast for yes
    yes_weight: Amount,
    /// Weight cast for no
    no_weight: Amount,
    /// Weight cast as abstention
    abstain_weight: Amount,
    /// Accounts that already voted
    voters: HashSet<AccountId>,
    /// Whether the proposal has reached approval
    approved: bool,
    /// Whether the action batch has been applied
    executed: bool,
    /// When the proposal was created
    created_at: Timestamp,
    /// When the batch was applied
    executed_at: Option<Timestamp>,
}

impl Proposal {
    #[allow(clippy::too_many_arguments)]
    pub(crate) fn new(
        id: ProposalId,
        org: OrgId,
        title: String,
        description: String,
        proposer: AccountId,
        voting_mode: VotingMode,
        start_time: Timestamp,
        duration: u64,
        action_batch_id: u64,
        actions: Vec<Action>,
        now: Timestamp,
    ) -> Self {
        Self {
            id,
            org,
            title,
            description,
            proposer,
            voting_mode,
            start_time,
            end_time: start_time + duration,
            action_batch_id,
            actions,
            yes_weight: 0,
            no_weight: 0,
            abstain_weight: 0,
            voters: HashSet::new(),
            approved: false,
            executed: false,
            created_at: now,
            executed_at: None,
        }
    }

    pub fn id(&self) -> &ProposalId {
        &self.id
    }

    pub fn org(&self) -> &OrgId {
        &self.org
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn proposer(&self) -> &AccountId {
        &self.proposer
    }

    pub fn voting_mode(&self) -> VotingMode {
        self.voting_mode
    }

    pub fn start_time(&self) -> Timestamp {
        self.start_time
    }

    pub fn end_time(&self) -> Timestamp {
        self.end_time
    }

    pub fn action_batch_id(&self) -> u64 {
        self.action_batch_id
    }

    pub fn actions(&self) -> &[Action] {
        &self.actions
    }

    pub fn yes_votes(&self) -> Amount {
        self.yes_weight
    }

    pub fn no_votes(&self) -> Amount {
        self.no_weight
    }

    pub fn abstain_votes(&self) -> Amount {
        self.abstain_weight
    }

    pub fn approved(&self) -> bool {
        self.approved
    }

    pub fn executed(&self) -> bool {
        self.executed
    }

    pub fn executed_at(&self) -> Option<Timestamp> {
        self.executed_at
    }

    pub fn created_at(&self) -> Timestamp {
        self.created_at
    }

    pub fn has_voted(&self, account: &AccountId) -> bool {
        self.voters.contains(account)
    }

    /// Whether the voting window is open at `now`.
    pub fn is_open(&self, now: Timestamp) -> bool {
        now >= self.start_time && now < self.end_time
    }

    /// The lifecycle state as of `now`.
    pub fn status(&self, now: Timestamp) -> ProposalStatus {
        if self.executed {
            ProposalStatus::Executed
        } else if self.approved {
            ProposalStatus::Approved
        } else if now < self.start_time {
            ProposalStatus::Pending
        } else if now < self.end_time {
            ProposalStatus::Open
        } else {
            ProposalStatus::Rejected
        }
    }

    /// Weight cast so far, in the proposal's unit.
    pub fn participation(&self) -> Amount {
        self.yes_weight + self.no_weight + self.abstain_weight
    }

    /// Whether the outcome can no longer be flipped by the remaining
    /// uncast weight.
    pub fn early_execution(&self, total_possible: Amount) -> bool {
        let remaining = total_possible.saturating_sub(self.participation());
        self.yes_weight > self.no_weight + remaining
    }

    /// Apply one vote and refresh the approval state.
    ///
    /// `total_possible` is the full weight that could ever be cast on this
    /// proposal, in the proposal's unit.
    pub(crate) fn register_vote(
        &mut self,
        voter: AccountId,
        choice: VoteChoice,
        weight: Amount,
        total_possible: Amount,
        settings: &GovernanceSettings,
        now: Timestamp,
    ) -> GovernanceResult<()> {
        if self.executed {
            return Err(GovernanceError::AlreadyExecuted);
        }
        if !self.is_open(now) {
            return Err(GovernanceError::VotingClosed);
        }
        if self.voters.contains(&voter) {
            return Err(GovernanceError::AlreadyVoted);
        }

        match choice {
            VoteChoice::Yes => self.yes_weight += weight,
            VoteChoice::No => self.no_weight += weight,
            VoteChoice::Abstain => self.abstain_weight += weight,
        }
        debug!(
            proposal = %self.id,
            %voter,
            ?choice,
            weight,
            yes = self.yes_weight,
            no = self.no_weight,
            "vote recorded"
        );
        self.voters.insert(voter);
        self.refresh_approval(total_possible, settings);
        Ok(())
    }

    /// Recompute `approved`. Monotone: once true it never reverts.
    fn refresh_approval(&mut self, total_possible: Amount, settings: &GovernanceSettings) {
        if self.approved {
            return;
        }
        if self.yes_weight <= self.no_weight {
            return;
        }
        let standard = self.participation_met(total_possible, settings) && self.support_met(settings);
        let decided = settings.early_execution && self.early_execution(total_possible);
        if standard || decided {
            self.approved = true;
            info!(proposal = %self.id, yes = self.yes_weight, no = self.no_weight, "proposal approved");
        }
    }

    fn participation_met(&self, total_possible: Amount, settings: &GovernanceSettings) -> bool {
        self.participation() * 100
            >= Amount::from(settings.minimum_participation_percent) * total_possible
    }

    fn support_met(&self, settings: &GovernanceSettings) -> bool {
        let cast = self.yes_weight + self.no_weight;
        self.yes_weight * 100 > Amount::from(settings.support_threshold_percent) * cast
    }

    /// Flip the executed flag before dispatching the batch, so re-entrant
    /// callers observe the proposal as spent.
    pub(crate) fn begin_execution(&mut self) -> GovernanceResult<()> {
        if self.executed {
            return Err(GovernanceError::AlreadyExecuted);
        }
        if !self.approved {
            return Err(GovernanceError::NotApproved);
        }
        self.executed = true;
        Ok(())
    }

    /// Confirm a successful batch dispatch.
    pub(crate) fn confirm_execution(&mut self, now: Timestamp) {
        self.executed_at = Some(now);
    }

    /// Undo the tentative executed flag after a failed batch, leaving the
    /// proposal retryable.
    pub(crate) fn abort_execution(&mut self) {
        self.executed = false;
        self.executed_at = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn account(name: &str) -> AccountId {
        AccountId::new(name)
    }

    fn settings(participation: u8, support: u8, early: bool) -> GovernanceSettings {
        GovernanceSettings {
            minimum_participation_percent: participation,
            support_threshold_percent: support,
            early_execution: early,
        }
    }

    fn open_proposal() -> Proposal {
        Proposal::new(
            ProposalId::generate(),
            OrgId::generate(),
            "title".into(),
            "description".into(),
            account("proposer"),
            VotingMode::TokenWeighted,
            100,
            1_000,
            1,
            Vec::new(),
            100,
        )
    }

    #[test]
    fn window_is_half_open() {
        let proposal = open_proposal();
        assert!(!proposal.is_open(99));
        assert!(proposal.is_open(100));
        assert!(proposal.is_open(1_099));
        assert!(!proposal.is_open(1_100));
    }

    #[test]
    fn status_follows_the_clock_and_the_tally() {
        let mut proposal = open_proposal();
        assert_eq!(proposal.status(99), ProposalStatus::Pending);
        assert_eq!(proposal.status(100), ProposalStatus::Open);
        // The window closed without approval: rejected by inaction.
        assert_eq!(proposal.status(1_100), ProposalStatus::Rejected);

        let cfg = settings(10, 50, true);
        proposal
            .register_vote(account("a"), VoteChoice::Yes, 60, 100, &cfg, 200)
            .unwrap();
        assert_eq!(proposal.status(200), ProposalStatus::Approved);

        proposal.begin_execution().unwrap();
        proposal.confirm_execution(300);
        assert_eq!(proposal.status(300), ProposalStatus::Executed);
    }

    #[test]
    fn vote_outside_window_is_rejected() {
        let mut proposal = open_proposal();
        let cfg = settings(25, 60, true);

        let err = proposal
            .register_vote(account("a"), VoteChoice::Yes, 10, 100, &cfg, 99)
            .unwrap_err();
        assert!(matches!(err, GovernanceError::VotingClosed));

        let err = proposal
            .register_vote(account("a"), VoteChoice::Yes, 10, 100, &cfg, 1_100)
            .unwrap_err();
        assert!(matches!(err, GovernanceError::VotingClosed));
        assert_eq!(proposal.yes_votes(), 0);
    }

    #[test]
    fn double_vote_is_rejected() {
        let mut proposal = open_proposal();
        let cfg = settings(25, 60, true);

        proposal
            .register_vote(account("a"), VoteChoice::Yes, 10, 100, &cfg, 200)
            .unwrap();
        let err = proposal
            .register_vote(account("a"), VoteChoice::No, 10, 100, &cfg, 201)
            .unwrap_err();
        assert!(matches!(err, GovernanceError::AlreadyVoted));
        assert_eq!(proposal.yes_votes(), 10);
        assert_eq!(proposal.no_votes(), 0);
    }

    #[test]
    fn approval_requires_thresholds() {
        let mut proposal = open_proposal();
        let cfg = settings(50, 60, false);

        // 30 of 100 possible: majority yes but participation is short.
        proposal
            .register_vote(account("a"), VoteChoice::Yes, 20, 100, &cfg, 200)
            .unwrap();
        proposal
            .register_vote(account("b"), VoteChoice::No, 10, 100, &cfg, 201)
            .unwrap();
        assert!(!proposal.approved());

        // Abstentions count toward participation.
        proposal
            .register_vote(account("c"), VoteChoice::Abstain, 25, 100, &cfg, 202)
            .unwrap();
        assert!(proposal.approved());
    }

    #[test]
    fn decided_outcome_approves_early() {
        let mut proposal = open_proposal();
        let cfg = settings(90, 60, true);

        // 60 of 100: even if all remaining 40 voted no, yes still wins,
        // despite participation being short of 90 percent.
        proposal
            .register_vote(account("a"), VoteChoice::Yes, 60, 100, &cfg, 200)
            .unwrap();
        assert!(proposal.early_execution(100));
        assert!(proposal.approved());
    }

    #[test]
    fn decided_outcome_needs_early_execution_enabled() {
        let mut proposal = open_proposal();
        let cfg = settings(90, 60, false);

        proposal
            .register_vote(account("a"), VoteChoice::Yes, 60, 100, &cfg, 200)
            .unwrap();
        assert!(proposal.early_execution(100));
        assert!(!proposal.approved());
    }

    #[test]
    fn approval_is_monotone() {
        let mut proposal = open_proposal();
        let cfg = settings(10, 50, true);

        proposal
            .register_vote(account("a"), VoteChoice::Yes, 60, 100, &cfg, 200)
            .unwrap();
        assert!(proposal.approved());

        // A following landslide of no votes does not revoke approval.
        proposal
            .register_vote(account("b"), VoteChoice::No, 40, 100, &cfg, 201)
            .unwrap();
        assert!(proposal.approved());
    }

    #[test]
    fn execution_gates() {
        let mut proposal = open_proposal();
        let err = proposal.begin_execution().unwrap_err();
        assert!(matches!(err, GovernanceError::NotApproved));

        let cfg = settings(10, 50, true);
        proposal
            .register_vote(account("a"), VoteChoice::Yes, 60, 100, &cfg, 200)
            .unwrap();

        proposal.begin_execution().unwrap();
        assert!(proposal.executed());
        let err = proposal.begin_execution().unwrap_err();
        assert!(matches!(err, GovernanceError::AlreadyExecuted));

        // A failed batch leaves the proposal retryable.
        proposal.abort_execution();
        assert!(!proposal.executed());
        proposal.begin_execution().unwrap();
        proposal.confirm_execution(300);
        assert_eq!(proposal.executed_at(), Some(300));
    }
}
