//! Process-wide registries for organizations and proposals
//!
//! Both registries are append-only: organizations and proposals are
//! created once and never torn down. The proposal registry is the single
//! entry point for proposal creation, voting, and execution.

use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{info, warn};

use agora_core::{
    AccountId, Amount, AssetTransfers, OrgId, ProposalId, Timestamp, TokenId, VotingPowerSource,
};
use agora_token::TokenRegistry;

use crate::actions::{Action, ActionReceipt};
use crate::dao::{GovernanceAuthority, Organization, VotingBackend};
use crate::dao::treasury::AssetDeposit;
use crate::executor::{ActionExecutor, ExecutionContext};
use crate::ledger::Ledger;
use crate::proposal::{Proposal, VoteChoice, VotingMode};
use crate::{GovernanceError, GovernanceResult};

/// Registry of organizations plus the native-currency ledger they
/// settle against.
pub struct OrganizationRegistry {
    orgs: RwLock<HashMap<OrgId, Organization>>,
    ledger: RwLock<Ledger>,
    tokens: Arc<TokenRegistry>,
}

impl OrganizationRegistry {
    pub fn new(tokens: Arc<TokenRegistry>) -> Self {
        Self {
            orgs: RwLock::new(HashMap::new()),
            ledger: RwLock::new(Ledger::new()),
            tokens,
        }
    }

    pub(crate) async fn register(&self, org: Organization) {
        let id = org.id().clone();
        self.orgs.write().await.insert(id.clone(), org);
        info!(org = %id, "organization registered");
    }

    /// Copy of the organization's current state.
    pub async fn get(&self, org: &OrgId) -> GovernanceResult<Organization> {
        self.orgs
            .read()
            .await
            .get(org)
            .cloned()
            .ok_or_else(|| GovernanceError::OrganizationNotFound(org.clone()))
    }

    pub async fn contains(&self, org: &OrgId) -> bool {
        self.orgs.read().await.contains_key(org)
    }

    pub async fn is_member(&self, org: &OrgId, account: &AccountId) -> GovernanceResult<bool> {
        Ok(self.get(org).await?.is_member(account))
    }

    /// Introduce native funds into circulation on `account`.
    pub async fn credit_account(&self, account: &AccountId, amount: Amount) {
        self.ledger.write().await.credit(account, amount);
    }

    /// Native-currency balance of any account, organizations included.
    pub async fn native_balance(&self, account: &AccountId) -> Amount {
        self.ledger.read().await.balance(account)
    }

    /// Deposit native currency into an organization's treasury, recorded
    /// against the caller.
    pub async fn deposit_native(
        &self,
        org_id: &OrgId,
        caller: &AccountId,
        amount: Amount,
        now: Timestamp,
    ) -> GovernanceResult<()> {
        let mut orgs = self.orgs.write().await;
        let org = orgs
            .get_mut(org_id)
            .ok_or_else(|| GovernanceError::OrganizationNotFound(org_id.clone()))?;
        self.ledger
            .write()
            .await
            .transfer(caller, &org_id.treasury_account(), amount)?;
        org.record_native_deposit(caller, amount, now);
        info!(org = %org_id, depositor = %caller, amount, "native deposit");
        Ok(())
    }

    /// Deposit asset tokens into an organization's treasury. The caller
    /// must have approved the organization's treasury account for at
    /// least `amount` beforehand.
    pub async fn deposit_asset(
        &self,
        org_id: &OrgId,
        caller: &AccountId,
        token: &TokenId,
        amount: Amount,
        now: Timestamp,
    ) -> GovernanceResult<()> {
        let mut orgs = self.orgs.write().await;
        let org = orgs
            .get_mut(org_id)
            .ok_or_else(|| GovernanceError::OrganizationNotFound(org_id.clone()))?;
        let treasury_account = org_id.treasury_account();
        self.tokens
            .transfer_from(token, &treasury_account, caller, &treasury_account, amount, now)
            .await?;
        org.record_asset_deposit(caller, token, amount, now);
        info!(org = %org_id, depositor = %caller, %token, amount, "asset deposit");
        Ok(())
    }

    /// Native treasury balance recorded for `who` at `org`.
    pub async fn treasury_balance(
        &self,
        org: &OrgId,
        who: &AccountId,
    ) -> GovernanceResult<Amount> {
        Ok(self.get(org).await?.treasury().native_balance(who))
    }

    /// Asset treasury balance recorded for `who` at `org`.
    pub async fn asset_balance(
        &self,
        org: &OrgId,
        who: &AccountId,
        token: &TokenId,
    ) -> GovernanceResult<Amount> {
        Ok(self.get(org).await?.treasury().asset_balance(who, token))
    }

    /// Asset deposit history recorded for `who` at `org`.
    pub async fn asset_deposits(
        &self,
        org: &OrgId,
        who: &AccountId,
        token: &TokenId,
    ) -> GovernanceResult<Vec<AssetDeposit>> {
        Ok(self
            .get(org)
            .await?
            .treasury()
            .asset_deposits(who, token)
            .to_vec())
    }

    /// Total still-available holdings of `org` in `token` across
    /// all depositors.
    pub async fn total_asset_holdings(
        &self,
        org: &OrgId,
        token: &TokenId,
    ) -> GovernanceResult<Amount> {
        Ok(self.get(org).await?.treasury().total_asset_holdings(token))
    }

    /// Run an action batch against registry state, all-or-nothing.
    ///
    /// State is snapshotted up front; if any action fails, organizations,
    /// ledger, and tokens are restored and the error propagated.
    pub(crate) async fn dispatch_batch(
        &self,
        origin: &OrgId,
        batch: &[Action],
        now: Timestamp,
    ) -> GovernanceResult<Vec<ActionReceipt>> {
        let mut orgs = self.orgs.write().await;
        let authority = {
            let org = orgs
                .get(origin)
                .ok_or_else(|| GovernanceError::OrganizationNotFound(origin.clone()))?;
            GovernanceAuthority::for_executor(org.authorized_executor())
        };
        let mut ledger = self.ledger.write().await;

        let orgs_snapshot = orgs.clone();
        let ledger_snapshot = ledger.clone();
        let tokens_snapshot = self.tokens.snapshot().await;

        let mut ctx = ExecutionContext {
            orgs: &mut orgs,
            ledger: &mut ledger,
            tokens: &self.tokens,
            authority,
            origin: origin.clone(),
            now,
        };
        match ActionExecutor::execute(&mut ctx, batch).await {
            Ok(receipts) => {
                info!(org = %origin, actions = batch.len(), "batch executed");
                Ok(receipts)
            }
            Err(err) => {
                *orgs = orgs_snapshot;
                *ledger = ledger_snapshot;
                self.tokens.restore(tokens_snapshot).await;
                warn!(org = %origin, %err, "batch failed, state rolled back");
                Err(err)
            }
        }
    }
}

/// Gatekeeper and registry for proposals: the only way proposals are
/// created, voted on, and executed.
pub struct ProposalRegistry {
    proposals: RwLock<HashMap<ProposalId, Proposal>>,
    orgs: Arc<OrganizationRegistry>,
    voting: Arc<dyn VotingPowerSource>,
}

impl ProposalRegistry {
    /// Wire a registry to its organizations and the token-backed
    /// voting-power oracle.
    pub fn new(orgs: Arc<OrganizationRegistry>, tokens: Arc<TokenRegistry>) -> Self {
        Self {
            proposals: RwLock::new(HashMap::new()),
            orgs,
            voting: tokens,
        }
    }

    /// Wire a registry to a custom voting-power oracle.
    pub fn with_voting_source(
        orgs: Arc<OrganizationRegistry>,
        voting: Arc<dyn VotingPowerSource>,
    ) -> Self {
        Self {
            proposals: RwLock::new(HashMap::new()),
            orgs,
            voting,
        }
    }

    /// Create a proposal against `org_id`.
    ///
    /// Creation is gated by the organization's proposal policy: a minimum
    /// current token holding when token-gated, membership otherwise. An
    /// empty action batch is accepted as an informational proposal.
    #[allow(clippy::too_many_arguments)]
    pub async fn create_proposal(
        &self,
        caller: &AccountId,
        org_id: &OrgId,
        title: &str,
        description: &str,
        voting_mode: VotingMode,
        start_time: Timestamp,
        duration: u64,
        action_batch_id: u64,
        actions: Vec<Action>,
        now: Timestamp,
    ) -> GovernanceResult<ProposalId> {
        let org = self.orgs.get(org_id).await?;

        if title.is_empty() {
            return Err(GovernanceError::InvalidProposal(
                "title cannot be empty".to_string(),
            ));
        }
        if description.is_empty() {
            return Err(GovernanceError::InvalidProposal(
                "description cannot be empty".to_string(),
            ));
        }
        if duration == 0 {
            return Err(GovernanceError::InvalidProposal(
                "duration must be positive".to_string(),
            ));
        }
        if voting_mode == VotingMode::TokenWeighted
            && !matches!(org.voting_backend(), VotingBackend::Token(_))
        {
            return Err(GovernanceError::InvalidProposal(
                "organization has no voting token".to_string(),
            ));
        }

        let policy = org.proposal_policy();
        match (policy.token_gated, org.voting_backend()) {
            (true, VotingBackend::Token(token)) => {
                let power = self.voting.current_voting_power(token, caller).await?;
                if power < policy.minimum_holding {
                    return Err(GovernanceError::Unauthorized(format!(
                        "voting power {} is below the minimum holding {}",
                        power, policy.minimum_holding
                    )));
                }
            }
            _ => {
                if !org.is_member(caller) {
                    return Err(GovernanceError::Unauthorized(format!(
                        "{} is not a member of {}",
                        caller, org_id
                    )));
                }
            }
        }

        let id = ProposalId::generate();
        let proposal = Proposal::new(
            id.clone(),
            org_id.clone(),
            title.to_string(),
            description.to_string(),
            caller.clone(),
            voting_mode,
            start_time,
            duration,
            action_batch_id,
            actions,
            now,
        );
        info!(proposal = %id, org = %org_id, title, "proposal created");
        self.proposals.write().await.insert(id.clone(), proposal);
        Ok(id)
    }

    /// Cast `caller`'s vote on a proposal.
    pub async fn vote(
        &self,
        caller: &AccountId,
        proposal_id: &ProposalId,
        choice: VoteChoice,
        now: Timestamp,
    ) -> GovernanceResult<()> {
        let (org_id, mode, start_time) = {
            let proposals = self.proposals.read().await;
            let proposal = proposals
                .get(proposal_id)
                .ok_or_else(|| GovernanceError::ProposalNotFound(proposal_id.clone()))?;
            (
                proposal.org().clone(),
                proposal.voting_mode(),
                proposal.start_time(),
            )
        };

        let org = self.orgs.get(&org_id).await?;
        let settings = org.governance_settings().clone();
        let (weight, total_possible) = match mode {
            VotingMode::MemberCount => {
                if !org.is_member(caller) {
                    return Err(GovernanceError::Unauthorized(format!(
                        "{} is not a member of {}",
                        caller, org_id
                    )));
                }
                (1, org.member_count() as Amount)
            }
            VotingMode::TokenWeighted => {
                let token = match org.voting_backend() {
                    VotingBackend::Token(token) => token.clone(),
                    VotingBackend::Membership => {
                        return Err(GovernanceError::InvalidProposal(
                            "organization has no voting token".to_string(),
                        ))
                    }
                };
                // Snapshot semantics: weight is read as of the proposal's
                // start time, so transfers and delegations after creation
                // do not count.
                let weight = self.voting.voting_power_at(&token, caller, start_time).await?;
                let total = self
                    .voting
                    .total_voting_power_at(&token, start_time)
                    .await?;
                (weight, total)
            }
        };

        let mut proposals = self.proposals.write().await;
        let proposal = proposals
            .get_mut(proposal_id)
            .ok_or_else(|| GovernanceError::ProposalNotFound(proposal_id.clone()))?;
        proposal.register_vote(caller.clone(), choice, weight, total_possible, &settings, now)
    }

    /// Execute an approved proposal's action batch.
    ///
    /// The executed flag is committed before dispatch and rolled back if
    /// the batch fails, so a failed execution can be retried.
    pub async fn execute(
        &self,
        caller: &AccountId,
        proposal_id: &ProposalId,
        now: Timestamp,
    ) -> GovernanceResult<Vec<ActionReceipt>> {
        let (org_id, batch) = {
            let mut proposals = self.proposals.write().await;
            let proposal = proposals
                .get_mut(proposal_id)
                .ok_or_else(|| GovernanceError::ProposalNotFound(proposal_id.clone()))?;
            proposal.begin_execution()?;
            (proposal.org().clone(), proposal.actions().to_vec())
        };

        let outcome = self.orgs.dispatch_batch(&org_id, &batch, now).await;

        let mut proposals = self.proposals.write().await;
        let proposal = proposals
            .get_mut(proposal_id)
            .ok_or_else(|| GovernanceError::ProposalNotFound(proposal_id.clone()))?;
        match outcome {
            Ok(receipts) => {
                proposal.confirm_execution(now);
                info!(proposal = %proposal_id, org = %org_id, executor = %caller, "proposal executed");
                Ok(receipts)
            }
            Err(err) => {
                proposal.abort_execution();
                Err(err)
            }
        }
    }

    /// Copy of a proposal's current state.
    pub async fn get(&self, proposal_id: &ProposalId) -> GovernanceResult<Proposal> {
        self.proposals
            .read()
            .await
            .get(proposal_id)
            .cloned()
            .ok_or_else(|| GovernanceError::ProposalNotFound(proposal_id.clone()))
    }

    /// All proposals, newest first.
    pub async fn list(&self) -> Vec<Proposal> {
        let mut result: Vec<Proposal> = self.proposals.read().await.values().cloned().collect();
        result.sort_by(|a, b| b.created_at().cmp(&a.created_at()));
        result
    }

    /// Proposals bound to `org`, newest first.
    pub async fn list_for_org(&self, org: &OrgId) -> Vec<Proposal> {
        let mut result: Vec<Proposal> = self
            .proposals
            .read()
            .await
            .values()
            .filter(|proposal| proposal.org() == org)
            .cloned()
            .collect();
        result.sort_by(|a, b| b.created_at().cmp(&a.created_at()));
        result
    }

    /// Whether the proposal's outcome is already mathematically decided.
    pub async fn early_execution(&self, proposal_id: &ProposalId) -> GovernanceResult<bool> {
        let proposal = self.get(proposal_id).await?;
        let org = self.orgs.get(proposal.org()).await?;
        let total_possible = match proposal.voting_mode() {
            VotingMode::MemberCount => org.member_count() as Amount,
            VotingMode::TokenWeighted => match org.voting_backend() {
                VotingBackend::Token(token) => {
                    self.voting
                        .total_voting_power_at(token, proposal.start_time())
                        .await?
                }
                VotingBackend::Membership => 0,
            },
        };
        Ok(proposal.early_execution(total_possible))
    }
}
