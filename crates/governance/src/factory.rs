//! Organization creation
//!
//! The factory is the only legitimate path to a new organization. It
//! deploys the organization's voting token when none is supplied, wires
//! the organization into the shared registries, and does all of it
//! atomically: validation happens before any side effect, so a partially
//! created organization is never observable.

use std::sync::Arc;
use tracing::info;

use agora_core::{AccountId, Amount, OrgId, Timestamp, TokenId};
use agora_token::{TokenParams, TokenRegistry};

use crate::dao::{
    GovernanceSettings, Member, OrgSettings, Organization, ProposalPolicy, VotingBackend,
};
use crate::registry::OrganizationRegistry;
use crate::{GovernanceError, GovernanceResult};

/// Factory creating organizations together with their voting tokens.
pub struct OrganizationFactory {
    orgs: Arc<OrganizationRegistry>,
    tokens: Arc<TokenRegistry>,
}

impl OrganizationFactory {
    pub fn new(orgs: Arc<OrganizationRegistry>, tokens: Arc<TokenRegistry>) -> Self {
        Self { orgs, tokens }
    }

    /// Create an organization.
    ///
    /// In token mode, `existing_token` binds the organization to a
    /// pre-existing voting token; otherwise a new token is deployed from
    /// `token_params`, seeding balances from `initial_members` and owned
    /// by the organization's treasury account. The returned token handle
    /// is present only when a token was deployed here.
    #[allow(clippy::too_many_arguments)]
    pub async fn create_organization(
        &self,
        settings: OrgSettings,
        existing_token: Option<TokenId>,
        token_params: Option<TokenParams>,
        governance_settings: GovernanceSettings,
        initial_members: Vec<Member>,
        proposal_policy: ProposalPolicy,
        membership_mode: bool,
        now: Timestamp,
    ) -> GovernanceResult<(OrgId, Option<TokenId>)> {
        if settings.name.is_empty() {
            return Err(GovernanceError::InvalidOrganization(
                "name cannot be empty".to_string(),
            ));
        }

        if membership_mode {
            if existing_token.is_some() {
                return Err(GovernanceError::InvalidOrganization(
                    "membership-mode organizations take no voting token".to_string(),
                ));
            }
            let org_id = OrgId::generate();
            let org = Organization::new(
                org_id.clone(),
                settings,
                VotingBackend::Membership,
                initial_members,
                governance_settings,
                proposal_policy,
                now,
            );
            self.orgs.register(org).await;
            info!(org = %org_id, "membership-mode organization created");
            return Ok((org_id, None));
        }

        let org_id = OrgId::generate();
        let (token_id, deployed) = match existing_token {
            Some(token_id) => {
                if !self.tokens.contains(&token_id).await {
                    return Err(GovernanceError::InvalidOrganization(format!(
                        "unknown voting token: {}",
                        token_id
                    )));
                }
                (token_id, false)
            }
            None => {
                let params = token_params.ok_or_else(|| {
                    GovernanceError::InvalidOrganization(
                        "token parameters required to deploy a voting token".to_string(),
                    )
                })?;
                let seed: Vec<(AccountId, Amount)> = initial_members
                    .iter()
                    .map(|member| (member.account.clone(), member.deposit))
                    .collect();
                let token_id = self
                    .tokens
                    .create_token(params, org_id.treasury_account(), &seed, now)
                    .await;
                (token_id, true)
            }
        };

        let org = Organization::new(
            org_id.clone(),
            settings,
            VotingBackend::Token(token_id.clone()),
            initial_members,
            governance_settings,
            proposal_policy,
            now,
        );
        self.orgs.register(org).await;
        info!(org = %org_id, token = %token_id, "token-mode organization created");
        Ok((org_id, deployed.then_some(token_id)))
    }
}
