//! Atomic, ordered dispatch of action batches
//!
//! The executor is a pure dispatch primitive: it walks a batch in order,
//! forwards each action's value and payload to its target, and stops at
//! the first failure. It carries no authorization logic of its own; the
//! privileged organization mutators check the [`GovernanceAuthority`]
//! handed to the executor by the proposal-execution path. All-or-nothing
//! semantics are the caller's: registry state is snapshotted before the
//! batch and restored if any entry fails.

use std::collections::HashMap;
use tracing::debug;

use agora_core::{AccountId, AssetTransfers, OrgId, Timestamp};
use agora_token::TokenRegistry;

use crate::actions::{Action, ActionReceipt, ActionTarget, OrgCall, TokenCall};
use crate::dao::{GovernanceAuthority, Organization};
use crate::ledger::Ledger;
use crate::{GovernanceError, GovernanceResult};

/// Mutable view of the engine state an action batch may touch.
pub(crate) struct ExecutionContext<'a> {
    /// All registered organizations
    pub orgs: &'a mut HashMap<OrgId, Organization>,
    /// The native-currency ledger
    pub ledger: &'a mut Ledger,
    /// The token registry
    pub tokens: &'a TokenRegistry,
    /// Capability minted for the executing organization
    pub authority: GovernanceAuthority,
    /// The organization whose proposal is being executed
    pub origin: OrgId,
    /// Clock value supplied to the executing call
    pub now: Timestamp,
}

/// Stateless batch dispatcher.
pub struct ActionExecutor;

impl ActionExecutor {
    /// Execute every action in batch order, returning per-action receipts.
    /// Fails with `BatchExecutionFailed` at the first failing entry; the
    /// caller rolls the state back.
    pub(crate) async fn execute(
        ctx: &mut ExecutionContext<'_>,
        batch: &[Action],
    ) -> GovernanceResult<Vec<ActionReceipt>> {
        let mut receipts = Vec::with_capacity(batch.len());
        for (index, action) in batch.iter().enumerate() {
            let output = Self::dispatch(ctx, action).await.map_err(|e| {
                GovernanceError::BatchExecutionFailed {
                    index,
                    reason: e.to_string(),
                }
            })?;
            debug!(origin = %ctx.origin, index, "action dispatched");
            receipts.push(ActionReceipt { index, output });
        }
        Ok(receipts)
    }

    async fn dispatch(
        ctx: &mut ExecutionContext<'_>,
        action: &Action,
    ) -> GovernanceResult<Vec<u8>> {
        if action.value > 0 {
            let recipient = Self::value_recipient(&action.target)?;
            let source = ctx.origin.treasury_account();
            ctx.ledger.transfer(&source, &recipient, action.value)?;
        }
        match &action.target {
            ActionTarget::Organization(org_id) => {
                let call = OrgCall::decode(&action.payload)?;
                Self::apply_org_call(ctx, org_id, call).await
            }
            ActionTarget::Token(token_id) => {
                let call = TokenCall::decode(&action.payload)?;
                let origin_account = ctx.origin.treasury_account();
                match call {
                    TokenCall::Mint { to, amount } => {
                        ctx.tokens
                            .mint(token_id, &origin_account, &to, amount, ctx.now)
                            .await?;
                    }
                    TokenCall::Transfer { to, amount } => {
                        ctx.tokens
                            .transfer(token_id, &origin_account, &to, amount, ctx.now)
                            .await?;
                    }
                }
                Ok(Vec::new())
            }
            ActionTarget::Account(_) => {
                if !action.payload.is_empty() {
                    return Err(GovernanceError::InvalidAction(
                        "plain accounts accept only empty payloads".to_string(),
                    ));
                }
                Ok(Vec::new())
            }
        }
    }

    fn value_recipient(target: &ActionTarget) -> GovernanceResult<AccountId> {
        match target {
            ActionTarget::Organization(org) => Ok(org.treasury_account()),
            ActionTarget::Account(account) => Ok(account.clone()),
            ActionTarget::Token(_) => Err(GovernanceError::InvalidAction(
                "tokens cannot receive native value".to_string(),
            )),
        }
    }

    async fn apply_org_call(
        ctx: &mut ExecutionContext<'_>,
        org_id: &OrgId,
        call: OrgCall,
    ) -> GovernanceResult<Vec<u8>> {
        let org = ctx
            .orgs
            .get_mut(org_id)
            .ok_or_else(|| GovernanceError::OrganizationNotFound(org_id.clone()))?;
        match call {
            OrgCall::UpdateSettings(settings) => {
                org.update_settings(&ctx.authority, settings)?;
            }
            OrgCall::AddMembers(members) => {
                org.add_members(&ctx.authority, members)?;
            }
            OrgCall::RemoveMembers(accounts) => {
                org.remove_members(&ctx.authority, accounts)?;
            }
            OrgCall::UpdateProposalPolicy(policy) => {
                org.update_proposal_policy(&ctx.authority, policy)?;
            }
            OrgCall::WithdrawNative { from, to, amount } => {
                org.withdraw_native(&ctx.authority, &from, amount)?;
                let source = org_id.treasury_account();
                ctx.ledger.transfer(&source, &to, amount)?;
            }
            OrgCall::WithdrawAsset {
                token,
                from,
                to,
                amount,
            } => {
                org.withdraw_asset(&ctx.authority, &from, &token, amount)?;
                let source = org_id.treasury_account();
                ctx.tokens
                    .transfer(&token, &source, &to, amount, ctx.now)
                    .await?;
            }
        }
        Ok(Vec::new())
    }
}
