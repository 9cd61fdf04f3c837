use std::sync::Arc;

use agora::core::{AccountId, OrgId, TokenId};
use agora::governance::{
    Action, GovernanceError, GovernanceSettings, Member, OrgCall, OrgSettings,
    OrganizationFactory, OrganizationRegistry, ProposalPolicy, ProposalRegistry, VoteChoice,
    VotingMode,
};
use agora::token::{TokenParams, TokenRegistry};

const START: u64 = 1_000;
const DURATION: u64 = 3_600;

fn account(name: &str) -> AccountId {
    AccountId::new(name)
}

fn setup() -> (
    Arc<TokenRegistry>,
    Arc<OrganizationRegistry>,
    ProposalRegistry,
    OrganizationFactory,
) {
    let tokens = Arc::new(TokenRegistry::new());
    let orgs = Arc::new(OrganizationRegistry::new(tokens.clone()));
    let proposals = ProposalRegistry::new(orgs.clone(), tokens.clone());
    let factory = OrganizationFactory::new(orgs.clone(), tokens.clone());
    (tokens, orgs, proposals, factory)
}

async fn create_org(factory: &OrganizationFactory) -> (OrgId, TokenId) {
    let (org, token) = factory
        .create_organization(
            OrgSettings {
                name: "treasury-dao".into(),
                data: Vec::new(),
            },
            None,
            Some(TokenParams {
                name: "Treasury Gov".into(),
                symbol: "TGOV".into(),
            }),
            GovernanceSettings {
                minimum_participation_percent: 45,
                support_threshold_percent: 60,
                early_execution: true,
            },
            vec![
                Member {
                    account: account("alice"),
                    deposit: 500,
                },
                Member {
                    account: account("bob"),
                    deposit: 200,
                },
                Member {
                    account: account("carol"),
                    deposit: 300,
                },
            ],
            ProposalPolicy {
                token_gated: true,
                minimum_holding: 10,
            },
            false,
            500,
        )
        .await
        .unwrap();
    (org, token.unwrap())
}

/// Create, approve with alice+carol, and return an executable proposal.
async fn approved_proposal(
    proposals: &ProposalRegistry,
    org: &OrgId,
    title: &str,
    actions: Vec<Action>,
) -> agora::core::ProposalId {
    let proposal = proposals
        .create_proposal(
            &account("alice"),
            org,
            title,
            title,
            VotingMode::TokenWeighted,
            START,
            DURATION,
            1,
            actions,
            START,
        )
        .await
        .unwrap();
    proposals
        .vote(&account("alice"), &proposal, VoteChoice::Yes, START + 1)
        .await
        .unwrap();
    proposals
        .vote(&account("carol"), &proposal, VoteChoice::Yes, START + 2)
        .await
        .unwrap();
    assert!(proposals.get(&proposal).await.unwrap().approved());
    proposal
}

#[tokio::test]
async fn native_deposits_are_recorded_per_depositor() {
    let (_tokens, orgs, _proposals, factory) = setup();
    let (org, _token) = create_org(&factory).await;

    orgs.credit_account(&account("alice"), 10_000).await;
    orgs.deposit_native(&org, &account("alice"), 1_000, START).await.unwrap();
    orgs.deposit_native(&org, &account("alice"), 500, START + 5).await.unwrap();

    assert_eq!(orgs.treasury_balance(&org, &account("alice")).await.unwrap(), 1_500);
    assert_eq!(orgs.treasury_balance(&org, &account("bob")).await.unwrap(), 0);
    assert_eq!(orgs.native_balance(&account("alice")).await, 8_500);
    assert_eq!(orgs.native_balance(&org.treasury_account()).await, 1_500);
}

#[tokio::test]
async fn native_deposit_requires_funds() {
    let (_tokens, orgs, _proposals, factory) = setup();
    let (org, _token) = create_org(&factory).await;

    let err = orgs
        .deposit_native(&org, &account("alice"), 1, START)
        .await
        .unwrap_err();
    assert!(matches!(err, GovernanceError::InsufficientBalance { .. }));
    assert_eq!(orgs.treasury_balance(&org, &account("alice")).await.unwrap(), 0);
}

#[tokio::test]
async fn native_withdrawal_flows_through_a_proposal() {
    let (_tokens, orgs, proposals, factory) = setup();
    let (org, _token) = create_org(&factory).await;

    orgs.credit_account(&account("alice"), 2_000).await;
    orgs.deposit_native(&org, &account("alice"), 1_000, 800).await.unwrap();

    let action = Action::org_call(
        org.clone(),
        &OrgCall::WithdrawNative {
            from: account("alice"),
            to: account("bob"),
            amount: 400,
        },
    );
    let proposal = approved_proposal(&proposals, &org, "Withdraw Funds", vec![action]).await;
    proposals
        .execute(&account("carol"), &proposal, START + 10)
        .await
        .unwrap();

    // Deposits minus withdrawals equals the recorded balance, and the
    // funds actually moved.
    assert_eq!(orgs.treasury_balance(&org, &account("alice")).await.unwrap(), 600);
    assert_eq!(orgs.native_balance(&account("bob")).await, 400);
    assert_eq!(orgs.native_balance(&org.treasury_account()).await, 600);
}

#[tokio::test]
async fn overdrawn_withdrawal_fails_and_rolls_back() {
    let (_tokens, orgs, proposals, factory) = setup();
    let (org, _token) = create_org(&factory).await;

    orgs.credit_account(&account("alice"), 2_000).await;
    orgs.deposit_native(&org, &account("alice"), 100, 800).await.unwrap();

    let action = Action::org_call(
        org.clone(),
        &OrgCall::WithdrawNative {
            from: account("alice"),
            to: account("bob"),
            amount: 101,
        },
    );
    let proposal = approved_proposal(&proposals, &org, "Overdraw", vec![action]).await;
    let err = proposals
        .execute(&account("alice"), &proposal, START + 10)
        .await
        .unwrap_err();
    assert!(matches!(err, GovernanceError::BatchExecutionFailed { index: 0, .. }));

    assert_eq!(orgs.treasury_balance(&org, &account("alice")).await.unwrap(), 100);
    assert_eq!(orgs.native_balance(&account("bob")).await, 0);
    // The failed batch left the proposal retryable.
    assert!(!proposals.get(&proposal).await.unwrap().executed());
}

#[tokio::test]
async fn failed_execution_can_be_retried_after_fixing_the_cause() {
    let (_tokens, orgs, proposals, factory) = setup();
    let (org, _token) = create_org(&factory).await;

    let action = Action::org_call(
        org.clone(),
        &OrgCall::WithdrawNative {
            from: account("alice"),
            to: account("bob"),
            amount: 400,
        },
    );
    let proposal = approved_proposal(&proposals, &org, "Withdraw Funds", vec![action]).await;

    // Nothing deposited yet: the batch fails and the executed flag rolls
    // back.
    let err = proposals
        .execute(&account("alice"), &proposal, START + 10)
        .await
        .unwrap_err();
    assert!(matches!(err, GovernanceError::BatchExecutionFailed { .. }));
    assert!(!proposals.get(&proposal).await.unwrap().executed());

    // After the depositor funds the treasury, the same proposal executes.
    orgs.credit_account(&account("alice"), 1_000).await;
    orgs.deposit_native(&org, &account("alice"), 500, START + 20).await.unwrap();
    proposals
        .execute(&account("alice"), &proposal, START + 30)
        .await
        .unwrap();

    assert!(proposals.get(&proposal).await.unwrap().executed());
    assert_eq!(orgs.native_balance(&account("bob")).await, 400);
}

#[tokio::test]
async fn asset_deposits_keep_an_append_only_history() {
    let (tokens, orgs, _proposals, factory) = setup();
    let (org, token) = create_org(&factory).await;

    // Pre-authorize the organization's treasury account, then deposit.
    tokens
        .approve(&token, &account("alice"), &org.treasury_account(), 5)
        .await
        .unwrap();
    orgs.deposit_asset(&org, &account("alice"), &token, 3, START).await.unwrap();
    orgs.deposit_asset(&org, &account("alice"), &token, 2, START + 5).await.unwrap();

    let history = orgs
        .asset_deposits(&org, &account("alice"), &token)
        .await
        .unwrap();
    assert_eq!(history.len(), 2);
    assert_eq!(history[0].amount, 3);
    assert_eq!(history[1].amount, 2);
    assert_eq!(orgs.asset_balance(&org, &account("alice"), &token).await.unwrap(), 5);
    assert_eq!(tokens.balance_of(&token, &org.treasury_account()).await.unwrap(), 5);
    assert_eq!(tokens.balance_of(&token, &account("alice")).await.unwrap(), 495);
}

#[tokio::test]
async fn asset_deposit_requires_prior_approval() {
    let (_tokens, orgs, _proposals, factory) = setup();
    let (org, token) = create_org(&factory).await;

    let err = orgs
        .deposit_asset(&org, &account("alice"), &token, 3, START)
        .await
        .unwrap_err();
    assert!(matches!(err, GovernanceError::Asset(_)));
    assert_eq!(orgs.asset_balance(&org, &account("alice"), &token).await.unwrap(), 0);
}

#[tokio::test]
async fn asset_withdrawal_flows_through_a_proposal() {
    let (tokens, orgs, proposals, factory) = setup();
    let (org, token) = create_org(&factory).await;

    tokens
        .approve(&token, &account("alice"), &org.treasury_account(), 5)
        .await
        .unwrap();
    orgs.deposit_asset(&org, &account("alice"), &token, 5, 800).await.unwrap();

    let action = Action::org_call(
        org.clone(),
        &OrgCall::WithdrawAsset {
            token: token.clone(),
            from: account("alice"),
            to: account("bob"),
            amount: 2,
        },
    );
    let proposal = approved_proposal(&proposals, &org, "Withdraw Tokens", vec![action]).await;
    proposals
        .execute(&account("carol"), &proposal, START + 10)
        .await
        .unwrap();

    assert_eq!(orgs.asset_balance(&org, &account("alice"), &token).await.unwrap(), 3);
    assert_eq!(orgs.total_asset_holdings(&org, &token).await.unwrap(), 3);
    assert_eq!(tokens.balance_of(&token, &account("bob")).await.unwrap(), 202);
    // The audit history never shrinks.
    assert_eq!(
        orgs.asset_deposits(&org, &account("alice"), &token)
            .await
            .unwrap()
            .len(),
        1
    );
}

#[tokio::test]
async fn asset_withdrawal_is_capped_by_recorded_deposits() {
    let (tokens, orgs, proposals, factory) = setup();
    let (org, token) = create_org(&factory).await;

    tokens
        .approve(&token, &account("alice"), &org.treasury_account(), 5)
        .await
        .unwrap();
    tokens
        .approve(&token, &account("bob"), &org.treasury_account(), 5)
        .await
        .unwrap();
    orgs.deposit_asset(&org, &account("alice"), &token, 5, 800).await.unwrap();
    orgs.deposit_asset(&org, &account("bob"), &token, 5, 800).await.unwrap();

    // Bob's record is 5 even though the organization holds 10 in total.
    let action = Action::org_call(
        org.clone(),
        &OrgCall::WithdrawAsset {
            token: token.clone(),
            from: account("bob"),
            to: account("bob"),
            amount: 6,
        },
    );
    let proposal = approved_proposal(&proposals, &org, "Overdraw Tokens", vec![action]).await;
    let err = proposals
        .execute(&account("alice"), &proposal, START + 10)
        .await
        .unwrap_err();
    assert!(matches!(err, GovernanceError::BatchExecutionFailed { .. }));
    assert_eq!(orgs.asset_balance(&org, &account("bob"), &token).await.unwrap(), 5);
    assert_eq!(orgs.total_asset_holdings(&org, &token).await.unwrap(), 10);
}
