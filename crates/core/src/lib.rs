//! Core types for the Agora engine
//!
//! This crate holds the identifier newtypes, the amount/timestamp aliases,
//! and the trait seams shared between the governance engine and its
//! collaborators (voting-power oracle, asset transfers).

pub mod interfaces;
pub mod types;

pub use interfaces::{AssetError, AssetResult, AssetTransfers, VotingPowerSource};
pub use types::{AccountId, Amount, OrgId, ProposalId, Timestamp, TokenId};
