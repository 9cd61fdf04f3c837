//! Voting-weight token for the Agora engine
//!
//! A governance token with balances, allowances, vote delegation, and
//! time-indexed checkpoints of per-delegate voting power and total supply.
//! The checkpoints are what make proposal-start snapshot queries possible:
//! weight moved after a proposal's start time does not count on it.

pub mod registry;
pub mod token;

pub use registry::{TokenRegistry, TokenRegistrySnapshot};
pub use token::{GovernanceToken, TokenParams};
