//! Agora
//!
//! A decentralized-autonomy engine: organizations that hold shared funds,
//! admit members, and change their own rules and membership only through
//! proposals that are voted on and then executed as an atomic batch of
//! actions.

/// Module version information
pub mod version {
    /// The current version of the Agora library
    pub const VERSION: &str = env!("CARGO_PKG_VERSION");
}

/// Re-export core components for easy access
pub use agora_core as core;

/// Re-export the governance engine
pub use agora_governance as governance;

/// Re-export the voting-weight token
pub use agora_token as token;
