#![doc = include_str!("../README.md")]
//!
//! # Module Structure
//!
//! - [`error`]: Domain error types (`FirewallError`)
//! - [`client`]: Firewall command abstraction (`FirewallClient` trait and implementations)
//! - [`executor`]: Idempotent enforcement (`ActionExecutor`, `BlockedSet`)

pub mod client;
pub mod error;
pub mod executor;

// --- Public API Re-exports ---

pub use client::{DryRunClient, FirewallClient, IptablesClient, SystemFirewall};
pub use error::FirewallError;
pub use executor::{ActionExecutor, BlockedSet, EnforceOutcome};
