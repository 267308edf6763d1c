#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]
#![deny(clippy::panic)]

//! # cairn
//!
//! Command-line driver for the reconciliation ledger. Loads a declared
//! cluster, runs one pass with the built-in generation steps and keeps the
//! resulting status on disk so the next pass can measure drift against it.

pub mod cli;
pub mod commands;
pub mod config;
pub mod steps;
pub mod store;

pub use config::CairnConfig;
pub use store::FileStatusStore;
