//! Core types shared across the cairn workspace.
//!
//! Errors are explicit and typed; nothing in here panics.

#![forbid(clippy::unwrap_used)]
#![deny(clippy::expect_used)]
#![forbid(clippy::panic)]

pub mod error;
pub mod result;

pub use error::Error;
pub use result::{Result, ResultExt};
