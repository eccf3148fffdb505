//! `replenish-core`: shared building blocks for the restocking engine.
//!
//! This crate contains **pure** primitives (no IO, no infrastructure concerns).

pub mod error;
pub mod id;

pub use error::{DomainError, DomainResult};
pub use id::{ProductId, RunId};
