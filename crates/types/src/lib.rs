// Path: crates/types/src/lib.rs
#![forbid(unsafe_code)]
#![deny(missing_docs)]
#![cfg_attr(
    not(test),
    deny(
        clippy::unwrap_used,
        clippy::expect_used,
        clippy::panic,
        clippy::unimplemented,
        clippy::todo,
        clippy::indexing_slicing
    )
)]

//! # Ledger Client Types
//!
//! This crate is the foundational library for the ledger client workspace, containing
//! the data model exchanged with a ledger network, the endorsement payload decoder,
//! client configuration and the error taxonomy.
//!
//! ## Architectural Role
//!
//! As the base crate, `ledger-types` has minimal dependencies and is itself a
//! dependency for every other crate in the workspace. It knows nothing about
//! connections or I/O; `ledger-client` builds the façade on top of it.

/// The maximum size in bytes of a single endorsement payload accepted by the decoder.
pub const MAX_PAYLOAD_BYTES: usize = 4 * 1024 * 1024; // 4 MiB

/// A top-level, crate-wide `Result` type alias with a default error type.
pub type Result<T, E = crate::error::LedgerError> = std::result::Result<T, E>;

/// Ledger data structures: transactions, endorsements, query results and history entries.
pub mod app;
/// The endorsement payload decoder and the `DecodedValue` model.
pub mod codec;
/// Client configuration (`ClientConfig`, `EndorsementPolicy`, `CallOptions`).
pub mod config;
/// The error taxonomy shared by every crate of the workspace.
pub mod error;
