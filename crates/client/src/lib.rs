// Path: crates/client/src/lib.rs
//! # Ledger Client Crate Lints
//!
//! This crate enforces a strict set of lints to ensure high-quality,
//! panic-free, and well-documented code. Panics are disallowed in non-test
//! code to promote robust error handling.
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

//! # Ledger Client
//!
//! A façade over a permissioned ledger network: it owns the connection lifecycle,
//! builds invoke/query requests, reconciles the answers of multiple endorsing peers
//! and orders the history of a key.

pub mod aggregator;
pub mod history;
pub mod ledger_client;
pub mod memory;
pub mod network;

// Re-export for convenience
pub use aggregator::aggregate;
pub use history::{History, Reconstructor};
pub use ledger_client::{ClientState, LedgerClient};
pub use memory::{HistoryDelivery, MemoryNetwork, PeerFault};
pub use network::{LedgerConnection, LedgerNetwork};
