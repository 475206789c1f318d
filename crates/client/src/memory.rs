// Path: crates/client/src/memory.rs

//! An in-process ledger network for the demo binary and for tests.
//!
//! It keeps a key-value world state with version history per (channel, contract) and
//! understands a handful of built-in functions: `put`/`set` (`[key, value]`),
//! `delete` (`[key]`) and `get`/`query` (`[key]`). Faults can be injected to exercise
//! the client's failure paths.

use crate::network::{LedgerConnection, LedgerNetwork};
use async_trait::async_trait;
use dashmap::DashMap;
use ledger_types::app::{
    EndorsementResponse, HistoryEntry, HistoryRequest, PeerId, QueryRequest,
    SubmissionOutcome, Transaction, TransactionResult, TxId,
};
use ledger_types::config::ConnectionProfile;
use ledger_types::error::LedgerError;
use parking_lot::RwLock;
use rand::seq::SliceRandom;
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

/// Overrides how one peer answers queries.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PeerFault {
    /// Answer with these payload bytes instead of the world state.
    Payload(Vec<u8>),
    /// Answer with a failure status and message.
    Status(u16, String),
    /// Do not answer at all.
    Silent,
}

/// How history entries are handed back to the client.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum HistoryDelivery {
    /// In commit order.
    #[default]
    Ordered,
    /// In random order.
    Shuffled,
    /// Every entry twice, in random order.
    ShuffledWithDuplicates,
}

#[derive(Debug, Default)]
struct ContractState {
    world: BTreeMap<String, Vec<u8>>,
    history: BTreeMap<String, Vec<HistoryEntry>>,
    next_position: i64,
}

impl ContractState {
    fn record(&mut self, key: &str, tx_id: &TxId, snapshot: Vec<u8>, is_delete: bool) {
        let entry = HistoryEntry {
            tx_id: tx_id.clone(),
            snapshot,
            position: self.next_position,
            timestamp: now_secs(),
            is_delete,
        };
        self.next_position += 1;
        self.history.entry(key.to_string()).or_default().push(entry);
    }

    fn apply(&mut self, tx: &Transaction, tx_id: &TxId) -> SubmissionOutcome {
        match (tx.function.as_str(), tx.args.as_slice()) {
            ("put" | "set", [key, value]) => match std::str::from_utf8(key) {
                Ok(key) => {
                    self.world.insert(key.to_string(), value.clone());
                    self.record(key, tx_id, value.clone(), false);
                    SubmissionOutcome::Success
                }
                Err(_) => SubmissionOutcome::Rejected("key is not valid UTF-8".to_string()),
            },
            ("delete", [key]) => match std::str::from_utf8(key) {
                Ok(key) => {
                    self.world.remove(key);
                    self.record(key, tx_id, Vec::new(), true);
                    SubmissionOutcome::Success
                }
                Err(_) => SubmissionOutcome::Rejected("key is not valid UTF-8".to_string()),
            },
            ("put" | "set" | "delete", args) => SubmissionOutcome::Rejected(format!(
                "'{}' does not accept {} arguments",
                tx.function,
                args.len()
            )),
            (function, _) => SubmissionOutcome::Rejected(format!("unknown function '{}'", function)),
        }
    }

    fn evaluate(&self, function: &str, args: &[Vec<u8>]) -> Result<Vec<u8>, String> {
        match (function, args) {
            ("get" | "query", [key]) => {
                let key = std::str::from_utf8(key).map_err(|_| "key is not valid UTF-8")?;
                Ok(self.world.get(key).cloned().unwrap_or_default())
            }
            ("get" | "query", args) => Err(format!(
                "'{}' expects 1 argument, got {}",
                function,
                args.len()
            )),
            (function, _) => Err(format!("unknown function '{}'", function)),
        }
    }
}

#[derive(Debug, Default)]
struct Faults {
    unavailable: bool,
    peers: BTreeMap<PeerId, PeerFault>,
    submit_delay: Option<Duration>,
    query_delay: Option<Duration>,
    history: HistoryDelivery,
}

#[derive(Debug)]
struct Inner {
    peers: Vec<PeerId>,
    contracts: DashMap<(String, String), ContractState>,
    faults: RwLock<Faults>,
    open_connections: AtomicUsize,
    contacts: AtomicUsize,
}

/// A ledger network living entirely in this process. Clones share state.
#[derive(Debug, Clone)]
pub struct MemoryNetwork {
    inner: Arc<Inner>,
}

impl MemoryNetwork {
    /// Creates a network with the given endorsing peers and no contracts.
    pub fn new(peers: &[&str]) -> Self {
        Self {
            inner: Arc::new(Inner {
                peers: peers.iter().map(|p| PeerId::from(*p)).collect(),
                contracts: DashMap::new(),
                faults: RwLock::new(Faults::default()),
                open_connections: AtomicUsize::new(0),
                contacts: AtomicUsize::new(0),
            }),
        }
    }

    /// Makes `contract_id` available on `channel_id`. Instantiating twice keeps the
    /// existing state.
    pub fn instantiate(&self, channel_id: &str, contract_id: &str) {
        self.inner
            .contracts
            .entry((channel_id.to_string(), contract_id.to_string()))
            .or_default();
    }

    pub fn peers(&self) -> &[PeerId] {
        &self.inner.peers
    }

    /// While set, `connect` fails with `NetworkUnavailable`.
    pub fn set_unavailable(&self, unavailable: bool) {
        self.inner.faults.write().unavailable = unavailable;
    }

    /// Overrides (or with `None`, restores) how `peer` answers queries.
    pub fn set_peer_fault(&self, peer: &str, fault: Option<PeerFault>) {
        let mut faults = self.inner.faults.write();
        match fault {
            Some(fault) => faults.peers.insert(PeerId::from(peer), fault),
            None => faults.peers.remove(&PeerId::from(peer)),
        };
    }

    /// Delays the acknowledgement of every submission. The write itself is applied
    /// before the delay, as a real network may commit a transaction whose
    /// submitter has stopped waiting.
    pub fn set_submit_delay(&self, delay: Option<Duration>) {
        self.inner.faults.write().submit_delay = delay;
    }

    /// Delays every query and history answer.
    pub fn set_query_delay(&self, delay: Option<Duration>) {
        self.inner.faults.write().query_delay = delay;
    }

    pub fn set_history_delivery(&self, delivery: HistoryDelivery) {
        self.inner.faults.write().history = delivery;
    }

    /// Appends a raw entry to the history of `key`, bypassing the world state.
    pub fn inject_history_entry(
        &self,
        channel_id: &str,
        contract_id: &str,
        key: &str,
        entry: HistoryEntry,
    ) {
        self.inner
            .contracts
            .entry((channel_id.to_string(), contract_id.to_string()))
            .or_default()
            .history
            .entry(key.to_string())
            .or_default()
            .push(entry);
    }

    /// The number of connections opened and not yet released.
    pub fn open_connections(&self) -> usize {
        self.inner.open_connections.load(Ordering::SeqCst)
    }

    /// The number of requests of any kind the network has received.
    pub fn contacts(&self) -> usize {
        self.inner.contacts.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl LedgerNetwork for MemoryNetwork {
    async fn connect(
        &self,
        profile: &ConnectionProfile,
    ) -> Result<Arc<dyn LedgerConnection>, LedgerError> {
        self.inner.contacts.fetch_add(1, Ordering::SeqCst);
        if self.inner.faults.read().unavailable {
            return Err(LedgerError::NetworkUnavailable(format!(
                "{} is not reachable",
                profile.endpoint
            )));
        }
        self.inner.open_connections.fetch_add(1, Ordering::SeqCst);
        log::debug!(
            "Memory network accepted {}@{}",
            profile.identity.user,
            profile.identity.organization
        );
        Ok(Arc::new(MemoryConnection {
            inner: Arc::clone(&self.inner),
            released: AtomicBool::new(false),
        }))
    }
}

#[derive(Debug)]
struct MemoryConnection {
    inner: Arc<Inner>,
    released: AtomicBool,
}

impl MemoryConnection {
    fn contact(&self) -> Result<(), LedgerError> {
        self.inner.contacts.fetch_add(1, Ordering::SeqCst);
        if self.released.load(Ordering::SeqCst) {
            return Err(LedgerError::Network("connection has been released".to_string()));
        }
        Ok(())
    }

    async fn query_delay(&self) {
        let delay = self.inner.faults.read().query_delay;
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
    }
}

fn key(channel_id: &str, contract_id: &str) -> (String, String) {
    (channel_id.to_string(), contract_id.to_string())
}

fn not_instantiated(channel_id: &str, contract_id: &str) -> LedgerError {
    LedgerError::Network(format!(
        "contract '{}' is not instantiated on channel '{}'",
        contract_id, channel_id
    ))
}

fn new_tx_id() -> TxId {
    TxId(uuid::Uuid::new_v4().simple().to_string())
}

fn now_secs() -> Option<u64> {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .ok()
        .map(|d| d.as_secs())
}

fn deliver(mut entries: Vec<HistoryEntry>, delivery: HistoryDelivery) -> Vec<HistoryEntry> {
    let mut rng = rand::thread_rng();
    match delivery {
        HistoryDelivery::Ordered => {}
        HistoryDelivery::Shuffled => entries.shuffle(&mut rng),
        HistoryDelivery::ShuffledWithDuplicates => {
            entries.extend_from_within(..);
            entries.shuffle(&mut rng);
        }
    }
    entries
}

#[async_trait]
impl LedgerConnection for MemoryConnection {
    async fn bind(&self, channel_id: &str, contract_id: &str) -> Result<(), LedgerError> {
        self.contact()?;
        if !self
            .inner
            .contracts
            .contains_key(&key(channel_id, contract_id))
        {
            return Err(not_instantiated(channel_id, contract_id));
        }
        Ok(())
    }

    async fn submit(&self, tx: Transaction) -> Result<TransactionResult, LedgerError> {
        self.contact()?;
        let tx_id = new_tx_id();
        let outcome = {
            let mut state = self
                .inner
                .contracts
                .get_mut(&key(&tx.channel_id, &tx.contract_id))
                .ok_or_else(|| not_instantiated(&tx.channel_id, &tx.contract_id))?;
            state.apply(&tx, &tx_id)
        };

        let delay = self.inner.faults.read().submit_delay;
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        Ok(TransactionResult { tx_id, outcome })
    }

    async fn solicit(
        &self,
        request: &QueryRequest,
    ) -> Result<Vec<EndorsementResponse>, LedgerError> {
        self.contact()?;
        self.query_delay().await;

        let answer = self
            .inner
            .contracts
            .get(&key(&request.channel_id, &request.contract_id))
            .ok_or_else(|| not_instantiated(&request.channel_id, &request.contract_id))?
            .evaluate(&request.function, &request.args);
        let tx_id = new_tx_id();
        let faults = self.inner.faults.read();

        let mut responses = Vec::with_capacity(self.inner.peers.len());
        for peer in &self.inner.peers {
            let response = match (faults.peers.get(peer), &answer) {
                (Some(PeerFault::Silent), _) => continue,
                (Some(PeerFault::Payload(payload)), _) => {
                    EndorsementResponse::ok(peer.as_str(), payload.clone())
                }
                (Some(PeerFault::Status(status, message)), _) => {
                    EndorsementResponse::failed(peer.as_str(), *status, message)
                }
                (None, Ok(payload)) => EndorsementResponse::ok(peer.as_str(), payload.clone()),
                (None, Err(message)) => EndorsementResponse::failed(peer.as_str(), 500, message),
            };
            responses.push(response.with_tx_id(tx_id.clone()));
        }
        Ok(responses)
    }

    async fn solicit_history(
        &self,
        request: &HistoryRequest,
    ) -> Result<Vec<HistoryEntry>, LedgerError> {
        self.contact()?;
        self.query_delay().await;

        let entries = self
            .inner
            .contracts
            .get(&key(&request.channel_id, &request.contract_id))
            .ok_or_else(|| not_instantiated(&request.channel_id, &request.contract_id))?
            .history
            .get(&request.key)
            .cloned()
            .unwrap_or_default();
        let delivery = self.inner.faults.read().history;
        Ok(deliver(entries, delivery))
    }

    fn release(&self) {
        if !self.released.swap(true, Ordering::SeqCst) {
            self.inner.open_connections.fetch_sub(1, Ordering::SeqCst);
        }
    }
}
