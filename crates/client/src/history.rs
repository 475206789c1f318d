// Path: crates/client/src/history.rs

//! Orders the historical versions of a key into submission order.
//!
//! Peers deliver history in their local order, which need not match submission order,
//! and may deliver the same entry more than once.

use ledger_types::app::HistoryEntry;
use ledger_types::error::LedgerError;
use std::sync::Arc;

/// The largest position accepted when no maximum is configured.
pub const DEFAULT_MAX_POSITION: i64 = 1_000_000_000;

/// An ordered, deduplicated history. Cheap to clone and iterable any number of
/// times without going back to the network.
///
/// Positions are non-decreasing rather than strictly increasing: two distinct
/// transactions reported at the same position are both kept, ordered by
/// transaction ID, instead of one being discarded.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct History {
    entries: Arc<Vec<HistoryEntry>>,
}

impl History {
    /// Iterates the entries in ascending position order.
    pub fn iter(&self) -> std::slice::Iter<'_, HistoryEntry> {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// The most recent version, if any.
    pub fn latest(&self) -> Option<&HistoryEntry> {
        self.entries.last()
    }

    pub fn as_slice(&self) -> &[HistoryEntry] {
        &self.entries
    }
}

impl<'a> IntoIterator for &'a History {
    type Item = &'a HistoryEntry;
    type IntoIter = std::slice::Iter<'a, HistoryEntry>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

/// Rebuilds a causally consistent timeline from history entries in delivery order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Reconstructor {
    max_position: i64,
}

impl Default for Reconstructor {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_POSITION)
    }
}

impl Reconstructor {
    pub fn new(max_position: i64) -> Self {
        Self { max_position }
    }

    pub fn max_position(&self) -> i64 {
        self.max_position
    }

    /// Sorts `entries` by position and drops repeated deliveries.
    ///
    /// An entry is a repeat when an earlier-delivered entry has the same position and
    /// transaction ID; the first delivery is kept. Distinct transactions sharing a
    /// position are both kept, ordered by transaction ID, so the output does not
    /// depend on delivery order. Any position outside `[0, max_position]` fails the
    /// whole reconstruction with `OutOfRangeEntry`.
    pub fn reconstruct(&self, entries: Vec<HistoryEntry>) -> Result<History, LedgerError> {
        if let Some(bad) = entries
            .iter()
            .find(|e| e.position < 0 || e.position > self.max_position)
        {
            return Err(LedgerError::OutOfRangeEntry {
                tx_id: bad.tx_id.clone(),
                position: bad.position,
                max: self.max_position,
            });
        }

        let mut entries = entries;
        // Stable, so repeats stay in delivery order and `dedup_by` keeps the first.
        entries.sort_by(|a, b| {
            a.position
                .cmp(&b.position)
                .then_with(|| a.tx_id.cmp(&b.tx_id))
        });
        entries.dedup_by(|later, earlier| {
            later.position == earlier.position && later.tx_id == earlier.tx_id
        });

        Ok(History {
            entries: Arc::new(entries),
        })
    }
}
