// Path: crates/client/src/aggregator.rs

//! Reconciles the endorsement responses of one query into a single result.
//!
//! Each response is decoded independently and grouped by the canonical bytes of its
//! decoded payload. The endorsement policy then decides whether the groups are
//! acceptable. Disagreement is always reported, never resolved by silently picking
//! one answer, unless the caller asked for `BestEffort`.

use ledger_types::app::{EndorsementResponse, PeerId, QueryResult, TxId};
use ledger_types::codec::{self, DecodedValue};
use ledger_types::config::{validate_policy, EndorsementPolicy};
use ledger_types::error::LedgerError;
use std::collections::btree_map::Entry;
use std::collections::BTreeMap;

/// Endorsers that returned byte-identical decoded payloads.
struct Group {
    value: DecodedValue,
    // Sorted by peer; the value is the proposal tx ID that peer reported.
    peers: BTreeMap<PeerId, Option<TxId>>,
}

impl Group {
    fn first_peer(&self) -> Option<&PeerId> {
        self.peers.keys().next()
    }

    fn into_result(self) -> QueryResult {
        let tx_id = self.peers.values().flatten().next().cloned();
        QueryResult {
            value: self.value,
            tx_id,
            endorsers: self.peers.into_keys().collect(),
        }
    }
}

/// One peer's answer, after repeats from the same peer are reconciled.
enum Answer {
    Value {
        key: Vec<u8>,
        value: DecodedValue,
        tx_id: Option<TxId>,
    },
    Failed(EndorsementResponse),
    // The peer answered more than once, differently.
    Conflicting,
}

impl Answer {
    fn agrees_with(&self, other: &Answer) -> bool {
        match (self, other) {
            (Answer::Value { key: a, .. }, Answer::Value { key: b, .. }) => a == b,
            (Answer::Failed(_), Answer::Failed(_)) => true,
            _ => false,
        }
    }
}

/// Aggregates endorsement responses under `policy`.
///
/// A repeated response from a peer already seen is ignored when it matches that
/// peer's first answer. A repeat that differs makes the peer conflicting: it is a
/// dissenter under `RequireUnanimous` and counts towards no group otherwise.
/// Responses with a failure status never count as agreement: they are dissenters
/// under `RequireUnanimous` and are skipped otherwise. Decode failures are returned
/// immediately, attributed to the peer that produced them.
pub fn aggregate(
    responses: Vec<EndorsementResponse>,
    policy: EndorsementPolicy,
) -> Result<QueryResult, LedgerError> {
    validate_policy(policy)?;
    if responses.is_empty() {
        return Err(LedgerError::NoResponses);
    }

    let mut answers: BTreeMap<PeerId, Answer> = BTreeMap::new();
    for response in responses {
        let peer = response.peer.clone();
        let answer = if response.is_success() {
            let value =
                codec::decode(&response.payload).map_err(|e| attribute(e, &response.peer))?;
            Answer::Value {
                key: value.canonical_bytes()?,
                value,
                tx_id: response.tx_id,
            }
        } else {
            Answer::Failed(response)
        };
        match answers.entry(peer) {
            Entry::Vacant(slot) => {
                slot.insert(answer);
            }
            Entry::Occupied(mut slot) => {
                if !slot.get().agrees_with(&answer) {
                    slot.insert(Answer::Conflicting);
                }
            }
        }
    }

    let mut failures: Vec<EndorsementResponse> = Vec::new();
    let mut conflicting: Vec<PeerId> = Vec::new();
    let mut groups: BTreeMap<Vec<u8>, Group> = BTreeMap::new();
    for (peer, answer) in answers {
        match answer {
            Answer::Value { key, value, tx_id } => {
                groups
                    .entry(key)
                    .or_insert_with(|| Group {
                        value,
                        peers: BTreeMap::new(),
                    })
                    .peers
                    .insert(peer, tx_id);
            }
            Answer::Failed(response) => failures.push(response),
            Answer::Conflicting => conflicting.push(peer),
        }
    }

    // Largest group first; ties go to the group holding the smallest peer identity.
    let mut ranked: Vec<Group> = groups.into_values().collect();
    ranked.sort_by(|a, b| {
        b.peers
            .len()
            .cmp(&a.peers.len())
            .then_with(|| a.first_peer().cmp(&b.first_peer()))
    });
    let mut ranked = ranked.into_iter();

    let Some(best) = ranked.next() else {
        // No peer gave a usable answer. Failures are in peer order.
        return Err(match failures.into_iter().next() {
            Some(first) => LedgerError::EndorsementRejected {
                peer: first.peer,
                status: first.status,
                message: first.message,
            },
            None => LedgerError::EndorsementMismatch {
                dissenting: conflicting,
            },
        });
    };

    match policy {
        EndorsementPolicy::RequireUnanimous => {
            let mut dissenting: Vec<PeerId> = ranked
                .flat_map(|g| g.peers.into_keys())
                .chain(failures.into_iter().map(|f| f.peer))
                .chain(conflicting)
                .collect();
            if !dissenting.is_empty() {
                dissenting.sort();
                return Err(LedgerError::EndorsementMismatch { dissenting });
            }
        }
        EndorsementPolicy::RequireQuorum(required) => {
            let obtained = best.peers.len();
            if obtained < required {
                return Err(LedgerError::InsufficientEndorsements { required, obtained });
            }
        }
        EndorsementPolicy::BestEffort => {}
    }

    Ok(best.into_result())
}

fn attribute(err: LedgerError, peer: &PeerId) -> LedgerError {
    match err {
        LedgerError::MalformedPayload { reason, raw, .. } => LedgerError::MalformedPayload {
            peer: Some(peer.clone()),
            reason,
            raw,
        },
        other => other,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use std::collections::BTreeSet;

    fn ok(peer: &str, payload: &str) -> EndorsementResponse {
        EndorsementResponse::ok(peer, payload.as_bytes().to_vec())
    }

    fn text(s: &str) -> DecodedValue {
        codec::decode(format!("\"{}\"", s).as_bytes()).unwrap()
    }

    #[test]
    fn test_empty_input_fails_for_every_policy() {
        for policy in [
            EndorsementPolicy::RequireUnanimous,
            EndorsementPolicy::RequireQuorum(1),
            EndorsementPolicy::BestEffort,
        ] {
            assert_eq!(aggregate(vec![], policy), Err(LedgerError::NoResponses));
        }
    }

    #[test]
    fn test_unanimous_agreement_ignores_formatting() {
        let responses = vec![
            ok("peer1", r#"{"name":"Bharathi","id":1}"#),
            ok("peer0", r#"{ "id": 1, "name": "Bharathi" }"#).with_tx_id(TxId::from("tx-9")),
        ];
        let result = aggregate(responses, EndorsementPolicy::RequireUnanimous).unwrap();
        assert_eq!(
            result.value.get("name").and_then(DecodedValue::as_str),
            Some("Bharathi")
        );
        assert_eq!(result.endorsers, vec![PeerId::from("peer0"), PeerId::from("peer1")]);
        assert_eq!(result.tx_id, Some(TxId::from("tx-9")));
    }

    #[test]
    fn test_unanimous_mismatch_lists_dissenters() {
        let responses = vec![ok("peerA", "\"v1\""), ok("peerB", "\"v1\""), ok("peerC", "\"v2\"")];
        assert_eq!(
            aggregate(responses, EndorsementPolicy::RequireUnanimous),
            Err(LedgerError::EndorsementMismatch {
                dissenting: vec![PeerId::from("peerC")]
            })
        );
    }

    #[test]
    fn test_quorum_majority_wins() {
        let responses = vec![ok("peerA", "\"v1\""), ok("peerB", "\"v1\""), ok("peerC", "\"v2\"")];
        let result = aggregate(responses, EndorsementPolicy::RequireQuorum(2)).unwrap();
        assert_eq!(result.value, text("v1"));
        assert_eq!(result.endorsers, vec![PeerId::from("peerA"), PeerId::from("peerB")]);
    }

    #[test]
    fn test_quorum_not_reached() {
        let responses = vec![ok("peerA", "\"v1\""), ok("peerB", "\"v2\""), ok("peerC", "\"v3\"")];
        assert_eq!(
            aggregate(responses, EndorsementPolicy::RequireQuorum(2)),
            Err(LedgerError::InsufficientEndorsements {
                required: 2,
                obtained: 1
            })
        );
    }

    #[test]
    fn test_quorum_of_zero_is_a_config_error() {
        let responses = vec![ok("peerA", "\"v1\"")];
        assert!(matches!(
            aggregate(responses, EndorsementPolicy::RequireQuorum(0)),
            Err(LedgerError::Config(_))
        ));
    }

    #[test]
    fn test_best_effort_breaks_ties_by_peer_order() {
        let responses = vec![
            ok("peerD", "\"v2\""),
            ok("peerB", "\"v1\""),
            ok("peerC", "\"v2\""),
            ok("peerA", "\"v1\""),
        ];
        let result = aggregate(responses, EndorsementPolicy::BestEffort).unwrap();
        assert_eq!(result.value, text("v1"));

        let responses = vec![ok("peerZ", "\"v1\""), ok("peerY", "\"v2\""), ok("peerX", "\"v2\"")];
        let result = aggregate(responses, EndorsementPolicy::BestEffort).unwrap();
        assert_eq!(result.value, text("v2"));
    }

    #[test]
    fn test_malformed_payload_is_attributed_and_not_recovered() {
        let responses = vec![ok("peerA", "\"v1\""), ok("peerB", "{broken")];
        match aggregate(responses, EndorsementPolicy::BestEffort) {
            Err(LedgerError::MalformedPayload { peer, raw, .. }) => {
                assert_eq!(peer, Some(PeerId::from("peerB")));
                assert_eq!(raw, b"{broken".to_vec());
            }
            other => panic!("expected MalformedPayload, got {:?}", other),
        }
    }

    #[test]
    fn test_empty_payloads_agree_on_absent() {
        let responses = vec![ok("peerA", ""), ok("peerB", "")];
        let result = aggregate(responses, EndorsementPolicy::RequireUnanimous).unwrap();
        assert!(result.value.is_absent());
    }

    #[test]
    fn test_failed_responses() {
        let failed = EndorsementResponse::failed("peerC", 500, "chaincode error");

        // A failing peer breaks unanimity.
        let responses = vec![ok("peerA", "\"v1\""), ok("peerB", "\"v1\""), failed.clone()];
        assert_eq!(
            aggregate(responses.clone(), EndorsementPolicy::RequireUnanimous),
            Err(LedgerError::EndorsementMismatch {
                dissenting: vec![PeerId::from("peerC")]
            })
        );
        // But it is simply not counted towards a quorum.
        assert!(aggregate(responses, EndorsementPolicy::RequireQuorum(2)).is_ok());

        let all_failed = vec![
            EndorsementResponse::failed("peerB", 500, "second"),
            EndorsementResponse::failed("peerA", 404, "first"),
        ];
        assert_eq!(
            aggregate(all_failed, EndorsementPolicy::BestEffort),
            Err(LedgerError::EndorsementRejected {
                peer: PeerId::from("peerA"),
                status: 404,
                message: "first".into()
            })
        );
    }

    #[test]
    fn test_duplicate_peer_counts_once() {
        let responses = vec![ok("peerA", "\"v1\""), ok("peerA", "\"v1\""), ok("peerB", "\"v2\"")];
        assert_eq!(
            aggregate(responses, EndorsementPolicy::RequireQuorum(2)),
            Err(LedgerError::InsufficientEndorsements {
                required: 2,
                obtained: 1
            })
        );
    }

    #[test]
    fn test_conflicting_repeat_makes_peer_a_dissenter() {
        let responses = vec![ok("peerA", "\"v1\""), ok("peerA", "\"v2\"")];
        assert_eq!(
            aggregate(responses, EndorsementPolicy::RequireUnanimous),
            Err(LedgerError::EndorsementMismatch {
                dissenting: vec![PeerId::from("peerA")]
            })
        );

        let responses = vec![
            ok("peerA", "\"v1\""),
            ok("peerB", "\"v1\""),
            ok("peerA", "\"v2\""),
        ];
        assert_eq!(
            aggregate(responses.clone(), EndorsementPolicy::RequireUnanimous),
            Err(LedgerError::EndorsementMismatch {
                dissenting: vec![PeerId::from("peerA")]
            })
        );
        let result = aggregate(responses, EndorsementPolicy::BestEffort).unwrap();
        assert_eq!(result.value, text("v1"));
        assert_eq!(result.endorsers, vec![PeerId::from("peerB")]);
    }

    #[test]
    fn test_repeat_with_reformatted_payload_is_not_a_conflict() {
        let responses = vec![ok("peerA", r#"{"a":1,"b":2}"#), ok("peerA", r#"{ "b": 2, "a": 1 }"#)];
        let result = aggregate(responses, EndorsementPolicy::RequireUnanimous).unwrap();
        assert_eq!(result.endorsers, vec![PeerId::from("peerA")]);
    }

    const PAYLOADS: [&str; 4] = [r#"{"a":1}"#, "\"v1\"", "[1,2]", "true"];

    proptest! {
        #[test]
        fn prop_identical_responses_are_unanimous(peers in 1usize..8, idx in 0usize..PAYLOADS.len()) {
            let payload = PAYLOADS[idx];
            let responses = (0..peers).map(|i| ok(&format!("peer{}", i), payload)).collect();
            let result = aggregate(responses, EndorsementPolicy::RequireUnanimous).unwrap();
            prop_assert_eq!(result.value, codec::decode(payload.as_bytes()).unwrap());
            prop_assert_eq!(result.endorsers.len(), peers);
        }

        #[test]
        fn prop_distinct_values_are_a_mismatch(
            picks in proptest::collection::vec(0usize..PAYLOADS.len(), 2..8)
        ) {
            let distinct: BTreeSet<_> = picks.iter().collect();
            prop_assume!(distinct.len() >= 2);
            let responses = picks
                .iter()
                .enumerate()
                .map(|(i, p)| ok(&format!("peer{}", i), PAYLOADS[*p]))
                .collect();
            let is_mismatch = matches!(
                aggregate(responses, EndorsementPolicy::RequireUnanimous),
                Err(LedgerError::EndorsementMismatch { .. })
            );
            prop_assert!(is_mismatch);
        }
    }
}
