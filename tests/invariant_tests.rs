//! Property tests for the store invariants
//!
//! Random add/delete sequences are applied to the stores and their internal
//! bookkeeping is checked against a simple model after every step.

use std::collections::{BTreeMap, BTreeSet};

use proptest::prelude::*;
use quarry::config::Bm25Params;
use quarry::store::{PostingStore, RelevanceStore};

#[derive(Clone, Debug)]
enum Op {
    Add(u32, i64),
    Delete(u32),
}

fn op() -> impl Strategy<Value = Op> {
    prop_oneof![
        3 => (0u32..20, -5i64..5).prop_map(|(id, v)| Op::Add(id, v)),
        1 => (0u32..20).prop_map(Op::Delete),
    ]
}

fn assert_consistent(
    store: &PostingStore<i64>,
    model: &BTreeMap<u32, BTreeSet<i64>>,
) -> Result<(), TestCaseError> {
    // expected doc counts per value
    let mut expected: BTreeMap<i64, u32> = BTreeMap::new();
    for values in model.values() {
        for v in values {
            *expected.entry(*v).or_default() += 1;
        }
    }

    let sorted: Vec<i64> = expected.keys().copied().collect();
    prop_assert_eq!(store.values(), sorted.as_slice());
    prop_assert!(store.values().windows(2).all(|w| w[0] < w[1]));

    for (v, count) in &expected {
        prop_assert_eq!(store.ref_count(v), *count);
        let holders: Vec<u32> = store.get(v).iter().collect();
        let modeled: Vec<u32> = model
            .iter()
            .filter(|(_, values)| values.contains(v))
            .map(|(id, _)| *id)
            .collect();
        prop_assert_eq!(holders, modeled);
    }
    prop_assert_eq!(store.doc_count(), model.len());
    Ok(())
}

proptest! {
    #[test]
    fn sorted_values_track_refcounts(ops in prop::collection::vec(op(), 0..200)) {
        let mut store: PostingStore<i64> = PostingStore::new();
        let mut model: BTreeMap<u32, BTreeSet<i64>> = BTreeMap::new();

        for op in ops {
            match op {
                Op::Add(id, v) => {
                    store.add(id, v);
                    model.entry(id).or_default().insert(v);
                }
                Op::Delete(id) => {
                    store.delete(id);
                    model.remove(&id);
                }
            }
            assert_consistent(&store, &model)?;
        }
    }

    #[test]
    fn range_matches_filter(
        values in prop::collection::vec(-50i64..50, 1..60),
        from in -60i64..60,
        to in -60i64..60,
        include_from in any::<bool>(),
        include_to in any::<bool>(),
    ) {
        let mut store: PostingStore<i64> = PostingStore::new();
        for (id, v) in values.iter().enumerate() {
            store.add(id as u32, *v);
        }

        let got: Vec<u32> = store
            .range(Some(&from), Some(&to), include_from, include_to)
            .iter()
            .collect();
        let expected: Vec<u32> = values
            .iter()
            .enumerate()
            .filter(|(_, v)| {
                let lower = if include_from { **v >= from } else { **v > from };
                let upper = if include_to { **v <= to } else { **v < to };
                lower && upper
            })
            .map(|(id, _)| id as u32)
            .collect();
        prop_assert_eq!(got, expected);
    }

    #[test]
    fn relevance_replace_is_idempotent(
        first in prop::collection::vec("[a-d]{1,3}", 0..12),
        second in prop::collection::vec("[a-d]{1,3}", 0..12),
        other in prop::collection::vec("[a-d]{1,3}", 1..12),
    ) {
        let mut once = RelevanceStore::new();
        once.add(2, &other);
        once.add(1, &second);

        let mut replaced = RelevanceStore::new();
        replaced.add(2, &other);
        replaced.add(1, &first);
        replaced.add(1, &second);
        replaced.add(1, &second);

        prop_assert_eq!(&once, &replaced);
        prop_assert_eq!(
            once.avg_doc_length(),
            replaced.avg_doc_length()
        );
    }

    #[test]
    fn delete_retracts_everything(
        docs in prop::collection::vec(prop::collection::vec("[a-c]{1,2}", 1..8), 1..10)
    ) {
        let mut store = RelevanceStore::new();
        let mut postings: PostingStore<String> = PostingStore::new();
        for (id, tokens) in docs.iter().enumerate() {
            store.add(id as u32, tokens);
            for t in tokens {
                postings.add(id as u32, t.clone());
            }
        }
        for id in 0..docs.len() as u32 {
            store.delete(id);
            postings.delete(id);
        }

        prop_assert!(store.is_empty());
        prop_assert_eq!(store.total_term_count(), 0);
        prop_assert!(postings.is_empty());
        prop_assert!(postings.values().is_empty());
    }

    #[test]
    fn bm25_is_zero_without_occurrences(
        tokens in prop::collection::vec("[a-c]{1,2}", 1..8),
        probe in "[x-z]{1,2}",
    ) {
        let mut store = RelevanceStore::new();
        store.add(1, &tokens);
        let params = Bm25Params::default();
        prop_assert_eq!(store.bm25(1, &probe, &params), 0.0);
        prop_assert_eq!(store.bm25(99, &tokens[0], &params), 0.0);
    }
}
