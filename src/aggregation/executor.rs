//! Aggregation executor
//!
//! Evaluates an aggregation tree against an incoming document set. Each node
//! hands its own (already narrowed) document set to its nested aggregations.
//! Store locks are released before recursing.

use std::cmp::Reverse;
use std::collections::BinaryHeap;

use roaring::RoaringBitmap;
use serde_json::Value;

use super::ast::{
    Aggregation, Aggregations, FilterAggregation, MetricAggregation, RangeAggregation,
    TermsAggregation,
};
use super::result::{AggregationResult, AggregationResults, RangeBucket, TermsBucket};
use crate::error::{Result, SearchError};
use crate::query::{JsonPath, QueryContext, QueryExecutor};
use crate::store::{with_store, FieldValue, PostingStore};

/// Aggregation executor
pub struct AggregationExecutor;

impl AggregationExecutor {
    /// Evaluate every aggregation over `docs`
    pub fn execute(
        aggs: &Aggregations,
        ctx: &QueryContext<'_>,
        docs: &RoaringBitmap,
    ) -> Result<AggregationResults> {
        Self::execute_at(aggs, ctx, docs, &JsonPath::root("aggs"))
    }

    fn execute_at(
        aggs: &Aggregations,
        ctx: &QueryContext<'_>,
        docs: &RoaringBitmap,
        path: &JsonPath,
    ) -> Result<AggregationResults> {
        let mut results = AggregationResults::new();
        for (name, agg) in aggs {
            let agg_path = path.key(name);
            let result = match agg {
                Aggregation::Terms(a) => Self::terms(a, ctx, docs, &agg_path)?,
                Aggregation::Range(a) => Self::range(a, ctx, docs, &agg_path)?,
                Aggregation::Filter(a) => Self::filter(a, ctx, docs, &agg_path)?,
                Aggregation::Min(a) => Self::metric(a, ctx, docs, &agg_path, false)?,
                Aggregation::Max(a) => Self::metric(a, ctx, docs, &agg_path, true)?,
            };
            results.insert(name.clone(), result);
        }
        Ok(results)
    }

    /// Nested results over `docs`, or None when nothing is nested
    fn nested(
        aggs: &Aggregations,
        ctx: &QueryContext<'_>,
        docs: &RoaringBitmap,
        path: &JsonPath,
    ) -> Result<Option<AggregationResults>> {
        if aggs.is_empty() {
            return Ok(None);
        }
        Self::execute_at(aggs, ctx, docs, &path.key("aggs")).map(Some)
    }

    fn terms(
        agg: &TermsAggregation,
        ctx: &QueryContext<'_>,
        docs: &RoaringBitmap,
        path: &JsonPath,
    ) -> Result<AggregationResult> {
        let Some(field) = ctx.field(&agg.field) else {
            return Ok(AggregationResult::Terms { buckets: Vec::new() });
        };

        let top = {
            let store = field.read();
            with_store!(&*store, s => top_terms(s, docs, agg.size))
        };

        let mut buckets = Vec::with_capacity(top.len());
        for (key, bucket_docs) in top {
            buckets.push(TermsBucket {
                key,
                doc_count: bucket_docs.len(),
                aggs: Self::nested(&agg.aggs, ctx, &bucket_docs, path)?,
            });
        }
        Ok(AggregationResult::Terms { buckets })
    }

    fn range(
        agg: &RangeAggregation,
        ctx: &QueryContext<'_>,
        docs: &RoaringBitmap,
        path: &JsonPath,
    ) -> Result<AggregationResult> {
        let field = ctx.field(&agg.field);

        if let Some(field) = field {
            let ranges_path = path.key("ranges");
            for (i, spec) in agg.ranges.iter().enumerate() {
                for (key, bound) in [("from", &spec.from), ("to", &spec.to)] {
                    if let Some(raw) = bound {
                        if !field.can_coerce(raw) {
                            return Err(SearchError::validation(
                                ranges_path.index(i).key(key),
                                format!("{} is not a valid {} value", raw, field.field_type()),
                            ));
                        }
                    }
                }
            }
        }

        let mut buckets = Vec::with_capacity(agg.ranges.len());
        for spec in &agg.ranges {
            let mut bucket = RangeBucket {
                key: spec.key.clone(),
                from: spec.from.clone(),
                to: spec.to.clone(),
                doc_count: 0,
                aggs: None,
            };

            if let Some(field) = field {
                if !spec.is_unbounded() && !docs.is_empty() {
                    let mut matched =
                        field.range_query(spec.from.as_ref(), spec.to.as_ref(), true, true);
                    matched &= docs;
                    bucket.doc_count = matched.len();
                    bucket.aggs = Self::nested(&agg.aggs, ctx, &matched, path)?;
                }
            }
            buckets.push(bucket);
        }
        Ok(AggregationResult::Range { buckets })
    }

    fn filter(
        agg: &FilterAggregation,
        ctx: &QueryContext<'_>,
        docs: &RoaringBitmap,
        path: &JsonPath,
    ) -> Result<AggregationResult> {
        let result = QueryExecutor::execute_at(&agg.filter, ctx, &path.key("filter"))?;
        let matched = result.matched & docs;
        Ok(AggregationResult::Filter {
            doc_count: matched.len(),
            aggs: Self::nested(&agg.aggs, ctx, &matched, path)?,
        })
    }

    fn metric(
        agg: &MetricAggregation,
        ctx: &QueryContext<'_>,
        docs: &RoaringBitmap,
        path: &JsonPath,
        max: bool,
    ) -> Result<AggregationResult> {
        let extreme = ctx.field(&agg.field).and_then(|field| {
            let store = field.read();
            if max {
                store.max_intersecting(docs)
            } else {
                store.min_intersecting(docs)
            }
        });

        match extreme {
            Some((value, holders)) => Ok(AggregationResult::Metric {
                value,
                aggs: Self::nested(&agg.aggs, ctx, &holders, path)?,
            }),
            None => Ok(AggregationResult::Metric {
                value: Value::Null,
                aggs: None,
            }),
        }
    }
}

/// Top `size` values by intersection with `docs`
///
/// Ordered by count descending; equal counts keep ascending value order.
fn top_terms<V: FieldValue>(
    store: &PostingStore<V>,
    docs: &RoaringBitmap,
    size: usize,
) -> Vec<(Value, RoaringBitmap)> {
    if size == 0 || docs.is_empty() {
        return Vec::new();
    }

    // Min-heap of the best candidates so far: larger count, then smaller rank, wins
    let capacity = size.min(store.values().len()).saturating_add(1);
    let mut heap: BinaryHeap<Reverse<(u64, Reverse<usize>)>> = BinaryHeap::with_capacity(capacity);
    let mut postings = Vec::new();
    for (rank, (_, bitmap)) in store.iter_postings().enumerate() {
        postings.push(bitmap);
        let count = bitmap.intersection_len(docs);
        if count == 0 {
            continue;
        }
        heap.push(Reverse((count, Reverse(rank))));
        if heap.len() > size {
            heap.pop();
        }
    }

    let values = store.values();
    heap.into_sorted_vec()
        .into_iter()
        .map(|Reverse((_, Reverse(rank)))| (values[rank].to_json(), postings[rank] & docs))
        .collect()
}
