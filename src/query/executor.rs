//! Query executor for running queries against an index's fields
//!
//! Execution is two passes over the tree: `bind` checks that every range
//! bound coerces to its field's type, then `evaluate` computes the match set
//! and scorer. Unknown fields and absent values never fail; they match
//! nothing.

use std::cmp::{Ordering, Reverse};
use std::collections::BinaryHeap;

use ordered_float::OrderedFloat;
use roaring::RoaringBitmap;
use serde_json::Value;
use tracing::debug;

use super::ast::{BoolQuery, MatchQuery, Query, RangeQuery};
use super::context::QueryContext;
use super::scorer::Scorer;
use super::types::{JsonPath, QueryResult};
use crate::error::{Result, SearchError};
use crate::models::Hit;
use crate::store::{DocumentId, FieldValue};

/// Query executor for running queries
pub struct QueryExecutor;

impl QueryExecutor {
    /// Bind and evaluate a query parsed at the `query` root
    pub fn execute(query: &Query, ctx: &QueryContext<'_>) -> Result<QueryResult> {
        Self::execute_at(query, ctx, &JsonPath::root("query"))
    }

    /// Bind and evaluate a query parsed at `path`
    pub fn execute_at(query: &Query, ctx: &QueryContext<'_>, path: &JsonPath) -> Result<QueryResult> {
        Self::bind(query, ctx, path)?;
        let result = Self::evaluate(query, ctx);
        debug!(
            query_type = query.query_type(),
            nodes = query.node_count(),
            matched = result.matched.len(),
            "evaluated query"
        );
        Ok(result)
    }

    /// Check every range bound against its target field
    ///
    /// Bounds on unknown fields are not checked; the range simply matches
    /// nothing.
    pub fn bind(query: &Query, ctx: &QueryContext<'_>, path: &JsonPath) -> Result<()> {
        match query {
            Query::Range(range) => Self::bind_range(range, ctx, &path.key("range").key(&range.field)),
            Query::Bool(b) => {
                let bool_path = path.key("bool");
                for (group, clauses) in [("should", &b.should), ("must", &b.must), ("filter", &b.filter)] {
                    let group_path = bool_path.key(group);
                    for (i, clause) in clauses.iter().enumerate() {
                        Self::bind(clause, ctx, &group_path.index(i))?;
                    }
                }
                Ok(())
            }
            _ => Ok(()),
        }
    }

    fn bind_range(range: &RangeQuery, ctx: &QueryContext<'_>, path: &JsonPath) -> Result<()> {
        let Some(field) = ctx.field(&range.field) else {
            return Ok(());
        };
        for (key, bound) in [("from", &range.from), ("to", &range.to)] {
            if let Some(raw) = bound {
                if !field.can_coerce(raw) {
                    return Err(SearchError::validation(
                        path.key(key),
                        format!("{} is not a valid {} value", raw, field.field_type()),
                    ));
                }
            }
        }
        Ok(())
    }

    /// Compute the match set and scorer of a bound query
    pub fn evaluate(query: &Query, ctx: &QueryContext<'_>) -> QueryResult {
        match query {
            Query::Term(q) => {
                let matched = ctx
                    .field(&q.field)
                    .map(|f| f.get_value(&q.value))
                    .unwrap_or_default();
                QueryResult::new(matched, Scorer::Constant(1.0))
            }
            Query::Terms(q) => {
                let matched = ctx
                    .field(&q.field)
                    .map(|f| f.get_values_or(&q.values))
                    .unwrap_or_default();
                QueryResult::new(matched, Scorer::Constant(1.0))
            }
            Query::Match(q) => Self::evaluate_match(q, ctx),
            Query::Range(q) => {
                let matched = ctx
                    .field(&q.field)
                    .map(|f| f.range_query(q.from.as_ref(), q.to.as_ref(), q.include_from, q.include_to))
                    .unwrap_or_default();
                QueryResult::new(matched, Scorer::Constant(q.boost))
            }
            Query::Bool(q) => Self::evaluate_bool(q, ctx),
        }
    }

    fn evaluate_match(query: &MatchQuery, ctx: &QueryContext<'_>) -> QueryResult {
        let Some(field) = ctx.field(&query.field) else {
            return QueryResult::empty(query.boost);
        };

        if !field.is_text() {
            return QueryResult::new(field.get_value(&query.query), Scorer::Constant(query.boost));
        }

        let tokens = match String::coerce(&query.query) {
            Some(text) => field.analyze(&text),
            None => Vec::new(),
        };
        let matched = field.get_tokens(&tokens, false);
        QueryResult::new(
            matched,
            Scorer::Bm25 {
                field: field.clone(),
                tokens,
                boost: query.boost,
            },
        )
    }

    fn evaluate_bool(query: &BoolQuery, ctx: &QueryContext<'_>) -> QueryResult {
        if query.is_empty() {
            let matched = ctx.all_field().get_value(&Value::Bool(true));
            return QueryResult::new(
                matched,
                Scorer::Compound {
                    children: Vec::new(),
                    boost: query.boost,
                },
            );
        }

        let mut matched: Option<RoaringBitmap> = None;
        let mut children = Vec::with_capacity(query.should.len() + query.must.len());

        if !query.should.is_empty() {
            let mut union = RoaringBitmap::new();
            for clause in &query.should {
                let result = Self::evaluate(clause, ctx);
                union |= result.matched;
                children.push(result.scorer);
            }
            matched = Some(intersect(matched, union));
        }

        for clause in &query.must {
            let result = Self::evaluate(clause, ctx);
            matched = Some(intersect(matched, result.matched));
            children.push(result.scorer);
        }

        for clause in &query.filter {
            let result = Self::evaluate(clause, ctx);
            matched = Some(intersect(matched, result.matched));
        }

        QueryResult::new(
            matched.unwrap_or_default(),
            Scorer::Compound {
                children,
                boost: query.boost,
            },
        )
    }

    /// Score every matched document and keep the best `k`
    ///
    /// Hits are ordered by score descending, then id ascending. Returns the
    /// hits together with the highest score over all matched documents.
    pub fn collect_top_k(
        result: &QueryResult,
        ctx: &QueryContext<'_>,
        k: usize,
    ) -> (Vec<Hit>, Option<f32>) {
        let params = &ctx.settings().bm25;
        let matched = usize::try_from(result.matched.len()).unwrap_or(usize::MAX);
        let capacity = k.min(matched).saturating_add(1);
        let mut heap: BinaryHeap<Reverse<ScoredDoc>> = BinaryHeap::with_capacity(capacity);
        let mut max_score: Option<f32> = None;

        for id in result.matched.iter() {
            let score = result.scorer.score(id, params);
            max_score = Some(max_score.map_or(score, |m| m.max(score)));

            if k == 0 {
                continue;
            }
            heap.push(Reverse(ScoredDoc {
                score: OrderedFloat(score),
                id,
            }));
            if heap.len() > k {
                heap.pop();
            }
        }

        let hits = heap
            .into_sorted_vec()
            .into_iter()
            .map(|Reverse(doc)| Hit {
                id: doc.id,
                score: doc.score.0,
            })
            .collect();
        (hits, max_score)
    }
}

fn intersect(current: Option<RoaringBitmap>, next: RoaringBitmap) -> RoaringBitmap {
    match current {
        Some(mut acc) => {
            acc &= next;
            acc
        }
        None => next,
    }
}

/// Ranking key: higher score first, then lower id
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
struct ScoredDoc {
    score: OrderedFloat<f32>,
    id: DocumentId,
}

impl Ord for ScoredDoc {
    fn cmp(&self, other: &Self) -> Ordering {
        self.score
            .cmp(&other.score)
            .then_with(|| other.id.cmp(&self.id))
    }
}

impl PartialOrd for ScoredDoc {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::AnalyzerRegistry;
    use crate::config::EngineSettings;
    use crate::schema::{FieldType, ALL_FIELD};
    use crate::store::Field;
    use serde_json::json;
    use std::collections::HashMap;
    use std::sync::Arc;

    struct Fixture {
        fields: HashMap<String, Arc<Field>>,
        all: Arc<Field>,
        settings: EngineSettings,
    }

    impl Fixture {
        fn new() -> Self {
            let registry = AnalyzerRegistry::default();
            let mut fields = HashMap::new();
            fields.insert(
                "flag".to_string(),
                Arc::new(Field::new("flag", FieldType::Bool, None).unwrap()),
            );
            fields.insert(
                "n".to_string(),
                Arc::new(Field::new("n", FieldType::Long, None).unwrap()),
            );
            let analyzer = registry.build(&["whitespace", "lowercase"]).unwrap();
            fields.insert(
                "body".to_string(),
                Arc::new(Field::new("body", FieldType::Text, Some(analyzer)).unwrap()),
            );

            Self {
                fields,
                all: Arc::new(Field::all(ALL_FIELD)),
                settings: EngineSettings::default(),
            }
        }

        fn add(&self, id: u32, field: &str, value: Value) {
            self.fields[field].add_value(id, &value);
            self.all.add_value(id, &Value::Bool(true));
        }

        fn ctx(&self) -> QueryContext<'_> {
            QueryContext::new(&self.fields, &self.all, &self.settings)
        }

        fn ids(&self, query: &Query) -> Vec<u32> {
            QueryExecutor::execute(query, &self.ctx())
                .unwrap()
                .matched
                .iter()
                .collect()
        }
    }

    fn populated() -> Fixture {
        let fx = Fixture::new();
        fx.add(1, "flag", json!(true));
        fx.add(2, "flag", json!(false));
        for id in 1..=6u32 {
            fx.add(id, "n", json!(id));
        }
        fx.add(3, "body", json!("Rust search engine"));
        fx.add(4, "body", json!("rust rust rust"));
        fx.add(5, "body", json!("go"));
        fx
    }

    #[test]
    fn test_bool_field_scenario() {
        let fx = populated();
        assert_eq!(fx.ids(&Query::term("flag", true)), vec![1]);
        assert_eq!(fx.ids(&Query::terms("flag", [true, false])), vec![1, 2]);

        let both = BoolQuery::new()
            .with_must(Query::term("flag", true))
            .with_must(Query::term("flag", false));
        assert!(fx.ids(&both.into()).is_empty());
    }

    #[test]
    fn test_unknown_field_matches_nothing() {
        let fx = populated();
        assert!(fx.ids(&Query::term("missing", 1)).is_empty());
        assert!(fx.ids(&Query::matching("missing", "x")).is_empty());
        assert!(fx
            .ids(&Query::range("missing", Some(json!("abc")), None))
            .is_empty());
    }

    #[test]
    fn test_range_exclusive_from() {
        let fx = populated();
        let query = match Query::range("n", Some(json!(1)), Some(json!(4))) {
            Query::Range(r) => Query::from(r.exclusive_from()),
            other => other,
        };
        assert_eq!(fx.ids(&query), vec![2, 3, 4]);
    }

    #[test]
    fn test_range_bound_validation() {
        let fx = populated();
        let query = BoolQuery::new()
            .with_must(Query::term("flag", true))
            .with_filter(Query::range("n", Some(json!("abc")), None));
        let err = QueryExecutor::execute(&query.into(), &fx.ctx()).unwrap_err();
        match err {
            SearchError::Validation { path, .. } => {
                assert_eq!(path, "query.bool.filter[0].range.n.from")
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_match_all() {
        let fx = populated();
        assert_eq!(fx.ids(&Query::match_all()), vec![1, 2, 3, 4, 5, 6]);
    }

    #[test]
    fn test_should_is_union() {
        let fx = populated();
        let query = BoolQuery::new()
            .with_should(Query::term("n", 1))
            .with_should(Query::term("n", 5));
        assert_eq!(fx.ids(&query.into()), vec![1, 5]);
    }

    #[test]
    fn test_groups_combine_with_and() {
        let fx = populated();
        let query = BoolQuery::new()
            .with_should(Query::term("n", 1))
            .with_should(Query::term("n", 2))
            .with_filter(Query::term("flag", false));
        assert_eq!(fx.ids(&query.into()), vec![2]);
    }

    #[test]
    fn test_match_text_scores() {
        let fx = populated();
        let result = QueryExecutor::execute(&Query::matching("body", "RUST"), &fx.ctx()).unwrap();
        assert_eq!(result.matched.iter().collect::<Vec<_>>(), vec![3, 4]);
        assert!(result.scorer.has_tokens());

        let (hits, max_score) = QueryExecutor::collect_top_k(&result, &fx.ctx(), 10);
        assert_eq!(hits.len(), 2);
        // doc 4 is all "rust" tokens
        assert_eq!(hits[0].id, 4);
        assert!(hits[0].score > hits[1].score);
        assert_eq!(max_score, Some(hits[0].score));
    }

    #[test]
    fn test_match_on_non_text_is_term() {
        let fx = populated();
        let result = QueryExecutor::execute(&Query::matching("n", "3"), &fx.ctx()).unwrap();
        assert_eq!(result.matched.iter().collect::<Vec<_>>(), vec![3]);
        assert!(!result.scorer.has_tokens());
    }

    #[test]
    fn test_filter_does_not_score() {
        let fx = populated();
        let scored: Query = BoolQuery::new()
            .with_must(Query::matching("body", "rust"))
            .into();
        let filtered: Query = BoolQuery::new()
            .with_must(Query::matching("body", "rust"))
            .with_filter(Query::range("n", Some(json!(0)), None))
            .into();

        let params = EngineSettings::default().bm25;
        let a = QueryExecutor::execute(&scored, &fx.ctx()).unwrap();
        let b = QueryExecutor::execute(&filtered, &fx.ctx()).unwrap();
        assert_eq!(a.matched, b.matched);
        for id in a.matched.iter() {
            assert_eq!(a.scorer.score(id, &params), b.scorer.score(id, &params));
        }
    }

    #[test]
    fn test_top_k_tie_break_by_id() {
        let fx = populated();
        let result = QueryExecutor::execute(&Query::match_all(), &fx.ctx()).unwrap();
        let (hits, max_score) = QueryExecutor::collect_top_k(&result, &fx.ctx(), 3);
        let ids: Vec<u32> = hits.iter().map(|h| h.id).collect();
        assert_eq!(ids, vec![1, 2, 3]);
        assert!(hits.iter().all(|h| h.score == 1.0));
        assert_eq!(max_score, Some(1.0));
    }

    #[test]
    fn test_top_k_zero() {
        let fx = populated();
        let result = QueryExecutor::execute(&Query::match_all(), &fx.ctx()).unwrap();
        let (hits, max_score) = QueryExecutor::collect_top_k(&result, &fx.ctx(), 0);
        assert!(hits.is_empty());
        assert_eq!(max_score, Some(1.0));
    }
}
