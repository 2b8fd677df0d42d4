//! Abstract Syntax Tree for query representation
//!
//! A request is parsed once into a [`Query`] tree. The tree is plain data:
//! evaluation lives in the executor, which matches on the variant.

use serde_json::Value;

/// Default boost applied when a node does not specify one
pub const DEFAULT_BOOST: f32 = 1.0;

/// A parsed query node
#[derive(Clone, Debug, PartialEq)]
pub enum Query {
    /// Exact value lookup
    Term(TermQuery),
    /// Any of several exact values
    Terms(TermsQuery),
    /// Analyzed, scored text search
    Match(MatchQuery),
    /// Ordered value range
    Range(RangeQuery),
    /// Boolean composition of sub-queries
    Bool(BoolQuery),
}

impl Query {
    /// Build a term query
    pub fn term(field: impl Into<String>, value: impl Into<Value>) -> Self {
        Query::Term(TermQuery {
            field: field.into(),
            value: value.into(),
        })
    }

    /// Build a terms query
    pub fn terms<I, V>(field: impl Into<String>, values: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: Into<Value>,
    {
        Query::Terms(TermsQuery {
            field: field.into(),
            values: values.into_iter().map(Into::into).collect(),
        })
    }

    /// Build a match query
    pub fn matching(field: impl Into<String>, query: impl Into<Value>) -> Self {
        Query::Match(MatchQuery {
            field: field.into(),
            query: query.into(),
            boost: DEFAULT_BOOST,
        })
    }

    /// Build a range query with inclusive bounds
    pub fn range(field: impl Into<String>, from: Option<Value>, to: Option<Value>) -> Self {
        Query::Range(RangeQuery {
            field: field.into(),
            from,
            to,
            include_from: true,
            include_to: true,
            boost: DEFAULT_BOOST,
        })
    }

    /// A bool query with no clauses (matches every document)
    pub fn match_all() -> Self {
        Query::Bool(BoolQuery::default())
    }

    /// Get the query type name for debugging and logging
    pub fn query_type(&self) -> &'static str {
        match self {
            Query::Term(_) => "term",
            Query::Terms(_) => "terms",
            Query::Match(_) => "match",
            Query::Range(_) => "range",
            Query::Bool(_) => "bool",
        }
    }

    /// Target field of a leaf node
    pub fn field(&self) -> Option<&str> {
        match self {
            Query::Term(q) => Some(&q.field),
            Query::Terms(q) => Some(&q.field),
            Query::Match(q) => Some(&q.field),
            Query::Range(q) => Some(&q.field),
            Query::Bool(_) => None,
        }
    }

    /// Number of nodes in the tree
    pub fn node_count(&self) -> usize {
        match self {
            Query::Bool(q) => 1 + q.clauses().map(Query::node_count).sum::<usize>(),
            _ => 1,
        }
    }
}

/// `{ "term": { <field>: <scalar> } }`
#[derive(Clone, Debug, PartialEq)]
pub struct TermQuery {
    pub field: String,
    pub value: Value,
}

/// `{ "terms": { <field>: [<scalar>, ...] } }`
#[derive(Clone, Debug, PartialEq)]
pub struct TermsQuery {
    pub field: String,
    pub values: Vec<Value>,
}

/// `{ "match": { <field>: { "query": <scalar>, "boost"? } } }`
#[derive(Clone, Debug, PartialEq)]
pub struct MatchQuery {
    pub field: String,
    pub query: Value,
    pub boost: f32,
}

/// `{ "range": { <field>: { "from"?, "to"?, "includeFrom"?, "includeTo"?, "boost"? } } }`
///
/// An unset bound is unbounded on that side.
#[derive(Clone, Debug, PartialEq)]
pub struct RangeQuery {
    pub field: String,
    pub from: Option<Value>,
    pub to: Option<Value>,
    pub include_from: bool,
    pub include_to: bool,
    pub boost: f32,
}

impl RangeQuery {
    /// Make the lower bound exclusive
    pub fn exclusive_from(mut self) -> Self {
        self.include_from = false;
        self
    }

    /// Make the upper bound exclusive
    pub fn exclusive_to(mut self) -> Self {
        self.include_to = false;
        self
    }
}

/// `{ "bool": { "should"?, "must"?, "filter"?, "boost"? } }`
///
/// `filter` clauses restrict the match set like `must` but never contribute
/// to the score.
#[derive(Clone, Debug, PartialEq)]
pub struct BoolQuery {
    pub should: Vec<Query>,
    pub must: Vec<Query>,
    pub filter: Vec<Query>,
    pub boost: f32,
}

impl Default for BoolQuery {
    fn default() -> Self {
        Self {
            should: Vec::new(),
            must: Vec::new(),
            filter: Vec::new(),
            boost: DEFAULT_BOOST,
        }
    }
}

impl BoolQuery {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_should(mut self, query: Query) -> Self {
        self.should.push(query);
        self
    }

    pub fn with_must(mut self, query: Query) -> Self {
        self.must.push(query);
        self
    }

    pub fn with_filter(mut self, query: Query) -> Self {
        self.filter.push(query);
        self
    }

    pub fn with_boost(mut self, boost: f32) -> Self {
        self.boost = boost;
        self
    }

    /// True when no clause group has any member
    pub fn is_empty(&self) -> bool {
        self.should.is_empty() && self.must.is_empty() && self.filter.is_empty()
    }

    /// Every clause, in should/must/filter order
    pub fn clauses(&self) -> impl Iterator<Item = &Query> {
        self.should
            .iter()
            .chain(self.must.iter())
            .chain(self.filter.iter())
    }
}

impl From<BoolQuery> for Query {
    fn from(query: BoolQuery) -> Self {
        Query::Bool(query)
    }
}

impl From<RangeQuery> for Query {
    fn from(query: RangeQuery) -> Self {
        Query::Range(query)
    }
}
