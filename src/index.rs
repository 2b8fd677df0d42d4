//! Index: a named set of typed fields
//!
//! The index fans each document out to its declared fields and runs queries
//! and aggregations over them. Every field carries its own lock; there is no
//! index-wide lock, so writes to different fields never block each other.

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use std::time::Instant;

use roaring::RoaringBitmap;
use serde_json::{Map, Value};
use tracing::{debug, info, warn};

use crate::aggregation::{AggregationExecutor, AggregationParser, AggregationResults};
use crate::analysis::AnalyzerRegistry;
use crate::config::EngineSettings;
use crate::error::{Result, SearchError};
use crate::metrics::{SearchMetrics, AGGREGATE, SEARCH};
use crate::models::{SearchRequest, SearchResponse};
use crate::query::{Query, QueryContext, QueryExecutor, QueryParser, QueryResult};
use crate::schema::{FieldMapping, FieldType, IndexMapping, ALL_FIELD};
use crate::snapshot::IndexSnapshot;
use crate::store::{DocumentId, Field};

/// A searchable set of fields built from one mapping
pub struct Index {
    name: String,
    mapping: IndexMapping,
    settings: EngineSettings,
    fields: HashMap<String, Arc<Field>>,
    all: Arc<Field>,
    metrics: Option<Arc<SearchMetrics>>,
}

impl Index {
    /// Build an empty index from a mapping
    ///
    /// Validates the mapping, resolves every analyzer chain and creates one
    /// field per scalar declaration plus the synthetic `_all` field.
    pub fn new(
        name: impl Into<String>,
        mapping: IndexMapping,
        registry: &AnalyzerRegistry,
        settings: EngineSettings,
    ) -> Result<Self> {
        let name = name.into();
        mapping.validate()?;

        let mut fields = HashMap::new();
        for leaf in mapping.leaf_fields() {
            let analyzer = if leaf.field_type.is_analyzed() {
                Some(registry.build(&leaf.analyzers)?)
            } else {
                None
            };
            let field = Field::new(leaf.name.clone(), leaf.field_type, analyzer)?;
            if fields.insert(leaf.name.clone(), Arc::new(field)).is_some() {
                return Err(SearchError::Schema(format!(
                    "{}: declared more than once",
                    leaf.name
                )));
            }
        }

        info!(index = %name, fields = fields.len(), "created index");
        Ok(Self {
            name,
            mapping,
            settings,
            fields,
            all: Arc::new(Field::all(ALL_FIELD)),
            metrics: None,
        })
    }

    /// Record index and search activity into `metrics`
    pub fn with_metrics(mut self, metrics: Arc<SearchMetrics>) -> Self {
        metrics.set_live_documents(self.doc_count());
        self.metrics = Some(metrics);
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn mapping(&self) -> &IndexMapping {
        &self.mapping
    }

    pub fn settings(&self) -> &EngineSettings {
        &self.settings
    }

    /// Look up a field by flattened name (`meta.author`)
    pub fn field(&self, name: &str) -> Option<&Arc<Field>> {
        if name == ALL_FIELD {
            return Some(&self.all);
        }
        self.fields.get(name)
    }

    /// Declared fields, keyed by flattened name
    pub fn fields(&self) -> &HashMap<String, Arc<Field>> {
        &self.fields
    }

    /// Number of documents holding at least one declared field
    pub fn doc_count(&self) -> u64 {
        self.all.doc_count() as u64
    }

    /// Read view used by the query and aggregation executors
    pub fn context(&self) -> QueryContext<'_> {
        QueryContext::new(&self.fields, &self.all, &self.settings)
    }

    /// Index (or replace) document `id`
    ///
    /// Required fields are checked before anything is written. Keys that
    /// are not declared in the mapping are ignored.
    pub fn add_document(&self, id: DocumentId, source: &Map<String, Value>) -> Result<()> {
        self.mapping.check_required(source)?;
        self.remove(id);

        let mut values: BTreeMap<String, Vec<Value>> = BTreeMap::new();
        collect_object(&self.mapping.fields, source, "", &mut values);

        let mut written = 0;
        for (name, raws) in &values {
            if let Some(field) = self.fields.get(name) {
                written += field.add_values(id, raws);
            }
        }
        if !values.is_empty() {
            self.all.add_value(id, &Value::Bool(true));
        }

        debug!(index = %self.name, id, fields = values.len(), written, "indexed document");
        if let Some(metrics) = &self.metrics {
            metrics.record_index();
            metrics.set_live_documents(self.doc_count());
        }
        Ok(())
    }

    /// Remove document `id` from every field
    ///
    /// Returns true when the document was present.
    pub fn delete_document(&self, id: DocumentId) -> bool {
        let removed = self.remove(id);
        if removed {
            debug!(index = %self.name, id, "deleted document");
            if let Some(metrics) = &self.metrics {
                metrics.record_delete();
                metrics.set_live_documents(self.doc_count());
            }
        }
        removed
    }

    fn remove(&self, id: DocumentId) -> bool {
        for field in self.fields.values() {
            field.delete(id);
        }
        self.all.delete(id)
    }

    /// Run a query and return one page of hits
    ///
    /// No query (or JSON `null`) matches every document.
    pub fn search(
        &self,
        query: Option<&Value>,
        limit: Option<usize>,
        offset: usize,
    ) -> Result<SearchResponse> {
        self.search_with_aggregations(query, None, limit, offset)
    }

    /// Evaluate aggregations over an already matched document set
    pub fn aggregate(&self, aggs: &Value, matched: &RoaringBitmap) -> Result<AggregationResults> {
        let start = Instant::now();
        let outcome = AggregationParser::new(&self.settings)
            .parse(aggs)
            .and_then(|parsed| AggregationExecutor::execute(&parsed, &self.context(), matched));
        self.observe(AGGREGATE, start, outcome.is_ok());
        outcome
    }

    /// Run a query, page its hits and aggregate over every matched document
    pub fn search_with_aggregations(
        &self,
        query: Option<&Value>,
        aggs: Option<&Value>,
        limit: Option<usize>,
        offset: usize,
    ) -> Result<SearchResponse> {
        let start = Instant::now();
        let outcome = self.run_search(query, aggs, limit, offset);
        let search_type = if aggs.is_some() { AGGREGATE } else { SEARCH };
        self.observe(search_type, start, outcome.is_ok());
        outcome
    }

    /// Run a full search request
    pub fn execute(&self, request: &SearchRequest) -> Result<SearchResponse> {
        self.search_with_aggregations(
            request.query.as_ref(),
            request.aggs.as_ref(),
            request.limit,
            request.offset,
        )
    }

    fn run_search(
        &self,
        query: Option<&Value>,
        aggs: Option<&Value>,
        limit: Option<usize>,
        offset: usize,
    ) -> Result<SearchResponse> {
        let limit = limit.unwrap_or(self.settings.default_limit);
        let window = offset.saturating_add(limit);
        if window > self.settings.max_result_window {
            warn!(
                index = %self.name,
                window,
                max = self.settings.max_result_window,
                "result window too large"
            );
            return Err(SearchError::validation(
                "limit",
                format!(
                    "offset + limit must not exceed {}, got {}",
                    self.settings.max_result_window, window
                ),
            ));
        }

        let query = match query {
            None | Some(Value::Null) => Query::match_all(),
            Some(json) => QueryParser::parse(json)?,
        };
        let aggs = aggs
            .map(|json| AggregationParser::new(&self.settings).parse(json))
            .transpose()?;

        let ctx = self.context();
        let result: QueryResult = QueryExecutor::execute(&query, &ctx)?;
        let aggs = aggs
            .map(|parsed| AggregationExecutor::execute(&parsed, &ctx, &result.matched))
            .transpose()?;

        let (hits, max_score) = QueryExecutor::collect_top_k(&result, &ctx, window);
        let hits: Vec<_> = hits.into_iter().skip(offset).collect();

        debug!(
            index = %self.name,
            total = result.total(),
            returned = hits.len(),
            "search complete"
        );
        Ok(SearchResponse {
            total: result.total(),
            hits,
            max_score,
            aggs,
        })
    }

    fn observe(&self, search_type: &str, start: Instant, ok: bool) {
        if let Some(metrics) = &self.metrics {
            if ok {
                metrics.record_search(search_type, start.elapsed().as_secs_f64());
            } else {
                metrics.record_search_error();
            }
        }
    }

    /// Encode the full contents of the index
    ///
    /// The caller decides where the bytes go.
    pub fn flush(&self) -> Result<Vec<u8>> {
        let mut names: Vec<&String> = self.fields.keys().collect();
        names.sort();

        let mut fields: Vec<_> = names
            .into_iter()
            .map(|name| self.fields[name].snapshot())
            .collect();
        fields.push(self.all.snapshot());

        let bytes = IndexSnapshot::new(self.name.clone(), &self.mapping, fields)?.to_bytes()?;
        info!(
            index = %self.name,
            documents = self.doc_count(),
            bytes = bytes.len(),
            "flushed index"
        );
        Ok(bytes)
    }

    /// Rebuild an index from bytes produced by [`Index::flush`]
    pub fn restore(
        bytes: &[u8],
        registry: &AnalyzerRegistry,
        settings: EngineSettings,
    ) -> Result<Self> {
        let snapshot = IndexSnapshot::from_bytes(bytes)?;
        let mapping = snapshot.mapping()?;
        let mut index = Index::new(snapshot.name.clone(), mapping, registry, settings)?;

        for field_snapshot in snapshot.fields {
            if field_snapshot.name == ALL_FIELD {
                index.all = Arc::new(Field::from_snapshot(field_snapshot, None)?);
                continue;
            }

            let declared = index.fields.get(&field_snapshot.name).ok_or_else(|| {
                SearchError::Internal(format!(
                    "snapshot field '{}' is not in the mapping",
                    field_snapshot.name
                ))
            })?;
            if declared.field_type() != field_snapshot.field_type {
                return Err(SearchError::Internal(format!(
                    "snapshot field '{}' is {}, mapping declares {}",
                    field_snapshot.name,
                    field_snapshot.field_type,
                    declared.field_type()
                )));
            }

            let analyzer = declared.analyzer().cloned();
            let name = field_snapshot.name.clone();
            let field = Field::from_snapshot(field_snapshot, analyzer)?;
            index.fields.insert(name, Arc::new(field));
        }

        info!(index = %index.name, documents = index.doc_count(), "restored index");
        Ok(index)
    }
}

impl std::fmt::Debug for Index {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Index")
            .field("name", &self.name)
            .field("fields", &self.fields.len())
            .field("documents", &self.doc_count())
            .finish_non_exhaustive()
    }
}

/// Gather the raw values of every declared key under `prefix`
fn collect_object(
    decls: &BTreeMap<String, FieldMapping>,
    source: &Map<String, Value>,
    prefix: &str,
    out: &mut BTreeMap<String, Vec<Value>>,
) {
    for (key, raw) in source {
        let Some(mapping) = decls.get(key) else {
            continue;
        };
        let name = if prefix.is_empty() {
            key.clone()
        } else {
            format!("{}.{}", prefix, key)
        };
        collect_value(&name, mapping, raw, out);
    }
}

fn collect_value(
    name: &str,
    mapping: &FieldMapping,
    raw: &Value,
    out: &mut BTreeMap<String, Vec<Value>>,
) {
    match (mapping.field_type, raw) {
        (_, Value::Null) => {}
        (FieldType::Map, Value::Object(child)) => collect_object(&mapping.children, child, name, out),
        (FieldType::Map, _) => {}
        (FieldType::Slice, _) => {
            let Some(element) = mapping.children.values().next() else {
                return;
            };
            match raw {
                Value::Array(items) => {
                    for item in items {
                        collect_value(name, element, item, out);
                    }
                }
                single => collect_value(name, element, single, out),
            }
        }
        _ => out.entry(name.to_string()).or_default().push(raw.clone()),
    }
}
