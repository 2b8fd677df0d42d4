//! Typed fields
//!
//! A [`Field`] wraps one posting store behind its own reader/writer lock, so
//! writes to different fields never contend. Text fields additionally carry
//! an analyzer and a [`RelevanceStore`] under a second lock.

use std::fmt;

use ordered_float::OrderedFloat;
use parking_lot::{RwLock, RwLockReadGuard};
use roaring::RoaringBitmap;
use serde_json::Value;
use tracing::trace;

use super::postings::PostingStore;
use super::relevance::RelevanceStore;
use super::types::{DocumentId, FieldValue};
use crate::analysis::Analyzer;
use crate::config::Bm25Params;
use crate::error::{Result, SearchError};
use crate::schema::FieldType;
use crate::snapshot::{FieldSnapshot, StoreSnapshot};

/// One posting store per scalar field type
#[derive(Clone, Debug)]
pub enum TypedStore {
    Bool(PostingStore<bool>),
    Keyword(PostingStore<String>),
    Text(PostingStore<String>),
    Byte(PostingStore<i8>),
    Short(PostingStore<i16>),
    Integer(PostingStore<i32>),
    Long(PostingStore<i64>),
    UnsignedLong(PostingStore<u64>),
    Float(PostingStore<OrderedFloat<f32>>),
    Double(PostingStore<OrderedFloat<f64>>),
    All(PostingStore<bool>),
}

/// Run `$body` with `$s` bound to the inner posting store, whatever its type
macro_rules! with_store {
    ($store:expr, $s:ident => $body:expr) => {
        match $store {
            $crate::store::TypedStore::Bool($s) => $body,
            $crate::store::TypedStore::Keyword($s) => $body,
            $crate::store::TypedStore::Text($s) => $body,
            $crate::store::TypedStore::Byte($s) => $body,
            $crate::store::TypedStore::Short($s) => $body,
            $crate::store::TypedStore::Integer($s) => $body,
            $crate::store::TypedStore::Long($s) => $body,
            $crate::store::TypedStore::UnsignedLong($s) => $body,
            $crate::store::TypedStore::Float($s) => $body,
            $crate::store::TypedStore::Double($s) => $body,
            $crate::store::TypedStore::All($s) => $body,
        }
    };
}

pub(crate) use with_store;

impl TypedStore {
    /// Create an empty store for a scalar field type
    pub fn new(field_type: FieldType) -> Option<Self> {
        let store = match field_type {
            FieldType::Bool => TypedStore::Bool(PostingStore::new()),
            FieldType::Keyword => TypedStore::Keyword(PostingStore::new()),
            FieldType::Text => TypedStore::Text(PostingStore::new()),
            FieldType::Byte => TypedStore::Byte(PostingStore::new()),
            FieldType::Short => TypedStore::Short(PostingStore::new()),
            FieldType::Integer => TypedStore::Integer(PostingStore::new()),
            FieldType::Long => TypedStore::Long(PostingStore::new()),
            FieldType::UnsignedLong => TypedStore::UnsignedLong(PostingStore::new()),
            FieldType::Float => TypedStore::Float(PostingStore::new()),
            FieldType::Double => TypedStore::Double(PostingStore::new()),
            FieldType::All => TypedStore::All(PostingStore::new()),
            FieldType::Slice | FieldType::Map => return None,
        };
        Some(store)
    }

    pub fn field_type(&self) -> FieldType {
        match self {
            TypedStore::Bool(_) => FieldType::Bool,
            TypedStore::Keyword(_) => FieldType::Keyword,
            TypedStore::Text(_) => FieldType::Text,
            TypedStore::Byte(_) => FieldType::Byte,
            TypedStore::Short(_) => FieldType::Short,
            TypedStore::Integer(_) => FieldType::Integer,
            TypedStore::Long(_) => FieldType::Long,
            TypedStore::UnsignedLong(_) => FieldType::UnsignedLong,
            TypedStore::Float(_) => FieldType::Float,
            TypedStore::Double(_) => FieldType::Double,
            TypedStore::All(_) => FieldType::All,
        }
    }

    /// Check whether `raw` coerces to this store's value type
    pub fn can_coerce(&self, raw: &Value) -> bool {
        with_store!(self, s => coerces(s, raw))
    }

    /// Documents holding the coerced value; empty if it does not coerce
    pub fn get_value(&self, raw: &Value) -> RoaringBitmap {
        with_store!(self, s => get_one(s, raw))
    }

    /// Union over every value that coerces
    pub fn get_values_or(&self, raws: &[Value]) -> RoaringBitmap {
        with_store!(self, s => get_any(s, raws))
    }

    /// Intersection over the given values; empty if any is absent
    pub fn get_values_and(&self, raws: &[Value]) -> RoaringBitmap {
        with_store!(self, s => get_all(s, raws))
    }

    /// Documents with a value inside the bounds
    ///
    /// A bound that does not coerce matches nothing.
    pub fn range(
        &self,
        from: Option<&Value>,
        to: Option<&Value>,
        include_from: bool,
        include_to: bool,
    ) -> RoaringBitmap {
        with_store!(self, s => range_of(s, from, to, include_from, include_to))
    }

    /// Smallest value whose postings intersect `docs`
    pub fn min_intersecting(&self, docs: &RoaringBitmap) -> Option<(Value, RoaringBitmap)> {
        with_store!(self, s => s.first_intersecting(docs).map(|(v, hits)| (v.to_json(), hits)))
    }

    /// Largest value whose postings intersect `docs`
    pub fn max_intersecting(&self, docs: &RoaringBitmap) -> Option<(Value, RoaringBitmap)> {
        with_store!(self, s => s.last_intersecting(docs).map(|(v, hits)| (v.to_json(), hits)))
    }

    /// Values held by document `id`, rendered as JSON
    pub fn values_for(&self, id: DocumentId) -> Vec<Value> {
        with_store!(self, s => s
            .values_for(id)
            .map(|values| values.iter().map(FieldValue::to_json).collect())
            .unwrap_or_default())
    }

    /// Number of distinct live values
    pub fn distinct_values(&self) -> usize {
        with_store!(self, s => s.values().len())
    }

    pub fn doc_count(&self) -> usize {
        with_store!(self, s => s.doc_count())
    }

    pub fn delete(&mut self, id: DocumentId) -> bool {
        with_store!(self, s => s.delete(id))
    }

    fn insert(&mut self, id: DocumentId, raws: &[Value], field: &str) -> usize {
        if let TypedStore::All(s) = self {
            s.add(id, true);
            return 1;
        }
        with_store!(self, s => insert_all(s, id, raws, field))
    }

    /// Export the forward index
    pub fn export(&self) -> StoreSnapshot {
        match self {
            TypedStore::Bool(s) => StoreSnapshot::Bool(s.export()),
            TypedStore::Keyword(s) => StoreSnapshot::Keyword(s.export()),
            TypedStore::Text(s) => StoreSnapshot::Text(s.export()),
            TypedStore::Byte(s) => StoreSnapshot::Byte(s.export()),
            TypedStore::Short(s) => StoreSnapshot::Short(s.export()),
            TypedStore::Integer(s) => StoreSnapshot::Integer(s.export()),
            TypedStore::Long(s) => StoreSnapshot::Long(s.export()),
            TypedStore::UnsignedLong(s) => StoreSnapshot::UnsignedLong(s.export()),
            TypedStore::Float(s) => StoreSnapshot::Float(s.export()),
            TypedStore::Double(s) => StoreSnapshot::Double(s.export()),
            TypedStore::All(s) => StoreSnapshot::All(s.export()),
        }
    }

    /// Rebuild a store from an exported forward index
    pub fn from_snapshot(snapshot: StoreSnapshot) -> Self {
        match snapshot {
            StoreSnapshot::Bool(e) => TypedStore::Bool(PostingStore::from_export(e)),
            StoreSnapshot::Keyword(e) => TypedStore::Keyword(PostingStore::from_export(e)),
            StoreSnapshot::Text(e) => TypedStore::Text(PostingStore::from_export(e)),
            StoreSnapshot::Byte(e) => TypedStore::Byte(PostingStore::from_export(e)),
            StoreSnapshot::Short(e) => TypedStore::Short(PostingStore::from_export(e)),
            StoreSnapshot::Integer(e) => TypedStore::Integer(PostingStore::from_export(e)),
            StoreSnapshot::Long(e) => TypedStore::Long(PostingStore::from_export(e)),
            StoreSnapshot::UnsignedLong(e) => TypedStore::UnsignedLong(PostingStore::from_export(e)),
            StoreSnapshot::Float(e) => TypedStore::Float(PostingStore::from_export(e)),
            StoreSnapshot::Double(e) => TypedStore::Double(PostingStore::from_export(e)),
            StoreSnapshot::All(e) => TypedStore::All(PostingStore::from_export(e)),
        }
    }
}

fn coerces<V: FieldValue>(_store: &PostingStore<V>, raw: &Value) -> bool {
    V::coerce(raw).is_some()
}

fn get_one<V: FieldValue>(store: &PostingStore<V>, raw: &Value) -> RoaringBitmap {
    V::coerce(raw).map(|v| store.get(&v)).unwrap_or_default()
}

fn get_any<V: FieldValue>(store: &PostingStore<V>, raws: &[Value]) -> RoaringBitmap {
    let values: Vec<V> = raws.iter().filter_map(V::coerce).collect();
    store.get_or(&values)
}

fn get_all<V: FieldValue>(store: &PostingStore<V>, raws: &[Value]) -> RoaringBitmap {
    let mut values = Vec::with_capacity(raws.len());
    for raw in raws {
        match V::coerce(raw) {
            Some(v) => values.push(v),
            None => return RoaringBitmap::new(),
        }
    }
    store.get_and(&values)
}

fn range_of<V: FieldValue>(
    store: &PostingStore<V>,
    from: Option<&Value>,
    to: Option<&Value>,
    include_from: bool,
    include_to: bool,
) -> RoaringBitmap {
    let from = match from.map(V::coerce) {
        Some(None) => return RoaringBitmap::new(),
        Some(bound) => bound,
        None => None,
    };
    let to = match to.map(V::coerce) {
        Some(None) => return RoaringBitmap::new(),
        Some(bound) => bound,
        None => None,
    };
    store.range(from.as_ref(), to.as_ref(), include_from, include_to)
}

fn insert_all<V: FieldValue>(
    store: &mut PostingStore<V>,
    id: DocumentId,
    raws: &[Value],
    field: &str,
) -> usize {
    let mut added = 0;
    for raw in raws {
        match V::coerce(raw) {
            Some(value) => {
                store.add(id, value);
                added += 1;
            }
            None => trace!(field = %field, value = %raw, "dropping value that does not coerce"),
        }
    }
    added
}

/// A named, typed, independently locked field
pub struct Field {
    name: String,
    field_type: FieldType,
    analyzer: Option<Analyzer>,
    store: RwLock<TypedStore>,
    relevance: Option<RwLock<RelevanceStore>>,
}

impl Field {
    /// Create an empty field
    ///
    /// Text fields require an analyzer; other types must not have one.
    pub fn new(name: impl Into<String>, field_type: FieldType, analyzer: Option<Analyzer>) -> Result<Self> {
        let name = name.into();
        let store = TypedStore::new(field_type).ok_or_else(|| {
            SearchError::Schema(format!("{}: {} is not a scalar field type", name, field_type))
        })?;

        match (field_type, &analyzer) {
            (FieldType::Text, None) => {
                return Err(SearchError::Schema(format!(
                    "{}: text fields need an analyzer",
                    name
                )))
            }
            (FieldType::Text, Some(_)) | (_, None) => {}
            (_, Some(_)) => {
                return Err(SearchError::Schema(format!(
                    "{}: analyzers are only allowed on text fields",
                    name
                )))
            }
        }

        let relevance = field_type
            .is_analyzed()
            .then(|| RwLock::new(RelevanceStore::new()));

        Ok(Self {
            name,
            field_type,
            analyzer,
            store: RwLock::new(store),
            relevance,
        })
    }

    /// Create the synthetic match-all field
    pub fn all(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            field_type: FieldType::All,
            analyzer: None,
            store: RwLock::new(TypedStore::All(PostingStore::new())),
            relevance: None,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn field_type(&self) -> FieldType {
        self.field_type
    }

    pub fn is_text(&self) -> bool {
        self.relevance.is_some()
    }

    pub fn analyzer(&self) -> Option<&Analyzer> {
        self.analyzer.as_ref()
    }

    /// Shared access to the posting store
    pub fn read(&self) -> RwLockReadGuard<'_, TypedStore> {
        self.store.read()
    }

    /// Shared access to the relevance store (text fields only)
    pub fn relevance(&self) -> Option<RwLockReadGuard<'_, RelevanceStore>> {
        self.relevance.as_ref().map(|r| r.read())
    }

    /// Run the analyzer over `text`; non-text fields yield it unchanged
    pub fn analyze(&self, text: &str) -> Vec<String> {
        match &self.analyzer {
            Some(analyzer) => analyzer.analyze(text),
            None => vec![text.to_string()],
        }
    }

    /// Index a single raw value for document `id`
    pub fn add_value(&self, id: DocumentId, raw: &Value) -> usize {
        self.add_values(id, std::slice::from_ref(raw))
    }

    /// Index every raw value for document `id`
    ///
    /// Values that do not coerce are dropped. For text fields the tokens of
    /// all values replace any earlier tokens of `id`, in both the postings and
    /// the relevance store. Returns the number of postings written.
    pub fn add_values(&self, id: DocumentId, raws: &[Value]) -> usize {
        if !self.is_text() {
            return self.store.write().insert(id, raws, &self.name);
        }

        let mut tokens = Vec::new();
        for raw in raws {
            match String::coerce(raw) {
                Some(text) => tokens.extend(self.analyze(&text)),
                None => trace!(field = %self.name, value = %raw, "dropping value that does not coerce"),
            }
        }

        {
            let mut store = self.store.write();
            if let TypedStore::Text(s) = &mut *store {
                s.delete(id);
                for token in &tokens {
                    s.add(id, token.clone());
                }
            }
        }
        if let Some(relevance) = &self.relevance {
            relevance.write().add(id, &tokens);
        }
        tokens.len()
    }

    /// Remove document `id` from this field
    pub fn delete(&self, id: DocumentId) -> bool {
        let removed = self.store.write().delete(id);
        if let Some(relevance) = &self.relevance {
            relevance.write().delete(id);
        }
        removed
    }

    pub fn can_coerce(&self, raw: &Value) -> bool {
        self.store.read().can_coerce(raw)
    }

    pub fn get_value(&self, raw: &Value) -> RoaringBitmap {
        self.store.read().get_value(raw)
    }

    pub fn get_values_or(&self, raws: &[Value]) -> RoaringBitmap {
        self.store.read().get_values_or(raws)
    }

    pub fn get_values_and(&self, raws: &[Value]) -> RoaringBitmap {
        self.store.read().get_values_and(raws)
    }

    pub fn range_query(
        &self,
        from: Option<&Value>,
        to: Option<&Value>,
        include_from: bool,
        include_to: bool,
    ) -> RoaringBitmap {
        self.store.read().range(from, to, include_from, include_to)
    }

    /// Documents holding every token (`all_tokens`) or any token
    pub fn get_tokens(&self, tokens: &[String], all_tokens: bool) -> RoaringBitmap {
        let store = self.store.read();
        match &*store {
            TypedStore::Text(s) | TypedStore::Keyword(s) if all_tokens => s.get_and(tokens),
            TypedStore::Text(s) | TypedStore::Keyword(s) => s.get_or(tokens),
            _ => RoaringBitmap::new(),
        }
    }

    /// BM25 score of `tokens` for one document (0 for non-text fields)
    pub fn score(&self, id: DocumentId, tokens: &[String], params: &Bm25Params) -> f32 {
        self.relevance
            .as_ref()
            .map(|r| r.read().score(id, tokens, params))
            .unwrap_or(0.0)
    }

    /// BM25 score of `tokens` for every document in `docs`
    pub fn scores(
        &self,
        docs: &RoaringBitmap,
        tokens: &[String],
        params: &Bm25Params,
    ) -> Vec<(DocumentId, f32)> {
        let Some(relevance) = &self.relevance else {
            return Vec::new();
        };
        let relevance = relevance.read();
        docs.iter()
            .map(|id| (id, relevance.score(id, tokens, params)))
            .collect()
    }

    pub fn doc_count(&self) -> usize {
        self.store.read().doc_count()
    }

    /// Capture the field's contents
    pub fn snapshot(&self) -> FieldSnapshot {
        FieldSnapshot {
            name: self.name.clone(),
            field_type: self.field_type,
            store: self.store.read().export(),
            relevance: self.relevance.as_ref().map(|r| r.read().clone()),
        }
    }

    /// Rebuild a field from a snapshot and its resolved analyzer
    pub fn from_snapshot(snapshot: FieldSnapshot, analyzer: Option<Analyzer>) -> Result<Self> {
        let store = TypedStore::from_snapshot(snapshot.store);
        if store.field_type() != snapshot.field_type {
            return Err(SearchError::Internal(format!(
                "{}: snapshot holds {} values for a {} field",
                snapshot.name,
                store.field_type(),
                snapshot.field_type
            )));
        }

        let field = if snapshot.field_type == FieldType::All {
            Field::all(snapshot.name)
        } else {
            Field::new(snapshot.name, snapshot.field_type, analyzer)?
        };
        *field.store.write() = store;
        if let (Some(slot), Some(relevance)) = (&field.relevance, snapshot.relevance) {
            *slot.write() = relevance;
        }
        Ok(field)
    }
}

impl fmt::Debug for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Field")
            .field("name", &self.name)
            .field("field_type", &self.field_type)
            .field("analyzer", &self.analyzer)
            .finish_non_exhaustive()
    }
}
