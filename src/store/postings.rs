//! Posting store
//!
//! Maps typed values to the documents holding them and back:
//! - postings: value -> roaring bitmap of document ids (inverse index)
//! - values_by_doc: document id -> set of values (forward index)
//! - ref_count: value -> number of documents holding it
//! - sorted_values: distinct live values in ascending order, for range access
//!
//! `sorted_values` contains exactly the values whose ref count is positive and
//! is maintained by binary search on every transition, never re-sorted.

use std::collections::{BTreeSet, HashMap};

use roaring::RoaringBitmap;

use super::types::{DocumentId, FieldValue};

/// Typed inverted index over one field
#[derive(Clone, Debug)]
pub struct PostingStore<V: FieldValue> {
    postings: HashMap<V, RoaringBitmap>,
    values_by_doc: HashMap<DocumentId, BTreeSet<V>>,
    ref_count: HashMap<V, u32>,
    sorted_values: Vec<V>,
}

impl<V: FieldValue> Default for PostingStore<V> {
    fn default() -> Self {
        Self::new()
    }
}

impl<V: FieldValue> PostingStore<V> {
    pub fn new() -> Self {
        Self {
            postings: HashMap::new(),
            values_by_doc: HashMap::new(),
            ref_count: HashMap::new(),
            sorted_values: Vec::new(),
        }
    }

    /// Record that document `id` holds `value`
    ///
    /// Returns false if the document already held the value.
    pub fn add(&mut self, id: DocumentId, value: V) -> bool {
        let doc_values = self.values_by_doc.entry(id).or_default();
        if doc_values.contains(&value) {
            return false;
        }
        doc_values.insert(value.clone());

        self.postings.entry(value.clone()).or_default().insert(id);

        let count = self.ref_count.entry(value.clone()).or_insert(0);
        *count += 1;
        if *count == 1 {
            if let Err(pos) = self.sorted_values.binary_search(&value) {
                self.sorted_values.insert(pos, value);
            }
        }
        true
    }

    /// Remove every value held by document `id`
    ///
    /// Returns false if the document held nothing.
    pub fn delete(&mut self, id: DocumentId) -> bool {
        let Some(values) = self.values_by_doc.remove(&id) else {
            return false;
        };

        for value in values {
            if let Some(bitmap) = self.postings.get_mut(&value) {
                bitmap.remove(id);
                if bitmap.is_empty() {
                    self.postings.remove(&value);
                }
            }

            let remaining = match self.ref_count.get_mut(&value) {
                Some(count) => {
                    *count = count.saturating_sub(1);
                    *count
                }
                None => continue,
            };
            if remaining == 0 {
                self.ref_count.remove(&value);
                if let Ok(pos) = self.sorted_values.binary_search(&value) {
                    self.sorted_values.remove(pos);
                }
            }
        }
        true
    }

    /// Documents holding exactly `value`
    pub fn get(&self, value: &V) -> RoaringBitmap {
        self.postings.get(value).cloned().unwrap_or_default()
    }

    /// Borrow the postings of `value`, if any document holds it
    pub fn postings(&self, value: &V) -> Option<&RoaringBitmap> {
        self.postings.get(value)
    }

    /// Documents holding any of `values`
    pub fn get_or(&self, values: &[V]) -> RoaringBitmap {
        let mut result = RoaringBitmap::new();
        for bitmap in values.iter().filter_map(|v| self.postings.get(v)) {
            result |= bitmap;
        }
        result
    }

    /// Documents holding all of `values`; empty if any value is absent
    pub fn get_and(&self, values: &[V]) -> RoaringBitmap {
        let mut iter = values.iter();
        let Some(first) = iter.next() else {
            return RoaringBitmap::new();
        };
        let Some(mut result) = self.postings.get(first).cloned() else {
            return RoaringBitmap::new();
        };
        for value in iter {
            match self.postings.get(value) {
                Some(bitmap) => result &= bitmap,
                None => return RoaringBitmap::new(),
            }
            if result.is_empty() {
                break;
            }
        }
        result
    }

    /// Index of the first value `>= bound`
    pub fn find_gte(&self, bound: &V) -> usize {
        self.sorted_values.partition_point(|v| v < bound)
    }

    /// Index of the first value `> bound`
    pub fn find_gt(&self, bound: &V) -> usize {
        self.sorted_values.partition_point(|v| v <= bound)
    }

    /// One past the index of the last value `<= bound`
    pub fn find_lte(&self, bound: &V) -> usize {
        self.sorted_values.partition_point(|v| v <= bound)
    }

    /// One past the index of the last value `< bound`
    pub fn find_lt(&self, bound: &V) -> usize {
        self.sorted_values.partition_point(|v| v < bound)
    }

    /// Documents holding a value within the given bounds
    ///
    /// An unset bound is unbounded on that side. Inverted or fully excluded
    /// ranges produce an empty bitmap.
    pub fn range(
        &self,
        from: Option<&V>,
        to: Option<&V>,
        include_from: bool,
        include_to: bool,
    ) -> RoaringBitmap {
        let start = match from {
            Some(bound) if include_from => self.find_gte(bound),
            Some(bound) => self.find_gt(bound),
            None => 0,
        };
        let end = match to {
            Some(bound) if include_to => self.find_lte(bound),
            Some(bound) => self.find_lt(bound),
            None => self.sorted_values.len(),
        };

        let mut result = RoaringBitmap::new();
        if start >= end {
            return result;
        }
        for value in &self.sorted_values[start..end] {
            if let Some(bitmap) = self.postings.get(value) {
                result |= bitmap;
            }
        }
        result
    }

    /// Distinct live values in ascending order
    pub fn values(&self) -> &[V] {
        &self.sorted_values
    }

    /// Live values paired with their postings, ascending
    pub fn iter_postings(&self) -> impl Iterator<Item = (&V, &RoaringBitmap)> + '_ {
        self.sorted_values
            .iter()
            .filter_map(move |v| self.postings.get(v).map(|bitmap| (v, bitmap)))
    }

    /// Values held by document `id`
    pub fn values_for(&self, id: DocumentId) -> Option<&BTreeSet<V>> {
        self.values_by_doc.get(&id)
    }

    /// Number of documents currently holding `value`
    pub fn ref_count(&self, value: &V) -> u32 {
        self.ref_count.get(value).copied().unwrap_or(0)
    }

    /// Number of documents holding at least one value
    pub fn doc_count(&self) -> usize {
        self.values_by_doc.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values_by_doc.is_empty()
    }

    /// Smallest value whose postings intersect `docs`, with the intersection
    pub fn first_intersecting(&self, docs: &RoaringBitmap) -> Option<(&V, RoaringBitmap)> {
        self.iter_postings()
            .map(|(v, bitmap)| (v, bitmap & docs))
            .find(|(_, hits)| !hits.is_empty())
    }

    /// Largest value whose postings intersect `docs`, with the intersection
    pub fn last_intersecting(&self, docs: &RoaringBitmap) -> Option<(&V, RoaringBitmap)> {
        self.sorted_values
            .iter()
            .rev()
            .filter_map(|v| self.postings.get(v).map(|bitmap| (v, bitmap & docs)))
            .find(|(_, hits)| !hits.is_empty())
    }

    /// Export the forward index, ordered by document id
    pub fn export(&self) -> Vec<(DocumentId, Vec<V>)> {
        let mut entries: Vec<(DocumentId, Vec<V>)> = self
            .values_by_doc
            .iter()
            .map(|(id, values)| (*id, values.iter().cloned().collect()))
            .collect();
        entries.sort_unstable_by_key(|(id, _)| *id);
        entries
    }

    /// Rebuild a store from an exported forward index
    pub fn from_export(entries: Vec<(DocumentId, Vec<V>)>) -> Self {
        let mut store = Self::new();
        for (id, values) in entries {
            for value in values {
                store.add(id, value);
            }
        }
        store
    }
}
