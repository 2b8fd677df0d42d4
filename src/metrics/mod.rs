use prometheus::{
    Counter, CounterVec, Encoder, Gauge, HistogramOpts, HistogramVec, Opts, Registry, TextEncoder,
};
use std::sync::Arc;

/// Search type label for plain searches
pub const SEARCH: &str = "search";
/// Search type label for aggregation runs
pub const AGGREGATE: &str = "aggregate";

/// Prometheus metrics for an index
#[derive(Clone)]
pub struct SearchMetrics {
    // Counters
    pub documents_indexed: Counter,
    pub documents_deleted: Counter,
    pub searches_total: CounterVec,
    pub search_errors: Counter,

    // Gauges
    pub live_documents: Gauge,

    // Histograms
    pub search_latency: HistogramVec,

    // Registry
    registry: Arc<Registry>,
}

impl SearchMetrics {
    /// Create a new SearchMetrics instance with its own registry
    pub fn new() -> Result<Self, prometheus::Error> {
        let registry = Registry::new();

        // Counters
        let documents_indexed = Counter::with_opts(Opts::new(
            "quarry_documents_indexed_total",
            "Total number of documents indexed",
        ))?;
        registry.register(Box::new(documents_indexed.clone()))?;

        let documents_deleted = Counter::with_opts(Opts::new(
            "quarry_documents_deleted_total",
            "Total number of documents deleted",
        ))?;
        registry.register(Box::new(documents_deleted.clone()))?;

        let searches_total = CounterVec::new(
            Opts::new("quarry_searches_total", "Total number of searches by type"),
            &["type"],
        )?;
        registry.register(Box::new(searches_total.clone()))?;

        let search_errors = Counter::with_opts(Opts::new(
            "quarry_search_errors_total",
            "Total number of rejected search requests",
        ))?;
        registry.register(Box::new(search_errors.clone()))?;

        // Gauges
        let live_documents = Gauge::with_opts(Opts::new(
            "quarry_live_documents",
            "Current number of documents in the index",
        ))?;
        registry.register(Box::new(live_documents.clone()))?;

        // Histograms
        let search_latency = HistogramVec::new(
            HistogramOpts::new("quarry_search_latency_seconds", "Search operation latency")
                .buckets(vec![0.0001, 0.0005, 0.001, 0.005, 0.01, 0.05, 0.1, 0.5, 1.0]),
            &["type"],
        )?;
        registry.register(Box::new(search_latency.clone()))?;

        Ok(Self {
            documents_indexed,
            documents_deleted,
            searches_total,
            search_errors,
            live_documents,
            search_latency,
            registry: Arc::new(registry),
        })
    }

    /// Get the Prometheus registry
    pub fn registry(&self) -> Arc<Registry> {
        self.registry.clone()
    }

    /// Record an indexed document
    pub fn record_index(&self) {
        self.documents_indexed.inc();
    }

    /// Record a deleted document
    pub fn record_delete(&self) {
        self.documents_deleted.inc();
    }

    /// Record a search operation
    pub fn record_search(&self, search_type: &str, duration_secs: f64) {
        self.searches_total.with_label_values(&[search_type]).inc();
        self.search_latency
            .with_label_values(&[search_type])
            .observe(duration_secs);
    }

    /// Record a search error
    pub fn record_search_error(&self) {
        self.search_errors.inc();
    }

    /// Update live documents gauge
    pub fn set_live_documents(&self, count: u64) {
        self.live_documents.set(count as f64);
    }

    /// Render every metric in the text exposition format
    pub fn gather_text(&self) -> Result<String, prometheus::Error> {
        let mut buffer = Vec::new();
        TextEncoder::new().encode(&self.registry.gather(), &mut buffer)?;
        String::from_utf8(buffer).map_err(|e| prometheus::Error::Msg(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_record_and_gather() {
        let metrics = SearchMetrics::new().unwrap();
        metrics.record_index();
        metrics.record_index();
        metrics.record_delete();
        metrics.record_search(SEARCH, 0.002);
        metrics.record_search(AGGREGATE, 0.004);
        metrics.record_search_error();
        metrics.set_live_documents(1);

        assert_eq!(metrics.documents_indexed.get(), 2.0);
        assert_eq!(
            metrics.searches_total.with_label_values(&[SEARCH]).get(),
            1.0
        );

        let text = metrics.gather_text().unwrap();
        assert!(text.contains("quarry_documents_indexed_total 2"));
        assert!(text.contains("quarry_live_documents 1"));
        assert!(text.contains("quarry_searches_total{type=\"aggregate\"} 1"));
        assert!(text.contains("quarry_search_latency_seconds_bucket"));
    }

    #[test]
    fn test_instances_are_independent() {
        let a = SearchMetrics::new().unwrap();
        let b = SearchMetrics::new().unwrap();
        a.record_index();
        assert_eq!(b.documents_indexed.get(), 0.0);
    }
}
