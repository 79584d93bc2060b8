//! Lazy, memoized field access over one raw tick.
//!
//! Consumers read small, disjoint subsets of a large JSON document, so
//! eager parsing would duplicate work per consumer. `ParsedSnapshot`
//! defers the parse until the first getter call and memoizes the result
//! inside the shared [`TickEvent`], so the parse happens exactly once
//! per tick even when several consumers race on first access.

use std::sync::Arc;
use std::time::Instant;

use serde_json::Value;
use tracing::debug;

use crate::event::TickEvent;
use crate::metrics::PipelineMetrics;

/// A view over one tick with path-keyed, zero-value-on-miss getters.
#[derive(Debug, Clone)]
pub struct ParsedSnapshot {
    event: Arc<TickEvent>,
    metrics: Arc<PipelineMetrics>,
}

impl ParsedSnapshot {
    pub fn new(event: Arc<TickEvent>, metrics: Arc<PipelineMetrics>) -> Self {
        Self { event, metrics }
    }

    /// Parse the raw JSON, at most once per tick across all snapshots
    /// sharing the same event. Malformed input memoizes `Null`, so every
    /// getter degrades to its zero value for that tick.
    pub fn parse(&self) -> &Value {
        self.event.parsed.get_or_init(|| {
            let start = Instant::now();
            let value = match serde_json::from_slice(self.event.raw()) {
                Ok(value) => value,
                Err(err) => {
                    debug!(error = %err, "malformed tick payload, treating as empty");
                    Value::Null
                }
            };
            self.metrics.record_parse(start.elapsed());
            value
        })
    }

    fn lookup(&self, path: &str) -> Option<&Value> {
        path.split('.').try_fold(self.parse(), |node, key| node.get(key))
    }

    /// Integer at a dotted path, `0` when absent or mistyped. Floats
    /// truncate, matching the original ingest's numeric coercion.
    pub fn get_i64(&self, path: &str) -> i64 {
        match self.lookup(path) {
            Some(value) => value
                .as_i64()
                .or_else(|| value.as_f64().map(|f| f as i64))
                .unwrap_or(0),
            None => 0,
        }
    }

    /// String at a dotted path, `""` when absent or mistyped.
    pub fn get_str(&self, path: &str) -> &str {
        self.lookup(path).and_then(Value::as_str).unwrap_or("")
    }

    /// Bool at a dotted path, `false` when absent or mistyped.
    pub fn get_bool(&self, path: &str) -> bool {
        self.lookup(path).and_then(Value::as_bool).unwrap_or(false)
    }

    /// When the underlying tick was received.
    pub fn received_at(&self) -> Instant {
        self.event.received_at()
    }
}
