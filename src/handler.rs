//! Response collectors.
//!
//! A collector receives the decoded content of the response to exactly one
//! request. Callback pattern for a RUN followed by PULL_ALL sharing one
//! collector:
//!
//! ```text
//! collect_fields → done_success              // RUN
//! collect_record* → collect_summary → done_success   // PULL_ALL
//! ```
//!
//! A FAILURE ends the entry with `done_failure`, and every request the server
//! skipped afterwards ends with `done_ignored`.

use std::sync::Arc;

use parking_lot::Mutex;

use crate::value::{Metadata, Value};

/// Collector shared between the caller and the connection's response ledger.
pub type SharedCollector = Arc<Mutex<dyn Collector + Send>>;

/// Wrap a collector so it can be handed to the connection while the caller
/// keeps a typed handle to it.
pub fn shared<C: Collector + Send + 'static>(collector: C) -> Arc<Mutex<C>> {
    Arc::new(Mutex::new(collector))
}

/// Sink for the decoded content of one response.
///
/// Every method defaults to a no-op.
pub trait Collector {
    /// Called with the SUCCESS metadata of a RUN.
    fn collect_fields(&mut self, meta: &Metadata) {
        let _ = meta;
    }

    /// Called for each RECORD.
    fn collect_record(&mut self, fields: Vec<Value>) {
        let _ = fields;
    }

    /// Called with the SUCCESS metadata of any request other than RUN.
    fn collect_summary(&mut self, meta: &Metadata) {
        let _ = meta;
    }

    /// The request completed with SUCCESS.
    fn done_success(&mut self) {}

    /// The request completed with FAILURE.
    fn done_failure(&mut self) {}

    /// The request was IGNORED by the server.
    fn done_ignored(&mut self) {}
}

/// A collector that discards everything.
#[derive(Debug, Default, Clone, Copy)]
pub struct DropCollector;

impl Collector for DropCollector {}

/// Metadata key under which the server reports its identity.
pub const SERVER_KEY: &str = "server";

/// Collector for the INIT response. Captures the server identity.
#[derive(Debug, Default)]
pub struct InitCollector {
    server: Option<String>,
}

impl InitCollector {
    /// Create a new init collector.
    pub fn new() -> Self {
        Self::default()
    }

    /// The reported server identity, e.g. `neo4j/3.1.0`.
    ///
    /// `None` for servers older than 3.1, which do not report it.
    pub fn server(&self) -> Option<&str> {
        self.server.as_deref()
    }

    /// Take the server identity.
    pub fn into_server(self) -> Option<String> {
        self.server
    }
}

impl Collector for InitCollector {
    fn collect_summary(&mut self, meta: &Metadata) {
        if let Some(server) = meta.get(SERVER_KEY).and_then(Value::as_str) {
            self.server = Some(server.to_string());
        }
    }
}

/// Collector for a RESET response. Runs a completion action on SUCCESS.
pub struct ResetCollector {
    on_success: Box<dyn FnMut() + Send>,
}

impl ResetCollector {
    /// Create a reset collector that calls `on_success` when the server
    /// acknowledges the reset.
    pub fn new<F: FnMut() + Send + 'static>(on_success: F) -> Self {
        Self {
            on_success: Box::new(on_success),
        }
    }
}

impl std::fmt::Debug for ResetCollector {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResetCollector").finish_non_exhaustive()
    }
}

impl Collector for ResetCollector {
    fn done_success(&mut self) {
        (self.on_success)();
    }
}

/// Terminal outcome observed by a [`ResultCollector`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Outcome {
    /// No terminal response has arrived yet.
    #[default]
    Pending,
    /// The last request completed with SUCCESS.
    Success,
    /// A request completed with FAILURE.
    Failure,
    /// A request was IGNORED.
    Ignored,
}

/// Collector that builds a statement result.
///
/// One instance is shared by a RUN and its PULL_ALL/DISCARD_ALL.
///
/// # Example
///
/// ```ignore
/// let result = handler::shared(ResultCollector::new());
/// conn.run("MATCH (n) RETURN n.name", Metadata::new(), Some(result.clone()), true)?;
/// conn.sync()?;
/// for record in result.lock().records() {
///     println!("{:?}", record);
/// }
/// ```
#[derive(Debug, Default)]
pub struct ResultCollector {
    keys: Vec<String>,
    records: Vec<Vec<Value>>,
    summary: Option<Metadata>,
    successes: usize,
    outcome: Outcome,
}

impl ResultCollector {
    /// Create a new result collector.
    pub fn new() -> Self {
        Self::default()
    }

    /// Field keys reported by the RUN.
    pub fn keys(&self) -> &[String] {
        &self.keys
    }

    /// Collected records.
    pub fn records(&self) -> &[Vec<Value>] {
        &self.records
    }

    /// Take collected records.
    pub fn into_records(self) -> Vec<Vec<Value>> {
        self.records
    }

    /// Summary metadata from the streaming request, once it completed.
    pub fn summary(&self) -> Option<&Metadata> {
        self.summary.as_ref()
    }

    /// Number of requests that completed with SUCCESS.
    pub fn success_count(&self) -> usize {
        self.successes
    }

    /// The latest terminal outcome.
    pub fn outcome(&self) -> Outcome {
        self.outcome
    }

    /// Returns true once both the RUN and its streaming request succeeded.
    pub fn is_complete(&self) -> bool {
        self.outcome == Outcome::Success && self.summary.is_some()
    }
}

impl Collector for ResultCollector {
    fn collect_fields(&mut self, meta: &Metadata) {
        self.keys = meta
            .get("fields")
            .and_then(Value::as_list)
            .map(|fields| {
                fields
                    .iter()
                    .filter_map(|f| f.as_str().map(str::to_string))
                    .collect()
            })
            .unwrap_or_default();
    }

    fn collect_record(&mut self, fields: Vec<Value>) {
        self.records.push(fields);
    }

    fn collect_summary(&mut self, meta: &Metadata) {
        self.summary = Some(meta.clone());
    }

    fn done_success(&mut self) {
        self.successes += 1;
        self.outcome = Outcome::Success;
    }

    fn done_failure(&mut self) {
        self.outcome = Outcome::Failure;
    }

    fn done_ignored(&mut self) {
        // A FAILURE earlier in the same result is more informative.
        if self.outcome != Outcome::Failure {
            self.outcome = Outcome::Ignored;
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use super::*;

    #[test]
    fn init_collector_captures_server() {
        let mut collector = InitCollector::new();
        let mut meta = Metadata::new();
        meta.insert(SERVER_KEY.to_string(), Value::from("neo4j/3.1.0"));

        collector.collect_summary(&meta);
        collector.done_success();

        assert_eq!(collector.server(), Some("neo4j/3.1.0"));
    }

    #[test]
    fn init_collector_without_server() {
        let mut collector = InitCollector::new();
        collector.collect_summary(&Metadata::new());
        assert_eq!(collector.into_server(), None);
    }

    #[test]
    fn reset_collector_runs_action_on_success_only() {
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&calls);
        let mut collector = ResetCollector::new(move || {
            counter.fetch_add(1, Ordering::SeqCst);
        });

        collector.done_ignored();
        collector.done_failure();
        assert_eq!(calls.load(Ordering::SeqCst), 0);

        collector.done_success();
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn result_collector_builds_result() {
        let mut collector = ResultCollector::new();
        let mut run_meta = Metadata::new();
        run_meta.insert(
            "fields".to_string(),
            Value::from(vec![Value::from("n"), Value::from("m")]),
        );

        collector.collect_fields(&run_meta);
        collector.done_success();
        assert!(!collector.is_complete());

        collector.collect_record(vec![Value::from(1_i64), Value::from(2_i64)]);
        collector.collect_summary(&Metadata::new());
        collector.done_success();

        assert_eq!(collector.keys(), ["n".to_string(), "m".to_string()]);
        assert_eq!(collector.records().len(), 1);
        assert_eq!(collector.success_count(), 2);
        assert!(collector.is_complete());
    }

    #[test]
    fn result_collector_keeps_failure_over_ignored() {
        let mut collector = ResultCollector::new();
        collector.done_failure();
        collector.done_ignored();
        assert_eq!(collector.outcome(), Outcome::Failure);
    }
}
