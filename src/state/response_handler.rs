//! FIFO ledger correlating responses with the requests that produced them.

use std::collections::VecDeque;
use std::sync::Arc;

use parking_lot::{MappedMutexGuard, Mutex, MutexGuard};

use crate::error::{Error, Result};
use crate::handler::{DropCollector, SharedCollector};
use crate::protocol::response::server_error;
use crate::protocol::{Request, Response};

/// Which collector sink a SUCCESS is routed to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Expectation {
    /// RUN: SUCCESS carries field keys
    Fields,
    /// Anything else: SUCCESS carries a summary
    Summary,
}

/// A sent request awaiting its terminal response.
struct PendingEntry {
    name: &'static str,
    expectation: Expectation,
    collector: SharedCollector,
}

#[derive(Default)]
struct Ledger {
    pending: VecDeque<PendingEntry>,
    error: Option<Error>,
}

impl Ledger {
    /// Remove the oldest pending entry once its terminal response arrived.
    fn resolve(&mut self) -> Result<PendingEntry> {
        self.pending
            .pop_front()
            .ok_or_else(|| Error::Protocol("pending request vanished".into()))
    }

    fn record_error(&mut self, err: Error) {
        self.error = Some(match self.error.take() {
            None => err,
            Some(previous) => Error::Protocol(format!(
                "received a second failure ({err}) before the previous one ({previous}) was acknowledged"
            )),
        });
    }
}

/// Ledger of requests whose responses have not arrived yet.
///
/// Responses carry no request id; the protocol answers requests in the order
/// they were sent, so the oldest pending entry always owns the next response.
/// RECORDs leave the entry in place. SUCCESS, FAILURE and IGNORED resolve it.
///
/// All methods take `&self`. The ledger is locked only for the duration of
/// one call, so requests can be registered while a reader is blocked on the
/// transport.
pub struct ResponseHandler {
    ledger: Mutex<Ledger>,
    noop: SharedCollector,
}

impl ResponseHandler {
    /// Create an empty ledger.
    pub fn new() -> Self {
        Self {
            ledger: Mutex::new(Ledger::default()),
            noop: Arc::new(Mutex::new(DropCollector)),
        }
    }

    /// Register `request` as sent-or-about-to-be-sent.
    ///
    /// `None` routes the response to a shared no-op collector.
    pub fn enqueue_message(&self, request: &Request, collector: Option<SharedCollector>) {
        let expectation = if request.is_run() {
            Expectation::Fields
        } else {
            Expectation::Summary
        };
        self.ledger.lock().pending.push_back(PendingEntry {
            name: request.name(),
            expectation,
            collector: collector.unwrap_or_else(|| Arc::clone(&self.noop)),
        });
    }

    /// Dispatch one decoded response to the oldest pending entry.
    ///
    /// A FAILURE is not returned here: it is kept as the accumulated error
    /// for the connection to surface. An `Err` means the stream itself is
    /// out of step with the ledger.
    pub fn handle_response(&self, response: Response) -> Result<()> {
        let mut ledger = self.ledger.lock();
        let Some(entry) = ledger.pending.front() else {
            return Err(Error::Protocol(format!(
                "received {} with no pending request",
                response.name()
            )));
        };
        tracing::trace!(request = entry.name, response = response.name(), "dispatch");

        match response {
            Response::Record(fields) => {
                entry.collector.lock().collect_record(fields);
            }
            Response::Success(meta) => {
                let entry = ledger.resolve()?;
                let mut collector = entry.collector.lock();
                match entry.expectation {
                    Expectation::Fields => collector.collect_fields(&meta),
                    Expectation::Summary => collector.collect_summary(&meta),
                }
                collector.done_success();
            }
            Response::Failure(meta) => {
                let entry = ledger.resolve()?;
                entry.collector.lock().done_failure();
                let err = server_error(&meta);
                tracing::debug!(request = entry.name, code = %err.code, "server failure");
                ledger.record_error(Error::Server(err));
            }
            Response::Ignored => {
                ledger.resolve()?.collector.lock().done_ignored();
            }
        }
        Ok(())
    }

    /// Number of requests whose terminal response has not been consumed.
    pub fn unhandled_message_size(&self) -> usize {
        self.ledger.lock().pending.len()
    }

    /// Returns true if a server failure is waiting to be surfaced.
    pub fn has_error(&self) -> bool {
        self.ledger.lock().error.is_some()
    }

    /// The accumulated server failure, if any. Holds the ledger lock.
    pub fn error(&self) -> Option<MappedMutexGuard<'_, Error>> {
        MutexGuard::try_map(self.ledger.lock(), |ledger| ledger.error.as_mut()).ok()
    }

    /// Take the accumulated server failure, clearing it.
    pub fn take_error(&self) -> Option<Error> {
        self.ledger.lock().error.take()
    }
}

impl Default for ResponseHandler {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for ResponseHandler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let ledger = self.ledger.lock();
        f.debug_struct("ResponseHandler")
            .field(
                "pending",
                &ledger.pending.iter().map(|e| e.name).collect::<Vec<_>>(),
            )
            .field("error", &ledger.error)
            .finish()
    }
}
