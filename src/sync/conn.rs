//! Synchronous Bolt connection.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use parking_lot::Mutex;

use crate::error::{Error, Result};
use crate::handler::{self, InitCollector, ResetCollector, SharedCollector};
use crate::opts::Opts;
use crate::protocol::Request;
use crate::state::ResponseHandler;
use crate::transport::Transport;
use crate::value::Metadata;

/// Synchronous Bolt connection.
///
/// Requests are queued by [`run`](Self::run) and [`reset`](Self::reset) and
/// written in one batch by [`send`](Self::send) or [`sync`](Self::sync).
/// Responses are matched to requests purely by order.
///
/// All methods take `&self`. Queueing and writing serialize on one lock and
/// reading on another, so [`reset_async`](Self::reset_async) can put a RESET
/// on the wire while another thread is blocked in [`sync`](Self::sync).
/// Status accessors never wait for I/O.
pub struct Conn<T: Transport> {
    transport: T,
    handler: ResponseHandler,
    /// Requests queued but not yet written. Held across the write.
    outgoing: Mutex<Vec<Request>>,
    /// Held while one response is read and dispatched.
    reader: Mutex<()>,
    /// Set while an asynchronous RESET is unanswered. Written under `outgoing`
    /// or by the RESET collector.
    interrupted: Arc<AtomicBool>,
    unrecoverable: AtomicBool,
    closed: AtomicBool,
    server: Option<String>,
    address: String,
}

impl<T: Transport> Conn<T> {
    /// Start `transport` and perform the INIT handshake.
    ///
    /// Blocks until the server answers INIT.
    pub fn new<O: TryInto<Opts>>(transport: T, opts: O) -> Result<Self>
    where
        Error: From<O::Error>,
    {
        let opts = opts.try_into()?;
        let mut conn = Self {
            transport,
            handler: ResponseHandler::new(),
            outgoing: Mutex::new(Vec::new()),
            reader: Mutex::new(()),
            interrupted: Arc::new(AtomicBool::new(false)),
            unrecoverable: AtomicBool::new(false),
            closed: AtomicBool::new(false),
            server: None,
            address: opts.address(),
        };

        conn.transport.start()?;
        conn.server = conn.init(&opts)?;
        tracing::debug!(
            address = %conn.address,
            server = conn.server.as_deref().unwrap_or("unknown"),
            "connection initialized"
        );
        Ok(conn)
    }

    fn init(&self, opts: &Opts) -> Result<Option<String>> {
        let collector = handler::shared(InitCollector::new());
        let init = Request::Init {
            client_name: opts.user_agent().to_string(),
            auth: opts.auth_token(),
        };
        self.enqueue(init, Some(collector.clone()), None)?;
        self.sync()?;
        let server = collector.lock().server().map(str::to_string);
        Ok(server)
    }

    /// Queue a RUN followed by PULL_ALL (`pull_all`) or DISCARD_ALL.
    ///
    /// Both responses go to `collector`; `None` discards them. Nothing is
    /// written until the next [`send`](Self::send) or [`sync`](Self::sync).
    pub fn run(
        &self,
        statement: &str,
        parameters: Metadata,
        collector: Option<SharedCollector>,
        pull_all: bool,
    ) -> Result<()> {
        if statement.is_empty() {
            return Err(Error::InvalidUsage("statement is empty".into()));
        }
        let streaming = if pull_all {
            Request::PullAll
        } else {
            Request::DiscardAll
        };
        self.enqueue(Request::run(statement, parameters), collector, Some(streaming))
    }

    /// Queue a RESET. The caller still has to send it.
    pub fn reset(&self) -> Result<()> {
        self.enqueue(Request::Reset, None, None)
    }

    /// Queue a RESET and write it immediately, without waiting for the answer.
    ///
    /// Used to abandon the results of an in-flight statement, possibly while
    /// another thread is blocked reading them. The next queueing or flushing
    /// call first consumes every outstanding response, so the RESET keeps its
    /// position in the stream. Does nothing while a previous RESET is still
    /// unanswered.
    pub fn reset_async(&self) -> Result<()> {
        let mut outgoing = self.outgoing.lock();
        if self.interrupted.load(Ordering::Acquire) {
            return Ok(());
        }

        let interrupted = Arc::clone(&self.interrupted);
        let collector: SharedCollector = handler::shared(ResetCollector::new(move || {
            interrupted.store(false, Ordering::Release);
        }));
        self.enqueue_locked(&mut outgoing, Request::Reset, Some(collector), None)?;

        // A concurrent reader may dispatch the RESET answer before the write returns.
        self.interrupted.store(true, Ordering::Release);
        if let Err(err) = self.flush_locked(&mut outgoing) {
            self.interrupted.store(false, Ordering::Release);
            return Err(err);
        }
        tracing::debug!(address = %self.address, "reset sent");
        Ok(())
    }

    /// Write all queued requests as one batch.
    ///
    /// The queue is cleared even if the write fails; requests are never resent.
    pub fn send(&self) -> Result<()> {
        let mut outgoing = self.outgoing.lock();
        self.ensure_not_interrupted(&mut outgoing)?;
        self.flush_locked(&mut outgoing)
    }

    /// Write all queued requests and block until every response is consumed.
    pub fn sync(&self) -> Result<()> {
        self.send()?;
        self.receive_all()
    }

    /// Block for exactly one response.
    pub fn receive_one(&self) -> Result<()> {
        self.ensure_not_closed()?;
        let result = {
            let _reader = self.reader.lock();
            self.transport.receive_one(&self.handler)
        };
        self.check_transport(result)?;
        self.assert_no_server_failure(&mut self.outgoing.lock())
    }

    /// Returns true if the underlying transport is open.
    pub fn is_open(&self) -> bool {
        !self.closed.load(Ordering::Acquire) && self.transport.is_open()
    }

    /// Returns true once a failure made this connection unusable.
    ///
    /// Never resets. A pool must discard such a connection.
    pub fn has_unrecoverable_error(&self) -> bool {
        self.unrecoverable.load(Ordering::Acquire)
    }

    /// Returns true if more statements can be run on this connection.
    pub fn is_healthy(&self) -> bool {
        self.is_open() && !self.has_unrecoverable_error()
    }

    /// Server identity reported during the handshake, e.g. `neo4j/3.1.0`.
    ///
    /// `None` if the server did not report one.
    pub fn server(&self) -> Option<&str> {
        self.server.as_deref()
    }

    /// Returns true while an asynchronous RESET is unanswered.
    pub fn is_interrupted(&self) -> bool {
        self.interrupted.load(Ordering::Acquire)
    }

    /// Number of queued or written requests whose response has not been consumed.
    pub fn unhandled_message_size(&self) -> usize {
        self.handler.unhandled_message_size()
    }

    /// Snapshot of the requests queued but not yet written.
    pub fn queued_messages(&self) -> Vec<Request> {
        self.outgoing.lock().clone()
    }

    /// Stop the transport. Safe to call more than once.
    pub fn close(&self) -> Result<()> {
        if self.closed.swap(true, Ordering::AcqRel) {
            return Ok(());
        }
        tracing::debug!(address = %self.address, "closing connection");
        self.transport.stop()
    }

    fn enqueue(
        &self,
        request: Request,
        collector: Option<SharedCollector>,
        streaming: Option<Request>,
    ) -> Result<()> {
        let mut outgoing = self.outgoing.lock();
        self.enqueue_locked(&mut outgoing, request, collector, streaming)
    }

    /// Ledger entries and queued requests are pushed together under the
    /// `outgoing` lock, so their orders always agree.
    fn enqueue_locked(
        &self,
        outgoing: &mut Vec<Request>,
        request: Request,
        collector: Option<SharedCollector>,
        streaming: Option<Request>,
    ) -> Result<()> {
        self.ensure_not_interrupted(outgoing)?;

        self.handler.enqueue_message(&request, collector.clone());
        outgoing.push(request);
        if let Some(streaming) = streaming {
            self.handler.enqueue_message(&streaming, collector);
            outgoing.push(streaming);
        }
        Ok(())
    }

    fn flush_locked(&self, outgoing: &mut Vec<Request>) -> Result<()> {
        if outgoing.is_empty() {
            return Ok(());
        }
        self.ensure_not_closed()?;

        let messages = std::mem::take(outgoing);
        tracing::debug!(address = %self.address, count = messages.len(), "flush");
        let result = self.transport.send_all(&messages);
        self.check_transport(result)
    }

    fn receive_all(&self) -> Result<()> {
        if self.handler.unhandled_message_size() == 0 {
            return Ok(());
        }
        self.ensure_not_closed()?;

        let result = {
            let _reader = self.reader.lock();
            self.transport.receive_all(&self.handler)
        };
        self.check_transport(result)?;
        self.assert_no_server_failure(&mut self.outgoing.lock())
    }

    /// Read one response unless every request has been answered already.
    fn receive_pending(&self) -> Result<bool> {
        let _reader = self.reader.lock();
        if self.handler.unhandled_message_size() == 0 {
            return Ok(false);
        }
        let result = self.transport.receive_one(&self.handler);
        self.check_transport(result)?;
        Ok(true)
    }

    /// While a RESET is in flight, consume every outstanding response before
    /// anything else touches the stream.
    fn ensure_not_interrupted(&self, outgoing: &mut Vec<Request>) -> Result<()> {
        if !self.interrupted.load(Ordering::Acquire) {
            return Ok(());
        }
        self.ensure_not_closed()?;

        while self.receive_pending()? {
            match self.assert_no_server_failure(outgoing) {
                Ok(()) => {}
                Err(err @ Error::Server(_)) => {
                    return Err(Error::ResetBeforeConsumed(Box::new(err)));
                }
                Err(err) => return Err(err),
            }
        }
        // The RESET itself has been answered by now.
        self.interrupted.store(false, Ordering::Release);
        Ok(())
    }

    /// Surface the failure accumulated by the response handler, if any.
    ///
    /// Recoverable failures are acknowledged so the server accepts new work;
    /// anything else poisons the connection. Either way the caller sees it.
    fn assert_no_server_failure(&self, outgoing: &mut Vec<Request>) -> Result<()> {
        let Some(err) = self.handler.take_error() else {
            return Ok(());
        };

        if err.is_recoverable() {
            if !self.interrupted.load(Ordering::Acquire) {
                tracing::debug!(address = %self.address, code = ?err.code(), "acknowledging failure");
                self.handler.enqueue_message(&Request::AckFailure, None);
                outgoing.push(Request::AckFailure);
            }
        } else {
            self.mark_unrecoverable(&err);
        }
        self.interrupted.store(false, Ordering::Release);
        Err(err)
    }

    /// Any transport error poisons the connection. A server failure dispatched
    /// before it is dropped, since the transport error is what the caller sees.
    fn check_transport(&self, result: Result<()>) -> Result<()> {
        if let Err(err) = &result {
            self.mark_unrecoverable(err);
            if let Some(stale) = self.handler.take_error() {
                tracing::debug!(address = %self.address, error = %stale, "dropping server failure");
            }
        }
        result
    }

    fn ensure_not_closed(&self) -> Result<()> {
        if self.closed.load(Ordering::Acquire) {
            return Err(Error::ConnectionBroken);
        }
        Ok(())
    }

    fn mark_unrecoverable(&self, err: &Error) {
        if !self.unrecoverable.swap(true, Ordering::AcqRel) {
            tracing::warn!(address = %self.address, error = %err, "connection is no longer usable");
        }
    }
}

impl<T: Transport> Drop for Conn<T> {
    fn drop(&mut self) {
        if !*self.closed.get_mut() {
            // Ignore errors; the peer may already be gone.
            let _ = self.transport.stop();
        }
    }
}

impl<T: Transport> std::fmt::Debug for Conn<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Conn")
            .field("address", &self.address)
            .field("server", &self.server)
            .field("interrupted", &self.interrupted.load(Ordering::Relaxed))
            .field("unrecoverable", &self.has_unrecoverable_error())
            .finish_non_exhaustive()
    }
}
