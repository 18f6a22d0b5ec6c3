//! Transport consumed by the connection.
//!
//! A transport owns the socket, the framing and the value encoding. The
//! connection only asks it to ship ordered batches of requests and to decode
//! responses into a [`ResponseHandler`].
//!
//! Every method takes `&self`. The connection writes while another thread may
//! be blocked reading (an asynchronous RESET is written that way), so an
//! implementation keeps its write half and read half behind separate locks.
//! The connection never issues two reads or two writes at the same time.

use crate::error::Result;
use crate::protocol::Request;
use crate::state::ResponseHandler;

/// Ordered, reliable, blocking message transport.
pub trait Transport {
    /// Establish and authenticate the channel.
    fn start(&self) -> Result<()>;

    /// Tear down the channel. Calling it more than once must be harmless.
    fn stop(&self) -> Result<()>;

    /// Write `messages` in order as one batch and flush.
    fn send_all(&self, messages: &[Request]) -> Result<()>;

    /// Read and decode exactly one response, dispatching it to `handler`.
    fn receive_one(&self, handler: &ResponseHandler) -> Result<()>;

    /// Read responses until `handler` has no unhandled requests left.
    fn receive_all(&self, handler: &ResponseHandler) -> Result<()> {
        while handler.unhandled_message_size() > 0 {
            self.receive_one(handler)?;
        }
        Ok(())
    }

    /// Returns true while the channel is usable.
    fn is_open(&self) -> bool;
}
