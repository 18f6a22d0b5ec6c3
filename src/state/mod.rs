//! Sans-I/O protocol state.
//!
//! The response ledger pairs requests with their collectors and dispatches
//! decoded responses without performing any I/O itself. The transport feeds
//! it; the connection reads the outcome.

pub mod response_handler;

pub use response_handler::ResponseHandler;
