//! Bolt request and response messages.
//!
//! This module describes the message shapes the connection sequences. The
//! byte-level encoding (chunking, PackStream) is owned by the transport.
//!
//! # Structure
//!
//! - `request`: Client → Server messages
//! - `response`: Server → Client messages

pub mod request;
pub mod response;

pub use request::{AuthToken, Request};
pub use response::Response;

/// Bolt v1 message signature bytes.
pub mod sig {
    /// INIT
    pub const INIT: u8 = 0x01;
    /// ACK_FAILURE
    pub const ACK_FAILURE: u8 = 0x0E;
    /// RESET
    pub const RESET: u8 = 0x0F;
    /// RUN
    pub const RUN: u8 = 0x10;
    /// DISCARD_ALL
    pub const DISCARD_ALL: u8 = 0x2F;
    /// PULL_ALL
    pub const PULL_ALL: u8 = 0x3F;

    /// SUCCESS
    pub const SUCCESS: u8 = 0x70;
    /// RECORD
    pub const RECORD: u8 = 0x71;
    /// IGNORED
    pub const IGNORED: u8 = 0x7E;
    /// FAILURE
    pub const FAILURE: u8 = 0x7F;
}
