//! Synchronous Bolt connection.

mod conn;

pub use conn::Conn;
