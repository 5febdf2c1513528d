//! Transport and RPC layers of the HTSP client.

pub mod connection;
pub mod dispatcher;
pub mod framer;

pub use connection::{Connection, ConnectionConfig, ConnectionState};
pub use dispatcher::{AsyncHandler, Dispatcher};
pub use framer::Framer;
