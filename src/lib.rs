//! `respd`: a single-node, in-memory key/value server speaking RESP2/RESP3.
//!
//! [`value`] is the wire value model and codec; [`combinators`] is the
//! parser-combinator toolkit [`protocol`] builds the RESP grammar from.
//! [`registry`] and [`commands`] give command dispatch a name-to-handler
//! table instead of a hand-rolled match arm per command, and [`keyspace`]
//! is the expiring key/value map handlers operate on through a [`shard`].
//! [`conn`] and [`net`] wire all of that into a single-threaded, mio-driven
//! event loop.

pub mod combinators; // generic parser combinators over &[u8]
pub mod commands; // command handlers + CommandError
pub mod conn; // Connection state machine: handle_read / handle_write
pub mod keyspace; // expiring key/value map
pub mod net; // bind_dual_stack + run (event loop)
pub mod protocol; // RESP grammar + try_decode_frame
pub mod registry; // CommandRegistry
pub mod shard; // Shard::dispatch
pub mod value; // Value + wire codec

pub use commands::{register_all, CommandContext, CommandError};
pub use conn::{Connection, ConnState};
pub use keyspace::{Entry, Keyspace};
pub use net::{bind_dual_stack, run};
pub use registry::CommandRegistry;
pub use shard::Shard;
pub use value::Value;

/// Default listen address: IPv6 dual-stack (accepts v4 clients too), port
/// 1234.
pub const DEFAULT_ADDR: &str = "[::]:1234";
