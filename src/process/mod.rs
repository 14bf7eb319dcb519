//! External node processes (`process` feature).
//!
//! - [`CommandLauncher`] spawns a ganache-compatible CLI per start and kills it on close;
//! - [`HttpProvider`] talks JSON-RPC 2.0 to it over HTTP (`reqwest`).

mod command;
mod http;

pub use command::{CommandLauncher, CommandNode};
pub use http::HttpProvider;
