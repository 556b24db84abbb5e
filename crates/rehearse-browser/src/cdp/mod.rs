//! Chrome DevTools Protocol (CDP) driver layer.
//!
//! The low-level driver the engine sits on: a WebSocket CDP client plus a
//! per-target page session. Connects to a Chrome started with
//! `--remote-debugging-port` and speaks the CDP JSON-RPC protocol.
//!
//! Higher layers never touch the wire directly; they go through
//! [`PageSession`] operations (navigate, evaluate, input dispatch,
//! readiness waits).

mod client;
mod error;
mod page;
mod protocol;

pub use client::CdpClient;
pub use error::CdpError;
pub use page::{ElementRect, PageSession};
pub use protocol::*;
