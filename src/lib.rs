//! SocketPool demo host.
//!
//! Static asset serving, the index route and the demonstration event
//! handlers wired onto a [`ConnectionPool`](socketpool_core::ConnectionPool).
//! The binary in `main.rs` turns CLI flags into a [`HostConfig`] and runs it.

pub mod host;

pub use host::{HostConfig, build_router, register_demo_handlers};
