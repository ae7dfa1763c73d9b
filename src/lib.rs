//! Loopback UI server for the Flight plugin.
//!
//! Flight ships a bundled single-page frontend inside the Eagle image
//! manager. This crate is the native side of that: find a free loopback
//! port, serve the bundled files from one content root with path
//! containment, and expose a start/stop lifecycle for the host's plugin
//! callbacks to drive.

pub mod config;
pub mod error;
pub mod host;
pub mod http;
pub mod port;
pub mod resolve;
pub mod server;

pub use error::{ServeError, StartError};
pub use host::{HostEnvironment, HostEvent, StandaloneHost, run_plugin};
pub use server::{ServerConfig, ServerHandle, ServerStatus};
