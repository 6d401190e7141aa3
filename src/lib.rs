//! # chronolog-client
//!
//! Blocking Rust client for a ChronoLog server.
//!
//! A client resolves one server endpoint, binds the server's named
//! procedures once at construction, and then exposes every ChronoLog
//! operation as a blocking call. The transport underneath is asynchronous
//! and message based; each client owns the runtime that drives it.
//!
//! ## Architecture
//!
//! - **Control Plane**: JSON `$hello` / `$init` handshake announcing procedure IDs
//! - **Data Plane**: framed MsgPack requests and responses correlated by request ID
//!
//! ## Layers
//!
//! - [`ChronoLogClient`]: status-code facade; call faults come back as status codes
//! - [`rpc::Rpc`]: the same operations returning typed [`Result`]s
//! - [`dispatcher::CallDispatcher`]: generic blocking/async procedure calls
//!
//! ## Blocking calls
//!
//! Construction and every facade or [`rpc::Rpc`] method block the calling
//! thread, and panic when called from inside an async runtime (a
//! `tokio::spawn`ed task or a `#[tokio::main]` body). Async code either moves
//! the client into `tokio::task::spawn_blocking` or awaits
//! [`dispatcher::CallDispatcher::call`] through `client.rpc().dispatcher()`.
//!
//! ## Example
//!
//! ```no_run
//! use chronolog_client::ChronoLogClient;
//!
//! let client = ChronoLogClient::new("na+sm:///tmp/chronolog.sock", 0)?;
//! let connected = client.connect(1234, 0x7F00_0001, std::process::id());
//! if let Some(session) = connected.session() {
//!     for name in client.show_chronicles(session) {
//!         println!("{}", name);
//!     }
//!     client.disconnect(session);
//! }
//! # Ok::<(), chronolog_client::ChronologError>(())
//! ```

pub mod codec;
pub mod control;
pub mod dispatcher;
pub mod error;
pub mod mapper;
pub mod procedure;
pub mod protocol;
pub mod rpc;
pub mod transport;
pub mod types;

mod client;
mod engine;
mod writer;

pub use client::{
    ChronoLogClient, ClientBuilder, ClientConfig, DEFAULT_CONNECT_TIMEOUT, ENV_PROVIDER_ID,
    ENV_SERVER_ADDRESS,
};
pub use error::{ChronologError, Result};
pub use types::{
    AcquireStoryResult, Attributes, ChronicleAttrResult, ConnectResult, SessionToken,
    STATUS_CLIENT_FAILURE, STATUS_OK,
};
