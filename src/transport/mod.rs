//! Transport module - endpoint resolution and the connected stream.
//!
//! Provides abstraction over:
//! - TCP (`tcp://host:port`)
//! - Unix Domain Sockets (`unix:///path/to/socket`, Unix only)

mod endpoint;
mod stream;

pub use endpoint::{resolve, Address, Endpoint, Target};
pub use stream::PipeStream;
