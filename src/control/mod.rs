//! Control plane module - connection handshake.
//!
//! The control plane is newline-delimited JSON exchanged once, right after
//! the stream connects. After the handshake all traffic is binary frames.
//!
//! # Workflow
//!
//! 1. Client writes `$hello` with its provider id and protocol version
//! 2. Server answers `$init` with the schema (procedure name → id)
//! 3. Client binds its procedure table against the schema

mod handshake;
mod init;

pub use handshake::handshake;
pub use init::{
    build_hello_message, build_init_message, parse_hello_message, parse_init_message,
    HelloParams, InitSchema, ProcedureSchema, PROTOCOL_VERSION,
};
