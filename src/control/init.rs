//! `$hello` / `$init` message builders and parsers.
//!
//! The `$init` message tells the client:
//! - The schema (procedures with their numeric IDs)
//! - Protocol version
//!
//! # Example
//!
//! ```
//! use chronolog_client::control::{build_init_message, parse_init_message, InitSchema};
//!
//! let mut schema = InitSchema::new();
//! schema.add_procedure("Connect", 1);
//! schema.add_procedure("Disconnect", 2);
//!
//! let json = build_init_message(&schema);
//! let parsed = parse_init_message(&json).unwrap();
//! assert_eq!(parsed.get_procedure("Connect").unwrap().id, 1);
//! ```

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use serde_json::json;

use crate::error::{ChronologError, Result};

/// Protocol version string.
pub const PROTOCOL_VERSION: &str = "1.0.0";

/// Procedure definition with its assigned ID.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProcedureSchema {
    /// Assigned procedure ID (1-65534).
    pub id: u16,
}

/// Schema describing the procedures a server offers.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct InitSchema {
    /// Map of procedure names to their definitions.
    #[serde(default)]
    pub procedures: HashMap<String, ProcedureSchema>,
}

impl InitSchema {
    /// Create a new empty schema.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a procedure to the schema.
    pub fn add_procedure(&mut self, name: &str, id: u16) {
        self.procedures
            .insert(name.to_string(), ProcedureSchema { id });
    }

    /// Get a procedure by name.
    pub fn get_procedure(&self, name: &str) -> Option<&ProcedureSchema> {
        self.procedures.get(name)
    }

    /// Check if schema is empty.
    pub fn is_empty(&self) -> bool {
        self.procedures.is_empty()
    }
}

/// Parameters of the `$hello` message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HelloParams {
    /// Logical service multiplexed over the listener.
    pub provider_id: u16,
    /// Client protocol version.
    pub version: String,
}

#[derive(Debug, Deserialize)]
struct Envelope<P> {
    jsonrpc: String,
    method: String,
    params: P,
}

#[derive(Debug, Deserialize)]
struct InitParams {
    version: String,
    #[serde(default)]
    schema: InitSchema,
}

/// Build the `$hello` JSON-RPC message sent by the client.
pub fn build_hello_message(provider_id: u16) -> String {
    json!({
        "jsonrpc": "2.0",
        "method": "$hello",
        "params": {
            "provider_id": provider_id,
            "version": PROTOCOL_VERSION
        }
    })
    .to_string()
}

/// Build the `$init` JSON-RPC message answered by a server.
pub fn build_init_message(schema: &InitSchema) -> String {
    json!({
        "jsonrpc": "2.0",
        "method": "$init",
        "params": {
            "schema": schema,
            "version": PROTOCOL_VERSION
        }
    })
    .to_string()
}

/// Parse a `$hello` line.
pub fn parse_hello_message(line: &str) -> Result<HelloParams> {
    let envelope: Envelope<HelloParams> = serde_json::from_str(line.trim())?;
    check_envelope(&envelope, "$hello")?;
    check_version(&envelope.params.version)?;
    Ok(envelope.params)
}

/// Parse an `$init` line and return its schema.
///
/// # Errors
///
/// Returns [`ChronologError::Serialization`] if the line is not a valid
/// `$init` message or announces an incompatible major version.
pub fn parse_init_message(line: &str) -> Result<InitSchema> {
    let envelope: Envelope<InitParams> = serde_json::from_str(line.trim())?;
    check_envelope(&envelope, "$init")?;
    check_version(&envelope.params.version)?;
    Ok(envelope.params.schema)
}

fn check_envelope<P>(envelope: &Envelope<P>, method: &str) -> Result<()> {
    if envelope.jsonrpc != "2.0" {
        return Err(ChronologError::Serialization(format!(
            "unsupported jsonrpc version `{}`",
            envelope.jsonrpc
        )));
    }
    if envelope.method != method {
        return Err(ChronologError::Serialization(format!(
            "expected `{}`, got `{}`",
            method, envelope.method
        )));
    }
    Ok(())
}

fn check_version(version: &str) -> Result<()> {
    let major = |v: &str| v.split('.').next().map(str::to_string);
    if major(version) != major(PROTOCOL_VERSION) {
        return Err(ChronologError::Serialization(format!(
            "incompatible protocol version {} (client speaks {})",
            version, PROTOCOL_VERSION
        )));
    }
    Ok(())
}
