//! Procedure binding.
//!
//! The server announces its procedures by name in the `$init` schema. A
//! [`ProcedureRegistry`] built from that schema binds each name the client
//! uses to a [`ProcedureHandle`]; the fixed [`ProcedureTable`] holds one
//! handle per facade operation and is built once per client.
//!
//! Procedure names are part of the deployment contract and are matched
//! case-sensitively.

mod registry;
mod table;

pub use registry::{ProcedureHandle, ProcedureRegistry};
pub use table::{names, ProcedureTable, CATALOG};
