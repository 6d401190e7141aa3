//! Registry binding procedure names to the IDs announced by the server.
//!
//! # Example
//!
//! ```
//! use chronolog_client::control::InitSchema;
//! use chronolog_client::procedure::ProcedureRegistry;
//!
//! let mut schema = InitSchema::new();
//! schema.add_procedure("CreateChronicle", 3);
//!
//! let registry = ProcedureRegistry::from_schema(&schema);
//! let handle = registry.bind("CreateChronicle").unwrap();
//! assert_eq!(handle.id(), 3);
//! assert!(registry.bind("createChronicle").is_err());
//! ```

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use crate::control::InitSchema;
use crate::error::{ChronologError, Result};
use crate::protocol::is_assignable_procedure_id;

/// Bound, reusable reference to a named remote procedure.
///
/// Cheap to clone and immutable once bound.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ProcedureHandle {
    name: Arc<str>,
    id: u16,
}

impl ProcedureHandle {
    /// Procedure name as announced by the server.
    #[inline]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Numeric ID carried in request headers.
    #[inline]
    pub fn id(&self) -> u16 {
        self.id
    }
}

impl fmt::Display for ProcedureHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}#{}", self.name, self.id)
    }
}

/// Registry mapping procedure names to server-assigned IDs.
#[derive(Debug, Clone, Default)]
pub struct ProcedureRegistry {
    /// Procedure IDs by name.
    procedures: HashMap<String, u16>,
}

impl ProcedureRegistry {
    /// Create a registry from the server's `$init` schema.
    pub fn from_schema(schema: &InitSchema) -> Self {
        Self {
            procedures: schema
                .procedures
                .iter()
                .map(|(name, p)| (name.clone(), p.id))
                .collect(),
        }
    }

    /// Bind `name` to a procedure handle.
    ///
    /// # Errors
    ///
    /// Returns [`ChronologError::Binding`] if the server does not offer
    /// `name` or announced it with a reserved ID.
    pub fn bind(&self, name: &str) -> Result<ProcedureHandle> {
        let id = *self
            .procedures
            .get(name)
            .ok_or_else(|| ChronologError::binding(name, "not offered by server"))?;

        if !is_assignable_procedure_id(id) {
            return Err(ChronologError::binding(
                name,
                format!("server announced reserved id {:#06x}", id),
            ));
        }

        tracing::debug!("Bound procedure {} to id {}", name, id);
        Ok(ProcedureHandle {
            name: Arc::from(name),
            id,
        })
    }

    /// Number of procedures offered by the server.
    pub fn len(&self) -> usize {
        self.procedures.len()
    }

    /// True if the server offered no procedures.
    pub fn is_empty(&self) -> bool {
        self.procedures.is_empty()
    }
}
