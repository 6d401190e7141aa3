//! Fixed table of the procedures used by the client facade.

use std::collections::HashMap;

use super::{ProcedureHandle, ProcedureRegistry};
use crate::error::{ChronologError, Result};

/// Procedure names shared with the server.
pub mod names {
    pub const CONNECT: &str = "Connect";
    pub const DISCONNECT: &str = "Disconnect";
    pub const CREATE_CHRONICLE: &str = "CreateChronicle";
    pub const DESTROY_CHRONICLE: &str = "DestroyChronicle";
    pub const ACQUIRE_STORY: &str = "AcquireStory";
    pub const RELEASE_STORY: &str = "ReleaseStory";
    pub const DESTROY_STORY: &str = "DestroyStory";
    pub const GET_CHRONICLE_ATTR: &str = "GetChronicleAttr";
    pub const EDIT_CHRONICLE_ATTR: &str = "EditChronicleAttr";
    pub const SHOW_CHRONICLES: &str = "ShowChronicles";
    pub const SHOW_STORIES: &str = "ShowStories";
}

/// Every procedure a client binds at construction, in catalog order.
pub const CATALOG: [&str; 11] = [
    names::CONNECT,
    names::DISCONNECT,
    names::CREATE_CHRONICLE,
    names::DESTROY_CHRONICLE,
    names::ACQUIRE_STORY,
    names::RELEASE_STORY,
    names::DESTROY_STORY,
    names::GET_CHRONICLE_ATTR,
    names::EDIT_CHRONICLE_ATTR,
    names::SHOW_CHRONICLES,
    names::SHOW_STORIES,
];

/// One bound handle per facade operation.
///
/// Built once when the client is constructed and read-only afterwards, so
/// it can be shared by concurrent calls.
#[derive(Debug, Clone)]
pub struct ProcedureTable {
    pub connect: ProcedureHandle,
    pub disconnect: ProcedureHandle,
    pub create_chronicle: ProcedureHandle,
    pub destroy_chronicle: ProcedureHandle,
    pub acquire_story: ProcedureHandle,
    pub release_story: ProcedureHandle,
    pub destroy_story: ProcedureHandle,
    pub get_chronicle_attr: ProcedureHandle,
    pub edit_chronicle_attr: ProcedureHandle,
    pub show_chronicles: ProcedureHandle,
    pub show_stories: ProcedureHandle,
}

impl ProcedureTable {
    /// Bind every name in [`CATALOG`].
    ///
    /// # Errors
    ///
    /// Returns [`ChronologError::Binding`] for the first name the server does
    /// not offer, or when two names share one procedure ID.
    pub fn bind(registry: &ProcedureRegistry) -> Result<Self> {
        let table = Self {
            connect: registry.bind(names::CONNECT)?,
            disconnect: registry.bind(names::DISCONNECT)?,
            create_chronicle: registry.bind(names::CREATE_CHRONICLE)?,
            destroy_chronicle: registry.bind(names::DESTROY_CHRONICLE)?,
            acquire_story: registry.bind(names::ACQUIRE_STORY)?,
            release_story: registry.bind(names::RELEASE_STORY)?,
            destroy_story: registry.bind(names::DESTROY_STORY)?,
            get_chronicle_attr: registry.bind(names::GET_CHRONICLE_ATTR)?,
            edit_chronicle_attr: registry.bind(names::EDIT_CHRONICLE_ATTR)?,
            show_chronicles: registry.bind(names::SHOW_CHRONICLES)?,
            show_stories: registry.bind(names::SHOW_STORIES)?,
        };

        let mut seen: HashMap<u16, &str> = HashMap::new();
        for handle in table.handles() {
            if let Some(other) = seen.insert(handle.id(), handle.name()) {
                return Err(ChronologError::binding(
                    handle.name(),
                    format!("id {} already bound to `{}`", handle.id(), other),
                ));
            }
        }

        Ok(table)
    }

    /// All handles in catalog order.
    pub fn handles(&self) -> [&ProcedureHandle; 11] {
        [
            &self.connect,
            &self.disconnect,
            &self.create_chronicle,
            &self.destroy_chronicle,
            &self.acquire_story,
            &self.release_story,
            &self.destroy_story,
            &self.get_chronicle_attr,
            &self.edit_chronicle_attr,
            &self.show_chronicles,
            &self.show_stories,
        ]
    }
}
