//! Typed operation catalog.
//!
//! Each method assembles the argument tuple for one procedure in declared
//! order, performs the call through the [`CallDispatcher`], and returns a
//! typed [`Result`]. A well-formed response with a non-zero status becomes
//! [`ChronologError::Server`], so callers can tell a server rejection apart
//! from a transport or serialization fault.
//!
//! [`ChronoLogClient`](crate::ChronoLogClient) builds its status-code facade
//! on top of this layer.
//!
//! # Example
//!
//! ```ignore
//! let rpc = client.rpc();
//! let session = rpc.connect(1234, 0x7F00_0001, std::process::id())?;
//! match rpc.get_chronicle_attr(session, "TestChronicle", "description") {
//!     Ok(value) => println!("description = {}", value),
//!     Err(ChronologError::Server { status }) => println!("rejected with {}", status),
//!     Err(e) => println!("call failed: {}", e),
//! }
//! ```

use crate::dispatcher::CallDispatcher;
use crate::error::{ChronologError, Result};
use crate::procedure::ProcedureTable;
use crate::types::{Attributes, SessionToken, STATUS_OK};

/// Typed access to every remote operation of one client.
///
/// Methods block like the facade's and panic inside an async runtime
/// context; await [`CallDispatcher::call`] there.
#[derive(Debug)]
pub struct Rpc {
    procedures: ProcedureTable,
    dispatcher: CallDispatcher,
}

impl Rpc {
    /// Wrap a dispatcher and the procedures bound against its endpoint.
    pub fn new(dispatcher: CallDispatcher, procedures: ProcedureTable) -> Self {
        Self {
            procedures,
            dispatcher,
        }
    }

    /// Underlying dispatcher, e.g. for awaiting [`CallDispatcher::call`].
    pub fn dispatcher(&self) -> &CallDispatcher {
        &self.dispatcher
    }

    /// Procedure handles bound at construction.
    pub fn procedures(&self) -> &ProcedureTable {
        &self.procedures
    }

    /// Open a session.
    ///
    /// # Errors
    ///
    /// Besides call faults, returns [`ChronologError::Serialization`] if the
    /// server reports success but issues the reserved invalid token.
    pub fn connect(&self, account: u32, host_ip: u32, pid: u32) -> Result<SessionToken> {
        let response: (i32, SessionToken) = self
            .dispatcher
            .invoke(&self.procedures.connect, &(account, host_ip, pid))?;
        let token = with_status(response)?;

        if !token.is_valid() {
            return Err(ChronologError::Serialization(
                "server issued the reserved session token".to_string(),
            ));
        }
        Ok(token)
    }

    /// Close a session.
    pub fn disconnect(&self, session: SessionToken) -> Result<()> {
        let status: i32 = self
            .dispatcher
            .invoke(&self.procedures.disconnect, &(session,))?;
        check(status)
    }

    /// Create a chronicle with initial attributes.
    pub fn create_chronicle(
        &self,
        session: SessionToken,
        name: &str,
        attrs: &Attributes,
        flags: i32,
    ) -> Result<()> {
        let status: i32 = self.dispatcher.invoke(
            &self.procedures.create_chronicle,
            &(session, name, attrs, flags),
        )?;
        check(status)
    }

    /// Destroy a chronicle.
    pub fn destroy_chronicle(&self, session: SessionToken, name: &str) -> Result<()> {
        let status: i32 = self
            .dispatcher
            .invoke(&self.procedures.destroy_chronicle, &(session, name))?;
        check(status)
    }

    /// Acquire a story, creating it if needed. Returns the story handle.
    pub fn acquire_story(
        &self,
        session: SessionToken,
        chronicle_name: &str,
        story_name: &str,
        attrs: &Attributes,
        flags: i32,
    ) -> Result<String> {
        let response: (i32, String) = self.dispatcher.invoke(
            &self.procedures.acquire_story,
            &(session, chronicle_name, story_name, attrs, flags),
        )?;
        with_status(response)
    }

    /// Release a previously acquired story.
    pub fn release_story(
        &self,
        session: SessionToken,
        chronicle_name: &str,
        story_name: &str,
    ) -> Result<()> {
        let status: i32 = self.dispatcher.invoke(
            &self.procedures.release_story,
            &(session, chronicle_name, story_name),
        )?;
        check(status)
    }

    /// Destroy a story.
    pub fn destroy_story(
        &self,
        session: SessionToken,
        chronicle_name: &str,
        story_name: &str,
    ) -> Result<()> {
        let status: i32 = self.dispatcher.invoke(
            &self.procedures.destroy_story,
            &(session, chronicle_name, story_name),
        )?;
        check(status)
    }

    /// Read one chronicle attribute.
    pub fn get_chronicle_attr(
        &self,
        session: SessionToken,
        chronicle_name: &str,
        key: &str,
    ) -> Result<String> {
        let response: (i32, String) = self.dispatcher.invoke(
            &self.procedures.get_chronicle_attr,
            &(session, chronicle_name, key),
        )?;
        with_status(response)
    }

    /// Set one chronicle attribute.
    pub fn edit_chronicle_attr(
        &self,
        session: SessionToken,
        chronicle_name: &str,
        key: &str,
        value: &str,
    ) -> Result<()> {
        let status: i32 = self.dispatcher.invoke(
            &self.procedures.edit_chronicle_attr,
            &(session, chronicle_name, key, value),
        )?;
        check(status)
    }

    /// List chronicle names visible to the session.
    pub fn show_chronicles(&self, session: SessionToken) -> Result<Vec<String>> {
        self.dispatcher
            .invoke(&self.procedures.show_chronicles, &(session,))
    }

    /// List story names in a chronicle.
    pub fn show_stories(&self, session: SessionToken, chronicle_name: &str) -> Result<Vec<String>> {
        self.dispatcher
            .invoke(&self.procedures.show_stories, &(session, chronicle_name))
    }
}

fn check(status: i32) -> Result<()> {
    if status == STATUS_OK {
        Ok(())
    } else {
        Err(ChronologError::Server { status })
    }
}

fn with_status<T>((status, value): (i32, T)) -> Result<T> {
    check(status).map(|()| value)
}
