//! Client builder and the ChronoLog client facade.
//!
//! Construction runs the whole connection lifecycle up front:
//! 1. Start the client's own transport engine
//! 2. Resolve the server address and connect
//! 3. Exchange `$hello` / `$init` to learn the server's procedures
//! 4. Bind every operation's procedure
//! 5. Start the reader and writer tasks
//!
//! Any failure aborts construction and releases whatever was already set up.
//! After that, every facade method is one blocking round trip.
//!
//! # Example
//!
//! ```no_run
//! use chronolog_client::{Attributes, ChronoLogClient};
//!
//! let client = ChronoLogClient::new("tcp://127.0.0.1:5555", 0)?;
//!
//! let connected = client.connect(1234, 0x7F00_0001, std::process::id());
//! if let Some(session) = connected.session() {
//!     let mut attrs = Attributes::new();
//!     attrs.insert("description".into(), "Test chronicle".into());
//!     let status = client.create_chronicle(session, "TestChronicle", &attrs, 0);
//!     println!("create returned {}", status);
//!     client.disconnect(session);
//! }
//! # Ok::<(), chronolog_client::ChronologError>(())
//! ```

use std::time::Duration;

use tokio::io::BufReader;

use crate::control::{handshake, InitSchema};
use crate::dispatcher::{CallDispatcher, DispatcherConfig};
use crate::engine::{Engine, DEFAULT_WORKER_THREADS};
use crate::error::{ChronologError, Result};
use crate::mapper;
use crate::procedure::{names, ProcedureRegistry, ProcedureTable};
use crate::protocol::DEFAULT_MAX_PAYLOAD_SIZE;
use crate::rpc::Rpc;
use crate::transport::{resolve, Endpoint, PipeStream};
use crate::types::{AcquireStoryResult, Attributes, ChronicleAttrResult, ConnectResult, SessionToken};
use crate::writer::DEFAULT_CHANNEL_CAPACITY;

/// Default bound on connecting plus handshake.
pub const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

/// Environment variable holding the server address.
pub const ENV_SERVER_ADDRESS: &str = "CHRONOLOG_SERVER_ADDRESS";

/// Environment variable holding the provider ID.
pub const ENV_PROVIDER_ID: &str = "CHRONOLOG_PROVIDER_ID";

/// Settings for one client instance.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Server address, e.g. `tcp://host:port` or `unix:///path`.
    pub address: String,
    /// Logical service selected on a shared listener.
    pub provider_id: u16,
    /// Bound on waiting for one response. `None` waits indefinitely.
    pub request_timeout: Option<Duration>,
    /// Bound on connecting plus handshake.
    pub connect_timeout: Duration,
    /// Capacity of the outbound frame channel.
    pub channel_capacity: usize,
    /// Largest payload accepted in either direction.
    pub max_payload_size: u32,
    /// Worker threads of the client's engine.
    pub worker_threads: usize,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            address: String::new(),
            provider_id: 0,
            request_timeout: None,
            connect_timeout: DEFAULT_CONNECT_TIMEOUT,
            channel_capacity: DEFAULT_CHANNEL_CAPACITY,
            max_payload_size: DEFAULT_MAX_PAYLOAD_SIZE,
            worker_threads: DEFAULT_WORKER_THREADS,
        }
    }
}

impl ClientConfig {
    /// Defaults for `address`.
    pub fn new(address: impl Into<String>) -> Self {
        Self {
            address: address.into(),
            ..Self::default()
        }
    }

    /// Read the address and provider ID from the environment.
    ///
    /// `CHRONOLOG_SERVER_ADDRESS` is required; `CHRONOLOG_PROVIDER_ID`
    /// defaults to 0.
    ///
    /// # Errors
    ///
    /// Returns [`ChronologError::Resolution`] if the address is unset or the
    /// provider ID is not a `u16`.
    pub fn from_env() -> Result<Self> {
        let address = std::env::var(ENV_SERVER_ADDRESS)
            .map_err(|e| ChronologError::resolution("", format!("{}: {}", ENV_SERVER_ADDRESS, e)))?;

        let provider_id = match std::env::var(ENV_PROVIDER_ID) {
            Ok(raw) => raw.trim().parse::<u16>().map_err(|e| {
                ChronologError::resolution(&address, format!("{} `{}`: {}", ENV_PROVIDER_ID, raw, e))
            })?,
            Err(_) => 0,
        };

        Ok(Self {
            provider_id,
            ..Self::new(address)
        })
    }

    fn dispatcher_config(&self) -> DispatcherConfig {
        DispatcherConfig {
            request_timeout: self.request_timeout,
            max_payload_size: self.max_payload_size,
            channel_capacity: self.channel_capacity,
        }
    }
}

/// Builder for a [`ChronoLogClient`].
#[derive(Debug, Clone)]
pub struct ClientBuilder {
    config: ClientConfig,
}

impl ClientBuilder {
    /// Create a builder for `address` with default settings.
    pub fn new(address: impl Into<String>) -> Self {
        Self {
            config: ClientConfig::new(address),
        }
    }

    /// Set the provider ID.
    ///
    /// Default: 0
    pub fn provider_id(mut self, provider_id: u16) -> Self {
        self.config.provider_id = provider_id;
        self
    }

    /// Fail calls that get no response within `timeout`.
    ///
    /// Default: no timeout
    pub fn request_timeout(mut self, timeout: Duration) -> Self {
        self.config.request_timeout = Some(timeout);
        self
    }

    /// Set the bound on connecting plus handshake.
    ///
    /// Default: 10 seconds
    pub fn connect_timeout(mut self, timeout: Duration) -> Self {
        self.config.connect_timeout = timeout;
        self
    }

    /// Set the writer channel capacity.
    ///
    /// Default: 1024
    pub fn channel_capacity(mut self, capacity: usize) -> Self {
        self.config.channel_capacity = capacity;
        self
    }

    /// Set the maximum payload size.
    ///
    /// Default: 1 GiB
    pub fn max_payload_size(mut self, size: u32) -> Self {
        self.config.max_payload_size = size;
        self
    }

    /// Set the number of engine worker threads.
    ///
    /// Default: 1
    pub fn worker_threads(mut self, threads: usize) -> Self {
        self.config.worker_threads = threads;
        self
    }

    /// Connect and build the client.
    pub fn build(self) -> Result<ChronoLogClient> {
        ChronoLogClient::from_config(self.config)
    }
}

/// Blocking client for a ChronoLog server.
///
/// Every method is a single request/response round trip that blocks the
/// calling thread. Failures never escape as errors: they come back as the
/// status codes and failure-shaped results described in [`mapper`]. Use
/// [`ChronoLogClient::rpc`] for typed errors instead.
///
/// The client may be shared between threads. Concurrent calls are not
/// ordered relative to each other.
///
/// # Panics
///
/// Construction and every method panic when called from inside an async
/// runtime context, since they block on the client's own runtime. Call them
/// from plain threads or `tokio::task::spawn_blocking`; async callers can
/// await `rpc().dispatcher().call(..)` instead.
#[derive(Debug)]
pub struct ChronoLogClient {
    config: ClientConfig,
    rpc: Rpc,
}

impl ChronoLogClient {
    /// Connect to `address` with default settings.
    ///
    /// # Errors
    ///
    /// - [`ChronologError::Resolution`] if the address cannot be parsed or
    ///   reached, or the peer does not complete the handshake
    /// - [`ChronologError::Binding`] if the server lacks any procedure this
    ///   client needs
    ///
    /// # Panics
    ///
    /// Panics when called from inside an async runtime context.
    pub fn new(address: &str, provider_id: u16) -> Result<Self> {
        Self::builder(address).provider_id(provider_id).build()
    }

    /// Create a client builder.
    pub fn builder(address: impl Into<String>) -> ClientBuilder {
        ClientBuilder::new(address)
    }

    /// Connect using `config`.
    ///
    /// # Errors
    ///
    /// Same as [`ChronoLogClient::new`].
    pub fn from_config(config: ClientConfig) -> Result<Self> {
        let engine = Engine::start(config.worker_threads)?;

        let connect_timeout = config.connect_timeout;
        let (endpoint, stream, schema) = engine.block_on(async {
            tokio::time::timeout(connect_timeout, open(&config.address, config.provider_id))
                .await
                .map_err(|_| {
                    ChronologError::resolution(
                        &config.address,
                        format!("no handshake within {:?}", connect_timeout),
                    )
                })?
        })?;

        let registry = ProcedureRegistry::from_schema(&schema);
        let procedures = ProcedureTable::bind(&registry)?;

        tracing::debug!(
            "Connected to {} with {} procedures bound",
            endpoint,
            procedures.handles().len()
        );
        let dispatcher = CallDispatcher::start(engine, endpoint, stream, config.dispatcher_config());

        Ok(Self {
            config,
            rpc: Rpc::new(dispatcher, procedures),
        })
    }

    /// Typed access to the same operations.
    pub fn rpc(&self) -> &Rpc {
        &self.rpc
    }

    /// Settings this client was built with.
    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// Resolved server endpoint.
    pub fn endpoint(&self) -> &Endpoint {
        self.rpc.dispatcher().endpoint()
    }

    /// True until the connection is lost.
    pub fn is_connected(&self) -> bool {
        self.rpc.dispatcher().is_connected()
    }

    /// Open a session. Check [`ConnectResult::session`] before using the token.
    pub fn connect(&self, account: u32, host_ip: u32, pid: u32) -> ConnectResult {
        mapper::connect_result(self.rpc.connect(account, host_ip, pid))
    }

    /// Close a session.
    pub fn disconnect(&self, session: SessionToken) -> i32 {
        mapper::status(names::DISCONNECT, self.rpc.disconnect(session))
    }

    /// Create a chronicle.
    pub fn create_chronicle(
        &self,
        session: SessionToken,
        name: &str,
        attrs: &Attributes,
        flags: i32,
    ) -> i32 {
        mapper::status(
            names::CREATE_CHRONICLE,
            self.rpc.create_chronicle(session, name, attrs, flags),
        )
    }

    /// Destroy a chronicle.
    pub fn destroy_chronicle(&self, session: SessionToken, name: &str) -> i32 {
        mapper::status(
            names::DESTROY_CHRONICLE,
            self.rpc.destroy_chronicle(session, name),
        )
    }

    /// Acquire a story.
    pub fn acquire_story(
        &self,
        session: SessionToken,
        chronicle_name: &str,
        story_name: &str,
        attrs: &Attributes,
        flags: i32,
    ) -> AcquireStoryResult {
        mapper::acquire_result(self.rpc.acquire_story(
            session,
            chronicle_name,
            story_name,
            attrs,
            flags,
        ))
    }

    /// Release a story.
    pub fn release_story(&self, session: SessionToken, chronicle_name: &str, story_name: &str) -> i32 {
        mapper::status(
            names::RELEASE_STORY,
            self.rpc.release_story(session, chronicle_name, story_name),
        )
    }

    /// Destroy a story.
    pub fn destroy_story(&self, session: SessionToken, chronicle_name: &str, story_name: &str) -> i32 {
        mapper::status(
            names::DESTROY_STORY,
            self.rpc.destroy_story(session, chronicle_name, story_name),
        )
    }

    /// Read one chronicle attribute. `value` is empty unless `status` is 0.
    pub fn get_chronicle_attr(
        &self,
        session: SessionToken,
        chronicle_name: &str,
        key: &str,
    ) -> ChronicleAttrResult {
        mapper::attr_result(self.rpc.get_chronicle_attr(session, chronicle_name, key))
    }

    /// Set one chronicle attribute.
    pub fn edit_chronicle_attr(
        &self,
        session: SessionToken,
        chronicle_name: &str,
        key: &str,
        value: &str,
    ) -> i32 {
        mapper::status(
            names::EDIT_CHRONICLE_ATTR,
            self.rpc.edit_chronicle_attr(session, chronicle_name, key, value),
        )
    }

    /// List chronicles. Empty both when there are none and when the call failed.
    pub fn show_chronicles(&self, session: SessionToken) -> Vec<String> {
        mapper::sequence(names::SHOW_CHRONICLES, self.rpc.show_chronicles(session))
    }

    /// List stories of a chronicle. Empty both when there are none and when
    /// the call failed.
    pub fn show_stories(&self, session: SessionToken, chronicle_name: &str) -> Vec<String> {
        mapper::sequence(
            names::SHOW_STORIES,
            self.rpc.show_stories(session, chronicle_name),
        )
    }
}

/// Resolve, connect and run the handshake.
async fn open(address: &str, provider_id: u16) -> Result<(Endpoint, BufReader<PipeStream>, InitSchema)> {
    let (endpoint, stream) = resolve(address).await?;
    let mut stream = BufReader::new(stream);

    let schema = handshake(&mut stream, provider_id)
        .await
        .map_err(|e| ChronologError::resolution(address, format!("handshake failed: {}", e)))?;

    Ok((endpoint, stream, schema))
}
