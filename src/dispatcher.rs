//! Call dispatcher: turns a bound procedure and an argument tuple into one
//! request/response round trip.
//!
//! The transport underneath is message based and asynchronous: a writer task
//! sends request frames, a reader task receives response frames and routes
//! each one by `request_id` to the call waiting for it. [`CallDispatcher::invoke`]
//! hides that behind a blocking call; [`CallDispatcher::call`] is the same
//! operation for callers that are already async.
//!
//! Every fault raised while encoding, sending, waiting or decoding surfaces
//! as a [`ChronologError`] from this module and never as a raw transport
//! error.
//!
//! # Example
//!
//! ```ignore
//! let status: i32 = dispatcher.invoke(&table.destroy_chronicle, &(token, "TestChronicle"))?;
//! ```

use std::collections::HashMap;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use bytes::Bytes;
use serde::de::DeserializeOwned;
use serde::Serialize;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite};
use tokio::sync::oneshot;
use tokio::task::JoinHandle;

use crate::codec::MsgPackCodec;
use crate::engine::Engine;
use crate::error::{ChronologError, Result};
use crate::procedure::ProcedureHandle;
use crate::protocol::{Frame, FrameBuffer, Header, DEFAULT_MAX_PAYLOAD_SIZE};
use crate::transport::Endpoint;
use crate::writer::{spawn_writer_task, OutboundFrame, WriterHandle, DEFAULT_CHANNEL_CAPACITY};

/// Size of a single socket read.
const READ_BUFFER_SIZE: usize = 64 * 1024;

/// Tuning for a [`CallDispatcher`].
#[derive(Debug, Clone)]
pub struct DispatcherConfig {
    /// Upper bound on waiting for one response. `None` waits indefinitely.
    pub request_timeout: Option<Duration>,
    /// Largest payload accepted in either direction.
    pub max_payload_size: u32,
    /// Capacity of the outbound frame channel.
    pub channel_capacity: usize,
}

impl Default for DispatcherConfig {
    fn default() -> Self {
        Self {
            request_timeout: None,
            max_payload_size: DEFAULT_MAX_PAYLOAD_SIZE,
            channel_capacity: DEFAULT_CHANNEL_CAPACITY,
        }
    }
}

type Waiter = oneshot::Sender<Result<Frame>>;

#[derive(Default)]
struct PendingState {
    /// Set once the reader or writer task stops; holds the reason.
    closed: Option<String>,
    waiters: HashMap<u32, Waiter>,
}

/// Calls waiting for their response, keyed by request ID.
#[derive(Clone, Default)]
struct PendingCalls {
    inner: Arc<Mutex<PendingState>>,
}

impl PendingCalls {
    fn lock(&self) -> MutexGuard<'_, PendingState> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn register(&self, request_id: u32) -> Result<(PendingGuard, oneshot::Receiver<Result<Frame>>)> {
        let mut state = self.lock();
        if let Some(reason) = &state.closed {
            return Err(ChronologError::Transport(reason.clone()));
        }
        if state.waiters.contains_key(&request_id) {
            return Err(ChronologError::Transport(format!(
                "request id {} still in flight",
                request_id
            )));
        }

        let (tx, rx) = oneshot::channel();
        state.waiters.insert(request_id, tx);

        let guard = PendingGuard {
            pending: self.clone(),
            request_id,
        };
        Ok((guard, rx))
    }

    /// Hand a response frame to its waiter. Returns false if nobody waits.
    fn complete(&self, frame: Frame) -> bool {
        let waiter = self.lock().waiters.remove(&frame.request_id());
        match waiter {
            Some(tx) => tx.send(Ok(frame)).is_ok(),
            None => false,
        }
    }

    fn cancel(&self, request_id: u32) {
        self.lock().waiters.remove(&request_id);
    }

    /// Fail every waiting call and refuse new ones.
    fn close(&self, reason: String) {
        let waiters = {
            let mut state = self.lock();
            state.closed = Some(reason.clone());
            std::mem::take(&mut state.waiters)
        };
        for (_, tx) in waiters {
            let _ = tx.send(Err(ChronologError::Transport(reason.clone())));
        }
    }

    fn is_closed(&self) -> bool {
        self.lock().closed.is_some()
    }

    fn len(&self) -> usize {
        self.lock().waiters.len()
    }
}

/// Removes a call's waiter when the call finishes or its future is dropped.
struct PendingGuard {
    pending: PendingCalls,
    request_id: u32,
}

impl Drop for PendingGuard {
    fn drop(&mut self) {
        self.pending.cancel(self.request_id);
    }
}

/// Performs remote procedure calls against one endpoint.
///
/// Safe to share between threads: concurrent calls are correlated by request
/// ID and may complete in any order. Nothing orders two concurrent calls
/// relative to each other.
pub struct CallDispatcher {
    endpoint: Endpoint,
    writer: WriterHandle,
    pending: PendingCalls,
    next_request_id: AtomicU32,
    request_timeout: Option<Duration>,
    max_payload_size: u32,
    _reader_task: JoinHandle<()>,
    _writer_task: JoinHandle<()>,
    // Dropped last so the tasks above are torn down with the runtime.
    engine: Engine,
}

impl CallDispatcher {
    /// Start the reader and writer tasks for an already connected stream.
    ///
    /// The stream must be positioned at the first response frame, i.e.
    /// after the handshake.
    pub(crate) fn start<S>(engine: Engine, endpoint: Endpoint, stream: S, config: DispatcherConfig) -> Self
    where
        S: AsyncRead + AsyncWrite + Send + 'static,
    {
        let (reader, write_half) = tokio::io::split(stream);
        let pending = PendingCalls::default();

        let (writer, writer_task) = {
            let _context = engine.enter();
            spawn_writer_task(write_half, config.channel_capacity)
        };
        let writer_task = engine.spawn(watch_writer(writer_task, pending.clone()));
        let reader_task = engine.spawn(read_loop(reader, pending.clone(), config.max_payload_size));

        Self {
            endpoint,
            writer,
            pending,
            next_request_id: AtomicU32::new(1),
            request_timeout: config.request_timeout,
            max_payload_size: config.max_payload_size,
            _reader_task: reader_task,
            _writer_task: writer_task,
            engine,
        }
    }

    /// Perform a call, blocking the current thread until it completes.
    ///
    /// `args` is encoded as-is; its arity and types must match what the
    /// server procedure expects. `R` is the expected response shape.
    ///
    /// # Errors
    ///
    /// - [`ChronologError::Serialization`] if `args` cannot be encoded or the
    ///   response does not decode as `R`
    /// - [`ChronologError::Transport`] if the connection is lost, the server
    ///   reports a fault, or the request timeout elapses
    ///
    /// # Panics
    ///
    /// Panics if called from within an async execution context; use
    /// [`CallDispatcher::call`] there.
    pub fn invoke<A, R>(&self, handle: &ProcedureHandle, args: &A) -> Result<R>
    where
        A: Serialize + ?Sized,
        R: DeserializeOwned,
    {
        self.engine.block_on(self.call(handle, args))
    }

    /// Perform a call asynchronously.
    ///
    /// The request timeout, if configured, is measured with the timer of the
    /// runtime polling this future.
    pub async fn call<A, R>(&self, handle: &ProcedureHandle, args: &A) -> Result<R>
    where
        A: Serialize + ?Sized,
        R: DeserializeOwned,
    {
        let payload = MsgPackCodec::encode(args)?;
        let payload_length = u32::try_from(payload.len())
            .ok()
            .filter(|len| *len <= self.max_payload_size)
            .ok_or_else(|| {
                ChronologError::Serialization(format!(
                    "request payload of {} bytes exceeds maximum {}",
                    payload.len(),
                    self.max_payload_size
                ))
            })?;

        let request_id = self.next_request_id();
        let (_guard, response) = self.pending.register(request_id)?;

        tracing::trace!("Calling {} as request {}", handle, request_id);
        let header = Header::request(handle.id(), request_id, payload_length);
        self.writer
            .send(OutboundFrame::new(&header, Bytes::from(payload)))
            .await?;

        let received = match self.request_timeout {
            Some(limit) => tokio::time::timeout(limit, response).await.map_err(|_| {
                ChronologError::Transport(format!(
                    "{} got no response within {:?}",
                    handle.name(),
                    limit
                ))
            })?,
            None => response.await,
        };
        let frame = received
            .map_err(|_| ChronologError::Transport("connection closed".to_string()))??;

        if frame.is_error() {
            let message: String = MsgPackCodec::decode(frame.payload())
                .unwrap_or_else(|_| "unspecified server fault".to_string());
            return Err(ChronologError::Transport(format!(
                "{} failed on server: {}",
                handle.name(),
                message
            )));
        }

        if frame.procedure_id() != handle.id() {
            return Err(ChronologError::Serialization(format!(
                "response to {} carries procedure id {}",
                handle,
                frame.procedure_id()
            )));
        }

        MsgPackCodec::decode(frame.payload())
    }

    /// Endpoint this dispatcher talks to.
    pub fn endpoint(&self) -> &Endpoint {
        &self.endpoint
    }

    /// True until the connection is lost.
    pub fn is_connected(&self) -> bool {
        !self.pending.is_closed() && !self.writer.is_closed()
    }

    /// Number of calls waiting for a response.
    pub fn in_flight(&self) -> usize {
        self.pending.len()
    }

    fn next_request_id(&self) -> u32 {
        loop {
            let id = self.next_request_id.fetch_add(1, Ordering::Relaxed);
            if id != 0 {
                return id;
            }
        }
    }
}

impl std::fmt::Debug for CallDispatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CallDispatcher")
            .field("endpoint", &self.endpoint)
            .field("in_flight", &self.in_flight())
            .field("request_timeout", &self.request_timeout)
            .finish()
    }
}

/// Fail every waiting call once the writer task stops on an error.
async fn watch_writer(writer_task: JoinHandle<Result<()>>, pending: PendingCalls) {
    let reason = match writer_task.await {
        Ok(Ok(())) => return,
        Ok(Err(e)) => format!("write failed: {}", e),
        Err(e) => format!("writer task stopped: {}", e),
    };
    pending.close(reason);
}

/// Read frames and route responses until the connection ends.
async fn read_loop<R>(mut reader: R, pending: PendingCalls, max_payload_size: u32)
where
    R: AsyncRead + Unpin,
{
    let mut frame_buffer = FrameBuffer::with_max_payload(max_payload_size);
    let mut buf = vec![0u8; READ_BUFFER_SIZE];

    let reason = loop {
        let n = match reader.read(&mut buf).await {
            Ok(0) => {
                tracing::debug!("Server closed the connection");
                break "connection closed by server".to_string();
            }
            Ok(n) => n,
            Err(e) => {
                tracing::error!("Read loop error: {}", e);
                break format!("read failed: {}", e);
            }
        };

        let frames = match frame_buffer.push(&buf[..n]) {
            Ok(frames) => frames,
            Err(e) => {
                tracing::error!("Read loop error: {}", e);
                break e.to_string();
            }
        };

        for frame in frames {
            if !frame.is_response() {
                tracing::warn!("Received unexpected request frame");
                continue;
            }
            let request_id = frame.request_id();
            if !pending.complete(frame) {
                tracing::warn!("Dropping response for unknown request {}", request_id);
            }
        }
    };

    pending.close(reason);
}
