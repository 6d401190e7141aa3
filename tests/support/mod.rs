//! In-process stub ChronoLog server for integration tests.
//!
//! Listens on a Unix socket inside a temporary directory, answers `$hello`
//! with a schema for the configured procedures, and replies to each request
//! according to a script keyed by procedure name.

#![allow(dead_code)]

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use std::thread::JoinHandle;
use std::time::Duration;

use chronolog_client::codec::MsgPackCodec;
use chronolog_client::control::{build_init_message, parse_hello_message, InitSchema};
use chronolog_client::procedure::CATALOG;
use chronolog_client::protocol::{build_frame, flags, Frame, FrameBuffer, Header};
use serde::Serialize;
use tempfile::TempDir;
use tokio::io::{AsyncBufReadExt, AsyncReadExt, AsyncWrite, AsyncWriteExt, BufReader};
use tokio::net::{UnixListener, UnixStream};
use tokio::sync::oneshot;

/// How the stub answers one request.
pub enum Reply {
    /// Response frame carrying this MsgPack payload.
    Value(Vec<u8>),
    /// Error frame carrying this message.
    Fault(String),
    /// Answer after a delay, without holding up later requests.
    Delayed(Duration, Box<Reply>),
    /// Never answer.
    Silent,
    /// Close the connection.
    Hangup,
}

/// Response frame carrying `value`.
pub fn ok<T: Serialize + ?Sized>(value: &T) -> Reply {
    Reply::Value(MsgPackCodec::encode(value).unwrap())
}

pub type Script = Arc<dyn Fn(&str, &[u8]) -> Reply + Send + Sync>;

/// A request as received by the stub.
#[derive(Debug, Clone)]
pub struct Recorded {
    pub procedure: String,
    pub payload: Vec<u8>,
}

pub struct StubServer {
    path: PathBuf,
    requests: Arc<Mutex<Vec<Recorded>>>,
    shutdown: Option<oneshot::Sender<()>>,
    thread: Option<JoinHandle<()>>,
    _dir: TempDir,
}

impl StubServer {
    /// Serve every procedure the client binds.
    pub fn start<F>(script: F) -> Self
    where
        F: Fn(&str, &[u8]) -> Reply + Send + Sync + 'static,
    {
        Self::with_procedures(&CATALOG, script)
    }

    /// Serve only `names`, with IDs assigned in order from 1.
    pub fn with_procedures<F>(names: &[&str], script: F) -> Self
    where
        F: Fn(&str, &[u8]) -> Reply + Send + Sync + 'static,
    {
        let procedures: Vec<(String, u16)> = names
            .iter()
            .enumerate()
            .map(|(i, name)| (name.to_string(), i as u16 + 1))
            .collect();

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("chronolog.sock");
        let listener = std::os::unix::net::UnixListener::bind(&path).unwrap();
        listener.set_nonblocking(true).unwrap();

        let requests = Arc::new(Mutex::new(Vec::new()));
        let (shutdown_tx, shutdown_rx) = oneshot::channel();
        let script: Script = Arc::new(script);

        let recorded = requests.clone();
        let thread = std::thread::spawn(move || {
            let runtime = tokio::runtime::Builder::new_current_thread()
                .enable_all()
                .build()
                .unwrap();
            runtime.block_on(accept_loop(listener, procedures, script, recorded, shutdown_rx));
        });

        Self {
            path,
            requests,
            shutdown: Some(shutdown_tx),
            thread: Some(thread),
            _dir: dir,
        }
    }

    /// Address a client connects to.
    pub fn address(&self) -> String {
        format!("na+sm://{}", self.path.display())
    }

    /// Requests received so far, in arrival order.
    pub fn requests(&self) -> Vec<Recorded> {
        self.requests.lock().unwrap().clone()
    }

    /// Payloads received for `procedure`.
    pub fn payloads(&self, procedure: &str) -> Vec<Vec<u8>> {
        self.requests()
            .into_iter()
            .filter(|r| r.procedure == procedure)
            .map(|r| r.payload)
            .collect()
    }
}

impl Drop for StubServer {
    fn drop(&mut self) {
        if let Some(tx) = self.shutdown.take() {
            let _ = tx.send(());
        }
        if let Some(thread) = self.thread.take() {
            let _ = thread.join();
        }
    }
}

async fn accept_loop(
    listener: std::os::unix::net::UnixListener,
    procedures: Vec<(String, u16)>,
    script: Script,
    requests: Arc<Mutex<Vec<Recorded>>>,
    mut shutdown: oneshot::Receiver<()>,
) {
    let listener = UnixListener::from_std(listener).unwrap();
    loop {
        tokio::select! {
            _ = &mut shutdown => return,
            accepted = listener.accept() => {
                let Ok((stream, _)) = accepted else { return };
                tokio::spawn(serve_connection(
                    stream,
                    procedures.clone(),
                    script.clone(),
                    requests.clone(),
                ));
            }
        }
    }
}

async fn serve_connection(
    stream: UnixStream,
    procedures: Vec<(String, u16)>,
    script: Script,
    requests: Arc<Mutex<Vec<Recorded>>>,
) {
    let mut stream = BufReader::new(stream);

    let mut line = String::new();
    if stream.read_line(&mut line).await.unwrap_or(0) == 0 {
        return;
    }
    if parse_hello_message(&line).is_err() {
        return;
    }

    let mut schema = InitSchema::new();
    for (name, id) in &procedures {
        schema.add_procedure(name, *id);
    }
    let mut init = build_init_message(&schema);
    init.push('\n');
    if stream.write_all(init.as_bytes()).await.is_err() {
        return;
    }

    let names: HashMap<u16, String> = procedures.into_iter().map(|(n, id)| (id, n)).collect();
    let (mut reader, writer) = tokio::io::split(stream);
    let writer = Arc::new(tokio::sync::Mutex::new(writer));

    let mut frames = FrameBuffer::new();
    let mut buf = vec![0u8; 64 * 1024];
    loop {
        let n = match reader.read(&mut buf).await {
            Ok(0) | Err(_) => return,
            Ok(n) => n,
        };
        let Ok(received) = frames.push(&buf[..n]) else { return };

        for frame in received {
            let name = names.get(&frame.procedure_id()).cloned().unwrap_or_default();
            requests.lock().unwrap().push(Recorded {
                procedure: name.clone(),
                payload: frame.payload().to_vec(),
            });

            match script(&name, frame.payload()) {
                Reply::Hangup => {
                    let _ = writer.lock().await.shutdown().await;
                    return;
                }
                Reply::Silent => {}
                Reply::Delayed(delay, reply) => {
                    let writer = writer.clone();
                    tokio::spawn(async move {
                        tokio::time::sleep(delay).await;
                        send_reply(&writer, &frame, *reply).await;
                    });
                }
                reply => send_reply(&writer, &frame, reply).await,
            }
        }
    }
}

async fn send_reply<W>(writer: &tokio::sync::Mutex<W>, request: &Frame, reply: Reply)
where
    W: AsyncWrite + Unpin,
{
    let (frame_flags, payload) = match reply {
        Reply::Value(payload) => (flags::RESPONSE, payload),
        Reply::Fault(message) => (flags::ERROR_RESPONSE, MsgPackCodec::encode(&message).unwrap()),
        _ => return,
    };
    let header = Header::new(
        request.procedure_id(),
        frame_flags,
        request.request_id(),
        payload.len() as u32,
    );
    let mut writer = writer.lock().await;
    let _ = writer.write_all(&build_frame(&header, &payload)).await;
    let _ = writer.flush().await;
}
