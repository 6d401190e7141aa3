//! Client side of the `$hello` / `$init` exchange.

use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncReadExt, AsyncWrite, AsyncWriteExt};

use super::init::{build_hello_message, parse_init_message, InitSchema};
use crate::error::{ChronologError, Result};

/// Longest `$init` line accepted from a server.
const MAX_INIT_LINE: u64 = 1024 * 1024;

/// Send `$hello` and wait for the server's `$init`.
///
/// The stream must be buffered so that bytes following the `$init` line
/// (the first response frames) stay available to the frame reader.
pub async fn handshake<S>(stream: &mut S, provider_id: u16) -> Result<InitSchema>
where
    S: AsyncBufRead + AsyncWrite + Unpin,
{
    let mut hello = build_hello_message(provider_id);
    hello.push('\n');
    stream.write_all(hello.as_bytes()).await?;
    stream.flush().await?;

    let mut line = String::new();
    let n = (&mut *stream)
        .take(MAX_INIT_LINE)
        .read_line(&mut line)
        .await?;

    if n == 0 {
        return Err(ChronologError::Transport(
            "connection closed during handshake".to_string(),
        ));
    }
    if !line.ends_with('\n') {
        return Err(ChronologError::Serialization(format!(
            "`$init` line exceeds {} bytes",
            MAX_INIT_LINE
        )));
    }

    let schema = parse_init_message(&line)?;
    tracing::debug!(
        "Handshake complete: provider {} offers {} procedures",
        provider_id,
        schema.procedures.len()
    );
    Ok(schema)
}
