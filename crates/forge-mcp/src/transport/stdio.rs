//! Stdio transport
//!
//! One JSON-RPC message per line on stdin, one response per line on stdout.
//! Logs go to stderr so they never interleave with the protocol.

use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt, BufReader};
use tokio_util::sync::CancellationToken;

use crate::Result;
use crate::server::McpServer;

/// Serve the process's stdin and stdout until EOF or shutdown.
pub async fn run_stdio(server: McpServer, shutdown: CancellationToken) -> Result<()> {
    tracing::info!("MCP server ready, listening on stdio");
    serve_lines(
        &server,
        BufReader::new(tokio::io::stdin()),
        tokio::io::stdout(),
        shutdown,
    )
    .await
}

/// Answer newline-delimited messages from `reader` on `writer`.
///
/// Blank lines are skipped and notifications produce no output. Returns
/// when the reader hits EOF or `shutdown` is cancelled.
pub async fn serve_lines<R, W>(
    server: &McpServer,
    reader: R,
    mut writer: W,
    shutdown: CancellationToken,
) -> Result<()>
where
    R: AsyncBufRead + Unpin,
    W: AsyncWrite + Unpin,
{
    let mut lines = reader.lines();

    loop {
        let line = tokio::select! {
            _ = shutdown.cancelled() => break,
            line = lines.next_line() => line?,
        };
        let Some(line) = line else {
            tracing::info!("Stdin closed");
            break;
        };

        let line = line.trim();
        if line.is_empty() {
            continue;
        }

        tracing::debug!(request = %line, "Received message");

        if let Some(response) = server.respond(line, None).await {
            writer.write_all(response.as_bytes()).await?;
            writer.write_all(b"\n").await?;
            writer.flush().await?;
        }
    }

    Ok(())
}
