use crate::prelude::{eprintln, *};
use std::future::Future;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt, BufReader};

use super::McpServer;

/// Serve newline-delimited JSON-RPC on stdin/stdout until EOF or Ctrl-C
pub async fn run_stdio(server: McpServer) -> Result<()> {
    if server.verbose {
        eprintln!("Starting MCP server with stdio transport...");
        eprintln!();
    }

    let reader = BufReader::new(tokio::io::stdin());
    let writer = tokio::io::stdout();

    serve_lines(reader, writer, &server, super::shutdown_signal()).await
}

/// Answer one request per line until the reader is exhausted or `shutdown`
/// resolves. `shutdown` is polled while waiting for input and while a
/// request is in flight.
async fn serve_lines<R, W, F>(
    mut reader: R,
    mut writer: W,
    server: &McpServer,
    shutdown: F,
) -> Result<()>
where
    R: AsyncBufRead + Unpin,
    W: AsyncWrite + Unpin,
    F: Future<Output = ()>,
{
    tokio::pin!(shutdown);
    let mut line = String::new();

    loop {
        line.clear();

        let bytes_read = tokio::select! {
            read = reader.read_line(&mut line) => read?,
            _ = &mut shutdown => break,
        };

        if bytes_read == 0 {
            break; // EOF
        }

        let trimmed = line.trim();
        if trimmed.is_empty() {
            continue;
        }

        if server.verbose {
            eprintln!("Received: {trimmed}");
        }

        let response = tokio::select! {
            response = super::handle_request(trimmed, server) => response,
            _ = &mut shutdown => break,
        };
        let Some(response) = response else {
            continue;
        };
        let response_json = serde_json::to_string(&response)?;

        if server.verbose {
            eprintln!("Sending: {response_json}");
        }

        writer.write_all(response_json.as_bytes()).await?;
        writer.write_all(b"\n").await?;
        writer.flush().await?;
    }

    Ok(())
}
