//! Call command implementation.

use std::net::SocketAddr;
use tips_server::{Request, Response};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::TcpStream;

/// Sends one request line and prints the response body.
///
/// Fails if the server answers with a non-2xx status.
pub fn run(addr: SocketAddr, request: &str) -> Result<(), Box<dyn std::error::Error>> {
    // Catch typos before touching the network.
    let request = Request::parse(request)?;
    let line = serde_json::to_string(&request)?;

    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()?;
    let response = runtime.block_on(send(addr, line))?;

    println!("{}", serde_json::to_string_pretty(&response.body)?);
    if response.is_success() {
        Ok(())
    } else {
        Err(format!("request failed with status {}", response.status).into())
    }
}

async fn send(addr: SocketAddr, mut line: String) -> Result<Response, Box<dyn std::error::Error>> {
    let stream = TcpStream::connect(addr).await?;
    tracing::debug!(%addr, "connected");
    let (reader, mut writer) = stream.into_split();

    line.push('\n');
    writer.write_all(line.as_bytes()).await?;

    let mut lines = BufReader::new(reader).lines();
    let reply = lines
        .next_line()
        .await?
        .ok_or("connection closed before a response arrived")?;
    Ok(serde_json::from_str(&reply)?)
}
