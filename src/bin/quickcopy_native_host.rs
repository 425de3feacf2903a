/// Native messaging host for the QuickCopy browser extension.
/// Reads length-prefixed JSON requests from stdin, forwards each to the local
/// QuickCopy service (`POST /message`) and writes the response back as a frame.
use anyhow::Context;
use quickcopy_lib::config::read_port;
use quickcopy_lib::logging::{self, Verbosity};
use quickcopy_lib::native_messaging::{read_frame, write_frame, FrameError};
use serde_json::{json, Value};
use std::io;
use std::time::Duration;

struct ServiceClient {
    client: reqwest::blocking::Client,
}

impl ServiceClient {
    fn new() -> anyhow::Result<Self> {
        let client = reqwest::blocking::Client::builder()
            .timeout(Duration::from_secs(10))
            .build()
            .context("failed to build HTTP client")?;
        Ok(Self { client })
    }

    /// The port is re-read for every request so the host keeps working
    /// across service restarts.
    fn forward(&self, request: &Value) -> Result<Value, String> {
        let port = read_port()?;
        let resp = self
            .client
            .post(format!("http://127.0.0.1:{port}/message"))
            .json(request)
            .send()
            .map_err(|e| format!("HTTP request failed: {e}"))?;
        resp.json::<Value>()
            .map_err(|e| format!("Failed to parse response: {e}"))
    }
}

fn error_response(message: impl std::fmt::Display) -> Value {
    json!({"success": false, "error": message.to_string()})
}

fn main() -> anyhow::Result<()> {
    logging::init(Verbosity::Quiet);
    let client = ServiceClient::new()?;

    let mut stdin = io::stdin().lock();
    let mut stdout = io::stdout().lock();

    loop {
        let response = match read_frame(&mut stdin) {
            Ok(None) => break,
            Ok(Some(request)) => client.forward(&request).unwrap_or_else(|e| {
                tracing::warn!("forwarding failed: {e}");
                error_response(format!("QuickCopy service unavailable: {e}"))
            }),
            Err(e) if e.is_recoverable() => {
                tracing::warn!("rejected frame: {e}");
                error_response(e)
            }
            Err(e) => return Err(e).context("failed to read from the browser"),
        };
        match write_frame(&mut stdout, &response) {
            Ok(()) => {}
            Err(FrameError::TooLarge(len)) => {
                tracing::warn!(len, "response too large for native messaging");
                write_frame(&mut stdout, &error_response(FrameError::TooLarge(len)))?;
            }
            Err(e) => return Err(e).context("failed to write to the browser"),
        }
    }
    Ok(())
}
