//! Newline-delimited JSON request loop.
//!
//! Each input line is one request `{"id", "method", "params"}`; each gets
//! exactly one response line `{"jsonrpc", "id", "result" | "error"}`.
//! Requests are handled strictly in order.

use std::io;

use rconlink_client::CommandSender;
use serde::Deserialize;
use serde_json::{json, Value};
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt};
use tracing::{debug, warn};

use crate::dispatch::{DispatchError, Dispatcher};

pub const PARSE_ERROR: i64 = -32700;
pub const INVALID_REQUEST: i64 = -32600;
pub const METHOD_NOT_FOUND: i64 = -32601;
pub const INVALID_PARAMS: i64 = -32602;

pub const SERVER_NAME: &str = "rconlink";

#[derive(Debug, Deserialize)]
struct Request {
    #[serde(default)]
    id: Value,
    method: String,
    #[serde(default)]
    params: Value,
}

#[derive(Debug, Deserialize)]
struct CallParams {
    name: String,
    #[serde(default)]
    arguments: Value,
}

fn success(id: Value, result: Value) -> Value {
    json!({"jsonrpc": "2.0", "id": id, "result": result})
}

fn failure(id: Value, code: i64, message: impl Into<String>) -> Value {
    json!({"jsonrpc": "2.0", "id": id, "error": {"code": code, "message": message.into()}})
}

/// Handle one raw request line and produce its response.
pub async fn handle_line<C: CommandSender + 'static>(
    dispatcher: &Dispatcher<C>,
    line: &str,
) -> Value {
    let raw: Value = match serde_json::from_str(line) {
        Ok(raw) => raw,
        Err(err) => return failure(Value::Null, PARSE_ERROR, format!("Parse error: {err}")),
    };
    let id = raw.get("id").cloned().unwrap_or(Value::Null);
    let request: Request = match serde_json::from_value(raw) {
        Ok(request) => request,
        Err(err) => return failure(id, INVALID_REQUEST, format!("Invalid request: {err}")),
    };
    debug!(method = %request.method, "request");

    match request.method.as_str() {
        "initialize" => success(
            request.id,
            json!({
                "serverInfo": {"name": SERVER_NAME, "version": env!("CARGO_PKG_VERSION")},
                "capabilities": {"tools": {}},
            }),
        ),
        "tools/list" => success(request.id, json!({"tools": dispatcher.list_tools()})),
        "tools/call" => {
            let params: CallParams = match serde_json::from_value(request.params) {
                Ok(params) => params,
                Err(err) => {
                    return failure(request.id, INVALID_PARAMS, format!("Invalid params: {err}"))
                }
            };
            match dispatcher.call(&params.name, &params.arguments).await {
                Ok(response) => success(
                    request.id,
                    serde_json::to_value(&response).unwrap_or(Value::Null),
                ),
                Err(err @ DispatchError::UnknownTool(_)) => {
                    failure(request.id, INVALID_PARAMS, err.to_string())
                }
                Err(err) => failure(request.id, INVALID_REQUEST, err.to_string()),
            }
        }
        other => failure(
            request.id,
            METHOD_NOT_FOUND,
            format!("Method not found: {other}"),
        ),
    }
}

/// Serve requests from `reader` until end of input, writing responses to
/// `writer`. Blank lines are skipped.
pub async fn serve<C, R, W>(dispatcher: &Dispatcher<C>, reader: R, mut writer: W) -> io::Result<u64>
where
    C: CommandSender + 'static,
    R: AsyncBufRead + Unpin,
    W: AsyncWrite + Unpin,
{
    let mut lines = reader.lines();
    let mut handled = 0u64;
    while let Some(line) = lines.next_line().await? {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        let response = handle_line(dispatcher, line).await;
        if response.get("error").is_some() {
            warn!(response = %response, "request failed");
        }
        let mut out = serde_json::to_vec(&response).map_err(io::Error::other)?;
        out.push(b'\n');
        writer.write_all(&out).await?;
        writer.flush().await?;
        handled += 1;
    }
    Ok(handled)
}
