use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::error::{ClientError, Result};

/// Outcome of one command exchange.
///
/// Every send produces one of these; transport and timeout failures arrive
/// as `success: false` with `error` set rather than as a Rust error.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommandResult {
    pub success: bool,
    /// Reply payload as UTF-8 text. Empty on failure.
    pub data: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl CommandResult {
    pub fn ok(data: impl Into<String>) -> Self {
        Self {
            success: true,
            data: data.into(),
            error: None,
        }
    }

    pub fn failure(error: impl Into<String>) -> Self {
        Self {
            success: false,
            data: String::new(),
            error: Some(error.into()),
        }
    }

    /// The reply text on success, otherwise `Error: <message>`.
    pub fn display_text(&self) -> String {
        if self.success {
            self.data.clone()
        } else {
            format!("Error: {}", self.error.as_deref().unwrap_or("unknown error"))
        }
    }

    /// Parse the reply payload as JSON.
    pub fn json<T: DeserializeOwned>(&self) -> Result<T> {
        if !self.success {
            return Err(ClientError::ProtocolParse(format!(
                "command failed: {}",
                self.error.as_deref().unwrap_or("unknown error")
            )));
        }
        serde_json::from_str(self.data.trim()).map_err(|err| {
            ClientError::ProtocolParse(format!("{err} in reply {:?}", truncate(&self.data, 120)))
        })
    }

    /// Defensive JSON view: `None` on failure or unparsable payload.
    pub fn json_value(&self) -> Option<serde_json::Value> {
        self.json().ok()
    }
}

fn truncate(text: &str, max: usize) -> &str {
    match text.char_indices().nth(max) {
        Some((idx, _)) => &text[..idx],
        None => text,
    }
}
