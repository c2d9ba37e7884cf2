//! The backend wraps every payload as `{ code, message, data }`.
//!
//! [`unwrap_response`] turns an HTTP status plus raw body into either the
//! unwrapped payload or a [`ClientError`], without touching the network so
//! it can be tested on canned bodies.

use reqwest::StatusCode;
use serde::Deserialize;
use serde_json::Value;

use crate::error::{ClientError, Result};

/// Business code carried in the envelope. The backend sends a number, some
/// gateways re-encode it as a string.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum BusinessCode {
    Number(i64),
    Text(String),
}

impl BusinessCode {
    pub fn is_success(&self) -> bool {
        match self {
            BusinessCode::Number(n) => *n == 200,
            BusinessCode::Text(s) => s.trim() == "200",
        }
    }
}

impl std::fmt::Display for BusinessCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            BusinessCode::Number(n) => write!(f, "{}", n),
            BusinessCode::Text(s) => f.write_str(s),
        }
    }
}

/// Parsed response envelope.
#[derive(Debug, Clone, Deserialize)]
pub struct Envelope {
    #[serde(default)]
    pub code: Option<BusinessCode>,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub data: Option<Value>,
}

impl Envelope {
    fn message_or(&self, fallback: impl Into<String>) -> String {
        self.message
            .as_deref()
            .map(str::trim)
            .filter(|m| !m.is_empty())
            .map(String::from)
            .unwrap_or_else(|| fallback.into())
    }
}

/// Interpret a finished HTTP exchange.
///
/// Order of checks: JSON body, HTTP status (401 becomes
/// [`ClientError::Unauthorized`]), business code. On success returns
/// `data`, or the whole envelope when `data` is absent or `null`.
pub fn unwrap_response(status: StatusCode, body: &[u8]) -> Result<Value> {
    let raw: Value = match serde_json::from_slice(body) {
        Ok(v) => v,
        Err(_) if !status.is_success() => {
            if status == StatusCode::UNAUTHORIZED {
                return Err(ClientError::Unauthorized(SESSION_EXPIRED.into()));
            }
            return Err(ClientError::Http {
                status: status.as_u16(),
                message: format!(
                    "request failed: {} {}",
                    status.as_u16(),
                    status.canonical_reason().unwrap_or("")
                )
                .trim_end()
                .to_string(),
            });
        }
        Err(e) => {
            return Err(ClientError::InvalidResponse(format!(
                "Response body is not JSON: {}",
                e
            )))
        }
    };

    let envelope: Envelope = match serde_json::from_value(raw.clone()) {
        Ok(env) => env,
        Err(_) => Envelope {
            code: None,
            message: None,
            data: None,
        },
    };

    if !status.is_success() {
        if status == StatusCode::UNAUTHORIZED {
            return Err(ClientError::Unauthorized(envelope.message_or(SESSION_EXPIRED)));
        }
        return Err(ClientError::Http {
            status: status.as_u16(),
            message: envelope.message_or(format!("request failed: {}", status.as_u16())),
        });
    }

    match &envelope.code {
        Some(code) if code.is_success() => {}
        other => {
            return Err(ClientError::Business {
                code: other
                    .as_ref()
                    .map(|c| c.to_string())
                    .unwrap_or_else(|| "missing".into()),
                message: envelope.message_or("request failed"),
            })
        }
    }

    match envelope.data {
        Some(data) if !data.is_null() => Ok(data),
        _ => Ok(raw),
    }
}

const SESSION_EXPIRED: &str = "Session expired, please log in again";
