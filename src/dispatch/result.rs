// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Dispatch outcomes and errors.

use serde::Serialize;
use serde_json::Value;

use crate::auth::HeaderFormat;

/// Attempt label used when no token was available.
pub const NO_TOKEN_FORMAT: &str = "No token";
/// Attempt error recorded when no token was available.
pub const MISSING_TOKEN_ERROR: &str = "missing";
/// Attempt error recorded when the caller cancelled the dispatch.
pub const CANCELLED_ERROR: &str = "cancelled";

/// A parsed response body.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum ResponseBody {
    /// Content-type said JSON and the body parsed
    Json(Value),
    /// Anything else, as text
    Text(String),
}

impl ResponseBody {
    pub fn as_json(&self) -> Option<&Value> {
        match self {
            ResponseBody::Json(value) => Some(value),
            ResponseBody::Text(_) => None,
        }
    }

    /// Owned JSON value; text bodies become `Value::String`.
    pub fn into_json(self) -> Value {
        match self {
            ResponseBody::Json(value) => value,
            ResponseBody::Text(text) => Value::String(text),
        }
    }
}

/// One try of one header format.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DispatchAttempt {
    /// Candidate name, e.g. `"Bearer prefix"`
    pub format: String,
    /// HTTP status, when a response arrived
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<u16>,
    pub ok: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub body: Option<ResponseBody>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl DispatchAttempt {
    pub(crate) fn failed(format: &str, error: impl Into<String>) -> Self {
        Self {
            format: format.to_string(),
            status: None,
            ok: false,
            body: None,
            error: Some(error.into()),
        }
    }
}

/// Result of a full dispatch: every attempt plus, on success, the winner.
///
/// When `success` is true the last attempt is the only one with `ok`.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DispatchResult {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub winning_format: Option<HeaderFormat>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<ResponseBody>,
    pub attempts: Vec<DispatchAttempt>,
}

impl DispatchResult {
    pub(crate) fn failure(attempts: Vec<DispatchAttempt>) -> Self {
        Self {
            success: false,
            winning_format: None,
            data: None,
            attempts,
        }
    }

    pub(crate) fn missing_token() -> Self {
        Self::failure(vec![DispatchAttempt::failed(
            NO_TOKEN_FORMAT,
            MISSING_TOKEN_ERROR,
        )])
    }

    /// No request was sent because there was no token.
    pub fn is_missing_token(&self) -> bool {
        matches!(
            self.attempts.as_slice(),
            [only] if only.format == NO_TOKEN_FORMAT && only.error.as_deref() == Some(MISSING_TOKEN_ERROR)
        )
    }

    /// The dispatch stopped because its cancellation token fired.
    pub fn was_cancelled(&self) -> bool {
        !self.success
            && self
                .attempts
                .last()
                .is_some_and(|a| a.error.as_deref() == Some(CANCELLED_ERROR))
    }

    /// HTTP status of the last attempt that got a response.
    pub fn last_status(&self) -> Option<u16> {
        self.attempts.iter().rev().find_map(|a| a.status)
    }

    /// Convert into a `Result`, keeping the attempts on failure.
    pub fn into_result(self) -> Result<ResponseBody, DispatchError> {
        if self.success {
            return Ok(self.data.unwrap_or(ResponseBody::Text(String::new())));
        }
        if self.is_missing_token() {
            return Err(DispatchError::MissingToken);
        }
        if self.was_cancelled() {
            return Err(DispatchError::Cancelled);
        }
        Err(DispatchError::Exhausted {
            attempts: self.attempts,
        })
    }
}

/// Dispatch error type.
#[derive(Debug, thiserror::Error)]
pub enum DispatchError {
    /// No credential: send the user to sign-in
    #[error("No credential present, sign-in required")]
    MissingToken,

    /// Every header format was tried and none was accepted
    #[error("Authentication or connectivity failure")]
    Exhausted { attempts: Vec<DispatchAttempt> },

    /// The view that started the dispatch went away
    #[error("Request cancelled")]
    Cancelled,

    #[error("Invalid request URL: {0}")]
    InvalidUrl(String),

    /// Unauthenticated request failed at the transport level
    #[error("Request failed: {0}")]
    Request(String),

    #[error("HTTP client setup failed: {0}")]
    Client(String),
}

impl DispatchError {
    pub fn error_code(&self) -> &'static str {
        match self {
            DispatchError::MissingToken => "missing_token",
            DispatchError::Exhausted { .. } => "dispatch_exhausted",
            DispatchError::Cancelled => "cancelled",
            DispatchError::InvalidUrl(_) => "invalid_url",
            DispatchError::Request(_) => "request_failed",
            DispatchError::Client(_) => "client_setup",
        }
    }

    /// Per-attempt diagnostics, for developer-facing debug panels.
    pub fn attempts(&self) -> &[DispatchAttempt] {
        match self {
            DispatchError::Exhausted { attempts } => attempts,
            _ => &[],
        }
    }

    /// Whether the user has to sign in (again).
    pub fn requires_login(&self) -> bool {
        match self {
            DispatchError::MissingToken => true,
            DispatchError::Exhausted { attempts } => attempts
                .iter()
                .filter_map(|a| a.status)
                .any(|status| status == 401),
            _ => false,
        }
    }
}
