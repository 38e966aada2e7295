// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Authenticated Dispatch
//!
//! The backend has been seen to accept the bearer token in more than one
//! `Authorization` encoding depending on the endpoint. Every authenticated
//! request therefore goes through [`Dispatcher::dispatch`], which tries the
//! encodings in [`CANDIDATES`] order:
//!
//! 1. `Bearer <token>`
//! 2. `<token>`
//! 3. `<token>` again
//!
//! Attempts run one after another, never in parallel. The first 2xx wins and
//! its encoding is remembered in the credential store; nothing is written on
//! failure. Transport errors are recorded on the attempt and the loop moves
//! on.
//!
//! ## Mutations
//!
//! Re-sending a PUT/POST/DELETE after a failure can apply it twice if the
//! backend acted on a request whose response was lost. This is kept by
//! default and logged at `warn` on every re-send; set
//! `ClientConfig::retry_mutations = false` to only re-send after a 401/403.
//!
//! ## Cancellation
//!
//! [`Dispatcher::dispatch_with_cancel`] takes a `CancellationToken`. When it
//! fires the in-flight request is dropped, the attempt is recorded as
//! cancelled and the dispatch returns without touching the store.

pub mod result;

pub use result::{
    DispatchAttempt, DispatchError, DispatchResult, ResponseBody, CANCELLED_ERROR,
    MISSING_TOKEN_ERROR, NO_TOKEN_FORMAT,
};

use reqwest::header::{AUTHORIZATION, CONTENT_TYPE};
use reqwest::{Client, Method, StatusCode};
use serde_json::Value;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};
use url::Url;

use crate::auth::HeaderFormat;
use crate::config::{endpoints, ClientConfig};
use crate::storage::CredentialStore;

/// One way of encoding the token in the `Authorization` header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Candidate {
    pub name: &'static str,
    pub format: HeaderFormat,
}

/// Header encodings, in the order they are tried.
///
/// The third entry repeats the second; some backend deployments only
/// accepted the raw token on a second try.
pub const CANDIDATES: [Candidate; 3] = [
    Candidate {
        name: "Bearer prefix",
        format: HeaderFormat::WithBearer,
    },
    Candidate {
        name: "Raw token",
        format: HeaderFormat::WithoutBearer,
    },
    Candidate {
        name: "Raw token (repeat)",
        format: HeaderFormat::WithoutBearer,
    },
];

/// Response to an unauthenticated request.
#[derive(Debug, Clone, PartialEq)]
pub struct PublicResponse {
    pub status: u16,
    pub body: ResponseBody,
}

impl PublicResponse {
    pub fn ok(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// Status, body, and the reason the body could not be read as declared.
/// A body that fails to parse as JSON is kept as text.
type SendOutcome = Result<(StatusCode, ResponseBody, Option<String>), String>;

/// Sends requests to the backend on behalf of the signed-in user.
#[derive(Debug, Clone)]
pub struct Dispatcher {
    http: Client,
    base_url: Url,
    store: CredentialStore,
    retry_mutations: bool,
}

impl Dispatcher {
    /// Build a dispatcher with its own HTTP client (cookies enabled).
    pub fn new(config: &ClientConfig, store: CredentialStore) -> Result<Self, DispatchError> {
        let http = Client::builder()
            .timeout(config.request_timeout)
            .cookie_store(true)
            .danger_accept_invalid_certs(config.accept_invalid_certs)
            .build()
            .map_err(|e| DispatchError::Client(e.to_string()))?;

        Ok(Self {
            http,
            base_url: config.api_base_url.clone(),
            store,
            retry_mutations: config.retry_mutations,
        })
    }

    pub fn store(&self) -> &CredentialStore {
        &self.store
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// Resolve an absolute URL or a path relative to the API base URL.
    pub fn resolve(&self, url: &str) -> Result<Url, DispatchError> {
        if let Ok(absolute) = Url::parse(url) {
            if matches!(absolute.scheme(), "http" | "https") {
                return Ok(absolute);
            }
        }
        self.base_url
            .join(url.trim_start_matches('/'))
            .map_err(|e| DispatchError::InvalidUrl(format!("{url}: {e}")))
    }

    /// Authenticated GET.
    pub async fn get(&self, url: &str) -> DispatchResult {
        self.dispatch(url, Method::GET, None).await
    }

    /// Send one logical request, trying each header encoding in turn.
    pub async fn dispatch(&self, url: &str, method: Method, body: Option<&Value>) -> DispatchResult {
        self.dispatch_with_cancel(url, method, body, &CancellationToken::new())
            .await
    }

    /// [`dispatch`](Self::dispatch), abandoned as soon as `cancel` fires.
    pub async fn dispatch_with_cancel(
        &self,
        url: &str,
        method: Method,
        body: Option<&Value>,
        cancel: &CancellationToken,
    ) -> DispatchResult {
        let token = match self.store.token() {
            Ok(Some(token)) => token,
            Ok(None) => {
                debug!(url = %url, "No token in credential store, request not sent");
                return DispatchResult::missing_token();
            }
            Err(e) => {
                warn!(error = %e, "Credential store unreadable, treating token as missing");
                return DispatchResult::missing_token();
            }
        };
        let raw_token = token.strip_prefix("Bearer ").unwrap_or(&token);

        let target = match self.resolve(url) {
            Ok(target) => target,
            Err(e) => {
                return DispatchResult::failure(vec![DispatchAttempt::failed(
                    "Invalid URL",
                    e.to_string(),
                )])
            }
        };

        let safe = is_safe(&method);
        let mut attempts: Vec<DispatchAttempt> = Vec::with_capacity(CANDIDATES.len());

        for candidate in CANDIDATES {
            if let Some(previous) = attempts.last() {
                if !safe {
                    if !self.retry_mutations && !credentials_rejected(previous) {
                        warn!(
                            method = %method,
                            url = %target,
                            "Not re-sending mutation after a non-authentication failure"
                        );
                        break;
                    }
                    warn!(
                        method = %method,
                        url = %target,
                        format = candidate.name,
                        "Re-sending mutation with next header format"
                    );
                }
            }

            let header = candidate.format.header_value(raw_token);
            let sent = tokio::select! {
                biased;
                _ = cancel.cancelled() => None,
                outcome = self.send(&method, &target, Some(&header), body) => Some(outcome),
            };

            let Some(outcome) = sent else {
                debug!(url = %target, format = candidate.name, "Dispatch cancelled");
                attempts.push(DispatchAttempt::failed(candidate.name, CANCELLED_ERROR));
                return DispatchResult::failure(attempts);
            };

            match outcome {
                Ok((status, parsed, body_error)) => {
                    let ok = status.is_success();
                    debug!(
                        url = %target,
                        format = candidate.name,
                        status = status.as_u16(),
                        body_error = ?body_error,
                        "Dispatch attempt finished"
                    );
                    attempts.push(DispatchAttempt {
                        format: candidate.name.to_string(),
                        status: Some(status.as_u16()),
                        ok,
                        body: Some(parsed.clone()),
                        error: body_error,
                    });

                    if ok {
                        if let Err(e) = self.store.set_chosen_format(candidate.format) {
                            warn!(error = %e, "Could not remember winning header format");
                        }
                        info!(
                            method = %method,
                            url = %target,
                            format = %candidate.format,
                            attempts = attempts.len(),
                            "Authenticated request succeeded"
                        );
                        return DispatchResult {
                            success: true,
                            winning_format: Some(candidate.format),
                            data: Some(parsed),
                            attempts,
                        };
                    }
                }
                Err(transport_error) => {
                    debug!(
                        url = %target,
                        format = candidate.name,
                        error = %transport_error,
                        "Dispatch attempt failed"
                    );
                    attempts.push(DispatchAttempt::failed(candidate.name, transport_error));
                }
            }
        }

        warn!(
            method = %method,
            url = %target,
            attempts = attempts.len(),
            last_status = ?attempts.iter().rev().find_map(|a| a.status),
            "Authenticated request failed with every header format"
        );
        DispatchResult::failure(attempts)
    }

    /// Request without credentials (sign-in, sign-up, connectivity check).
    pub async fn send_public(
        &self,
        url: &str,
        method: Method,
        body: Option<&Value>,
    ) -> Result<PublicResponse, DispatchError> {
        let target = self.resolve(url)?;
        let (status, body, body_error) = self
            .send(&method, &target, None, body)
            .await
            .map_err(DispatchError::Request)?;
        if let Some(e) = body_error {
            debug!(url = %target, error = %e, "Public response body kept as text");
        }

        Ok(PublicResponse {
            status: status.as_u16(),
            body,
        })
    }

    /// Whether the backend answers at all.
    pub async fn check_connectivity(&self) -> bool {
        match self
            .send_public(endpoints::CONNECTIVITY_CHECK, Method::GET, None)
            .await
        {
            Ok(response) => {
                info!(status = response.status, "Backend connectivity check answered");
                response.ok()
            }
            Err(e) => {
                warn!(error = %e, "Backend connectivity check failed");
                false
            }
        }
    }

    async fn send(
        &self,
        method: &Method,
        url: &Url,
        authorization: Option<&str>,
        body: Option<&Value>,
    ) -> SendOutcome {
        let mut request = self
            .http
            .request(method.clone(), url.clone())
            .header(CONTENT_TYPE, "application/json");
        if let Some(authorization) = authorization {
            request = request.header(AUTHORIZATION, authorization);
        }
        if let Some(body) = body {
            request = request.json(body);
        }

        let response = request.send().await.map_err(|e| e.to_string())?;
        let status = response.status();
        let is_json = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .is_some_and(|ct| ct.to_ascii_lowercase().contains("json"));

        match response.bytes().await {
            Ok(bytes) => {
                let (parsed, body_error) = parse_body(is_json, &bytes);
                Ok((status, parsed, body_error))
            }
            Err(e) => Ok((
                status,
                ResponseBody::Text(String::new()),
                Some(format!("reading body: {e}")),
            )),
        }
    }
}

/// JSON when the server said so, text otherwise. An empty JSON body reads as
/// empty text. A body that claims JSON but does not parse comes back as its
/// raw text together with the parse error.
fn parse_body(is_json: bool, bytes: &[u8]) -> (ResponseBody, Option<String>) {
    let text = || ResponseBody::Text(String::from_utf8_lossy(bytes).into_owned());
    if !is_json || bytes.is_empty() {
        return (text(), None);
    }
    match serde_json::from_slice(bytes) {
        Ok(value) => (ResponseBody::Json(value), None),
        Err(e) => (text(), Some(format!("invalid JSON body: {e}"))),
    }
}

fn is_safe(method: &Method) -> bool {
    matches!(*method, Method::GET | Method::HEAD | Method::OPTIONS)
}

fn credentials_rejected(attempt: &DispatchAttempt) -> bool {
    matches!(attempt.status, Some(401) | Some(403))
}
