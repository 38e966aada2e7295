// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Sign-in, sign-up and sign-out.
//!
//! These calls go out without credentials. A successful sign-in replaces
//! whatever session was stored before.

use std::sync::Arc;

use reqwest::Method;
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};
use tracing::{info, warn};

use super::claims::{self, DecodedToken};
use super::error::AuthError;
use super::roles::Role;
use super::session::Session;
use super::strategies::ROLE_STRATEGIES;
use crate::config::endpoints;
use crate::dispatch::{Dispatcher, PublicResponse, ResponseBody};
use crate::json::{first_str, first_text};

/// Keys a sign-in response may carry the token under.
const TOKEN_KEYS: [&str; 6] = [
    "token",
    "accessToken",
    "access_token",
    "jwt",
    "/data/token",
    "/data/accessToken",
];

/// Registration form.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SignupRequest {
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub password: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
}

/// What the third-party identity provider hands back after its popup.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IdentityResult {
    pub id_token: String,
    pub email: String,
    pub uid: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,
}

#[derive(Debug, Clone)]
pub struct AuthService {
    dispatcher: Arc<Dispatcher>,
}

impl AuthService {
    pub fn new(dispatcher: Arc<Dispatcher>) -> Self {
        Self { dispatcher }
    }

    /// Password sign-in.
    pub async fn login(&self, email: &str, password: &str) -> Result<Session, AuthError> {
        let response = self
            .post(endpoints::LOGIN, &json!({ "email": email, "password": password }))
            .await?;
        self.establish(response, Some(email), None)
    }

    /// Register a new account.
    ///
    /// Some backend versions sign the new user in straight away; when the
    /// response carries a token the session is stored and returned.
    pub async fn signup(&self, request: &SignupRequest) -> Result<Option<Session>, AuthError> {
        let body = serde_json::to_value(request)
            .map_err(|e| AuthError::InvalidResponse(format!("signup form: {e}")))?;
        let response = self.post(endpoints::SIGNUP, &body).await?;

        if response.ok() && response_token(&response).is_none() {
            info!(email = %request.email, "Account created");
            return Ok(None);
        }
        self.establish(response, Some(&request.email), None)
            .map(Some)
    }

    /// Exchange an identity-provider result for a backend session.
    pub async fn sign_in_with_identity(
        &self,
        identity: &IdentityResult,
    ) -> Result<Session, AuthError> {
        let body = json!({
            "idToken": identity.id_token,
            "email": identity.email,
            "uid": identity.uid,
            "displayName": identity.display_name,
        });
        let response = self.post(endpoints::IDENTITY_LOGIN, &body).await?;
        self.establish(response, Some(&identity.email), Some(&identity.uid))
    }

    /// Forget the stored session.
    pub fn logout(&self) -> Result<(), AuthError> {
        self.dispatcher.store().clear()?;
        info!("Signed out");
        Ok(())
    }

    async fn post(&self, url: &str, body: &Value) -> Result<PublicResponse, AuthError> {
        self.dispatcher
            .send_public(url, Method::POST, Some(body))
            .await
            .map_err(|e| AuthError::Request(e.to_string()))
    }

    /// Turn a sign-in response into a stored session.
    fn establish(
        &self,
        response: PublicResponse,
        fallback_email: Option<&str>,
        fallback_user_id: Option<&str>,
    ) -> Result<Session, AuthError> {
        if !response.ok() {
            let reason = rejection_reason(&response);
            warn!(status = response.status, reason = %reason, "Sign-in rejected");
            return Err(AuthError::LoginRejected(reason));
        }

        let token = response_token(&response).ok_or_else(|| {
            AuthError::InvalidResponse("response carries no token".to_string())
        })?;
        let decoded = claims::decode(&token)?;
        let body = response.body.as_json().cloned().unwrap_or(Value::Null);

        let role = role_hint(&decoded.claims)
            .or_else(|| body.as_object().and_then(role_hint))
            .unwrap_or_default();

        let user_id = first_str(&body, &["id", "userId", "/user/id", "/data/id", "/data/userId"])
            .or_else(|| decoded.subject.clone())
            .or_else(|| fallback_user_id.map(str::to_string));

        let email = first_text(&body, &["email", "/user/email", "/data/email"])
            .or_else(|| decoded.email().map(str::to_string))
            .or_else(|| fallback_email.map(str::to_string));

        let session = Session {
            bearer_token: Some(token),
            user_id,
            user_role: Some(role),
            email,
            chosen_header_format: None,
        };

        let store = self.dispatcher.store();
        store.clear()?;
        store.save(&session)?;

        info!(
            user_id = ?session.user_id,
            role = %role,
            expires_at = ?expiry(&decoded),
            "Signed in"
        );
        Ok(session)
    }
}

fn response_token(response: &PublicResponse) -> Option<String> {
    let body = response.body.as_json()?;
    first_text(body, &TOKEN_KEYS).map(|t| t.strip_prefix("Bearer ").unwrap_or(&t).to_string())
}

/// Role from the first strategy with an opinion; `None` when no shape matched.
fn role_hint(claims: &Map<String, Value>) -> Option<Role> {
    ROLE_STRATEGIES
        .iter()
        .find_map(|strategy| strategy.extract(claims))
}

fn rejection_reason(response: &PublicResponse) -> String {
    let from_json = response
        .body
        .as_json()
        .and_then(|body| first_text(body, &["message", "error", "/error/message", "detail"]));
    let from_text = match &response.body {
        ResponseBody::Text(text) if !text.trim().is_empty() => {
            Some(text.trim().to_string())
        }
        _ => None,
    };
    from_json
        .or(from_text)
        .unwrap_or_else(|| format!("HTTP {}", response.status))
}

fn expiry(decoded: &DecodedToken) -> Option<String> {
    decoded.expires_at().map(|t| t.to_rfc3339())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::claims::test_tokens::token_with_claims;
    use crate::auth::HeaderFormat;
    use crate::config::ClientConfig;
    use crate::storage::CredentialStore;
    use mockito::Matcher;

    fn service_for(url: &str) -> (AuthService, CredentialStore) {
        let store = CredentialStore::in_memory();
        let config = ClientConfig::default().with_api_base_url(url).unwrap();
        let dispatcher = Dispatcher::new(&config, store.clone()).unwrap();
        (AuthService::new(Arc::new(dispatcher)), store)
    }

    #[tokio::test]
    async fn login_stores_session_from_token_and_body() {
        let mut server = mockito::Server::new_async().await;
        let token = token_with_claims(&json!({"sub": "ignored", "role": "ROLE_ADMIN"}));
        let mock = server
            .mock("POST", "/api/auth/login")
            .match_body(Matcher::Json(json!({
                "email": "admin@udrive.test",
                "password": "hunter2"
            })))
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(json!({"token": token, "user": {"id": 5}}).to_string())
            .create_async()
            .await;

        let (auth, store) = service_for(&server.url());
        store.set_chosen_format(HeaderFormat::WithoutBearer).unwrap();

        let session = auth.login("admin@udrive.test", "hunter2").await.unwrap();
        assert_eq!(session.user_id.as_deref(), Some("5"));
        assert_eq!(session.user_role, Some(Role::Admin));
        assert_eq!(session.email.as_deref(), Some("admin@udrive.test"));

        let stored = store.load().unwrap();
        assert_eq!(stored, session);
        assert_eq!(stored.chosen_header_format, None);
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn login_reads_alternate_token_key_and_subject() {
        let mut server = mockito::Server::new_async().await;
        let token = token_with_claims(&json!({"sub": 31, "email": "lina@udrive.test"}));
        let _mock = server
            .mock("POST", "/api/auth/login")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(json!({"accessToken": format!("Bearer {token}")}).to_string())
            .create_async()
            .await;

        let (auth, store) = service_for(&server.url());
        let session = auth.login("LINA@udrive.test", "pw").await.unwrap();

        assert_eq!(session.bearer_token.as_deref(), Some(token.as_str()));
        assert_eq!(session.user_id.as_deref(), Some("31"));
        assert_eq!(session.user_role, Some(Role::Client));
        assert_eq!(session.email.as_deref(), Some("lina@udrive.test"));
        assert!(store.load().unwrap().is_signed_in());
    }

    #[tokio::test]
    async fn body_role_used_when_token_has_none() {
        let mut server = mockito::Server::new_async().await;
        let token = token_with_claims(&json!({"sub": "8"}));
        let _mock = server
            .mock("POST", "/api/auth/login")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(json!({"jwt": token, "user": {"roles": [1]}}).to_string())
            .create_async()
            .await;

        let (auth, _) = service_for(&server.url());
        let session = auth.login("a@udrive.test", "pw").await.unwrap();
        assert_eq!(session.user_role, Some(Role::Admin));
    }

    #[tokio::test]
    async fn rejected_login_keeps_previous_session() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("POST", "/api/auth/login")
            .with_status(401)
            .with_header("content-type", "application/json")
            .with_body(r#"{"message": "Bad credentials"}"#)
            .create_async()
            .await;

        let (auth, store) = service_for(&server.url());
        let previous = Session {
            bearer_token: Some("old.token.value".to_string()),
            ..Default::default()
        };
        store.save(&previous).unwrap();

        let err = auth.login("x@udrive.test", "wrong").await.unwrap_err();
        match &err {
            AuthError::LoginRejected(reason) => assert_eq!(reason, "Bad credentials"),
            other => panic!("unexpected error: {other:?}"),
        }
        assert!(!err.requires_login());
        assert_eq!(store.load().unwrap(), previous);
    }

    #[tokio::test]
    async fn missing_token_in_response_is_invalid() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("POST", "/api/auth/login")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(r#"{"status": "ok"}"#)
            .create_async()
            .await;

        let (auth, _) = service_for(&server.url());
        let err = auth.login("x@udrive.test", "pw").await.unwrap_err();
        assert!(matches!(err, AuthError::InvalidResponse(_)));
    }

    #[tokio::test]
    async fn unreachable_backend_is_request_error() {
        let (auth, _) = service_for("http://127.0.0.1:9");
        let err = auth.login("x@udrive.test", "pw").await.unwrap_err();
        assert!(matches!(err, AuthError::Request(_)));
        assert_eq!(err.error_code(), "request_failed");
    }

    #[tokio::test]
    async fn signup_without_token_does_not_sign_in() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/api/auth/signup")
            .match_body(Matcher::Json(json!({
                "firstName": "Nora",
                "lastName": "Bennani",
                "email": "nora@udrive.test",
                "password": "pw"
            })))
            .with_status(201)
            .with_header("content-type", "application/json")
            .with_body(r#"{"id": 12}"#)
            .create_async()
            .await;

        let (auth, store) = service_for(&server.url());
        let request = SignupRequest {
            first_name: "Nora".to_string(),
            last_name: "Bennani".to_string(),
            email: "nora@udrive.test".to_string(),
            password: "pw".to_string(),
            phone: None,
        };

        assert_eq!(auth.signup(&request).await.unwrap(), None);
        assert!(!store.load().unwrap().is_signed_in());
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn signup_conflict_is_rejected() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("POST", "/api/auth/signup")
            .with_status(409)
            .with_body("Email already in use")
            .create_async()
            .await;

        let (auth, _) = service_for(&server.url());
        let request = SignupRequest {
            first_name: "A".to_string(),
            last_name: "B".to_string(),
            email: "taken@udrive.test".to_string(),
            password: "pw".to_string(),
            phone: Some("+212600000000".to_string()),
        };
        let err = auth.signup(&request).await.unwrap_err();
        assert!(matches!(err, AuthError::LoginRejected(reason) if reason == "Email already in use"));
    }

    #[tokio::test]
    async fn identity_sign_in_falls_back_to_provider_fields() {
        let mut server = mockito::Server::new_async().await;
        let token = token_with_claims(&json!({"exp": 4102444800_i64}));
        let mock = server
            .mock("POST", "/api/auth/google")
            .match_body(Matcher::PartialJson(json!({
                "idToken": "provider-id-token",
                "uid": "g-123"
            })))
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(json!({"token": token}).to_string())
            .create_async()
            .await;

        let (auth, _) = service_for(&server.url());
        let session = auth
            .sign_in_with_identity(&IdentityResult {
                id_token: "provider-id-token".to_string(),
                email: "g@udrive.test".to_string(),
                uid: "g-123".to_string(),
                display_name: None,
            })
            .await
            .unwrap();

        assert_eq!(session.user_id.as_deref(), Some("g-123"));
        assert_eq!(session.email.as_deref(), Some("g@udrive.test"));
        assert_eq!(session.user_role, Some(Role::Client));
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn logout_clears_store() {
        let (auth, store) = service_for("http://127.0.0.1:9");
        store
            .save(&Session {
                bearer_token: Some("a.b.c".to_string()),
                user_id: Some("1".to_string()),
                ..Default::default()
            })
            .unwrap();

        auth.logout().unwrap();
        assert_eq!(store.load().unwrap(), Session::default());
    }
}
