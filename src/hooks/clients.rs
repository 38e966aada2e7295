// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! User administration.

use std::sync::Arc;

use chrono::NaiveDateTime;
use reqwest::Method;
use serde::Serialize;
use serde_json::Value;
use tokio::sync::RwLock;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use super::error::HookError;
use super::ids::coerce_id;
use crate::auth::strategies::extract_role_from;
use crate::auth::Role;
use crate::config::endpoints;
use crate::dispatch::Dispatcher;
use crate::json::{collection, first_datetime, first_i64, first_text};

/// Normalised user record.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ClientView {
    pub id: i64,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    /// Read with the same shapes accepted in token claims
    pub role: Role,
    pub created_at: Option<NaiveDateTime>,
}

impl ClientView {
    pub fn from_json(raw: &Value) -> Option<ClientView> {
        let id = first_i64(raw, &["id", "userId", "user_id", "clientId"])?;
        let role = raw.as_object().map(extract_role_from).unwrap_or_default();

        Some(ClientView {
            id,
            first_name: first_text(raw, &["firstName", "first_name", "prenom", "givenName"]),
            last_name: first_text(raw, &["lastName", "last_name", "nom", "familyName"]),
            email: first_text(raw, &["email", "mail", "username"]),
            phone: first_text(raw, &["phone", "phoneNumber", "telephone", "tel"]),
            role,
            created_at: first_datetime(raw, &["createdAt", "created_at", "registrationDate"]),
        })
    }

    /// "First Last", falling back to the email.
    pub fn display_name(&self) -> String {
        match (&self.first_name, &self.last_name) {
            (Some(first), Some(last)) => format!("{first} {last}"),
            (Some(name), None) | (None, Some(name)) => name.clone(),
            (None, None) => self
                .email
                .clone()
                .unwrap_or_else(|| format!("User #{}", self.id)),
        }
    }
}

pub struct ClientsHook {
    dispatcher: Arc<Dispatcher>,
    users: RwLock<Vec<ClientView>>,
    cancel: CancellationToken,
}

impl ClientsHook {
    pub fn new(dispatcher: Arc<Dispatcher>) -> Self {
        Self {
            dispatcher,
            users: RwLock::new(Vec::new()),
            cancel: CancellationToken::new(),
        }
    }

    pub async fn all(&self) -> Vec<ClientView> {
        self.users.read().await.clone()
    }

    pub async fn admins(&self) -> Vec<ClientView> {
        self.with_role(Role::Admin).await
    }

    pub async fn clients(&self) -> Vec<ClientView> {
        self.with_role(Role::Client).await
    }

    /// Reload every user. Returns the record count.
    pub async fn refresh(&self) -> Result<usize, HookError> {
        let body = self
            .dispatcher
            .dispatch_with_cancel(endpoints::USERS, Method::GET, None, &self.cancel)
            .await
            .into_result()?
            .into_json();

        let users: Vec<ClientView> = collection(&body, &["users", "clients"])
            .iter()
            .filter_map(ClientView::from_json)
            .collect();
        let count = users.len();
        *self.users.write().await = users;

        debug!(count, "Users refreshed");
        Ok(count)
    }

    /// Delete a user; removed locally only once the backend accepts.
    pub async fn delete(&self, id: impl std::fmt::Display) -> Result<(), HookError> {
        let id = coerce_id(id)?;
        if !self.users.read().await.iter().any(|u| u.id == id) {
            return Err(HookError::RecordNotFound { kind: "User", id });
        }

        self.dispatcher
            .dispatch_with_cancel(&endpoints::user(id), Method::DELETE, None, &self.cancel)
            .await
            .into_result()?;

        self.users.write().await.retain(|u| u.id != id);
        info!(user_id = id, "User deleted");
        Ok(())
    }

    async fn with_role(&self, role: Role) -> Vec<ClientView> {
        self.users
            .read()
            .await
            .iter()
            .filter(|u| u.role == role)
            .cloned()
            .collect()
    }
}

impl Drop for ClientsHook {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::Session;
    use crate::config::ClientConfig;
    use crate::dispatch::DispatchError;
    use crate::storage::CredentialStore;
    use serde_json::json;

    fn dispatcher_for(server: &mockito::ServerGuard) -> Arc<Dispatcher> {
        let store = CredentialStore::in_memory();
        store
            .save(&Session {
                bearer_token: Some("a.b.c".to_string()),
                ..Default::default()
            })
            .unwrap();
        let config = ClientConfig::default()
            .with_api_base_url(&server.url())
            .unwrap();
        Arc::new(Dispatcher::new(&config, store).unwrap())
    }

    async fn mock_users(server: &mut mockito::ServerGuard) -> mockito::Mock {
        server
            .mock("GET", "/api/users")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(
                json!([
                    {"id": 1, "firstName": "Amine", "lastName": "Haddad", "role": "ROLE_ADMIN"},
                    {"id": 2, "email": "lina@udrive.test", "roles": [{"authority": "ROLE_USER"}]},
                    {"id": "3", "prenom": "Youssef", "role": 0, "createdAt": "2026-01-15T08:00:00"},
                    {"id": 4, "roles": [1]}
                ])
                .to_string(),
            )
            .create_async()
            .await
    }

    #[test]
    fn role_uses_claim_shapes() {
        let admin = ClientView::from_json(&json!({"id": 1, "user": {"role": "ADMIN"}})).unwrap();
        assert_eq!(admin.role, Role::Admin);
        let plain = ClientView::from_json(&json!({"id": 2})).unwrap();
        assert_eq!(plain.role, Role::Client);
    }

    #[test]
    fn display_name_fallbacks() {
        let user = ClientView::from_json(&json!({"id": 9, "email": "x@udrive.test"})).unwrap();
        assert_eq!(user.display_name(), "x@udrive.test");
        let named = ClientView::from_json(&json!({"id": 9, "firstName": "Nora"})).unwrap();
        assert_eq!(named.display_name(), "Nora");
        let anonymous = ClientView::from_json(&json!({"id": 9})).unwrap();
        assert_eq!(anonymous.display_name(), "User #9");
    }

    #[tokio::test]
    async fn refresh_and_role_filters() {
        let mut server = mockito::Server::new_async().await;
        let _users = mock_users(&mut server).await;

        let hook = ClientsHook::new(dispatcher_for(&server));
        assert_eq!(hook.refresh().await.unwrap(), 4);

        let admin_ids: Vec<i64> = hook.admins().await.iter().map(|u| u.id).collect();
        assert_eq!(admin_ids, vec![1, 4]);
        let client_ids: Vec<i64> = hook.clients().await.iter().map(|u| u.id).collect();
        assert_eq!(client_ids, vec![2, 3]);

        let youssef = hook.all().await.into_iter().find(|u| u.id == 3).unwrap();
        assert_eq!(youssef.first_name.as_deref(), Some("Youssef"));
        assert!(youssef.created_at.is_some());
    }

    #[tokio::test]
    async fn delete_removes_on_success_only() {
        let mut server = mockito::Server::new_async().await;
        let _users = mock_users(&mut server).await;
        let _ok = server
            .mock("DELETE", "/api/users/2")
            .with_status(204)
            .create_async()
            .await;
        let _rejected = server
            .mock("DELETE", "/api/users/3")
            .with_status(409)
            .create_async()
            .await;

        let hook = ClientsHook::new(dispatcher_for(&server));
        hook.refresh().await.unwrap();

        hook.delete("2").await.unwrap();
        let err = hook.delete(3).await.unwrap_err();
        assert!(matches!(err, HookError::Dispatch(DispatchError::Exhausted { .. })));
        assert!(!err.requires_login());

        let ids: Vec<i64> = hook.all().await.iter().map(|u| u.id).collect();
        assert_eq!(ids, vec![1, 3, 4]);
    }

    #[tokio::test]
    async fn delete_unknown_user() {
        let server = mockito::Server::new_async().await;
        let hook = ClientsHook::new(dispatcher_for(&server));
        let err = hook.delete(12).await.unwrap_err();
        assert!(matches!(err, HookError::RecordNotFound { kind: "User", id: 12 }));
    }
}
