// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

use std::path::Path;
use std::sync::Arc;

use tracing::info;

use crate::auth::{AuthService, SessionGuard};
use crate::config::ClientConfig;
use crate::dispatch::Dispatcher;
use crate::error::ClientError;
use crate::hooks::{CarsHook, ClientsHook, ReservationsHook};
use crate::storage::{CredentialStore, FileStore, VisitStore};

/// Shared client context: configuration, both stores and one dispatcher.
///
/// Cheap to clone. Hooks built from it share the credential store and HTTP
/// client but each own their view state.
#[derive(Clone, Debug)]
pub struct UdriveClient {
    config: ClientConfig,
    visit: VisitStore,
    dispatcher: Arc<Dispatcher>,
}

impl UdriveClient {
    pub fn new(config: ClientConfig, credentials: CredentialStore) -> Result<Self, ClientError> {
        let dispatcher = Dispatcher::new(&config, credentials)?;
        Ok(Self {
            config,
            visit: VisitStore::default(),
            dispatcher: Arc::new(dispatcher),
        })
    }

    /// Client whose session persists in the JSON file at `session_path`.
    pub fn open(config: ClientConfig, session_path: impl AsRef<Path>) -> Result<Self, ClientError> {
        let file = FileStore::open(session_path)?;
        info!(
            api_base_url = %config.api_base_url,
            session_file = %file.path().display(),
            "Udrive client ready"
        );
        Self::new(config, CredentialStore::new(Arc::new(file)))
    }

    /// [`open`](Self::open) with configuration from the environment.
    pub fn from_env(session_path: impl AsRef<Path>) -> Result<Self, ClientError> {
        Self::open(ClientConfig::from_env()?, session_path)
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    pub fn credentials(&self) -> &CredentialStore {
        self.dispatcher.store()
    }

    pub fn visit(&self) -> &VisitStore {
        &self.visit
    }

    pub fn dispatcher(&self) -> Arc<Dispatcher> {
        self.dispatcher.clone()
    }

    pub fn auth(&self) -> AuthService {
        AuthService::new(self.dispatcher.clone())
    }

    pub fn guard(&self) -> SessionGuard {
        SessionGuard::new(self.credentials().clone())
    }

    pub fn reservations(&self) -> ReservationsHook {
        ReservationsHook::new(self.dispatcher.clone())
    }

    pub fn cars(&self) -> CarsHook {
        CarsHook::new(self.dispatcher.clone())
    }

    pub fn clients(&self) -> ClientsHook {
        ClientsHook::new(self.dispatcher.clone())
    }

    /// Whether the backend is reachable.
    pub async fn check_connectivity(&self) -> bool {
        self.dispatcher.check_connectivity().await
    }
}
