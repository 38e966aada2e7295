// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Client Storage
//!
//! Two scopes of key-value storage:
//!
//! - **Persistent** ([`CredentialStore`]) - the session, kept across runs in
//!   a JSON file ([`FileStore`]) or in memory for tests
//! - **Visit** ([`VisitStore`]) - the booking draft and post-login redirect,
//!   gone when the process exits
//!
//! ## Persistent Layout
//!
//! ```text
//! session.json
//!   {
//!     "token": "...",
//!     "userId": "...",
//!     "userRole": "ADMIN" | "CLIENT",
//!     "email": "...",
//!     "authHeaderFormat": "withBearer" | "withoutBearer"
//!   }
//! ```
//!
//! Each key is its own slot: absent keys are "never written", not empty.

pub mod backend;
pub mod credentials;
pub mod visit;

pub use backend::{FileStore, KeyValueStore, MemoryStore, StorageError, StorageResult};
pub use credentials::CredentialStore;
pub use visit::{BookingDraft, VisitStore};
