// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Udrive - car-rental client data layer
//!
//! Session handling, authenticated dispatch and per-domain view state for
//! the Udrive backend.
//!
//! ## Modules
//!
//! - `auth` - Sign-in, session guard, token inspection and role extraction
//! - `config` - Environment configuration, endpoint paths, tracing setup
//! - `dispatch` - Authenticated requests with `Authorization` format fallback
//! - `hooks` - Reservations, cars and clients view state
//! - `json` - Tolerant field lookup over backend responses
//! - `storage` - Persistent credential store and per-visit store
//! - `state` - [`UdriveClient`](state::UdriveClient), the shared context

pub mod auth;
pub mod config;
pub mod dispatch;
pub mod error;
pub mod hooks;
pub mod json;
pub mod state;
pub mod storage;

pub use error::ClientError;
pub use state::UdriveClient;
