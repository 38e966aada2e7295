// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Domain Hooks
//!
//! Per-domain view state built on the [`Dispatcher`](crate::dispatch::Dispatcher):
//!
//! - `reservations` - approval queue, confirmed bookings, history
//! - `cars` - fleet listing and availability
//! - `clients` - user administration
//!
//! Every hook normalises backend JSON through [`crate::json`], keeps its
//! collections behind a tokio `RwLock`, and owns a cancellation token that
//! fires when the hook is dropped.

pub mod cars;
pub mod clients;
pub mod error;
pub mod ids;
pub mod reservations;

pub use cars::{CarView, CarsHook, FallbackPolicy, ToggleOutcome};
pub use clients::{ClientView, ClientsHook};
pub use error::HookError;
pub use reservations::{
    DisplayStatus, ReservationState, ReservationStatus, ReservationView, ReservationsHook,
};
