// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Visit-scoped storage: the in-progress booking form and the post-login
//! redirect target. Lives only as long as the process.

use std::sync::Arc;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use super::backend::{KeyValueStore, MemoryStore, StorageResult};

const BOOKING_DRAFT_KEY: &str = "bookingForm";
const REDIRECT_KEY: &str = "redirectAfterLogin";

/// Booking funnel input carried from the search form to the car listing and
/// on to confirmation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BookingDraft {
    pub pickup_location: String,
    #[serde(default)]
    pub dropoff_location: Option<String>,
    pub pickup_date: NaiveDate,
    pub dropoff_date: NaiveDate,
}

impl BookingDraft {
    /// Rental length in whole days, at least one.
    pub fn rental_days(&self) -> i64 {
        (self.dropoff_date - self.pickup_date).num_days().max(1)
    }

    /// Drop-off location, defaulting to the pick-up location.
    pub fn effective_dropoff(&self) -> &str {
        self.dropoff_location
            .as_deref()
            .filter(|l| !l.trim().is_empty())
            .unwrap_or(&self.pickup_location)
    }
}

/// Per-visit store.
#[derive(Clone)]
pub struct VisitStore {
    backend: Arc<dyn KeyValueStore>,
}

impl Default for VisitStore {
    fn default() -> Self {
        Self::new(Arc::new(MemoryStore::new()))
    }
}

impl std::fmt::Debug for VisitStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("VisitStore").finish_non_exhaustive()
    }
}

impl VisitStore {
    pub fn new(backend: Arc<dyn KeyValueStore>) -> Self {
        Self { backend }
    }

    pub fn save_booking_draft(&self, draft: &BookingDraft) -> StorageResult<()> {
        self.backend
            .set(BOOKING_DRAFT_KEY, &serde_json::to_string(draft)?)
    }

    /// The saved draft. A draft that no longer parses is treated as absent.
    pub fn booking_draft(&self) -> StorageResult<Option<BookingDraft>> {
        Ok(self
            .backend
            .get(BOOKING_DRAFT_KEY)?
            .and_then(|raw| serde_json::from_str(&raw).ok()))
    }

    pub fn clear_booking_draft(&self) -> StorageResult<()> {
        self.backend.remove(BOOKING_DRAFT_KEY)
    }

    /// Remember where to send the user once they have signed in.
    pub fn set_redirect(&self, target: &str) -> StorageResult<()> {
        self.backend.set(REDIRECT_KEY, target)
    }

    /// Read and forget the redirect target.
    pub fn take_redirect(&self) -> StorageResult<Option<String>> {
        let target = self.backend.get(REDIRECT_KEY)?;
        if target.is_some() {
            self.backend.remove(REDIRECT_KEY)?;
        }
        Ok(target)
    }
}
