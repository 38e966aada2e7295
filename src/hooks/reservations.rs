// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Reservations: admin approval queue and the client's own rentals.
//!
//! ## Status model (client view)
//!
//! ```text
//! Pending ──► Confirmed ──► Canceled
//!    │            └───────► Completed
//!    └──────► Declined
//! ```
//!
//! The backend owns the real transitions. `Upcoming`, `Active` and a
//! time-based `Completed` are presentation labels computed from the stored
//! status, the rental window and the current time on every call.

use std::sync::{Arc, Mutex};

use chrono::{DateTime, NaiveDateTime, Utc};
use reqwest::Method;
use serde::Serialize;
use serde_json::Value;
use tokio::sync::RwLock;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use super::error::HookError;
use super::ids::coerce_id;
use crate::config::endpoints;
use crate::dispatch::Dispatcher;
use crate::json::{collection, first_datetime, first_f64, first_i64, first_str, first_text};

/// Stored reservation status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum ReservationStatus {
    Pending,
    Confirmed,
    Declined,
    Canceled,
    Completed,
}

impl ReservationStatus {
    /// Parse the backend's status string (case-insensitive, several
    /// historical spellings).
    pub fn parse(raw: &str) -> Option<ReservationStatus> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "pending" | "waiting" | "en_attente" => Some(ReservationStatus::Pending),
            "confirmed" | "validated" | "approved" | "accepted" => {
                Some(ReservationStatus::Confirmed)
            }
            "declined" | "rejected" | "refused" => Some(ReservationStatus::Declined),
            "canceled" | "cancelled" => Some(ReservationStatus::Canceled),
            "completed" | "finished" | "returned" | "done" => Some(ReservationStatus::Completed),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ReservationStatus::Pending => "Pending",
            ReservationStatus::Confirmed => "Confirmed",
            ReservationStatus::Declined => "Declined",
            ReservationStatus::Canceled => "Canceled",
            ReservationStatus::Completed => "Completed",
        }
    }

    /// Transitions the client is allowed to request.
    pub fn can_transition_to(&self, next: ReservationStatus) -> bool {
        use ReservationStatus::*;
        matches!(
            (self, next),
            (Pending, Confirmed)
                | (Pending, Declined)
                | (Pending, Canceled)
                | (Confirmed, Canceled)
                | (Confirmed, Completed)
        )
    }
}

impl std::fmt::Display for ReservationStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Label shown to the user. Derived, never stored.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum DisplayStatus {
    Pending,
    Upcoming,
    Active,
    Completed,
    Declined,
    Canceled,
}

/// Normalised reservation record.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReservationView {
    pub id: i64,
    pub status: ReservationStatus,
    pub car_id: Option<i64>,
    pub car_name: Option<String>,
    pub client_id: Option<i64>,
    pub client_name: Option<String>,
    pub client_email: Option<String>,
    pub pickup_address: Option<String>,
    pub dropoff_address: Option<String>,
    pub pickup_date: Option<NaiveDateTime>,
    pub dropoff_date: Option<NaiveDateTime>,
    pub total_price: Option<f64>,
}

impl ReservationView {
    /// Normalise one backend record. Records without an id are dropped.
    pub fn from_json(raw: &Value) -> Option<ReservationView> {
        let id = first_i64(raw, &["id", "reservationId", "reservation_id", "idReservation"])?;

        let status = match first_str(raw, &["status", "reservationStatus", "state"]) {
            Some(s) => ReservationStatus::parse(&s).unwrap_or_else(|| {
                debug!(reservation_id = id, status = %s, "Unknown reservation status, treating as pending");
                ReservationStatus::Pending
            }),
            None => ReservationStatus::Pending,
        };

        let car_name = match (
            first_text(raw, &["/car/brand", "/car/marque", "carBrand"]),
            first_text(raw, &["/car/model", "/car/modele", "carModel"]),
        ) {
            (Some(brand), Some(model)) => Some(format!("{brand} {model}")),
            (brand, model) => first_text(raw, &["/car/name", "carName"]).or(model).or(brand),
        };

        let client_name = match (
            first_text(raw, &["/user/firstName", "/client/firstName", "firstName"]),
            first_text(raw, &["/user/lastName", "/client/lastName", "lastName"]),
        ) {
            (Some(first), Some(last)) => Some(format!("{first} {last}")),
            (first, last) => first_text(
                raw,
                &["clientName", "userName", "/user/name", "/user/username", "/client/name"],
            )
            .or(first)
            .or(last),
        };

        Some(ReservationView {
            id,
            status,
            car_id: first_i64(raw, &["/car/id", "carId", "car_id"]),
            car_name,
            client_id: first_i64(raw, &["/user/id", "/client/id", "userId", "clientId"]),
            client_name,
            client_email: first_text(
                raw,
                &["/user/email", "/client/email", "clientEmail", "userEmail", "email"],
            ),
            pickup_address: first_text(
                raw,
                &[
                    "pickupAdress",
                    "pickUpAdress",
                    "pickupAddress",
                    "pickUpAddress",
                    "pickupLocation",
                ],
            ),
            dropoff_address: first_text(
                raw,
                &[
                    "dropoffAdress",
                    "dropOffAdress",
                    "returnAdress",
                    "dropoffAddress",
                    "dropOffAddress",
                    "returnAddress",
                    "dropoffLocation",
                ],
            ),
            pickup_date: first_datetime(
                raw,
                &["pickupDate", "pickUpDate", "startDate", "dateDebut"],
            ),
            dropoff_date: first_datetime(
                raw,
                &["dropoffDate", "dropOffDate", "returnDate", "endDate", "dateFin"],
            ),
            total_price: first_f64(raw, &["totalPrice", "total_price", "price", "/payment/amount"]),
        })
    }

    /// Label for display at `now`.
    pub fn display_status(&self, now: DateTime<Utc>) -> DisplayStatus {
        let now = now.naive_utc();
        match self.status {
            ReservationStatus::Pending => DisplayStatus::Pending,
            ReservationStatus::Declined => DisplayStatus::Declined,
            ReservationStatus::Canceled => DisplayStatus::Canceled,
            ReservationStatus::Completed => DisplayStatus::Completed,
            ReservationStatus::Confirmed => match (self.pickup_date, self.dropoff_date) {
                (_, Some(dropoff)) if now > dropoff => DisplayStatus::Completed,
                (Some(pickup), _) if now >= pickup => DisplayStatus::Active,
                _ => DisplayStatus::Upcoming,
            },
        }
    }

    /// Whole days between pick-up and drop-off, at least one.
    pub fn rental_days(&self) -> Option<i64> {
        let (pickup, dropoff) = (self.pickup_date?, self.dropoff_date?);
        Some((dropoff - pickup).num_days().max(1))
    }
}

/// Which in-memory collection a reservation lives in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Bucket {
    Pending,
    Confirmed,
    History,
}

impl Bucket {
    fn for_status(status: ReservationStatus) -> Bucket {
        match status {
            ReservationStatus::Pending => Bucket::Pending,
            ReservationStatus::Confirmed => Bucket::Confirmed,
            _ => Bucket::History,
        }
    }
}

/// In-memory reservation collections.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ReservationState {
    pub pending: Vec<ReservationView>,
    pub confirmed: Vec<ReservationView>,
    /// Declined, canceled and completed
    pub history: Vec<ReservationView>,
    pub last_refreshed: Option<DateTime<Utc>>,
}

impl ReservationState {
    /// Partition records by status.
    pub fn from_records(records: Vec<ReservationView>, refreshed_at: DateTime<Utc>) -> Self {
        let mut state = ReservationState {
            last_refreshed: Some(refreshed_at),
            ..Default::default()
        };
        for record in records {
            state.bucket_mut(Bucket::for_status(record.status)).push(record);
        }
        state
    }

    pub fn find(&self, id: i64) -> Option<&ReservationView> {
        self.pending
            .iter()
            .chain(&self.confirmed)
            .chain(&self.history)
            .find(|r| r.id == id)
    }

    fn bucket(&self, bucket: Bucket) -> &Vec<ReservationView> {
        match bucket {
            Bucket::Pending => &self.pending,
            Bucket::Confirmed => &self.confirmed,
            Bucket::History => &self.history,
        }
    }

    fn bucket_mut(&mut self, bucket: Bucket) -> &mut Vec<ReservationView> {
        match bucket {
            Bucket::Pending => &mut self.pending,
            Bucket::Confirmed => &mut self.confirmed,
            Bucket::History => &mut self.history,
        }
    }

    /// Move `record` into the bucket for its (new) status, dropping any
    /// other copy with the same id.
    fn place(&mut self, record: ReservationView) {
        for bucket in [Bucket::Pending, Bucket::Confirmed, Bucket::History] {
            self.bucket_mut(bucket).retain(|r| r.id != record.id);
        }
        self.bucket_mut(Bucket::for_status(record.status)).push(record);
    }
}

/// Reservation operations with their in-memory view state.
///
/// Dropping the hook cancels any in-flight dispatch or background refetch it
/// started.
pub struct ReservationsHook {
    dispatcher: Arc<Dispatcher>,
    state: Arc<RwLock<ReservationState>>,
    cancel: CancellationToken,
    refetch: Mutex<Option<JoinHandle<()>>>,
}

impl ReservationsHook {
    pub fn new(dispatcher: Arc<Dispatcher>) -> Self {
        Self {
            dispatcher,
            state: Arc::new(RwLock::new(ReservationState::default())),
            cancel: CancellationToken::new(),
            refetch: Mutex::new(None),
        }
    }

    /// Copy of the current collections.
    pub async fn snapshot(&self) -> ReservationState {
        self.state.read().await.clone()
    }

    pub async fn pending(&self) -> Vec<ReservationView> {
        self.state.read().await.pending.clone()
    }

    pub async fn confirmed(&self) -> Vec<ReservationView> {
        self.state.read().await.confirmed.clone()
    }

    pub async fn history(&self) -> Vec<ReservationView> {
        self.state.read().await.history.clone()
    }

    /// Reload every reservation from the backend. Returns the record count.
    pub async fn refresh(&self) -> Result<usize, HookError> {
        refetch_into(&self.dispatcher, &self.state, &self.cancel).await
    }

    /// The signed-in client's own reservations.
    pub async fn my_rentals(&self) -> Result<Vec<ReservationView>, HookError> {
        fetch(&self.dispatcher, endpoints::MY_RESERVATIONS, &self.cancel).await
    }

    /// Approve a pending reservation.
    pub async fn approve(&self, id: impl std::fmt::Display) -> Result<ReservationView, HookError> {
        self.transition(id, &[Bucket::Pending], "validate", ReservationStatus::Confirmed)
            .await
    }

    /// Decline a pending reservation.
    pub async fn decline(&self, id: impl std::fmt::Display) -> Result<ReservationView, HookError> {
        self.transition(id, &[Bucket::Pending], "decline", ReservationStatus::Declined)
            .await
    }

    /// Cancel a pending or confirmed reservation.
    pub async fn cancel(&self, id: impl std::fmt::Display) -> Result<ReservationView, HookError> {
        self.transition(
            id,
            &[Bucket::Pending, Bucket::Confirmed],
            "cancel",
            ReservationStatus::Canceled,
        )
        .await
    }

    /// Wait for the most recently scheduled background refetch, if any.
    pub async fn wait_for_refetch(&self) {
        let handle = self.refetch.lock().ok().and_then(|mut slot| slot.take());
        if let Some(handle) = handle {
            if let Err(e) = handle.await {
                warn!(error = %e, "Reservation refetch task failed");
            }
        }
    }

    async fn transition(
        &self,
        raw_id: impl std::fmt::Display,
        from: &[Bucket],
        action: &str,
        next: ReservationStatus,
    ) -> Result<ReservationView, HookError> {
        let id = coerce_id(raw_id)?;

        let current = {
            let state = self.state.read().await;
            from.iter()
                .find_map(|bucket| state.bucket(*bucket).iter().find(|r| r.id == id))
                .cloned()
                .ok_or(HookError::RecordNotFound {
                    kind: "Reservation",
                    id,
                })?
        };

        if !current.status.can_transition_to(next) {
            debug!(
                reservation_id = id,
                from = %current.status,
                to = %next,
                "Requesting transition the client model does not expect"
            );
        }

        let url = endpoints::reservation_action(id, action);
        self.dispatcher
            .dispatch_with_cancel(&url, Method::PUT, None, &self.cancel)
            .await
            .into_result()?;

        let updated = ReservationView {
            status: next,
            ..current
        };
        self.state.write().await.place(updated.clone());

        info!(reservation_id = id, status = %next, "Reservation updated");
        self.schedule_refetch();
        Ok(updated)
    }

    /// Reconcile with the backend in the background.
    fn schedule_refetch(&self) {
        let dispatcher = self.dispatcher.clone();
        let state = self.state.clone();
        let cancel = self.cancel.child_token();

        let handle = tokio::spawn(async move {
            match refetch_into(&dispatcher, &state, &cancel).await {
                Ok(count) => debug!(count, "Reservations reconciled"),
                Err(e) => warn!(error = %e, "Reservation refetch failed"),
            }
        });

        if let Ok(mut slot) = self.refetch.lock() {
            *slot = Some(handle);
        }
    }
}

impl Drop for ReservationsHook {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}

async fn fetch(
    dispatcher: &Dispatcher,
    url: &str,
    cancel: &CancellationToken,
) -> Result<Vec<ReservationView>, HookError> {
    let body = dispatcher
        .dispatch_with_cancel(url, Method::GET, None, cancel)
        .await
        .into_result()?
        .into_json();

    Ok(collection(&body, &["reservations"])
        .iter()
        .filter_map(ReservationView::from_json)
        .collect())
}

async fn refetch_into(
    dispatcher: &Dispatcher,
    state: &RwLock<ReservationState>,
    cancel: &CancellationToken,
) -> Result<usize, HookError> {
    let records = fetch(dispatcher, endpoints::RESERVATIONS, cancel).await?;
    let count = records.len();
    *state.write().await = ReservationState::from_records(records, Utc::now());
    Ok(count)
}
