// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Fleet management: listing, detail, availability toggle and deletion.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use reqwest::Method;
use serde::Serialize;
use serde_json::{json, Value};
use tokio::sync::RwLock;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use super::error::HookError;
use super::ids::coerce_id;
use crate::config::endpoints;
use crate::dispatch::{DispatchError, Dispatcher};
use crate::json::{collection, first_bool, first_f64, first_i64, first_text, single};

/// Normalised car record.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CarView {
    pub id: i64,
    pub brand: Option<String>,
    pub model: Option<String>,
    /// Display name: brand and model, or whatever name the backend sent
    pub name: String,
    pub category: Option<String>,
    pub price_per_day: Option<f64>,
    /// Missing availability is read as available
    pub available: bool,
    pub image_url: Option<String>,
    pub seats: Option<i64>,
    pub transmission: Option<String>,
    pub fuel_type: Option<String>,
    pub year: Option<i64>,
}

impl CarView {
    /// Normalise one backend record. Records without an id are dropped.
    pub fn from_json(raw: &Value) -> Option<CarView> {
        let id = first_i64(raw, &["id", "carId", "car_id", "idCar"])?;
        let brand = first_text(raw, &["brand", "marque", "make"]);
        let model = first_text(raw, &["model", "modele", "modelName"]);

        let name = match (&brand, &model) {
            (Some(brand), Some(model)) => format!("{brand} {model}"),
            _ => first_text(raw, &["name", "title"])
                .or_else(|| model.clone())
                .or_else(|| brand.clone())
                .unwrap_or_else(|| format!("Car #{id}")),
        };

        let available = first_bool(raw, &["available", "isAvailable", "disponible", "availability"])
            .or_else(|| {
                first_text(raw, &["status"]).map(|s| !s.eq_ignore_ascii_case("unavailable"))
            })
            .unwrap_or(true);

        Some(CarView {
            id,
            brand,
            model,
            name,
            category: first_text(raw, &["category", "type", "carType", "/category/name"]),
            price_per_day: first_f64(raw, &["pricePerDay", "price_per_day", "dailyPrice", "price"]),
            available,
            image_url: first_text(raw, &["imageUrl", "image", "imageURL", "photo", "/images/0"]),
            seats: first_i64(raw, &["seats", "nbSeats", "numberOfSeats", "places"]),
            transmission: first_text(raw, &["transmission", "gearbox"]),
            fuel_type: first_text(raw, &["fuelType", "fuel", "carburant"]),
            year: first_i64(raw, &["year", "annee", "modelYear"]),
        })
    }
}

/// What to do with local state when an availability toggle is rejected.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum FallbackPolicy {
    /// Local state changes only after the backend confirms
    #[default]
    Strict,
    /// Flip locally even when the dispatch failed
    Optimistic,
}

/// Result of [`CarsHook::toggle_availability`].
#[derive(Debug, Clone, PartialEq)]
pub struct ToggleOutcome {
    pub car: CarView,
    /// `false` only under [`FallbackPolicy::Optimistic`] when the local flip
    /// was not acknowledged
    pub confirmed_by_server: bool,
}

#[derive(Debug, Default)]
struct CarState {
    cars: Vec<CarView>,
    last_refreshed: Option<DateTime<Utc>>,
}

pub struct CarsHook {
    dispatcher: Arc<Dispatcher>,
    state: RwLock<CarState>,
    policy: FallbackPolicy,
    cancel: CancellationToken,
}

impl CarsHook {
    pub fn new(dispatcher: Arc<Dispatcher>) -> Self {
        Self {
            dispatcher,
            state: RwLock::new(CarState::default()),
            policy: FallbackPolicy::default(),
            cancel: CancellationToken::new(),
        }
    }

    pub fn with_policy(mut self, policy: FallbackPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn policy(&self) -> FallbackPolicy {
        self.policy
    }

    pub async fn cars(&self) -> Vec<CarView> {
        self.state.read().await.cars.clone()
    }

    pub async fn last_refreshed(&self) -> Option<DateTime<Utc>> {
        self.state.read().await.last_refreshed
    }

    /// Cars currently marked available.
    pub async fn available(&self) -> Vec<CarView> {
        self.state
            .read()
            .await
            .cars
            .iter()
            .filter(|car| car.available)
            .cloned()
            .collect()
    }

    /// Reload the fleet. Returns the record count.
    pub async fn refresh(&self) -> Result<usize, HookError> {
        let body = self
            .dispatcher
            .dispatch_with_cancel(endpoints::CARS, Method::GET, None, &self.cancel)
            .await
            .into_result()?
            .into_json();

        let cars: Vec<CarView> = collection(&body, &["cars"])
            .iter()
            .filter_map(CarView::from_json)
            .collect();
        let count = cars.len();

        let mut state = self.state.write().await;
        state.cars = cars;
        state.last_refreshed = Some(Utc::now());
        debug!(count, "Cars refreshed");
        Ok(count)
    }

    /// Fetch one car and update the cached copy.
    pub async fn detail(&self, id: impl std::fmt::Display) -> Result<CarView, HookError> {
        let id = coerce_id(id)?;
        let body = self
            .dispatcher
            .dispatch_with_cancel(&endpoints::car(id), Method::GET, None, &self.cancel)
            .await
            .into_result()?
            .into_json();

        let car = CarView::from_json(single(&body, &["car"])).ok_or_else(|| {
            HookError::InvalidResponse(format!("car {id} response has no record"))
        })?;

        let mut state = self.state.write().await;
        match state.cars.iter_mut().find(|c| c.id == car.id) {
            Some(cached) => *cached = car.clone(),
            None => state.cars.push(car.clone()),
        }
        Ok(car)
    }

    /// Flip a car's availability.
    pub async fn toggle_availability(
        &self,
        id: impl std::fmt::Display,
    ) -> Result<ToggleOutcome, HookError> {
        let id = coerce_id(id)?;
        let current = self.cached(id).await?;
        let requested = !current.available;

        let result = self
            .dispatcher
            .dispatch_with_cancel(
                &endpoints::car_availability(id),
                Method::PUT,
                Some(&json!({ "available": requested })),
                &self.cancel,
            )
            .await
            .into_result();

        let (car, confirmed_by_server) = match result {
            Ok(body) => {
                let echoed = body
                    .as_json()
                    .and_then(|b| CarView::from_json(single(b, &["car"])))
                    .filter(|car| car.id == id);
                let car = echoed.unwrap_or(CarView {
                    available: requested,
                    ..current
                });
                (car, true)
            }
            Err(DispatchError::Cancelled) => return Err(DispatchError::Cancelled.into()),
            Err(e) if self.policy == FallbackPolicy::Optimistic => {
                warn!(
                    car_id = id,
                    available = requested,
                    error = %e,
                    "Availability change rejected, keeping optimistic local value"
                );
                (
                    CarView {
                        available: requested,
                        ..current
                    },
                    false,
                )
            }
            Err(e) => return Err(e.into()),
        };

        self.replace(car.clone()).await;
        info!(car_id = id, available = car.available, confirmed_by_server, "Car availability updated");
        Ok(ToggleOutcome {
            car,
            confirmed_by_server,
        })
    }

    /// Delete a car and drop it from the cache.
    pub async fn delete(&self, id: impl std::fmt::Display) -> Result<(), HookError> {
        let id = coerce_id(id)?;
        self.cached(id).await?;

        self.dispatcher
            .dispatch_with_cancel(&endpoints::car(id), Method::DELETE, None, &self.cancel)
            .await
            .into_result()?;

        self.state.write().await.cars.retain(|c| c.id != id);
        info!(car_id = id, "Car deleted");
        Ok(())
    }

    async fn cached(&self, id: i64) -> Result<CarView, HookError> {
        self.state
            .read()
            .await
            .cars
            .iter()
            .find(|c| c.id == id)
            .cloned()
            .ok_or(HookError::RecordNotFound { kind: "Car", id })
    }

    async fn replace(&self, car: CarView) {
        let mut state = self.state.write().await;
        if let Some(cached) = state.cars.iter_mut().find(|c| c.id == car.id) {
            *cached = car;
        }
    }
}

impl Drop for CarsHook {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}
