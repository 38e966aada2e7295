// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Authentication Module
//!
//! Client-side session handling for the Udrive backend.
//!
//! ## Auth Flow
//!
//! 1. [`AuthService`] posts credentials (or an identity-provider token) to
//!    the backend and stores the returned bearer token as a [`Session`]
//! 2. [`SessionGuard`] decodes the stored token on each navigation:
//!    - `sub` → fallback `user_id`
//!    - `exp` → expiry; an expired token clears the session
//!    - role claims → [`Role`] via the ordered [`strategies`]
//! 3. Authenticated requests go through the
//!    [`Dispatcher`](crate::dispatch::Dispatcher), which attaches the token
//!
//! ## Trust
//!
//! - Token signatures are never verified here
//! - Decoded claims only drive routing and display
//! - The backend decides what a request may actually do

pub mod claims;
pub mod error;
pub mod guard;
pub mod login;
pub mod roles;
pub mod session;
pub mod strategies;

pub use claims::{decode, is_expired, DecodedToken};
pub use error::AuthError;
pub use guard::{AuthenticatedUser, SessionGuard};
pub use login::{AuthService, IdentityResult, SignupRequest};
pub use roles::Role;
pub use session::{HeaderFormat, Session};
pub use strategies::{extract_role, ClaimStrategy, ROLE_STRATEGIES};
