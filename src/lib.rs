// SPDX-License-Identifier: MIT

//! streak-engine: server-side gamification state.
//!
//! This crate maintains three kinds of per-user state derived from
//! append-only event logs in Firestore: daily streaks (with freeze
//! consumption), experience points, and arbitrary progress items. The
//! calculators are pure; the orchestrators around them do the reads and
//! writes, and two callable HTTP endpoints expose them to client SDKs.

pub mod calendar;
pub mod config;
pub mod db;
pub mod error;
pub mod middleware;
pub mod models;
pub mod routes;
pub mod services;

use config::Config;
use db::Store;
use std::sync::Arc;

/// Shared application state.
pub struct AppState {
    pub config: Config,
    pub store: Arc<dyn Store>,
}
