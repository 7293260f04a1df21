//! HTTP handler definitions for the Gatehouse server.
//!
//! This module defines `AppState` (the shared state carried through axum
//! extractors) and re-exports all handler functions for convenient access
//! when building the router.

pub mod health;
pub mod identity;

pub use health::{health_handler, liveness_handler};
pub use identity::{admin_status_handler, whoami_handler};

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Instant;

/// Shared application state passed to all axum handlers via `State` extraction.
#[derive(Clone)]
pub struct AppState {
    /// Server process start time, used for uptime calculation.
    pub start_time: Instant,
    /// Set once graceful shutdown has begun.
    pub draining: Arc<AtomicBool>,
}

impl AppState {
    #[must_use]
    pub fn new(draining: Arc<AtomicBool>) -> Self {
        Self {
            start_time: Instant::now(),
            draining,
        }
    }

    #[must_use]
    pub fn is_draining(&self) -> bool {
        self.draining.load(Ordering::Acquire)
    }
}
