// ============================
// greenpoll-backend-lib/src/lib.rs
// ============================

//! GreenPoll backend library.
//!
//! Account, session, and poll services over a pluggable record store,
//! plus the axum routing layer that exposes them.

pub mod auth;
pub mod config;
pub mod error;
pub mod metrics;
pub mod notifier;
pub mod pruner;
pub mod routes;
pub mod services;
pub mod store;

use std::sync::Arc;

use crate::config::Settings;
use crate::notifier::Notifier;
use crate::pruner::Pruner;
use crate::services::Services;
use crate::store::RecordStore;

/// Shared application state, cloned into every handler.
#[derive(Clone)]
pub struct AppState {
    pub services: Services,
    pub notifier: Arc<dyn Notifier>,
    pub pruner: Pruner,
    pub settings: Arc<Settings>,
}

impl AppState {
    pub fn new(
        store: Arc<dyn RecordStore>,
        settings: Settings,
        notifier: Arc<dyn Notifier>,
    ) -> Self {
        let services = Services::new(store, &settings);
        let pruner = Pruner::new(
            services.verifications.clone(),
            services.password_resets.clone(),
            services.users.clone(),
        );
        Self {
            services,
            notifier,
            pruner,
            settings: Arc::new(settings),
        }
    }
}
