// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Global application state shared by the feature services.

use std::collections::BTreeMap;
use std::sync::{Mutex, MutexGuard, PoisonError};

use chrono::{DateTime, Utc};

use finaudy_core::routing::RouteTarget;
use finaudy_core::types::{Capability, PermissionName, PermissionState};

/// Shared state, updated from host callbacks and request results.
#[derive(Debug, Clone)]
pub struct AppState {
    /// Host platform name ("Android", "Desktop (stub)").
    pub platform: String,
    /// Capabilities the host exposed at startup.
    pub capabilities: Vec<Capability>,
    /// Last known state of each runtime permission.
    pub permissions: BTreeMap<PermissionName, PermissionState>,
    /// Current FCM push token.
    pub push_token: Option<String>,
    pub push_token_updated_at: Option<DateTime<Utc>>,
    /// Signed-in user, once the auth provider has a session.
    pub user_id: Option<String>,
    /// Whether the host reported a successful Google sign-in.
    pub google_signed_in: bool,
    /// Whether a store purchase sheet is open.
    pub purchase_in_progress: bool,
    /// Whether the host's audio recorder is running.
    pub recording_audio: bool,
    /// Destination of the most recent notification click.
    pub last_route: Option<RouteTarget>,
}

impl AppState {
    pub fn new(platform: impl Into<String>, capabilities: Vec<Capability>) -> Self {
        Self {
            platform: platform.into(),
            capabilities,
            permissions: PermissionName::ALL
                .into_iter()
                .map(|name| (name, PermissionState::Prompt))
                .collect(),
            push_token: None,
            push_token_updated_at: None,
            user_id: None,
            google_signed_in: false,
            purchase_in_progress: false,
            recording_audio: false,
            last_route: None,
        }
    }

    pub fn permission(&self, name: PermissionName) -> PermissionState {
        self.permissions.get(&name).copied().unwrap_or_default()
    }
}

impl Default for AppState {
    fn default() -> Self {
        Self::new("unknown", Vec::new())
    }
}

/// Lock the shared state. Writers never leave it half-updated, so a
/// poisoned lock is still usable.
pub fn lock(state: &Mutex<AppState>) -> MutexGuard<'_, AppState> {
    state.lock().unwrap_or_else(PoisonError::into_inner)
}
