// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Runtime permissions (camera, microphone, notifications) requested through
// the host.

use finaudy_bridge::{CallbackFamily, HostEvent, Installation};
use finaudy_core::error::Result;
use finaudy_core::types::{HostCall, PermissionName, PermissionState, RequestKey};
use tracing::info;

use super::app_services::AppServices;
use crate::state;

/// Tracks permission state and asks the host for permissions.
pub struct PermissionService {
    services: AppServices,
    _listener: Installation,
}

#[allow(dead_code)]
impl PermissionService {
    /// Start receiving permission results. Results the host reports on its
    /// own (e.g. the launch-time notification prompt) update state too.
    pub fn install(services: &AppServices) -> Self {
        let shared = services.state_handle();
        let listener = services.dispatcher().install(CallbackFamily::PermissionResult, move |event| {
            if let HostEvent::PermissionResult { name, granted } = event {
                state::lock(&shared)
                    .permissions
                    .insert(*name, PermissionState::from(*granted));
            }
        });
        Self {
            services: services.clone(),
            _listener: listener,
        }
    }

    /// Ask the host for `name` and wait for the user's answer.
    pub async fn request(&self, name: PermissionName) -> Result<bool> {
        let call = HostCall::permission(name);
        let key = RequestKey::Permission(name);
        let granted = self
            .services
            .invoker()
            .request(call)
            .await?
            .into_granted(key)?;

        state::lock(&self.services.state_handle())
            .permissions
            .insert(name, PermissionState::from(granted));
        info!(permission = %name, granted, "permission request finished");
        Ok(granted)
    }

    pub fn state(&self, name: PermissionName) -> PermissionState {
        self.services.state().permission(name)
    }
}
