// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Notification clicks → in-app navigation.
//
// Navigation is delayed slightly so a click that cold-starts the app lands
// after the first screen has mounted.

use std::sync::Arc;

use finaudy_bridge::{CallbackFamily, HostEvent, Installation};
use finaudy_core::error::{FinaudyError, Result};
use finaudy_core::routing::{RouteTarget, route_notification};
use tokio::runtime::Handle;
use tracing::{debug, info};

use super::app_services::AppServices;
use crate::state;

/// Moves the UI to a route.
pub trait Navigator: Send + Sync {
    fn navigate(&self, target: &RouteTarget);
}

pub struct NotificationClickService {
    _listener: Installation,
}

impl NotificationClickService {
    /// Route every clicked notification through `navigator`. Must be called
    /// from within a tokio runtime; navigation is scheduled on it.
    pub fn install(services: &AppServices, navigator: Arc<dyn Navigator>) -> Result<Self> {
        let runtime = Handle::try_current().map_err(|e| {
            FinaudyError::Bridge(format!("notification clicks need a tokio runtime: {e}"))
        })?;
        let delay = services.config().bridge.notification_nav_delay();
        let shared = services.state_handle();

        let listener = services.dispatcher().install(CallbackFamily::NotificationClicked, move |event| {
            let HostEvent::NotificationClicked(payload) = event else {
                return;
            };
            let target = route_notification(payload);
            info!(kind = payload.kind().unwrap_or("<none>"), route = %target, "routing notification");
            state::lock(&shared).last_route = Some(target.clone());

            let navigator = navigator.clone();
            runtime.spawn(async move {
                tokio::time::sleep(delay).await;
                debug!(route = %target, "navigating");
                navigator.navigate(&target);
            });
        });

        Ok(Self {
            _listener: listener,
        })
    }
}
