// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Central service layer. Builds the bridge (host, registry, dispatcher,
// invoker) from the persisted configuration and shares it with the feature
// services.
//
// Everything is behind `Arc` so the struct can be cloned into listeners and
// async blocks without lifetime issues.

use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, PoisonError};

use finaudy_bridge::{BridgeInvoker, CallbackDispatcher, HostSurface, PendingRequestRegistry};
use finaudy_core::AppConfig;
use finaudy_core::error::Result;
use tracing::{info, warn};

use super::data_dir;
use crate::state::{self, AppState};

/// Shared application services.
#[derive(Clone)]
pub struct AppServices {
    invoker: BridgeInvoker,
    dispatcher: Arc<CallbackDispatcher>,
    state: Arc<Mutex<AppState>>,
    data_dir: PathBuf,
    config: Arc<Mutex<AppConfig>>,
}

#[allow(dead_code)]
impl AppServices {
    /// Initialise all services for the current platform. Call once at app
    /// startup.
    pub fn init() -> Result<Self> {
        let dir = data_dir::data_dir();
        std::fs::create_dir_all(&dir)?;
        info!(path = %dir.display(), "initialising app services");

        // Load persisted config or use defaults
        let config = load_config(&dir).unwrap_or_default();

        Ok(Self::with_host(finaudy_bridge::platform_host(), config, dir))
    }

    /// Build services around an explicit host.
    pub fn with_host(host: Arc<dyn HostSurface>, config: AppConfig, data_dir: PathBuf) -> Self {
        let registry = Arc::new(PendingRequestRegistry::new(config.bridge.duplicate_policy));
        let dispatcher = CallbackDispatcher::new(registry.clone());

        #[cfg(target_os = "android")]
        finaudy_bridge::android::attach_dispatcher(dispatcher.clone());

        let state = AppState::new(host.platform_name(), host.capabilities());
        info!(
            platform = %state.platform,
            capabilities = ?state.capabilities,
            policy = ?config.bridge.duplicate_policy,
            "bridge ready"
        );
        let invoker = BridgeInvoker::new(host, registry, config.bridge.clone());

        Self {
            invoker,
            dispatcher,
            state: Arc::new(Mutex::new(state)),
            data_dir,
            config: Arc::new(Mutex::new(config)),
        }
    }

    pub fn invoker(&self) -> &BridgeInvoker {
        &self.invoker
    }

    pub fn dispatcher(&self) -> &Arc<CallbackDispatcher> {
        &self.dispatcher
    }

    pub fn registry(&self) -> &Arc<PendingRequestRegistry> {
        self.invoker.registry()
    }

    /// Snapshot of the shared state.
    pub fn state(&self) -> AppState {
        state::lock(&self.state).clone()
    }

    pub(crate) fn state_handle(&self) -> Arc<Mutex<AppState>> {
        self.state.clone()
    }

    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }

    // -- Config --------------------------------------------------------------

    /// Get a clone of the current config.
    pub fn config(&self) -> AppConfig {
        self.config
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Persist the config. Bridge settings take effect on next start.
    pub fn save_config(&self, config: &AppConfig) -> Result<()> {
        config.bridge.validate()?;
        persist_config(&self.data_dir, config)?;
        *self.config.lock().unwrap_or_else(PoisonError::into_inner) = config.clone();
        Ok(())
    }

    // -- Lifecycle -------------------------------------------------------------

    /// Cancel every outstanding host request and stop receiving callbacks.
    /// Returns how many requests were cancelled.
    pub fn shutdown(&self) -> usize {
        #[cfg(target_os = "android")]
        finaudy_bridge::android::detach_dispatcher();

        let cancelled = self.registry().cancel_all();
        info!(cancelled, "app services shut down");
        cancelled
    }
}

// ---------------------------------------------------------------------------
// Config persistence helpers
// ---------------------------------------------------------------------------

const CONFIG_FILE: &str = "config.json";

fn load_config(data_dir: &Path) -> Option<AppConfig> {
    let path = data_dir.join(CONFIG_FILE);
    let data = std::fs::read_to_string(&path).ok()?;
    match AppConfig::from_json(&data) {
        Ok(config) => Some(config),
        Err(e) => {
            warn!(path = %path.display(), error = %e, "ignoring invalid config");
            None
        }
    }
}

fn persist_config(data_dir: &Path, config: &AppConfig) -> Result<()> {
    let path = data_dir.join(CONFIG_FILE);
    let json = serde_json::to_string_pretty(config)?;
    std::fs::write(&path, json)?;
    Ok(())
}
