// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// FCM push tokens, fetched from the host, cached on disk, and registered
// with the backend once a user is signed in.

use std::path::PathBuf;
use std::sync::{Arc, Mutex, PoisonError};

use chrono::Utc;
use finaudy_bridge::{CallbackFamily, HostEvent, Installation};
use finaudy_core::error::Result;
use finaudy_core::types::{Capability, HostCall, RequestKey};
use tracing::{debug, info, warn};

use super::app_services::AppServices;
use crate::state::{self, AppState};

const TOKEN_FILE: &str = "fcm_token";

/// Backend storage for device tokens.
pub trait TokenStore: Send + Sync {
    fn save_token(&self, user_id: &str, token: &str, platform: &str) -> Result<()>;
}

/// Where a received token goes. Shared with the dispatcher listener.
struct TokenSink {
    state: Arc<Mutex<AppState>>,
    path: PathBuf,
    store: Arc<dyn TokenStore>,
    platform: String,
    /// Token not yet registered with the backend: received while nobody
    /// was signed in, or its last save failed.
    pending: Mutex<Option<String>>,
}

impl TokenSink {
    fn record(&self, token: &str) {
        let user = {
            let mut state = state::lock(&self.state);
            state.push_token = Some(token.to_string());
            state.push_token_updated_at = Some(Utc::now());
            state.user_id.clone()
        };

        if let Err(e) = std::fs::write(&self.path, token) {
            warn!(error = %e, "failed to cache FCM token");
        }

        match user {
            Some(user) => {
                if self.save(&user, token) {
                    *self.pending() = None;
                } else {
                    *self.pending() = Some(token.to_string());
                }
            }
            None => {
                debug!("no user yet, holding FCM token");
                *self.pending() = Some(token.to_string());
            }
        }
    }

    /// Register `token` for `user`. Returns whether the backend took it.
    fn save(&self, user: &str, token: &str) -> bool {
        match self.store.save_token(user, token, &self.platform) {
            Ok(()) => {
                info!(user, platform = %self.platform, "FCM token registered");
                true
            }
            Err(e) => {
                warn!(user, error = %e, "failed to register FCM token, holding it for retry");
                false
            }
        }
    }

    fn pending(&self) -> std::sync::MutexGuard<'_, Option<String>> {
        self.pending.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Keeps the device's push token current.
pub struct PushTokenService {
    services: AppServices,
    sink: Arc<TokenSink>,
    _listener: Installation,
}

#[allow(dead_code)]
impl PushTokenService {
    /// Start receiving tokens from the host. A token cached by an earlier
    /// run is loaded into state.
    pub fn install(services: &AppServices, store: Arc<dyn TokenStore>) -> Self {
        let sink = Arc::new(TokenSink {
            state: services.state_handle(),
            path: services.data_dir().join(TOKEN_FILE),
            store,
            platform: services.config().push_platform,
            pending: Mutex::new(None),
        });

        if let Ok(cached) = std::fs::read_to_string(&sink.path) {
            let cached = cached.trim();
            if !cached.is_empty() {
                debug!("loaded cached FCM token");
                state::lock(&sink.state).push_token = Some(cached.to_string());
            }
        }

        let listener_sink = sink.clone();
        let listener = services.dispatcher().install(CallbackFamily::FcmToken, move |event| {
            if let HostEvent::TokenReceived { token } = event {
                listener_sink.record(token);
            }
        });

        Self {
            services: services.clone(),
            sink,
            _listener: listener,
        }
    }

    pub fn is_supported(&self) -> bool {
        self.services.invoker().supports(Capability::GetFcmToken)
    }

    /// Ask the host for the current token.
    pub async fn request_token(&self) -> Result<String> {
        let call = HostCall::new(Capability::GetFcmToken);
        let key = RequestKey::FcmToken;
        self.services
            .invoker()
            .request(call)
            .await?
            .into_token(key)
    }

    pub fn current_token(&self) -> Option<String> {
        self.services.state().push_token
    }

    /// Set (or clear) the signed-in user. A token not yet registered (held
    /// while nobody was signed in, or whose save failed) is registered for
    /// the new user.
    pub fn set_user(&self, user_id: Option<&str>) {
        state::lock(&self.sink.state).user_id = user_id.map(str::to_string);
        let Some(user) = user_id else {
            return;
        };
        let pending = self.sink.pending().take();
        let Some(token) = pending else {
            return;
        };
        if !self.sink.save(user, &token) {
            // A token received meanwhile is newer; keep that one.
            self.sink.pending().get_or_insert(token);
        }
    }

    /// Forget the cached token and fetch a fresh one.
    pub async fn force_refresh(&self) -> Result<String> {
        {
            let mut state = state::lock(&self.sink.state);
            state.push_token = None;
            state.push_token_updated_at = None;
        }
        match std::fs::remove_file(&self.sink.path) {
            Ok(()) => {}
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => return Err(e.into()),
        }
        info!("forcing FCM token refresh");
        self.request_token().await
    }
}
