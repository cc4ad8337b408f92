// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Native Google Sign-In through the host.

use finaudy_bridge::{CallbackFamily, HostEvent, Installation};
use finaudy_core::error::Result;
use finaudy_core::types::{Capability, GoogleCredential, HostCall, RequestKey};
use tracing::info;

use super::app_services::AppServices;
use crate::state;

pub struct GoogleAuthService {
    services: AppServices,
    _listener: Installation,
}

#[allow(dead_code)]
impl GoogleAuthService {
    pub fn install(services: &AppServices) -> Self {
        let shared = services.state_handle();
        let listener = services.dispatcher().install(CallbackFamily::GoogleSignIn, move |event| {
            let signed_in = match event {
                HostEvent::SignInSucceeded(_) => true,
                HostEvent::SignInFailed { .. } => false,
                _ => return,
            };
            state::lock(&shared).google_signed_in = signed_in;
        });
        Self {
            services: services.clone(),
            _listener: listener,
        }
    }

    /// Whether the host can sign in natively. Callers fall back to the web
    /// OAuth flow when it cannot.
    pub fn is_available(&self) -> bool {
        self.services.invoker().supports(Capability::SignInWithGoogle)
    }

    /// Open the native account picker and wait for the tokens. The
    /// credential still has to be exchanged with the auth backend.
    pub async fn sign_in(&self) -> Result<GoogleCredential> {
        let call = HostCall::new(Capability::SignInWithGoogle);
        let key = RequestKey::GoogleSignIn;
        let credential = self
            .services
            .invoker()
            .request(call)
            .await?
            .into_credential(key)?;
        info!(has_access_token = credential.access_token.is_some(), "Google sign-in completed");
        Ok(credential)
    }

    pub fn is_signed_in(&self) -> bool {
        self.services.state().google_signed_in
    }

    /// Forget the native session locally.
    pub fn sign_out(&self) {
        state::lock(&self.services.state_handle()).google_signed_in = false;
    }
}
