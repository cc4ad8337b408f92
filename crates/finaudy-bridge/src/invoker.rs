// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Bridge invoker: turns a fire-and-forget host call plus its out-of-band
// callback into one awaitable request.
//
// The registry is the completion mechanism. The continuation registered
// for a request forwards into a oneshot channel; the host callback and the
// timeout race to settle that registration, and whichever loses finds the
// slot empty.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::oneshot;
use tracing::{debug, info, instrument, warn};

use finaudy_core::config::BridgeConfig;
use finaudy_core::error::{FinaudyError, Result};
use finaudy_core::types::{BridgeOutcome, Capability, HostCall, RequestKey};

use crate::registry::{PendingRequestRegistry, Ticket};
use crate::traits::HostSurface;

/// Issues host calls and awaits their callbacks.
#[derive(Clone)]
pub struct BridgeInvoker {
    host: Arc<dyn HostSurface>,
    registry: Arc<PendingRequestRegistry>,
    config: BridgeConfig,
}

impl BridgeInvoker {
    pub fn new(
        host: Arc<dyn HostSurface>,
        registry: Arc<PendingRequestRegistry>,
        config: BridgeConfig,
    ) -> Self {
        Self {
            host,
            registry,
            config,
        }
    }

    pub fn host(&self) -> &Arc<dyn HostSurface> {
        &self.host
    }

    pub fn registry(&self) -> &Arc<PendingRequestRegistry> {
        &self.registry
    }

    pub fn config(&self) -> &BridgeConfig {
        &self.config
    }

    pub fn supports(&self, capability: Capability) -> bool {
        self.host.has_capability(capability)
    }

    /// Invoke with the configured timeout for the call's request key.
    pub async fn request(&self, call: HostCall) -> Result<BridgeOutcome> {
        let timeout = call
            .request_key()
            .map(|key| self.config.timeout_for(key))
            .unwrap_or_default();
        self.invoke(call, timeout).await
    }

    /// Deliver a call the host never answers (`showToast`,
    /// `startAudioRecording`).
    #[instrument(skip(self, call), fields(capability = %call.capability))]
    pub fn send(&self, call: &HostCall) -> Result<()> {
        self.check(call)?;
        if let Some(key) = call.request_key() {
            return Err(FinaudyError::Bridge(format!(
                "{} answers through `{key}`; await it with `request`",
                call.capability
            )));
        }
        self.host.call(call).inspect_err(|e| warn!(error = %e, "host call failed"))
    }

    fn check(&self, call: &HostCall) -> Result<()> {
        if !self.host.has_capability(call.capability) {
            info!("host capability unavailable");
            return Err(FinaudyError::CapabilityUnavailable(call.capability));
        }
        if call.args.len() != call.capability.arity() {
            return Err(FinaudyError::Bridge(format!(
                "{} expects {} argument(s), got {}",
                call.capability,
                call.capability.arity(),
                call.args.len()
            )));
        }
        Ok(())
    }

    /// Call the host and wait for its callback, at most `timeout`.
    ///
    /// A missing capability fails immediately with `CapabilityUnavailable`
    /// and leaves the registry untouched. Dropping the returned future
    /// before it completes withdraws the pending registration.
    #[instrument(skip(self, call), fields(capability = %call.capability))]
    pub async fn invoke(&self, call: HostCall, timeout: Duration) -> Result<BridgeOutcome> {
        self.check(&call)?;
        let Some(key) = call.request_key() else {
            return Err(FinaudyError::Bridge(format!(
                "{} has no reply to wait for; deliver it with `send`",
                call.capability
            )));
        };

        let (tx, mut rx) = oneshot::channel();
        let ticket = self.registry.register(
            key,
            Box::new(move |result| {
                // The receiver is gone only if the caller stopped waiting.
                let _ = tx.send(result);
            }),
        )?;
        let mut guard = WithdrawOnDrop {
            registry: &self.registry,
            key,
            ticket,
            armed: true,
        };

        if let Err(e) = self.host.call(&call) {
            warn!(error = %e, "host call failed");
            return Err(e);
        }
        let after_ms = u64::try_from(timeout.as_millis()).unwrap_or(u64::MAX);
        debug!(%ticket, timeout_ms = after_ms, "awaiting host callback");

        let settled = match tokio::time::timeout(timeout, &mut rx).await {
            Ok(received) => received,
            Err(_) => {
                // Either this expires the registration, or a callback got
                // there first and its result is already in the channel.
                self.registry.expire(key, ticket, after_ms);
                rx.await
            }
        };
        guard.armed = false;

        settled.unwrap_or(Err(FinaudyError::Cancelled(key)))
    }
}

/// Withdraws the registration if the invoking future is dropped (or bails
/// out) before its request settles.
struct WithdrawOnDrop<'a> {
    registry: &'a PendingRequestRegistry,
    key: RequestKey,
    ticket: Ticket,
    armed: bool,
}

impl Drop for WithdrawOnDrop<'_> {
    fn drop(&mut self) {
        if self.armed {
            self.registry.cancel_ticket(self.key, self.ticket);
        }
    }
}
