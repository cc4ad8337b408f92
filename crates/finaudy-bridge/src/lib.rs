// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>

//! Finaudy — native host bridge.
//!
//! The host (the Android activity hosting the WebView) exposes a set of
//! optional, fire-and-forget methods and answers later through fixed
//! callback names. This crate turns that into ordinary async requests:
//!
//! - [`registry::PendingRequestRegistry`] keeps one waiting continuation per
//!   request key and guarantees each is settled exactly once.
//! - [`invoker::BridgeInvoker`] presence-checks a capability, calls the host,
//!   and races the callback against a timeout.
//! - [`dispatcher::CallbackDispatcher`] is what the host calls back into.

mod attachment;
pub mod dispatcher;
pub mod invoker;
pub mod registry;
pub mod traits;

#[cfg(target_os = "android")]
pub mod android;

#[cfg(not(target_os = "android"))]
pub mod stub;

#[cfg(test)]
mod testing;

use std::sync::Arc;

pub use dispatcher::{CallbackDispatcher, CallbackFamily, HostEvent, Installation};
pub use invoker::BridgeInvoker;
pub use registry::PendingRequestRegistry;
pub use traits::HostSurface;

/// Retrieves the host implementation for the target operating system.
pub fn platform_host() -> Arc<dyn HostSurface> {
    #[cfg(target_os = "android")]
    {
        // Android: JNI calls into the WebAppInterface object attached by
        // `NativeBridge.nativeAttach`.
        Arc::new(android::AndroidHost::new())
    }
    #[cfg(not(target_os = "android"))]
    {
        // DESKTOP/CI: no native bridge, every capability is absent.
        Arc::new(stub::StubHost)
    }
}
