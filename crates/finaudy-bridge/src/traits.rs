// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Platform-agnostic definition of the host capability surface.

use finaudy_core::error::Result;
use finaudy_core::types::{Capability, HostCall};

/// The object a host environment exposes to the app (the Android
/// `WebAppInterface`, a test double, or nothing at all).
///
/// Calls are fire-and-forget: `call` returns once the host has accepted the
/// request, and the answer arrives later through one of the
/// [`CallbackDispatcher`](crate::dispatcher::CallbackDispatcher) entry points.
pub trait HostSurface: Send + Sync {
    /// Human-readable platform name (e.g. "Android", "Desktop (stub)").
    fn platform_name(&self) -> &str;

    /// Whether the host exposes `capability`. Hosts built from older app
    /// versions may lack some methods.
    fn has_capability(&self, capability: Capability) -> bool;

    /// Invoke the host method for `call`. Returns an error only when the
    /// call could not be delivered; the host's answer never comes back here.
    fn call(&self, call: &HostCall) -> Result<()>;

    /// Capabilities currently exposed.
    fn capabilities(&self) -> Vec<Capability> {
        Capability::ALL
            .into_iter()
            .filter(|c| self.has_capability(*c))
            .collect()
    }
}
