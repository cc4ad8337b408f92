// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Stub host for desktop/CI builds where no native bridge is attached.
//
// Exposes no capabilities, so every request fails fast with
// `CapabilityUnavailable`. The real implementation lives in `android`.

use finaudy_core::error::{FinaudyError, Result};
use finaudy_core::types::{Capability, HostCall};

use crate::traits::HostSurface;

/// No-op host returned on non-mobile platforms.
pub struct StubHost;

impl HostSurface for StubHost {
    fn platform_name(&self) -> &str {
        "Desktop (stub)"
    }

    fn has_capability(&self, _capability: Capability) -> bool {
        false
    }

    fn call(&self, call: &HostCall) -> Result<()> {
        tracing::warn!(capability = %call.capability, "host call on stub bridge");
        Err(FinaudyError::CapabilityUnavailable(call.capability))
    }
}
