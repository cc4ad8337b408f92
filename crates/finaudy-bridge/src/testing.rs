// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Scripted host used by the crate's tests.

use std::sync::Mutex;

use finaudy_core::error::{FinaudyError, Result};
use finaudy_core::types::{Capability, HostCall};

use crate::traits::HostSurface;

type Responder = Box<dyn Fn(&HostCall) + Send + Sync>;

/// Host double that records calls and optionally answers them.
pub(crate) struct ScriptedHost {
    capabilities: Vec<Capability>,
    calls: Mutex<Vec<HostCall>>,
    responder: Mutex<Option<Responder>>,
    failing: bool,
}

impl ScriptedHost {
    pub(crate) fn with_capabilities(capabilities: &[Capability]) -> Self {
        Self {
            capabilities: capabilities.to_vec(),
            calls: Mutex::new(Vec::new()),
            responder: Mutex::new(None),
            failing: false,
        }
    }

    pub(crate) fn all() -> Self {
        Self::with_capabilities(&Capability::ALL)
    }

    /// Every call fails to reach the host.
    pub(crate) fn failing(mut self) -> Self {
        self.failing = true;
        self
    }

    pub(crate) fn respond_with(&self, responder: impl Fn(&HostCall) + Send + Sync + 'static) {
        *self.responder.lock().expect("responder lock") = Some(Box::new(responder));
    }

    pub(crate) fn calls(&self) -> Vec<HostCall> {
        self.calls.lock().expect("calls lock").clone()
    }
}

impl HostSurface for ScriptedHost {
    fn platform_name(&self) -> &str {
        "Scripted"
    }

    fn has_capability(&self, capability: Capability) -> bool {
        self.capabilities.contains(&capability)
    }

    fn call(&self, call: &HostCall) -> Result<()> {
        if self.failing {
            return Err(FinaudyError::Bridge("host rejected the call".into()));
        }
        self.calls.lock().expect("calls lock").push(call.clone());
        if let Some(responder) = self.responder.lock().expect("responder lock").as_ref() {
            responder(call);
        }
        Ok(())
    }
}
