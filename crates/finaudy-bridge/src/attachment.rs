// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Process-wide slots the native host fills when it attaches.
//
// JNI entry points have fixed symbol names and no user data, so whatever
// they need (the JVM, the Java bridge object, the dispatcher) lives in a
// static. Reading an empty slot is an error, never a panic: the host may
// call in before attaching, or after detaching.

#![cfg_attr(not(target_os = "android"), allow(dead_code))]

use std::sync::{Mutex, OnceLock, PoisonError};

use finaudy_core::error::{FinaudyError, Result};

/// A value attached and detached by the host at runtime.
pub(crate) struct AttachSlot<T> {
    name: &'static str,
    value: Mutex<Option<T>>,
}

impl<T: Clone> AttachSlot<T> {
    pub(crate) const fn new(name: &'static str) -> Self {
        Self {
            name,
            value: Mutex::new(None),
        }
    }

    /// Store `value`. Returns whether it replaced an earlier one.
    pub(crate) fn attach(&self, value: T) -> bool {
        self.lock().replace(value).is_some()
    }

    /// Empty the slot. Returns whether anything was attached.
    pub(crate) fn detach(&self) -> bool {
        self.lock().take().is_some()
    }

    pub(crate) fn current(&self) -> Option<T> {
        self.lock().clone()
    }

    pub(crate) fn require(&self) -> Result<T> {
        self.current()
            .ok_or_else(|| FinaudyError::Bridge(format!("{} is not attached", self.name)))
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Option<T>> {
        self.value.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Read a set-once slot recorded at library load or first attach.
pub(crate) fn recorded<'a, T>(slot: &'a OnceLock<T>, name: &str) -> Result<&'a T> {
    slot.get()
        .ok_or_else(|| FinaudyError::Bridge(format!("{name} has not been recorded yet")))
}
