// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Pending request registry.
//
// Maps each request key to the one continuation waiting on a host callback.
// An entry is settled exactly once, by whichever of resolve / expire /
// cancel reaches it first; every later attempt finds the slot empty and is
// a no-op. Continuations always run after the lock is released.

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard, PoisonError};

use chrono::{DateTime, Utc};
use tracing::{debug, info, warn};
use uuid::Uuid;

use finaudy_core::config::DuplicatePolicy;
use finaudy_core::error::{FinaudyError, Result};
use finaudy_core::types::{BridgeOutcome, RequestKey};

/// One-shot callback receiving the request's settlement.
pub type Continuation = Box<dyn FnOnce(Result<BridgeOutcome>) + Send + 'static>;

/// Identifies one registration, so timers and drop guards of a replaced
/// request cannot settle its successor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Ticket(Uuid);

impl Ticket {
    fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl std::fmt::Display for Ticket {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

struct PendingRequest {
    ticket: Ticket,
    issued_at: DateTime<Utc>,
    continuation: Continuation,
}

/// Read-only view of a waiting request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingSnapshot {
    pub key: RequestKey,
    pub ticket: Ticket,
    pub issued_at: DateTime<Utc>,
}

/// Process-wide table of requests waiting on the host.
///
/// Guarded by a mutex: JNI callbacks can arrive on a different thread from
/// the one that issued the request.
pub struct PendingRequestRegistry {
    policy: DuplicatePolicy,
    entries: Mutex<HashMap<RequestKey, PendingRequest>>,
}

impl Default for PendingRequestRegistry {
    fn default() -> Self {
        Self::new(DuplicatePolicy::default())
    }
}

impl PendingRequestRegistry {
    pub fn new(policy: DuplicatePolicy) -> Self {
        Self {
            policy,
            entries: Mutex::new(HashMap::new()),
        }
    }

    pub fn policy(&self) -> DuplicatePolicy {
        self.policy
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<RequestKey, PendingRequest>> {
        // A panicking continuation never runs under the lock, so the map is
        // consistent even if the mutex was poisoned.
        self.entries.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Register the continuation for `key`.
    ///
    /// With `DuplicatePolicy::Reject` a second registration fails with
    /// `DuplicateRequest` and the first stays in place. With
    /// `DuplicatePolicy::Replace` the older continuation is settled with
    /// `Superseded` and the new one takes the slot.
    pub fn register(&self, key: RequestKey, continuation: Continuation) -> Result<Ticket> {
        let ticket = Ticket::new();
        let displaced = {
            let mut entries = self.lock();
            if entries.contains_key(&key) && self.policy == DuplicatePolicy::Reject {
                warn!(%key, "rejecting duplicate request");
                return Err(FinaudyError::DuplicateRequest(key));
            }
            entries.insert(
                key,
                PendingRequest {
                    ticket,
                    issued_at: Utc::now(),
                    continuation,
                },
            )
        };

        if let Some(old) = displaced {
            info!(%key, old_ticket = %old.ticket, "replacing pending request");
            (old.continuation)(Err(FinaudyError::Superseded(key)));
        }
        debug!(%key, %ticket, "request registered");
        Ok(ticket)
    }

    /// Settle the pending request for `key` with `result`.
    ///
    /// Returns `false` when nothing was waiting (late, duplicate, or
    /// unsolicited host callback).
    pub fn resolve(&self, key: RequestKey, result: Result<BridgeOutcome>) -> bool {
        let Some(entry) = self.lock().remove(&key) else {
            debug!(%key, "no pending request to resolve");
            return false;
        };
        debug!(%key, ticket = %entry.ticket, ok = result.is_ok(), "resolving request");
        (entry.continuation)(result);
        true
    }

    /// Settle the registration `ticket` with a timeout if it is still waiting.
    pub fn expire(&self, key: RequestKey, ticket: Ticket, after_ms: u64) -> bool {
        let Some(entry) = self.take_ticket(key, ticket) else {
            return false;
        };
        warn!(%key, %ticket, after_ms, "request timed out");
        (entry.continuation)(Err(FinaudyError::Timeout { key, after_ms }));
        true
    }

    /// Cancel whatever is waiting under `key`.
    pub fn cancel(&self, key: RequestKey) -> bool {
        let Some(entry) = self.lock().remove(&key) else {
            return false;
        };
        info!(%key, ticket = %entry.ticket, "request cancelled");
        (entry.continuation)(Err(FinaudyError::Cancelled(key)));
        true
    }

    /// Cancel the registration `ticket` only; a newer registration under the
    /// same key is left alone.
    pub fn cancel_ticket(&self, key: RequestKey, ticket: Ticket) -> bool {
        let Some(entry) = self.take_ticket(key, ticket) else {
            return false;
        };
        debug!(%key, %ticket, "request withdrawn");
        (entry.continuation)(Err(FinaudyError::Cancelled(key)));
        true
    }

    /// Cancel every waiting request. Returns how many were settled.
    pub fn cancel_all(&self) -> usize {
        let drained: Vec<_> = self.lock().drain().collect();
        let count = drained.len();
        for (key, entry) in drained {
            (entry.continuation)(Err(FinaudyError::Cancelled(key)));
        }
        if count > 0 {
            info!(count, "cancelled all pending requests");
        }
        count
    }

    fn take_ticket(&self, key: RequestKey, ticket: Ticket) -> Option<PendingRequest> {
        let mut entries = self.lock();
        match entries.get(&key) {
            Some(entry) if entry.ticket == ticket => entries.remove(&key),
            _ => None,
        }
    }

    pub fn is_pending(&self, key: RequestKey) -> bool {
        self.lock().contains_key(&key)
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    /// Waiting requests, oldest first.
    pub fn snapshot(&self) -> Vec<PendingSnapshot> {
        let mut pending: Vec<_> = self
            .lock()
            .iter()
            .map(|(key, entry)| PendingSnapshot {
                key: *key,
                ticket: entry.ticket,
                issued_at: entry.issued_at,
            })
            .collect();
        pending.sort_by_key(|p| p.issued_at);
        pending
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use finaudy_core::types::PermissionName;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    const MIC: RequestKey = RequestKey::Permission(PermissionName::Microphone);

    /// Continuation that counts calls and records the last settlement.
    fn recorder() -> (Continuation, Arc<AtomicUsize>, Arc<Mutex<Option<Result<BridgeOutcome>>>>) {
        let calls = Arc::new(AtomicUsize::new(0));
        let last = Arc::new(Mutex::new(None));
        let (c, l) = (calls.clone(), last.clone());
        let continuation: Continuation = Box::new(move |result| {
            c.fetch_add(1, Ordering::SeqCst);
            *l.lock().expect("lock") = Some(result);
        });
        (continuation, calls, last)
    }

    fn granted() -> Result<BridgeOutcome> {
        Ok(BridgeOutcome::Permission {
            name: PermissionName::Microphone,
            granted: true,
        })
    }

    #[test]
    fn resolve_invokes_continuation_once_and_removes_entry() {
        let registry = PendingRequestRegistry::default();
        let (continuation, calls, last) = recorder();
        registry.register(MIC, continuation).expect("register");
        assert!(registry.is_pending(MIC));

        assert!(registry.resolve(MIC, granted()));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert!(matches!(
            *last.lock().expect("lock"),
            Some(Ok(BridgeOutcome::Permission { granted: true, .. }))
        ));
        assert!(registry.is_empty());

        assert!(!registry.resolve(MIC, granted()));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn resolve_without_registration_is_a_no_op() {
        let registry = PendingRequestRegistry::default();
        let (continuation, calls, _) = recorder();
        registry.register(RequestKey::FcmToken, continuation).expect("register");

        assert!(!registry.resolve(MIC, granted()));
        assert!(!registry.resolve(RequestKey::Purchase, Err(FinaudyError::HostReported("x".into()))));
        assert_eq!(calls.load(Ordering::SeqCst), 0);
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn reject_policy_keeps_first_registration() {
        let registry = PendingRequestRegistry::new(DuplicatePolicy::Reject);
        let (first, first_calls, first_last) = recorder();
        let (second, second_calls, _) = recorder();

        registry.register(MIC, first).expect("first register");
        let err = registry.register(MIC, second).expect_err("duplicate must fail");
        assert!(matches!(err, FinaudyError::DuplicateRequest(MIC)));

        assert!(registry.resolve(MIC, granted()));
        assert_eq!(first_calls.load(Ordering::SeqCst), 1);
        assert!(matches!(*first_last.lock().expect("lock"), Some(Ok(_))));
        assert_eq!(second_calls.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn replace_policy_supersedes_older_registration() {
        let registry = PendingRequestRegistry::new(DuplicatePolicy::Replace);
        let (first, first_calls, first_last) = recorder();
        let (second, second_calls, second_last) = recorder();

        let first_ticket = registry.register(MIC, first).expect("first register");
        let second_ticket = registry.register(MIC, second).expect("second register");
        assert_ne!(first_ticket, second_ticket);

        assert_eq!(first_calls.load(Ordering::SeqCst), 1);
        assert!(matches!(
            *first_last.lock().expect("lock"),
            Some(Err(FinaudyError::Superseded(MIC)))
        ));

        assert!(registry.resolve(MIC, granted()));
        assert_eq!(second_calls.load(Ordering::SeqCst), 1);
        assert!(matches!(*second_last.lock().expect("lock"), Some(Ok(_))));
        assert_eq!(first_calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn expire_settles_with_timeout_and_late_resolve_is_ignored() {
        let registry = PendingRequestRegistry::default();
        let (continuation, calls, last) = recorder();
        let ticket = registry.register(RequestKey::FcmToken, continuation).expect("register");

        assert!(registry.expire(RequestKey::FcmToken, ticket, 5_000));
        assert!(matches!(
            *last.lock().expect("lock"),
            Some(Err(FinaudyError::Timeout { key: RequestKey::FcmToken, after_ms: 5_000 }))
        ));
        assert!(!registry.resolve(RequestKey::FcmToken, Ok(BridgeOutcome::Token("late".into()))));
        assert!(!registry.expire(RequestKey::FcmToken, ticket, 5_000));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn stale_ticket_does_not_touch_successor() {
        let registry = PendingRequestRegistry::new(DuplicatePolicy::Replace);
        let (first, _, _) = recorder();
        let (second, second_calls, _) = recorder();
        let old = registry.register(MIC, first).expect("first");
        registry.register(MIC, second).expect("second");

        assert!(!registry.expire(MIC, old, 10));
        assert!(!registry.cancel_ticket(MIC, old));
        assert!(registry.is_pending(MIC));
        assert_eq!(second_calls.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn cancel_all_settles_everything() {
        let registry = PendingRequestRegistry::default();
        let (a, a_calls, a_last) = recorder();
        let (b, b_calls, _) = recorder();
        registry.register(MIC, a).expect("a");
        registry.register(RequestKey::Purchase, b).expect("b");
        assert_eq!(registry.snapshot().len(), 2);

        assert_eq!(registry.cancel_all(), 2);
        assert_eq!(a_calls.load(Ordering::SeqCst), 1);
        assert_eq!(b_calls.load(Ordering::SeqCst), 1);
        assert!(matches!(
            *a_last.lock().expect("lock"),
            Some(Err(FinaudyError::Cancelled(MIC)))
        ));
        assert!(registry.is_empty());
        assert!(!registry.cancel(MIC));
    }

    #[test]
    fn continuation_may_reenter_registry() {
        let registry = Arc::new(PendingRequestRegistry::default());
        let inner = registry.clone();
        let continuation: Continuation = Box::new(move |_| {
            // Would deadlock if the continuation ran under the lock.
            assert!(!inner.is_pending(MIC));
        });
        registry.register(MIC, continuation).expect("register");
        assert!(registry.resolve(MIC, granted()));
    }
}
