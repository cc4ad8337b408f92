// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Unified error types for Finaudy.

use thiserror::Error;

use crate::types::{Capability, RequestKey};

/// Top-level error type for all Finaudy operations.
#[derive(Debug, Error)]
pub enum FinaudyError {
    // -- Bridge protocol --
    #[error("host capability `{0}` is not available")]
    CapabilityUnavailable(Capability),

    #[error("no response from the host for `{key}` within {after_ms} ms")]
    Timeout { key: RequestKey, after_ms: u64 },

    #[error("a `{0}` request is already pending")]
    DuplicateRequest(RequestKey),

    #[error("`{0}` request was replaced by a newer one")]
    Superseded(RequestKey),

    #[error("`{0}` request was cancelled")]
    Cancelled(RequestKey),

    #[error("host reported an error: {0}")]
    HostReported(String),

    #[error("purchase of `{product_id}` was cancelled")]
    PurchaseCancelled { product_id: String },

    #[error("unexpected outcome for `{0}`")]
    UnexpectedOutcome(RequestKey),

    // -- Notifications --
    #[error("malformed notification payload: {0}")]
    MalformedPayload(String),

    // -- Media --
    #[error("malformed media from host: {0}")]
    MalformedMedia(String),

    // -- Platform bridge --
    #[error("platform bridge error: {0}")]
    Bridge(String),

    // -- Configuration / persistence --
    #[error("configuration error: {0}")]
    Config(String),

    #[error("file I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Alias used throughout the codebase.
pub type Result<T> = std::result::Result<T, FinaudyError>;
