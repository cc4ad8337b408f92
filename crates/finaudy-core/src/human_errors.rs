// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Human-readable error messages for toasts.
//
// Every bridge failure is mapped to a short title and a suggestion the user
// can act on. Severity drives the toast variant in the UI.

use crate::error::FinaudyError;

/// Severity of an error from the user's perspective.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    /// Nothing went wrong; the user backed out.
    Info,
    /// Slow host or lost callback; trying again usually works.
    Transient,
    /// The user has to change something (grant a permission, update the app).
    ActionRequired,
    /// Misconfiguration or a platform without the feature.
    Permanent,
}

/// A human-readable error with a title and actionable suggestion.
#[derive(Debug, Clone)]
pub struct HumanError {
    pub message: String,
    pub suggestion: String,
    pub retriable: bool,
    pub severity: Severity,
}

/// Convert a `FinaudyError` into something a toast can show.
pub fn humanize_error(err: &FinaudyError) -> HumanError {
    match err {
        FinaudyError::CapabilityUnavailable(capability) => HumanError {
            message: "This feature isn't available on this device.".into(),
            suggestion: format!(
                "Update the Finaudy app from the Play Store and try again. (Missing: {capability})"
            ),
            retriable: false,
            severity: Severity::Permanent,
        },

        FinaudyError::Timeout { .. } => HumanError {
            message: "The app took too long to answer.".into(),
            suggestion: "Please try again in a moment.".into(),
            retriable: true,
            severity: Severity::Transient,
        },

        FinaudyError::DuplicateRequest(_) => HumanError {
            message: "Already in progress.".into(),
            suggestion: "Wait for the current request to finish.".into(),
            retriable: false,
            severity: Severity::Info,
        },

        FinaudyError::Superseded(_) | FinaudyError::Cancelled(_) => HumanError {
            message: "Request cancelled.".into(),
            suggestion: "Start again when you're ready.".into(),
            retriable: true,
            severity: Severity::Info,
        },

        FinaudyError::HostReported(detail) => humanize_host_error(detail),

        FinaudyError::PurchaseCancelled { .. } => HumanError {
            message: "Purchase cancelled.".into(),
            suggestion: "You have not been charged.".into(),
            retriable: true,
            severity: Severity::Info,
        },

        FinaudyError::MalformedPayload(_) => HumanError {
            message: "We couldn't read this notification.".into(),
            suggestion: "Open the notification list to see it.".into(),
            retriable: false,
            severity: Severity::Permanent,
        },

        FinaudyError::MalformedMedia(_) => HumanError {
            message: "We couldn't read what the device sent.".into(),
            suggestion: "Try recording or choosing the file again.".into(),
            retriable: true,
            severity: Severity::Transient,
        },

        FinaudyError::UnexpectedOutcome(_) | FinaudyError::Bridge(_) => HumanError {
            message: "Something went wrong talking to the app.".into(),
            suggestion: "Close and reopen Finaudy, then try again.".into(),
            retriable: true,
            severity: Severity::Transient,
        },

        FinaudyError::Config(detail) => HumanError {
            message: "The app settings are invalid.".into(),
            suggestion: format!("Reset the settings to their defaults. ({detail})"),
            retriable: false,
            severity: Severity::Permanent,
        },

        FinaudyError::Io(_) | FinaudyError::Serialization(_) => HumanError {
            message: "We couldn't save your data on this device.".into(),
            suggestion: "Check that the device has free storage, then try again.".into(),
            retriable: true,
            severity: Severity::Transient,
        },
    }
}

/// Errors the host hands back verbatim (mostly Google Sign-In failures).
fn humanize_host_error(detail: &str) -> HumanError {
    let lower = detail.to_ascii_lowercase();

    if lower.contains("403") || lower.contains("blocked") {
        HumanError {
            message: "Google blocked the sign-in.".into(),
            suggestion: "The app's Google Cloud configuration needs attention. Please contact support.".into(),
            retriable: false,
            severity: Severity::Permanent,
        }
    } else if lower.contains("invalid token") || lower.contains("id token") {
        HumanError {
            message: "Sign-in failed.".into(),
            suggestion: "The sign-in token was rejected. Check that the web client ID is configured in the Android app.".into(),
            retriable: false,
            severity: Severity::Permanent,
        }
    } else if lower.contains("cancel") {
        HumanError {
            message: "Sign-in cancelled.".into(),
            suggestion: "Choose an account to continue.".into(),
            retriable: true,
            severity: Severity::Info,
        }
    } else if lower.contains("network") {
        HumanError {
            message: "No connection.".into(),
            suggestion: "Check your internet connection and try again.".into(),
            retriable: true,
            severity: Severity::Transient,
        }
    } else {
        HumanError {
            message: "Sign-in failed.".into(),
            suggestion: format!("Please try again. (Detail: {detail})"),
            retriable: true,
            severity: Severity::Transient,
        }
    }
}
