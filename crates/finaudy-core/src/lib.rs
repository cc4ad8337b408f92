// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Finaudy — Core types, errors, configuration, and notification routing
// shared across all crates.

pub mod config;
pub mod error;
pub mod human_errors;
pub mod media;
pub mod notification;
pub mod routing;
pub mod types;

pub use config::{AppConfig, BridgeConfig, DuplicatePolicy};
pub use error::FinaudyError;
pub use media::{MediaData, SelectedFile};
pub use notification::NotificationPayload;
pub use routing::{RouteTarget, View, route_notification, web_location};
pub use types::*;
