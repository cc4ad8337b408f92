// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Service layer: the features that talk to the host through the bridge.
//
// Each feature service installs its dispatcher listener when created and
// uninstalls it when dropped, so a callback for a feature that is no longer
// active never reaches stale state.

pub mod app_services;
pub mod data_dir;
pub mod google_auth;
pub mod media;
pub mod notification_clicks;
pub mod permissions;
pub mod purchases;
pub mod push_tokens;

#[cfg(test)]
pub(crate) mod testing;
