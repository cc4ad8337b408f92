// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Application configuration.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{FinaudyError, Result};
use crate::types::RequestKey;

/// What the pending-request registry does when a second request arrives for
/// a key that is still waiting on the host.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DuplicatePolicy {
    /// Refuse the new request with `DuplicateRequest`; the first keeps waiting.
    Reject,
    /// Settle the older request with `Superseded` and let the new one wait.
    #[default]
    Replace,
}

/// Timeouts and policies for the native bridge.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BridgeConfig {
    /// FCM token retrieval timeout.
    pub token_timeout_ms: u64,
    /// Permission dialogs wait on the user.
    pub permission_timeout_ms: u64,
    /// Google account chooser plus consent screens.
    pub sign_in_timeout_ms: u64,
    /// Play Store purchase sheet, including payment method entry.
    pub purchase_timeout_ms: u64,
    /// Camera, gallery and file chooser activities.
    pub media_timeout_ms: u64,
    /// Stopping a recording until its audio arrives. A recording too short
    /// to encode produces no audio at all.
    pub recording_timeout_ms: u64,
    pub duplicate_policy: DuplicatePolicy,
    /// Delay between a notification click and navigation, so the first
    /// render can finish when the app is cold-started by the click.
    pub notification_nav_delay_ms: u64,
}

impl Default for BridgeConfig {
    fn default() -> Self {
        Self {
            token_timeout_ms: 5_000,
            permission_timeout_ms: 60_000,
            sign_in_timeout_ms: 120_000,
            purchase_timeout_ms: 300_000,
            media_timeout_ms: 300_000,
            recording_timeout_ms: 15_000,
            duplicate_policy: DuplicatePolicy::default(),
            notification_nav_delay_ms: 300,
        }
    }
}

impl BridgeConfig {
    /// Timeout applied to requests waiting under `key`.
    pub fn timeout_for(&self, key: RequestKey) -> Duration {
        let ms = match key {
            RequestKey::Permission(_) => self.permission_timeout_ms,
            RequestKey::FcmToken => self.token_timeout_ms,
            RequestKey::GoogleSignIn => self.sign_in_timeout_ms,
            RequestKey::Purchase => self.purchase_timeout_ms,
            RequestKey::ImageCapture | RequestKey::GallerySelection | RequestKey::FileSelection => {
                self.media_timeout_ms
            }
            RequestKey::AudioRecording => self.recording_timeout_ms,
        };
        Duration::from_millis(ms)
    }

    pub fn notification_nav_delay(&self) -> Duration {
        Duration::from_millis(self.notification_nav_delay_ms)
    }

    /// Reject configurations that would make every request time out at once.
    pub fn validate(&self) -> Result<()> {
        let timeouts = [
            ("token_timeout_ms", self.token_timeout_ms),
            ("permission_timeout_ms", self.permission_timeout_ms),
            ("sign_in_timeout_ms", self.sign_in_timeout_ms),
            ("purchase_timeout_ms", self.purchase_timeout_ms),
            ("media_timeout_ms", self.media_timeout_ms),
            ("recording_timeout_ms", self.recording_timeout_ms),
        ];
        for (name, value) in timeouts {
            if value == 0 {
                return Err(FinaudyError::Config(format!("{name} must be greater than zero")));
            }
        }
        Ok(())
    }
}

/// Persistent application settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub bridge: BridgeConfig,
    /// Platform tag stored alongside push tokens.
    pub push_platform: String,
    /// Request notification permission automatically on launch.
    pub request_notifications_on_launch: bool,
    /// Request a push token automatically on launch.
    pub request_token_on_launch: bool,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            bridge: BridgeConfig::default(),
            push_platform: "android".into(),
            request_notifications_on_launch: true,
            request_token_on_launch: true,
        }
    }
}

impl AppConfig {
    /// Parse a JSON config; absent fields take their defaults.
    pub fn from_json(data: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(data)?;
        config.bridge.validate()?;
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::PermissionName;

    #[test]
    fn token_timeout_defaults_to_five_seconds() {
        let config = BridgeConfig::default();
        assert_eq!(config.timeout_for(RequestKey::FcmToken), Duration::from_secs(5));
        assert!(
            config.timeout_for(RequestKey::Permission(PermissionName::Microphone))
                > config.timeout_for(RequestKey::FcmToken)
        );
    }

    #[test]
    fn media_keys_use_their_own_timeouts() {
        let config = AppConfig::from_json(
            r#"{ "bridge": { "media_timeout_ms": 90000, "recording_timeout_ms": 4000 } }"#,
        )
        .expect("parse")
        .bridge;
        for key in [RequestKey::ImageCapture, RequestKey::GallerySelection, RequestKey::FileSelection] {
            assert_eq!(config.timeout_for(key), Duration::from_secs(90));
        }
        assert_eq!(config.timeout_for(RequestKey::AudioRecording), Duration::from_secs(4));
        assert!(matches!(
            AppConfig::from_json(r#"{ "bridge": { "recording_timeout_ms": 0 } }"#),
            Err(FinaudyError::Config(_))
        ));
    }

    #[test]
    fn partial_json_keeps_defaults() {
        let config =
            AppConfig::from_json(r#"{ "bridge": { "duplicate_policy": "reject" } }"#).expect("parse");
        assert_eq!(config.bridge.duplicate_policy, DuplicatePolicy::Reject);
        assert_eq!(config.bridge.token_timeout_ms, 5_000);
        assert_eq!(config.push_platform, "android");
    }

    #[test]
    fn zero_timeout_is_rejected() {
        let result = AppConfig::from_json(r#"{ "bridge": { "sign_in_timeout_ms": 0 } }"#);
        assert!(matches!(result, Err(FinaudyError::Config(_))));
    }

    #[test]
    fn malformed_json_is_a_serialization_error() {
        assert!(matches!(
            AppConfig::from_json("{ not json"),
            Err(FinaudyError::Serialization(_))
        ));
    }
}
