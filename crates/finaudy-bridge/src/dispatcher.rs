// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Callback dispatcher: the entry points the host invokes.
//
// One entry point per host callback name. Each parses the host arguments,
// hands the event to the listener installed for its family, and resolves
// the matching pending request. Every entry point is safe to call any
// number of times, including before anything was requested.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};

use serde_json::Value;
use tracing::{debug, info, warn};

use finaudy_core::error::FinaudyError;
use finaudy_core::media::{MediaData, RECORDING_MIME_TYPE, SelectedFile};
use finaudy_core::notification::NotificationPayload;
use finaudy_core::types::{
    BridgeOutcome, GoogleCredential, PermissionName, PurchaseReceipt, RequestKey,
};

use crate::registry::PendingRequestRegistry;

/// Groups of host callbacks that share a listener.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CallbackFamily {
    PermissionResult,
    GoogleSignIn,
    FcmToken,
    PurchaseFinished,
    NotificationClicked,
    /// Recorded audio, camera and gallery images, chosen files.
    Media,
}

impl CallbackFamily {
    /// Global callback names the host calls for this family.
    pub fn entry_points(&self) -> &'static [&'static str] {
        match self {
            Self::PermissionResult => &["onPermissionResult"],
            Self::GoogleSignIn => &["onGoogleSignInSuccess", "onGoogleSignInError"],
            Self::FcmToken => &["onFCMTokenReceived"],
            Self::PurchaseFinished => &["onGooglePlayPurchaseFinished"],
            Self::NotificationClicked => &["onNotificationClicked"],
            Self::Media => &[
                "onAudioRecordingComplete",
                "onImageCaptureComplete",
                "onGalleryImageSelected",
                "onFileSelected",
            ],
        }
    }
}

/// A parsed host callback.
#[derive(Debug, Clone, PartialEq)]
pub enum HostEvent {
    PermissionResult { name: PermissionName, granted: bool },
    SignInSucceeded(GoogleCredential),
    SignInFailed { message: String },
    TokenReceived { token: String },
    /// `purchase_token` is `None` when the user backed out of the store sheet.
    PurchaseFinished {
        purchase_token: Option<String>,
        product_id: String,
    },
    NotificationClicked(NotificationPayload),
    AudioRecorded(MediaData),
    ImageCaptured(MediaData),
    GalleryImageSelected(MediaData),
    FileSelected(SelectedFile),
}

impl HostEvent {
    pub fn family(&self) -> CallbackFamily {
        match self {
            Self::PermissionResult { .. } => CallbackFamily::PermissionResult,
            Self::SignInSucceeded(_) | Self::SignInFailed { .. } => CallbackFamily::GoogleSignIn,
            Self::TokenReceived { .. } => CallbackFamily::FcmToken,
            Self::PurchaseFinished { .. } => CallbackFamily::PurchaseFinished,
            Self::NotificationClicked(_) => CallbackFamily::NotificationClicked,
            Self::AudioRecorded(_)
            | Self::ImageCaptured(_)
            | Self::GalleryImageSelected(_)
            | Self::FileSelected(_) => CallbackFamily::Media,
        }
    }
}

/// Feature-side observer of one callback family.
pub type Listener = Arc<dyn Fn(&HostEvent) + Send + Sync>;

struct Slot {
    id: u64,
    listener: Listener,
}

/// Owns the pending-request registry and the per-family listeners.
pub struct CallbackDispatcher {
    registry: Arc<PendingRequestRegistry>,
    listeners: Mutex<HashMap<CallbackFamily, Slot>>,
    next_slot: AtomicU64,
}

impl CallbackDispatcher {
    pub fn new(registry: Arc<PendingRequestRegistry>) -> Arc<Self> {
        Arc::new(Self {
            registry,
            listeners: Mutex::new(HashMap::new()),
            next_slot: AtomicU64::new(1),
        })
    }

    pub fn registry(&self) -> &Arc<PendingRequestRegistry> {
        &self.registry
    }

    fn listeners(&self) -> MutexGuard<'_, HashMap<CallbackFamily, Slot>> {
        self.listeners.lock().unwrap_or_else(PoisonError::into_inner)
    }

    // -- Lifecycle ------------------------------------------------------------

    /// Install the listener for `family` while the returned [`Installation`]
    /// is alive. A newer installation for the same family replaces this one.
    pub fn install(
        self: &Arc<Self>,
        family: CallbackFamily,
        listener: impl Fn(&HostEvent) + Send + Sync + 'static,
    ) -> Installation {
        let id = self.next_slot.fetch_add(1, Ordering::Relaxed);
        let previous = self.listeners().insert(
            family,
            Slot {
                id,
                listener: Arc::new(listener),
            },
        );
        if previous.is_some() {
            info!(?family, "replacing installed listener");
        } else {
            debug!(?family, "listener installed");
        }
        Installation {
            dispatcher: Arc::downgrade(self),
            family,
            id,
        }
    }

    /// Remove whatever listener is installed for `family`.
    pub fn uninstall(&self, family: CallbackFamily) -> bool {
        let removed = self.listeners().remove(&family).is_some();
        if removed {
            debug!(?family, "listener uninstalled");
        }
        removed
    }

    pub fn is_installed(&self, family: CallbackFamily) -> bool {
        self.listeners().contains_key(&family)
    }

    fn remove_slot(&self, family: CallbackFamily, id: u64) {
        let mut listeners = self.listeners();
        if listeners.get(&family).is_some_and(|slot| slot.id == id) {
            listeners.remove(&family);
            debug!(?family, "listener uninstalled");
        }
    }

    /// Hand `event` to its family's listener. The listener runs outside the
    /// lock so it may install or uninstall listeners itself.
    fn notify(&self, event: &HostEvent) -> bool {
        let family = event.family();
        let listener = self.listeners().get(&family).map(|slot| slot.listener.clone());
        match listener {
            Some(listener) => {
                listener(event);
                true
            }
            None => {
                debug!(?family, "no listener installed");
                false
            }
        }
    }

    fn settle(&self, key: RequestKey, result: Result<BridgeOutcome, FinaudyError>) -> bool {
        let resolved = self.registry.resolve(key, result);
        if !resolved {
            info!(%key, "host callback with no pending request");
        }
        resolved
    }

    // -- Entry points ---------------------------------------------------------
    //
    // Each returns whether a pending request was resolved.

    /// `onPermissionResult(name, granted)`.
    pub fn on_permission_result(&self, name: &str, granted: bool) -> bool {
        let Some(permission) = PermissionName::from_host(name) else {
            warn!(name, granted, "ignoring result for unknown permission");
            return false;
        };
        info!(permission = %permission, granted, "permission result from host");
        self.notify(&HostEvent::PermissionResult {
            name: permission,
            granted,
        });
        self.settle(
            RequestKey::Permission(permission),
            Ok(BridgeOutcome::Permission {
                name: permission,
                granted,
            }),
        )
    }

    /// `onGoogleSignInSuccess(idToken, accessToken)`.
    pub fn on_google_sign_in_success(&self, id_token: &str, access_token: Option<&str>) -> bool {
        let access_token = access_token.filter(|t| !t.is_empty()).map(str::to_string);
        if id_token.is_empty() && access_token.is_none() {
            return self.on_google_sign_in_error("no usable token returned by the host");
        }
        info!(has_access_token = access_token.is_some(), "Google sign-in succeeded on host");
        let credential = GoogleCredential {
            id_token: id_token.to_string(),
            access_token,
        };
        self.notify(&HostEvent::SignInSucceeded(credential.clone()));
        self.settle(RequestKey::GoogleSignIn, Ok(BridgeOutcome::SignIn(credential)))
    }

    /// `onGoogleSignInError(message)`.
    pub fn on_google_sign_in_error(&self, message: &str) -> bool {
        warn!(message, "Google sign-in failed on host");
        self.notify(&HostEvent::SignInFailed {
            message: message.to_string(),
        });
        self.settle(
            RequestKey::GoogleSignIn,
            Err(FinaudyError::HostReported(message.to_string())),
        )
    }

    /// `onFCMTokenReceived(token)`.
    pub fn on_fcm_token_received(&self, token: &str) -> bool {
        if token.is_empty() {
            warn!("host delivered an empty FCM token");
            return self.settle(
                RequestKey::FcmToken,
                Err(FinaudyError::HostReported("empty FCM token".into())),
            );
        }
        info!(token_prefix = token_prefix(token), "FCM token received from host");
        self.notify(&HostEvent::TokenReceived {
            token: token.to_string(),
        });
        self.settle(RequestKey::FcmToken, Ok(BridgeOutcome::Token(token.to_string())))
    }

    /// `onGooglePlayPurchaseFinished(purchaseToken, productId)`. An empty
    /// purchase token means the user cancelled.
    pub fn on_google_play_purchase_finished(&self, purchase_token: &str, product_id: &str) -> bool {
        let purchase_token = Some(purchase_token).filter(|t| !t.is_empty());
        info!(product_id, completed = purchase_token.is_some(), "purchase flow finished");
        self.notify(&HostEvent::PurchaseFinished {
            purchase_token: purchase_token.map(str::to_string),
            product_id: product_id.to_string(),
        });
        let result = match purchase_token {
            Some(token) => Ok(BridgeOutcome::Purchase(PurchaseReceipt {
                purchase_token: token.to_string(),
                product_id: product_id.to_string(),
            })),
            None => Err(FinaudyError::PurchaseCancelled {
                product_id: product_id.to_string(),
            }),
        };
        self.settle(RequestKey::Purchase, result)
    }

    /// `onNotificationClicked(notification)` with the notification as JSON
    /// text. Unparseable input is treated as an empty notification.
    ///
    /// Returns whether a listener received the click.
    pub fn on_notification_clicked(&self, raw: &str) -> bool {
        self.on_notification(NotificationPayload::from_json(raw))
    }

    /// As [`on_notification_clicked`](Self::on_notification_clicked) for an
    /// already-parsed JSON value.
    pub fn on_notification_value(&self, value: &Value) -> bool {
        self.on_notification(NotificationPayload::normalize(value))
    }

    pub fn on_notification(&self, payload: NotificationPayload) -> bool {
        info!(kind = payload.kind().unwrap_or("<none>"), "notification clicked");
        let delivered = self.notify(&HostEvent::NotificationClicked(payload));
        if !delivered {
            info!("notification click dropped: no listener installed");
        }
        delivered
    }

    /// `onAudioRecordingComplete(base64Audio)`, after `stopAudioRecording`.
    pub fn on_audio_recording_complete(&self, base64_audio: &str) -> bool {
        let media = MediaData::from_base64(RECORDING_MIME_TYPE, base64_audio);
        self.settle_media(RequestKey::AudioRecording, media, HostEvent::AudioRecorded)
    }

    /// `onImageCaptureComplete(imageDataUrl)`, after `openCamera`.
    pub fn on_image_capture_complete(&self, data_url: &str) -> bool {
        let media = MediaData::from_data_url(data_url);
        self.settle_media(RequestKey::ImageCapture, media, HostEvent::ImageCaptured)
    }

    /// `onGalleryImageSelected(imageDataUrl)`, after `openGallery`.
    pub fn on_gallery_image_selected(&self, data_url: &str) -> bool {
        let media = MediaData::from_data_url(data_url);
        self.settle_media(RequestKey::GallerySelection, media, HostEvent::GalleryImageSelected)
    }

    /// `onFileSelected(fileDataUrl, fileName, fileType)`, after
    /// `openFileChooser`.
    pub fn on_file_selected(&self, data_url: &str, file_name: &str, file_type: &str) -> bool {
        let file = MediaData::from_data_url(data_url).map(|data| SelectedFile {
            file_name: file_name.to_string(),
            file_type: if file_type.is_empty() {
                data.mime_type.clone()
            } else {
                file_type.to_string()
            },
            data,
        });
        match file {
            Ok(file) => {
                info!(
                    file_name = %file.file_name,
                    file_type = %file.file_type,
                    len = file.data.len(),
                    "file selected on host"
                );
                self.notify(&HostEvent::FileSelected(file.clone()));
                self.settle(RequestKey::FileSelection, Ok(BridgeOutcome::File(file)))
            }
            Err(e) => {
                warn!(file_name, error = %e, "unreadable file from host");
                self.settle(RequestKey::FileSelection, Err(e))
            }
        }
    }

    fn settle_media(
        &self,
        key: RequestKey,
        media: Result<MediaData, FinaudyError>,
        event: fn(MediaData) -> HostEvent,
    ) -> bool {
        match media {
            Ok(media) => {
                info!(%key, mime_type = %media.mime_type, len = media.len(), "media received from host");
                self.notify(&event(media.clone()));
                self.settle(key, Ok(BridgeOutcome::Media(media)))
            }
            Err(e) => {
                warn!(%key, error = %e, "unreadable media from host");
                self.settle(key, Err(e))
            }
        }
    }
}

/// Keeps a listener installed; dropping it uninstalls the listener unless a
/// newer installation has replaced it.
#[must_use = "dropping an Installation uninstalls its listener"]
pub struct Installation {
    dispatcher: Weak<CallbackDispatcher>,
    family: CallbackFamily,
    id: u64,
}

impl Installation {
    pub fn family(&self) -> CallbackFamily {
        self.family
    }

    /// Uninstall now.
    pub fn uninstall(self) {}
}

impl Drop for Installation {
    fn drop(&mut self) {
        if let Some(dispatcher) = self.dispatcher.upgrade() {
            dispatcher.remove_slot(self.family, self.id);
        }
    }
}

/// Enough of a token to correlate log lines without leaking it.
fn token_prefix(token: &str) -> &str {
    let end = token
        .char_indices()
        .nth(12)
        .map(|(i, _)| i)
        .unwrap_or(token.len());
    &token[..end]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::invoker::BridgeInvoker;
    use crate::testing::ScriptedHost;
    use finaudy_core::config::BridgeConfig;
    use finaudy_core::types::{Capability, HostCall};
    use std::time::Duration;

    fn dispatcher() -> Arc<CallbackDispatcher> {
        CallbackDispatcher::new(Arc::new(PendingRequestRegistry::default()))
    }

    fn capture(dispatcher: &Arc<CallbackDispatcher>, family: CallbackFamily) -> (Installation, Arc<Mutex<Vec<HostEvent>>>) {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = seen.clone();
        let installation = dispatcher.install(family, move |event| {
            sink.lock().expect("lock").push(event.clone());
        });
        (installation, seen)
    }

    #[test]
    fn unsolicited_callbacks_are_harmless() {
        let dispatcher = dispatcher();
        assert!(!dispatcher.on_permission_result("microphone", true));
        assert!(!dispatcher.on_fcm_token_received("token"));
        assert!(!dispatcher.on_google_sign_in_success("id", None));
        assert!(!dispatcher.on_google_sign_in_error("boom"));
        assert!(!dispatcher.on_google_play_purchase_finished("", "vip_monthly"));
        assert!(!dispatcher.on_notification_clicked("{}"));
        assert!(dispatcher.registry().is_empty());
    }

    #[test]
    fn unknown_permission_is_ignored() {
        let dispatcher = dispatcher();
        let (_installation, seen) = capture(&dispatcher, CallbackFamily::PermissionResult);
        assert!(!dispatcher.on_permission_result("storage", true));
        assert!(seen.lock().expect("lock").is_empty());
    }

    #[test]
    fn listener_sees_events_until_uninstalled() {
        let dispatcher = dispatcher();
        let (installation, seen) = capture(&dispatcher, CallbackFamily::FcmToken);

        dispatcher.on_fcm_token_received("first");
        assert!(dispatcher.is_installed(CallbackFamily::FcmToken));
        drop(installation);
        assert!(!dispatcher.is_installed(CallbackFamily::FcmToken));
        dispatcher.on_fcm_token_received("second");

        let seen = seen.lock().expect("lock");
        assert_eq!(
            *seen,
            vec![HostEvent::TokenReceived {
                token: "first".into()
            }]
        );
    }

    #[test]
    fn stale_installation_keeps_newer_listener() {
        let dispatcher = dispatcher();
        let (old, _) = capture(&dispatcher, CallbackFamily::NotificationClicked);
        let (_new, seen) = capture(&dispatcher, CallbackFamily::NotificationClicked);

        old.uninstall();
        assert!(dispatcher.on_notification_clicked(r#"{"data":{"type":"reminder"}}"#));
        assert_eq!(seen.lock().expect("lock").len(), 1);
    }

    #[test]
    fn malformed_notification_still_reaches_listener() {
        let dispatcher = dispatcher();
        let (_installation, seen) = capture(&dispatcher, CallbackFamily::NotificationClicked);
        assert!(dispatcher.on_notification_clicked("not json"));
        assert_eq!(
            *seen.lock().expect("lock"),
            vec![HostEvent::NotificationClicked(NotificationPayload::default())]
        );
    }

    #[test]
    fn empty_sign_in_tokens_become_error() {
        let dispatcher = dispatcher();
        let (_installation, seen) = capture(&dispatcher, CallbackFamily::GoogleSignIn);
        dispatcher.on_google_sign_in_success("", Some(""));
        assert!(matches!(
            seen.lock().expect("lock").as_slice(),
            [HostEvent::SignInFailed { .. }]
        ));
    }

    #[test]
    fn token_prefix_is_bounded() {
        assert_eq!(token_prefix("short"), "short");
        assert_eq!(token_prefix("abcdefghijklmnopqrstuvwxyz"), "abcdefghijkl");
    }

    #[tokio::test]
    async fn entry_points_resolve_pending_requests() {
        let host = Arc::new(ScriptedHost::all());
        let dispatcher = dispatcher();
        let invoker = BridgeInvoker::new(host.clone(), dispatcher.registry().clone(), BridgeConfig::default());

        let d = dispatcher.clone();
        host.respond_with(move |call| match call.capability {
            Capability::RequestNotificationPermission => {
                d.on_permission_result("notifications", true);
            }
            Capability::SignInWithGoogle => {
                d.on_google_sign_in_success("id-token", Some("access"));
            }
            Capability::LaunchPurchaseFlow => {
                d.on_google_play_purchase_finished("purchase-token", &call.args[0]);
            }
            Capability::GetFcmToken => {
                d.on_fcm_token_received("fcm-token");
            }
            _ => {}
        });

        let granted = invoker
            .invoke(HostCall::permission(PermissionName::Notifications), Duration::from_secs(1))
            .await
            .expect("permission");
        assert_eq!(
            granted,
            BridgeOutcome::Permission {
                name: PermissionName::Notifications,
                granted: true
            }
        );

        let credential = invoker
            .invoke(HostCall::new(Capability::SignInWithGoogle), Duration::from_secs(1))
            .await
            .expect("sign-in")
            .into_credential(RequestKey::GoogleSignIn)
            .expect("credential");
        assert_eq!(credential.access_token.as_deref(), Some("access"));

        let receipt = invoker
            .invoke(HostCall::purchase("premium_monthly"), Duration::from_secs(1))
            .await
            .expect("purchase")
            .into_receipt(RequestKey::Purchase)
            .expect("receipt");
        assert_eq!(receipt.product_id, "premium_monthly");

        let token = invoker
            .invoke(HostCall::new(Capability::GetFcmToken), Duration::from_secs(1))
            .await
            .expect("token")
            .into_token(RequestKey::FcmToken)
            .expect("string");
        assert_eq!(token, "fcm-token");
        assert!(dispatcher.registry().is_empty());
    }

    #[tokio::test]
    async fn cancelled_purchase_is_a_typed_failure() {
        let host = Arc::new(ScriptedHost::all());
        let dispatcher = dispatcher();
        let invoker = BridgeInvoker::new(host.clone(), dispatcher.registry().clone(), BridgeConfig::default());
        let d = dispatcher.clone();
        host.respond_with(move |call| {
            d.on_google_play_purchase_finished("", &call.args[0]);
        });

        let result = invoker
            .invoke(HostCall::purchase("vip_monthly"), Duration::from_secs(1))
            .await;
        assert!(matches!(
            result,
            Err(FinaudyError::PurchaseCancelled { product_id }) if product_id == "vip_monthly"
        ));
    }

    #[tokio::test]
    async fn duplicate_callback_after_resolution_is_a_no_op() {
        let host = Arc::new(ScriptedHost::all());
        let dispatcher = dispatcher();
        let invoker = BridgeInvoker::new(host.clone(), dispatcher.registry().clone(), BridgeConfig::default());
        let d = dispatcher.clone();
        host.respond_with(move |_| {
            assert!(d.on_fcm_token_received("one"));
            assert!(!d.on_fcm_token_received("two"));
        });

        let token = invoker
            .invoke(HostCall::new(Capability::GetFcmToken), Duration::from_secs(1))
            .await
            .expect("token");
        assert_eq!(token, BridgeOutcome::Token("one".into()));
    }

    #[tokio::test]
    async fn media_entry_points_resolve_their_requests() {
        let host = Arc::new(ScriptedHost::all());
        let dispatcher = dispatcher();
        let invoker = BridgeInvoker::new(host.clone(), dispatcher.registry().clone(), BridgeConfig::default());
        let (_installation, seen) = capture(&dispatcher, CallbackFamily::Media);

        let d = dispatcher.clone();
        host.respond_with(move |call| match call.capability {
            Capability::StopAudioRecording => {
                d.on_audio_recording_complete("IyFBTVIK");
            }
            Capability::OpenCamera => {
                d.on_image_capture_complete("data:image/jpeg;base64,/9j/4A==");
            }
            Capability::OpenFileChooser => {
                d.on_file_selected("data:application/pdf;base64,JVBERi0=", "statement.pdf", "");
            }
            _ => {}
        });

        invoker
            .send(&HostCall::new(Capability::StartAudioRecording))
            .expect("start");
        let audio = invoker
            .request(HostCall::new(Capability::StopAudioRecording))
            .await
            .expect("audio")
            .into_media(RequestKey::AudioRecording)
            .expect("media");
        assert_eq!(audio.mime_type, "audio/3gpp");
        assert_eq!(audio.bytes, b"#!AMR\n");

        let photo = invoker
            .request(HostCall::new(Capability::OpenCamera))
            .await
            .expect("photo")
            .into_media(RequestKey::ImageCapture)
            .expect("media");
        assert_eq!(photo.bytes, vec![0xFF, 0xD8, 0xFF, 0xE0]);

        let file = invoker
            .request(HostCall::file_chooser("application/pdf"))
            .await
            .expect("file")
            .into_file(RequestKey::FileSelection)
            .expect("selected file");
        assert_eq!(file.file_name, "statement.pdf");
        assert_eq!(file.file_type, "application/pdf");
        assert_eq!(file.data.bytes, b"%PDF-");

        let seen = seen.lock().expect("lock");
        assert!(matches!(
            seen.as_slice(),
            [
                HostEvent::AudioRecorded(_),
                HostEvent::ImageCaptured(_),
                HostEvent::FileSelected(_)
            ]
        ));
        assert!(dispatcher.registry().is_empty());
    }

    #[tokio::test]
    async fn unreadable_media_fails_the_request() {
        let host = Arc::new(ScriptedHost::all());
        let dispatcher = dispatcher();
        let invoker = BridgeInvoker::new(host.clone(), dispatcher.registry().clone(), BridgeConfig::default());
        let (_installation, seen) = capture(&dispatcher, CallbackFamily::Media);
        let d = dispatcher.clone();
        host.respond_with(move |_| {
            d.on_gallery_image_selected("content://media/42");
        });

        let result = invoker.request(HostCall::new(Capability::OpenGallery)).await;
        assert!(matches!(result, Err(FinaudyError::MalformedMedia(_))));
        assert!(seen.lock().expect("lock").is_empty());
    }

    #[test]
    fn unsolicited_media_reaches_listener_only() {
        let dispatcher = dispatcher();
        let (_installation, seen) = capture(&dispatcher, CallbackFamily::Media);
        assert!(!dispatcher.on_gallery_image_selected("data:image/png;base64,iVBORw=="));
        assert!(!dispatcher.on_audio_recording_complete(""));
        assert_eq!(seen.lock().expect("lock").len(), 1);
        assert!(dispatcher.registry().is_empty());
    }
}
