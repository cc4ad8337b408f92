// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Core domain types for the Finaudy native bridge.

use serde::{Deserialize, Serialize};

use crate::error::{FinaudyError, Result};
use crate::media::{MediaData, SelectedFile};

/// Runtime permissions the host can be asked for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PermissionName {
    Camera,
    Microphone,
    Notifications,
}

impl PermissionName {
    pub const ALL: [PermissionName; 3] = [Self::Camera, Self::Microphone, Self::Notifications];

    /// Name used on the wire by the host (`onPermissionResult('microphone', ..)`).
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Camera => "camera",
            Self::Microphone => "microphone",
            Self::Notifications => "notifications",
        }
    }

    /// Parse a host-supplied permission name. Android manifest names are
    /// accepted as well as the short names.
    pub fn from_host(name: &str) -> Option<Self> {
        match name.trim() {
            "camera" | "android.permission.CAMERA" => Some(Self::Camera),
            "microphone" | "android.permission.RECORD_AUDIO" => Some(Self::Microphone),
            "notifications" | "android.permission.POST_NOTIFICATIONS" => {
                Some(Self::Notifications)
            }
            _ => None,
        }
    }

    /// Host capability that asks for this permission.
    pub fn capability(&self) -> Capability {
        match self {
            Self::Camera => Capability::RequestCameraPermission,
            Self::Microphone => Capability::RequestMicrophonePermission,
            Self::Notifications => Capability::RequestNotificationPermission,
        }
    }
}

impl std::fmt::Display for PermissionName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Last known state of a permission.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PermissionState {
    /// Never asked, or the user dismissed the dialog.
    #[default]
    Prompt,
    Granted,
    Denied,
}

impl From<bool> for PermissionState {
    fn from(granted: bool) -> Self {
        if granted { Self::Granted } else { Self::Denied }
    }
}

/// Named functions the host may expose on its bridge object.
///
/// Every capability is optional; callers must presence-check before use.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Capability {
    RequestCameraPermission,
    RequestMicrophonePermission,
    RequestNotificationPermission,
    SignInWithGoogle,
    GetFcmToken,
    LaunchPurchaseFlow,
    ShowToast,
    StartAudioRecording,
    StopAudioRecording,
    OpenCamera,
    OpenGallery,
    OpenFileChooser,
}

impl Capability {
    pub const ALL: [Capability; 12] = [
        Self::RequestCameraPermission,
        Self::RequestMicrophonePermission,
        Self::RequestNotificationPermission,
        Self::SignInWithGoogle,
        Self::GetFcmToken,
        Self::LaunchPurchaseFlow,
        Self::ShowToast,
        Self::StartAudioRecording,
        Self::StopAudioRecording,
        Self::OpenCamera,
        Self::OpenGallery,
        Self::OpenFileChooser,
    ];

    /// Method name on the host bridge object.
    pub fn host_name(&self) -> &'static str {
        match self {
            Self::RequestCameraPermission => "requestCameraPermission",
            Self::RequestMicrophonePermission => "requestMicrophonePermission",
            Self::RequestNotificationPermission => "requestNotificationPermission",
            Self::SignInWithGoogle => "signInWithGoogle",
            Self::GetFcmToken => "getFCMToken",
            Self::LaunchPurchaseFlow => "launchPurchaseFlow",
            Self::ShowToast => "showToast",
            Self::StartAudioRecording => "startAudioRecording",
            Self::StopAudioRecording => "stopAudioRecording",
            Self::OpenCamera => "openCamera",
            Self::OpenGallery => "openGallery",
            Self::OpenFileChooser => "openFileChooser",
        }
    }

    /// Number of string arguments the host method takes.
    pub fn arity(&self) -> usize {
        match self {
            Self::LaunchPurchaseFlow | Self::ShowToast | Self::OpenFileChooser => 1,
            _ => 0,
        }
    }

    /// The pending-request slot a call to this capability occupies, or
    /// `None` when the host never answers it.
    ///
    /// Starting a recording has no answer of its own: the audio arrives
    /// once `stopAudioRecording` is called.
    pub fn request_key(&self) -> Option<RequestKey> {
        let key = match self {
            Self::RequestCameraPermission => RequestKey::Permission(PermissionName::Camera),
            Self::RequestMicrophonePermission => {
                RequestKey::Permission(PermissionName::Microphone)
            }
            Self::RequestNotificationPermission => {
                RequestKey::Permission(PermissionName::Notifications)
            }
            Self::SignInWithGoogle => RequestKey::GoogleSignIn,
            Self::GetFcmToken => RequestKey::FcmToken,
            Self::LaunchPurchaseFlow => RequestKey::Purchase,
            Self::StopAudioRecording => RequestKey::AudioRecording,
            Self::OpenCamera => RequestKey::ImageCapture,
            Self::OpenGallery => RequestKey::GallerySelection,
            Self::OpenFileChooser => RequestKey::FileSelection,
            Self::ShowToast | Self::StartAudioRecording => return None,
        };
        Some(key)
    }
}

impl std::fmt::Display for Capability {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.host_name())
    }
}

/// Key under which a request waits for its host callback.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RequestKey {
    Permission(PermissionName),
    FcmToken,
    /// Singleton: only one sign-in can be in flight.
    GoogleSignIn,
    /// Singleton: only one purchase flow can be in flight.
    Purchase,
    /// Audio from the recording being stopped.
    AudioRecording,
    ImageCapture,
    GallerySelection,
    FileSelection,
}

impl RequestKey {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Permission(name) => name.as_str(),
            Self::FcmToken => "fcm-token",
            Self::GoogleSignIn => "google-sign-in",
            Self::Purchase => "purchase",
            Self::AudioRecording => "audio-recording",
            Self::ImageCapture => "image-capture",
            Self::GallerySelection => "gallery-selection",
            Self::FileSelection => "file-selection",
        }
    }
}

impl std::fmt::Display for RequestKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A fire-and-forget call into the host.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HostCall {
    pub capability: Capability,
    pub args: Vec<String>,
}

impl HostCall {
    pub fn new(capability: Capability) -> Self {
        Self {
            capability,
            args: Vec::new(),
        }
    }

    pub fn arg(mut self, value: impl Into<String>) -> Self {
        self.args.push(value.into());
        self
    }

    pub fn permission(name: PermissionName) -> Self {
        Self::new(name.capability())
    }

    pub fn purchase(product_id: impl Into<String>) -> Self {
        Self::new(Capability::LaunchPurchaseFlow).arg(product_id)
    }

    pub fn toast(message: impl Into<String>) -> Self {
        Self::new(Capability::ShowToast).arg(message)
    }

    /// Open the system file chooser for `accept_type` (a MIME pattern such
    /// as `application/pdf` or `image/*`).
    pub fn file_chooser(accept_type: impl Into<String>) -> Self {
        Self::new(Capability::OpenFileChooser).arg(accept_type)
    }

    pub fn request_key(&self) -> Option<RequestKey> {
        self.capability.request_key()
    }
}

/// Tokens handed back by a successful native Google Sign-In.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GoogleCredential {
    pub id_token: String,
    pub access_token: Option<String>,
}

/// A completed store purchase, still to be verified by the backend.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PurchaseReceipt {
    pub purchase_token: String,
    pub product_id: String,
}

/// Value a host callback settles a request with.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BridgeOutcome {
    Permission { name: PermissionName, granted: bool },
    Token(String),
    SignIn(GoogleCredential),
    Purchase(PurchaseReceipt),
    /// Recorded audio, camera photo, or gallery image.
    Media(MediaData),
    File(SelectedFile),
}

impl BridgeOutcome {
    pub fn into_granted(self, key: RequestKey) -> Result<bool> {
        match self {
            Self::Permission { granted, .. } => Ok(granted),
            _ => Err(FinaudyError::UnexpectedOutcome(key)),
        }
    }

    pub fn into_token(self, key: RequestKey) -> Result<String> {
        match self {
            Self::Token(token) => Ok(token),
            _ => Err(FinaudyError::UnexpectedOutcome(key)),
        }
    }

    pub fn into_credential(self, key: RequestKey) -> Result<GoogleCredential> {
        match self {
            Self::SignIn(credential) => Ok(credential),
            _ => Err(FinaudyError::UnexpectedOutcome(key)),
        }
    }

    pub fn into_receipt(self, key: RequestKey) -> Result<PurchaseReceipt> {
        match self {
            Self::Purchase(receipt) => Ok(receipt),
            _ => Err(FinaudyError::UnexpectedOutcome(key)),
        }
    }

    pub fn into_media(self, key: RequestKey) -> Result<MediaData> {
        match self {
            Self::Media(media) => Ok(media),
            _ => Err(FinaudyError::UnexpectedOutcome(key)),
        }
    }

    pub fn into_file(self, key: RequestKey) -> Result<SelectedFile> {
        match self {
            Self::File(file) => Ok(file),
            _ => Err(FinaudyError::UnexpectedOutcome(key)),
        }
    }
}

/// Subscription plans sold through the store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Plan {
    Premium,
    Vip,
}

impl Plan {
    /// Product identifier configured in the Play Console.
    pub fn product_id(&self) -> &'static str {
        match self {
            Self::Premium => "premium_monthly",
            Self::Vip => "vip_monthly",
        }
    }

    pub fn from_product_id(product_id: &str) -> Option<Self> {
        match product_id {
            "premium_monthly" => Some(Self::Premium),
            "vip_monthly" => Some(Self::Vip),
            _ => None,
        }
    }
}
