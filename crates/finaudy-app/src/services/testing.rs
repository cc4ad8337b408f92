// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Fake Android host for service tests.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, OnceLock};

use finaudy_bridge::{CallbackDispatcher, HostSurface};
use finaudy_core::AppConfig;
use finaudy_core::error::Result;
use finaudy_core::types::{Capability, HostCall, RequestKey};
use tempfile::TempDir;

use super::app_services::AppServices;

/// How the fake host answers a capability.
#[derive(Debug, Clone)]
pub(crate) enum Reply {
    Permission(bool),
    Token(String),
    SignIn(String, Option<String>),
    SignInError(String),
    /// Purchase token; empty means the user cancelled.
    Purchase(String),
    /// Bare base64 audio, as `stopAudioRecording` answers.
    Audio(String),
    /// Image `data:` URL for the camera or the gallery.
    Image(String),
    File {
        data_url: String,
        file_name: String,
        file_type: String,
    },
}

/// Host that answers calls synchronously through the dispatcher, the way
/// the Android activity calls back into the WebView.
pub(crate) struct FakeHost {
    capabilities: Vec<Capability>,
    calls: Mutex<Vec<HostCall>>,
    replies: Mutex<HashMap<Capability, Reply>>,
    dispatcher: OnceLock<Arc<CallbackDispatcher>>,
}

impl FakeHost {
    pub(crate) fn new(capabilities: &[Capability]) -> Self {
        Self {
            capabilities: capabilities.to_vec(),
            calls: Mutex::new(Vec::new()),
            replies: Mutex::new(HashMap::new()),
            dispatcher: OnceLock::new(),
        }
    }

    pub(crate) fn all() -> Self {
        Self::new(&Capability::ALL)
    }

    pub(crate) fn reply(&self, capability: Capability, reply: Reply) {
        self.replies.lock().expect("replies").insert(capability, reply);
    }

    pub(crate) fn calls(&self) -> Vec<HostCall> {
        self.calls.lock().expect("calls").clone()
    }

    fn connect(&self, dispatcher: Arc<CallbackDispatcher>) {
        let _ = self.dispatcher.set(dispatcher);
    }
}

impl HostSurface for FakeHost {
    fn platform_name(&self) -> &str {
        "Fake"
    }

    fn has_capability(&self, capability: Capability) -> bool {
        self.capabilities.contains(&capability)
    }

    fn call(&self, call: &HostCall) -> Result<()> {
        self.calls.lock().expect("calls").push(call.clone());
        let reply = self.replies.lock().expect("replies").get(&call.capability).cloned();
        let (Some(dispatcher), Some(reply)) = (self.dispatcher.get(), reply) else {
            return Ok(());
        };
        match reply {
            Reply::Permission(granted) => {
                if let Some(RequestKey::Permission(name)) = call.request_key() {
                    dispatcher.on_permission_result(name.as_str(), granted);
                }
            }
            Reply::Token(token) => {
                dispatcher.on_fcm_token_received(&token);
            }
            Reply::SignIn(id_token, access_token) => {
                dispatcher.on_google_sign_in_success(&id_token, access_token.as_deref());
            }
            Reply::SignInError(message) => {
                dispatcher.on_google_sign_in_error(&message);
            }
            Reply::Purchase(token) => {
                let product_id = call.args.first().cloned().unwrap_or_default();
                dispatcher.on_google_play_purchase_finished(&token, &product_id);
            }
            Reply::Audio(base64_audio) => {
                dispatcher.on_audio_recording_complete(&base64_audio);
            }
            Reply::Image(data_url) => {
                if call.capability == Capability::OpenGallery {
                    dispatcher.on_gallery_image_selected(&data_url);
                } else {
                    dispatcher.on_image_capture_complete(&data_url);
                }
            }
            Reply::File {
                data_url,
                file_name,
                file_type,
            } => {
                dispatcher.on_file_selected(&data_url, &file_name, &file_type);
            }
        }
        Ok(())
    }
}

/// Services wired to `host`, with a throwaway data directory.
pub(crate) fn services_with(host: Arc<FakeHost>, config: AppConfig) -> (AppServices, TempDir) {
    let dir = tempfile::tempdir().expect("tempdir");
    let services = AppServices::with_host(host.clone(), config, dir.path().to_path_buf());
    host.connect(services.dispatcher().clone());
    (services, dir)
}

pub(crate) fn services(host: Arc<FakeHost>) -> (AppServices, TempDir) {
    services_with(host, AppConfig::default())
}
