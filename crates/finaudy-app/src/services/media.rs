// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Device media through the host: voice recordings, camera and gallery
// images, picked files, and toasts.
//
// Recording is two calls. `startAudioRecording` is never answered; the
// audio arrives through `onAudioRecordingComplete` after
// `stopAudioRecording`, so only the stop is awaited.

use std::sync::{Arc, Mutex};

use finaudy_bridge::{CallbackFamily, HostEvent, Installation};
use finaudy_core::error::{FinaudyError, Result};
use finaudy_core::media::{MediaData, SelectedFile};
use finaudy_core::types::{Capability, HostCall, RequestKey};
use tracing::{debug, info};

use super::app_services::AppServices;
use crate::state::{self, AppState};

pub struct MediaService {
    services: AppServices,
    _listener: Installation,
}

/// Clears `recording_audio` however the stop request ends.
struct Recording {
    state: Arc<Mutex<AppState>>,
}

impl Drop for Recording {
    fn drop(&mut self) {
        state::lock(&self.state).recording_audio = false;
    }
}

impl MediaService {
    pub fn install(services: &AppServices) -> Self {
        let shared = services.state_handle();
        let listener = services.dispatcher().install(CallbackFamily::Media, move |event| {
            match event {
                HostEvent::AudioRecorded(audio) => {
                    debug!(len = audio.len(), "recording delivered");
                    state::lock(&shared).recording_audio = false;
                }
                HostEvent::ImageCaptured(image) | HostEvent::GalleryImageSelected(image) => {
                    debug!(mime_type = %image.mime_type, len = image.len(), "image delivered");
                }
                HostEvent::FileSelected(file) => {
                    debug!(file_name = %file.file_name, len = file.data.len(), "file delivered");
                }
                _ => {}
            }
        });
        Self {
            services: services.clone(),
            _listener: listener,
        }
    }

    pub fn is_available(&self, capability: Capability) -> bool {
        self.services.invoker().supports(capability)
    }

    pub fn is_recording(&self) -> bool {
        self.services.state().recording_audio
    }

    /// Show a short native toast. Nothing comes back.
    pub fn show_toast(&self, message: &str) -> Result<()> {
        self.services.invoker().send(&HostCall::toast(message))
    }

    /// Start the host's recorder. The host needs the microphone permission
    /// first; it silently ignores the call otherwise.
    pub fn start_recording(&self) -> Result<()> {
        if self.is_recording() {
            return Err(FinaudyError::DuplicateRequest(RequestKey::AudioRecording));
        }
        self.services
            .invoker()
            .send(&HostCall::new(Capability::StartAudioRecording))?;
        state::lock(&self.services.state_handle()).recording_audio = true;
        info!("audio recording started");
        Ok(())
    }

    /// Stop the recorder and wait for the audio.
    pub async fn stop_recording(&self) -> Result<MediaData> {
        let _recording = Recording {
            state: self.services.state_handle(),
        };
        let audio = self
            .services
            .invoker()
            .request(HostCall::new(Capability::StopAudioRecording))
            .await?
            .into_media(RequestKey::AudioRecording)?;
        info!(len = audio.len(), "audio recording finished");
        Ok(audio)
    }

    /// Open the camera and wait for the photo.
    pub async fn capture_photo(&self) -> Result<MediaData> {
        self.services
            .invoker()
            .request(HostCall::new(Capability::OpenCamera))
            .await?
            .into_media(RequestKey::ImageCapture)
    }

    /// Open the gallery and wait for the chosen image.
    pub async fn pick_gallery_image(&self) -> Result<MediaData> {
        self.services
            .invoker()
            .request(HostCall::new(Capability::OpenGallery))
            .await?
            .into_media(RequestKey::GallerySelection)
    }

    /// Open the system file chooser filtered to `accept_type` (a MIME
    /// pattern such as `application/pdf` or `image/*`).
    pub async fn choose_file(&self, accept_type: &str) -> Result<SelectedFile> {
        let file = self
            .services
            .invoker()
            .request(HostCall::file_chooser(accept_type))
            .await?
            .into_file(RequestKey::FileSelection)?;
        info!(file_name = %file.file_name, file_type = %file.file_type, "file chosen");
        Ok(file)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::testing::{self, FakeHost, Reply};
    use finaudy_core::media::RECORDING_MIME_TYPE;

    #[tokio::test]
    async fn recording_round_trip() {
        let host = Arc::new(FakeHost::all());
        host.reply(Capability::StopAudioRecording, Reply::Audio("IyFBTVIK".into()));
        let (services, _dir) = testing::services(host.clone());
        let media = MediaService::install(&services);

        media.start_recording().expect("start");
        assert!(media.is_recording());
        assert!(matches!(
            media.start_recording(),
            Err(FinaudyError::DuplicateRequest(RequestKey::AudioRecording))
        ));

        let audio = media.stop_recording().await.expect("audio");
        assert_eq!(audio.mime_type, RECORDING_MIME_TYPE);
        assert_eq!(audio.bytes, b"#!AMR\n");
        assert!(!media.is_recording());

        let names: Vec<_> = host.calls().iter().map(|c| c.capability).collect();
        assert_eq!(names, vec![Capability::StartAudioRecording, Capability::StopAudioRecording]);
    }

    #[tokio::test]
    async fn failed_stop_still_clears_recording_flag() {
        let host = Arc::new(FakeHost::all());
        host.reply(Capability::StopAudioRecording, Reply::Audio(String::new()));
        let (services, _dir) = testing::services(host);
        let media = MediaService::install(&services);

        media.start_recording().expect("start");
        assert!(matches!(
            media.stop_recording().await,
            Err(FinaudyError::MalformedMedia(_))
        ));
        assert!(!media.is_recording());
        assert!(services.registry().is_empty());
    }

    #[tokio::test]
    async fn camera_and_gallery_images() {
        let host = Arc::new(FakeHost::all());
        host.reply(Capability::OpenCamera, Reply::Image("data:image/jpeg;base64,/9j/4A==".into()));
        host.reply(Capability::OpenGallery, Reply::Image("data:image/png;base64,iVBORw==".into()));
        let (services, _dir) = testing::services(host);
        let media = MediaService::install(&services);

        let photo = media.capture_photo().await.expect("photo");
        assert_eq!(photo.mime_type, "image/jpeg");
        assert_eq!(photo.bytes, vec![0xFF, 0xD8, 0xFF, 0xE0]);

        let picked = media.pick_gallery_image().await.expect("gallery");
        assert_eq!(picked.mime_type, "image/png");
        assert_eq!(picked.bytes, b"\x89PNG");
    }

    #[tokio::test]
    async fn file_chooser_passes_accept_type() {
        let host = Arc::new(FakeHost::all());
        host.reply(
            Capability::OpenFileChooser,
            Reply::File {
                data_url: "data:application/pdf;base64,JVBERg==".into(),
                file_name: "statement.pdf".into(),
                file_type: String::new(),
            },
        );
        let (services, _dir) = testing::services(host.clone());
        let media = MediaService::install(&services);

        let file = media.choose_file("application/pdf").await.expect("file");
        assert_eq!(file.file_name, "statement.pdf");
        assert_eq!(file.file_type, "application/pdf");
        assert_eq!(file.data.bytes, b"%PDF");
        assert_eq!(host.calls()[0].args, vec!["application/pdf".to_string()]);
    }

    #[test]
    fn toast_is_sent_without_waiting() {
        let host = Arc::new(FakeHost::all());
        let (services, _dir) = testing::services(host.clone());
        let media = MediaService::install(&services);

        media.show_toast("Saved").expect("toast");
        let calls = host.calls();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].capability, Capability::ShowToast);
        assert_eq!(calls[0].args, vec!["Saved".to_string()]);
        assert!(services.registry().is_empty());
    }

    #[tokio::test]
    async fn unavailable_without_capability() {
        let (services, _dir) = testing::services(Arc::new(FakeHost::new(&[])));
        let media = MediaService::install(&services);

        assert!(!media.is_available(Capability::OpenCamera));
        assert!(matches!(
            media.start_recording(),
            Err(FinaudyError::CapabilityUnavailable(Capability::StartAudioRecording))
        ));
        assert!(!media.is_recording());
        assert!(matches!(
            media.capture_photo().await,
            Err(FinaudyError::CapabilityUnavailable(Capability::OpenCamera))
        ));
    }
}
