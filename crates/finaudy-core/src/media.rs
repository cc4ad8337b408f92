// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Media handed back by the host: recorded audio, camera and gallery images,
// and files picked through the system chooser.
//
// The host sends audio as bare base64 and everything else as `data:` URLs.
// Both are decoded here so callers get bytes plus a MIME type.

use base64::{Engine, engine::general_purpose::STANDARD};

use crate::error::{FinaudyError, Result};

/// Container the host's `MediaRecorder` writes (3GPP, AMR-NB).
pub const RECORDING_MIME_TYPE: &str = "audio/3gpp";

/// Decoded media payload.
#[derive(Clone, PartialEq, Eq)]
pub struct MediaData {
    pub mime_type: String,
    pub bytes: Vec<u8>,
}

impl MediaData {
    /// Decode bare base64 content of a known type.
    pub fn from_base64(mime_type: impl Into<String>, encoded: &str) -> Result<Self> {
        let encoded = encoded.trim();
        if encoded.is_empty() {
            return Err(FinaudyError::MalformedMedia("empty content".into()));
        }
        let bytes = STANDARD
            .decode(encoded)
            .map_err(|e| FinaudyError::MalformedMedia(format!("invalid base64: {e}")))?;
        Ok(Self {
            mime_type: mime_type.into(),
            bytes,
        })
    }

    /// Decode a `data:<mime>;base64,<content>` URL.
    pub fn from_data_url(url: &str) -> Result<Self> {
        let rest = url
            .trim()
            .strip_prefix("data:")
            .ok_or_else(|| FinaudyError::MalformedMedia("not a data URL".into()))?;
        let (header, content) = rest
            .split_once(',')
            .ok_or_else(|| FinaudyError::MalformedMedia("data URL has no content".into()))?;
        let mime_type = header.strip_suffix(";base64").ok_or_else(|| {
            FinaudyError::MalformedMedia("only base64 data URLs are supported".into())
        })?;
        let mime_type = if mime_type.is_empty() {
            "application/octet-stream"
        } else {
            mime_type
        };
        Self::from_base64(mime_type, content)
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    /// Re-encode as a `data:` URL, e.g. for an `<img src>`.
    pub fn to_data_url(&self) -> String {
        format!("data:{};base64,{}", self.mime_type, STANDARD.encode(&self.bytes))
    }
}

// Media can be megabytes; never dump the bytes into logs.
impl std::fmt::Debug for MediaData {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MediaData")
            .field("mime_type", &self.mime_type)
            .field("len", &self.bytes.len())
            .finish()
    }
}

/// A file picked through the host's file chooser.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SelectedFile {
    pub file_name: String,
    /// MIME type reported by the host's content resolver.
    pub file_type: String,
    pub data: MediaData,
}
