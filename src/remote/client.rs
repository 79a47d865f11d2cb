//! HTTP client for the studio server.
//!
//! Thin wrapper over reqwest: multipart upload, listing, raw fetch and
//! delete. Transport failures are classified into the same user-facing
//! kinds everywhere before they reach a status line.

use std::sync::OnceLock;
use std::time::Duration;

use regex::Regex;
use serde::Deserialize;
use tracing::{debug, warn};

use crate::error::RemoteError;
use crate::session::UploadPayload;

const STATUS_DETAIL_LIMIT: usize = 200;

/// Names the server could own: one path segment, a WAV extension, no
/// separators or parent references.
fn filename_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"^[A-Za-z0-9][A-Za-z0-9._-]*\.wav$").expect("filename pattern is literal")
    })
}

/// True when `filename` is shaped like a recording the server could own.
pub fn is_valid_filename(filename: &str) -> bool {
    filename_pattern().is_match(filename) && !filename.contains("..")
}

/// One row of the server's recordings listing, newest first.
#[derive(Debug, Clone, Deserialize)]
pub struct RecordingInfo {
    pub filename: String,
    pub size_mb: f64,
    /// Seconds, when the server could probe the file.
    pub duration: Option<f64>,
    pub format: Option<String>,
    pub created: String,
    pub modified: String,
}

impl RecordingInfo {
    /// Created timestamp shortened for list rows. Falls back to the raw
    /// server string when it does not parse.
    pub fn created_display(&self) -> String {
        chrono::NaiveDateTime::parse_from_str(&self.created, "%Y-%m-%d %H:%M:%S")
            .map(|stamp| stamp.format("%b %d %H:%M").to_string())
            .unwrap_or_else(|_| self.created.clone())
    }

    pub fn duration_display(&self) -> String {
        match self.duration {
            Some(seconds) => {
                let whole = seconds.round() as u64;
                format!("{}:{:02}", whole / 60, whole % 60)
            }
            None => "-:--".to_string(),
        }
    }
}

/// Upload acknowledgement from the server.
#[derive(Debug, Clone, Deserialize)]
pub struct UploadReceipt {
    #[serde(default)]
    pub success: bool,
    /// Name the server stored the recording under.
    pub filename: Option<String>,
    #[serde(default)]
    pub warning: Option<String>,
}

#[derive(Clone)]
pub struct StudioClient {
    http: reqwest::Client,
    base_url: String,
}

impl StudioClient {
    /// # Errors
    ///
    /// Fails only when the underlying HTTP client cannot be built.
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self, RemoteError> {
        let http = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Uploads a finished recording with its capture parameters.
    ///
    /// # Errors
    ///
    /// Connection, timeout and HTTP status failures, plus a decode error
    /// when the acknowledgement is not the expected JSON.
    pub async fn upload(&self, payload: &UploadPayload) -> Result<UploadReceipt, RemoteError> {
        let part = reqwest::multipart::Part::bytes(payload.bytes.clone())
            .file_name("recording.wav")
            .mime_str("audio/wav")?;
        let form = reqwest::multipart::Form::new()
            .part("audio_data", part)
            .text("quality", payload.tier.to_string())
            .text("sample_rate", payload.sample_rate.to_string())
            .text("channels", payload.channels.to_string());

        let url = format!("{}/upload", self.base_url);
        debug!(
            "POST {} ({} bytes, {} at {} Hz, {} ch)",
            url,
            payload.bytes.len(),
            payload.tier,
            payload.sample_rate,
            payload.channels
        );

        let response = self
            .http
            .post(&url)
            .multipart(form)
            .send()
            .await
            .map_err(|e| self.classify(e))?;
        let response = self.check_status(response).await?;
        let receipt: UploadReceipt = response
            .json()
            .await
            .map_err(|e| RemoteError::Decode(e.to_string()))?;
        if let Some(warning) = &receipt.warning {
            warn!("Server stored the upload with a warning: {}", warning);
        }
        Ok(receipt)
    }

    /// Fetches the recordings listing.
    pub async fn list(&self) -> Result<Vec<RecordingInfo>, RemoteError> {
        let url = format!("{}/recordings", self.base_url);
        debug!("GET {}", url);
        let response = self
            .http
            .get(&url)
            .send()
            .await
            .map_err(|e| self.classify(e))?;
        let response = self.check_status(response).await?;
        response
            .json()
            .await
            .map_err(|e| RemoteError::Decode(e.to_string()))
    }

    /// Downloads one recording's bytes for playback.
    pub async fn fetch(&self, filename: &str) -> Result<Vec<u8>, RemoteError> {
        self.validated(filename)?;
        let url = format!("{}/recordings/{}", self.base_url, urlencoding::encode(filename));
        debug!("GET {}", url);
        let response = self
            .http
            .get(&url)
            .send()
            .await
            .map_err(|e| self.classify(e))?;
        let response = self.check_status(response).await?;
        let bytes = response
            .bytes()
            .await
            .map_err(|e| RemoteError::Decode(e.to_string()))?;
        Ok(bytes.to_vec())
    }

    /// Deletes one recording on the server.
    pub async fn delete(&self, filename: &str) -> Result<(), RemoteError> {
        self.validated(filename)?;
        let url = format!("{}/delete/{}", self.base_url, urlencoding::encode(filename));
        debug!("DELETE {}", url);
        let response = self
            .http
            .delete(&url)
            .send()
            .await
            .map_err(|e| self.classify(e))?;
        self.check_status(response).await?;
        Ok(())
    }

    fn validated(&self, filename: &str) -> Result<(), RemoteError> {
        if is_valid_filename(filename) {
            Ok(())
        } else {
            Err(RemoteError::InvalidName {
                filename: filename.to_string(),
            })
        }
    }

    /// Sorts transport failures into the user-facing kinds.
    fn classify(&self, err: reqwest::Error) -> RemoteError {
        if err.is_connect() {
            RemoteError::Connect {
                url: self.base_url.clone(),
            }
        } else if err.is_timeout() {
            RemoteError::Timeout
        } else {
            RemoteError::Transport(err)
        }
    }

    async fn check_status(
        &self,
        response: reqwest::Response,
    ) -> Result<reqwest::Response, RemoteError> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let detail = response
            .text()
            .await
            .unwrap_or_else(|_| "no detail".to_string());
        Err(RemoteError::Status {
            status: status.as_u16(),
            detail: summarize(&detail),
        })
    }
}

/// Keeps server error bodies short enough for a status line.
fn summarize(body: &str) -> String {
    let trimmed = body.trim();
    if trimmed.len() <= STATUS_DETAIL_LIMIT {
        return trimmed.to_string();
    }
    let mut cut: String = trimmed.chars().take(STATUS_DETAIL_LIMIT).collect();
    cut.push('…');
    cut
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_valid_filenames() {
        for good in [
            "recording_20250826_143000_high.wav",
            "a.wav",
            "Take-2.final.wav",
            "0_take.wav",
        ] {
            assert!(is_valid_filename(good), "{good}");
        }
    }

    #[test]
    fn test_invalid_filenames() {
        for bad in [
            "",
            ".wav",
            "song.mp3",
            "../secret.wav",
            "a/b.wav",
            "a\\b.wav",
            "spaced name.wav",
            "-leading.wav",
            "trick..wav",
        ] {
            assert!(!is_valid_filename(bad), "{bad}");
        }
    }

    #[test]
    fn test_listing_row_parses_server_shape() {
        let json = r#"{
            "filename": "recording_20250826_143000_high.wav",
            "size_mb": 2.41,
            "duration": 12.5,
            "format": "WAV (PCM)",
            "created": "2025-08-26 14:30:00",
            "modified": "2025-08-26 14:30:05"
        }"#;
        let row: RecordingInfo = serde_json::from_str(json).unwrap();
        assert_eq!(row.filename, "recording_20250826_143000_high.wav");
        assert_eq!(row.size_mb, 2.41);
        assert_eq!(row.duration, Some(12.5));
        assert_eq!(row.duration_display(), "0:13");
        assert_eq!(row.created_display(), "Aug 26 14:30");
    }

    #[test]
    fn test_listing_row_tolerates_unprobed_files() {
        let json = r#"{
            "filename": "upload.wav",
            "size_mb": 0.5,
            "duration": null,
            "format": null,
            "created": "not a date",
            "modified": "still not"
        }"#;
        let row: RecordingInfo = serde_json::from_str(json).unwrap();
        assert_eq!(row.duration_display(), "-:--");
        assert_eq!(row.created_display(), "not a date");
    }

    #[test]
    fn test_upload_receipt_parses() {
        let json = r#"{"success": true, "filename": "recording_1.wav", "quality": "high",
                       "sample_rate": 48000, "bit_depth": 24, "channels": 2, "duration": 4.0}"#;
        let receipt: UploadReceipt = serde_json::from_str(json).unwrap();
        assert!(receipt.success);
        assert_eq!(receipt.filename.as_deref(), Some("recording_1.wav"));
        assert!(receipt.warning.is_none());
    }

    #[test]
    fn test_summarize_truncates_long_bodies() {
        let long = "x".repeat(500);
        let short = summarize(&long);
        assert!(short.chars().count() == STATUS_DETAIL_LIMIT + 1);
        assert!(short.ends_with('…'));
        assert_eq!(summarize("  brief  "), "brief");
    }
}
