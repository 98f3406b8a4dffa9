use chrono::Utc;
use reqwest::{
    multipart::{Form, Part},
    Client as HttpClient,
};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::{
    config::MediaSettings,
    error::{AppError, AppResult},
};

const CLOUDINARY_API_URL: &str = "https://api.cloudinary.com/v1_1";

/// Video file received from a client
#[derive(Debug, Clone)]
pub struct VideoUpload {
    pub file_name: String,
    pub content_type: Option<String>,
    pub bytes: Vec<u8>,
}

/// What the media host reports for a stored video
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UploadedVideo {
    pub secure_url: String,
    pub public_id: String,
    /// Length in seconds
    #[serde(default)]
    pub duration: Option<f64>,
    #[serde(default)]
    pub format: Option<String>,
    #[serde(default)]
    pub width: Option<u32>,
    #[serde(default)]
    pub height: Option<u32>,
}

impl UploadedVideo {
    /// Whole seconds, defaulting to a minute when the host reports nothing
    pub fn duration_seconds(&self) -> i32 {
        self.duration.map_or(60, |secs| secs.round() as i32)
    }
}

pub enum MediaBackend {
    Disabled,
    Cloudinary(CloudinaryClient),
}

/// Video hosting, built once from [`MediaSettings`]
pub struct MediaService {
    backend: MediaBackend,
}

impl MediaService {
    pub fn new(settings: Option<MediaSettings>) -> Self {
        let backend = match settings {
            Some(settings) => {
                tracing::info!(cloud = %settings.cloud_name, "Video uploads enabled");
                MediaBackend::Cloudinary(CloudinaryClient::new(settings))
            }
            None => {
                tracing::info!("Video uploads disabled, media host not configured");
                MediaBackend::Disabled
            }
        };

        Self { backend }
    }

    pub fn disabled() -> Self {
        Self {
            backend: MediaBackend::Disabled,
        }
    }

    pub fn is_enabled(&self) -> bool {
        matches!(self.backend, MediaBackend::Cloudinary(_))
    }

    pub async fn upload_video(&self, upload: VideoUpload) -> AppResult<UploadedVideo> {
        let client = match &self.backend {
            MediaBackend::Disabled => {
                return Err(AppError::NotConfigured(
                    "Video uploads are not configured on this server".to_string(),
                ))
            }
            MediaBackend::Cloudinary(client) => client,
        };

        let content_type = upload.content_type.as_deref().unwrap_or_default();
        if !content_type.starts_with("video/") {
            return Err(AppError::InvalidInput(format!(
                "Invalid file type. Expected video/*, got {}",
                if content_type.is_empty() { "nothing" } else { content_type }
            )));
        }

        client.upload(upload).await
    }

    /// Best effort; reports whether the host confirmed the deletion
    pub async fn delete_video(&self, public_id: &str) -> bool {
        let MediaBackend::Cloudinary(client) = &self.backend else {
            return false;
        };

        match client.destroy(public_id).await {
            Ok(deleted) => deleted,
            Err(e) => {
                tracing::error!(error = %e, public_id, "Failed to delete hosted video");
                false
            }
        }
    }
}

/// Signed Cloudinary upload API client
pub struct CloudinaryClient {
    http_client: HttpClient,
    settings: MediaSettings,
}

#[derive(Deserialize)]
struct DestroyResponse {
    result: String,
}

impl CloudinaryClient {
    fn new(settings: MediaSettings) -> Self {
        Self {
            http_client: HttpClient::new(),
            settings,
        }
    }

    fn endpoint(&self, action: &str) -> String {
        format!(
            "{}/{}/video/{}",
            CLOUDINARY_API_URL, self.settings.cloud_name, action
        )
    }

    /// Adds the credential and signature fields to a set of signed parameters
    fn signed_form(&self, params: Vec<(&'static str, String)>) -> Form {
        let signature = sign(&params, &self.settings.api_secret);
        params
            .into_iter()
            .fold(Form::new(), |form, (name, value)| form.text(name, value))
            .text("api_key", self.settings.api_key.clone())
            .text("signature", signature)
    }

    async fn upload(&self, upload: VideoUpload) -> AppResult<UploadedVideo> {
        let timestamp = Utc::now().timestamp().to_string();
        let size = upload.bytes.len();

        let mut file = Part::bytes(upload.bytes).file_name(upload.file_name);
        if let Some(content_type) = upload.content_type.as_deref() {
            file = file.mime_str(content_type)?;
        }

        let form = self
            .signed_form(vec![
                ("folder", self.settings.folder.clone()),
                ("overwrite", "true".to_string()),
                ("timestamp", timestamp),
            ])
            .part("file", file);

        tracing::debug!(bytes = size, "Uploading video to media host");
        let response = self
            .http_client
            .post(self.endpoint("upload"))
            .multipart(form)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(AppError::ExternalApi(format!(
                "Failed to upload video: media host returned status {}: {}",
                status, body
            )));
        }

        let uploaded: UploadedVideo = response.json().await?;
        tracing::info!(public_id = %uploaded.public_id, "Video uploaded");
        Ok(uploaded)
    }

    async fn destroy(&self, public_id: &str) -> AppResult<bool> {
        let form = self.signed_form(vec![
            ("public_id", public_id.to_string()),
            ("timestamp", Utc::now().timestamp().to_string()),
        ]);

        let response = self
            .http_client
            .post(self.endpoint("destroy"))
            .multipart(form)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(AppError::ExternalApi(format!(
                "Media host returned status {} on delete",
                response.status()
            )));
        }

        let outcome: DestroyResponse = response.json().await?;
        Ok(outcome.result == "ok")
    }
}

/// SHA-256 request signature: parameters sorted by name, joined as
/// `name=value&...`, followed by the API secret, hex encoded
pub fn sign(params: &[(&str, String)], api_secret: &str) -> String {
    let mut sorted: Vec<&(&str, String)> = params.iter().collect();
    sorted.sort_by(|a, b| a.0.cmp(b.0));

    let joined = sorted
        .iter()
        .map(|(name, value)| format!("{}={}", name, value))
        .collect::<Vec<_>>()
        .join("&");

    let mut hasher = Sha256::new();
    hasher.update(joined.as_bytes());
    hasher.update(api_secret.as_bytes());
    format!("{:x}", hasher.finalize())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn settings() -> MediaSettings {
        MediaSettings {
            cloud_name: "demo".to_string(),
            api_key: "key".to_string(),
            api_secret: "abcd".to_string(),
            folder: "edubit/reels".to_string(),
        }
    }

    fn upload(content_type: Option<&str>) -> VideoUpload {
        VideoUpload {
            file_name: "lesson.mp4".to_string(),
            content_type: content_type.map(str::to_string),
            bytes: vec![0, 1, 2],
        }
    }

    #[test]
    fn test_sign_sorts_parameters() {
        let params = vec![
            ("timestamp", "1700000000".to_string()),
            ("folder", "edubit/reels".to_string()),
            ("overwrite", "true".to_string()),
        ];
        assert_eq!(
            sign(&params, "abcd"),
            "dd6d1d5d9cb003fceecca63cb17ae0d9cc7959fc28749ebdeebbb94f68fd59fc"
        );
    }

    #[test]
    fn test_sign_destroy_parameters() {
        let params = vec![
            ("public_id", "edubit/reels/x1".to_string()),
            ("timestamp", "1700000000".to_string()),
        ];
        assert_eq!(
            sign(&params, "abcd"),
            "27185a27e8f9805101867e4f1d636c1e02fde1bf7a36504c8d6915c5c8e04519"
        );
    }

    #[test]
    fn test_duration_defaults_to_a_minute() {
        let mut video = UploadedVideo {
            secure_url: "https://cdn.example/v.mp4".to_string(),
            public_id: "edubit/reels/v".to_string(),
            duration: None,
            format: Some("mp4".to_string()),
            width: None,
            height: None,
        };
        assert_eq!(video.duration_seconds(), 60);

        video.duration = Some(42.6);
        assert_eq!(video.duration_seconds(), 43);
    }

    #[tokio::test]
    async fn test_disabled_upload_is_not_configured() {
        let media = MediaService::disabled();
        assert!(!media.is_enabled());

        let err = media.upload_video(upload(Some("video/mp4"))).await.unwrap_err();
        assert!(matches!(err, AppError::NotConfigured(_)));
        assert!(!media.delete_video("anything").await);
    }

    #[tokio::test]
    async fn test_non_video_rejected_before_upload() {
        let media = MediaService::new(Some(settings()));
        assert!(media.is_enabled());

        let err = media.upload_video(upload(Some("image/png"))).await.unwrap_err();
        assert!(matches!(err, AppError::InvalidInput(_)));

        let err = media.upload_video(upload(None)).await.unwrap_err();
        assert!(matches!(err, AppError::InvalidInput(_)));
    }
}
