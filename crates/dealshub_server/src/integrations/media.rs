//! Media hosting for deal, vendor and group deal uploads.
//!
//! # Invariants
//! - Videos always land in `deal_videos`; images keep the caller's folder
//!   and get a 1080px width transformation.
//! - `upload_with_fallback` uploads sequentially and keeps input order.

use std::time::{Duration, SystemTime, UNIX_EPOCH};

use async_trait::async_trait;
use base64::{Engine, engine::general_purpose::STANDARD};
use log::{info, warn};
use reqwest::{
    Client,
    multipart::{Form, Part},
};
use serde::Deserialize;
use sha2::{Digest, Sha256};
use tokio::time::timeout;

use super::{IntegrationError, IntegrationResult, ensure_success, http_client};
use crate::config::CloudinaryConfig;

pub const VIDEO_FOLDER: &str = "deal_videos";
const IMAGE_TRANSFORMATION: &str = "w_1080,q_auto";
const CLOUDINARY_TIMEOUT: Duration = Duration::from_secs(120);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MediaKind {
    Image,
    Video,
}

impl MediaKind {
    pub fn from_content_type(content_type: &str) -> Self {
        if content_type.trim().to_ascii_lowercase().starts_with("video/") {
            Self::Video
        } else {
            Self::Image
        }
    }

    fn resource_type(self) -> &'static str {
        match self {
            Self::Image => "image",
            Self::Video => "video",
        }
    }
}

/// One file received from a multipart form.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MediaUpload {
    pub file_name: String,
    pub content_type: String,
    pub bytes: Vec<u8>,
    /// Destination folder for images.
    pub folder: String,
}

impl MediaUpload {
    pub fn kind(&self) -> MediaKind {
        MediaKind::from_content_type(&self.content_type)
    }

    /// Folder after applying the video override.
    pub fn target_folder(&self) -> &str {
        match self.kind() {
            MediaKind::Video => VIDEO_FOLDER,
            MediaKind::Image => &self.folder,
        }
    }

    pub fn data_uri(&self) -> String {
        format!(
            "data:{};base64,{}",
            self.content_type,
            STANDARD.encode(&self.bytes)
        )
    }
}

#[async_trait]
pub trait MediaHost: Send + Sync {
    /// Streams the raw bytes as a multipart file.
    async fn upload(&self, upload: &MediaUpload) -> IntegrationResult<String>;

    /// Sends the file inline as a base64 data URI.
    async fn upload_data_uri(&self, upload: &MediaUpload) -> IntegrationResult<String>;
}

/// Uploads files one by one, retrying each failed or timed out upload once
/// through the data-URI path.
pub async fn upload_with_fallback(
    host: &dyn MediaHost,
    uploads: &[MediaUpload],
    per_file_timeout: Duration,
) -> IntegrationResult<Vec<String>> {
    let mut urls = Vec::with_capacity(uploads.len());
    for (index, upload) in uploads.iter().enumerate() {
        info!(
            "event=media_upload module=media status=start index={} total={} bytes={}",
            index + 1,
            uploads.len(),
            upload.bytes.len()
        );
        let primary = match timeout(per_file_timeout, host.upload(upload)).await {
            Ok(result) => result,
            Err(_) => Err(IntegrationError::Timeout(per_file_timeout)),
        };
        let url = match primary {
            Ok(url) => url,
            Err(err) => {
                warn!(
                    "event=media_upload module=media status=warn index={} fallback=data_uri error={err}",
                    index + 1
                );
                host.upload_data_uri(upload).await?
            }
        };
        urls.push(url);
    }
    Ok(urls)
}

pub struct CloudinaryHost {
    client: Client,
    config: CloudinaryConfig,
}

#[derive(Deserialize)]
struct UploadResponse {
    secure_url: Option<String>,
    error: Option<UploadFailure>,
}

#[derive(Deserialize)]
struct UploadFailure {
    message: String,
}

impl CloudinaryHost {
    pub fn new(config: CloudinaryConfig) -> IntegrationResult<Self> {
        Ok(Self {
            client: http_client(CLOUDINARY_TIMEOUT)?,
            config,
        })
    }

    fn endpoint(&self, kind: MediaKind) -> String {
        format!(
            "https://api.cloudinary.com/v1_1/{}/{}/upload",
            self.config.cloud_name,
            kind.resource_type()
        )
    }

    /// Signed form fields shared by both upload paths.
    fn signed_form(&self, upload: &MediaUpload) -> Form {
        let timestamp = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|elapsed| elapsed.as_secs())
            .unwrap_or_default()
            .to_string();
        let transformation = match upload.kind() {
            MediaKind::Image => Some(IMAGE_TRANSFORMATION),
            MediaKind::Video => None,
        };
        let signature = sign_params(
            upload.target_folder(),
            &timestamp,
            transformation,
            &self.config.api_secret,
        );

        let form = Form::new()
            .text("api_key", self.config.api_key.clone())
            .text("timestamp", timestamp)
            .text("folder", upload.target_folder().to_string())
            .text("signature", signature)
            .text("signature_algorithm", "sha256");
        match transformation {
            Some(value) => form.text("transformation", value),
            None => form,
        }
    }

    async fn send(&self, upload: &MediaUpload, form: Form) -> IntegrationResult<String> {
        let response = self
            .client
            .post(self.endpoint(upload.kind()))
            .multipart(form)
            .send()
            .await?;
        let response = ensure_success("cloudinary", response)?;
        let body: UploadResponse = response.json().await?;
        match (body.secure_url, body.error) {
            (Some(url), _) => Ok(url),
            (None, Some(failure)) => Err(IntegrationError::Decode {
                service: "cloudinary",
                message: failure.message,
            }),
            (None, None) => Err(IntegrationError::Decode {
                service: "cloudinary",
                message: "missing secure_url".to_string(),
            }),
        }
    }
}

#[async_trait]
impl MediaHost for CloudinaryHost {
    async fn upload(&self, upload: &MediaUpload) -> IntegrationResult<String> {
        let part = Part::bytes(upload.bytes.clone())
            .file_name(upload.file_name.clone())
            .mime_str(&upload.content_type)?;
        let form = self.signed_form(upload).part("file", part);
        self.send(upload, form).await
    }

    async fn upload_data_uri(&self, upload: &MediaUpload) -> IntegrationResult<String> {
        let form = self.signed_form(upload).text("file", upload.data_uri());
        self.send(upload, form).await
    }
}

/// Signature over the alphabetically sorted signed params plus the secret.
fn sign_params(
    folder: &str,
    timestamp: &str,
    transformation: Option<&str>,
    secret: &str,
) -> String {
    let mut payload = format!("folder={folder}&timestamp={timestamp}");
    if let Some(transformation) = transformation {
        payload.push_str("&transformation=");
        payload.push_str(transformation);
    }
    payload.push_str(secret);
    hex::encode(Sha256::digest(payload.as_bytes()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    fn upload(content_type: &str) -> MediaUpload {
        MediaUpload {
            file_name: "photo.png".into(),
            content_type: content_type.into(),
            bytes: vec![1, 2, 3],
            folder: "deal_images".into(),
        }
    }

    #[test]
    fn videos_are_redirected_to_video_folder() {
        assert_eq!(upload("video/mp4").target_folder(), VIDEO_FOLDER);
        assert_eq!(upload("image/png").target_folder(), "deal_images");
    }

    #[test]
    fn data_uri_embeds_content_type_and_base64() {
        assert_eq!(upload("image/png").data_uri(), "data:image/png;base64,AQID");
    }

    #[test]
    fn signature_changes_with_transformation() {
        let plain = sign_params("deal_images", "100", None, "secret");
        let sized = sign_params("deal_images", "100", Some(IMAGE_TRANSFORMATION), "secret");
        assert_eq!(plain.len(), 64);
        assert_ne!(plain, sized);
    }

    struct FlakyHost {
        calls: Mutex<Vec<&'static str>>,
        primary_fails: bool,
        primary_delay: Duration,
    }

    #[async_trait]
    impl MediaHost for FlakyHost {
        async fn upload(&self, upload: &MediaUpload) -> IntegrationResult<String> {
            self.calls.lock().unwrap().push("primary");
            tokio::time::sleep(self.primary_delay).await;
            if self.primary_fails {
                return Err(IntegrationError::Transport("reset".into()));
            }
            Ok(format!("https://cdn.test/{}", upload.file_name))
        }

        async fn upload_data_uri(&self, upload: &MediaUpload) -> IntegrationResult<String> {
            self.calls.lock().unwrap().push("fallback");
            Ok(format!("https://cdn.test/fallback/{}", upload.file_name))
        }
    }

    #[tokio::test]
    async fn failed_primary_upload_uses_data_uri_fallback() {
        let host = FlakyHost {
            calls: Mutex::new(Vec::new()),
            primary_fails: true,
            primary_delay: Duration::ZERO,
        };
        let urls = upload_with_fallback(&host, &[upload("image/png")], Duration::from_secs(1))
            .await
            .unwrap();
        assert_eq!(urls, vec!["https://cdn.test/fallback/photo.png"]);
        assert_eq!(*host.calls.lock().unwrap(), vec!["primary", "fallback"]);
    }

    #[tokio::test]
    async fn slow_primary_upload_times_out_into_fallback() {
        let host = FlakyHost {
            calls: Mutex::new(Vec::new()),
            primary_fails: false,
            primary_delay: Duration::from_millis(200),
        };
        let urls = upload_with_fallback(&host, &[upload("image/png")], Duration::from_millis(20))
            .await
            .unwrap();
        assert_eq!(urls, vec!["https://cdn.test/fallback/photo.png"]);
    }

    #[tokio::test]
    async fn uploads_keep_input_order() {
        let host = FlakyHost {
            calls: Mutex::new(Vec::new()),
            primary_fails: false,
            primary_delay: Duration::ZERO,
        };
        let mut second = upload("image/jpeg");
        second.file_name = "second.jpg".into();
        let urls = upload_with_fallback(&host, &[upload("image/png"), second], Duration::from_secs(1))
            .await
            .unwrap();
        assert_eq!(
            urls,
            vec!["https://cdn.test/photo.png", "https://cdn.test/second.jpg"]
        );
    }
}
