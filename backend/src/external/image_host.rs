//! Image hosting client
//!
//! Uploads images with a signed request and returns the hosted URL, which
//! is stored verbatim as the image reference.

use base64::{engine::general_purpose::STANDARD, Engine as _};
use chrono::Utc;
use reqwest::Client;
use serde::Deserialize;
use sha2::{Digest, Sha256};

use crate::config::ImageHostConfig;
use crate::error::{AppError, AppResult};

/// Destination folders on the image host
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImageFolder {
    Products,
    StoreBanner,
    StoreCover,
    Carousel,
}

impl ImageFolder {
    pub fn as_str(&self) -> &'static str {
        match self {
            ImageFolder::Products => "products",
            ImageFolder::StoreBanner => "store/banner",
            ImageFolder::StoreCover => "store/cover",
            ImageFolder::Carousel => "carousel",
        }
    }
}

/// An image received from a client, already validated
#[derive(Debug, Clone)]
pub struct ImageUpload {
    pub content_type: String,
    pub bytes: Vec<u8>,
}

#[derive(Clone)]
pub struct ImageHostClient {
    client: Client,
    upload_url: String,
    cloud_name: String,
    api_key: String,
    api_secret: String,
}

#[derive(Debug, Deserialize)]
struct UploadResponse {
    secure_url: String,
}

impl ImageHostClient {
    pub fn new(config: &ImageHostConfig) -> Self {
        Self {
            client: Client::new(),
            upload_url: config.upload_url.trim_end_matches('/').to_string(),
            cloud_name: config.cloud_name.clone(),
            api_key: config.api_key.clone(),
            api_secret: config.api_secret.clone(),
        }
    }

    /// Upload an image into `folder` and return its public URL
    pub async fn upload(&self, folder: ImageFolder, image: &ImageUpload) -> AppResult<String> {
        let timestamp = Utc::now().timestamp().to_string();
        let signature = sign(
            &[("folder", folder.as_str()), ("timestamp", &timestamp)],
            &self.api_secret,
        );
        let data_uri = format!(
            "data:{};base64,{}",
            image.content_type,
            STANDARD.encode(&image.bytes)
        );

        let form = [
            ("file", data_uri.as_str()),
            ("folder", folder.as_str()),
            ("timestamp", timestamp.as_str()),
            ("api_key", self.api_key.as_str()),
            ("signature", signature.as_str()),
            ("signature_algorithm", "sha256"),
        ];

        let url = format!("{}/{}/image/upload", self.upload_url, self.cloud_name);
        let response = self
            .client
            .post(&url)
            .form(&form)
            .send()
            .await
            .map_err(|e| AppError::ImageUpload(e.to_string()))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            tracing::error!(%status, body = %body, folder = folder.as_str(), "Image upload rejected");
            return Err(AppError::ImageUpload(format!("image host returned {}", status)));
        }

        let uploaded: UploadResponse = response
            .json()
            .await
            .map_err(|e| AppError::ImageUpload(e.to_string()))?;

        tracing::debug!(url = %uploaded.secure_url, folder = folder.as_str(), "Image uploaded");
        Ok(uploaded.secure_url)
    }
}

/// Signature over the alphabetically sorted `key=value` pairs plus the secret
fn sign(params: &[(&str, &str)], secret: &str) -> String {
    let mut sorted = params.to_vec();
    sorted.sort_by(|a, b| a.0.cmp(b.0));
    let joined = sorted
        .iter()
        .map(|(k, v)| format!("{}={}", k, v))
        .collect::<Vec<_>>()
        .join("&");
    format!("{:x}", Sha256::digest(format!("{}{}", joined, secret).as_bytes()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_signature_ignores_param_order() {
        let a = sign(&[("timestamp", "1"), ("folder", "products")], "s");
        let b = sign(&[("folder", "products"), ("timestamp", "1")], "s");
        assert_eq!(a, b);
        assert_eq!(a.len(), 64);
    }

    #[test]
    fn test_signature_depends_on_secret() {
        let params = [("folder", "carousel"), ("timestamp", "1")];
        assert_ne!(sign(&params, "one"), sign(&params, "two"));
    }

    #[test]
    fn test_folder_names() {
        assert_eq!(ImageFolder::StoreBanner.as_str(), "store/banner");
        assert_eq!(ImageFolder::StoreCover.as_str(), "store/cover");
    }
}
