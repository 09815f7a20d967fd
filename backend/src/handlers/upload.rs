//! Multipart form parsing shared by the upload endpoints

use std::collections::HashMap;
use std::str::FromStr;

use axum::extract::Multipart;

use crate::error::{AppError, AppResult};
use crate::external::{ImageFolder, ImageUpload};
use crate::AppState;
use shared::validation::validate_image_upload;

/// Name of the file field on every upload form
pub const IMAGE_FIELD: &str = "image";

/// Text fields plus the optional image of a multipart request
#[derive(Debug, Default)]
pub struct UploadForm {
    fields: HashMap<String, String>,
    image: Option<ImageUpload>,
}

impl UploadForm {
    pub async fn read(mut multipart: Multipart) -> AppResult<Self> {
        let mut form = UploadForm::default();

        while let Some(field) = multipart.next_field().await? {
            let name = field.name().unwrap_or_default().to_string();

            if name == IMAGE_FIELD {
                let content_type = field.content_type().map(|ct| ct.to_string());
                let bytes = field.bytes().await?;
                validate_image_upload(content_type.as_deref(), bytes.len()).map_err(|m| {
                    AppError::validation(IMAGE_FIELD, m, "檔案格式錯誤或檔案過大")
                })?;
                form.image = Some(ImageUpload {
                    content_type: content_type.unwrap_or_default(),
                    bytes: bytes.to_vec(),
                });
            } else {
                let value = field.text().await?;
                form.fields.insert(name, value);
            }
        }

        Ok(form)
    }

    pub fn text(&self, name: &str) -> Option<&str> {
        self.fields
            .get(name)
            .map(String::as_str)
            .filter(|v| !v.is_empty())
    }

    /// Parse an optional field
    pub fn parse<T: FromStr>(&self, name: &str) -> AppResult<Option<T>> {
        match self.text(name) {
            Some(raw) => raw.parse().map(Some).map_err(|_| {
                AppError::validation(name, &format!("Invalid value for {}", name), "欄位格式錯誤")
            }),
            None => Ok(None),
        }
    }

    /// Parse a field that must be present
    pub fn require<T: FromStr>(&self, name: &str) -> AppResult<T> {
        self.parse(name)?.ok_or_else(|| {
            AppError::validation(name, &format!("{} is required", name), "缺少必要欄位")
        })
    }

    pub fn take_image(&mut self) -> Option<ImageUpload> {
        self.image.take()
    }

    pub fn require_image(&mut self) -> AppResult<ImageUpload> {
        self.take_image().ok_or_else(|| {
            AppError::validation(IMAGE_FIELD, "No image uploaded", "請選擇圖片")
        })
    }
}

/// Send an image to the host and return the URL to store
pub async fn store_image(
    state: &AppState,
    folder: ImageFolder,
    image: Option<ImageUpload>,
) -> AppResult<Option<String>> {
    match image {
        Some(image) => Ok(Some(state.image_host.upload(folder, &image).await?)),
        None => Ok(None),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal::Decimal;

    fn form(pairs: &[(&str, &str)]) -> UploadForm {
        UploadForm {
            fields: pairs
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect(),
            image: None,
        }
    }

    #[test]
    fn test_parse_typed_fields() {
        let f = form(&[("price", "120.50"), ("sell", "false")]);
        assert_eq!(f.require::<Decimal>("price").unwrap(), Decimal::new(12050, 2));
        assert_eq!(f.parse::<bool>("sell").unwrap(), Some(false));
    }

    #[test]
    fn test_empty_field_counts_as_missing() {
        let f = form(&[("name", "")]);
        assert!(f.text("name").is_none());
        assert!(f.require::<String>("name").is_err());
    }

    #[test]
    fn test_bad_value_is_validation_error() {
        let f = form(&[("price", "cheap")]);
        assert!(matches!(
            f.parse::<Decimal>("price"),
            Err(AppError::Validation { .. })
        ));
    }

    #[test]
    fn test_missing_image() {
        let mut f = form(&[]);
        assert!(f.require_image().is_err());
    }
}
