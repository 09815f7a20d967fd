//! External API integrations

pub mod image_host;
pub mod sms;

pub use image_host::{ImageFolder, ImageHostClient, ImageUpload};
pub use sms::SmsClient;
