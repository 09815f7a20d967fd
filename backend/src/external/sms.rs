//! SMS gateway client
//!
//! Sends plain-text messages through an HTTP gateway that takes its
//! credentials and message as query parameters.

use reqwest::Client;

use crate::config::SmsConfig;
use crate::error::{AppError, AppResult};

#[derive(Clone)]
pub struct SmsClient {
    client: Client,
    endpoint: String,
    username: String,
    password: String,
    retry_time: u32,
}

impl SmsClient {
    pub fn new(config: &SmsConfig) -> Self {
        Self {
            client: Client::new(),
            endpoint: config.endpoint.clone(),
            username: config.username.clone(),
            password: config.password.clone(),
            retry_time: config.retry_time,
        }
    }

    /// Send `message` to `destination` (international form, e.g. `+8869...`)
    pub async fn send(&self, destination: &str, message: &str) -> AppResult<()> {
        let retry_time = self.retry_time.to_string();
        let params = [
            ("UID", self.username.as_str()),
            ("PWD", self.password.as_str()),
            ("MSG", message),
            ("DEST", destination),
            ("ST", ""),
            ("RETRYTIME", retry_time.as_str()),
        ];

        let response = self
            .client
            .post(&self.endpoint)
            .header(
                reqwest::header::CONTENT_TYPE,
                "application/x-www-form-urlencoded",
            )
            .query(&params)
            .send()
            .await
            .map_err(|e| AppError::SmsDelivery(e.to_string()))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            tracing::error!(%status, body = %body, "SMS gateway rejected message");
            return Err(AppError::SmsDelivery(format!("gateway returned {}", status)));
        }

        tracing::debug!(destination = %destination, "SMS sent");
        Ok(())
    }
}
