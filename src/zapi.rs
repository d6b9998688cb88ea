//! Z-API outbound gateway — sends WhatsApp texts through a hosted
//! instance.
//!
//! Delivery is best-effort by contract: `send_message` reports success
//! or failure as a bool and never propagates an error, so a gateway
//! outage cannot take the webhook handler down with it.

use std::time::Duration;

use secrecy::ExposeSecret;
use serde::Deserialize;
use tracing::{debug, error, warn};

use crate::config::ZapiConfig;
use crate::error::ConfigError;

/// Message sends are interactive; fail fast rather than queueing.
const SEND_TIMEOUT: Duration = Duration::from_secs(20);

#[derive(Debug, Default, Deserialize)]
struct SendResponse {
    /// Z-API reports some failures inside a 200 body.
    error: Option<String>,
}

/// Client for one Z-API WhatsApp instance.
pub struct ZapiClient {
    http: reqwest::Client,
    config: ZapiConfig,
}

impl ZapiClient {
    pub fn new(config: ZapiConfig) -> Result<Self, ConfigError> {
        let http = reqwest::Client::builder()
            .timeout(SEND_TIMEOUT)
            .build()
            .map_err(|e| ConfigError::HttpClient(e.to_string()))?;
        Ok(Self { http, config })
    }

    /// Whether instance credentials are present.
    pub fn is_configured(&self) -> bool {
        self.config.has_credentials()
    }

    fn send_text_url(&self, instance_id: &str, token: &str) -> String {
        format!(
            "{}/instances/{instance_id}/token/{token}/send-text",
            self.config.base_url.trim_end_matches('/'),
        )
    }

    /// Send one text. Returns true only when the gateway accepted it.
    pub async fn send_message(&self, phone: &str, message: &str) -> bool {
        let (Some(instance_id), Some(token)) = (&self.config.instance_id, &self.config.token)
        else {
            error!("Z-API credentials missing, cannot send message");
            return false;
        };

        let payload = serde_json::json!({
            "phone": phone,
            "message": message,
        });

        let url = self.send_text_url(instance_id, token.expose_secret());
        let mut request = self.http.post(url).json(&payload);
        if let Some(client_token) = &self.config.client_token {
            request = request.header("client-token", client_token.expose_secret());
        }

        let response = match request.send().await {
            Ok(response) => response,
            Err(e) => {
                error!(phone, error = %e, "Z-API request failed");
                return false;
            }
        };

        let status = response.status();
        if !status.is_success() {
            error!(phone, %status, "Z-API rejected the message");
            return false;
        }

        match response.json::<SendResponse>().await {
            Ok(SendResponse { error: Some(e) }) => {
                error!(phone, error = %e, "Z-API reported a send failure");
                false
            }
            Ok(SendResponse { error: None }) => {
                debug!(phone, "Message accepted by Z-API");
                true
            }
            Err(e) => {
                warn!(phone, error = %e, "Unreadable Z-API response body");
                false
            }
        }
    }
}
