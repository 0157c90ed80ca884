//! Email notification client.
//!
//! Thin wrapper over the notification service's REST API. Delivery is
//! best-effort: every failure path logs and returns `false`, nothing here is
//! allowed to fail a caller.

use std::collections::HashMap;

use crate::config::Config;

/// Client for sending templated emails through the notification service.
pub struct Notifier {
    client: reqwest::Client,
    api_key: Option<String>,
    base_url: String,
}

impl Notifier {
    pub fn new(config: &Config) -> Self {
        Self {
            client: reqwest::Client::new(),
            api_key: config.notify_api_key.clone(),
            base_url: config.notify_base_url.trim_end_matches('/').to_string(),
        }
    }

    /// Send a templated email. Returns `true` only when the notification
    /// service accepted the request.
    pub async fn send_email(
        &self,
        email_address: &str,
        template_id: &str,
        personalisation: &HashMap<String, String>,
    ) -> bool {
        if email_address.trim().is_empty() {
            tracing::warn!(
                "Attempted to send email with an empty address for template {}",
                template_id
            );
            return false;
        }
        if template_id.trim().is_empty() {
            tracing::warn!(
                "Attempted to send email to {} with an empty template id",
                email_address
            );
            return false;
        }

        let Some(api_key) = &self.api_key else {
            tracing::warn!(
                "No notification API key configured; skipping email to {} (template {})",
                email_address,
                template_id
            );
            return false;
        };

        let body = serde_json::json!({
            "email_address": email_address,
            "template_id": template_id,
            "personalisation": personalisation,
        });

        let url = format!("{}/v2/notifications/email", self.base_url);
        match self
            .client
            .post(&url)
            .bearer_auth(api_key)
            .json(&body)
            .send()
            .await
        {
            Ok(response) if response.status().is_success() => {
                tracing::info!(
                    "Email sent to {} using template {}",
                    email_address,
                    template_id
                );
                true
            }
            Ok(response) => {
                tracing::warn!(
                    "Notification service rejected email to {} (template {}): status {}",
                    email_address,
                    template_id,
                    response.status()
                );
                false
            }
            Err(err) => {
                tracing::warn!(
                    "Failed to reach notification service for email to {} (template {}): {}",
                    email_address,
                    template_id,
                    err
                );
                false
            }
        }
    }
}
