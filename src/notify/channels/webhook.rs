//! Generic webhook channel
//!
//! Posts the alert as a flat JSON payload to a caller-provided URL. The
//! receiving side owns any further routing; this channel only reports
//! success or failure back to the dispatcher.

use std::collections::HashMap;

use chrono::Utc;
use reqwest::Client;
use serde_json::json;

use crate::notify::{ChannelError, NotifyChannel};
use crate::{Alert, ChannelKind};

pub struct WebhookChannel {
    client: Client,
    url: String,
    headers: HashMap<String, String>,
}

impl WebhookChannel {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            client: Client::new(),
            url: url.into(),
            headers: HashMap::new(),
        }
    }

    pub fn with_headers(mut self, headers: HashMap<String, String>) -> Self {
        self.headers = headers;
        self
    }

    fn build_payload(alert: &Alert) -> serde_json::Value {
        json!({
            "id": alert.id,
            "title": alert.title,
            "message": alert.message,
            "severity": alert.severity,
            "source": alert.source,
            "category": alert.category,
            "metric_value": alert.metric_value,
            "threshold": alert.threshold,
            "created_at": alert.created_at.to_rfc3339(),
            "timestamp": Utc::now().to_rfc3339(),
        })
    }
}

#[async_trait::async_trait]
impl NotifyChannel for WebhookChannel {
    fn kind(&self) -> ChannelKind {
        ChannelKind::Webhook
    }

    async fn send(&self, alert: &Alert) -> Result<(), ChannelError> {
        let payload = Self::build_payload(alert);

        let mut request = self.client.post(&self.url).json(&payload);
        for (key, value) in &self.headers {
            request = request.header(key, value);
        }

        let response = request
            .send()
            .await
            .map_err(|e| ChannelError::Transport(format!("webhook request failed: {e}")))?;

        if response.status().is_success() {
            Ok(())
        } else {
            Err(ChannelError::Transport(format!(
                "webhook responded with status {}",
                response.status()
            )))
        }
    }
}
