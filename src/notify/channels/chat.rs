//! Chat webhook channel (Discord-compatible embed payloads)

use chrono::Utc;
use reqwest::Client;
use serde::Serialize;

use crate::notify::{ChannelError, NotifyChannel};
use crate::{Alert, ChannelKind, Severity};

#[derive(Debug, Clone, Serialize)]
pub struct ChatMessage {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub embeds: Vec<Embed>,
}

#[derive(Debug, Clone, Serialize)]
pub struct Embed {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub color: Option<u32>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub fields: Vec<EmbedField>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub footer: Option<EmbedFooter>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct EmbedField {
    pub name: String,
    pub value: String,
    #[serde(default)]
    pub inline: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct EmbedFooter {
    pub text: String,
}

pub struct MessageBuilder {
    content: Option<String>,
    embeds: Vec<Embed>,
}

impl MessageBuilder {
    pub fn new() -> Self {
        Self {
            content: None,
            embeds: Vec::new(),
        }
    }

    pub fn content(mut self, content: impl ToString) -> Self {
        self.content = Some(content.to_string());
        self
    }

    pub fn add_embed(mut self, embed: Embed) -> Self {
        self.embeds.push(embed);
        self
    }

    pub fn build(self) -> ChatMessage {
        ChatMessage {
            content: self.content,
            embeds: self.embeds,
        }
    }
}

impl Default for MessageBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// Chat webhook channel. Formats alerts as one embed per message, with an
/// optional user mention for high-severity alerts.
pub struct ChatChannel {
    client: Client,
    url: String,
    mention_user_id: Option<String>,
}

impl ChatChannel {
    pub fn new(url: impl Into<String>, mention_user_id: Option<String>) -> Self {
        Self {
            client: Client::new(),
            url: url.into(),
            mention_user_id,
        }
    }

    fn severity_color(severity: Severity) -> u32 {
        match severity {
            Severity::Info => 5793266,      // Light blue
            Severity::Warning => 15105570,  // Orange
            Severity::Error => 15158332,    // Red
            Severity::Critical => 10038562, // Dark red
        }
    }

    fn severity_emoji(severity: Severity) -> &'static str {
        match severity {
            Severity::Info => "ℹ️",
            Severity::Warning => "⚠️",
            Severity::Error => "🔴",
            Severity::Critical => "🚨",
        }
    }

    pub fn build_embed(&self, alert: &Alert) -> Embed {
        let mut fields = vec![EmbedField {
            name: "Source".to_string(),
            value: alert.source.to_string(),
            inline: true,
        }];

        if let Some(value) = alert.metric_value {
            fields.push(EmbedField {
                name: "Value".to_string(),
                value: format!("{value:.1}"),
                inline: true,
            });
        }

        if let Some(threshold) = alert.threshold {
            fields.push(EmbedField {
                name: "Threshold".to_string(),
                value: format!("{threshold:.1}"),
                inline: true,
            });
        }

        Embed {
            title: Some(format!(
                "{} {}",
                Self::severity_emoji(alert.severity),
                alert.title
            )),
            description: Some(alert.message.clone()),
            color: Some(Self::severity_color(alert.severity)),
            fields,
            footer: Some(EmbedFooter {
                text: format!("{} | {}", alert.source, alert.severity),
            }),
            timestamp: Some(Utc::now().to_rfc3339()),
        }
    }
}

#[async_trait::async_trait]
impl NotifyChannel for ChatChannel {
    fn kind(&self) -> ChannelKind {
        ChannelKind::Chat
    }

    async fn send(&self, alert: &Alert) -> Result<(), ChannelError> {
        let embed = self.build_embed(alert);
        let mut builder = MessageBuilder::new().add_embed(embed);

        if let Some(user_id) = &self.mention_user_id
            && matches!(alert.severity, Severity::Error | Severity::Critical)
        {
            builder = builder.content(format!(
                "{} `{}` <@{user_id}>",
                Self::severity_emoji(alert.severity),
                alert.title
            ));
        }

        let message = builder.build();

        let response = self
            .client
            .post(&self.url)
            .json(&message)
            .send()
            .await
            .map_err(|e| ChannelError::Transport(format!("chat webhook request failed: {e}")))?;

        if response.status().is_success() {
            Ok(())
        } else {
            Err(ChannelError::Transport(format!(
                "chat webhook responded with status {}",
                response.status()
            )))
        }
    }
}
