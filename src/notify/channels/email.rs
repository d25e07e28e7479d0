//! SMTP email channel

use lettre::message::Mailbox;
use lettre::message::header::ContentType;
use lettre::transport::smtp::authentication::Credentials;
use lettre::{AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor};

use crate::notify::{ChannelError, NotifyChannel};
use crate::{Alert, ChannelKind};

/// SMTP settings for the email channel.
#[derive(Debug, Clone)]
pub struct SmtpSettings {
    pub host: String,
    pub port: u16,
    pub username: String,
    pub password: String,
    pub from: String,
    pub to: Vec<String>,
}

pub struct EmailChannel {
    transport: AsyncSmtpTransport<Tokio1Executor>,
    from: Mailbox,
    to: Vec<Mailbox>,
}

impl std::fmt::Debug for EmailChannel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EmailChannel")
            .field("from", &self.from)
            .field("to", &self.to)
            .finish_non_exhaustive()
    }
}

impl EmailChannel {
    /// Build the channel, validating addresses and relay settings up front
    /// so a misconfiguration fails at startup instead of on the first alert.
    pub fn new(settings: &SmtpSettings) -> Result<Self, ChannelError> {
        let from = settings
            .from
            .parse::<Mailbox>()
            .map_err(|e| ChannelError::Config(format!("invalid from address: {e}")))?;

        if settings.to.is_empty() {
            return Err(ChannelError::Config(
                "email channel needs at least one recipient".to_string(),
            ));
        }

        let to = settings
            .to
            .iter()
            .map(|addr| {
                addr.parse::<Mailbox>()
                    .map_err(|e| ChannelError::Config(format!("invalid recipient {addr}: {e}")))
            })
            .collect::<Result<Vec<_>, _>>()?;

        let creds = Credentials::new(settings.username.clone(), settings.password.clone());

        let transport = AsyncSmtpTransport::<Tokio1Executor>::relay(&settings.host)
            .map_err(|e| ChannelError::Config(format!("invalid SMTP relay: {e}")))?
            .credentials(creds)
            .port(settings.port)
            .build();

        Ok(Self {
            transport,
            from,
            to,
        })
    }

    fn format_subject(alert: &Alert) -> String {
        format!("[{}] {}", alert.severity, alert.title)
    }

    fn format_body(alert: &Alert) -> String {
        let mut body = format!("{}\n\nSource: {}", alert.message, alert.source);

        if let Some(value) = alert.metric_value {
            body.push_str(&format!("\nValue: {value:.1}"));
        }
        if let Some(threshold) = alert.threshold {
            body.push_str(&format!("\nThreshold: {threshold:.1}"));
        }

        body.push_str(&format!("\nRaised: {}", alert.created_at.to_rfc3339()));
        body
    }
}

#[async_trait::async_trait]
impl NotifyChannel for EmailChannel {
    fn kind(&self) -> ChannelKind {
        ChannelKind::Email
    }

    async fn send(&self, alert: &Alert) -> Result<(), ChannelError> {
        let mut builder = Message::builder()
            .from(self.from.clone())
            .subject(Self::format_subject(alert))
            .header(ContentType::TEXT_PLAIN);

        for recipient in &self.to {
            builder = builder.to(recipient.clone());
        }

        let email = builder
            .body(Self::format_body(alert))
            .map_err(|e| ChannelError::Transport(format!("failed to build email: {e}")))?;

        self.transport
            .send(email)
            .await
            .map_err(|e| ChannelError::Transport(format!("SMTP send failed: {e}")))?;

        Ok(())
    }
}
