//! Outbound delivery channels. None of them talk to a real provider yet: each
//! waits out a simulated latency and reports success.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;
use tracing::info;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Channel {
    Email,
    Whatsapp,
    Telegram,
}

impl Channel {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Email => "email",
            Self::Whatsapp => "whatsapp",
            Self::Telegram => "telegram",
        }
    }
}

impl fmt::Display for Channel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum DeliveryError {
    #[error("Unsupported channel: {0}")]
    UnknownChannel(String),
    #[error("Missing required field: {0}")]
    MissingField(&'static str),
}

impl FromStr for Channel {
    type Err = DeliveryError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "email" => Ok(Self::Email),
            "whatsapp" => Ok(Self::Whatsapp),
            "telegram" => Ok(Self::Telegram),
            _ => Err(DeliveryError::UnknownChannel(s.to_string())),
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct DeliveryPayload {
    #[serde(default)]
    pub to: String,
    #[serde(default)]
    pub subject: Option<String>,
    #[serde(default)]
    pub message: String,
}

impl DeliveryPayload {
    pub fn validate(&self) -> Result<(), DeliveryError> {
        if self.to.trim().is_empty() {
            return Err(DeliveryError::MissingField("to"));
        }
        if self.message.trim().is_empty() {
            return Err(DeliveryError::MissingField("message"));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ChannelResult {
    pub channel: Channel,
    pub success: bool,
    pub message_id: Option<String>,
    pub error: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DeliveryReport {
    pub success: bool,
    pub results: Vec<ChannelResult>,
    pub timestamp: DateTime<Utc>,
}

static MESSAGE_SEQ: AtomicU64 = AtomicU64::new(0);

#[derive(Debug, Clone)]
pub struct Dispatcher {
    latency: Duration,
}

impl Dispatcher {
    pub fn new(latency: Duration) -> Self {
        Self { latency }
    }

    /// Validate, then hand the payload to each channel in turn.
    pub async fn send(
        &self,
        payload: &DeliveryPayload,
        channels: &[Channel],
    ) -> Result<DeliveryReport, DeliveryError> {
        payload.validate()?;
        let mut results = Vec::with_capacity(channels.len());
        for channel in channels {
            results.push(self.deliver(*channel, payload).await);
        }
        Ok(DeliveryReport {
            success: results.iter().all(|r| r.success),
            results,
            timestamp: Utc::now(),
        })
    }

    async fn deliver(&self, channel: Channel, payload: &DeliveryPayload) -> ChannelResult {
        if channel == Channel::Email && !payload.to.contains('@') {
            return ChannelResult {
                channel,
                success: false,
                message_id: None,
                error: Some(format!("Invalid email address: {}", payload.to)),
            };
        }
        tokio::time::sleep(self.latency).await;
        let seq = MESSAGE_SEQ.fetch_add(1, Ordering::Relaxed);
        let message_id = format!("{channel}-{}-{seq}", Utc::now().timestamp_millis());
        info!(
            %channel,
            to = %payload.to,
            subject = payload.subject.as_deref().unwrap_or(""),
            message_id = %message_id,
            "simulated delivery"
        );
        ChannelResult {
            channel,
            success: true,
            message_id: Some(message_id),
            error: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn payload(to: &str, message: &str) -> DeliveryPayload {
        DeliveryPayload {
            to: to.into(),
            subject: Some("Recordatorio".into()),
            message: message.into(),
        }
    }

    #[test]
    fn channel_names_parse() {
        assert_eq!(" WhatsApp".parse::<Channel>(), Ok(Channel::Whatsapp));
        assert_eq!(
            "sms".parse::<Channel>(),
            Err(DeliveryError::UnknownChannel("sms".into()))
        );
    }

    #[tokio::test]
    async fn every_channel_reports() {
        let dispatcher = Dispatcher::new(Duration::ZERO);
        let report = dispatcher
            .send(
                &payload("ana@x.org", "Hola"),
                &[Channel::Email, Channel::Telegram],
            )
            .await
            .expect("send");
        assert!(report.success);
        assert_eq!(report.results.len(), 2);
        assert!(report.results.iter().all(|r| r.message_id.is_some()));
    }

    #[tokio::test]
    async fn bad_email_fails_only_that_channel() {
        let dispatcher = Dispatcher::new(Duration::ZERO);
        let report = dispatcher
            .send(&payload("+5491100000000", "Hola"), &[Channel::Email, Channel::Whatsapp])
            .await
            .expect("send");
        assert!(!report.success);
        assert!(!report.results[0].success);
        assert!(report.results[1].success);
    }

    #[tokio::test]
    async fn missing_fields_are_rejected() {
        let dispatcher = Dispatcher::new(Duration::ZERO);
        assert_eq!(
            dispatcher.send(&payload("", "x"), &[Channel::Email]).await,
            Err(DeliveryError::MissingField("to"))
        );
        assert_eq!(
            dispatcher.send(&payload("a@b", " "), &[Channel::Email]).await,
            Err(DeliveryError::MissingField("message"))
        );
    }
}
