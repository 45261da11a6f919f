use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use gateway_types::Message;
use lettre::message::{MultiPart, SinglePart};
use lettre::transport::smtp::authentication::Credentials;
use lettre::{AsyncSmtpTransport, AsyncTransport, Message as MimeMessage, Tokio1Executor};

use crate::Dispatcher;

#[derive(Debug, Clone)]
pub struct EmailConfig {
    pub smtp_host: String,
    pub smtp_port: u16,
    pub username: String,
    pub password: String,
    pub recipient: String,
    pub max_retries: u32,
}

impl Default for EmailConfig {
    fn default() -> Self {
        EmailConfig {
            smtp_host: "smtp.gmail.com".into(),
            smtp_port: 587,
            username: String::new(),
            password: String::new(),
            recipient: String::new(),
            max_retries: 3,
        }
    }
}

#[derive(Debug, Default, Clone, serde::Serialize)]
pub struct EmailMetrics {
    pub total_sent: u64,
    pub total_errors: u64,
}

/// Fallback dispatcher that sends the SMS as an email when the primary
/// channel is unavailable or exhausted. Unlike the primary channel, the
/// body is allowed to appear in the email body itself (the delivery act is
/// the body reaching the recipient), but never in a log line.
pub struct EmailDispatcher {
    config: EmailConfig,
    total_sent: AtomicU64,
    total_errors: AtomicU64,
}

impl EmailDispatcher {
    pub fn new(config: EmailConfig) -> Self {
        EmailDispatcher {
            config,
            total_sent: AtomicU64::new(0),
            total_errors: AtomicU64::new(0),
        }
    }

    pub fn metrics(&self) -> EmailMetrics {
        EmailMetrics {
            total_sent: self.total_sent.load(Ordering::Relaxed),
            total_errors: self.total_errors.load(Ordering::Relaxed),
        }
    }

    fn is_configured(&self) -> bool {
        !self.config.smtp_host.is_empty()
            && !self.config.username.is_empty()
            && !self.config.password.is_empty()
            && !self.config.recipient.is_empty()
    }

    fn build_email(&self, message: &Message) -> Result<MimeMessage, lettre::error::Error> {
        let text_body = format!(
            "SMS Gateway Notification\n\n\
             From: {}\n\
             Time: {}\n\
             Node: {}\n\n\
             Message:\n{}\n\n\
             SMS ID: {}",
            message.sender, message.timestamp, message.node_id, message.body, message.sms_id
        );

        let html_body = format!(
            "<html><body><h2>SMS Gateway Alert</h2>\
             <p><b>From:</b> {}</p><p><b>Time:</b> {}</p><p><b>Node:</b> {}</p>\
             <p>{}</p><p style=\"color:#6c757d\">ID: {}</p></body></html>",
            message.sender, message.timestamp, message.node_id, message.body, message.sms_id
        );

        MimeMessage::builder()
            .from(self.config.username.parse()?)
            .to(self.config.recipient.parse()?)
            .subject(format!("SMS Gateway: Message from {}", message.sender))
            .multipart(
                MultiPart::alternative()
                    .singlepart(SinglePart::plain(text_body))
                    .singlepart(SinglePart::html(html_body)),
            )
    }

    fn build_transport(&self) -> Result<AsyncSmtpTransport<Tokio1Executor>, lettre::transport::smtp::Error> {
        AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&self.config.smtp_host).map(|b| {
            b.port(self.config.smtp_port)
                .credentials(Credentials::new(
                    self.config.username.clone(),
                    self.config.password.clone(),
                ))
                .timeout(Some(Duration::from_secs(30)))
                .build()
        })
    }
}

#[async_trait]
impl Dispatcher for EmailDispatcher {
    async fn send(&self, message: &Message) -> bool {
        if !self.is_configured() {
            tracing::warn!("email fallback not configured, skipping");
            return false;
        }

        for attempt in 0..self.config.max_retries {
            let outcome = async {
                let email = self.build_email(message)?;
                let transport = self.build_transport()?;
                transport
                    .send(email)
                    .await
                    .map_err(EmailSendError::Transport)
            }
            .await;

            match outcome {
                Ok(_) => {
                    self.total_sent.fetch_add(1, Ordering::Relaxed);
                    gateway_common::outgoing!(
                        sms_id = %message.sms_id,
                        attempt = attempt + 1,
                        "email fallback delivered"
                    );
                    return true;
                }
                Err(err) => {
                    self.total_errors.fetch_add(1, Ordering::Relaxed);
                    gateway_common::outgoing!(
                        sms_id = %message.sms_id,
                        error = %err,
                        attempt = attempt + 1,
                        "email fallback failed"
                    );
                }
            }

            if attempt + 1 < self.config.max_retries {
                tokio::time::sleep(Duration::from_secs(1u64 << attempt)).await;
            }
        }

        false
    }
}

#[derive(Debug, thiserror::Error)]
enum EmailSendError {
    #[error("build: {0}")]
    Build(#[from] lettre::error::Error),
    #[error("smtp: {0}")]
    Transport(#[from] lettre::transport::smtp::Error),
}
