use async_trait::async_trait;
use lettre::message::{header::ContentType, Mailbox, MultiPart, SinglePart};
use lettre::transport::smtp::authentication::Credentials;
use lettre::{AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor};
use wm_domain::config::NotificationConfig;
use wm_domain::error::{Error, Result};

use crate::traits::EmailTransport;

/// SMTP notification delivery via `lettre`, parameterized by the
/// configuration's transport settings (spec §4.4 notification step).
pub struct LettreEmailTransport {
    transport: AsyncSmtpTransport<Tokio1Executor>,
}

impl LettreEmailTransport {
    pub fn new(config: &NotificationConfig) -> Result<Self> {
        let builder = if config.smtp_use_ssl {
            AsyncSmtpTransport::<Tokio1Executor>::relay(&config.smtp_host)
        } else if config.smtp_use_tls {
            AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&config.smtp_host)
        } else {
            Ok(AsyncSmtpTransport::<Tokio1Executor>::builder_dangerous(&config.smtp_host))
        }
        .map_err(|e| Error::Config(format!("smtp transport setup: {e}")))?;

        let builder = builder.port(config.smtp_port);
        let builder = match (&config.smtp_username, &config.smtp_password) {
            (Some(user), Some(pass)) => builder.credentials(Credentials::new(user.clone(), pass.clone())),
            _ => builder,
        };

        Ok(Self { transport: builder.build() })
    }
}

#[async_trait]
impl EmailTransport for LettreEmailTransport {
    async fn send(
        &self,
        sender: &str,
        recipients: &[String],
        subject: &str,
        html: &str,
        text: &str,
    ) -> Result<()> {
        if recipients.is_empty() {
            return Err(Error::Precondition("no notification recipients configured".into()));
        }

        let from: Mailbox = sender.parse().map_err(|e| Error::Config(format!("invalid sender address: {e}")))?;
        let mut builder = Message::builder().from(from).subject(subject);
        for recipient in recipients {
            let to: Mailbox = recipient
                .parse()
                .map_err(|e| Error::Config(format!("invalid recipient address {recipient}: {e}")))?;
            builder = builder.to(to);
        }

        let message = builder
            .multipart(
                MultiPart::alternative()
                    .singlepart(SinglePart::builder().header(ContentType::TEXT_PLAIN).body(text.to_string()))
                    .singlepart(SinglePart::builder().header(ContentType::TEXT_HTML).body(html.to_string())),
            )
            .map_err(|e| Error::other(format!("building notification message: {e}")))?;

        self.transport
            .send(message)
            .await
            .map_err(|e| Error::other(format!("sending notification: {e}")))?;
        Ok(())
    }
}
