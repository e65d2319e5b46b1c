use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use async_trait::async_trait;
use lettre::message::header::ContentType;
use lettre::message::Mailbox;
use lettre::transport::smtp::authentication::Credentials;
use lettre::{AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor};

use crate::config::MailConfig;
use crate::models::User;

const CONFIRMATION_SUBJECT: &str = "Thank you for your suggestion! - AI Study Buddy";
const WELCOME_SUBJECT: &str = "Welcome to AI Study Buddy!";
const SMTP_TIMEOUT: Duration = Duration::from_secs(15);

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EmailMessage {
    pub from: String,
    pub to: String,
    pub subject: String,
    pub body: String,
}

#[async_trait]
pub trait Mailer: Send + Sync {
    async fn send(&self, message: &EmailMessage) -> Result<()>;
}

/// Delivers mail by logging it. Used when no outbound transport is wired up.
#[derive(Clone, Default)]
pub struct LogMailer;

#[async_trait]
impl Mailer for LogMailer {
    async fn send(&self, message: &EmailMessage) -> Result<()> {
        tracing::info!(
            from = %message.from,
            to = %message.to,
            subject = %message.subject,
            "email delivered to log"
        );
        Ok(())
    }
}

/// Delivers mail through an SMTP relay, upgrading with STARTTLS when
/// `use_tls` is set.
#[derive(Clone)]
pub struct SmtpMailer {
    transport: AsyncSmtpTransport<Tokio1Executor>,
}

impl SmtpMailer {
    pub fn new(config: &MailConfig) -> Result<Self> {
        let mut builder = if config.use_tls {
            AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&config.server)?
        } else {
            AsyncSmtpTransport::<Tokio1Executor>::builder_dangerous(&config.server)
        };
        builder = builder.port(config.port).timeout(Some(SMTP_TIMEOUT));

        if let Some((username, password)) = config.smtp_credentials() {
            builder = builder.credentials(Credentials::new(
                username.to_string(),
                password.to_string(),
            ));
        }

        Ok(Self {
            transport: builder.build(),
        })
    }
}

#[async_trait]
impl Mailer for SmtpMailer {
    async fn send(&self, message: &EmailMessage) -> Result<()> {
        let email = Message::builder()
            .from(message.from.parse::<Mailbox>()?)
            .to(message.to.parse::<Mailbox>()?)
            .subject(message.subject.clone())
            .header(ContentType::TEXT_PLAIN)
            .body(message.body.clone())?;

        self.transport.send(email).await?;
        tracing::info!(to = %message.to, subject = %message.subject, "email sent");
        Ok(())
    }
}

/// SMTP when credentials are configured, otherwise the log mailer.
pub fn mailer_from_config(config: &MailConfig) -> Result<Arc<dyn Mailer>> {
    if config.smtp_credentials().is_none() {
        tracing::info!("no smtp credentials configured; emails will be logged only");
        return Ok(Arc::new(LogMailer));
    }

    tracing::info!("sending email through {}:{}", config.server, config.port);
    Ok(Arc::new(SmtpMailer::new(config)?))
}

pub fn confirmation_email(config: &MailConfig, user: &User) -> EmailMessage {
    EmailMessage {
        from: config.default_sender.clone(),
        to: user.email.clone(),
        subject: CONFIRMATION_SUBJECT.to_string(),
        body: format!(
            "Hello {},\n\n\
             Thank you for sharing your suggestion with AI Study Buddy. \
             Our team reviews every suggestion and uses it to decide what to build next.\n\n\
             Keep studying!\n",
            user.username
        ),
    }
}

pub fn welcome_email(config: &MailConfig, user: &User) -> EmailMessage {
    EmailMessage {
        from: config.default_sender.clone(),
        to: user.email.clone(),
        subject: WELCOME_SUBJECT.to_string(),
        body: format!(
            "Hello {},\n\n\
             Welcome to AI Study Buddy! Paste your study notes to generate flashcards, \
             study them with flip cards, and send us suggestions to help us improve.\n\n\
             Happy studying!\n",
            user.username
        ),
    }
}

/// Sends one confirmation per user and returns how many were delivered.
/// A failed delivery is logged and does not stop the rest.
pub async fn send_bulk_confirmations(
    mailer: &dyn Mailer,
    config: &MailConfig,
    users: &[User],
) -> usize {
    let mut delivered = 0;
    for user in users {
        let message = confirmation_email(config, user);
        match mailer.send(&message).await {
            Ok(()) => delivered += 1,
            Err(err) => tracing::error!("failed to send confirmation to {}: {:#}", user.email, err),
        }
    }
    delivered
}
