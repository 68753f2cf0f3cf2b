use anyhow::{anyhow, Context, Result};
use lettre::{
    message::{header::ContentType, MultiPart, SinglePart},
    transport::smtp::authentication::Credentials,
    Message, SmtpTransport, Transport,
};

use super::Mailer;

#[derive(Debug, Clone)]
pub struct SmtpConfig {
    pub host: String,
    pub port: u16,
    pub username: String,
    pub password: String,
    pub from_email: String,
    pub from_name: Option<String>,
}

impl SmtpConfig {
    /// Reads SMTP_HOST / SMTP_USERNAME / SMTP_PASSWORD / SMTP_FROM_EMAIL,
    /// optionally SMTP_PORT (default 465) and SMTP_FROM_NAME. Returns None
    /// when any required variable is missing so callers can fall back to
    /// the console mailer.
    pub fn from_env() -> Option<Self> {
        fn get(key: &str) -> Option<String> {
            std::env::var(key).ok().filter(|s| !s.is_empty())
        }

        Some(Self {
            host: get("SMTP_HOST")?,
            port: get("SMTP_PORT").and_then(|s| s.parse().ok()).unwrap_or(465),
            username: get("SMTP_USERNAME")?,
            password: get("SMTP_PASSWORD")?,
            from_email: get("SMTP_FROM_EMAIL")?,
            from_name: get("SMTP_FROM_NAME"),
        })
    }
}

pub struct SmtpMailer {
    transport: SmtpTransport,
    from_email: String,
    from_name: Option<String>,
}

impl SmtpMailer {
    pub fn new(config: SmtpConfig) -> Result<Self> {
        let creds = Credentials::new(config.username, config.password);
        let transport = SmtpTransport::relay(&config.host)
            .context("building SMTP transport")?
            .port(config.port)
            .credentials(creds)
            .build();

        tracing::info!(host = %config.host, port = config.port, "SMTP mailer configured");

        Ok(Self {
            transport,
            from_email: config.from_email,
            from_name: config.from_name,
        })
    }

    fn from_address(&self) -> String {
        match &self.from_name {
            Some(name) => format!("{name} <{}>", self.from_email),
            None => self.from_email.clone(),
        }
    }
}

impl Mailer for SmtpMailer {
    fn send(&self, to: &str, subject: &str, text: &str, html: Option<&str>) -> Result<()> {
        let builder = Message::builder()
            .from(self.from_address().parse().map_err(|e| anyhow!("invalid from address: {e}"))?)
            .to(to.parse().map_err(|e| anyhow!("invalid recipient: {e}"))?)
            .subject(subject);

        let email = match html {
            Some(html) => builder.multipart(MultiPart::alternative_plain_html(
                text.to_string(),
                html.to_string(),
            ))?,
            None => builder.singlepart(
                SinglePart::builder()
                    .header(ContentType::TEXT_PLAIN)
                    .body(text.to_string()),
            )?,
        };

        self.transport
            .send(&email)
            .context("SMTP delivery failed")?;
        Ok(())
    }
}
