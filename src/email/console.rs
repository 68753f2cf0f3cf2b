use anyhow::Result;

use super::Mailer;

/// Logs mail instead of sending it. Used when no SMTP settings are present.
pub struct ConsoleMailer;

impl Mailer for ConsoleMailer {
    fn send(&self, to: &str, subject: &str, text: &str, _html: Option<&str>) -> Result<()> {
        tracing::info!(to = %to, subject = %subject, "console mailer (no SMTP configured)");
        tracing::debug!("\n{text}");
        Ok(())
    }
}
