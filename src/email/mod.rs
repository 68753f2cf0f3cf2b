use anyhow::Result;

use crate::auth::device_tokens::DeviceTokenSigner;
use crate::model::login_device::LoginDevice;
use crate::model::user::User;

pub mod console;
pub mod smtp;
pub mod templates;

pub use console::ConsoleMailer;
pub use smtp::{SmtpConfig, SmtpMailer};

/// Outbound mail seam. SMTP in production, console logging in development
/// and tests.
pub trait Mailer: Send + Sync {
    fn send(&self, to: &str, subject: &str, text: &str, html: Option<&str>) -> Result<()>;
}

/// Security notice for a login from an unseen device. Informational only:
/// no link, no state change, and callers must treat failures as advisory.
pub fn send_new_device_alert(mailer: &dyn Mailer, user: &User, device: &LoginDevice) -> Result<()> {
    let (text, html) = templates::render_new_device_alert(user, device)?;
    mailer.send(
        &user.email,
        "New login detected on your account",
        &text,
        Some(&html),
    )?;
    tracing::info!(user = %user.id, device = %device.id, "new-device alert sent");
    Ok(())
}

/// Verification link for a newly registered device. The embedded token
/// expires 15 minutes after issue.
pub fn send_device_verification(
    mailer: &dyn Mailer,
    signer: &DeviceTokenSigner,
    frontend_url: &str,
    user: &User,
    device: &LoginDevice,
) -> Result<()> {
    let token = signer.issue(&device.fingerprint);
    let verify_url = format!("{frontend_url}/verify-device?token={token}");
    let text = templates::render_device_verification(user, device, &verify_url)?;
    mailer.send(&user.email, "Verify new device login", &text, None)?;
    tracing::info!(user = %user.id, device = %device.id, "device verification email sent");
    Ok(())
}

/// Address-confirmation link for a freshly registered account. The embedded
/// token expires after three days.
pub fn send_account_verification(
    mailer: &dyn Mailer,
    signer: &DeviceTokenSigner,
    frontend_url: &str,
    user: &User,
) -> Result<()> {
    let token = signer.issue(&user.email);
    let verify_url = format!("{frontend_url}/verify-email?token={token}");
    let text = templates::render_account_verification(user, &verify_url)?;
    mailer.send(&user.email, "Confirm your email address", &text, None)?;
    tracing::info!(user = %user.id, "account confirmation email sent");
    Ok(())
}
