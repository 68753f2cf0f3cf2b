use anyhow::Result;
use minijinja::{context, Environment};
use once_cell::sync::Lazy;

use crate::model::login_device::LoginDevice;
use crate::model::user::User;

const NEW_DEVICE_ALERT_HTML: &str = r#"<!DOCTYPE html>
<html>
<head>
  <meta charset="utf-8">
  <title>New login detected</title>
</head>
<body style="font-family: Arial, sans-serif; background-color: #f6f7f9; padding: 30px;">
  <table width="100%" cellpadding="0" cellspacing="0">
    <tr>
      <td align="center">
        <table width="520" cellpadding="0" cellspacing="0"
               style="background-color: #ffffff; padding: 30px; border-radius: 8px;">
          <tr>
            <td style="text-align: center;">
              <h2 style="margin-bottom: 10px; color: #111;">New login detected</h2>
              <p style="color: #555; margin-top: 0;">
                We noticed a login from a new device on your account.
              </p>
            </td>
          </tr>
          <tr>
            <td style="padding: 20px 0;">
              <table width="100%" cellpadding="6" cellspacing="0"
                     style="background-color: #f9fafb; border-radius: 6px;">
                <tr><td><strong>Device</strong></td><td>{{ device_name }}</td></tr>
                <tr><td><strong>Operating System</strong></td><td>{{ os }}</td></tr>
                <tr><td><strong>Browser</strong></td><td>{{ browser }}</td></tr>
                <tr><td><strong>IP Address</strong></td><td>{{ ip }}</td></tr>
              </table>
            </td>
          </tr>
          <tr>
            <td>
              <p style="color: #333;">If this was you, no action is required.</p>
              <p style="color: #333;">
                If this wasn't you, we recommend that you
                <strong>reset your password</strong> and review your active devices.
              </p>
            </td>
          </tr>
          <tr>
            <td style="padding-top: 20px; border-top: 1px solid #eee; color: #777;">
              <p style="font-size: 13px;">— JobConnect Security Team</p>
            </td>
          </tr>
        </table>
      </td>
    </tr>
  </table>
</body>
</html>
"#;

const NEW_DEVICE_ALERT_TEXT: &str = r#"New login detected

We noticed a login from a new device on your account.

Device: {{ device_name }}
Operating System: {{ os }}
Browser: {{ browser }}
IP Address: {{ ip }}

If this was you, no action is required.
If this wasn't you, we recommend that you reset your password and review
your active devices.

— JobConnect Security Team
"#;

const DEVICE_VERIFICATION_TEXT: &str = r#"Hello {{ email }},

We detected a login from a new device.

Device: {{ device_name }}
OS: {{ os }}
Browser: {{ browser }}

To continue, please verify this device by clicking the link below:

{{ verify_url }}

This link will expire in 15 minutes.

If this was not you, please reset your password immediately.

— JobConnect Security Team
"#;

const ACCOUNT_VERIFICATION_TEXT: &str = r#"Hello {{ email }},

Thank you for registering with JobConnect.

Please confirm your email address by clicking the link below:

{{ verify_url }}

This link will expire in 3 days. If you did not create this account,
you can safely ignore this message.

— JobConnect Team
"#;

static TEMPLATES: Lazy<Environment<'static>> = Lazy::new(|| {
    let mut env = Environment::new();
    env.add_template("new_device_alert_html", NEW_DEVICE_ALERT_HTML)
        .expect("valid alert html template");
    env.add_template("new_device_alert_text", NEW_DEVICE_ALERT_TEXT)
        .expect("valid alert text template");
    env.add_template("device_verification_text", DEVICE_VERIFICATION_TEXT)
        .expect("valid verification template");
    env.add_template("account_verification_text", ACCOUNT_VERIFICATION_TEXT)
        .expect("valid account confirmation template");
    env
});

pub fn render_new_device_alert(user: &User, device: &LoginDevice) -> Result<(String, String)> {
    let ctx = context! {
        email => user.email,
        device_name => device.device_name,
        os => device.os,
        browser => device.browser,
        ip => device.ip_address.as_deref().unwrap_or("Unknown"),
    };
    let text = TEMPLATES.get_template("new_device_alert_text")?.render(&ctx)?;
    let html = TEMPLATES.get_template("new_device_alert_html")?.render(&ctx)?;
    Ok((text, html))
}

pub fn render_device_verification(
    user: &User,
    device: &LoginDevice,
    verify_url: &str,
) -> Result<String> {
    let ctx = context! {
        email => user.email,
        device_name => device.device_name,
        os => device.os,
        browser => device.browser,
        verify_url => verify_url,
    };
    Ok(TEMPLATES
        .get_template("device_verification_text")?
        .render(&ctx)?)
}

pub fn render_account_verification(user: &User, verify_url: &str) -> Result<String> {
    let ctx = context! {
        email => user.email,
        verify_url => verify_url,
    };
    Ok(TEMPLATES
        .get_template("account_verification_text")?
        .render(&ctx)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::user::UserRole;

    fn fixtures() -> (User, LoginDevice) {
        let user = User {
            id: "u1".into(),
            email: "a@example.com".into(),
            full_name: None,
            created_ts: 0,
            password_hash: None,
            role: UserRole::JobSeeker,
            company_name: None,
            is_email_verified: false,
            meta: None,
        };
        let device = LoginDevice {
            id: "d1".into(),
            user_id: "u1".into(),
            fingerprint: "fp".into(),
            device_name: "iPhone".into(),
            os: "iOS 17.0".into(),
            browser: "Safari 17.0".into(),
            user_agent: "ua".into(),
            ip_address: Some("203.0.113.5".into()),
            is_verified: false,
            verified_ts: None,
            created_ts: 0,
            last_login_ts: 0,
        };
        (user, device)
    }

    #[test]
    fn alert_mentions_device_and_ip() {
        let (user, device) = fixtures();
        let (text, html) = render_new_device_alert(&user, &device).unwrap();
        for body in [&text, &html] {
            assert!(body.contains("iPhone"));
            assert!(body.contains("iOS 17.0"));
            assert!(body.contains("Safari 17.0"));
            assert!(body.contains("203.0.113.5"));
            assert!(body.contains("reset your password"));
        }
    }

    #[test]
    fn alert_falls_back_on_missing_ip() {
        let (user, mut device) = fixtures();
        device.ip_address = None;
        let (text, _) = render_new_device_alert(&user, &device).unwrap();
        assert!(text.contains("IP Address: Unknown"));
    }

    #[test]
    fn verification_carries_link_and_expiry_notice() {
        let (user, device) = fixtures();
        let text =
            render_device_verification(&user, &device, "https://jc.example/verify-device?token=t")
                .unwrap();
        assert!(text.contains("https://jc.example/verify-device?token=t"));
        assert!(text.contains("expire in 15 minutes"));
        assert!(text.contains("a@example.com"));
    }

    #[test]
    fn account_confirmation_carries_link() {
        let (user, _) = fixtures();
        let text =
            render_account_verification(&user, "https://jc.example/verify-email?token=t").unwrap();
        assert!(text.contains("https://jc.example/verify-email?token=t"));
        assert!(text.contains("a@example.com"));
        assert!(text.contains("expire in 3 days"));
    }
}
