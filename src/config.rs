use anyhow::{Context, Result};

/// Google OAuth code-flow settings. Absent when the deployment has no
/// Google credentials; the start/callback routes then answer 400.
#[derive(Debug, Clone)]
pub struct GoogleOAuthConfig {
    pub client_id: String,
    pub client_secret: String,
    pub redirect_uri: String,
}

#[derive(Debug, Clone)]
pub struct Config {
    pub bind_addr: String,
    pub db_path: String,
    pub jwt_secret: String,
    /// Separate secret for device-verification tokens so a leaked session
    /// key cannot mint verification links.
    pub device_token_secret: String,
    pub frontend_url: String,
    pub frontend_success_url: String,
    pub frontend_error_url: String,
    pub google: Option<GoogleOAuthConfig>,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        fn get(key: &str) -> Option<String> {
            std::env::var(key).ok().filter(|s| !s.is_empty())
        }

        let jwt_secret = get("JWT_SECRET").context("JWT_SECRET must be set")?;
        let device_token_secret =
            get("DEVICE_TOKEN_SECRET").unwrap_or_else(|| jwt_secret.clone());

        let frontend_url =
            get("FRONTEND_URL").unwrap_or_else(|| "http://localhost:5173".into());
        let frontend_success_url = get("FRONTEND_SUCCESS_URL")
            .unwrap_or_else(|| format!("{frontend_url}/auth/success"));
        let frontend_error_url =
            get("FRONTEND_ERROR_URL").unwrap_or_else(|| format!("{frontend_url}/auth/error"));

        let google = match (
            get("GOOGLE_CLIENT_ID"),
            get("GOOGLE_CLIENT_SECRET"),
            get("GOOGLE_REDIRECT_URI"),
        ) {
            (Some(client_id), Some(client_secret), Some(redirect_uri)) => {
                Some(GoogleOAuthConfig {
                    client_id,
                    client_secret,
                    redirect_uri,
                })
            }
            _ => None,
        };

        Ok(Self {
            bind_addr: get("BIND_ADDR").unwrap_or_else(|| "0.0.0.0:3000".into()),
            db_path: get("DB_PATH").unwrap_or_else(|| "jobconnectdb".into()),
            jwt_secret,
            device_token_secret,
            frontend_url,
            frontend_success_url,
            frontend_error_url,
            google,
        })
    }
}
