use std::net::SocketAddr;
use std::sync::Arc;

use axum::{Extension, Router};
use tokio::net::TcpListener;
use tower_http::cors::{Any, CorsLayer};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod api;
mod auth;
mod config;
mod db;
mod email;
mod model;
mod state;

use api::auth::JwtState;
use auth::device_tokens::DeviceTokenSigner;
use config::Config;
use db::DBLayer;
use email::{ConsoleMailer, Mailer, SmtpConfig, SmtpMailer};
use state::AppState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = Arc::new(Config::from_env()?);

    // -----------------------------
    // Shared state / Dependencies
    // -----------------------------
    let db = Arc::new(DBLayer::new(&config.db_path)?);

    let mailer: Arc<dyn Mailer> = match SmtpConfig::from_env() {
        Some(smtp) => Arc::new(SmtpMailer::new(smtp)?),
        None => {
            tracing::warn!("no SMTP settings, falling back to console mailer");
            Arc::new(ConsoleMailer)
        }
    };

    let signer = Arc::new(DeviceTokenSigner::new(&config.device_token_secret));

    let state = AppState {
        db,
        mailer,
        signer,
        config: config.clone(),
    };

    bootstrap(&state).await?;

    // -----------------------------
    // Routers
    // -----------------------------
    let app = Router::new()
        .merge(auth::router())
        .merge(api::router())
        .layer(Extension(JwtState {
            secret: config.jwt_secret.clone(),
        }))
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_headers(Any)
                .allow_methods(Any),
        )
        .with_state(state);

    let listener = TcpListener::bind(&config.bind_addr).await?;
    tracing::info!("HTTP listening on http://{}", config.bind_addr);

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .await?;

    Ok(())
}

/// One-time seeding: a default admin account (ADMIN_EMAIL/ADMIN_PASSWORD)
/// and placeholder legal pages, created only when absent.
async fn bootstrap(state: &AppState) -> anyhow::Result<()> {
    use model::legal::LegalDocument;
    use model::user::{User, UserRole};

    if let (Ok(email), Ok(password)) = (
        std::env::var("ADMIN_EMAIL"),
        std::env::var("ADMIN_PASSWORD"),
    ) {
        let email = auth::utils::normalize_email(&email);
        if state.db.find_user_by_email(&email).await?.is_none() {
            let admin = User {
                id: uuid::Uuid::new_v4().to_string(),
                email: email.clone(),
                full_name: Some("Administrator".into()),
                created_ts: chrono::Utc::now().timestamp(),
                password_hash: Some(auth::utils::hash_password(&password)?),
                role: UserRole::Admin,
                company_name: None,
                is_email_verified: true,
                meta: None,
            };
            state.db.save_user(&admin).await?;
            tracing::info!(email = %email, "default admin created");
        }
    }

    let now = chrono::Utc::now().timestamp();
    for (kind, title, content) in [
        (
            api::legal::PRIVACY_POLICY,
            "Privacy Policy",
            "Our privacy policy will be published here.",
        ),
        (
            api::legal::ABOUT_US,
            "About Us",
            "To connect job seekers with their dream jobs.",
        ),
    ] {
        if state.db.load_legal_document(kind).await?.is_none() {
            state
                .db
                .save_legal_document(
                    kind,
                    &LegalDocument {
                        title: title.into(),
                        content: content.into(),
                        contact_email: Some("support@jobconnect.example".into()),
                        contact_address: None,
                        updated_ts: now,
                    },
                )
                .await?;
        }
    }

    Ok(())
}
