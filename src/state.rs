use std::sync::Arc;

use crate::auth::device_tokens::DeviceTokenSigner;
use crate::config::Config;
use crate::db::DBLayer;
use crate::email::Mailer;

#[derive(Clone)]
pub struct AppState {
    pub db: Arc<DBLayer>,
    pub mailer: Arc<dyn Mailer>,
    pub signer: Arc<DeviceTokenSigner>,
    pub config: Arc<Config>,
}
