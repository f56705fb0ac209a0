use std::sync::Arc;

use sqlx::PgPool;

use crate::config::Config;
use crate::services::notifications::Notifier;
use crate::services::paystack::{PaymentGateway, PaystackClient};

/// Shared handler state. Gateway capabilities are resolved once at
/// startup and injected here rather than read from ambient globals.
#[derive(Clone)]
pub struct AppState {
    pub pool: PgPool,
    pub config: Arc<Config>,
    pub payments: Arc<dyn PaymentGateway>,
    pub notifier: Arc<Notifier>,
}

impl AppState {
    pub fn new(pool: PgPool, config: Config) -> Self {
        let payments: Arc<dyn PaymentGateway> =
            Arc::new(PaystackClient::new(config.paystack_secret_key.clone()));
        let notifier = Arc::new(Notifier::from_config(&config));

        Self {
            pool,
            config: Arc::new(config),
            payments,
            notifier,
        }
    }
}
