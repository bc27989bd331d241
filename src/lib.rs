pub mod config;
pub mod db;
pub mod models;
pub mod opening_hours;
pub mod users;
pub mod facilities;
pub mod appointments;
pub mod wallet;
pub mod referrals;
pub mod reminders;
pub mod assist;

use tracing_subscriber::EnvFilter;

/// Initialize tracing. Call once at process start; embedding applications
/// that manage their own subscriber can skip this.
pub fn init_logging() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(config::default_log_filter())),
        )
        .init();

    tracing::info!("Vitalink starting v{}", config::APP_VERSION);
}
