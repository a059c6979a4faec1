use guardianship_server::AppResources;
use guardianship_server::api::start_webserver;
use guardianship_server::config::load_config;
use guardianship_server::notify::SmtpMailer;
use guardianship_server::store::DbStore;
use rustls::crypto;
use rustls::crypto::CryptoProvider;
use sea_orm::Database;
use std::sync::Arc;
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

fn initialize_tracing() {
    let default_directives = "guardianship_server=info,tower_http=info,sea_orm=warn";
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_directives));

    tracing_subscriber::registry()
        .with(env_filter)
        .with(fmt::layer().with_target(true).with_level(true))
        .init();
}

#[tokio::main]
async fn main() -> color_eyre::eyre::Result<()> {
    color_eyre::install()?;
    // A missing .env is fine; the environment may be set another way.
    let _ = dotenvy::dotenv();

    initialize_tracing();

    let config = Arc::new(load_config()?);

    CryptoProvider::install_default(crypto::ring::default_provider())
        .map_err(|_| color_eyre::eyre::eyre!("Failed to install crypto provider"))?;

    let db = Arc::new(Database::connect(&config.database_url).await?);
    let store = Arc::new(DbStore::new(db));
    let mailer = Arc::new(SmtpMailer::from_config(&config.smtp)?);

    let resources = AppResources::new(config, store.clone(), store, mailer);
    tracing::info!(
        admins = resources.admins.len(),
        messages_per_second = resources.config.dispatch.messages_per_second,
        bind = %resources.config.http.bind_address,
        "Configuration loaded"
    );
    if resources.admins.is_empty() {
        tracing::warn!("No admin emails configured; broadcasts and approvals are disabled");
    }

    start_webserver(resources).await
}
