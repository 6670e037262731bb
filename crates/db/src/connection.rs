use std::time::{Duration, Instant};

use coursegate_config::DatabaseSettings;
use mongodb::{Client, Database, error::Result, options::ClientOptions};
use tracing::{debug, info};

const APP_NAME: &str = "coursegate";
const SERVER_SELECTION_TIMEOUT: Duration = Duration::from_secs(10);

/// Client options for `settings`; pool bounds are applied only when configured.
pub async fn client_options(settings: &DatabaseSettings) -> Result<ClientOptions> {
    let mut options = ClientOptions::parse(&settings.url).await?;
    options.app_name = Some(APP_NAME.to_string());
    options.server_selection_timeout = Some(SERVER_SELECTION_TIMEOUT);
    if settings.max_pool_size.is_some() {
        options.max_pool_size = settings.max_pool_size;
    }
    if settings.min_pool_size.is_some() {
        options.min_pool_size = settings.min_pool_size;
    }
    Ok(options)
}

/// Opens the application database and fails fast when the server is unreachable.
pub async fn connect(settings: &DatabaseSettings) -> Result<Database> {
    let client = Client::with_options(client_options(settings).await?)?;

    let started = Instant::now();
    client
        .database("admin")
        .run_command(bson::doc! { "ping": 1 })
        .await?;
    debug!(elapsed_ms = started.elapsed().as_millis() as u64, "MongoDB ping ok");

    info!(db = %settings.name, "Connected to MongoDB");
    Ok(client.database(&settings.name))
}
