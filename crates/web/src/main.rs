use std::error::Error;

use campus::client::Client;
use database::{DatabaseConnectionInfo, PgDatabase};
use tracing_subscriber::EnvFilter;
use web::{start_web_server, WebConfig, WebState};

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    env_logger::init();

    // request spans of the http layer
    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .finish();
    if let Err(why) = tracing::subscriber::set_global_default(subscriber) {
        log::warn!("could not install tracing subscriber: {}", why);
    }

    // database
    let database_connection_info = DatabaseConnectionInfo::from_env()
        .ok_or("expected database connection info in env.")?;
    let database = PgDatabase::connect(database_connection_info).await?;

    // web server
    let config = WebConfig::from_env();
    log::info!("listening on {}", config.bind_address);
    start_web_server(
        WebState {
            campus_client: Client::new(database),
        },
        config,
    )
    .await?;

    Ok(())
}
