pub use crate::common::RouteResult;

use std::{env, path::PathBuf};

use axum::{
    routing::{get_service, MethodRouter},
    Router,
};
use campus::{client::Client, database::Database};
use tokio::net::TcpListener;
use tower_http::{
    services::{ServeDir, ServeFile},
    trace::TraceLayer,
};

pub mod api;
pub mod common;
pub mod extract;
pub mod hateoas;
pub mod middleware;

const DEFAULT_BIND_ADDRESS: &str = "0.0.0.0:8080";
const DEFAULT_STATIC_CONTENT_DIR: &str = "./resources/www/";

#[derive(Clone)]
pub struct WebState<D>
where
    D: Database,
{
    pub campus_client: Client<D>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WebConfig {
    pub bind_address: String,
    pub static_content_dir: PathBuf,
}

impl Default for WebConfig {
    fn default() -> Self {
        Self {
            bind_address: DEFAULT_BIND_ADDRESS.to_owned(),
            static_content_dir: PathBuf::from(DEFAULT_STATIC_CONTENT_DIR),
        }
    }
}

impl WebConfig {
    /// `WEB_BIND_ADDRESS` and `STATIC_CONTENT_DIR`, falling back to the defaults.
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            bind_address: env::var("WEB_BIND_ADDRESS").unwrap_or(defaults.bind_address),
            static_content_dir: env::var_os("STATIC_CONTENT_DIR")
                .map(PathBuf::from)
                .unwrap_or(defaults.static_content_dir),
        }
    }
}

/// The api below `/api`, everything else is served from the static content
/// directory.
pub fn router<D: Database>(state: WebState<D>, config: &WebConfig) -> Router {
    Router::new()
        .nest_service("/api", api::routes(state))
        .fallback_service(static_content_service(config))
        .layer(TraceLayer::new_for_http())
}

pub async fn start_web_server<D: Database>(
    state: WebState<D>,
    config: WebConfig,
) -> std::io::Result<()> {
    let routes = router(state, &config);

    let listener = TcpListener::bind(&config.bind_address).await?;
    axum::serve(listener, routes.into_make_service()).await?;

    Ok(())
}

fn static_content_service(config: &WebConfig) -> MethodRouter {
    let not_found = config.static_content_dir.join("error404.html");
    get_service(
        ServeDir::new(&config.static_content_dir).not_found_service(ServeFile::new(not_found)),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config() {
        let config = WebConfig::default();
        assert_eq!(config.bind_address, "0.0.0.0:8080");
        assert_eq!(config.static_content_dir, PathBuf::from("./resources/www/"));
    }
}
