use std::sync::Arc;

use url::Url;

use crate::auth::Verifier;
use crate::config::{AppConfig, ConfigError};
use crate::services::ItineraryService;
use crate::ws::WsRegistry;

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub verifier: Verifier,
    /// Spot collections by user subject.
    pub itineraries: ItineraryService,
    /// Open websockets by user subject.
    pub sockets: WsRegistry,
    /// Frontend to forward unmatched requests to; production only.
    pub upstream: Option<Url>,
    /// Client for the proxy. No redirects, no transparent decompression.
    pub proxy_client: reqwest::Client,
}

impl AppState {
    pub fn new(config: AppConfig) -> Result<Self, ConfigError> {
        config.validate()?;

        let upstream = if config.is_production() {
            let url = config.proxy_upstream()?;
            tracing::info!(upstream = %url, "proxying unmatched requests");
            Some(url)
        } else {
            None
        };

        let proxy_client = reqwest::Client::builder()
            .no_gzip()
            .redirect(reqwest::redirect::Policy::none())
            .build()
            .map_err(ConfigError::HttpClient)?;

        let sockets = WsRegistry::new();

        Ok(Self {
            verifier: Verifier::from_config(&config, reqwest::Client::new())?,
            config: Arc::new(config),
            itineraries: ItineraryService::new(sockets.clone()),
            sockets,
            upstream,
            proxy_client,
        })
    }
}
