use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use std::env;
use thiserror::Error;
use url::Url;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    pub environment: Environment,
    pub server: ServerConfig,
    pub auth: AuthConfig,
    pub security: SecurityConfig,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Environment {
    Development,
    Production,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    pub port: u16,
    pub api_base_path: String,
    pub ws_path: String,
    pub max_request_size_bytes: usize,
    /// Upstream for unmatched requests in production. Defaults to the port after ours.
    pub proxy_upstream: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthConfig {
    pub cookie_name: String,
    pub cognito_pool_endpoint: String,
    pub cognito_user_pool_id: String,
    pub cognito_user_pool_client_id: String,
    /// Shared HS256 secret replacing the JWKS lookup. Ignored in production.
    pub dev_secret: Option<String>,
    pub jwks_cache_ttl_secs: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SecurityConfig {
    pub enable_cors: bool,
    pub cors_origins: Vec<String>,
    pub hsts_max_age_secs: u64,
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Invalid URL for {name}: {source}")]
    InvalidUrl {
        name: &'static str,
        #[source]
        source: url::ParseError,
    },

    #[error("{0} must start with '/'")]
    InvalidPath(&'static str),

    #[error("Failed to build HTTP client: {0}")]
    HttpClient(#[source] reqwest::Error),
}

impl AppConfig {
    pub fn from_env() -> Self {
        let environment = match env::var("APP_ENV").as_deref() {
            Ok("production") | Ok("prod") => Environment::Production,
            _ => Environment::Development,
        };

        match environment {
            Environment::Production => Self::production(),
            Environment::Development => Self::development(),
        }
        .with_env_overrides()
    }

    fn with_env_overrides(mut self) -> Self {
        // Server overrides
        if let Ok(v) = env::var("PORT") {
            self.server.port = v.parse().unwrap_or(self.server.port);
        }
        if let Ok(v) = env::var("API_BASE_PATH") {
            self.server.api_base_path = v;
        }
        if let Ok(v) = env::var("WS_PATH") {
            self.server.ws_path = v;
        }
        if let Ok(v) = env::var("API_MAX_REQUEST_SIZE_BYTES") {
            self.server.max_request_size_bytes = v.parse().unwrap_or(self.server.max_request_size_bytes);
        }
        if let Ok(v) = env::var("PROXY_UPSTREAM") {
            self.server.proxy_upstream = Some(v);
        }

        // Auth overrides
        if let Ok(v) = env::var("COOKIE_NAME") {
            self.auth.cookie_name = v;
        }
        if let Ok(v) = env::var("COGNITO_POOL_ENDPOINT") {
            self.auth.cognito_pool_endpoint = v;
        }
        if let Ok(v) = env::var("COGNITO_USER_POOL_ID") {
            self.auth.cognito_user_pool_id = v;
        }
        if let Ok(v) = env::var("COGNITO_USER_POOL_CLIENT_ID") {
            self.auth.cognito_user_pool_client_id = v;
        }
        if let Ok(v) = env::var("AUTH_DEV_SECRET") {
            self.auth.dev_secret = Some(v).filter(|s| !s.is_empty());
        }
        if let Ok(v) = env::var("JWKS_CACHE_TTL_SECS") {
            self.auth.jwks_cache_ttl_secs = v.parse().unwrap_or(self.auth.jwks_cache_ttl_secs);
        }

        // Security overrides
        if let Ok(v) = env::var("SECURITY_ENABLE_CORS") {
            self.security.enable_cors = v.parse().unwrap_or(self.security.enable_cors);
        }
        if let Ok(v) = env::var("SECURITY_CORS_ORIGINS") {
            self.security.cors_origins = v.split(',').map(|s| s.trim().to_string()).collect();
        }

        self
    }

    pub fn development() -> Self {
        Self {
            environment: Environment::Development,
            server: ServerConfig {
                port: 31577,
                api_base_path: "/api".to_string(),
                ws_path: "/ws".to_string(),
                max_request_size_bytes: 10 * 1024 * 1024, // 10MB
                proxy_upstream: None,
            },
            auth: AuthConfig {
                cookie_name: "session".to_string(),
                cognito_pool_endpoint: "http://localhost:9229".to_string(),
                cognito_user_pool_id: "local_pool".to_string(),
                cognito_user_pool_client_id: "local_client".to_string(),
                dev_secret: None,
                jwks_cache_ttl_secs: 60,
            },
            security: SecurityConfig {
                enable_cors: true,
                cors_origins: vec!["http://localhost:3000".to_string()],
                hsts_max_age_secs: 0,
            },
        }
    }

    pub fn production() -> Self {
        Self {
            environment: Environment::Production,
            server: ServerConfig {
                port: 8080,
                api_base_path: "/api".to_string(),
                ws_path: "/ws".to_string(),
                max_request_size_bytes: 2 * 1024 * 1024, // 2MB
                proxy_upstream: None,
            },
            auth: AuthConfig {
                cookie_name: "session".to_string(),
                cognito_pool_endpoint: String::new(),
                cognito_user_pool_id: String::new(),
                cognito_user_pool_client_id: String::new(),
                dev_secret: None,
                jwks_cache_ttl_secs: 60 * 60,
            },
            security: SecurityConfig {
                enable_cors: false,
                cors_origins: Vec::new(),
                hsts_max_age_secs: 15_552_000, // 180 days
            },
        }
    }

    pub fn is_production(&self) -> bool {
        self.environment == Environment::Production
    }

    /// Where unmatched requests go in production.
    pub fn proxy_upstream(&self) -> Result<Url, ConfigError> {
        let raw = match &self.server.proxy_upstream {
            Some(upstream) => upstream.clone(),
            None => format!("http://localhost:{}", self.server.port.saturating_add(1)),
        };
        Url::parse(&raw).map_err(|source| ConfigError::InvalidUrl { name: "PROXY_UPSTREAM", source })
    }

    /// JWKS document of the configured user pool.
    pub fn jwks_url(&self) -> Result<Url, ConfigError> {
        let raw = format!(
            "{}/{}/.well-known/jwks.json",
            self.auth.cognito_pool_endpoint.trim_end_matches('/'),
            self.auth.cognito_user_pool_id
        );
        Url::parse(&raw).map_err(|source| ConfigError::InvalidUrl { name: "COGNITO_POOL_ENDPOINT", source })
    }

    /// Dev secret, honoured outside production only.
    pub fn dev_secret(&self) -> Option<&str> {
        match self.environment {
            Environment::Production => None,
            Environment::Development => self.auth.dev_secret.as_deref(),
        }
    }

    /// Catch misconfiguration at startup instead of on the first request.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !self.server.api_base_path.starts_with('/') {
            return Err(ConfigError::InvalidPath("API_BASE_PATH"));
        }
        if !self.server.ws_path.starts_with('/') {
            return Err(ConfigError::InvalidPath("WS_PATH"));
        }
        if self.dev_secret().is_none() {
            self.jwks_url()?;
        }
        if self.is_production() {
            self.proxy_upstream()?;
        }
        Ok(())
    }
}

// Global singleton config - initialized once at startup
pub static CONFIG: Lazy<AppConfig> = Lazy::new(AppConfig::from_env);

// Convenience function for accessing config
pub fn config() -> &'static AppConfig {
    &CONFIG
}
