use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use thiserror::Error;
use url::Url;

/// Errors raised while loading gateway settings
#[derive(Debug, Error)]
pub enum SettingsError {
    #[error("failed to read {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse {path}: {source}")]
    Parse {
        path: String,
        #[source]
        source: basic_toml::Error,
    },
    #[error("invalid {field} URL '{value}': {source}")]
    InvalidUrl {
        field: &'static str,
        value: String,
        #[source]
        source: url::ParseError,
    },
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct GatewaySettings {
    pub application: ApplicationSettings,
    pub backend: BackendSettings,
    pub frontend: FrontendSettings,
    pub security: SecuritySettings,
    pub logging: LoggingSettings,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ApplicationSettings {
    pub host: String,
    pub port: u16,
    /// Production mode: cookies minted by the gateway carry `Secure`, and the
    /// CSP drops `'unsafe-inline'` from `script-src`
    pub production: bool,
    pub cors_origins: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BackendSettings {
    /// Base URL of the backend API used by the auth routes
    pub api_base_url: String,
    /// Base URL targeted by the generic worker proxy
    pub worker_base_url: String,
    /// Service-level bearer token, used only when the caller sent no `Authorization`
    pub worker_api_token: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FrontendSettings {
    /// Page renderer that receives every non-API request
    pub upstream_url: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SecuritySettings {
    pub content_security_policy: bool,
    /// Origin of the embedded browser session viewer, allowed in `frame-src`
    pub trusted_session_origin: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingSettings {
    pub level: String,
}

impl Default for ApplicationSettings {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8080,
            production: false,
            cors_origins: "http://localhost:3000,http://localhost:8080".to_string(),
        }
    }
}

impl Default for BackendSettings {
    fn default() -> Self {
        Self {
            api_base_url: "http://localhost:8000".to_string(),
            worker_base_url: "http://localhost:8000".to_string(),
            worker_api_token: None,
        }
    }
}

impl Default for FrontendSettings {
    fn default() -> Self {
        Self {
            upstream_url: "http://localhost:3000".to_string(),
        }
    }
}

impl Default for SecuritySettings {
    fn default() -> Self {
        Self {
            content_security_policy: true,
            trusted_session_origin: None,
        }
    }
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}

impl GatewaySettings {
    /// Load settings from configuration files and environment variables
    ///
    /// Also loads a local `.env` file and initializes the logger.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - A settings file exists but cannot be read
    /// - TOML parsing fails
    pub fn load() -> Result<Self, SettingsError> {
        Self::load_env_file();

        let (mut settings, sources) = Self::load_base_settings()?;
        Self::apply_env_overrides(&mut settings);

        Self::init_logger(&settings.logging.level);
        for source in sources {
            log::info!("Loaded settings from {source}");
        }

        Ok(settings)
    }

    /// Initialize `env_logger` with the configured level as the default filter
    fn init_logger(level: &str) {
        let env = env_logger::Env::default().default_filter_or(level);
        if env_logger::Builder::from_env(env).try_init().is_err() {
            log::debug!("Logger already initialized");
        }
    }

    /// Load base settings from TOML file(s) or use defaults
    /// Settings are loaded with the following priority (highest to lowest):
    /// 1. Environment variables (applied separately after loading base settings)
    /// 2. Settings.toml in `YEETFLOW_SECRETS_DIR` (if specified and exists)
    /// 3. Settings.toml in current directory (if exists)
    /// 4. Default settings
    ///
    /// Returns the settings and the files they were read from
    fn load_base_settings() -> Result<(Self, Vec<String>), SettingsError> {
        let mut settings = Self::default();
        let mut sources = Vec::new();

        let default_config_path = Path::new("Settings.toml");
        if default_config_path.exists() {
            settings = Self::from_file(default_config_path)?;
            sources.push(default_config_path.display().to_string());
        }

        if let Ok(secrets_dir) = std::env::var("YEETFLOW_SECRETS_DIR") {
            let secrets_path = Path::new(&secrets_dir).join("Settings.toml");
            if secrets_path.exists() {
                settings = Self::from_file(&secrets_path)?;
                sources.push(secrets_path.display().to_string());
            }
        }

        Ok((settings, sources))
    }

    /// Parse a single settings file
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or is not valid TOML
    pub fn from_file(path: &Path) -> Result<Self, SettingsError> {
        let content = fs::read_to_string(path).map_err(|source| SettingsError::Read {
            path: path.display().to_string(),
            source,
        })?;
        basic_toml::from_str(&content).map_err(|source| SettingsError::Parse {
            path: path.display().to_string(),
            source,
        })
    }

    /// Apply environment variable overrides to settings
    pub fn apply_env_overrides(settings: &mut Self) {
        Self::apply_application_env_overrides(&mut settings.application);
        Self::apply_backend_env_overrides(&mut settings.backend);
        Self::apply_frontend_env_overrides(&mut settings.frontend);
        Self::apply_security_env_overrides(&mut settings.security);
        Self::apply_logging_env_overrides(&mut settings.logging);
    }

    fn apply_application_env_overrides(app_settings: &mut ApplicationSettings) {
        if let Ok(host) = std::env::var("HOST") {
            app_settings.host = host;
        }
        if let Ok(port_str) = std::env::var("PORT") {
            if let Ok(port) = port_str.parse::<u16>() {
                app_settings.port = port;
            }
        }
        if let Ok(app_env) = std::env::var("APP_ENV") {
            app_settings.production = app_env.eq_ignore_ascii_case("production");
        }
        if let Ok(cors_origins) = std::env::var("CORS_ORIGINS") {
            app_settings.cors_origins = cors_origins;
        }
    }

    fn apply_backend_env_overrides(backend_settings: &mut BackendSettings) {
        if let Ok(api_base_url) = std::env::var("API_BASE_URL") {
            backend_settings.api_base_url = api_base_url;
        }
        if let Ok(worker_base_url) = std::env::var("WORKER_BASE_URL") {
            backend_settings.worker_base_url = worker_base_url;
        }
        if let Ok(token) = std::env::var("WORKER_API_TOKEN") {
            backend_settings.worker_api_token = Some(token).filter(|t| !t.is_empty());
        }
    }

    fn apply_frontend_env_overrides(frontend_settings: &mut FrontendSettings) {
        if let Ok(upstream_url) = std::env::var("FRONTEND_URL") {
            frontend_settings.upstream_url = upstream_url;
        }
    }

    fn apply_security_env_overrides(security_settings: &mut SecuritySettings) {
        if let Ok(enabled_str) = std::env::var("CSP_ENABLED") {
            if let Ok(enabled) = enabled_str.parse::<bool>() {
                security_settings.content_security_policy = enabled;
            }
        }
        if let Ok(origin) = std::env::var("TRUSTED_SESSION_ORIGIN") {
            security_settings.trusted_session_origin = Some(origin).filter(|o| !o.is_empty());
        }
    }

    fn apply_logging_env_overrides(logging_settings: &mut LoggingSettings) {
        if let Ok(log_level) = std::env::var("RUST_LOG") {
            logging_settings.level = log_level;
        }
    }

    /// Load environment variables from .env file
    fn load_env_file() {
        if let Ok(contents) = std::fs::read_to_string(".env") {
            for line in contents.lines() {
                let line = line.trim();
                if line.is_empty() || line.starts_with('#') {
                    continue;
                }
                if let Some((key, value)) = line.split_once('=') {
                    std::env::set_var(key.trim(), value.trim());
                }
            }
        }
    }

    /// Get the bind address for the server
    #[must_use]
    pub fn get_bind_address(&self) -> String {
        format!("{}:{}", self.application.host, self.application.port)
    }

    /// Get CORS origins as a vector of strings
    #[must_use]
    pub fn get_cors_origins(&self) -> Vec<String> {
        self.application
            .cors_origins
            .split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect()
    }

    /// Parsed backend API base URL
    ///
    /// # Errors
    ///
    /// Returns an error if the configured URL is not absolute
    pub fn api_base_url(&self) -> Result<Url, SettingsError> {
        parse_url("backend.api_base_url", &self.backend.api_base_url)
    }

    /// Parsed worker proxy base URL
    ///
    /// # Errors
    ///
    /// Returns an error if the configured URL is not absolute
    pub fn worker_base_url(&self) -> Result<Url, SettingsError> {
        parse_url("backend.worker_base_url", &self.backend.worker_base_url)
    }

    /// Parsed page renderer URL
    ///
    /// # Errors
    ///
    /// Returns an error if the configured URL is not absolute
    pub fn frontend_url(&self) -> Result<Url, SettingsError> {
        parse_url("frontend.upstream_url", &self.frontend.upstream_url)
    }
}

fn parse_url(field: &'static str, value: &str) -> Result<Url, SettingsError> {
    Url::parse(value).map_err(|source| SettingsError::InvalidUrl {
        field,
        value: value.to_string(),
        source,
    })
}
