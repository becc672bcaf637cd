use serde::Deserialize;
use std::env;
use std::fs;
use std::path::Path;

/// Application configuration
///
/// Loaded once at startup and injected into every collaborator at
/// construction. Changing any value requires a restart.
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub database: DatabaseConfig,
    #[serde(default)]
    pub blob: BlobConfig,
    #[serde(default)]
    pub ocr: OcrConfig,
    #[serde(default)]
    pub auth: AuthConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
    /// Externally reachable base URL, used for signed local-blob links
    #[serde(default = "default_public_url")]
    pub public_url: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    #[serde(default = "default_db_path")]
    pub path: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct BlobConfig {
    /// "local" or "remote"
    #[serde(default = "default_blob_backend")]
    pub backend: String,
    #[serde(default = "default_container")]
    pub container: String,
    /// Remote object store base URL, e.g. https://blobs.example.com
    #[serde(default)]
    pub endpoint: String,
    /// Key used to sign access URLs and remote requests
    #[serde(default)]
    pub access_key: String,
    #[serde(default = "default_local_path")]
    pub local_path: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct OcrConfig {
    /// Read API base URL, e.g. https://myregion.api.cognitive.example.com
    #[serde(default)]
    pub endpoint: String,
    #[serde(default)]
    pub subscription_key: String,
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,
    #[serde(default = "default_poll_max_interval_ms")]
    pub poll_max_interval_ms: u64,
    #[serde(default = "default_poll_max_attempts")]
    pub poll_max_attempts: u32,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AuthConfig {
    /// Shared secret for validating identity-provider tokens
    #[serde(default = "default_jwt_secret")]
    pub jwt_secret: String,
    /// Email domain required for upload and delete
    #[serde(default = "default_org_domain")]
    pub org_domain: String,
    #[serde(default = "default_antiforgery_lifetime")]
    pub antiforgery_lifetime_minutes: u64,
}

// Default values
fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    1420
}

fn default_public_url() -> String {
    "http://localhost:1420".to_string()
}

fn default_db_path() -> String {
    "data/imagecollector.db".to_string()
}

fn default_blob_backend() -> String {
    "local".to_string()
}

fn default_container() -> String {
    "images".to_string()
}

fn default_local_path() -> String {
    "data/blobs".to_string()
}

fn default_poll_interval_ms() -> u64 {
    500
}

fn default_poll_max_interval_ms() -> u64 {
    5_000
}

fn default_poll_max_attempts() -> u32 {
    60
}

fn default_jwt_secret() -> String {
    "your-super-secret-key-change-it".to_string()
}

fn default_org_domain() -> String {
    "example.com".to_string()
}

fn default_antiforgery_lifetime() -> u64 {
    120 // 2 hours
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            public_url: default_public_url(),
        }
    }
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            path: default_db_path(),
        }
    }
}

impl Default for BlobConfig {
    fn default() -> Self {
        Self {
            backend: default_blob_backend(),
            container: default_container(),
            endpoint: String::new(),
            access_key: String::new(),
            local_path: default_local_path(),
        }
    }
}

impl Default for OcrConfig {
    fn default() -> Self {
        Self {
            endpoint: String::new(),
            subscription_key: String::new(),
            poll_interval_ms: default_poll_interval_ms(),
            poll_max_interval_ms: default_poll_max_interval_ms(),
            poll_max_attempts: default_poll_max_attempts(),
        }
    }
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            jwt_secret: default_jwt_secret(),
            org_domain: default_org_domain(),
            antiforgery_lifetime_minutes: default_antiforgery_lifetime(),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            server: ServerConfig::default(),
            database: DatabaseConfig::default(),
            blob: BlobConfig::default(),
            ocr: OcrConfig::default(),
            auth: AuthConfig::default(),
        }
    }
}

impl Config {
    /// Load configuration from file and environment variables
    pub fn load() -> anyhow::Result<Self> {
        let mut config = Self::load_from_file()?;
        config.apply_env_overrides();
        config.ensure_directories()?;
        config.ensure_access_key()?;
        Ok(config)
    }

    /// Load configuration from config.toml
    fn load_from_file() -> anyhow::Result<Self> {
        let config_paths = ["config.toml", "data/config.toml"];

        for path in config_paths {
            if Path::new(path).exists() {
                let content = fs::read_to_string(path)?;
                let config: Config = toml::from_str(&content)?;
                tracing::info!("Loaded configuration from {}", path);
                return Ok(config);
            }
        }

        tracing::info!("No configuration file found, using defaults");
        Ok(Config::default())
    }

    /// Apply environment variable overrides
    /// Format: IC_CONF_<SECTION>_<KEY>
    fn apply_env_overrides(&mut self) {
        // Server overrides
        if let Ok(val) = env::var("IC_CONF_SERVER_HOST") {
            self.server.host = val;
        }
        if let Ok(val) = env::var("IC_CONF_SERVER_PORT") {
            if let Ok(port) = val.parse() {
                self.server.port = port;
            }
        }
        if let Ok(val) = env::var("IC_CONF_SERVER_PUBLIC_URL") {
            self.server.public_url = val;
        }

        // Database overrides
        if let Ok(val) = env::var("IC_CONF_DATABASE_PATH") {
            self.database.path = val;
        }

        // Blob store overrides
        if let Ok(val) = env::var("IC_CONF_BLOB_BACKEND") {
            self.blob.backend = val;
        }
        if let Ok(val) = env::var("IC_CONF_BLOB_CONTAINER") {
            self.blob.container = val;
        }
        if let Ok(val) = env::var("IC_CONF_BLOB_ENDPOINT") {
            self.blob.endpoint = val;
        }
        if let Ok(val) = env::var("IC_CONF_BLOB_ACCESS_KEY") {
            self.blob.access_key = val;
        }
        if let Ok(val) = env::var("IC_CONF_BLOB_LOCAL_PATH") {
            self.blob.local_path = val;
        }

        // OCR overrides
        if let Ok(val) = env::var("IC_CONF_OCR_ENDPOINT") {
            self.ocr.endpoint = val;
        }
        if let Ok(val) = env::var("IC_CONF_OCR_SUBSCRIPTION_KEY") {
            self.ocr.subscription_key = val;
        }
        if let Ok(val) = env::var("IC_CONF_OCR_POLL_MAX_ATTEMPTS") {
            if let Ok(n) = val.parse() {
                self.ocr.poll_max_attempts = n;
            }
        }

        // Auth overrides
        if let Ok(val) = env::var("IC_CONF_AUTH_JWT_SECRET") {
            self.auth.jwt_secret = val;
        }
        if let Ok(val) = env::var("IC_CONF_AUTH_ORG_DOMAIN") {
            self.auth.org_domain = val;
        }
    }

    /// Ensure data directories exist
    fn ensure_directories(&self) -> anyhow::Result<()> {
        if let Some(parent) = Path::new(&self.database.path).parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }
        if self.blob.backend == "local" {
            fs::create_dir_all(&self.blob.local_path)?;
        }
        Ok(())
    }

    /// Ensure the URL-signing key is set and persisted
    fn ensure_access_key(&mut self) -> anyhow::Result<()> {
        if !self.blob.access_key.is_empty() {
            return Ok(());
        }

        let key_path = Path::new("data/.access_key");

        if key_path.exists() {
            let key = fs::read_to_string(key_path)?;
            self.blob.access_key = key.trim().to_string();
            tracing::info!("Loaded persisted blob access key from data/.access_key");
        } else {
            let key = uuid::Uuid::new_v4().to_string();

            if let Some(parent) = key_path.parent() {
                fs::create_dir_all(parent)?;
            }

            fs::write(key_path, &key)?;
            self.blob.access_key = key;
            tracing::info!("Generated and persisted new blob access key to data/.access_key");
        }
        Ok(())
    }
}
