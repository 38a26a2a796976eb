use serde::Deserialize;

/// Root application configuration. Loaded from environment variables
/// with the prefix `RX_GATE__` and TOML config files.
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    #[serde(default = "default_node_id")]
    pub node_id: String,
    #[serde(default)]
    pub api: ApiConfig,
    #[serde(default)]
    pub session: SessionConfig,
    #[serde(default)]
    pub redis: RedisConfig,
    #[serde(default)]
    pub metrics: MetricsConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ApiConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_http_port")]
    pub http_port: u16,
}

/// Inactivity budget and related knobs. Read once per evaluation; not
/// mutable at runtime.
#[derive(Debug, Clone, Deserialize)]
pub struct SessionConfig {
    /// Minutes of inactivity after which a session expires.
    #[serde(default = "default_timeout_minutes")]
    pub timeout_minutes: i64,
    /// Minutes before expiry at which the client shows its warning prompt.
    #[serde(default = "default_warning_minutes")]
    pub warning_minutes: i64,
    /// Extra minutes added to the cache entry TTL past the budget, so a
    /// slightly-late read never misses the record.
    #[serde(default = "default_cache_ttl_pad_minutes")]
    pub cache_ttl_pad_minutes: i64,
}

impl SessionConfig {
    pub fn budget_seconds(&self) -> i64 {
        self.timeout_minutes * 60
    }

    /// TTL for secondary-store activity entries, in seconds.
    pub fn cache_ttl_seconds(&self) -> u64 {
        ((self.timeout_minutes + self.cache_ttl_pad_minutes) * 60).max(0) as u64
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct RedisConfig {
    #[serde(default = "default_redis_urls")]
    pub urls: Vec<String>,
    #[serde(default = "default_connect_timeout_ms")]
    pub connect_timeout_ms: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct MetricsConfig {
    #[serde(default = "default_metrics_port")]
    pub port: u16,
}

// Default functions
fn default_node_id() -> String {
    "rx-01".to_string()
}
fn default_host() -> String {
    "0.0.0.0".to_string()
}
fn default_http_port() -> u16 {
    8080
}
fn default_timeout_minutes() -> i64 {
    60
}
fn default_warning_minutes() -> i64 {
    5
}
fn default_cache_ttl_pad_minutes() -> i64 {
    10
}
fn default_redis_urls() -> Vec<String> {
    vec!["redis://localhost:6379".to_string()]
}
fn default_connect_timeout_ms() -> u64 {
    5000
}
fn default_metrics_port() -> u16 {
    9091
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            http_port: default_http_port(),
        }
    }
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            timeout_minutes: default_timeout_minutes(),
            warning_minutes: default_warning_minutes(),
            cache_ttl_pad_minutes: default_cache_ttl_pad_minutes(),
        }
    }
}

impl Default for RedisConfig {
    fn default() -> Self {
        Self {
            urls: default_redis_urls(),
            connect_timeout_ms: default_connect_timeout_ms(),
        }
    }
}

impl Default for MetricsConfig {
    fn default() -> Self {
        Self {
            port: default_metrics_port(),
        }
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            node_id: default_node_id(),
            api: ApiConfig::default(),
            session: SessionConfig::default(),
            redis: RedisConfig::default(),
            metrics: MetricsConfig::default(),
        }
    }
}

impl AppConfig {
    /// Load configuration from environment variables and optional config file.
    pub fn load() -> Result<Self, config::ConfigError> {
        let builder = config::Config::builder().add_source(
            config::Environment::with_prefix("RX_GATE")
                .separator("__")
                .try_parsing(true)
                .list_separator(","),
        );

        let config = builder.build()?;
        config.try_deserialize()
    }
}
