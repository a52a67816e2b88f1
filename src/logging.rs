#[cfg(not(feature = "loki"))]
use tracing_subscriber::layer::Identity;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

type BoxError = Box<dyn std::error::Error + Send + Sync>;

#[derive(Debug, Clone)]
pub struct LoggingConfig {
    pub loki_enabled: bool,
    pub loki_url: Option<String>,
    pub service_name: String,
    pub environment: String,
    pub log_level: String,
}

impl LoggingConfig {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        Self {
            loki_enabled: lookup("LOKI_ENABLED")
                .map(|v| v.trim().eq_ignore_ascii_case("true"))
                .unwrap_or(false),
            loki_url: lookup("LOKI_URL").filter(|v| !v.trim().is_empty()),
            service_name: lookup("SERVICE_NAME").unwrap_or_else(|| "news-digest".to_string()),
            environment: lookup("ENVIRONMENT").unwrap_or_else(|| "development".to_string()),
            log_level: lookup("RUST_LOG").unwrap_or_else(|| "info".to_string()),
        }
    }

    pub fn validate(&self) -> Result<(), String> {
        if self.loki_enabled && self.loki_url.is_none() {
            return Err("LOKI_ENABLED is true but LOKI_URL is not set".to_string());
        }
        Ok(())
    }
}

/// Installs the global subscriber: env filter, console output and, when
/// enabled, a Loki exporter. Must run inside the tokio runtime.
pub fn init_logging(config: LoggingConfig) -> Result<(), BoxError> {
    config.validate()?;

    let loki = loki_layer(&config)?;
    let loki_active = loki.is_some();

    tracing_subscriber::registry()
        .with(EnvFilter::new(&config.log_level))
        .with(fmt::layer())
        .with(loki)
        .try_init()?;

    tracing::info!(
        "Logging initialized for {} ({}), level={}, loki={}",
        config.service_name,
        config.environment,
        config.log_level,
        loki_active
    );
    Ok(())
}

#[cfg(feature = "loki")]
fn loki_layer(config: &LoggingConfig) -> Result<Option<tracing_loki::Layer>, BoxError> {
    let Some(loki_url) = config.loki_url.as_deref().filter(|_| config.loki_enabled) else {
        return Ok(None);
    };

    let (layer, task) = tracing_loki::builder()
        .label("service", &config.service_name)?
        .label("environment", &config.environment)?
        .build_url(url::Url::parse(loki_url)?)?;

    tokio::spawn(task);
    Ok(Some(layer))
}

#[cfg(not(feature = "loki"))]
fn loki_layer(_config: &LoggingConfig) -> Result<Option<Identity>, BoxError> {
    Ok(None)
}
