use serde::Deserialize;
use std::path::PathBuf;
use std::time::Duration;

/// Default location of the credential store file.
pub const DEFAULT_CREDENTIALS_PATH: &str = "./data/api_keys.json";

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub port: u16,
    pub credentials_path: PathBuf,
    /// Fallback webhook target when a relay request carries no URL.
    pub clay_webhook_url: Option<String>,
    pub webhook_delay_ms: u64,
    pub http_timeout_secs: u64,
}

impl Config {
    pub fn from_env() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Builds the configuration from an arbitrary variable source.
    pub fn from_lookup<F>(lookup: F) -> anyhow::Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let config = Self {
            port: lookup("PORT")
                .unwrap_or_else(|| "3000".to_string())
                .parse()
                .map_err(|_| anyhow::anyhow!("PORT must be a valid number between 1-65535"))?,
            credentials_path: lookup("CREDENTIALS_PATH")
                .filter(|s| !s.trim().is_empty())
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from(DEFAULT_CREDENTIALS_PATH)),
            clay_webhook_url: lookup("CLAY_WEBHOOK_URL")
                .filter(|s| !s.trim().is_empty())
                .map(|url| {
                    if !url.starts_with("http://") && !url.starts_with("https://") {
                        anyhow::bail!("CLAY_WEBHOOK_URL must start with http:// or https://");
                    }
                    Ok(url)
                })
                .transpose()?,
            webhook_delay_ms: lookup("WEBHOOK_DELAY_MS")
                .unwrap_or_else(|| "100".to_string())
                .parse()
                .map_err(|_| anyhow::anyhow!("WEBHOOK_DELAY_MS must be a non-negative integer"))?,
            http_timeout_secs: lookup("HTTP_TIMEOUT_SECS")
                .unwrap_or_else(|| "30".to_string())
                .parse()
                .map_err(|_| anyhow::anyhow!("HTTP_TIMEOUT_SECS must be a non-negative integer"))
                .and_then(|secs: u64| {
                    if secs == 0 {
                        anyhow::bail!("HTTP_TIMEOUT_SECS must be greater than zero");
                    }
                    Ok(secs)
                })?,
        };

        tracing::info!("Configuration loaded successfully");
        tracing::debug!("Credentials path: {}", config.credentials_path.display());
        if let Some(ref url) = config.clay_webhook_url {
            tracing::info!("Default Clay webhook configured: {}", redact_url(url));
        }
        tracing::debug!("Webhook delay: {}ms", config.webhook_delay_ms);
        tracing::debug!("Server Port: {}", config.port);

        Ok(config)
    }

    pub fn webhook_delay(&self) -> Duration {
        Duration::from_millis(self.webhook_delay_ms)
    }

    pub fn http_timeout(&self) -> Duration {
        Duration::from_secs(self.http_timeout_secs)
    }
}

/// Strips path and query from a URL for logging; webhook paths often embed tokens.
pub fn redact_url(raw: &str) -> String {
    match url::Url::parse(raw) {
        Ok(url) => format!("{}://{}/…", url.scheme(), url.host_str().unwrap_or("")),
        Err(_) => "[invalid url]".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn load(vars: &[(&str, &str)]) -> anyhow::Result<Config> {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Config::from_lookup(|name| map.get(name).cloned())
    }

    #[test]
    fn test_defaults() {
        let config = load(&[]).unwrap();
        assert_eq!(config.port, 3000);
        assert_eq!(config.credentials_path, PathBuf::from(DEFAULT_CREDENTIALS_PATH));
        assert!(config.clay_webhook_url.is_none());
        assert_eq!(config.webhook_delay(), Duration::from_millis(100));
        assert_eq!(config.http_timeout(), Duration::from_secs(30));
    }

    #[test]
    fn test_overrides() {
        let config = load(&[
            ("PORT", "8080"),
            ("CREDENTIALS_PATH", "/tmp/keys.json"),
            ("CLAY_WEBHOOK_URL", "https://api.clay.com/v3/sources/webhook/abc"),
            ("WEBHOOK_DELAY_MS", "0"),
        ])
        .unwrap();
        assert_eq!(config.port, 8080);
        assert_eq!(config.credentials_path, PathBuf::from("/tmp/keys.json"));
        assert_eq!(config.webhook_delay_ms, 0);
        assert!(config.clay_webhook_url.is_some());
    }

    #[test]
    fn test_invalid_values_rejected() {
        assert!(load(&[("PORT", "not-a-port")]).is_err());
        assert!(load(&[("CLAY_WEBHOOK_URL", "ftp://example.com")]).is_err());
        assert!(load(&[("WEBHOOK_DELAY_MS", "-5")]).is_err());
        assert!(load(&[("HTTP_TIMEOUT_SECS", "0")]).is_err());
    }

    #[test]
    fn test_blank_webhook_url_is_unset() {
        let config = load(&[("CLAY_WEBHOOK_URL", "   ")]).unwrap();
        assert!(config.clay_webhook_url.is_none());
    }

    #[test]
    fn test_redact_url() {
        assert_eq!(
            redact_url("https://api.clay.com/v3/sources/webhook/secret-token"),
            "https://api.clay.com/…"
        );
        assert_eq!(redact_url("nope"), "[invalid url]");
    }
}
