use std::{env, path::PathBuf, time::Duration};

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub api_base_url: String,
    pub storage_path: PathBuf,
    pub request_timeout: Duration,
}

impl AppConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        let api_base_url = env::var("STOREFRONT_API_URL")?;
        let storage_path = env::var("STOREFRONT_STORAGE_PATH")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from(".storefront/session.json"));
        let timeout_secs = env::var("STOREFRONT_HTTP_TIMEOUT_SECS")
            .ok()
            .and_then(|s| s.parse::<u64>().ok())
            .unwrap_or(15);
        Ok(Self {
            api_base_url,
            storage_path,
            request_timeout: Duration::from_secs(timeout_secs),
        })
    }
}
