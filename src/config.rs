use std::env;

use eyre::{Result, WrapErr, eyre};
use url::Url;

/// Backend used when neither a flag nor the environment names one.
pub const DEFAULT_BASE_URL: &str = "http://localhost:5001";

/// Environment variable holding the backend base URL. Also read from `.env`.
pub const BASE_URL_ENV: &str = "SUPPORT_CHAT_BASE_URL";

const CHAT_ENDPOINT_PATH: &str = "api/chat";

#[derive(Debug, Clone)]
pub struct Config {
    pub base_url: Url,
}

impl Config {
    /// Resolve the config from the command line and the process environment.
    ///
    /// The `--base-url` flag wins over `SUPPORT_CHAT_BASE_URL`, which wins over
    /// [`DEFAULT_BASE_URL`].
    pub fn resolve(cli_base_url: Option<&str>) -> Result<Self> {
        Self::from_sources(cli_base_url, env::var(BASE_URL_ENV).ok())
    }

    pub fn from_sources(cli_base_url: Option<&str>, env_base_url: Option<String>) -> Result<Self> {
        let raw = cli_base_url
            .map(str::to_string)
            .or(env_base_url.filter(|value| !value.trim().is_empty()))
            .unwrap_or_else(|| DEFAULT_BASE_URL.to_string());

        let base_url = Url::parse(raw.trim())
            .wrap_err_with(|| format!("Invalid backend base URL: {}", raw))?;

        if !matches!(base_url.scheme(), "http" | "https") {
            return Err(eyre!(
                "Backend base URL must use http or https, got: {}",
                base_url.scheme()
            ));
        }

        Ok(Self { base_url })
    }

    /// The `POST /api/chat` endpoint under the base URL.
    ///
    /// A path prefix on the base URL is kept, with or without a trailing slash.
    pub fn chat_endpoint(&self) -> Result<Url> {
        let mut base = self.base_url.clone();
        if !base.path().ends_with('/') {
            let path = format!("{}/", base.path());
            base.set_path(&path);
        }

        base.join(CHAT_ENDPOINT_PATH)
            .wrap_err("Failed to build chat endpoint URL")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_base_url() {
        let config = Config::from_sources(None, None).unwrap();
        assert_eq!(
            config.chat_endpoint().unwrap().as_str(),
            "http://localhost:5001/api/chat"
        );
    }

    #[test]
    fn test_flag_wins_over_env() {
        let config = Config::from_sources(
            Some("http://flag.example:8080"),
            Some("http://env.example".to_string()),
        )
        .unwrap();
        assert_eq!(config.base_url.host_str(), Some("flag.example"));
    }

    #[test]
    fn test_env_used_without_flag() {
        let config = Config::from_sources(None, Some("https://env.example".to_string())).unwrap();
        assert_eq!(
            config.chat_endpoint().unwrap().as_str(),
            "https://env.example/api/chat"
        );
    }

    #[test]
    fn test_blank_env_falls_back_to_default() {
        let config = Config::from_sources(None, Some("   ".to_string())).unwrap();
        assert_eq!(config.base_url.as_str(), "http://localhost:5001/");
    }

    #[test]
    fn test_path_prefix_is_kept() {
        for base in ["http://host/support", "http://host/support/"] {
            let config = Config::from_sources(Some(base), None).unwrap();
            assert_eq!(
                config.chat_endpoint().unwrap().as_str(),
                "http://host/support/api/chat"
            );
        }
    }

    #[test]
    fn test_rejects_invalid_urls() {
        assert!(Config::from_sources(Some("not a url"), None).is_err());
        assert!(Config::from_sources(Some("ftp://host"), None).is_err());
    }
}
