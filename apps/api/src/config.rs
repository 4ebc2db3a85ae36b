use std::path::PathBuf;

use anyhow::{Context, Result};

use crate::enrichment::dictionary::DEFAULT_DICTIONARY_URL;

/// Application configuration loaded from environment variables.
/// Startup fails if required variables are missing.
#[derive(Debug, Clone)]
pub struct Config {
    pub store_url: String,
    pub anthropic_api_key: String,
    pub openai_api_key: String,
    pub s3_bucket: String,
    pub s3_endpoint: String,
    /// Base of returned asset URLs; defaults to `s3_endpoint`.
    pub s3_public_url: String,
    pub aws_access_key_id: String,
    pub aws_secret_access_key: String,
    pub identity_userinfo_url: String,
    pub dictionary_api_url: String,
    /// Definition language for which the free dictionary is tried first.
    pub default_definition_language: String,
    pub port: u16,
    pub rust_log: String,
}

/// Where the record store keeps its collections, parsed from `STORE_URL`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreLocation {
    Redis(String),
    Memory,
    Directory(PathBuf),
}

impl StoreLocation {
    pub fn parse(url: &str) -> Self {
        if url.starts_with("redis://") || url.starts_with("rediss://") {
            StoreLocation::Redis(url.to_string())
        } else if url == "memory:" {
            StoreLocation::Memory
        } else {
            StoreLocation::Directory(PathBuf::from(url.strip_prefix("file://").unwrap_or(url)))
        }
    }
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok(); // load .env if present; ignore if missing

        let s3_endpoint = require_env("S3_ENDPOINT")?;
        Ok(Config {
            store_url: require_env("STORE_URL")?,
            anthropic_api_key: require_env("ANTHROPIC_API_KEY")?,
            openai_api_key: require_env("OPENAI_API_KEY")?,
            s3_bucket: require_env("S3_BUCKET")?,
            s3_public_url: optional_env("S3_PUBLIC_URL").unwrap_or_else(|| s3_endpoint.clone()),
            s3_endpoint,
            aws_access_key_id: require_env("AWS_ACCESS_KEY_ID")?,
            aws_secret_access_key: require_env("AWS_SECRET_ACCESS_KEY")?,
            identity_userinfo_url: require_env("IDENTITY_USERINFO_URL")?,
            dictionary_api_url: optional_env("DICTIONARY_API_URL")
                .unwrap_or_else(|| DEFAULT_DICTIONARY_URL.to_string()),
            default_definition_language: optional_env("DEFAULT_DEFINITION_LANGUAGE")
                .unwrap_or_else(|| "en".to_string()),
            port: std::env::var("PORT")
                .unwrap_or_else(|_| "8080".to_string())
                .parse::<u16>()
                .context("PORT must be a valid port number")?,
            rust_log: std::env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string()),
        })
    }

    pub fn store_location(&self) -> StoreLocation {
        StoreLocation::parse(&self.store_url)
    }
}

fn require_env(key: &str) -> Result<String> {
    std::env::var(key).with_context(|| format!("Required environment variable '{key}' is not set"))
}

fn optional_env(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.trim().is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_store_location_parsing() {
        assert_eq!(
            StoreLocation::parse("redis://localhost:6379/0"),
            StoreLocation::Redis("redis://localhost:6379/0".to_string())
        );
        assert_eq!(StoreLocation::parse("memory:"), StoreLocation::Memory);
        assert_eq!(
            StoreLocation::parse("file:///var/lib/memora"),
            StoreLocation::Directory(PathBuf::from("/var/lib/memora"))
        );
        assert_eq!(
            StoreLocation::parse("./data"),
            StoreLocation::Directory(PathBuf::from("./data"))
        );
    }
}
