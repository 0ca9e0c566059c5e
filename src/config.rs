use reqwest::Url;
use std::env;

use crate::error::PollError;

const DEFAULT_API_URL: &str = "http://localhost:8001";
const DEFAULT_DATABASE_URL: &str = "sqlite:community_poll.db";
const DEFAULT_SHARE_BASE_URL: &str = "http://localhost:3000";

#[derive(Debug, Clone)]
pub struct Config {
    /// Base URL of the topic service and poll store.
    pub api_url: Url,
    pub database_url: String,
    /// Origin used when building shareable poll links.
    pub share_base_url: Url,
}

impl Config {
    pub fn from_env() -> Result<Self, PollError> {
        let api_url = env::var("POLL_API_URL").unwrap_or_else(|_| DEFAULT_API_URL.to_string());
        let database_url =
            env::var("DATABASE_URL").unwrap_or_else(|_| DEFAULT_DATABASE_URL.to_string());
        let share_base_url = env::var("POLL_SHARE_BASE_URL")
            .unwrap_or_else(|_| DEFAULT_SHARE_BASE_URL.to_string());

        Self::from_parts(&api_url, database_url, &share_base_url)
    }

    pub fn from_parts(
        api_url: &str,
        database_url: String,
        share_base_url: &str,
    ) -> Result<Self, PollError> {
        let api_url = Url::parse(api_url)
            .map_err(|e| PollError::Config(format!("POLL_API_URL '{}': {}", api_url, e)))?;
        let share_base_url = Url::parse(share_base_url).map_err(|e| {
            PollError::Config(format!("POLL_SHARE_BASE_URL '{}': {}", share_base_url, e))
        })?;

        if api_url.cannot_be_a_base() {
            return Err(PollError::Config(format!(
                "POLL_API_URL '{}' cannot be used as a base URL",
                api_url
            )));
        }

        Ok(Self {
            api_url,
            database_url,
            share_base_url,
        })
    }
}
