use anyhow::{Context, Result};
use dotenvy::dotenv;
use std::env;

use crate::domains::matching::{
    parse_recency_window_days, MatchingSettings, RecencyLookupPolicy, DEFAULT_RECENCY_WINDOW_DAYS,
};

/// Every three hours, on the hour (6-field cron: sec min hour day month weekday)
pub const DEFAULT_MATCH_SCHEDULE: &str = "0 0 */3 * * *";

/// Application configuration loaded from environment variables
#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub database_max_connections: u32,
    pub match_schedule: String,
    pub matching: MatchingSettings,
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self> {
        // Load .env file if present (development)
        let _ = dotenv();

        Ok(Self {
            database_url: env::var("DATABASE_URL").context("DATABASE_URL must be set")?,
            database_max_connections: env::var("DATABASE_MAX_CONNECTIONS")
                .unwrap_or_else(|_| "10".to_string())
                .parse()
                .context("DATABASE_MAX_CONNECTIONS must be a valid number")?,
            match_schedule: env::var("MATCH_SCHEDULE")
                .unwrap_or_else(|_| DEFAULT_MATCH_SCHEDULE.to_string()),
            matching: matching_settings_from_env()?,
        })
    }
}

/// Matching tunables only; needs no database settings
pub fn matching_settings_from_env() -> Result<MatchingSettings> {
    let _ = dotenv();

    Ok(MatchingSettings {
        recency_window_days: parse_recency_window_days(
            &env::var("MATCH_RECENCY_WINDOW_DAYS")
                .unwrap_or_else(|_| DEFAULT_RECENCY_WINDOW_DAYS.to_string()),
        )
        .context("MATCH_RECENCY_WINDOW_DAYS must be a whole number of days")?,
        recency_policy: env::var("RECENCY_LOOKUP_POLICY")
            .ok()
            .map(|v| v.parse::<RecencyLookupPolicy>())
            .transpose()
            .context("RECENCY_LOOKUP_POLICY is invalid")?
            .unwrap_or_default(),
        shuffle_seed: env::var("MATCH_SHUFFLE_SEED")
            .ok()
            .map(|v| v.parse::<u64>())
            .transpose()
            .context("MATCH_SHUFFLE_SEED must be an unsigned integer")?,
    })
}
