use chrono::Duration;
use serde::Serialize;
use std::fmt;
use std::str::FromStr;

/// Default trailing window within which a repeat pairing is disallowed
pub const DEFAULT_RECENCY_WINDOW_DAYS: u32 = 30;

/// Longest accepted window (about a century)
pub const MAX_RECENCY_WINDOW_DAYS: u32 = 36_500;

/// Parse a window length in days, rejecting zero and anything past
/// `MAX_RECENCY_WINDOW_DAYS`
pub fn parse_recency_window_days(value: &str) -> anyhow::Result<u32> {
    let days: u32 = value.trim().parse()?;
    if !(1..=MAX_RECENCY_WINDOW_DAYS).contains(&days) {
        anyhow::bail!(
            "recency window of {} days is out of range (1..={})",
            days,
            MAX_RECENCY_WINDOW_DAYS
        );
    }
    Ok(days)
}

/// What a pairing scan does when the history lookup for a candidate pair fails
#[derive(Serialize, Debug, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "kebab-case")]
pub enum RecencyLookupPolicy {
    /// Treat the pair as not recently matched; the round keeps going
    #[default]
    FailOpen,
    /// Treat the pair as recently matched; the pair is skipped
    FailClosed,
}

impl RecencyLookupPolicy {
    /// Value substituted for the lookup result when the lookup fails
    pub fn assume_recent(self) -> bool {
        matches!(self, Self::FailClosed)
    }
}

impl fmt::Display for RecencyLookupPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::FailOpen => f.write_str("fail-open"),
            Self::FailClosed => f.write_str("fail-closed"),
        }
    }
}

impl FromStr for RecencyLookupPolicy {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "fail-open" | "open" => Ok(Self::FailOpen),
            "fail-closed" | "closed" => Ok(Self::FailClosed),
            other => anyhow::bail!(
                "unknown recency lookup policy '{}' (expected fail-open or fail-closed)",
                other
            ),
        }
    }
}

/// Tunables for a matching round
#[derive(Serialize, Debug, Clone, PartialEq, Eq)]
pub struct MatchingSettings {
    pub recency_window_days: u32,
    pub recency_policy: RecencyLookupPolicy,
    /// Fixed seed for the candidate shuffle; None draws from OS entropy each round
    pub shuffle_seed: Option<u64>,
}

impl Default for MatchingSettings {
    fn default() -> Self {
        Self {
            recency_window_days: DEFAULT_RECENCY_WINDOW_DAYS,
            recency_policy: RecencyLookupPolicy::default(),
            shuffle_seed: None,
        }
    }
}

impl MatchingSettings {
    pub fn recency_window(&self) -> Duration {
        Duration::days(i64::from(self.recency_window_days))
    }
}
