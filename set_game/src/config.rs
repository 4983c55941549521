//! Game configuration.
//!
//! A `GameConfig` is fixed for the lifetime of a game. It can be built from
//! defaults, from `SET_*` environment variables, or from a JSON document.

use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::errors::{ConfigError, ConfigResult};

/// Game configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct GameConfig {
    /// Number of slots on the table (default: 12)
    pub table_size: usize,

    /// Number of distinct cards in the deck (default: 81)
    pub deck_size: usize,

    /// Cards per set, and values per feature (default: 3)
    pub feature_size: usize,

    /// Features per card (default: 4)
    pub feature_count: usize,

    /// Number of players, humans first (default: 2)
    pub players: usize,

    /// How many of the players take input from outside (default: 0)
    pub human_players: usize,

    /// Round length before a forced reshuffle
    pub round_duration_millis: u64,

    /// Remaining time under which the countdown is shown as a warning
    pub warning_threshold_millis: u64,

    /// Freeze after a scored set
    pub point_freeze_millis: u64,

    /// Freeze after a wrong claim
    pub penalty_freeze_millis: u64,

    /// Simulated latency for every card placed on or removed from the table
    pub placement_delay_millis: u64,

    /// Longest the dealer waits for a claim before refreshing the countdown
    pub poll_interval_millis: u64,

    /// How often a frozen player refreshes its freeze display
    pub freeze_tick_millis: u64,

    /// Think time of a simulated player between two key presses
    pub ai_think_millis: u64,

    /// Log every legal set on the table after each deal
    pub hints: bool,
}

impl Default for GameConfig {
    fn default() -> Self {
        Self {
            table_size: 12,
            deck_size: 81,
            feature_size: 3,
            feature_count: 4,
            players: 2,
            human_players: 0,
            round_duration_millis: 60_000,
            warning_threshold_millis: 5_000,
            point_freeze_millis: 1_000,
            penalty_freeze_millis: 3_000,
            placement_delay_millis: 10,
            poll_interval_millis: 100,
            freeze_tick_millis: 100,
            ai_think_millis: 20,
            hints: false,
        }
    }
}

impl GameConfig {
    /// Load configuration from `SET_*` environment variables.
    ///
    /// Unset or unparsable variables fall back to the defaults; the result is
    /// validated before it is returned.
    pub fn from_env() -> ConfigResult<Self> {
        let defaults = Self::default();
        let config = Self {
            table_size: parse_env_or("SET_TABLE_SIZE", defaults.table_size),
            deck_size: parse_env_or("SET_DECK_SIZE", defaults.deck_size),
            feature_size: parse_env_or("SET_FEATURE_SIZE", defaults.feature_size),
            feature_count: parse_env_or("SET_FEATURE_COUNT", defaults.feature_count),
            players: parse_env_or("SET_PLAYERS", defaults.players),
            human_players: parse_env_or("SET_HUMAN_PLAYERS", defaults.human_players),
            round_duration_millis: parse_env_or(
                "SET_ROUND_DURATION_MS",
                defaults.round_duration_millis,
            ),
            warning_threshold_millis: parse_env_or(
                "SET_WARNING_THRESHOLD_MS",
                defaults.warning_threshold_millis,
            ),
            point_freeze_millis: parse_env_or("SET_POINT_FREEZE_MS", defaults.point_freeze_millis),
            penalty_freeze_millis: parse_env_or(
                "SET_PENALTY_FREEZE_MS",
                defaults.penalty_freeze_millis,
            ),
            placement_delay_millis: parse_env_or(
                "SET_PLACEMENT_DELAY_MS",
                defaults.placement_delay_millis,
            ),
            poll_interval_millis: parse_env_or(
                "SET_POLL_INTERVAL_MS",
                defaults.poll_interval_millis,
            ),
            freeze_tick_millis: parse_env_or("SET_FREEZE_TICK_MS", defaults.freeze_tick_millis),
            ai_think_millis: parse_env_or("SET_AI_THINK_MS", defaults.ai_think_millis),
            hints: parse_env_or("SET_HINTS", defaults.hints),
        };

        config.validate()?;
        Ok(config)
    }

    /// Parse a JSON document. Missing fields take their default value.
    pub fn from_json(json: &str) -> ConfigResult<Self> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Validate configuration
    pub fn validate(&self) -> ConfigResult<()> {
        if self.feature_size < 2 {
            return Err(invalid("SET_FEATURE_SIZE", "Must be at least 2"));
        }

        if self.feature_count == 0 {
            return Err(invalid("SET_FEATURE_COUNT", "Must be greater than 0"));
        }

        if self.table_size < self.feature_size {
            return Err(invalid(
                "SET_TABLE_SIZE",
                format!("Must hold at least one set ({} cards)", self.feature_size),
            ));
        }

        let distinct_cards = u32::try_from(self.feature_count)
            .ok()
            .and_then(|count| self.feature_size.checked_pow(count));
        match distinct_cards {
            _ if self.deck_size == 0 => {
                return Err(invalid("SET_DECK_SIZE", "Must be greater than 0"));
            }
            Some(max) if self.deck_size > max => {
                return Err(invalid(
                    "SET_DECK_SIZE",
                    format!("Only {max} distinct cards exist with these features"),
                ));
            }
            _ => {}
        }

        if self.players == 0 {
            return Err(invalid("SET_PLAYERS", "Must be at least 1"));
        }

        if self.human_players > self.players {
            return Err(invalid(
                "SET_HUMAN_PLAYERS",
                format!("Cannot exceed player count ({})", self.players),
            ));
        }

        if self.round_duration_millis == 0 {
            return Err(invalid("SET_ROUND_DURATION_MS", "Must be greater than 0"));
        }

        if self.warning_threshold_millis > self.round_duration_millis {
            return Err(invalid(
                "SET_WARNING_THRESHOLD_MS",
                format!(
                    "Cannot exceed round duration ({}ms)",
                    self.round_duration_millis
                ),
            ));
        }

        if self.poll_interval_millis == 0 {
            return Err(invalid("SET_POLL_INTERVAL_MS", "Must be greater than 0"));
        }

        if self.freeze_tick_millis == 0 {
            return Err(invalid("SET_FREEZE_TICK_MS", "Must be greater than 0"));
        }

        Ok(())
    }

    /// Whether the given seat takes external input
    pub fn is_human(&self, player: usize) -> bool {
        player < self.human_players
    }

    pub fn round_duration(&self) -> Duration {
        Duration::from_millis(self.round_duration_millis)
    }

    pub fn warning_threshold(&self) -> Duration {
        Duration::from_millis(self.warning_threshold_millis)
    }

    pub fn point_freeze(&self) -> Duration {
        Duration::from_millis(self.point_freeze_millis)
    }

    pub fn penalty_freeze(&self) -> Duration {
        Duration::from_millis(self.penalty_freeze_millis)
    }

    pub fn placement_delay(&self) -> Duration {
        Duration::from_millis(self.placement_delay_millis)
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_millis)
    }

    pub fn freeze_tick(&self) -> Duration {
        Duration::from_millis(self.freeze_tick_millis)
    }

    pub fn ai_think(&self) -> Duration {
        Duration::from_millis(self.ai_think_millis)
    }
}

fn invalid(var: &str, reason: impl Into<String>) -> ConfigError {
    ConfigError::Invalid {
        var: var.to_string(),
        reason: reason.into(),
    }
}

/// Helper to parse environment variable with default fallback
fn parse_env_or<T>(key: &str, default: T) -> T
where
    T: std::str::FromStr,
{
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}
