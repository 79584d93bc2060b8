//! Typed timing configuration and the hot-reloadable config port.
//!
//! Each timing key resolves to one [`TimingSettings`] record instead of
//! an untyped field map; lenient deserializers absorb mistyped values
//! at the load boundary so consumers only ever see well-typed settings.
//! Consumers hold a [`TimingConfigSource`] and consult it every tick,
//! which makes [`SharedGameConfig`] swappable between ticks without a
//! restart.

use std::collections::HashMap;
use std::sync::Arc;

use anyhow::Context;
use parking_lot::RwLock;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

/// Fallback warning windows, used when a key is missing from the
/// configuration or its value is zero or mistyped.
pub const DEFAULT_RUNE_WARNING: i64 = 30;
pub const DEFAULT_STACK_WARNING: i64 = 20;
pub const DEFAULT_CATAPULT_WARNING: i64 = 15;
pub const DEFAULT_DAY_NIGHT_WARNING: i64 = 20;

/// Well-known timing keys.
pub mod keys {
    pub const BOUNTY_RUNE: &str = "bounty_rune";
    pub const POWER_RUNE: &str = "power_rune";
    pub const WATER_RUNE: &str = "water_rune";
    pub const WISDOM_RUNE: &str = "wisdom_rune";
    pub const STACK_TIMING: &str = "stack_timing";
    pub const CATAPULT_TIMING: &str = "catapult_timing";
    pub const DAY_NIGHT_CYCLE: &str = "day_night_cycle";
    pub const DAY_NIGHT_TRANSITION: &str = "day_night_transition";
}

fn lenient_bool<'de, D: Deserializer<'de>>(deserializer: D) -> Result<bool, D::Error> {
    let value = Value::deserialize(deserializer)?;
    Ok(value.as_bool().unwrap_or(true))
}

fn lenient_i64<'de, D: Deserializer<'de>>(deserializer: D) -> Result<i64, D::Error> {
    let value = Value::deserialize(deserializer)?;
    Ok(value
        .as_i64()
        .or_else(|| value.as_f64().map(|f| f as i64))
        .unwrap_or(0))
}

fn default_true() -> bool {
    true
}

/// Settings for one timing key.
///
/// `warning_seconds == 0` means "use the per-key fallback"; consumers
/// apply it through [`TimingSettings::warning_or`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimingSettings {
    #[serde(default = "default_true", deserialize_with = "lenient_bool")]
    pub enabled: bool,
    #[serde(default, deserialize_with = "lenient_i64")]
    pub warning_seconds: i64,
    #[serde(default, deserialize_with = "lenient_i64")]
    pub min: i64,
    #[serde(default, deserialize_with = "lenient_i64")]
    pub max: i64,
    #[serde(default, deserialize_with = "lenient_i64")]
    pub step: i64,
}

impl Default for TimingSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            warning_seconds: 0,
            min: 0,
            max: 0,
            step: 0,
        }
    }
}

impl TimingSettings {
    fn with_warning(warning_seconds: i64) -> Self {
        Self {
            warning_seconds,
            ..Self::default()
        }
    }

    /// The configured warning window, or `fallback` when unset.
    pub fn warning_or(&self, fallback: i64) -> i64 {
        if self.warning_seconds > 0 {
            self.warning_seconds
        } else {
            fallback
        }
    }
}

/// Read-only capability the consumers use to resolve timing settings,
/// consulted every tick so implementations may change between ticks.
pub trait TimingConfigSource: Send + Sync {
    /// Settings for a timing key; missing keys resolve to defaults
    /// (enabled, fallback warning window).
    fn timing(&self, key: &str) -> TimingSettings;

    fn is_enabled(&self, key: &str) -> bool {
        self.timing(key).enabled
    }
}

/// Game configuration as loaded from the embedding application's
/// `config.json`. Unknown timing keys are carried through untouched and
/// resolve through the same typed accessor.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GameConfig {
    #[serde(default)]
    pub timings: HashMap<String, TimingSettings>,
}

impl GameConfig {
    /// Deserialize a configuration document.
    pub fn from_json(raw: &[u8]) -> anyhow::Result<Self> {
        serde_json::from_slice(raw).context("invalid game configuration")
    }

    /// The stock timing table: every alert enabled with its standard
    /// warning window.
    pub fn with_defaults() -> Self {
        let timings = [
            (keys::BOUNTY_RUNE, DEFAULT_RUNE_WARNING),
            (keys::POWER_RUNE, DEFAULT_RUNE_WARNING),
            (keys::WATER_RUNE, DEFAULT_RUNE_WARNING),
            (keys::WISDOM_RUNE, DEFAULT_RUNE_WARNING),
            (keys::STACK_TIMING, DEFAULT_STACK_WARNING),
            (keys::CATAPULT_TIMING, DEFAULT_CATAPULT_WARNING),
            (keys::DAY_NIGHT_CYCLE, DEFAULT_DAY_NIGHT_WARNING),
            (keys::DAY_NIGHT_TRANSITION, 0),
        ]
        .into_iter()
        .map(|(key, warning)| (key.to_string(), TimingSettings::with_warning(warning)))
        .collect();

        Self { timings }
    }
}

impl TimingConfigSource for GameConfig {
    fn timing(&self, key: &str) -> TimingSettings {
        self.timings.get(key).cloned().unwrap_or_default()
    }
}

/// Hot-swappable wrapper around [`GameConfig`].
///
/// The embedding application replaces the inner config when the user
/// saves settings; consumers pick up the new values on their next tick.
#[derive(Debug, Default)]
pub struct SharedGameConfig {
    inner: RwLock<GameConfig>,
}

impl SharedGameConfig {
    pub fn new(config: GameConfig) -> Arc<Self> {
        Arc::new(Self {
            inner: RwLock::new(config),
        })
    }

    /// Swap in a new configuration; takes effect on the next tick.
    pub fn replace(&self, config: GameConfig) {
        *self.inner.write() = config;
    }

    /// Clone of the current configuration.
    pub fn current(&self) -> GameConfig {
        self.inner.read().clone()
    }
}

impl TimingConfigSource for SharedGameConfig {
    fn timing(&self, key: &str) -> TimingSettings {
        self.inner.read().timing(key)
    }
}
