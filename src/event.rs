//! Tick events, domain events, and the sink boundary.
//!
//! A [`TickEvent`] is one raw GSI push: opaque JSON bytes plus a receipt
//! time. It is shared by `Arc` across all subscriber queues, and carries
//! the memoization slot that guarantees the JSON tree is parsed at most
//! once per tick no matter how many consumers read it.
//!
//! A [`DomainEvent`] is the typed output of the pipeline: one variant
//! per alert kind, serialized with the wire names downstream sinks
//! expect (`game_state_change`, `bounty_rune`, ...).

use std::fmt;
use std::sync::OnceLock;
use std::time::Instant;

use serde::Serialize;
use serde_json::Value;

/// One raw game-state push, fanned out to every subscriber.
pub struct TickEvent {
    raw: Vec<u8>,
    received_at: Instant,
    /// Parsed JSON tree, populated once on first access.
    pub(crate) parsed: OnceLock<Value>,
}

impl TickEvent {
    pub fn new(raw: Vec<u8>) -> Self {
        Self {
            raw,
            received_at: Instant::now(),
            parsed: OnceLock::new(),
        }
    }

    /// The raw JSON bytes as received from the ingest boundary.
    pub fn raw(&self) -> &[u8] {
        &self.raw
    }

    /// When the tick was received.
    pub fn received_at(&self) -> Instant {
        self.received_at
    }
}

impl fmt::Debug for TickEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TickEvent")
            .field("raw_len", &self.raw.len())
            .field("received_at", &self.received_at)
            .field("parsed", &self.parsed.get().is_some())
            .finish()
    }
}

/// Which phase of the day/night cycle an alert refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum CycleType {
    Day,
    Night,
}

impl fmt::Display for CycleType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CycleType::Day => f.write_str("day"),
            CycleType::Night => f.write_str("night"),
        }
    }
}

/// A discrete, debounced alert derived from the snapshot stream.
///
/// The serialized form is tagged with the event's wire name, so sinks
/// that forward JSON see the same shape the original payload maps had.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum DomainEvent {
    GameStateChange {
        from: String,
        to: String,
    },
    DayNightChange {
        daytime: bool,
    },
    ScoreChange {
        radiant_score: i64,
        dire_score: i64,
        radiant_diff: i64,
        dire_diff: i64,
    },
    HeroDeath {
        deaths: i64,
        prev_deaths: i64,
        deaths_diff: i64,
    },
    HeroHealthLow {
        health: i64,
        prev_health: i64,
        threshold: i64,
    },
    HeroManaLow {
        mana: i64,
        prev_mana: i64,
        threshold: i64,
    },
    HeroLevelUp {
        level: i64,
        prev_level: i64,
        level_diff: i64,
    },
    HeroUltimateReady {
        level: i64,
    },
    BountyRune {
        seconds: i64,
        spawn_time: i64,
    },
    PowerRune {
        seconds: i64,
        spawn_time: i64,
    },
    WaterRune {
        seconds: i64,
        spawn_time: i64,
    },
    WisdomRune {
        seconds: i64,
        spawn_time: i64,
    },
    CatapultTiming {
        seconds: i64,
        spawn_time: i64,
        current_time: i64,
    },
    DayNightCycle {
        cycle_type: CycleType,
        seconds: i64,
        current_time: i64,
    },
    DayNightTransition {
        cycle_type: CycleType,
        transition: bool,
        current_time: i64,
    },
    StackTiming {
        seconds: i64,
        minute: i64,
        current_time: i64,
    },
}

impl DomainEvent {
    /// Wire name of the event, matching the serialized `type` tag.
    pub fn kind(&self) -> &'static str {
        match self {
            DomainEvent::GameStateChange { .. } => "game_state_change",
            DomainEvent::DayNightChange { .. } => "day_night_change",
            DomainEvent::ScoreChange { .. } => "score_change",
            DomainEvent::HeroDeath { .. } => "hero_death",
            DomainEvent::HeroHealthLow { .. } => "hero_health_low",
            DomainEvent::HeroManaLow { .. } => "hero_mana_low",
            DomainEvent::HeroLevelUp { .. } => "hero_level_up",
            DomainEvent::HeroUltimateReady { .. } => "hero_ultimate_ready",
            DomainEvent::BountyRune { .. } => "bounty_rune",
            DomainEvent::PowerRune { .. } => "power_rune",
            DomainEvent::WaterRune { .. } => "water_rune",
            DomainEvent::WisdomRune { .. } => "wisdom_rune",
            DomainEvent::CatapultTiming { .. } => "catapult_timing",
            DomainEvent::DayNightCycle { .. } => "day_night_cycle",
            DomainEvent::DayNightTransition { .. } => "day_night_transition",
            DomainEvent::StackTiming { .. } => "stack_timing",
        }
    }
}

/// Sink boundary for domain events.
///
/// Called synchronously from the firing consumer's own task, so
/// implementations must not block meaningfully; long work belongs on a
/// task the sink spawns itself.
pub trait Handler: Send + Sync {
    fn handle(&self, event: &DomainEvent);
}

/// Shared, cloneable list of sinks handed to each consumer.
pub type HandlerList = Vec<std::sync::Arc<dyn Handler>>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tick_event_exposes_raw_bytes() {
        let event = TickEvent::new(b"{\"map\":{}}".to_vec());
        assert_eq!(event.raw(), b"{\"map\":{}}");
        assert!(event.parsed.get().is_none());
    }

    #[test]
    fn kind_matches_serialized_tag() {
        let events = [
            DomainEvent::GameStateChange {
                from: "A".into(),
                to: "B".into(),
            },
            DomainEvent::BountyRune {
                seconds: 15,
                spawn_time: 180,
            },
            DomainEvent::StackTiming {
                seconds: 7,
                minute: 4,
                current_time: 286,
            },
        ];
        for event in events {
            let json = serde_json::to_value(&event).unwrap();
            assert_eq!(json["type"], event.kind());
        }
    }

    #[test]
    fn rune_alert_serializes_payload_fields() {
        let event = DomainEvent::PowerRune {
            seconds: 20,
            spawn_time: 360,
        };
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["type"], "power_rune");
        assert_eq!(json["seconds"], 20);
        assert_eq!(json["spawn_time"], 360);
    }

    #[test]
    fn cycle_type_serializes_lowercase() {
        let event = DomainEvent::DayNightCycle {
            cycle_type: CycleType::Night,
            seconds: 10,
            current_time: 290,
        };
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["cycle_type"], "night");
        assert_eq!(CycleType::Day.to_string(), "day");
    }
}
