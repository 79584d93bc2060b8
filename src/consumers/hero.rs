//! Hero-metric transitions: deaths, health, mana, and level.

use std::collections::HashMap;
use std::time::Duration;

use tokio::time::Instant;

use crate::consumers::{dispatch, TickConsumer};
use crate::event::{DomainEvent, HandlerList};
use crate::snapshot::ParsedSnapshot;

const HEALTH_LOW_THRESHOLD: i64 = 25;
const MANA_LOW_THRESHOLD: i64 = 15;
const ULTIMATE_LEVEL: i64 = 6;

/// Minimum interval between repeats of the same event type. Death,
/// level-up, and ultimate-ready are unthrottled.
fn refire_interval(event_type: &str) -> Duration {
    match event_type {
        "hero_health_low" => Duration::from_secs(5),
        "hero_health_critical" => Duration::from_secs(3),
        "hero_mana_low" => Duration::from_secs(3),
        "hero_death" | "hero_level_up" | "hero_ultimate_ready" => Duration::ZERO,
        _ => Duration::from_secs(10),
    }
}

/// Edge-detects hero metrics against the previous tick.
///
/// Low-health and low-mana fire only on the downward-crossing tick, re-
/// arming once the metric recovers above its threshold. Baselines update
/// only from valid readings, so one malformed tick cannot corrupt the
/// edge detection that follows it.
pub struct HeroConsumer {
    handlers: HandlerList,
    last_deaths: i64,
    last_health: i64,
    last_mana: i64,
    last_level: i64,
    last_fired: HashMap<&'static str, Instant>,
}

impl HeroConsumer {
    pub fn new(handlers: HandlerList) -> Self {
        Self {
            handlers,
            last_deaths: 0,
            last_health: 0,
            last_mana: 0,
            last_level: 0,
            last_fired: HashMap::new(),
        }
    }

    /// Throttle check, applied after edge detection succeeds. Records
    /// the firing time when it allows the event through.
    fn can_fire(&mut self, event_type: &'static str) -> bool {
        let interval = refire_interval(event_type);
        if interval.is_zero() {
            return true;
        }

        let now = Instant::now();
        match self.last_fired.get(event_type) {
            Some(last) if now.duration_since(*last) <= interval => false,
            _ => {
                self.last_fired.insert(event_type, now);
                true
            }
        }
    }
}

impl TickConsumer for HeroConsumer {
    fn name(&self) -> &'static str {
        "hero"
    }

    fn process(&mut self, snapshot: &ParsedSnapshot) {
        let deaths = snapshot.get_i64("player.deaths");
        let health = snapshot.get_i64("hero.health_percent");
        let mana = snapshot.get_i64("hero.mana_percent");
        let level = snapshot.get_i64("hero.level");

        if deaths > self.last_deaths {
            dispatch(
                &self.handlers,
                DomainEvent::HeroDeath {
                    deaths,
                    prev_deaths: self.last_deaths,
                    deaths_diff: deaths - self.last_deaths,
                },
            );
        }

        if health > 0
            && health <= HEALTH_LOW_THRESHOLD
            && self.last_health > HEALTH_LOW_THRESHOLD
            && self.can_fire("hero_health_low")
        {
            dispatch(
                &self.handlers,
                DomainEvent::HeroHealthLow {
                    health,
                    prev_health: self.last_health,
                    threshold: HEALTH_LOW_THRESHOLD,
                },
            );
        }

        if mana > 0
            && mana <= MANA_LOW_THRESHOLD
            && self.last_mana > MANA_LOW_THRESHOLD
            && self.can_fire("hero_mana_low")
        {
            dispatch(
                &self.handlers,
                DomainEvent::HeroManaLow {
                    mana,
                    prev_mana: self.last_mana,
                    threshold: MANA_LOW_THRESHOLD,
                },
            );
        }

        if level > self.last_level && self.last_level > 0 {
            dispatch(
                &self.handlers,
                DomainEvent::HeroLevelUp {
                    level,
                    prev_level: self.last_level,
                    level_diff: level - self.last_level,
                },
            );

            if level == ULTIMATE_LEVEL && self.last_level < ULTIMATE_LEVEL {
                dispatch(&self.handlers, DomainEvent::HeroUltimateReady { level });
            }
        }

        // Only valid readings move the baselines.
        if deaths >= 0 {
            self.last_deaths = deaths;
        }
        if health > 0 {
            self.last_health = health;
        }
        if mana > 0 {
            self.last_mana = mana;
        }
        if level > 0 {
            self.last_level = level;
        }
    }
}
