//! Rune spawn schedules and advance warnings.
//!
//! Four independent schedules computed solely from the match clock.
//! Dedup markers are keyed by the computed next-spawn time and reset to
//! a zero sentinel once the clock leaves the warning window, re-arming
//! the alert for the following cycle. A time jump that skips a whole
//! window therefore misses that spawn silently; the next cycle recovers.

use std::collections::HashMap;
use std::sync::Arc;

use crate::config::{keys, TimingConfigSource, DEFAULT_RUNE_WARNING};
use crate::consumers::{dispatch, TickConsumer, GAME_IN_PROGRESS};
use crate::event::{DomainEvent, HandlerList};
use crate::snapshot::ParsedSnapshot;

const BOUNTY_INTERVAL: i64 = 180;
const POWER_FIRST_SPAWN: i64 = 360;
const POWER_INTERVAL: i64 = 120;
const WATER_SPAWN_TIMES: [i64; 2] = [120, 240];
const WISDOM_FIRST_SPAWN: i64 = 420;
const WISDOM_INTERVAL: i64 = 420;

/// Alerts ahead of bounty, power, water, and wisdom rune spawns.
pub struct RuneConsumer {
    handlers: HandlerList,
    config: Arc<dyn TimingConfigSource>,
    last_clock_time: i64,
    /// Last alerted spawn time per rune type (per instant for water).
    last_alerted: HashMap<String, i64>,
}

impl RuneConsumer {
    pub fn new(handlers: HandlerList, config: Arc<dyn TimingConfigSource>) -> Self {
        Self {
            handlers,
            config,
            last_clock_time: 0,
            last_alerted: HashMap::new(),
        }
    }

    fn warning_seconds(&self, key: &str) -> i64 {
        self.config.timing(key).warning_or(DEFAULT_RUNE_WARNING)
    }

    /// Shared schedule check for the recurring rune types. `first_spawn`
    /// anchors the interval; before it the countdown runs straight to it.
    fn check_recurring(
        &mut self,
        marker: &'static str,
        key: &'static str,
        first_spawn: i64,
        interval: i64,
        clock_time: i64,
        make: impl Fn(i64, i64) -> DomainEvent,
    ) {
        if !self.config.is_enabled(key) {
            return;
        }
        let warning = self.warning_seconds(key);
        if clock_time < first_spawn - warning {
            return;
        }

        let time_until = if clock_time < first_spawn {
            first_spawn - clock_time
        } else {
            interval - ((clock_time - first_spawn) % interval)
        };

        if time_until <= warning {
            let next_spawn = clock_time + time_until;
            if self.last_alerted.get(marker).copied().unwrap_or(0) != next_spawn {
                dispatch(&self.handlers, make(time_until, next_spawn));
                self.last_alerted.insert(marker.to_string(), next_spawn);
            }
        } else {
            // Outside the warning window: re-arm for the next cycle.
            self.last_alerted.insert(marker.to_string(), 0);
        }
    }

    /// Water runes have two fixed spawn instants and no recurrence.
    fn check_water(&mut self, clock_time: i64) {
        if !self.config.is_enabled(keys::WATER_RUNE) {
            return;
        }
        let warning = self.warning_seconds(keys::WATER_RUNE);

        for spawn_time in WATER_SPAWN_TIMES {
            let marker = format!("water_{spawn_time}");
            let time_until = spawn_time - clock_time;

            if time_until > 0 && time_until <= warning {
                if self.last_alerted.get(&marker).copied().unwrap_or(0) != spawn_time {
                    dispatch(
                        &self.handlers,
                        DomainEvent::WaterRune {
                            seconds: time_until,
                            spawn_time,
                        },
                    );
                    self.last_alerted.insert(marker, spawn_time);
                }
            } else if clock_time > spawn_time {
                self.last_alerted.insert(marker, 0);
            }
        }
    }
}

impl TickConsumer for RuneConsumer {
    fn name(&self) -> &'static str {
        "rune"
    }

    fn process(&mut self, snapshot: &ParsedSnapshot) {
        let clock_time = snapshot.get_i64("map.clock_time");
        if snapshot.get_str("map.game_state") != GAME_IN_PROGRESS {
            return;
        }
        if clock_time == self.last_clock_time {
            return;
        }

        self.check_recurring(
            "bounty",
            keys::BOUNTY_RUNE,
            0,
            BOUNTY_INTERVAL,
            clock_time,
            |seconds, spawn_time| DomainEvent::BountyRune { seconds, spawn_time },
        );
        self.check_recurring(
            "power",
            keys::POWER_RUNE,
            POWER_FIRST_SPAWN,
            POWER_INTERVAL,
            clock_time,
            |seconds, spawn_time| DomainEvent::PowerRune { seconds, spawn_time },
        );
        self.check_water(clock_time);
        self.check_recurring(
            "wisdom",
            keys::WISDOM_RUNE,
            WISDOM_FIRST_SPAWN,
            WISDOM_INTERVAL,
            clock_time,
            |seconds, spawn_time| DomainEvent::WisdomRune { seconds, spawn_time },
        );

        self.last_clock_time = clock_time;
    }
}
