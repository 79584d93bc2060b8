//! Timing windows: catapult waves, day/night cycle, and stack pulls.
//!
//! Catapult and day/night dedup markers are keyed by the absolute next
//! spawn or cycle index, so the marker map grows over a session; that is
//! acceptable for match-length lifetimes.

use std::collections::HashMap;
use std::sync::Arc;

use crate::config::{
    keys, TimingConfigSource, DEFAULT_CATAPULT_WARNING, DEFAULT_DAY_NIGHT_WARNING,
    DEFAULT_STACK_WARNING,
};
use crate::consumers::{dispatch, TickConsumer, GAME_IN_PROGRESS};
use crate::event::{CycleType, DomainEvent, HandlerList};
use crate::snapshot::ParsedSnapshot;

/// Catapult waves spawn every 5 minutes.
const CATAPULT_INTERVAL: i64 = 300;
/// Day and night each last 5 minutes.
const DAY_NIGHT_CYCLE_SECONDS: i64 = 300;
/// Window after a cycle boundary in which the transition announcement fires.
const TRANSITION_THRESHOLD: i64 = 2;
/// Stack alerts begin at this match minute.
const STACK_START_MINUTE: i64 = 4;
/// Players must pull at second :53 to stack at :00.
const STACK_PULL_SECOND: i64 = 53;
const MINUTE_SECONDS: i64 = 60;

/// Alerts on catapult timing, day/night transitions, and stack pulls.
pub struct TimingConsumer {
    handlers: HandlerList,
    config: Arc<dyn TimingConfigSource>,
    last_clock_time: i64,
    /// Per-alert-key marker: next spawn/transition time, cycle flag, or
    /// last stack alert time.
    last_alert: HashMap<String, i64>,
}

impl TimingConsumer {
    pub fn new(handlers: HandlerList, config: Arc<dyn TimingConfigSource>) -> Self {
        Self {
            handlers,
            config,
            last_clock_time: 0,
            last_alert: HashMap::new(),
        }
    }

    fn check_catapult(&mut self, clock_time: i64) {
        if !self.config.is_enabled(keys::CATAPULT_TIMING) {
            return;
        }
        let warning = self
            .config
            .timing(keys::CATAPULT_TIMING)
            .warning_or(DEFAULT_CATAPULT_WARNING);

        let time_until = CATAPULT_INTERVAL - (clock_time % CATAPULT_INTERVAL);
        if time_until <= warning {
            let next_spawn = clock_time + time_until;
            let marker = format!("catapult_{next_spawn}");
            if self.last_alert.get(&marker).copied().unwrap_or(0) != next_spawn {
                dispatch(
                    &self.handlers,
                    DomainEvent::CatapultTiming {
                        seconds: time_until,
                        spawn_time: next_spawn,
                        current_time: clock_time,
                    },
                );
                self.last_alert.insert(marker, next_spawn);
            }
        }
    }

    fn check_day_night(&mut self, clock_time: i64, daytime: bool) {
        if !self.config.is_enabled(keys::DAY_NIGHT_CYCLE) {
            return;
        }
        let warning = self
            .config
            .timing(keys::DAY_NIGHT_CYCLE)
            .warning_or(DEFAULT_DAY_NIGHT_WARNING);

        let time_in_cycle = clock_time % DAY_NIGHT_CYCLE_SECONDS;
        let time_until = DAY_NIGHT_CYCLE_SECONDS - time_in_cycle;

        // Announce the phase just entered, once per cycle index. This is
        // independent of the warning window.
        if time_in_cycle <= TRANSITION_THRESHOLD {
            let marker = format!("transition_{}", clock_time / DAY_NIGHT_CYCLE_SECONDS);
            if self.last_alert.get(&marker).copied().unwrap_or(0) == 0 {
                let entered = if daytime { CycleType::Day } else { CycleType::Night };
                dispatch(
                    &self.handlers,
                    DomainEvent::DayNightTransition {
                        cycle_type: entered,
                        transition: true,
                        current_time: clock_time,
                    },
                );
                self.last_alert.insert(marker, 1);
            }
        }

        // Warn ahead of the next transition; the lower bound avoids
        // double-firing against the transition announcement above.
        if time_until <= warning && time_until > TRANSITION_THRESHOLD {
            let next_transition = clock_time + time_until;
            let marker = format!("day_night_{next_transition}");
            if self.last_alert.get(&marker).copied().unwrap_or(0) != next_transition {
                let upcoming = if daytime { CycleType::Night } else { CycleType::Day };
                dispatch(
                    &self.handlers,
                    DomainEvent::DayNightCycle {
                        cycle_type: upcoming,
                        seconds: time_until,
                        current_time: clock_time,
                    },
                );
                self.last_alert.insert(marker, next_transition);
            }
        }
    }

    fn check_stack(&mut self, clock_time: i64) {
        if !self.config.is_enabled(keys::STACK_TIMING) {
            return;
        }
        let warning = self
            .config
            .timing(keys::STACK_TIMING)
            .warning_or(DEFAULT_STACK_WARNING);

        let minute = clock_time / MINUTE_SECONDS;
        let second = clock_time % MINUTE_SECONDS;
        let warn_at_second = (STACK_PULL_SECOND - warning).max(0);

        if minute >= STACK_START_MINUTE && second == warn_at_second {
            // At most one alert per 60 game-seconds.
            let throttled = self
                .last_alert
                .get("stack_timing")
                .is_some_and(|last| clock_time - last < MINUTE_SECONDS);
            if !throttled {
                dispatch(
                    &self.handlers,
                    DomainEvent::StackTiming {
                        seconds: STACK_PULL_SECOND - second,
                        minute,
                        current_time: clock_time,
                    },
                );
                self.last_alert.insert("stack_timing".to_string(), clock_time);
            }
        }
    }
}

impl TickConsumer for TimingConsumer {
    fn name(&self) -> &'static str {
        "timing"
    }

    fn process(&mut self, snapshot: &ParsedSnapshot) {
        let clock_time = snapshot.get_i64("map.clock_time");
        let game_state = snapshot.get_str("map.game_state");
        let daytime = snapshot.get_bool("map.daytime");

        if game_state != GAME_IN_PROGRESS || clock_time < 0 {
            return;
        }
        if clock_time == self.last_clock_time {
            return;
        }

        self.check_catapult(clock_time);
        self.check_day_night(clock_time, daytime);
        self.check_stack(clock_time);

        self.last_clock_time = clock_time;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{GameConfig, SharedGameConfig, TimingSettings};
    use crate::consumers::testutil::{snapshot, Recorder};
    use serde_json::json;

    fn tick(clock_time: i64, daytime: bool) -> ParsedSnapshot {
        snapshot(json!({
            "map": {
                "game_state": GAME_IN_PROGRESS,
                "clock_time": clock_time,
                "daytime": daytime,
            }
        }))
    }

    fn config_with(key: &str, settings: TimingSettings) -> Arc<SharedGameConfig> {
        let mut config = GameConfig::with_defaults();
        config.timings.insert(key.to_string(), settings);
        SharedGameConfig::new(config)
    }

    fn consumer_with(config: Arc<SharedGameConfig>) -> (TimingConsumer, Arc<Recorder>) {
        let recorder = Recorder::new();
        (TimingConsumer::new(vec![recorder.clone()], config), recorder)
    }

    fn kinds_of(recorder: &Recorder, kind: &str) -> usize {
        recorder.kinds().iter().filter(|k| **k == kind).count()
    }

    #[test]
    fn catapult_warning_fires_once_per_wave() {
        let (mut consumer, recorder) =
            consumer_with(SharedGameConfig::new(GameConfig::with_defaults()));

        // Default warning 15s: eligible from 285.
        for clock_time in [284, 286, 290, 295] {
            consumer.process(&tick(clock_time, true));
        }

        let catapult: Vec<_> = recorder
            .events()
            .into_iter()
            .filter(|e| e.kind() == "catapult_timing")
            .collect();
        assert_eq!(
            catapult,
            vec![DomainEvent::CatapultTiming {
                seconds: 14,
                spawn_time: 300,
                current_time: 286,
            }]
        );

        // Next wave alerts again.
        consumer.process(&tick(590, true));
        assert_eq!(kinds_of(&recorder, "catapult_timing"), 2);
    }

    #[test]
    fn day_night_transition_announces_entered_phase() {
        let (mut consumer, recorder) =
            consumer_with(SharedGameConfig::new(GameConfig::with_defaults()));

        // Second cycle just began and it is night.
        consumer.process(&tick(301, false));
        consumer.process(&tick(302, false));

        let transitions: Vec<_> = recorder
            .events()
            .into_iter()
            .filter(|e| e.kind() == "day_night_transition")
            .collect();
        assert_eq!(
            transitions,
            vec![DomainEvent::DayNightTransition {
                cycle_type: CycleType::Night,
                transition: true,
                current_time: 301,
            }]
        );
    }

    #[test]
    fn day_night_warning_names_upcoming_phase() {
        let (mut consumer, recorder) =
            consumer_with(SharedGameConfig::new(GameConfig::with_defaults()));

        // Day, 10s before the 300 boundary: night is coming.
        consumer.process(&tick(290, true));

        let warnings: Vec<_> = recorder
            .events()
            .into_iter()
            .filter(|e| e.kind() == "day_night_cycle")
            .collect();
        assert_eq!(
            warnings,
            vec![DomainEvent::DayNightCycle {
                cycle_type: CycleType::Night,
                seconds: 10,
                current_time: 290,
            }]
        );

        // Same upcoming transition: deduplicated.
        consumer.process(&tick(295, true));
        assert_eq!(kinds_of(&recorder, "day_night_cycle"), 1);
    }

    #[test]
    fn day_night_warning_suppressed_inside_transition_threshold() {
        let (mut consumer, recorder) =
            consumer_with(SharedGameConfig::new(GameConfig::with_defaults()));

        // 298/299 are within the warning window; 300 is the boundary
        // itself, which belongs to the transition announcement.
        consumer.process(&tick(300, false));

        assert_eq!(kinds_of(&recorder, "day_night_cycle"), 0);
        assert_eq!(kinds_of(&recorder, "day_night_transition"), 1);
    }

    #[test]
    fn stack_alert_fires_at_configured_second_from_minute_four() {
        let (mut consumer, recorder) = consumer_with(config_with(
            keys::STACK_TIMING,
            TimingSettings {
                warning_seconds: 7,
                ..TimingSettings::default()
            },
        ));

        // warn_at = 53 - 7 = 46. Minute 3 is too early.
        consumer.process(&tick(3 * 60 + 46, true));
        assert_eq!(kinds_of(&recorder, "stack_timing"), 0);

        consumer.process(&tick(4 * 60 + 45, true));
        consumer.process(&tick(4 * 60 + 46, true));
        consumer.process(&tick(4 * 60 + 47, true));

        let stack: Vec<_> = recorder
            .events()
            .into_iter()
            .filter(|e| e.kind() == "stack_timing")
            .collect();
        assert_eq!(
            stack,
            vec![DomainEvent::StackTiming {
                seconds: 7,
                minute: 4,
                current_time: 286,
            }]
        );

        // Next minute fires again; throttle has elapsed in game time.
        consumer.process(&tick(5 * 60 + 46, true));
        assert_eq!(kinds_of(&recorder, "stack_timing"), 2);
    }

    #[test]
    fn stack_warning_larger_than_pull_second_clamps_to_zero() {
        let (mut consumer, recorder) = consumer_with(config_with(
            keys::STACK_TIMING,
            TimingSettings {
                warning_seconds: 90,
                ..TimingSettings::default()
            },
        ));

        consumer.process(&tick(4 * 60, true));
        let stack: Vec<_> = recorder
            .events()
            .into_iter()
            .filter(|e| e.kind() == "stack_timing")
            .collect();
        assert_eq!(
            stack,
            vec![DomainEvent::StackTiming {
                seconds: 53,
                minute: 4,
                current_time: 240,
            }]
        );
    }

    #[test]
    fn negative_clock_time_is_ignored() {
        let (mut consumer, recorder) =
            consumer_with(SharedGameConfig::new(GameConfig::with_defaults()));

        consumer.process(&tick(-30, true));
        assert_eq!(recorder.count(), 0);
    }

    #[test]
    fn disabled_events_are_silent_individually() {
        let mut config = GameConfig::with_defaults();
        config.timings.insert(
            keys::CATAPULT_TIMING.to_string(),
            TimingSettings {
                enabled: false,
                ..TimingSettings::default()
            },
        );
        let (mut consumer, recorder) = consumer_with(SharedGameConfig::new(config));

        // 290 would trigger both catapult and day/night warnings.
        consumer.process(&tick(290, true));

        assert_eq!(kinds_of(&recorder, "catapult_timing"), 0);
        assert_eq!(kinds_of(&recorder, "day_night_cycle"), 1);
    }

    #[test]
    fn missing_timings_default_to_enabled() {
        let (mut consumer, recorder) =
            consumer_with(SharedGameConfig::new(GameConfig::default()));

        consumer.process(&tick(290, true));
        assert_eq!(kinds_of(&recorder, "catapult_timing"), 1);
        assert_eq!(kinds_of(&recorder, "day_night_cycle"), 1);
    }
}
