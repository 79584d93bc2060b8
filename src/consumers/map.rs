//! Map-state transitions: game state, day/night flag, and score.

use crate::consumers::{dispatch, TickConsumer};
use crate::event::{DomainEvent, HandlerList};
use crate::snapshot::ParsedSnapshot;

/// Emits `game_state_change`, `day_night_change`, and `score_change`
/// when the corresponding map fields move between ticks. The first
/// observed tick only seeds state and emits nothing.
pub struct MapConsumer {
    handlers: HandlerList,
    last_game_state: String,
    last_daytime: bool,
    last_radiant_score: i64,
    last_dire_score: i64,
}

impl MapConsumer {
    pub fn new(handlers: HandlerList) -> Self {
        Self {
            handlers,
            last_game_state: String::new(),
            last_daytime: false,
            last_radiant_score: 0,
            last_dire_score: 0,
        }
    }
}

impl TickConsumer for MapConsumer {
    fn name(&self) -> &'static str {
        "map"
    }

    fn process(&mut self, snapshot: &ParsedSnapshot) {
        let game_state = snapshot.get_str("map.game_state");
        let daytime = snapshot.get_bool("map.daytime");
        let radiant_score = snapshot.get_i64("map.radiant_score");
        let dire_score = snapshot.get_i64("map.dire_score");

        let seen_before = !self.last_game_state.is_empty();

        if !game_state.is_empty() && game_state != self.last_game_state && seen_before {
            dispatch(
                &self.handlers,
                DomainEvent::GameStateChange {
                    from: self.last_game_state.clone(),
                    to: game_state.to_string(),
                },
            );
        }

        if daytime != self.last_daytime && seen_before {
            dispatch(&self.handlers, DomainEvent::DayNightChange { daytime });
        }

        if (radiant_score != self.last_radiant_score || dire_score != self.last_dire_score)
            && seen_before
        {
            dispatch(
                &self.handlers,
                DomainEvent::ScoreChange {
                    radiant_score,
                    dire_score,
                    radiant_diff: radiant_score - self.last_radiant_score,
                    dire_diff: dire_score - self.last_dire_score,
                },
            );
        }

        // Baselines update unconditionally, every tick.
        self.last_game_state = game_state.to_string();
        self.last_daytime = daytime;
        self.last_radiant_score = radiant_score;
        self.last_dire_score = dire_score;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::consumers::testutil::{snapshot, Recorder};
    use serde_json::json;

    fn map_tick(state: &str, daytime: bool, radiant: i64, dire: i64) -> ParsedSnapshot {
        snapshot(json!({
            "map": {
                "game_state": state,
                "daytime": daytime,
                "radiant_score": radiant,
                "dire_score": dire,
            }
        }))
    }

    #[test]
    fn first_tick_emits_nothing() {
        let recorder = Recorder::new();
        let mut consumer = MapConsumer::new(vec![recorder.clone()]);

        consumer.process(&map_tick("HERO_SELECTION", true, 0, 0));
        assert_eq!(recorder.count(), 0);
    }

    #[test]
    fn state_change_fires_once_with_from_and_to() {
        let recorder = Recorder::new();
        let mut consumer = MapConsumer::new(vec![recorder.clone()]);

        consumer.process(&map_tick("HERO_SELECTION", true, 0, 0));
        consumer.process(&map_tick("PRE_GAME", true, 0, 0));

        assert_eq!(
            recorder.events(),
            vec![DomainEvent::GameStateChange {
                from: "HERO_SELECTION".into(),
                to: "PRE_GAME".into(),
            }]
        );

        // Unchanged state emits nothing further.
        consumer.process(&map_tick("PRE_GAME", true, 0, 0));
        assert_eq!(recorder.count(), 1);
    }

    #[test]
    fn daytime_flip_requires_observed_state() {
        let recorder = Recorder::new();
        let mut consumer = MapConsumer::new(vec![recorder.clone()]);

        // First tick flips daytime off the default but must stay silent.
        consumer.process(&map_tick("IN_PROGRESS", true, 0, 0));
        assert_eq!(recorder.count(), 0);

        consumer.process(&map_tick("IN_PROGRESS", false, 0, 0));
        assert_eq!(
            recorder.events(),
            vec![DomainEvent::DayNightChange { daytime: false }]
        );
    }

    #[test]
    fn score_change_carries_diffs_for_both_teams() {
        let recorder = Recorder::new();
        let mut consumer = MapConsumer::new(vec![recorder.clone()]);

        consumer.process(&map_tick("IN_PROGRESS", true, 3, 1));
        consumer.process(&map_tick("IN_PROGRESS", true, 5, 2));

        assert_eq!(
            recorder.events(),
            vec![DomainEvent::ScoreChange {
                radiant_score: 5,
                dire_score: 2,
                radiant_diff: 2,
                dire_diff: 1,
            }]
        );
    }

    #[test]
    fn absent_map_object_clears_the_baseline() {
        let recorder = Recorder::new();
        let mut consumer = MapConsumer::new(vec![recorder.clone()]);

        consumer.process(&map_tick("IN_PROGRESS", false, 0, 0));
        consumer.process(&snapshot(json!({})));
        assert_eq!(recorder.count(), 0);

        // Baseline cleared, so the next tick is treated as first again.
        consumer.process(&map_tick("POST_GAME", false, 0, 0));
        assert_eq!(recorder.count(), 0);
    }
}
