//! # gsi-pipeline
//!
//! Event distribution and stateful detection for Dota 2 Game State
//! Integration (GSI) snapshots.
//!
//! The pipeline turns a periodic raw game-state snapshot stream into
//! discrete, debounced domain events: rune spawn warnings, timing
//! windows, hero-metric transitions, and map-state transitions,
//! delivered to pluggable sinks.
//!
//! ## Architecture
//!
//! ```text
//!                      ┌──────────────────────────────────────────┐
//!  ingest(bytes) ────▶ │ EventBus                                 │
//!                      │  try_send per subscriber, drop-on-full   │
//!                      └──────┬──────────┬──────────┬─────────┬───┘
//!                             ▼          ▼          ▼         ▼
//!                         ┌──────┐   ┌──────┐   ┌──────┐  ┌────────┐
//!                         │ Map  │   │ Hero │   │ Rune │  │ Timing │
//!                         └──┬───┘   └──┬───┘   └──┬───┘  └───┬────┘
//!                            └──────────┴─────┬────┴──────────┘
//!                                             ▼
//!                                    Handler sinks (DomainEvent)
//! ```
//!
//! Each consumer owns a bounded queue and private last-tick state, and
//! runs on its own tokio task. The publisher never blocks: a slow
//! consumer fills its own queue and drops ticks, counted by the
//! injected [`PipelineMetrics`]. Consumers share the parsed JSON tree
//! of each tick through [`ParsedSnapshot`], which parses lazily and at
//! most once per tick.
//!
//! ## Usage
//!
//! ```no_run
//! use std::sync::Arc;
//! use gsi_pipeline::{
//!     ConsumerManager, DomainEvent, EventBus, GameConfig, Handler,
//!     PipelineMetrics, SharedGameConfig,
//! };
//!
//! struct LogSink;
//!
//! impl Handler for LogSink {
//!     fn handle(&self, event: &DomainEvent) {
//!         println!("{}", event.kind());
//!     }
//! }
//!
//! #[tokio::main]
//! async fn main() {
//!     let metrics = Arc::new(PipelineMetrics::new());
//!     let bus = EventBus::new(metrics.clone());
//!     let config = SharedGameConfig::new(GameConfig::with_defaults());
//!     let sinks: gsi_pipeline::HandlerList = vec![Arc::new(LogSink)];
//!
//!     let mut manager = ConsumerManager::new();
//!     manager.add_map_consumer(&bus, sinks.clone());
//!     manager.add_hero_consumer(&bus, sinks.clone());
//!     manager.add_rune_consumer(&bus, sinks.clone(), config.clone());
//!     manager.add_timing_consumer(&bus, sinks, config);
//!     manager.start_all();
//!
//!     // One call per GSI push from the HTTP layer.
//!     bus.ingest(br#"{"map":{"clock_time":165}}"#.to_vec());
//!
//!     manager.stop_all();
//!     bus.close();
//! }
//! ```

pub mod bus;
pub mod config;
pub mod consumers;
pub mod event;
pub mod metrics;
pub mod snapshot;

// Re-export main types for convenience
pub use bus::{EventBus, SUBSCRIBER_QUEUE_CAPACITY};
pub use config::{GameConfig, SharedGameConfig, TimingConfigSource, TimingSettings};
pub use consumers::{
    ConsumerManager, HeroConsumer, MapConsumer, RuneConsumer, TickConsumer, TimingConsumer,
};
pub use event::{CycleType, DomainEvent, Handler, HandlerList, TickEvent};
pub use metrics::{MetricsSnapshot, PipelineMetrics};
pub use snapshot::ParsedSnapshot;
