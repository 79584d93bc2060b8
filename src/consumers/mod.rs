//! Domain consumers and their lifecycle.
//!
//! Each consumer owns a private subscription queue and last-tick state,
//! and runs as one tokio task driven by a shared receive loop. The loop
//! waits on either the next tick or a stop signal; on tick it builds a
//! [`ParsedSnapshot`] and hands it to the consumer's diff function, on
//! stop (or bus close) it exits. Consumers never share state, so their
//! processing needs no locking.

mod hero;
mod map;
mod rune;
mod timing;

pub use hero::HeroConsumer;
pub use map::MapConsumer;
pub use rune::RuneConsumer;
pub use timing::TimingConsumer;

use std::sync::Arc;

use tokio::sync::{mpsc, watch};
use tracing::{debug, info};

use crate::bus::EventBus;
use crate::config::TimingConfigSource;
use crate::event::{DomainEvent, HandlerList, TickEvent};
use crate::metrics::PipelineMetrics;
use crate::snapshot::ParsedSnapshot;

/// Game state value during which rune and timing schedules run.
pub(crate) const GAME_IN_PROGRESS: &str = "DOTA_GAMERULES_STATE_GAME_IN_PROGRESS";

/// Per-tick diff logic implemented by each domain consumer.
pub trait TickConsumer: Send + 'static {
    fn name(&self) -> &'static str;

    /// Diff this tick against private state and forward any derived
    /// events to the handler list.
    fn process(&mut self, snapshot: &ParsedSnapshot);
}

/// Forward one event to every sink, synchronously.
pub(crate) fn dispatch(handlers: &HandlerList, event: DomainEvent) {
    debug!(event_type = event.kind(), "domain event detected");
    for handler in handlers {
        handler.handle(&event);
    }
}

/// A consumer registered with the manager, together with its lifecycle
/// handles. Start and stop each run exactly once.
struct ManagedConsumer {
    name: &'static str,
    /// Consumed by `start`; `None` afterwards.
    idle: Option<(Box<dyn TickConsumer>, mpsc::Receiver<Arc<TickEvent>>)>,
    /// Present only while running; consumed by `stop`.
    stop: Option<watch::Sender<bool>>,
    metrics: Arc<PipelineMetrics>,
}

impl ManagedConsumer {
    fn new(
        consumer: Box<dyn TickConsumer>,
        queue: mpsc::Receiver<Arc<TickEvent>>,
        metrics: Arc<PipelineMetrics>,
    ) -> Self {
        Self {
            name: consumer.name(),
            idle: Some((consumer, queue)),
            stop: None,
            metrics,
        }
    }

    /// Spawn the receive loop. Starting twice is a fatal usage error.
    fn start(&mut self) {
        let (mut consumer, mut queue) = self
            .idle
            .take()
            .expect("consumer already started");
        let (stop_tx, mut stop_rx) = watch::channel(false);
        let metrics = self.metrics.clone();
        let name = self.name;

        tokio::spawn(async move {
            debug!(consumer = name, "consumer loop started");
            loop {
                tokio::select! {
                    received = queue.recv() => match received {
                        Some(event) => {
                            let snapshot = ParsedSnapshot::new(event, metrics.clone());
                            consumer.process(&snapshot);
                        }
                        None => {
                            debug!(consumer = name, "queue closed, consumer loop exiting");
                            break;
                        }
                    },
                    _ = stop_rx.changed() => {
                        if *stop_rx.borrow() {
                            break;
                        }
                    }
                }
            }
        });

        self.stop = Some(stop_tx);
        info!(consumer = name, "consumer started");
    }

    /// Signal the receive loop to exit. Stopping a consumer that is not
    /// running is a fatal usage error.
    fn stop(&mut self) {
        let stop = self.stop.take().expect("consumer is not running");
        let _ = stop.send(true);
        info!(consumer = self.name, "consumer stopped");
    }
}

/// Constructs, starts, and stops the consumer set.
///
/// Consumers have no inter-dependencies; registration order only
/// affects start/stop log ordering.
#[derive(Default)]
pub struct ConsumerManager {
    consumers: Vec<ManagedConsumer>,
}

impl ConsumerManager {
    pub fn new() -> Self {
        Self::default()
    }

    fn register(&mut self, bus: &EventBus, consumer: Box<dyn TickConsumer>) {
        let queue = bus.subscribe();
        self.consumers
            .push(ManagedConsumer::new(consumer, queue, bus.metrics().clone()));
    }

    pub fn add_map_consumer(&mut self, bus: &EventBus, handlers: HandlerList) {
        self.register(bus, Box::new(MapConsumer::new(handlers)));
    }

    pub fn add_hero_consumer(&mut self, bus: &EventBus, handlers: HandlerList) {
        self.register(bus, Box::new(HeroConsumer::new(handlers)));
    }

    pub fn add_rune_consumer(
        &mut self,
        bus: &EventBus,
        handlers: HandlerList,
        config: Arc<dyn TimingConfigSource>,
    ) {
        self.register(bus, Box::new(RuneConsumer::new(handlers, config)));
    }

    pub fn add_timing_consumer(
        &mut self,
        bus: &EventBus,
        handlers: HandlerList,
        config: Arc<dyn TimingConfigSource>,
    ) {
        self.register(bus, Box::new(TimingConsumer::new(handlers, config)));
    }

    /// Start every consumer in registration order.
    pub fn start_all(&mut self) {
        info!(count = self.consumers.len(), "starting all consumers");
        for consumer in &mut self.consumers {
            consumer.start();
        }
    }

    /// Stop every consumer in registration order.
    pub fn stop_all(&mut self) {
        info!(count = self.consumers.len(), "stopping all consumers");
        for consumer in &mut self.consumers {
            consumer.stop();
        }
    }

    /// Number of registered consumers.
    pub fn count(&self) -> usize {
        self.consumers.len()
    }
}


#[cfg(test)]
mod tests {
    use super::testutil::Recorder;
    use super::*;
    use serde_json::json;

    fn bus() -> EventBus {
        EventBus::new(Arc::new(PipelineMetrics::new()))
    }

    #[test]
    fn count_reports_registered_consumers() {
        let bus = bus();
        let mut manager = ConsumerManager::new();
        assert_eq!(manager.count(), 0);

        manager.add_map_consumer(&bus, vec![]);
        manager.add_hero_consumer(&bus, vec![]);
        assert_eq!(manager.count(), 2);
        assert_eq!(bus.subscriber_count(), 2);
    }

    #[tokio::test]
    async fn started_consumer_processes_published_ticks() {
        let bus = bus();
        let recorder = Recorder::new();
        let mut manager = ConsumerManager::new();
        manager.add_map_consumer(&bus, vec![recorder.clone()]);
        manager.start_all();

        bus.ingest(
            json!({"map": {"game_state": "HERO_SELECTION"}})
                .to_string()
                .into_bytes(),
        );
        bus.ingest(
            json!({"map": {"game_state": "PRE_GAME"}})
                .to_string()
                .into_bytes(),
        );

        // Let the consumer task drain its queue.
        for _ in 0..20 {
            tokio::task::yield_now().await;
        }

        assert_eq!(recorder.kinds(), vec!["game_state_change"]);
        manager.stop_all();
    }

    #[tokio::test]
    async fn stop_all_terminates_consumer_tasks() {
        let bus = bus();
        let recorder = Recorder::new();
        let mut manager = ConsumerManager::new();
        manager.add_map_consumer(&bus, vec![recorder.clone()]);
        manager.start_all();
        manager.stop_all();

        for _ in 0..20 {
            tokio::task::yield_now().await;
        }
        // The task exited and released its handler list.
        assert_eq!(Arc::strong_count(&recorder), 1);
    }

    #[tokio::test]
    async fn bus_close_terminates_consumer_tasks() {
        let bus = bus();
        let recorder = Recorder::new();
        let mut manager = ConsumerManager::new();
        manager.add_hero_consumer(&bus, vec![recorder.clone()]);
        manager.start_all();

        bus.close();

        for _ in 0..20 {
            tokio::task::yield_now().await;
        }
        assert_eq!(Arc::strong_count(&recorder), 1);
    }

    #[tokio::test]
    #[should_panic(expected = "consumer is not running")]
    async fn double_stop_is_fatal() {
        let bus = bus();
        let mut manager = ConsumerManager::new();
        manager.add_map_consumer(&bus, vec![]);
        manager.start_all();
        manager.stop_all();
        manager.stop_all();
    }

    #[tokio::test]
    #[should_panic(expected = "consumer already started")]
    async fn double_start_is_fatal() {
        let bus = bus();
        let mut manager = ConsumerManager::new();
        manager.add_map_consumer(&bus, vec![]);
        manager.start_all();
        manager.start_all();
    }
}
