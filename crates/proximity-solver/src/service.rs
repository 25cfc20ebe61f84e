//! The solver's two concurrent loops and the wiring that starts them.
//!
//! - The identity loop follows the `sensor.*` query and teaches the engine
//!   which entity each transmitter is attached to.
//! - The evaluation loop pulls signal-strength batches from a
//!   [`SampleSource`], runs one engine cycle per batch and pushes the
//!   resulting solutions as a single batch.
//!
//! When either feed completes or disconnects, that loop triggers shutdown
//! so the other winds down as well.

use std::time::Duration;

use proximity_core::{now_millis, ProximityEngine, RssObservation, SolutionBatch};
use proximity_world::aggregator;
use proximity_world::{
    AttributeStream, Error as WorldError, LinkMedianSource, QueryResults, SampleBatch, SampleSource,
    SolutionPublisher, SolutionSink, StreamBatch, SubscriptionRule, WorldModelClient,
};
use tokio::task::JoinHandle;
use tracing::{debug, error, info};

use crate::config::SolverConfig;
use crate::error::Result;
use crate::shutdown::{idle, Shutdown};

/// Entity pattern for both world model queries.
pub const ANY_URI: &str = ".*";

/// Attribute pattern announcing attached transmitters.
pub const SENSOR_ATTRIBUTES: &str = "sensor.*";

/// Attribute carrying per-link median RSS.
pub const LINK_MEDIAN_ATTRIBUTE: &str = "link median";

/// Register every sensor attribute in a batch. Returns how many were accepted.
pub async fn register_sensors(engine: &ProximityEngine, results: &QueryResults) -> usize {
    let mut registered = 0;
    for (uri, attributes) in results {
        for attr in attributes {
            if engine.register_sensor(uri, &attr.data).await.is_ok() {
                registered += 1;
            }
        }
    }
    registered
}

/// Follow the sensor query until it ends, disconnects or shutdown is
/// requested.
pub async fn run_identity_loop<S: AttributeStream>(
    mut stream: S,
    engine: ProximityEngine,
    shutdown: Shutdown,
    idle_wait: Duration,
) -> Result<()> {
    while !shutdown.is_triggered() {
        if !stream.is_connected() {
            error!("Sensor stream disconnected");
            shutdown.trigger();
            return Err(WorldError::Disconnected("sensor stream".into()).into());
        }
        match stream.next_batch().await {
            Ok(StreamBatch::Data(results)) => {
                let registered = register_sensors(&engine, &results).await;
                debug!(registered, "Processed sensor batch");
            }
            Ok(StreamBatch::Pending) => idle(&shutdown, idle_wait).await,
            Ok(StreamBatch::Completed) => {
                info!("Sensor stream complete");
                shutdown.trigger();
            }
            Err(e) => {
                error!("Sensor stream failed: {}", e);
                shutdown.trigger();
                return Err(e.into());
            }
        }
    }
    Ok(())
}

/// Run one engine cycle over `observations` and push its solutions.
///
/// Returns the number of solutions pushed. Nothing is pushed for an empty
/// batch or once shutdown has been requested.
pub async fn run_cycle<K: SolutionSink>(
    engine: &ProximityEngine,
    sink: &mut K,
    observations: Vec<RssObservation>,
    shutdown: &Shutdown,
) -> Result<usize> {
    let events = engine.process(observations, now_millis()).await;
    let Some(batch) = SolutionBatch::from_events(&events) else {
        return Ok(0);
    };
    if shutdown.is_triggered() {
        debug!(solutions = batch.len(), "Shutdown requested, not pushing");
        return Ok(0);
    }

    let pushed = batch.len();
    sink.push(batch).await?;
    Ok(pushed)
}

/// Pull samples, evaluate and push until the feed ends or shutdown is
/// requested.
pub async fn run_evaluation_loop<S: SampleSource, K: SolutionSink>(
    mut source: S,
    mut sink: K,
    engine: ProximityEngine,
    shutdown: Shutdown,
    idle_wait: Duration,
) -> Result<()> {
    while !shutdown.is_triggered() {
        match source.next_samples().await {
            Ok(SampleBatch::Samples(observations)) => {
                if let Err(e) = run_cycle(&engine, &mut sink, observations, &shutdown).await {
                    error!("Failed to push proximity solutions: {}", e);
                    shutdown.trigger();
                    return Err(e);
                }
            }
            Ok(SampleBatch::Pending) => idle(&shutdown, idle_wait).await,
            Ok(SampleBatch::Completed) => {
                info!("Sample feed complete");
                shutdown.trigger();
            }
            Err(e) => {
                error!("Sample feed failed: {}", e);
                shutdown.trigger();
                return Err(e.into());
            }
        }
    }
    Ok(())
}

/// A configured solver instance.
pub struct ProximitySolver {
    config: SolverConfig,
    engine: ProximityEngine,
}

impl ProximitySolver {
    pub fn new(config: SolverConfig) -> Self {
        let engine = ProximityEngine::new(config.threshold);
        Self { config, engine }
    }

    /// Engine handle (shared with the loops).
    pub fn engine(&self) -> ProximityEngine {
        self.engine.clone()
    }

    /// Connect to the world model (and aggregator, if configured) and run
    /// both loops until shutdown or a feed failure.
    pub async fn run(self, shutdown: Shutdown) -> Result<()> {
        let config = &self.config;
        info!("Proximity solver starting");
        info!("  World model client: {}", config.client_addr());
        info!("  World model solver: {}", config.solver_addr());
        info!("  Threshold: {}", config.threshold);

        let client = WorldModelClient::connect(config.client_addr()).await?;
        let sensors = client
            .stream_request(ANY_URI, &[SENSOR_ATTRIBUTES], config.sensor_interval)
            .await?;
        let publisher = SolutionPublisher::connect(config.solver_addr(), config.origin.clone()).await?;

        let evaluation = match &config.aggregator {
            Some(agg) => {
                info!("  Samples: aggregator at {}", agg.addr());
                let rule = SubscriptionRule::all(config.aggregator_interval.as_millis() as u64);
                let source = aggregator::subscribe(agg.addr(), rule).await?;
                self.spawn_evaluation(source, publisher, &shutdown)
            }
            None => {
                info!("  Samples: world model link medians");
                let links = client
                    .stream_request(ANY_URI, &[LINK_MEDIAN_ATTRIBUTE], config.rss_interval)
                    .await?;
                self.spawn_evaluation(LinkMedianSource::new(links), publisher, &shutdown)
            }
        };

        let identity = tokio::spawn(run_identity_loop(
            sensors,
            self.engine.clone(),
            shutdown.clone(),
            config.idle_wait,
        ));

        let (identity, evaluation) = tokio::join!(identity, evaluation);
        let stats = self.engine.stats().await;
        info!(
            named = stats.named_transmitters,
            tracked = stats.tracked_transmitters,
            "Proximity solver stopped"
        );

        // Keep the client connection open until both loops are done.
        drop(client);
        identity??;
        evaluation??;
        Ok(())
    }

    fn spawn_evaluation<S, K>(&self, source: S, sink: K, shutdown: &Shutdown) -> JoinHandle<Result<()>>
    where
        S: SampleSource + 'static,
        K: SolutionSink + 'static,
    {
        tokio::spawn(run_evaluation_loop(
            source,
            sink,
            self.engine.clone(),
            shutdown.clone(),
            self.config.idle_wait,
        ))
    }
}
