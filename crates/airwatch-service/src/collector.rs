//! Background simulator feeding synthetic readings into the pipeline.
//!
//! Useful for demos and dashboard development when no sensor is attached.
//! Each parameter follows a bounded random walk, with occasional particulate
//! spikes so the dashboard has something to flag.

use std::sync::Arc;
use std::time::Duration;

use rand::Rng;
use tokio::time::interval;
use tracing::{debug, info, warn};

use airwatch_types::ReadingInput;

use crate::state::{AppState, now};

/// Chance per tick of a particulate spike.
const SPIKE_PROBABILITY: f64 = 0.02;

/// Bounded random walk for one parameter.
#[derive(Debug, Clone, Copy)]
struct Walk {
    value: f64,
    step: f64,
    min: f64,
    max: f64,
}

impl Walk {
    const fn new(value: f64, step: f64, min: f64, max: f64) -> Self {
        Self {
            value,
            step,
            min,
            max,
        }
    }

    fn advance<R: Rng>(&mut self, rng: &mut R) -> f64 {
        let delta = rng.random_range(-self.step..=self.step);
        self.value = (self.value + delta).clamp(self.min, self.max);
        self.value
    }
}

/// Generator of plausible indoor readings.
#[derive(Debug, Clone)]
pub struct ReadingSimulator {
    walks: [Walk; 6],
}

impl Default for ReadingSimulator {
    fn default() -> Self {
        // Wire order: temperature, humidity, co2, pm25, pm10, light.
        Self {
            walks: [
                Walk::new(22.0, 0.3, 5.0, 40.0),
                Walk::new(45.0, 1.0, 15.0, 90.0),
                Walk::new(600.0, 25.0, 400.0, 3000.0),
                Walk::new(12.0, 1.5, 0.0, 300.0),
                Walk::new(25.0, 2.0, 0.0, 400.0),
                Walk::new(800.0, 60.0, 0.0, 4095.0),
            ],
        }
    }
}

impl ReadingSimulator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Produce the next reading. The timestamp is left for the pipeline to assign.
    pub fn next_input<R: Rng>(&mut self, rng: &mut R) -> ReadingInput {
        let mut values = [0.0; 6];
        for (slot, walk) in values.iter_mut().zip(self.walks.iter_mut()) {
            *slot = walk.advance(rng);
        }

        if rng.random_bool(SPIKE_PROBABILITY) {
            let pm25 = &mut self.walks[3];
            pm25.value = (pm25.value + rng.random_range(30.0..120.0)).min(pm25.max);
            values[3] = pm25.value;
            let pm10 = &mut self.walks[4];
            pm10.value = (pm10.value + rng.random_range(40.0..150.0)).min(pm10.max);
            values[4] = pm10.value;
        }

        let [temperature, humidity, co2, pm25, pm10, light] = values;
        ReadingInput {
            timestamp: None,
            temperature: Some(temperature),
            humidity: Some(humidity),
            co2: Some(co2),
            pm25: Some(pm25),
            pm10: Some(pm10),
            light: Some(light),
        }
    }
}

/// Background collector that submits simulated readings on an interval.
pub struct Collector {
    state: Arc<AppState>,
}

impl Collector {
    /// Create a new collector.
    pub fn new(state: Arc<AppState>) -> Self {
        Self { state }
    }

    /// Start the simulator if it is enabled in configuration.
    ///
    /// Returns immediately; collection happens in the background until
    /// [`crate::state::CollectorState::signal_stop`] is called.
    pub fn start(&self) {
        let config = &self.state.config.simulator;
        if !config.enabled {
            info!("Simulator disabled; waiting for readings on POST /api/readings");
            return;
        }

        info!("Starting simulator ({}s interval)", config.interval_secs);
        let state = Arc::clone(&self.state);
        let period = Duration::from_secs(config.interval_secs);
        tokio::spawn(async move {
            simulate(state, period).await;
        });
    }
}

async fn simulate(state: Arc<AppState>, period: Duration) {
    let mut simulator = ReadingSimulator::new();
    let mut stop_rx = state.collector.subscribe_stop();
    let mut ticker = interval(period);
    state.collector.set_running(true);

    loop {
        tokio::select! {
            _ = ticker.tick() => {}
            _ = stop_rx.changed() => {
                if *stop_rx.borrow() {
                    break;
                }
                continue;
            }
        }

        let input = simulator.next_input(&mut rand::rng());
        match state.pipeline.submit(&input, now()) {
            Ok(event) => {
                state.collector.record(true);
                debug!(
                    "Simulated reading: co2={:.0} status={}",
                    event.reading.co2, event.analysis.status
                );
            }
            Err(e) => {
                state.collector.record(false);
                warn!("Simulated reading rejected: {}", e);
            }
        }
    }

    state.collector.set_running(false);
    info!(
        "Simulator stopped after {} readings ({} rejected)",
        state.collector.submitted(),
        state.collector.rejected()
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    #[test]
    fn test_simulated_readings_are_valid() {
        let validator = airwatch_core::ReadingValidator::default();
        let mut simulator = ReadingSimulator::new();
        let mut rng = StdRng::seed_from_u64(7);

        for _ in 0..1000 {
            let input = simulator.next_input(&mut rng);
            let validated = validator.validate(&input, now()).unwrap();
            let r = validated.reading;
            assert!((5.0..=40.0).contains(&r.temperature));
            assert!((15.0..=90.0).contains(&r.humidity));
            assert!((400.0..=3000.0).contains(&r.co2));
            assert!((0.0..=300.0).contains(&r.pm25));
            assert!((0.0..=400.0).contains(&r.pm10));
            assert!((0.0..=4095.0).contains(&r.light));
        }
    }

    #[test]
    fn test_walk_stays_in_bounds() {
        let mut walk = Walk::new(0.0, 10.0, 0.0, 5.0);
        let mut rng = StdRng::seed_from_u64(1);
        for _ in 0..100 {
            let v = walk.advance(&mut rng);
            assert!((0.0..=5.0).contains(&v));
        }
    }

    #[tokio::test]
    async fn test_disabled_simulator_does_not_start() {
        let state = AppState::new(Config::default()).unwrap();
        Collector::new(Arc::clone(&state)).start();
        tokio::task::yield_now().await;
        assert!(!state.collector.is_running());
        assert!(state.pipeline.is_empty());
    }

    #[tokio::test]
    async fn test_simulator_submits_and_stops() {
        let state = AppState::new(Config::default()).unwrap();

        let handle = tokio::spawn(simulate(Arc::clone(&state), Duration::from_millis(5)));
        while state.pipeline.len() < 3 {
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
        state.collector.signal_stop();
        handle.await.unwrap();

        assert!(!state.collector.is_running());
        assert!(state.collector.submitted() >= 3);
    }
}
