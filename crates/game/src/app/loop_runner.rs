use std::process::ExitCode;
use std::time::{Duration, Instant};

use tracing::info;

use super::bootstrap::AppWiring;
use super::sim::{Simulation, TickOutcome};

#[derive(Debug)]
struct MetricsAccumulator {
    interval_start: Instant,
    interval_ticks: u64,
    ticks: u32,
    events: u32,
    deleted: usize,
}

#[derive(Debug, Clone, Copy, PartialEq)]
struct LoopMetricsSnapshot {
    tps: f32,
    events: u32,
    deleted: usize,
}

impl MetricsAccumulator {
    fn new(interval_ticks: u64) -> Self {
        Self {
            interval_start: Instant::now(),
            interval_ticks: interval_ticks.max(1),
            ticks: 0,
            events: 0,
            deleted: 0,
        }
    }

    fn record_tick(&mut self, outcome: TickOutcome) {
        self.ticks = self.ticks.saturating_add(1);
        self.events = self.events.saturating_add(outcome.events.dispatched);
        self.deleted = self.deleted.saturating_add(outcome.deleted);
    }

    fn maybe_snapshot(&mut self, now: Instant) -> Option<LoopMetricsSnapshot> {
        if u64::from(self.ticks) < self.interval_ticks {
            return None;
        }
        let elapsed = now.saturating_duration_since(self.interval_start);
        let snapshot = LoopMetricsSnapshot {
            tps: ticks_per_second(self.ticks, elapsed),
            events: self.events,
            deleted: self.deleted,
        };
        self.interval_start = now;
        self.ticks = 0;
        self.events = 0;
        self.deleted = 0;
        Some(snapshot)
    }
}

fn ticks_per_second(ticks: u32, elapsed: Duration) -> f32 {
    let seconds = elapsed.as_secs_f32();
    if seconds <= f32::EPSILON {
        return 0.0;
    }
    ticks as f32 / seconds
}

/// Runs the configured number of fixed steps as fast as the host allows.
/// Simulated time advances by exactly one step per tick.
pub(crate) fn run(app: AppWiring) -> ExitCode {
    let config = app.config;
    let mut simulation = Simulation::new(&config);
    info!(
        target_tps = config.target_tps,
        ticks = config.ticks,
        fixed_dt_ms = simulation.tick_duration().as_secs_f64() * 1_000.0,
        "loop_config"
    );

    simulation.start();
    let started = Instant::now();
    let mut metrics = MetricsAccumulator::new(u64::from(config.target_tps));
    for _ in 0..config.ticks {
        let outcome = simulation.tick();
        metrics.record_tick(outcome);
        if let Some(snapshot) = metrics.maybe_snapshot(Instant::now()) {
            let stats = simulation.stats();
            info!(
                sim_time = %simulation.now(),
                tps = snapshot.tps,
                events = snapshot.events,
                deleted = snapshot.deleted,
                entity_count = simulation.state().world.entity_count(),
                pending_events = simulation.pending_events(),
                navigation_nodes = simulation.navigation_nodes(),
                games_started = stats.games_started,
                "loop_metrics"
            );
        }
    }

    let stats = simulation.stats();
    info!(
        ticks = simulation.ticks(),
        sim_time = %simulation.now(),
        wall_time_ms = started.elapsed().as_millis() as u64,
        games_started = stats.games_started,
        players_died = stats.players_died,
        bombs_planted = stats.bombs_planted,
        bombs_exploded = stats.bombs_exploded,
        crates_destroyed = stats.crates_destroyed,
        pickups_collected = stats.pickups_collected,
        npcs_destroyed = stats.npcs_destroyed,
        "shutdown"
    );
    ExitCode::SUCCESS
}
