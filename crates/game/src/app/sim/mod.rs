mod arena;
mod autopilot;
mod controller;
mod npc;
mod state;

use std::time::Duration;

use engine::{DispatchStats, GameStarted, Timestamp};

use self::autopilot::Autopilot;
use self::controller::{register_handlers, GameScheduler};
use self::npc::NpcController;
pub(crate) use self::state::{GameRules, GameState, GameStats};
use crate::app::config::SimulationConfig;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub(crate) struct TickOutcome {
    pub(crate) events: DispatchStats,
    pub(crate) deleted: usize,
}

/// The whole game driven by a simulated clock, one fixed step per [`tick`].
///
/// [`tick`]: Simulation::tick
pub(crate) struct Simulation {
    scheduler: GameScheduler,
    state: GameState,
    npcs: NpcController,
    autopilot: Option<Autopilot>,
    tick_duration: Duration,
    ticks: u64,
}

impl Simulation {
    pub(crate) fn new(config: &SimulationConfig) -> Self {
        let mut scheduler = GameScheduler::new();
        register_handlers(&mut scheduler);
        let state = GameState::new(
            GameRules::from_config(config),
            config.physics,
            config.seed,
        );
        let tps = config.target_tps.max(1);
        Self {
            scheduler,
            state,
            npcs: NpcController::new(),
            autopilot: config.autopilot.then(Autopilot::new),
            tick_duration: Duration::from_secs_f64(1.0 / f64::from(tps)),
            ticks: 0,
        }
    }

    pub(crate) fn start(&mut self) {
        self.scheduler.enqueue(GameStarted);
    }

    /// Dispatches due events, steps the world, drops marked entities and lets
    /// the NPCs and the autopilot queue their decisions for the next tick.
    pub(crate) fn tick(&mut self) -> TickOutcome {
        let events = self.scheduler.dispatch(&mut self.state);
        self.state
            .world
            .update(self.tick_duration, self.scheduler.queue_mut());
        let deleted = self.state.world.delete_marked_entities();
        self.npcs.update(&mut self.state, self.scheduler.queue_mut());
        if let Some(autopilot) = self.autopilot.as_mut() {
            autopilot.update(&mut self.state, self.scheduler.queue_mut());
        }
        self.scheduler.advance(self.tick_duration);
        self.ticks = self.ticks.saturating_add(1);
        TickOutcome { events, deleted }
    }

    pub(crate) fn state(&self) -> &GameState {
        &self.state
    }

    pub(crate) fn stats(&self) -> GameStats {
        self.state.stats
    }

    pub(crate) fn now(&self) -> Timestamp {
        self.scheduler.now()
    }

    pub(crate) fn ticks(&self) -> u64 {
        self.ticks
    }

    pub(crate) fn pending_events(&self) -> usize {
        self.scheduler.pending()
    }

    pub(crate) fn navigation_nodes(&self) -> usize {
        self.npcs.mesh().node_count()
    }

    pub(crate) fn tick_duration(&self) -> Duration {
        self.tick_duration
    }
}
