use engine::{BombPlanted, GameEventQueue};
use rand::Rng;
use tracing::trace;

use super::npc::{random_direction, steer};
use super::state::GameState;

const BOMB_CHANCE_PER_TURN: f64 = 0.25;

/// Stands in for keyboard input in headless runs: the player changes
/// direction every turn interval and sometimes drops a bomb.
#[derive(Debug, Default)]
pub(crate) struct Autopilot {
    ticks_until_turn: u32,
}

impl Autopilot {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn update(&mut self, state: &mut GameState, queue: &mut GameEventQueue) {
        let Some(player) = state.world.player_id() else {
            return;
        };
        let Some(entity) = state.world.find_entity(player) else {
            return;
        };
        if entity.is_marked_for_destruction() {
            return;
        }
        if self.ticks_until_turn > 0 {
            self.ticks_until_turn -= 1;
            return;
        }
        self.ticks_until_turn = state.rules.npc_turn_interval_ticks;

        let direction = random_direction(&mut state.rng);
        steer(queue, player, &entity.controller, direction);
        if state.rng.gen_bool(BOMB_CHANCE_PER_TURN) {
            trace!(player = player.0, "autopilot_bomb");
            queue.enqueue(BombPlanted { actor: player });
        }
    }
}
