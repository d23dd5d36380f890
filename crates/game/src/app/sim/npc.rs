use engine::world::{Controller, NpcGoal};
use engine::{
    EntityId, EntityType, GameEventQueue, MoveDirection, NavigationMesh, PlayerMoved, Vec2, World,
};
use rand::Rng;
use tracing::{debug, trace, warn};

use super::state::GameState;

#[derive(Debug, Default)]
pub(crate) struct NpcController {
    mesh: NavigationMesh,
}

impl NpcController {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn mesh(&self) -> &NavigationMesh {
        &self.mesh
    }

    pub(crate) fn update(&mut self, state: &mut GameState, queue: &mut GameEventQueue) {
        let revision = state.world.static_revision();
        self.mesh.update_if_changed(&state.world, revision);

        let npcs: Vec<EntityId> = state
            .world
            .iter()
            .filter(|entity| {
                entity.entity_type() == EntityType::Npc && !entity.is_marked_for_destruction()
            })
            .map(|entity| entity.id())
            .collect();

        for id in npcs {
            let goal = match state.world.find_entity(id).map(|npc| npc.npc_data()) {
                Some(Ok(data)) => data.goal,
                Some(Err(err)) => {
                    warn!(error = %err, "npc_payload_mismatch");
                    continue;
                }
                None => continue,
            };
            match goal {
                NpcGoal::RandomWalk => random_walk(state, id, queue),
                NpcGoal::ChasingTarget => chase(&mut state.world, &self.mesh, id),
            }
        }
    }
}

/// Releases every held direction other than `direction` and presses
/// `direction`, all through `PlayerMoved` so the handlers see each change.
pub(crate) fn steer(
    queue: &mut GameEventQueue,
    actor: EntityId,
    controller: &Controller,
    direction: MoveDirection,
) {
    for held in MoveDirection::ALL {
        if held != direction && controller.is_moving(held) {
            queue.enqueue(PlayerMoved {
                actor,
                accelerate: false,
                direction: held,
            });
        }
    }
    if !controller.is_moving(direction) {
        queue.enqueue(PlayerMoved {
            actor,
            accelerate: true,
            direction,
        });
    }
}

pub(crate) fn random_direction(rng: &mut impl Rng) -> MoveDirection {
    MoveDirection::ALL[rng.gen_range(0..MoveDirection::ALL.len())]
}

fn random_walk(state: &mut GameState, id: EntityId, queue: &mut GameEventQueue) {
    let interval = state.rules.npc_turn_interval_ticks;
    let Some(npc) = state.world.find_entity_mut(id) else {
        return;
    };
    let Ok(data) = npc.npc_data_mut() else {
        return;
    };
    if data.ticks_until_turn > 0 {
        data.ticks_until_turn -= 1;
        return;
    }
    data.ticks_until_turn = interval;

    let direction = random_direction(&mut state.rng);
    trace!(npc = id.0, direction = ?direction, "npc_turned");
    steer(queue, id, &npc.controller, direction);
}

fn chase(world: &mut World, mesh: &NavigationMesh, id: EntityId) {
    let target = match world.find_entity(id).map(|npc| npc.npc_data()) {
        Some(Ok(data)) => data.target,
        _ => return,
    };
    let goal = target
        .and_then(|target| world.find_entity(target))
        .filter(|target| !target.is_marked_for_destruction())
        .map(|target| target.aabb.midpoint());

    let Some(npc) = world.find_entity_mut(id) else {
        return;
    };
    if npc.controller.animation_target.is_some() {
        return;
    }
    let position = npc.aabb.midpoint();
    let Ok(data) = npc.npc_data_mut() else {
        return;
    };

    if data.trajectory.is_empty() {
        let Some(goal) = goal else {
            return;
        };
        match mesh.compute_path(position, goal) {
            // First cell is the one the NPC stands on.
            Ok(path) => data.trajectory = path.into_iter().skip(1).collect(),
            Err(err) => {
                debug!(npc = id.0, error = %err, "npc_path_failed");
                return;
            }
        }
    }

    let next: Option<Vec2> = if data.trajectory.is_empty() {
        None
    } else {
        Some(data.trajectory.remove(0))
    };
    if let Some(next) = next {
        trace!(npc = id.0, x = next.x, y = next.y, "npc_step_planned");
        npc.controller.animation_target = Some(next);
    }
}
