use std::time::Duration;

use engine::world::{BombData, PickupKind};
use engine::{
    BombExploded, BombPlanted, CollisionWorld, CrateDestroyed, DeleteEntity, EntityCollide,
    EntityFlag, EntityId, EntityType, EventScheduler, FireTerminated, GameEvent, GameEventQueue,
    GameStarted, MoveDirection, ParticleDestroyed, PickedPickupItem, PlayerDied, PlayerMoved,
    TypeMask, Vec2, World,
};
use rand::Rng;
use tracing::{debug, info, trace, warn};

use super::arena;
use super::state::GameState;

pub(crate) type GameScheduler = EventScheduler<GameEvent, GameState>;

const BOMB_TILE: u32 = 12;
const FIRE_TILESET: &str = "fire.json";
const PARTICLE_TILESET: &str = "particles.json";

/// Binds every gameplay listener. Registration order is dispatch order.
pub(crate) fn register_handlers(scheduler: &mut GameScheduler) {
    scheduler.register_listener::<GameStarted, _>(on_game_started);
    scheduler.register_listener::<PlayerMoved, _>(on_player_moved);
    scheduler.register_listener::<BombPlanted, _>(on_bomb_planted);
    scheduler.register_listener::<BombExploded, _>(on_bomb_exploded);
    scheduler.register_listener::<FireTerminated, _>(on_fire_terminated);
    scheduler.register_listener::<EntityCollide, _>(on_entity_collide);
    scheduler.register_listener::<PickedPickupItem, _>(on_picked_pickup_item);
    scheduler.register_listener::<CrateDestroyed, _>(on_crate_destroyed);
    scheduler.register_listener::<ParticleDestroyed, _>(on_particle_destroyed);
    scheduler.register_listener::<DeleteEntity, _>(on_delete_entity);
    scheduler.register_listener::<PlayerDied, _>(on_player_died);
}

fn on_game_started(_: &GameStarted, queue: &mut GameEventQueue, state: &mut GameState) {
    queue.clear();
    state.world.clear();
    let layout = arena::populate(&mut state.world, &state.rules, &mut state.rng);
    state.stats.games_started = state.stats.games_started.saturating_add(1);
    info!(
        game = state.stats.games_started,
        entity_count = state.world.entity_count(),
        crates = layout.crates,
        pickups = layout.pickups,
        npcs = layout.npcs.len(),
        "game_started"
    );
}

fn movement_category(direction: MoveDirection) -> u32 {
    match direction {
        MoveDirection::Up => 0,
        MoveDirection::Right => 1,
        MoveDirection::Down => 2,
        MoveDirection::Left => 3,
    }
}

fn on_player_moved(event: &PlayerMoved, _: &mut GameEventQueue, state: &mut GameState) {
    let Some(actor) = state.world.find_entity_mut(event.actor) else {
        debug!(actor = event.actor.0, "move_for_missing_entity");
        return;
    };
    trace!(
        actor = event.actor.0,
        direction = ?event.direction,
        accelerate = event.accelerate,
        "actor_moved"
    );
    actor.controller.set(event.direction, event.accelerate);
    let category = movement_category(event.direction);
    if event.accelerate {
        actor.set_animation(category);
    } else if !actor.controller.any() {
        actor.set_tile(category);
    }
}

fn on_bomb_planted(event: &BombPlanted, queue: &mut GameEventQueue, state: &mut GameState) {
    let Some(planter) = state.world.find_entity_mut(event.actor) else {
        debug!(actor = event.actor.0, "bomb_planted_by_missing_entity");
        return;
    };
    if planter.is_marked_for_destruction() {
        return;
    }
    let origin = planter.aabb.origin.round();
    let player_data = match planter.player_data_mut() {
        Ok(data) => data,
        Err(err) => {
            warn!(error = %err, "bomb_planted_payload_mismatch");
            return;
        }
    };
    if player_data.available_bomb_count == 0 {
        trace!(actor = event.actor.0, "no_bombs_available");
        return;
    }
    player_data.available_bomb_count -= 1;
    let prototype = player_data.bomb_prototype;

    let bomb = state
        .world
        .create(EntityType::Bomb)
        .set_origin(origin)
        .set_tile(BOMB_TILE)
        .set_flag(EntityFlag::Frozen, true)
        .set_payload(BombData {
            parent: Some(event.actor),
            prototype,
        })
        .id();
    queue.enqueue_after(BombExploded { actor: bomb }, state.rules.bomb_fuse);
    state.stats.bombs_planted = state.stats.bombs_planted.saturating_add(1);
    debug!(bomb = bomb.0, x = origin.x, y = origin.y, "bomb_planted");
}

fn on_bomb_exploded(event: &BombExploded, queue: &mut GameEventQueue, state: &mut GameState) {
    let Some(bomb) = state.world.find_entity_mut(event.actor) else {
        debug!(actor = event.actor.0, "exploded_bomb_missing");
        return;
    };
    let data = match bomb.bomb_data() {
        Ok(data) => *data,
        Err(err) => {
            warn!(error = %err, "bomb_exploded_payload_mismatch");
            return;
        }
    };
    let center = bomb.aabb.origin;
    bomb.mark_for_destruction();

    let parent = match data.parent {
        Some(id) => state.world.find_entity_mut(id),
        None => None,
    };
    if let Some(parent) = parent {
        match parent.player_data_mut() {
            Ok(player_data) => {
                player_data.available_bomb_count = player_data.available_bomb_count.saturating_add(1)
            }
            Err(err) => warn!(error = %err, "bomb_parent_payload_mismatch"),
        }
    }

    let cells = blast_cells(&state.world, center, data.prototype.range);
    for origin in &cells {
        let fire = state
            .world
            .create(EntityType::Fire)
            .set_tileset(FIRE_TILESET)
            .set_animation(0)
            .set_origin(*origin)
            .id();
        let lifetime = jittered(
            &mut state.rng,
            state.rules.fire_lifetime_mean,
            state.rules.fire_lifetime_jitter,
        );
        queue.enqueue_after(FireTerminated { actor: fire }, lifetime);
    }
    state.stats.bombs_exploded = state.stats.bombs_exploded.saturating_add(1);
    debug!(bomb = event.actor.0, fires = cells.len(), "bomb_exploded");
}

/// Bomb cell plus a cross of up to `range` cells per direction. An arm stops
/// before static terrain and at the first crate it reaches.
pub(crate) fn blast_cells(world: &World, center: Vec2, range: u32) -> Vec<Vec2> {
    let crates = TypeMask::empty().with(EntityType::Crate);
    let half_cell = Vec2::new(0.5, 0.5);
    let mut cells = vec![center];
    for direction in MoveDirection::ALL {
        let step = engine::world::direction_vector(direction);
        for distance in 1..=range {
            let origin = center + step * distance as f32;
            let middle = origin + half_cell;
            if world.is_out_of_bounds(middle) || world.has_static_collision(middle) {
                break;
            }
            cells.push(origin);
            if world.is_cell_occupied(middle, crates) {
                break;
            }
        }
    }
    cells
}

fn jittered(rng: &mut impl Rng, mean: Duration, jitter: Duration) -> Duration {
    if jitter.is_zero() {
        return mean;
    }
    let jitter_ms = jitter.as_millis() as i64;
    let offset = rng.gen_range(-jitter_ms..=jitter_ms);
    let mean_ms = mean.as_millis() as i64;
    Duration::from_millis((mean_ms + offset).max(0) as u64)
}

fn on_fire_terminated(event: &FireTerminated, _: &mut GameEventQueue, state: &mut GameState) {
    mark_if_present(&mut state.world, event.actor);
}

fn on_particle_destroyed(
    event: &ParticleDestroyed,
    _: &mut GameEventQueue,
    state: &mut GameState,
) {
    mark_if_present(&mut state.world, event.actor);
}

fn on_delete_entity(event: &DeleteEntity, _: &mut GameEventQueue, state: &mut GameState) {
    if let Some(entity) = state.world.find_entity(event.actor) {
        if entity.entity_type() == EntityType::Npc && !entity.is_marked_for_destruction() {
            state.stats.npcs_destroyed = state.stats.npcs_destroyed.saturating_add(1);
        }
    }
    mark_if_present(&mut state.world, event.actor);
}

fn mark_if_present(world: &mut World, id: EntityId) {
    match world.find_entity_mut(id) {
        Some(entity) => {
            entity.mark_for_destruction();
        }
        None => debug!(actor = id.0, "entity_already_gone"),
    }
}

/// Ids of the pair ordered as `(first, second)` by type, if the collision is
/// between those two types.
fn typed_pair(
    world: &World,
    event: &EntityCollide,
    first: EntityType,
    second: EntityType,
) -> Option<(EntityId, EntityId)> {
    let type_a = world.find_entity(event.a)?.entity_type();
    let type_b = world.find_entity(event.b)?.entity_type();
    if (type_a, type_b) == (first, second) {
        Some((event.a, event.b))
    } else if (type_b, type_a) == (first, second) {
        Some((event.b, event.a))
    } else {
        None
    }
}

fn on_entity_collide(event: &EntityCollide, queue: &mut GameEventQueue, state: &mut GameState) {
    let world = &state.world;
    if !world.all_exist(&[event.a, event.b]) {
        debug!(a = event.a.0, b = event.b.0, "collision_with_missing_entity");
        return;
    }

    if let Some((pickup, player)) = typed_pair(world, event, EntityType::Pickup, EntityType::Player)
    {
        queue.enqueue(PickedPickupItem { pickup, player });
    } else if let Some((_, player)) = typed_pair(world, event, EntityType::Fire, EntityType::Player)
    {
        queue.enqueue(PlayerDied { actor: player });
    } else if let Some((_, npc_player)) =
        typed_pair(world, event, EntityType::Npc, EntityType::Player)
    {
        queue.enqueue(PlayerDied { actor: npc_player });
    } else if let Some((_, crate_id)) =
        typed_pair(world, event, EntityType::Fire, EntityType::Crate)
    {
        queue.enqueue(CrateDestroyed { actor: crate_id });
    } else if let Some((_, npc)) = typed_pair(world, event, EntityType::Fire, EntityType::Npc) {
        queue.enqueue(DeleteEntity { actor: npc });
    } else if let Some((_, pickup)) =
        typed_pair(world, event, EntityType::Fire, EntityType::Pickup)
    {
        let fireproof = world
            .find_entity(pickup)
            .map_or(true, |entity| entity.has_flag(EntityFlag::Fireproof));
        if !fireproof {
            queue.enqueue(DeleteEntity { actor: pickup });
        }
    }
}

fn on_picked_pickup_item(
    event: &PickedPickupItem,
    _: &mut GameEventQueue,
    state: &mut GameState,
) {
    let world = &mut state.world;
    if !world.all_exist(&[event.pickup, event.player]) {
        return;
    }
    let kind = match world.find_entity(event.pickup) {
        Some(pickup) if pickup.is_marked_for_destruction() => return,
        Some(pickup) => match pickup.pickup_data() {
            Ok(data) => data.kind,
            Err(err) => {
                warn!(error = %err, "pickup_payload_mismatch");
                return;
            }
        },
        None => return,
    };
    let Some(player) = world.find_entity_mut(event.player) else {
        return;
    };
    let player_data = match player.player_data_mut() {
        Ok(data) => data,
        Err(err) => {
            warn!(error = %err, "pickup_collector_payload_mismatch");
            return;
        }
    };
    match kind {
        PickupKind::IncreaseBombCount => {
            player_data.available_bomb_count = player_data.available_bomb_count.saturating_add(1)
        }
        PickupKind::IncreaseBombRange => {
            player_data.bomb_prototype.range = player_data.bomb_prototype.range.saturating_add(1)
        }
        PickupKind::FreezeForSomeTime => {
            warn!(pickup = event.pickup.0, kind = ?kind, "pickup_effect_undefined")
        }
    }
    mark_if_present(world, event.pickup);
    state.stats.pickups_collected = state.stats.pickups_collected.saturating_add(1);
    debug!(pickup = event.pickup.0, kind = ?kind, "pickup_collected");
}

fn on_crate_destroyed(event: &CrateDestroyed, queue: &mut GameEventQueue, state: &mut GameState) {
    let Some(crate_entity) = state.world.find_entity_mut(event.actor) else {
        return;
    };
    if crate_entity.is_marked_for_destruction() {
        return;
    }
    crate_entity.mark_for_destruction();
    let origin = crate_entity.aabb.origin;

    let particle = state
        .world
        .create(EntityType::Particle)
        .set_tileset(PARTICLE_TILESET)
        .set_animation(0)
        .set_origin(origin)
        .set_flag(EntityFlag::Unbounded, true)
        .id();
    queue.enqueue_after(
        ParticleDestroyed { actor: particle },
        state.rules.particle_lifetime,
    );
    state.stats.crates_destroyed = state.stats.crates_destroyed.saturating_add(1);
}

fn on_player_died(event: &PlayerDied, queue: &mut GameEventQueue, state: &mut GameState) {
    let Some(player) = state.world.find_entity_mut(event.actor) else {
        return;
    };
    if player.is_marked_for_destruction() {
        return;
    }
    player.mark_for_destruction();
    state.stats.players_died = state.stats.players_died.saturating_add(1);
    queue.enqueue_after(GameStarted, state.rules.restart_delay);
    info!(
        player = event.actor.0,
        restart_in_ms = state.rules.restart_delay.as_millis() as u64,
        "game_over"
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::app::sim::state::GameRules;
    use engine::world::{NpcData, PickupData, PlayerData};
    use engine::{GameEventKind, OccupancyMap2D, PhysicsConfig};

    const FRAME: Duration = Duration::from_millis(16);

    fn bare_state() -> GameState {
        let mut state = GameState::new(GameRules::default(), PhysicsConfig::default(), 1);
        state.world.update_boundary(Vec2::ZERO, Vec2::new(7.0, 7.0));
        let mut terrain = OccupancyMap2D::new([7, 7], false);
        terrain.set([3, 1], true).expect("in range");
        state.world.update_static_collisions(terrain);
        state
    }

    fn scheduler() -> GameScheduler {
        let mut scheduler = GameScheduler::new();
        register_handlers(&mut scheduler);
        scheduler
    }

    fn spawn_player(state: &mut GameState, origin: Vec2) -> EntityId {
        state
            .world
            .create(EntityType::Player)
            .set_origin(origin)
            .set_payload(PlayerData::default())
            .id()
    }

    #[test]
    fn game_started_populates_world() {
        let mut state = GameState::new(GameRules::default(), PhysicsConfig::default(), 1);
        let mut scheduler = scheduler();
        scheduler.enqueue(GameStarted);
        let stats = scheduler.dispatch(&mut state);
        assert_eq!(stats.dispatched, 1);
        assert!(state.world.player_id().is_some());
        assert_eq!(state.stats.games_started, 1);
    }

    #[test]
    fn player_moved_sets_and_releases_intent() {
        let mut state = bare_state();
        let player = spawn_player(&mut state, Vec2::ZERO);
        let mut scheduler = scheduler();
        scheduler.enqueue(PlayerMoved {
            actor: player,
            accelerate: true,
            direction: MoveDirection::Right,
        });
        scheduler.dispatch(&mut state);
        let entity = state.world.get_entity(player).expect("player");
        assert!(entity.controller.is_moving(MoveDirection::Right));
        assert_eq!(entity.tile.animation.map(|a| a.sequence), Some(1));

        scheduler.enqueue(PlayerMoved {
            actor: player,
            accelerate: false,
            direction: MoveDirection::Right,
        });
        scheduler.dispatch(&mut state);
        let entity = state.world.get_entity(player).expect("player");
        assert!(!entity.controller.any());
        assert_eq!(entity.tile.tile_index, 1);
        assert_eq!(entity.tile.animation, None);
    }

    #[test]
    fn bomb_lifecycle_spends_and_returns_bomb() {
        let mut state = bare_state();
        let player = spawn_player(&mut state, Vec2::new(2.1, 1.9));
        let mut scheduler = scheduler();
        scheduler.enqueue(BombPlanted { actor: player });
        scheduler.enqueue(BombPlanted { actor: player });
        scheduler.dispatch(&mut state);

        assert_eq!(state.world.count_of(EntityType::Bomb), 1);
        let bomb = state
            .world
            .iter()
            .find(|entity| entity.entity_type() == EntityType::Bomb)
            .expect("bomb");
        assert_eq!(bomb.aabb.origin, Vec2::new(2.0, 2.0));
        assert!(bomb.has_flag(EntityFlag::Frozen));
        let player_data = state
            .world
            .get_entity(player)
            .expect("player")
            .player_data()
            .expect("payload");
        assert_eq!(player_data.available_bomb_count, 0);
        assert_eq!(
            scheduler.queue().count_pending(GameEventKind::BombExploded),
            1
        );

        scheduler.advance(state.rules.bomb_fuse - FRAME);
        scheduler.dispatch(&mut state);
        assert_eq!(state.world.count_of(EntityType::Fire), 0);

        scheduler.advance(FRAME);
        scheduler.dispatch(&mut state);
        // range 1: centre plus four neighbours, none blocked.
        assert_eq!(state.world.count_of(EntityType::Fire), 5);
        let player_data = state
            .world
            .get_entity(player)
            .expect("player")
            .player_data()
            .expect("payload");
        assert_eq!(player_data.available_bomb_count, 1);
        assert_eq!(state.stats.bombs_exploded, 1);

        let latest = state.rules.fire_lifetime_mean + state.rules.fire_lifetime_jitter;
        scheduler.advance(latest);
        scheduler.dispatch(&mut state);
        state.world.delete_marked_entities();
        assert_eq!(state.world.count_of(EntityType::Fire), 0);
        assert_eq!(state.world.count_of(EntityType::Bomb), 0);
    }

    #[test]
    fn blast_stops_at_terrain_and_first_crate() {
        let mut state = bare_state();
        state
            .world
            .create(EntityType::Crate)
            .set_origin(Vec2::new(1.0, 1.0))
            .set_flag(EntityFlag::Frozen, true);
        let cells = blast_cells(&state.world, Vec2::new(2.0, 1.0), 3);
        assert!(cells.contains(&Vec2::new(2.0, 1.0)));
        // right arm hits the pillar at (3, 1) immediately.
        assert!(!cells.contains(&Vec2::new(3.0, 1.0)));
        assert!(!cells.contains(&Vec2::new(4.0, 1.0)));
        // left arm burns the crate and stops there.
        assert!(cells.contains(&Vec2::new(1.0, 1.0)));
        assert!(!cells.contains(&Vec2::new(0.0, 1.0)));
        // up arm leaves the arena after one cell.
        assert!(cells.contains(&Vec2::new(2.0, 0.0)));
        assert!(cells.contains(&Vec2::new(2.0, 4.0)));
        assert_eq!(cells.len(), 1 + 1 + 1 + 3);
    }

    #[test]
    fn collisions_map_to_gameplay_events() {
        let mut state = bare_state();
        let player = spawn_player(&mut state, Vec2::ZERO);
        let pickup = state
            .world
            .create(EntityType::Pickup)
            .set_payload(PickupData {
                kind: PickupKind::IncreaseBombRange,
            })
            .id();
        let fire = state.world.create(EntityType::Fire).id();
        let crate_id = state.world.create(EntityType::Crate).id();
        let npc = state
            .world
            .create(EntityType::Npc)
            .set_payload(NpcData::default())
            .id();

        let mut queue = GameEventQueue::default();
        for (a, b) in [(pickup, player), (fire, crate_id), (npc, fire)] {
            on_entity_collide(&EntityCollide { a, b }, &mut queue, &mut state);
        }
        let produced: Vec<GameEvent> = std::iter::from_fn(|| queue.pop_ready()).collect();
        assert_eq!(
            produced,
            vec![
                GameEvent::from(PickedPickupItem { pickup, player }),
                GameEvent::from(CrateDestroyed { actor: crate_id }),
                GameEvent::from(DeleteEntity { actor: npc }),
            ]
        );

        on_entity_collide(
            &EntityCollide { a: fire, b: player },
            &mut queue,
            &mut state,
        );
        assert_eq!(
            queue.pop_ready(),
            Some(GameEvent::from(PlayerDied { actor: player }))
        );
    }

    #[test]
    fn fireproof_pickups_survive_fire() {
        let mut state = bare_state();
        let pickup = state
            .world
            .create(EntityType::Pickup)
            .set_flag(EntityFlag::Fireproof, true)
            .id();
        let fire = state.world.create(EntityType::Fire).id();
        let mut queue = GameEventQueue::default();
        on_entity_collide(&EntityCollide { a: pickup, b: fire }, &mut queue, &mut state);
        assert!(queue.is_empty());
    }

    #[test]
    fn pickup_applies_once() {
        let mut state = bare_state();
        let player = spawn_player(&mut state, Vec2::ZERO);
        let pickup = state
            .world
            .create(EntityType::Pickup)
            .set_payload(PickupData {
                kind: PickupKind::IncreaseBombRange,
            })
            .id();
        let mut scheduler = scheduler();
        scheduler.enqueue(PickedPickupItem { pickup, player });
        scheduler.enqueue(PickedPickupItem { pickup, player });
        scheduler.dispatch(&mut state);

        let data = state
            .world
            .get_entity(player)
            .expect("player")
            .player_data()
            .expect("payload");
        assert_eq!(data.bomb_prototype.range, 2);
        assert!(state
            .world
            .get_entity(pickup)
            .expect("pickup")
            .is_marked_for_destruction());
        assert_eq!(state.stats.pickups_collected, 1);
    }

    #[test]
    fn crate_destruction_leaves_a_short_lived_particle() {
        let mut state = bare_state();
        let crate_id = state
            .world
            .create(EntityType::Crate)
            .set_origin(Vec2::new(4.0, 4.0))
            .id();
        let mut scheduler = scheduler();
        scheduler.enqueue(CrateDestroyed { actor: crate_id });
        scheduler.enqueue(CrateDestroyed { actor: crate_id });
        scheduler.dispatch(&mut state);
        assert_eq!(state.world.count_of(EntityType::Particle), 1);
        assert_eq!(state.stats.crates_destroyed, 1);

        scheduler.advance(state.rules.particle_lifetime);
        scheduler.dispatch(&mut state);
        state.world.delete_marked_entities();
        assert_eq!(state.world.count_of(EntityType::Particle), 0);
        assert!(!state.world.has_entity(crate_id));
    }

    #[test]
    fn player_death_schedules_one_restart() {
        let mut state = bare_state();
        let player = spawn_player(&mut state, Vec2::ZERO);
        let mut scheduler = scheduler();
        scheduler.enqueue(PlayerDied { actor: player });
        scheduler.enqueue(PlayerDied { actor: player });
        scheduler.dispatch(&mut state);
        assert_eq!(state.stats.players_died, 1);
        assert_eq!(
            scheduler.queue().count_pending(GameEventKind::GameStarted),
            1
        );

        scheduler.advance(state.rules.restart_delay);
        scheduler.dispatch(&mut state);
        assert_eq!(state.stats.games_started, 1);
        let new_player = state.world.player_id().expect("respawned player");
        assert_ne!(new_player, player);
    }

    #[test]
    fn handlers_ignore_vanished_entities() {
        let mut state = bare_state();
        let mut scheduler = scheduler();
        let ghost = EntityId(1_000);
        scheduler.enqueue(FireTerminated { actor: ghost });
        scheduler.enqueue(BombExploded { actor: ghost });
        scheduler.enqueue(DeleteEntity { actor: ghost });
        scheduler.enqueue(EntityCollide { a: ghost, b: ghost });
        let stats = scheduler.dispatch(&mut state);
        assert_eq!(stats.dispatched, 4);
        assert_eq!(stats.dropped, 0);
        assert_eq!(state.world.entity_count(), 0);
    }

    #[test]
    fn payload_mismatch_is_not_fatal() {
        let mut state = bare_state();
        let imposter = state.world.create(EntityType::Bomb).id();
        let mut scheduler = scheduler();
        scheduler.enqueue(BombExploded { actor: imposter });
        scheduler.enqueue(BombPlanted { actor: imposter });
        scheduler.dispatch(&mut state);
        assert!(state.world.has_entity(imposter));
        assert_eq!(state.world.count_of(EntityType::Fire), 0);
    }
}
