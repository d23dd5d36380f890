use engine::world::{NpcData, NpcGoal, PickupData, PickupKind, PlayerData};
use engine::{
    CollisionWorld, EntityFlag, EntityId, EntityType, OccupancyMap2D, TypeMask, Vec2, World,
};
use rand::seq::SliceRandom;
use rand::Rng;

use super::state::GameRules;

const ACTOR_SIZE: Vec2 = Vec2 { x: 0.8, y: 0.8 };
const PLAYER_TILESET: &str = "characters/farmer.json";
const NPC_TILESET: &str = "characters/skeleton.json";
const PLAYER_IDLE_TILE: u32 = 2;
const CRATE_TILE: u32 = 4;
const WALL_TILE: u32 = 5;
const PICKUP_TILE: u32 = 8;

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct ArenaLayout {
    pub(crate) player: EntityId,
    pub(crate) npcs: Vec<EntityId>,
    pub(crate) crates: usize,
    pub(crate) pickups: usize,
}

/// Pillars sit on every cell with two odd coordinates, like a classic arena.
pub(crate) fn is_pillar(x: u32, y: u32) -> bool {
    x % 2 == 1 && y % 2 == 1
}

/// Cells kept free around the player spawn at the top-left corner.
fn is_spawn_zone(x: u32, y: u32) -> bool {
    x + y <= 2
}

pub(crate) fn pillar_terrain(width: u32, height: u32) -> OccupancyMap2D<bool> {
    let mut terrain = OccupancyMap2D::new([width, height], false);
    for y in 0..height {
        for x in 0..width {
            if !is_pillar(x, y) {
                continue;
            }
            if let Some(cell) = terrain.get_mut([x, y]) {
                *cell = true;
            }
        }
    }
    terrain
}

/// Fills an empty world with terrain, the player, crates, pickups and NPCs.
/// Terrain is only replaced when the arena size changed.
pub(crate) fn populate(world: &mut World, rules: &GameRules, rng: &mut impl Rng) -> ArenaLayout {
    let (width, height) = (rules.arena_width, rules.arena_height);
    let size = Vec2::new(width as f32, height as f32);
    if world.world_boundaries().size != size {
        world.update_boundary(Vec2::ZERO, size);
        world.update_static_collisions(pillar_terrain(width, height));
    }

    for (x, y) in all_cells(width, height).filter(|(x, y)| is_pillar(*x, *y)) {
        world
            .create(EntityType::Wall)
            .set_origin(cell(x, y))
            .set_tile(WALL_TILE)
            .set_flag(EntityFlag::Frozen, true);
    }

    let player = world
        .create(EntityType::Player)
        .set_tileset(PLAYER_TILESET)
        .set_tile(PLAYER_IDLE_TILE)
        .set_origin(Vec2::ZERO)
        .set_size(ACTOR_SIZE)
        .set_max_speed(rules.player_speed)
        .blocked_by(EntityType::Crate)
        .set_payload(PlayerData::default())
        .id();

    let mut open: Vec<(u32, u32)> = all_cells(width, height)
        .filter(|(x, y)| !is_pillar(*x, *y) && !is_spawn_zone(*x, *y))
        .collect();
    open.shuffle(rng);

    let mut crates = 0;
    let mut free = Vec::with_capacity(open.len());
    for (x, y) in open {
        if rng.gen_bool(f64::from(rules.crate_density)) {
            world
                .create(EntityType::Crate)
                .set_origin(cell(x, y))
                .set_tile(CRATE_TILE)
                .set_flag(EntityFlag::Frozen, true);
            crates += 1;
        } else {
            free.push((x, y));
        }
    }

    let pickups = (rules.pickup_count as usize).min(free.len());
    for (index, (x, y)) in free.drain(..pickups).enumerate() {
        let kind = if index % 2 == 0 {
            PickupKind::IncreaseBombCount
        } else {
            PickupKind::IncreaseBombRange
        };
        world
            .create(EntityType::Pickup)
            .set_origin(cell(x, y))
            .set_tile(PICKUP_TILE)
            .set_payload(PickupData { kind });
    }

    // NPCs start as far from the player as the free cells allow.
    free.sort_by_key(|(x, y)| std::cmp::Reverse(x + y));
    let npcs = free
        .iter()
        .take(rules.npc_count as usize)
        .enumerate()
        .map(|(index, (x, y))| spawn_npc(world, rules, player, index, cell(*x, *y)))
        .collect();

    ArenaLayout {
        player,
        npcs,
        crates,
        pickups,
    }
}

/// The first NPC chases the player along the navigation mesh; the others
/// wander using movement intents.
fn spawn_npc(
    world: &mut World,
    rules: &GameRules,
    player: EntityId,
    index: usize,
    origin: Vec2,
) -> EntityId {
    let npc = world
        .create(EntityType::Npc)
        .set_tileset(NPC_TILESET)
        .set_origin(origin)
        .set_size(ACTOR_SIZE);
    if index == 0 {
        npc.set_max_speed(rules.chaser_speed)
            .set_flag(EntityFlag::AnimatedMovement, true)
            .set_payload(NpcData {
                goal: NpcGoal::ChasingTarget,
                target: Some(player),
                ..NpcData::default()
            });
    } else {
        npc.set_max_speed(rules.walker_speed)
            .set_collision_mask(TypeMask::from_iter([EntityType::Crate, EntityType::Bomb]))
            .set_payload(NpcData::default());
    }
    npc.id()
}

fn all_cells(width: u32, height: u32) -> impl Iterator<Item = (u32, u32)> {
    (0..height).flat_map(move |y| (0..width).map(move |x| (x, y)))
}

fn cell(x: u32, y: u32) -> Vec2 {
    Vec2::new(x as f32, y as f32)
}
