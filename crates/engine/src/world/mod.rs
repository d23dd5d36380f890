mod entity;
mod payload;
mod physics;

use std::collections::BTreeMap;

use thiserror::Error;
use tracing::debug;

use crate::events::{EntityCollide, GameEventQueue};
use crate::geometry::{Aabb, Vec2};
use crate::grid::OccupancyMap2D;

pub use entity::{
    direction_vector, AnimationState, Controller, Entity, EntityFlag, EntityId,
    EntityIdAllocator, EntityType, FlagSet, TileState, TypeMask,
};
pub use payload::{
    BombData, BombPrototype, EntityPayload, NpcData, NpcGoal, PayloadKind, PayloadMismatch,
    PickupData, PickupKind, PlayerData, WeaponType,
};
pub use physics::PhysicsConfig;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum WorldError {
    #[error("entity {0} does not exist")]
    EntityNotFound(EntityId),
}

/// Spatial queries the navigation layer needs from a world.
pub trait CollisionWorld {
    fn world_boundaries(&self) -> Aabb;

    fn is_out_of_bounds(&self, position: Vec2) -> bool {
        !self.world_boundaries().contains(position)
    }

    /// True when the cell containing `position` is static terrain, or when a
    /// live entity whose type is in `blocking_types` overlaps that cell.
    fn is_cell_occupied(&self, position: Vec2, blocking_types: TypeMask) -> bool;

    /// Static terrain only. Positions outside the boundary never collide.
    fn has_static_collision(&self, position: Vec2) -> bool;
}

/// Owns every live entity plus the static terrain they move through.
#[derive(Debug)]
pub struct World {
    allocator: EntityIdAllocator,
    entities: BTreeMap<EntityId, Entity>,
    boundary: Aabb,
    static_collisions: OccupancyMap2D<bool>,
    static_revision: u64,
    physics: PhysicsConfig,
}

impl Default for World {
    fn default() -> Self {
        Self::new(PhysicsConfig::default())
    }
}

impl World {
    pub fn new(physics: PhysicsConfig) -> Self {
        Self {
            allocator: EntityIdAllocator::default(),
            entities: BTreeMap::new(),
            boundary: Aabb::new(Vec2::ZERO, Vec2::ZERO),
            static_collisions: OccupancyMap2D::default(),
            static_revision: 0,
            physics,
        }
    }

    pub fn physics(&self) -> &PhysicsConfig {
        &self.physics
    }

    pub fn create(&mut self, entity_type: EntityType) -> &mut Entity {
        let id = self.allocator.allocate();
        self.entities
            .entry(id)
            .or_insert_with(|| Entity::new(id, entity_type))
    }

    pub fn get_entity(&self, id: EntityId) -> Result<&Entity, WorldError> {
        self.entities.get(&id).ok_or(WorldError::EntityNotFound(id))
    }

    pub fn get_entity_mut(&mut self, id: EntityId) -> Result<&mut Entity, WorldError> {
        self.entities
            .get_mut(&id)
            .ok_or(WorldError::EntityNotFound(id))
    }

    pub fn find_entity(&self, id: EntityId) -> Option<&Entity> {
        self.entities.get(&id)
    }

    pub fn find_entity_mut(&mut self, id: EntityId) -> Option<&mut Entity> {
        self.entities.get_mut(&id)
    }

    pub fn has_entity(&self, id: EntityId) -> bool {
        self.entities.contains_key(&id)
    }

    pub fn all_exist(&self, ids: &[EntityId]) -> bool {
        ids.iter().all(|id| self.has_entity(*id))
    }

    /// First player entity by id, marked entities included.
    pub fn player_id(&self) -> Option<EntityId> {
        self.entities
            .values()
            .find(|entity| entity.entity_type() == EntityType::Player)
            .map(Entity::id)
    }

    pub fn entity_count(&self) -> usize {
        self.entities.len()
    }

    pub fn count_of(&self, entity_type: EntityType) -> usize {
        self.entities
            .values()
            .filter(|entity| entity.entity_type() == entity_type)
            .count()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Entity> + '_ {
        self.entities.values()
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut Entity> + '_ {
        self.entities.values_mut()
    }

    pub fn ids(&self) -> Vec<EntityId> {
        self.entities.keys().copied().collect()
    }

    /// Removes every entity. Terrain, boundary and the id sequence are kept.
    pub fn clear(&mut self) {
        self.entities.clear();
    }

    pub fn delete_marked_entities(&mut self) -> usize {
        let before = self.entities.len();
        self.entities
            .retain(|_, entity| !entity.is_marked_for_destruction());
        let removed = before - self.entities.len();
        if removed > 0 {
            debug!(removed, remaining = self.entities.len(), "marked_entities_deleted");
        }
        removed
    }

    /// Pairwise overlap test between live entities of different types. Each
    /// overlapping pair is enqueued once as [`EntityCollide`] with the lower id
    /// first. Returns the number of pairs found.
    pub fn detect_collisions(&self, queue: &mut GameEventQueue) -> usize {
        let live: Vec<&Entity> = self
            .entities
            .values()
            .filter(|entity| !entity.is_marked_for_destruction())
            .collect();

        let mut found = 0;
        for (index, a) in live.iter().enumerate() {
            for b in &live[index + 1..] {
                if a.entity_type() == b.entity_type() {
                    continue;
                }
                if a.aabb.collide(&b.aabb) {
                    debug!(a = a.id().0, b = b.id().0, "entity_collision_detected");
                    queue.enqueue(EntityCollide { a: a.id(), b: b.id() });
                    found += 1;
                }
            }
        }
        found
    }

    /// Replaces the static terrain. Cell `(x, y)` covers the unit square at
    /// `boundary.origin + (x, y)`.
    pub fn update_static_collisions(&mut self, static_collisions: OccupancyMap2D<bool>) {
        self.static_collisions = static_collisions;
        self.bump_static_revision();
    }

    pub fn update_boundary(&mut self, origin: Vec2, size: Vec2) {
        self.boundary = Aabb::new(origin, size);
        self.bump_static_revision();
    }

    pub fn static_collisions(&self) -> &OccupancyMap2D<bool> {
        &self.static_collisions
    }

    /// Increases whenever terrain or boundary are replaced.
    pub fn static_revision(&self) -> u64 {
        self.static_revision
    }

    fn bump_static_revision(&mut self) {
        self.static_revision = self.static_revision.wrapping_add(1);
        debug!(
            revision = self.static_revision,
            width = self.static_collisions.dims()[0],
            height = self.static_collisions.dims()[1],
            "static_layout_changed"
        );
    }

    fn static_cell_of(&self, position: Vec2) -> Option<[u32; 2]> {
        if self.is_out_of_bounds(position) {
            return None;
        }
        let local = (position - self.boundary.origin).floor();
        if local.x < 0.0 || local.y < 0.0 {
            return None;
        }
        Some([local.x as u32, local.y as u32])
    }
}

impl CollisionWorld for World {
    fn world_boundaries(&self) -> Aabb {
        self.boundary
    }

    fn is_cell_occupied(&self, position: Vec2, blocking_types: TypeMask) -> bool {
        if self.has_static_collision(position) {
            return true;
        }
        if blocking_types.is_empty() {
            return false;
        }
        let cell = Aabb::new(position.floor(), Vec2::ONE);
        self.entities.values().any(|entity| {
            !entity.is_marked_for_destruction()
                && blocking_types.contains(entity.entity_type())
                && entity.aabb.collide(&cell)
        })
    }

    fn has_static_collision(&self, position: Vec2) -> bool {
        self.static_cell_of(position)
            .and_then(|cell| self.static_collisions.get(cell))
            .copied()
            .unwrap_or(false)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::{EventSet, GameEvent, GameEventKind};

    fn walled_world() -> World {
        // 4x3 arena with a single wall cell at (2, 1).
        let mut world = World::new(PhysicsConfig::default());
        world.update_boundary(Vec2::ZERO, Vec2::new(4.0, 3.0));
        let mut terrain = OccupancyMap2D::new([4, 3], false);
        terrain.set([2, 1], true).expect("in range");
        world.update_static_collisions(terrain);
        world
    }

    #[test]
    fn ids_are_unique_and_monotonic() {
        let mut world = World::default();
        let a = world.create(EntityType::Fire).id();
        let b = world.create(EntityType::Fire).id();
        world.clear();
        let c = world.create(EntityType::Fire).id();
        assert!(a < b && b < c);
    }

    #[test]
    fn missing_entity_is_an_error() {
        let world = World::default();
        assert_eq!(
            world.get_entity(EntityId(42)).map(Entity::id),
            Err(WorldError::EntityNotFound(EntityId(42)))
        );
        assert!(world.find_entity(EntityId(42)).is_none());
    }

    #[test]
    fn marked_entity_survives_until_sweep() {
        let mut world = World::default();
        let id = world.create(EntityType::Crate).mark_for_destruction().id();
        assert!(world.has_entity(id));
        assert_eq!(world.iter().count(), 1);
        assert_eq!(world.delete_marked_entities(), 1);
        assert!(!world.has_entity(id));
        assert_eq!(world.entity_count(), 0);
    }

    #[test]
    fn all_exist_and_player_lookup() {
        let mut world = World::default();
        let crate_id = world.create(EntityType::Crate).id();
        let player = world.create(EntityType::Player).id();
        assert!(world.all_exist(&[crate_id, player]));
        assert!(world.all_exist(&[]));
        assert!(!world.all_exist(&[crate_id, EntityId(99)]));
        assert_eq!(world.player_id(), Some(player));
    }

    #[test]
    fn collisions_are_enqueued_once_per_pair() {
        let mut world = World::default();
        let player = world.create(EntityType::Player).id();
        let fire = world
            .create(EntityType::Fire)
            .set_origin(Vec2::new(0.5, 0.5))
            .id();
        world
            .create(EntityType::Fire)
            .set_origin(Vec2::new(0.25, 0.0));
        world
            .create(EntityType::Pickup)
            .set_origin(Vec2::new(2.25, 0.0));
        world
            .create(EntityType::Crate)
            .set_origin(Vec2::new(3.25, 0.0));

        let mut queue = GameEventQueue::default();
        // player hits both fires; the two fires share a type and the pickup
        // only touches the crate edge.
        assert_eq!(world.detect_collisions(&mut queue), 2);
        assert_eq!(queue.count_pending(GameEventKind::EntityCollide), 2);

        let first = queue.pop_ready().expect("collision event");
        assert_eq!(first.kind(), GameEventKind::EntityCollide);
        assert_eq!(
            first,
            GameEvent::EntityCollide(EntityCollide { a: player, b: fire })
        );
    }

    #[test]
    fn marked_entities_do_not_collide() {
        let mut world = World::default();
        world.create(EntityType::Player);
        world.create(EntityType::Fire).mark_for_destruction();
        let mut queue = GameEventQueue::default();
        assert_eq!(world.detect_collisions(&mut queue), 0);
        assert!(queue.is_empty());
    }

    #[test]
    fn static_queries_respect_boundary() {
        let world = walled_world();
        assert!(world.has_static_collision(Vec2::new(2.5, 1.5)));
        assert!(!world.has_static_collision(Vec2::new(1.5, 1.5)));
        assert!(!world.has_static_collision(Vec2::new(-1.0, 1.0)));
        assert!(!world.has_static_collision(Vec2::new(2.5, 7.0)));
        assert!(world.is_out_of_bounds(Vec2::new(4.5, 0.0)));
        assert!(!world.is_out_of_bounds(Vec2::new(3.5, 2.5)));
    }

    #[test]
    fn cell_occupancy_includes_masked_entities() {
        let mut world = walled_world();
        world.create(EntityType::Crate).set_origin(Vec2::new(0.0, 2.0));
        let crates = TypeMask::empty().with(EntityType::Crate);
        assert!(world.is_cell_occupied(Vec2::new(2.2, 1.7), TypeMask::empty()));
        assert!(world.is_cell_occupied(Vec2::new(0.5, 2.5), crates));
        assert!(!world.is_cell_occupied(Vec2::new(0.5, 2.5), TypeMask::empty()));
        assert!(!world.is_cell_occupied(Vec2::new(1.5, 2.5), crates));
    }

    #[test]
    fn static_changes_bump_revision() {
        let mut world = World::default();
        let initial = world.static_revision();
        world.update_boundary(Vec2::ZERO, Vec2::new(2.0, 2.0));
        world.update_static_collisions(OccupancyMap2D::new([2, 2], false));
        assert_eq!(world.static_revision(), initial + 2);
    }
}
