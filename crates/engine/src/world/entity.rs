use std::fmt;

use serde::{Deserialize, Serialize};

use super::payload::EntityPayload;
use crate::events::MoveDirection;
use crate::geometry::{Aabb, Vec2};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct EntityId(pub u64);

impl fmt::Display for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Hands out ids in increasing order; an id is never handed out twice.
#[derive(Debug, Default)]
pub struct EntityIdAllocator {
    next: u64,
}

impl EntityIdAllocator {
    pub fn allocate(&mut self) -> EntityId {
        let id = EntityId(self.next);
        self.next = self.next.saturating_add(1);
        id
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EntityType {
    Player,
    Npc,
    Bomb,
    Pickup,
    Fire,
    Crate,
    Particle,
    Wall,
}

impl EntityType {
    pub const ALL: [EntityType; 8] = [
        EntityType::Player,
        EntityType::Npc,
        EntityType::Bomb,
        EntityType::Pickup,
        EntityType::Fire,
        EntityType::Crate,
        EntityType::Particle,
        EntityType::Wall,
    ];

    const fn index(self) -> u32 {
        match self {
            EntityType::Player => 0,
            EntityType::Npc => 1,
            EntityType::Bomb => 2,
            EntityType::Pickup => 3,
            EntityType::Fire => 4,
            EntityType::Crate => 5,
            EntityType::Particle => 6,
            EntityType::Wall => 7,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EntityFlag {
    MarkedForDestruction,
    /// Not clamped into the world boundary after moving.
    Unbounded,
    /// Does not integrate velocity; other entities treat it as an obstacle.
    Frozen,
    Fireproof,
    /// Moved by the constant-speed animation phase instead of forces.
    AnimatedMovement,
}

impl EntityFlag {
    const fn index(self) -> u32 {
        match self {
            EntityFlag::MarkedForDestruction => 0,
            EntityFlag::Unbounded => 1,
            EntityFlag::Frozen => 2,
            EntityFlag::Fireproof => 3,
            EntityFlag::AnimatedMovement => 4,
        }
    }
}

macro_rules! enum_bitset {
    ($(#[$meta:meta])* $name:ident, $member:ty, $bits:ty) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
        pub struct $name($bits);

        impl $name {
            pub const fn empty() -> Self {
                Self(0)
            }

            pub fn insert(&mut self, member: $member) {
                self.0 |= 1 << member.index();
            }

            pub fn remove(&mut self, member: $member) {
                self.0 &= !(1 << member.index());
            }

            pub fn set(&mut self, member: $member, enabled: bool) {
                if enabled {
                    self.insert(member);
                } else {
                    self.remove(member);
                }
            }

            pub fn contains(&self, member: $member) -> bool {
                self.0 & (1 << member.index()) != 0
            }

            pub fn is_empty(&self) -> bool {
                self.0 == 0
            }

            pub fn with(mut self, member: $member) -> Self {
                self.insert(member);
                self
            }
        }

        impl FromIterator<$member> for $name {
            fn from_iter<I: IntoIterator<Item = $member>>(iter: I) -> Self {
                let mut set = Self::empty();
                for member in iter {
                    set.insert(member);
                }
                set
            }
        }
    };
}

enum_bitset!(
    TypeMask,
    EntityType,
    u16
);

enum_bitset!(
    FlagSet,
    EntityFlag,
    u8
);

impl TypeMask {
    pub fn all() -> Self {
        EntityType::ALL.into_iter().collect()
    }
}

/// Four directional movement intents plus the pending cell target of
/// animated movement.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Controller {
    intents: [bool; 4],
    pub animation_target: Option<Vec2>,
}

impl Controller {
    pub fn set(&mut self, direction: MoveDirection, moving: bool) {
        self.intents[direction_index(direction)] = moving;
    }

    pub fn is_moving(&self, direction: MoveDirection) -> bool {
        self.intents[direction_index(direction)]
    }

    pub fn any(&self) -> bool {
        self.intents.iter().any(|moving| *moving)
    }

    pub fn clear(&mut self) {
        self.intents = [false; 4];
    }

    /// Sum of unit vectors for the active intents. Up is negative y.
    pub fn intent_vector(&self) -> Vec2 {
        MoveDirection::ALL
            .into_iter()
            .filter(|direction| self.is_moving(*direction))
            .fold(Vec2::ZERO, |sum, direction| sum + direction_vector(direction))
    }
}

const fn direction_index(direction: MoveDirection) -> usize {
    match direction {
        MoveDirection::Up => 0,
        MoveDirection::Down => 1,
        MoveDirection::Left => 2,
        MoveDirection::Right => 3,
    }
}

pub fn direction_vector(direction: MoveDirection) -> Vec2 {
    match direction {
        MoveDirection::Up => Vec2::new(0.0, -1.0),
        MoveDirection::Down => Vec2::new(0.0, 1.0),
        MoveDirection::Left => Vec2::new(-1.0, 0.0),
        MoveDirection::Right => Vec2::new(1.0, 0.0),
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AnimationState {
    pub sequence: u32,
    pub elapsed_seconds: f32,
}

#[derive(Debug, Clone, PartialEq)]
pub struct TileState {
    pub tileset: String,
    pub tile_index: u32,
    pub animation: Option<AnimationState>,
}

impl Default for TileState {
    fn default() -> Self {
        Self {
            tileset: "default".to_string(),
            tile_index: 0,
            animation: None,
        }
    }
}

#[derive(Debug, Clone)]
pub struct Entity {
    id: EntityId,
    entity_type: EntityType,
    pub flags: FlagSet,
    pub collision_mask: TypeMask,
    pub aabb: Aabb,
    pub velocity: Vec2,
    pub acceleration: Vec2,
    pub max_speed: f32,
    pub controller: Controller,
    pub tile: TileState,
    pub payload: EntityPayload,
}

impl Entity {
    pub(crate) fn new(id: EntityId, entity_type: EntityType) -> Self {
        Self {
            id,
            entity_type,
            flags: FlagSet::empty(),
            collision_mask: TypeMask::empty(),
            aabb: Aabb::default(),
            velocity: Vec2::ZERO,
            acceleration: Vec2::ZERO,
            max_speed: 1.0,
            controller: Controller::default(),
            tile: TileState::default(),
            payload: EntityPayload::Empty,
        }
    }

    pub fn id(&self) -> EntityId {
        self.id
    }

    pub fn entity_type(&self) -> EntityType {
        self.entity_type
    }

    pub fn has_flag(&self, flag: EntityFlag) -> bool {
        self.flags.contains(flag)
    }

    pub fn is_marked_for_destruction(&self) -> bool {
        self.has_flag(EntityFlag::MarkedForDestruction)
    }

    pub fn mark_for_destruction(&mut self) -> &mut Self {
        self.flags.insert(EntityFlag::MarkedForDestruction);
        self
    }

    pub fn set_origin(&mut self, origin: Vec2) -> &mut Self {
        self.aabb.origin = origin;
        self
    }

    pub fn set_size(&mut self, size: Vec2) -> &mut Self {
        self.aabb.size = size;
        self
    }

    pub fn set_tileset(&mut self, tileset: impl Into<String>) -> &mut Self {
        self.tile.tileset = tileset.into();
        self
    }

    pub fn set_tile(&mut self, tile_index: u32) -> &mut Self {
        self.tile.tile_index = tile_index;
        self.tile.animation = None;
        self
    }

    /// Starts `sequence` from its first frame unless it is already playing.
    pub fn set_animation(&mut self, sequence: u32) -> &mut Self {
        if self.tile.animation.map(|animation| animation.sequence) != Some(sequence) {
            self.tile.animation = Some(AnimationState {
                sequence,
                elapsed_seconds: 0.0,
            });
        }
        self
    }

    pub fn set_max_speed(&mut self, max_speed: f32) -> &mut Self {
        self.max_speed = max_speed;
        self
    }

    pub fn set_collision_mask(&mut self, mask: TypeMask) -> &mut Self {
        self.collision_mask = mask;
        self
    }

    pub fn blocked_by(&mut self, entity_type: EntityType) -> &mut Self {
        self.collision_mask.insert(entity_type);
        self
    }

    pub fn set_flag(&mut self, flag: EntityFlag, enabled: bool) -> &mut Self {
        self.flags.set(flag, enabled);
        self
    }

    pub fn set_payload(&mut self, payload: impl Into<EntityPayload>) -> &mut Self {
        self.payload = payload.into();
        self
    }
}
