use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::entity::{Entity, EntityId};
use crate::geometry::Vec2;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum WeaponType {
    #[default]
    Bomb,
    FloodBomb,
    ImmediateFire,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BombPrototype {
    pub range: u32,
}

impl Default for BombPrototype {
    fn default() -> Self {
        Self { range: 1 }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PlayerData {
    pub weapon: WeaponType,
    pub bomb_prototype: BombPrototype,
    pub available_bomb_count: u32,
}

impl Default for PlayerData {
    fn default() -> Self {
        Self {
            weapon: WeaponType::Bomb,
            bomb_prototype: BombPrototype::default(),
            available_bomb_count: 1,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PickupKind {
    IncreaseBombCount,
    IncreaseBombRange,
    FreezeForSomeTime,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PickupData {
    pub kind: PickupKind,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BombData {
    pub parent: Option<EntityId>,
    pub prototype: BombPrototype,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum NpcGoal {
    #[default]
    RandomWalk,
    ChasingTarget,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct NpcData {
    pub goal: NpcGoal,
    pub target: Option<EntityId>,
    /// Remaining cells of the current path, next cell first.
    pub trajectory: Vec<Vec2>,
    /// Ticks left before a random walker picks a new direction.
    pub ticks_until_turn: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PayloadKind {
    Empty,
    Player,
    Pickup,
    Bomb,
    Npc,
}

impl fmt::Display for PayloadKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            PayloadKind::Empty => "empty",
            PayloadKind::Player => "player",
            PayloadKind::Pickup => "pickup",
            PayloadKind::Bomb => "bomb",
            PayloadKind::Npc => "npc",
        };
        f.write_str(name)
    }
}

/// Gameplay state attached to an entity. The variant is expected to match the
/// entity type; accessors report a [`PayloadMismatch`] when it does not.
#[derive(Debug, Clone, Default, PartialEq)]
pub enum EntityPayload {
    #[default]
    Empty,
    Player(PlayerData),
    Pickup(PickupData),
    Bomb(BombData),
    Npc(NpcData),
}

impl EntityPayload {
    pub fn kind(&self) -> PayloadKind {
        match self {
            EntityPayload::Empty => PayloadKind::Empty,
            EntityPayload::Player(_) => PayloadKind::Player,
            EntityPayload::Pickup(_) => PayloadKind::Pickup,
            EntityPayload::Bomb(_) => PayloadKind::Bomb,
            EntityPayload::Npc(_) => PayloadKind::Npc,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("entity {entity} holds {actual} payload, expected {expected}")]
pub struct PayloadMismatch {
    pub entity: EntityId,
    pub expected: PayloadKind,
    pub actual: PayloadKind,
}

macro_rules! payload_accessors {
    ($($variant:ident($data:ty) => $get:ident, $get_mut:ident;)*) => {
        $(
            impl From<$data> for EntityPayload {
                fn from(data: $data) -> Self {
                    EntityPayload::$variant(data)
                }
            }
        )*

        impl Entity {
            $(
                pub fn $get(&self) -> Result<&$data, PayloadMismatch> {
                    match &self.payload {
                        EntityPayload::$variant(data) => Ok(data),
                        other => Err(PayloadMismatch {
                            entity: self.id(),
                            expected: PayloadKind::$variant,
                            actual: other.kind(),
                        }),
                    }
                }

                pub fn $get_mut(&mut self) -> Result<&mut $data, PayloadMismatch> {
                    let entity = self.id();
                    match &mut self.payload {
                        EntityPayload::$variant(data) => Ok(data),
                        other => Err(PayloadMismatch {
                            entity,
                            expected: PayloadKind::$variant,
                            actual: other.kind(),
                        }),
                    }
                }
            )*
        }
    };
}

payload_accessors! {
    Player(PlayerData) => player_data, player_data_mut;
    Pickup(PickupData) => pickup_data, pickup_data_mut;
    Bomb(BombData) => bomb_data, bomb_data_mut;
    Npc(NpcData) => npc_data, npc_data_mut;
}
