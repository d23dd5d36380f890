use serde::{Deserialize, Serialize};

use super::scheduler::{EventMember, EventSet};
use crate::world::EntityId;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MoveDirection {
    Up,
    Down,
    Left,
    Right,
}

impl MoveDirection {
    pub const ALL: [MoveDirection; 4] = [
        MoveDirection::Up,
        MoveDirection::Down,
        MoveDirection::Left,
        MoveDirection::Right,
    ];
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GameStarted;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DeleteEntity {
    pub actor: EntityId,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PlayerMoved {
    pub actor: EntityId,
    pub accelerate: bool,
    pub direction: MoveDirection,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PlayerDied {
    pub actor: EntityId,
}

/// Emitted by the world for every overlapping pair found in a tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EntityCollide {
    pub a: EntityId,
    pub b: EntityId,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BombPlanted {
    pub actor: EntityId,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BombExploded {
    pub actor: EntityId,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FireTerminated {
    pub actor: EntityId,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PickedPickupItem {
    pub pickup: EntityId,
    pub player: EntityId,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CrateDestroyed {
    pub actor: EntityId,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ParticleDestroyed {
    pub actor: EntityId,
}

macro_rules! game_events {
    ($($name:ident),* $(,)?) => {
        #[derive(Debug, Clone, PartialEq)]
        pub enum GameEvent {
            $($name($name),)*
        }

        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
        pub enum GameEventKind {
            $($name,)*
        }

        impl EventSet for GameEvent {
            type Kind = GameEventKind;

            fn kind(&self) -> GameEventKind {
                match self {
                    $(Self::$name(_) => GameEventKind::$name,)*
                }
            }
        }

        $(
            impl EventMember<GameEvent> for $name {
                const KIND: GameEventKind = GameEventKind::$name;

                fn wrap(self) -> GameEvent {
                    GameEvent::$name(self)
                }

                fn peel(event: &GameEvent) -> Option<&Self> {
                    match event {
                        GameEvent::$name(inner) => Some(inner),
                        _ => None,
                    }
                }
            }

            impl From<$name> for GameEvent {
                fn from(event: $name) -> Self {
                    GameEvent::$name(event)
                }
            }
        )*
    };
}

game_events!(
    GameStarted,
    DeleteEntity,
    PlayerMoved,
    PlayerDied,
    EntityCollide,
    BombPlanted,
    BombExploded,
    FireTerminated,
    PickedPickupItem,
    CrateDestroyed,
    ParticleDestroyed,
);
