mod catalogue;
mod scheduler;
mod time;

pub use catalogue::{
    BombExploded, BombPlanted, CrateDestroyed, DeleteEntity, EntityCollide, FireTerminated,
    GameEvent, GameEventKind, GameStarted, MoveDirection, ParticleDestroyed, PickedPickupItem,
    PlayerDied, PlayerMoved,
};
pub use scheduler::{DispatchStats, EventMember, EventQueue, EventScheduler, EventSet};
pub use time::Timestamp;

pub type GameEventQueue = EventQueue<GameEvent>;
