pub mod events;
pub mod geometry;
pub mod grid;
pub mod navigation;
pub mod world;

pub use events::{
    BombExploded, BombPlanted, CrateDestroyed, DeleteEntity, DispatchStats, EntityCollide,
    EventMember, EventQueue, EventScheduler, EventSet, FireTerminated, GameEvent,
    GameEventKind, GameEventQueue, GameStarted, MoveDirection, ParticleDestroyed,
    PickedPickupItem, PlayerDied, PlayerMoved, Timestamp,
};
pub use geometry::{compare_intervals, Aabb, IntervalComparison, Vec2};
pub use grid::{NodeId, OccupancyError, OccupancyMap, OccupancyMap2D};
pub use navigation::{NavigationError, NavigationMesh};
pub use world::{
    CollisionWorld, Entity, EntityFlag, EntityId, EntityPayload, EntityType, PayloadMismatch,
    PhysicsConfig, TypeMask, World, WorldError,
};
