use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::trace;

use super::{CollisionWorld, Entity, EntityFlag, EntityId, EntityType, TypeMask, World};
use crate::events::GameEventQueue;
use crate::geometry::{Aabb, Vec2};

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PhysicsConfig {
    /// Speed lost per second once intent stops pushing, in tiles/s.
    pub velocity_decay_per_second: f32,
    /// Acceleration produced by one active intent, in tiles/s².
    pub acceleration_gain: f32,
    /// Distance the collision corners are pulled inside the box.
    pub corner_inset: f32,
}

impl Default for PhysicsConfig {
    fn default() -> Self {
        Self {
            velocity_decay_per_second: 40.0,
            acceleration_gain: 120.0,
            corner_inset: 0.01,
        }
    }
}

#[derive(Debug, Clone, Copy)]
struct Obstacle {
    id: EntityId,
    entity_type: EntityType,
    aabb: Aabb,
}

impl World {
    /// Advances every entity by `delta`, in phase order: acceleration, axis
    /// separated integration, velocity decay, animated movement and finally
    /// collision detection into `queue`. Each phase finishes for all entities
    /// before the next one starts.
    pub fn update(&mut self, delta: Duration, queue: &mut GameEventQueue) {
        let dt = delta.as_secs_f32();
        self.apply_acceleration(dt);
        self.integrate_positions(dt);
        self.attenuate_velocities(dt);
        self.advance_animated_movement(dt);
        self.detect_collisions(queue);
    }

    fn apply_acceleration(&mut self, dt: f32) {
        let gain = self.physics.acceleration_gain;
        for entity in self.entities.values_mut() {
            if entity.has_flag(EntityFlag::AnimatedMovement) {
                continue;
            }
            entity.acceleration = entity.controller.intent_vector() * gain;
            entity.velocity =
                (entity.velocity + entity.acceleration * dt).clamp_length(entity.max_speed);
        }
    }

    fn integrate_positions(&mut self, dt: f32) {
        let obstacles: Vec<Obstacle> = self
            .entities
            .values()
            .filter(|entity| {
                entity.has_flag(EntityFlag::Frozen) && !entity.is_marked_for_destruction()
            })
            .map(|entity| Obstacle {
                id: entity.id(),
                entity_type: entity.entity_type(),
                aabb: entity.aabb,
            })
            .collect();

        let ids = self.ids();
        for id in ids {
            let Some(entity) = self.entities.get(&id) else {
                continue;
            };
            if entity.has_flag(EntityFlag::Frozen) || entity.has_flag(EntityFlag::AnimatedMovement)
            {
                continue;
            }

            let delta = entity.velocity * dt;
            let mut aabb = entity.aabb;
            let mask = entity.collision_mask;

            let along_x = aabb.translated(Vec2::new(delta.x, 0.0));
            if !self.is_blocked(id, &along_x, mask, &obstacles) {
                aabb = along_x;
            }
            let along_y = aabb.translated(Vec2::new(0.0, delta.y));
            if !self.is_blocked(id, &along_y, mask, &obstacles) {
                aabb = along_y;
            }

            let boundary = self.boundary;
            let Some(entity) = self.entities.get_mut(&id) else {
                continue;
            };
            if !entity.has_flag(EntityFlag::Unbounded) && has_area(&boundary) {
                aabb.put_inside(&boundary);
            }
            if aabb.origin != entity.aabb.origin {
                trace!(
                    entity = id.0,
                    x = aabb.origin.x,
                    y = aabb.origin.y,
                    "entity_moved"
                );
            }
            entity.aabb = aabb;
        }
    }

    fn is_blocked(
        &self,
        mover: EntityId,
        candidate: &Aabb,
        mask: TypeMask,
        obstacles: &[Obstacle],
    ) -> bool {
        candidate
            .inset_corners(self.physics.corner_inset)
            .into_iter()
            .any(|corner| {
                self.has_static_collision(corner)
                    || obstacles.iter().any(|obstacle| {
                        obstacle.id != mover
                            && mask.contains(obstacle.entity_type)
                            && obstacle.aabb.contains(corner)
                    })
            })
    }

    fn attenuate_velocities(&mut self, dt: f32) {
        let decay = self.physics.velocity_decay_per_second * dt;
        for entity in self.entities.values_mut() {
            let speed = entity.velocity.length();
            if speed <= decay {
                entity.velocity = Vec2::ZERO;
            } else {
                entity.velocity = entity.velocity.normalize_or_zero() * (speed - decay);
            }
        }
    }

    fn advance_animated_movement(&mut self, dt: f32) {
        for entity in self.entities.values_mut() {
            if !entity.has_flag(EntityFlag::AnimatedMovement) {
                continue;
            }
            step_towards_target(entity, dt);
        }
    }
}

fn step_towards_target(entity: &mut Entity, dt: f32) {
    let Some(target) = entity.controller.animation_target else {
        return;
    };
    let to_target = target - entity.aabb.origin;
    let remaining = to_target.length();
    let step = entity.max_speed * dt;
    if remaining <= step {
        entity.aabb.origin = target;
        entity.controller.animation_target = None;
    } else {
        entity.aabb.origin += to_target.normalize_or_zero() * step;
    }
}

fn has_area(boundary: &Aabb) -> bool {
    boundary.size.x > 0.0 && boundary.size.y > 0.0
}
