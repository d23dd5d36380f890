use std::ops::{Add, AddAssign, Mul, Sub, SubAssign};

use serde::{Deserialize, Serialize};

/// Position or extent in tile space. One unit is one tile; `y` grows downward.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Vec2 {
    pub x: f32,
    pub y: f32,
}

impl Vec2 {
    pub const ZERO: Vec2 = Vec2 { x: 0.0, y: 0.0 };
    pub const ONE: Vec2 = Vec2 { x: 1.0, y: 1.0 };

    pub const fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }

    pub fn length(self) -> f32 {
        (self.x * self.x + self.y * self.y).sqrt()
    }

    pub fn distance(self, other: Vec2) -> f32 {
        (other - self).length()
    }

    pub fn normalize_or_zero(self) -> Vec2 {
        let length = self.length();
        if length <= f32::EPSILON {
            return Vec2::ZERO;
        }
        self * (1.0 / length)
    }

    pub fn clamp_length(self, max_length: f32) -> Vec2 {
        let length = self.length();
        if length <= max_length || length <= f32::EPSILON {
            return self;
        }
        self * (max_length.max(0.0) / length)
    }

    pub fn min(self, other: Vec2) -> Vec2 {
        Vec2::new(self.x.min(other.x), self.y.min(other.y))
    }

    pub fn max(self, other: Vec2) -> Vec2 {
        Vec2::new(self.x.max(other.x), self.y.max(other.y))
    }

    pub fn round(self) -> Vec2 {
        Vec2::new(self.x.round(), self.y.round())
    }

    pub fn floor(self) -> Vec2 {
        Vec2::new(self.x.floor(), self.y.floor())
    }

    pub fn is_finite(self) -> bool {
        self.x.is_finite() && self.y.is_finite()
    }
}

impl Add for Vec2 {
    type Output = Vec2;

    fn add(self, rhs: Vec2) -> Vec2 {
        Vec2::new(self.x + rhs.x, self.y + rhs.y)
    }
}

impl AddAssign for Vec2 {
    fn add_assign(&mut self, rhs: Vec2) {
        self.x += rhs.x;
        self.y += rhs.y;
    }
}

impl Sub for Vec2 {
    type Output = Vec2;

    fn sub(self, rhs: Vec2) -> Vec2 {
        Vec2::new(self.x - rhs.x, self.y - rhs.y)
    }
}

impl SubAssign for Vec2 {
    fn sub_assign(&mut self, rhs: Vec2) {
        self.x -= rhs.x;
        self.y -= rhs.y;
    }
}

impl Mul<f32> for Vec2 {
    type Output = Vec2;

    fn mul(self, rhs: f32) -> Vec2 {
        Vec2::new(self.x * rhs, self.y * rhs)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IntervalComparison {
    AInsideB,
    BInsideA,
    Overlaps,
    Disjoint,
}

/// Classifies two closed intervals given as `(start, end)`.
pub fn compare_intervals(a: (f32, f32), b: (f32, f32)) -> IntervalComparison {
    if a.0 <= b.0 && a.1 >= b.1 {
        IntervalComparison::BInsideA
    } else if a.0 >= b.0 && a.1 <= b.1 {
        IntervalComparison::AInsideB
    } else if a.1 < b.0 || b.1 < a.0 {
        IntervalComparison::Disjoint
    } else {
        IntervalComparison::Overlaps
    }
}

/// Axis-aligned bounding box.
///
/// `origin` is the top-left corner; the box spans `[origin, origin + size]`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Aabb {
    pub origin: Vec2,
    pub size: Vec2,
}

impl Default for Aabb {
    fn default() -> Self {
        Self {
            origin: Vec2::ZERO,
            size: Vec2::ONE,
        }
    }
}

impl Aabb {
    pub const fn new(origin: Vec2, size: Vec2) -> Self {
        Self { origin, size }
    }

    pub fn midpoint(&self) -> Vec2 {
        self.origin + self.size * 0.5
    }

    pub fn top_left(&self) -> Vec2 {
        self.origin
    }

    pub fn top_right(&self) -> Vec2 {
        Vec2::new(self.origin.x + self.size.x, self.origin.y)
    }

    pub fn bottom_left(&self) -> Vec2 {
        Vec2::new(self.origin.x, self.origin.y + self.size.y)
    }

    pub fn bottom_right(&self) -> Vec2 {
        self.origin + self.size
    }

    pub fn corners(&self) -> [Vec2; 4] {
        [
            self.top_left(),
            self.top_right(),
            self.bottom_left(),
            self.bottom_right(),
        ]
    }

    /// Corners pulled towards the centre by `inset` on both axes, so a box
    /// resting exactly on a tile edge does not sample the neighbouring tile.
    pub fn inset_corners(&self, inset: f32) -> [Vec2; 4] {
        let inset_x = inset.min(self.size.x * 0.5);
        let inset_y = inset.min(self.size.y * 0.5);
        let min = Vec2::new(self.origin.x + inset_x, self.origin.y + inset_y);
        let max = Vec2::new(
            self.origin.x + self.size.x - inset_x,
            self.origin.y + self.size.y - inset_y,
        );
        [
            min,
            Vec2::new(max.x, min.y),
            Vec2::new(min.x, max.y),
            max,
        ]
    }

    pub fn project_x(&self) -> (f32, f32) {
        (self.origin.x, self.origin.x + self.size.x)
    }

    pub fn project_y(&self) -> (f32, f32) {
        (self.origin.y, self.origin.y + self.size.y)
    }

    pub fn translated(&self, delta: Vec2) -> Aabb {
        Aabb::new(self.origin + delta, self.size)
    }

    /// Strict overlap test; boxes that only share an edge do not collide.
    pub fn collide(&self, other: &Aabb) -> bool {
        intervals_overlap(self.project_x(), other.project_x())
            && intervals_overlap(self.project_y(), other.project_y())
    }

    /// Inclusive point test.
    pub fn contains(&self, point: Vec2) -> bool {
        let (x0, x1) = self.project_x();
        let (y0, y1) = self.project_y();
        point.x >= x0 && point.x <= x1 && point.y >= y0 && point.y <= y1
    }

    pub fn inside(&self, boundary: &Aabb) -> bool {
        compare_intervals(self.project_x(), boundary.project_x()) == IntervalComparison::AInsideB
            && compare_intervals(self.project_y(), boundary.project_y())
                == IntervalComparison::AInsideB
    }

    /// Moves the box (never resizes it) so it lies within `boundary`.
    pub fn put_inside(&mut self, boundary: &Aabb) {
        let upper = boundary.bottom_right() - self.size;
        self.origin = self.origin.max(boundary.origin).min(upper);
    }

    pub fn distance_l2(&self, other: &Aabb) -> f32 {
        self.origin.distance(other.origin)
    }

    pub fn distance_l1(&self, other: &Aabb) -> f32 {
        (self.origin.x - other.origin.x).abs() + (self.origin.y - other.origin.y).abs()
    }
}

fn intervals_overlap(a: (f32, f32), b: (f32, f32)) -> bool {
    if a.0 < b.0 {
        a.1 > b.0
    } else {
        a.0 < b.1
    }
}
