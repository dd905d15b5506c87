//! Axis-aligned bounding box

use glam::Vec3;
use serde::{Deserialize, Serialize};

use super::Transform;

/// An axis-aligned bounding box in 3D.
///
/// An empty box is represented by `min > max` on every axis; callers must
/// check [`Aabb3::is_empty`] before using the extents of a box that may have
/// been built from zero points.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Aabb3 {
    /// Minimum corner
    pub min: Vec3,
    /// Maximum corner
    pub max: Vec3,
}

impl Aabb3 {
    /// The empty box sentinel (`min > max`).
    pub const EMPTY: Self = Self {
        min: Vec3::INFINITY,
        max: Vec3::NEG_INFINITY,
    };

    /// Create from explicit corners.
    #[must_use]
    pub const fn new(min: Vec3, max: Vec3) -> Self {
        Self { min, max }
    }

    /// Create a box centered at `center` with half-extent `extent`.
    #[must_use]
    pub fn from_center_extent(center: Vec3, extent: Vec3) -> Self {
        Self {
            min: center - extent,
            max: center + extent,
        }
    }

    /// Check if the box contains no points.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.min.x > self.max.x || self.min.y > self.max.y || self.min.z > self.max.z
    }

    /// Grow the box to contain a point.
    pub fn insert(&mut self, point: Vec3) {
        self.min = self.min.min(point);
        self.max = self.max.max(point);
    }

    /// The union of two boxes; union with an empty box is the other box.
    #[must_use]
    pub fn union(&self, other: &Self) -> Self {
        if self.is_empty() {
            return *other;
        }
        if other.is_empty() {
            return *self;
        }
        Self {
            min: self.min.min(other.min),
            max: self.max.max(other.max),
        }
    }

    /// Center of the box.
    #[must_use]
    pub fn center(&self) -> Vec3 {
        (self.min + self.max) * 0.5
    }

    /// Half-extent of the box.
    #[must_use]
    pub fn extent(&self) -> Vec3 {
        (self.max - self.min) * 0.5
    }

    /// Transform the box, returning the axis-aligned bounds of the eight
    /// transformed corners. An empty box stays empty.
    #[must_use]
    pub fn transformed(&self, transform: &Transform) -> Self {
        if self.is_empty() {
            return Self::EMPTY;
        }
        let mut result = Self::EMPTY;
        for i in 0..8 {
            let corner = Vec3::new(
                if i & 1 == 0 { self.min.x } else { self.max.x },
                if i & 2 == 0 { self.min.y } else { self.max.y },
                if i & 4 == 0 { self.min.z } else { self.max.z },
            );
            result.insert(transform.apply(corner));
        }
        result
    }
}

impl Default for Aabb3 {
    fn default() -> Self {
        Self::EMPTY
    }
}
