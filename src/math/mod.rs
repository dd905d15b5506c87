//! Math substrate for the world core
//!
//! Provides the rigid transform (position + rotation, no scale) used by
//! entities and components, and an axis-aligned bounding box with an
//! explicit empty sentinel.

mod aabb;
mod transform;

pub use aabb::Aabb3;
pub use transform::Transform;
