//! Group component holding child entities

use std::any::Any;

use crate::math::{Aabb3, Transform};

use super::component::{EntityComponent, EntityId, EntityState, UpdateParams};
use super::entity::Entity;

/// Component containing child entities.
///
/// When the owning entity moves, children preserve their pose *relative* to
/// the group, not their absolute pose:
///
/// `childLocal = oldGroup⁻¹ · childWorld; childWorld' = newGroup · childLocal`
pub struct GroupComponent {
    transform: Transform,
    entities: Vec<Entity>,
}

impl GroupComponent {
    /// Create an empty group.
    #[must_use]
    pub fn new() -> Self {
        Self {
            transform: Transform::IDENTITY,
            entities: Vec::new(),
        }
    }

    /// Create a group taking ownership of `entities`.
    #[must_use]
    pub fn with_entities(entities: Vec<Entity>) -> Self {
        Self {
            transform: Transform::IDENTITY,
            entities,
        }
    }

    /// Append a child entity. O(1).
    pub fn add_entity(&mut self, entity: Entity) {
        self.entities.push(entity);
    }

    /// Remove a child entity by ID. O(n).
    pub fn remove_entity(&mut self, id: EntityId) -> Option<Entity> {
        let index = self.entities.iter().position(|entity| entity.id() == id)?;
        Some(self.entities.remove(index))
    }

    /// The child entities.
    #[must_use]
    pub fn entities(&self) -> &[Entity] {
        &self.entities
    }

    /// The child entities, mutably.
    pub fn entities_mut(&mut self) -> &mut [Entity] {
        &mut self.entities
    }
}

impl Default for GroupComponent {
    fn default() -> Self {
        Self::new()
    }
}

impl EntityComponent for GroupComponent {
    fn destroy(&mut self) {
        for entity in &mut self.entities {
            entity.destroy();
        }
        self.entities.clear();
    }

    fn set_transform(&mut self, old: &Transform, new: &Transform) {
        // Children keep their pose relative to the group across the move.
        let old_inverse = old.inverse();
        for entity in &mut self.entities {
            let local = old_inverse * entity.transform();
            entity.set_transform(*new * local);
        }
        self.transform = *new;
    }

    fn update(&mut self, update: &UpdateParams) {
        for entity in &mut self.entities {
            entity.update(update);
        }
    }

    fn set_state(&mut self, state: EntityState) {
        let _ = state;
    }

    fn bounding_box(&self) -> Aabb3 {
        // Union of child boxes, expressed in group-local space.
        let group_inverse = self.transform.inverse();
        self.entities.iter().fold(Aabb3::EMPTY, |acc, entity| {
            let child_box = entity
                .bounding_box()
                .transformed(&(group_inverse * entity.transform()));
            acc.union(&child_box)
        })
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}

#[cfg(test)]
mod tests {
    use glam::{Quat, Vec3};

    use super::*;

    struct BoxedComponent(Aabb3);

    impl EntityComponent for BoxedComponent {
        fn bounding_box(&self) -> Aabb3 {
            self.0
        }

        fn as_any(&self) -> &dyn Any {
            self
        }

        fn as_any_mut(&mut self) -> &mut dyn Any {
            self
        }
    }

    fn child_at(position: Vec3) -> Entity {
        Entity::new(
            "child",
            Transform::from_position(position),
            EntityState::default(),
            vec![Box::new(BoxedComponent(Aabb3::from_center_extent(
                Vec3::ZERO,
                Vec3::ONE,
            )))],
        )
    }

    fn group_entity(children: Vec<Entity>) -> Entity {
        Entity::new(
            "group",
            Transform::IDENTITY,
            EntityState::default(),
            vec![Box::new(GroupComponent::with_entities(children))],
        )
    }

    #[test]
    fn test_children_preserve_relative_pose() {
        let mut entity = group_entity(vec![child_at(Vec3::new(1.0, 0.0, 0.0))]);

        // Move and rotate the group several times; the child must stay at
        // local offset (1, 0, 0) throughout.
        let moves = [
            Transform::from_position(Vec3::new(10.0, 0.0, 0.0)),
            Transform::new(
                Vec3::new(-3.0, 5.0, 2.0),
                Quat::from_rotation_y(std::f32::consts::FRAC_PI_2),
            ),
            Transform::new(Vec3::ZERO, Quat::from_rotation_z(1.2)),
        ];

        for group_transform in moves {
            entity.set_transform(group_transform);

            let group = entity.component::<GroupComponent>().unwrap();
            let child_world = group.entities()[0].transform();
            let local = group_transform.inverse() * child_world;
            assert!(
                (local.position - Vec3::new(1.0, 0.0, 0.0)).length() < 0.001,
                "relative pose drifted: {:?}",
                local.position
            );
        }
    }

    #[test]
    fn test_bounding_box_union_of_children() {
        let entity = group_entity(vec![
            child_at(Vec3::new(2.0, 0.0, 0.0)),
            child_at(Vec3::new(-2.0, 0.0, 0.0)),
        ]);

        let group = entity.component::<GroupComponent>().unwrap();
        let bounds = group.bounding_box();
        assert!(!bounds.is_empty());
        assert!((bounds.min.x - -3.0).abs() < 0.001);
        assert!((bounds.max.x - 3.0).abs() < 0.001);
    }

    #[test]
    fn test_empty_group_has_empty_bounds() {
        let group = GroupComponent::new();
        assert!(group.bounding_box().is_empty());
    }

    #[test]
    fn test_add_remove_entity() {
        let mut group = GroupComponent::new();
        let child = child_at(Vec3::ZERO);
        let id = child.id();
        group.add_entity(child);
        assert_eq!(group.entities().len(), 1);

        let removed = group.remove_entity(id);
        assert!(removed.is_some());
        assert!(group.entities().is_empty());
        assert!(group.remove_entity(id).is_none());
    }
}
