//! Named, transformable component container

use crate::math::{Aabb3, Transform};

use super::component::{EntityComponent, EntityId, EntityState, UpdateParams};

/// A named, transformable container of components.
///
/// The entity exclusively owns its component list, kept stably sorted by each
/// component's ordinal. Transform and state changes are broadcast to all
/// components in ordinal order.
pub struct Entity {
    id: EntityId,
    name: String,
    transform: Transform,
    state: EntityState,
    components: Vec<Box<dyn EntityComponent>>,
}

impl Entity {
    /// Create an entity taking ownership of `components`.
    ///
    /// Components are sorted stably by ordinal and each receives exactly one
    /// `set_owner` call.
    #[must_use]
    pub fn new(
        name: impl Into<String>,
        transform: Transform,
        state: EntityState,
        mut components: Vec<Box<dyn EntityComponent>>,
    ) -> Self {
        let id = EntityId::next();
        components.sort_by_key(|component| component.ordinal());
        for component in &mut components {
            component.set_owner(id);
        }
        Self {
            id,
            name: name.into(),
            transform,
            state,
            components,
        }
    }

    /// The entity's unique ID.
    #[must_use]
    pub const fn id(&self) -> EntityId {
        self.id
    }

    /// The entity's name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The current world transform.
    #[must_use]
    pub const fn transform(&self) -> Transform {
        self.transform
    }

    /// The current state flags.
    #[must_use]
    pub const fn state(&self) -> EntityState {
        self.state
    }

    /// Store a new transform, then broadcast the change to every component in
    /// ordinal order. Components receive both the previous and the new owner
    /// transform.
    pub fn set_transform(&mut self, transform: Transform) {
        let old = self.transform;
        self.transform = transform;
        for component in &mut self.components {
            component.set_transform(&old, &transform);
        }
    }

    /// Store new state flags, then broadcast them in ordinal order.
    pub fn set_state(&mut self, state: EntityState) {
        self.state = state;
        for component in &mut self.components {
            component.set_state(state);
        }
    }

    /// Update every component in ordinal order.
    pub fn update(&mut self, update: &UpdateParams) {
        for component in &mut self.components {
            component.update(update);
        }
    }

    /// Destroy all components and drop them. After this the entity holds no
    /// components.
    pub fn destroy(&mut self) {
        for component in &mut self.components {
            component.destroy();
        }
        self.components.clear();
    }

    /// The owned components in ordinal order.
    #[must_use]
    pub fn components(&self) -> &[Box<dyn EntityComponent>] {
        &self.components
    }

    /// Find the first component of concrete type `T`.
    #[must_use]
    pub fn component<T: EntityComponent>(&self) -> Option<&T> {
        self.components
            .iter()
            .find_map(|component| component.as_any().downcast_ref::<T>())
    }

    /// Find the first component of concrete type `T`, mutably.
    pub fn component_mut<T: EntityComponent>(&mut self) -> Option<&mut T> {
        self.components
            .iter_mut()
            .find_map(|component| component.as_any_mut().downcast_mut::<T>())
    }

    /// Union of all component boxes, in entity-local space.
    #[must_use]
    pub fn bounding_box(&self) -> Aabb3 {
        self.components
            .iter()
            .fold(Aabb3::EMPTY, |acc, component| {
                acc.union(&component.bounding_box())
            })
    }
}

impl std::fmt::Debug for Entity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Entity")
            .field("id", &self.id)
            .field("name", &self.name)
            .field("state", &self.state)
            .field("components", &self.components.len())
            .finish()
    }
}
