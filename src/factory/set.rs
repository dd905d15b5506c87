//! Aggregating factory dispatcher

use std::any::TypeId;
use std::cell::RefCell;
use std::rc::Rc;

use rustc_hash::FxHashMap;

use crate::entity::{Entity, EntityComponent, EntityEvent, WorldComponent};
use crate::types::DataType;

use super::data::{ComponentData, EntityData, EventData, WorldComponentData};
use super::FactoryError;

/// A sub-factory able to build runtime objects from the blueprint types it
/// advertises.
///
/// Factories receive an opaque [`EntityBuilder`] so they can request
/// construction of children without knowing their concrete types.
pub trait EntityFactory {
    /// Entity blueprint types this factory claims.
    fn entity_types(&self) -> &[&'static DataType] {
        &[]
    }

    /// Component blueprint types this factory claims.
    fn component_types(&self) -> &[&'static DataType] {
        &[]
    }

    /// Event blueprint types this factory claims.
    fn event_types(&self) -> &[&'static DataType] {
        &[]
    }

    /// World component blueprint types this factory claims.
    fn world_component_types(&self) -> &[&'static DataType] {
        &[]
    }

    /// Build an entity from its blueprint.
    ///
    /// # Errors
    ///
    /// [`FactoryError`] when the blueprint cannot be built.
    fn create_entity(
        &self,
        builder: &dyn EntityBuilder,
        data: &dyn EntityData,
    ) -> Result<Entity, FactoryError> {
        let _ = builder;
        Err(FactoryError::NoFactory(data.data_type().name()))
    }

    /// Build a component from its blueprint.
    ///
    /// # Errors
    ///
    /// [`FactoryError`] when the blueprint cannot be built.
    fn create_component(
        &self,
        builder: &dyn EntityBuilder,
        data: &dyn ComponentData,
    ) -> Result<Box<dyn EntityComponent>, FactoryError> {
        let _ = builder;
        Err(FactoryError::NoFactory(data.data_type().name()))
    }

    /// Build an event from its blueprint.
    ///
    /// # Errors
    ///
    /// [`FactoryError`] when the blueprint cannot be built.
    fn create_event(
        &self,
        builder: &dyn EntityBuilder,
        data: &dyn EventData,
    ) -> Result<Rc<dyn EntityEvent>, FactoryError> {
        let _ = builder;
        Err(FactoryError::NoFactory(data.data_type().name()))
    }

    /// Build a world component from its blueprint.
    ///
    /// # Errors
    ///
    /// [`FactoryError`] when the blueprint cannot be built.
    fn create_world_component(
        &self,
        builder: &dyn EntityBuilder,
        data: &dyn WorldComponentData,
    ) -> Result<Box<dyn WorldComponent>, FactoryError> {
        let _ = builder;
        Err(FactoryError::NoFactory(data.data_type().name()))
    }
}

/// Opaque recursive-construction capability passed to sub-factories.
pub trait EntityBuilder {
    /// Build a child entity by resolving its blueprint.
    ///
    /// # Errors
    ///
    /// [`FactoryError`] when resolution or construction fails.
    fn build_entity(&self, data: &dyn EntityData) -> Result<Entity, FactoryError>;

    /// Build a child component by resolving its blueprint.
    ///
    /// # Errors
    ///
    /// [`FactoryError`] when resolution or construction fails.
    fn build_component(&self, data: &dyn ComponentData)
        -> Result<Box<dyn EntityComponent>, FactoryError>;

    /// Build a child event by resolving its blueprint.
    ///
    /// # Errors
    ///
    /// [`FactoryError`] when resolution or construction fails.
    fn build_event(&self, data: &dyn EventData) -> Result<Rc<dyn EntityEvent>, FactoryError>;

    /// Build a world component by resolving its blueprint.
    ///
    /// # Errors
    ///
    /// [`FactoryError`] when resolution or construction fails.
    fn build_world_component(
        &self,
        data: &dyn WorldComponentData,
    ) -> Result<Box<dyn WorldComponent>, FactoryError>;

    /// Whether construction failures are fatal (strict runtime contexts) or
    /// skippable with a warning (tooling contexts).
    fn strict(&self) -> bool;
}

#[derive(Clone, Copy)]
enum Category {
    Entity,
    Component,
    Event,
    WorldComponent,
}

/// Aggregating dispatcher over registered sub-factories.
///
/// For a blueprint of concrete type `T`, resolution picks the sub-factory
/// advertising `T`'s data type or its nearest ancestor (minimum type
/// distance); ties go to the first-registered factory. Resolution is
/// deterministic and independent of cache warmth — the per-category caches
/// are a pure optimization, cleared wholesale on every add/remove.
#[derive(Default)]
pub struct EntityFactorySet {
    factories: Vec<Rc<dyn EntityFactory>>,
    strict: bool,
    caches: [RefCell<FxHashMap<TypeId, Option<usize>>>; 4],
}

impl EntityFactorySet {
    /// Create an empty set. `strict` decides whether construction failures
    /// propagate (runtime) or are skippable by sub-factories (tooling).
    #[must_use]
    pub fn new(strict: bool) -> Self {
        Self {
            factories: Vec::new(),
            strict,
            caches: Default::default(),
        }
    }

    /// Register a sub-factory. Clears the resolution caches wholesale.
    pub fn add_factory(&mut self, factory: Rc<dyn EntityFactory>) {
        self.factories.push(factory);
        self.clear_caches();
    }

    /// Unregister a sub-factory. Removing an unknown factory is a no-op;
    /// removing twice is safe. Clears the resolution caches wholesale.
    pub fn remove_factory(&mut self, factory: &Rc<dyn EntityFactory>) -> bool {
        let before = self.factories.len();
        self.factories.retain(|existing| !Rc::ptr_eq(existing, factory));
        self.clear_caches();
        self.factories.len() != before
    }

    /// Number of registered sub-factories.
    #[must_use]
    pub fn factory_count(&self) -> usize {
        self.factories.len()
    }

    /// Union of entity blueprint types across sub-factories. Tooling only;
    /// dispatch never consults this.
    #[must_use]
    pub fn entity_types(&self) -> Vec<&'static DataType> {
        self.union_types(EntityFactory::entity_types)
    }

    /// Union of component blueprint types across sub-factories.
    #[must_use]
    pub fn component_types(&self) -> Vec<&'static DataType> {
        self.union_types(EntityFactory::component_types)
    }

    /// Union of event blueprint types across sub-factories.
    #[must_use]
    pub fn event_types(&self) -> Vec<&'static DataType> {
        self.union_types(EntityFactory::event_types)
    }

    /// Union of world component blueprint types across sub-factories.
    #[must_use]
    pub fn world_component_types(&self) -> Vec<&'static DataType> {
        self.union_types(EntityFactory::world_component_types)
    }

    /// Build an entity, resolving the owning sub-factory for the blueprint's
    /// concrete type.
    ///
    /// # Errors
    ///
    /// [`FactoryError::NoFactory`] when no sub-factory claims the type, or
    /// whatever the claiming factory returns.
    pub fn create_entity(&self, data: &dyn EntityData) -> Result<Entity, FactoryError> {
        self.resolve(Category::Entity, data.as_any().type_id(), data.data_type())
            .ok_or(FactoryError::NoFactory(data.data_type().name()))?
            .create_entity(self, data)
    }

    /// Build a component; see [`EntityFactorySet::create_entity`].
    ///
    /// # Errors
    ///
    /// [`FactoryError::NoFactory`] when no sub-factory claims the type, or
    /// whatever the claiming factory returns.
    pub fn create_component(
        &self,
        data: &dyn ComponentData,
    ) -> Result<Box<dyn EntityComponent>, FactoryError> {
        self.resolve(Category::Component, data.as_any().type_id(), data.data_type())
            .ok_or(FactoryError::NoFactory(data.data_type().name()))?
            .create_component(self, data)
    }

    /// Build an event; see [`EntityFactorySet::create_entity`].
    ///
    /// # Errors
    ///
    /// [`FactoryError::NoFactory`] when no sub-factory claims the type, or
    /// whatever the claiming factory returns.
    pub fn create_event(&self, data: &dyn EventData) -> Result<Rc<dyn EntityEvent>, FactoryError> {
        self.resolve(Category::Event, data.as_any().type_id(), data.data_type())
            .ok_or(FactoryError::NoFactory(data.data_type().name()))?
            .create_event(self, data)
    }

    /// Build a world component; see [`EntityFactorySet::create_entity`].
    ///
    /// # Errors
    ///
    /// [`FactoryError::NoFactory`] when no sub-factory claims the type, or
    /// whatever the claiming factory returns.
    pub fn create_world_component(
        &self,
        data: &dyn WorldComponentData,
    ) -> Result<Box<dyn WorldComponent>, FactoryError> {
        self.resolve(
            Category::WorldComponent,
            data.as_any().type_id(),
            data.data_type(),
        )
        .ok_or(FactoryError::NoFactory(data.data_type().name()))?
        .create_world_component(self, data)
    }

    fn clear_caches(&mut self) {
        for cache in &self.caches {
            cache.borrow_mut().clear();
        }
    }

    fn union_types(
        &self,
        advertised: impl for<'a> Fn(&'a (dyn EntityFactory + 'static)) -> &'a [&'static DataType],
    ) -> Vec<&'static DataType> {
        let mut union: Vec<&'static DataType> = Vec::new();
        for factory in &self.factories {
            for &data_type in advertised(factory.as_ref()) {
                if !union.iter().any(|existing| std::ptr::eq(*existing, data_type)) {
                    union.push(data_type);
                }
            }
        }
        union
    }

    fn resolve(
        &self,
        category: Category,
        concrete: TypeId,
        data_type: &'static DataType,
    ) -> Option<Rc<dyn EntityFactory>> {
        let cache = &self.caches[category as usize];
        if let Some(&cached) = cache.borrow().get(&concrete) {
            return cached.map(|index| Rc::clone(&self.factories[index]));
        }

        // Nearest ancestor wins; strict less-than keeps the first-registered
        // factory on ties.
        let mut best: Option<(u32, usize)> = None;
        for (index, factory) in self.factories.iter().enumerate() {
            let advertised = match category {
                Category::Entity => factory.entity_types(),
                Category::Component => factory.component_types(),
                Category::Event => factory.event_types(),
                Category::WorldComponent => factory.world_component_types(),
            };
            for &claimed in advertised {
                if let Some(distance) = data_type.distance_to(claimed) {
                    if best.map_or(true, |(best_distance, _)| distance < best_distance) {
                        best = Some((distance, index));
                    }
                }
            }
        }

        cache
            .borrow_mut()
            .insert(concrete, best.map(|(_, index)| index));
        best.map(|(_, index)| Rc::clone(&self.factories[index]))
    }
}

impl EntityBuilder for EntityFactorySet {
    fn build_entity(&self, data: &dyn EntityData) -> Result<Entity, FactoryError> {
        self.create_entity(data)
    }

    fn build_component(
        &self,
        data: &dyn ComponentData,
    ) -> Result<Box<dyn EntityComponent>, FactoryError> {
        self.create_component(data)
    }

    fn build_event(&self, data: &dyn EventData) -> Result<Rc<dyn EntityEvent>, FactoryError> {
        self.create_event(data)
    }

    fn build_world_component(
        &self,
        data: &dyn WorldComponentData,
    ) -> Result<Box<dyn WorldComponent>, FactoryError> {
        self.create_world_component(data)
    }

    fn strict(&self) -> bool {
        self.strict
    }
}
