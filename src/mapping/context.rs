//! Mapping context: discovers and caches persistent entities per type.
//!
//! Lookups take the read lock only. Creating an entity takes the write lock
//! once and hands the locked map down through the whole recursive
//! discovery, so nested entity types are resolved without re-locking. The
//! entity is cached before its properties are populated; a property that
//! (transitively) points back at it finds the cached handle instead of
//! recursing forever.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use dashmap::DashMap;
use tracing::{debug, trace};

use super::config::MappingConfig;
use super::entity::PersistentEntity;
use super::event::{MappingContextEvent, MappingEventListener};
use super::filter::{is_mappable_accessor, is_mappable_field};
use super::path::PersistentPropertyPath;
use super::path_accessor::PersistentPropertyPathAccessor;
use super::property::{AnnotationBasedPersistentProperty, PersistentProperty, Property};
use super::property_path::PropertyPath;
use crate::core::{MappingError, Result, TypeInformation, Value};
use crate::reflect::{SimpleTypeHolder, TypeDescriptor, TypeKind, TypeRegistry};

/// `None` marks a type looked up before and found not to be an entity.
type EntityCache = HashMap<TypeInformation, Option<Arc<PersistentEntity>>>;

/// Store-specific hooks of a mapping context.
pub trait MappingFlavor: Send + Sync {
    fn create_persistent_entity(
        &self,
        type_info: &TypeInformation,
        descriptor: Arc<TypeDescriptor>,
        registry: &TypeRegistry,
    ) -> Result<PersistentEntity>;

    fn create_persistent_property(
        &self,
        property: Property,
        owner: &Arc<PersistentEntity>,
        simple_types: &SimpleTypeHolder,
    ) -> Arc<dyn PersistentProperty>;

    /// Only plain named types that are neither simple, enums nor
    /// unsupported kinds become entities.
    fn should_create_persistent_entity_for(
        &self,
        type_info: &TypeInformation,
        simple_types: &SimpleTypeHolder,
        registry: &TypeRegistry,
    ) -> bool {
        if !matches!(type_info, TypeInformation::Named { .. })
            || simple_types.is_simple_type(type_info)
        {
            return false;
        }

        !matches!(
            registry.descriptor(type_info.name()).map(|d| d.kind),
            Some(TypeKind::Enum | TypeKind::Unsupported)
        )
    }
}

/// Creates [`AnnotationBasedPersistentProperty`] instances.
#[derive(Debug, Clone, Copy, Default)]
pub struct AnnotationMappingFlavor;

impl MappingFlavor for AnnotationMappingFlavor {
    fn create_persistent_entity(
        &self,
        type_info: &TypeInformation,
        descriptor: Arc<TypeDescriptor>,
        registry: &TypeRegistry,
    ) -> Result<PersistentEntity> {
        Ok(PersistentEntity::new(type_info.clone(), descriptor, registry))
    }

    fn create_persistent_property(
        &self,
        property: Property,
        owner: &Arc<PersistentEntity>,
        simple_types: &SimpleTypeHolder,
    ) -> Arc<dyn PersistentProperty> {
        Arc::new(AnnotationBasedPersistentProperty::new(property, owner, simple_types))
    }
}

pub struct MappingContext {
    registry: TypeRegistry,
    flavor: Arc<dyn MappingFlavor>,
    config: MappingConfig,
    simple_types: SimpleTypeHolder,
    entities: RwLock<EntityCache>,
    property_paths: DashMap<(TypeInformation, String), PersistentPropertyPath>,
    listeners: RwLock<Vec<Arc<dyn MappingEventListener>>>,
}

impl MappingContext {
    pub fn new(
        registry: TypeRegistry,
        flavor: impl MappingFlavor + 'static,
        config: MappingConfig,
    ) -> Self {
        // registered enums are leaf values
        let simple_types = registry
            .type_names()
            .into_iter()
            .filter(|name| {
                registry
                    .descriptor(name)
                    .is_some_and(|d| d.kind == TypeKind::Enum)
            })
            .fold(config.simple_types.clone(), |holder, name| holder.register(name));

        Self {
            registry,
            flavor: Arc::new(flavor),
            config,
            simple_types,
            entities: RwLock::new(HashMap::new()),
            property_paths: DashMap::new(),
            listeners: RwLock::new(Vec::new()),
        }
    }

    /// Annotation-driven context with the default configuration.
    pub fn annotation_based(registry: TypeRegistry) -> Self {
        Self::new(registry, AnnotationMappingFlavor, MappingConfig::default())
    }

    pub fn registry(&self) -> &TypeRegistry {
        &self.registry
    }

    pub fn simple_types(&self) -> &SimpleTypeHolder {
        &self.simple_types
    }

    pub fn config(&self) -> &MappingConfig {
        &self.config
    }

    pub fn add_listener(&self, listener: impl MappingEventListener + 'static) -> Result<()> {
        self.listeners.write()?.push(Arc::new(listener));
        Ok(())
    }

    /// Resolves every type of the configured initial entity set. Strict mode
    /// does not apply here.
    pub fn initialize(&self) -> Result<()> {
        for type_info in &self.config.initial_entity_set {
            self.add_persistent_entity(type_info)?;
        }
        Ok(())
    }

    fn should_create(&self, type_info: &TypeInformation) -> bool {
        self.flavor
            .should_create_persistent_entity_for(type_info, &self.simple_types, &self.registry)
    }

    /// The entity for `type_info`, creating it on first use. `None` for
    /// types that are not entities (that answer is cached too).
    pub fn persistent_entity(
        &self,
        type_info: &TypeInformation,
    ) -> Result<Option<Arc<PersistentEntity>>> {
        if let Some(cached) = self.entities.read()?.get(type_info) {
            trace!(type_info = %type_info, "persistent entity cache hit");
            return Ok(cached.clone());
        }

        if !self.should_create(type_info) {
            let mut entities = self.entities.write()?;
            return Ok(entities.entry(type_info.clone()).or_insert(None).clone());
        }

        if self.config.strict {
            return Err(MappingError::UnknownEntity(type_info.to_string()));
        }

        self.add_persistent_entity(type_info)
    }

    pub fn required_persistent_entity(
        &self,
        type_info: &TypeInformation,
    ) -> Result<Arc<PersistentEntity>> {
        self.persistent_entity(type_info)?.ok_or_else(|| {
            MappingError::Mapping(format!("Couldn't find PersistentEntity for type {}", type_info))
        })
    }

    /// The entity behind an entity-typed property, `None` otherwise.
    pub fn persistent_entity_for_property(
        &self,
        property: &dyn PersistentProperty,
    ) -> Result<Option<Arc<PersistentEntity>>> {
        if !property.is_entity() {
            return Ok(None);
        }
        let actual = property.type_information().required_actual_type()?;
        self.persistent_entity(actual)
    }

    /// Entity for the runtime type of `value`, which must be a bean.
    pub fn persistent_entity_for_value(&self, value: &Value) -> Result<Arc<PersistentEntity>> {
        let bean = value.as_bean().ok_or_else(|| {
            MappingError::TypeMismatch(format!("Expected a bean but got {}", value.type_name()))
        })?;
        self.required_persistent_entity(&TypeInformation::of(bean.type_name()))
    }

    /// True only for types with a created entity; negatively cached and
    /// never-seen types both answer false.
    pub fn has_persistent_entity_for(&self, type_info: &TypeInformation) -> Result<bool> {
        Ok(matches!(self.entities.read()?.get(type_info), Some(Some(_))))
    }

    /// Creates and caches the entity for `type_info` unless an answer is
    /// cached already.
    pub fn add_persistent_entity(
        &self,
        type_info: &TypeInformation,
    ) -> Result<Option<Arc<PersistentEntity>>> {
        if let Some(cached) = self.entities.read()?.get(type_info) {
            return Ok(cached.clone());
        }

        let mut created = Vec::new();
        let result = {
            let mut entities = self.entities.write()?;
            self.discover(&mut entities, type_info, &mut created)
        };

        self.publish(&created)?;
        result
    }

    fn discover(
        &self,
        entities: &mut EntityCache,
        type_info: &TypeInformation,
        created: &mut Vec<MappingContextEvent>,
    ) -> Result<Option<Arc<PersistentEntity>>> {
        // another thread may have won the race for the write lock
        if let Some(cached) = entities.get(type_info) {
            return Ok(cached.clone());
        }

        debug!(type_info = %type_info, "discovering persistent entity");

        let descriptor = self.registry.required_descriptor(type_info)?;
        let mut entity = self
            .flavor
            .create_persistent_entity(type_info, descriptor, &self.registry)?;
        if let Some(comparator) = &self.config.property_comparator {
            entity = entity.with_property_comparator(Arc::clone(comparator));
        }
        let entity = Arc::new(entity);

        entities.insert(type_info.clone(), Some(Arc::clone(&entity)));

        if let Err(err) = self.populate(entities, &entity, created) {
            debug!(type_info = %type_info, error = %err, "entity discovery failed");
            entities.remove(type_info);
            return Err(err);
        }

        created.push(MappingContextEvent::new(type_info.clone(), Arc::clone(&entity)));
        Ok(Some(entity))
    }

    fn populate(
        &self,
        entities: &mut EntityCache,
        entity: &Arc<PersistentEntity>,
        created: &mut Vec<MappingContextEvent>,
    ) -> Result<()> {
        let type_info = entity.type_information();
        let fields = self.registry.resolved_fields(type_info)?;
        let mut remaining = self.registry.resolved_accessors(type_info)?;

        for field in fields.into_iter().filter(is_mappable_field) {
            let accessor = remaining
                .iter()
                .position(|a| a.name == field.name)
                .map(|index| remaining.remove(index));
            self.register_property(entities, entity, Property::of_field(field, accessor), created)?;
        }

        for accessor in remaining
            .into_iter()
            .filter(|a| a.supports_standalone() && is_mappable_accessor(a))
        {
            self.register_property(entities, entity, Property::of_accessor(accessor), created)?;
        }

        entity.verify()?;
        entity.set_accessor_factory(Arc::clone(&self.config.accessor_factory));
        Ok(())
    }

    fn register_property(
        &self,
        entities: &mut EntityCache,
        entity: &Arc<PersistentEntity>,
        input: Property,
        created: &mut Vec<MappingContextEvent>,
    ) -> Result<()> {
        let field_backed = input.is_field_backed();
        let property = self
            .flavor
            .create_persistent_property(input, entity, &self.simple_types);

        if property.is_transient() || (!field_backed && !property.uses_property_access()) {
            return Ok(());
        }

        entity.add_persistent_property(Arc::clone(&property))?;
        if let Some(association) = property.association() {
            entity.add_association(association)?;
        }

        if property.raw_type_name() == entity.name() {
            return Ok(());
        }

        for nested in property.persistent_entity_types() {
            if self.should_create(&nested) {
                self.discover(entities, &nested, created)?;
            }
        }
        Ok(())
    }

    fn publish(&self, events: &[MappingContextEvent]) -> Result<()> {
        if events.is_empty() {
            return Ok(());
        }

        let listeners = self.listeners.read()?.clone();
        for event in events {
            for listener in &listeners {
                listener.on_entity_created(event);
            }
        }
        Ok(())
    }

    /// All created entities.
    pub fn persistent_entities(&self) -> Result<Vec<Arc<PersistentEntity>>> {
        Ok(self.entities.read()?.values().flatten().cloned().collect())
    }

    /// Types with a created entity.
    pub fn managed_types(&self) -> Result<Vec<TypeInformation>> {
        Ok(self
            .entities
            .read()?
            .iter()
            .filter(|(_, entity)| entity.is_some())
            .map(|(type_info, _)| type_info.clone())
            .collect())
    }

    pub fn persistent_property_path(&self, path: &PropertyPath) -> Result<PersistentPropertyPath> {
        self.persistent_property_path_from(&path.to_dot_path(), path.owning_type())
    }

    /// Resolves a dot path against the entities reachable from `type_info`.
    pub fn persistent_property_path_from(
        &self,
        source: &str,
        type_info: &TypeInformation,
    ) -> Result<PersistentPropertyPath> {
        let key = (type_info.clone(), source.trim().to_string());
        if let Some(path) = self.property_paths.get(&key) {
            return Ok(path.clone());
        }

        let path = self.create_persistent_property_path(&key.1, type_info)?;
        self.property_paths.insert(key, path.clone());
        Ok(path)
    }

    fn create_persistent_property_path(
        &self,
        source: &str,
        type_info: &TypeInformation,
    ) -> Result<PersistentPropertyPath> {
        let mut path = PersistentPropertyPath::empty();
        if source.is_empty() {
            return Ok(path);
        }

        let segments: Vec<&str> = source.split('.').collect();
        let mut current = self.required_persistent_entity(type_info)?;

        for (index, segment) in segments.iter().enumerate() {
            let property = current.persistent_property(segment).ok_or_else(|| {
                MappingError::PropertyReference {
                    property: segment.to_string(),
                    owner: current.type_information().to_string(),
                    resolved: path.iter().map(|p| p.name().to_string()).collect(),
                }
            })?;

            if index + 1 < segments.len() {
                let actual = property.type_information().required_actual_type()?;
                current = self.required_persistent_entity(actual)?;
            }
            path = path.append(property)?;
        }

        Ok(path)
    }

    /// Every path from `type_info` to a property accepted by `filter`,
    /// shortest first. A property whose type already occurs on the path is
    /// not followed, which keeps cyclic graphs finite.
    pub fn find_persistent_property_paths<F>(
        &self,
        type_info: &TypeInformation,
        filter: F,
    ) -> Result<Vec<PersistentPropertyPath>>
    where
        F: Fn(&dyn PersistentProperty) -> bool,
    {
        let mut paths = Vec::new();
        self.collect_paths(type_info, &filter, &PersistentPropertyPath::empty(), &mut paths)?;
        paths.sort_by_key(PersistentPropertyPath::len);
        Ok(paths)
    }

    fn collect_paths(
        &self,
        type_info: &TypeInformation,
        filter: &dyn Fn(&dyn PersistentProperty) -> bool,
        base: &PersistentPropertyPath,
        paths: &mut Vec<PersistentPropertyPath>,
    ) -> Result<()> {
        let Some(entity) = self.persistent_entity(type_info.actual_type())? else {
            return Ok(());
        };

        let associations = entity
            .associations()
            .into_iter()
            .filter_map(|a| entity.persistent_property(a.inverse()));
        let candidates: Vec<Arc<dyn PersistentProperty>> =
            entity.persistent_properties().into_iter().chain(associations).collect();

        for property in candidates {
            let actual = property.actual_type().clone();
            if base.contains_property_of_type(&actual) {
                continue;
            }

            let current = base.append(Arc::clone(&property))?;
            if filter(property.as_ref()) {
                paths.push(current.clone());
            }
            if property.is_entity() {
                self.collect_paths(&actual, filter, &current, paths)?;
            }
        }
        Ok(())
    }

    pub fn property_path_accessor(&self, bean: Value) -> PersistentPropertyPathAccessor<'_> {
        PersistentPropertyPathAccessor::new(self, bean)
    }
}

impl std::fmt::Debug for MappingContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MappingContext")
            .field("registry", &self.registry)
            .field("config", &self.config)
            .finish()
    }
}
