use std::cmp::Ordering;
use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, Mutex, OnceLock, PoisonError, RwLock, RwLockReadGuard};

use tracing::trace;

use super::accessor::{
    BeanPropertyAccessorFactory, IdentifierAccessor, PersistentPropertyAccessor,
    PersistentPropertyAccessorFactory,
};
use super::constructor::PreferredConstructor;
use super::is_new::{IsNewStrategy, PERSISTABLE_TYPE};
use super::property::{Association, PersistentProperty};
use crate::core::{MappingError, Result, TypeInformation, Value};
use crate::reflect::{Annotation, AnnotationKind, TypeDescriptor, TypeRegistry};

/// Orders an entity's properties during [`PersistentEntity::verify`].
pub type PropertyComparator =
    Arc<dyn Fn(&dyn PersistentProperty, &dyn PersistentProperty) -> Ordering + Send + Sync>;

#[derive(Default)]
struct EntityState {
    properties: Vec<Arc<dyn PersistentProperty>>,
    persistent_properties: Vec<Arc<dyn PersistentProperty>>,
    property_cache: HashMap<String, Arc<dyn PersistentProperty>>,
    associations: Vec<Association>,
    id_property: Option<Arc<dyn PersistentProperty>>,
    version_property: Option<Arc<dyn PersistentProperty>>,
    verified: bool,
}

/// Persistence-relevant shape of one domain type.
///
/// Populated by a single discovery pass through `&self` (the entity is
/// already shared by then so that cyclic references can find it), then
/// sealed by [`verify`](Self::verify).
pub struct PersistentEntity {
    type_info: TypeInformation,
    descriptor: Arc<TypeDescriptor>,
    constructor: Option<PreferredConstructor>,
    comparator: Option<PropertyComparator>,
    is_persistable: bool,
    state: RwLock<EntityState>,
    annotation_cache: Mutex<HashMap<AnnotationKind, Option<Annotation>>>,
    property_annotation_cache: Mutex<HashMap<AnnotationKind, Vec<Arc<dyn PersistentProperty>>>>,
    type_alias: OnceLock<Option<String>>,
    is_new_strategy: OnceLock<Result<IsNewStrategy>>,
    accessor_factory: RwLock<Arc<dyn PersistentPropertyAccessorFactory>>,
}

impl PersistentEntity {
    pub fn new(
        type_info: TypeInformation,
        descriptor: Arc<TypeDescriptor>,
        registry: &TypeRegistry,
    ) -> Self {
        let constructor = PreferredConstructor::discover(&descriptor, &type_info);
        let is_persistable =
            registry.is_assignable(&type_info, &TypeInformation::of(PERSISTABLE_TYPE));

        Self {
            type_info,
            descriptor,
            constructor,
            comparator: None,
            is_persistable,
            state: RwLock::new(EntityState::default()),
            annotation_cache: Mutex::new(HashMap::new()),
            property_annotation_cache: Mutex::new(HashMap::new()),
            type_alias: OnceLock::new(),
            is_new_strategy: OnceLock::new(),
            accessor_factory: RwLock::new(Arc::new(BeanPropertyAccessorFactory)),
        }
    }

    pub fn with_property_comparator(mut self, comparator: PropertyComparator) -> Self {
        self.comparator = Some(comparator);
        self
    }

    // Mutations validate before writing, so a poisoned lock still guards
    // consistent state.
    fn state(&self) -> RwLockReadGuard<'_, EntityState> {
        self.state.read().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn name(&self) -> &str {
        self.type_info.name()
    }

    pub fn type_information(&self) -> &TypeInformation {
        &self.type_info
    }

    pub fn descriptor(&self) -> &TypeDescriptor {
        &self.descriptor
    }

    pub fn persistence_constructor(&self) -> Option<&PreferredConstructor> {
        self.constructor.as_ref()
    }

    pub fn is_constructor_argument(&self, property: &dyn PersistentProperty) -> bool {
        self.constructor
            .as_ref()
            .is_some_and(|c| c.is_constructor_parameter(property.name()))
    }

    /// Registers `property`. Adding the same property twice is a no-op; a
    /// second id or version property is rejected and leaves the entity
    /// unchanged.
    pub fn add_persistent_property(&self, property: Arc<dyn PersistentProperty>) -> Result<()> {
        let mut state = self.state.write()?;

        let already_present = state.properties.iter().any(|existing| {
            Arc::ptr_eq(existing, &property)
                || (existing.name() == property.name()
                    && existing.type_information() == property.type_information())
        });
        if already_present {
            return Ok(());
        }

        let is_id = property.is_id_property();
        if is_id && let Some(existing) = &state.id_property {
            return Err(MappingError::DuplicateIdProperty {
                owner: self.type_info.to_string(),
                existing: existing.name().to_string(),
                candidate: property.name().to_string(),
            });
        }

        let is_version = property.is_version_property();
        if is_version && let Some(existing) = &state.version_property {
            return Err(MappingError::DuplicateVersionProperty {
                owner: self.type_info.to_string(),
                existing: existing.name().to_string(),
                candidate: property.name().to_string(),
            });
        }

        trace!(entity = %self.type_info, property = property.name(), "adding persistent property");

        if is_id {
            state.id_property = Some(Arc::clone(&property));
        }
        if is_version {
            state.version_property = Some(Arc::clone(&property));
        }
        if !property.is_transient() && !property.is_association() {
            state.persistent_properties.push(Arc::clone(&property));
        }
        state
            .property_cache
            .entry(property.name().to_string())
            .or_insert_with(|| Arc::clone(&property));
        state.properties.push(property);

        Ok(())
    }

    pub fn add_association(&self, association: Association) -> Result<()> {
        let mut state = self.state.write()?;
        if !state.associations.contains(&association) {
            state.associations.push(association);
        }
        Ok(())
    }

    /// Applies the property comparator and seals the entity.
    pub fn verify(&self) -> Result<()> {
        let mut state = self.state.write()?;

        if let Some(comparator) = &self.comparator {
            state.properties.sort_by(|a, b| comparator(a.as_ref(), b.as_ref()));
            state
                .persistent_properties
                .sort_by(|a, b| comparator(a.as_ref(), b.as_ref()));

            let order: HashMap<String, usize> = state
                .properties
                .iter()
                .enumerate()
                .map(|(index, p)| (p.name().to_string(), index))
                .collect();
            state
                .associations
                .sort_by_key(|a| order.get(a.inverse()).copied().unwrap_or(usize::MAX));
        }

        state.verified = true;
        Ok(())
    }

    pub fn is_verified(&self) -> bool {
        self.state().verified
    }

    /// Replaces the accessor factory if it supports this entity.
    pub fn set_accessor_factory(&self, factory: Arc<dyn PersistentPropertyAccessorFactory>) {
        if factory.is_supported(self) {
            *self
                .accessor_factory
                .write()
                .unwrap_or_else(PoisonError::into_inner) = factory;
        }
    }

    pub fn properties(&self) -> Vec<Arc<dyn PersistentProperty>> {
        self.state().properties.clone()
    }

    /// Properties that are neither transient nor associations.
    pub fn persistent_properties(&self) -> Vec<Arc<dyn PersistentProperty>> {
        self.state().persistent_properties.clone()
    }

    pub fn associations(&self) -> Vec<Association> {
        self.state().associations.clone()
    }

    pub fn persistent_property(&self, name: &str) -> Option<Arc<dyn PersistentProperty>> {
        self.state().property_cache.get(name).cloned()
    }

    pub fn required_persistent_property(&self, name: &str) -> Result<Arc<dyn PersistentProperty>> {
        self.persistent_property(name).ok_or_else(|| {
            MappingError::Mapping(format!(
                "Required property '{}' not found for {}",
                name, self.type_info
            ))
        })
    }

    /// Properties carrying an annotation of `kind`. Cached once the entity
    /// is verified.
    pub fn persistent_properties_with(&self, kind: &AnnotationKind) -> Vec<Arc<dyn PersistentProperty>> {
        let state = self.state();
        let compute = || -> Vec<Arc<dyn PersistentProperty>> {
            state
                .properties
                .iter()
                .filter(|p| p.is_annotation_present(kind))
                .cloned()
                .collect()
        };

        if !state.verified {
            return compute();
        }

        let mut cache = self
            .property_annotation_cache
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        cache.entry(kind.clone()).or_insert_with(compute).clone()
    }

    pub fn id_property(&self) -> Option<Arc<dyn PersistentProperty>> {
        self.state().id_property.clone()
    }

    pub fn required_id_property(&self) -> Result<Arc<dyn PersistentProperty>> {
        self.id_property().ok_or_else(|| {
            MappingError::Mapping(format!("Required identifier property not found for {}", self.type_info))
        })
    }

    pub fn version_property(&self) -> Option<Arc<dyn PersistentProperty>> {
        self.state().version_property.clone()
    }

    pub fn has_id_property(&self) -> bool {
        self.state().id_property.is_some()
    }

    pub fn has_version_property(&self) -> bool {
        self.state().version_property.is_some()
    }

    pub fn is_id_property(&self, property: &dyn PersistentProperty) -> bool {
        self.state()
            .id_property
            .as_ref()
            .is_some_and(|id| id.name() == property.name())
    }

    pub fn is_version_property(&self, property: &dyn PersistentProperty) -> bool {
        self.state()
            .version_property
            .as_ref()
            .is_some_and(|version| version.name() == property.name())
    }

    pub fn find_annotation(&self, kind: &AnnotationKind) -> Option<Annotation> {
        let mut cache = self
            .annotation_cache
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        cache
            .entry(kind.clone())
            .or_insert_with(|| self.descriptor.find_annotation(kind).cloned())
            .clone()
    }

    pub fn is_annotation_present(&self, kind: &AnnotationKind) -> bool {
        self.find_annotation(kind).is_some()
    }

    pub fn type_alias(&self) -> Option<&str> {
        self.type_alias
            .get_or_init(|| match self.descriptor.find_annotation(&AnnotationKind::TypeAlias) {
                Some(Annotation::TypeAlias(alias)) if !alias.is_empty() => Some(alias.clone()),
                _ => None,
            })
            .as_deref()
    }

    pub fn is_immutable(&self) -> bool {
        self.is_annotation_present(&AnnotationKind::Immutable)
    }

    /// Whether instances need properties set after construction, i.e. some
    /// non-transient property is not a constructor argument.
    pub fn requires_property_population(&self) -> bool {
        if self.is_immutable() {
            return false;
        }
        self.state()
            .properties
            .iter()
            .any(|p| !(self.is_constructor_argument(p.as_ref()) || p.is_transient()))
    }

    pub fn property_accessor(&self, bean: Value) -> Result<Box<dyn PersistentPropertyAccessor>> {
        let factory = Arc::clone(
            &self
                .accessor_factory
                .read()
                .unwrap_or_else(PoisonError::into_inner),
        );
        factory.accessor_for(self, bean)
    }

    pub fn identifier_accessor(&self, bean: &Value) -> Result<IdentifierAccessor> {
        let bean = bean.as_bean().ok_or_else(|| {
            MappingError::TypeMismatch(format!(
                "Expected an instance of '{}' but got {}",
                self.name(),
                bean.type_name()
            ))
        })?;

        let identifier = self
            .id_property()
            .map(|id| bean.get(id.name()).clone())
            .unwrap_or(Value::Null);
        Ok(IdentifierAccessor::new(identifier))
    }

    fn compute_is_new_strategy(&self) -> Result<IsNewStrategy> {
        if self.is_persistable {
            return Ok(IsNewStrategy::Persistable);
        }

        match self.version_property().or_else(|| self.id_property()) {
            Some(property) => {
                IsNewStrategy::for_property(property.name(), property.type_information())
            }
            None => Ok(IsNewStrategy::AlwaysNew),
        }
    }

    pub fn is_new(&self, bean: &Value) -> Result<bool> {
        let bean = bean.as_bean().ok_or_else(|| {
            MappingError::TypeMismatch(format!(
                "Expected an instance of '{}' but got {}",
                self.name(),
                bean.type_name()
            ))
        })?;

        let strategy = self
            .is_new_strategy
            .get_or_init(|| self.compute_is_new_strategy())
            .clone()?;
        strategy.is_new(bean)
    }
}

impl fmt::Debug for PersistentEntity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.state();
        let names: Vec<&str> = state.properties.iter().map(|p| p.name()).collect();
        f.debug_struct("PersistentEntity")
            .field("type", &self.type_info.to_string())
            .field("properties", &names)
            .field("verified", &state.verified)
            .finish()
    }
}

impl fmt::Display for PersistentEntity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "PersistentEntity({})", self.type_info)
    }
}
