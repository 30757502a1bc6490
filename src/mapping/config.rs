use std::fmt;
use std::sync::Arc;

use super::accessor::{BeanPropertyAccessorFactory, PersistentPropertyAccessorFactory};
use super::entity::PropertyComparator;
use crate::core::TypeInformation;
use crate::reflect::SimpleTypeHolder;

/// Mapping context configuration
#[derive(Clone)]
pub struct MappingConfig {
    /// Fail lookups of types outside the initial entity set
    pub strict: bool,

    /// Leaf types that are never turned into entities
    pub simple_types: SimpleTypeHolder,

    /// Types resolved by `MappingContext::initialize`
    pub initial_entity_set: Vec<TypeInformation>,

    /// Property order applied when an entity is verified
    pub property_comparator: Option<PropertyComparator>,

    /// Attached to every entity it supports
    pub accessor_factory: Arc<dyn PersistentPropertyAccessorFactory>,
}

impl MappingConfig {
    pub fn new() -> Self {
        Self {
            strict: false,
            simple_types: SimpleTypeHolder::default(),
            initial_entity_set: Vec::new(),
            property_comparator: None,
            accessor_factory: Arc::new(BeanPropertyAccessorFactory),
        }
    }

    pub fn strict(mut self, strict: bool) -> Self {
        self.strict = strict;
        self
    }

    pub fn simple_types(mut self, simple_types: SimpleTypeHolder) -> Self {
        self.simple_types = simple_types;
        self
    }

    pub fn initial_entity_set(
        mut self,
        types: impl IntoIterator<Item = TypeInformation>,
    ) -> Self {
        self.initial_entity_set = types.into_iter().collect();
        self
    }

    pub fn property_comparator(mut self, comparator: PropertyComparator) -> Self {
        self.property_comparator = Some(comparator);
        self
    }

    pub fn accessor_factory(mut self, factory: Arc<dyn PersistentPropertyAccessorFactory>) -> Self {
        self.accessor_factory = factory;
        self
    }
}

impl Default for MappingConfig {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for MappingConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MappingConfig")
            .field("strict", &self.strict)
            .field("initial_entity_set", &self.initial_entity_set)
            .field("has_property_comparator", &self.property_comparator.is_some())
            .field("accessor_factory", &self.accessor_factory)
            .finish()
    }
}
