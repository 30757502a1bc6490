use std::fmt;

use super::entity::PersistentEntity;
use super::property::PersistentProperty;
use crate::core::{MappingError, Result, Value};

/// Reads and writes the persistent properties of one bean.
pub trait PersistentPropertyAccessor: Send {
    fn get_property(&self, property: &dyn PersistentProperty) -> Result<Value>;

    fn set_property(&mut self, property: &dyn PersistentProperty, value: Value) -> Result<()>;

    fn bean(&self) -> &Value;

    fn into_bean(self: Box<Self>) -> Value;
}

/// Creates accessors for the entities it supports.
pub trait PersistentPropertyAccessorFactory: fmt::Debug + Send + Sync {
    fn is_supported(&self, entity: &PersistentEntity) -> bool;

    fn accessor_for(
        &self,
        entity: &PersistentEntity,
        bean: Value,
    ) -> Result<Box<dyn PersistentPropertyAccessor>>;
}

/// Accessor working directly on the bean's field map.
///
/// Values are owned, so writing an immutable property through a wither
/// or by re-running the persistence constructor both come down to
/// replacing the field in this accessor's copy.
#[derive(Debug, Clone)]
pub struct BeanPropertyAccessor {
    bean: Value,
    constructor_parameters: Vec<String>,
}

impl BeanPropertyAccessor {
    pub fn new(entity: &PersistentEntity, bean: Value) -> Result<Self> {
        if bean.as_bean().is_none() {
            return Err(MappingError::TypeMismatch(format!(
                "Expected an instance of '{}' but got {}",
                entity.name(),
                bean.type_name()
            )));
        }

        let constructor_parameters = entity
            .persistence_constructor()
            .map(|c| c.parameters().iter().map(|p| p.name.clone()).collect())
            .unwrap_or_default();

        Ok(Self {
            bean,
            constructor_parameters,
        })
    }

    fn owner_name(&self) -> &str {
        self.bean.type_name()
    }
}

impl PersistentPropertyAccessor for BeanPropertyAccessor {
    fn get_property(&self, property: &dyn PersistentProperty) -> Result<Value> {
        if !property.is_field_backed() && !property.has_getter() {
            return Err(MappingError::Mapping(format!(
                "No getter available for property '{}' on '{}'",
                property.name(),
                self.owner_name()
            )));
        }

        let bean = self.bean.as_bean().ok_or_else(|| {
            MappingError::TypeMismatch(format!("'{}' is not a bean", self.owner_name()))
        })?;
        Ok(bean.get(property.name()).clone())
    }

    fn set_property(&mut self, property: &dyn PersistentProperty, value: Value) -> Result<()> {
        let writable = !property.is_immutable()
            || property.has_wither()
            || self.constructor_parameters.iter().any(|p| p == property.name());

        if !writable {
            return Err(MappingError::ImmutableProperty {
                property: property.name().to_string(),
                owner: self.owner_name().to_string(),
            });
        }

        match &mut self.bean {
            Value::Object(bean) => {
                bean.set(property.name(), value);
                Ok(())
            }
            other => Err(MappingError::TypeMismatch(format!(
                "'{}' is not a bean",
                other.type_name()
            ))),
        }
    }

    fn bean(&self) -> &Value {
        &self.bean
    }

    fn into_bean(self: Box<Self>) -> Value {
        self.bean
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct BeanPropertyAccessorFactory;

impl PersistentPropertyAccessorFactory for BeanPropertyAccessorFactory {
    fn is_supported(&self, _entity: &PersistentEntity) -> bool {
        true
    }

    fn accessor_for(
        &self,
        entity: &PersistentEntity,
        bean: Value,
    ) -> Result<Box<dyn PersistentPropertyAccessor>> {
        Ok(Box::new(BeanPropertyAccessor::new(entity, bean)?))
    }
}

/// Snapshot of a bean's identifier.
#[derive(Debug, Clone, PartialEq)]
pub struct IdentifierAccessor {
    identifier: Value,
}

impl IdentifierAccessor {
    pub(crate) fn new(identifier: Value) -> Self {
        Self { identifier }
    }

    /// The identifier, `Value::Null` when unset or when the entity has no
    /// id property.
    pub fn identifier(&self) -> &Value {
        &self.identifier
    }

    pub fn required_identifier(&self) -> Result<&Value> {
        if self.identifier.is_null() {
            return Err(MappingError::InvalidArgument(
                "Could not obtain identifier".to_string(),
            ));
        }
        Ok(&self.identifier)
    }
}
