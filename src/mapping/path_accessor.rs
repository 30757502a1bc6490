use std::collections::BTreeMap;

use tracing::warn;

use super::context::MappingContext;
use super::path::PersistentPropertyPath;
use super::property::PersistentProperty;
use crate::core::{MappingError, Result, Value};

/// What a read does when it meets a null intermediate value.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum GetNulls {
    #[default]
    Reject,
    EarlyReturn,
}

/// What a write does when it meets a null intermediate value.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum SetNulls {
    #[default]
    Reject,
    Skip,
    SkipAndLog,
}

/// Whether a write fans out across the elements of a container.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Propagation {
    #[default]
    Propagate,
    Skip,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct GetOptions {
    pub nulls: GetNulls,
}

impl GetOptions {
    pub fn with_nulls(mut self, nulls: GetNulls) -> Self {
        self.nulls = nulls;
        self
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SetOptions {
    pub nulls: SetNulls,
    pub collection_propagation: Propagation,
    pub map_propagation: Propagation,
}

impl SetOptions {
    pub fn with_nulls(mut self, nulls: SetNulls) -> Self {
        self.nulls = nulls;
        self
    }

    pub fn with_collection_propagation(mut self, propagation: Propagation) -> Self {
        self.collection_propagation = propagation;
        self
    }

    pub fn with_map_propagation(mut self, propagation: Propagation) -> Self {
        self.map_propagation = propagation;
        self
    }

    fn propagates(&self, property: &dyn PersistentProperty) -> bool {
        if property.is_collection_like() {
            self.collection_propagation == Propagation::Propagate
        } else if property.is_map() {
            self.map_propagation == Propagation::Propagate
        } else {
            true
        }
    }
}

/// Reads and writes values along [`PersistentPropertyPath`]s of one bean.
///
/// Every hop resolves the entity of the value actually found there, so a
/// subtype stored in a property declared with its supertype is accessed
/// through the subtype's metadata.
pub struct PersistentPropertyPathAccessor<'a> {
    context: &'a MappingContext,
    bean: Value,
}

impl<'a> PersistentPropertyPathAccessor<'a> {
    pub fn new(context: &'a MappingContext, bean: Value) -> Self {
        Self { context, bean }
    }

    pub fn bean(&self) -> &Value {
        &self.bean
    }

    pub fn into_bean(self) -> Value {
        self.bean
    }

    pub fn get_property(&self, path: &PersistentPropertyPath) -> Result<Value> {
        self.get_property_with(path, GetOptions::default())
    }

    /// Value at the end of `path`; the bean itself for the empty path.
    pub fn get_property_with(
        &self,
        path: &PersistentPropertyPath,
        options: GetOptions,
    ) -> Result<Value> {
        let mut current = self.bean.clone();

        for property in path.iter() {
            if current.is_null() {
                return match options.nulls {
                    GetNulls::Reject => Err(self.null_intermediate(path, property.as_ref())),
                    GetNulls::EarlyReturn => Ok(Value::Null),
                };
            }
            current = self.read(current, property.as_ref())?;
        }

        Ok(current)
    }

    pub fn set_property(&mut self, path: &PersistentPropertyPath, value: Value) -> Result<()> {
        self.set_property_with(path, value, SetOptions::default())
    }

    /// Writes `value` at the end of `path`. Collection- and map-valued
    /// intermediates receive the write on every element, producing new
    /// containers; the previous ones are not modified.
    pub fn set_property_with(
        &mut self,
        path: &PersistentPropertyPath,
        value: Value,
        options: SetOptions,
    ) -> Result<()> {
        let properties: Vec<&dyn PersistentProperty> = path.iter().map(|p| &**p).collect();
        if properties.is_empty() {
            return Err(MappingError::InvalidArgument(
                "Cannot set a value through an empty path".to_string(),
            ));
        }

        if let Some(updated) = self.write(&self.bean, &properties, &value, path, options)? {
            self.bean = updated;
        }
        Ok(())
    }

    fn read(&self, target: Value, property: &dyn PersistentProperty) -> Result<Value> {
        let entity = self.context.persistent_entity_for_value(&target)?;
        entity.property_accessor(target)?.get_property(property)
    }

    fn assign(&self, target: Value, property: &dyn PersistentProperty, value: Value) -> Result<Value> {
        let entity = self.context.persistent_entity_for_value(&target)?;
        let mut accessor = entity.property_accessor(target)?;
        accessor.set_property(property, value)?;
        Ok(accessor.into_bean())
    }

    /// Returns the updated `target`, or `None` when the write was skipped.
    fn write(
        &self,
        target: &Value,
        properties: &[&dyn PersistentProperty],
        value: &Value,
        path: &PersistentPropertyPath,
        options: SetOptions,
    ) -> Result<Option<Value>> {
        let (head, rest) = match properties.split_first() {
            Some((head, rest)) => (*head, rest),
            None => return Ok(Some(value.clone())),
        };

        if rest.is_empty() {
            return self.assign(target.clone(), head, value.clone()).map(Some);
        }

        let child = self.read(target.clone(), head)?;
        if child.is_null() {
            return self.skip_null(path, rest[0], options);
        }

        let updated = if head.is_collection_like() || head.is_map() {
            if !options.propagates(head) {
                return Ok(None);
            }
            self.write_elements(child, rest, value, path, options)?
        } else {
            match self.write(&child, rest, value, path, options)? {
                Some(updated) => updated,
                None => return Ok(None),
            }
        };

        self.assign(target.clone(), head, updated).map(Some)
    }

    fn write_elements(
        &self,
        container: Value,
        rest: &[&dyn PersistentProperty],
        value: &Value,
        path: &PersistentPropertyPath,
        options: SetOptions,
    ) -> Result<Value> {
        let update = |element: Value| -> Result<Value> {
            if element.is_null() {
                return Ok(element);
            }
            Ok(self
                .write(&element, rest, value, path, options)?
                .unwrap_or(element))
        };

        match container {
            Value::List(items) => Ok(Value::List(
                items.into_iter().map(update).collect::<Result<Vec<_>>>()?,
            )),
            Value::Set(items) => Ok(Value::set_of(
                items.into_iter().map(update).collect::<Result<Vec<_>>>()?,
            )),
            Value::Map(entries) => Ok(Value::Map(
                entries
                    .into_iter()
                    .map(|(key, element)| -> Result<(String, Value)> {
                        Ok((key, update(element)?))
                    })
                    .collect::<Result<BTreeMap<_, _>>>()?,
            )),
            other => Err(MappingError::TypeMismatch(format!(
                "Expected a collection or map at '{}' but found {}",
                path.to_dot_path(),
                other.type_name()
            ))),
        }
    }

    fn skip_null(
        &self,
        path: &PersistentPropertyPath,
        property: &dyn PersistentProperty,
        options: SetOptions,
    ) -> Result<Option<Value>> {
        match options.nulls {
            SetNulls::Reject => Err(self.null_intermediate(path, property)),
            SetNulls::Skip => Ok(None),
            SetNulls::SkipAndLog => {
                warn!(
                    path = %path,
                    property = property.name(),
                    bean = self.bean.type_name(),
                    "skipping write through null intermediate"
                );
                Ok(None)
            }
        }
    }

    fn null_intermediate(
        &self,
        path: &PersistentPropertyPath,
        property: &dyn PersistentProperty,
    ) -> MappingError {
        MappingError::NullIntermediate {
            path: path.to_dot_path(),
            property: property.name().to_string(),
            owner: self.bean.type_name().to_string(),
        }
    }
}
