use std::fmt;
use std::sync::Arc;

use super::property::PersistentProperty;
use crate::core::{MappingError, Result, TypeInformation};

/// Ordered chain of resolved persistent properties, e.g. `address.city`
/// as the `User.address` and `Address.city` property objects.
///
/// The empty path is a valid value: it has neither base nor leaf property
/// and is its own parent.
#[derive(Clone, Default)]
pub struct PersistentPropertyPath {
    properties: Vec<Arc<dyn PersistentProperty>>,
}

fn same_property(a: &Arc<dyn PersistentProperty>, b: &Arc<dyn PersistentProperty>) -> bool {
    Arc::ptr_eq(a, b)
        || (a.name() == b.name()
            && a.owner_type() == b.owner_type()
            && a.type_information() == b.type_information())
}

impl PersistentPropertyPath {
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn of(property: Arc<dyn PersistentProperty>) -> Self {
        Self {
            properties: vec![property],
        }
    }

    /// New path with `property` appended; its owner must be the actual
    /// type of the current leaf.
    pub fn append(&self, property: Arc<dyn PersistentProperty>) -> Result<Self> {
        if let Some(leaf) = self.leaf_property()
            && leaf.actual_type().name() != property.owner_type().name()
        {
            return Err(MappingError::InvalidArgument(format!(
                "Cannot append property '{}' of {} to path '{}' ending in {}",
                property.name(),
                property.owner_type(),
                self.to_dot_path(),
                leaf.actual_type()
            )));
        }

        let mut properties = self.properties.clone();
        properties.push(property);
        Ok(Self { properties })
    }

    pub fn append_path(&self, other: &PersistentPropertyPath) -> Result<Self> {
        other
            .properties
            .iter()
            .try_fold(self.clone(), |path, property| path.append(Arc::clone(property)))
    }

    pub fn base_property(&self) -> Option<&Arc<dyn PersistentProperty>> {
        self.properties.first()
    }

    pub fn leaf_property(&self) -> Option<&Arc<dyn PersistentProperty>> {
        self.properties.last()
    }

    pub fn required_leaf_property(&self) -> Result<&Arc<dyn PersistentProperty>> {
        self.leaf_property()
            .ok_or_else(|| MappingError::InvalidArgument("No leaf property found".to_string()))
    }

    /// Path without its leaf. The parent of the empty path is the empty path.
    pub fn parent_path(&self) -> Self {
        match self.properties.split_last() {
            Some((_, parent)) => Self {
                properties: parent.to_vec(),
            },
            None => self.clone(),
        }
    }

    pub fn len(&self) -> usize {
        self.properties.len()
    }

    pub fn is_empty(&self) -> bool {
        self.properties.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Arc<dyn PersistentProperty>> {
        self.properties.iter()
    }

    /// Property names joined by `.`; empty for the empty path.
    pub fn to_dot_path(&self) -> String {
        self.to_path(".", |p| Some(p.name().to_string()))
            .unwrap_or_default()
    }

    /// Joins the converted segments with `delimiter`. Segments converted to
    /// `None` or an empty string are skipped; `None` if nothing remains.
    pub fn to_path<F>(&self, delimiter: &str, converter: F) -> Option<String>
    where
        F: Fn(&dyn PersistentProperty) -> Option<String>,
    {
        let parts: Vec<String> = self
            .properties
            .iter()
            .filter_map(|p| converter(p.as_ref()))
            .filter(|s| !s.is_empty())
            .collect();

        (!parts.is_empty()).then(|| parts.join(delimiter))
    }

    /// Whether `path` starts with all of this path's properties.
    pub fn is_base_path_of(&self, path: &PersistentPropertyPath) -> bool {
        self.len() <= path.len()
            && self
                .properties
                .iter()
                .zip(&path.properties)
                .all(|(a, b)| same_property(a, b))
    }

    /// The remainder of this path after `base`, or this path unchanged when
    /// `base` is not a prefix of it.
    pub fn extension_for_base_of(&self, base: &PersistentPropertyPath) -> Self {
        if !base.is_base_path_of(self) {
            return self.clone();
        }
        Self {
            properties: self.properties[base.len()..].to_vec(),
        }
    }

    pub fn contains_property_of_type(&self, type_info: &TypeInformation) -> bool {
        self.properties
            .iter()
            .any(|p| p.actual_type() == type_info)
    }
}

impl PartialEq for PersistentPropertyPath {
    fn eq(&self, other: &Self) -> bool {
        self.len() == other.len() && self.is_base_path_of(other)
    }
}

impl Eq for PersistentPropertyPath {}

impl fmt::Debug for PersistentPropertyPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("PersistentPropertyPath")
            .field(&self.to_dot_path())
            .finish()
    }
}

impl fmt::Display for PersistentPropertyPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_dot_path())
    }
}
