use std::collections::HashMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use super::{MappingError, Result};

/// Primitive (non-nullable) value types. A primitive id or version
/// property signals "new" through a zero value instead of null.
const PRIMITIVES: &[&str] = &[
    "boolean", "byte", "char", "short", "int", "long", "float", "double",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CollectionKind {
    List,
    Set,
}

/// Generic-aware reference to a type known to the registry.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum TypeInformation {
    Named {
        name: String,
        #[serde(default, skip_serializing_if = "Vec::is_empty")]
        arguments: Vec<TypeInformation>,
    },
    Collection {
        collection: CollectionKind,
        element: Box<TypeInformation>,
    },
    Array {
        component: Box<TypeInformation>,
    },
    Map {
        key: Box<TypeInformation>,
        value: Box<TypeInformation>,
    },
    Optional {
        inner: Box<TypeInformation>,
    },
    /// Unbound type parameter such as the `T` of `Page<T>`.
    Variable {
        name: String,
    },
}

impl TypeInformation {
    pub fn of(name: impl Into<String>) -> Self {
        Self::Named {
            name: name.into(),
            arguments: Vec::new(),
        }
    }

    pub fn generic(name: impl Into<String>, arguments: Vec<TypeInformation>) -> Self {
        Self::Named {
            name: name.into(),
            arguments,
        }
    }

    pub fn list_of(element: TypeInformation) -> Self {
        Self::Collection {
            collection: CollectionKind::List,
            element: Box::new(element),
        }
    }

    pub fn set_of(element: TypeInformation) -> Self {
        Self::Collection {
            collection: CollectionKind::Set,
            element: Box::new(element),
        }
    }

    pub fn array_of(component: TypeInformation) -> Self {
        Self::Array {
            component: Box::new(component),
        }
    }

    pub fn map_of(key: TypeInformation, value: TypeInformation) -> Self {
        Self::Map {
            key: Box::new(key),
            value: Box::new(value),
        }
    }

    pub fn optional_of(inner: TypeInformation) -> Self {
        Self::Optional {
            inner: Box::new(inner),
        }
    }

    pub fn variable(name: impl Into<String>) -> Self {
        Self::Variable { name: name.into() }
    }

    /// Raw type name, without type arguments.
    pub fn name(&self) -> &str {
        match self {
            Self::Named { name, .. } | Self::Variable { name } => name,
            Self::Collection {
                collection: CollectionKind::List,
                ..
            } => "List",
            Self::Collection {
                collection: CollectionKind::Set,
                ..
            } => "Set",
            Self::Array { .. } => "Array",
            Self::Map { .. } => "Map",
            Self::Optional { .. } => "Optional",
        }
    }

    pub fn type_arguments(&self) -> Vec<&TypeInformation> {
        match self {
            Self::Named { arguments, .. } => arguments.iter().collect(),
            Self::Collection { element, .. } => vec![element.as_ref()],
            Self::Array { component } => vec![component.as_ref()],
            Self::Map { key, value } => vec![key.as_ref(), value.as_ref()],
            Self::Optional { inner } => vec![inner.as_ref()],
            Self::Variable { .. } => Vec::new(),
        }
    }

    pub fn is_collection_like(&self) -> bool {
        matches!(self, Self::Collection { .. } | Self::Array { .. })
    }

    pub fn is_map(&self) -> bool {
        matches!(self, Self::Map { .. })
    }

    pub fn is_array(&self) -> bool {
        matches!(self, Self::Array { .. })
    }

    pub fn is_nullable_wrapper(&self) -> bool {
        matches!(self, Self::Optional { .. })
    }

    pub fn is_variable(&self) -> bool {
        matches!(self, Self::Variable { .. })
    }

    pub fn is_primitive(&self) -> bool {
        match self {
            Self::Named { name, arguments } => {
                arguments.is_empty() && PRIMITIVES.contains(&name.as_str())
            }
            _ => false,
        }
    }

    /// Element type for collections and arrays, key type for maps, wrapped
    /// type for optionals.
    pub fn component_type(&self) -> Option<&TypeInformation> {
        match self {
            Self::Collection { element, .. } => Some(element),
            Self::Array { component } => Some(component),
            Self::Map { key, .. } => Some(key),
            Self::Optional { inner } => Some(inner),
            Self::Named { .. } | Self::Variable { .. } => None,
        }
    }

    pub fn map_value_type(&self) -> Option<&TypeInformation> {
        match self {
            Self::Map { value, .. } => Some(value),
            _ => None,
        }
    }

    /// Unwraps exactly one level of collection, array, map value or optional.
    pub fn actual_type(&self) -> &TypeInformation {
        match self {
            Self::Map { value, .. } => value,
            Self::Collection { element, .. } => element,
            Self::Array { component } => component,
            Self::Optional { inner } => inner,
            Self::Named { .. } | Self::Variable { .. } => self,
        }
    }

    /// Unwraps containers until a named type (or unbound variable) is reached.
    pub fn leaf_actual_type(&self) -> &TypeInformation {
        let mut current = self;
        loop {
            let next = current.actual_type();
            if std::ptr::eq(next, current) {
                return current;
            }
            current = next;
        }
    }

    /// Like [`actual_type`](Self::actual_type) but fails on unbound variables,
    /// which cannot be navigated into.
    pub fn required_actual_type(&self) -> Result<&TypeInformation> {
        let actual = self.actual_type();
        if actual.is_variable() {
            return Err(MappingError::InvalidArgument(format!(
                "Unable to resolve actual type of '{}'",
                self
            )));
        }
        Ok(actual)
    }

    /// Substitutes bound type variables.
    pub fn resolve(&self, bindings: &HashMap<String, TypeInformation>) -> TypeInformation {
        if bindings.is_empty() {
            return self.clone();
        }

        match self {
            Self::Variable { name } => bindings.get(name).cloned().unwrap_or_else(|| self.clone()),
            Self::Named { name, arguments } => Self::Named {
                name: name.clone(),
                arguments: arguments.iter().map(|a| a.resolve(bindings)).collect(),
            },
            Self::Collection {
                collection,
                element,
            } => Self::Collection {
                collection: *collection,
                element: Box::new(element.resolve(bindings)),
            },
            Self::Array { component } => Self::Array {
                component: Box::new(component.resolve(bindings)),
            },
            Self::Map { key, value } => Self::Map {
                key: Box::new(key.resolve(bindings)),
                value: Box::new(value.resolve(bindings)),
            },
            Self::Optional { inner } => Self::Optional {
                inner: Box::new(inner.resolve(bindings)),
            },
        }
    }

    pub fn has_unbound_variables(&self) -> bool {
        match self {
            Self::Variable { .. } => true,
            _ => self
                .type_arguments()
                .into_iter()
                .any(TypeInformation::has_unbound_variables),
        }
    }
}

impl fmt::Display for TypeInformation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Named { name, arguments } if arguments.is_empty() => write!(f, "{}", name),
            Self::Named { name, arguments } => {
                let args: Vec<String> = arguments.iter().map(ToString::to_string).collect();
                write!(f, "{}<{}>", name, args.join(", "))
            }
            Self::Collection { element, .. } => write!(f, "{}<{}>", self.name(), element),
            Self::Array { component } => write!(f, "{}[]", component),
            Self::Map { key, value } => write!(f, "Map<{}, {}>", key, value),
            Self::Optional { inner } => write!(f, "Optional<{}>", inner),
            Self::Variable { name } => write!(f, "{}", name),
        }
    }
}
