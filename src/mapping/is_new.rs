use crate::core::{Bean, MappingError, Result, TypeInformation, Value};

/// Contract for types that track whether they have been persisted.
pub const PERSISTABLE_TYPE: &str = "Persistable";

/// Bean field consulted for [`PERSISTABLE_TYPE`] implementors.
pub const PERSISTABLE_NEW_FLAG: &str = "new";

/// How an entity decides whether a given instance is new.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IsNewStrategy {
    /// The bean's own `new` flag decides.
    Persistable,
    /// Null (or, for numeric primitives, zero) in the named property means new.
    Property { name: String, primitive: bool },
    /// No id or version property: every instance is new.
    AlwaysNew,
}

impl IsNewStrategy {
    /// Strategy for an entity whose version property (preferred) or id
    /// property has the given name and type.
    pub fn for_property(name: &str, type_info: &TypeInformation) -> Result<Self> {
        let primitive = type_info.is_primitive();
        if primitive && matches!(type_info.name(), "boolean" | "char") {
            return Err(MappingError::InvalidArgument(format!(
                "Only numeric primitives are supported as identifier / version field types; Got: {}",
                type_info
            )));
        }

        Ok(Self::Property {
            name: name.to_string(),
            primitive,
        })
    }

    pub fn is_new(&self, bean: &Bean) -> Result<bool> {
        match self {
            Self::Persistable => bean.get(PERSISTABLE_NEW_FLAG).as_bool().ok_or_else(|| {
                MappingError::TypeMismatch(format!(
                    "'{}' implements {} but its '{}' flag is not a boolean",
                    bean.type_name(),
                    PERSISTABLE_TYPE,
                    PERSISTABLE_NEW_FLAG
                ))
            }),
            Self::Property { name, primitive } => match bean.get(name) {
                Value::Null => Ok(true),
                _ if !primitive => Ok(false),
                value if value.is_numeric() => Ok(value.as_f64() == Some(0.0)),
                value => Err(MappingError::InvalidArgument(format!(
                    "Could not determine whether '{}' is new; unsupported value '{}' for property '{}'",
                    bean.type_name(),
                    value,
                    name
                ))),
            },
            Self::AlwaysNew => Ok(true),
        }
    }
}
