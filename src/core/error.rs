use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum MappingError {
    #[error("No property '{property}' found for type '{owner}'{}", traversed(.resolved))]
    PropertyReference {
        property: String,
        owner: String,
        resolved: Vec<String>,
    },

    #[error(
        "Trying to parse a path with depth greater than {0}; This has been disabled to prevent parsing overflows"
    )]
    ParseDepthExceeded(usize),

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("Mapping error: {0}")]
    Mapping(String),

    #[error(
        "Attempt to add id property '{candidate}' but already have property '{existing}' registered as id on '{owner}'; Check your mapping configuration"
    )]
    DuplicateIdProperty {
        owner: String,
        existing: String,
        candidate: String,
    },

    #[error(
        "Attempt to add version property '{candidate}' but already have property '{existing}' registered as version on '{owner}'; Check your mapping configuration"
    )]
    DuplicateVersionProperty {
        owner: String,
        existing: String,
        candidate: String,
    },

    #[error("Unknown persistent entity '{0}'")]
    UnknownEntity(String),

    #[error("Introspection of '{0}' failed: {1}")]
    Introspection(String, String),

    #[error("Cannot access property '{property}' on null intermediate; Original path was '{path}' on '{owner}'")]
    NullIntermediate {
        path: String,
        property: String,
        owner: String,
    },

    #[error("Type mismatch: {0}")]
    TypeMismatch(String),

    #[error("Cannot set property '{property}' on '{owner}': no setter, no wither and not a constructor argument")]
    ImmutableProperty { property: String, owner: String },

    #[error("No fragment found for method {0}")]
    NoFragmentFound(String),

    #[error("No implementation found for method {0}")]
    NoImplementation(String),

    #[error("Lock error: {0}")]
    LockError(String),
}

pub type Result<T> = std::result::Result<T, MappingError>;

fn traversed(resolved: &[String]) -> String {
    if resolved.is_empty() {
        String::new()
    } else {
        format!("; Traversed path: {}", resolved.join("."))
    }
}

impl MappingError {
    /// Number of segments that were resolved before a property lookup failed.
    /// Zero for every other error kind.
    pub fn resolution_depth(&self) -> usize {
        match self {
            Self::PropertyReference { resolved, .. } => resolved.len(),
            _ => 0,
        }
    }

    pub fn has_deeper_resolution_than(&self, other: &MappingError) -> bool {
        self.resolution_depth() > other.resolution_depth()
    }

    pub fn is_property_reference(&self) -> bool {
        matches!(self, Self::PropertyReference { .. })
    }
}

impl<T> From<std::sync::PoisonError<T>> for MappingError {
    fn from(err: std::sync::PoisonError<T>) -> Self {
        Self::LockError(err.to_string())
    }
}

impl From<serde_json::Error> for MappingError {
    fn from(err: serde_json::Error) -> Self {
        Self::Introspection("json".to_string(), err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_property_reference_message() {
        let err = MappingError::PropertyReference {
            property: "zip".into(),
            owner: "Address".into(),
            resolved: vec!["address".into()],
        };
        assert_eq!(
            err.to_string(),
            "No property 'zip' found for type 'Address'; Traversed path: address"
        );
    }

    #[test]
    fn test_deeper_resolution() {
        let shallow = MappingError::PropertyReference {
            property: "a".into(),
            owner: "User".into(),
            resolved: vec![],
        };
        let deep = MappingError::PropertyReference {
            property: "b".into(),
            owner: "Address".into(),
            resolved: vec!["address".into()],
        };
        assert!(deep.has_deeper_resolution_than(&shallow));
        assert!(!shallow.has_deeper_resolution_than(&deep));
    }
}
