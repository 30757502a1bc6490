use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AccessType {
    Field,
    Property,
}

/// Mapping markers attached to types, fields, accessors, constructors and methods.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "annotation", content = "value", rename_all = "snake_case")]
pub enum Annotation {
    Id,
    Version,
    Transient,
    /// Reference to another aggregate, optionally naming the target type.
    Reference(Option<String>),
    ReadOnly,
    TypeAlias(String),
    Immutable,
    AccessType(AccessType),
    PersistenceCreator,
    Query(String),
    DomainEvents,
    Custom(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum AnnotationKind {
    Id,
    Version,
    Transient,
    Reference,
    ReadOnly,
    TypeAlias,
    Immutable,
    AccessType,
    PersistenceCreator,
    Query,
    DomainEvents,
    Custom(String),
}

impl Annotation {
    pub fn kind(&self) -> AnnotationKind {
        match self {
            Self::Id => AnnotationKind::Id,
            Self::Version => AnnotationKind::Version,
            Self::Transient => AnnotationKind::Transient,
            Self::Reference(_) => AnnotationKind::Reference,
            Self::ReadOnly => AnnotationKind::ReadOnly,
            Self::TypeAlias(_) => AnnotationKind::TypeAlias,
            Self::Immutable => AnnotationKind::Immutable,
            Self::AccessType(_) => AnnotationKind::AccessType,
            Self::PersistenceCreator => AnnotationKind::PersistenceCreator,
            Self::Query(_) => AnnotationKind::Query,
            Self::DomainEvents => AnnotationKind::DomainEvents,
            Self::Custom(name) => AnnotationKind::Custom(name.clone()),
        }
    }

    pub fn is(&self, kind: &AnnotationKind) -> bool {
        &self.kind() == kind
    }
}

pub fn find_annotation<'a>(
    annotations: &'a [Annotation],
    kind: &AnnotationKind,
) -> Option<&'a Annotation> {
    annotations.iter().find(|a| a.is(kind))
}
