// ============================================================================
// Datamapping Library
// ============================================================================
//
// Entity metadata and repository composition over dynamically described
// types: property path parsing, persistent entity discovery, path-based bean
// access and fragment-based repository dispatch.

pub mod core;
pub mod mapping;
pub mod reflect;
pub mod repository;

// Re-export main types for convenience
pub use core::{Bean, MappingError, Result, TypeInformation, Value};

pub use reflect::{
    AccessorDescriptor, Annotation, AnnotationKind, ConstructorDescriptor, FieldDescriptor,
    SimpleTypeHolder, TypeDescriptor, TypeRegistry,
};

pub use mapping::{
    MappingConfig, MappingContext, PersistentEntity, PersistentProperty, PersistentPropertyPath,
    PersistentPropertyPathAccessor, PropertyPath,
};

pub use repository::{
    DefaultRepositoryInformation, EventPublishingRepository, Method, MethodLookups,
    RepositoryComposition, RepositoryFragment, RepositoryFragments, RepositoryMetadata,
};
