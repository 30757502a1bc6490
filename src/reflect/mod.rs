//! Type introspection without runtime reflection.
//!
//! Domain types are described up front and registered in a
//! [`TypeRegistry`]; everything above this layer (property paths, mapping
//! contexts, repository dispatch) reads shapes from here only.

pub mod annotation;
pub mod descriptor;
pub mod registry;
pub mod simple_types;

pub use annotation::{AccessType, Annotation, AnnotationKind, find_annotation};
pub use descriptor::{
    AccessorDescriptor, ConstructorDescriptor, FieldDescriptor, FieldModifiers, Method,
    MethodModifiers, ParameterDescriptor, TypeDescriptor, TypeKind,
};
pub use registry::{DEFAULT_PATH_CACHE_CAPACITY, TypeRegistry};
pub use simple_types::SimpleTypeHolder;
