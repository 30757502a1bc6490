//! Persistent entity metadata: property paths, entities and properties, the
//! mapping context that discovers them, and path-based bean access.

pub mod accessor;
pub mod config;
pub mod constructor;
pub mod context;
pub mod entity;
pub mod event;
pub mod filter;
pub mod is_new;
pub mod path;
pub mod path_accessor;
pub mod property;
pub mod property_path;

pub use accessor::{
    BeanPropertyAccessor, BeanPropertyAccessorFactory, IdentifierAccessor,
    PersistentPropertyAccessor, PersistentPropertyAccessorFactory,
};
pub use config::MappingConfig;
pub use constructor::PreferredConstructor;
pub use context::{AnnotationMappingFlavor, MappingContext, MappingFlavor};
pub use entity::{PersistentEntity, PropertyComparator};
pub use event::{MappingContextEvent, MappingEventListener};
pub use is_new::{IsNewStrategy, PERSISTABLE_NEW_FLAG, PERSISTABLE_TYPE};
pub use path::PersistentPropertyPath;
pub use path_accessor::{
    GetNulls, GetOptions, PersistentPropertyPathAccessor, Propagation, SetNulls, SetOptions,
};
pub use property::{
    AnnotationBasedPersistentProperty, Association, PersistentProperty, Property, PropertyCore,
};
pub use property_path::{MAX_PATH_DEPTH, PropertyPath, decapitalize};
