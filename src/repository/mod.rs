//! Repository composition: fragments, method lookup and dispatch, repository
//! metadata and the domain event publishing decorator.

pub mod composition;
pub mod events;
pub mod fragment;
pub mod information;
pub mod lookup;
pub mod metadata;

pub use crate::reflect::Method;
pub use composition::{ArgumentConverter, RepositoryComposition};
pub use events::{DomainEventPublisher, EventPublishingRepository};
pub use fragment::{
    FragmentImplementation, FunctionFragment, MethodHandler, RepositoryFragment,
    RepositoryFragments,
};
pub use information::DefaultRepositoryInformation;
pub use lookup::{MethodLookup, MethodLookups, MethodPredicate, PredicateLookup};
pub use metadata::{REPOSITORY_TYPE, RepositoryMetadata};
