use std::collections::{HashSet, VecDeque};
use std::sync::Arc;

use crate::core::{MappingError, Result, TypeInformation};
use crate::reflect::{Method, TypeDescriptor, TypeRegistry};

/// Marker interface whose type arguments name a repository's domain and id
/// types.
pub const REPOSITORY_TYPE: &str = "Repository";

/// A repository interface together with the domain and id types it manages.
#[derive(Debug, Clone)]
pub struct RepositoryMetadata {
    repository_interface: Arc<TypeDescriptor>,
    domain_type: TypeInformation,
    id_type: TypeInformation,
    registry: TypeRegistry,
}

impl RepositoryMetadata {
    pub fn new(
        registry: &TypeRegistry,
        repository_interface: &str,
        domain_type: TypeInformation,
        id_type: TypeInformation,
    ) -> Result<Self> {
        let repository_interface = registry
            .required_descriptor(&TypeInformation::of(repository_interface))?;

        Ok(Self {
            repository_interface,
            domain_type,
            id_type,
            registry: registry.clone(),
        })
    }

    /// Reads domain and id type from the `Repository<T, ID>` the interface
    /// extends, directly or through other generic interfaces.
    pub fn from_interface(registry: &TypeRegistry, repository_interface: &str) -> Result<Self> {
        let descriptor = registry.required_descriptor(&TypeInformation::of(repository_interface))?;

        let mut queue: VecDeque<TypeInformation> = descriptor.interfaces.iter().cloned().collect();
        let mut visited = HashSet::new();

        while let Some(candidate) = queue.pop_front() {
            if candidate.name() == REPOSITORY_TYPE {
                let arguments = candidate.type_arguments();
                if let [domain, id] = arguments.as_slice() {
                    return Self::new(
                        registry,
                        repository_interface,
                        (*domain).clone(),
                        (*id).clone(),
                    );
                }
            }

            if !visited.insert(candidate.name().to_string()) {
                continue;
            }
            if let Some(parent) = registry.descriptor(candidate.name()) {
                let bindings = parent.bindings(&candidate);
                queue.extend(parent.interfaces.iter().map(|i| i.resolve(&bindings)));
            }
        }

        Err(MappingError::Mapping(format!(
            "Could not resolve domain and id type of {}; it does not extend {}<T, ID>",
            repository_interface, REPOSITORY_TYPE
        )))
    }

    pub fn repository_interface(&self) -> &TypeDescriptor {
        &self.repository_interface
    }

    pub fn domain_type(&self) -> &TypeInformation {
        &self.domain_type
    }

    pub fn id_type(&self) -> &TypeInformation {
        &self.id_type
    }

    pub fn registry(&self) -> &TypeRegistry {
        &self.registry
    }

    /// Declared and inherited methods of the repository interface.
    pub fn methods(&self) -> Vec<Method> {
        self.registry.all_methods(&self.repository_interface.name)
    }

    /// Whether the interface is the bare marker itself.
    pub fn is_generic_repository_interface(&self) -> bool {
        self.repository_interface.name == REPOSITORY_TYPE
    }
}
