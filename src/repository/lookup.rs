use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use super::metadata::RepositoryMetadata;
use crate::core::TypeInformation;
use crate::reflect::{Method, TypeRegistry};

/// Decides whether `candidate` (a fragment method) can serve `invoked` (the
/// repository interface method).
pub type MethodPredicate = Arc<dyn Fn(&Method, &Method) -> bool + Send + Sync>;

/// Ordered predicates; the first predicate that matches any candidate wins.
pub trait MethodLookup: Send + Sync {
    fn lookups(&self) -> Vec<MethodPredicate>;

    /// This lookup's predicates followed by `other`'s.
    fn and(&self, other: &dyn MethodLookup) -> PredicateLookup {
        let mut lookups = self.lookups();
        lookups.extend(other.lookups());
        PredicateLookup { lookups }
    }
}

/// A lookup made of explicit predicates.
#[derive(Clone, Default)]
pub struct PredicateLookup {
    lookups: Vec<MethodPredicate>,
}

impl PredicateLookup {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with<F>(mut self, predicate: F) -> Self
    where
        F: Fn(&Method, &Method) -> bool + Send + Sync + 'static,
    {
        self.lookups.push(Arc::new(predicate));
        self
    }
}

impl MethodLookup for PredicateLookup {
    fn lookups(&self) -> Vec<MethodPredicate> {
        self.lookups.clone()
    }
}

impl fmt::Debug for PredicateLookup {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PredicateLookup")
            .field("lookups", &self.lookups.len())
            .finish()
    }
}

pub struct MethodLookups;

impl MethodLookups {
    /// Same name, same arity and identical parameter types.
    pub fn direct() -> PredicateLookup {
        PredicateLookup::new().with(|invoked, candidate| {
            invoked.name == candidate.name
                && invoked.parameter_count() == candidate.parameter_count()
                && invoked.parameter_types == candidate.parameter_types
        })
    }

    /// Direct matching first, then matching with the repository's type
    /// variables bound to its domain and id types. A parameter matches when
    /// the invoked type is assignable to the candidate type.
    pub fn for_repository_types(metadata: &RepositoryMetadata) -> PredicateLookup {
        let registry = metadata.registry().clone();
        let bindings = repository_bindings(metadata);

        MethodLookups::direct().with(move |invoked, candidate| {
            invoked.name == candidate.name
                && invoked.parameter_count() == candidate.parameter_count()
                && invoked
                    .parameter_types
                    .iter()
                    .zip(&candidate.parameter_types)
                    .all(|(i, c)| parameter_matches(&registry, &bindings, i, c))
        })
    }
}

/// Binds the interface's own type parameters as well as the conventional
/// `T` and `ID` names.
fn repository_bindings(metadata: &RepositoryMetadata) -> HashMap<String, TypeInformation> {
    let mut bindings = HashMap::new();
    bindings.insert("T".to_string(), metadata.domain_type().clone());
    bindings.insert("ID".to_string(), metadata.id_type().clone());

    let interface = metadata.repository_interface();
    if let [domain, id] = interface.type_parameters.as_slice() {
        bindings.insert(domain.clone(), metadata.domain_type().clone());
        bindings.insert(id.clone(), metadata.id_type().clone());
    }
    bindings
}

fn parameter_matches(
    registry: &TypeRegistry,
    bindings: &HashMap<String, TypeInformation>,
    invoked: &TypeInformation,
    candidate: &TypeInformation,
) -> bool {
    let invoked = invoked.resolve(bindings);
    let candidate = candidate.resolve(bindings);

    if invoked == candidate {
        return true;
    }

    match (&invoked, &candidate) {
        (TypeInformation::Named { .. }, TypeInformation::Named { .. }) => {
            registry.is_assignable(&invoked, &candidate)
        }
        // containers match on their raw kind and assignable element types
        _ if invoked.name() == candidate.name() => {
            let (i, c) = (invoked.type_arguments(), candidate.type_arguments());
            i.len() == c.len()
                && i.iter()
                    .zip(&c)
                    .all(|(i, c)| parameter_matches(registry, bindings, *i, *c))
        }
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reflect::TypeDescriptor;

    fn first_match(lookup: &dyn MethodLookup, invoked: &Method, candidates: &[Method]) -> Option<Method> {
        lookup.lookups().iter().find_map(|predicate| {
            candidates.iter().find(|c| predicate(invoked, *c)).cloned()
        })
    }

    #[test]
    fn test_direct_requires_exact_parameters() {
        let invoked = Method::on("Repo", "save").parameter(TypeInformation::of("User"));
        let exact = Method::on("Impl", "save").parameter(TypeInformation::of("User"));
        let other = Method::on("Impl", "save").parameter(TypeInformation::of("Object"));

        let lookup = MethodLookups::direct();
        assert_eq!(first_match(&lookup, &invoked, &[other.clone(), exact.clone()]), Some(exact));
        assert_eq!(first_match(&lookup, &invoked, &[other]), None);
    }

    #[test]
    fn test_repository_types_bind_domain_and_id() {
        let registry = TypeRegistry::new()
            .with_type(TypeDescriptor::interface("Repository").type_parameter("T").type_parameter("ID"))
            .unwrap()
            .with_type(TypeDescriptor::interface("UserRepository").implements(
                TypeInformation::generic(
                    "Repository",
                    vec![TypeInformation::of("User"), TypeInformation::of("Long")],
                ),
            ))
            .unwrap();
        let metadata = RepositoryMetadata::from_interface(&registry, "UserRepository").unwrap();

        let invoked = Method::on("UserRepository", "findById").parameter(TypeInformation::of("Long"));
        let generic = Method::on("SimpleRepository", "findById")
            .parameter(TypeInformation::variable("ID"));
        let wrong = Method::on("SimpleRepository", "findById").parameter(TypeInformation::of("String"));

        let lookup = MethodLookups::for_repository_types(&metadata);
        assert_eq!(
            first_match(&lookup, &invoked, &[wrong, generic.clone()]),
            Some(generic)
        );
    }

    #[test]
    fn test_and_appends_predicates() {
        let lookup = MethodLookups::direct().and(&PredicateLookup::new().with(|i, c| i.name == c.name));
        assert_eq!(lookup.lookups().len(), 2);
    }
}
