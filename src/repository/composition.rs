use std::fmt;
use std::sync::Arc;

use dashmap::DashMap;
use tracing::trace;

use super::fragment::{RepositoryFragment, RepositoryFragments};
use super::lookup::{MethodLookup, MethodLookups};
use super::metadata::RepositoryMetadata;
use crate::core::{MappingError, Result, Value};
use crate::reflect::Method;

/// Adapts raw invocation arguments to the resolved fragment method.
pub type ArgumentConverter = Arc<dyn Fn(&Method, Vec<Value>) -> Vec<Value> + Send + Sync>;

fn pass_through() -> ArgumentConverter {
    Arc::new(|_: &Method, args: Vec<Value>| args)
}

/// A repository assembled from ordered fragments.
///
/// Immutable: every `with_*`/`append*` returns a new composition. Method
/// resolution is memoized per composition instance.
#[derive(Clone)]
pub struct RepositoryComposition {
    fragments: RepositoryFragments,
    method_lookup: Arc<dyn MethodLookup>,
    argument_converter: ArgumentConverter,
    metadata: Option<Arc<RepositoryMetadata>>,
    method_cache: Arc<DashMap<Method, Option<Method>>>,
}

impl RepositoryComposition {
    pub fn empty() -> Self {
        Self::of_fragments(RepositoryFragments::empty())
    }

    pub fn of(fragments: impl IntoIterator<Item = RepositoryFragment>) -> Self {
        Self::of_fragments(RepositoryFragments::of(fragments))
    }

    pub fn of_fragments(fragments: RepositoryFragments) -> Self {
        Self {
            fragments,
            method_lookup: Arc::new(MethodLookups::direct()),
            argument_converter: pass_through(),
            metadata: None,
            method_cache: Arc::new(DashMap::new()),
        }
    }

    /// Same lookup, converter and metadata over different fragments.
    pub fn with_fragments(&self, fragments: RepositoryFragments) -> Self {
        Self {
            fragments,
            method_lookup: Arc::clone(&self.method_lookup),
            argument_converter: Arc::clone(&self.argument_converter),
            metadata: self.metadata.clone(),
            method_cache: Arc::new(DashMap::new()),
        }
    }

    pub fn append(&self, fragment: RepositoryFragment) -> Self {
        self.with_fragments(self.fragments.append(fragment))
    }

    pub fn append_all(&self, fragments: &RepositoryFragments) -> Self {
        self.with_fragments(self.fragments.append_all(fragments))
    }

    pub fn with_argument_converter<F>(&self, converter: F) -> Self
    where
        F: Fn(&Method, Vec<Value>) -> Vec<Value> + Send + Sync + 'static,
    {
        let mut composition = self.with_fragments(self.fragments.clone());
        composition.argument_converter = Arc::new(converter);
        composition
    }

    pub fn with_method_lookup(&self, lookup: impl MethodLookup + 'static) -> Self {
        let mut composition = self.with_fragments(self.fragments.clone());
        composition.method_lookup = Arc::new(lookup);
        composition
    }

    pub fn with_metadata(&self, metadata: RepositoryMetadata) -> Self {
        let mut composition = self.with_fragments(self.fragments.clone());
        composition.metadata = Some(Arc::new(metadata));
        composition
    }

    pub fn is_empty(&self) -> bool {
        self.fragments.is_empty()
    }

    pub fn fragments(&self) -> &RepositoryFragments {
        &self.fragments
    }

    pub fn argument_converter(&self) -> &ArgumentConverter {
        &self.argument_converter
    }

    pub fn method_lookup(&self) -> &Arc<dyn MethodLookup> {
        &self.method_lookup
    }

    pub fn metadata(&self) -> Option<&RepositoryMetadata> {
        self.metadata.as_deref()
    }

    /// The fragment method serving `method`: predicates are tried in order
    /// and the first one with any match picks the first matching method in
    /// fragment order.
    pub fn find_method(&self, method: &Method) -> Option<Method> {
        if let Some(cached) = self.method_cache.get(method) {
            return cached.value().clone();
        }

        let resolved = self.method_lookup.lookups().iter().find_map(|predicate| {
            self.fragments
                .methods()
                .find(|candidate| predicate(method, *candidate))
                .cloned()
        });

        trace!(
            method = %method,
            resolved = ?resolved.as_ref().map(ToString::to_string),
            "resolved repository method"
        );

        self.method_cache
            .entry(method.clone())
            .or_insert(resolved)
            .value()
            .clone()
    }

    pub fn invoke(&self, method: &Method, args: Vec<Value>) -> Result<Value> {
        let to_call = self
            .find_method(method)
            .ok_or_else(|| MappingError::NoFragmentFound(method.to_string()))?;

        let args = (self.argument_converter)(&to_call, args);
        self.fragments.invoke(method, &to_call, args)
    }

    /// Every fragment that contributes methods must carry an implementation.
    pub fn validate_implementation(&self) -> Result<()> {
        for fragment in self.fragments.iter() {
            if !fragment.methods().is_empty() && fragment.implementation().is_none() {
                let repository = self
                    .metadata
                    .as_ref()
                    .map(|m| m.repository_interface().name.clone())
                    .unwrap_or_else(|| "repository".to_string());
                return Err(MappingError::Mapping(format!(
                    "Fragment {} used in {} has no implementation",
                    fragment.signature_contributor(),
                    repository
                )));
            }
        }
        Ok(())
    }
}

impl Default for RepositoryComposition {
    fn default() -> Self {
        Self::empty()
    }
}

impl fmt::Debug for RepositoryComposition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RepositoryComposition")
            .field("fragments", &self.fragments)
            .field(
                "repository",
                &self.metadata.as_ref().map(|m| m.repository_interface().name.clone()),
            )
            .finish()
    }
}
