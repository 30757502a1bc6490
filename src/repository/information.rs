use std::sync::Arc;

use dashmap::DashMap;

use super::composition::RepositoryComposition;
use super::fragment::{RepositoryFragment, RepositoryFragments};
use super::metadata::RepositoryMetadata;
use crate::core::{Result, TypeInformation};
use crate::reflect::{AnnotationKind, Method, TypeDescriptor};

/// Everything known about one repository: its interface, the base class
/// backing CRUD methods and the custom fragments composed into it.
#[derive(Debug)]
pub struct DefaultRepositoryInformation {
    metadata: Arc<RepositoryMetadata>,
    repository_base_class: Arc<TypeDescriptor>,
    composition: RepositoryComposition,
    base_composition: RepositoryComposition,
    method_cache: DashMap<Method, Method>,
}

impl DefaultRepositoryInformation {
    pub fn new(
        metadata: RepositoryMetadata,
        repository_base_class: &str,
        composition: RepositoryComposition,
    ) -> Result<Self> {
        let repository_base_class = metadata
            .registry()
            .required_descriptor(&TypeInformation::of(repository_base_class))?;

        // base class methods resolve with the same lookup and conversion as
        // the custom fragments
        let base_composition = composition.with_fragments(RepositoryFragments::of([
            RepositoryFragment::structural(&repository_base_class),
        ]));

        Ok(Self {
            metadata: Arc::new(metadata),
            repository_base_class,
            composition,
            base_composition,
            method_cache: DashMap::new(),
        })
    }

    pub fn metadata(&self) -> &RepositoryMetadata {
        &self.metadata
    }

    pub fn domain_type(&self) -> &TypeInformation {
        self.metadata.domain_type()
    }

    pub fn id_type(&self) -> &TypeInformation {
        self.metadata.id_type()
    }

    pub fn repository_interface(&self) -> &TypeDescriptor {
        self.metadata.repository_interface()
    }

    pub fn repository_base_class(&self) -> &TypeDescriptor {
        &self.repository_base_class
    }

    pub fn fragments(&self) -> &RepositoryFragments {
        self.composition.fragments()
    }

    /// The method that will actually run for `method`: a custom fragment
    /// method first, then a base class method, else `method` itself.
    pub fn target_class_method(&self, method: &Method) -> Method {
        if let Some(cached) = self.method_cache.get(method) {
            return cached.value().clone();
        }

        let target = self
            .composition
            .find_method(method)
            .or_else(|| self.base_composition.find_method(method))
            .unwrap_or_else(|| method.clone());

        self.method_cache
            .entry(method.clone())
            .or_insert(target)
            .value()
            .clone()
    }

    pub fn is_custom_method(&self, method: &Method) -> bool {
        self.composition.find_method(method).is_some()
    }

    pub fn is_base_class_method(&self, method: &Method) -> bool {
        self.base_composition.find_method(method).is_some()
    }

    /// Query methods are neither bridge, default nor static, and are either
    /// annotated with a query or served by neither fragments nor the base
    /// class.
    pub fn is_query_method_candidate(&self, method: &Method) -> bool {
        let modifiers = &method.modifiers;
        if modifiers.is_bridge || modifiers.is_default || modifiers.is_static {
            return false;
        }

        method.find_annotation(&AnnotationKind::Query).is_some()
            || (!self.is_custom_method(method) && !self.is_base_class_method(method))
    }

    pub fn query_methods(&self) -> Vec<Method> {
        self.metadata
            .methods()
            .into_iter()
            .filter(|method| self.is_query_method_candidate(method))
            .collect()
    }

    pub fn has_query_methods(&self) -> bool {
        self.metadata
            .methods()
            .iter()
            .any(|method| self.is_query_method_candidate(method))
    }

    /// Whether the interface exposes a method implemented by a custom
    /// fragment that the base class does not also provide.
    pub fn has_custom_method(&self) -> bool {
        if self.metadata.is_generic_repository_interface() {
            return false;
        }

        self.metadata
            .methods()
            .iter()
            .any(|method| self.is_custom_method(method) && !self.is_base_class_method(method))
    }
}
