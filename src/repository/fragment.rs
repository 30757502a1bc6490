use std::fmt;
use std::sync::Arc;

use dashmap::DashMap;
use tracing::trace;

use crate::core::{MappingError, Result, Value};
use crate::reflect::{Method, TypeDescriptor};

/// An object backing repository methods.
pub trait FragmentImplementation: Send + Sync {
    fn type_name(&self) -> &str;

    /// Methods this implementation can be invoked with.
    fn methods(&self) -> Vec<Method>;

    fn invoke(&self, method: &Method, args: Vec<Value>) -> Result<Value>;
}

pub type MethodHandler = Arc<dyn Fn(&[Value]) -> Result<Value> + Send + Sync>;

/// Implementation assembled from one closure per method.
#[derive(Clone)]
pub struct FunctionFragment {
    type_name: String,
    handlers: Vec<(Method, MethodHandler)>,
}

impl FunctionFragment {
    pub fn new(type_name: impl Into<String>) -> Self {
        Self {
            type_name: type_name.into(),
            handlers: Vec::new(),
        }
    }

    pub fn method<F>(mut self, mut method: Method, handler: F) -> Self
    where
        F: Fn(&[Value]) -> Result<Value> + Send + Sync + 'static,
    {
        if method.declaring_type.is_empty() {
            method.declaring_type = self.type_name.clone();
        }
        self.handlers.push((method, Arc::new(handler)));
        self
    }
}

impl FragmentImplementation for FunctionFragment {
    fn type_name(&self) -> &str {
        &self.type_name
    }

    fn methods(&self) -> Vec<Method> {
        self.handlers.iter().map(|(m, _)| m.clone()).collect()
    }

    fn invoke(&self, method: &Method, args: Vec<Value>) -> Result<Value> {
        let (_, handler) = self
            .handlers
            .iter()
            .find(|(m, _)| m.signature_matches(method))
            .ok_or_else(|| MappingError::NoImplementation(method.to_string()))?;
        handler(&args)
    }
}

impl fmt::Debug for FunctionFragment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let methods: Vec<String> = self.handlers.iter().map(|(m, _)| m.to_string()).collect();
        f.debug_struct("FunctionFragment")
            .field("type_name", &self.type_name)
            .field("methods", &methods)
            .finish()
    }
}

/// One unit of a composed repository: a signature contributor plus an
/// optional implementation.
#[derive(Clone)]
pub struct RepositoryFragment {
    signature_contributor: String,
    methods: Arc<[Method]>,
    implementation: Option<Arc<dyn FragmentImplementation>>,
}

impl RepositoryFragment {
    /// Signature only; cannot be invoked until an implementation is attached.
    pub fn structural(interface: &TypeDescriptor) -> Self {
        Self {
            signature_contributor: interface.name.clone(),
            methods: interface.methods.clone().into(),
            implementation: None,
        }
    }

    /// The implementation contributes its own signature.
    pub fn implemented(implementation: Arc<dyn FragmentImplementation>) -> Self {
        Self {
            signature_contributor: implementation.type_name().to_string(),
            methods: implementation.methods().into(),
            implementation: Some(implementation),
        }
    }

    /// `interface` contributes the signature, `implementation` the behaviour.
    pub fn implemented_as(
        interface: &TypeDescriptor,
        implementation: Arc<dyn FragmentImplementation>,
    ) -> Self {
        Self::structural(interface).with_implementation(implementation)
    }

    pub fn with_implementation(&self, implementation: Arc<dyn FragmentImplementation>) -> Self {
        Self {
            signature_contributor: self.signature_contributor.clone(),
            methods: Arc::clone(&self.methods),
            implementation: Some(implementation),
        }
    }

    pub fn signature_contributor(&self) -> &str {
        &self.signature_contributor
    }

    pub fn methods(&self) -> &[Method] {
        &self.methods
    }

    /// Whether the signature declares a method with the same name and
    /// parameter types.
    pub fn has_method(&self, method: &Method) -> bool {
        self.methods.iter().any(|m| m.signature_matches(method))
    }

    pub fn implementation(&self) -> Option<&Arc<dyn FragmentImplementation>> {
        self.implementation.as_ref()
    }
}

impl fmt::Debug for RepositoryFragment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RepositoryFragment")
            .field("signature_contributor", &self.signature_contributor)
            .field(
                "implementation",
                &self.implementation.as_ref().map(|i| i.type_name().to_string()),
            )
            .finish()
    }
}

impl fmt::Display for RepositoryFragment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.implementation {
            Some(implementation) => write!(
                f,
                "ImplementedRepositoryFragment {}:{}",
                self.signature_contributor,
                implementation.type_name()
            ),
            None => write!(f, "StructuralRepositoryFragment {}", self.signature_contributor),
        }
    }
}

/// Ordered fragments. Earlier fragments take precedence when several
/// implement the same method.
pub struct RepositoryFragments {
    fragments: Arc<[RepositoryFragment]>,
    fragment_cache: DashMap<Method, usize>,
}

impl RepositoryFragments {
    fn from_vec(fragments: Vec<RepositoryFragment>) -> Self {
        Self {
            fragments: fragments.into(),
            fragment_cache: DashMap::new(),
        }
    }

    pub fn empty() -> Self {
        Self::from_vec(Vec::new())
    }

    /// Implemented fragments for each of `implementations`, in order.
    pub fn just(implementations: impl IntoIterator<Item = Arc<dyn FragmentImplementation>>) -> Self {
        Self::from_vec(
            implementations
                .into_iter()
                .map(RepositoryFragment::implemented)
                .collect(),
        )
    }

    pub fn of(fragments: impl IntoIterator<Item = RepositoryFragment>) -> Self {
        Self::from_vec(fragments.into_iter().collect())
    }

    /// New instance with `fragment` placed last.
    pub fn append(&self, fragment: RepositoryFragment) -> Self {
        let mut fragments = self.fragments.to_vec();
        fragments.push(fragment);
        Self::from_vec(fragments)
    }

    pub fn append_all(&self, other: &RepositoryFragments) -> Self {
        let mut fragments = self.fragments.to_vec();
        fragments.extend(other.iter().cloned());
        Self::from_vec(fragments)
    }

    pub fn iter(&self) -> impl Iterator<Item = &RepositoryFragment> {
        self.fragments.iter()
    }

    /// Methods of all fragments in fragment order.
    pub fn methods(&self) -> impl Iterator<Item = &Method> {
        self.fragments.iter().flat_map(|f| f.methods().iter())
    }

    pub fn len(&self) -> usize {
        self.fragments.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fragments.is_empty()
    }

    fn find_implementation_fragment(&self, method: &Method) -> Result<usize> {
        if let Some(index) = self
            .fragments
            .iter()
            .position(|f| f.has_method(method) && f.implementation().is_some())
        {
            return Ok(index);
        }

        if self.fragments.iter().any(|f| f.has_method(method)) {
            return Err(MappingError::NoImplementation(method.to_string()));
        }
        Err(MappingError::NoFragmentFound(method.to_string()))
    }

    /// Calls `to_call` on the first fragment that declares and implements it.
    pub fn invoke(&self, invoked: &Method, to_call: &Method, args: Vec<Value>) -> Result<Value> {
        let cached = self.fragment_cache.get(to_call).map(|index| *index);
        let index = match cached {
            Some(index) => index,
            None => {
                let index = self.find_implementation_fragment(to_call)?;
                self.fragment_cache.insert(to_call.clone(), index);
                index
            }
        };

        let fragment = &self.fragments[index];
        let implementation = fragment
            .implementation()
            .ok_or_else(|| MappingError::NoImplementation(to_call.to_string()))?;

        trace!(invoked = %invoked, fragment = %fragment, "dispatching repository method");
        implementation.invoke(to_call, args)
    }
}

impl Clone for RepositoryFragments {
    fn clone(&self) -> Self {
        Self {
            fragments: Arc::clone(&self.fragments),
            fragment_cache: DashMap::new(),
        }
    }
}

impl Default for RepositoryFragments {
    fn default() -> Self {
        Self::empty()
    }
}

impl fmt::Debug for RepositoryFragments {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.fragments.iter()).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::TypeInformation;

    fn find_by_name() -> Method {
        Method::new("findByName").parameter(TypeInformation::of("String"))
    }

    fn finder(type_name: &str, answer: &'static str) -> Arc<dyn FragmentImplementation> {
        Arc::new(
            FunctionFragment::new(type_name)
                .method(find_by_name(), move |_| Ok(Value::Text(answer.to_string()))),
        )
    }

    #[test]
    fn test_first_implementing_fragment_wins() {
        let fragments = RepositoryFragments::just([finder("First", "first"), finder("Second", "second")]);
        let method = find_by_name();

        let result = fragments.invoke(&method, &method, vec![]).unwrap();
        assert_eq!(result, Value::Text("first".to_string()));
    }

    #[test]
    fn test_structural_fragment_is_skipped() {
        let interface = TypeDescriptor::interface("Finder").method(find_by_name());
        let fragments = RepositoryFragments::of([RepositoryFragment::structural(&interface)])
            .append(RepositoryFragment::implemented(finder("Impl", "impl")));
        let method = find_by_name();

        let result = fragments.invoke(&method, &method, vec![]).unwrap();
        assert_eq!(result, Value::Text("impl".to_string()));
    }

    #[test]
    fn test_declared_but_unimplemented() {
        let interface = TypeDescriptor::interface("Finder").method(find_by_name());
        let fragments = RepositoryFragments::of([RepositoryFragment::structural(&interface)]);
        let method = find_by_name();

        assert!(matches!(
            fragments.invoke(&method, &method, vec![]),
            Err(MappingError::NoImplementation(_))
        ));
    }

    #[test]
    fn test_append_keeps_original() {
        let original = RepositoryFragments::empty();
        let appended = original.append(RepositoryFragment::implemented(finder("Impl", "impl")));

        assert!(original.is_empty());
        assert_eq!(appended.len(), 1);
    }
}
