use std::collections::{HashMap, HashSet};
use std::fmt;
use std::sync::Arc;

use tracing::debug;

use super::descriptor::{AccessorDescriptor, FieldDescriptor, Method, TypeDescriptor};
use crate::core::{MappingError, Result, TypeInformation};
use crate::mapping::property_path::PathCache;

pub const DEFAULT_PATH_CACHE_CAPACITY: usize = 256;

/// Registry of type descriptors.
///
/// Copy-on-write: registering a type returns a new registry and leaves the
/// old one untouched, so clones can be handed to other threads without
/// locking. Each registry value owns its own property-path cache.
#[derive(Clone)]
pub struct TypeRegistry {
    types: Arc<HashMap<String, Arc<TypeDescriptor>>>,
    path_cache: Arc<PathCache>,
    path_cache_capacity: usize,
}

impl TypeRegistry {
    pub fn new() -> Self {
        Self {
            types: Arc::new(HashMap::new()),
            path_cache: Arc::new(PathCache::new(DEFAULT_PATH_CACHE_CAPACITY)),
            path_cache_capacity: DEFAULT_PATH_CACHE_CAPACITY,
        }
    }

    pub fn with_path_cache_capacity(self, capacity: usize) -> Self {
        Self {
            types: self.types,
            path_cache: Arc::new(PathCache::new(capacity)),
            path_cache_capacity: capacity,
        }
    }

    /// Registers a type - returns a NEW registry.
    pub fn with_type(self, descriptor: TypeDescriptor) -> Result<Self> {
        if self.types.contains_key(&descriptor.name) {
            return Err(MappingError::Mapping(format!(
                "Type '{}' is already registered",
                descriptor.name
            )));
        }

        debug!(type_name = %descriptor.name, "registering type descriptor");

        let mut new_types = (*self.types).clone();
        new_types.insert(descriptor.name.clone(), Arc::new(descriptor));

        // cached paths may have failed against the old type set
        Ok(Self {
            types: Arc::new(new_types),
            path_cache: Arc::new(PathCache::new(self.path_cache_capacity)),
            path_cache_capacity: self.path_cache_capacity,
        })
    }

    pub fn with_types(self, descriptors: impl IntoIterator<Item = TypeDescriptor>) -> Result<Self> {
        descriptors
            .into_iter()
            .try_fold(self, |registry, descriptor| registry.with_type(descriptor))
    }

    /// Loads a JSON array of type descriptors.
    pub fn from_json(json: &str) -> Result<Self> {
        let descriptors: Vec<TypeDescriptor> = serde_json::from_str(json)?;
        Self::new().with_types(descriptors)
    }

    pub fn descriptor(&self, name: &str) -> Option<Arc<TypeDescriptor>> {
        self.types.get(name).cloned()
    }

    pub fn required_descriptor(&self, type_info: &TypeInformation) -> Result<Arc<TypeDescriptor>> {
        self.descriptor(type_info.name())
            .ok_or_else(|| missing_descriptor(type_info))
    }

    pub fn contains(&self, name: &str) -> bool {
        self.types.contains_key(name)
    }

    pub fn type_names(&self) -> Vec<&str> {
        self.types.keys().map(String::as_str).collect()
    }

    /// Descriptor chain from `type_info` up through its superclasses, each
    /// paired with the type-variable bindings valid at that level.
    fn hierarchy(
        &self,
        type_info: &TypeInformation,
    ) -> Result<Vec<(Arc<TypeDescriptor>, HashMap<String, TypeInformation>)>> {
        let mut levels = Vec::new();
        let mut visited = HashSet::new();
        let mut current = Some(type_info.clone());

        while let Some(type_info) = current.take() {
            if !visited.insert(type_info.name().to_string()) {
                break;
            }

            let descriptor = match self.descriptor(type_info.name()) {
                Some(descriptor) => descriptor,
                None if levels.is_empty() => return Err(missing_descriptor(&type_info)),
                // unregistered supertypes (e.g. Object) end the chain
                None => break,
            };

            let bindings = descriptor.bindings(&type_info);
            current = descriptor.superclass.as_ref().map(|s| s.resolve(&bindings));
            levels.push((descriptor, bindings));
        }

        Ok(levels)
    }

    /// Fields of `type_info` and its superclasses, own fields first, with
    /// type variables resolved.
    pub fn resolved_fields(&self, type_info: &TypeInformation) -> Result<Vec<FieldDescriptor>> {
        let mut fields = Vec::new();
        for (descriptor, bindings) in self.hierarchy(type_info)? {
            for field in &descriptor.fields {
                let mut field = field.clone();
                field.type_info = field.type_info.resolve(&bindings);
                fields.push(field);
            }
        }
        Ok(fields)
    }

    /// Accessor descriptors across the hierarchy; a subclass declaration
    /// hides a superclass one with the same name.
    pub fn resolved_accessors(&self, type_info: &TypeInformation) -> Result<Vec<AccessorDescriptor>> {
        let mut seen = HashSet::new();
        let mut accessors = Vec::new();
        for (descriptor, bindings) in self.hierarchy(type_info)? {
            for accessor in &descriptor.accessors {
                if seen.insert(accessor.name.clone()) {
                    let mut accessor = accessor.clone();
                    accessor.type_info = accessor.type_info.resolve(&bindings);
                    accessors.push(accessor);
                }
            }
        }
        Ok(accessors)
    }

    /// Type of the property `name` declared on `owner`: a field anywhere in
    /// the hierarchy first, then a bean accessor.
    pub fn property_type(&self, owner: &TypeInformation, name: &str) -> Option<TypeInformation> {
        if !matches!(owner, TypeInformation::Named { .. }) {
            return None;
        }

        let levels = self.hierarchy(owner).ok()?;

        let field = levels.iter().find_map(|(descriptor, bindings)| {
            descriptor
                .fields
                .iter()
                .find(|f| f.name == name)
                .map(|f| f.type_info.resolve(bindings))
        });

        field.or_else(|| {
            levels.iter().find_map(|(descriptor, bindings)| {
                descriptor
                    .accessor_named(name)
                    .map(|a| a.type_info.resolve(bindings))
            })
        })
    }

    /// Methods visible on `type_name`: its own, then those inherited from
    /// interfaces and superclasses that it does not redeclare.
    pub fn all_methods(&self, type_name: &str) -> Vec<Method> {
        let mut methods: Vec<Method> = Vec::new();
        let mut visited = HashSet::new();
        let mut queue = vec![type_name.to_string()];

        while let Some(name) = queue.pop() {
            if !visited.insert(name.clone()) {
                continue;
            }
            let Some(descriptor) = self.descriptor(&name) else {
                continue;
            };

            for method in &descriptor.methods {
                if !methods.iter().any(|m| m.signature_matches(method)) {
                    methods.push(method.clone());
                }
            }

            // reversed so the first declared supertype is visited first
            let supertypes = descriptor.superclass.iter().chain(descriptor.interfaces.iter());
            let names: Vec<String> = supertypes.map(|t| t.name().to_string()).collect();
            queue.extend(names.into_iter().rev());
        }

        methods
    }

    /// Raw-type assignability: `from` equals `to` or lists it among its
    /// transitive supertypes.
    pub fn is_assignable(&self, from: &TypeInformation, to: &TypeInformation) -> bool {
        if from.name() == to.name() {
            return true;
        }

        let mut visited = HashSet::new();
        let mut queue = vec![from.name().to_string()];
        while let Some(name) = queue.pop() {
            if name == to.name() {
                return true;
            }
            if !visited.insert(name.clone()) {
                continue;
            }
            if let Some(descriptor) = self.descriptor(&name) {
                queue.extend(descriptor.superclass.iter().map(|t| t.name().to_string()));
                queue.extend(descriptor.interfaces.iter().map(|t| t.name().to_string()));
            }
        }
        false
    }

    pub(crate) fn path_cache(&self) -> &PathCache {
        &self.path_cache
    }
}

fn missing_descriptor(type_info: &TypeInformation) -> MappingError {
    MappingError::Introspection(
        type_info.to_string(),
        "no type descriptor registered".to_string(),
    )
}

impl Default for TypeRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for TypeRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut names = self.type_names();
        names.sort_unstable();
        f.debug_struct("TypeRegistry").field("types", &names).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reflect::FieldDescriptor;

    fn registry() -> TypeRegistry {
        TypeRegistry::new()
            .with_type(
                TypeDescriptor::class("Base")
                    .type_parameter("ID")
                    .field(FieldDescriptor::new("id", TypeInformation::variable("ID"))),
            )
            .unwrap()
            .with_type(
                TypeDescriptor::class("User")
                    .extends(TypeInformation::generic("Base", vec![TypeInformation::of("Long")]))
                    .field(FieldDescriptor::new("firstname", TypeInformation::of("String")))
                    .accessor(AccessorDescriptor::new(
                        "fullName",
                        TypeInformation::of("String"),
                    )),
            )
            .unwrap()
    }

    #[test]
    fn test_copy_on_write() {
        let empty = TypeRegistry::new();
        let with_user = empty.clone().with_type(TypeDescriptor::class("User")).unwrap();

        assert!(!empty.contains("User"));
        assert!(with_user.contains("User"));
        assert!(with_user.with_type(TypeDescriptor::class("User")).is_err());
    }

    #[test]
    fn test_inherited_generic_field() {
        let registry = registry();
        let user = TypeInformation::of("User");

        assert_eq!(
            registry.property_type(&user, "id"),
            Some(TypeInformation::of("Long"))
        );
        assert_eq!(
            registry.property_type(&user, "fullName"),
            Some(TypeInformation::of("String"))
        );
        assert_eq!(registry.property_type(&user, "missing"), None);

        let fields = registry.resolved_fields(&user).unwrap();
        let names: Vec<&str> = fields.iter().map(|f| f.name.as_str()).collect();
        assert_eq!(names, vec!["firstname", "id"]);
    }

    #[test]
    fn test_assignability() {
        let registry = registry();
        assert!(registry.is_assignable(&TypeInformation::of("User"), &TypeInformation::of("Base")));
        assert!(!registry.is_assignable(&TypeInformation::of("Base"), &TypeInformation::of("User")));
    }

    #[test]
    fn test_unknown_type_fails_introspection() {
        let registry = registry();
        assert!(matches!(
            registry.resolved_fields(&TypeInformation::of("Ghost")),
            Err(MappingError::Introspection(..))
        ));
    }
}
