use std::collections::HashMap;

use crate::core::TypeInformation;
use crate::reflect::{
    AnnotationKind, ConstructorDescriptor, ParameterDescriptor, TypeDescriptor, TypeKind,
    find_annotation,
};

/// The constructor used to instantiate an entity, with parameter types
/// resolved against the entity's type arguments.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PreferredConstructor {
    parameters: Vec<ParameterDescriptor>,
    explicitly_annotated: bool,
}

impl PreferredConstructor {
    fn build(
        constructor: &ConstructorDescriptor,
        bindings: &HashMap<String, TypeInformation>,
    ) -> Self {
        let parameters = constructor
            .parameters
            .iter()
            .map(|p| ParameterDescriptor {
                name: p.name.clone(),
                type_info: p.type_info.resolve(bindings),
            })
            .collect();

        Self {
            parameters,
            explicitly_annotated: find_annotation(
                &constructor.annotations,
                &AnnotationKind::PersistenceCreator,
            )
            .is_some(),
        }
    }

    /// Picks the persistence constructor of `descriptor`:
    /// an annotated constructor wins, then a no-arg one, then the only
    /// declared one. Records fall back to their canonical constructor when
    /// the choice is ambiguous. Classes declaring no constructor get an
    /// implicit no-arg one.
    pub fn discover(
        descriptor: &TypeDescriptor,
        type_info: &TypeInformation,
    ) -> Option<PreferredConstructor> {
        if matches!(
            descriptor.kind,
            TypeKind::Interface | TypeKind::Enum | TypeKind::Unsupported
        ) {
            return None;
        }

        let bindings = descriptor.bindings(type_info);
        let constructors = &descriptor.constructors;

        if constructors.is_empty() {
            return (descriptor.kind == TypeKind::Class)
                .then(|| Self::build(&ConstructorDescriptor::new(), &bindings));
        }

        if let Some(annotated) = constructors
            .iter()
            .find(|c| find_annotation(&c.annotations, &AnnotationKind::PersistenceCreator).is_some())
        {
            return Some(Self::build(annotated, &bindings));
        }

        let no_arg = constructors.iter().find(|c| c.is_no_arg());
        let candidates: Vec<&ConstructorDescriptor> =
            constructors.iter().filter(|c| !c.is_no_arg()).collect();

        if descriptor.kind == TypeKind::Record
            && (candidates.len() > 1 || (no_arg.is_some() && !candidates.is_empty()))
        {
            return candidates
                .iter()
                .max_by_key(|c| c.parameters.len())
                .map(|c| Self::build(c, &bindings));
        }

        if let Some(no_arg) = no_arg {
            return Some(Self::build(no_arg, &bindings));
        }

        match candidates.as_slice() {
            [only] => Some(Self::build(only, &bindings)),
            _ => None,
        }
    }

    pub fn parameters(&self) -> &[ParameterDescriptor] {
        &self.parameters
    }

    pub fn is_no_arg(&self) -> bool {
        self.parameters.is_empty()
    }

    pub fn is_explicitly_annotated(&self) -> bool {
        self.explicitly_annotated
    }

    pub fn is_constructor_parameter(&self, name: &str) -> bool {
        self.parameters.iter().any(|p| p.name == name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reflect::Annotation;

    fn string() -> TypeInformation {
        TypeInformation::of("String")
    }

    #[test]
    fn test_single_constructor_wins() {
        let descriptor = TypeDescriptor::class("User")
            .constructor(ConstructorDescriptor::new().parameter("firstname", string()));

        let constructor =
            PreferredConstructor::discover(&descriptor, &TypeInformation::of("User")).unwrap();
        assert!(constructor.is_constructor_parameter("firstname"));
        assert!(!constructor.is_explicitly_annotated());
    }

    #[test]
    fn test_annotated_beats_no_arg() {
        let descriptor = TypeDescriptor::class("User")
            .constructor(ConstructorDescriptor::new())
            .constructor(
                ConstructorDescriptor::new()
                    .parameter("firstname", string())
                    .annotated(Annotation::PersistenceCreator),
            );

        let constructor =
            PreferredConstructor::discover(&descriptor, &TypeInformation::of("User")).unwrap();
        assert!(constructor.is_explicitly_annotated());
        assert_eq!(constructor.parameters().len(), 1);
    }

    #[test]
    fn test_ambiguous_constructors_yield_none() {
        let descriptor = TypeDescriptor::class("User")
            .constructor(ConstructorDescriptor::new().parameter("a", string()))
            .constructor(ConstructorDescriptor::new().parameter("b", string()));

        assert!(PreferredConstructor::discover(&descriptor, &TypeInformation::of("User")).is_none());
    }

    #[test]
    fn test_record_uses_canonical_constructor() {
        let descriptor = TypeDescriptor::record("Point")
            .constructor(ConstructorDescriptor::new().parameter("x", string()))
            .constructor(
                ConstructorDescriptor::new()
                    .parameter("x", string())
                    .parameter("y", string()),
            );

        let constructor =
            PreferredConstructor::discover(&descriptor, &TypeInformation::of("Point")).unwrap();
        assert_eq!(constructor.parameters().len(), 2);
    }

    #[test]
    fn test_generic_parameter_is_resolved() {
        let descriptor = TypeDescriptor::class("Wrapper").type_parameter("T").constructor(
            ConstructorDescriptor::new().parameter("value", TypeInformation::variable("T")),
        );
        let type_info = TypeInformation::generic("Wrapper", vec![TypeInformation::of("Long")]);

        let constructor = PreferredConstructor::discover(&descriptor, &type_info).unwrap();
        assert_eq!(constructor.parameters()[0].type_info, TypeInformation::of("Long"));
    }
}
