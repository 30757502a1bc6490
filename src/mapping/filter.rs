//! Structural exclusions applied before properties are created.

use regex::Regex;

use crate::core::TypeInformation;
use crate::reflect::{AccessorDescriptor, FieldDescriptor};

struct PropertyMatch {
    name: Regex,
    type_name: Option<&'static str>,
}

impl PropertyMatch {
    fn new(pattern: &str, type_name: Option<&'static str>) -> Self {
        Self {
            name: Regex::new(&format!("^(?:{})$", pattern)).unwrap(),
            type_name,
        }
    }

    fn matches(&self, name: &str, type_info: &TypeInformation) -> bool {
        self.name.is_match(name) && self.type_name.is_none_or(|t| t == type_info.name())
    }
}

lazy_static::lazy_static! {
    static ref UNMAPPED_PROPERTIES: Vec<PropertyMatch> = vec![
        PropertyMatch::new("class", None),
        PropertyMatch::new(r"this\$.*", None),
        PropertyMatch::new("metaClass", Some("groovy.lang.MetaClass")),
    ];
}

fn is_unmapped(name: &str, type_info: &TypeInformation) -> bool {
    UNMAPPED_PROPERTIES.iter().any(|m| m.matches(name, type_info))
}

pub fn is_mappable_field(field: &FieldDescriptor) -> bool {
    !field.modifiers.is_static
        && !field.modifiers.is_synthetic
        && !is_unmapped(&field.name, &field.type_info)
}

pub fn is_mappable_accessor(accessor: &AccessorDescriptor) -> bool {
    accessor.has_accessor() && !is_unmapped(&accessor.name, &accessor.type_info)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_noise_fields_are_rejected() {
        let object = TypeInformation::of("Object");
        assert!(!is_mappable_field(&FieldDescriptor::new("class", object.clone())));
        assert!(!is_mappable_field(&FieldDescriptor::new("this$0", object.clone())));
        assert!(!is_mappable_field(&FieldDescriptor::new(
            "metaClass",
            TypeInformation::of("groovy.lang.MetaClass")
        )));
        assert!(is_mappable_field(&FieldDescriptor::new("metaClass", object.clone())));
        assert!(is_mappable_field(&FieldDescriptor::new("classification", object)));
    }

    #[test]
    fn test_static_and_synthetic_fields_are_rejected() {
        let string = TypeInformation::of("String");
        assert!(!is_mappable_field(&FieldDescriptor::new("CONSTANT", string.clone()).static_field()));
        assert!(!is_mappable_field(&FieldDescriptor::new("generated", string).synthetic()));
    }

    #[test]
    fn test_accessor_needs_getter_or_setter() {
        let mut accessor = AccessorDescriptor::new("name", TypeInformation::of("String"));
        assert!(is_mappable_accessor(&accessor));

        accessor.has_getter = false;
        assert!(!is_mappable_accessor(&accessor));
    }
}
