//! Introspection metadata for domain types.
//!
//! Descriptors stand in for runtime reflection: they are written once
//! (by hand, by a build step or loaded from JSON) and registered in a
//! [`TypeRegistry`](super::TypeRegistry).

use std::collections::HashMap;
use std::fmt;
use std::hash::{Hash, Hasher};

use serde::{Deserialize, Serialize};

use super::annotation::{Annotation, AnnotationKind, find_annotation};
use crate::core::TypeInformation;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FieldModifiers {
    pub is_static: bool,
    pub is_final: bool,
    pub is_synthetic: bool,
    pub is_transient: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldDescriptor {
    pub name: String,
    pub type_info: TypeInformation,
    #[serde(default)]
    pub modifiers: FieldModifiers,
    #[serde(default)]
    pub annotations: Vec<Annotation>,
}

impl FieldDescriptor {
    pub fn new(name: impl Into<String>, type_info: TypeInformation) -> Self {
        Self {
            name: name.into(),
            type_info,
            modifiers: FieldModifiers::default(),
            annotations: Vec::new(),
        }
    }

    pub fn annotated(mut self, annotation: Annotation) -> Self {
        self.annotations.push(annotation);
        self
    }

    pub fn final_field(mut self) -> Self {
        self.modifiers.is_final = true;
        self
    }

    pub fn static_field(mut self) -> Self {
        self.modifiers.is_static = true;
        self
    }

    pub fn synthetic(mut self) -> Self {
        self.modifiers.is_synthetic = true;
        self
    }

    pub fn transient(mut self) -> Self {
        self.modifiers.is_transient = true;
        self
    }
}

fn default_true() -> bool {
    true
}

/// Bean-style property descriptor: a named getter/setter/wither group.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccessorDescriptor {
    pub name: String,
    pub type_info: TypeInformation,
    #[serde(default = "default_true")]
    pub has_getter: bool,
    #[serde(default)]
    pub has_setter: bool,
    #[serde(default)]
    pub has_wither: bool,
    #[serde(default)]
    pub annotations: Vec<Annotation>,
}

impl AccessorDescriptor {
    pub fn new(name: impl Into<String>, type_info: TypeInformation) -> Self {
        Self {
            name: name.into(),
            type_info,
            has_getter: true,
            has_setter: false,
            has_wither: false,
            annotations: Vec::new(),
        }
    }

    pub fn with_setter(mut self) -> Self {
        self.has_setter = true;
        self
    }

    pub fn with_wither(mut self) -> Self {
        self.has_wither = true;
        self
    }

    pub fn write_only(mut self) -> Self {
        self.has_getter = false;
        self.has_setter = true;
        self
    }

    pub fn annotated(mut self, annotation: Annotation) -> Self {
        self.annotations.push(annotation);
        self
    }

    pub fn has_accessor(&self) -> bool {
        self.has_getter || self.has_setter
    }

    /// Whether the descriptor can back a property without a field.
    pub fn supports_standalone(&self) -> bool {
        self.has_getter
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParameterDescriptor {
    pub name: String,
    pub type_info: TypeInformation,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConstructorDescriptor {
    #[serde(default)]
    pub parameters: Vec<ParameterDescriptor>,
    #[serde(default)]
    pub annotations: Vec<Annotation>,
}

impl ConstructorDescriptor {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn parameter(mut self, name: impl Into<String>, type_info: TypeInformation) -> Self {
        self.parameters.push(ParameterDescriptor {
            name: name.into(),
            type_info,
        });
        self
    }

    pub fn annotated(mut self, annotation: Annotation) -> Self {
        self.annotations.push(annotation);
        self
    }

    pub fn is_no_arg(&self) -> bool {
        self.parameters.is_empty()
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MethodModifiers {
    pub is_default: bool,
    pub is_static: bool,
    pub is_bridge: bool,
}

/// An invocable operation. Identity is the declaring type, the name and the
/// parameter types; return type, modifiers and annotations do not take part.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Method {
    #[serde(default)]
    pub declaring_type: String,
    pub name: String,
    #[serde(default)]
    pub parameter_types: Vec<TypeInformation>,
    #[serde(default)]
    pub return_type: Option<TypeInformation>,
    #[serde(default)]
    pub modifiers: MethodModifiers,
    #[serde(default)]
    pub annotations: Vec<Annotation>,
}

impl Method {
    /// A method whose declaring type is filled in by [`TypeDescriptor::method`].
    pub fn new(name: impl Into<String>) -> Self {
        Self::on("", name)
    }

    pub fn on(declaring_type: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            declaring_type: declaring_type.into(),
            name: name.into(),
            parameter_types: Vec::new(),
            return_type: None,
            modifiers: MethodModifiers::default(),
            annotations: Vec::new(),
        }
    }

    pub fn parameter(mut self, type_info: TypeInformation) -> Self {
        self.parameter_types.push(type_info);
        self
    }

    pub fn returns(mut self, type_info: TypeInformation) -> Self {
        self.return_type = Some(type_info);
        self
    }

    pub fn default_method(mut self) -> Self {
        self.modifiers.is_default = true;
        self
    }

    pub fn static_method(mut self) -> Self {
        self.modifiers.is_static = true;
        self
    }

    pub fn bridge(mut self) -> Self {
        self.modifiers.is_bridge = true;
        self
    }

    pub fn annotated(mut self, annotation: Annotation) -> Self {
        self.annotations.push(annotation);
        self
    }

    pub fn parameter_count(&self) -> usize {
        self.parameter_types.len()
    }

    pub fn find_annotation(&self, kind: &AnnotationKind) -> Option<&Annotation> {
        find_annotation(&self.annotations, kind)
    }

    /// Same name and parameter types, regardless of declaring type.
    pub fn signature_matches(&self, other: &Method) -> bool {
        self.name == other.name && self.parameter_types == other.parameter_types
    }
}

impl PartialEq for Method {
    fn eq(&self, other: &Self) -> bool {
        self.declaring_type == other.declaring_type && self.signature_matches(other)
    }
}

impl Eq for Method {}

impl Hash for Method {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.declaring_type.hash(state);
        self.name.hash(state);
        self.parameter_types.hash(state);
    }
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let params: Vec<String> = self.parameter_types.iter().map(ToString::to_string).collect();
        if self.declaring_type.is_empty() {
            write!(f, "{}({})", self.name, params.join(", "))
        } else {
            write!(f, "{}.{}({})", self.declaring_type, self.name, params.join(", "))
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TypeKind {
    #[default]
    Class,
    Interface,
    Enum,
    Record,
    /// Described but not introspectable (e.g. a foreign runtime type).
    Unsupported,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TypeDescriptor {
    pub name: String,
    #[serde(default)]
    pub kind: TypeKind,
    #[serde(default)]
    pub type_parameters: Vec<String>,
    #[serde(default)]
    pub superclass: Option<TypeInformation>,
    #[serde(default)]
    pub interfaces: Vec<TypeInformation>,
    #[serde(default)]
    pub fields: Vec<FieldDescriptor>,
    #[serde(default)]
    pub accessors: Vec<AccessorDescriptor>,
    #[serde(default)]
    pub constructors: Vec<ConstructorDescriptor>,
    #[serde(default)]
    pub methods: Vec<Method>,
    #[serde(default)]
    pub annotations: Vec<Annotation>,
}

impl TypeDescriptor {
    fn new(name: impl Into<String>, kind: TypeKind) -> Self {
        Self {
            name: name.into(),
            kind,
            type_parameters: Vec::new(),
            superclass: None,
            interfaces: Vec::new(),
            fields: Vec::new(),
            accessors: Vec::new(),
            constructors: Vec::new(),
            methods: Vec::new(),
            annotations: Vec::new(),
        }
    }

    pub fn class(name: impl Into<String>) -> Self {
        Self::new(name, TypeKind::Class)
    }

    pub fn interface(name: impl Into<String>) -> Self {
        Self::new(name, TypeKind::Interface)
    }

    pub fn record(name: impl Into<String>) -> Self {
        Self::new(name, TypeKind::Record)
    }

    pub fn enumeration(name: impl Into<String>) -> Self {
        Self::new(name, TypeKind::Enum)
    }

    pub fn unsupported(name: impl Into<String>) -> Self {
        Self::new(name, TypeKind::Unsupported)
    }

    pub fn type_parameter(mut self, name: impl Into<String>) -> Self {
        self.type_parameters.push(name.into());
        self
    }

    pub fn extends(mut self, superclass: TypeInformation) -> Self {
        self.superclass = Some(superclass);
        self
    }

    pub fn implements(mut self, interface: TypeInformation) -> Self {
        self.interfaces.push(interface);
        self
    }

    pub fn field(mut self, field: FieldDescriptor) -> Self {
        self.fields.push(field);
        self
    }

    pub fn accessor(mut self, accessor: AccessorDescriptor) -> Self {
        self.accessors.push(accessor);
        self
    }

    pub fn constructor(mut self, constructor: ConstructorDescriptor) -> Self {
        self.constructors.push(constructor);
        self
    }

    pub fn method(mut self, mut method: Method) -> Self {
        if method.declaring_type.is_empty() {
            method.declaring_type = self.name.clone();
        }
        self.methods.push(method);
        self
    }

    pub fn annotated(mut self, annotation: Annotation) -> Self {
        self.annotations.push(annotation);
        self
    }

    pub fn is_interface(&self) -> bool {
        self.kind == TypeKind::Interface
    }

    pub fn find_annotation(&self, kind: &AnnotationKind) -> Option<&Annotation> {
        find_annotation(&self.annotations, kind)
    }

    pub fn accessor_named(&self, name: &str) -> Option<&AccessorDescriptor> {
        self.accessors.iter().find(|a| a.name == name)
    }

    /// Binds this descriptor's type parameters to the arguments of `type_info`.
    /// Missing arguments stay unbound.
    pub fn bindings(&self, type_info: &TypeInformation) -> HashMap<String, TypeInformation> {
        let arguments = match type_info {
            TypeInformation::Named { arguments, .. } => arguments.as_slice(),
            _ => &[],
        };

        self.type_parameters
            .iter()
            .zip(arguments)
            .map(|(param, arg)| (param.clone(), arg.clone()))
            .collect()
    }
}
