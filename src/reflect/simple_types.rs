use std::collections::HashSet;

use crate::core::TypeInformation;

/// Types that are never decomposed into persistent properties.
const DEFAULT_SIMPLE_TYPES: &[&str] = &[
    // primitives
    "boolean", "byte", "char", "short", "int", "long", "float", "double",
    "bool", "i8", "i16", "i32", "i64", "i128", "u8", "u16", "u32", "u64", "u128", "f32", "f64",
    // boxed and textual
    "Boolean", "Byte", "Character", "Short", "Integer", "Long", "Float", "Double",
    "String", "str", "Number", "BigInteger", "BigDecimal",
    // temporal and misc
    "Date", "Instant", "LocalDate", "LocalTime", "LocalDateTime", "ZonedDateTime",
    "Duration", "Uuid", "UUID", "Locale", "Currency", "Url", "Bytes", "Object", "Enum",
];

#[derive(Debug, Clone)]
pub struct SimpleTypeHolder {
    simple_types: HashSet<String>,
}

impl SimpleTypeHolder {
    /// Default simple types plus `custom`.
    pub fn new(custom: impl IntoIterator<Item = impl Into<String>>) -> Self {
        Self::with_defaults(custom, true)
    }

    pub fn with_defaults(
        custom: impl IntoIterator<Item = impl Into<String>>,
        register_defaults: bool,
    ) -> Self {
        let mut simple_types: HashSet<String> = custom.into_iter().map(Into::into).collect();
        if register_defaults {
            simple_types.extend(DEFAULT_SIMPLE_TYPES.iter().map(|s| s.to_string()));
        }
        Self { simple_types }
    }

    pub fn register(mut self, type_name: impl Into<String>) -> Self {
        self.simple_types.insert(type_name.into());
        self
    }

    /// Only plain named types can be simple; containers are decomposed by
    /// their element type instead.
    pub fn is_simple_type(&self, type_info: &TypeInformation) -> bool {
        match type_info {
            TypeInformation::Named { name, .. } => self.simple_types.contains(name),
            _ => false,
        }
    }

    pub fn is_simple_name(&self, type_name: &str) -> bool {
        self.simple_types.contains(type_name)
    }
}

impl Default for SimpleTypeHolder {
    fn default() -> Self {
        Self::with_defaults(std::iter::empty::<String>(), true)
    }
}
