#![allow(dead_code)]

use datamapping::core::{Bean, TypeInformation, Value};
use datamapping::reflect::{
    AccessType, AccessorDescriptor, Annotation, ConstructorDescriptor, FieldDescriptor,
    TypeDescriptor, TypeRegistry,
};

pub fn ty(name: &str) -> TypeInformation {
    TypeInformation::of(name)
}

pub fn field(name: &str, type_info: TypeInformation) -> FieldDescriptor {
    FieldDescriptor::new(name, type_info)
}

/// Domain model shared by the integration tests:
///
/// * `User` with an id, a version, an embedded `Address`, a list and a map of
///   addresses, a self reference (`manager`) and a transient field
/// * `Address` -> `Country`
/// * `Owner.pet: Animal` with `Dog extends Animal`
/// * `Holder.fooBar: FooBar { baz }` for camel-case backtracking
/// * `Box<T>` and `Parcel.box: Box<Address>` for generic resolution
/// * `Contact`, an interface exposing accessors only
pub fn registry() -> TypeRegistry {
    TypeRegistry::new()
        .with_types([
            TypeDescriptor::class("User")
                .field(field("id", ty("Long")).annotated(Annotation::Id))
                .field(field("version", ty("Long")).annotated(Annotation::Version))
                .field(field("name", ty("String")))
                .field(field("address", ty("Address")))
                .field(field(
                    "previousAddresses",
                    TypeInformation::list_of(ty("Address")),
                ))
                .field(field(
                    "addressesByLabel",
                    TypeInformation::map_of(ty("String"), ty("Address")),
                ))
                .field(field("tags", TypeInformation::list_of(ty("String"))))
                .field(field("manager", ty("User")))
                .field(field("status", ty("Status")))
                .field(field("password", ty("String")).transient()),
            TypeDescriptor::class("Address")
                .field(field("street", ty("String")))
                .field(field("city", ty("String")))
                .field(field("country", ty("Country"))),
            TypeDescriptor::class("Country")
                .field(field("code", ty("String")))
                .field(field("name", ty("String"))),
            TypeDescriptor::enumeration("Status"),
            TypeDescriptor::class("Owner").field(field("pet", ty("Animal"))),
            TypeDescriptor::class("Animal").field(field("name", ty("String"))),
            TypeDescriptor::class("Dog")
                .extends(ty("Animal"))
                .field(field("tricks", ty("Integer"))),
            TypeDescriptor::class("Holder").field(field("fooBar", ty("FooBar"))),
            TypeDescriptor::class("FooBar").field(field("baz", ty("String"))),
            TypeDescriptor::class("Box")
                .type_parameter("T")
                .field(field("content", TypeInformation::variable("T"))),
            TypeDescriptor::class("Parcel").field(field(
                "box",
                TypeInformation::generic("Box", vec![ty("Address")]),
            )),
            TypeDescriptor::interface("Contact")
                .accessor(AccessorDescriptor::new("email", ty("String")).with_setter())
                .accessor(AccessorDescriptor::new("phone", ty("String"))),
            TypeDescriptor::class("Ledger")
                .annotated(Annotation::AccessType(AccessType::Property))
                .field(field("balance", ty("Long")))
                .accessor(AccessorDescriptor::new("balance", ty("Long")).with_setter())
                .accessor(AccessorDescriptor::new("summary", ty("String"))),
            TypeDescriptor::record("Point")
                .field(field("x", ty("Long")).final_field())
                .field(field("y", ty("Long")).final_field())
                .constructor(
                    ConstructorDescriptor::new()
                        .parameter("x", ty("Long"))
                        .parameter("y", ty("Long")),
                ),
            TypeDescriptor::class("Broken")
                .field(field("id", ty("Long")).annotated(Annotation::Id))
                .field(field("otherId", ty("Long")).annotated(Annotation::Id)),
            TypeDescriptor::class("Parent").field(field("child", ty("Broken"))),
            TypeDescriptor::class("Household")
                .field(field("address", ty("Address")))
                .field(field("child", ty("Broken"))),
        ])
        .unwrap()
}

pub fn country(code: &str) -> Bean {
    Bean::new("Country").with("code", code).with("name", Value::Null)
}

pub fn address(city: &str) -> Bean {
    Bean::new("Address")
        .with("street", "Main Street")
        .with("city", city)
        .with("country", country("DE"))
}

pub fn user(id: i64, name: &str) -> Bean {
    Bean::new("User")
        .with("id", id)
        .with("version", Value::Null)
        .with("name", name)
        .with("address", address("Dresden"))
}

pub fn text(value: &str) -> Value {
    Value::Text(value.to_string())
}
