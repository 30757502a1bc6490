/// Mapping context tests
///
/// Entity discovery, caching, strict mode, events and persistent property
/// paths.
/// Run with: cargo test --test mapping_context_tests
mod common;

use std::sync::{Arc, Mutex};

use common::{registry, ty};
use datamapping::core::{MappingError, TypeInformation, Value};
use datamapping::mapping::{
    AnnotationMappingFlavor, MappingConfig, MappingContext, MappingContextEvent,
    PersistentProperty, PersistentPropertyPath, PropertyPath,
};
use datamapping::reflect::{AnnotationKind, SimpleTypeHolder};

fn context() -> MappingContext {
    MappingContext::annotation_based(registry())
}

#[test]
fn test_entity_discovery_registers_properties() {
    let context = context();
    let user = context.required_persistent_entity(&ty("User")).unwrap();

    assert!(user.is_verified());
    assert_eq!(user.required_id_property().unwrap().name(), "id");
    assert_eq!(user.version_property().unwrap().name(), "version");
    assert!(user.persistent_property("name").is_some());
    // transient fields are not mapped
    assert!(user.persistent_property("password").is_none());

    let status = user.required_persistent_property("status").unwrap();
    assert!(!status.is_entity());

    let tags = user.required_persistent_property("tags").unwrap();
    assert!(tags.is_collection_like());
    assert!(!tags.is_entity());
}

#[test]
fn test_nested_entities_are_discovered_eagerly() {
    let context = context();
    context.persistent_entity(&ty("User")).unwrap();

    assert!(context.has_persistent_entity_for(&ty("Address")).unwrap());
    assert!(context.has_persistent_entity_for(&ty("Country")).unwrap());

    let mut managed: Vec<String> = context
        .managed_types()
        .unwrap()
        .iter()
        .map(|t| t.to_string())
        .collect();
    managed.sort();
    assert_eq!(managed, vec!["Address", "Country", "User"]);
}

#[test]
fn test_self_reference_terminates() {
    let context = context();
    let user = context.required_persistent_entity(&ty("User")).unwrap();
    let manager = user.required_persistent_property("manager").unwrap();

    assert!(manager.is_entity());
    let target = context.persistent_entity_for_property(manager.as_ref()).unwrap().unwrap();
    assert!(Arc::ptr_eq(&user, &target));
}

#[test]
fn test_lookups_return_cached_entity() {
    let context = context();
    let first = context.required_persistent_entity(&ty("Address")).unwrap();
    let second = context.required_persistent_entity(&ty("Address")).unwrap();
    assert!(Arc::ptr_eq(&first, &second));
}

#[test]
fn test_simple_types_are_negatively_cached() {
    let context = context();

    assert!(context.persistent_entity(&ty("String")).unwrap().is_none());
    assert!(context.persistent_entity(&ty("Status")).unwrap().is_none());
    assert!(!context.has_persistent_entity_for(&ty("String")).unwrap());
    assert!(context.managed_types().unwrap().is_empty());

    assert!(
        context
            .persistent_entity(&TypeInformation::list_of(ty("Address")))
            .unwrap()
            .is_none()
    );
}

#[test]
fn test_strict_mode_rejects_unknown_types() {
    let config = MappingConfig::default()
        .strict(true)
        .initial_entity_set([ty("Country")]);
    let context = MappingContext::new(registry(), AnnotationMappingFlavor, config);
    context.initialize().unwrap();

    assert!(context.persistent_entity(&ty("Country")).unwrap().is_some());
    assert!(matches!(
        context.persistent_entity(&ty("User")),
        Err(MappingError::UnknownEntity(_))
    ));
    // simple types are still answered negatively
    assert!(context.persistent_entity(&ty("String")).unwrap().is_none());
}

#[test]
fn test_failed_discovery_is_rolled_back() {
    let context = context();

    let err = context.persistent_entity(&ty("Parent")).unwrap_err();
    assert!(matches!(err, MappingError::DuplicateIdProperty { .. }));

    assert!(!context.has_persistent_entity_for(&ty("Parent")).unwrap());
    assert!(!context.has_persistent_entity_for(&ty("Broken")).unwrap());

    // a retry fails the same way instead of returning a half-built entity
    assert!(context.persistent_entity(&ty("Parent")).is_err());
}

#[test]
fn test_failed_discovery_keeps_completed_siblings() {
    let context = context();
    let seen: Arc<Mutex<Vec<String>>> = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&seen);
    context
        .add_listener(move |event: &MappingContextEvent| {
            sink.lock().unwrap().push(event.type_information().to_string());
        })
        .unwrap();

    assert!(context.persistent_entity(&ty("Household")).is_err());

    assert!(!context.has_persistent_entity_for(&ty("Household")).unwrap());
    assert!(!context.has_persistent_entity_for(&ty("Broken")).unwrap());
    // address was fully discovered before child failed
    assert!(context.has_persistent_entity_for(&ty("Address")).unwrap());

    let mut seen = seen.lock().unwrap().clone();
    seen.sort();
    assert_eq!(seen, vec!["Address", "Country"]);
}

#[test]
fn test_unregistered_type_fails_introspection() {
    let context = context();
    assert!(matches!(
        context.persistent_entity(&ty("Unknown")),
        Err(MappingError::Introspection(_, _))
    ));
    assert!(!context.has_persistent_entity_for(&ty("Unknown")).unwrap());
}

#[test]
fn test_listeners_receive_created_entities() {
    let context = context();
    let seen: Arc<Mutex<Vec<String>>> = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&seen);
    context
        .add_listener(move |event: &MappingContextEvent| {
            sink.lock().unwrap().push(event.type_information().to_string());
        })
        .unwrap();

    context.persistent_entity(&ty("Address")).unwrap();
    context.persistent_entity(&ty("Address")).unwrap();

    let mut seen = seen.lock().unwrap().clone();
    seen.sort();
    assert_eq!(seen, vec!["Address", "Country"]);
}

#[test]
fn test_generic_entity_binds_type_arguments() {
    let context = context();
    let parcel = context.required_persistent_entity(&ty("Parcel")).unwrap();
    let boxed = parcel.required_persistent_property("box").unwrap();
    let box_entity = context.persistent_entity_for_property(boxed.as_ref()).unwrap().unwrap();

    let content = box_entity.required_persistent_property("content").unwrap();
    assert_eq!(content.type_information(), &ty("Address"));
    assert!(content.is_entity());
}

#[test]
fn test_interface_entity_uses_accessors() {
    let context = context();
    let contact = context.required_persistent_entity(&ty("Contact")).unwrap();

    let email = contact.required_persistent_property("email").unwrap();
    assert!(email.uses_property_access());
    assert!(!email.is_field_backed());
    assert!(contact.persistent_property("phone").is_some());
}

#[test]
fn test_owner_access_type_enables_accessor_only_properties() {
    let context = context();
    let ledger = context.required_persistent_entity(&ty("Ledger")).unwrap();

    let balance = ledger.required_persistent_property("balance").unwrap();
    assert!(balance.is_field_backed());
    assert!(balance.has_setter());
    assert!(ledger.persistent_property("summary").is_some());
}

#[test]
fn test_record_uses_canonical_constructor() {
    let context = context();
    let point = context.required_persistent_entity(&ty("Point")).unwrap();

    let x = point.required_persistent_property("x").unwrap();
    assert!(x.is_immutable());
    assert!(point.is_constructor_argument(x.as_ref()));
    assert!(!point.requires_property_population());
}

#[test]
fn test_custom_simple_types() {
    let config = MappingConfig::default().simple_types(SimpleTypeHolder::new(["Country"]));
    let context = MappingContext::new(registry(), AnnotationMappingFlavor, config);

    let address = context.required_persistent_entity(&ty("Address")).unwrap();
    assert!(!address.required_persistent_property("country").unwrap().is_entity());
    assert!(!context.has_persistent_entity_for(&ty("Country")).unwrap());
}

#[test]
fn test_property_comparator_orders_properties() {
    let config = MappingConfig::default().property_comparator(Arc::new(
        |a: &dyn PersistentProperty, b: &dyn PersistentProperty| b.name().cmp(a.name()),
    ));
    let context = MappingContext::new(registry(), AnnotationMappingFlavor, config);
    let country = context.required_persistent_entity(&ty("Country")).unwrap();

    let names: Vec<String> = country
        .persistent_properties()
        .iter()
        .map(|p| p.name().to_string())
        .collect();
    assert_eq!(names, vec!["name", "code"]);
}

#[test]
fn test_persistent_properties_with_annotation() {
    let context = context();
    let user = context.required_persistent_entity(&ty("User")).unwrap();

    let ids = user.persistent_properties_with(&AnnotationKind::Id);
    assert_eq!(ids.len(), 1);
    assert_eq!(ids[0].name(), "id");
}

#[test]
fn test_is_new_follows_version_then_id() {
    let context = context();
    let user = context.required_persistent_entity(&ty("User")).unwrap();

    let fresh = Value::Object(common::user(1, "Ann"));
    assert!(user.is_new(&fresh).unwrap());

    let stored = Value::Object(common::user(1, "Ann").with("version", Value::Integer(0)));
    assert!(!user.is_new(&stored).unwrap());
}

#[test]
fn test_persistent_property_path_from_dot_path() {
    let context = context();
    let path = context
        .persistent_property_path_from("address.country.code", &ty("User"))
        .unwrap();

    assert_eq!(path.len(), 3);
    assert_eq!(path.to_dot_path(), "address.country.code");
    assert_eq!(path.base_property().unwrap().name(), "address");
    assert_eq!(path.leaf_property().unwrap().name(), "code");

    let cached = context
        .persistent_property_path_from("address.country.code", &ty("User"))
        .unwrap();
    assert_eq!(path, cached);
}

#[test]
fn test_persistent_property_path_from_property_path() {
    let context = context();
    let property_path = PropertyPath::from("addressCity", &ty("User"), context.registry()).unwrap();

    let path = context.persistent_property_path(&property_path).unwrap();
    assert_eq!(path.to_dot_path(), "address.city");
}

#[test]
fn test_persistent_property_path_unknown_segment() {
    let context = context();
    let err = context
        .persistent_property_path_from("address.planet", &ty("User"))
        .unwrap_err();

    assert_eq!(err.resolution_depth(), 1);
}

#[test]
fn test_base_path_and_extension() {
    let context = context();
    let base = context.persistent_property_path_from("address", &ty("User")).unwrap();
    let full = context
        .persistent_property_path_from("address.country.code", &ty("User"))
        .unwrap();

    assert!(base.is_base_path_of(&full));
    assert!(!full.is_base_path_of(&base));

    let extension = full.extension_for_base_of(&base);
    assert_eq!(extension.to_dot_path(), "country.code");
    assert_eq!(base.append_path(&extension).unwrap(), full);

    assert_eq!(full.parent_path().to_dot_path(), "address.country");
    assert!(PersistentPropertyPath::empty().parent_path().is_empty());
    assert_eq!(
        full.to_path("/", |p| Some(p.name().to_uppercase())),
        Some("ADDRESS/COUNTRY/CODE".to_string())
    );
}

#[test]
fn test_find_paths_to_matching_properties() {
    let context = context();
    let paths = context
        .find_persistent_property_paths(&ty("User"), |p| p.name() == "city")
        .unwrap();

    let dot_paths: Vec<String> = paths.iter().map(|p| p.to_dot_path()).collect();
    assert!(dot_paths.contains(&"address.city".to_string()));
    assert!(dot_paths.contains(&"previousAddresses.city".to_string()));
    assert!(dot_paths.contains(&"addressesByLabel.city".to_string()));
    assert!(dot_paths.contains(&"manager.address.city".to_string()));
    // manager.manager... is cut off by the cycle guard
    assert!(dot_paths.iter().all(|p| !p.starts_with("manager.manager")));

    let lengths: Vec<usize> = paths.iter().map(PersistentPropertyPath::len).collect();
    let mut sorted = lengths.clone();
    sorted.sort();
    assert_eq!(lengths, sorted);
}
