/// Repository composition and dispatch tests
///
/// Run with: cargo test --test repository_composition_tests
mod common;

use std::sync::{Arc, Mutex};

use common::{text, ty};
use datamapping::core::{Bean, MappingError, TypeInformation, Value};
use datamapping::reflect::{Annotation, FieldDescriptor, TypeDescriptor, TypeRegistry};
use datamapping::repository::{
    DefaultRepositoryInformation, EventPublishingRepository, FragmentImplementation,
    FunctionFragment, Method, MethodLookups, RepositoryComposition, RepositoryFragment,
    RepositoryFragments, RepositoryMetadata,
};

fn method(name: &str) -> Method {
    Method::new(name)
}

fn answering(type_name: &str, method_name: &str, answer: &str) -> Arc<dyn FragmentImplementation> {
    let answer = answer.to_string();
    Arc::new(
        FunctionFragment::new(type_name)
            .method(method(method_name), move |_| Ok(Value::Text(answer.clone()))),
    )
}

/// `Repository<T, ID>` <- `CrudRepository<T, ID>` <- `UserRepository`, with
/// a `SimpleRepository<T, ID>` base class and a `UserRepositoryCustom`
/// fragment interface.
fn repository_registry() -> TypeRegistry {
    let generic_repository = |name: &str| {
        TypeInformation::generic(
            name,
            vec![TypeInformation::variable("T"), TypeInformation::variable("ID")],
        )
    };

    TypeRegistry::new()
        .with_types([
            TypeDescriptor::interface("Repository")
                .type_parameter("T")
                .type_parameter("ID"),
            TypeDescriptor::interface("CrudRepository")
                .type_parameter("T")
                .type_parameter("ID")
                .implements(generic_repository("Repository"))
                .method(Method::new("save").parameter(TypeInformation::variable("T")))
                .method(Method::new("findById").parameter(TypeInformation::variable("ID")))
                .method(Method::new("count")),
            TypeDescriptor::interface("UserRepositoryCustom")
                .method(Method::new("rebuildIndex")),
            TypeDescriptor::interface("UserRepository")
                .implements(TypeInformation::generic("CrudRepository", vec![ty("User"), ty("Long")]))
                .implements(ty("UserRepositoryCustom"))
                .method(Method::new("findByName").parameter(ty("String")))
                .method(
                    Method::new("findActive")
                        .annotated(Annotation::Query("select u from User u".to_string())),
                )
                .method(Method::new("helper").default_method()),
            TypeDescriptor::class("SimpleRepository")
                .type_parameter("T")
                .type_parameter("ID")
                .method(Method::new("save").parameter(TypeInformation::variable("T")))
                .method(Method::new("findById").parameter(TypeInformation::variable("ID")))
                .method(Method::new("count")),
            TypeDescriptor::class("User")
                .field(FieldDescriptor::new("id", ty("Long")).annotated(Annotation::Id))
                .field(
                    FieldDescriptor::new("events", TypeInformation::list_of(ty("Object")))
                        .annotated(Annotation::DomainEvents),
                ),
        ])
        .unwrap()
}

#[test]
fn test_earlier_fragment_wins() {
    let composition = RepositoryComposition::of([
        RepositoryFragment::implemented(answering("First", "m", "first")),
        RepositoryFragment::implemented(answering("Second", "m", "second")),
    ]);

    assert_eq!(composition.invoke(&method("m"), vec![]).unwrap(), text("first"));
}

#[test]
fn test_only_implementing_fragment_is_used() {
    let structural = TypeDescriptor::interface("FragmentA").method(method("m"));
    let composition = RepositoryComposition::of([
        RepositoryFragment::structural(&structural),
        RepositoryFragment::implemented(answering("FragmentB", "m", "b")),
    ]);

    assert_eq!(composition.invoke(&method("m"), vec![]).unwrap(), text("b"));
}

#[test]
fn test_no_fragment_found() {
    let composition = RepositoryComposition::of([RepositoryFragment::implemented(answering(
        "FragmentA", "other", "a",
    ))]);

    let err = composition.invoke(&method("m"), vec![]).unwrap_err();
    assert!(matches!(err, MappingError::NoFragmentFound(_)));
    assert!(err.to_string().contains("m()"));
}

#[test]
fn test_append_places_fragment_last() {
    let first = RepositoryComposition::of([RepositoryFragment::implemented(answering(
        "First", "m", "first",
    ))]);
    let appended = first.append(RepositoryFragment::implemented(answering("Second", "m", "second")));

    assert_eq!(first.fragments().len(), 1);
    assert_eq!(appended.fragments().len(), 2);
    assert_eq!(appended.invoke(&method("m"), vec![]).unwrap(), text("first"));

    let prepended = RepositoryComposition::of([RepositoryFragment::implemented(answering(
        "Second", "m", "second",
    ))])
    .append_all(first.fragments());
    assert_eq!(prepended.invoke(&method("m"), vec![]).unwrap(), text("second"));
}

#[test]
fn test_validate_implementation() {
    let structural = TypeDescriptor::interface("FragmentA").method(method("m"));
    let empty_interface = TypeDescriptor::interface("Marker");

    let valid = RepositoryComposition::of([
        RepositoryFragment::structural(&empty_interface),
        RepositoryFragment::implemented(answering("Impl", "m", "x")),
    ]);
    assert!(valid.validate_implementation().is_ok());

    let invalid = valid.append(RepositoryFragment::structural(&structural));
    assert!(invalid.validate_implementation().is_err());

    let fixed = RepositoryComposition::of([RepositoryFragment::implemented_as(
        &structural,
        answering("Impl", "m", "x"),
    )]);
    assert!(fixed.validate_implementation().is_ok());
}

#[test]
fn test_argument_converter_is_applied() {
    let echo = FunctionFragment::new("Echo").method(
        Method::new("echo").parameter(ty("String")),
        |args| Ok(Value::List(args.to_vec())),
    );
    let composition = RepositoryComposition::of([RepositoryFragment::implemented(Arc::new(echo))])
        .with_argument_converter(|_, args| {
            args.into_iter()
                .map(|a| Value::Text(format!("converted:{a}")))
                .collect()
        });

    let invoked = Method::on("Repo", "echo").parameter(ty("String"));
    let result = composition.invoke(&invoked, vec![text("x")]).unwrap();
    assert_eq!(result, Value::List(vec![text("converted:x")]));
}

#[test]
fn test_generic_base_method_matched_by_repository_lookup() {
    let registry = repository_registry();
    let metadata = RepositoryMetadata::from_interface(&registry, "UserRepository").unwrap();
    let base = registry.descriptor("SimpleRepository").unwrap();

    let implementation = FunctionFragment::new("SimpleRepositoryImpl").method(
        Method::new("findById").parameter(TypeInformation::variable("ID")),
        |args| Ok(Value::Object(Bean::new("User").with("id", args[0].clone()))),
    );
    let fragment = RepositoryFragment::implemented_as(&base, Arc::new(implementation));

    let invoked = Method::on("UserRepository", "findById").parameter(ty("Long"));

    let direct = RepositoryComposition::of([fragment.clone()]);
    assert!(direct.find_method(&invoked).is_none());

    let composition = RepositoryComposition::of([fragment])
        .with_method_lookup(MethodLookups::for_repository_types(&metadata))
        .with_metadata(metadata);
    let found = composition.invoke(&invoked, vec![Value::Integer(7)]).unwrap();
    assert_eq!(found.as_bean().unwrap().get("id"), &Value::Integer(7));
}

#[test]
fn test_repository_information() {
    let registry = repository_registry();
    let metadata = RepositoryMetadata::from_interface(&registry, "UserRepository").unwrap();

    let custom = TypeDescriptor::interface("UserRepositoryCustom").method(method("rebuildIndex"));
    let composition = RepositoryComposition::of([RepositoryFragment::implemented_as(
        &custom,
        answering("UserRepositoryImpl", "rebuildIndex", "done"),
    )])
    .with_method_lookup(MethodLookups::for_repository_types(&metadata));

    let information =
        DefaultRepositoryInformation::new(metadata, "SimpleRepository", composition).unwrap();

    assert_eq!(information.domain_type(), &ty("User"));
    assert_eq!(information.id_type(), &ty("Long"));
    assert_eq!(information.repository_base_class().name, "SimpleRepository");

    let rebuild = Method::on("UserRepository", "rebuildIndex");
    assert!(information.is_custom_method(&rebuild));
    assert!(information.has_custom_method());

    let count = Method::on("CrudRepository", "count");
    assert!(information.is_base_class_method(&count));
    assert_eq!(information.target_class_method(&count).declaring_type, "SimpleRepository");

    let find_by_name = Method::on("UserRepository", "findByName").parameter(ty("String"));
    assert_eq!(information.target_class_method(&find_by_name), find_by_name);

    let mut query_methods: Vec<String> = information
        .query_methods()
        .into_iter()
        .map(|m| m.name)
        .collect();
    query_methods.sort();
    assert_eq!(query_methods, vec!["findActive", "findByName"]);
    assert!(information.has_query_methods());
}

#[test]
fn test_save_publishes_domain_events() {
    let registry = repository_registry();
    let save = Method::new("save").parameter(TypeInformation::variable("T"));
    let implementation = FunctionFragment::new("Store").method(save.clone(), |args| Ok(args[0].clone()));
    let composition =
        RepositoryComposition::of([RepositoryFragment::implemented(Arc::new(implementation))]);

    let published: Arc<Mutex<Vec<Value>>> = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&published);
    let repository = EventPublishingRepository::new(composition, registry, move |event: &Value| {
        sink.lock().unwrap().push(event.clone())
    });

    let aggregate = Value::Object(
        Bean::new("User")
            .with("id", Value::Integer(1))
            .with("events", Value::List(vec![text("created"), text("renamed")])),
    );
    let saved = repository.invoke(&save, vec![aggregate.clone()]).unwrap();

    assert_eq!(saved, aggregate);
    assert_eq!(*published.lock().unwrap(), vec![text("created"), text("renamed")]);
}

#[test]
fn test_events_collected_from_every_aggregate() {
    let registry = repository_registry();
    let save_all = Method::new("saveAll").parameter(TypeInformation::list_of(TypeInformation::variable("T")));
    let implementation = FunctionFragment::new("Store").method(save_all.clone(), |_| Ok(Value::Null));
    let composition =
        RepositoryComposition::of([RepositoryFragment::implemented(Arc::new(implementation))]);

    let published: Arc<Mutex<Vec<Value>>> = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&published);
    let repository = EventPublishingRepository::new(composition, registry, move |event: &Value| {
        sink.lock().unwrap().push(event.clone())
    });

    let aggregates = Value::List(vec![
        Value::Object(Bean::new("User").with("events", Value::List(vec![text("a")]))),
        Value::Object(Bean::new("User").with("events", text("b"))),
        Value::Object(Bean::new("User")),
    ]);
    repository.invoke(&save_all, vec![aggregates]).unwrap();

    assert_eq!(*published.lock().unwrap(), vec![text("a"), text("b")]);
}

#[test]
fn test_failed_save_publishes_nothing() {
    let registry = repository_registry();
    let save = Method::new("save").parameter(TypeInformation::variable("T"));
    let implementation = FunctionFragment::new("Store").method(save.clone(), |_| {
        Err(MappingError::Mapping("store unavailable".to_string()))
    });
    let composition =
        RepositoryComposition::of([RepositoryFragment::implemented(Arc::new(implementation))]);

    let published: Arc<Mutex<Vec<Value>>> = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&published);
    let repository = EventPublishingRepository::new(composition, registry, move |event: &Value| {
        sink.lock().unwrap().push(event.clone())
    });

    let aggregate = Value::Object(Bean::new("User").with("events", Value::List(vec![text("a")])));
    assert!(repository.invoke(&save, vec![aggregate]).is_err());
    assert!(published.lock().unwrap().is_empty());
}

#[test]
fn test_fragments_just_keeps_order() {
    let fragments = RepositoryFragments::just([
        answering("First", "m", "first"),
        answering("Second", "n", "second"),
    ]);
    let names: Vec<String> = fragments.methods().map(|m| m.to_string()).collect();
    assert_eq!(names, vec!["First.m()", "Second.n()"]);
}
