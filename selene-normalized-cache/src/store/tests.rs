use crate::{Document, EntityRef, FieldValue, Store, StoreConfig, StoreError, Variables};
use serde_json::json;

fn parse(query: &str) -> Document {
    graphql_parser::parse_query::<String>(query)
        .unwrap()
        .into_static()
}

fn person_store() -> Store {
    Store::new(StoreConfig::with_id_attrs(["Person/id"]))
}

fn no_vars() -> Variables {
    Variables::new()
}

#[test]
fn normalizes_entities_into_the_flat_map() {
    let document = parse("{ viewer { __typename id name } }");
    let response = json!({ "viewer": { "__typename": "Person", "id": "p1", "name": "Ada" } });

    let (store, _) = person_store()
        .write(&response, &document, &no_vars())
        .unwrap();

    let person = store.entity(&EntityRef::new("Person/id", "p1")).unwrap();
    assert_eq!(person.get("Person/id"), Some(&FieldValue::Scalar(json!("p1"))));
    assert_eq!(person.get("Person/name"), Some(&FieldValue::Scalar(json!("Ada"))));

    let root = store.entity(&store.root_ref()).unwrap();
    assert_eq!(
        root.get("viewer"),
        Some(&FieldValue::Ref(EntityRef::new("Person/id", "p1")))
    );
    assert_eq!(root.get("__cache"), Some(&FieldValue::Scalar(json!("root"))));

    let data = store.read(&document, &no_vars(), false).unwrap();
    assert_eq!(data, Some(response));
}

#[test]
fn argument_qualified_fields_coexist_under_the_root() {
    let first = parse(r#"{ user(id: "u1") { name } }"#);
    let second = parse(r#"{ user(id: "u2") { name } }"#);

    let (store, _) = person_store()
        .write(&json!({ "user": { "name": "Ada" } }), &first, &no_vars())
        .unwrap();
    let (store, _) = store
        .write(&json!({ "user": { "name": "Grace" } }), &second, &no_vars())
        .unwrap();

    let root = store.entity(&store.root_ref()).unwrap();
    assert!(root.contains_key(r#"user({"id":"u1"})"#));
    assert!(root.contains_key(r#"user({"id":"u2"})"#));

    let ada = store.read(&first, &no_vars(), false).unwrap();
    assert_eq!(ada, Some(json!({ "user": { "name": "Ada" } })));
    let grace = store.read(&second, &no_vars(), false).unwrap();
    assert_eq!(grace, Some(json!({ "user": { "name": "Grace" } })));
}

#[test]
fn lists_of_non_entities_get_indexed_markers() {
    let document = parse("{ items { label } }");
    let response = json!({ "items": [{ "label": "a" }, { "label": "b" }] });

    let (store, _) = person_store()
        .write(&response, &document, &no_vars())
        .unwrap();

    let first = store
        .entity(&EntityRef::new("__cache", "root.items.0"))
        .unwrap();
    assert_eq!(first.get("label"), Some(&FieldValue::Scalar(json!("a"))));
    let second = store
        .entity(&EntityRef::new("__cache", "root.items.1"))
        .unwrap();
    assert_eq!(second.get("label"), Some(&FieldValue::Scalar(json!("b"))));

    let data = store.read(&document, &no_vars(), false).unwrap();
    assert_eq!(data, Some(response));
}

#[test]
fn aliased_fields_store_under_the_field_key_and_read_back_aliased() {
    let document = parse("{ me: viewer { name } }");
    let response = json!({ "me": { "name": "Ada" } });

    let (store, _) = person_store()
        .write(&response, &document, &no_vars())
        .unwrap();

    let root = store.entity(&store.root_ref()).unwrap();
    assert!(root.contains_key("viewer"));
    assert!(!root.contains_key("me"));

    let data = store.read(&document, &no_vars(), false).unwrap();
    assert_eq!(data, Some(response));
}

#[test]
fn non_entity_sub_maps_get_path_markers() {
    let document = parse("{ viewer { profile { bio } } }");
    let response = json!({ "viewer": { "profile": { "bio": "hi" } } });

    let (store, _) = person_store()
        .write(&response, &document, &no_vars())
        .unwrap();

    let profile = store
        .entity(&EntityRef::new("__cache", "root.viewer.profile"))
        .unwrap();
    assert_eq!(profile.get("bio"), Some(&FieldValue::Scalar(json!("hi"))));

    let data = store.read(&document, &no_vars(), false).unwrap();
    assert_eq!(data, Some(response));
}

#[test]
fn round_trips_nested_entities_with_aliases_and_arguments() {
    let document = parse(
        "query($first: Int = 2) { \
            me: viewer { __typename id name friends(first: $first) { __typename id name } } \
        }"
    );
    let response = json!({
        "me": {
            "__typename": "Person",
            "id": "p1",
            "name": "Ada",
            "friends": [
                { "__typename": "Person", "id": "p2", "name": "Grace" },
                { "__typename": "Person", "id": "p3", "name": "Edsger" }
            ]
        }
    });

    let (store, _) = person_store()
        .write(&response, &document, &no_vars())
        .unwrap();

    let viewer = store.entity(&EntityRef::new("Person/id", "p1")).unwrap();
    assert_eq!(
        viewer.get(r#"Person/friends({"first":2})"#),
        Some(&FieldValue::RefList(vec![
            EntityRef::new("Person/id", "p2"),
            EntityRef::new("Person/id", "p3")
        ]))
    );

    let data = store.read(&document, &no_vars(), false).unwrap();
    assert_eq!(data, Some(response));
}

#[test]
fn writing_the_same_response_twice_is_idempotent() {
    let document = parse("{ viewer { __typename id name } }");
    let response = json!({ "viewer": { "__typename": "Person", "id": "p1", "name": "Ada" } });

    let (once, _) = person_store()
        .write(&response, &document, &no_vars())
        .unwrap();
    let (twice, _) = once.write(&response, &document, &no_vars()).unwrap();

    assert_eq!(once.len(), twice.len());
    assert_eq!(
        once.entity(&EntityRef::new("Person/id", "p1")),
        twice.entity(&EntityRef::new("Person/id", "p1"))
    );
    assert_eq!(
        once.read(&document, &no_vars(), false).unwrap(),
        twice.read(&document, &no_vars(), false).unwrap()
    );
}

#[test]
fn overlapping_writes_union_fields_with_last_writer_wins() {
    let first_doc = parse("{ viewer { __typename id name age } }");
    let second_doc = parse("{ viewer { __typename id name } }");

    let (store, _) = person_store()
        .write(
            &json!({ "viewer": { "__typename": "Person", "id": "p1", "name": "Ada", "age": 36 } }),
            &first_doc,
            &no_vars()
        )
        .unwrap();
    let (store, _) = store
        .write(
            &json!({ "viewer": { "__typename": "Person", "id": "p1", "name": "Grace" } }),
            &second_doc,
            &no_vars()
        )
        .unwrap();

    let person = store.entity(&EntityRef::new("Person/id", "p1")).unwrap();
    assert_eq!(person.get("Person/name"), Some(&FieldValue::Scalar(json!("Grace"))));
    assert_eq!(person.get("Person/age"), Some(&FieldValue::Scalar(json!(36))));
}

#[test]
fn reads_are_isolated_by_selection() {
    let names = parse("{ viewer { __typename id name } }");
    let ages = parse("{ viewer { __typename id age } }");

    let (store, _) = person_store()
        .write(
            &json!({ "viewer": { "__typename": "Person", "id": "p1", "name": "Ada" } }),
            &names,
            &no_vars()
        )
        .unwrap();
    let (store, _) = store
        .write(
            &json!({ "viewer": { "__typename": "Person", "id": "p1", "age": 36 } }),
            &ages,
            &no_vars()
        )
        .unwrap();

    assert_eq!(
        store.read(&names, &no_vars(), false).unwrap(),
        Some(json!({ "viewer": { "__typename": "Person", "id": "p1", "name": "Ada" } }))
    );
    assert_eq!(
        store.read(&ages, &no_vars(), false).unwrap(),
        Some(json!({ "viewer": { "__typename": "Person", "id": "p1", "age": 36 } }))
    );
}

#[test]
fn missing_fields_read_back_as_absent_keys() {
    let written = parse("{ viewer { __typename id name } }");
    let requested = parse("{ viewer { __typename id name email } }");

    let (store, _) = person_store()
        .write(
            &json!({ "viewer": { "__typename": "Person", "id": "p1", "name": "Ada" } }),
            &written,
            &no_vars()
        )
        .unwrap();

    let data = store.read(&requested, &no_vars(), false).unwrap();
    assert_eq!(
        data,
        Some(json!({ "viewer": { "__typename": "Person", "id": "p1", "name": "Ada" } }))
    );
}

#[test]
fn reading_an_empty_store_returns_none() {
    let document = parse("{ viewer { name } }");
    let data = person_store().read(&document, &no_vars(), false).unwrap();
    assert_eq!(data, None);
}

#[test]
fn recursing_into_a_scalar_fails_the_read() {
    let written = parse("{ viewer }");
    let requested = parse("{ viewer { name } }");

    let (store, _) = person_store()
        .write(&json!({ "viewer": 42 }), &written, &no_vars())
        .unwrap();

    let err = store.read(&requested, &no_vars(), false).unwrap_err();
    assert!(matches!(err, StoreError::PullNotRef(_)));
}

#[test]
fn leaf_object_values_stay_embedded() {
    let document = parse("{ viewer { __typename id settings } }");
    let response = json!({
        "viewer": {
            "__typename": "Person",
            "id": "p1",
            "settings": { "theme": "dark", "pageSize": 25 }
        }
    });

    let (store, _) = person_store()
        .write(&response, &document, &no_vars())
        .unwrap();

    let person = store.entity(&EntityRef::new("Person/id", "p1")).unwrap();
    assert_eq!(
        person.get("Person/settings"),
        Some(&FieldValue::Object(
            json!({ "theme": "dark", "pageSize": 25 })
                .as_object()
                .cloned()
                .unwrap()
        ))
    );

    let data = store.read(&document, &no_vars(), false).unwrap();
    assert_eq!(data, Some(response));
}

#[test]
fn mixed_entity_maps_fail_the_write() {
    let document = parse("{ blob }");
    let response = json!({ "blob": { "a": { "Person/id": "p1" }, "b": 1 } });

    let store = person_store();
    let err = store.write(&response, &document, &no_vars()).unwrap_err();
    assert!(matches!(err, StoreError::MixedEntityMap(_)));
    assert!(store.is_empty());
}

#[test]
fn mixed_lists_fail_the_write() {
    let document = parse("{ items }");
    let response = json!({ "items": [{ "Person/id": "p1" }, 1] });

    let err = person_store()
        .write(&response, &document, &no_vars())
        .unwrap_err();
    assert!(matches!(err, StoreError::MixedEntityMap(_)));
}

#[test]
fn reference_valued_maps_normalize_to_links() {
    let document = parse("{ index }");
    let response = json!({
        "index": {
            "ada": { "Person/id": "p1" },
            "grace": { "Person/id": "p2" }
        }
    });

    let (store, _) = person_store()
        .write(&response, &document, &no_vars())
        .unwrap();

    let root = store.entity(&store.root_ref()).unwrap();
    assert_eq!(
        root.get("index"),
        Some(&FieldValue::RefMap(vec![
            ("ada".to_string(), EntityRef::new("Person/id", "p1")),
            ("grace".to_string(), EntityRef::new("Person/id", "p2"))
        ]))
    );

    let by_name = parse("{ index { id } }");
    let data = store.read(&by_name, &no_vars(), false).unwrap();
    assert_eq!(
        data,
        Some(json!({ "index": { "ada": { "id": "p1" }, "grace": { "id": "p2" } } }))
    );
}

#[test]
fn entity_updates_are_visible_to_other_queries() {
    let list_doc = parse("{ people { __typename id name } }");
    let one_doc = parse(r#"{ person(id: "p1") { __typename id name } }"#);

    let (store, _) = person_store()
        .write(
            &json!({ "people": [{ "__typename": "Person", "id": "p1", "name": "Ada" }] }),
            &list_doc,
            &no_vars()
        )
        .unwrap();
    let (store, _) = store
        .write(
            &json!({ "person": { "__typename": "Person", "id": "p1", "name": "Ada Lovelace" } }),
            &one_doc,
            &no_vars()
        )
        .unwrap();

    let data = store.read(&list_doc, &no_vars(), false).unwrap();
    assert_eq!(
        data,
        Some(json!({ "people": [{ "__typename": "Person", "id": "p1", "name": "Ada Lovelace" }] }))
    );
}

#[test]
fn mutation_results_skip_the_root_but_store_entities() {
    let document = parse("mutation { addUser { __typename id name } }");
    let response = json!({ "addUser": { "__typename": "Person", "id": "u5", "name": "Ada" } });

    let store = person_store();
    let (store, record) = store.write(&response, &document, &no_vars()).unwrap();

    assert!(store.entity(&store.root_ref()).is_none());
    assert!(store.entity(&EntityRef::new("Person/id", "u5")).is_some());

    let read_back = store.read_response(&document, &no_vars(), &record).unwrap();
    assert_eq!(read_back, Some(response));
}

#[test]
fn null_links_read_back_as_null() {
    let document = parse("{ viewer { name } }");
    let response = json!({ "viewer": null });

    let (store, _) = person_store()
        .write(&response, &document, &no_vars())
        .unwrap();

    let data = store.read(&document, &no_vars(), false).unwrap();
    assert_eq!(data, Some(json!({ "viewer": null })));
}

#[test]
fn seeded_entities_are_readable() {
    let mut config = StoreConfig::with_id_attrs(["Person/id"]);
    let mut root = crate::EntityRecord::default();
    root.insert(
        "viewer".to_string(),
        FieldValue::Ref(EntityRef::new("Person/id", "p1"))
    );
    root.insert("__cache".to_string(), FieldValue::Scalar(json!("root")));
    let mut person = crate::EntityRecord::default();
    person.insert("Person/id".to_string(), FieldValue::Scalar(json!("p1")));
    person.insert("Person/name".to_string(), FieldValue::Scalar(json!("Ada")));
    config.entities = vec![
        (EntityRef::new("__cache", "root"), root),
        (EntityRef::new("Person/id", "p1"), person)
    ];

    let store = Store::new(config);
    let document = parse("{ viewer { id name } }");
    let data = store.read(&document, &no_vars(), false).unwrap();
    assert_eq!(data, Some(json!({ "viewer": { "id": "p1", "name": "Ada" } })));
}

#[test]
fn variables_qualify_storage_keys() {
    let document = parse("query($id: ID!) { user(id: $id) { name } }");
    let mut variables = Variables::new();
    variables.insert("id".to_string(), json!("u1"));

    let (store, _) = person_store()
        .write(&json!({ "user": { "name": "Ada" } }), &document, &variables)
        .unwrap();

    let root = store.entity(&store.root_ref()).unwrap();
    assert!(root.contains_key(r#"user({"id":"u1"})"#));

    let mut other = Variables::new();
    other.insert("id".to_string(), json!("u2"));
    assert_eq!(store.read(&document, &other, false).unwrap(), Some(json!({})));
}
