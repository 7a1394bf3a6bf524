use super::*;
use serde_json::json;

fn system_template(store: &TemplateStore, id: &str, max_workers: i64) {
    store.raw.write().insert(
        id.to_string(),
        RawEntry {
            document: json!({
                "id": id, "name": id, "version": "1.0.0",
                "config": { "max_workers": max_workers },
                "delimiters": { "start": "<<<A>>>", "end": "<<<B>>>" },
            }),
            system: true,
        },
    );
}

#[test]
fn child_overrides_parent_scalar_but_inherits_delimiters() {
    let store = TemplateStore::empty();
    system_template(&store, "_default", 5);
    store.raw.write().insert(
        "docs".to_string(),
        RawEntry {
            document: json!({
                "id": "docs", "name": "docs", "version": "1.0.0", "extends": "_default",
                "config": { "max_workers": 8 },
            }),
            system: false,
        },
    );

    let resolved = store.resolve("docs").unwrap();
    assert_eq!(resolved.config.max_workers, 8);
    assert_eq!(resolved.delimiters.start, "<<<A>>>");
}

#[test]
fn cyclic_inheritance_is_rejected() {
    let store = TemplateStore::empty();
    store.raw.write().insert(
        "a".to_string(),
        RawEntry { document: json!({"id":"a","name":"a","version":"1.0.0","extends":"b"}), system: false },
    );
    store.raw.write().insert(
        "b".to_string(),
        RawEntry { document: json!({"id":"b","name":"b","version":"1.0.0","extends":"a"}), system: false },
    );

    assert!(matches!(store.resolve("a"), Err(TemplateError::CyclicInheritance(_))));
}

#[test]
fn system_template_cannot_be_updated_or_deleted() {
    let store = TemplateStore::empty();
    system_template(&store, "_default", 5);

    assert!(matches!(store.update("_default", json!({})), Err(TemplateError::ImmutableSystemTemplate(_))));
    assert!(matches!(store.delete("_default"), Err(TemplateError::ImmutableSystemTemplate(_))));
}

#[test]
fn deleting_a_referenced_parent_fails() {
    let store = TemplateStore::empty();
    system_template(&store, "_default", 5);
    store
        .create("docs".into(), json!({"id":"docs","name":"docs","version":"1.0.0","extends":"_default"}))
        .unwrap();

    let store2 = TemplateStore::empty();
    store2.raw.write().insert(
        "_default".to_string(),
        RawEntry { document: json!({"id":"_default","name":"_default","version":"1.0.0"}), system: false },
    );
    store2
        .create("docs".into(), json!({"id":"docs","name":"docs","version":"1.0.0","extends":"_default"}))
        .unwrap();

    assert!(matches!(store2.delete("_default"), Err(TemplateError::StillReferenced(_, _))));
}

#[test]
fn round_trip_through_create_resolve_is_stable() {
    let store = TemplateStore::empty();
    let created = store
        .create("solo".into(), json!({"id":"solo","name":"solo","version":"1.0.0"}))
        .unwrap();
    let resolved_again = store.resolve("solo").unwrap();
    assert_eq!(created.config.max_workers, resolved_again.config.max_workers);
}

#[test]
fn missing_delimiter_fails_validation() {
    let store = TemplateStore::empty();
    let result = store.create(
        "bad".into(),
        json!({"id":"bad","name":"bad","version":"1.0.0","delimiters":{"start":"","end":"x"}}),
    );
    assert!(matches!(result, Err(TemplateError::Validation(_))));
}
