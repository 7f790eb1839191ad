use rstest::rstest;
use serde_json::{json, Value};

use _search_registry::core::config::RelationMapping;
use _search_registry::core::entity::key_string;
use _search_registry::index::postgres_repo::{attach_relation_rows, relation_foreign_keys};
use _search_registry::EntityRecord;

use crate::support::{attributes, ARTICLE};

fn page_relation() -> RelationMapping {
    RelationMapping {
        table: "pages".to_string(),
        foreign_key: "page_id".to_string(),
        key: "id".to_string(),
    }
}

fn article(id: u64, page_id: Value) -> EntityRecord {
    EntityRecord::new(ARTICLE, attributes(json!({ "id": id, "page_id": page_id })))
}

#[test]
fn foreign_keys_are_deduplicated_and_sorted() {
    let records = vec![
        article(1, json!(7)),
        article(2, json!(3)),
        article(3, json!(7)),
        article(4, json!("3")),
    ];

    assert_eq!(relation_foreign_keys(&page_relation(), &records), vec!["3", "7"]);
}

#[rstest]
#[case(json!(null))]
#[case(json!([1, 2]))]
#[case(json!({ "id": 1 }))]
fn foreign_keys_skip_unusable_values(#[case] page_id: Value) {
    let records = vec![article(1, page_id), article(2, json!(5))];

    assert_eq!(relation_foreign_keys(&page_relation(), &records), vec!["5"]);
}

#[test]
fn foreign_keys_of_records_without_the_column_are_empty() {
    let records = vec![EntityRecord::new(ARTICLE, attributes(json!({ "id": 1 })))];

    assert!(relation_foreign_keys(&page_relation(), &records).is_empty());
}

#[test]
fn relation_rows_attach_by_foreign_key_and_missing_ones_become_null() {
    let mut records = vec![
        article(1, json!(10)),
        article(2, json!(20)),
        article(3, json!(10)),
        EntityRecord::new(ARTICLE, attributes(json!({ "id": 4 }))),
    ];
    let rows = vec![
        json!({ "id": 10, "slug": "home" }),
        json!({ "id": 30, "slug": "orphan" }),
        json!({ "slug": "no-key" }),
    ];

    attach_relation_rows("page", &page_relation(), &mut records, rows);

    assert_eq!(records[0].relation("page"), Some(&json!({ "id": 10, "slug": "home" })));
    assert_eq!(records[1].relation("page"), Some(&Value::Null));
    assert_eq!(records[2].relation("page"), Some(&json!({ "id": 10, "slug": "home" })));
    assert_eq!(records[3].relation("page"), Some(&Value::Null));
}

#[test]
fn empty_relation_rows_still_set_every_relation() {
    let mut records = vec![article(1, json!(10)), article(2, json!(20))];

    attach_relation_rows("page", &page_relation(), &mut records, Vec::new());

    assert!(records
        .iter()
        .all(|record| record.relation("page") == Some(&Value::Null)));
}

#[rstest]
#[case(json!(1.50), "1.5")]
#[case(json!(42), "42")]
#[case(json!("1.50"), "1.50")]
fn numeric_keys_render_in_json_form(#[case] key: Value, #[case] expected: &str) {
    assert_eq!(key_string(&key).as_deref(), Some(expected));
}
