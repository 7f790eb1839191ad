use rstest::rstest;

use _search_registry::index::sql::{select_by_key_sql, select_by_keys_sql, validate_identifier};
use _search_registry::CoreError;

#[rstest]
#[case("articles")]
#[case("page_2")]
#[case("ID")]
fn accepts_plain_identifiers(#[case] value: &str) {
    assert!(validate_identifier(value, "table").is_ok());
}

#[rstest]
#[case("")]
#[case("   ")]
#[case("articles; DROP TABLE users")]
#[case("public.articles")]
#[case("name\"")]
fn rejects_unsafe_identifiers(#[case] value: &str) {
    let error = validate_identifier(value, "table").unwrap_err();
    assert!(matches!(error, CoreError::InvalidConfig(_)));
}

#[test]
fn key_lookup_sql_casts_key_to_text() {
    assert_eq!(
        select_by_key_sql("articles", "id"),
        "SELECT to_jsonb(t) AS record FROM articles t WHERE t.id::text = $1 LIMIT 1"
    );
    assert_eq!(
        select_by_keys_sql("products", "slug"),
        "SELECT to_jsonb(t) AS record FROM products t WHERE t.slug::text = ANY($1)"
    );
}
