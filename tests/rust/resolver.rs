use async_trait::async_trait;
use rstest::rstest;
use serde_json::json;
use std::sync::Arc;

use _search_registry::core::config::{RegistryConfig, TypeOptions};
use _search_registry::core::hit_resolver::{Window, PAGE_RELATION};
use _search_registry::index::memory_repo::{BatchRequest, InMemoryRepository};
use _search_registry::index::repository::{Repository, RepositoryFactory};
use _search_registry::{
    CoreError, CoreResult, EntityRecord, HitResolver, SearchHit, TypeRegistry, TypeUid,
    WindowOptions,
};

use crate::support::{article_hit, product_hit, Fixture, ARTICLE, PRODUCT};

fn ids(entities: &[EntityRecord]) -> Vec<String> {
    entities
        .iter()
        .map(|entity| {
            entity
                .attributes
                .get("slug")
                .or_else(|| entity.attributes.get("id"))
                .map(|value| match value {
                    serde_json::Value::String(text) => text.clone(),
                    other => other.to_string(),
                })
                .unwrap_or_default()
        })
        .collect()
}

fn keys(range: std::ops::RangeInclusive<u64>) -> Vec<String> {
    range.map(|id| id.to_string()).collect()
}

#[tokio::test]
async fn resolve_one_fetches_by_private_key() {
    let fixture = Fixture::new(3, 3);
    let resolver = HitResolver::new(fixture.registry.clone());

    let article = resolver.resolve_one(&article_hit(2)).await.unwrap().unwrap();
    assert_eq!(article.type_name, ARTICLE);
    assert_eq!(article.attributes["title"], json!("article-2"));

    let product = resolver.resolve_one(&product_hit(3)).await.unwrap().unwrap();
    assert_eq!(product.attributes["name"], json!("product-3"));
}

#[tokio::test]
async fn resolve_one_treats_stale_key_as_absent() {
    let fixture = Fixture::new(3, 0);
    let resolver = HitResolver::new(fixture.registry.clone());

    assert!(resolver.resolve_one(&article_hit(99)).await.unwrap().is_none());
}

#[tokio::test]
async fn resolve_one_rejects_unregistered_type() {
    let fixture = Fixture::new(3, 0);
    let resolver = HitResolver::new(fixture.registry.clone());
    let hit = SearchHit::new(TypeUid::from("unknown"), "1");

    assert!(matches!(
        resolver.resolve_one(&hit).await,
        Err(CoreError::NotFound(_))
    ));
}

#[tokio::test]
async fn page_window_fetches_only_windowed_keys() {
    let fixture = Fixture::new(20, 0);
    let resolver = HitResolver::new(fixture.registry.clone());
    let hits = (1..=20).map(article_hit).collect::<Vec<_>>();

    let resolved = resolver
        .resolve_many(&hits, WindowOptions::page(5, 10))
        .await
        .unwrap();

    assert_eq!(resolved.total_count, 20);
    assert_eq!(ids(&resolved.entities), keys(6..=15));

    let requests = fixture.repository(ARTICLE).batch_requests().unwrap();
    assert_eq!(
        requests,
        vec![BatchRequest {
            keys: keys(6..=15),
            eager_load: vec![PAGE_RELATION.to_string()],
        }]
    );
}

#[tokio::test]
async fn missing_window_resolves_every_hit() {
    let fixture = Fixture::new(5, 0);
    let resolver = HitResolver::new(fixture.registry.clone());
    let hits = vec![article_hit(3), article_hit(1), article_hit(5)];

    for options in [
        WindowOptions::default(),
        WindowOptions {
            offset: Some(1),
            limit: None,
        },
        WindowOptions {
            offset: None,
            limit: Some(1),
        },
    ] {
        let resolved = resolver.resolve_many(&hits, options).await.unwrap();
        assert_eq!(resolved.total_count, 3);
        assert_eq!(ids(&resolved.entities), vec!["3", "1", "5"]);
    }

    let requests = fixture.repository(ARTICLE).batch_requests().unwrap();
    assert_eq!(requests.len(), 3);
}

#[tokio::test]
async fn mixed_types_batch_once_per_type_and_keep_hit_order() {
    let fixture = Fixture::new(10, 10);
    let resolver = HitResolver::new(fixture.registry.clone());
    let hits = vec![
        article_hit(1),
        product_hit(4),
        article_hit(2),
        product_hit(7),
        article_hit(9),
        product_hit(1),
    ];

    let resolved = resolver
        .resolve_many(&hits, WindowOptions::page(1, 4))
        .await
        .unwrap();

    assert_eq!(resolved.total_count, 6);
    assert!(resolved.entities.len() <= 4);
    assert_eq!(ids(&resolved.entities), vec!["sku-4", "2", "sku-7", "9"]);

    let article_requests = fixture.repository(ARTICLE).batch_requests().unwrap();
    let product_requests = fixture.repository(PRODUCT).batch_requests().unwrap();
    assert_eq!(article_requests.len(), 1);
    assert_eq!(article_requests[0].keys, vec!["2", "9"]);
    assert_eq!(product_requests.len(), 1);
    assert_eq!(product_requests[0].keys, vec!["sku-4", "sku-7"]);
}

#[rstest]
#[case(25, 5, 0)]
#[case(18, 10, 2)]
#[case(0, 0, 0)]
#[case(0, 100, 20)]
#[tokio::test]
async fn window_uses_slice_semantics(
    #[case] offset: usize,
    #[case] limit: usize,
    #[case] expected: usize,
) {
    let fixture = Fixture::new(20, 0);
    let resolver = HitResolver::new(fixture.registry.clone());
    let hits = (1..=20).map(article_hit).collect::<Vec<_>>();

    let resolved = resolver.resolve_page(&hits, offset, limit).await.unwrap();

    assert_eq!(resolved.total_count, 20);
    assert_eq!(resolved.entities.len(), expected);
}

#[test]
fn window_options_require_both_values() {
    assert_eq!(WindowOptions::default().window(), Window::All);
    assert_eq!(
        WindowOptions {
            offset: Some(3),
            limit: None
        }
        .window(),
        Window::All
    );
    assert_eq!(
        WindowOptions::page(3, 4).window(),
        Window::Page {
            offset: 3,
            limit: 4
        }
    );

    let parsed: WindowOptions = serde_json::from_str(r#"{ "offset": 2, "limit": 5 }"#).unwrap();
    assert_eq!(parsed, WindowOptions::page(2, 5));
}

#[tokio::test]
async fn stale_and_duplicate_hits_are_collapsed() {
    let fixture = Fixture::new(3, 0);
    let resolver = HitResolver::new(fixture.registry.clone());
    let hits = vec![
        article_hit(2),
        article_hit(42),
        article_hit(2),
        article_hit(3),
    ];

    let resolved = resolver.resolve_all(&hits).await.unwrap();

    assert_eq!(resolved.total_count, 4);
    assert_eq!(ids(&resolved.entities), vec!["2", "3"]);

    let requests = fixture.repository(ARTICLE).batch_requests().unwrap();
    assert_eq!(requests[0].keys, vec!["2", "42", "3"]);
}

#[tokio::test]
async fn unregistered_type_in_batch_fails_before_fetching() {
    let fixture = Fixture::new(3, 0);
    let resolver = HitResolver::new(fixture.registry.clone());
    let hits = vec![article_hit(1), SearchHit::new(TypeUid::from("unknown"), "1")];

    let result = resolver.resolve_all(&hits).await;

    assert!(matches!(result, Err(CoreError::NotFound(_))));
    assert!(fixture.repository(ARTICLE).batch_requests().unwrap().is_empty());
}

#[tokio::test]
async fn page_relation_is_eager_loaded() {
    let fixture = Fixture::new(3, 0);
    fixture
        .repository(ARTICLE)
        .attach_relation(
            PAGE_RELATION,
            "page_id",
            [("1".to_string(), json!({ "id": 1, "slug": "home" }))],
        )
        .unwrap();
    let resolver = HitResolver::new(fixture.registry.clone());

    let resolved = resolver
        .resolve_many(&[article_hit(1), article_hit(2)], WindowOptions::page(0, 2))
        .await
        .unwrap();

    assert_eq!(
        resolved.entities[0].relation(PAGE_RELATION),
        Some(&json!({ "id": 1, "slug": "home" }))
    );
    assert_eq!(
        resolved.entities[1].relation(PAGE_RELATION),
        Some(&serde_json::Value::Null)
    );
}

struct BrokenRepository;

#[async_trait]
impl Repository for BrokenRepository {
    fn type_name(&self) -> &str {
        "Broken"
    }

    async fn find_by_key(&self, _key: &str) -> CoreResult<Option<EntityRecord>> {
        Err(CoreError::Db("connection reset".to_string()))
    }

    async fn find_by_keys(
        &self,
        _keys: &[String],
        _eager_load: &[&str],
    ) -> CoreResult<Vec<EntityRecord>> {
        Err(CoreError::Db("connection reset".to_string()))
    }
}

struct BrokenFactory;

impl RepositoryFactory for BrokenFactory {
    fn new_instance(&self, _type_name: &str, _private_key: &str) -> CoreResult<Arc<dyn Repository>> {
        Ok(Arc::new(BrokenRepository))
    }
}

#[tokio::test]
async fn repository_failures_propagate() {
    let config = RegistryConfig::new().with_type("Broken", TypeOptions::with_fields(["title"]));
    let registry = TypeRegistry::build(&config, Arc::new(BrokenFactory)).unwrap();
    let resolver = HitResolver::new(Arc::new(registry));
    let hit = SearchHit::new(TypeUid::derive("Broken"), "1");

    assert!(matches!(
        resolver.resolve_one(&hit).await,
        Err(CoreError::Db(_))
    ));
    assert!(matches!(
        resolver.resolve_many(&[hit.clone()], WindowOptions::page(0, 10)).await,
        Err(CoreError::Db(_))
    ));
}

#[tokio::test]
async fn empty_hits_resolve_to_nothing() {
    let fixture = Fixture::new(3, 3);
    let resolver = HitResolver::new(fixture.registry.clone());

    let resolved = resolver.resolve_many(&[], WindowOptions::default()).await.unwrap();

    assert_eq!(resolved.total_count, 0);
    assert!(resolved.entities.is_empty());
    assert!(fixture.repository(ARTICLE).batch_requests().unwrap().is_empty());
}

/// 저장소가 키를 자기 표기(소문자)로 돌려주는 경우.
struct CaseFoldingRepository;

#[async_trait]
impl Repository for CaseFoldingRepository {
    fn type_name(&self) -> &str {
        "Folded"
    }

    async fn find_by_key(&self, _key: &str) -> CoreResult<Option<EntityRecord>> {
        Ok(None)
    }

    async fn find_by_keys(
        &self,
        keys: &[String],
        _eager_load: &[&str],
    ) -> CoreResult<Vec<EntityRecord>> {
        Ok(keys
            .iter()
            .map(|key| {
                let folded = key.to_lowercase();
                let attributes = match json!({ "id": folded, "title": key }) {
                    serde_json::Value::Object(map) => map,
                    _ => serde_json::Map::new(),
                };
                EntityRecord::new("Folded", attributes)
            })
            .collect())
    }
}

struct CaseFoldingFactory;

impl RepositoryFactory for CaseFoldingFactory {
    fn new_instance(&self, _type_name: &str, _private_key: &str) -> CoreResult<Arc<dyn Repository>> {
        Ok(Arc::new(CaseFoldingRepository))
    }
}

fn folded_resolver() -> HitResolver {
    let config = RegistryConfig::new().with_type("Folded", TypeOptions::with_fields(["title"]));
    let registry = TypeRegistry::build(&config, Arc::new(CaseFoldingFactory)).unwrap();
    HitResolver::new(Arc::new(registry))
}

#[tokio::test]
async fn records_with_differently_rendered_keys_are_kept() {
    let resolver = folded_resolver();
    let hits = vec![SearchHit::new(TypeUid::derive("Folded"), "ABC")];

    let resolved = resolver.resolve_all(&hits).await.unwrap();

    assert_eq!(resolved.total_count, 1);
    assert_eq!(resolved.entities.len(), 1);
    assert_eq!(resolved.entities[0].attributes["title"], json!("ABC"));
}

#[tokio::test]
async fn unmatched_records_follow_matched_ones_in_fetch_order() {
    let resolver = folded_resolver();
    let uid = TypeUid::derive("Folded");
    let hits = vec![
        SearchHit::new(uid.clone(), "XY"),
        SearchHit::new(uid.clone(), "lower"),
        SearchHit::new(uid.clone(), "Mixed"),
    ];

    let resolved = resolver
        .resolve_many(&hits, WindowOptions::page(0, 3))
        .await
        .unwrap();

    let titles = resolved
        .entities
        .iter()
        .map(|entity| entity.attributes["title"].clone())
        .collect::<Vec<_>>();
    assert_eq!(titles, vec![json!("lower"), json!("XY"), json!("Mixed")]);
}

#[tokio::test]
async fn numeric_keys_with_trailing_zeros_are_not_lost() {
    let repository = InMemoryRepository::new("Priced", "id");
    repository
        .insert(crate::support::attributes(json!({ "id": 1.5, "title": "one and a half" })))
        .unwrap();
    // numeric 컬럼은 "1.50"으로 찾지만 레코드 키는 1.5로 돌아온다.
    struct AllRecords(InMemoryRepository);

    #[async_trait]
    impl Repository for AllRecords {
        fn type_name(&self) -> &str {
            self.0.type_name()
        }

        async fn find_by_key(&self, key: &str) -> CoreResult<Option<EntityRecord>> {
            self.0.find_by_key(key).await
        }

        async fn find_by_keys(
            &self,
            _keys: &[String],
            eager_load: &[&str],
        ) -> CoreResult<Vec<EntityRecord>> {
            self.0.find_by_keys(&["1.5".to_string()], eager_load).await
        }
    }

    struct PricedFactory(Arc<AllRecords>);

    impl RepositoryFactory for PricedFactory {
        fn new_instance(&self, _type_name: &str, _private_key: &str) -> CoreResult<Arc<dyn Repository>> {
            let repository: Arc<dyn Repository> = self.0.clone();
            Ok(repository)
        }
    }

    let config = RegistryConfig::new().with_type("Priced", TypeOptions::with_fields(["title"]));
    let factory = PricedFactory(Arc::new(AllRecords(repository)));
    let registry = TypeRegistry::build(&config, Arc::new(factory)).unwrap();
    let resolver = HitResolver::new(Arc::new(registry));

    let resolved = resolver
        .resolve_all(&[SearchHit::new(TypeUid::derive("Priced"), "1.50")])
        .await
        .unwrap();

    assert_eq!(resolved.entities.len(), 1);
    assert_eq!(resolved.entities[0].attributes["title"], json!("one and a half"));
}
