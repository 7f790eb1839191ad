// 목적:
// - 타입별 저장소와 저장소 팩토리의 경계 인터페이스를 정의한다.
//
// 설명:
// - 레지스트리/리졸버는 이 트레이트만 호출하며 실제 조회 구현은 알지 못한다.
// - 저장소는 상태 없는 조회 파사드로 간주하며 동시 읽기에 안전해야 한다.
//
// 디자인 패턴:
// - 저장소 패턴(Repository Pattern) + 추상 팩토리(Abstract Factory).
//
// 참조:
// - src_rs/index/memory_repo.rs
// - src_rs/index/postgres_repo.rs

use async_trait::async_trait;
use std::sync::Arc;

use crate::core::entity::{EntityRecord, TypeUid};
use crate::core::errors::CoreResult;

/// 타입 하나의 엔티티를 조회하는 저장소다.
#[async_trait]
pub trait Repository: Send + Sync {
    fn type_name(&self) -> &str;

    /// private key로 한 건을 조회한다. 없으면 `Ok(None)`.
    async fn find_by_key(&self, key: &str) -> CoreResult<Option<EntityRecord>>;

    /// 여러 private key를 한 번에 조회하고 `eager_load` 관계를 함께 채운다.
    async fn find_by_keys(&self, keys: &[String], eager_load: &[&str])
        -> CoreResult<Vec<EntityRecord>>;
}

pub trait RepositoryFactory: Send + Sync {
    fn new_instance(&self, type_name: &str, private_key: &str) -> CoreResult<Arc<dyn Repository>>;

    fn type_uid(&self, type_name: &str) -> TypeUid {
        TypeUid::derive(type_name)
    }
}
