// 목적:
// - 메모리 기반 저장소와 팩토리를 제공한다.
//
// 설명:
// - 임베딩 환경과 테스트에서 DB 없이 레지스트리/리졸버를 구동한다.
// - 배치 조회 요청(키 목록, eager load 목록)을 기록해 호출 패턴을 검증할 수 있다.
//
// 디자인 패턴:
// - 저장소 패턴(Repository Pattern) + 테스트 더블(Test Double).
//
// 참조:
// - src_rs/index/repository.rs

use async_trait::async_trait;
use serde_json::{Map, Value};
use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex, PoisonError, RwLock};

use crate::core::entity::{key_string, Entity, EntityRecord, TypeUid};
use crate::core::errors::{CoreError, CoreResult};
use crate::index::repository::{Repository, RepositoryFactory};

/// `find_by_keys` 호출 한 번의 기록이다.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BatchRequest {
    pub keys: Vec<String>,
    pub eager_load: Vec<String>,
}

#[derive(Debug)]
struct MemoryRelation {
    foreign_key: String,
    rows: HashMap<String, Value>,
}

#[derive(Debug)]
pub struct InMemoryRepository {
    type_name: String,
    private_key: String,
    records: RwLock<Vec<EntityRecord>>,
    relations: RwLock<HashMap<String, MemoryRelation>>,
    batch_requests: Mutex<Vec<BatchRequest>>,
}

impl InMemoryRepository {
    pub fn new(type_name: impl Into<String>, private_key: impl Into<String>) -> Self {
        Self {
            type_name: type_name.into(),
            private_key: private_key.into(),
            records: RwLock::new(Vec::new()),
            relations: RwLock::new(HashMap::new()),
            batch_requests: Mutex::new(Vec::new()),
        }
    }

    /// 속성 맵으로 엔티티를 추가한다.
    pub fn insert(&self, attributes: Map<String, Value>) -> CoreResult<()> {
        let record = EntityRecord::new(self.type_name.clone(), attributes);
        if self.key_of(&record).is_none() {
            return Err(CoreError::InvalidInput(format!(
                "'{}' 엔티티에 private key '{}' 값이 없습니다",
                self.type_name, self.private_key
            )));
        }

        self.records
            .write()
            .map_err(lock_error)?
            .push(record);
        Ok(())
    }

    /// eager load 가능한 관계를 등록한다. `rows`는 관계 키 -> 관계 값이다.
    pub fn attach_relation<I>(&self, name: &str, foreign_key: &str, rows: I) -> CoreResult<()>
    where
        I: IntoIterator<Item = (String, Value)>,
    {
        let relation = MemoryRelation {
            foreign_key: foreign_key.to_string(),
            rows: rows.into_iter().collect(),
        };
        self.relations
            .write()
            .map_err(lock_error)?
            .insert(name.to_string(), relation);
        Ok(())
    }

    pub fn batch_requests(&self) -> CoreResult<Vec<BatchRequest>> {
        Ok(self.batch_requests.lock().map_err(lock_error)?.clone())
    }

    pub fn len(&self) -> CoreResult<usize> {
        Ok(self.records.read().map_err(lock_error)?.len())
    }

    pub fn is_empty(&self) -> CoreResult<bool> {
        Ok(self.len()? == 0)
    }

    fn key_of(&self, record: &EntityRecord) -> Option<String> {
        record.attribute(&self.private_key).and_then(key_string)
    }

    fn load_relations(&self, record: &mut EntityRecord, eager_load: &[&str]) -> CoreResult<()> {
        let relations = self.relations.read().map_err(lock_error)?;
        for name in eager_load {
            let Some(relation) = relations.get(*name) else {
                tracing::debug!(type_name = %self.type_name, relation = %name, "등록되지 않은 관계는 건너뜁니다");
                continue;
            };

            let related = record
                .attribute(&relation.foreign_key)
                .and_then(key_string)
                .and_then(|key| relation.rows.get(&key).cloned())
                .unwrap_or(Value::Null);
            record.relations.insert((*name).to_string(), related);
        }
        Ok(())
    }
}

#[async_trait]
impl Repository for InMemoryRepository {
    fn type_name(&self) -> &str {
        &self.type_name
    }

    async fn find_by_key(&self, key: &str) -> CoreResult<Option<EntityRecord>> {
        let records = self.records.read().map_err(lock_error)?;
        Ok(records
            .iter()
            .find(|record| self.key_of(record).as_deref() == Some(key))
            .cloned())
    }

    async fn find_by_keys(
        &self,
        keys: &[String],
        eager_load: &[&str],
    ) -> CoreResult<Vec<EntityRecord>> {
        self.batch_requests
            .lock()
            .map_err(lock_error)?
            .push(BatchRequest {
                keys: keys.to_vec(),
                eager_load: eager_load.iter().map(|name| name.to_string()).collect(),
            });

        let wanted = keys.iter().map(String::as_str).collect::<HashSet<_>>();
        let mut found = {
            let records = self.records.read().map_err(lock_error)?;
            records
                .iter()
                .filter(|record| {
                    self.key_of(record)
                        .is_some_and(|key| wanted.contains(key.as_str()))
                })
                .cloned()
                .collect::<Vec<_>>()
        };

        for record in found.iter_mut() {
            self.load_relations(record, eager_load)?;
        }
        Ok(found)
    }
}

/// 미리 채운 메모리 저장소를 타입명으로 내어주는 팩토리다.
#[derive(Debug, Default)]
pub struct InMemoryRepositoryFactory {
    repositories: HashMap<String, Arc<InMemoryRepository>>,
    uid_overrides: HashMap<String, TypeUid>,
}

impl InMemoryRepositoryFactory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_repository(mut self, repository: InMemoryRepository) -> Self {
        self.repositories
            .insert(repository.type_name.clone(), Arc::new(repository));
        self
    }

    /// 특정 타입의 UID를 고정값으로 덮어쓴다.
    pub fn with_type_uid(mut self, type_name: impl Into<String>, type_uid: TypeUid) -> Self {
        self.uid_overrides.insert(type_name.into(), type_uid);
        self
    }

    pub fn repository(&self, type_name: &str) -> Option<Arc<InMemoryRepository>> {
        self.repositories.get(type_name).cloned()
    }
}

impl RepositoryFactory for InMemoryRepositoryFactory {
    fn new_instance(&self, type_name: &str, private_key: &str) -> CoreResult<Arc<dyn Repository>> {
        if let Some(repository) = self.repositories.get(type_name) {
            let repository: Arc<dyn Repository> = repository.clone();
            return Ok(repository);
        }

        Ok(Arc::new(InMemoryRepository::new(type_name, private_key)))
    }

    fn type_uid(&self, type_name: &str) -> TypeUid {
        self.uid_overrides
            .get(type_name)
            .cloned()
            .unwrap_or_else(|| TypeUid::derive(type_name))
    }
}

fn lock_error<T>(error: PoisonError<T>) -> CoreError {
    CoreError::Runtime(format!("메모리 저장소 잠금 실패: {}", error))
}
