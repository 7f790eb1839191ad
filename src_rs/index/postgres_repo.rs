// 목적:
// - PostgreSQL 기반 엔티티 저장소와 저장소 팩토리를 제공한다.
//
// 설명:
// - 타입마다 테이블 하나를 private key 컬럼으로 조회한다.
// - eager load 관계는 관계마다 추가 쿼리 1회로 일괄 조회해 엔티티에 붙인다.
// - 테이블/컬럼명은 생성 시 검증해 SQL 주입 위험을 줄인다.
//
// 디자인 패턴:
// - 저장소 패턴(Repository Pattern).
//
// 참조:
// - src_rs/index/sql.rs
// - src_rs/index/repository.rs

use async_trait::async_trait;
use serde_json::Value;
use sqlx::postgres::{PgConnectOptions, PgPoolOptions, PgRow};
use sqlx::{PgPool, Row};
use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::sync::Arc;

use crate::core::config::{PostgresConfigPayload, RelationMapping, TableMapping};
use crate::core::entity::{key_string, Entity, EntityRecord};
use crate::core::errors::{CoreError, CoreResult};
use crate::index::repository::{Repository, RepositoryFactory};
use crate::index::sql::{select_by_key_sql, select_by_keys_sql, validate_identifier};

pub struct PostgresRepository {
    pool: PgPool,
    type_name: String,
    table: String,
    key_column: String,
    relations: BTreeMap<String, RelationMapping>,
}

impl PostgresRepository {
    pub fn new(
        pool: PgPool,
        type_name: &str,
        mapping: &TableMapping,
        key_column: &str,
    ) -> CoreResult<Self> {
        validate_identifier(&mapping.table, "postgres.tables.table")?;
        validate_identifier(key_column, "private_key")?;
        for (name, relation) in &mapping.relations {
            validate_identifier(&relation.table, &format!("relations.{}.table", name))?;
            validate_identifier(&relation.key, &format!("relations.{}.key", name))?;
            if relation.foreign_key.trim().is_empty() {
                return Err(CoreError::InvalidConfig(format!(
                    "relations.{}.foreign_key는 비어 있을 수 없습니다",
                    name
                )));
            }
        }

        Ok(Self {
            pool,
            type_name: type_name.to_string(),
            table: mapping.table.clone(),
            key_column: key_column.to_string(),
            relations: mapping.relations.clone(),
        })
    }

    async fn load_relation(
        &self,
        name: &str,
        relation: &RelationMapping,
        records: &mut [EntityRecord],
    ) -> CoreResult<()> {
        let foreign_keys = relation_foreign_keys(relation, records);

        let rows = if foreign_keys.is_empty() {
            Vec::new()
        } else {
            let sql = select_by_keys_sql(&relation.table, &relation.key);
            sqlx::query(&sql)
                .bind(foreign_keys)
                .fetch_all(&self.pool)
                .await
                .map_err(|error| {
                    CoreError::Db(format!("'{}' 관계 조회 실패: {}", name, error))
                })?
                .iter()
                .map(|row| map_record_value(row, name))
                .collect::<CoreResult<Vec<_>>>()?
        };

        attach_relation_rows(name, relation, records, rows);
        Ok(())
    }
}

/// 관계 조회에 쓸 외래 키 목록. 중복을 제거하고 정렬한다.
pub fn relation_foreign_keys(relation: &RelationMapping, records: &[EntityRecord]) -> Vec<String> {
    records
        .iter()
        .filter_map(|record| record.attribute(&relation.foreign_key).and_then(key_string))
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect()
}

/// 관계 행을 외래 키로 엔티티에 붙인다. 짝이 없으면 `Value::Null`을 넣는다.
pub fn attach_relation_rows(
    name: &str,
    relation: &RelationMapping,
    records: &mut [EntityRecord],
    rows: Vec<Value>,
) {
    let related = rows
        .into_iter()
        .filter_map(|row| {
            let key = row.get(&relation.key).and_then(key_string)?;
            Some((key, row))
        })
        .collect::<HashMap<_, _>>();

    for record in records.iter_mut() {
        let value = record
            .attribute(&relation.foreign_key)
            .and_then(key_string)
            .and_then(|key| related.get(&key).cloned())
            .unwrap_or(Value::Null);
        record.relations.insert(name.to_string(), value);
    }
}

#[async_trait]
impl Repository for PostgresRepository {
    fn type_name(&self) -> &str {
        &self.type_name
    }

    async fn find_by_key(&self, key: &str) -> CoreResult<Option<EntityRecord>> {
        let sql = select_by_key_sql(&self.table, &self.key_column);
        let row = sqlx::query(&sql)
            .bind(key)
            .fetch_optional(&self.pool)
            .await
            .map_err(|error| CoreError::Db(format!("'{}' 단건 조회 실패: {}", self.type_name, error)))?;

        row.map(|row| map_record_row(row, &self.type_name)).transpose()
    }

    async fn find_by_keys(
        &self,
        keys: &[String],
        eager_load: &[&str],
    ) -> CoreResult<Vec<EntityRecord>> {
        if keys.is_empty() {
            return Ok(Vec::new());
        }

        let sql = select_by_keys_sql(&self.table, &self.key_column);
        let rows = sqlx::query(&sql)
            .bind(keys.to_vec())
            .fetch_all(&self.pool)
            .await
            .map_err(|error| CoreError::Db(format!("'{}' 일괄 조회 실패: {}", self.type_name, error)))?;

        let mut records = rows
            .into_iter()
            .map(|row| map_record_row(row, &self.type_name))
            .collect::<CoreResult<Vec<_>>>()?;

        for name in eager_load {
            match self.relations.get(*name) {
                Some(relation) => self.load_relation(name, relation, &mut records).await?,
                None => tracing::debug!(
                    type_name = %self.type_name,
                    relation = %name,
                    "매핑되지 않은 관계는 건너뜁니다"
                ),
            }
        }

        Ok(records)
    }
}

/// 공유 커넥션 풀로 타입별 Postgres 저장소를 만든다.
pub struct PostgresRepositoryFactory {
    pool: PgPool,
    tables: BTreeMap<String, TableMapping>,
}

impl PostgresRepositoryFactory {
    pub async fn connect(config: &PostgresConfigPayload) -> CoreResult<Self> {
        if config.dsn.trim().is_empty() {
            return Err(CoreError::InvalidConfig(
                "postgres.dsn은 비어 있을 수 없습니다".to_string(),
            ));
        }

        let options = config
            .dsn
            .parse::<PgConnectOptions>()
            .map_err(|error| CoreError::InvalidConfig(format!("postgres.dsn 파싱 실패: {}", error)))?
            .options([(
                "statement_timeout",
                config.statement_timeout_ms.max(1).to_string(),
            )]);

        let pool = PgPoolOptions::new()
            .min_connections(config.pool_min)
            .max_connections(config.pool_max.max(config.pool_min).max(1))
            .acquire_timeout(std::time::Duration::from_millis(config.connect_timeout_ms.max(1)))
            .connect_with(options)
            .await
            .map_err(|error| CoreError::Db(format!("Postgres 연결 실패: {}", error)))?;

        Ok(Self::with_pool(pool, config.tables.clone()))
    }

    pub fn with_pool(pool: PgPool, tables: BTreeMap<String, TableMapping>) -> Self {
        Self { pool, tables }
    }
}

impl RepositoryFactory for PostgresRepositoryFactory {
    fn new_instance(&self, type_name: &str, private_key: &str) -> CoreResult<Arc<dyn Repository>> {
        let mapping = self
            .tables
            .get(type_name)
            .cloned()
            .unwrap_or_else(|| TableMapping {
                table: type_name.to_string(),
                relations: BTreeMap::new(),
            });

        let repository = PostgresRepository::new(self.pool.clone(), type_name, &mapping, private_key)?;
        Ok(Arc::new(repository))
    }
}

fn map_record_row(row: PgRow, type_name: &str) -> CoreResult<EntityRecord> {
    let value = map_record_value(&row, type_name)?;
    EntityRecord::from_value(type_name, value).ok_or_else(|| {
        CoreError::Db(format!("'{}' 행이 JSON 객체가 아닙니다", type_name))
    })
}

fn map_record_value(row: &PgRow, label: &str) -> CoreResult<Value> {
    row.try_get::<Value, _>("record")
        .map_err(|error| CoreError::Db(format!("{}.record 파싱 실패: {}", label, error)))
}
