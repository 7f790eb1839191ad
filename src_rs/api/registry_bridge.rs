// 목적:
// - Python에서 호출 가능한 레지스트리 브릿지 클래스를 제공한다.
//
// 설명:
// - 타입 설정 JSON과 Postgres 설정 JSON으로 레지스트리를 한 번 생성해 보관한다.
// - 색인 작성용 메타데이터 조회와 히트 -> 엔티티 변환을 JSON 문자열로 주고받는다.
//
// 디자인 패턴:
// - 파사드(Facade) + 실패 빠르게(Fail Fast).
//
// 참조:
// - src_rs/core/type_registry.rs
// - src_rs/core/hit_resolver.rs
// - src_rs/index/postgres_repo.rs

use pyo3::exceptions::PyRuntimeError;
use pyo3::prelude::*;
use serde_json::{json, Map, Value};
use std::sync::Arc;
use tokio::runtime::{Builder, Runtime};

use crate::core::config::{PostgresConfigPayload, RegistryConfig};
use crate::core::entity::{EntityRecord, SearchHit};
use crate::core::errors::CoreError;
use crate::core::hit_resolver::{HitResolver, WindowOptions};
use crate::core::telemetry::init_tracing;
use crate::core::type_registry::TypeRegistry;
use crate::index::postgres_repo::PostgresRepositoryFactory;

/// Python에 노출되는 레지스트리 브릿지 클래스다.
#[pyclass(name = "RegistryBridge")]
pub struct PyRegistryBridge {
    runtime: Runtime,
    resolver: HitResolver,
}

#[pymethods]
impl PyRegistryBridge {
    /// 타입 설정과 Postgres 설정으로 브릿지를 생성한다.
    #[new]
    pub fn new(config_json: &str, postgres_json: &str) -> PyResult<Self> {
        init_tracing("info");

        let config = RegistryConfig::from_json(config_json)
            .map_err(|error| PyRuntimeError::new_err(error.to_string()))?;
        let postgres: PostgresConfigPayload = serde_json::from_str(postgres_json).map_err(|error| {
            PyRuntimeError::new_err(format!("Postgres 설정 JSON 파싱에 실패했습니다: {}", error))
        })?;

        let runtime = create_runtime().map_err(PyRuntimeError::new_err)?;
        let factory = runtime
            .block_on(PostgresRepositoryFactory::connect(&postgres))
            .map_err(|error| PyRuntimeError::new_err(error.to_string()))?;
        let registry = TypeRegistry::build(&config, Arc::new(factory))
            .map_err(|error| PyRuntimeError::new_err(error.to_string()))?;

        Ok(Self {
            runtime,
            resolver: HitResolver::new(Arc::new(registry)),
        })
    }

    /// 등록 순서대로 (타입명, 타입 UID) 목록을 반환한다.
    pub fn type_uids(&self) -> Vec<(String, String)> {
        self.resolver
            .registry()
            .configs()
            .map(|config| (config.type_name.clone(), config.type_uid.to_string()))
            .collect()
    }

    /// 엔티티 JSON에 대해 색인 문서에 기록할 메타데이터를 반환한다.
    pub fn index_metadata(&self, entity_json: &str) -> PyResult<String> {
        let entity: EntityRecord = serde_json::from_str(entity_json).map_err(|error| {
            PyRuntimeError::new_err(format!("엔티티 JSON 파싱에 실패했습니다: {}", error))
        })?;

        let registry = self.resolver.registry();
        let to_py = |error: CoreError| PyRuntimeError::new_err(error.to_string());
        let private_key = registry.private_key_pair(&entity).map_err(to_py)?;
        let class_uid = registry.type_uid_pair(&entity).map_err(to_py)?;
        let fields = registry.fields(&entity).map_err(to_py)?;
        let optional_attributes = registry.optional_attributes(&entity).map_err(to_py)?;

        let mut metadata = Map::new();
        metadata.insert(private_key.name.to_string(), Value::String(private_key.value));
        metadata.insert(class_uid.name.to_string(), Value::String(class_uid.value));
        metadata.insert("fields".to_string(), json!(fields));
        metadata.insert(
            "optional_attributes".to_string(),
            Value::Object(optional_attributes),
        );

        serde_json::to_string(&metadata)
            .map_err(|error| PyRuntimeError::new_err(format!("메타데이터 직렬화 실패: {}", error)))
    }

    /// 히트 목록(JSON)을 엔티티 목록과 전체 건수(JSON)로 변환한다.
    #[pyo3(signature = (hits_json, window_json=None))]
    pub fn resolve(&self, hits_json: &str, window_json: Option<&str>) -> PyResult<String> {
        let hits: Vec<SearchHit> = serde_json::from_str(hits_json).map_err(|error| {
            PyRuntimeError::new_err(format!("히트 JSON 파싱에 실패했습니다: {}", error))
        })?;
        let options = match window_json {
            Some(raw) => serde_json::from_str::<WindowOptions>(raw).map_err(|error| {
                PyRuntimeError::new_err(format!("윈도우 JSON 파싱에 실패했습니다: {}", error))
            })?,
            None => WindowOptions::default(),
        };

        let resolved = self
            .runtime
            .block_on(self.resolver.resolve_many(&hits, options))
            .map_err(|error| PyRuntimeError::new_err(error.to_string()))?;

        serde_json::to_string(&resolved)
            .map_err(|error| PyRuntimeError::new_err(format!("조회 결과 직렬화 실패: {}", error)))
    }
}

fn create_runtime() -> Result<Runtime, String> {
    Builder::new_multi_thread()
        .enable_all()
        .build()
        .map_err(|error| format!("Tokio 런타임 생성 실패: {}", error))
}
