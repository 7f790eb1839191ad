// 목적:
// - 검색 대상 엔티티 타입의 색인 설정을 보관하고 조회한다.
//
// 설명:
// - 시작 시 선언적 설정으로 한 번 생성되며 이후에는 읽기 전용이다.
// - 타입 UID -> 설정 맵으로 O(1) 조회하고, 등록 순서는 별도 목록으로 유지한다.
// - 색인 문서 작성자가 지켜야 할 메타 필드(private_key, class_uid) 계약을 제공한다.
//
// 디자인 패턴:
// - 레지스트리(Registry) + 실패 빠르게(Fail Fast).
//
// 참조:
// - src_rs/core/config.rs
// - src_rs/index/repository.rs
// - src_rs/core/hit_resolver.rs

use serde_json::{Map, Value};
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use crate::core::config::{OptionalAttributes, RegistryConfig, TypeOptions};
use crate::core::entity::{
    key_string, Entity, MetadataField, TypeUid, CLASS_UID_FIELD, PRIVATE_KEY_FIELD,
};
use crate::core::errors::{CoreError, CoreResult};
use crate::index::repository::{Repository, RepositoryFactory};

/// 등록된 타입 하나의 설정이다.
#[derive(Clone)]
pub struct TypeConfig {
    pub type_name: String,
    pub type_uid: TypeUid,
    pub fields: Vec<String>,
    pub optional_attributes: OptionalAttributes,
    pub private_key: String,
    pub repository: Arc<dyn Repository>,
}

impl fmt::Debug for TypeConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TypeConfig")
            .field("type_name", &self.type_name)
            .field("type_uid", &self.type_uid)
            .field("fields", &self.fields)
            .field("optional_attributes", &self.optional_attributes)
            .field("private_key", &self.private_key)
            .finish_non_exhaustive()
    }
}

pub struct TypeRegistry {
    factory: Arc<dyn RepositoryFactory>,
    order: Vec<TypeUid>,
    configs: HashMap<TypeUid, TypeConfig>,
}

impl TypeRegistry {
    /// 설정 목록을 검증해 레지스트리를 만든다.
    pub fn build(config: &RegistryConfig, factory: Arc<dyn RepositoryFactory>) -> CoreResult<Self> {
        let mut order = Vec::with_capacity(config.len());
        let mut configs = HashMap::<TypeUid, TypeConfig>::with_capacity(config.len());

        for (type_name, options) in config.iter() {
            validate_options(type_name, options)?;

            let repository = factory.new_instance(type_name, &options.private_key)?;
            let type_uid = factory.type_uid(type_name);

            if let Some(existing) = configs.get(&type_uid) {
                return Err(CoreError::InvalidConfig(format!(
                    "'{}'와 '{}'의 타입 UID가 충돌합니다: {}",
                    existing.type_name, type_name, type_uid
                )));
            }

            tracing::debug!(
                type_name = %type_name,
                type_uid = %type_uid,
                fields = options.fields.len(),
                "검색 대상 타입을 등록했습니다"
            );

            order.push(type_uid.clone());
            configs.insert(
                type_uid.clone(),
                TypeConfig {
                    type_name: type_name.to_string(),
                    type_uid,
                    fields: options.fields.clone(),
                    optional_attributes: options.optional_attributes.clone(),
                    private_key: options.private_key.clone(),
                    repository,
                },
            );
        }

        tracing::info!(types = order.len(), "타입 레지스트리를 생성했습니다");
        Ok(Self {
            factory,
            order,
            configs,
        })
    }

    /// 엔티티 인스턴스의 타입에 해당하는 설정을 반환한다.
    pub fn config_for<E: Entity + ?Sized>(&self, entity: &E) -> CoreResult<&TypeConfig> {
        let type_uid = self.factory.type_uid(entity.type_name());
        self.configs.get(&type_uid).ok_or_else(|| {
            CoreError::NotFound(format!(
                "'{}' 타입의 설정이 없습니다",
                entity.type_name()
            ))
        })
    }

    /// 색인에 저장된 타입 UID로 설정을 반환한다.
    pub fn config_for_type_uid(&self, type_uid: &TypeUid) -> CoreResult<&TypeConfig> {
        self.configs.get(type_uid).ok_or_else(|| {
            CoreError::NotFound(format!("타입 UID '{}'에 해당하는 타입이 없습니다", type_uid))
        })
    }

    /// 등록 순서대로 설정을 순회한다.
    pub fn configs(&self) -> impl Iterator<Item = &TypeConfig> {
        self.order.iter().filter_map(|type_uid| self.configs.get(type_uid))
    }

    /// 등록 순서대로 타입별 저장소를 반환한다. 재색인 대상 열거에 사용한다.
    pub fn repositories(&self) -> Vec<Arc<dyn Repository>> {
        self.configs()
            .map(|config| Arc::clone(&config.repository))
            .collect()
    }

    pub fn private_key_pair<E: Entity + ?Sized>(&self, entity: &E) -> CoreResult<MetadataField> {
        let config = self.config_for(entity)?;
        let value = entity
            .attribute(&config.private_key)
            .and_then(key_string)
            .ok_or_else(|| {
                CoreError::InvalidInput(format!(
                    "'{}' 엔티티의 private key '{}' 값을 읽을 수 없습니다",
                    config.type_name, config.private_key
                ))
            })?;

        Ok(MetadataField {
            name: PRIVATE_KEY_FIELD,
            value,
        })
    }

    pub fn type_uid_pair<E: Entity + ?Sized>(&self, entity: &E) -> CoreResult<MetadataField> {
        let config = self.config_for(entity)?;
        Ok(MetadataField {
            name: CLASS_UID_FIELD,
            value: config.type_uid.to_string(),
        })
    }

    /// 그대로 색인해야 할 속성명 목록.
    pub fn fields<E: Entity + ?Sized>(&self, entity: &E) -> CoreResult<&[String]> {
        Ok(&self.config_for(entity)?.fields)
    }

    /// 설정된 출처에서 부가 속성을 읽는다. 출처가 없거나 형식이 다르면 빈 맵이다.
    pub fn optional_attributes<E: Entity + ?Sized>(
        &self,
        entity: &E,
    ) -> CoreResult<Map<String, Value>> {
        let config = self.config_for(entity)?;
        let Some(field) = config.optional_attributes.source_field() else {
            return Ok(Map::new());
        };

        let attributes = match entity.attribute(field) {
            Some(Value::Object(map)) => map.clone(),
            Some(Value::String(encoded)) => match serde_json::from_str::<Value>(encoded) {
                Ok(Value::Object(map)) => map,
                _ => Map::new(),
            },
            Some(Value::Null) | None => Map::new(),
            Some(other) => {
                tracing::debug!(
                    type_name = %config.type_name,
                    field = %field,
                    kind = value_kind(other),
                    "부가 속성 필드가 객체가 아니어서 무시합니다"
                );
                Map::new()
            }
        };

        Ok(attributes)
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }
}

fn validate_options(type_name: &str, options: &TypeOptions) -> CoreResult<()> {
    if type_name.trim().is_empty() {
        return Err(CoreError::InvalidConfig(
            "타입명은 비어 있을 수 없습니다".to_string(),
        ));
    }

    if options.fields.is_empty() && options.optional_attributes.is_disabled() {
        return Err(CoreError::InvalidConfig(format!(
            "'{}' 타입에는 fields 또는 optional_attributes가 지정되어야 합니다",
            type_name
        )));
    }

    if options.private_key.trim().is_empty() {
        return Err(CoreError::InvalidConfig(format!(
            "'{}' 타입의 private_key는 비어 있을 수 없습니다",
            type_name
        )));
    }

    Ok(())
}

fn value_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
