// 목적:
// - 검색 대상 타입 설정과 저장소 연결 설정을 정의한다.
//
// 설명:
// - 타입명 -> {fields, optional_attributes, private_key} 형태의 선언적 설정을 파싱한다.
// - optional_attributes는 bool 또는 {field} 객체를 받아 태그형 열거형으로 정규화한다.
// - JSON 객체의 키 순서를 그대로 보존해 등록 순서를 결정한다.
//
// 디자인 패턴:
// - 설정 객체(Configuration Object) + 정규화 변환(Normalizing Conversion).
//
// 참조:
// - src_rs/core/type_registry.rs
// - src_rs/index/postgres_repo.rs

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;

use crate::core::errors::{CoreError, CoreResult};

/// private_key 옵션이 없을 때 사용하는 기본 속성명이다.
pub const DEFAULT_PRIVATE_KEY: &str = "id";

/// optional_attributes가 `true`일 때 읽는 기본 속성명이다.
pub const DEFAULT_OPTIONAL_ATTRIBUTES_FIELD: &str = "optional_attributes";

/// 부가 속성(key/value) 출처를 나타내는 태그형 설정값이다.
#[derive(Debug, Clone, PartialEq, Eq, Default, Deserialize)]
#[serde(try_from = "RawOptionalAttributes")]
pub enum OptionalAttributes {
    #[default]
    Disabled,
    DefaultField,
    NamedField(String),
}

impl OptionalAttributes {
    pub fn is_disabled(&self) -> bool {
        matches!(self, Self::Disabled)
    }

    /// 엔티티에서 읽어야 할 속성명을 반환한다.
    pub fn source_field(&self) -> Option<&str> {
        match self {
            Self::Disabled => None,
            Self::DefaultField => Some(DEFAULT_OPTIONAL_ATTRIBUTES_FIELD),
            Self::NamedField(field) => Some(field.as_str()),
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum RawOptionalAttributes {
    Flag(bool),
    Descriptor(Map<String, Value>),
    List(Vec<Value>),
    Null,
}

impl TryFrom<RawOptionalAttributes> for OptionalAttributes {
    type Error = String;

    fn try_from(raw: RawOptionalAttributes) -> Result<Self, Self::Error> {
        match raw {
            RawOptionalAttributes::Flag(true) => Ok(Self::DefaultField),
            RawOptionalAttributes::Flag(false) | RawOptionalAttributes::Null => Ok(Self::Disabled),
            RawOptionalAttributes::Descriptor(descriptor) if descriptor.is_empty() => {
                Ok(Self::Disabled)
            }
            RawOptionalAttributes::Descriptor(descriptor) => match descriptor.get("field") {
                Some(Value::String(field)) if !field.trim().is_empty() => {
                    Ok(Self::NamedField(field.clone()))
                }
                Some(Value::String(_)) => {
                    Err("optional_attributes.field는 비어 있을 수 없습니다".to_string())
                }
                Some(_) => Err("optional_attributes.field는 문자열이어야 합니다".to_string()),
                None => Err(
                    "optional_attributes 객체에는 field 항목이 있어야 합니다".to_string(),
                ),
            },
            RawOptionalAttributes::List(items) if items.is_empty() => Ok(Self::Disabled),
            RawOptionalAttributes::List(_) => Err(
                "optional_attributes는 bool 또는 {\"field\": 속성명} 형식이어야 합니다".to_string(),
            ),
        }
    }
}

/// 타입 하나에 대한 색인 설정이다.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct TypeOptions {
    #[serde(default)]
    pub fields: Vec<String>,
    #[serde(default)]
    pub optional_attributes: OptionalAttributes,
    #[serde(default = "default_private_key")]
    pub private_key: String,
}

impl Default for TypeOptions {
    fn default() -> Self {
        Self {
            fields: Vec::new(),
            optional_attributes: OptionalAttributes::Disabled,
            private_key: default_private_key(),
        }
    }
}

impl TypeOptions {
    pub fn with_fields<I, S>(fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            fields: fields.into_iter().map(Into::into).collect(),
            ..Self::default()
        }
    }

    pub fn optional_attributes(mut self, optional_attributes: OptionalAttributes) -> Self {
        self.optional_attributes = optional_attributes;
        self
    }

    pub fn private_key(mut self, private_key: impl Into<String>) -> Self {
        self.private_key = private_key.into();
        self
    }
}

fn default_private_key() -> String {
    DEFAULT_PRIVATE_KEY.to_string()
}

/// 등록 순서를 보존하는 타입 설정 목록이다.
#[derive(Debug, Clone, Default)]
pub struct RegistryConfig {
    entries: Vec<(String, TypeOptions)>,
}

impl RegistryConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_type(mut self, type_name: impl Into<String>, options: TypeOptions) -> Self {
        self.entries.push((type_name.into(), options));
        self
    }

    /// `{ "타입명": { ...옵션 } }` 형태의 JSON을 키 순서대로 파싱한다.
    pub fn from_json(json: &str) -> CoreResult<Self> {
        let raw: Map<String, Value> = serde_json::from_str(json).map_err(|error| {
            CoreError::Serialization(format!("타입 설정 JSON 파싱 실패: {}", error))
        })?;

        let mut entries = Vec::with_capacity(raw.len());
        for (type_name, value) in raw {
            let options: TypeOptions = serde_json::from_value(value).map_err(|error| {
                CoreError::InvalidConfig(format!("'{}' 타입 옵션 파싱 실패: {}", type_name, error))
            })?;
            entries.push((type_name, options));
        }

        Ok(Self { entries })
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &TypeOptions)> {
        self.entries
            .iter()
            .map(|(type_name, options)| (type_name.as_str(), options))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PostgresConfigPayload {
    pub dsn: String,
    pub pool_min: u32,
    pub pool_max: u32,
    pub connect_timeout_ms: u64,
    pub statement_timeout_ms: u64,
    #[serde(default)]
    pub tables: BTreeMap<String, TableMapping>,
}

/// 타입명 -> 테이블 매핑이다. 매핑이 없으면 타입명을 테이블명으로 사용한다.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TableMapping {
    pub table: String,
    #[serde(default)]
    pub relations: BTreeMap<String, RelationMapping>,
}

/// eager load 대상 관계 정의다.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RelationMapping {
    pub table: String,
    /// 엔티티 쪽에서 관계 행을 가리키는 속성명.
    pub foreign_key: String,
    #[serde(default = "default_private_key")]
    pub key: String,
}
