// 목적:
// - 엔티티, 검색 히트, 타입 식별자(UID) 모델을 정의한다.
//
// 설명:
// - 엔티티는 타입명과 속성 맵으로 표현해 저장소 구현과 무관하게 다룬다.
// - 타입 UID는 타입명의 SHA-256 앞 32자리이며 재시작 후에도 동일하다.
// - 색인 문서에는 private_key/class_uid 두 메타 필드가 반드시 함께 저장된다.
//
// 디자인 패턴:
// - 값 객체(Value Object).
//
// 참조:
// - src_rs/core/type_registry.rs
// - src_rs/core/hit_resolver.rs

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use sha2::{Digest, Sha256};
use std::fmt;

/// 색인 문서에 저장되는 private key 메타 필드명.
pub const PRIVATE_KEY_FIELD: &str = "private_key";

/// 색인 문서에 저장되는 타입 UID 메타 필드명.
pub const CLASS_UID_FIELD: &str = "class_uid";

const TYPE_UID_HEX_LEN: usize = 32;

/// 엔티티 타입을 식별하는 불투명 UID다.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TypeUid(String);

impl TypeUid {
    /// 타입명에서 결정적으로 UID를 계산한다.
    pub fn derive(type_name: &str) -> Self {
        let digest = Sha256::digest(type_name.as_bytes());
        let mut encoded = hex::encode(digest);
        encoded.truncate(TYPE_UID_HEX_LEN);
        Self(encoded)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for TypeUid {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl From<String> for TypeUid {
    fn from(value: String) -> Self {
        Self(value)
    }
}

impl fmt::Display for TypeUid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// 레지스트리가 다룰 수 있는 엔티티의 최소 인터페이스다.
pub trait Entity {
    fn type_name(&self) -> &str;
    fn attribute(&self, name: &str) -> Option<&Value>;
}

/// 저장소에서 읽어온 엔티티 한 건이다.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EntityRecord {
    pub type_name: String,
    #[serde(default)]
    pub attributes: Map<String, Value>,
    #[serde(default, skip_serializing_if = "Map::is_empty")]
    pub relations: Map<String, Value>,
}

impl EntityRecord {
    pub fn new(type_name: impl Into<String>, attributes: Map<String, Value>) -> Self {
        Self {
            type_name: type_name.into(),
            attributes,
            relations: Map::new(),
        }
    }

    /// JSON 객체 값을 엔티티로 감싼다. 객체가 아니면 None을 반환한다.
    pub fn from_value(type_name: impl Into<String>, value: Value) -> Option<Self> {
        match value {
            Value::Object(attributes) => Some(Self::new(type_name, attributes)),
            _ => None,
        }
    }

    pub fn relation(&self, name: &str) -> Option<&Value> {
        self.relations.get(name)
    }
}

impl Entity for EntityRecord {
    fn type_name(&self) -> &str {
        &self.type_name
    }

    fn attribute(&self, name: &str) -> Option<&Value> {
        self.attributes.get(name)
    }
}

/// 색인 엔진이 반환한 히트 한 건이다.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchHit {
    #[serde(rename = "class_uid")]
    pub type_uid: TypeUid,
    pub private_key: String,
}

impl SearchHit {
    pub fn new(type_uid: TypeUid, private_key: impl Into<String>) -> Self {
        Self {
            type_uid,
            private_key: private_key.into(),
        }
    }
}

/// 색인 문서에 함께 저장되는 (필드명, 값) 쌍이다.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MetadataField {
    pub name: &'static str,
    pub value: String,
}

/// private key 값을 색인/조회용 문자열로 변환한다.
///
/// 문자열은 그대로, 숫자/불리언은 `to_string` 결과를 사용한다.
/// null, 배열, 객체는 키로 사용할 수 없다.
///
/// 숫자는 serde_json(f64) 표기를 따르므로 Postgres `numeric(p,s)` 키의 `::text`
/// 표기(`1.50`)와 다를 수 있다(`1.5`). 이런 레코드는 히트 순서로 짝지어지지 않고
/// 리졸버 결과 끝에 덧붙는다. 정확한 대응이 필요하면 키를 문자열 컬럼으로 둔다.
pub fn key_string(value: &Value) -> Option<String> {
    match value {
        Value::String(text) => Some(text.clone()),
        Value::Number(number) => Some(number.to_string()),
        Value::Bool(flag) => Some(flag.to_string()),
        Value::Null | Value::Array(_) | Value::Object(_) => None,
    }
}
