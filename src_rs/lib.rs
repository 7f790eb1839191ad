#![allow(non_local_definitions)]

// 목적:
// - Search Registry Rust 모듈의 진입점을 제공한다.
//
// 설명:
// - 검색 대상 타입 레지스트리와 히트 리졸버를 라이브러리로 제공한다.
// - `python` 기능을 켜면 같은 기능을 Python 확장 모듈로 노출한다.
//
// 디자인 패턴:
// - 계층형 모듈 구조(api/core/index).
//
// 참조:
// - src_rs/core/type_registry.rs
// - src_rs/core/hit_resolver.rs
// - src_rs/api/registry_bridge.rs

#[cfg(feature = "python")]
use pyo3::prelude::*;
#[cfg(feature = "python")]
use pyo3::types::PyModule;

pub mod api;
pub mod core;
pub mod index;

pub use crate::core::config::{OptionalAttributes, RegistryConfig, TypeOptions};
pub use crate::core::entity::{Entity, EntityRecord, SearchHit, TypeUid};
pub use crate::core::errors::{CoreError, CoreResult};
pub use crate::core::hit_resolver::{HitResolver, ResolvedHits, WindowOptions};
pub use crate::core::type_registry::{TypeConfig, TypeRegistry};

#[cfg(feature = "python")]
#[pymodule]
fn _search_registry(m: &Bound<'_, PyModule>) -> PyResult<()> {
    m.add_class::<api::registry_bridge::PyRegistryBridge>()?;
    Ok(())
}
