// 목적:
// - 핵심 런타임 계층 모듈을 선언한다.
//
// 설명:
// - 타입 레지스트리/히트 리졸버와 공통 오류·설정·엔티티 모델을 분리해 유지보수성을 높인다.
//
// 디자인 패턴:
// - 명시적 오류 모델(Explicit Error Model).
//
// 참조:
// - src_rs/core/errors.rs
// - src_rs/core/type_registry.rs
// - src_rs/core/hit_resolver.rs

pub mod config;
pub mod entity;
pub mod errors;
pub mod hit_resolver;
pub mod telemetry;
pub mod type_registry;
