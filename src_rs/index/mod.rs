// 목적:
// - 엔티티 저장소 계층 모듈을 선언한다.
//
// 설명:
// - 저장소 경계 트레이트와 메모리/PostgreSQL 구현, SQL 유틸을 분리한다.
//
// 디자인 패턴:
// - 저장소 패턴(Repository Pattern).
//
// 참조:
// - src_rs/index/repository.rs
// - src_rs/index/memory_repo.rs
// - src_rs/index/postgres_repo.rs
// - src_rs/index/sql.rs

pub mod memory_repo;
pub mod postgres_repo;
pub mod repository;
pub mod sql;
