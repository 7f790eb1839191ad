// 목적:
// - SQL 관련 공통 유틸리티를 제공한다.
//
// 설명:
// - 동적 테이블/컬럼명 검증과 엔티티 조회 SQL 생성을 담당한다.
// - 행은 to_jsonb로 읽어 테이블 구조와 무관하게 엔티티 속성 맵으로 변환한다.
//
// 디자인 패턴:
// - 가드 함수(Guard Function).
//
// 참조:
// - src_rs/index/postgres_repo.rs

use crate::core::errors::{CoreError, CoreResult};

/// 테이블/컬럼 식별자의 허용 문자를 검증한다.
pub fn validate_identifier(value: &str, field_name: &str) -> CoreResult<()> {
    if value.trim().is_empty() {
        return Err(CoreError::InvalidConfig(format!(
            "{}는 비어 있을 수 없습니다",
            field_name
        )));
    }

    let valid = value
        .chars()
        .all(|ch| ch.is_ascii_alphanumeric() || ch == '_');

    if !valid {
        return Err(CoreError::InvalidConfig(format!(
            "{}에는 영문/숫자/밑줄만 사용할 수 있습니다: {}",
            field_name, value
        )));
    }

    Ok(())
}

/// private key 한 건 조회 SQL. `$1`은 키 문자열이다.
pub fn select_by_key_sql(table: &str, key_column: &str) -> String {
    format!(
        "SELECT to_jsonb(t) AS record FROM {} t WHERE t.{}::text = $1 LIMIT 1",
        table, key_column
    )
}

/// 여러 키 일괄 조회 SQL. `$1`은 text[] 키 목록이다.
pub fn select_by_keys_sql(table: &str, key_column: &str) -> String {
    format!(
        "SELECT to_jsonb(t) AS record FROM {} t WHERE t.{}::text = ANY($1)",
        table, key_column
    )
}
