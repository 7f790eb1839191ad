// 목적:
// - tracing 구독자를 초기화한다.
//
// 설명:
// - RUST_LOG 환경 변수가 있으면 우선 사용하고, 없으면 호출자가 준 기본 필터를 쓴다.
// - 이미 전역 구독자가 설치된 경우에는 조용히 무시한다.
//
// 참조:
// - src_rs/api/registry_bridge.rs

use tracing_subscriber::EnvFilter;

/// 전역 tracing 구독자를 한 번만 설치한다. 설치 여부를 반환한다.
pub fn init_tracing(default_filter: &str) -> bool {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .try_init()
        .is_ok()
}
