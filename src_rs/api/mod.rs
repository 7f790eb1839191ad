// 목적:
// - Python FFI 경계 모듈을 선언한다.
//
// 설명:
// - `python` 기능이 켜진 경우에만 레지스트리 브릿지를 노출한다.
//
// 디자인 패턴:
// - 모듈 분리(Module Separation).
//
// 참조:
// - src_rs/api/registry_bridge.rs

#[cfg(feature = "python")]
pub mod registry_bridge;
