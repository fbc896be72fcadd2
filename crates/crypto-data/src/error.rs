//! 데이터 계층 에러 타입.

use thiserror::Error;

/// 클라이언트/커넥션 초기화 에러.
///
/// 요청 단위 실패는 에러로 올라오지 않습니다 — 클라이언트가 재시도를
/// 소진한 뒤 `None`으로 보고합니다. 이 타입은 구성 요소를 만드는 시점의
/// 실패만 다룹니다.
#[derive(Debug, Error)]
pub enum DataError {
    /// HTTP 클라이언트 초기화 실패
    #[error("HTTP 클라이언트 초기화 실패: {0}")]
    ClientInit(String),

    /// 데이터베이스 연결 실패
    #[error("데이터베이스 연결 실패: {0}")]
    Connection(String),
}
