//! 추적 자산 및 상장 목록 타입.

use serde::{Deserialize, Serialize};

/// 상장 목록에서 제외하는 센티널 심볼.
/// 업스트림이 자리표시용으로 반환하는 가짜 코드.
const SENTINEL_SYMBOLS: &[&str] = &["00"];

/// 시가총액 상위 목록의 원시 항목.
///
/// 업스트림 목록 API가 반환한 그대로의 (심볼, 전체 이름) 쌍.
/// 필터링 전 상태이므로 이름이 없거나 형식이 잘못된 항목이 섞여 있을 수 있습니다.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListedCoin {
    /// 원시 심볼 코드
    pub symbol: String,
    /// 표시용 전체 이름 (없을 수 있음)
    pub full_name: Option<String>,
}

impl ListedCoin {
    /// 수용 필터를 적용하여 추적 자산으로 변환.
    ///
    /// 조건:
    /// - 심볼 길이 2자 이상
    /// - ASCII 영숫자로만 구성
    /// - 센티널 코드가 아님
    /// - 표시 이름이 존재하고 비어 있지 않음
    ///
    /// 통과한 심볼은 trim + 대문자로 정규화됩니다.
    pub fn into_tracked(self) -> Option<TrackedAsset> {
        let symbol = self.symbol.trim().to_uppercase();

        if symbol.len() < 2 {
            return None;
        }
        if !symbol.chars().all(|c| c.is_ascii_alphanumeric()) {
            return None;
        }
        if SENTINEL_SYMBOLS.contains(&symbol.as_str()) {
            return None;
        }

        let display_name = self.full_name.map(|n| n.trim().to_string())?;
        if display_name.is_empty() {
            return None;
        }

        Some(TrackedAsset {
            symbol,
            display_name,
        })
    }
}

/// 추적 대상 자산.
///
/// 발견 단계에서 한 번 생성되어 coins 테이블에 저장되며,
/// 이후 파이프라인은 읽기 전용으로만 사용합니다.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrackedAsset {
    /// 대문자 영숫자 심볼 코드 (고유 키)
    pub symbol: String,
    /// 표시용 전체 이름
    pub display_name: String,
}
