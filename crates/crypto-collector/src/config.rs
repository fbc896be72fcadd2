//! 환경변수 기반 설정 모듈.

use std::time::Duration;

use chrono::NaiveDate;
use crypto_data::CryptoCompareConfig;

use crate::Result;

/// Collector 전체 설정
#[derive(Debug, Clone)]
pub struct CollectorConfig {
    /// 데이터베이스 URL
    pub database_url: String,
    /// 데이터베이스 최대 커넥션 수
    pub max_db_connections: u32,
    /// 업스트림 API 설정
    pub api: ApiConfig,
    /// 심볼 발견 설정
    pub discovery: DiscoveryConfig,
    /// 역사 백필 설정
    pub history: HistoryConfig,
    /// 파이프라인 실행 설정
    pub pipeline: PipelineConfig,
    /// 데몬 모드 설정
    pub daemon: DaemonConfig,
}

/// 업스트림 API 설정
#[derive(Debug, Clone)]
pub struct ApiConfig {
    /// API 베이스 URL
    pub base_url: String,
    /// 로테이션할 API 키 목록 (쉼표 구분)
    pub api_keys: Vec<String>,
    /// 요청당 타임아웃 (초)
    pub request_timeout_secs: u64,
    /// 요청당 총 시도 횟수
    pub retry_count: u32,
    /// 재시도 간 지연 (밀리초)
    pub retry_delay_ms: u64,
}

impl ApiConfig {
    /// 클라이언트 설정으로 변환.
    pub fn client_config(&self) -> CryptoCompareConfig {
        CryptoCompareConfig {
            base_url: self.base_url.clone(),
            api_keys: self.api_keys.clone(),
            request_timeout: Duration::from_secs(self.request_timeout_secs),
            retry_count: self.retry_count,
            retry_delay: Duration::from_millis(self.retry_delay_ms),
        }
    }
}

/// 심볼 발견 설정
#[derive(Debug, Clone)]
pub struct DiscoveryConfig {
    /// 목록 페이지당 항목 수
    pub page_limit: u32,
    /// 최대 스캔 페이지 수
    pub max_pages: u32,
    /// 페이지 간 지연 (밀리초)
    pub page_delay_ms: u64,
    /// 활성 프로브 간 지연 (밀리초)
    pub probe_delay_ms: u64,
    /// 목표 추적 심볼 수
    pub target_symbols: usize,
    /// 발견 단계에서 수집할 최대 후보 수
    pub max_candidates: usize,
}

impl DiscoveryConfig {
    /// 페이지 간 지연을 Duration으로 반환
    pub fn page_delay(&self) -> Duration {
        Duration::from_millis(self.page_delay_ms)
    }

    /// 프로브 간 지연을 Duration으로 반환
    pub fn probe_delay(&self) -> Duration {
        Duration::from_millis(self.probe_delay_ms)
    }
}

/// 역사 백필 설정
#[derive(Debug, Clone)]
pub struct HistoryConfig {
    /// 전체 백필 시작 날짜
    pub start_date: NaiveDate,
    /// 이 날짜 이전 레코드는 저장하지 않음
    pub cutoff_date: NaiveDate,
    /// 청크당 일수
    pub days_per_chunk: u32,
    /// 청크 요청 간 지연 (밀리초)
    pub chunk_delay_ms: u64,
}

impl HistoryConfig {
    /// 청크 간 지연을 Duration으로 반환
    pub fn chunk_delay(&self) -> Duration {
        Duration::from_millis(self.chunk_delay_ms)
    }
}

/// 파이프라인 실행 설정
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    /// 심볼 간 지연 (밀리초)
    pub symbol_delay_ms: u64,
}

impl PipelineConfig {
    /// 심볼 간 지연을 Duration으로 반환
    pub fn symbol_delay(&self) -> Duration {
        Duration::from_millis(self.symbol_delay_ms)
    }
}

/// 데몬 모드 설정
#[derive(Debug, Clone)]
pub struct DaemonConfig {
    /// 파이프라인 실행 주기 (분 단위)
    pub interval_minutes: u64,
}

impl DaemonConfig {
    /// 실행 주기를 Duration으로 반환
    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.interval_minutes * 60)
    }
}

impl CollectorConfig {
    /// 환경변수에서 설정 로드
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok();

        let database_url = std::env::var("DATABASE_URL").map_err(|_| {
            crate::error::CollectorError::Config(
                "DATABASE_URL 환경변수가 설정되지 않았습니다".to_string(),
            )
        })?;

        Ok(Self {
            database_url,
            max_db_connections: env_var_parse("DATABASE_MAX_CONNECTIONS", 5),
            api: ApiConfig {
                base_url: std::env::var("CC_API_BASE")
                    .unwrap_or_else(|_| "https://min-api.cryptocompare.com".to_string()),
                api_keys: env_var_list("CC_API_KEYS"),
                request_timeout_secs: env_var_parse("CC_REQUEST_TIMEOUT_SECS", 15),
                retry_count: env_var_parse("CC_RETRY_COUNT", 3),
                retry_delay_ms: env_var_parse("CC_RETRY_DELAY_MS", 1500),
            },
            discovery: DiscoveryConfig {
                page_limit: env_var_parse("DISCOVERY_PAGE_LIMIT", 100),
                max_pages: env_var_parse("DISCOVERY_MAX_PAGES", 15),
                page_delay_ms: env_var_parse("DISCOVERY_PAGE_DELAY_MS", 600),
                probe_delay_ms: env_var_parse("DISCOVERY_PROBE_DELAY_MS", 200),
                target_symbols: env_var_parse("DISCOVERY_TARGET_SYMBOLS", 1000),
                max_candidates: env_var_parse("DISCOVERY_MAX_CANDIDATES", 1500),
            },
            history: HistoryConfig {
                // 전체 백필은 2010년부터, 저장은 2015년부터
                start_date: env_var_date("HISTORY_START_DATE", 2010, 1, 1),
                cutoff_date: env_var_date("HISTORY_CUTOFF_DATE", 2015, 1, 1),
                days_per_chunk: env_var_parse("HISTORY_DAYS_PER_CHUNK", 1800),
                chunk_delay_ms: env_var_parse("HISTORY_REQUEST_DELAY_MS", 1000),
            },
            pipeline: PipelineConfig {
                symbol_delay_ms: env_var_parse("SYMBOL_DELAY_MS", 200),
            },
            daemon: DaemonConfig {
                // 일봉 수집이므로 기본 하루 주기
                interval_minutes: env_var_parse("DAEMON_INTERVAL_MINUTES", 1440),
            },
        })
    }
}

/// 환경변수에서 값을 파싱 (실패 시 기본값 사용)
fn env_var_parse<T: std::str::FromStr>(key: &str, default: T) -> T {
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

/// 환경변수에서 쉼표로 구분된 리스트 파싱 (순서 유지, 대소문자 보존)
fn env_var_list(key: &str) -> Vec<String> {
    std::env::var(key)
        .map(|v| {
            v.split(',')
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty())
                .collect()
        })
        .unwrap_or_default()
}

/// 환경변수에서 YYYYMMDD 날짜 파싱 (실패 시 기본값 사용)
fn env_var_date(key: &str, y: i32, m: u32, d: u32) -> NaiveDate {
    let default = NaiveDate::from_ymd_opt(y, m, d).expect("잘못된 기본 날짜");
    std::env::var(key)
        .ok()
        .and_then(|v| NaiveDate::parse_from_str(&v, "%Y%m%d").ok())
        .unwrap_or(default)
}
