//! CryptoCompare 시장 데이터 클라이언트.
//!
//! 업스트림 min-api에 대한 `MarketDataSource` 구현입니다.
//! 요청마다 자격증명을 로테이션하고, 일시적 실패는 고정 지연으로
//! 제한된 횟수만큼 재시도한 뒤 `None`으로 보고합니다.
//! 어떤 경우에도 에러가 호출자에게 전파되지 않습니다 — 데이터 부재는
//! 파이프라인이 기대하는 일급 결과입니다.

use std::{collections::HashMap, time::Duration};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use tracing::{debug, warn};

use crypto_core::{DailyCandle, ListedCoin, MarketDataSource, SnapshotQuote};

use crate::error::DataError;
use crate::provider::rotation::CredentialRotator;

/// 호가 통화. 모든 조회는 USD 기준.
const QUOTE_CURRENCY: &str = "USD";

/// 상위 목록 엔드포인트.
const TOP_LIST_PATH: &str = "/data/top/mktcapfull";
/// 일봉 역사 엔드포인트.
const HISTO_DAY_PATH: &str = "/data/v2/histoday";
/// 현재 시세 엔드포인트.
const PRICE_FULL_PATH: &str = "/data/pricemultifull";

/// CryptoCompare 클라이언트 설정.
#[derive(Debug, Clone)]
pub struct CryptoCompareConfig {
    /// API 베이스 URL
    pub base_url: String,
    /// 로테이션할 API 키 목록 (빈 목록이면 인증 헤더 생략)
    pub api_keys: Vec<String>,
    /// 요청당 타임아웃
    pub request_timeout: Duration,
    /// 요청당 총 시도 횟수
    pub retry_count: u32,
    /// 재시도 간 고정 지연
    pub retry_delay: Duration,
}

impl Default for CryptoCompareConfig {
    fn default() -> Self {
        Self {
            base_url: "https://min-api.cryptocompare.com".to_string(),
            api_keys: Vec::new(),
            request_timeout: Duration::from_secs(15),
            retry_count: 3,
            retry_delay: Duration::from_millis(1500),
        }
    }
}

/// CryptoCompare HTTP 클라이언트.
pub struct CryptoCompareClient {
    http: reqwest::Client,
    base_url: String,
    rotator: CredentialRotator,
    retry_count: u32,
    retry_delay: Duration,
}

impl CryptoCompareClient {
    /// 설정으로 클라이언트 생성.
    pub fn new(config: CryptoCompareConfig) -> Result<Self, DataError> {
        let http = reqwest::Client::builder()
            .timeout(config.request_timeout)
            .build()
            .map_err(|e| DataError::ClientInit(e.to_string()))?;

        Ok(Self {
            http,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            rotator: CredentialRotator::new(config.api_keys),
            retry_count: config.retry_count.max(1),
            retry_delay: config.retry_delay,
        })
    }

    /// GET 요청 후 JSON 디코딩. 시도마다 다음 자격증명을 사용합니다.
    ///
    /// 네트워크/타임아웃/비정상 상태코드/디코딩 실패는 모두 동일하게
    /// 취급됩니다: 고정 지연 후 재시도, 시도 횟수 소진 시 `None`.
    async fn get_json<T: DeserializeOwned>(&self, path: &str, query: &[(&str, String)]) -> Option<T> {
        let url = format!("{}{}", self.base_url, path);

        for attempt in 1..=self.retry_count {
            let mut request = self.http.get(&url).query(query);
            // 커서는 결과와 무관하게 시도당 정확히 한 번 전진
            if let Some(key) = self.rotator.next() {
                request = request.header("authorization", format!("Apikey {}", key));
            }

            match request.send().await {
                Ok(resp) if resp.status().is_success() => match resp.json::<T>().await {
                    Ok(body) => return Some(body),
                    Err(e) => {
                        warn!(
                            url = %url,
                            attempt = attempt,
                            max = self.retry_count,
                            error = %e,
                            "응답 디코딩 실패"
                        );
                    }
                },
                Ok(resp) => {
                    warn!(
                        url = %url,
                        attempt = attempt,
                        max = self.retry_count,
                        status = %resp.status(),
                        "비정상 상태 코드"
                    );
                }
                Err(e) => {
                    warn!(
                        url = %url,
                        attempt = attempt,
                        max = self.retry_count,
                        error = %e,
                        "네트워크 오류"
                    );
                }
            }

            if attempt < self.retry_count {
                tokio::time::sleep(self.retry_delay).await;
            }
        }

        None
    }
}

#[async_trait]
impl MarketDataSource for CryptoCompareClient {
    async fn top_assets_page(&self, page: u32, limit: u32) -> Option<Vec<ListedCoin>> {
        let query = [
            ("tsym", QUOTE_CURRENCY.to_string()),
            ("limit", limit.to_string()),
            ("page", page.to_string()),
        ];
        let body: TopListResponse = self.get_json(TOP_LIST_PATH, &query).await?;

        // 목록 엔드포인트는 성공 시 discriminator를 생략하고
        // 실패 시에만 "Error"를 실어 보낸다
        if body.response.as_deref() == Some("Error") {
            debug!(page = page, "상위 목록 오류 페이지");
            return None;
        }

        let coins = body
            .data
            .into_iter()
            .filter_map(|entry| {
                let info = entry.coin_info?;
                Some(ListedCoin {
                    symbol: info.name?,
                    full_name: info.full_name,
                })
            })
            .collect();
        Some(coins)
    }

    async fn daily_history(
        &self,
        symbol: &str,
        to_ts: Option<i64>,
        limit: u32,
    ) -> Option<Vec<DailyCandle>> {
        let mut query = vec![
            ("fsym", symbol.to_string()),
            ("tsym", QUOTE_CURRENCY.to_string()),
            ("limit", limit.to_string()),
        ];
        if let Some(ts) = to_ts {
            query.push(("toTs", ts.to_string()));
        }

        let body: HistoDayResponse = self.get_json(HISTO_DAY_PATH, &query).await?;
        if body.response.as_deref() != Some("Success") {
            debug!(symbol = symbol, "일봉 응답 오류 discriminator");
            return None;
        }

        let records = body.data?.data;
        let candles: Vec<DailyCandle> = records
            .into_iter()
            .filter_map(HistoDayRecord::into_candle)
            .collect();
        Some(candles)
    }

    async fn current_quote(&self, symbol: &str) -> Option<SnapshotQuote> {
        let query = [
            ("fsyms", symbol.to_string()),
            ("tsyms", QUOTE_CURRENCY.to_string()),
        ];
        let body: PriceMultiFullResponse = self.get_json(PRICE_FULL_PATH, &query).await?;

        // RAW.<심볼>.USD 가 없으면 사용할 수 없는 응답
        let raw = body.raw.get(symbol)?.get(QUOTE_CURRENCY)?;
        Some(SnapshotQuote {
            last_price: to_decimal(raw.price),
            open_24h: to_decimal(raw.open_24h),
            high_24h: to_decimal(raw.high_24h),
            low_24h: to_decimal(raw.low_24h),
            volume_24h: to_decimal(raw.volume_24h),
            volume_24h_to: to_decimal(raw.volume_24h_to),
            change_pct_24h: to_decimal(raw.change_pct_24h),
            market_cap: to_decimal(raw.market_cap),
            supply: to_decimal(raw.supply),
        })
    }
}

/// 업스트림 float를 Decimal로 변환.
fn to_decimal(value: Option<f64>) -> Option<Decimal> {
    value.and_then(Decimal::from_f64_retain)
}

// =============================================================================
// 응답 DTO
// =============================================================================

#[derive(Debug, Deserialize)]
struct TopListResponse {
    #[serde(rename = "Response")]
    response: Option<String>,
    #[serde(rename = "Data", default)]
    data: Vec<TopListEntry>,
}

#[derive(Debug, Deserialize)]
struct TopListEntry {
    #[serde(rename = "CoinInfo")]
    coin_info: Option<CoinInfoDto>,
}

#[derive(Debug, Deserialize)]
struct CoinInfoDto {
    #[serde(rename = "Name")]
    name: Option<String>,
    #[serde(rename = "FullName")]
    full_name: Option<String>,
}

#[derive(Debug, Deserialize)]
struct HistoDayResponse {
    #[serde(rename = "Response")]
    response: Option<String>,
    #[serde(rename = "Data")]
    data: Option<HistoDayData>,
}

#[derive(Debug, Deserialize)]
struct HistoDayData {
    #[serde(rename = "Data", default)]
    data: Vec<HistoDayRecord>,
}

#[derive(Debug, Deserialize)]
struct HistoDayRecord {
    time: i64,
    open: Option<f64>,
    high: Option<f64>,
    low: Option<f64>,
    close: Option<f64>,
    volumefrom: Option<f64>,
    volumeto: Option<f64>,
}

impl HistoDayRecord {
    /// unix 초를 UTC 날짜로 해석하여 도메인 캔들로 변환.
    /// 타임스탬프가 범위를 벗어난 레코드는 버립니다.
    fn into_candle(self) -> Option<DailyCandle> {
        let date = DateTime::<Utc>::from_timestamp(self.time, 0)?.date_naive();
        Some(DailyCandle {
            date,
            open: to_decimal(self.open),
            high: to_decimal(self.high),
            low: to_decimal(self.low),
            close: to_decimal(self.close),
            volume_from: to_decimal(self.volumefrom),
            volume_to: to_decimal(self.volumeto),
        })
    }
}

#[derive(Debug, Deserialize)]
struct PriceMultiFullResponse {
    #[serde(rename = "RAW", default)]
    raw: HashMap<String, HashMap<String, RawQuoteDto>>,
}

#[derive(Debug, Deserialize)]
struct RawQuoteDto {
    #[serde(rename = "PRICE")]
    price: Option<f64>,
    #[serde(rename = "OPEN24HOUR")]
    open_24h: Option<f64>,
    #[serde(rename = "HIGH24HOUR")]
    high_24h: Option<f64>,
    #[serde(rename = "LOW24HOUR")]
    low_24h: Option<f64>,
    #[serde(rename = "VOLUME24HOUR")]
    volume_24h: Option<f64>,
    #[serde(rename = "VOLUME24HOURTO")]
    volume_24h_to: Option<f64>,
    #[serde(rename = "CHANGEPCT24HOUR")]
    change_pct_24h: Option<f64>,
    #[serde(rename = "MKTCAP")]
    market_cap: Option<f64>,
    #[serde(rename = "SUPPLY")]
    supply: Option<f64>,
}
