//! Yahoo Finance data provider.
//!
//! Daily bars come from the v8 chart API; fundamentals come from the v10
//! quoteSummary API, which needs a session cookie plus a "crumb" token.
//! Requests are retried with exponential backoff and guarded by a shared
//! circuit breaker.
//!
//! Yahoo Finance has no official API and is subject to unannounced format
//! changes. The CSV import provider is the fallback when Yahoo is unavailable.

use super::circuit_breaker::CircuitBreaker;
use super::provider::{DataError, DataSource, MarketDataProvider};
use crate::domain::bar::{retain_sane, tail_window};
use crate::domain::{Fundamentals, PriceBar, Ticker};
use chrono::{Duration as ChronoDuration, NaiveDate, Utc};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use std::sync::{Arc, Mutex};
use std::time::Duration;

const REFERER: &str = "https://finance.yahoo.com/";

// ─── Chart API response ─────────────────────────────────────────────

#[derive(Debug, Deserialize)]
struct ChartResponse {
    chart: ChartResult,
}

#[derive(Debug, Deserialize)]
struct ChartResult {
    result: Option<Vec<ChartData>>,
    error: Option<ApiError>,
}

#[derive(Debug, Deserialize)]
struct ApiError {
    code: String,
    description: String,
}

#[derive(Debug, Deserialize)]
struct ChartData {
    timestamp: Option<Vec<i64>>,
    indicators: Indicators,
}

#[derive(Debug, Deserialize)]
struct Indicators {
    quote: Vec<QuoteData>,
}

#[derive(Debug, Deserialize)]
struct QuoteData {
    open: Vec<Option<f64>>,
    high: Vec<Option<f64>>,
    low: Vec<Option<f64>>,
    close: Vec<Option<f64>>,
    volume: Vec<Option<u64>>,
}

// ─── quoteSummary API response ──────────────────────────────────────

#[derive(Debug, Deserialize)]
struct SummaryResponse {
    #[serde(rename = "quoteSummary")]
    quote_summary: SummaryResult,
}

#[derive(Debug, Deserialize)]
struct SummaryResult {
    result: Option<Vec<SummaryModules>>,
    error: Option<ApiError>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
struct SummaryModules {
    price: Option<PriceModule>,
    summary_detail: Option<SummaryDetailModule>,
    default_key_statistics: Option<KeyStatisticsModule>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
struct PriceModule {
    market_cap: Option<RawValue>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
struct SummaryDetailModule {
    market_cap: Option<RawValue>,
    #[serde(rename = "forwardPE")]
    forward_pe: Option<RawValue>,
    #[serde(rename = "trailingPE")]
    trailing_pe: Option<RawValue>,
    dividend_yield: Option<RawValue>,
    fifty_two_week_high: Option<RawValue>,
    fifty_two_week_low: Option<RawValue>,
    average_volume: Option<RawValue>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
struct KeyStatisticsModule {
    #[serde(rename = "forwardPE")]
    forward_pe: Option<RawValue>,
}

/// Yahoo wraps numbers as `{"raw": 1.0, "fmt": "1.00"}`.
#[derive(Debug, Default, Deserialize)]
struct RawValue {
    #[serde(default)]
    raw: Option<f64>,
}

fn raw(value: &Option<RawValue>) -> Option<f64> {
    value
        .as_ref()
        .and_then(|v| v.raw)
        .filter(|v| v.is_finite())
}

// ─── Provider ───────────────────────────────────────────────────────

/// Yahoo Finance data provider.
pub struct YahooProvider {
    client: reqwest::blocking::Client,
    circuit_breaker: Arc<CircuitBreaker>,
    crumb: Mutex<Option<String>>,
    max_retries: u32,
    base_delay: Duration,
}

impl YahooProvider {
    pub fn new(circuit_breaker: Arc<CircuitBreaker>) -> Result<Self, DataError> {
        let client = reqwest::blocking::Client::builder()
            .timeout(Duration::from_secs(30))
            .cookie_store(true)
            .user_agent("Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36")
            .build()
            .map_err(|e| DataError::NetworkError(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            client,
            circuit_breaker,
            crumb: Mutex::new(None),
            max_retries: 3,
            base_delay: Duration::from_millis(500),
        })
    }

    /// Calendar window wide enough to contain `lookback` trading days,
    /// allowing for weekends and market holidays.
    fn calendar_window(lookback: usize, today: NaiveDate) -> (NaiveDate, NaiveDate) {
        let span = (lookback as i64) * 2 + 10;
        (today - ChronoDuration::days(span), today)
    }

    fn chart_url(ticker: &Ticker, start: NaiveDate, end: NaiveDate) -> String {
        let start_ts = start.and_time(chrono::NaiveTime::MIN).and_utc().timestamp();
        let end_ts = end.and_time(chrono::NaiveTime::MIN).and_utc().timestamp() + 86_399;
        format!(
            "https://query2.finance.yahoo.com/v8/finance/chart/{ticker}\
             ?period1={start_ts}&period2={end_ts}&interval=1d"
        )
    }

    fn summary_url(ticker: &Ticker, crumb: &str) -> String {
        format!(
            "https://query1.finance.yahoo.com/v10/finance/quoteSummary/{ticker}\
             ?modules=price,summaryDetail,defaultKeyStatistics&crumb={crumb}"
        )
    }

    /// Parse the chart API response into bars, skipping all-empty rows
    /// (holidays), rows without a close and rows that fail `is_sane`.
    fn parse_chart(ticker: &Ticker, resp: ChartResponse) -> Result<Vec<PriceBar>, DataError> {
        let result = resp.chart.result.ok_or_else(|| match resp.chart.error {
            Some(err) if err.code == "Not Found" => DataError::NotFound {
                ticker: ticker.to_string(),
            },
            Some(err) => {
                DataError::ResponseFormatChanged(format!("{}: {}", err.code, err.description))
            }
            None => DataError::ResponseFormatChanged("empty result with no error".into()),
        })?;

        let data = result
            .into_iter()
            .next()
            .ok_or_else(|| DataError::ResponseFormatChanged("result array is empty".into()))?;

        let timestamps = data.timestamp.unwrap_or_default();
        let quote = data
            .indicators
            .quote
            .into_iter()
            .next()
            .ok_or_else(|| DataError::ResponseFormatChanged("no quote data".into()))?;

        let mut bars = Vec::with_capacity(timestamps.len());
        for (i, &ts) in timestamps.iter().enumerate() {
            let date = chrono::DateTime::from_timestamp(ts, 0)
                .map(|dt| dt.date_naive())
                .ok_or_else(|| {
                    DataError::ResponseFormatChanged(format!("invalid timestamp: {ts}"))
                })?;

            let Some(close) = quote.close.get(i).copied().flatten() else {
                continue;
            };
            let open = quote.open.get(i).copied().flatten().unwrap_or(close);
            let high = quote.high.get(i).copied().flatten().unwrap_or(close);
            let low = quote.low.get(i).copied().flatten().unwrap_or(close);
            let volume = quote.volume.get(i).copied().flatten().unwrap_or(0);

            bars.push(PriceBar {
                date,
                open,
                high,
                low,
                close,
                volume,
            });
        }
        retain_sane(ticker, &mut bars);

        if bars.is_empty() {
            return Err(DataError::NotFound {
                ticker: ticker.to_string(),
            });
        }
        Ok(bars)
    }

    fn parse_summary(ticker: &Ticker, resp: SummaryResponse) -> Result<Fundamentals, DataError> {
        let modules = resp
            .quote_summary
            .result
            .and_then(|r| r.into_iter().next())
            .ok_or_else(|| match resp.quote_summary.error {
                Some(err) if err.code == "Not Found" => DataError::NotFound {
                    ticker: ticker.to_string(),
                },
                Some(err) => {
                    DataError::ResponseFormatChanged(format!("{}: {}", err.code, err.description))
                }
                None => DataError::ResponseFormatChanged("empty quoteSummary result".into()),
            })?;

        let detail = modules.summary_detail.unwrap_or_default();
        let stats = modules.default_key_statistics.unwrap_or_default();
        let price = modules.price.unwrap_or_default();

        Ok(Fundamentals {
            as_of: Some(Utc::now().date_naive()),
            market_cap: raw(&price.market_cap).or_else(|| raw(&detail.market_cap)),
            pe_ratio: raw(&detail.forward_pe)
                .or_else(|| raw(&detail.trailing_pe))
                .or_else(|| raw(&stats.forward_pe)),
            dividend_yield: raw(&detail.dividend_yield),
            fifty_two_week_high: raw(&detail.fifty_two_week_high),
            fifty_two_week_low: raw(&detail.fifty_two_week_low),
            average_volume: raw(&detail.average_volume)
                .filter(|v| *v >= 0.0)
                .map(|v| v as u64),
        })
    }

    /// GET a JSON document with retry, backoff and circuit breaker logic.
    fn get_json<T: DeserializeOwned>(&self, ticker: &Ticker, url: &str) -> Result<T, DataError> {
        if !self.circuit_breaker.is_allowed() {
            return Err(DataError::CircuitBreakerTripped);
        }

        let mut last_error = None;

        for attempt in 0..=self.max_retries {
            if attempt > 0 {
                let delay = self.base_delay * 2u32.pow(attempt - 1);
                tracing::debug!(%ticker, attempt, ?delay, "retrying Yahoo request");
                std::thread::sleep(delay);
            }

            if !self.circuit_breaker.is_allowed() {
                return Err(DataError::CircuitBreakerTripped);
            }

            match self.client.get(url).header("referer", REFERER).send() {
                Ok(resp) => {
                    let status = resp.status();

                    if status == reqwest::StatusCode::FORBIDDEN {
                        self.circuit_breaker.trip();
                        return Err(DataError::CircuitBreakerTripped);
                    }

                    if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
                        self.circuit_breaker.record_failure();
                        let retry_after = resp
                            .headers()
                            .get("retry-after")
                            .and_then(|v| v.to_str().ok())
                            .and_then(|v| v.parse::<u64>().ok())
                            .unwrap_or(60);
                        last_error = Some(DataError::RateLimited {
                            retry_after_secs: retry_after,
                        });
                        continue;
                    }

                    if status == reqwest::StatusCode::UNAUTHORIZED {
                        return Err(DataError::AuthenticationRequired(format!(
                            "Yahoo Finance rejected the session for {ticker}"
                        )));
                    }

                    if status == reqwest::StatusCode::NOT_FOUND {
                        return Err(DataError::NotFound {
                            ticker: ticker.to_string(),
                        });
                    }

                    if !status.is_success() {
                        self.circuit_breaker.record_failure();
                        last_error =
                            Some(DataError::NetworkError(format!("HTTP {status} for {ticker}")));
                        continue;
                    }

                    let body = resp.json::<T>().map_err(|e| {
                        DataError::ResponseFormatChanged(format!(
                            "failed to parse response for {ticker}: {e}"
                        ))
                    })?;
                    self.circuit_breaker.record_success();
                    return Ok(body);
                }
                Err(e) => {
                    if e.is_connect() || e.is_timeout() {
                        last_error = Some(DataError::NetworkError(e.to_string()));
                        continue;
                    }
                    return Err(DataError::NetworkError(e.to_string()));
                }
            }
        }

        Err(last_error.unwrap_or_else(|| DataError::NetworkError("max retries exceeded".into())))
    }

    /// Session crumb for quoteSummary, fetched once and cached.
    ///
    /// The lock only guards the cache; workers that miss concurrently may each
    /// fetch a crumb, and the last one stored wins.
    fn crumb(&self) -> Result<String, DataError> {
        if let Some(crumb) = self.crumb.lock().unwrap_or_else(|p| p.into_inner()).as_ref() {
            return Ok(crumb.clone());
        }

        // Visiting fc.yahoo.com sets the session cookie in the client's jar;
        // the response itself is usually a 404 and is ignored.
        let _ = self.client.get("https://fc.yahoo.com").header("referer", REFERER).send();

        for endpoint in [
            "https://query1.finance.yahoo.com/v1/test/getcrumb",
            "https://query2.finance.yahoo.com/v1/test/getcrumb",
        ] {
            let Ok(resp) = self.client.get(endpoint).header("referer", REFERER).send() else {
                continue;
            };
            if resp.status() == reqwest::StatusCode::TOO_MANY_REQUESTS {
                self.circuit_breaker.record_failure();
                return Err(DataError::RateLimited {
                    retry_after_secs: 60,
                });
            }
            if !resp.status().is_success() {
                continue;
            }
            let Ok(body) = resp.text() else {
                continue;
            };
            let body = body.trim();
            if !body.is_empty() && body.len() < 100 && !body.contains(' ') && !body.contains('<') {
                *self.crumb.lock().unwrap_or_else(|p| p.into_inner()) = Some(body.to_string());
                return Ok(body.to_string());
            }
        }

        Err(DataError::AuthenticationRequired(
            "failed to obtain Yahoo crumb from all endpoints".into(),
        ))
    }

    fn invalidate_crumb(&self) {
        *self.crumb.lock().unwrap_or_else(|p| p.into_inner()) = None;
    }
}

impl MarketDataProvider for YahooProvider {
    fn name(&self) -> &str {
        "yahoo_finance"
    }

    fn source(&self) -> DataSource {
        DataSource::YahooFinance
    }

    fn fetch_history(
        &self,
        ticker: &Ticker,
        lookback_days: usize,
    ) -> Result<Vec<PriceBar>, DataError> {
        let (start, end) = Self::calendar_window(lookback_days, Utc::now().date_naive());
        let url = Self::chart_url(ticker, start, end);
        let chart: ChartResponse = self.get_json(ticker, &url)?;
        let bars = Self::parse_chart(ticker, chart)?;
        Ok(tail_window(bars, lookback_days))
    }

    fn fetch_fundamentals(&self, ticker: &Ticker) -> Result<Fundamentals, DataError> {
        let crumb = self.crumb()?;
        let url = Self::summary_url(ticker, &crumb);
        let summary = match self.get_json::<SummaryResponse>(ticker, &url) {
            Err(DataError::AuthenticationRequired(_)) => {
                // Stale session: refresh the crumb once.
                self.invalidate_crumb();
                let crumb = self.crumb()?;
                self.get_json(ticker, &Self::summary_url(ticker, &crumb))?
            }
            other => other?,
        };
        Self::parse_summary(ticker, summary)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ticker(s: &str) -> Ticker {
        Ticker::parse(s).unwrap()
    }

    #[test]
    fn calendar_window_covers_weekends() {
        let today = NaiveDate::from_ymd_opt(2024, 6, 14).unwrap();
        let (start, end) = YahooProvider::calendar_window(5, today);
        assert_eq!(end, today);
        assert_eq!((end - start).num_days(), 20);
    }

    #[test]
    fn chart_url_contains_symbol_and_range() {
        let start = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
        let end = NaiveDate::from_ymd_opt(2024, 1, 31).unwrap();
        let url = YahooProvider::chart_url(&ticker("brk-b"), start, end);
        assert!(url.contains("/chart/BRK-B?"));
        assert!(url.contains("period1=1704067200"));
        assert!(url.contains("interval=1d"));
    }

    #[test]
    fn parses_chart_and_skips_holidays() {
        let json = r#"{"chart":{"result":[{"timestamp":[1704205800,1704292200,1704378600],
            "indicators":{"quote":[{"open":[100.0,null,102.0],"high":[101.0,null,103.0],
            "low":[99.0,null,101.0],"close":[100.5,null,102.5],"volume":[1000,null,1200]}]}}],
            "error":null}}"#;
        let resp: ChartResponse = serde_json::from_str(json).unwrap();
        let bars = YahooProvider::parse_chart(&ticker("SPY"), resp).unwrap();
        assert_eq!(bars.len(), 2);
        assert_eq!(bars[0].close, 100.5);
        assert_eq!(bars[1].volume, 1200);
    }

    #[test]
    fn parse_chart_drops_inconsistent_rows() {
        let json = r#"{"chart":{"result":[{"timestamp":[1704205800,1704292200,1704378600],
            "indicators":{"quote":[{"open":[100.0,101.0,102.0],"high":[101.0,95.0,103.0],
            "low":[99.0,100.0,101.0],"close":[100.5,101.5,102.5],"volume":[1000,1100,1200]}]}}],
            "error":null}}"#;
        let resp: ChartResponse = serde_json::from_str(json).unwrap();
        let bars = YahooProvider::parse_chart(&ticker("SPY"), resp).unwrap();
        let closes: Vec<f64> = bars.iter().map(|b| b.close).collect();
        assert_eq!(closes, vec![100.5, 102.5]);
    }

    #[test]
    fn cached_crumb_is_served_and_invalidated() {
        let breaker = Arc::new(CircuitBreaker::new(Duration::from_secs(60), 3));
        let provider = YahooProvider::new(breaker).unwrap();
        *provider.crumb.lock().unwrap() = Some("abc123".into());
        assert_eq!(provider.crumb().unwrap(), "abc123");
        provider.invalidate_crumb();
        assert!(provider.crumb.lock().unwrap().is_none());
    }

    #[test]
    fn chart_not_found_maps_to_not_found() {
        let json = r#"{"chart":{"result":null,"error":{"code":"Not Found","description":"No data found, symbol may be delisted"}}}"#;
        let resp: ChartResponse = serde_json::from_str(json).unwrap();
        let err = YahooProvider::parse_chart(&ticker("ZZZZ"), resp).unwrap_err();
        assert_eq!(
            err,
            DataError::NotFound {
                ticker: "ZZZZ".into()
            }
        );
    }

    #[test]
    fn parses_quote_summary() {
        let json = r#"{"quoteSummary":{"result":[{
            "price":{"marketCap":{"raw":2.9e12,"fmt":"2.9T"}},
            "summaryDetail":{"trailingPE":{"raw":31.2},"dividendYield":{"raw":0.0051},
              "fiftyTwoWeekHigh":{"raw":199.62},"fiftyTwoWeekLow":{"raw":164.08},
              "averageVolume":{"raw":52000000}},
            "defaultKeyStatistics":{}}],"error":null}}"#;
        let resp: SummaryResponse = serde_json::from_str(json).unwrap();
        let f = YahooProvider::parse_summary(&ticker("AAPL"), resp).unwrap();
        assert_eq!(f.market_cap, Some(2.9e12));
        assert_eq!(f.pe_ratio, Some(31.2));
        assert_eq!(f.dividend_yield, Some(0.0051));
        assert_eq!(f.fifty_two_week_high, Some(199.62));
        assert_eq!(f.average_volume, Some(52_000_000));
    }
}
