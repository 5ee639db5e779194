// =============================================================================
// Alpha Vantage Source — daily closes over HTTPS, synthetic on failure
// =============================================================================
//
// GET https://www.alphavantage.co/query?function=TIME_SERIES_DAILY&symbol=..
//
// Response shape (abridged):
//   { "Time Series (Daily)": { "2024-01-05": { "4. close": "183.1",
//                                              "5. volume": "1200" }, ... } }
//
// Rate-limit and key errors arrive as HTTP 200 with a "Note", "Information" or
// "Error Message" field instead of the series; those are treated like any
// other failure and replaced by a synthetic series.
//
// `DataSource::fetch` is synchronous.  The async client is driven through a
// runtime `Handle`, so `fetch` must be called from a thread that is not itself
// executing async tasks (e.g. inside `tokio::task::spawn_blocking`).
// =============================================================================

use std::time::Duration;

use anyhow::{bail, Context, Result};
use chrono::NaiveDate;
use tokio::runtime::Handle;
use tracing::{debug, instrument, warn};

use super::source::{DataSource, SyntheticSource};
use super::Series;

const BASE_URL: &str = "https://www.alphavantage.co/query";
const SERIES_FIELD: &str = "Time Series (Daily)";
const CLOSE_FIELD: &str = "4. close";
const VOLUME_FIELD: &str = "5. volume";
const NOTICE_FIELDS: &[&str] = &["Error Message", "Note", "Information"];

pub struct AlphaVantageSource {
    api_key: String,
    base_url: String,
    client: reqwest::Client,
    runtime: Handle,
    history_len: usize,
    fallback: SyntheticSource,
}

impl AlphaVantageSource {
    /// Create a source that keeps the most recent `history_len` daily points.
    pub fn new(
        api_key: impl Into<String>,
        runtime: Handle,
        timeout: Duration,
        history_len: usize,
    ) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .context("failed to build HTTP client for Alpha Vantage")?;

        debug!(base_url = BASE_URL, history_len, "AlphaVantageSource initialised");

        Ok(Self {
            api_key: api_key.into(),
            base_url: BASE_URL.to_string(),
            client,
            runtime,
            history_len,
            fallback: SyntheticSource::new(),
        })
    }

    #[instrument(skip(self), name = "alpha_vantage::fetch_daily")]
    async fn fetch_daily(&self, symbol: &str) -> Result<Series> {
        let resp = self
            .client
            .get(&self.base_url)
            .query(&[
                ("function", "TIME_SERIES_DAILY"),
                ("symbol", symbol),
                ("apikey", self.api_key.as_str()),
            ])
            .send()
            .await
            .with_context(|| format!("daily series request for {symbol} failed"))?;

        let status = resp.status();
        if !status.is_success() {
            bail!("Alpha Vantage returned {status} for {symbol}");
        }

        let body: serde_json::Value = resp
            .json()
            .await
            .with_context(|| format!("failed to parse daily series for {symbol}"))?;

        parse_daily_series(symbol, &body, self.history_len)
    }
}

impl DataSource for AlphaVantageSource {
    fn fetch(&self, symbol: &str) -> Series {
        match self.runtime.block_on(self.fetch_daily(symbol)) {
            Ok(series) if !series.is_empty() => {
                debug!(symbol, points = series.len(), "daily series fetched");
                series
            }
            Ok(_) => {
                warn!(symbol, "empty daily series, substituting synthetic data");
                self.fallback.generate(symbol)
            }
            Err(e) => {
                warn!(symbol, error = %e, "daily series fetch failed, substituting synthetic data");
                self.fallback.generate(symbol)
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Parsing
// ---------------------------------------------------------------------------

/// Alpha Vantage encodes every number as a JSON string.
fn parse_string_f64(val: &serde_json::Value, name: &str) -> Result<f64> {
    let s = val
        .as_str()
        .with_context(|| format!("field {name} is not a string"))?;
    s.parse::<f64>()
        .with_context(|| format!("field {name} is not a number: {s}"))
}

fn date_to_unix(date: &str) -> Result<f64> {
    let day = NaiveDate::parse_from_str(date, "%Y-%m-%d")
        .with_context(|| format!("bad date key {date}"))?;
    let midnight = day
        .and_hms_opt(0, 0, 0)
        .with_context(|| format!("no midnight for {date}"))?;
    Ok(midnight.and_utc().timestamp() as f64)
}

/// Convert a `TIME_SERIES_DAILY` payload into an oldest-first series holding
/// at most `history_len` points (`0` keeps everything).
pub fn parse_daily_series(symbol: &str, body: &serde_json::Value, history_len: usize) -> Result<Series> {
    let Some(days) = body.get(SERIES_FIELD).and_then(|v| v.as_object()) else {
        for field in NOTICE_FIELDS {
            if let Some(msg) = body.get(*field).and_then(|v| v.as_str()) {
                bail!("{symbol}: {field}: {msg}");
            }
        }
        bail!("{symbol}: response has no \"{SERIES_FIELD}\" object");
    };

    let mut rows = Vec::with_capacity(days.len());
    for (date, bar) in days {
        let ts = date_to_unix(date)?;
        let close = parse_string_f64(&bar[CLOSE_FIELD], CLOSE_FIELD)?;
        let volume = parse_string_f64(&bar[VOLUME_FIELD], VOLUME_FIELD)?;
        rows.push((ts, close, volume));
    }

    rows.sort_by(|a, b| a.0.total_cmp(&b.0));
    if history_len > 0 && rows.len() > history_len {
        rows.drain(..rows.len() - history_len);
    }

    let timestamps = rows.iter().map(|r| r.0).collect();
    let prices = rows.iter().map(|r| r.1).collect();
    let volumes = rows.iter().map(|r| r.2).collect();

    Series::new(symbol, prices, volumes, timestamps)
}
