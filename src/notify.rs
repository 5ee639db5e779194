// =============================================================================
// Notifications — auditable record of every emitted BUY / SELL signal
// =============================================================================
//
// `LogNotifier` is the default signal sink.  Each actionable result is wrapped
// in a `SignalNotification` carrying a unique id and creation timestamp, then
// written to the log.  The full JSON form is logged at debug level so that a
// log shipper can pick it up unchanged.
// =============================================================================

use serde::Serialize;
use tracing::{debug, info, warn};

use crate::engine::IndicatorResult;
use crate::scheduler::SignalHandler;

/// One delivered signal.
#[derive(Debug, Clone, Serialize)]
pub struct SignalNotification {
    /// Unique identifier for this notification (UUID v4).
    pub id: String,

    /// RFC 3339 timestamp of when the notification was created.
    pub created_at: String,

    #[serde(flatten)]
    pub result: IndicatorResult,
}

impl SignalNotification {
    pub fn new(result: IndicatorResult) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            created_at: chrono::Utc::now().to_rfc3339(),
            result,
        }
    }
}

/// Signal sink that logs every notification through `tracing`.
#[derive(Debug, Default)]
pub struct LogNotifier;

impl LogNotifier {
    pub fn new() -> Self {
        Self
    }

    pub fn notify(&self, result: &IndicatorResult) -> SignalNotification {
        let notification = SignalNotification::new(result.clone());
        let r = &notification.result;

        info!(
            id = %notification.id,
            symbol = %r.symbol,
            signal = %r.signal,
            strength = r.strength,
            rsi = r.rsi,
            macd = r.macd,
            sma_fast = r.sma_fast,
            sma_slow = r.sma_slow,
            "SIGNAL"
        );

        match serde_json::to_string(&notification) {
            Ok(json) => debug!(notification = %json, "signal notification payload"),
            Err(e) => warn!(error = %e, "failed to serialise signal notification"),
        }

        notification
    }
}

impl SignalHandler for LogNotifier {
    fn on_signal(&self, result: &IndicatorResult) {
        self.notify(result);
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Signal;

    fn buy() -> IndicatorResult {
        IndicatorResult {
            symbol: "AAPL".into(),
            sma_fast: 124.75,
            sma_slow: 117.25,
            rsi: 100.0,
            macd: 2.1,
            macd_signal: 1.89,
            signal: Signal::Buy,
            strength: 17.5,
        }
    }

    #[test]
    fn notification_ids_are_unique() {
        let a = SignalNotification::new(buy());
        let b = SignalNotification::new(buy());
        assert_ne!(a.id, b.id);
        assert!(uuid::Uuid::parse_str(&a.id).is_ok());
    }

    #[test]
    fn created_at_is_rfc3339() {
        let n = SignalNotification::new(buy());
        assert!(chrono::DateTime::parse_from_rfc3339(&n.created_at).is_ok());
    }

    #[test]
    fn json_payload_flattens_result() {
        let n = SignalNotification::new(buy());
        let v = serde_json::to_value(&n).unwrap();
        assert_eq!(v["symbol"], "AAPL");
        assert_eq!(v["signal"], "BUY");
        assert_eq!(v["id"], n.id.as_str());
        assert!((v["strength"].as_f64().unwrap() - 17.5).abs() < 1e-10);
        assert!(v.get("result").is_none());
    }

    #[test]
    fn log_notifier_wraps_result_unchanged() {
        let notifier = LogNotifier::new();
        notifier.on_signal(&buy());
        let sell = IndicatorResult {
            signal: Signal::Sell,
            ..buy()
        };
        let n = notifier.notify(&sell);
        assert_eq!(n.result, sell);
    }
}
