/// Decoding of Binance combined-stream trade messages
///
/// ```text
/// {"stream":"btcusdt@trade","data":{"e":"trade","E":1645736675086,"s":"BTCUSDT","t":1268815872,
///  "p":"38400.00000000","q":"0.07257000","b":9534389397,"a":9534372700,"T":1645736675085,"m":false,"M":true}}
/// ```
use serde::Deserialize;

use crate::types::{FeedEvent, Trade};

#[derive(Debug, Deserialize)]
struct CombinedMessage {
    data: Option<serde_json::Value>,
}

#[derive(Debug, Deserialize)]
struct TradePayload {
    #[serde(rename = "e")]
    event_type: String,
    #[serde(rename = "E")]
    event_time: i64,
    #[serde(rename = "s")]
    symbol: String,
    #[serde(rename = "p")]
    price: String,
    #[serde(rename = "q")]
    quantity: String,
    #[serde(rename = "T")]
    trade_time: i64,
}

/// Stream name for a symbol's raw trade channel
pub fn trade_stream_name(symbol: &str) -> String {
    format!("{}@trade", symbol.to_lowercase())
}

/// Combined-stream URL covering all symbols
pub fn combined_stream_url(base_url: &str, symbols: &[String]) -> String {
    let streams: Vec<String> = symbols.iter().map(|s| trade_stream_name(s)).collect();
    format!("{}/stream?streams={}", base_url.trim_end_matches('/'), streams.join("/"))
}

/// Turn one text frame into a feed event; anything that is not a well-formed trade
/// becomes an error envelope carrying the raw text.
pub fn decode_message(text: &str) -> FeedEvent {
    match decode_trade(text) {
        Some(trade) => FeedEvent::Trade(trade),
        None => FeedEvent::ErrorEnvelope(text.to_string()),
    }
}

fn decode_trade(text: &str) -> Option<Trade> {
    let message: CombinedMessage = serde_json::from_str(text).ok()?;
    let payload: TradePayload = serde_json::from_value(message.data?).ok()?;

    if payload.event_type != "trade" {
        return None;
    }

    let price: f64 = payload.price.parse().ok()?;
    let quantity: f64 = payload.quantity.parse().ok()?;
    if !price.is_finite() || !quantity.is_finite() || price < 0.0 || quantity < 0.0 {
        return None;
    }

    Some(Trade {
        symbol: payload.symbol,
        price,
        quantity,
        trade_time_ms: payload.trade_time,
        event_time_ms: payload.event_time,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"{"stream":"btcusdt@trade","data":{"e":"trade","E":1645736675086,"s":"BTCUSDT","t":1268815872,"p":"38400.00000000","q":"0.07257000","b":9534389397,"a":9534372700,"T":1645736675085,"m":false,"M":true}}"#;

    #[test]
    fn test_decode_trade() {
        match decode_message(SAMPLE) {
            FeedEvent::Trade(trade) => {
                assert_eq!(trade.symbol, "BTCUSDT");
                assert_eq!(trade.price, 38400.0);
                assert_eq!(trade.quantity, 0.07257);
                assert_eq!(trade.trade_time_ms, 1645736675085);
                assert_eq!(trade.event_time_ms, 1645736675086);
            }
            other => panic!("expected trade, got {:?}", other),
        }
    }

    #[test]
    fn test_non_trade_messages_are_errors() {
        let cases = [
            r#"{"result":null,"id":1}"#,
            r#"{"e":"error","m":"Invalid request"}"#,
            r#"{"stream":"btcusdt@depth","data":{"e":"depthUpdate","E":1,"s":"BTCUSDT","p":"1","q":"1","T":1}}"#,
            r#"{"stream":"btcusdt@trade","data":{"e":"trade","E":1,"s":"BTCUSDT","p":"abc","q":"1","T":1}}"#,
            r#"{"stream":"btcusdt@trade","data":{"e":"trade","E":1,"s":"BTCUSDT","p":"1","q":"-1","T":1}}"#,
            "not json",
        ];

        for case in cases {
            assert_eq!(decode_message(case), FeedEvent::ErrorEnvelope(case.to_string()), "{}", case);
        }
    }

    #[test]
    fn test_combined_url() {
        let symbols = vec!["BTCUSDT".to_string(), "ETHUSDT".to_string()];
        assert_eq!(
            combined_stream_url("wss://stream.binance.com:9443/", &symbols),
            "wss://stream.binance.com:9443/stream?streams=btcusdt@trade/ethusdt@trade"
        );
    }
}
