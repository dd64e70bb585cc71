pub mod messages;
pub mod websocket;

pub use messages::{combined_stream_url, decode_message, trade_stream_name};
pub use websocket::{BinanceTradeStream, SubscriptionControl, BINANCE_WS_URL, DEFAULT_CONNECT_TIMEOUT};
