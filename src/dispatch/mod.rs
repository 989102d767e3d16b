//! Utterance delivery to the downstream listener.

pub mod sink;
pub mod websocket;

pub use sink::{CollectorSink, UtteranceSink};
pub use websocket::WebSocketDispatcher;
