//! Streaming odds feed adapter.

pub mod dto;
mod websocket;

pub use websocket::WebSocketTransport;
