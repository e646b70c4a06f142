//! Data Transfer Objects (DTOs) for the chat relay.
//!
//! DTOs are organized by protocol:
//! - `websocket`: WebSocket inbound frame DTOs
//! - `http`: HTTP API request / response DTOs
//!
//! Outbound WebSocket frames are the serialized `ChatMessage` itself.

pub mod http;
pub mod websocket;
