//! Gateway protocol adapters
//!
//! Byte-level plumbing between the multi-model chat gateway and the turn
//! engine: frame decoding, event normalization, the stream pump and the
//! HTTP client for the chat and upload endpoints.

pub mod client;
pub mod normalizer;
pub mod sse;
pub mod stream_handler;
pub mod types;

pub use client::{GatewayClient, GatewayClientOptions, UploadFile};
pub use normalizer::{normalize_event, normalize_frame};
pub use sse::{Frame, FrameDecoder};
pub use stream_handler::{handle_chat_stream, pump_event_stream};
