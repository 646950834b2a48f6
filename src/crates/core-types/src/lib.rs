/// Multichat Core Types
///
/// Low-level DTOs shared by the protocol adapters and the turn engine:
/// - routes and the execution mode derived from them
/// - user message content items
/// - normalized stream events
/// - multi-provider upload results
pub mod content;
pub mod event;
pub mod request;
pub mod route;
pub mod upload;

pub use content::ContentItem;
pub use event::StreamEvent;
pub use request::{ChatMessage, ChatRequest, MessageRole};
pub use route::{ChatMode, Route, RoutePlan, CONSENSUS_MODEL_ID};
pub use upload::{ProviderFileOutput, UploadResult};

pub const VERSION: &str = env!("CARGO_PKG_VERSION");
