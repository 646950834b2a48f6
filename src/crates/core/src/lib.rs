// Multichat Core Library - turn orchestration over the chat gateway
// Layers: Util -> Config/Logging -> Chat

pub mod chat; // Turn engine - routing, aggregation, completion, session
pub mod config; // Client configuration
pub mod logging; // Runtime log level helpers
pub mod util; // Error types

// Export main types
pub use util::errors::*;

pub use chat::{
    plan_routes, resolve_attachments, ChannelObserver, ChatSession, InMemoryTurnSink, JsonDirTurnSink,
    ModelResponse, ModelStreamStore, NoopObserver, Turn, TurnCompletionTracker, TurnEvent,
    TurnObserver, TurnOutcome, TurnPhase, TurnRecord, TurnRequest, TurnSink,
    UploadFailurePolicy,
};
pub use config::ChatClientConfig;

// Re-export wire types so hosts need a single dependency
pub use multichat_ai_adapters::UploadFile;
pub use multichat_core_types::{ChatMode, ContentItem, Route, RoutePlan, StreamEvent};

// Version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
pub const CORE_NAME: &str = "Multichat Core";
