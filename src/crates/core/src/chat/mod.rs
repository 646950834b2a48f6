//! Multi-model chat turns
//!
//! A turn fans one user message out to several model routes over a single
//! multiplexed event stream and settles once every route (or the consensus
//! output) has completed.

pub mod aggregation;
pub mod attachments;
pub mod completion;
pub mod observer;
pub mod persistence;
pub mod route_planner;
pub mod session;
pub mod turn;

pub use aggregation::{ModelStream, ModelStreamStore};
pub use attachments::{parse_provider_list, resolve_attachments};
pub use completion::{TurnCompletionTracker, TurnPhase};
pub use observer::{ChannelObserver, NoopObserver, TurnEvent, TurnObserver};
pub use persistence::{InMemoryTurnSink, JsonDirTurnSink, ModelResponse, TurnRecord, TurnSink};
pub use route_planner::plan_routes;
pub use session::{ChatSession, TurnOutcome, TurnRequest, UploadFailurePolicy};
pub use turn::{Turn, CONSENSUS_STREAM_KEY};
