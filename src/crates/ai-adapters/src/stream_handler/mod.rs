pub mod gateway;

pub use gateway::{handle_chat_stream, pump_event_stream};
