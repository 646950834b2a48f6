//! Per-model accumulation of streamed text.

use indexmap::IndexMap;
use serde::Serialize;

/// Accumulated output of one route within the current turn.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ModelStream {
    pub text: String,
    pub completed: bool,
}

/// Keyed accumulator of in-progress model messages.
///
/// Entries are created lazily and keep first-seen order so the transcript
/// renders in a stable column order. Deltas are applied in arrival order;
/// nothing is sorted or buffered.
#[derive(Debug, Default)]
pub struct ModelStreamStore {
    streams: IndexMap<String, ModelStream>,
}

impl ModelStreamStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Opens `model`'s stream. Safe to call any number of times.
    pub fn on_created(&mut self, model: &str) {
        self.streams.entry(model.to_string()).or_default();
    }

    /// Appends `text` to `model`'s stream. Returns `false` when the stream
    /// was already completed and the delta was discarded.
    pub fn on_delta(&mut self, model: &str, text: &str) -> bool {
        let stream = self.streams.entry(model.to_string()).or_default();
        if stream.completed {
            return false;
        }
        stream.text.push_str(text);
        true
    }

    /// Marks `model`'s stream complete. Returns `true` only on the first call.
    pub fn on_completed(&mut self, model: &str) -> bool {
        let stream = self.streams.entry(model.to_string()).or_default();
        if stream.completed {
            return false;
        }
        stream.completed = true;
        true
    }

    /// Stores a complete, single-shot output (the consensus synthesis).
    pub fn set_final(&mut self, model: &str, text: &str) {
        let stream = self.streams.entry(model.to_string()).or_default();
        stream.text = text.to_string();
        stream.completed = true;
    }

    pub fn reset(&mut self) {
        self.streams.clear();
    }

    pub fn get(&self, model: &str) -> Option<&ModelStream> {
        self.streams.get(model)
    }

    pub fn text(&self, model: &str) -> &str {
        self.streams
            .get(model)
            .map(|stream| stream.text.as_str())
            .unwrap_or("")
    }

    pub fn len(&self) -> usize {
        self.streams.len()
    }

    pub fn is_empty(&self) -> bool {
        self.streams.is_empty()
    }

    /// Current merged transcript in first-seen model order.
    pub fn transcript(&self) -> impl Iterator<Item = (&str, &ModelStream)> {
        self.streams
            .iter()
            .map(|(model, stream)| (model.as_str(), stream))
    }
}
