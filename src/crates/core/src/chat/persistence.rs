//! Hand-off of finished turns to conversation storage.

use super::completion::TurnPhase;
use crate::util::errors::{MultichatError, MultichatResult};
use async_trait::async_trait;
use log::debug;
use multichat_core_types::{ChatMode, ContentItem, Route};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tokio::sync::Mutex;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ModelResponse {
    pub provider: String,
    pub model: String,
    pub text: String,
    pub completed: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TurnRecord {
    pub turn_id: String,
    pub mode: ChatMode,
    /// Routes as the user selected them, consensus included.
    pub routes: Vec<Route>,
    pub user_message: Vec<ContentItem>,
    pub responses: Vec<ModelResponse>,
    #[serde(default)]
    pub consensus: Option<String>,
    pub phase: TurnPhase,
    pub created_at_ms: i64,
    #[serde(default)]
    pub settled_at_ms: Option<i64>,
}

/// Downstream store for settled turns.
#[async_trait]
pub trait TurnSink: Send + Sync {
    async fn save_turn(&self, record: &TurnRecord) -> MultichatResult<()>;
}

/// Keeps records in memory; useful for hosts without a backend and in tests.
#[derive(Default)]
pub struct InMemoryTurnSink {
    records: Mutex<Vec<TurnRecord>>,
}

impl InMemoryTurnSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn records(&self) -> Vec<TurnRecord> {
        self.records.lock().await.clone()
    }
}

#[async_trait]
impl TurnSink for InMemoryTurnSink {
    async fn save_turn(&self, record: &TurnRecord) -> MultichatResult<()> {
        self.records.lock().await.push(record.clone());
        Ok(())
    }
}

/// Writes each record to `<dir>/<turn_id>.json`, creating `dir` on demand.
#[derive(Debug, Clone)]
pub struct JsonDirTurnSink {
    dir: PathBuf,
}

impl JsonDirTurnSink {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn record_path(&self, turn_id: &str) -> PathBuf {
        self.dir.join(format!("{}.json", turn_id))
    }

    pub async fn load_turn(&self, turn_id: &str) -> MultichatResult<TurnRecord> {
        let path = self.record_path(turn_id);
        let bytes = tokio::fs::read(&path).await.map_err(|e| {
            MultichatError::persistence(format!("Failed to read {}: {}", path.display(), e))
        })?;
        Ok(serde_json::from_slice(&bytes)?)
    }
}

#[async_trait]
impl TurnSink for JsonDirTurnSink {
    async fn save_turn(&self, record: &TurnRecord) -> MultichatResult<()> {
        tokio::fs::create_dir_all(&self.dir).await.map_err(|e| {
            MultichatError::persistence(format!(
                "Failed to create {}: {}",
                self.dir.display(),
                e
            ))
        })?;

        let json = serde_json::to_vec_pretty(record)?;
        let path = self.record_path(&record.turn_id);
        tokio::fs::write(&path, json).await.map_err(|e| {
            MultichatError::persistence(format!("Failed to write {}: {}", path.display(), e))
        })?;
        debug!("Saved turn {} to {}", record.turn_id, path.display());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(turn_id: &str) -> TurnRecord {
        TurnRecord {
            turn_id: turn_id.to_string(),
            mode: ChatMode::Multi,
            routes: vec![Route::new("openai", "gpt-5")],
            user_message: vec![ContentItem::text("hi")],
            responses: vec![ModelResponse {
                provider: "openai".to_string(),
                model: "gpt-5".to_string(),
                text: "hello".to_string(),
                completed: true,
            }],
            consensus: None,
            phase: TurnPhase::Settled,
            created_at_ms: 1,
            settled_at_ms: Some(2),
        }
    }

    fn scratch_dir() -> PathBuf {
        std::env::temp_dir().join(format!("multichat-turns-{}", uuid::Uuid::new_v4()))
    }

    #[tokio::test]
    async fn json_dir_sink_writes_and_reads_back() {
        let dir = scratch_dir();
        let sink = JsonDirTurnSink::new(dir.join("nested"));
        sink.save_turn(&record("turn-1")).await.unwrap();

        let loaded = sink.load_turn("turn-1").await.unwrap();
        assert_eq!(loaded, record("turn-1"));

        let raw = std::fs::read_to_string(sink.record_path("turn-1")).unwrap();
        assert!(raw.contains("\"turnId\": \"turn-1\""));
        std::fs::remove_dir_all(dir).unwrap();
    }

    #[tokio::test]
    async fn json_dir_sink_reports_io_and_decode_failures() {
        let dir = scratch_dir();
        let sink = JsonDirTurnSink::new(&dir);

        let missing = sink.load_turn("absent").await.unwrap_err();
        assert!(matches!(missing, MultichatError::Persistence(_)));

        std::fs::create_dir_all(&dir).unwrap();
        std::fs::write(sink.record_path("broken"), b"{not json").unwrap();
        let broken = sink.load_turn("broken").await.unwrap_err();
        assert!(matches!(broken, MultichatError::Serialization(_)));

        // A regular file where the directory should be.
        let blocked = JsonDirTurnSink::new(sink.record_path("broken"));
        let err = blocked.save_turn(&record("turn-2")).await.unwrap_err();
        assert!(matches!(err, MultichatError::Persistence(_)));
        std::fs::remove_dir_all(dir).unwrap();
    }

    #[tokio::test]
    async fn in_memory_sink_keeps_save_order() {
        let sink = InMemoryTurnSink::new();
        sink.save_turn(&record("a")).await.unwrap();
        sink.save_turn(&record("b")).await.unwrap();
        let ids: Vec<String> = sink.records().await.into_iter().map(|r| r.turn_id).collect();
        assert_eq!(ids, vec!["a".to_string(), "b".to_string()]);
    }
}
