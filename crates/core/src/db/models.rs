use serde::{Deserialize, Serialize};

use crate::model::Outcome;

/// One recorded execution outcome.
///
/// Keyed by the SHA-256 of the program source and the renderer identity; once
/// stored, a row is never overwritten.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct OutcomeRecord {
    /// Hex-encoded SHA-256 of the program as evaluated.
    pub source_hash: String,
    /// Renderer identity (program, arguments and frame settings).
    pub renderer: String,
    pub outcome: Outcome,
    pub elapsed_ms: u64,
    /// Short reason for non-ok outcomes.
    pub detail: Option<String>,
    /// RFC 3339 timestamp of the first recording.
    pub recorded_at: String,
}

impl OutcomeRecord {
    pub fn new(
        source_hash: impl Into<String>,
        renderer: impl Into<String>,
        outcome: Outcome,
        elapsed_ms: u64,
    ) -> Self {
        Self {
            source_hash: source_hash.into(),
            renderer: renderer.into(),
            outcome,
            elapsed_ms,
            detail: None,
            recorded_at: chrono::Utc::now().to_rfc3339(),
        }
    }

    /// Builder-style helper to attach a detail message.
    pub fn with_detail(mut self, detail: Option<String>) -> Self {
        self.detail = detail;
        self
    }
}
