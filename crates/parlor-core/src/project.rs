//! Derivation of persistence-ready project records.
//!
//! When the server wants to save an editor's work it cannot read the
//! document from its own state — the authoritative copy lives in the
//! client. The server sends a `project-request` and the client answers with
//! a `project-response` whose payload is a JSON description of the project.
//!
//! This module turns that payload into a [`SavedProject`]: the fixed subset
//! of recognized fields (each defaulted when absent), a forced not-public
//! flag, a server-stamped update timestamp, and two values — a thumbnail
//! and free-text notes — extracted from the nested document inside the
//! `SourceCode` field itself.
//!
//! The functions here are pure and have no I/O or async dependencies,
//! so the whole derivation is unit-testable in isolation.

use std::time::{SystemTime, UNIX_EPOCH};

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Failure modes of content retrieval.
///
/// The first two arise while deriving the record from the response payload
/// and are the one class of error that crosses the request-correlation
/// boundary back to the caller awaiting the content. The last two are
/// produced by the correlation layer itself.
#[derive(Debug, Error)]
pub enum ProjectError {
    /// The response payload was not valid JSON.
    #[error("malformed project payload: {0}")]
    MalformedPayload(#[source] serde_json::Error),

    /// The nested document inside the `SourceCode` field could not be
    /// parsed, so the thumbnail and notes could not be extracted.
    #[error("malformed project source document: {0}")]
    MalformedSource(#[source] serde_json::Error),

    /// No matching response arrived within the configured window.
    #[error("project request {0} timed out")]
    Timeout(u64),

    /// The session closed while the request was still pending.
    #[error("project request abandoned: session closed")]
    Abandoned,
}

/// The raw project description as the client serializes it on the wire.
///
/// Field names match the wire payload exactly; every field is optional and
/// defaults to empty so that partial payloads still derive a record.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawProject {
    #[serde(rename = "ProjectName", default)]
    pub project_name: String,
    /// Serialized document. Contains its own nested JSON structure from
    /// which the thumbnail and notes are extracted.
    #[serde(rename = "SourceCode", default)]
    pub source_code: String,
    #[serde(rename = "Media", default)]
    pub media: String,
    #[serde(rename = "SourceSize", default)]
    pub source_size: u64,
    #[serde(rename = "MediaSize", default)]
    pub media_size: u64,
    /// Identifier of the table the project was being edited at.
    #[serde(rename = "TableUuid", default)]
    pub table_id: String,
}

/// A persistence-ready project record.
///
/// Exactly the recognized [`RawProject`] fields plus the server-side
/// additions: `public` is always forced to `false` on save, `updated` is
/// stamped at receipt time, and `thumbnail`/`notes` come from the nested
/// source document.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SavedProject {
    pub name: String,
    pub source_code: String,
    pub media: String,
    pub source_size: u64,
    pub media_size: u64,
    pub table_id: String,
    /// Always `false`: saving never publishes a project.
    pub public: bool,
    /// Unix timestamp (seconds) stamped when the response was received.
    pub updated: u64,
    pub thumbnail: Option<String>,
    pub notes: Option<String>,
}

impl SavedProject {
    /// Derives a record from a raw `project-response` payload.
    ///
    /// # Errors
    ///
    /// Returns [`ProjectError::MalformedPayload`] when the payload is not
    /// valid JSON, and [`ProjectError::MalformedSource`] when the nested
    /// document inside `SourceCode` is present but unparseable.
    pub fn derive(payload: &str, updated_secs: u64) -> Result<Self, ProjectError> {
        let raw: RawProject =
            serde_json::from_str(payload).map_err(ProjectError::MalformedPayload)?;

        // An absent source field derives a record with no thumbnail/notes;
        // a present-but-malformed document is a hard failure.
        let (thumbnail, notes) = if raw.source_code.is_empty() {
            (None, None)
        } else {
            let doc: serde_json::Value =
                serde_json::from_str(&raw.source_code).map_err(ProjectError::MalformedSource)?;
            (
                doc.get("thumbnail").and_then(|v| v.as_str()).map(str::to_string),
                doc.get("notes").and_then(|v| v.as_str()).map(str::to_string),
            )
        };

        Ok(SavedProject {
            name: raw.project_name,
            source_code: raw.source_code,
            media: raw.media,
            source_size: raw.source_size,
            media_size: raw.media_size,
            table_id: raw.table_id,
            public: false,
            updated: updated_secs,
            thumbnail,
            notes,
        })
    }

    /// Derives a record stamped with the current system time.
    ///
    /// # Errors
    ///
    /// Same as [`SavedProject::derive`].
    pub fn derive_now(payload: &str) -> Result<Self, ProjectError> {
        let updated_secs = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default()
            .as_secs();
        Self::derive(payload, updated_secs)
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
