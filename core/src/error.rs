//! Error types for the schema-to-form bridge.
//!
//! # Design
//! Each pipeline stage owns its error enum so callers can tell the stages
//! apart. `BridgeError` keeps network-level failures (`Transport`) separate
//! from HTTP error statuses (`Status`): the schema-fetch path treats either as
//! "no form for this verb", while a submission must surface both to the user.
//! `FormError` is what a single verb tab reports; it never crosses into a
//! sibling tab.

use thiserror::Error;

/// Failures while rewriting `$ref` pointers in a schema document.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SchemaError {
    /// The pointer names a definition that is not in the document.
    #[error("unresolved reference: {0}")]
    UnresolvedReference(String),

    /// The pointer re-enters a definition already being resolved on the
    /// current path.
    #[error("cyclic reference: {0}")]
    CyclicReference(String),

    /// The pointer is not of the form `#/$defs/<name>` or
    /// `#/definitions/<name>`.
    #[error("unsupported reference: {0}")]
    UnsupportedReference(String),

    /// Expanding references would produce more than `limit` nodes.
    #[error("resolved schema exceeds {limit} nodes")]
    TooLarge { limit: usize },
}

/// No HTTP response was obtained at all.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("transport failure: {0}")]
pub struct TransportError(pub String);

/// Failures of a single `HttpBridge` round-trip.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BridgeError {
    /// The request never produced a response.
    #[error(transparent)]
    Transport(#[from] TransportError),

    /// The server answered with a status outside 200..=299. `body` is the raw
    /// response body, untouched.
    #[error("HTTP {status}: {body}")]
    Status { status: u16, body: String },

    /// A success response carried a body that is not valid JSON.
    #[error("deserialization failed: {0}")]
    Decode(String),

    /// The request payload could not be serialized to JSON.
    #[error("serialization failed: {0}")]
    Encode(String),
}

impl BridgeError {
    /// HTTP status of the failure, if the server answered at all.
    pub fn status(&self) -> Option<u16> {
        match self {
            BridgeError::Status { status, .. } => Some(*status),
            _ => None,
        }
    }
}

/// Failures of a storage area backing the `PersistenceStore`.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("storage io: {0}")]
    Io(#[from] std::io::Error),

    #[error("storage encoding: {0}")]
    Encoding(#[from] serde_json::Error),
}

/// Failures reported by one verb tab.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FormError {
    /// The schema for this verb could not be fetched; the tab is hidden.
    #[error("schema fetch failed: {0}")]
    SchemaFetch(BridgeError),

    /// The fetched schema could not be resolved; fatal for this tab only.
    #[error("schema error: {0}")]
    Schema(#[from] SchemaError),

    /// A user-initiated request failed; the form keeps its state for retry.
    #[error("submit failed: {0}")]
    Submit(BridgeError),
}
