//! Schema-driven request forms for REST resources.
//!
//! # Overview
//! A server describes the input of each HTTP verb of a resource with a JSON
//! Schema (`GET <resource>?method=<VERB>`, `Accept: application/schema+json`).
//! This crate turns those schemas into form state for an external rendering
//! widget, persists what the user typed, submits requests, and interprets the
//! responses, without any resource-specific code.
//!
//! # Design
//! - `schema` resolves `$ref`/`$defs` pointers into a self-contained schema.
//! - `metadata` derives labels, helper text, and UI hints per field.
//! - `persist` keeps the last-entered values per verb and resource path.
//! - `bridge` builds requests and maps responses by status code. The core
//!   never touches the network: a host-provided `Transport` does the I/O.
//! - `controller` drives one verb's form; `page` runs several of them
//!   independently; `clipboard` exports the visible form on copy.

pub mod bridge;
pub mod clipboard;
pub mod config;
pub mod controller;
pub mod error;
pub mod form;
pub mod http;
pub mod metadata;
pub mod page;
pub mod persist;
pub mod schema;

pub use bridge::{HttpBridge, JSON_MIME, SCHEMA_MIME};
pub use clipboard::{Clipboard, CopyOutcome, CLIPBOARD_MIME};
pub use config::{ConfigError, Layout, PageConfig};
pub use controller::{FormState, SubmitOutcome, TabState, VerbFormController};
pub use error::{BridgeError, FormError, SchemaError, StoreError, TransportError};
pub use form::{FormSpec, FormWidget, MemoryWidget};
pub use http::{HttpMethod, HttpRequest, HttpResponse, Transport};
pub use metadata::{DefinitionMeta, FieldMeta, FieldMetadata, UiHints};
pub use page::{FormPage, LoadReport};
pub use persist::{FileArea, Interaction, MemoryArea, PersistenceStore, StorageArea};
pub use schema::{resolve, RefResolver};
