//! # Noteless Core
//!
//! Runtime-agnostic logic for Noteless: the note data model, the error
//! taxonomy, the command rule set and its gates, schema-flexible decoding
//! of stored note records, and the collaborator traits (OCR, blob store,
//! record store) that the application crate implements.
//!
//! This crate contains no tokio, sqlx, HTTP or filesystem dependencies.

pub mod commands;
pub mod corpus;
pub mod error;
pub mod models;
pub mod ocr;
pub mod rules;
pub mod store;

pub use error::{NoteError, Result};
